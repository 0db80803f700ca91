//! Construction parameters for the demo harness

use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Window and swapchain request parameters
///
/// Supplied once at harness construction and immutable afterwards. The
/// desired swapchain image count is a request, not a guarantee: the
/// negotiated count is clamped to the bounds the surface advertises.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowParams {
    /// Title of the native window
    pub window_name: String,
    /// Client-area width in pixels
    pub width: u32,
    /// Client-area height in pixels
    pub height: u32,
    /// How many presentable images to ask the swapchain for
    pub desired_swapchain_image_count: u32,
    /// Open the window fullscreen on the primary monitor
    pub use_fullscreen: bool,
}

impl Default for WindowParams {
    fn default() -> Self {
        Self {
            window_name: "demo".to_string(),
            width: 1024,
            height: 1024,
            desired_swapchain_image_count: 2,
            use_fullscreen: false,
        }
    }
}

impl WindowParams {
    /// Validate that the request is satisfiable at all
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 {
            return Err("window width must be positive".to_string());
        }
        if self.height == 0 {
            return Err("window height must be positive".to_string());
        }
        if self.desired_swapchain_image_count == 0 {
            return Err("desired_swapchain_image_count must be positive".to_string());
        }
        Ok(())
    }
}

impl Config for WindowParams {}

/// Instance layer/extension request parameters
///
/// Mutable only while the instance is being created: the platform backend
/// appends its mandatory surface extensions through
/// [`crate::platform::WindowSystem::append_instance_extension_names`], after
/// which the lists are frozen.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceParams {
    /// Requested instance layer names, in request order
    pub layer_names: Vec<String>,
    /// Requested instance extension names, in request order
    pub extension_names: Vec<String>,
}

impl Default for InstanceParams {
    fn default() -> Self {
        Self {
            layer_names: vec!["VK_LAYER_KHRONOS_validation".to_string()],
            extension_names: Vec::new(),
        }
    }
}

impl InstanceParams {
    /// Parameters requesting no layers and no extensions
    ///
    /// Useful for release builds or machines without the validation SDK.
    pub fn bare() -> Self {
        Self {
            layer_names: Vec::new(),
            extension_names: Vec::new(),
        }
    }
}

impl Config for InstanceParams {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_request() {
        let window = WindowParams::default();
        assert_eq!(window.width, 1024);
        assert_eq!(window.height, 1024);
        assert_eq!(window.desired_swapchain_image_count, 2);
        assert!(!window.use_fullscreen);

        let instance = InstanceParams::default();
        assert_eq!(instance.layer_names, ["VK_LAYER_KHRONOS_validation"]);
        assert!(instance.extension_names.is_empty());
    }

    #[test]
    fn zero_dimensions_are_rejected_naming_the_field() {
        let mut params = WindowParams::default();
        params.width = 0;
        let err = params.validate().unwrap_err();
        assert!(err.contains("width"));

        let mut params = WindowParams::default();
        params.height = 0;
        assert!(params.validate().unwrap_err().contains("height"));

        let mut params = WindowParams::default();
        params.desired_swapchain_image_count = 0;
        assert!(params
            .validate()
            .unwrap_err()
            .contains("desired_swapchain_image_count"));
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let params: WindowParams = toml::from_str("window_name = \"t\"\nwidth = 800").unwrap();
        assert_eq!(params.window_name, "t");
        assert_eq!(params.width, 800);
        assert_eq!(params.height, 1024);
        assert_eq!(params.desired_swapchain_image_count, 2);
    }

    #[test]
    fn bare_instance_params_request_nothing() {
        let params = InstanceParams::bare();
        assert!(params.layer_names.is_empty());
        assert!(params.extension_names.is_empty());
    }
}
