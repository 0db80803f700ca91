//! Instance creation and debug-report redirection
//!
//! Merges caller-requested layer/extension lists with the platform backend's
//! mandatory extensions, refuses to create an instance while any requested
//! name is unavailable, and wires validation-layer messages back into the
//! harness through a user-pointer trampoline.

use std::ffi::{c_void, CStr, CString};
use std::sync::atomic::{AtomicU64, Ordering};

use ash::extensions::ext::DebugUtils;
use ash::vk;
use ash::Entry;

use super::{VulkanError, VulkanResult};
use crate::params::InstanceParams;

/// Everything `create_instance` produces
pub struct InstanceBundle {
    /// Instance function table
    pub instance: ash::Instance,
    /// Debug-utils extension loader, present when validation was requested
    pub debug_utils: Option<DebugUtils>,
    /// Installed messenger, or null when validation was not requested
    pub debug_messenger: vk::DebugUtilsMessengerEXT,
}

/// Receives redirected validation-layer reports
///
/// Registered as the messenger's user pointer; the static trampoline casts
/// the pointer back and calls [`DebugReportHandler::report`]. The harness
/// keeps the handler heap-pinned for as long as the messenger lives.
#[derive(Debug, Default)]
pub struct DebugReportHandler {
    warning_count: AtomicU64,
    error_count: AtomicU64,
}

impl DebugReportHandler {
    /// Create a handler with zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Log one report and decide whether the triggering call should abort
    ///
    /// Always returns [`vk::FALSE`]: the harness never suppresses the
    /// layers' own handling of the call that produced the report.
    pub fn report(
        &self,
        severity: vk::DebugUtilsMessageSeverityFlagsEXT,
        types: vk::DebugUtilsMessageTypeFlagsEXT,
        message_id: i32,
        id_name: &str,
        message: &str,
    ) -> vk::Bool32 {
        if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
            self.error_count.fetch_add(1, Ordering::Relaxed);
            log::error!("[vulkan] {:?} {} ({}): {}", types, id_name, message_id, message);
        } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
            self.warning_count.fetch_add(1, Ordering::Relaxed);
            log::warn!("[vulkan] {:?} {} ({}): {}", types, id_name, message_id, message);
        } else {
            log::debug!("[vulkan] {:?} {} ({}): {}", types, id_name, message_id, message);
        }
        vk::FALSE
    }

    /// Number of warning-severity reports seen so far
    pub fn warning_count(&self) -> u64 {
        self.warning_count.load(Ordering::Relaxed)
    }

    /// Number of error-severity reports seen so far
    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }
}

/// Static trampoline registered as the messenger callback
///
/// The user pointer is the owning harness's [`DebugReportHandler`].
unsafe extern "system" fn redirect_debug_report(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_types: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    user_data: *mut c_void,
) -> vk::Bool32 {
    if callback_data.is_null() || user_data.is_null() {
        return vk::FALSE;
    }
    let data = &*callback_data;
    let message = if data.p_message.is_null() {
        String::new()
    } else {
        CStr::from_ptr(data.p_message).to_string_lossy().into_owned()
    };
    let id_name = if data.p_message_id_name.is_null() {
        String::new()
    } else {
        CStr::from_ptr(data.p_message_id_name)
            .to_string_lossy()
            .into_owned()
    };

    let handler = &*(user_data as *const DebugReportHandler);
    handler.report(
        severity,
        message_types,
        data.message_id_number,
        &id_name,
        &message,
    )
}

/// Enumerate the layers and extensions this Vulkan installation supports
///
/// The property lists are retained by the harness for caller introspection.
pub fn enumerate_instance_support(
    entry: &Entry,
) -> VulkanResult<(Vec<vk::LayerProperties>, Vec<vk::ExtensionProperties>)> {
    let layers = entry
        .enumerate_instance_layer_properties()
        .map_err(VulkanError::Api)?;
    let extensions = entry
        .enumerate_instance_extension_properties(None)
        .map_err(VulkanError::Api)?;
    Ok((layers, extensions))
}

/// Readable name of an enumerated layer
pub fn layer_name(properties: &vk::LayerProperties) -> String {
    unsafe { CStr::from_ptr(properties.layer_name.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}

/// Readable name of an enumerated extension
pub fn extension_name(properties: &vk::ExtensionProperties) -> String {
    unsafe { CStr::from_ptr(properties.extension_name.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}

/// Create the instance and install the debug messenger
///
/// `handler` must stay at a stable address until the messenger is destroyed;
/// the harness guarantees this by boxing it for its own lifetime. Not
/// re-entrant: call at most once per harness lifetime.
pub fn create_instance(
    entry: &Entry,
    params: &InstanceParams,
    available_layers: &[vk::LayerProperties],
    available_extensions: &[vk::ExtensionProperties],
    application_name: &str,
    handler: &DebugReportHandler,
) -> VulkanResult<InstanceBundle> {
    let layer_names = dedup_preserving_order(&params.layer_names);
    let extension_names = effective_extension_request(params);

    let available_layer_names: Vec<String> = available_layers.iter().map(layer_name).collect();
    let available_extension_names: Vec<String> =
        available_extensions.iter().map(extension_name).collect();

    let missing = missing_names(&layer_names, &available_layer_names);
    if !missing.is_empty() {
        return Err(VulkanError::MissingInstanceLayers { missing });
    }
    let missing = missing_names(&extension_names, &available_extension_names);
    if !missing.is_empty() {
        return Err(VulkanError::MissingInstanceExtensions { missing });
    }

    let application_name = new_cstring(application_name)?;
    let layer_cstrings = new_cstrings(&layer_names)?;
    let extension_cstrings = new_cstrings(&extension_names)?;
    let layer_pointers: Vec<*const i8> = layer_cstrings.iter().map(|name| name.as_ptr()).collect();
    let extension_pointers: Vec<*const i8> =
        extension_cstrings.iter().map(|name| name.as_ptr()).collect();

    let app_info = vk::ApplicationInfo::builder()
        .application_name(&application_name)
        .application_version(vk::make_api_version(0, 0, 1, 0))
        .engine_name(&application_name)
        .engine_version(vk::make_api_version(0, 0, 1, 0))
        .api_version(vk::API_VERSION_1_0);

    let create_info = vk::InstanceCreateInfo::builder()
        .application_info(&app_info)
        .enabled_layer_names(&layer_pointers)
        .enabled_extension_names(&extension_pointers);

    let instance = unsafe {
        entry
            .create_instance(&create_info, None)
            .map_err(VulkanError::Api)?
    };

    log::info!(
        "created Vulkan instance ({} layers, {} extensions)",
        layer_names.len(),
        extension_names.len()
    );

    let debug_utils_name = DebugUtils::name().to_string_lossy();
    if !extension_names.iter().any(|name| *name == debug_utils_name) {
        return Ok(InstanceBundle {
            instance,
            debug_utils: None,
            debug_messenger: vk::DebugUtilsMessengerEXT::null(),
        });
    }

    let debug_utils = DebugUtils::new(entry, &instance);
    let messenger_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(redirect_debug_report))
        .user_data(handler as *const DebugReportHandler as *mut c_void);

    let debug_messenger =
        match unsafe { debug_utils.create_debug_utils_messenger(&messenger_info, None) } {
            Ok(messenger) => messenger,
            Err(result) => {
                // Do not leak a half-built instance.
                unsafe { instance.destroy_instance(None) };
                return Err(VulkanError::Api(result));
            }
        };

    Ok(InstanceBundle {
        instance,
        debug_utils: Some(debug_utils),
        debug_messenger,
    })
}

/// The extension list actually submitted for creation
///
/// Caller order is preserved, duplicates are dropped, and the debug-utils
/// extension rides along whenever any validation layer was requested.
pub(crate) fn effective_extension_request(params: &InstanceParams) -> Vec<String> {
    let mut names = dedup_preserving_order(&params.extension_names);
    if !params.layer_names.is_empty() {
        let debug_utils = DebugUtils::name().to_string_lossy().into_owned();
        if !names.contains(&debug_utils) {
            names.push(debug_utils);
        }
    }
    names
}

pub(crate) fn dedup_preserving_order(names: &[String]) -> Vec<String> {
    let mut seen = Vec::with_capacity(names.len());
    for name in names {
        if !seen.contains(name) {
            seen.push(name.clone());
        }
    }
    seen
}

/// Every requested name absent from the available set, in request order
pub(crate) fn missing_names(requested: &[String], available: &[String]) -> Vec<String> {
    requested
        .iter()
        .filter(|name| !available.contains(name))
        .cloned()
        .collect()
}

fn new_cstring(name: &str) -> VulkanResult<CString> {
    CString::new(name).map_err(|_| {
        VulkanError::InitializationFailed(format!("name {name:?} contains an interior NUL byte"))
    })
}

fn new_cstrings(names: &[String]) -> VulkanResult<Vec<CString>> {
    names.iter().map(|name| new_cstring(name)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn dedup_keeps_first_occurrence_order() {
        let names = strings(&["a", "b", "a", "c", "b"]);
        assert_eq!(dedup_preserving_order(&names), strings(&["a", "b", "c"]));
    }

    #[test]
    fn missing_names_lists_every_miss() {
        let requested = strings(&["VK_LAYER_ONE", "VK_LAYER_TWO", "VK_LAYER_THREE"]);
        let available = strings(&["VK_LAYER_TWO"]);
        assert_eq!(
            missing_names(&requested, &available),
            strings(&["VK_LAYER_ONE", "VK_LAYER_THREE"])
        );
    }

    #[test]
    fn missing_names_is_empty_when_everything_is_available() {
        let requested = strings(&["VK_KHR_surface"]);
        let available = strings(&["VK_KHR_surface", "VK_KHR_xcb_surface"]);
        assert!(missing_names(&requested, &available).is_empty());
    }

    #[test]
    fn validation_request_pulls_in_debug_utils() {
        let params = InstanceParams::default();
        let request = effective_extension_request(&params);
        let debug_utils = DebugUtils::name().to_string_lossy().into_owned();
        assert!(request.contains(&debug_utils));
    }

    #[test]
    fn bare_request_stays_bare() {
        let params = crate::params::InstanceParams::bare();
        assert!(effective_extension_request(&params).is_empty());
    }

    #[test]
    fn duplicate_extension_requests_collapse() {
        let mut params = crate::params::InstanceParams::bare();
        params.extension_names = strings(&["VK_KHR_surface", "VK_KHR_surface"]);
        assert_eq!(
            effective_extension_request(&params),
            strings(&["VK_KHR_surface"])
        );
    }

    #[test]
    fn reports_never_abort_the_triggering_call() {
        let handler = DebugReportHandler::new();
        let verdict = handler.report(
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
            -42,
            "VUID-test",
            "synthetic report",
        );
        assert_eq!(verdict, vk::FALSE);
        assert_eq!(handler.error_count(), 1);
        assert_eq!(handler.warning_count(), 0);

        let verdict = handler.report(
            vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
            vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            0,
            "",
            "",
        );
        assert_eq!(verdict, vk::FALSE);
        assert_eq!(handler.warning_count(), 1);
    }
}
