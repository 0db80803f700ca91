//! Headless/offscreen backend
//!
//! No window and no event pump: the surface comes from
//! `VK_EXT_headless_surface`, and the run loop spins on the quit flag alone.
//! A demo hosted headless must set the quit flag itself (frame limit,
//! external signal), otherwise the loop never ends.

use ash::extensions::ext::HeadlessSurface;
use ash::vk;

use super::{PlatformError, WindowSystem};
use crate::demo::Demo;
use crate::harness::{DemoHarness, HarnessError};
use crate::params::{InstanceParams, WindowParams};

/// Offscreen window system
pub struct HeadlessWindowSystem {
    initialized: bool,
}

impl HeadlessWindowSystem {
    /// Create the backend
    pub fn new() -> Self {
        Self { initialized: false }
    }
}

impl Default for HeadlessWindowSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowSystem for HeadlessWindowSystem {
    fn init_window_system(&mut self) -> Result<(), PlatformError> {
        self.initialized = true;
        log::debug!("headless window system ready");
        Ok(())
    }

    fn append_instance_extension_names(
        &mut self,
        params: &mut InstanceParams,
    ) -> Result<(), PlatformError> {
        params
            .extension_names
            .push(HeadlessSurface::name().to_string_lossy().into_owned());
        Ok(())
    }

    fn create_window_and_surface(
        &mut self,
        _window_params: &WindowParams,
        entry: &ash::Entry,
        instance: &ash::Instance,
    ) -> Result<vk::SurfaceKHR, PlatformError> {
        if !self.initialized {
            return Err(PlatformError::InitializationFailed(
                "headless window system was not initialized".to_string(),
            ));
        }
        let loader = HeadlessSurface::new(entry, instance);
        let create_info = vk::HeadlessSurfaceCreateInfoEXT::builder();
        unsafe { loader.create_headless_surface(&create_info, None) }
            .map_err(|result| PlatformError::SurfaceCreationFailed(format!("{result:?}")))
    }

    fn shutdown_window_system(&mut self) {
        self.initialized = false;
        log::debug!("headless window system shut down");
    }

    fn run(
        &mut self,
        harness: &mut DemoHarness,
        demo: &mut dyn Demo,
    ) -> Result<(), HarnessError> {
        log::info!("entering headless run loop");
        while !harness.should_quit() {
            demo.draw_frame(harness)?;
        }
        log::info!("headless run loop finished");
        Ok(())
    }
}
