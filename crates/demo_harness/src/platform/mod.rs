//! Platform window-system abstraction
//!
//! The harness core never talks to a windowing library directly; everything
//! platform-specific goes through the [`WindowSystem`] trait. A backend
//! implements exactly five operations: subsystem init/shutdown, instance
//! extension augmentation, window+surface creation, and driving the run
//! loop. New platforms implement this trait and nothing else.

use ash::vk;
use thiserror::Error;

use crate::demo::Demo;
use crate::harness::{DemoHarness, HarnessError};
use crate::params::{InstanceParams, WindowParams};

pub mod glfw;
pub mod headless;

pub use self::glfw::GlfwWindowSystem;
pub use self::headless::HeadlessWindowSystem;

/// Per-platform window-system contract
///
/// Call order is fixed by the harness: `init_window_system` before instance
/// creation, `append_instance_extension_names` during it,
/// `create_window_and_surface` after the instance exists and before device
/// selection, `shutdown_window_system` last during teardown.
pub trait WindowSystem {
    /// One-time platform subsystem initialization
    fn init_window_system(&mut self) -> Result<(), PlatformError>;

    /// Append the instance extensions this platform needs for presentation
    fn append_instance_extension_names(
        &mut self,
        params: &mut InstanceParams,
    ) -> Result<(), PlatformError>;

    /// Open the native window (if any) and create its presentable surface
    fn create_window_and_surface(
        &mut self,
        window_params: &WindowParams,
        entry: &ash::Entry,
        instance: &ash::Instance,
    ) -> Result<vk::SurfaceKHR, PlatformError>;

    /// Mirror of [`Self::init_window_system`], called last during teardown
    fn shutdown_window_system(&mut self);

    /// Drive the event/frame loop until the harness requests quit
    ///
    /// Implementations must check [`DemoHarness::should_quit`] every
    /// iteration and stop cleanly when it turns true.
    fn run(
        &mut self,
        harness: &mut DemoHarness,
        demo: &mut dyn Demo,
    ) -> Result<(), HarnessError>;
}

/// Platform backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformKind {
    /// GLFW-backed desktop window
    Glfw,
    /// Offscreen surface, no window or event pump
    Headless,
}

/// Instantiate the backend for `kind`
pub fn create_window_system(kind: PlatformKind) -> Box<dyn WindowSystem> {
    match kind {
        PlatformKind::Glfw => Box::new(GlfwWindowSystem::new()),
        PlatformKind::Headless => Box::new(HeadlessWindowSystem::new()),
    }
}

/// Window-system errors
#[derive(Error, Debug)]
pub enum PlatformError {
    /// The platform subsystem refused to initialize
    #[error("window system initialization failed: {0}")]
    InitializationFailed(String),

    /// The OS refused to create the window
    #[error("window creation failed: {0}")]
    WindowCreationFailed(String),

    /// Surface creation was rejected
    #[error("surface creation failed: {0}")]
    SurfaceCreationFailed(String),

    /// The platform could not report its required instance extensions
    #[error("failed to query required instance extensions: {0}")]
    ExtensionQueryFailed(String),
}
