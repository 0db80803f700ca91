//! Demo harness lifecycle controller
//!
//! Owns every bootstrap resource and the strict ordering between them:
//! window system → instance → window/surface → device/queues → swapchain on
//! the way up, and the exact reverse on the way down. The hosted demo only
//! ever sees value copies of the handles.

use ash::extensions::ext::DebugUtils;
use ash::extensions::khr;
use ash::vk;
use thiserror::Error;

use crate::demo::{Demo, DemoError};
use crate::params::{InstanceParams, WindowParams};
use crate::platform::{self, PlatformError, PlatformKind, WindowSystem};
use crate::vulkan::instance::DebugReportHandler;
use crate::vulkan::{
    self, SwapchainImage, SwapchainImageOwner, VulkanContext, VulkanError, VulkanSwapchain,
    INVALID_QUEUE_FAMILY,
};

/// Harness-level errors
#[derive(Error, Debug)]
pub enum HarnessError {
    /// The window parameters cannot describe a valid window
    #[error("invalid window parameters: {0}")]
    InvalidWindowParams(String),

    /// Window-system failure
    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),

    /// Vulkan bootstrap failure
    #[error("vulkan error: {0}")]
    Vulkan(#[from] VulkanError),

    /// The hosted demo failed
    #[error("demo error: {0}")]
    Demo(#[from] DemoError),

    /// `run` was called while a run loop is already active
    #[error("run loop is already active")]
    RunLoopActive,
}

/// Monotonic quit flag
///
/// Setting is the only mutation; once true it can never become false again.
#[derive(Debug, Default)]
pub struct QuitFlag(bool);

impl QuitFlag {
    /// Latch the flag to true
    pub fn set(&mut self) {
        self.0 = true;
    }

    /// Current value
    pub fn get(&self) -> bool {
        self.0
    }
}

/// Bootstrapped Vulkan runtime context for hosted demos
///
/// Construction performs the full initialization sequence and either yields
/// a completely built harness or an error — never a partial object. Call
/// [`DemoHarness::shutdown`] before dropping; teardown runs in exact reverse
/// of initialization order.
pub struct DemoHarness {
    window_params: WindowParams,
    instance_params: InstanceParams,
    platform: Option<Box<dyn WindowSystem>>,
    // Heap-pinned: the debug messenger holds a raw pointer to this for the
    // lifetime of the instance.
    report_handler: Box<DebugReportHandler>,

    entry: Option<ash::Entry>,
    instance: Option<ash::Instance>,
    debug_utils: Option<DebugUtils>,
    debug_messenger: vk::DebugUtilsMessengerEXT,
    instance_layers: Vec<vk::LayerProperties>,
    instance_extensions: Vec<vk::ExtensionProperties>,

    surface_loader: Option<khr::Surface>,
    surface: vk::SurfaceKHR,

    physical_device: vk::PhysicalDevice,
    device: Option<ash::Device>,
    queue: vk::Queue,
    queue_family_index: u32,
    transfer_queue: vk::Queue,
    transfer_queue_family_index: u32,

    swapchain_loader: Option<khr::Swapchain>,
    swapchain: vk::SwapchainKHR,
    swapchain_images: Vec<SwapchainImage>,
    swapchain_image_views: Vec<vk::ImageView>,
    swapchain_image_owner: SwapchainImageOwner,
    swapchain_image_count: u32,
    surface_format: vk::SurfaceFormatKHR,
    swapchain_extent: vk::Extent2D,

    should_quit: QuitFlag,
    shutdown_complete: bool,
    demo_running: bool,
}

impl DemoHarness {
    /// Build a harness, running the full initialization sequence
    ///
    /// Order: window system → instance (with the platform extension hook) →
    /// window/surface → device and queues → swapchain. On failure the
    /// partially created resources are torn down before the error is
    /// returned.
    pub fn new(
        window_params: WindowParams,
        instance_params: InstanceParams,
        platform_kind: PlatformKind,
    ) -> Result<Self, HarnessError> {
        window_params
            .validate()
            .map_err(HarnessError::InvalidWindowParams)?;

        let mut platform = platform::create_window_system(platform_kind);
        let mut harness = Self::empty(window_params, instance_params);

        if let Err(error) = harness.init(platform.as_mut()) {
            log::error!("demo harness initialization failed: {error}");
            harness.platform = Some(platform);
            harness.shutdown();
            return Err(error);
        }

        harness.platform = Some(platform);
        Ok(harness)
    }

    fn empty(window_params: WindowParams, instance_params: InstanceParams) -> Self {
        Self {
            window_params,
            instance_params,
            platform: None,
            report_handler: Box::new(DebugReportHandler::new()),
            entry: None,
            instance: None,
            debug_utils: None,
            debug_messenger: vk::DebugUtilsMessengerEXT::null(),
            instance_layers: Vec::new(),
            instance_extensions: Vec::new(),
            surface_loader: None,
            surface: vk::SurfaceKHR::null(),
            physical_device: vk::PhysicalDevice::null(),
            device: None,
            queue: vk::Queue::null(),
            queue_family_index: INVALID_QUEUE_FAMILY,
            transfer_queue: vk::Queue::null(),
            transfer_queue_family_index: INVALID_QUEUE_FAMILY,
            swapchain_loader: None,
            swapchain: vk::SwapchainKHR::null(),
            swapchain_images: Vec::new(),
            swapchain_image_views: Vec::new(),
            swapchain_image_owner: SwapchainImageOwner::new(),
            swapchain_image_count: 0,
            surface_format: vk::SurfaceFormatKHR::default(),
            swapchain_extent: vk::Extent2D::default(),
            should_quit: QuitFlag::default(),
            shutdown_complete: false,
            demo_running: false,
        }
    }

    fn init(&mut self, platform: &mut dyn WindowSystem) -> Result<(), HarnessError> {
        log::info!(
            "initializing demo harness \"{}\"",
            self.window_params.window_name
        );

        platform.init_window_system()?;

        let entry = unsafe { ash::Entry::load() }
            .map_err(|e| HarnessError::Vulkan(VulkanError::LibraryLoad(e.to_string())))?;
        self.entry = Some(entry.clone());

        let (layers, extensions) = vulkan::instance::enumerate_instance_support(&entry)?;
        self.instance_layers = layers;
        self.instance_extensions = extensions;

        platform.append_instance_extension_names(&mut self.instance_params)?;
        // The request lists are frozen from here on.

        let bundle = vulkan::instance::create_instance(
            &entry,
            &self.instance_params,
            &self.instance_layers,
            &self.instance_extensions,
            &self.window_params.window_name,
            &self.report_handler,
        )?;
        let instance = bundle.instance.clone();
        self.instance = Some(bundle.instance);
        self.debug_utils = bundle.debug_utils;
        self.debug_messenger = bundle.debug_messenger;

        self.surface =
            platform.create_window_and_surface(&self.window_params, &entry, &instance)?;
        let surface_loader = khr::Surface::new(&entry, &instance);
        self.surface_loader = Some(surface_loader.clone());

        let device_bundle =
            vulkan::device::create_device_and_queues(&instance, &surface_loader, self.surface)?;
        self.physical_device = device_bundle.physical_device;
        self.device = Some(device_bundle.device.clone());
        self.queue = device_bundle.queue;
        self.queue_family_index = device_bundle.queue_family_index;
        self.transfer_queue = device_bundle.transfer_queue;
        self.transfer_queue_family_index = device_bundle.transfer_queue_family_index;

        let swapchain_bundle = vulkan::swapchain::create_swapchain(
            &instance,
            &device_bundle.device,
            &surface_loader,
            self.physical_device,
            self.surface,
            &self.window_params,
            &mut self.swapchain_image_owner,
        )?;
        self.swapchain_loader = Some(swapchain_bundle.loader);
        self.swapchain = swapchain_bundle.swapchain;
        self.swapchain_images = swapchain_bundle.images;
        self.swapchain_image_views = swapchain_bundle.image_views;
        self.swapchain_image_count = swapchain_bundle.image_count;
        self.surface_format = swapchain_bundle.format;
        self.swapchain_extent = swapchain_bundle.extent;

        log::info!("demo harness ready");
        Ok(())
    }

    /// Host a demo until quit is requested
    ///
    /// The platform backend drives the loop; it polls
    /// [`Self::should_quit`] every iteration. Setup runs before the first
    /// frame and teardown after the loop exits, on both success and error
    /// paths.
    pub fn run(&mut self, demo: &mut dyn Demo) -> Result<(), HarnessError> {
        let mut platform = self.platform.take().ok_or(HarnessError::RunLoopActive)?;
        self.demo_running = true;

        let mut result = demo.setup(self).map_err(HarnessError::from);
        if result.is_ok() {
            result = platform.run(self, demo);
        }
        demo.teardown(self);

        self.demo_running = false;
        self.platform = Some(platform);
        result
    }

    /// Tear down every resource in exact reverse creation order
    ///
    /// Idempotent: the second and later calls are no-ops. Must be called
    /// before the harness is dropped.
    pub fn shutdown(&mut self) {
        debug_assert!(
            !self.demo_running,
            "shutdown() called while the run loop is active"
        );
        if self.shutdown_complete {
            return;
        }
        log::info!("shutting down demo harness");

        self.destroy_swapchain();
        self.destroy_device();
        self.destroy_instance();
        if let Some(platform) = self.platform.as_mut() {
            platform.shutdown_window_system();
        }

        self.shutdown_complete = true;
    }

    fn destroy_swapchain(&mut self) {
        if let (Some(device), Some(loader)) = (&self.device, &self.swapchain_loader) {
            unsafe {
                for view in self.swapchain_image_views.drain(..) {
                    device.destroy_image_view(view, None);
                }
                if self.swapchain != vk::SwapchainKHR::null() {
                    loader.destroy_swapchain(self.swapchain, None);
                }
            }
        }
        // Image storage belongs to the swapchain; the handles are dropped,
        // never individually freed.
        debug_assert!(self.swapchain_images.iter().all(|i| !i.should_destroy()));
        self.swapchain_images.clear();
        self.swapchain_image_views.clear();
        self.swapchain = vk::SwapchainKHR::null();
        self.swapchain_loader = None;
        self.swapchain_image_count = 0;
    }

    fn destroy_device(&mut self) {
        if let Some(device) = self.device.take() {
            unsafe {
                let _ = device.device_wait_idle();
                device.destroy_device(None);
            }
        }
        self.queue = vk::Queue::null();
        self.transfer_queue = vk::Queue::null();
        self.queue_family_index = INVALID_QUEUE_FAMILY;
        self.transfer_queue_family_index = INVALID_QUEUE_FAMILY;
        self.physical_device = vk::PhysicalDevice::null();
    }

    fn destroy_instance(&mut self) {
        if let Some(instance) = self.instance.take() {
            unsafe {
                if self.surface != vk::SurfaceKHR::null() {
                    if let Some(surface_loader) = &self.surface_loader {
                        surface_loader.destroy_surface(self.surface, None);
                    }
                }
                if self.debug_messenger != vk::DebugUtilsMessengerEXT::null() {
                    if let Some(debug_utils) = &self.debug_utils {
                        debug_utils.destroy_debug_utils_messenger(self.debug_messenger, None);
                    }
                }
                instance.destroy_instance(None);
            }
        }
        self.surface = vk::SurfaceKHR::null();
        self.surface_loader = None;
        self.debug_messenger = vk::DebugUtilsMessengerEXT::null();
        self.debug_utils = None;
        self.entry = None;
    }

    /// Request the run loop to stop
    ///
    /// The only mutation of the quit flag; monotonic. A running loop
    /// observes it within one iteration.
    pub fn set_should_quit(&mut self) {
        self.should_quit.set();
    }

    /// Whether quit has been requested
    pub fn should_quit(&self) -> bool {
        self.should_quit.get()
    }

    /// Whether a demo is currently being hosted
    pub fn is_demo_running(&self) -> bool {
        self.demo_running
    }

    /// The window parameters this harness was built with
    pub fn window_params(&self) -> &WindowParams {
        &self.window_params
    }

    /// The frozen instance request, including platform-appended extensions
    pub fn instance_params(&self) -> &InstanceParams {
        &self.instance_params
    }

    /// Instance layers the Vulkan installation advertises
    pub fn instance_layers(&self) -> &[vk::LayerProperties] {
        &self.instance_layers
    }

    /// Instance extensions the Vulkan installation advertises
    pub fn instance_extensions(&self) -> &[vk::ExtensionProperties] {
        &self.instance_extensions
    }

    /// The validation-report handler and its counters
    pub fn debug_report_handler(&self) -> &DebugReportHandler {
        &self.report_handler
    }

    /// Actual negotiated swapchain image count
    pub fn swapchain_image_count(&self) -> u32 {
        self.swapchain_image_count
    }

    /// Value snapshot of the bootstrapped context
    ///
    /// Panics when read after shutdown; a constructed harness is always
    /// fully populated.
    pub fn vulkan_context(&self) -> VulkanContext {
        let instance = self
            .instance
            .clone()
            .expect("Vulkan context read after shutdown");
        let device = self
            .device
            .clone()
            .expect("Vulkan context read after shutdown");
        debug_assert_ne!(self.queue_family_index, INVALID_QUEUE_FAMILY);
        debug_assert_ne!(self.transfer_queue_family_index, INVALID_QUEUE_FAMILY);
        VulkanContext {
            instance,
            physical_device: self.physical_device,
            device,
            queue: self.queue,
            queue_family_index: self.queue_family_index,
            transfer_queue: self.transfer_queue,
            transfer_queue_family_index: self.transfer_queue_family_index,
            surface: self.surface,
        }
    }

    /// Value snapshot of the negotiated swapchain
    ///
    /// Panics when read after shutdown.
    pub fn vulkan_swapchain(&self) -> VulkanSwapchain {
        let loader = self
            .swapchain_loader
            .clone()
            .expect("Vulkan swapchain read after shutdown");
        VulkanSwapchain {
            loader,
            swapchain: self.swapchain,
            image_count: self.swapchain_image_count,
            images: self.swapchain_images.clone(),
            format: self.surface_format.format,
            color_space: self.surface_format.color_space,
            extent: self.swapchain_extent,
        }
    }
}

impl Drop for DemoHarness {
    fn drop(&mut self) {
        debug_assert!(
            self.shutdown_complete,
            "DemoHarness dropped without shutdown()"
        );
        if !self.shutdown_complete {
            self.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quit_flag_starts_unset() {
        let flag = QuitFlag::default();
        assert!(!flag.get());
    }

    #[test]
    fn quit_flag_is_monotonic() {
        let mut flag = QuitFlag::default();
        flag.set();
        assert!(flag.get());
        // Setting again cannot unset it; there is no other mutation.
        flag.set();
        assert!(flag.get());
    }
}
