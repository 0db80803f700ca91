//! Vulkan resource creation
//!
//! Each submodule owns one step of the bootstrap sequence: instance (with
//! the debug-report redirection), device/queue selection, swapchain
//! negotiation and the swapchain-image ownership adapter. The lifecycle
//! controller in [`crate::harness`] strings them together in dependency
//! order.

use ash::vk;
use thiserror::Error;

pub mod context;
pub mod device;
pub mod image;
pub mod instance;
pub mod swapchain;

pub use context::{VulkanContext, VulkanSwapchain};
pub use device::INVALID_QUEUE_FAMILY;
pub use image::{ImageOrigin, SwapchainImage, SwapchainImageOwner};

/// Vulkan bootstrap errors
#[derive(Error, Debug)]
pub enum VulkanError {
    /// General Vulkan API error with result code
    #[error("Vulkan API error: {0:?}")]
    Api(vk::Result),

    /// The Vulkan loader library could not be found or loaded
    #[error("failed to load the Vulkan library: {0}")]
    LibraryLoad(String),

    /// One or more requested instance layers are not installed
    #[error("requested instance layers are not available: {}", .missing.join(", "))]
    MissingInstanceLayers {
        /// Every requested layer name absent from the enumerated set
        missing: Vec<String>,
    },

    /// One or more requested instance extensions are not supported
    #[error("requested instance extensions are not available: {}", .missing.join(", "))]
    MissingInstanceExtensions {
        /// Every requested extension name absent from the enumerated set
        missing: Vec<String>,
    },

    /// No physical device satisfies the queue/presentation requirements
    #[error("no suitable GPU: {0}")]
    NoSuitableDevice(String),

    /// The surface/device pair advertises no surface formats
    #[error("surface reports no supported formats")]
    NoSurfaceFormats,

    /// The surface/device pair advertises no present modes
    #[error("surface reports no present modes")]
    NoPresentModes,

    /// Initialization failed outside the taxonomy above
    #[error("initialization failed: {0}")]
    InitializationFailed(String),
}

/// Result type for Vulkan operations
pub type VulkanResult<T> = Result<T, VulkanError>;
