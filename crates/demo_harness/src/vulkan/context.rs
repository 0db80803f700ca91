//! Value snapshots of the bootstrapped Vulkan state
//!
//! Demos receive these by value: copies of handles for read/submission use.
//! Ownership and destruction stay with the harness.

use ash::extensions::khr;
use ash::vk;

use super::image::SwapchainImage;

/// Copies of the core context handles
///
/// Populated exactly once, in the order instance → surface → device. The
/// queue family indices are real indices, never the
/// [`super::INVALID_QUEUE_FAMILY`] sentinel.
#[derive(Clone)]
pub struct VulkanContext {
    /// Instance function table
    pub instance: ash::Instance,
    /// Selected physical device
    pub physical_device: vk::PhysicalDevice,
    /// Logical device function table
    pub device: ash::Device,
    /// Graphics+present queue
    pub queue: vk::Queue,
    /// Family index of [`Self::queue`]
    pub queue_family_index: u32,
    /// Transfer queue (may alias [`Self::queue`] on shared-family devices)
    pub transfer_queue: vk::Queue,
    /// Family index of [`Self::transfer_queue`]
    pub transfer_queue_family_index: u32,
    /// Presentable surface the device was selected against
    pub surface: vk::SurfaceKHR,
}

/// Copies of the negotiated swapchain state
#[derive(Clone)]
pub struct VulkanSwapchain {
    /// Swapchain extension function table
    pub loader: khr::Swapchain,
    /// Swapchain handle
    pub swapchain: vk::SwapchainKHR,
    /// Actual negotiated image count (may differ from the request)
    pub image_count: u32,
    /// Managed handles for every presentable image, in acquisition-index order
    pub images: Vec<SwapchainImage>,
    /// Negotiated color format
    pub format: vk::Format,
    /// Negotiated color space
    pub color_space: vk::ColorSpaceKHR,
    /// Image dimensions
    pub extent: vk::Extent2D,
}
