//! Swapchain negotiation
//!
//! Preference order is deterministic and fixed: `B8G8R8A8_SRGB` with the
//! sRGB nonlinear color space when advertised (else the first advertised
//! format), `MAILBOX` when advertised (else `FIFO`, which is always
//! available), and the surface's own extent unless it leaves sizing to the
//! window. The requested image count is clamped to the advertised bounds
//! rather than rejected.

use ash::extensions::khr;
use ash::vk;

use super::image::{SwapchainImage, SwapchainImageOwner};
use super::{VulkanError, VulkanResult};
use crate::params::WindowParams;

/// Everything `create_swapchain` produces
pub struct SwapchainBundle {
    /// Swapchain extension function table
    pub loader: khr::Swapchain,
    /// Swapchain handle
    pub swapchain: vk::SwapchainKHR,
    /// Wrapped presentable images, in acquisition-index order
    pub images: Vec<SwapchainImage>,
    /// Views over [`Self::images`], owned by the harness
    pub image_views: Vec<vk::ImageView>,
    /// Negotiated surface format
    pub format: vk::SurfaceFormatKHR,
    /// Negotiated extent
    pub extent: vk::Extent2D,
    /// Actual image count, which may differ from the request
    pub image_count: u32,
}

pub(crate) fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    formats
        .iter()
        .find(|sf| {
            sf.format == vk::Format::B8G8R8A8_SRGB
                && sf.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .copied()
        .unwrap_or(formats[0])
}

pub(crate) fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    modes
        .iter()
        .copied()
        .find(|&mode| mode == vk::PresentModeKHR::MAILBOX)
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

pub(crate) fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    window_params: &WindowParams,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: window_params.width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: window_params.height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

/// Clamp the requested image count to the advertised bounds
///
/// `max_image_count == 0` means the surface imposes no upper bound.
pub(crate) fn negotiate_image_count(
    desired: u32,
    capabilities: &vk::SurfaceCapabilitiesKHR,
) -> u32 {
    let mut count = desired.max(capabilities.min_image_count);
    if capabilities.max_image_count > 0 {
        count = count.min(capabilities.max_image_count);
    }
    count
}

/// Create the swapchain and wrap its images under managed identities
pub fn create_swapchain(
    instance: &ash::Instance,
    device: &ash::Device,
    surface_loader: &khr::Surface,
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    window_params: &WindowParams,
    image_owner: &mut SwapchainImageOwner,
) -> VulkanResult<SwapchainBundle> {
    let capabilities = unsafe {
        surface_loader
            .get_physical_device_surface_capabilities(physical_device, surface)
            .map_err(VulkanError::Api)?
    };
    let formats = unsafe {
        surface_loader
            .get_physical_device_surface_formats(physical_device, surface)
            .map_err(VulkanError::Api)?
    };
    if formats.is_empty() {
        return Err(VulkanError::NoSurfaceFormats);
    }
    let present_modes = unsafe {
        surface_loader
            .get_physical_device_surface_present_modes(physical_device, surface)
            .map_err(VulkanError::Api)?
    };
    if present_modes.is_empty() {
        return Err(VulkanError::NoPresentModes);
    }

    let format = choose_surface_format(&formats);
    let present_mode = choose_present_mode(&present_modes);
    let extent = choose_extent(&capabilities, window_params);
    let image_count =
        negotiate_image_count(window_params.desired_swapchain_image_count, &capabilities);
    if image_count != window_params.desired_swapchain_image_count {
        log::info!(
            "swapchain image count clamped from {} to {} (surface bounds {}..={})",
            window_params.desired_swapchain_image_count,
            image_count,
            capabilities.min_image_count,
            if capabilities.max_image_count == 0 {
                u32::MAX
            } else {
                capabilities.max_image_count
            }
        );
    }

    // Presentable images are also used as transfer destinations when the
    // surface allows it, so demos can clear them without a render pass.
    let mut usage = vk::ImageUsageFlags::COLOR_ATTACHMENT;
    if capabilities
        .supported_usage_flags
        .contains(vk::ImageUsageFlags::TRANSFER_DST)
    {
        usage |= vk::ImageUsageFlags::TRANSFER_DST;
    }

    let loader = khr::Swapchain::new(instance, device);
    let create_info = vk::SwapchainCreateInfoKHR::builder()
        .surface(surface)
        .min_image_count(image_count)
        .image_format(format.format)
        .image_color_space(format.color_space)
        .image_extent(extent)
        .image_array_layers(1)
        .image_usage(usage)
        .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        .pre_transform(capabilities.current_transform)
        .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
        .present_mode(present_mode)
        .clipped(true)
        .old_swapchain(vk::SwapchainKHR::null());

    let swapchain = unsafe {
        loader
            .create_swapchain(&create_info, None)
            .map_err(VulkanError::Api)?
    };

    let raw_images = unsafe {
        loader
            .get_swapchain_images(swapchain)
            .map_err(VulkanError::Api)?
    };

    let mut image_views = Vec::with_capacity(raw_images.len());
    for &image in &raw_images {
        let view_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format.format)
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });
        let view = match unsafe { device.create_image_view(&view_info, None) } {
            Ok(view) => view,
            Err(result) => {
                // Unwind the views created so far plus the swapchain itself.
                unsafe {
                    for view in image_views.drain(..) {
                        device.destroy_image_view(view, None);
                    }
                    loader.destroy_swapchain(swapchain, None);
                }
                return Err(VulkanError::Api(result));
            }
        };
        image_views.push(view);
    }

    let images: Vec<SwapchainImage> = raw_images
        .iter()
        .zip(&image_views)
        .map(|(&image, &view)| image_owner.wrap(image, view, format.format, extent))
        .collect();

    log::info!(
        "swapchain ready: {} images, {:?}/{:?}, {}x{}, {:?}",
        images.len(),
        format.format,
        format.color_space,
        extent.width,
        extent.height,
        present_mode
    );

    Ok(SwapchainBundle {
        loader,
        swapchain,
        image_count: images.len() as u32,
        images,
        image_views,
        format,
        extent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(min: u32, max: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min,
            max_image_count: max,
            ..Default::default()
        }
    }

    fn surface_format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space,
        }
    }

    #[test]
    fn desired_count_within_bounds_is_kept() {
        assert_eq!(negotiate_image_count(3, &caps(2, 8)), 3);
    }

    #[test]
    fn count_above_max_clamps_to_max() {
        assert_eq!(negotiate_image_count(16, &caps(2, 4)), 4);
    }

    #[test]
    fn count_below_min_clamps_to_min() {
        assert_eq!(negotiate_image_count(1, &caps(2, 8)), 2);
    }

    #[test]
    fn zero_max_means_unbounded() {
        assert_eq!(negotiate_image_count(64, &caps(2, 0)), 64);
    }

    #[test]
    fn srgb_bgra_is_preferred_when_advertised() {
        let formats = [
            surface_format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            surface_format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        let chosen = choose_surface_format(&formats);
        assert_eq!(chosen.format, vk::Format::B8G8R8A8_SRGB);
    }

    #[test]
    fn first_format_wins_without_the_preferred_one() {
        let formats = [
            surface_format(vk::Format::R16G16B16A16_SFLOAT, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            surface_format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        let chosen = choose_surface_format(&formats);
        assert_eq!(chosen.format, vk::Format::R16G16B16A16_SFLOAT);
    }

    #[test]
    fn mailbox_is_preferred_over_fifo() {
        let modes = [
            vk::PresentModeKHR::FIFO,
            vk::PresentModeKHR::MAILBOX,
            vk::PresentModeKHR::IMMEDIATE,
        ];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::MAILBOX);
    }

    #[test]
    fn fifo_is_the_fallback_present_mode() {
        let modes = [vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn surface_extent_wins_when_fixed() {
        let mut capabilities = caps(2, 8);
        capabilities.current_extent = vk::Extent2D {
            width: 800,
            height: 600,
        };
        let params = WindowParams::default();
        let extent = choose_extent(&capabilities, &params);
        assert_eq!(extent.width, 800);
        assert_eq!(extent.height, 600);
    }

    #[test]
    fn window_size_is_clamped_when_the_surface_leaves_sizing_open() {
        let mut capabilities = caps(2, 8);
        capabilities.current_extent = vk::Extent2D {
            width: u32::MAX,
            height: u32::MAX,
        };
        capabilities.min_image_extent = vk::Extent2D {
            width: 100,
            height: 100,
        };
        capabilities.max_image_extent = vk::Extent2D {
            width: 640,
            height: 480,
        };
        let params = WindowParams {
            width: 1024,
            height: 50,
            ..Default::default()
        };
        let extent = choose_extent(&capabilities, &params);
        assert_eq!(extent.width, 640);
        assert_eq!(extent.height, 100);
    }
}
