//! Physical-device selection and logical-device creation
//!
//! A usable device needs a queue family that can draw and present to the
//! already-created surface, plus a transfer-capable family. Devices exposing
//! a dedicated transfer family are preferred; otherwise transfers share the
//! graphics queue. Enumeration order is stable, so ties resolve
//! deterministically to the first candidate.

use std::ffi::CStr;

use ash::extensions::khr;
use ash::vk;

use super::{VulkanError, VulkanResult};

/// Sentinel for a queue family index that has not been selected yet
///
/// A successfully selected device never carries this value.
pub const INVALID_QUEUE_FAMILY: u32 = u32::MAX;

/// Everything `create_device_and_queues` produces
pub struct DeviceBundle {
    /// Selected physical device
    pub physical_device: vk::PhysicalDevice,
    /// Logical device function table
    pub device: ash::Device,
    /// Graphics+present queue
    pub queue: vk::Queue,
    /// Family index of the graphics+present queue
    pub queue_family_index: u32,
    /// Transfer queue (aliases the graphics queue on shared-family devices)
    pub transfer_queue: vk::Queue,
    /// Family index of the transfer queue
    pub transfer_queue_family_index: u32,
}

/// Queue family indices chosen for one physical device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct QueueFamilySelection {
    pub graphics_family: u32,
    pub transfer_family: u32,
    pub dedicated_transfer: bool,
}

/// Pick queue families from one device's advertised set
///
/// Returns `None` when no family can both draw and present. The graphics
/// family doubles as the transfer family unless a dedicated (non-graphics)
/// transfer family exists; graphics capability implies transfer support, so
/// the shared fallback is always valid.
pub(crate) fn select_queue_families<F>(
    families: &[vk::QueueFamilyProperties],
    mut present_support: F,
) -> VulkanResult<Option<QueueFamilySelection>>
where
    F: FnMut(u32) -> VulkanResult<bool>,
{
    let mut graphics_family = INVALID_QUEUE_FAMILY;
    for (index, family) in families.iter().enumerate() {
        let index = index as u32;
        if family.queue_count == 0 {
            continue;
        }
        if family.queue_flags.contains(vk::QueueFlags::GRAPHICS) && present_support(index)? {
            graphics_family = index;
            break;
        }
    }
    if graphics_family == INVALID_QUEUE_FAMILY {
        return Ok(None);
    }

    let mut transfer_family = INVALID_QUEUE_FAMILY;
    for (index, family) in families.iter().enumerate() {
        let index = index as u32;
        if family.queue_count == 0 || index == graphics_family {
            continue;
        }
        if family.queue_flags.contains(vk::QueueFlags::TRANSFER)
            && !family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
        {
            transfer_family = index;
            break;
        }
    }

    let dedicated_transfer = transfer_family != INVALID_QUEUE_FAMILY;
    if !dedicated_transfer {
        transfer_family = graphics_family;
    }

    Ok(Some(QueueFamilySelection {
        graphics_family,
        transfer_family,
        dedicated_transfer,
    }))
}

/// Index of the preferred candidate among suitable devices
///
/// Dedicated-transfer devices win; otherwise the first enumerated candidate
/// does.
pub(crate) fn pick_candidate(selections: &[QueueFamilySelection]) -> Option<usize> {
    selections
        .iter()
        .position(|selection| selection.dedicated_transfer)
        .or(if selections.is_empty() { None } else { Some(0) })
}

struct DeviceCandidate {
    physical_device: vk::PhysicalDevice,
    properties: vk::PhysicalDeviceProperties,
    selection: QueueFamilySelection,
}

/// Select a physical device and create the logical device and queues
///
/// Must be called strictly after the surface exists; presentation support is
/// evaluated against it. Population happens exactly once per harness.
pub fn create_device_and_queues(
    instance: &ash::Instance,
    surface_loader: &khr::Surface,
    surface: vk::SurfaceKHR,
) -> VulkanResult<DeviceBundle> {
    let physical_devices = unsafe {
        instance
            .enumerate_physical_devices()
            .map_err(VulkanError::Api)?
    };
    if physical_devices.is_empty() {
        return Err(VulkanError::NoSuitableDevice(
            "no Vulkan physical devices are present".to_string(),
        ));
    }

    let mut candidates = Vec::new();
    for physical_device in physical_devices {
        if let Some(candidate) =
            evaluate_device(instance, surface_loader, surface, physical_device)?
        {
            candidates.push(candidate);
        }
    }

    let selections: Vec<QueueFamilySelection> =
        candidates.iter().map(|c| c.selection).collect();
    let Some(index) = pick_candidate(&selections) else {
        return Err(VulkanError::NoSuitableDevice(
            "no device exposes a graphics queue family that can present to the surface \
             together with the swapchain extension"
                .to_string(),
        ));
    };
    let candidate = &candidates[index];

    let device_name = unsafe { CStr::from_ptr(candidate.properties.device_name.as_ptr()) }
        .to_string_lossy();
    log::info!(
        "selected GPU: {} (graphics family {}, transfer family {}{})",
        device_name,
        candidate.selection.graphics_family,
        candidate.selection.transfer_family,
        if candidate.selection.dedicated_transfer {
            ", dedicated"
        } else {
            ", shared"
        }
    );

    let priorities = [1.0_f32];
    let mut unique_families = vec![candidate.selection.graphics_family];
    if candidate.selection.dedicated_transfer {
        unique_families.push(candidate.selection.transfer_family);
    }
    let queue_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families
        .iter()
        .map(|&family| {
            vk::DeviceQueueCreateInfo::builder()
                .queue_family_index(family)
                .queue_priorities(&priorities)
                .build()
        })
        .collect();

    let device_extensions = [khr::Swapchain::name().as_ptr()];
    let create_info = vk::DeviceCreateInfo::builder()
        .queue_create_infos(&queue_infos)
        .enabled_extension_names(&device_extensions);

    let device = unsafe {
        instance
            .create_device(candidate.physical_device, &create_info, None)
            .map_err(VulkanError::Api)?
    };

    let queue = unsafe { device.get_device_queue(candidate.selection.graphics_family, 0) };
    let transfer_queue =
        unsafe { device.get_device_queue(candidate.selection.transfer_family, 0) };

    Ok(DeviceBundle {
        physical_device: candidate.physical_device,
        device,
        queue,
        queue_family_index: candidate.selection.graphics_family,
        transfer_queue,
        transfer_queue_family_index: candidate.selection.transfer_family,
    })
}

fn evaluate_device(
    instance: &ash::Instance,
    surface_loader: &khr::Surface,
    surface: vk::SurfaceKHR,
    physical_device: vk::PhysicalDevice,
) -> VulkanResult<Option<DeviceCandidate>> {
    let extensions = unsafe {
        instance
            .enumerate_device_extension_properties(physical_device)
            .map_err(VulkanError::Api)?
    };
    let has_swapchain = extensions.iter().any(|available| {
        let name = unsafe { CStr::from_ptr(available.extension_name.as_ptr()) };
        name == khr::Swapchain::name()
    });
    if !has_swapchain {
        return Ok(None);
    }

    let families =
        unsafe { instance.get_physical_device_queue_family_properties(physical_device) };
    let selection = select_queue_families(&families, |index| unsafe {
        surface_loader
            .get_physical_device_surface_support(physical_device, index, surface)
            .map_err(VulkanError::Api)
    })?;

    Ok(selection.map(|selection| DeviceCandidate {
        physical_device,
        properties: unsafe { instance.get_physical_device_properties(physical_device) },
        selection,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(flags: vk::QueueFlags, count: u32) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: count,
            ..Default::default()
        }
    }

    #[test]
    fn graphics_family_must_also_present() {
        let families = [
            family(vk::QueueFlags::GRAPHICS, 1),
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE, 1),
        ];
        // Only the second family can present.
        let selection = select_queue_families(&families, |index| Ok(index == 1))
            .unwrap()
            .unwrap();
        assert_eq!(selection.graphics_family, 1);
    }

    #[test]
    fn no_presentable_graphics_family_means_no_selection() {
        let families = [
            family(vk::QueueFlags::COMPUTE, 1),
            family(vk::QueueFlags::TRANSFER, 1),
        ];
        let selection = select_queue_families(&families, |_| Ok(true)).unwrap();
        assert!(selection.is_none());

        let families = [family(vk::QueueFlags::GRAPHICS, 1)];
        let selection = select_queue_families(&families, |_| Ok(false)).unwrap();
        assert!(selection.is_none());
    }

    #[test]
    fn dedicated_transfer_family_is_preferred() {
        let families = [
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER, 1),
            family(vk::QueueFlags::TRANSFER, 2),
        ];
        let selection = select_queue_families(&families, |_| Ok(true))
            .unwrap()
            .unwrap();
        assert_eq!(selection.graphics_family, 0);
        assert_eq!(selection.transfer_family, 1);
        assert!(selection.dedicated_transfer);
    }

    #[test]
    fn transfer_falls_back_to_the_graphics_family() {
        let families = [family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER, 1)];
        let selection = select_queue_families(&families, |_| Ok(true))
            .unwrap()
            .unwrap();
        assert_eq!(selection.transfer_family, selection.graphics_family);
        assert!(!selection.dedicated_transfer);
    }

    #[test]
    fn successful_selection_never_keeps_the_sentinel() {
        let families = [
            family(vk::QueueFlags::GRAPHICS, 1),
            family(vk::QueueFlags::TRANSFER, 1),
        ];
        let selection = select_queue_families(&families, |_| Ok(true))
            .unwrap()
            .unwrap();
        assert_ne!(selection.graphics_family, INVALID_QUEUE_FAMILY);
        assert_ne!(selection.transfer_family, INVALID_QUEUE_FAMILY);
    }

    #[test]
    fn first_matching_family_wins_ties() {
        let families = [
            family(vk::QueueFlags::GRAPHICS, 1),
            family(vk::QueueFlags::GRAPHICS, 1),
            family(vk::QueueFlags::TRANSFER, 1),
            family(vk::QueueFlags::TRANSFER, 1),
        ];
        let selection = select_queue_families(&families, |_| Ok(true))
            .unwrap()
            .unwrap();
        assert_eq!(selection.graphics_family, 0);
        assert_eq!(selection.transfer_family, 2);
    }

    #[test]
    fn empty_families_are_skipped() {
        let families = [
            family(vk::QueueFlags::GRAPHICS, 0),
            family(vk::QueueFlags::GRAPHICS, 1),
        ];
        let selection = select_queue_families(&families, |_| Ok(true))
            .unwrap()
            .unwrap();
        assert_eq!(selection.graphics_family, 1);
    }

    #[test]
    fn dedicated_transfer_device_beats_earlier_shared_device() {
        let shared = QueueFamilySelection {
            graphics_family: 0,
            transfer_family: 0,
            dedicated_transfer: false,
        };
        let dedicated = QueueFamilySelection {
            graphics_family: 0,
            transfer_family: 1,
            dedicated_transfer: true,
        };
        assert_eq!(pick_candidate(&[shared, dedicated]), Some(1));
        assert_eq!(pick_candidate(&[dedicated, shared]), Some(0));
        assert_eq!(pick_candidate(&[shared, shared]), Some(0));
        assert_eq!(pick_candidate(&[]), None);
    }
}
