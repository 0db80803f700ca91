//! Ownership adapter for presentable images
//!
//! Swapchain images are created and destroyed by the swapchain itself, yet
//! downstream code wants to address them uniformly with images it allocated.
//! The adapter here mints non-owning handles with a managed identity and an
//! origin tag, so a generic release path can tell the two apart and never
//! frees storage it does not own.

use ash::vk;

/// Where an image's backing storage came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOrigin {
    /// Allocated by the application; the holder is responsible for freeing it
    Allocated,
    /// Owned by a swapchain; storage is reclaimed when the swapchain dies
    Swapchain,
}

/// A managed handle to one presentable image
///
/// Plain value type: cloning it never duplicates GPU resources, and dropping
/// it never destroys any. The image view is created by the harness and
/// destroyed together with the swapchain.
#[derive(Debug, Clone)]
pub struct SwapchainImage {
    id: u64,
    image: vk::Image,
    view: vk::ImageView,
    origin: ImageOrigin,
    format: vk::Format,
    extent: vk::Extent2D,
}

impl SwapchainImage {
    /// Unique identity within the minting owner
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Raw image handle
    pub fn image(&self) -> vk::Image {
        self.image
    }

    /// Color view covering the whole image
    pub fn view(&self) -> vk::ImageView {
        self.view
    }

    /// Pixel format
    pub fn format(&self) -> vk::Format {
        self.format
    }

    /// Image dimensions
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Whether a generic release path may destroy the backing storage
    ///
    /// False for swapchain-origin images: their storage is freed implicitly
    /// by swapchain destruction, never by an individual destroy call.
    pub fn should_destroy(&self) -> bool {
        self.origin == ImageOrigin::Allocated
    }
}

/// Mints managed identities for images the swapchain owns
///
/// The owner deliberately has no destroy operation: it never allocated the
/// storage behind the handles it mints, so it must never free it either.
#[derive(Debug)]
pub struct SwapchainImageOwner {
    next_id: u64,
}

impl SwapchainImageOwner {
    /// Create an owner with no images minted yet
    pub fn new() -> Self {
        Self { next_id: 1 }
    }

    /// Wrap one raw swapchain image under a managed identity
    pub fn wrap(
        &mut self,
        image: vk::Image,
        view: vk::ImageView,
        format: vk::Format,
        extent: vk::Extent2D,
    ) -> SwapchainImage {
        let id = self.next_id;
        self.next_id += 1;
        SwapchainImage {
            id,
            image,
            view,
            origin: ImageOrigin::Swapchain,
            format,
            extent,
        }
    }
}

impl Default for SwapchainImageOwner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap_null(owner: &mut SwapchainImageOwner) -> SwapchainImage {
        owner.wrap(
            vk::Image::null(),
            vk::ImageView::null(),
            vk::Format::B8G8R8A8_SRGB,
            vk::Extent2D {
                width: 8,
                height: 8,
            },
        )
    }

    #[test]
    fn minted_handles_get_unique_ids() {
        let mut owner = SwapchainImageOwner::new();
        let a = wrap_null(&mut owner);
        let b = wrap_null(&mut owner);
        let c = wrap_null(&mut owner);
        assert_ne!(a.id(), b.id());
        assert_ne!(b.id(), c.id());
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn swapchain_images_are_never_individually_destroyed() {
        let mut owner = SwapchainImageOwner::new();
        let image = wrap_null(&mut owner);
        assert!(!image.should_destroy());
    }

    #[test]
    fn clones_share_identity() {
        let mut owner = SwapchainImageOwner::new();
        let image = wrap_null(&mut owner);
        let copy = image.clone();
        assert_eq!(image.id(), copy.id());
        assert_eq!(image.format(), copy.format());
    }
}
