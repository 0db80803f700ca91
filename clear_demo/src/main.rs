//! Clear-screen demo
//!
//! The smallest useful consumer of the demo harness: it receives the
//! bootstrapped context, records one command buffer per swapchain image that
//! clears it to a solid color, and presents frames until the window closes,
//! Escape is pressed, or a configured frame limit is reached.

use ash::vk;
use demo_harness::foundation::logging;
use demo_harness::prelude::*;
use serde::{Deserialize, Serialize};

/// Frame limit used headless when the config leaves it unbounded, so the
/// loop terminates without an event pump.
const HEADLESS_DEFAULT_FRAME_LIMIT: u64 = 300;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct ClearDemoConfig {
    window: WindowParams,
    clear_color: [f32; 4],
    /// Stop after this many frames; 0 keeps running until close/Escape
    max_frames: u64,
    enable_validation: bool,
    headless: bool,
}

impl Default for ClearDemoConfig {
    fn default() -> Self {
        Self {
            window: WindowParams {
                window_name: "clear demo".to_string(),
                width: 800,
                height: 600,
                ..WindowParams::default()
            },
            clear_color: [0.05, 0.1, 0.25, 1.0],
            max_frames: 0,
            enable_validation: cfg!(debug_assertions),
            headless: false,
        }
    }
}

impl Config for ClearDemoConfig {}

struct ClearDemo {
    clear_color: [f32; 4],
    max_frames: u64,
    frames: u64,
    command_pool: vk::CommandPool,
    command_buffers: Vec<vk::CommandBuffer>,
    image_available: vk::Semaphore,
    render_finished: vk::Semaphore,
}

impl ClearDemo {
    fn new(clear_color: [f32; 4], max_frames: u64) -> Self {
        Self {
            clear_color,
            max_frames,
            frames: 0,
            command_pool: vk::CommandPool::null(),
            command_buffers: Vec::new(),
            image_available: vk::Semaphore::null(),
            render_finished: vk::Semaphore::null(),
        }
    }
}

/// Record a reusable command buffer that clears `image` via transfer
///
/// The image starts in an undefined layout every frame (its previous
/// contents are irrelevant), gets cleared in `TRANSFER_DST_OPTIMAL`, and is
/// handed back in `PRESENT_SRC_KHR`.
unsafe fn record_clear(
    device: &ash::Device,
    command_buffer: vk::CommandBuffer,
    image: vk::Image,
    color: [f32; 4],
) -> Result<(), DemoError> {
    let begin_info = vk::CommandBufferBeginInfo::builder();
    device
        .begin_command_buffer(command_buffer, &begin_info)
        .map_err(DemoError::Api)?;

    let range = vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    };

    let to_transfer = vk::ImageMemoryBarrier::builder()
        .old_layout(vk::ImageLayout::UNDEFINED)
        .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(range)
        .src_access_mask(vk::AccessFlags::empty())
        .dst_access_mask(vk::AccessFlags::TRANSFER_WRITE)
        .build();
    device.cmd_pipeline_barrier(
        command_buffer,
        vk::PipelineStageFlags::TOP_OF_PIPE,
        vk::PipelineStageFlags::TRANSFER,
        vk::DependencyFlags::empty(),
        &[],
        &[],
        &[to_transfer],
    );

    let clear_value = vk::ClearColorValue { float32: color };
    device.cmd_clear_color_image(
        command_buffer,
        image,
        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        &clear_value,
        &[range],
    );

    let to_present = vk::ImageMemoryBarrier::builder()
        .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
        .new_layout(vk::ImageLayout::PRESENT_SRC_KHR)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(range)
        .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
        .dst_access_mask(vk::AccessFlags::empty())
        .build();
    device.cmd_pipeline_barrier(
        command_buffer,
        vk::PipelineStageFlags::TRANSFER,
        vk::PipelineStageFlags::BOTTOM_OF_PIPE,
        vk::DependencyFlags::empty(),
        &[],
        &[],
        &[to_present],
    );

    device
        .end_command_buffer(command_buffer)
        .map_err(DemoError::Api)
}

impl Demo for ClearDemo {
    fn setup(&mut self, harness: &mut DemoHarness) -> Result<(), DemoError> {
        let context = harness.vulkan_context();
        let swapchain = harness.vulkan_swapchain();
        let device = &context.device;

        unsafe {
            let pool_info =
                vk::CommandPoolCreateInfo::builder().queue_family_index(context.queue_family_index);
            self.command_pool = device
                .create_command_pool(&pool_info, None)
                .map_err(DemoError::Api)?;

            let alloc_info = vk::CommandBufferAllocateInfo::builder()
                .command_pool(self.command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(swapchain.image_count);
            self.command_buffers = device
                .allocate_command_buffers(&alloc_info)
                .map_err(DemoError::Api)?;

            for (&command_buffer, image) in self.command_buffers.iter().zip(&swapchain.images) {
                record_clear(device, command_buffer, image.image(), self.clear_color)?;
            }

            let semaphore_info = vk::SemaphoreCreateInfo::builder();
            self.image_available = device
                .create_semaphore(&semaphore_info, None)
                .map_err(DemoError::Api)?;
            self.render_finished = device
                .create_semaphore(&semaphore_info, None)
                .map_err(DemoError::Api)?;
        }

        log::info!(
            "clear demo ready ({} swapchain images, {:?})",
            swapchain.image_count,
            swapchain.format
        );
        Ok(())
    }

    fn draw_frame(&mut self, harness: &mut DemoHarness) -> Result<(), DemoError> {
        let context = harness.vulkan_context();
        let swapchain = harness.vulkan_swapchain();

        unsafe {
            let (image_index, _suboptimal) = swapchain
                .loader
                .acquire_next_image(
                    swapchain.swapchain,
                    u64::MAX,
                    self.image_available,
                    vk::Fence::null(),
                )
                .map_err(DemoError::Api)?;

            let wait_semaphores = [self.image_available];
            let wait_stages = [vk::PipelineStageFlags::TRANSFER];
            let command_buffers = [self.command_buffers[image_index as usize]];
            let signal_semaphores = [self.render_finished];
            let submit_info = vk::SubmitInfo::builder()
                .wait_semaphores(&wait_semaphores)
                .wait_dst_stage_mask(&wait_stages)
                .command_buffers(&command_buffers)
                .signal_semaphores(&signal_semaphores)
                .build();
            context
                .device
                .queue_submit(context.queue, &[submit_info], vk::Fence::null())
                .map_err(DemoError::Api)?;

            let swapchains = [swapchain.swapchain];
            let image_indices = [image_index];
            let present_info = vk::PresentInfoKHR::builder()
                .wait_semaphores(&signal_semaphores)
                .swapchains(&swapchains)
                .image_indices(&image_indices);
            swapchain
                .loader
                .queue_present(context.queue, &present_info)
                .map_err(DemoError::Api)?;

            // Coarse pacing: the command buffers are reused next frame, so
            // wait for this one to retire before returning.
            context
                .device
                .queue_wait_idle(context.queue)
                .map_err(DemoError::Api)?;
        }

        self.frames += 1;
        if self.max_frames > 0 && self.frames >= self.max_frames {
            log::info!("frame limit reached ({} frames), quitting", self.frames);
            harness.set_should_quit();
        }
        Ok(())
    }

    fn handle_key(&mut self, _harness: &mut DemoHarness, key: KeyCode) {
        if key == KeyCode::Space {
            log::info!("{} frames presented so far", self.frames);
        }
    }

    fn teardown(&mut self, harness: &mut DemoHarness) {
        let context = harness.vulkan_context();
        unsafe {
            let _ = context.device.device_wait_idle();
            if self.render_finished != vk::Semaphore::null() {
                context.device.destroy_semaphore(self.render_finished, None);
            }
            if self.image_available != vk::Semaphore::null() {
                context.device.destroy_semaphore(self.image_available, None);
            }
            if self.command_pool != vk::CommandPool::null() {
                context.device.destroy_command_pool(self.command_pool, None);
            }
        }
        self.command_buffers.clear();
        self.render_finished = vk::Semaphore::null();
        self.image_available = vk::Semaphore::null();
        self.command_pool = vk::CommandPool::null();
        log::info!("clear demo tore down after {} frames", self.frames);
    }
}

fn main() {
    logging::init_with_level(log::LevelFilter::Info);

    let config = match ClearDemoConfig::load_from_file("clear_demo.toml") {
        Ok(config) => config,
        Err(ConfigError::Io(_)) => ClearDemoConfig::default(),
        Err(error) => {
            log::error!("failed to load clear_demo.toml: {error}");
            std::process::exit(1);
        }
    };

    let headless = config.headless || std::env::args().any(|arg| arg == "--headless");
    let platform_kind = if headless {
        PlatformKind::Headless
    } else {
        PlatformKind::Glfw
    };
    let instance_params = if config.enable_validation {
        InstanceParams::default()
    } else {
        InstanceParams::bare()
    };
    let max_frames = if headless && config.max_frames == 0 {
        HEADLESS_DEFAULT_FRAME_LIMIT
    } else {
        config.max_frames
    };

    let mut harness = match DemoHarness::new(config.window.clone(), instance_params, platform_kind)
    {
        Ok(harness) => harness,
        Err(error) => {
            log::error!("failed to initialize the demo harness: {error}");
            std::process::exit(1);
        }
    };

    let mut demo = ClearDemo::new(config.clear_color, max_frames);
    let result = harness.run(&mut demo);
    harness.shutdown();

    if let Err(error) = result {
        log::error!("demo failed: {error}");
        std::process::exit(1);
    }
}
