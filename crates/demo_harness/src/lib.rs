//! # Demo Harness
//!
//! A Vulkan bootstrap library: creates the instance, connects to the
//! platform's window system, selects a device and queues, negotiates a
//! presentable swapchain, and owns the teardown sequence for all of it. A
//! hosted demo receives a ready-to-use context without knowing anything
//! platform-specific.
//!
//! ## Features
//!
//! - **Ordered lifecycle**: instance → surface → device → swapchain up,
//!   exact reverse down, idempotent shutdown
//! - **Platform backends**: GLFW desktop and headless/offscreen behind one
//!   trait, selected by a factory at construction time
//! - **Swapchain ownership adapter**: presentable images get managed
//!   identities without a destroy path
//! - **Debug redirection**: validation-layer reports route into the harness
//!   through the messenger's user pointer
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use demo_harness::prelude::*;
//!
//! struct MyDemo;
//!
//! impl Demo for MyDemo {
//!     fn draw_frame(&mut self, harness: &mut DemoHarness) -> Result<(), DemoError> {
//!         // Record and present a frame here.
//!         harness.set_should_quit();
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut harness = DemoHarness::new(
//!         WindowParams::default(),
//!         InstanceParams::default(),
//!         PlatformKind::Glfw,
//!     )?;
//!     let mut demo = MyDemo;
//!     harness.run(&mut demo)?;
//!     harness.shutdown();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod demo;
pub mod foundation;
pub mod params;
pub mod platform;
pub mod vulkan;

mod harness;

pub use harness::{DemoHarness, HarnessError, QuitFlag};

/// Common imports for harness users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError},
        demo::{Demo, DemoError, KeyCode},
        params::{InstanceParams, WindowParams},
        platform::PlatformKind,
        vulkan::{SwapchainImage, VulkanContext, VulkanSwapchain},
        DemoHarness, HarnessError,
    };
}
