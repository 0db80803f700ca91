//! Demo trait and lifecycle hooks for hosted consumers

use thiserror::Error;

use crate::harness::DemoHarness;

/// A hosted rendering demo
///
/// The harness treats the demo as opaque: it hands over a fully initialized
/// context and invokes these hooks from the platform run loop. The demo
/// receives value copies of the Vulkan handles through the harness accessors
/// and owns none of them.
pub trait Demo {
    /// Called once before the first frame, after the harness is fully built
    fn setup(&mut self, _harness: &mut DemoHarness) -> Result<(), DemoError> {
        Ok(())
    }

    /// Called every run-loop iteration
    fn draw_frame(&mut self, harness: &mut DemoHarness) -> Result<(), DemoError>;

    /// Key press forwarded by desktop backends
    ///
    /// Escape is consumed by the backend itself to request quit and is never
    /// forwarded here.
    fn handle_key(&mut self, _harness: &mut DemoHarness, _key: KeyCode) {}

    /// Called after the run loop exits, before control returns to the caller
    fn teardown(&mut self, _harness: &mut DemoHarness) {}
}

/// Demo-level errors
#[derive(Error, Debug)]
pub enum DemoError {
    /// Vulkan API error surfaced while recording or presenting
    #[error("Vulkan API error: {0:?}")]
    Api(ash::vk::Result),

    /// Rendering failure with context
    #[error("render error: {0}")]
    Render(String),

    /// Custom demo error
    #[error("{0}")]
    Custom(String),
}

/// Backend-agnostic key codes forwarded to demos
///
/// Only the keys the backends actually report; everything else maps to
/// [`KeyCode::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// Space bar
    Space,
    /// Enter / Return
    Enter,
    /// W key
    W,
    /// A key
    A,
    /// S key
    S,
    /// D key
    D,
    /// Q key
    Q,
    /// E key
    E,
    /// Any key without a dedicated code
    Unknown,
}
