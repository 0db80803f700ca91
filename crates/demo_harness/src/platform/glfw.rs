//! GLFW desktop backend
//!
//! Window creation uses GLFW's native Vulkan support: the client API is set
//! to `NoApi` (no OpenGL context), required instance extensions come from
//! `get_required_instance_extensions`, and the surface is created through
//! `create_window_surface`. The run loop polls events each iteration; window
//! close and Escape request quit, other key presses are forwarded to the
//! demo.

use ash::vk;

use super::{PlatformError, WindowSystem};
use crate::demo::{Demo, KeyCode};
use crate::harness::{DemoHarness, HarnessError};
use crate::params::{InstanceParams, WindowParams};

/// GLFW-backed window system
pub struct GlfwWindowSystem {
    glfw: Option<glfw::Glfw>,
    window: Option<glfw::PWindow>,
    events: Option<glfw::GlfwReceiver<(f64, glfw::WindowEvent)>>,
}

impl GlfwWindowSystem {
    /// Create the backend; nothing is initialized until the harness asks
    pub fn new() -> Self {
        Self {
            glfw: None,
            window: None,
            events: None,
        }
    }
}

impl Default for GlfwWindowSystem {
    fn default() -> Self {
        Self::new()
    }
}

fn not_initialized() -> PlatformError {
    PlatformError::InitializationFailed("GLFW was not initialized".to_string())
}

impl WindowSystem for GlfwWindowSystem {
    fn init_window_system(&mut self) -> Result<(), PlatformError> {
        let glfw = glfw::init(glfw::fail_on_errors)
            .map_err(|e| PlatformError::InitializationFailed(format!("GLFW init: {e:?}")))?;
        log::debug!("GLFW initialized");
        self.glfw = Some(glfw);
        Ok(())
    }

    fn append_instance_extension_names(
        &mut self,
        params: &mut InstanceParams,
    ) -> Result<(), PlatformError> {
        let glfw = self.glfw.as_ref().ok_or_else(not_initialized)?;
        let required = glfw.get_required_instance_extensions().ok_or_else(|| {
            PlatformError::ExtensionQueryFailed(
                "GLFW reports no Vulkan presentation support".to_string(),
            )
        })?;
        log::debug!("GLFW requires instance extensions: {:?}", required);
        params.extension_names.extend(required);
        Ok(())
    }

    fn create_window_and_surface(
        &mut self,
        window_params: &WindowParams,
        _entry: &ash::Entry,
        instance: &ash::Instance,
    ) -> Result<vk::SurfaceKHR, PlatformError> {
        let glfw = self.glfw.as_mut().ok_or_else(not_initialized)?;

        // No OpenGL context; presentation goes through Vulkan. The window is
        // fixed-size because the harness has no swapchain recreation path.
        glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
        glfw.window_hint(glfw::WindowHint::Resizable(false));

        let created = if window_params.use_fullscreen {
            glfw.with_primary_monitor(|glfw, monitor| {
                let mode = monitor.map_or(glfw::WindowMode::Windowed, |m| {
                    glfw::WindowMode::FullScreen(m)
                });
                glfw.create_window(
                    window_params.width,
                    window_params.height,
                    &window_params.window_name,
                    mode,
                )
            })
        } else {
            glfw.create_window(
                window_params.width,
                window_params.height,
                &window_params.window_name,
                glfw::WindowMode::Windowed,
            )
        };

        let (mut window, events) = created.ok_or_else(|| {
            PlatformError::WindowCreationFailed(format!(
                "GLFW refused a {}x{} window",
                window_params.width, window_params.height
            ))
        })?;

        window.set_key_polling(true);
        window.set_close_polling(true);

        let mut surface = vk::SurfaceKHR::null();
        let result = window.create_window_surface(instance.handle(), std::ptr::null(), &mut surface);
        if result != vk::Result::SUCCESS {
            return Err(PlatformError::SurfaceCreationFailed(format!("{result:?}")));
        }

        self.window = Some(window);
        self.events = Some(events);
        Ok(surface)
    }

    fn shutdown_window_system(&mut self) {
        self.events = None;
        self.window = None;
        self.glfw = None;
        log::debug!("GLFW shut down");
    }

    fn run(
        &mut self,
        harness: &mut DemoHarness,
        demo: &mut dyn Demo,
    ) -> Result<(), HarnessError> {
        let glfw = self.glfw.as_mut().ok_or_else(not_initialized)?;
        let window = self.window.as_ref().ok_or_else(not_initialized)?;
        let events = self.events.as_ref().ok_or_else(not_initialized)?;

        log::info!("entering run loop");
        while !harness.should_quit() {
            glfw.poll_events();
            for (_, event) in glfw::flush_messages(events) {
                match event {
                    glfw::WindowEvent::Close => harness.set_should_quit(),
                    glfw::WindowEvent::Key(glfw::Key::Escape, _, glfw::Action::Press, _) => {
                        harness.set_should_quit();
                    }
                    glfw::WindowEvent::Key(key, _, glfw::Action::Press, _) => {
                        demo.handle_key(harness, map_key(key));
                    }
                    _ => {}
                }
            }
            if window.should_close() {
                harness.set_should_quit();
            }
            if harness.should_quit() {
                break;
            }
            demo.draw_frame(harness)?;
        }
        log::info!("run loop finished");
        Ok(())
    }
}

fn map_key(key: glfw::Key) -> KeyCode {
    match key {
        glfw::Key::Space => KeyCode::Space,
        glfw::Key::Enter => KeyCode::Enter,
        glfw::Key::W => KeyCode::W,
        glfw::Key::A => KeyCode::A,
        glfw::Key::S => KeyCode::S,
        glfw::Key::D => KeyCode::D,
        glfw::Key::Q => KeyCode::Q,
        glfw::Key::E => KeyCode::E,
        _ => KeyCode::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_keys_map_to_their_codes() {
        assert_eq!(map_key(glfw::Key::Space), KeyCode::Space);
        assert_eq!(map_key(glfw::Key::W), KeyCode::W);
        assert_eq!(map_key(glfw::Key::Enter), KeyCode::Enter);
    }

    #[test]
    fn unmapped_keys_collapse_to_unknown() {
        assert_eq!(map_key(glfw::Key::F12), KeyCode::Unknown);
        assert_eq!(map_key(glfw::Key::LeftShift), KeyCode::Unknown);
    }
}
