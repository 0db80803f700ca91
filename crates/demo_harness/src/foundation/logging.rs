//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system from the `RUST_LOG` environment variable
pub fn init() {
    env_logger::init();
}

/// Initialize the logging system with an explicit default level
///
/// `RUST_LOG` still takes precedence when set, so a binary can pick a
/// sensible default without locking users out of finer filtering.
pub fn init_with_level(level: log::LevelFilter) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.as_str()))
        .init();
}
