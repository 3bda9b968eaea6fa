//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system
pub fn init() {
    env_logger::init();
}

/// Initialize the logging system with a default filter (e.g. `"pixel_scene=debug"`)
///
/// `RUST_LOG` still takes precedence when it is set.
pub fn init_with_filter(filter: &str) {
    let env = env_logger::Env::default().default_filter_or(filter);
    // A second initialisation (tests, embedding applications) is not an error for us
    let _ = env_logger::Builder::from_env(env).try_init();
}
