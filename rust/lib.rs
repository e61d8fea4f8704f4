use jni::JNIEnv;

pub mod bridge;
pub mod callstack;
pub mod config;
pub mod error;
pub mod exports;
pub mod fault;
pub mod log;


pub use config::Config;
pub use error::{Error, Result};

/// Initialize [`mylib`](crate). This installs `config` (unless one is
/// already installed) and the Android logger implementation. Safe to call
/// more than once.
///
/// # Arguments
///
/// * `env` - Java environment to use.
/// * `config` - Configuration to install.
pub fn init<'a: 'b, 'b>(env: &'b JNIEnv<'a>, config: Config) -> Result<()> {
    let config = config::install(config);
    log::init(env, config)?;
    Ok(())
}
