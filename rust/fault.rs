//! The two ways [`mylib`](crate) can fail on purpose.

use crate::{bridge::ERROR_CLASS, callstack::Callstack, config, Result};
use jni::JNIEnv;
use log::Level;
use std::process;

/// Message of the `java.lang.Error` left pending by [`throw_exception()`].
pub const THROW_MESSAGE: &str = "Exception thrown from native code";

/// Log the crash site and abort the process.
pub fn boom() -> ! {
    let config = config::current();
    log::error!(target: config.tag(), "boom() called, aborting");

    let callstack = Callstack::capture(0, config.callstack_limit());
    callstack
        .format(config.callstack_style(), 0, callstack.len())
        .log(config.tag(), Level::Error);

    process::abort()
}

/// Leave a `java.lang.Error` with [`THROW_MESSAGE`] pending. The caller
/// must return to the JVM without making further JNI calls for the error
/// to reach Java.
///
/// # Arguments
///
/// * `env` - Java environment to use.
pub fn throw_exception<'a: 'b, 'b>(env: &'b JNIEnv<'a>) -> Result<()> {
    let config = config::current();
    log::debug!(target: config.tag(), "throwing {}: {}", ERROR_CLASS, THROW_MESSAGE);
    Callstack::capture(0, config.callstack_limit())
        .tiny()
        .log(config.tag(), Level::Debug);

    env.throw_new(ERROR_CLASS, THROW_MESSAGE)?;
    Ok(())
}
