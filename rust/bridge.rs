use crate::{config, error::Error, Result};
use jni::JNIEnv;
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
};

/// Class thrown for every native failure.
pub const ERROR_CLASS: &str = "java/lang/Error";

/// Throw a `java.lang.Error` carrying `msg`. Failure to throw is logged, as
/// there is nobody left to report it to.
///
/// # Arguments
///
/// * `env` - Java environment to use.
/// * `msg` - Message returned by `getMessage()`.
pub fn throw_error<'a: 'b, 'b>(env: &'b JNIEnv<'a>, msg: &str) {
    if let Err(e) = env.throw_new(ERROR_CLASS, msg) {
        log::error!(target: config::current().tag(), "failed to throw {}: {}", ERROR_CLASS, e);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "native panic".to_string()
    }
}

/// Run the body of a JNI entry point. Panics never unwind into the JVM:
/// they, and any [`Error`] that didn't already leave a Java exception
/// pending, come back to the caller as `java.lang.Error`.
///
/// # Arguments
///
/// * `env` - Java environment to use.
/// * `name` - Name of the Java method, for logging.
/// * `f` - Body of the entry point.
pub fn guard<'a: 'b, 'b>(env: &'b JNIEnv<'a>, name: &str, f: impl FnOnce() -> Result<()>) {
    let tag = config::current().tag();
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            log::error!(target: tag, "{}() failed: {}", name, err);
            if !err.is_java_exception() && !env.exception_check().unwrap_or(false) {
                throw_error(env, &err.to_string());
            }
        }
        Err(payload) => {
            let msg = panic_message(&*payload);
            log::error!(target: tag, "{}() failed: {}", name, Error::Panic(msg.clone()));
            let _ = env.exception_clear();
            throw_error(env, &msg);
        }
    }
}
