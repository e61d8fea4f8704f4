use thiserror::Error;

/// Result alias used across [`mylib`](crate).
pub type Result<T> = std::result::Result<T, Error>;

/// Failures inside the native library.
#[derive(Debug, Error)]
pub enum Error {
    /// A JNI call failed. A Java exception may be pending.
    #[error("JNI error: {0}")]
    Jni(#[from] jni::errors::Error),
    /// Native code panicked.
    #[error("native panic: {0}")]
    Panic(String),
}

impl Error {
    /// Whether the JVM already has an exception pending for this failure.
    pub fn is_java_exception(&self) -> bool {
        matches!(self, Error::Jni(jni::errors::Error::JavaException))
    }
}
