use crate::config::Config;
use jni::{errors::Result, objects::JString, JNIEnv, JavaVM};
use log::{Level, LevelFilter, Log, Metadata, Record};
use once_cell::sync::OnceCell;

/// Calls `android.util.Log.println()`.
///
/// # Arguments
///
/// * `env` - Java environment to use.
/// * `priority` - Logging priority to use.
/// * `tag` - Tag to use for logging.
/// * `msg` - Message to log.
pub fn println<'a: 'b, 'b>(
    env: &'b JNIEnv<'a>,
    priority: i32,
    tag: JString<'a>,
    msg: JString<'a>,
) -> Result<()> {
    env.call_static_method(
        "android/util/Log",
        "println",
        "(ILjava/lang/String;Ljava/lang/String;)I",
        &[priority.into(), tag.into(), msg.into()],
    )?;
    Ok(())
}

/// Calls `android.util.Log.isLoggable()`.
///
/// # Arguments
///
/// * `env` - Java environment to use.
/// * `tag` - Tag to use for logging.
/// * `level` - Level to check.
pub fn is_loggable<'a: 'b, 'b>(env: &'b JNIEnv<'a>, tag: JString<'a>, level: i32) -> Result<bool> {
    env.call_static_method(
        "android/util/Log",
        "isLoggable",
        "(Ljava/lang/String;I)Z",
        &[tag.into(), level.into()],
    )?
    .z()
}

/// `android.util.Log.ASSERT`
pub const ASSERT: i32 = 7;

/// `android.util.Log.DEBUG`
pub const DEBUG: i32 = 3;

/// `android.util.Log.ERROR`
pub const ERROR: i32 = 6;

/// `android.util.Log.INFO`
pub const INFO: i32 = 4;

/// `android.util.Log.VERBOSE`
pub const VERBOSE: i32 = 2;

/// `android.util.Log.WARN`
pub const WARN: i32 = 5;

/// Convert a [`Level`] into a logging priority for `android.util.Log`.
pub fn log_level_to_priority(level: Level) -> i32 {
    match level {
        Level::Debug => DEBUG,
        Level::Error => ERROR,
        Level::Info => INFO,
        Level::Trace => VERBOSE,
        Level::Warn => WARN,
    }
}

/// Longest tag `isLoggable()` accepts before Android 7.0. Newer releases
/// take any length.
const MAX_TAG_LEN: usize = 23;

fn truncated_tag(target: &str) -> &str {
    match target.char_indices().nth(MAX_TAG_LEN) {
        Some((end, _)) => &target[..end],
        None => target,
    }
}

/// Create the tag for `target` and check it with `isLoggable()`. The full
/// target is tried first; only if `isLoggable()` rejects it (older
/// releases throw `IllegalArgumentException` for long tags) is it cut to
/// [`MAX_TAG_LEN`] characters.
fn loggable_tag<'a: 'b, 'b>(
    env: &'b JNIEnv<'a>,
    target: &str,
    level: i32,
) -> Result<(JString<'a>, bool)> {
    let tag = env.new_string(target)?;
    match is_loggable(env, tag, level) {
        Err(jni::errors::Error::JavaException) if truncated_tag(target) != target => {
            env.exception_clear()?;
            env.delete_local_ref(tag.into())?;
            let tag = env.new_string(truncated_tag(target))?;
            Ok((tag, is_loggable(env, tag, level)?))
        }
        result => Ok((tag, result?)),
    }
}

struct AndroidLog(JavaVM);

struct DisableLogGuard(LevelFilter);

impl DisableLogGuard {
    pub fn new() -> Self {
        let old = log::max_level();
        log::set_max_level(LevelFilter::Off);
        Self(old)
    }
}

impl Drop for DisableLogGuard {
    fn drop(&mut self) {
        log::set_max_level(self.0);
    }
}

impl AndroidLog {
    /// Runs `f` with any pending Java exception set aside, so that the
    /// `android.util.Log` calls don't trip over it. The exception is
    /// rethrown afterwards.
    fn with_env<T>(&self, f: impl FnOnce(&JNIEnv) -> Result<T>) -> Option<T> {
        // Threads that were never attached to the VM have nowhere to log to.
        let env = self.0.get_env().ok()?;

        let ex = if env.exception_check().ok()? {
            let ex = env.exception_occurred().ok()?;
            env.exception_clear().ok()?;
            Some(ex)
        } else {
            None
        };

        let result = f(&env);
        if result.is_err() && env.exception_check().unwrap_or(false) {
            let _ = env.exception_clear();
        }

        if let Some(ex) = ex {
            let _ = env.throw(ex);
        }

        result.ok()
    }
}

impl Log for AndroidLog {
    fn enabled(&self, metadata: &Metadata) -> bool {
        let _guard = DisableLogGuard::new();

        self.with_env(|env| {
            let level = log_level_to_priority(metadata.level());
            let (tag, loggable) = loggable_tag(env, metadata.target(), level)?;
            let _tag_auto_local = env.auto_local(tag);
            Ok(loggable)
        })
        .unwrap_or(false)
    }

    fn log(&self, record: &Record) {
        let _guard = DisableLogGuard::new();

        self.with_env(|env| {
            let level = log_level_to_priority(record.level());
            let (tag, loggable) = loggable_tag(env, record.target(), level)?;
            let _tag_auto_local = env.auto_local(tag);

            if loggable {
                let msg = env.new_string(format!("{}", record.args()))?;
                let _msg_auto_local = env.auto_local(msg);
                println(env, level, tag, msg)?;
            }
            Ok(())
        });
    }

    fn flush(&self) {}
}

static ANDROID_LOG: OnceCell<AndroidLog> = OnceCell::new();

/// Make `logger` the process logger. The level is only applied when the
/// logger was actually installed, so a logger set up by someone else keeps
/// its own level.
fn install(logger: &'static dyn Log, level: LevelFilter) -> bool {
    log::set_logger(logger)
        .map(|()| log::set_max_level(level))
        .is_ok()
}

/// Install the `android.util.Log` backed logger. Only the first call
/// installs anything.
pub(crate) fn init<'a: 'b, 'b>(env: &'b JNIEnv<'a>, config: &Config) -> Result<()> {
    let vm = env.get_java_vm()?;
    let log = ANDROID_LOG.get_or_init(|| AndroidLog(vm));
    install(log, config.max_level());
    Ok(())
}
