use crate::callstack::{Style, MAX_STACK_LIMIT};
use log::LevelFilter;
use once_cell::sync::OnceCell;

/// Runtime settings for [`mylib`](crate).
///
/// Built with the `with_*` methods and installed with [`install()`]. The
/// first installed configuration stays in effect for the lifetime of the
/// process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    max_level: LevelFilter,
    tag: String,
    callstack_style: Style,
    callstack_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_level: LevelFilter::Trace,
            tag: "MyLib".to_string(),
            callstack_style: Style::Wide,
            callstack_limit: MAX_STACK_LIMIT,
        }
    }
}

impl Config {
    /// Most verbose level that reaches `android.util.Log`.
    pub fn with_max_level(mut self, level: LevelFilter) -> Self {
        self.max_level = level;
        self
    }

    /// Log tag used by the fault paths.
    pub fn with_tag<S: Into<String>>(mut self, tag: S) -> Self {
        self.tag = tag.into();
        self
    }

    /// Style used when `boom()` dumps the crash site.
    pub fn with_callstack_style(mut self, style: Style) -> Self {
        self.callstack_style = style;
        self
    }

    /// Number of frames captured. Clamped to [`MAX_STACK_LIMIT`].
    pub fn with_callstack_limit(mut self, limit: usize) -> Self {
        self.callstack_limit = limit.min(MAX_STACK_LIMIT);
        self
    }

    pub fn max_level(&self) -> LevelFilter {
        self.max_level
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn callstack_style(&self) -> Style {
        self.callstack_style
    }

    pub fn callstack_limit(&self) -> usize {
        self.callstack_limit
    }
}

static CONFIG: OnceCell<Config> = OnceCell::new();

/// Install `config` unless one is already installed. Returns whichever
/// configuration ended up in effect.
pub fn install(config: Config) -> &'static Config {
    CONFIG.get_or_init(|| config)
}

/// The installed configuration, or the default one.
pub fn current() -> &'static Config {
    CONFIG.get_or_init(Config::default)
}
