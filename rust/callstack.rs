//! Native call stack capture and symbolization.
//!
//! Stacks are walked and function names resolved with [`backtrace`], which
//! reads the full symbol table and debug info rather than just the exported
//! symbols. The module name comes from `dladdr()`, falling back to
//! `/proc/self/maps`.

use libc::c_void;
use log::Level;
use once_cell::sync::Lazy;
use std::{
    cmp::Ordering,
    ffi::CStr,
    fmt::{self, Display, Formatter},
    mem,
    path::Path,
};

/// Maximum number of frames a [`Callstack`] holds.
pub const MAX_STACK_LIMIT: usize = 32;

// Frames belonging to the unwinder itself, above `capture()`.
const UNWINDER_FRAMES: usize = 16;

/// How a [`Callstack`] entry is rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Style {
    /// `[address] module function + offset`, plus ` : file(line)` when debug
    /// info is available.
    Wide,
    /// Function name, or `[address]` when it can't be resolved.
    Tiny,
}

/// A snapshot of instruction addresses on the current thread's stack.
#[derive(Clone)]
pub struct Callstack {
    frames: [usize; MAX_STACK_LIMIT],
    // Start of the function containing each frame, 0 if unknown.
    starts: [usize; MAX_STACK_LIMIT],
    len: usize,
}

impl Callstack {
    /// Capture the calling thread's stack.
    ///
    /// # Arguments
    ///
    /// * `ignore` - Number of frames above the caller of `capture()` to
    ///   skip.
    /// * `limit` - Maximum number of frames to keep. Clamped to
    ///   [`MAX_STACK_LIMIT`].
    #[inline(never)]
    pub fn capture(ignore: usize, limit: usize) -> Self {
        let mut frames = [0; MAX_STACK_LIMIT];
        let mut starts = [0; MAX_STACK_LIMIT];
        let limit = limit.min(MAX_STACK_LIMIT);
        if limit == 0 {
            return Self {
                frames,
                starts,
                len: 0,
            };
        }

        // Walk a little further than needed, then drop everything up to and
        // including our own frame. The number of frames the unwinder adds
        // on top differs between platforms.
        let this = Self::capture as *const () as usize;
        let wanted = UNWINDER_FRAMES + 1 + ignore.saturating_add(limit);
        let mut walked: Vec<(usize, usize)> = Vec::with_capacity(wanted.min(256));
        backtrace::trace(|frame| {
            let ip = frame.ip() as usize;
            if ip != 0 {
                walked.push((ip, frame.symbol_address() as usize));
            }
            walked.len() < wanted
        });

        let start = walked
            .iter()
            .position(|&(_, symbol)| symbol == this)
            .map_or(0, |own| own + 1)
            .saturating_add(ignore);
        let mut len = 0;
        for &(ip, symbol) in walked.iter().skip(start).take(limit) {
            frames[len] = ip;
            starts[len] = symbol;
            len += 1;
        }
        Self {
            frames,
            starts,
            len,
        }
    }

    #[cfg(test)]
    pub(crate) fn from_frames(addresses: &[usize]) -> Self {
        let mut frames = [0; MAX_STACK_LIMIT];
        let len = addresses.len().min(MAX_STACK_LIMIT);
        frames[..len].copy_from_slice(&addresses[..len]);
        Self {
            frames,
            starts: [0; MAX_STACK_LIMIT],
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Address of frame `index`, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<usize> {
        self.frames().get(index).copied()
    }

    pub fn frames(&self) -> &[usize] {
        &self.frames[..self.len]
    }

    /// Render frames `from..from + count` in the given style.
    pub fn format(&self, style: Style, from: usize, count: usize) -> CallstackFormat<'_> {
        CallstackFormat {
            callstack: self,
            style,
            from,
            end: self.len.min(from.saturating_add(count)),
        }
    }

    /// Render every frame in [`Style::Wide`].
    pub fn wide(&self) -> CallstackFormat<'_> {
        self.format(Style::Wide, 0, MAX_STACK_LIMIT)
    }

    /// Render every frame in [`Style::Tiny`].
    pub fn tiny(&self) -> CallstackFormat<'_> {
        self.format(Style::Tiny, 0, MAX_STACK_LIMIT)
    }
}

impl fmt::Debug for Callstack {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.frames().iter().map(|a| format!("{:#x}", a)))
            .finish()
    }
}

impl PartialEq for Callstack {
    fn eq(&self, other: &Self) -> bool {
        self.frames() == other.frames()
    }
}

impl Eq for Callstack {}

impl Ord for Callstack {
    fn cmp(&self, other: &Self) -> Ordering {
        self.len
            .cmp(&other.len)
            .then_with(|| self.frames().cmp(other.frames()))
    }
}

impl PartialOrd for Callstack {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A view of a [`Callstack`] that renders one entry per line. Every entry,
/// including the first, is preceded by a newline.
pub struct CallstackFormat<'a> {
    callstack: &'a Callstack,
    style: Style,
    from: usize,
    end: usize,
}

impl<'a> CallstackFormat<'a> {
    fn entries(&self) -> impl Iterator<Item = Entry> + '_ {
        let style = self.style;
        let callstack = self.callstack;
        (self.from..self.end).map(move |i| Entry {
            address: callstack.frames[i],
            start: callstack.starts[i],
            style,
        })
    }

    /// Log each entry as its own record.
    ///
    /// # Arguments
    ///
    /// * `target` - Log target (the Android tag).
    /// * `level` - Level to log at.
    pub fn log(&self, target: &str, level: Level) {
        for entry in self.entries() {
            log::log!(target: target, level, "{}", entry);
        }
    }
}

impl<'a> Display for CallstackFormat<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for entry in self.entries() {
            write!(f, "\n{}", entry)?;
        }
        Ok(())
    }
}

struct Entry {
    address: usize,
    start: usize,
    style: Style,
}

impl Display for Entry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let symbol = Symbol::resolve(self.address, self.start);
        match self.style {
            Style::Tiny => match &symbol.function {
                Some(function) => f.write_str(function),
                None => write_address(f, self.address),
            },
            Style::Wide => {
                write_address(f, self.address)?;
                write!(
                    f,
                    " {:<16} {} + {:#x}",
                    symbol.module.as_deref().unwrap_or("<unknown>"),
                    symbol.function.as_deref().unwrap_or("???"),
                    symbol.offset
                )?;
                if let (Some(file), Some(line)) = (&symbol.file, symbol.line) {
                    write!(f, " : {}({})", file, line)?;
                }
                Ok(())
            }
        }
    }
}

fn write_address(f: &mut Formatter<'_>, address: usize) -> fmt::Result {
    write!(
        f,
        "[{:0width$x}]",
        address,
        width = mem::size_of::<usize>() * 2
    )
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Symbol {
    module: Option<String>,
    function: Option<String>,
    offset: usize,
    file: Option<String>,
    line: Option<u32>,
}

impl Symbol {
    /// `start` is the beginning of the enclosing function as reported by
    /// the unwinder, or 0.
    fn resolve(address: usize, start: usize) -> Self {
        let mut symbol = Self::default();
        let mut start = if start == 0 { None } else { Some(start) };

        // Inlined frames are reported innermost first.
        backtrace::resolve(address as *mut c_void, |resolved| {
            if symbol.function.is_none() {
                symbol.function = resolved.name().map(|name| format!("{:#}", name));
            }
            if start.is_none() {
                start = resolved.addr().map(|addr| addr as usize);
            }
            if symbol.file.is_none() {
                symbol.file = resolved.filename().map(file_name_of);
                symbol.line = resolved.lineno();
            }
        });

        // Only the module is taken from dladdr(): its symbol is merely the
        // nearest exported one, which for a cdylib is one of the JNI entry
        // points.
        let mut info: libc::Dl_info = unsafe { mem::zeroed() };
        if unsafe { libc::dladdr(address as *const c_void, &mut info) } != 0 {
            symbol.module =
                unsafe { c_str(info.dli_fname) }.map(|p| file_name_from_path(&p).to_string());
            if start.is_none() && !info.dli_fbase.is_null() {
                start = Some(info.dli_fbase as usize);
            }
        }

        if symbol.module.is_none() {
            symbol.module = module_from_maps(address).map(|m| file_name_from_path(m).to_string());
        }

        symbol.offset = start.map_or(0, |start| address.wrapping_sub(start));
        symbol
    }
}

fn file_name_of(path: &Path) -> String {
    file_name_from_path(&path.to_string_lossy()).to_string()
}

unsafe fn c_str(ptr: *const libc::c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}

/// Strip directories from `path`. A trailing separator does not start a new
/// component, so `"/a/b/"` yields `"b/"`.
pub fn file_name_from_path(path: &str) -> &str {
    let bytes = path.as_bytes();
    let mut start = 0;
    for (i, &b) in bytes.iter().enumerate() {
        if (b == b'/' || b == b'\\') && i + 1 < bytes.len() {
            start = i + 1;
        }
    }
    &path[start..]
}

/// An executable mapping from `/proc/self/maps`.
#[derive(Debug, PartialEq, Eq)]
struct Region {
    start: usize,
    end: usize,
    module: String,
}

/// Parse one `/proc/<pid>/maps` line:
///
/// ```text
/// address           perms offset  dev   inode   pathname
/// 08048000-08056000 r-xp 00000000 03:0c 64593   /usr/sbin/gpm
/// ```
///
/// Only executable mappings that carry a pathname are kept.
fn parse_maps_line(line: &str) -> Option<Region> {
    let mut fields = line.split_whitespace();
    let range = fields.next()?;
    let perms = fields.next()?;
    let _offset = fields.next()?;
    let _dev = fields.next()?;
    let _inode = fields.next()?;
    let module = fields.collect::<Vec<_>>().join(" ");

    if perms.as_bytes().get(2) != Some(&b'x') || module.is_empty() {
        return None;
    }

    let (start, end) = range.split_at(range.find('-')?);
    Some(Region {
        start: usize::from_str_radix(start, 16).ok()?,
        end: usize::from_str_radix(&end[1..], 16).ok()?,
        module,
    })
}

static MAPS: Lazy<Vec<Region>> = Lazy::new(|| {
    std::fs::read_to_string("/proc/self/maps")
        .map(|maps| maps.lines().filter_map(parse_maps_line).collect())
        .unwrap_or_default()
});

fn module_from_maps(address: usize) -> Option<&'static str> {
    MAPS.iter()
        .find(|region| region.start <= address && address < region.end)
        .map(|region| region.module.as_str())
}
