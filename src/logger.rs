//! Logging utilities with colored output and progress display.
//!
//! - `log!` macro for formatted terminal output with colored prefixes
//! - `ProgressLine` for single-line progress display with multiple counters
//! - `WatchStatus` for the per-category status block in watch mode
//!
//! ```ignore
//! log!("styles"; "compiled {}", name);
//!
//! let progress = ProgressLine::new("images", &[("compressed", 42)]);
//! progress.inc("compressed");
//! progress.finish();
//! ```

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::{
    io::{Write, stdout},
    sync::LazyLock,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

/// Global verbose flag (set by --verbose CLI argument)
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Set verbose mode globally
pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

/// Check if verbose mode is enabled
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

/// Active progress bar count (for log coordination)
static BAR_COUNT: AtomicUsize = AtomicUsize::new(0);

// ============================================================================
// Log Macro
// ============================================================================

/// Log a message with a colored module prefix
///
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a debug message (only shown when --verbose is enabled)
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Log a message with a colored module prefix
#[inline]
#[allow(clippy::cast_possible_truncation)] // Safe: bars count is always small
pub fn log(module: &str, message: &str) {
    let module_lower = module.to_ascii_lowercase();
    let prefix = colorize_prefix(module, &module_lower);

    let mut stdout = stdout().lock();

    let bar_count = BAR_COUNT.load(Ordering::SeqCst);
    if bar_count > 0 {
        execute!(stdout, cursor::MoveUp(bar_count as u16)).ok();
        execute!(stdout, Clear(ClearType::FromCursorDown)).ok();
    } else {
        execute!(stdout, Clear(ClearType::UntilNewLine)).ok();
    }

    writeln!(stdout, "{prefix} {message}").ok();
    STATUS_LINES.store(0, Ordering::SeqCst);

    if bar_count > 0 {
        for _ in 0..bar_count {
            writeln!(stdout).ok();
        }
    }

    stdout.flush().ok();
}

/// Apply color to a module prefix based on module type
#[inline]
fn colorize_prefix(module: &str, module_lower: &str) -> String {
    let prefix = format!("[{module}]");
    match module_lower {
        "serve" | "reload" => prefix.bright_blue().bold().to_string(),
        "watch" => prefix.bright_green().bold().to_string(),
        "remote" => prefix.bright_magenta().bold().to_string(),
        "error" => prefix.bright_red().bold().to_string(),
        _ => prefix.bright_yellow().bold().to_string(),
    }
}

// ============================================================================
// Watch Status (single-block status with overwrite)
// ============================================================================

/// Current UTC time formatted as HH:MM:SS
fn now() -> String {
    use std::time::SystemTime;
    let secs = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let hours = (secs / 3600) % 24;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Status block for watch mode, one entry per category.
///
/// Each report redraws the whole block in place, so a failed stylesheet
/// stays on screen while scripts keep rebuilding. Plain `log!` output
/// between two reports ends the block and the next report starts a new one.
pub struct WatchStatus {
    /// `(key, rendered entry)` in first-report order
    entries: Vec<(String, String)>,
}

/// Shared across the rebuild actors.
static WATCH_STATUS: LazyLock<Mutex<WatchStatus>> =
    LazyLock::new(|| Mutex::new(WatchStatus::new()));

/// Terminal lines the status block occupies right now; zero after a log line.
static STATUS_LINES: AtomicUsize = AtomicUsize::new(0);

impl WatchStatus {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Record a success for `key` (✓, green).
    pub fn success(&mut self, key: &str, message: &str) {
        self.set(key, format!("{} {message}", "✓".green()));
    }

    /// Record a failure for `key` (✗, red); `detail` goes underneath.
    pub fn error(&mut self, key: &str, summary: &str, detail: &str) {
        let mut entry = format!("{} {summary}", "✗".red());
        if !detail.is_empty() {
            entry.push('\n');
            entry.push_str(detail);
        }
        self.set(key, entry);
    }

    fn set(&mut self, key: &str, entry: String) {
        let entry = format!("{} {entry}", format!("[{}]", now()).dimmed());
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = entry,
            None => self.entries.push((key.to_string(), entry)),
        }
        self.redraw();
    }

    fn render(&self) -> String {
        self.entries
            .iter()
            .map(|(_, entry)| entry.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn redraw(&self) {
        let block = self.render();
        let mut stdout = stdout().lock();

        let previous = STATUS_LINES.load(Ordering::SeqCst);
        if previous > 0 {
            #[allow(clippy::cast_possible_truncation)]
            let lines = previous as u16;
            execute!(stdout, cursor::MoveUp(lines)).ok();
            execute!(stdout, Clear(ClearType::FromCursorDown)).ok();
        }

        writeln!(stdout, "{block}").ok();
        stdout.flush().ok();

        STATUS_LINES.store(Self::line_count(&block), Ordering::SeqCst);
    }

    fn line_count(message: &str) -> usize {
        message.matches('\n').count() + 1
    }
}

/// Global watch status: success for `key`
pub fn status_success(key: &str, message: &str) {
    WATCH_STATUS.lock().success(key, message);
}

/// Global watch status: error for `key`
pub fn status_error(key: &str, summary: &str, detail: &str) {
    WATCH_STATUS.lock().error(key, summary, detail);
}

// ============================================================================
// Progress Line (single-line counters)
// ============================================================================

/// Single-line progress display with multiple counters
///
/// Displays: `[images] compressed(12/40) cached(20/40)`
///
/// Counters update in place. Uses `try_lock` so worker threads never block
/// on the terminal; a skipped refresh is picked up by the next one.
pub struct ProgressLine {
    module: &'static str,
    counters: Vec<Counter>,
    lock: Mutex<()>,
}

struct Counter {
    name: &'static str,
    total: usize,
    current: AtomicUsize,
}

impl ProgressLine {
    /// Create a new progress display. Only counters with total > 0 are shown.
    pub fn new(module: &'static str, items: &[(&'static str, usize)]) -> Self {
        let counters: Vec<_> = items
            .iter()
            .filter(|(_, total)| *total > 0)
            .map(|(name, total)| Counter {
                name,
                total: *total,
                current: AtomicUsize::new(0),
            })
            .collect();

        BAR_COUNT.store(1, Ordering::SeqCst);

        let progress = Self {
            module,
            counters,
            lock: Mutex::new(()),
        };
        progress.display(false);
        progress
    }

    /// Increment the counter with the given name.
    #[inline]
    pub fn inc(&self, name: &str) {
        if let Some(counter) = self.counters.iter().find(|c| c.name == name) {
            counter.current.fetch_add(1, Ordering::Relaxed);
            if self.lock.try_lock().is_some() {
                self.display(false);
            }
        }
    }

    fn render(&self) -> String {
        self.counters
            .iter()
            .map(|c| format!("{}({}/{})", c.name, c.current.load(Ordering::Relaxed), c.total))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn display(&self, newline: bool) {
        let line = self.render();
        let prefix = colorize_prefix(self.module, self.module);

        let mut stdout = stdout().lock();
        execute!(
            stdout,
            cursor::MoveToColumn(0),
            Clear(ClearType::CurrentLine)
        )
        .ok();
        if newline {
            writeln!(stdout, "{prefix} {line}").ok();
        } else {
            write!(stdout, "{prefix} {line}").ok();
        }
        stdout.flush().ok();
    }

    /// Finish progress display, keep the final line.
    pub fn finish(self) {
        BAR_COUNT.store(0, Ordering::SeqCst);
        {
            let _guard = self.lock.lock();
            self.display(true);
        }
        std::mem::forget(self);
    }
}

impl Drop for ProgressLine {
    fn drop(&mut self) {
        BAR_COUNT.store(0, Ordering::SeqCst);

        let mut stdout = stdout().lock();
        execute!(
            stdout,
            cursor::MoveToColumn(0),
            Clear(ClearType::CurrentLine)
        )
        .ok();
        stdout.flush().ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_status_keeps_one_entry_per_key() {
        let mut status = WatchStatus::new();
        status.error("styles", "styles failed (app.scss)", "Undefined variable.");
        status.success("scripts", "scripts: 1 file written (app.js)");
        assert_eq!(status.entries.len(), 2);
        assert!(status.render().contains("Undefined variable."));

        status.success("styles", "styles: 1 file written (app.scss)");
        assert_eq!(status.entries.len(), 2);
        assert!(!status.render().contains("Undefined variable."));
        assert_eq!(status.entries[0].0, "styles");
    }

    #[test]
    fn test_line_count_multiline() {
        assert_eq!(WatchStatus::line_count("compiled app.scss"), 1);
        assert_eq!(
            WatchStatus::line_count("styles failed\nUndefined variable.\n  --> app.scss:3:10"),
            3
        );
    }

    #[test]
    fn test_progress_render_skips_empty_counters() {
        let progress = ProgressLine::new("images", &[("compressed", 3), ("copied", 0)]);
        progress.inc("compressed");
        progress.inc("missing");
        assert_eq!(progress.render(), "compressed(1/3)");
    }

    #[test]
    fn test_now_format() {
        let time = now();
        assert_eq!(time.len(), 8);
        assert_eq!(time.matches(':').count(), 2);
    }
}
