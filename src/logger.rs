//! Terminal output: `[module]` prefixed log lines and the serve status block.
//!
//! ```ignore
//! log!("build"; "updated: {}", item.relative_path);
//! debug!("watch"; "registered {}", dir.display());
//! logger::status_error("render failed: index.md", &stderr);
//! ```
//!
//! In serve mode every rebuild reports through one status block that
//! replaces the previous one in place. Any plain log line printed in
//! between pins the old block, and the next status starts below it.

use std::{
    io::{Write, stdout},
    sync::atomic::{AtomicBool, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use parking_lot::{Mutex, const_mutex};

/// Set by `-V/--verbose`; gates `debug!`.
static VERBOSE: AtomicBool = AtomicBool::new(false);

pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

// ============================================================================
// Log Macros
// ============================================================================

/// Print `[module] message`.
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Like `log!`, only with `--verbose`.
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

pub fn log(module: &str, message: &str) {
    let prefix = module_prefix(module);
    STATUS.lock().pin();

    let mut out = stdout().lock();
    execute!(out, Clear(ClearType::UntilNewLine)).ok();
    writeln!(out, "{prefix} {message}").ok();
    out.flush().ok();
}

fn module_prefix(module: &str) -> String {
    let tag = format!("[{module}]");
    match module.to_ascii_lowercase().as_str() {
        "serve" | "hub" => tag.bright_blue().bold().to_string(),
        "watch" => tag.bright_green().bold().to_string(),
        "error" | "warning" => tag.bright_red().bold().to_string(),
        _ => tag.bright_yellow().bold().to_string(),
    }
}

// ============================================================================
// Status Block
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    Unchanged,
    Failure,
}

/// Last status printed, tracked by the number of lines it took.
struct StatusBlock {
    height: usize,
}

static STATUS: Mutex<StatusBlock> = const_mutex(StatusBlock { height: 0 });

impl StatusBlock {
    /// Keep what is on screen; the next status prints below it.
    fn pin(&mut self) {
        self.height = 0;
    }

    fn show(&mut self, outcome: Outcome, text: &str) {
        let mut out = stdout().lock();
        if self.height > 0 {
            let up = u16::try_from(self.height).unwrap_or(u16::MAX);
            execute!(out, cursor::MoveUp(up), Clear(ClearType::FromCursorDown)).ok();
        }

        writeln!(out, "{}", status_line(outcome, text, &clock())).ok();
        out.flush().ok();
        self.height = text.lines().count().max(1);
    }
}

fn status_line(outcome: Outcome, text: &str, time: &str) -> String {
    let stamp = format!("[{time}]").dimmed().to_string();
    match outcome {
        Outcome::Success => format!("{stamp} {} {text}", "✓".green()),
        Outcome::Unchanged => format!("{stamp} {}", text.dimmed()),
        Outcome::Failure => format!("{stamp} {} {text}", "✗".red()),
    }
}

/// Wall clock as `HH:MM:SS` (UTC).
fn clock() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());
    format!(
        "{:02}:{:02}:{:02}",
        (secs / 3600) % 24,
        (secs / 60) % 60,
        secs % 60
    )
}

pub fn status_success(message: &str) {
    STATUS.lock().show(Outcome::Success, message);
}

pub fn status_unchanged(message: &str) {
    STATUS.lock().show(Outcome::Unchanged, message);
}

/// Failure summary, followed by the renderer's output when there is any.
pub fn status_error(summary: &str, detail: &str) {
    let text = if detail.trim().is_empty() {
        summary.to_string()
    } else {
        format!("{summary}\n{}", detail.trim_end())
    };
    STATUS.lock().show(Outcome::Failure, &text);
}
