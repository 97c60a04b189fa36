//! Progress reporting for listing runs
//!
//! Two layers: stage reports (one log line every `stage_size` paths, always
//! on) and an optional indicatif spinner. Header and summary go to stderr so
//! stdout stays free.

use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};

/// Default number of paths per stage report
pub const DEFAULT_STAGE_SIZE: usize = 1024;

/// One periodic progress report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    /// Completed blocks of `stage_size` paths
    pub blocks: u64,
    /// Paths delivered so far, across all roots
    pub files: u64,
    pub elapsed: Duration,
    /// Raw path that completed the block
    pub last_seen: String,
}

impl fmt::Display for StageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "completed {} blocks ({} files; time passed: {}) lastseen: {:?}",
            self.blocks,
            self.files,
            format_elapsed(self.elapsed),
            self.last_seen
        )
    }
}

/// Counts delivered paths and emits a [`StageReport`] every `stage_size`
#[derive(Debug)]
pub struct StageCounter {
    stage_size: u64,
    in_stage: u64,
    blocks: u64,
    files: u64,
    started: Instant,
}

impl StageCounter {
    pub fn new(stage_size: usize) -> Self {
        Self::starting_at(stage_size, Instant::now())
    }

    pub fn starting_at(stage_size: usize, started: Instant) -> Self {
        Self {
            stage_size: stage_size.max(1) as u64,
            in_stage: 0,
            blocks: 0,
            files: 0,
            started,
        }
    }

    /// Count one path; returns a report when it completes a block
    pub fn tick(&mut self, raw_path: &str) -> Option<StageReport> {
        self.files += 1;
        self.in_stage += 1;
        if self.in_stage < self.stage_size {
            return None;
        }
        self.in_stage = 0;
        self.blocks += 1;
        Some(StageReport {
            blocks: self.blocks,
            files: self.files,
            elapsed: self.started.elapsed(),
            last_seen: raw_path.to_string(),
        })
    }

    pub fn files(&self) -> u64 {
        self.files
    }
}

/// Elapsed time as `HH:MM:SS`; hours keep counting past 24
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// Spinner showing live counts
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// Refresh the spinner message
    pub fn update(&self, files: u64, errors: u64, bytes: u64, current: &str) {
        self.bar.set_message(format!(
            "Files: {} | Size: {} | Errors: {} | {}",
            format_number(files),
            format_size(bytes, BINARY),
            format_number(errors),
            current
        ));
    }

    /// Print a line above the spinner without tearing it
    pub fn println(&self, line: &str) {
        self.bar.println(line);
    }

    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Thousands separators: 1234567 -> "1,234,567"
pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Print the run header
pub fn print_header(roots: &[(String, String)], store: &str, output: &Path) {
    eprintln!();
    eprintln!(
        "{} {}",
        style("allfiles").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("{}", style("─".repeat(50)).dim());
    for (source, replacement) in roots {
        eprintln!("  {} {} -> {}", style("Root:").bold(), source, replacement);
    }
    eprintln!("  {} {}", style("Store:").bold(), store);
    eprintln!("  {} {}", style("Output:").bold(), output.display());
    eprintln!();
}

/// Print the totals of a run
pub fn print_summary(
    completed: bool,
    files: u64,
    rows: u64,
    errors: u64,
    bytes: u64,
    duration: Duration,
    outputs: &[std::path::PathBuf],
) {
    let secs = duration.as_secs_f64();
    let rate = if secs > 0.0 { files as f64 / secs } else { 0.0 };

    eprintln!();
    if completed {
        eprintln!("{}", style("Listing Complete").green().bold());
    } else {
        eprintln!("{}", style("Listing Interrupted").yellow().bold());
    }
    eprintln!("{}", style("─".repeat(50)).dim());
    eprintln!("  {} {}", style("Files:").bold(), format_number(files));
    eprintln!("  {} {}", style("Rows:").bold(), format_number(rows));
    eprintln!("  {} {}", style("Total Size:").bold(), format_size(bytes, BINARY));
    eprintln!(
        "  {} {} ({:.0} files/sec)",
        style("Duration:").bold(),
        format_elapsed(duration),
        rate
    );
    if errors > 0 {
        eprintln!(
            "  {} {}",
            style("Errors:").yellow().bold(),
            format_number(errors)
        );
    }
    for output in outputs {
        match std::fs::metadata(output) {
            Ok(meta) => eprintln!(
                "  {} {} ({})",
                style("Output:").bold(),
                output.display(),
                format_size(meta.len(), BINARY)
            ),
            Err(_) => eprintln!("  {} {}", style("Output:").bold(), output.display()),
        }
    }
    eprintln!();
}
