//! Output abstraction for consistent CLI output
//!
//! Detects whether we are talking to an interactive terminal, CI, or a pipe
//! and adjusts colors and unicode accordingly.

use std::io::{self, IsTerminal};

use colored::Colorize;

/// Output mode for the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Interactive terminal with colors and unicode
    Interactive,
    /// CI environment - plain text, no colors
    Ci,
    /// Piped output - plain text, no colors
    Plain,
}

impl OutputMode {
    /// Detect the appropriate output mode from the environment
    pub fn detect() -> Self {
        if is_ci::cached() {
            return OutputMode::Ci;
        }
        if io::stdout().is_terminal() {
            OutputMode::Interactive
        } else {
            OutputMode::Plain
        }
    }

    pub fn colors_enabled(&self) -> bool {
        matches!(self, OutputMode::Interactive)
    }

    pub fn unicode_enabled(&self) -> bool {
        matches!(self, OutputMode::Interactive)
    }
}

impl Default for OutputMode {
    fn default() -> Self {
        Self::detect()
    }
}

/// Centralized printer that respects the output mode
#[derive(Debug, Clone)]
pub struct Printer {
    mode: OutputMode,
}

impl Printer {
    pub fn new() -> Self {
        Self {
            mode: OutputMode::detect(),
        }
    }

    pub fn with_mode(mode: OutputMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn newline(&self) {
        println!();
    }

    pub fn separator(&self) {
        if self.mode.unicode_enabled() {
            println!("{}", "━".repeat(60));
        } else {
            println!("{}", "-".repeat(60));
        }
    }

    pub fn header(&self, text: &str) {
        if self.mode.colors_enabled() {
            println!("{}", text.cyan().bold());
        } else {
            println!("{}", text);
        }
    }

    /// Aligned key/value line
    pub fn kv(&self, key: &str, value: &str) {
        if self.mode.colors_enabled() {
            println!("{:>12}: {}", key.dimmed(), value);
        } else {
            println!("{:>12}: {}", key, value);
        }
    }

    pub fn success(&self, message: &str) {
        let symbol = if self.mode.unicode_enabled() { "✓" } else { "[OK]" };
        if self.mode.colors_enabled() {
            println!("{} {}", symbol.green(), message.green());
        } else {
            println!("{} {}", symbol, message);
        }
    }

    pub fn warning(&self, message: &str) {
        let symbol = if self.mode.unicode_enabled() { "!" } else { "[WARN]" };
        if self.mode.colors_enabled() {
            println!("{} {}", symbol.yellow(), message.yellow());
        } else {
            println!("{} {}", symbol, message);
        }
    }

    pub fn error(&self, message: &str) {
        let symbol = if self.mode.unicode_enabled() { "✗" } else { "[ERROR]" };
        if self.mode.colors_enabled() {
            eprintln!("{} {}", symbol.red(), message.red());
        } else {
            eprintln!("{} {}", symbol, message);
        }
    }
}

impl Default for Printer {
    fn default() -> Self {
        Self::new()
    }
}
