use std::fmt::Display;
use std::io::Write;

/// User-facing console output. Everything is dropped in silent mode.
#[derive(Debug, Clone, Copy)]
pub struct Console {
    verbose: bool,
}

impl Console {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn println(&self, line: impl Display) {
        if self.verbose {
            println!("{line}");
        }
    }

    pub fn newline(&self) {
        if self.verbose {
            println!();
        }
    }

    /// Print without a newline and flush, used for progress dots
    pub fn print(&self, text: impl Display) {
        if self.verbose {
            print!("{text}");
            let _ = std::io::stdout().flush();
        }
    }
}
