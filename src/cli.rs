//! Minimal CLI parsing for run mode overrides.

use std::env;

#[derive(Debug, Default)]
pub struct CliOptions {
    /// Run the search task once and exit instead of starting the scheduler
    pub run_once: bool,
}

impl CliOptions {
    pub fn from_args() -> Self {
        let mut options = CliOptions::default();
        for arg in env::args().skip(1) {
            match arg.as_str() {
                "--once" => options.run_once = true,
                _ => {}
            }
        }
        options
    }
}
