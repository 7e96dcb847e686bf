//! Injected log sink.
//!
//! Every component receives a [`LinkLog`] at construction instead of reading a
//! module-wide debug switch. Records go through the `log` facade, so the host
//! application decides which backend (if any) prints them.

use std::fmt;
use std::sync::Arc;

use log::Level;

#[derive(Debug, Clone)]
pub struct LinkLog {
    target: Arc<str>,
    verbose: bool,
}

impl LinkLog {
    pub fn new(target: impl AsRef<str>) -> Self {
        Self {
            target: Arc::from(target.as_ref()),
            verbose: false,
        }
    }

    /// Enable hex dumps of every frame and packet.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Derive a sink for a sub-component, e.g. `boardlink::microbit` -> `boardlink::microbit::link`.
    pub fn child(&self, name: &str) -> Self {
        Self {
            target: Arc::from(format!("{}::{}", self.target, name)),
            verbose: self.verbose,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Debug, args);
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Info, args);
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Warn, args);
    }

    /// Hex dump of raw bytes, only in verbose mode.
    pub fn bytes(&self, direction: &str, bytes: &[u8]) {
        if self.verbose {
            self.emit(
                Level::Debug,
                format_args!("{} [{}] {}", direction, bytes.len(), hex::encode(bytes)),
            );
        }
    }

    fn emit(&self, level: Level, args: fmt::Arguments<'_>) {
        log::log!(target: &*self.target, level, "{}", args);
    }
}

impl Default for LinkLog {
    fn default() -> Self {
        Self::new("boardlink")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_target() {
        let log = LinkLog::new("boardlink").verbose(true);
        let child = log.child("premium");
        assert_eq!(child.target(), "boardlink::premium");
        assert!(child.is_verbose());
    }
}
