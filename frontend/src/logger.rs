//! Stderr logger for the `log` facade.
//!
//! Filters are `RUST_LOG`-style: a default level followed by `target=level`
//! pairs, e.g. `info,cpu=trace,io=off`. The longest matching target prefix
//! wins.

use std::io::Write;
use std::str::FromStr;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

use crate::error::FrontendError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Filter {
    default: LevelFilter,
    targets: Vec<(String, LevelFilter)>,
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            default: LevelFilter::Info,
            targets: Vec::new(),
        }
    }
}

impl Filter {
    pub fn level_for(&self, target: &str) -> LevelFilter {
        self.targets
            .iter()
            .filter(|(prefix, _)| target.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map_or(self.default, |&(_, level)| level)
    }

    /// The most verbose level any target can reach.
    pub fn max_level(&self) -> LevelFilter {
        self.targets
            .iter()
            .map(|&(_, level)| level)
            .fold(self.default, |a, b| a.max(b))
    }
}

impl FromStr for Filter {
    type Err = FrontendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || FrontendError::LogFilter(s.to_string());
        let mut filter = Self::default();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part.split_once('=') {
                Some((target, level)) => {
                    let level = level.trim().parse().map_err(|_| invalid())?;
                    filter.targets.push((target.trim().to_string(), level));
                }
                None => filter.default = part.parse().map_err(|_| invalid())?,
            }
        }
        Ok(filter)
    }
}

struct StderrLogger {
    filter: Filter,
    start: Instant,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.filter.level_for(metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let elapsed = self.start.elapsed().as_secs_f64();
        let mut err = std::io::stderr().lock();
        let _ = writeln!(
            err,
            "[{elapsed:>9.3}s {:<5} {}] {}",
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Install the logger. Fails only if a logger is already installed.
pub fn init(filter: Filter) -> Result<(), log::SetLoggerError> {
    let max = filter.max_level();
    log::set_boxed_logger(Box::new(StderrLogger {
        filter,
        start: Instant::now(),
    }))?;
    log::set_max_level(max);
    Ok(())
}
