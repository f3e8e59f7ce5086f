use log::{Level, LevelFilter, Metadata, Record};
use std::str::FromStr;

/// Environment variable holding the level for [`init_logger`].
pub const LOG_ENV: &str = "TEST_SCRATCH_LOG";

// eprintln! instead of writing to io::stderr() so the test harness captures
// the output of each test separately.
struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        match level_prefix(record.level()) {
            Some(prefix) => {
                let msg = record.args().to_string();
                for line in msg.lines() {
                    eprintln!("{}{}", prefix, line);
                }
            }
            None => eprintln!("{}", record.args()),
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn level_prefix(level: Level) -> Option<&'static str> {
    match level {
        Level::Error => Some("ERROR: "),
        Level::Warn => Some("WARNING: "),
        Level::Info => None,
        Level::Debug => Some("DEBUG: "),
        Level::Trace => Some("TRACE: "),
    }
}

/// Parses the value of [`LOG_ENV`], defaulting to warnings and errors only.
pub fn level_from_env(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|v| LevelFilter::from_str(v.trim()).ok())
        .unwrap_or(LevelFilter::Warn)
}

/// Installs the stderr logger. Safe to call from every test; only the first call has an effect.
pub fn init_logger() {
    let level = level_from_env(std::env::var(LOG_ENV).ok().as_deref());
    // whichever logger a test binary installed first stays in place
    let _ = log::set_logger(&LOGGER).map(|()| log::set_max_level(level));
}
