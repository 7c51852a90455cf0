use core::fmt::Display;
use std::io::{self, Write};

use log::{Level, LevelFilter, Log, Metadata, Record};
use owo_colors::OwoColorize;

struct Inner {
    level: LevelFilter,
}

impl Inner {
    fn write_with_color(&mut self, out: &mut impl Write, color: Color, string: impl Display) -> io::Result<()> {
        let string: &dyn Display = match color {
            Color::Default => &string,
            Color::Gray => &string.dimmed(),
            Color::BrightRed => &string.bright_red(),
            Color::BrightYellow => &string.bright_yellow(),
            Color::BrightBlue => &string.bright_blue(),
            Color::BrightCyan => &string.bright_cyan(),
            Color::BrightMagenta => &string.bright_magenta(),
        };
        write!(out, "{string}")
    }

    fn write_record(&mut self, out: &mut impl Write, record: &Record) -> io::Result<()> {
        let level = record.level();
        self.write_with_color(
            out,
            match level {
                Level::Error => Color::BrightRed,
                Level::Warn => Color::BrightYellow,
                Level::Info => Color::BrightBlue,
                Level::Debug => Color::BrightCyan,
                Level::Trace => Color::BrightMagenta,
            },
            format_args!("{level:5} "),
        )?;
        self.write_with_color(out, Color::Gray, format_args!("[{}] ", record.target()))?;
        self.write_with_color(out, Color::Default, record.args())?;
        self.write_with_color(out, Color::Default, "\n")
    }
}

/// `log` backend writing one colored line per record to stderr.
pub struct VolumeLogger {
    inner: spin::Mutex<Inner>,
}

static LOGGER: VolumeLogger = VolumeLogger {
    inner: spin::Mutex::new(Inner { level: LevelFilter::Info }),
};

impl Log for VolumeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.inner.lock().level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut inner = self.inner.lock();
        // A failed write to stderr has nowhere better to go.
        let _ = inner.write_record(&mut io::stderr().lock(), record);
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

/// Install the logger at `level`. Fails if another logger is already set.
pub fn init(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    LOGGER.inner.lock().level = level;
    log::set_max_level(level);
    log::set_logger(&LOGGER)
}

enum Color {
    Default,
    Gray,
    BrightRed,
    BrightYellow,
    BrightBlue,
    BrightCyan,
    BrightMagenta,
}
