//! Structured logging backend.
//!
//! # Responsibilities
//! - Route `tracing` events to a console sink and/or a rotating file sink
//! - Filter each sink by its own severity threshold
//! - Render lines through a `%D %T %L %S %M` template
//! - Swap sinks in place when the config is (re)activated
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging; the backend is a
//!   `tracing_subscriber` layer installed once per process
//! - Reconfiguring closes the previous sinks first, so repeated activation
//!   never duplicates output
//! - File sink rotates on line count, not size or time

use std::fmt::{self, Write as _};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::paths::PathResolver;
use crate::config::LogSettings;

/// Lines written to the log file before it is rotated.
pub const LOG_ROTATE_LINES: usize = 10_000;

/// Line template used by the console sink and by the file sink by default.
pub const DEFAULT_LOG_FORMAT: &str = "[%D %T] [%L] %M";

/// File name used when no explicit log file location is configured.
pub const DEFAULT_LOG_FILE_NAME: &str = "server.log";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("error opening log file {path}: {source}")]
    OpenFile { path: PathBuf, source: io::Error },
}

/// Ordered log severities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

impl Severity {
    /// Parse a configured level. Unrecognized values mean DEBUG.
    pub fn from_setting(level: &str) -> Self {
        match level {
            "INFO" => Severity::Info,
            "WARN" => Severity::Warn,
            "ERROR" => Severity::Error,
            _ => Severity::Debug,
        }
    }

    fn from_level(level: &Level) -> Self {
        match *level {
            Level::ERROR => Severity::Error,
            Level::WARN => Severity::Warn,
            Level::INFO => Severity::Info,
            _ => Severity::Debug,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

/// A compiled line template.
///
/// `%D` date, `%T` time, `%L` level, `%S` event target, `%M` message,
/// `%%` a literal percent sign. Unknown placeholders are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineFormat {
    template: String,
}

impl LineFormat {
    pub fn new(template: &str) -> Self {
        let template = if template.is_empty() {
            DEFAULT_LOG_FORMAT
        } else {
            template
        };
        Self {
            template: template.to_string(),
        }
    }

    pub fn render(
        &self,
        time: &DateTime<Local>,
        severity: Severity,
        target: &str,
        message: &str,
    ) -> String {
        let mut out = String::with_capacity(self.template.len() + message.len() + 24);
        let mut chars = self.template.chars();

        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('D') => {
                    let _ = write!(out, "{}", time.format("%Y/%m/%d"));
                }
                Some('T') => {
                    let _ = write!(out, "{}", time.format("%H:%M:%S"));
                }
                Some('L') => out.push_str(severity.label()),
                Some('S') => out.push_str(target),
                Some('M') => out.push_str(message),
                Some('%') => out.push('%'),
                Some(other) => {
                    out.push('%');
                    out.push(other);
                }
                None => out.push('%'),
            }
        }
        out
    }
}

impl Default for LineFormat {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_FORMAT)
    }
}

/// Append-only log file that rotates after a fixed number of lines.
///
/// A rotated file is renamed to `<file>.<YYYY-MM-DD>.<NNN>` using the first
/// free three digit index.
#[derive(Debug)]
pub struct RotatingFile {
    path: PathBuf,
    file: File,
    lines: usize,
    max_lines: usize,
}

impl RotatingFile {
    pub fn open(path: impl Into<PathBuf>, max_lines: usize) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let lines = existing_lines(&path)?;
        let file = open_append(&path)?;
        Ok(Self {
            path,
            file,
            lines,
            max_lines,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        if self.max_lines > 0 && self.lines >= self.max_lines {
            self.rotate()?;
        }
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');
        self.file.write_all(&buf)?;
        self.lines += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        let target = next_rotation_path(&self.path)?;
        fs::rename(&self.path, &target)?;
        self.file = open_append(&self.path)?;
        self.lines = 0;
        Ok(())
    }
}

/// Lines already present in `path`; zero when it does not exist yet.
fn existing_lines(path: &Path) -> io::Result<usize> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };
    let mut buf = [0u8; 8192];
    let mut lines = 0;
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            return Ok(lines);
        }
        lines += buf[..n].iter().filter(|&&b| b == b'\n').count();
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn next_rotation_path(path: &Path) -> io::Result<PathBuf> {
    let date = Local::now().format("%Y-%m-%d").to_string();
    for n in 1..=999 {
        let mut name = path.as_os_str().to_owned();
        name.push(format!(".{date}.{n:03}"));
        let candidate = PathBuf::from(name);
        if !candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free rotation slot for {}", path.display()),
    ))
}

/// Log file path for a configured location.
pub fn log_file_location(file_location: &str, resolver: &PathResolver) -> PathBuf {
    if file_location.is_empty() {
        resolver.find_dir("logs").join(DEFAULT_LOG_FILE_NAME)
    } else {
        PathBuf::from(file_location)
    }
}

#[derive(Debug)]
enum SinkTarget {
    Console,
    File(RotatingFile),
}

#[derive(Debug)]
struct Sink {
    threshold: Severity,
    format: LineFormat,
    target: SinkTarget,
}

impl Sink {
    fn emit(&mut self, time: &DateTime<Local>, severity: Severity, target: &str, message: &str) {
        if severity < self.threshold {
            return;
        }
        let line = self.format.render(time, severity, target, message);
        match &mut self.target {
            SinkTarget::Console => {
                let _ = writeln!(io::stdout().lock(), "{line}");
            }
            SinkTarget::File(file) => {
                if let Err(e) = file.write_line(&line) {
                    // The logger cannot log its own failure.
                    eprintln!("error writing log file {}: {e}", file.path().display());
                }
            }
        }
    }

    fn close(&mut self) {
        if let SinkTarget::File(file) = &mut self.target {
            let _ = file.flush();
        }
    }
}

/// Process logging backend with replaceable sinks.
#[derive(Debug, Default)]
pub struct LogBackend {
    sinks: Mutex<Vec<Sink>>,
}

impl LogBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Replace the active sinks with those described by `settings`.
    pub fn configure(&self, settings: &LogSettings) -> Result<(), LoggingError> {
        self.configure_with(settings, &PathResolver::from_env())
    }

    /// As [`configure`](Self::configure), resolving the default log
    /// directory with `resolver`.
    ///
    /// A file sink that cannot be opened is reported, but the console sink
    /// is still activated.
    pub fn configure_with(
        &self,
        settings: &LogSettings,
        resolver: &PathResolver,
    ) -> Result<(), LoggingError> {
        let mut sinks = Vec::new();
        let mut file_error = None;

        if settings.enable_console {
            sinks.push(Sink {
                threshold: Severity::from_setting(&settings.console_level),
                format: LineFormat::default(),
                target: SinkTarget::Console,
            });
        }

        if settings.enable_file {
            let path = log_file_location(&settings.file_location, resolver);
            match RotatingFile::open(&path, LOG_ROTATE_LINES) {
                Ok(file) => sinks.push(Sink {
                    threshold: Severity::from_setting(&settings.file_level),
                    format: LineFormat::new(&settings.file_format),
                    target: SinkTarget::File(file),
                }),
                Err(source) => file_error = Some(LoggingError::OpenFile { path, source }),
            }
        }

        {
            let mut current = self.lock();
            current.iter_mut().for_each(Sink::close);
            *current = sinks;
        }

        match file_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Flush and drop every sink. Safe to call repeatedly.
    pub fn close(&self) {
        let mut current = self.lock();
        current.iter_mut().for_each(Sink::close);
        current.clear();
    }

    /// Number of active sinks.
    pub fn sink_count(&self) -> usize {
        self.lock().len()
    }

    /// A layer feeding events into this backend.
    pub fn layer(self: &Arc<Self>) -> LogLayer {
        LogLayer {
            backend: Arc::clone(self),
        }
    }

    /// Install this backend as the global subscriber.
    ///
    /// `RUST_LOG` narrows which events reach the sinks. Returns `false` if a
    /// global subscriber was already set.
    pub fn install(self: &Arc<Self>) -> bool {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "server_config=debug,tower_http=debug,info".into());

        tracing_subscriber::registry()
            .with(filter)
            .with(self.layer())
            .try_init()
            .is_ok()
    }

    fn dispatch(&self, severity: Severity, target: &str, message: &str) {
        let now = Local::now();
        for sink in self.lock().iter_mut() {
            sink.emit(&now, severity, target, message);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Sink>> {
        self.sinks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// `tracing_subscriber` layer handing events to a [`LogBackend`].
#[derive(Debug, Clone)]
pub struct LogLayer {
    backend: Arc<LogBackend>,
}

impl<S: Subscriber> Layer<S> for LogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.backend.dispatch(
            Severity::from_level(metadata.level()),
            metadata.target(),
            &visitor.finish(),
        );
    }
}

/// Collects the `message` field followed by ` key=value` pairs.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        self.message + &self.fields
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn file_settings(path: &Path, level: &str, format: &str) -> LogSettings {
        LogSettings {
            enable_console: false,
            console_level: "DEBUG".to_string(),
            enable_file: true,
            file_level: level.to_string(),
            file_format: format.to_string(),
            file_location: path.to_string_lossy().into_owned(),
        }
    }

    fn with_backend(backend: &Arc<LogBackend>, f: impl FnOnce()) {
        let subscriber = tracing_subscriber::registry().with(backend.layer());
        tracing::subscriber::with_default(subscriber, f);
    }

    #[test]
    fn test_severity_parsing() {
        assert_eq!(Severity::from_setting("INFO"), Severity::Info);
        assert_eq!(Severity::from_setting("WARN"), Severity::Warn);
        assert_eq!(Severity::from_setting("ERROR"), Severity::Error);
        assert_eq!(Severity::from_setting("DEBUG"), Severity::Debug);
        assert_eq!(Severity::from_setting("verbose"), Severity::Debug);
        assert_eq!(Severity::from_setting("info"), Severity::Debug);
        assert!(Severity::Debug < Severity::Info && Severity::Warn < Severity::Error);
    }

    #[test]
    fn test_default_format() {
        let time = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let line = LineFormat::new("").render(&time, Severity::Info, "app", "hello");
        assert_eq!(line, "[2024/03/05 14:07:09] [INFO] hello");
    }

    #[test]
    fn test_custom_format_placeholders() {
        let time = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let line = LineFormat::new("%L %S: %M (100%%) %Q").render(&time, Severity::Warn, "db", "slow");
        assert_eq!(line, "WARN db: slow (100%) %Q");
    }

    #[test]
    fn test_rotation_after_line_limit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let mut file = RotatingFile::open(&path, 3).unwrap();
        for i in 1..=7 {
            file.write_line(&format!("line {i}")).unwrap();
        }

        assert_eq!(fs::read_to_string(&path).unwrap(), "line 7\n");
        let mut rotated: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name != "app.log")
            .collect();
        rotated.sort();
        assert_eq!(rotated.len(), 2);
        assert!(rotated[0].ends_with(".001"));
        assert!(rotated[1].ends_with(".002"));

        let first = fs::read_to_string(dir.path().join(&rotated[0])).unwrap();
        assert_eq!(first, "line 1\nline 2\nline 3\n");
    }

    #[test]
    fn test_reopen_counts_existing_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "old 1\nold 2\n").unwrap();

        let mut file = RotatingFile::open(&path, 3).unwrap();
        file.write_line("new 1").unwrap();
        file.write_line("new 2").unwrap();
        file.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new 2\n");
        let rotated: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p != &path)
            .collect();
        assert_eq!(rotated.len(), 1);
        assert_eq!(
            fs::read_to_string(&rotated[0]).unwrap(),
            "old 1\nold 2\nnew 1\n"
        );
    }

    #[test]
    fn test_file_sink_threshold_and_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs/app.log");
        let backend = LogBackend::new();
        backend
            .configure(&file_settings(&path, "WARN", "%L|%M"))
            .unwrap();

        with_backend(&backend, || {
            tracing::info!("dropped");
            tracing::warn!(user = "bob", "kept");
            tracing::error!(code = 7, "failed");
        });

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "WARN|kept user=bob\nERROR|failed code=7\n");
    }

    #[test]
    fn test_reconfigure_replaces_sinks() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("first.log");
        let second = dir.path().join("second.log");
        let backend = LogBackend::new();

        backend.configure(&file_settings(&first, "DEBUG", "%M")).unwrap();
        backend.configure(&file_settings(&second, "DEBUG", "%M")).unwrap();
        assert_eq!(backend.sink_count(), 1);

        with_backend(&backend, || tracing::debug!("after"));

        assert_eq!(fs::read_to_string(&first).unwrap(), "");
        assert_eq!(fs::read_to_string(&second).unwrap(), "after\n");
    }

    #[test]
    fn test_close_is_idempotent() {
        let backend = LogBackend::new();
        backend.configure(&LogSettings::command_line()).unwrap();
        assert_eq!(backend.sink_count(), 1);
        backend.close();
        backend.close();
        assert_eq!(backend.sink_count(), 0);
    }

    #[test]
    fn test_unopenable_file_keeps_console() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();

        let mut settings = file_settings(&blocker.join("app.log"), "INFO", "");
        settings.enable_console = true;

        let backend = LogBackend::new();
        let err = backend.configure(&settings).unwrap_err();
        assert!(err.to_string().contains("app.log"));
        assert_eq!(backend.sink_count(), 1);
    }

    #[test]
    fn test_default_location_uses_logs_dir() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("logs")).unwrap();
        let resolver = PathResolver::new(dir.path(), dir.path().join("tmp"));

        assert_eq!(
            log_file_location("", &resolver),
            dir.path().join("logs").join(DEFAULT_LOG_FILE_NAME)
        );
        assert_eq!(
            log_file_location("/var/log/chat.log", &resolver),
            PathBuf::from("/var/log/chat.log")
        );
    }
}
