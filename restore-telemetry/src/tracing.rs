use restore_config::Environment;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::io::Write;
use std::panic::PanicHookInfo;
use std::sync::{Once, OnceLock};
use thiserror::Error;
use tracing::subscriber::{SetGlobalDefaultError, set_global_default};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{self, InitError};
use tracing_log::{LogTracer, log_tracer::SetLoggerError};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, FmtSubscriber, Registry, fmt, layer::SubscriberExt};

/// JSON field carrying the partition being restored.
const PARTITION_KEY_IN_LOG: &str = "partition_id";

/// Directory where production log files are written.
const LOG_DIR: &str = "logs";

/// Number of rotated log files kept on disk.
const MAX_LOG_FILES: usize = 5;

/// Errors that can occur during tracing initialization.
#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to build rolling file appender: {0}")]
    InitAppender(#[from] InitError),

    #[error("failed to init log tracer: {0}")]
    InitLogTracer(#[from] SetLoggerError),

    #[error("failed to set global default subscriber: {0}")]
    SetGlobalDefault(#[from] SetGlobalDefaultError),

    #[error("an io error occurred: {0}")]
    Io(#[from] std::io::Error),
}

/// Keeps buffered log lines alive until dropped.
///
/// Production tracing writes through a background worker; dropping the
/// [`LogFlusher::Flusher`] guard flushes whatever is still queued.
#[must_use]
pub enum LogFlusher {
    Flusher(WorkerGuard),
    NullFlusher,
}

static INIT_TEST_TRACING: Once = Once::new();

static PARTITION_ID: OnceLock<u32> = OnceLock::new();

/// Initializes tracing for tests when `ENABLE_TRACING` is set:
///
/// ```bash
/// ENABLE_TRACING=1 cargo test test_name
/// ```
pub fn init_test_tracing() {
    INIT_TEST_TRACING.call_once(|| {
        if std::env::var("ENABLE_TRACING").is_ok() {
            // Without an explicit environment we would default to prod and log to files.
            Environment::Dev.set();
            let _log_flusher =
                init_tracing("test").expect("Failed to initialize tracing for tests");
        }
    });
}

/// Sets the partition id injected into every JSON log line.
pub fn set_global_partition_id(partition_id: u32) {
    let _ = PARTITION_ID.set(partition_id);
}

/// Returns the partition id set with [`set_global_partition_id`], if any.
pub fn get_global_partition_id() -> Option<u32> {
    PARTITION_ID.get().copied()
}

/// Adds the global partition id to JSON log lines that do not carry one yet.
struct PartitionInjectingWriter<W> {
    inner: W,
}

impl<W> PartitionInjectingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W> Write for PartitionInjectingWriter<W>
where
    W: Write,
{
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let Some(line) = get_global_partition_id().and_then(|id| inject_partition(buf, id)) else {
            return self.inner.write(buf);
        };

        // The caller only knows about the original buffer, so we report its length.
        self.inner.write_all(line.as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Returns the rewritten line, or `None` when `buf` is not a JSON object or
/// already has a partition field.
fn inject_partition(buf: &[u8], partition_id: u32) -> Option<String> {
    let line = std::str::from_utf8(buf).ok()?;
    let serde_json::Value::Object(mut map) = serde_json::from_str::<serde_json::Value>(line).ok()? else {
        return None;
    };
    if map.contains_key(PARTITION_KEY_IN_LOG) {
        return None;
    }

    map.insert(PARTITION_KEY_IN_LOG.to_string(), partition_id.into());
    let mut output = serde_json::to_string(&map).ok()?;
    if line.ends_with('\n') {
        output.push('\n');
    }

    Some(output)
}

/// Initializes tracing for the application.
///
/// Production-like environments log JSON to daily rotated files, development
/// logs pretty output to the console.
pub fn init_tracing(app_name: &str) -> Result<LogFlusher, TracingError> {
    init_tracing_with_top_level_fields(app_name, None)
}

/// Like [`init_tracing`] but also tags every JSON log line with `partition_id`.
pub fn init_tracing_with_top_level_fields(
    app_name: &str,
    partition_id: Option<u32>,
) -> Result<LogFlusher, TracingError> {
    if let Some(partition_id) = partition_id {
        set_global_partition_id(partition_id);
    }

    // Forward records emitted through the `log` crate.
    LogTracer::init()?;

    let is_prod = Environment::load()?.is_prod();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_flusher = if is_prod {
        configure_prod_tracing(filter, app_name)?
    } else {
        configure_dev_tracing(filter)?
    };

    set_tracing_panic_hook();

    Ok(log_flusher)
}

fn configure_prod_tracing(filter: EnvFilter, app_name: &str) -> Result<LogFlusher, TracingError> {
    let file_appender = rolling::Builder::new()
        .filename_prefix(app_name)
        .filename_suffix("log")
        .rotation(rolling::Rotation::DAILY)
        .max_log_files(MAX_LOG_FILES)
        .build(LOG_DIR)?;
    let (file_appender, guard) = tracing_appender::non_blocking(file_appender);

    let format = fmt::format()
        .with_level(true)
        .with_ansi(false)
        .with_target(false);

    let subscriber = Registry::default().with(filter).with(
        fmt::layer()
            .event_format(format)
            .with_writer(move || PartitionInjectingWriter::new(file_appender.make_writer()))
            .json()
            .with_current_span(true)
            .with_span_list(true),
    );

    set_global_default(subscriber)?;

    Ok(LogFlusher::Flusher(guard))
}

fn configure_dev_tracing(filter: EnvFilter) -> Result<LogFlusher, TracingError> {
    let format = fmt::format()
        .with_level(true)
        .with_ansi(true)
        .pretty()
        .with_line_number(false)
        .with_file(false)
        .with_target(true);

    let subscriber = FmtSubscriber::builder()
        .event_format(format)
        .with_env_filter(filter)
        .finish();

    set_global_default(subscriber)?;

    Ok(LogFlusher::NullFlusher)
}

/// Routes panics through tracing before running the previous hook, so they
/// end up in the log files and not only on stderr.
fn set_tracing_panic_hook() {
    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        panic_hook(info);
        prev_hook(info);
    }));
}

/// Renders a captured backtrace, or explains why none is available.
fn render_backtrace(backtrace: Backtrace) -> (Option<String>, Option<&'static str>) {
    match backtrace.status() {
        BacktraceStatus::Captured => (Some(backtrace.to_string()), None),
        BacktraceStatus::Disabled => (
            None,
            Some("run with RUST_BACKTRACE=1 to display backtraces"),
        ),
        BacktraceStatus::Unsupported => {
            (None, Some("backtraces are not supported on this platform"))
        }
        _ => (None, Some("backtrace status is unknown")),
    }
}

fn panic_hook(panic_info: &PanicHookInfo) {
    let (backtrace, note) = render_backtrace(Backtrace::capture());

    let payload = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
        s
    } else {
        "unknown panic payload"
    };

    let location = panic_info.location().map(|location| location.to_string());

    tracing::error!(
        panic.payload = payload,
        payload.location = location,
        panic.backtrace = backtrace.as_deref(),
        panic.note = note,
        "a panic occurred",
    );
}
