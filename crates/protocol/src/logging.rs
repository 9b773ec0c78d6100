//! Per-process structured logging.
//!
//! Each process — reception or a forked kitchen — calls [`init`] exactly
//! once, right after it knows its own log path. The sink is built and owned
//! by that call; there is no global mutable logger state beyond what the
//! `tracing` facade itself keeps (a single global dispatcher, set once).

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

/// Renders `[YYYY-MM-DD HH:MM:SS.mmm] [LEVEL] message`, in place of
/// `tracing_subscriber`'s default line format.
struct BracketFormat;

impl<S, N> FormatEvent<S, N> for BracketFormat
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        write!(writer, "[{now}] [{}] ", event.metadata().level())?;
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// A `File` shared behind a mutex, handed out as a `tracing_subscriber`
/// writer. Writes are synchronous — log volume in this fleet is low enough
/// that a background flusher (as `tracing-appender` would add) isn't needed.
#[derive(Clone)]
struct SharedFile(Arc<Mutex<File>>);

impl io::Write for SharedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("log file mutex poisoned").write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.lock().expect("log file mutex poisoned").flush()
    }
}

impl<'a> MakeWriter<'a> for SharedFile {
    type Writer = SharedFile;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Open (or create) `path` in append mode and install it as this process's
/// global `tracing` sink. When `mirror_to_stderr` is set,
/// `INFO`-and-above records are additionally echoed to stderr — used by
/// `--verbose` and by integration tests that want to observe logs directly.
///
/// Must be called at most once per process. Calling it twice (e.g. from a
/// test harness) is tolerated: the second call is a no-op, matching
/// `tracing`'s own "first dispatcher wins" global-default semantics.
pub fn init(path: &Path, mirror_to_stderr: bool) -> io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let writer = SharedFile(Arc::new(Mutex::new(file)));

    let file_layer = tracing_subscriber::fmt::layer()
        .event_format(BracketFormat)
        .with_ansi(false)
        .with_writer(writer);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = Registry::default().with(env_filter).with(file_layer);

    let result = if mirror_to_stderr {
        let stderr_layer = tracing_subscriber::fmt::layer()
            .event_format(BracketFormat)
            .with_writer(io::stderr);
        registry.with(stderr_layer).try_init()
    } else {
        registry.try_init()
    };

    // A previously-installed global subscriber (e.g. in tests that spin up
    // more than one `plazza` instance in-process) is not an error here.
    let _ = result;
    Ok(())
}
