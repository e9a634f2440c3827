use std::fmt::Display;

use nu_ansi_term::Color::{self, Blue, Magenta, Red, Yellow};
use sci_config::log::LogSettings;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    fmt::{
        self,
        format::{FmtSpan, Writer},
        FmtContext, FormatEvent, FormatFields, MakeWriter,
    },
    registry::LookupSpan,
};

use crate::error::{Result, SciError};

#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        }
    }
}

struct Painted<T: Display> {
    color: Option<Color>,
    text: T,
}

impl<T: Display> Display for Painted<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.color {
            Some(color) => {
                write!(f, "{}", color.prefix())?;
                self.text.fmt(f)?;
                write!(f, "{}", color.suffix())
            }
            None => self.text.fmt(f),
        }
    }
}

/// Compact single-line format: a coloured level tag, then the message.
/// `INFO` events carry no tag.
pub struct CustomFormatter {
    color: bool,
}

impl CustomFormatter {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn tag<'a>(&self, color: Color, text: &'a str) -> Painted<&'a str> {
        Painted {
            color: self.color.then_some(color),
            text,
        }
    }
}

impl<S, N> FormatEvent<S, N> for CustomFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        match *event.metadata().level() {
            Level::TRACE => write!(writer, "{} ", self.tag(Magenta, "[TRACE]")),
            Level::DEBUG => write!(writer, "{} ", self.tag(Blue, "[DEBUG]")),
            Level::INFO => write!(writer, ""),
            Level::WARN => write!(writer, "{} ", self.tag(Yellow, "[WARN]")),
            Level::ERROR => write!(writer, "{} ", self.tag(Red, "[ERROR]")),
        }?;

        if let Some(message) = visitor.message {
            writeln!(writer, "{message}")
        } else {
            writeln!(writer)
        }
    }
}

/// Builds the subscriber described by `settings`, writing to `make_writer`.
pub fn build_subscriber<W>(settings: &LogSettings, make_writer: W) -> Box<dyn Subscriber + Send + Sync>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let builder = fmt::Subscriber::builder()
        .with_env_filter(format!("sci={}", settings.level()))
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(make_writer)
        .compact()
        .without_time();

    if settings.json() {
        Box::new(builder.json().flatten_event(true).finish())
    } else {
        Box::new(
            builder
                .event_format(CustomFormatter::new(settings.color()))
                .finish(),
        )
    }
}

/// Installs the global subscriber, logging to stderr.
pub fn setup_logging(settings: &LogSettings) -> Result<()> {
    let subscriber = build_subscriber(settings, std::io::stderr);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| SciError::Logging(err.to_string()))
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::{Arc, Mutex},
    };

    use serial_test::serial;
    use tracing::{debug, info, warn};

    use super::*;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Buffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl io::Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Buffer {
        type Writer = Buffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn settings(level: &str, json: bool) -> LogSettings {
        LogSettings {
            level: Some(level.to_string()),
            json: Some(json),
            color: Some(false),
        }
    }

    #[test]
    #[serial]
    fn test_compact_format_and_filter() {
        std::env::remove_var("SCI_LOG");
        let buffer = Buffer::default();
        let subscriber = build_subscriber(&settings("info", false), buffer.clone());

        tracing::subscriber::with_default(subscriber, || {
            info!("resolved Logger");
            warn!("closing 1 unbalanced group(s)");
            debug!("hidden at info level");
        });

        assert_eq!(
            buffer.contents(),
            "resolved Logger\n[WARN] closing 1 unbalanced group(s)\n"
        );
    }

    #[test]
    #[serial]
    fn test_json_format() {
        std::env::remove_var("SCI_LOG");
        let buffer = Buffer::default();
        let subscriber = build_subscriber(&settings("debug", true), buffer.clone());

        tracing::subscriber::with_default(subscriber, || {
            debug!("bound Logger");
        });

        let contents = buffer.contents();
        assert!(contents.contains("\"message\":\"bound Logger\""));
        assert!(contents.contains("\"level\":\"DEBUG\""));
    }
}
