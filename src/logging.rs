//! Log output and logger spans
//!
//! Loggers are [`tracing::Span`] values passed around explicitly. The
//! application owns one instance span; modules and requests derive child
//! spans from it, and every log call names its parent. Error responses are
//! logged under [`Span::current`], which the request middleware sets to the
//! request span.

use crate::config::{LogConfig, LogFormat};
use crate::{Error, Result};
use tracing::{Level, Span};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init(config: &LogConfig) -> Result<()> {
    let level: Level = config
        .level
        .parse()
        .map_err(|_| Error::InvalidConfig(format!("invalid log level '{}'", config.level)))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("smartsplit={level},tower=info,sea_orm=warn")));

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_target(false),
            )
            .try_init(),
        LogFormat::Text => registry.with(fmt::layer().with_target(false)).try_init(),
    };

    installed.map_err(|err| Error::Internal(format!("failed to install log subscriber: {err}")))
}

/// Root logger for one running instance of the application
pub fn instance_span() -> Span {
    tracing::info_span!("instance", id = %Uuid::new_v4())
}

/// Logger for a module, tagged with its name
pub fn module_span(parent: &Span, name: &'static str) -> Span {
    tracing::info_span!(parent: parent, "module", name)
}

/// Subscriber layer that records which span each event belongs to
#[cfg(test)]
pub(crate) mod capture {
    use std::sync::{Arc, Mutex};
    use tracing::field::{Field, Visit};
    use tracing::{Event, Subscriber};
    use tracing_subscriber::layer::{Context, Layer};
    use tracing_subscriber::registry::LookupSpan;

    #[derive(Clone, Default)]
    pub(crate) struct Captured(Arc<Mutex<Vec<(String, Option<String>)>>>);

    impl Captured {
        /// Name of the span the first event with `message` was logged under
        pub(crate) fn span_of(&self, message: &str) -> Option<String> {
            self.0
                .lock()
                .unwrap()
                .iter()
                .find(|(logged, _)| logged == message)
                .and_then(|(_, span)| span.clone())
        }
    }

    struct Message(String);

    impl Visit for Message {
        fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
            if field.name() == "message" {
                self.0 = format!("{value:?}");
            }
        }
    }

    impl<S> Layer<S> for Captured
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
            let mut message = Message(String::new());
            event.record(&mut message);
            let span = ctx.event_span(event).map(|span| span.name().to_string());
            self.0.lock().unwrap().push((message.0, span));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_is_rejected() {
        let config = LogConfig {
            level: "loud".into(),
            format: LogFormat::Text,
        };
        assert!(matches!(init(&config), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_events_land_in_the_named_module_span() {
        let captured = capture::Captured::default();
        let _guard = tracing::subscriber::set_default(
            tracing_subscriber::registry().with(captured.clone()),
        );

        let instance = instance_span();
        let module = module_span(&instance, "workout");
        tracing::info!(parent: &module, "hello");

        assert_eq!(captured.span_of("hello").as_deref(), Some("module"));
        assert_eq!(module.metadata().map(|m| m.name()), Some("module"));
    }

    #[test]
    fn test_module_span_without_subscriber_is_disabled() {
        let span = module_span(&Span::none(), "workout");
        assert!(span.is_disabled());
    }
}
