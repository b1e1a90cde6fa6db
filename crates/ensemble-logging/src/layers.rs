//! Custom tracing layers for Ensemble
//!
//! This module provides the layer that attaches group-session context to
//! spans, plus the JSONL formatting layer used for file output.

use tracing::{Subscriber, span};
use tracing_subscriber::{
    layer::{Context, Layer},
    registry::LookupSpan,
};

use crate::config::JsonlConfig;
use crate::context::{SessionContextData, SessionContextGuard};

/// Layer that attaches session context to spans
///
/// Every span created while a [`SessionContextGuard`] is active carries a
/// [`SessionContextExtension`] that downstream layers can read.
pub struct SessionContextLayer;

impl SessionContextLayer {
    /// Create a new session context layer
    pub fn new() -> Self {
        Self
    }
}

impl Default for SessionContextLayer {
    fn default() -> Self {
        Self::new()
    }
}

/// Extension data stored on spans
#[derive(Debug, Clone)]
pub struct SessionContextExtension {
    pub data: SessionContextData,
}

impl<S> Layer<S> for SessionContextLayer
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    fn on_new_span(&self, _attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(id)
            && let Some(session_ctx) = SessionContextGuard::current()
        {
            span.extensions_mut()
                .insert(SessionContextExtension { data: session_ctx });
        }
    }
}

/// Create a JSONL formatting layer
///
/// Configures tracing-subscriber's JSON formatter from a [`JsonlConfig`].
pub fn jsonl_layer<S, W>(
    writer: W,
    config: &JsonlConfig,
) -> tracing_subscriber::fmt::Layer<
    S,
    tracing_subscriber::fmt::format::JsonFields,
    tracing_subscriber::fmt::format::Format<tracing_subscriber::fmt::format::Json>,
    W,
>
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
    W: for<'writer> tracing_subscriber::fmt::MakeWriter<'writer> + 'static,
{
    tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(config.include_current_span)
        .with_span_list(config.include_spans)
        .flatten_event(config.flatten_events)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_thread_ids(config.include_thread_info)
        .with_thread_names(config.include_thread_info)
        .with_ansi(false)
        .with_writer(writer)
}
