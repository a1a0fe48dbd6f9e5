//! Adapter shell: raw Lex event in, rendered dialog action out.
//!
//! [`Flex`] owns the frozen registry and the render options.  Transports
//! call one of three entry points:
//!
//! - [`Flex::handle`]: bytes in, `Option<String>` out, errors typed;
//! - [`Flex::respond`]: bytes in, [`WebhookReply`] out (status + body), for
//!   HTTP channels;
//! - [`Flex::handle_event`]: JSON in, JSON out, for Lambda-style runtimes.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::config::FlexConfig;
use crate::context::RequestContext;
use crate::dispatch::Dispatcher;
use crate::error::AdapterError;
use crate::logger::debug_dump;
use crate::registry::Registry;

pub const STATUS_OK: u16 = 200;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_INTERNAL_ERROR: u16 = 500;

/// Status and body handed back to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookReply {
    pub status: u16,
    pub body: String,
}

pub struct Flex {
    dispatcher: Dispatcher,
    pretty_debug_logs: bool,
}

impl Flex {
    /// Freeze `registry` and build the adapter.
    pub fn new(registry: Registry, config: &FlexConfig) -> Self {
        Self {
            dispatcher: Dispatcher::new(Arc::new(registry)),
            pretty_debug_logs: config.pretty_debug_logs,
        }
    }

    /// Process one raw request body.
    ///
    /// `Ok(None)` means the handler chose not to respond.
    pub fn handle(&self, body: &[u8]) -> Result<Option<String>, AdapterError> {
        let payload: Value = serde_json::from_slice(body)
            .map_err(|e| AdapterError::MalformedRequest(format!("invalid JSON: {e}")))?;
        self.process(payload)
    }

    /// Process one Lambda event and return the rendered response as JSON.
    pub fn handle_event(&self, event: Value) -> Result<Value, AdapterError> {
        let rendered = self.process(event)?.ok_or(AdapterError::NoResponse)?;
        Ok(serde_json::from_str(&rendered)?)
    }

    /// Like [`Flex::handle`], with errors folded into a status code.
    pub fn respond(&self, body: &[u8]) -> WebhookReply {
        match self.handle(body) {
            Ok(Some(body)) => WebhookReply {
                status: STATUS_OK,
                body,
            },
            Ok(None) => {
                debug!("handler returned no response");
                WebhookReply {
                    status: STATUS_BAD_REQUEST,
                    body: String::new(),
                }
            }
            Err(e) => {
                warn!("lex request failed: {e}");
                let status = if e.is_client_error() {
                    STATUS_BAD_REQUEST
                } else {
                    STATUS_INTERNAL_ERROR
                };
                WebhookReply {
                    status,
                    body: json!({ "error": e.code(), "message": e.to_string() }).to_string(),
                }
            }
        }
    }

    fn process(&self, payload: Value) -> Result<Option<String>, AdapterError> {
        debug_dump("lex request", &payload, self.pretty_debug_logs);

        let mut ctx = RequestContext::from_payload(payload)?;
        let invocation = self.dispatcher.dispatch(&ctx.intent())?;
        debug!(
            intent = invocation.intent_name(),
            args = invocation.args.len(),
            convert_errors = invocation.convert_errors.len(),
            "dispatching intent"
        );

        let Some(response) = invocation.invoke(&mut ctx) else {
            return Ok(None);
        };

        let rendered = response.render_response(ctx.session(), self.pretty_debug_logs)?;
        Ok(Some(rendered))
    }
}
