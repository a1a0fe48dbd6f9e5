//! Request-scoped context built from one inbound Lex event.
//!
//! One [`RequestContext`] is created per webhook call and passed explicitly
//! through dispatch and render; nothing about a request is kept in shared
//! state.  Handlers may edit the session attributes through
//! [`RequestContext::session_mut`]; the edited map is what gets rendered back.

use std::borrow::Cow;
use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::AdapterError;
use crate::field::{Entry, Field};
use crate::response::Slots;

const CURRENT_INTENT: &str = "currentIntent";

/// Read-only view over `currentIntent`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intent<'a> {
    name: &'a str,
    slots: Option<Field<'a>>,
    confirmation_status: Option<&'a str>,
}

impl<'a> Intent<'a> {
    pub fn new(name: &'a str, slots: Option<Field<'a>>) -> Self {
        Self {
            name,
            slots,
            confirmation_status: None,
        }
    }

    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn slots(&self) -> Option<Field<'a>> {
        self.slots
    }

    /// `None`, `Confirmed` or `Denied` when Lex sends it.
    pub fn confirmation_status(&self) -> Option<&'a str> {
        self.confirmation_status
    }

    /// Every non-null slot as text, keyed by slot name.
    pub fn slot_values(&self) -> HashMap<&'a str, Cow<'a, str>> {
        let Some(slots) = self.slots else {
            return HashMap::new();
        };
        slots
            .iter()
            .filter_map(|(name, entry)| entry.map(|e| (name, entry_text(e))))
            .collect()
    }

    /// Copy of the slot map, ready to hand back in an elicit/confirm/delegate.
    pub fn slots_map(&self) -> Slots {
        self.slots.map(|f| f.as_map().clone()).unwrap_or_default()
    }
}

fn entry_text(entry: Entry<'_>) -> Cow<'_, str> {
    match entry.as_str() {
        Some(s) => Cow::Borrowed(s),
        None => Cow::Owned(entry.to_text()),
    }
}

/// Everything a handler may need to know about the current request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    payload: Map<String, Value>,
    intent_name: String,
    session: Map<String, Value>,
}

impl RequestContext {
    /// Validate the event shape and capture its session attributes.
    ///
    /// The payload must be an object carrying `currentIntent.name`.
    pub fn from_payload(payload: Value) -> Result<Self, AdapterError> {
        let Value::Object(payload) = payload else {
            return Err(AdapterError::MalformedRequest("payload is not a JSON object".into()));
        };

        let field = Field::from_map(&payload);
        let intent_name = field
            .path("currentIntent.name")
            .and_then(|e| e.as_str())
            .ok_or_else(|| AdapterError::MalformedRequest("missing currentIntent.name".into()))?
            .to_string();
        let session = field
            .field("sessionAttributes")
            .map(|f| f.as_map().clone())
            .unwrap_or_default();

        Ok(Self {
            payload,
            intent_name,
            session,
        })
    }

    /// The whole event as a Structured Field.
    pub fn field(&self) -> Field<'_> {
        Field::from_map(&self.payload)
    }

    pub fn intent(&self) -> Intent<'_> {
        let current = self.field().field(CURRENT_INTENT);
        Intent {
            name: &self.intent_name,
            slots: current.and_then(|c| c.field("slots")),
            confirmation_status: current.and_then(|c| c.str("confirmationStatus")),
        }
    }

    pub fn bot(&self) -> Option<Field<'_>> {
        self.field().field("bot")
    }

    pub fn user_id(&self) -> Option<&str> {
        self.field().str("userId")
    }

    pub fn input_transcript(&self) -> Option<&str> {
        self.field().str("inputTranscript")
    }

    /// `DialogCodeHook` or `FulfillmentCodeHook`.
    pub fn invocation_source(&self) -> Option<&str> {
        self.field().str("invocationSource")
    }

    /// `Text` or `Voice`.
    pub fn output_dialog_mode(&self) -> Option<&str> {
        self.field().str("outputDialogMode")
    }

    pub fn message_version(&self) -> Option<&str> {
        self.field().str("messageVersion")
    }

    pub fn request_attributes(&self) -> Option<Field<'_>> {
        self.field().field("requestAttributes")
    }

    pub fn session(&self) -> &Map<String, Value> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event() -> Value {
        json!({
            "currentIntent": {
                "name": "OrderFlowers",
                "slots": { "FlowerType": "roses", "PickupDate": null, "Count": 3 },
                "confirmationStatus": "None"
            },
            "bot": { "name": "FlowerBot", "alias": "$LATEST", "version": "$LATEST" },
            "userId": "user-42",
            "inputTranscript": "I want roses",
            "invocationSource": "DialogCodeHook",
            "outputDialogMode": "Text",
            "messageVersion": "1.0",
            "sessionAttributes": { "visits": "1" },
            "requestAttributes": null
        })
    }

    #[test]
    fn populates_context_fields() {
        let ctx = RequestContext::from_payload(event()).unwrap();
        assert_eq!(ctx.intent().name(), "OrderFlowers");
        assert_eq!(ctx.intent().confirmation_status(), Some("None"));
        assert_eq!(ctx.bot().and_then(|b| b.str("name")), Some("FlowerBot"));
        assert_eq!(ctx.user_id(), Some("user-42"));
        assert_eq!(ctx.input_transcript(), Some("I want roses"));
        assert_eq!(ctx.invocation_source(), Some("DialogCodeHook"));
        assert_eq!(ctx.output_dialog_mode(), Some("Text"));
        assert_eq!(ctx.message_version(), Some("1.0"));
        assert!(ctx.request_attributes().is_none());
        assert_eq!(ctx.session().get("visits"), Some(&json!("1")));
    }

    #[test]
    fn slot_values_skip_nulls_and_stringify_scalars() {
        let ctx = RequestContext::from_payload(event()).unwrap();
        let values = ctx.intent().slot_values();
        assert_eq!(values.get("FlowerType").map(|v| v.as_ref()), Some("roses"));
        assert_eq!(values.get("Count").map(|v| v.as_ref()), Some("3"));
        assert!(!values.contains_key("PickupDate"));
    }

    #[test]
    fn slots_map_keeps_nulls() {
        let ctx = RequestContext::from_payload(event()).unwrap();
        let slots = ctx.intent().slots_map();
        assert_eq!(slots.len(), 3);
        assert!(slots["PickupDate"].is_null());
    }

    #[test]
    fn missing_slots_yield_empty_values() {
        let ctx = RequestContext::from_payload(json!({
            "currentIntent": { "name": "Hello", "slots": null }
        }))
        .unwrap();
        assert!(ctx.intent().slot_values().is_empty());
        assert!(ctx.session().is_empty());
    }

    #[test]
    fn missing_intent_is_malformed() {
        let err = RequestContext::from_payload(json!({ "userId": "u" })).unwrap_err();
        assert!(matches!(err, AdapterError::MalformedRequest(_)));
        let err = RequestContext::from_payload(json!("text")).unwrap_err();
        assert!(matches!(err, AdapterError::MalformedRequest(_)));
    }

    #[test]
    fn session_is_mutable_per_request() {
        let mut ctx = RequestContext::from_payload(event()).unwrap();
        ctx.session_mut().insert("visits".into(), json!("2"));
        let other = RequestContext::from_payload(event()).unwrap();
        assert_eq!(ctx.session()["visits"], "2");
        assert_eq!(other.session()["visits"], "1");
    }
}
