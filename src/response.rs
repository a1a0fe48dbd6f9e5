//! Dialog-action responses returned by intent handlers.
//!
//! A handler builds one of the five Lex dialog actions, optionally adds a
//! message and response-card attachments, and returns it.  Session
//! attributes are not part of the response value; they are merged in by
//! [`Response::render_response`] from the request context.
//!
//! ```text
//! {
//!   "dialogAction": { "type": "Close", "fulfillmentState": "Fulfilled",
//!                     "message": {..}, "responseCard": {..} },
//!   "sessionAttributes": {..}
//! }
//! ```

use serde::Serialize;
use serde_json::{Map, Value};

use crate::logger::debug_dump;

/// Slot name → value (string or null) as Lex expects them back.
pub type Slots = Map<String, Value>;

const CARD_VERSION: u32 = 1;
const GENERIC_CARD_CONTENT_TYPE: &str = "application/vnd.amazonaws.card.generic";
const SSML_ROOT_TAG: &str = "speak";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FulfillmentState {
    Fulfilled,
    Failed,
}

/// The directive telling Lex what to do next.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum DialogAction {
    Close {
        #[serde(rename = "fulfillmentState")]
        fulfillment_state: FulfillmentState,
    },
    ConfirmIntent {
        #[serde(rename = "intentName")]
        intent_name: String,
        slots: Slots,
    },
    Delegate {
        slots: Slots,
    },
    ElicitIntent,
    ElicitSlot {
        #[serde(rename = "intentName")]
        intent_name: String,
        #[serde(rename = "slotToElicit")]
        slot_to_elicit: String,
        slots: Slots,
    },
}

impl DialogAction {
    /// Wire name of the action type.
    pub fn kind(&self) -> &'static str {
        match self {
            DialogAction::Close { .. } => "Close",
            DialogAction::ConfirmIntent { .. } => "ConfirmIntent",
            DialogAction::Delegate { .. } => "Delegate",
            DialogAction::ElicitIntent => "ElicitIntent",
            DialogAction::ElicitSlot { .. } => "ElicitSlot",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ContentType {
    #[serde(rename = "SSML")]
    Ssml,
    PlainText,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub content_type: ContentType,
    pub content: String,
}

impl Message {
    /// Tag `content` as SSML when it is well-formed XML rooted at `<speak>`,
    /// plain text otherwise.  Never fails.
    pub fn new(content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            content_type: classify(&content),
            content,
        }
    }
}

fn classify(content: &str) -> ContentType {
    match roxmltree::Document::parse(content) {
        Ok(doc) => {
            let root = doc.root_element().tag_name();
            if root.name() == SSML_ROOT_TAG && root.namespace().is_none() {
                ContentType::Ssml
            } else {
                ContentType::PlainText
            }
        }
        Err(_) => ContentType::PlainText,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Button {
    pub text: String,
    pub value: String,
}

/// One entry of a generic response card.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(rename = "subTitle", skip_serializing_if = "Option::is_none")]
    sub_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attachment_link_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    buttons: Option<Vec<Button>>,
}

impl Attachment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.sub_title = Some(subtitle.into());
        self
    }

    pub fn image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn attachment_url(mut self, url: impl Into<String>) -> Self {
        self.attachment_link_url = Some(url.into());
        self
    }

    pub fn button(mut self, text: impl Into<String>, value: impl Into<String>) -> Self {
        self.buttons.get_or_insert_with(Vec::new).push(Button {
            text: text.into(),
            value: value.into(),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseCard {
    version: u32,
    content_type: &'static str,
    generic_attachments: Vec<Attachment>,
}

impl ResponseCard {
    fn generic() -> Self {
        Self {
            version: CARD_VERSION,
            content_type: GENERIC_CARD_CONTENT_TYPE,
            generic_attachments: Vec::new(),
        }
    }
}

/// A dialog action plus its optional message and response card.
///
/// Serializes as the body of `dialogAction`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    #[serde(flatten)]
    action: DialogAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_card: Option<ResponseCard>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<'a> {
    dialog_action: &'a Response,
    session_attributes: &'a Map<String, Value>,
}

impl Response {
    pub fn new(action: DialogAction) -> Self {
        Self {
            action,
            message: None,
            response_card: None,
        }
    }

    pub fn action(&self) -> &DialogAction {
        &self.action
    }

    /// Set the message, replacing any earlier one.
    pub fn message(mut self, content: impl Into<String>) -> Self {
        self.message = Some(Message::new(content));
        self
    }

    /// Append one attachment to the generic response card, creating the card
    /// on first use.
    pub fn response_card(mut self, attachment: Attachment) -> Self {
        self.response_card
            .get_or_insert_with(ResponseCard::generic)
            .generic_attachments
            .push(attachment);
        self
    }

    /// Serialize the response with `session` attached as
    /// `sessionAttributes`, logging the result at debug level.
    pub fn render_response(
        &self,
        session: &Map<String, Value>,
        pretty_debug_logs: bool,
    ) -> Result<String, serde_json::Error> {
        let envelope = Envelope {
            dialog_action: self,
            session_attributes: session,
        };
        let body = serde_json::to_string(&envelope)?;
        debug_dump("lex response", &envelope, pretty_debug_logs);
        Ok(body)
    }
}

pub fn close(fulfilled: bool) -> Response {
    let fulfillment_state = if fulfilled {
        FulfillmentState::Fulfilled
    } else {
        FulfillmentState::Failed
    };
    Response::new(DialogAction::Close { fulfillment_state })
}

pub fn confirm_intent(intent_name: impl Into<String>, slots: Slots) -> Response {
    Response::new(DialogAction::ConfirmIntent {
        intent_name: intent_name.into(),
        slots,
    })
}

pub fn delegate(slots: Slots) -> Response {
    Response::new(DialogAction::Delegate { slots })
}

pub fn elicit_intent() -> Response {
    Response::new(DialogAction::ElicitIntent)
}

pub fn elicit_slot(
    intent_name: impl Into<String>,
    slot_to_elicit: impl Into<String>,
    slots: Slots,
) -> Response {
    Response::new(DialogAction::ElicitSlot {
        intent_name: intent_name.into(),
        slot_to_elicit: slot_to_elicit.into(),
        slots,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(response: &Response) -> Value {
        let session = Map::new();
        let body = response.render_response(&session, false).unwrap();
        serde_json::from_str(&body).unwrap()
    }

    fn slots() -> Slots {
        let mut slots = Map::new();
        slots.insert("FlowerType".into(), json!("roses"));
        slots.insert("PickupDate".into(), Value::Null);
        slots
    }

    #[test]
    fn close_fulfilled_and_failed() {
        let ok = render(&close(true));
        assert_eq!(ok["dialogAction"]["type"], "Close");
        assert_eq!(ok["dialogAction"]["fulfillmentState"], "Fulfilled");

        let failed = render(&close(false));
        assert_eq!(failed["dialogAction"]["fulfillmentState"], "Failed");
    }

    #[test]
    fn ssml_message_is_tagged() {
        let out = render(&close(true).message("<speak>hi</speak>"));
        assert_eq!(out["dialogAction"]["message"]["contentType"], "SSML");
        assert_eq!(out["dialogAction"]["message"]["content"], "<speak>hi</speak>");
    }

    #[test]
    fn plain_and_malformed_messages_are_plain_text() {
        for text in ["hi", "<speak", "<p>hi</p>", "<speak>a</speak><speak>b</speak>", ""] {
            assert_eq!(Message::new(text).content_type, ContentType::PlainText, "{text}");
        }
    }

    #[test]
    fn namespaced_speak_is_plain_text() {
        let msg = Message::new(r#"<speak xmlns="http://www.w3.org/2001/10/synthesis">hi</speak>"#);
        assert_eq!(msg.content_type, ContentType::PlainText);
    }

    #[test]
    fn response_cards_accumulate_in_order() {
        let response = elicit_intent()
            .response_card(Attachment::new().title("first").button("Yes", "yes"))
            .response_card(Attachment::new().title("second").subtitle("sub"));
        let out = render(&response);
        let card = &out["dialogAction"]["responseCard"];
        assert_eq!(card["version"], 1);
        assert_eq!(card["contentType"], GENERIC_CARD_CONTENT_TYPE);
        let attachments = card["genericAttachments"].as_array().unwrap();
        assert_eq!(attachments.len(), 2);
        assert_eq!(attachments[0]["title"], "first");
        assert_eq!(attachments[0]["buttons"][0], json!({ "text": "Yes", "value": "yes" }));
        assert_eq!(attachments[1]["title"], "second");
        assert_eq!(attachments[1]["subTitle"], "sub");
        assert!(attachments[1].get("buttons").is_none());
    }

    #[test]
    fn elicit_slot_fields() {
        let out = render(&elicit_slot("OrderFlowers", "PickupDate", slots()));
        let action = &out["dialogAction"];
        assert_eq!(action["type"], "ElicitSlot");
        assert_eq!(action["intentName"], "OrderFlowers");
        assert_eq!(action["slotToElicit"], "PickupDate");
        assert_eq!(action["slots"]["FlowerType"], "roses");
        assert!(action["slots"]["PickupDate"].is_null());
    }

    #[test]
    fn confirm_and_delegate_carry_slots() {
        let confirm = render(&confirm_intent("OrderFlowers", slots()));
        assert_eq!(confirm["dialogAction"]["type"], "ConfirmIntent");
        assert_eq!(confirm["dialogAction"]["intentName"], "OrderFlowers");

        let delegated = render(&delegate(slots()));
        assert_eq!(delegated["dialogAction"]["type"], "Delegate");
        assert_eq!(delegated["dialogAction"]["slots"]["FlowerType"], "roses");
    }

    #[test]
    fn elicit_intent_has_only_type() {
        let out = render(&elicit_intent());
        assert_eq!(out["dialogAction"], json!({ "type": "ElicitIntent" }));
    }

    #[test]
    fn session_attributes_are_attached_at_render() {
        let mut session = Map::new();
        session.insert("orders".into(), json!("2"));
        let body = close(true).render_response(&session, true).unwrap();
        let out: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(out["sessionAttributes"], json!({ "orders": "2" }));
    }

    #[test]
    fn kind_matches_wire_tag() {
        for response in [close(true), delegate(Map::new()), elicit_intent()] {
            let out = render(&response);
            assert_eq!(out["dialogAction"]["type"], response.action().kind());
        }
    }
}
