//! Lex webhook adapter.
//!
//! Maps inbound Amazon Lex (V1) code-hook events to handler functions by
//! intent name, binds slot values to the handler's declared parameters, and
//! renders the returned dialog action back to Lex.
//!
//! ```ignore
//! let mut registry = Registry::new();
//! registry.register(
//!     "OrderFlowers",
//!     Registration::new(|call| {
//!         let flower = call.args[0].as_str().unwrap_or("roses");
//!         Some(close(true).message(format!("Your {flower} are on the way")))
//!     })
//!     .param("flower")
//!     .map("flower", "FlowerType"),
//! );
//! let flex = Flex::new(registry, &FlexConfig::default());
//! let reply = flex.respond(body);
//! ```

pub mod adapter;
pub mod config;
pub mod context;
pub mod convert;
pub mod dispatch;
pub mod error;
pub mod field;
pub mod logger;
pub mod registry;
pub mod response;
#[cfg(feature = "channel-axum")]
pub mod server;

pub use adapter::{Flex, WebhookReply};
pub use config::FlexConfig;
pub use context::{Intent, RequestContext};
pub use convert::{ArgValue, Converter};
pub use dispatch::{Args, Call, ConversionErrors, Dispatcher, HandlerInvocation};
pub use error::{AdapterError, ConvertError, DispatchError, FieldError};
pub use field::{Entry, Field};
pub use registry::{Registration, Registry};
pub use response::{
    Attachment, Response, close, confirm_intent, delegate, elicit_intent, elicit_slot,
};
