//! Intent handler registry.
//!
//! A [`Registration`] bundles a handler with everything needed to bind its
//! parameters: the declared parameter order, slot renames, converters and
//! defaults.  The [`Registry`] stores one registration per intent name plus
//! an optional fallback.
//!
//! Registering is only possible through `&mut Registry`.  Once the registry
//! is handed to [`crate::adapter::Flex`] it sits behind an `Arc` and can no
//! longer change, so concurrent dispatch only ever reads it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::convert::{ArgValue, Converter};
use crate::dispatch::Call;
use crate::response::Response;

type HandlerFn = dyn Fn(Call<'_>) -> Option<Response> + Send + Sync;
type DefaultFn = dyn Fn() -> ArgValue + Send + Sync;

/// An intent handler.  Returning `None` yields an empty client-error reply.
pub type Handler = Arc<HandlerFn>;

/// Value used when a parameter's slot is unfilled.
#[derive(Clone)]
pub enum DefaultValue {
    Value(ArgValue),
    /// Evaluated at dispatch time, once per request.
    Lazy(Arc<DefaultFn>),
}

impl DefaultValue {
    pub fn resolve(&self) -> ArgValue {
        match self {
            DefaultValue::Value(v) => v.clone(),
            DefaultValue::Lazy(f) => f(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Value(v) => f.debug_tuple("Value").field(v).finish(),
            DefaultValue::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

/// Handler plus its parameter binding rules.
///
/// ```ignore
/// Registration::new(order_flowers)
///     .params(["flower", "pickup_date", "pickup_time"])
///     .map("flower", "FlowerType")
///     .map("pickup_date", "PickupDate")
///     .convert("pickup_date", Converter::Date)
///     .default("flower", "roses");
/// ```
#[derive(Clone)]
pub struct Registration {
    pub(crate) handler: Handler,
    pub(crate) params: Vec<String>,
    pub(crate) mapping: HashMap<String, String>,
    pub(crate) convert: HashMap<String, Converter>,
    pub(crate) defaults: HashMap<String, DefaultValue>,
}

impl Registration {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(Call<'_>) -> Option<Response> + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            params: Vec::new(),
            mapping: HashMap::new(),
            convert: HashMap::new(),
            defaults: HashMap::new(),
        }
    }

    /// Append one declared parameter.  Declaration order is argument order.
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(name.into());
        self
    }

    pub fn params<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params.extend(names.into_iter().map(Into::into));
        self
    }

    /// Read parameter `param` from slot `slot` instead of a slot of the same name.
    pub fn map(mut self, param: impl Into<String>, slot: impl Into<String>) -> Self {
        self.mapping.insert(param.into(), slot.into());
        self
    }

    pub fn convert(mut self, param: impl Into<String>, converter: Converter) -> Self {
        self.convert.insert(param.into(), converter);
        self
    }

    /// Literal default for an unfilled slot.
    pub fn default(mut self, param: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.defaults
            .insert(param.into(), DefaultValue::Value(value.into()));
        self
    }

    /// Default computed at dispatch time for an unfilled slot.
    pub fn default_with<F>(mut self, param: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> ArgValue + Send + Sync + 'static,
    {
        self.defaults
            .insert(param.into(), DefaultValue::Lazy(Arc::new(f)));
        self
    }

    pub fn declared_params(&self) -> &[String] {
        &self.params
    }

    /// Slot key read for `param`: the explicit rename, else the name itself.
    pub fn slot_key<'a>(&'a self, param: &'a str) -> &'a str {
        self.mapping.get(param).map(String::as_str).unwrap_or(param)
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("params", &self.params)
            .field("mapping", &self.mapping)
            .field("convert", &self.convert)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

/// Intent name → registration, plus an optional fallback.
#[derive(Debug, Default)]
pub struct Registry {
    intents: HashMap<String, Registration>,
    fallback: Option<Registration>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `registration` for `intent_name`.
    ///
    /// Last write wins: an existing registration for the same name is
    /// replaced and returned.
    pub fn register(
        &mut self,
        intent_name: impl Into<String>,
        registration: Registration,
    ) -> Option<Registration> {
        let intent_name = intent_name.into();
        debug!(intent = %intent_name, params = ?registration.params, "intent registered");
        let previous = self.intents.insert(intent_name.clone(), registration);
        if previous.is_some() {
            warn!(intent = %intent_name, "intent handler replaced by later registration");
        }
        previous
    }

    /// Register the handler used when no intent name matches.
    pub fn register_default(&mut self, registration: Registration) -> Option<Registration> {
        debug!(params = ?registration.params, "default intent registered");
        self.fallback.replace(registration)
    }

    /// Exact match first, then the fallback.
    pub fn resolve(&self, intent_name: &str) -> Option<&Registration> {
        self.intents.get(intent_name).or(self.fallback.as_ref())
    }

    pub fn contains(&self, intent_name: &str) -> bool {
        self.intents.contains_key(intent_name)
    }

    pub fn has_default(&self) -> bool {
        self.fallback.is_some()
    }

    pub fn intent_names(&self) -> impl Iterator<Item = &str> {
        self.intents.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty() && self.fallback.is_none()
    }
}
