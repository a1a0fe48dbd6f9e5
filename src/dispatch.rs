//! Intent dispatch and parameter binding.
//!
//! [`Dispatcher::dispatch`] resolves the current intent to a registration
//! and binds each declared parameter, in order, against the intent's slots:
//!
//! 1. the slot key is the parameter's mapped name, or the parameter name;
//! 2. an absent or empty slot is *unfilled* and takes the parameter's
//!    default when one is registered (lazy defaults run now);
//! 3. a filled slot goes through the parameter's converter when one is
//!    registered.  A failing converter does not abort binding: the error is
//!    recorded under the parameter name and the raw text is passed on;
//! 4. anything else is passed as raw text.
//!
//! An unfilled slot without a default is passed through as-is: `Null` when
//! absent, empty text when empty.  A default that is itself `Null` looks the
//! same to the handler as no value at all.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::ops::Index;
use std::sync::Arc;

use tracing::debug;

use crate::context::{Intent, RequestContext};
use crate::convert::ArgValue;
use crate::error::{ConvertError, DispatchError};
use crate::registry::{Handler, Registration, Registry};
use crate::response::Response;

/// Parameter name → conversion failure, for one dispatch.
pub type ConversionErrors = BTreeMap<String, ConvertError>;

/// Positional handler arguments in declared-parameter order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    names: Vec<String>,
    values: Vec<ArgValue>,
}

impl Args {
    fn push(&mut self, name: &str, value: ArgValue) {
        self.names.push(name.to_string());
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ArgValue> {
        self.values.get(index)
    }

    /// Look an argument up by its parameter name.
    pub fn named(&self, name: &str) -> Option<&ArgValue> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.names.iter().map(String::as_str).zip(self.values.iter())
    }

    pub fn values(&self) -> &[ArgValue] {
        &self.values
    }
}

impl Index<usize> for Args {
    type Output = ArgValue;

    fn index(&self, index: usize) -> &ArgValue {
        &self.values[index]
    }
}

/// What a handler receives: bound arguments, conversion diagnostics and the
/// request context.
pub struct Call<'a> {
    pub args: Args,
    pub convert_errors: ConversionErrors,
    pub ctx: &'a mut RequestContext,
}

/// A resolved handler with its arguments bound, ready to run.
pub struct HandlerInvocation {
    intent_name: String,
    handler: Handler,
    pub args: Args,
    pub convert_errors: ConversionErrors,
}

impl HandlerInvocation {
    pub fn intent_name(&self) -> &str {
        &self.intent_name
    }

    pub fn invoke(self, ctx: &mut RequestContext) -> Option<Response> {
        (self.handler)(Call {
            args: self.args,
            convert_errors: self.convert_errors,
            ctx,
        })
    }
}

/// Resolves intents against a frozen [`Registry`].
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn dispatch(&self, intent: &Intent<'_>) -> Result<HandlerInvocation, DispatchError> {
        let registration =
            self.registry
                .resolve(intent.name())
                .ok_or_else(|| DispatchError::HandlerNotFound {
                    intent: intent.name().to_string(),
                })?;

        if !self.registry.contains(intent.name()) {
            debug!(intent = intent.name(), "no handler registered, using default intent");
        }

        let (args, convert_errors) = bind_args(registration, &intent.slot_values());

        Ok(HandlerInvocation {
            intent_name: intent.name().to_string(),
            handler: registration.handler.clone(),
            args,
            convert_errors,
        })
    }
}

/// Bind every declared parameter of `registration` against `slots`.
pub fn bind_args(
    registration: &Registration,
    slots: &HashMap<&str, Cow<'_, str>>,
) -> (Args, ConversionErrors) {
    let mut args = Args::default();
    let mut errors = ConversionErrors::new();

    for param in &registration.params {
        let raw = slots.get(registration.slot_key(param)).map(|v| v.as_ref());

        let value = match raw.filter(|v| !v.is_empty()) {
            None => match registration.defaults.get(param) {
                Some(default) => default.resolve(),
                None => raw.map(ArgValue::from).unwrap_or(ArgValue::Null),
            },
            Some(filled) => match registration.convert.get(param) {
                Some(converter) => converter.convert(filled).unwrap_or_else(|e| {
                    debug!(param = %param, value = filled, "slot conversion failed: {e}");
                    errors.insert(param.clone(), e);
                    ArgValue::from(filled)
                }),
                None => ArgValue::from(filled),
            },
        };

        args.push(param, value);
    }

    (args, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::NaiveDate;
    use serde_json::{Value, json};

    use crate::convert::Converter;
    use crate::field::Field;
    use crate::response::close;

    fn noop() -> Registration {
        Registration::new(|_call| Some(close(true)))
    }

    fn slots(pairs: &[(&'static str, &'static str)]) -> HashMap<&'static str, Cow<'static, str>> {
        pairs.iter().map(|(k, v)| (*k, Cow::Borrowed(*v))).collect()
    }

    fn dispatcher(registry: Registry) -> Dispatcher {
        Dispatcher::new(Arc::new(registry))
    }

    #[test]
    fn args_follow_declared_order() {
        let reg = noop().params(["b", "a"]);
        let (args, errors) = bind_args(&reg, &slots(&[("a", "1"), ("b", "2")]));
        assert_eq!(args.values(), [ArgValue::from("2"), ArgValue::from("1")]);
        assert!(errors.is_empty());
    }

    #[test]
    fn args_iterate_with_names() {
        let reg = noop().params(["a", "b"]);
        let (args, _) = bind_args(&reg, &slots(&[("a", "1")]));
        let pairs: Vec<(&str, &ArgValue)> = args.iter().collect();
        assert_eq!(pairs, vec![("a", &ArgValue::from("1")), ("b", &ArgValue::Null)]);
        assert_eq!(args.len(), 2);
        assert!(args.get(2).is_none());
    }

    #[test]
    fn mapping_takes_precedence_over_param_name() {
        let reg = noop().param("city").map("city", "City");
        let (args, _) = bind_args(&reg, &slots(&[("City", "Paris"), ("city", "Rome")]));
        assert_eq!(args[0].as_str(), Some("Paris"));
    }

    #[test]
    fn literal_default_fills_absent_and_empty() {
        let reg = noop().params(["size", "crust"]).default("size", "large").default("crust", "thin");
        let (args, _) = bind_args(&reg, &slots(&[("crust", "")]));
        assert_eq!(args.named("size").and_then(|v| v.as_str()), Some("large"));
        assert_eq!(args.named("crust").and_then(|v| v.as_str()), Some("thin"));
    }

    #[test]
    fn lazy_default_runs_at_dispatch_time() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let reg = noop().param("n").default_with("n", || {
            ArgValue::from(CALLS.fetch_add(1, Ordering::SeqCst) as i64)
        });
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);

        let (first, _) = bind_args(&reg, &slots(&[]));
        let (second, _) = bind_args(&reg, &slots(&[]));
        assert_eq!(first[0].as_i64(), Some(0));
        assert_eq!(second[0].as_i64(), Some(1));
    }

    #[test]
    fn default_not_used_for_filled_slot() {
        let reg = noop().param("size").default("size", "large");
        let (args, _) = bind_args(&reg, &slots(&[("size", "small")]));
        assert_eq!(args[0].as_str(), Some("small"));
    }

    #[test]
    fn unfilled_without_default_passes_through() {
        let reg = noop().params(["absent", "empty"]);
        let (args, _) = bind_args(&reg, &slots(&[("empty", "")]));
        assert!(args[0].is_null());
        assert_eq!(args[1].as_str(), Some(""));
    }

    #[test]
    fn whitespace_and_zero_count_as_filled() {
        let reg = noop().params(["a", "b"]).default("a", "x").default("b", "y");
        let (args, _) = bind_args(&reg, &slots(&[("a", " "), ("b", "0")]));
        assert_eq!(args[0].as_str(), Some(" "));
        assert_eq!(args[1].as_str(), Some("0"));
    }

    #[test]
    fn converter_applies_to_filled_slot() {
        let reg = noop().param("day").convert("day", Converter::Date);
        let (args, errors) = bind_args(&reg, &slots(&[("day", "2017-06-12")]));
        assert_eq!(args[0].as_date(), NaiveDate::from_ymd_opt(2017, 6, 12));
        assert!(errors.is_empty());
    }

    #[test]
    fn failed_conversion_is_isolated() {
        let reg = noop()
            .params(["day", "count", "name"])
            .convert("day", Converter::Date)
            .convert(
                "count",
                Converter::custom(|raw| raw.parse::<i64>().map(ArgValue::from).map_err(ConvertError::custom)),
            );
        let (args, errors) = bind_args(
            &reg,
            &slots(&[("day", "someday"), ("count", "7"), ("name", "Ann")]),
        );

        assert_eq!(args[0].as_str(), Some("someday"));
        assert_eq!(args[1].as_i64(), Some(7));
        assert_eq!(args[2].as_str(), Some("Ann"));
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors.get("day"), Some(ConvertError::Date(_))));
    }

    #[test]
    fn converter_skipped_for_defaults() {
        let reg = noop().param("day").convert("day", Converter::Date).default("day", "whenever");
        let (args, errors) = bind_args(&reg, &slots(&[]));
        assert_eq!(args[0].as_str(), Some("whenever"));
        assert!(errors.is_empty());
    }

    #[test]
    fn dispatch_unknown_intent_without_default_fails() {
        let mut registry = Registry::new();
        registry.register("Hello", noop());
        let intent = Intent::new("Goodbye", None);
        let err = dispatcher(registry).dispatch(&intent).err();
        assert_eq!(err, Some(DispatchError::HandlerNotFound { intent: "Goodbye".into() }));
    }

    #[test]
    fn dispatch_unknown_intent_uses_default() {
        let mut registry = Registry::new();
        registry.register("Hello", noop().param("x"));
        registry.register_default(noop().params(["Greeting", "missing"]));

        let value: Value = json!({ "Greeting": "hey" });
        let slots = Field::wrap(&value).unwrap();
        let invocation = dispatcher(registry)
            .dispatch(&Intent::new("Goodbye", Some(slots)))
            .unwrap();

        assert_eq!(invocation.intent_name(), "Goodbye");
        assert_eq!(invocation.args[0].as_str(), Some("hey"));
        assert!(invocation.args[1].is_null());
    }

    #[test]
    fn invocation_passes_args_and_errors_to_handler() {
        let mut registry = Registry::new();
        registry.register(
            "OrderFlowers",
            Registration::new(|call| {
                let flower = call.args[0].as_str().unwrap_or("none").to_string();
                call.ctx.session_mut().insert("flower".into(), json!(flower));
                call.ctx
                    .session_mut()
                    .insert("errors".into(), json!(call.convert_errors.len()));
                Some(close(true))
            })
            .params(["flower", "when"])
            .map("flower", "FlowerType")
            .convert("when", Converter::Date),
        );

        let mut ctx = RequestContext::from_payload(json!({
            "currentIntent": {
                "name": "OrderFlowers",
                "slots": { "FlowerType": "tulips", "when": "not-a-date" }
            }
        }))
        .unwrap();

        let invocation = dispatcher(registry).dispatch(&ctx.intent()).unwrap();
        let response = invocation.invoke(&mut ctx);

        assert!(response.is_some());
        assert_eq!(ctx.session()["flower"], "tulips");
        assert_eq!(ctx.session()["errors"], 1);
    }
}
