//! lex-flex: sample flower-ordering bot served over HTTP.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Init logger at configured level
//!   4. Register intents
//!   5. Serve the webhook until Ctrl-C

use std::sync::Arc;

use lex_flex::config;
use lex_flex::error::AppError;
use lex_flex::logger;
use lex_flex::server;
use lex_flex::{
    Attachment, Call, Converter, Flex, Registration, Registry, Response, close,
    delegate, elicit_intent, elicit_slot,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const FULFILLMENT_HOOK: &str = "FulfillmentCodeHook";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // .env is optional.
    let _ = dotenvy::dotenv();

    let config = config::load()?;
    logger::init(&config.log_level, false)?;

    info!(
        log_level = %config.log_level,
        pretty_debug_logs = config.flex.pretty_debug_logs,
        "config loaded"
    );

    let flex = Arc::new(Flex::new(registry(), &config.flex));

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("ctrl-c handler failed: {e}");
        }
        signal_token.cancel();
    });

    server::serve(flex, &config.server, shutdown).await
}

fn registry() -> Registry {
    let mut registry = Registry::new();

    registry.register(
        "OrderFlowers",
        Registration::new(order_flowers)
            .params(["flower_type", "pickup_date", "pickup_time"])
            .map("flower_type", "FlowerType")
            .map("pickup_date", "PickupDate")
            .map("pickup_time", "PickupTime")
            .convert("pickup_date", Converter::Date)
            .convert("pickup_time", Converter::Time),
    );

    registry.register(
        "Greeting",
        Registration::new(greeting)
            .param("name")
            .map("name", "FirstName")
            .default("name", "friend"),
    );

    registry.register_default(Registration::new(|_call| {
        Some(
            elicit_intent()
                .message("I can help you order flowers. What would you like to do?")
                .response_card(
                    Attachment::new()
                        .title("Flower shop")
                        .button("Order flowers", "I would like to order flowers")
                        .button("Say hello", "Hello"),
                ),
        )
    }));

    registry
}

fn order_flowers(call: Call<'_>) -> Option<Response> {
    let intent = call.ctx.intent();
    let slots = intent.slots_map();

    if call.ctx.invocation_source() == Some(FULFILLMENT_HOOK) {
        let flower = call.args[0].as_str().unwrap_or("flowers");
        let message = match (call.args[1].as_date(), call.args[2].as_time()) {
            (Some(date), Some(time)) => format!(
                "Thanks, your {flower} will be ready for pickup by {} on {}.",
                time.format("%H:%M"),
                date.format("%Y-%m-%d"),
            ),
            _ => format!("Thanks, your {flower} order has been placed."),
        };
        return Some(close(true).message(message));
    }

    if call.args[0].is_null() {
        return Some(
            elicit_slot(intent.name(), "FlowerType", slots)
                .message("What type of flowers would you like to order?")
                .response_card(
                    Attachment::new()
                        .title("Flower types")
                        .button("Roses", "roses")
                        .button("Tulips", "tulips")
                        .button("Lilies", "lilies"),
                ),
        );
    }

    if call.convert_errors.contains_key("pickup_date") {
        return Some(
            elicit_slot(intent.name(), "PickupDate", slots)
                .message("I did not understand that date. What day do you want the flowers picked up?"),
        );
    }

    let today = chrono::Utc::now().date_naive();
    if call.args[1].as_date().is_some_and(|date| date < today) {
        return Some(
            elicit_slot(intent.name(), "PickupDate", slots)
                .message("You can pick up the flowers from today onwards. What day works for you?"),
        );
    }

    Some(delegate(slots))
}

fn greeting(call: Call<'_>) -> Option<Response> {
    let name = call.args[0].as_str().unwrap_or("friend").to_string();

    let session = call.ctx.session_mut();
    let visits = session
        .get("visits")
        .and_then(|v| v.as_str())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0)
        + 1;
    session.insert("visits".into(), json!(visits.to_string()));

    let message = if visits > 1 {
        format!("<speak>Welcome back, {name}.</speak>")
    } else {
        format!("<speak>Hello, {name}!</speak>")
    };
    Some(close(true).message(message))
}
