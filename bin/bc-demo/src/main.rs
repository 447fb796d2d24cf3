//! Beacon console demo
//!
//! Wires the full layer together without any vendor SDK:
//! - a JSON file store carrying persistent properties across runs
//! - two console sinks with different key formats and capability flags
//! - a name-based resolver
//! then walks a typical session: login, events, token push, flush, logout.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bc_common::{
    Event, IncrementalProperties, Properties, SinkId, SinkResolver, SinkSelection, UserInfo,
    UuidEventIdProvider,
};
use bc_router::{
    snake_case_to_title_case, title_case_to_snake_case, Analytics, KeyValidator, Platform, Router,
    Sink, SinkConfig, ValidationLevel,
};
use bc_store::JsonFileStore;
use serde_json::json;

const SNAKE_SINK: SinkId = SinkId::new(1);
const TITLE_SINK: SinkId = SinkId::new(2);

// Title case with digits allowed in between.
const KEY_PATTERN: &str = r"\s*(?:\s*(?:[A-Z][a-z0-9]*)\s*)+\s*";

/// Beacon Console Demo
#[derive(Parser, Debug)]
#[command(name = "bc-demo")]
#[command(about = "Beacon console demo - routes sample events to console sinks")]
struct Args {
    /// Path of the JSON store file
    #[arg(long, env = "BC_STORE_PATH", default_value = "beacon-store.json")]
    store_path: String,

    /// Key validation level: none, log-only, abort
    #[arg(long, env = "BC_VALIDATION", default_value = "log-only")]
    validation: String,
}

/// Prints every platform primitive instead of calling a vendor SDK.
struct ConsolePlatform {
    label: &'static str,
}

impl ConsolePlatform {
    fn new(label: &'static str) -> Self {
        Self { label }
    }
}

impl Platform for ConsolePlatform {
    fn send_event(
        &self,
        event_id: &str,
        name: &str,
        properties: &Properties,
        persistent_properties: &Properties,
        push_immediate: bool,
    ) {
        println!(
            "[{}] event `{name}` (id {event_id}, immediate {push_immediate})\n        properties: {}\n        persistent: {}",
            self.label,
            json!(properties),
            json!(persistent_properties),
        );
    }

    fn profile_set(&self, properties: &Properties) {
        println!("[{}] profile set: {}", self.label, json!(properties));
    }

    fn profile_set_once(&self, properties: &Properties) {
        println!("[{}] profile set-once: {}", self.label, json!(properties));
    }

    fn profile_increment(&self, properties: &IncrementalProperties) {
        println!("[{}] profile increment: {}", self.label, json!(properties));
    }

    fn on_login(&self, is_new_user: bool, user: &UserInfo, properties: &Properties) {
        println!(
            "[{}] login `{}` (new user {is_new_user}): {}",
            self.label,
            user.user_id,
            json!(properties),
        );
    }

    fn on_user_update(&self, user: &UserInfo, properties: &Properties) {
        println!(
            "[{}] user update `{}`: {}",
            self.label,
            user.user_id,
            json!(properties),
        );
    }

    fn initialize(&self) {
        println!("[{}] initialized", self.label);
    }

    fn push_token(&self, token: &str) {
        println!("[{}] push token `{token}`", self.label);
    }

    fn logout(&self) {
        println!("[{}] logged out", self.label);
    }

    fn flush(&self) {
        println!("[{}] flushed", self.label);
    }
}

/// Routes checkout events to the snake-case sink only, everything else to
/// both sinks.
struct DemoResolver {
    all: SinkSelection,
}

impl SinkResolver for DemoResolver {
    fn resolve(&self, event_name: &str) -> SinkSelection {
        if event_name.starts_with("Checkout") {
            SinkSelection::only(SNAKE_SINK)
        } else {
            self.all.clone()
        }
    }
}

fn validation_level(name: &str) -> Result<ValidationLevel> {
    match name {
        "none" => Ok(ValidationLevel::None),
        "log-only" => Ok(ValidationLevel::LogOnly),
        "abort" => Ok(ValidationLevel::Abort),
        other => anyhow::bail!("unknown validation level `{other}`"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let store = Arc::new(JsonFileStore::open_with_defaults(
        &args.store_path,
        Properties::from([("App Version".to_string(), json!("0.1.0"))]),
        Properties::from([("Timezone".to_string(), json!("UTC"))]),
    )?);

    let mut snake_config = SinkConfig::new(SNAKE_SINK, "console-snake");
    snake_config.supports_one_time_profile = true;
    snake_config.supports_incremental_profile = true;
    let snake_sink = Sink::new(
        snake_config,
        store.clone(),
        Box::new(ConsolePlatform::new("snake")),
        Box::new(title_case_to_snake_case()),
        Box::new(title_case_to_snake_case()),
    );

    let mut title_config = SinkConfig::new(TITLE_SINK, "console-title");
    title_config.supports_persistent_properties = false;
    title_config.add_default_event_properties = false;
    let title_sink = Sink::new(
        title_config,
        store.clone(),
        Box::new(ConsolePlatform::new("title")),
        Box::new(snake_case_to_title_case()),
        Box::new(snake_case_to_title_case()),
    );

    let resolver = DemoResolver {
        all: [SNAKE_SINK, TITLE_SINK].into_iter().collect(),
    };

    let router = Router::builder(
        store,
        Arc::new(resolver),
        Arc::new(UuidEventIdProvider::default()),
        KeyValidator::new(KEY_PATTERN, validation_level(&args.validation)?)?,
    )
    .sink(snake_sink)
    .sink(title_sink)
    .build()?;

    router.initialize();

    if router.is_update_needed() {
        info!("store flagged a pending user update from a previous run");
    }

    let mut user = UserInfo::new("user-42");
    user.email = Some("user@example.com".to_string());
    user.properties.insert("Plan".to_string(), json!("pro"));
    router.on_login(true, &user);

    router.register_persistent_property("Campaign", "launch");

    let now = chrono::Utc::now().timestamp_millis();
    let event = Event::builder("App Started")
        .property("Cold Start", true)
        .one_time_persistent_profile_property("First App Start", now)
        .incremental_persistent_profile_property("Total App Starts", 1.0)
        .build();
    router.push_event(&event, false);

    let checkout = Event::builder("Checkout Completed")
        .property("Cart Value", 42.5)
        .build();
    router.push_event(&checkout, true);

    router.push_token("demo-push-token");
    router.flush();
    router.logout();

    Ok(())
}
