//! Router dispatch tests
//!
//! Covers:
//! - Selection-override dispatch order and exactness
//! - Resolver fallback and override precedence
//! - Missing-sink recovery
//! - Validation gate behavior per level
//! - Embedded profile/persistent sub-event routing
//! - Capability guards and property layering
//! - One-time router construction under concurrent first use

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use bc_common::{
    AnalyticsStore, Event, FixedResolver, IncrementalProperties, ProfileUpdate, Properties, SinkId,
    SinkResolver, SinkSelection, UserInfo, UuidEventIdProvider,
};
use bc_router::{
    Analytics, IdentityTransformer, KeyValidator, Platform, Router, RouterCell, RouterError,
    Sink, SinkConfig, ValidationLevel,
};
use bc_store::MemoryStore;
use serde_json::json;

const TITLE_CASE: &str = r"[A-Z][a-z]*(\s[A-Z][a-z]*)*";

/// Record of every primitive call a sink's platform received.
#[derive(Debug, Clone)]
enum Call {
    Event {
        name: String,
        properties: Properties,
        persistent: Properties,
        push_immediate: bool,
    },
    ProfileSet(Properties),
    ProfileSetOnce(Properties),
    ProfileIncrement(IncrementalProperties),
    Login { is_new_user: bool, user_id: String, properties: Properties },
    UserUpdate { user_id: String },
    Token(String),
    Logout,
    Flush,
}

#[derive(Default)]
struct RecordingPlatform {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl RecordingPlatform {
    fn new() -> (Self, Arc<Mutex<Vec<Call>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                calls: calls.clone(),
            },
            calls,
        )
    }
}

impl Platform for RecordingPlatform {
    fn send_event(
        &self,
        _event_id: &str,
        name: &str,
        properties: &Properties,
        persistent_properties: &Properties,
        push_immediate: bool,
    ) {
        self.calls.lock().push(Call::Event {
            name: name.to_string(),
            properties: properties.clone(),
            persistent: persistent_properties.clone(),
            push_immediate,
        });
    }

    fn profile_set(&self, properties: &Properties) {
        self.calls.lock().push(Call::ProfileSet(properties.clone()));
    }

    fn profile_set_once(&self, properties: &Properties) {
        self.calls.lock().push(Call::ProfileSetOnce(properties.clone()));
    }

    fn profile_increment(&self, properties: &IncrementalProperties) {
        self.calls.lock().push(Call::ProfileIncrement(properties.clone()));
    }

    fn on_login(&self, is_new_user: bool, user: &UserInfo, properties: &Properties) {
        self.calls.lock().push(Call::Login {
            is_new_user,
            user_id: user.user_id.clone(),
            properties: properties.clone(),
        });
    }

    fn on_user_update(&self, user: &UserInfo, _properties: &Properties) {
        self.calls.lock().push(Call::UserUpdate {
            user_id: user.user_id.clone(),
        });
    }

    fn push_token(&self, token: &str) {
        self.calls.lock().push(Call::Token(token.to_string()));
    }

    fn logout(&self) {
        self.calls.lock().push(Call::Logout);
    }

    fn flush(&self) {
        self.calls.lock().push(Call::Flush);
    }
}

/// Resolver that records the names it was asked about.
struct RecordingResolver {
    selection: SinkSelection,
    asked: Mutex<Vec<String>>,
}

impl RecordingResolver {
    fn new(selection: SinkSelection) -> Self {
        Self {
            selection,
            asked: Mutex::new(Vec::new()),
        }
    }
}

impl SinkResolver for RecordingResolver {
    fn resolve(&self, event_name: &str) -> SinkSelection {
        self.asked.lock().push(event_name.to_string());
        self.selection.clone()
    }
}

fn selection(ids: &[u8]) -> SinkSelection {
    ids.iter().map(|id| SinkId::new(*id)).collect()
}

fn recording_sink(id: u8, store: Arc<dyn AnalyticsStore>) -> (Sink, Arc<Mutex<Vec<Call>>>) {
    recording_sink_with(id, store, |config| config)
}

fn recording_sink_with(
    id: u8,
    store: Arc<dyn AnalyticsStore>,
    configure: impl FnOnce(SinkConfig) -> SinkConfig,
) -> (Sink, Arc<Mutex<Vec<Call>>>) {
    let (platform, calls) = RecordingPlatform::new();
    let config = configure(SinkConfig::new(SinkId::new(id), format!("sink-{id}")));
    let sink = Sink::new(
        config,
        store,
        Box::new(platform),
        Box::new(IdentityTransformer),
        Box::new(IdentityTransformer),
    );
    (sink, calls)
}

struct Fixture {
    router: Router,
    store: Arc<MemoryStore>,
    calls: HashMap<u8, Arc<Mutex<Vec<Call>>>>,
}

/// Three identity-transformer sinks (ids 1, 2, 5) over a shared memory
/// store, resolver defaulting to all three.
fn three_sink_router(level: ValidationLevel) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let mut calls = HashMap::new();
    let mut builder = Router::builder(
        store.clone(),
        Arc::new(FixedResolver::new(selection(&[1, 2, 5]))),
        Arc::new(UuidEventIdProvider::default()),
        KeyValidator::new(TITLE_CASE, level).unwrap(),
    );
    for id in [1u8, 2, 5] {
        let (sink, sink_calls) = recording_sink(id, store.clone());
        calls.insert(id, sink_calls);
        builder = builder.sink(sink);
    }
    Fixture {
        router: builder.build().unwrap(),
        store,
        calls,
    }
}

fn event_names(calls: &Mutex<Vec<Call>>) -> Vec<String> {
    calls
        .lock()
        .iter()
        .filter_map(|call| match call {
            Call::Event { name, .. } => Some(name.clone()),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Selection and dispatch order
// ============================================================================

#[test]
fn override_selection_visits_exactly_those_sinks_once() {
    let fixture = three_sink_router(ValidationLevel::None);

    let event = Event::builder("Checkout")
        .override_sinks(selection(&[5, 1]))
        .build();
    fixture.router.push_event(&event, false);

    assert_eq!(event_names(&fixture.calls[&1]), vec!["Checkout"]);
    assert_eq!(event_names(&fixture.calls[&5]), vec!["Checkout"]);
    assert!(event_names(&fixture.calls[&2]).is_empty());
}

#[test]
fn override_takes_precedence_over_resolver() {
    let store = Arc::new(MemoryStore::new());
    let resolver = Arc::new(RecordingResolver::new(selection(&[1, 2])));
    let (sink_one, calls_one) = recording_sink(1, store.clone());
    let (sink_two, calls_two) = recording_sink(2, store.clone());

    let router = Router::builder(
        store,
        resolver.clone(),
        Arc::new(UuidEventIdProvider::default()),
        KeyValidator::disabled(),
    )
    .sink(sink_one)
    .sink(sink_two)
    .build()
    .unwrap();

    let event = Event::builder("Checkout")
        .override_sinks(selection(&[2]))
        .build();
    router.push_event(&event, false);

    assert!(event_names(&calls_one).is_empty());
    assert_eq!(event_names(&calls_two), vec!["Checkout"]);
    // The resolver was never consulted for an overridden event.
    assert!(resolver.asked.lock().is_empty());
}

#[test]
fn resolver_decides_when_no_override_is_set() {
    let store = Arc::new(MemoryStore::new());
    let resolver = Arc::new(RecordingResolver::new(selection(&[2])));
    let (sink_one, calls_one) = recording_sink(1, store.clone());
    let (sink_two, calls_two) = recording_sink(2, store.clone());

    let router = Router::builder(
        store,
        resolver.clone(),
        Arc::new(UuidEventIdProvider::default()),
        KeyValidator::disabled(),
    )
    .sink(sink_one)
    .sink(sink_two)
    .build()
    .unwrap();

    router.push_event(&Event::builder("Screen Viewed").build(), false);

    assert_eq!(resolver.asked.lock().as_slice(), ["Screen Viewed"]);
    assert!(event_names(&calls_one).is_empty());
    assert_eq!(event_names(&calls_two), vec!["Screen Viewed"]);
}

#[test]
fn missing_sink_does_not_abort_dispatch_to_the_rest() {
    let fixture = three_sink_router(ValidationLevel::None);

    // Sink 3 is not registered; 1 and 5 must still receive the event.
    let event = Event::builder("Checkout")
        .override_sinks(selection(&[1, 3, 5]))
        .build();
    fixture.router.push_event(&event, false);

    assert_eq!(event_names(&fixture.calls[&1]), vec!["Checkout"]);
    assert_eq!(event_names(&fixture.calls[&5]), vec!["Checkout"]);
}

#[test]
fn duplicate_sink_id_fails_construction() {
    let store = Arc::new(MemoryStore::new());
    let (sink_a, _) = recording_sink(1, store.clone());
    let (sink_b, _) = recording_sink(1, store.clone());

    let result = Router::builder(
        store,
        Arc::new(FixedResolver::default()),
        Arc::new(UuidEventIdProvider::default()),
        KeyValidator::disabled(),
    )
    .sink(sink_a)
    .sink(sink_b)
    .build();

    assert!(matches!(result, Err(RouterError::DuplicateSinkId(id)) if id == SinkId::new(1)));
}

// ============================================================================
// Validation gate
// ============================================================================

#[test]
fn abort_level_drops_the_event_before_any_sink() {
    let fixture = three_sink_router(ValidationLevel::Abort);

    fixture
        .router
        .push_event(&Event::builder("button clicked").build(), false);

    for calls in fixture.calls.values() {
        assert!(calls.lock().is_empty());
    }
}

#[test]
fn log_only_level_still_reaches_all_resolved_sinks() {
    let fixture = three_sink_router(ValidationLevel::LogOnly);

    fixture
        .router
        .push_event(&Event::builder("button clicked").build(), false);

    for id in [1u8, 2, 5] {
        assert_eq!(event_names(&fixture.calls[&id]), vec!["button clicked"]);
    }
}

#[test]
fn abort_level_drops_invalid_persistent_registration() {
    let fixture = three_sink_router(ValidationLevel::Abort);

    fixture
        .router
        .register_persistent_properties(Properties::from([(
            "bad key".to_string(),
            json!("value"),
        )]));

    assert!(fixture.store.persistent_properties().is_empty());
}

#[test]
fn valid_persistent_registration_lands_in_the_store() {
    let fixture = three_sink_router(ValidationLevel::Abort);

    fixture
        .router
        .register_persistent_property("Campaign", "launch");

    assert_eq!(
        fixture.store.persistent_properties()["Campaign"],
        json!("launch")
    );
}

// ============================================================================
// Identity
// ============================================================================

#[test]
fn push_stamps_identity_exactly_once() {
    let fixture = three_sink_router(ValidationLevel::None);

    let event = Event::builder("Checkout").build();
    fixture.router.push_event(&event, false);

    let (key, value) = event.identity().clone();
    assert_eq!(key, "Event Id");
    assert!(!value.is_empty());
}

#[test]
#[should_panic(expected = "identity already assigned")]
fn pushing_the_same_event_twice_panics() {
    let fixture = three_sink_router(ValidationLevel::None);

    let event = Event::builder("Checkout").build();
    fixture.router.push_event(&event, false);
    fixture.router.push_event(&event, false);
}

#[test]
fn every_sink_sees_the_same_event_id() {
    let fixture = three_sink_router(ValidationLevel::None);

    let event = Event::builder("Checkout").build();
    fixture.router.push_event(&event, false);
    let id_value = event.event_id().to_string();

    for id in [1u8, 2, 5] {
        let calls = fixture.calls[&id].lock();
        let Call::Event { properties, .. } = &calls[0] else {
            panic!("expected an event call");
        };
        assert_eq!(properties["Event Id"], json!(id_value));
    }
}

// ============================================================================
// Embedded sub-events
// ============================================================================

#[test]
fn embedded_profile_reaches_every_sink_even_when_event_is_masked() {
    let fixture = three_sink_router(ValidationLevel::None);

    let event = Event::builder("Signup Completed")
        .profile_property("Plan", "pro")
        .override_sinks(selection(&[1]))
        .build();
    fixture.router.push_event(&event, false);

    // Event only on sink 1; the profile update on all three.
    assert_eq!(event_names(&fixture.calls[&1]), vec!["Signup Completed"]);
    assert!(event_names(&fixture.calls[&2]).is_empty());
    for id in [1u8, 2, 5] {
        let calls = fixture.calls[&id].lock();
        assert!(calls.iter().any(|call| matches!(
            call,
            Call::ProfileSet(props) if props.get("Plan") == Some(&json!("pro"))
        )));
    }
}

#[test]
fn embedded_persistent_set_merges_into_the_store() {
    let fixture = three_sink_router(ValidationLevel::None);
    fixture
        .store
        .merge_persistent(&Properties::from([("Sessions".to_string(), json!(5.0))]));

    let event = Event::builder("App Started")
        .persistent_property("Campaign", "launch")
        .one_time_persistent_property("Sessions", 99.0)
        .incremental_persistent_property("Sessions", 2.0)
        .build();
    fixture.router.push_event(&event, false);

    let persistent = fixture.store.persistent_properties();
    assert_eq!(persistent["Campaign"], json!("launch"));
    // One-time lost to the existing key; the increment then applied on top.
    assert_eq!(persistent["Sessions"], json!(7.0));
}

#[test]
fn persistent_merge_happens_before_sink_delivery() {
    let fixture = three_sink_router(ValidationLevel::None);

    let event = Event::builder("App Started")
        .persistent_property("Campaign", "launch")
        .build();
    fixture.router.push_event(&event, false);

    let calls = fixture.calls[&1].lock();
    let Call::Event { persistent, .. } = calls
        .iter()
        .find(|call| matches!(call, Call::Event { .. }))
        .unwrap()
    else {
        unreachable!();
    };
    assert_eq!(persistent["Campaign"], json!("launch"));
}

// ============================================================================
// Sink pipeline composition
// ============================================================================

#[test]
fn caller_properties_win_over_store_defaults() {
    let store = Arc::new(MemoryStore::with_defaults(
        Properties::from([
            ("Platform".to_string(), json!("default")),
            ("Build".to_string(), json!("release")),
        ]),
        Properties::new(),
    ));
    let (sink, calls) = recording_sink(1, store.clone());
    let router = Router::builder(
        store,
        Arc::new(FixedResolver::new(selection(&[1]))),
        Arc::new(UuidEventIdProvider::default()),
        KeyValidator::disabled(),
    )
    .sink(sink)
    .build()
    .unwrap();

    let event = Event::builder("Checkout")
        .property("Platform", "caller")
        .build();
    router.push_event(&event, false);

    let calls = calls.lock();
    let Call::Event { properties, .. } = &calls[0] else {
        panic!("expected an event call");
    };
    assert_eq!(properties["Platform"], json!("caller"));
    assert_eq!(properties["Build"], json!("release"));
}

#[test]
fn persistent_snapshot_is_withheld_from_unsupporting_sinks() {
    let store = Arc::new(MemoryStore::new());
    store.merge_persistent(&Properties::from([("Campaign".to_string(), json!("x"))]));

    let (supporting, supporting_calls) = recording_sink(1, store.clone());
    let (unsupporting, unsupporting_calls) = recording_sink_with(2, store.clone(), |mut config| {
        config.supports_persistent_properties = false;
        config
    });
    let router = Router::builder(
        store,
        Arc::new(FixedResolver::new(selection(&[1, 2]))),
        Arc::new(UuidEventIdProvider::default()),
        KeyValidator::disabled(),
    )
    .sink(supporting)
    .sink(unsupporting)
    .build()
    .unwrap();

    router.push_event(&Event::builder("Checkout").build(), true);

    let calls = supporting_calls.lock();
    let Call::Event { persistent, push_immediate, .. } = &calls[0] else {
        panic!("expected an event call");
    };
    assert_eq!(persistent["Campaign"], json!("x"));
    assert!(*push_immediate);

    let calls = unsupporting_calls.lock();
    let Call::Event { persistent, .. } = &calls[0] else {
        panic!("expected an event call");
    };
    assert!(persistent.is_empty());
}

#[test]
fn capability_guards_drop_unsupported_profile_buckets() {
    let store = Arc::new(MemoryStore::new());
    let (capable, capable_calls) = recording_sink_with(1, store.clone(), |mut config| {
        config.supports_one_time_profile = true;
        config.supports_incremental_profile = true;
        config
    });
    let (bare, bare_calls) = recording_sink(2, store.clone());
    let router = Router::builder(
        store,
        Arc::new(FixedResolver::default()),
        Arc::new(UuidEventIdProvider::default()),
        KeyValidator::disabled(),
    )
    .sink(capable)
    .sink(bare)
    .build()
    .unwrap();

    let update = ProfileUpdate::builder()
        .property("Plan", "pro")
        .one_time_property("First Seen", 1234)
        .incremental_property("Logins", 1.0)
        .build();
    router.push_profile(&update);

    let calls = capable_calls.lock();
    assert!(calls.iter().any(|c| matches!(
        c,
        Call::ProfileSetOnce(props) if props.get("First Seen") == Some(&json!(1234))
    )));
    assert!(calls.iter().any(|c| matches!(
        c,
        Call::ProfileIncrement(props) if props.get("Logins") == Some(&1.0)
    )));

    let calls = bare_calls.lock();
    assert!(calls.iter().any(|c| matches!(c, Call::ProfileSet(_))));
    assert!(!calls.iter().any(|c| matches!(c, Call::ProfileSetOnce(_))));
    assert!(!calls.iter().any(|c| matches!(c, Call::ProfileIncrement(_))));
}

// ============================================================================
// All-sink operations
// ============================================================================

#[test]
fn login_reaches_every_sink_with_default_profile_layering() {
    let store = Arc::new(MemoryStore::with_defaults(
        Properties::new(),
        Properties::from([("Timezone".to_string(), json!("UTC"))]),
    ));
    let mut calls = HashMap::new();
    let mut builder = Router::builder(
        store.clone(),
        Arc::new(FixedResolver::default()),
        Arc::new(UuidEventIdProvider::default()),
        KeyValidator::disabled(),
    );
    for id in [1u8, 2] {
        let (sink, sink_calls) = recording_sink(id, store.clone());
        calls.insert(id, sink_calls);
        builder = builder.sink(sink);
    }
    let router = builder.build().unwrap();

    let mut user = UserInfo::new("user-42");
    user.properties.insert("Plan".to_string(), json!("pro"));
    router.on_login(true, &user);

    for id in [1u8, 2] {
        let calls = calls[&id].lock();
        let Call::Login { is_new_user, user_id, properties } = &calls[0] else {
            panic!("expected a login call");
        };
        assert!(*is_new_user);
        assert_eq!(user_id, "user-42");
        assert_eq!(properties["Plan"], json!("pro"));
        assert_eq!(properties["Timezone"], json!("UTC"));
    }
}

#[test]
fn user_update_reaches_every_sink() {
    let fixture = three_sink_router(ValidationLevel::None);

    fixture.router.on_user_update(&UserInfo::new("user-42"));

    for calls in fixture.calls.values() {
        assert!(calls
            .lock()
            .iter()
            .any(|c| matches!(c, Call::UserUpdate { user_id } if user_id == "user-42")));
    }
}

#[test]
fn push_token_reaches_every_sink_and_sets_the_flag() {
    let fixture = three_sink_router(ValidationLevel::None);

    fixture.router.push_token("fcm-token-1");

    for calls in fixture.calls.values() {
        assert!(calls
            .lock()
            .iter()
            .any(|c| matches!(c, Call::Token(t) if t == "fcm-token-1")));
    }
    assert!(fixture.store.is_token_updated());
}

#[test]
fn logout_forwards_then_clears_the_store() {
    let fixture = three_sink_router(ValidationLevel::None);
    fixture.router.register_persistent_property("Campaign", "x");
    fixture.router.mark_update_needed(true);

    fixture.router.logout();

    for calls in fixture.calls.values() {
        assert!(calls.lock().iter().any(|c| matches!(c, Call::Logout)));
    }
    assert!(fixture.store.persistent_properties().is_empty());
    assert!(!fixture.router.is_update_needed());
}

#[test]
fn flush_reaches_every_sink() {
    let fixture = three_sink_router(ValidationLevel::None);

    fixture.router.flush();

    for calls in fixture.calls.values() {
        assert!(calls.lock().iter().any(|c| matches!(c, Call::Flush)));
    }
}

#[test]
fn on_install_persists_referrer_props_and_forwards() {
    let fixture = three_sink_router(ValidationLevel::None);

    fixture
        .router
        .on_install(&Properties::from([("Referrer".to_string(), json!("ad"))]));

    assert_eq!(fixture.store.persistent_properties()["Referrer"], json!("ad"));
}

// ============================================================================
// One-time construction
// ============================================================================

#[test]
fn router_cell_installs_exactly_once_under_concurrency() {
    static CELL: RouterCell = RouterCell::new();

    let build = || {
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        Router::builder(
            store,
            Arc::new(FixedResolver::default()),
            Arc::new(UuidEventIdProvider::default()),
            KeyValidator::disabled(),
        )
        .build()
        .unwrap()
    };

    let handles: Vec<_> = (0..8)
        .map(|_| std::thread::spawn(move || Arc::as_ptr(&CELL.install(build)) as usize))
        .collect();
    let pointers: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(pointers.windows(2).all(|w| w[0] == w[1]));
    assert!(CELL.get().is_some());
}
