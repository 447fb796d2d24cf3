//! Router - central orchestrator for event dispatch.

use crate::analytics::Analytics;
use crate::error::RouterError;
use crate::sink::Sink;
use crate::validate::KeyValidator;
use crate::Result;
use bc_common::{
    AnalyticsStore, Event, EventIdProvider, IncrementalProperties, PersistentPropertySet,
    ProfileUpdate, Properties, SinkId, SinkResolver, SinkSelection, UserInfo,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Central orchestrator between the application's instrumentation calls and
/// the registered sinks.
///
/// Construct one per process via [`RouterBuilder`] and share it by
/// reference. The router holds no mutable state of its own after
/// construction; everything mutable lives in the [`AnalyticsStore`].
pub struct Router {
    /// Registered sinks, iterated in ascending id order.
    sinks: BTreeMap<SinkId, Sink>,
    store: Arc<dyn AnalyticsStore>,
    resolver: Arc<dyn SinkResolver>,
    id_provider: Arc<dyn EventIdProvider>,
    validator: KeyValidator,
}

/// Builder for [`Router`]. Fails fast on a duplicate sink id.
pub struct RouterBuilder {
    sinks: Vec<Sink>,
    store: Arc<dyn AnalyticsStore>,
    resolver: Arc<dyn SinkResolver>,
    id_provider: Arc<dyn EventIdProvider>,
    validator: KeyValidator,
}

impl RouterBuilder {
    pub fn new(
        store: Arc<dyn AnalyticsStore>,
        resolver: Arc<dyn SinkResolver>,
        id_provider: Arc<dyn EventIdProvider>,
        validator: KeyValidator,
    ) -> Self {
        Self {
            sinks: Vec::new(),
            store,
            resolver,
            id_provider,
            validator,
        }
    }

    pub fn sink(mut self, sink: Sink) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn build(self) -> Result<Router> {
        let mut sinks = BTreeMap::new();
        for sink in self.sinks {
            let id = sink.id();
            if sinks.insert(id, sink).is_some() {
                return Err(RouterError::DuplicateSinkId(id));
            }
        }
        debug!(sinks = sinks.len(), "router constructed");
        Ok(Router {
            sinks,
            store: self.store,
            resolver: self.resolver,
            id_provider: self.id_provider,
            validator: self.validator,
        })
    }
}

impl Router {
    pub fn builder(
        store: Arc<dyn AnalyticsStore>,
        resolver: Arc<dyn SinkResolver>,
        id_provider: Arc<dyn EventIdProvider>,
        validator: KeyValidator,
    ) -> RouterBuilder {
        RouterBuilder::new(store, resolver, id_provider, validator)
    }

    /// Ids of all registered sinks, ascending.
    pub fn sink_ids(&self) -> SinkSelection {
        self.sinks.keys().copied().collect()
    }

    // ------------------------------------------------------------------
    // Persistent property registration
    // ------------------------------------------------------------------

    /// Registers a property to be attached to all future events until
    /// explicitly removed or cleared on logout.
    pub fn register_persistent_property(&self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.register_persistent_properties(Properties::from([(key.into(), value.into())]));
    }

    pub fn register_persistent_properties(&self, properties: Properties) {
        if self.reject_invalid_keys(properties.keys(), "persistent properties") {
            return;
        }
        self.persist(&PersistentPropertySet::builder().properties(properties).build());
    }

    /// Registers persistent properties honored only for keys the store does
    /// not hold yet.
    pub fn register_one_time_persistent_property(
        &self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) {
        self.register_one_time_persistent_properties(Properties::from([(key.into(), value.into())]));
    }

    pub fn register_one_time_persistent_properties(&self, properties: Properties) {
        if self.reject_invalid_keys(properties.keys(), "one-time persistent properties") {
            return;
        }
        self.persist(
            &PersistentPropertySet::builder()
                .one_time_properties(properties)
                .build(),
        );
    }

    /// Registers numeric deltas added to the stored values; absent keys
    /// start at `0.0`.
    pub fn register_incremental_persistent_property(&self, key: impl Into<String>, delta: f64) {
        self.register_incremental_persistent_properties(IncrementalProperties::from([(
            key.into(),
            delta,
        )]));
    }

    pub fn register_incremental_persistent_properties(&self, properties: IncrementalProperties) {
        if self.reject_invalid_keys(properties.keys(), "incremental persistent properties") {
            return;
        }
        self.persist(
            &PersistentPropertySet::builder()
                .incremental_properties(properties)
                .build(),
        );
    }

    pub fn unregister_persistent_property(&self, key: &str) {
        self.store.remove_persistent(key);
    }

    // ------------------------------------------------------------------
    // Profile property registration
    // ------------------------------------------------------------------

    pub fn register_profile_property(&self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.register_profile_properties(Properties::from([(key.into(), value.into())]));
    }

    pub fn register_profile_properties(&self, properties: Properties) {
        if self.reject_invalid_keys(properties.keys(), "profile properties") {
            return;
        }
        self.push_profile(&ProfileUpdate::builder().properties(properties).build());
    }

    pub fn register_one_time_profile_property(
        &self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) {
        self.register_one_time_profile_properties(Properties::from([(key.into(), value.into())]));
    }

    pub fn register_incremental_profile_property(&self, key: impl Into<String>, delta: f64) {
        self.register_incremental_profile_properties(IncrementalProperties::from([(
            key.into(),
            delta,
        )]));
    }

    // ------------------------------------------------------------------
    // Launch flags
    // ------------------------------------------------------------------

    /// Marks that the application should call
    /// [`Analytics::on_user_update`] on next launch.
    pub fn mark_update_needed(&self, value: bool) {
        self.store.set_update_needed(value);
    }

    pub fn is_update_needed(&self) -> bool {
        self.store.is_update_needed()
    }

    /// Marks the push-notification token as propagated.
    pub fn mark_token_updated(&self, value: bool) {
        self.store.set_token_updated(value);
    }

    pub fn is_token_updated(&self) -> bool {
        self.store.is_token_updated()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Validates `keys`, logging any failure. Returns `true` when the
    /// operation must be dropped.
    fn reject_invalid_keys<'a, I>(&self, keys: I, what: &str) -> bool
    where
        I: IntoIterator<Item = &'a String>,
    {
        let outcome = self.validator.validate_keys(keys.into_iter().map(String::as_str));
        if outcome.is_invalid() {
            error!(what = what, aborting = outcome.is_abort(), "invalid keys");
        }
        outcome.is_abort()
    }

    /// Merges a persistent set into the store. No sink is involved: sinks
    /// read the persistent snapshot at event-composition time.
    fn persist(&self, set: &PersistentPropertySet) {
        debug!(
            plain = set.properties().len(),
            one_time = set.one_time_properties().len(),
            incremental = set.incremental_properties().len(),
            "persisting property set"
        );
        self.store.merge_persistent(set.properties());
        self.store.merge_one_time_persistent(set.one_time_properties());
        if !set.incremental_properties().is_empty() {
            self.store
                .merge_incremental_persistent(set.incremental_properties());
        }
    }

    fn resolve_selection(&self, event: &Event) -> SinkSelection {
        if event.selection_override().is_empty() {
            self.resolver.resolve(event.name())
        } else {
            event.selection_override().clone()
        }
    }
}

impl Analytics for Router {
    fn initialize(&self) {
        for sink in self.sinks.values() {
            sink.initialize();
        }
    }

    /// Persists the referrer properties and forwards the install hook to
    /// every sink.
    fn on_install(&self, referrer_properties: &Properties) {
        self.register_persistent_properties(referrer_properties.clone());
        for sink in self.sinks.values() {
            sink.on_install(referrer_properties);
        }
    }

    fn on_login(&self, is_new_user: bool, user: &UserInfo) {
        debug!(user_id = %user.user_id, is_new_user, "forwarding login to all sinks");
        for sink in self.sinks.values() {
            sink.on_login(is_new_user, user);
        }
    }

    fn on_user_update(&self, user: &UserInfo) {
        debug!(user_id = %user.user_id, "forwarding user update to all sinks");
        for sink in self.sinks.values() {
            sink.on_user_update(user);
        }
    }

    /// Dispatches one event:
    /// 1. stamp the identity pair (exactly once per event);
    /// 2. validate; an abort outcome drops the event here;
    /// 3. resolve the sink selection, caller override winning;
    /// 4. forward the embedded profile update to every sink;
    /// 5. merge the embedded persistent set into the store;
    /// 6. deliver to the selected sinks in ascending id order, skipping
    ///    (and logging) ids with no registered sink.
    fn push_event(&self, event: &Event, push_immediate: bool) {
        event.assign_identity(self.id_provider.identity_pair());

        let outcome = self.validator.validate_event(event);
        if outcome.is_invalid() {
            error!(event = %event.name(), aborting = outcome.is_abort(), "invalid keys in event");
            if outcome.is_abort() {
                return;
            }
        }

        let selection = self.resolve_selection(event);
        debug!(event = %event.name(), event_id = %event.event_id(), %selection, "pushing event");

        if let Some(profile) = event.profile() {
            self.push_profile(profile);
        }
        if let Some(persistent) = event.persistent() {
            self.persist(persistent);
        }

        for id in selection.iter() {
            match self.sinks.get(&id) {
                Some(sink) => {
                    sink.push_event(event, push_immediate);
                    debug!(event = %event.name(), sink = %sink.name(), "pushed event");
                }
                None => {
                    // One missing sink must never starve the remaining ones.
                    let err = RouterError::SinkNotFound {
                        sink_id: id,
                        event_name: event.name().to_string(),
                    };
                    error!(error = %err, "skipping sink");
                }
            }
        }
    }

    fn push_profile(&self, update: &ProfileUpdate) {
        debug!(
            plain = update.properties().len(),
            one_time = update.one_time_properties().len(),
            incremental = update.incremental_properties().len(),
            "forwarding profile update to all sinks"
        );
        for sink in self.sinks.values() {
            sink.push_profile(update);
        }
    }

    fn register_one_time_profile_properties(&self, properties: Properties) {
        if self.reject_invalid_keys(properties.keys(), "one-time profile properties") {
            return;
        }
        self.push_profile(
            &ProfileUpdate::builder()
                .one_time_properties(properties)
                .build(),
        );
    }

    fn register_incremental_profile_properties(&self, properties: IncrementalProperties) {
        if self.reject_invalid_keys(properties.keys(), "incremental profile properties") {
            return;
        }
        self.push_profile(
            &ProfileUpdate::builder()
                .incremental_properties(properties)
                .build(),
        );
    }

    /// Forwards the token to every sink, then records that it propagated.
    fn push_token(&self, token: &str) {
        for sink in self.sinks.values() {
            sink.push_token(token);
        }
        self.store.set_token_updated(true);
    }

    /// Logs out of every sink, then wipes the store.
    fn logout(&self) {
        warn!("logging out of all sinks and clearing persistent state");
        for sink in self.sinks.values() {
            sink.logout();
        }
        self.store.clear_all();
    }

    fn flush(&self) {
        for sink in self.sinks.values() {
            sink.flush();
        }
    }
}
