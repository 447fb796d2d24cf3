//! Per-platform dispatch pipeline.

use crate::analytics::Analytics;
use crate::platform::Platform;
use crate::transform::{transform_properties, KeyTransformer};
use bc_common::{
    AnalyticsStore, Event, IncrementalProperties, ProfileUpdate, Properties, SinkId, UserInfo,
};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Fixed configuration of one sink: identity plus capability flags. The
/// flags are immutable for the sink's lifetime; a platform that cannot honor
/// a bucket simply never receives it.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    pub id: SinkId,
    pub name: String,
    /// Whether the persistent-property snapshot is attached to events.
    pub supports_persistent_properties: bool,
    /// Whether incremental profile properties are forwarded.
    pub supports_incremental_profile: bool,
    /// Whether one-time profile properties are forwarded.
    pub supports_one_time_profile: bool,
    /// Whether the store's default event properties are layered into events.
    pub add_default_event_properties: bool,
    /// Whether the store's default profile properties are layered into
    /// login/update payloads.
    pub add_default_profile_properties: bool,
}

impl SinkConfig {
    pub fn new(id: SinkId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            supports_persistent_properties: true,
            supports_incremental_profile: false,
            supports_one_time_profile: false,
            add_default_event_properties: true,
            add_default_profile_properties: true,
        }
    }
}

/// Dispatcher pipeline for exactly one analytics platform.
///
/// The composition logic here is fixed and shared by every sink; the
/// [`Platform`] primitives are the only per-vendor code. Capability guards
/// live on this type, so an adapter cannot bypass its own declared flags.
pub struct Sink {
    config: SinkConfig,
    store: Arc<dyn AnalyticsStore>,
    platform: Box<dyn Platform>,
    event_transformer: Box<dyn KeyTransformer>,
    profile_transformer: Box<dyn KeyTransformer>,
}

impl Sink {
    pub fn new(
        config: SinkConfig,
        store: Arc<dyn AnalyticsStore>,
        platform: Box<dyn Platform>,
        event_transformer: Box<dyn KeyTransformer>,
        profile_transformer: Box<dyn KeyTransformer>,
    ) -> Self {
        Self {
            config,
            store,
            platform,
            event_transformer,
            profile_transformer,
        }
    }

    pub fn id(&self) -> SinkId {
        self.config.id
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Layers default profile properties under the caller's, when enabled.
    fn compose_profile_payload(&self, properties: &Properties) -> Properties {
        let mut composed = properties.clone();
        if self.config.add_default_profile_properties {
            for (key, value) in self.store.default_profile_properties() {
                composed.entry(key).or_insert(value);
            }
        }
        transform_properties(&*self.profile_transformer, &composed)
    }

    /// Capability guard for one-time profile properties. Receives
    /// already-transformed keys.
    fn forward_one_time(&self, properties: Properties) {
        if self.config.supports_one_time_profile {
            debug!(sink = %self.config.name, count = properties.len(), "registering one-time profile properties");
            self.platform.profile_set_once(&properties);
        } else {
            debug!(sink = %self.config.name, "one-time profile properties unsupported, dropping");
        }
    }

    /// Capability guard for incremental profile properties. Receives
    /// already-transformed keys.
    fn forward_incremental(&self, properties: IncrementalProperties) {
        if self.config.supports_incremental_profile {
            debug!(sink = %self.config.name, count = properties.len(), "registering incremental profile properties");
            self.platform.profile_increment(&properties);
        } else {
            debug!(sink = %self.config.name, "incremental profile properties unsupported, dropping");
        }
    }
}

impl Analytics for Sink {
    fn initialize(&self) {
        self.platform.initialize();
    }

    fn on_install(&self, referrer_properties: &Properties) {
        self.platform.on_install(referrer_properties);
    }

    fn on_login(&self, is_new_user: bool, user: &UserInfo) {
        let properties = self.compose_profile_payload(&user.properties);
        self.platform.on_login(is_new_user, user, &properties);
    }

    fn on_user_update(&self, user: &UserInfo) {
        let properties = self.compose_profile_payload(&user.properties);
        self.platform.on_user_update(user, &properties);
    }

    /// Composes and delivers one event:
    /// 1. transform the event name;
    /// 2. caller properties + identity pair, then defaults for keys the
    ///    caller did not set (caller wins on collision);
    /// 3. transform the composed property keys;
    /// 4. attach the transformed persistent snapshot when supported;
    /// 5. hand off to the platform send primitive.
    ///
    /// Expects the event identity to be assigned; the router guarantees that
    /// on its dispatch path.
    fn push_event(&self, event: &Event, push_immediate: bool) {
        let final_name = self.event_transformer.transform_key(event.name());

        let (id_key, id_value) = event.identity();
        let mut properties = event.properties().clone();
        properties.insert(id_key.clone(), Value::String(id_value.clone()));
        if self.config.add_default_event_properties {
            for (key, value) in self.store.default_event_properties() {
                properties.entry(key).or_insert(value);
            }
        }
        let final_properties = transform_properties(&*self.event_transformer, &properties);

        let final_persistent = if self.config.supports_persistent_properties {
            transform_properties(&*self.event_transformer, &self.store.persistent_properties())
        } else {
            Properties::new()
        };

        debug!(
            sink = %self.config.name,
            event = %final_name,
            event_id = %id_value,
            push_immediate,
            "pushing event"
        );
        self.platform.send_event(
            id_value,
            &final_name,
            &final_properties,
            &final_persistent,
            push_immediate,
        );
    }

    fn push_profile(&self, update: &ProfileUpdate) {
        self.platform.profile_set(&transform_properties(
            &*self.profile_transformer,
            update.properties(),
        ));
        self.forward_one_time(transform_properties(
            &*self.profile_transformer,
            update.one_time_properties(),
        ));
        self.forward_incremental(transform_properties(
            &*self.profile_transformer,
            update.incremental_properties(),
        ));
    }

    fn register_one_time_profile_properties(&self, properties: Properties) {
        self.push_profile(
            &ProfileUpdate::builder()
                .one_time_properties(properties)
                .build(),
        );
    }

    fn register_incremental_profile_properties(&self, properties: IncrementalProperties) {
        self.push_profile(
            &ProfileUpdate::builder()
                .incremental_properties(properties)
                .build(),
        );
    }

    fn push_token(&self, token: &str) {
        self.platform.push_token(token);
    }

    fn logout(&self) {
        self.platform.logout();
    }

    fn flush(&self) {
        self.platform.flush();
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
