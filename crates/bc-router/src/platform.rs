//! The platform adapter contract.

use bc_common::{IncrementalProperties, Properties, UserInfo};

/// Platform-specific send primitives, the only vendor-coupled extension
/// point. A [`crate::Sink`] owns one implementation and drives it with fully
/// composed, already-transformed data; adapters translate each call into the
/// vendor SDK and nothing more.
///
/// Calls run on the caller's thread. An adapter whose SDK performs blocking
/// I/O blocks the caller for the duration of its own call only.
pub trait Platform: Send + Sync {
    /// Delivers one event: common identity value, transformed name,
    /// composed+transformed properties, and the transformed persistent
    /// snapshot (empty when the sink does not support persistent
    /// properties).
    fn send_event(
        &self,
        event_id: &str,
        name: &str,
        properties: &Properties,
        persistent_properties: &Properties,
        push_immediate: bool,
    );

    /// Overwrites profile properties on the vendor backend.
    fn profile_set(&self, properties: &Properties);

    /// Writes profile properties only where absent on the vendor backend.
    fn profile_set_once(&self, properties: &Properties);

    /// Increments numeric profile properties on the vendor backend.
    fn profile_increment(&self, properties: &IncrementalProperties);

    fn on_login(&self, is_new_user: bool, user: &UserInfo, properties: &Properties);

    fn on_user_update(&self, user: &UserInfo, properties: &Properties);

    fn initialize(&self) {}

    fn on_install(&self, referrer_properties: &Properties) {
        let _ = referrer_properties;
    }

    fn push_token(&self, token: &str) {
        let _ = token;
    }

    fn logout(&self) {}

    fn flush(&self) {}
}
