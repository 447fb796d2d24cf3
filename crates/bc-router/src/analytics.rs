//! The shared capability surface.

use bc_common::{Event, IncrementalProperties, ProfileUpdate, Properties, UserInfo};

/// Operations common to the [`crate::Router`] and each [`crate::Sink`]. The
/// two are interchangeable from a caller's perspective, which lets a single
/// sink stand in for the whole layer when testing one platform in isolation.
pub trait Analytics {
    /// One-time setup. Must be called before any dispatch operation; the
    /// caller owns that ordering.
    fn initialize(&self) {}

    /// Hook for the site where app installation is tracked.
    fn on_install(&self, referrer_properties: &Properties) {
        let _ = referrer_properties;
    }

    /// Identity change at sign-up/login time. Reaches every sink: identity
    /// must land on all platforms, never a subset.
    fn on_login(&self, is_new_user: bool, user: &UserInfo);

    /// Profile refresh outside of login. Also reaches every sink.
    fn on_user_update(&self, user: &UserInfo);

    /// Dispatches one event. The event must not have an identity assigned
    /// yet when pushed through the router.
    fn push_event(&self, event: &Event, push_immediate: bool);

    /// Forwards profile changes; never selection-masked.
    fn push_profile(&self, update: &ProfileUpdate);

    /// Registers write-once-if-absent profile properties. Dropped by sinks
    /// that do not support them.
    fn register_one_time_profile_properties(&self, properties: Properties);

    /// Registers numeric-delta profile properties. Dropped by sinks that do
    /// not support them.
    fn register_incremental_profile_properties(&self, properties: IncrementalProperties);

    /// Propagates a push-notification token.
    fn push_token(&self, token: &str) {
        let _ = token;
    }

    /// Erases user state where the platform requires it.
    fn logout(&self) {}

    /// Flushes anything the platforms have buffered.
    fn flush(&self);
}
