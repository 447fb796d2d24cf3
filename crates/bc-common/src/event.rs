//! The analytics event value object and its builder.

use crate::persistent::PersistentPropertySet;
use crate::profile::ProfileUpdate;
use crate::select::SinkSelection;
use crate::{IncrementalProperties, Properties};
use serde_json::Value;
use std::sync::OnceLock;

/// An analytics event, immutable after construction except for the one-time
/// identity stamp applied by the router before dispatch.
///
/// Persistent-property and profile changes added at build time travel
/// embedded in the event; the router peels them off and routes them on its
/// own paths (store merge and all-sink fan-out respectively) before the event
/// itself is dispatched to the selected sinks.
#[derive(Debug)]
pub struct Event {
    name: String,
    properties: Properties,
    persistent: Option<PersistentPropertySet>,
    profile: Option<ProfileUpdate>,
    identity: OnceLock<(String, String)>,
    selection_override: SinkSelection,
}

impl Event {
    pub fn builder(name: impl Into<String>) -> EventBuilder {
        EventBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Embedded persistent-property changes, `None` when nothing was added.
    pub fn persistent(&self) -> Option<&PersistentPropertySet> {
        self.persistent.as_ref()
    }

    /// Embedded profile changes, `None` when nothing was added.
    pub fn profile(&self) -> Option<&ProfileUpdate> {
        self.profile.as_ref()
    }

    /// Sink selection forced by the caller; empty means the router's
    /// resolver decides.
    pub fn selection_override(&self) -> &SinkSelection {
        &self.selection_override
    }

    /// Stamps the identity pair onto the event. The router calls this exactly
    /// once before validation; under a concurrent race exactly one caller
    /// wins.
    ///
    /// # Panics
    ///
    /// Panics if the identity was already assigned. Double assignment is a
    /// usage bug, not a runtime condition.
    pub fn assign_identity(&self, pair: (String, String)) {
        if self.identity.set(pair).is_err() {
            panic!("identity already assigned for event `{}`", self.name);
        }
    }

    /// The identity pair stamped by the router.
    ///
    /// # Panics
    ///
    /// Panics if called before [`Event::assign_identity`].
    pub fn identity(&self) -> &(String, String) {
        self.identity
            .get()
            .unwrap_or_else(|| panic!("identity read before assignment for event `{}`", self.name))
    }

    /// The generated identity value, common across every sink this event
    /// reaches.
    pub fn event_id(&self) -> &str {
        &self.identity().1
    }
}

/// Builder for [`Event`]. Property buckets are kept apart; the paired
/// `*_persistent_profile_*` methods write the same key/value into both the
/// persistent and the profile bucket.
#[derive(Debug)]
pub struct EventBuilder {
    name: String,
    properties: Properties,
    persistent_properties: Properties,
    one_time_persistent_properties: Properties,
    incremental_persistent_properties: IncrementalProperties,
    profile_properties: Properties,
    one_time_profile_properties: Properties,
    incremental_profile_properties: IncrementalProperties,
    selection_override: SinkSelection,
}

impl EventBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Properties::new(),
            persistent_properties: Properties::new(),
            one_time_persistent_properties: Properties::new(),
            incremental_persistent_properties: IncrementalProperties::new(),
            profile_properties: Properties::new(),
            one_time_profile_properties: Properties::new(),
            incremental_profile_properties: IncrementalProperties::new(),
            selection_override: SinkSelection::new(),
        }
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn properties(mut self, properties: Properties) -> Self {
        self.properties.extend(properties);
        self
    }

    pub fn persistent_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.persistent_properties.insert(key.into(), value.into());
        self
    }

    pub fn persistent_properties(mut self, properties: Properties) -> Self {
        self.persistent_properties.extend(properties);
        self
    }

    pub fn one_time_persistent_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.one_time_persistent_properties
            .insert(key.into(), value.into());
        self
    }

    pub fn incremental_persistent_property(mut self, key: impl Into<String>, delta: f64) -> Self {
        self.incremental_persistent_properties
            .insert(key.into(), delta);
        self
    }

    pub fn profile_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.profile_properties.insert(key.into(), value.into());
        self
    }

    pub fn profile_properties(mut self, properties: Properties) -> Self {
        self.profile_properties.extend(properties);
        self
    }

    pub fn one_time_profile_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.one_time_profile_properties
            .insert(key.into(), value.into());
        self
    }

    pub fn incremental_profile_property(mut self, key: impl Into<String>, delta: f64) -> Self {
        self.incremental_profile_properties.insert(key.into(), delta);
        self
    }

    /// Writes `key`/`value` to both the persistent and the profile bucket.
    pub fn persistent_profile_property(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        let value = value.into();
        self.persistent_property(key.clone(), value.clone())
            .profile_property(key, value)
    }

    /// One-time variant of [`EventBuilder::persistent_profile_property`].
    pub fn one_time_persistent_profile_property(
        self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        let key = key.into();
        let value = value.into();
        self.one_time_persistent_property(key.clone(), value.clone())
            .one_time_profile_property(key, value)
    }

    /// Incremental variant of [`EventBuilder::persistent_profile_property`].
    pub fn incremental_persistent_profile_property(
        self,
        key: impl Into<String>,
        delta: f64,
    ) -> Self {
        let key = key.into();
        self.incremental_persistent_property(key.clone(), delta)
            .incremental_profile_property(key, delta)
    }

    /// Forces the sinks this event is routed to, bypassing the router's
    /// resolver.
    pub fn override_sinks(mut self, selection: SinkSelection) -> Self {
        self.selection_override = selection;
        self
    }

    pub fn build(self) -> Event {
        let persistent = PersistentPropertySet::builder()
            .properties(self.persistent_properties)
            .one_time_properties(self.one_time_persistent_properties)
            .incremental_properties(self.incremental_persistent_properties)
            .build();
        let profile = ProfileUpdate::builder()
            .properties(self.profile_properties)
            .one_time_properties(self.one_time_profile_properties)
            .incremental_properties(self.incremental_profile_properties)
            .build();

        Event {
            name: self.name,
            properties: self.properties,
            // Empty sub-objects are dropped here so downstream fan-out has
            // nothing to do for events that carry none.
            persistent: (!persistent.is_empty()).then_some(persistent),
            profile: (!profile.is_empty()).then_some(profile),
            identity: OnceLock::new(),
            selection_override: self.selection_override,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::select::SinkId;

    #[test]
    fn empty_sub_objects_are_dropped() {
        let event = Event::builder("App Started").property("Source", "test").build();
        assert!(event.persistent().is_none());
        assert!(event.profile().is_none());
        assert!(event.selection_override().is_empty());
    }

    #[test]
    fn paired_property_lands_in_both_buckets() {
        let event = Event::builder("App Started")
            .persistent_profile_property("Campaign", "launch")
            .incremental_persistent_profile_property("Total App Starts", 1.0)
            .build();

        let persistent = event.persistent().unwrap();
        let profile = event.profile().unwrap();
        assert_eq!(persistent.properties()["Campaign"], "launch");
        assert_eq!(profile.properties()["Campaign"], "launch");
        assert_eq!(persistent.incremental_properties()["Total App Starts"], 1.0);
        assert_eq!(profile.incremental_properties()["Total App Starts"], 1.0);
    }

    #[test]
    fn identity_reads_back_after_one_assignment() {
        let event = Event::builder("Button Clicked").build();
        event.assign_identity(("Event Id".to_string(), "abc-123".to_string()));
        assert_eq!(event.identity().0, "Event Id");
        assert_eq!(event.event_id(), "abc-123");
    }

    #[test]
    #[should_panic(expected = "identity already assigned")]
    fn second_identity_assignment_panics() {
        let event = Event::builder("Button Clicked").build();
        event.assign_identity(("Event Id".to_string(), "a".to_string()));
        event.assign_identity(("Event Id".to_string(), "b".to_string()));
    }

    #[test]
    #[should_panic(expected = "identity read before assignment")]
    fn identity_read_before_assignment_panics() {
        let event = Event::builder("Button Clicked").build();
        let _ = event.identity();
    }

    #[test]
    fn override_selection_is_kept() {
        let event = Event::builder("Checkout")
            .override_sinks(SinkSelection::only(SinkId::new(2)))
            .build();
        assert!(event.selection_override().contains(SinkId::new(2)));
    }
}
