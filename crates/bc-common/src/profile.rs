//! Profile property updates.

use crate::{IncrementalProperties, Properties};
use serde_json::Value;

/// A set of user-profile changes forwarded to every registered sink.
///
/// The three buckets are disjoint in meaning, not in keys: `properties`
/// overwrite, `one_time_properties` are honored only if the destination does
/// not already hold the key, and `incremental_properties` are numeric deltas
/// added to the destination value (absent keys start at `0.0`). Whether the
/// one-time and incremental buckets reach a platform at all depends on the
/// sink's capability flags.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    properties: Properties,
    one_time_properties: Properties,
    incremental_properties: IncrementalProperties,
}

impl ProfileUpdate {
    pub fn builder() -> ProfileUpdateBuilder {
        ProfileUpdateBuilder::default()
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn one_time_properties(&self) -> &Properties {
        &self.one_time_properties
    }

    pub fn incremental_properties(&self) -> &IncrementalProperties {
        &self.incremental_properties
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
            && self.one_time_properties.is_empty()
            && self.incremental_properties.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct ProfileUpdateBuilder {
    properties: Properties,
    one_time_properties: Properties,
    incremental_properties: IncrementalProperties,
}

impl ProfileUpdateBuilder {
    pub fn property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn properties(mut self, properties: Properties) -> Self {
        self.properties.extend(properties);
        self
    }

    pub fn one_time_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.one_time_properties.insert(key.into(), value.into());
        self
    }

    pub fn one_time_properties(mut self, properties: Properties) -> Self {
        self.one_time_properties.extend(properties);
        self
    }

    pub fn incremental_property(mut self, key: impl Into<String>, delta: f64) -> Self {
        self.incremental_properties.insert(key.into(), delta);
        self
    }

    pub fn incremental_properties(mut self, properties: IncrementalProperties) -> Self {
        self.incremental_properties.extend(properties);
        self
    }

    pub fn build(self) -> ProfileUpdate {
        ProfileUpdate {
            properties: self.properties,
            one_time_properties: self.one_time_properties,
            incremental_properties: self.incremental_properties,
        }
    }
}
