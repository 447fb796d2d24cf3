//! Persistent property changes.

use crate::{IncrementalProperties, Properties};
use serde_json::Value;

/// A set of changes to the shared persistent-property state.
///
/// Unlike a [`crate::ProfileUpdate`], which is forwarded straight to every
/// sink, a persistent set is merged into the [`crate::AnalyticsStore`] and
/// rides along with all future events. The bucket semantics mirror the
/// profile ones: overwrite, keep-existing, and numeric increment.
#[derive(Debug, Clone, Default)]
pub struct PersistentPropertySet {
    properties: Properties,
    one_time_properties: Properties,
    incremental_properties: IncrementalProperties,
}

impl PersistentPropertySet {
    pub fn builder() -> PersistentPropertySetBuilder {
        PersistentPropertySetBuilder::default()
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
pub struct PersistentPropertySetBuilder {
    properties: Properties,
    one_time_properties: Properties,
    incremental_properties: IncrementalProperties,
}

impl PersistentPropertySetBuilder {
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

    pub fn build(self) -> PersistentPropertySet {
        PersistentPropertySet {
            properties: self.properties,
            one_time_properties: self.one_time_properties,
            incremental_properties: self.incremental_properties,
        }
    }
}
