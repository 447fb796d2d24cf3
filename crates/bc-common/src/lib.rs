//! Beacon core data model
//!
//! This crate provides the types shared by the router and its collaborators:
//! - Event / ProfileUpdate / PersistentPropertySet: immutable value objects built via builders
//! - SinkId / SinkSelection: sink identifiers and ordered sink subsets
//! - AnalyticsStore: the persistent-store contract
//! - SinkResolver: event-name to sink-subset resolution
//! - EventIdProvider: per-event identity generation

pub mod event;
pub mod identity;
pub mod persistent;
pub mod profile;
pub mod resolver;
pub mod select;
pub mod store;

pub use event::{Event, EventBuilder};
pub use identity::{EventIdProvider, UuidEventIdProvider};
pub use persistent::PersistentPropertySet;
pub use profile::ProfileUpdate;
pub use resolver::{FixedResolver, SinkResolver};
pub use select::{SinkId, SinkSelection};
pub use store::AnalyticsStore;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Event and profile property maps. Values are arbitrary JSON; `Value::Null`
/// marks a property that is present but carries no value.
pub type Properties = HashMap<String, Value>;

/// Numeric-delta property maps. A destination key absent from the target
/// state is treated as starting at `0.0`.
pub type IncrementalProperties = HashMap<String, f64>;

/// Gender of the user as reported at login/update time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

/// User identity payload forwarded to every sink on login and profile update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserInfo {
    /// Unique identifier for the user on the application's platform.
    pub user_id: String,
    /// Phone number with country code, e.g. `+910123456789`.
    pub phone: Option<String>,
    pub email: Option<String>,
    pub user_name: Option<String>,
    pub gender: Option<Gender>,
    /// Additional key/value pairs mapped to profile properties.
    pub properties: Properties,
}

impl UserInfo {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Self::default()
        }
    }
}
