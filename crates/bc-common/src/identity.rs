//! Per-event identity generation.

use uuid::Uuid;

/// Produces the identity pair stamped onto every event before dispatch. The
/// key is fixed per provider; the value is generated fresh per event and is
/// the common event identifier across all sinks the event reaches.
pub trait EventIdProvider: Send + Sync {
    /// Property key the identity value is stored under.
    fn key(&self) -> &str;

    /// Generates a new identity value.
    fn generate(&self) -> String;

    fn identity_pair(&self) -> (String, String) {
        (self.key().to_string(), self.generate())
    }
}

/// Default provider: a fixed key with a random v4 UUID per event.
#[derive(Debug, Clone)]
pub struct UuidEventIdProvider {
    key: String,
}

impl UuidEventIdProvider {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Default for UuidEventIdProvider {
    fn default() -> Self {
        Self::new("Event Id")
    }
}

impl EventIdProvider for UuidEventIdProvider {
    fn key(&self) -> &str {
        &self.key
    }

    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
