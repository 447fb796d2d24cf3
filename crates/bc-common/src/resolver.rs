//! Event-name to sink-subset resolution.

use crate::select::SinkSelection;

/// Decides which sinks an event is routed to when the event itself does not
/// carry a selection override. Expected to be a pure lookup; the router may
/// call it any number of times for the same name.
pub trait SinkResolver: Send + Sync {
    fn resolve(&self, event_name: &str) -> SinkSelection;
}

/// Routes every event to the same fixed selection. Useful for single-sink
/// deployments and tests.
#[derive(Debug, Clone, Default)]
pub struct FixedResolver {
    selection: SinkSelection,
}

impl FixedResolver {
    pub fn new(selection: SinkSelection) -> Self {
        Self { selection }
    }
}

impl SinkResolver for FixedResolver {
    fn resolve(&self, _event_name: &str) -> SinkSelection {
        self.selection.clone()
    }
}
