use bc_common::SinkId;

/// Errors raised by the router layer.
///
/// Only construction-time errors propagate to the caller. Dispatch-time
/// conditions (`SinkNotFound`) are absorbed: the router logs them and moves
/// on to the remaining sinks.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("sink id `{0}` registered twice")]
    DuplicateSinkId(SinkId),

    #[error("no sink registered under id `{sink_id}` while dispatching `{event_name}`")]
    SinkNotFound { sink_id: SinkId, event_name: String },

    #[error("invalid key pattern: {0}")]
    InvalidKeyPattern(#[from] regex::Error),
}
