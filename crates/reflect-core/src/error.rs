use thiserror::Error;

/// Failures surfaced by units, scopes and the component tree.
#[derive(Debug, Error)]
pub enum CoreError {
    /// `scope_bind` was asked for a strict bind with no scope available.
    #[error("no scope to bind to")]
    NoScope,

    /// A unit was used under `UnitConfig::force_scope` outside any scope.
    #[error("unit `{unit}` requires a scope but none was provided")]
    ScopeRequired { unit: String },

    /// A trigger payload did not decode into the unit's payload type.
    #[error("payload for `{unit}` rejected: {source}")]
    Payload {
        unit: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A value spread into props was not a JSON object.
    #[error("item at index {index} is not a record")]
    NotARecord { index: usize },
}

pub type Result<T, E = CoreError> = std::result::Result<T, E>;
