use thiserror::Error;

#[derive(Debug, Error)]
pub enum GavelError {
    /// Required configuration data is missing; fatal before any network call.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A poll budget was exhausted waiting for an external operation.
    #[error("timed out: {context}")]
    Timeout { context: String },

    /// The solver reached a terminal Error / No Solution state.
    #[error("solver failed on '{title}': {message}")]
    Solver { title: String, message: String },

    /// Uniform `{name, message}` error shape from the solver HTTP API.
    #[error("{name}: {message}")]
    Api { name: String, message: String },

    /// A record references an entity absent from the snapshot.
    #[error("data integrity: {0}")]
    DataIntegrity(String),

    #[error("platform error: {0}")]
    Platform(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GavelError>;
