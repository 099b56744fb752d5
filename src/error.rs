use thiserror::Error;

/// Failure of an image or narration request to the generation service.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] ureq::Error),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Response had no {0} payload")]
    MissingPayload(&'static str),

    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0} worker panicked")]
    WorkerPanicked(&'static str),
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("audio payload is empty")]
    Empty,

    #[error("malformed audio payload: {0}")]
    Malformed(String),

    #[error("unsupported audio format: {0}")]
    Unsupported(String),
}

impl From<symphonia::core::errors::Error> for DecodeError {
    fn from(err: symphonia::core::errors::Error) -> Self {
        use symphonia::core::errors::Error as SymphoniaError;
        match err {
            SymphoniaError::Unsupported(what) => DecodeError::Unsupported(what.to_string()),
            other => DecodeError::Malformed(other.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("failed to open audio output: {0}")]
    OutputInit(String),

    #[error("failed to start playback: {0}")]
    Start(String),
}

#[derive(Error, Debug)]
pub enum AudioError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no API key found; pass --api-key or set GEMINI_API_KEY")]
    MissingApiKey,

    #[error("scene {requested} is out of range (1-{count})")]
    SceneOutOfRange { requested: usize, count: usize },
}
