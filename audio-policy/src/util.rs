use thiserror::Error;

/// Policy documents are small; anything larger is rejected unread.
pub const MAX_POLICY_FILE_BYTES: u64 = 64 * 1024;

/// On-disk probe order: platform-specific policy first, then the default.
/// The first candidate that loads wins.
pub const DEFAULT_POLICY_PATHS: [&str; 2] = [
    "/config/data/settings/default/platform_audio_policy.json",
    "/config/data/settings/default/audio_policy.json",
];

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid policy document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0:?} is not a valid render usage")]
    UnknownRenderUsage(String),
    #[error("{0:?} is not a valid capture usage")]
    UnknownCaptureUsage(String),
    #[error("{0:?} is not a valid behavior")]
    UnknownBehavior(String),
    #[error("usage names both render_usage and capture_usage")]
    AmbiguousUsage,
    #[error("usage names neither render_usage nor capture_usage")]
    MissingUsage,
    #[error("policy file too large: {0} bytes (max {MAX_POLICY_FILE_BYTES})")]
    FileTooLarge(u64),
}
