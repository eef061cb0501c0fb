/// Session-layer errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The credential is malformed, unknown, or expired.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// The caller resolved to the anonymous identity where a real one is
    /// required.
    #[error("unauthorized")]
    Unauthorized,

    #[error("session store unavailable: {0}")]
    Store(String),
}
