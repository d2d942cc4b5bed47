#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid digest {digest:?}: {reason}")]
    InvalidDigest { digest: String, reason: String },
}
