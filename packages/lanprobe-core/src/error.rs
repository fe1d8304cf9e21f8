//! Errors surfaced to callers of the scan engine.
//!
//! Individual probe failures (ping timeouts, refused connects, missing PTR
//! records, unparseable table lines) are not errors: they are negative signals
//! and never leave the module that observed them.

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Neither the neighbor table nor ICMP probing could be used at all.
    #[error("no probing method available: neighbor table unreadable and ping unavailable")]
    NoProbingAvailable,

    #[error("invalid host range {first}-{last}")]
    InvalidRange { first: u8, last: u8 },

    #[error("failed to detect local network: {0}")]
    NetworkDetection(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScanError>;
