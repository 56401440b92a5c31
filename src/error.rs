//! Error types for the inventory controller and its document stores.

use thiserror::Error;

/// Main error type for inventory operations.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("Store unreachable: {0}")]
    Transport(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Checksum mismatch: expected {expected}, got {got}")]
    ChecksumMismatch { expected: u32, got: u32 },

    #[error("Store is locked by another process")]
    Locked,

    #[error("Store not initialized")]
    NotInitialized,

    #[error("Invalid store format: {0}")]
    InvalidFormat(String),

    #[error("Subscription dropped")]
    SubscriptionDropped,
}

impl From<rmp_serde::encode::Error> for InventoryError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        InventoryError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for InventoryError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        InventoryError::Deserialization(e.to_string())
    }
}

/// Result type for inventory operations.
pub type Result<T> = std::result::Result<T, InventoryError>;
