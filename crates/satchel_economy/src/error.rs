//! # Economy Error Types
//!
//! Errors signal misuse: unknown ids, bad slot addresses, a second pick-up
//! while one is in flight, broken configuration. Business outcomes such as
//! allocation remainders or aborted crafts are plain return values.

use thiserror::Error;

/// Errors that can occur in the economy system.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EconomyError {
    /// Item not found in the catalog.
    #[error("item not found: {0}")]
    ItemNotFound(u32),

    /// Recipe not found in the recipe book.
    #[error("recipe not found: {0}")]
    RecipeNotFound(u32),

    /// Container id does not belong to these holdings.
    #[error("container not found: {0}")]
    ContainerNotFound(usize),

    /// Slot index past the end of its container.
    #[error("slot {index} out of range for container {container} ({len} slots)")]
    SlotOutOfRange {
        /// Container that was addressed.
        container: usize,
        /// Requested slot index.
        index: usize,
        /// Number of slots in the container.
        len: usize,
    },

    /// Tried to pick up from an empty slot.
    #[error("slot {index} of container {container} is empty")]
    EmptySlot {
        /// Container that was addressed.
        container: usize,
        /// Requested slot index.
        index: usize,
    },

    /// A pick-up was requested while another transfer is still in flight.
    #[error("a transfer is already in flight")]
    TransferInProgress,

    /// A drop or cancel was requested with nothing held.
    #[error("no transfer in flight")]
    NoTransferInFlight,

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(String),

    /// Configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    ConfigIo(String),
}

/// Result type for economy operations.
pub type EconomyResult<T> = Result<T, EconomyError>;
