//! Typed outcomes for rejected repository operations.
use thiserror::Error;

use crate::run::Role;
use crate::storage::StorageError;
use crate::transfer::TransferError;

/// Coarse classification of a [`TrackerError`], for callers that only branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    CapacityExceeded,
    AlreadyAssigned,
    MalformedImport,
    PersistenceFailure,
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("run {0} not found")]
    RunNotFound(String),
    #[error("potential {potential_id} is not assigned to run {run_id}")]
    TargetNotFound { run_id: String, potential_id: String },
    #[error("potential {0} not found in catalog")]
    PotentialNotFound(String),
    #[error("character {0} not found in catalog")]
    CharacterNotFound(String),
    #[error("character {char_id} has no {role} slot for potential {potential_id} in run {run_id}")]
    SlotNotFound {
        run_id: String,
        char_id: String,
        role: Role,
        potential_id: String,
    },
    #[error("{char_id} ({role}) is at capacity: {used}/{capacity} slots used")]
    CapacityExceeded {
        char_id: String,
        role: Role,
        used: u32,
        capacity: u32,
    },
    #[error("potential {potential_id} is already assigned to run {run_id}")]
    AlreadyAssigned { run_id: String, potential_id: String },
    #[error("invalid import: {0}")]
    MalformedImport(#[from] TransferError),
    #[error("change not saved: {0}")]
    Persistence(#[from] StorageError),
}

impl TrackerError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::RunNotFound(_)
            | Self::TargetNotFound { .. }
            | Self::PotentialNotFound(_)
            | Self::CharacterNotFound(_)
            | Self::SlotNotFound { .. } => ErrorKind::NotFound,
            Self::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            Self::AlreadyAssigned { .. } => ErrorKind::AlreadyAssigned,
            Self::MalformedImport(_) => ErrorKind::MalformedImport,
            Self::Persistence(_) => ErrorKind::PersistenceFailure,
        }
    }
}
