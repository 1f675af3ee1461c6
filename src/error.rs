//! Error types for diagram operations.
//!
//! Every failure a caller can trigger through [`crate::diagram::Diagram`] is a
//! variant of [`DiagramError`]. All of them are recoverable: the diagram is left
//! exactly as it was before the failing call.

use thiserror::Error;

use crate::model::{Direction, LockTarget};

/// Convenience alias used throughout the library.
pub type Result<T, E = DiagramError> = std::result::Result<T, E>;

/// The kind of named entity a name-related error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameScope {
    Block,
    Pin,
    DiagramInput,
    DiagramOutput,
}

impl std::fmt::Display for NameScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NameScope::Block => "block",
            NameScope::Pin => "pin",
            NameScope::DiagramInput => "diagram input",
            NameScope::DiagramOutput => "diagram output",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DiagramError {
    #[error("a {scope} named '{name}' already exists")]
    DuplicateName { scope: NameScope, name: String },

    #[error("{0} not found")]
    NotFound(String),

    /// Source is not output-capable or destination is not input-capable.
    #[error("cannot wire {source_desc} ({source_role}) to {destination_desc} ({destination_role})")]
    Direction {
        source_desc: String,
        source_role: Direction,
        destination_desc: String,
        destination_role: Direction,
    },

    #[error("destination {0} already has an incoming wire")]
    DestinationOccupied(String),

    #[error("cannot wire block '{0}' to itself")]
    SelfLoop(String),

    #[error("{source_desc} is already wired to {destination_desc}")]
    DuplicateWire {
        source_desc: String,
        destination_desc: String,
    },

    #[error("{0} is locked")]
    Locked(LockTarget),

    #[error("pin order for {0} must be a permutation of its existing pins")]
    PinOrderMismatch(String),

    #[error("{scope} name must not be empty")]
    InvalidName { scope: NameScope },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("position ({x}, {y}) is not finite")]
    InvalidPosition { x: f64, y: f64 },
}

impl DiagramError {
    /// Short machine-friendly kind name, handy for UI message lookup.
    pub fn kind(&self) -> &'static str {
        match self {
            DiagramError::DuplicateName { .. } => "DuplicateNameError",
            DiagramError::NotFound(_) => "NotFoundError",
            DiagramError::Direction { .. } => "DirectionError",
            DiagramError::DestinationOccupied(_) => "DestinationOccupiedError",
            DiagramError::SelfLoop(_) => "SelfLoopError",
            DiagramError::DuplicateWire { .. } => "DuplicateWireError",
            DiagramError::Locked(_) => "LockedError",
            DiagramError::PinOrderMismatch(_) => "PinOrderMismatchError",
            DiagramError::InvalidName { .. } => "InvalidNameError",
            DiagramError::InvalidConfig(_) => "InvalidConfigError",
            DiagramError::InvalidPosition { .. } => "InvalidPositionError",
        }
    }
}
