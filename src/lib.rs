//! Block diagram editing core.
//!
//! This crate models a directed graph of blocks with typed pins, wires and
//! diagram-level input/output terminals. All mutation goes through
//! [`Diagram`], which checks wiring legality, keeps derived geometry up to
//! date and honours user locks. [`Diagram::optimize_placement`] repositions
//! unlocked blocks to reduce wire crossings and wire length.
//!
//! The binary `rustyblocks` imports a part interchange JSON file, optionally
//! optimizes its layout and prints the resulting snapshot as JSON.

pub mod config;
pub mod connectivity;
pub mod diagram;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod interchange;
pub mod locks;
pub mod model;
pub mod optimize;
pub mod snapshot;
pub mod store;

pub use config::{Budget, EditorConfig, GeometryConfig, OptimizerSettings, Strategy};
pub use diagram::{DeletionReport, Diagram};
pub use error::{DiagramError, Result};
pub use model::{
    BlockId, DiagramPinId, Direction, Endpoint, Entity, LockTarget, PinId, Point, Size, WireId,
};
pub use optimize::{CancelToken, CostBreakdown, OptimizationReport, StopReason};
pub use snapshot::DiagramSnapshot;
