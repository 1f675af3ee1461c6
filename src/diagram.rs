//! The [`Diagram`] aggregate: the single entry point for every mutation.
//!
//! Each operation validates first and mutates second, so a failing call
//! leaves the diagram exactly as it was. Derived state (block sizes, diagram
//! pin alignment) is refreshed after every successful structural change.

use std::sync::Arc;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::{Budget, EditorConfig, OptimizerSettings};
use crate::connectivity::{can_connect, can_delete};
use crate::error::{DiagramError, Result};
use crate::geometry::{
    self, MonospaceMeasurer, Rect, TextMeasurer, align_diagram_pins, block_size, find_free_spot,
    obstacles, placement_hint,
};
use crate::grid::GridSnapper;
use crate::locks::LockRegistry;
use crate::model::{
    Block, BlockId, DiagramPin, DiagramPinId, Direction, Endpoint, Entity, LockTarget, Pin,
    PinId, Point, Wire, WireId,
};
use crate::optimize::{self, CancelToken, CostBreakdown, OptimizationReport};
use crate::store::{EntityStore, is_permutation};

/// Outcome of [`Diagram::delete`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionReport {
    pub entity: Entity,
    /// Every wire that no longer exists after the call. For a wire deletion
    /// this is just the wire itself.
    pub wires_removed: Vec<WireId>,
}

impl DeletionReport {
    pub fn wire_count(&self) -> usize {
        self.wires_removed.len()
    }
}

pub struct Diagram {
    store: EntityStore,
    locks: LockRegistry,
    grid: GridSnapper,
    config: EditorConfig,
    measurer: Arc<dyn TextMeasurer + Send + Sync>,
}

impl std::fmt::Debug for Diagram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagram")
            .field("store", &self.store)
            .field("locks", &self.locks)
            .field("grid", &self.grid)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Clone for Diagram {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            locks: self.locks.clone(),
            grid: self.grid,
            config: self.config.clone(),
            measurer: Arc::clone(&self.measurer),
        }
    }
}

impl Default for Diagram {
    fn default() -> Self {
        let config = EditorConfig::default();
        Self {
            store: EntityStore::new(),
            locks: LockRegistry::new(),
            grid: GridSnapper::default(),
            measurer: Arc::new(MonospaceMeasurer::from_config(&config.geometry)),
            config,
        }
    }
}

/// On-disk form of a diagram for the binary format.
#[derive(Serialize, Deserialize)]
struct DiagramDoc {
    store: EntityStore,
    locks: LockRegistry,
    config: EditorConfig,
}

const BINARY_MAGIC: &[u8; 8] = b"RUSTYBLK";
const BINARY_VERSION: u32 = 1;

impl Diagram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EditorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store: EntityStore::new(),
            locks: LockRegistry::new(),
            grid: GridSnapper::new(config.grid_pitch)?,
            measurer: Arc::new(MonospaceMeasurer::from_config(&config.geometry)),
            config,
        })
    }

    /// Swap the text measurer and re-derive every block size.
    pub fn set_measurer(&mut self, measurer: Arc<dyn TextMeasurer + Send + Sync>) -> Result<()> {
        self.measurer = measurer;
        self.relayout_all()
    }

    /// Replace the configuration, re-deriving sizes and alignment.
    ///
    /// Existing positions are kept as they are, even if the new pitch no
    /// longer divides them.
    pub fn set_config(&mut self, config: EditorConfig) -> Result<()> {
        config.validate()?;
        self.grid = GridSnapper::new(config.grid_pitch)?;
        self.config = config;
        self.relayout_all()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn grid(&self) -> &GridSnapper {
        &self.grid
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn locks(&self) -> &LockRegistry {
        &self.locks
    }

    // ── lookups ─────────────────────────────────────────────────────────────

    pub fn block(&self, id: BlockId) -> Result<&Block> {
        self.store.block(id)
    }

    pub fn block_by_name(&self, name: &str) -> Result<&Block> {
        self.store
            .block_by_name(name)
            .ok_or_else(|| DiagramError::NotFound(format!("block '{name}'")))
    }

    pub fn pin(&self, id: PinId) -> Result<&Pin> {
        self.store.pin(id)
    }

    /// Handle of the pin called `name` on `block`.
    pub fn pin_by_name(&self, block: BlockId, name: &str) -> Result<PinId> {
        let owner = self.store.block(block)?;
        self.store
            .pin_by_name(block, name)
            .map(|p| p.id)
            .ok_or_else(|| DiagramError::NotFound(format!("pin '{}:{name}'", owner.name)))
    }

    pub fn diagram_pin(&self, id: DiagramPinId) -> Result<&DiagramPin> {
        self.store.diagram_pin(id)
    }

    pub fn diagram_pin_by_name(&self, direction: Direction, name: &str) -> Result<DiagramPinId> {
        self.store
            .diagram_pin_by_name(direction, name)
            .map(|p| p.id)
            .ok_or_else(|| DiagramError::NotFound(format!("diagram {direction} '{name}'")))
    }

    pub fn wire(&self, id: WireId) -> Result<&Wire> {
        self.store.wire(id)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.store.blocks()
    }

    pub fn diagram_pins(&self) -> impl Iterator<Item = &DiagramPin> {
        self.store.diagram_pins()
    }

    pub fn wires(&self) -> impl Iterator<Item = &Wire> {
        self.store.wires()
    }

    /// Anchor point of a pin or diagram pin.
    pub fn anchor(&self, endpoint: Endpoint) -> Result<Point> {
        geometry::endpoint_anchor(&self.store, endpoint, &self.config.geometry, &self.grid)
    }

    // ── derived state ───────────────────────────────────────────────────────

    fn relayout_block(&mut self, id: BlockId) -> Result<()> {
        let size = block_size(
            &self.store,
            id,
            &self.config.geometry,
            &self.grid,
            self.measurer.as_ref(),
        )?;
        self.store.set_block_size(id, size)
    }

    fn realign(&mut self) -> Result<()> {
        if self.config.geometry.auto_align_diagram_pins {
            align_diagram_pins(&mut self.store, &self.config.geometry, &self.grid)?;
        }
        Ok(())
    }

    fn relayout_all(&mut self) -> Result<()> {
        let ids: Vec<BlockId> = self.store.blocks().map(|b| b.id).collect();
        for id in ids {
            self.relayout_block(id)?;
        }
        self.realign()
    }

    // ── creation ────────────────────────────────────────────────────────────

    /// Create a block and place it next to the existing ones, on the nearest
    /// free grid spot.
    pub fn create_block<I, O>(&mut self, name: &str, inputs: I, outputs: O) -> Result<BlockId>
    where
        I: IntoIterator,
        I::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        let existing = geometry::blocks_bounding_box(&self.store);
        let id = self.insert_block(name, inputs, outputs)?;
        let size = self.store.block(id)?.size;
        let hint = placement_hint(existing, size, &self.config.geometry, &self.grid);
        let spot = find_free_spot(
            hint,
            size,
            &obstacles(&self.store, &self.config.geometry, Some(id)),
            &self.grid,
            self.config.geometry.placement_search_radius_cells,
        );
        self.place_new_block(id, spot)
    }

    /// Create a block at an explicit (snapped) position.
    pub fn create_block_at<I, O>(
        &mut self,
        name: &str,
        inputs: I,
        outputs: O,
        x: f64,
        y: f64,
    ) -> Result<BlockId>
    where
        I: IntoIterator,
        I::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        let requested = finite_point(x, y)?;
        let id = self.insert_block(name, inputs, outputs)?;
        self.place_new_block(id, self.grid.snap(requested))
    }

    fn insert_block<I, O>(&mut self, name: &str, inputs: I, outputs: O) -> Result<BlockId>
    where
        I: IntoIterator,
        I::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        let id = self.store.add_block(name, inputs, outputs).inspect_err(|e| {
            debug!(name = name, error:% = e; "Rejected block creation");
        })?;
        self.relayout_block(id)?;
        Ok(id)
    }

    fn place_new_block(&mut self, id: BlockId, position: Point) -> Result<BlockId> {
        self.store.set_block_position(id, position)?;
        self.realign()?;
        let block = self.store.block(id)?;
        info!(
            block = block.name.as_str(),
            x = position.x,
            y = position.y,
            inputs = block.inputs.len(),
            outputs = block.outputs.len();
            "Created block"
        );
        Ok(id)
    }

    pub fn create_diagram_input(&mut self, name: &str) -> Result<DiagramPinId> {
        self.create_diagram_pin(Direction::Input, name)
    }

    pub fn create_diagram_output(&mut self, name: &str) -> Result<DiagramPinId> {
        self.create_diagram_pin(Direction::Output, name)
    }

    fn create_diagram_pin(&mut self, direction: Direction, name: &str) -> Result<DiagramPinId> {
        let id = self.store.add_diagram_pin(direction, name)?;
        // Without auto-alignment a new terminal starts on the matching edge of
        // the super block, or at the origin on an empty canvas.
        let start = match geometry::super_block(&self.store, &self.config.geometry) {
            Some(frame) => match direction {
                Direction::Input => Point::new(frame.left(), frame.center().y),
                Direction::Output => Point::new(frame.right(), frame.center().y),
            },
            None => Point::default(),
        };
        self.store
            .set_diagram_pin_position(id, self.grid.snap(start))?;
        self.realign()?;
        info!(name = name, direction:% = direction; "Created diagram pin");
        Ok(id)
    }

    /// Append a pin to an existing block; the block grows to fit.
    pub fn add_pin(&mut self, block: BlockId, direction: Direction, name: &str) -> Result<PinId> {
        let id = self.store.add_pin(block, direction, name)?;
        self.relayout_block(block)?;
        self.realign()?;
        info!(block:% = block, pin = name, direction:% = direction; "Added pin");
        Ok(id)
    }

    /// Wire `source` to `destination` after checking every wiring rule.
    pub fn create_wire(
        &mut self,
        source: impl Into<Endpoint>,
        destination: impl Into<Endpoint>,
    ) -> Result<WireId> {
        let (source, destination) = (source.into(), destination.into());
        if let Err(e) = can_connect(&self.store, source, destination) {
            debug!(kind = e.kind(), error:% = e; "Rejected wire");
            return Err(e);
        }
        let id = self.store.insert_wire(source, destination)?;
        info!(
            wire:% = id,
            source = self.store.describe(source).as_str(),
            destination = self.store.describe(destination).as_str();
            "Created wire"
        );
        Ok(id)
    }

    // ── movement ────────────────────────────────────────────────────────────

    /// Move a block, snapping the requested top-left corner to the grid.
    /// Returns the position actually applied.
    pub fn move_block(&mut self, block: BlockId, x: f64, y: f64) -> Result<Point> {
        self.store.block(block)?;
        if self.locks.is_block_locked(block) {
            return Err(DiagramError::Locked(LockTarget::Block(block)));
        }
        let position = self.grid.snap(finite_point(x, y)?);
        self.store.set_block_position(block, position)?;
        self.realign()?;
        debug!(block:% = block, x = position.x, y = position.y; "Moved block");
        Ok(position)
    }

    /// Move a diagram pin. With auto-alignment on and at least one block
    /// present, only the vertical order among pins of the same direction is
    /// taken from the request; the pin then snaps back onto the super block
    /// edge.
    pub fn move_diagram_pin(&mut self, pin: DiagramPinId, x: f64, y: f64) -> Result<Point> {
        let direction = self.store.diagram_pin(pin)?.direction;
        let requested = self.grid.snap(finite_point(x, y)?);
        let aligned = self.config.geometry.auto_align_diagram_pins
            && geometry::blocks_bounding_box(&self.store).is_some();
        if aligned {
            let current = self.store.diagram_pins_of(direction);
            let mut keyed: Vec<(f64, DiagramPinId)> = Vec::with_capacity(current.len());
            for id in &current {
                let y = if *id == pin {
                    requested.y
                } else {
                    self.store.diagram_pin(*id)?.position.y
                };
                keyed.push((y, *id));
            }
            keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
            let order: Vec<DiagramPinId> = keyed.into_iter().map(|(_, id)| id).collect();
            self.apply_diagram_pin_order(direction, order)?;
        } else {
            self.store.set_diagram_pin_position(pin, requested)?;
        }
        Ok(self.store.diagram_pin(pin)?.position)
    }

    // ── locking ─────────────────────────────────────────────────────────────

    pub fn set_locked(&mut self, target: impl Into<LockTarget>, locked: bool) -> Result<()> {
        let target = target.into();
        match target {
            LockTarget::Block(id) => {
                self.store.block(id)?;
            }
            LockTarget::Wire(id) => {
                self.store.wire(id)?;
            }
        }
        if self.locks.set_locked(target, locked) {
            info!(target:% = target, locked = locked; "Lock state changed");
        }
        Ok(())
    }

    pub fn is_locked(&self, target: impl Into<LockTarget>) -> bool {
        self.locks.is_locked(target)
    }

    /// A pin counts as locked while any wire attached to it is locked.
    pub fn is_pin_locked(&self, endpoint: impl Into<Endpoint>) -> bool {
        self.locked_wire_at(endpoint.into()).is_some()
    }

    fn locked_wire_at(&self, endpoint: Endpoint) -> Option<WireId> {
        self.store
            .wires_touching(endpoint)
            .ok()?
            .into_iter()
            .find(|w| self.locks.is_wire_locked(*w))
    }

    /// Clear every lock. Returns how many were set.
    pub fn unlock_all(&mut self) -> usize {
        let count = self.locks.clear();
        info!(count = count; "Unlocked all items");
        count
    }

    // ── deletion ────────────────────────────────────────────────────────────

    /// Delete an entity and every wire attached to it.
    ///
    /// Fails with [`DiagramError::Locked`] if the entity is a locked block or
    /// if any wire that would go with it is locked.
    pub fn delete(&mut self, entity: impl Into<Entity>) -> Result<DeletionReport> {
        let entity = entity.into();
        if let Err(e) = can_delete(&self.store, &self.locks, entity) {
            debug!(entity:? = entity, error:% = e; "Rejected deletion");
            return Err(e);
        }
        let wires_removed = match entity {
            Entity::Wire(id) => {
                self.store.remove_wire(id)?;
                vec![id]
            }
            Entity::Block(id) => {
                let wires = self.store.remove_block(id)?;
                self.locks.forget(id);
                wires
            }
            Entity::Pin(id) => {
                let owner = self.store.pin(id)?.owner;
                let wires = self.store.remove_pin(id)?;
                self.relayout_block(owner)?;
                wires
            }
            Entity::DiagramPin(id) => self.store.remove_diagram_pin(id)?,
        };
        for wire in &wires_removed {
            self.locks.forget(*wire);
        }
        self.realign()?;
        info!(entity:? = entity, wires_removed = wires_removed.len(); "Deleted");
        Ok(DeletionReport {
            entity,
            wires_removed,
        })
    }

    // ── renaming and reordering ─────────────────────────────────────────────

    pub fn rename_block(&mut self, block: BlockId, new_name: &str) -> Result<()> {
        let old = self.store.block(block)?.name.clone();
        self.store.rename_block(block, new_name)?;
        self.relayout_block(block)?;
        self.realign()?;
        info!(from = old.as_str(), to = new_name; "Renamed block");
        Ok(())
    }

    pub fn rename_diagram_pin(&mut self, pin: DiagramPinId, new_name: &str) -> Result<()> {
        self.store.rename_diagram_pin(pin, new_name)?;
        info!(pin:% = pin, to = new_name; "Renamed diagram pin");
        Ok(())
    }

    /// Reorder the pins on one side of a block. `names` must be a permutation
    /// of that side's pin names.
    pub fn set_block_pin_order(
        &mut self,
        block: BlockId,
        direction: Direction,
        names: &[&str],
    ) -> Result<()> {
        let current = self.store.block(block)?.pins(direction).to_vec();
        let mut order = Vec::with_capacity(names.len());
        for name in names {
            let pin = self
                .store
                .pin_by_name(block, name)
                .filter(|p| p.direction == direction)
                .ok_or_else(|| self.pin_order_mismatch(block, direction))?;
            order.push(pin.id);
        }
        if !is_permutation(&current, &order) {
            return Err(self.pin_order_mismatch(block, direction));
        }
        self.check_locked_order(&current, &order, Endpoint::Block)?;
        self.store.set_pin_order(block, direction, order)?;
        debug!(block:% = block, direction:% = direction; "Reordered block pins");
        Ok(())
    }

    fn pin_order_mismatch(&self, block: BlockId, direction: Direction) -> DiagramError {
        let name = self
            .store
            .block(block)
            .map(|b| b.name.clone())
            .unwrap_or_else(|_| block.to_string());
        DiagramError::PinOrderMismatch(format!("{direction} pins of block '{name}'"))
    }

    /// Reorder the diagram pins of one direction by name.
    pub fn set_diagram_pin_order(&mut self, direction: Direction, names: &[&str]) -> Result<()> {
        let mut order = Vec::with_capacity(names.len());
        for name in names {
            let pin = self.store.diagram_pin_by_name(direction, name).ok_or_else(|| {
                DiagramError::PinOrderMismatch(format!("diagram {direction}s"))
            })?;
            order.push(pin.id);
        }
        self.apply_diagram_pin_order(direction, order)
    }

    fn apply_diagram_pin_order(&mut self, direction: Direction, order: Vec<DiagramPinId>) -> Result<()> {
        let current = self.store.diagram_pins_of(direction);
        if !is_permutation(&current, &order) {
            return Err(DiagramError::PinOrderMismatch(format!("diagram {direction}s")));
        }
        self.check_locked_order(&current, &order, Endpoint::Diagram)?;
        self.store.set_diagram_pin_order(direction, &order)?;
        self.realign()?;
        debug!(direction:% = direction; "Reordered diagram pins");
        Ok(())
    }

    /// Pins held by a locked wire must keep their relative order.
    fn check_locked_order<T: Copy + PartialEq>(
        &self,
        current: &[T],
        proposed: &[T],
        endpoint: impl Fn(T) -> Endpoint,
    ) -> Result<()> {
        let pinned = |order: &[T]| -> Vec<(T, WireId)> {
            order
                .iter()
                .filter_map(|p| self.locked_wire_at(endpoint(*p)).map(|w| (*p, w)))
                .collect()
        };
        let before = pinned(current);
        let after = pinned(proposed);
        match before.iter().zip(&after).find(|(a, b)| a.0 != b.0) {
            Some((_, (_, wire))) => Err(DiagramError::Locked(LockTarget::Wire(*wire))),
            None => Ok(()),
        }
    }

    // ── layout queries ──────────────────────────────────────────────────────

    pub fn cost(&self) -> Result<CostBreakdown> {
        optimize::cost::evaluate(
            &self.store,
            &self.config.geometry,
            &self.grid,
            &self.config.optimizer.weights,
        )
    }

    pub fn blocks_bounding_box(&self) -> Option<Rect> {
        geometry::blocks_bounding_box(&self.store)
    }

    pub fn super_block(&self) -> Option<Rect> {
        geometry::super_block(&self.store, &self.config.geometry)
    }

    // ── optimization ────────────────────────────────────────────────────────

    /// Run the configured optimizer with a different budget.
    pub fn optimize_placement(&mut self, budget: Budget) -> Result<OptimizationReport> {
        let settings = OptimizerSettings {
            budget,
            ..self.config.optimizer.clone()
        };
        self.optimize_placement_with(&settings, &CancelToken::new())
    }

    pub fn optimize_placement_with(
        &mut self,
        settings: &OptimizerSettings,
        cancel: &CancelToken,
    ) -> Result<OptimizationReport> {
        optimize::optimize(
            &mut self.store,
            &self.locks,
            &self.config.geometry,
            self.grid,
            settings,
            cancel,
        )
    }

    // ── persistence ─────────────────────────────────────────────────────────

    /// Save the diagram to a binary file (magic bytes, version, bincode payload).
    pub fn save_to_binary<P: AsRef<std::path::Path>>(&self, path: P) -> anyhow::Result<()> {
        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        std::io::Write::write_all(&mut writer, BINARY_MAGIC)?;
        std::io::Write::write_all(&mut writer, &BINARY_VERSION.to_le_bytes())?;
        let doc = DiagramDoc {
            store: self.store.clone(),
            locks: self.locks.clone(),
            config: self.config.clone(),
        };
        bincode::serde::encode_into_std_write(&doc, &mut writer, bincode::config::standard())?;
        std::io::Write::flush(&mut writer)?;
        Ok(())
    }

    /// Load a diagram saved with [`Diagram::save_to_binary`], checking magic
    /// bytes and version.
    pub fn load_from_binary<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let file = std::fs::File::open(path)?;
        let mut reader = std::io::BufReader::new(file);
        let mut magic = [0u8; 8];
        std::io::Read::read_exact(&mut reader, &mut magic)?;
        if &magic != BINARY_MAGIC {
            anyhow::bail!("Invalid magic bytes: expected 'RUSTYBLK'");
        }
        let mut version_bytes = [0u8; 4];
        std::io::Read::read_exact(&mut reader, &mut version_bytes)?;
        let version = u32::from_le_bytes(version_bytes);
        if version != BINARY_VERSION {
            anyhow::bail!("Unsupported version: {}", version);
        }
        let doc: DiagramDoc =
            bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard())?;
        let mut diagram = Diagram::with_config(doc.config)?;
        diagram.store = doc.store;
        diagram.locks = doc.locks;
        Ok(diagram)
    }
}

/// NaN or infinite coordinates never reach the store.
fn finite_point(x: f64, y: f64) -> Result<Point> {
    if x.is_finite() && y.is_finite() {
        Ok(Point::new(x, y))
    } else {
        Err(DiagramError::InvalidPosition { x, y })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> (Diagram, BlockId, BlockId) {
        let mut d = Diagram::new();
        let a = d.create_block("A", ["Control"], ["Data"]).unwrap();
        let b = d.create_block("B", ["DataIn"], ["DataOut"]).unwrap();
        (d, a, b)
    }

    #[test]
    fn test_auto_placement_does_not_overlap() {
        let (d, a, b) = scenario();
        let ra = geometry::block_rect(d.block(a).unwrap());
        let rb = geometry::block_rect(d.block(b).unwrap());
        assert!(!ra.intersects(&rb));
        assert!(rb.x > ra.x);
        assert!(d.grid().is_aligned(d.block(b).unwrap().position));
    }

    #[test]
    fn test_failed_creation_leaves_no_trace() {
        let (mut d, _, _) = scenario();
        let before = d.store().block_count();
        assert!(d.create_block("A", ["x"], ["y"]).is_err());
        assert!(d.create_block("C", ["x"], ["x"]).is_err());
        assert_eq!(d.store().block_count(), before);
        assert_eq!(d.store().pins().count(), 4);
    }

    #[test]
    fn test_move_locked_block_fails() {
        let (mut d, a, _) = scenario();
        d.set_locked(a, true).unwrap();
        let before = d.block(a).unwrap().position;
        let err = d.move_block(a, 333.0, 333.0).unwrap_err();
        assert_eq!(err, DiagramError::Locked(LockTarget::Block(a)));
        assert_eq!(d.block(a).unwrap().position, before);
    }

    #[test]
    fn test_non_finite_positions_are_rejected() {
        let (mut d, a, b) = scenario();
        let before = d.block(a).unwrap().position;
        let cost = d.cost().unwrap().total;

        let err = d.move_block(a, f64::NAN, 0.0).unwrap_err();
        assert_eq!(err.kind(), "InvalidPositionError");
        assert!(d.move_block(b, f64::INFINITY, 0.0).is_err());
        assert_eq!(d.block(a).unwrap().position, before);
        assert!(d.grid().is_aligned(d.block(b).unwrap().position));
        assert_eq!(d.cost().unwrap().total, cost);

        let blocks = d.store().block_count();
        assert!(d.create_block_at("C", ["x"], ["y"], 0.0, f64::NEG_INFINITY).is_err());
        assert_eq!(d.store().block_count(), blocks);
        assert!(d.block_by_name("C").is_err());

        let input = d.create_diagram_input("In").unwrap();
        let pin_before = d.diagram_pin(input).unwrap().position;
        assert!(d.move_diagram_pin(input, 0.0, f64::NAN).is_err());
        assert_eq!(d.diagram_pin(input).unwrap().position, pin_before);
    }

    #[test]
    fn test_add_pin_grows_block() {
        let (mut d, a, _) = scenario();
        let height = d.block(a).unwrap().size.height;
        d.add_pin(a, Direction::Input, "Extra").unwrap();
        assert_eq!(d.block(a).unwrap().size.height, height + 20.0);
        assert!(d.add_pin(a, Direction::Output, "Extra").is_err());
    }

    #[test]
    fn test_pin_order_respects_locked_wires() {
        let mut d = Diagram::new();
        let src = d.create_block("S", Vec::<String>::new(), ["o1", "o2"]).unwrap();
        let sink = d.create_block("T", ["a", "b", "c"], Vec::<String>::new()).unwrap();
        let o1 = d.pin_by_name(src, "o1").unwrap();
        let o2 = d.pin_by_name(src, "o2").unwrap();
        let w1 = d.create_wire(o1, d.pin_by_name(sink, "a").unwrap()).unwrap();
        let w2 = d.create_wire(o2, d.pin_by_name(sink, "c").unwrap()).unwrap();
        d.set_locked(w1, true).unwrap();
        d.set_locked(w2, true).unwrap();

        // a and c keep their relative order: fine.
        d.set_block_pin_order(sink, Direction::Input, &["b", "a", "c"]).unwrap();
        // Swapping a and c is refused.
        let err = d
            .set_block_pin_order(sink, Direction::Input, &["c", "b", "a"])
            .unwrap_err();
        assert_eq!(err.kind(), "LockedError");
        let err = d
            .set_block_pin_order(sink, Direction::Input, &["a", "b"])
            .unwrap_err();
        assert_eq!(err.kind(), "PinOrderMismatchError");
    }

    #[test]
    fn test_unlock_all() {
        let (mut d, a, b) = scenario();
        d.set_locked(a, true).unwrap();
        d.set_locked(b, true).unwrap();
        assert_eq!(d.unlock_all(), 2);
        assert!(!d.is_locked(a));
        assert!(d.set_locked(WireId(999), true).is_err());
    }

    #[test]
    fn test_diagram_pins_follow_super_block() {
        let (mut d, a, _) = scenario();
        let input = d.create_diagram_input("In").unwrap();
        let output = d.create_diagram_output("Out").unwrap();
        let frame = d.super_block().unwrap();
        assert_eq!(d.diagram_pin(input).unwrap().position.x, frame.left());
        assert_eq!(d.diagram_pin(output).unwrap().position.x, frame.right());

        d.move_block(a, -400.0, 0.0).unwrap();
        let frame = d.super_block().unwrap();
        assert_eq!(d.diagram_pin(input).unwrap().position.x, frame.left());
    }
}
