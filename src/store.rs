//! Ownership of every block, pin, diagram pin and wire.
//!
//! [`EntityStore`] is the only place entities live. It enforces name
//! uniqueness and referential integrity (incident-wire lists stay in sync with
//! the wire table, removals cascade to wires) but knows nothing about wiring
//! legality; that is decided by [`crate::connectivity`] before
//! [`EntityStore::insert_wire`] is reached.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{DiagramError, NameScope, Result};
use crate::model::{
    Block, BlockId, DiagramPin, DiagramPinId, Direction, Endpoint, Pin, PinId, Point, Size, Wire,
    WireId,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityStore {
    blocks: IndexMap<BlockId, Block>,
    pins: IndexMap<PinId, Pin>,
    diagram_pins: IndexMap<DiagramPinId, DiagramPin>,
    wires: IndexMap<WireId, Wire>,
    /// Next id to hand out. Shared by all kinds; ids are never reused.
    next_id: u32,
}

fn check_name(scope: NameScope, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(DiagramError::InvalidName { scope });
    }
    Ok(())
}

fn diagram_scope(direction: Direction) -> NameScope {
    match direction {
        Direction::Input => NameScope::DiagramInput,
        Direction::Output => NameScope::DiagramOutput,
    }
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // ── creation ────────────────────────────────────────────────────────────

    /// Add a block with the given ordered pin names.
    ///
    /// The block starts at the origin with an empty size; placement and sizing
    /// are the caller's business. Nothing is inserted if any name is rejected.
    pub fn add_block<I, O>(&mut self, name: &str, input_pins: I, output_pins: O) -> Result<BlockId>
    where
        I: IntoIterator,
        I::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        check_name(NameScope::Block, name)?;
        if self.block_by_name(name).is_some() {
            return Err(DiagramError::DuplicateName {
                scope: NameScope::Block,
                name: name.to_string(),
            });
        }
        let inputs: Vec<String> = input_pins.into_iter().map(Into::into).collect();
        let outputs: Vec<String> = output_pins.into_iter().map(Into::into).collect();
        let mut seen: Vec<&str> = Vec::with_capacity(inputs.len() + outputs.len());
        for pin_name in inputs.iter().chain(outputs.iter()) {
            check_name(NameScope::Pin, pin_name)?;
            if seen.contains(&pin_name.as_str()) {
                return Err(DiagramError::DuplicateName {
                    scope: NameScope::Pin,
                    name: pin_name.clone(),
                });
            }
            seen.push(pin_name);
        }

        let id = BlockId(self.allocate());
        self.blocks.insert(
            id,
            Block {
                id,
                name: name.to_string(),
                position: Point::default(),
                size: Size::default(),
                inputs: Vec::new(),
                outputs: Vec::new(),
            },
        );
        for pin_name in inputs {
            self.push_pin(id, Direction::Input, pin_name);
        }
        for pin_name in outputs {
            self.push_pin(id, Direction::Output, pin_name);
        }
        Ok(id)
    }

    /// Append a pin to a block. Pin names are unique across both sides of a block.
    pub fn add_pin(&mut self, block: BlockId, direction: Direction, name: &str) -> Result<PinId> {
        check_name(NameScope::Pin, name)?;
        self.block(block)?;
        if self.pin_by_name(block, name).is_some() {
            return Err(DiagramError::DuplicateName {
                scope: NameScope::Pin,
                name: name.to_string(),
            });
        }
        Ok(self.push_pin(block, direction, name.to_string()))
    }

    fn push_pin(&mut self, owner: BlockId, direction: Direction, name: String) -> PinId {
        let id = PinId(self.allocate());
        self.pins.insert(
            id,
            Pin {
                id,
                owner,
                direction,
                name,
                wires: Vec::new(),
            },
        );
        if let Some(block) = self.blocks.get_mut(&owner) {
            block.pins_mut(direction).push(id);
        }
        id
    }

    /// Add a diagram terminal. Names are unique per direction.
    pub fn add_diagram_pin(&mut self, direction: Direction, name: &str) -> Result<DiagramPinId> {
        let scope = diagram_scope(direction);
        check_name(scope, name)?;
        if self.diagram_pin_by_name(direction, name).is_some() {
            return Err(DiagramError::DuplicateName {
                scope,
                name: name.to_string(),
            });
        }
        let id = DiagramPinId(self.allocate());
        self.diagram_pins.insert(
            id,
            DiagramPin {
                id,
                direction,
                name: name.to_string(),
                position: Point::default(),
                wires: Vec::new(),
            },
        );
        Ok(id)
    }

    /// Record a wire. Callers must have validated the pair already.
    pub(crate) fn insert_wire(&mut self, source: Endpoint, destination: Endpoint) -> Result<WireId> {
        self.endpoint_wires(source)?;
        self.endpoint_wires(destination)?;
        let id = WireId(self.allocate());
        self.wires.insert(
            id,
            Wire {
                id,
                source,
                destination,
            },
        );
        self.endpoint_wires_mut(source)?.push(id);
        self.endpoint_wires_mut(destination)?.push(id);
        Ok(id)
    }

    // ── removal ─────────────────────────────────────────────────────────────

    pub fn remove_wire(&mut self, id: WireId) -> Result<Wire> {
        let wire = self
            .wires
            .shift_remove(&id)
            .ok_or_else(|| DiagramError::NotFound(id.to_string()))?;
        for endpoint in [wire.source, wire.destination] {
            if let Ok(wires) = self.endpoint_wires_mut(endpoint) {
                wires.retain(|w| *w != id);
            }
        }
        Ok(wire)
    }

    fn remove_wires(&mut self, ids: &[WireId]) -> Result<()> {
        for id in ids {
            self.remove_wire(*id)?;
        }
        Ok(())
    }

    /// Remove a block, its pins and every wire touching them.
    ///
    /// Returns the ids of the cascaded wires.
    pub fn remove_block(&mut self, id: BlockId) -> Result<Vec<WireId>> {
        let wires = self.wires_touching_block(id)?;
        self.remove_wires(&wires)?;
        if let Some(block) = self.blocks.shift_remove(&id) {
            for pin in block.all_pins() {
                self.pins.shift_remove(&pin);
            }
        }
        Ok(wires)
    }

    /// Remove a single block pin and its wires.
    pub fn remove_pin(&mut self, id: PinId) -> Result<Vec<WireId>> {
        let wires = self.wires_touching(Endpoint::Block(id))?;
        self.remove_wires(&wires)?;
        if let Some(pin) = self.pins.shift_remove(&id) {
            if let Some(block) = self.blocks.get_mut(&pin.owner) {
                block.pins_mut(pin.direction).retain(|p| *p != id);
            }
        }
        Ok(wires)
    }

    pub fn remove_diagram_pin(&mut self, id: DiagramPinId) -> Result<Vec<WireId>> {
        let wires = self.wires_touching(Endpoint::Diagram(id))?;
        self.remove_wires(&wires)?;
        self.diagram_pins.shift_remove(&id);
        Ok(wires)
    }

    // ── lookup ──────────────────────────────────────────────────────────────

    pub fn block(&self, id: BlockId) -> Result<&Block> {
        self.blocks
            .get(&id)
            .ok_or_else(|| DiagramError::NotFound(id.to_string()))
    }

    pub(crate) fn block_mut(&mut self, id: BlockId) -> Result<&mut Block> {
        self.blocks
            .get_mut(&id)
            .ok_or_else(|| DiagramError::NotFound(id.to_string()))
    }

    pub fn pin(&self, id: PinId) -> Result<&Pin> {
        self.pins
            .get(&id)
            .ok_or_else(|| DiagramError::NotFound(id.to_string()))
    }

    pub fn diagram_pin(&self, id: DiagramPinId) -> Result<&DiagramPin> {
        self.diagram_pins
            .get(&id)
            .ok_or_else(|| DiagramError::NotFound(id.to_string()))
    }

    pub(crate) fn diagram_pin_mut(&mut self, id: DiagramPinId) -> Result<&mut DiagramPin> {
        self.diagram_pins
            .get_mut(&id)
            .ok_or_else(|| DiagramError::NotFound(id.to_string()))
    }

    pub fn wire(&self, id: WireId) -> Result<&Wire> {
        self.wires
            .get(&id)
            .ok_or_else(|| DiagramError::NotFound(id.to_string()))
    }

    pub fn block_by_name(&self, name: &str) -> Option<&Block> {
        self.blocks.values().find(|b| b.name == name)
    }

    pub fn pin_by_name(&self, block: BlockId, name: &str) -> Option<&Pin> {
        let block = self.blocks.get(&block)?;
        block
            .all_pins()
            .filter_map(|id| self.pins.get(&id))
            .find(|p| p.name == name)
    }

    pub fn diagram_pin_by_name(&self, direction: Direction, name: &str) -> Option<&DiagramPin> {
        self.diagram_pins
            .values()
            .find(|p| p.direction == direction && p.name == name)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    pub fn pins(&self) -> impl Iterator<Item = &Pin> {
        self.pins.values()
    }

    pub fn diagram_pins(&self) -> impl Iterator<Item = &DiagramPin> {
        self.diagram_pins.values()
    }

    /// Diagram pins of one direction, in their current order.
    pub fn diagram_pins_of(&self, direction: Direction) -> Vec<DiagramPinId> {
        self.diagram_pins
            .values()
            .filter(|p| p.direction == direction)
            .map(|p| p.id)
            .collect()
    }

    pub fn wires(&self) -> impl Iterator<Item = &Wire> {
        self.wires.values()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn wire_count(&self) -> usize {
        self.wires.len()
    }

    // ── referential queries ────────────────────────────────────────────────

    fn endpoint_wires(&self, endpoint: Endpoint) -> Result<&Vec<WireId>> {
        match endpoint {
            Endpoint::Block(id) => self.pin(id).map(|p| &p.wires),
            Endpoint::Diagram(id) => self.diagram_pin(id).map(|p| &p.wires),
        }
    }

    fn endpoint_wires_mut(&mut self, endpoint: Endpoint) -> Result<&mut Vec<WireId>> {
        let wires = match endpoint {
            Endpoint::Block(id) => self.pins.get_mut(&id).map(|p| &mut p.wires),
            Endpoint::Diagram(id) => self.diagram_pins.get_mut(&id).map(|p| &mut p.wires),
        };
        wires.ok_or_else(|| DiagramError::NotFound(format!("{endpoint:?}")))
    }

    /// Wires touching a pin or diagram pin.
    pub fn wires_touching(&self, endpoint: Endpoint) -> Result<Vec<WireId>> {
        self.endpoint_wires(endpoint).cloned()
    }

    /// Wires touching any pin of a block, each listed once.
    pub fn wires_touching_block(&self, id: BlockId) -> Result<Vec<WireId>> {
        let block = self.block(id)?;
        let mut out: Vec<WireId> = Vec::new();
        for pin in block.all_pins() {
            for wire in &self.pin(pin)?.wires {
                if !out.contains(wire) {
                    out.push(*wire);
                }
            }
        }
        Ok(out)
    }

    /// Number of wires whose destination is `endpoint`.
    pub fn incoming_wire_count(&self, endpoint: Endpoint) -> Result<usize> {
        let wires = self.endpoint_wires(endpoint)?;
        Ok(wires
            .iter()
            .filter_map(|w| self.wires.get(w))
            .filter(|w| w.destination == endpoint)
            .count())
    }

    pub fn find_wire(&self, source: Endpoint, destination: Endpoint) -> Option<WireId> {
        self.wires
            .values()
            .find(|w| w.source == source && w.destination == destination)
            .map(|w| w.id)
    }

    /// The direction an endpoint behaves like when wiring: `Output` for
    /// sources (block outputs, diagram inputs), `Input` for sinks.
    pub fn wiring_role(&self, endpoint: Endpoint) -> Result<Direction> {
        match endpoint {
            Endpoint::Block(id) => Ok(self.pin(id)?.direction),
            Endpoint::Diagram(id) => Ok(self.diagram_pin(id)?.wiring_role()),
        }
    }

    /// Owning block of an endpoint; diagram pins have none.
    pub fn endpoint_owner(&self, endpoint: Endpoint) -> Result<Option<BlockId>> {
        match endpoint {
            Endpoint::Block(id) => Ok(Some(self.pin(id)?.owner)),
            Endpoint::Diagram(id) => self.diagram_pin(id).map(|_| None),
        }
    }

    /// Human-readable `block:pin` or diagram pin name.
    pub fn describe(&self, endpoint: Endpoint) -> String {
        match endpoint {
            Endpoint::Block(id) => match self.pins.get(&id) {
                Some(pin) => match self.blocks.get(&pin.owner) {
                    Some(block) => format!("{}:{}", block.name, pin.name),
                    None => pin.name.clone(),
                },
                None => id.to_string(),
            },
            Endpoint::Diagram(id) => self
                .diagram_pins
                .get(&id)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| id.to_string()),
        }
    }

    // ── mutation of existing entities ──────────────────────────────────────

    pub fn rename_block(&mut self, id: BlockId, new_name: &str) -> Result<()> {
        check_name(NameScope::Block, new_name)?;
        if let Some(other) = self.block_by_name(new_name) {
            if other.id != id {
                return Err(DiagramError::DuplicateName {
                    scope: NameScope::Block,
                    name: new_name.to_string(),
                });
            }
        }
        self.block_mut(id)?.name = new_name.to_string();
        Ok(())
    }

    pub fn rename_diagram_pin(&mut self, id: DiagramPinId, new_name: &str) -> Result<()> {
        let direction = self.diagram_pin(id)?.direction;
        let scope = diagram_scope(direction);
        check_name(scope, new_name)?;
        if let Some(other) = self.diagram_pin_by_name(direction, new_name) {
            if other.id != id {
                return Err(DiagramError::DuplicateName {
                    scope,
                    name: new_name.to_string(),
                });
            }
        }
        self.diagram_pin_mut(id)?.name = new_name.to_string();
        Ok(())
    }

    pub(crate) fn set_block_position(&mut self, id: BlockId, position: Point) -> Result<()> {
        self.block_mut(id)?.position = position;
        Ok(())
    }

    pub(crate) fn set_block_size(&mut self, id: BlockId, size: Size) -> Result<()> {
        self.block_mut(id)?.size = size;
        Ok(())
    }

    pub(crate) fn set_diagram_pin_position(&mut self, id: DiagramPinId, position: Point) -> Result<()> {
        self.diagram_pin_mut(id)?.position = position;
        Ok(())
    }

    /// Replace one side's pin order. `order` must be a permutation of the
    /// current pins on that side.
    pub(crate) fn set_pin_order(
        &mut self,
        id: BlockId,
        direction: Direction,
        order: Vec<PinId>,
    ) -> Result<()> {
        let block = self.block_mut(id)?;
        if !is_permutation(block.pins(direction), &order) {
            return Err(DiagramError::PinOrderMismatch(format!(
                "{} pins of block '{}'",
                direction, block.name
            )));
        }
        *block.pins_mut(direction) = order;
        Ok(())
    }

    /// Replace the order of one class of diagram pins.
    pub(crate) fn set_diagram_pin_order(
        &mut self,
        direction: Direction,
        order: &[DiagramPinId],
    ) -> Result<()> {
        if !is_permutation(&self.diagram_pins_of(direction), order) {
            return Err(DiagramError::PinOrderMismatch(format!(
                "diagram {}s",
                direction
            )));
        }
        for id in order {
            if let Some(pin) = self.diagram_pins.shift_remove(id) {
                self.diagram_pins.insert(*id, pin);
            }
        }
        Ok(())
    }
}

pub(crate) fn is_permutation<T: PartialEq + Copy>(current: &[T], proposed: &[T]) -> bool {
    current.len() == proposed.len()
        && current.iter().all(|c| proposed.contains(c))
        && proposed.iter().all(|p| current.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blocks() -> (EntityStore, BlockId, BlockId) {
        let mut store = EntityStore::new();
        let a = store.add_block("A", ["Control"], ["Data"]).unwrap();
        let b = store.add_block("B", ["DataIn"], ["DataOut"]).unwrap();
        (store, a, b)
    }

    fn pin(store: &EntityStore, block: BlockId, name: &str) -> Endpoint {
        Endpoint::Block(store.pin_by_name(block, name).unwrap().id)
    }

    #[test]
    fn test_add_block_creates_ordered_pins() {
        let mut store = EntityStore::new();
        let id = store.add_block("Proc", ["InA", "InB"], ["Out"]).unwrap();
        let block = store.block(id).unwrap();
        let names: Vec<&str> = block
            .inputs
            .iter()
            .map(|p| store.pin(*p).unwrap().name.as_str())
            .collect();
        assert_eq!(names, vec!["InA", "InB"]);
        assert_eq!(block.outputs.len(), 1);
        assert_eq!(store.pin(block.outputs[0]).unwrap().direction, Direction::Output);
    }

    #[test]
    fn test_duplicate_block_name_rejected() {
        let (mut store, _, _) = two_blocks();
        let err = store.add_block("A", Vec::<String>::new(), Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, DiagramError::DuplicateName { scope: NameScope::Block, .. }));
        assert_eq!(store.block_count(), 2);
    }

    #[test]
    fn test_duplicate_pin_name_across_sides_rejected_atomically() {
        let mut store = EntityStore::new();
        let err = store.add_block("X", ["p"], ["p"]).unwrap_err();
        assert!(matches!(err, DiagramError::DuplicateName { scope: NameScope::Pin, .. }));
        assert_eq!(store.block_count(), 0);
        assert_eq!(store.pins().count(), 0);
    }

    #[test]
    fn test_diagram_pin_names_scoped_by_direction() {
        let mut store = EntityStore::new();
        store.add_diagram_pin(Direction::Input, "x").unwrap();
        store.add_diagram_pin(Direction::Output, "x").unwrap();
        let err = store.add_diagram_pin(Direction::Input, "x").unwrap_err();
        assert_eq!(err.kind(), "DuplicateNameError");
    }

    #[test]
    fn test_remove_block_cascades_only_incident_wires() {
        let (mut store, a, b) = two_blocks();
        let c = store.add_block("C", ["In"], Vec::<String>::new()).unwrap();
        let ab = store
            .insert_wire(pin(&store, a, "Data"), pin(&store, b, "DataIn"))
            .unwrap();
        let bc = store
            .insert_wire(pin(&store, b, "DataOut"), pin(&store, c, "In"))
            .unwrap();

        let removed = store.remove_block(a).unwrap();
        assert_eq!(removed, vec![ab]);
        assert!(store.wire(bc).is_ok());
        assert!(store.wire(ab).is_err());
        assert!(store.pin_by_name(b, "DataIn").unwrap().wires.is_empty());
        assert!(store.block(a).is_err());
    }

    #[test]
    fn test_remove_unknown_is_not_found() {
        let mut store = EntityStore::new();
        assert!(matches!(store.remove_block(BlockId(9)), Err(DiagramError::NotFound(_))));
        assert!(matches!(store.remove_wire(WireId(9)), Err(DiagramError::NotFound(_))));
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut store = EntityStore::new();
        let a = store.add_block("A", Vec::<String>::new(), Vec::<String>::new()).unwrap();
        store.remove_block(a).unwrap();
        let b = store.add_block("A", Vec::<String>::new(), Vec::<String>::new()).unwrap();
        assert_ne!(a, b);
        assert!(store.block(a).is_err());
    }

    #[test]
    fn test_diagram_pin_roles_are_inverted() {
        let mut store = EntityStore::new();
        let i = store.add_diagram_pin(Direction::Input, "In").unwrap();
        let o = store.add_diagram_pin(Direction::Output, "Out").unwrap();
        assert_eq!(store.wiring_role(i.into()).unwrap(), Direction::Output);
        assert_eq!(store.wiring_role(o.into()).unwrap(), Direction::Input);
        assert_eq!(store.endpoint_owner(i.into()).unwrap(), None);
    }

    #[test]
    fn test_set_pin_order_requires_permutation() {
        let mut store = EntityStore::new();
        let id = store.add_block("P", ["a", "b"], Vec::<String>::new()).unwrap();
        let mut order = store.block(id).unwrap().inputs.clone();
        order.reverse();
        store.set_pin_order(id, Direction::Input, order.clone()).unwrap();
        assert_eq!(store.block(id).unwrap().inputs, order);

        let err = store
            .set_pin_order(id, Direction::Input, vec![order[0]])
            .unwrap_err();
        assert!(matches!(err, DiagramError::PinOrderMismatch(_)));
    }

    #[test]
    fn test_set_diagram_pin_order() {
        let mut store = EntityStore::new();
        let a = store.add_diagram_pin(Direction::Input, "a").unwrap();
        let b = store.add_diagram_pin(Direction::Input, "b").unwrap();
        store.add_diagram_pin(Direction::Output, "z").unwrap();
        store.set_diagram_pin_order(Direction::Input, &[b, a]).unwrap();
        assert_eq!(store.diagram_pins_of(Direction::Input), vec![b, a]);
        assert_eq!(store.diagram_pins_of(Direction::Output).len(), 1);
    }

    #[test]
    fn test_rename_block_keeps_uniqueness() {
        let (mut store, a, _) = two_blocks();
        assert!(store.rename_block(a, "B").is_err());
        store.rename_block(a, "A").unwrap();
        store.rename_block(a, "Alpha").unwrap();
        assert_eq!(store.block(a).unwrap().name, "Alpha");
        assert_eq!(store.describe(pin(&store, a, "Data")), "Alpha:Data");
    }
}
