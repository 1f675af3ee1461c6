//! Read-only export of a diagram for renderers.
//!
//! A [`DiagramSnapshot`] carries everything needed to draw the diagram
//! without re-deriving layout: positions, sizes, pin anchors, lock state and
//! connectivity.

use serde::Serialize;

use crate::diagram::Diagram;
use crate::error::Result;
use crate::model::{BlockId, DiagramPinId, Direction, Endpoint, PinId, Point, Size, WireId};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PinSnapshot {
    pub id: PinId,
    pub name: String,
    pub direction: Direction,
    pub anchor: Point,
    pub wires: Vec<WireId>,
    /// True while any attached wire is locked.
    pub locked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockSnapshot {
    pub id: BlockId,
    pub name: String,
    pub position: Point,
    pub size: Size,
    pub locked: bool,
    pub inputs: Vec<PinSnapshot>,
    pub outputs: Vec<PinSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagramPinSnapshot {
    pub id: DiagramPinId,
    pub name: String,
    pub direction: Direction,
    pub position: Point,
    pub wires: Vec<WireId>,
    pub locked: bool,
}

/// One end of a wire as seen by a renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireEndSnapshot {
    pub endpoint: Endpoint,
    /// Owning block name, `None` for diagram pins.
    pub block: Option<String>,
    pub pin: String,
    pub anchor: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireSnapshot {
    pub id: WireId,
    pub source: WireEndSnapshot,
    pub destination: WireEndSnapshot,
    pub locked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagramSnapshot {
    pub grid_pitch: f64,
    pub blocks: Vec<BlockSnapshot>,
    pub diagram_inputs: Vec<DiagramPinSnapshot>,
    pub diagram_outputs: Vec<DiagramPinSnapshot>,
    pub wires: Vec<WireSnapshot>,
}

impl DiagramSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn block(&self, name: &str) -> Option<&BlockSnapshot> {
        self.blocks.iter().find(|b| b.name == name)
    }
}

impl Diagram {
    pub fn snapshot(&self) -> Result<DiagramSnapshot> {
        let store = self.store();

        let pin_snapshot = |id: PinId| -> Result<PinSnapshot> {
            let pin = store.pin(id)?;
            Ok(PinSnapshot {
                id,
                name: pin.name.clone(),
                direction: pin.direction,
                anchor: self.anchor(Endpoint::Block(id))?,
                wires: pin.wires.clone(),
                locked: self.is_pin_locked(id),
            })
        };

        let mut blocks = Vec::with_capacity(store.block_count());
        for block in store.blocks() {
            blocks.push(BlockSnapshot {
                id: block.id,
                name: block.name.clone(),
                position: block.position,
                size: block.size,
                locked: self.is_locked(block.id),
                inputs: block.inputs.iter().map(|p| pin_snapshot(*p)).collect::<Result<Vec<_>>>()?,
                outputs: block.outputs.iter().map(|p| pin_snapshot(*p)).collect::<Result<Vec<_>>>()?,
            });
        }

        let diagram_pins = |direction: Direction| -> Result<Vec<DiagramPinSnapshot>> {
            store
                .diagram_pins_of(direction)
                .into_iter()
                .map(|id| -> Result<DiagramPinSnapshot> {
                    let pin = store.diagram_pin(id)?;
                    Ok(DiagramPinSnapshot {
                        id,
                        name: pin.name.clone(),
                        direction,
                        position: pin.position,
                        wires: pin.wires.clone(),
                        locked: self.is_pin_locked(id),
                    })
                })
                .collect()
        };

        let wire_end = |endpoint: Endpoint| -> Result<WireEndSnapshot> {
            let (block, pin) = match endpoint {
                Endpoint::Block(id) => {
                    let pin = store.pin(id)?;
                    (Some(store.block(pin.owner)?.name.clone()), pin.name.clone())
                }
                Endpoint::Diagram(id) => (None, store.diagram_pin(id)?.name.clone()),
            };
            Ok(WireEndSnapshot {
                endpoint,
                block,
                pin,
                anchor: self.anchor(endpoint)?,
            })
        };

        let mut wires = Vec::with_capacity(store.wire_count());
        for wire in store.wires() {
            wires.push(WireSnapshot {
                id: wire.id,
                source: wire_end(wire.source)?,
                destination: wire_end(wire.destination)?,
                locked: self.is_locked(wire.id),
            });
        }

        Ok(DiagramSnapshot {
            grid_pitch: self.grid().pitch(),
            blocks,
            diagram_inputs: diagram_pins(Direction::Input)?,
            diagram_outputs: diagram_pins(Direction::Output)?,
            wires,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_carries_geometry_and_locks() {
        let mut d = Diagram::new();
        let a = d.create_block("A", ["Control"], ["Data"]).unwrap();
        let input = d.create_diagram_input("In").unwrap();
        let control = d.pin_by_name(a, "Control").unwrap();
        let wire = d.create_wire(input, control).unwrap();
        d.set_locked(wire, true).unwrap();

        let snap = d.snapshot().unwrap();
        let block = snap.block("A").unwrap();
        assert_eq!(block.size, Size::new(160.0, 40.0));
        assert_eq!(block.inputs[0].anchor, Point::new(0.0, 20.0));
        assert!(block.inputs[0].locked);
        assert!(!block.outputs[0].locked);
        assert!(snap.diagram_inputs[0].locked);
        assert_eq!(snap.wires[0].destination.block.as_deref(), Some("A"));
        assert_eq!(snap.wires[0].source.pin, "In");
        assert!(snap.wires[0].locked);

        let json = snap.to_json().unwrap();
        assert!(json.contains("\"diagram_inputs\""));
    }
}
