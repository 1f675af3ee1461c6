use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Handles
// ────────────────────────────────────────────────────────────────────────────

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub u32);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($label, " #{}"), self.0)
            }
        }
    };
}

entity_id!(
    /// Handle to a [`Block`].
    BlockId,
    "block"
);
entity_id!(
    /// Handle to a [`Pin`] owned by a block.
    PinId,
    "pin"
);
entity_id!(
    /// Handle to a diagram-level terminal ([`DiagramPin`]).
    DiagramPinId,
    "diagram pin"
);
entity_id!(
    /// Handle to a [`Wire`].
    WireId,
    "wire"
);

/// One end of a wire: either a block pin or a diagram-level terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endpoint {
    Block(PinId),
    Diagram(DiagramPinId),
}

impl From<PinId> for Endpoint {
    fn from(id: PinId) -> Self {
        Endpoint::Block(id)
    }
}

impl From<DiagramPinId> for Endpoint {
    fn from(id: DiagramPinId) -> Self {
        Endpoint::Diagram(id)
    }
}

/// Anything that can be deleted through the facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Entity {
    Block(BlockId),
    Pin(PinId),
    DiagramPin(DiagramPinId),
    Wire(WireId),
}

impl From<BlockId> for Entity {
    fn from(id: BlockId) -> Self {
        Entity::Block(id)
    }
}

impl From<PinId> for Entity {
    fn from(id: PinId) -> Self {
        Entity::Pin(id)
    }
}

impl From<DiagramPinId> for Entity {
    fn from(id: DiagramPinId) -> Self {
        Entity::DiagramPin(id)
    }
}

impl From<Endpoint> for Entity {
    fn from(endpoint: Endpoint) -> Self {
        match endpoint {
            Endpoint::Block(id) => Entity::Pin(id),
            Endpoint::Diagram(id) => Entity::DiagramPin(id),
        }
    }
}

impl From<WireId> for Entity {
    fn from(id: WireId) -> Self {
        Entity::Wire(id)
    }
}

/// Entities that carry a lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LockTarget {
    Block(BlockId),
    Wire(WireId),
}

impl std::fmt::Display for LockTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockTarget::Block(id) => id.fmt(f),
            LockTarget::Wire(id) => id.fmt(f),
        }
    }
}

impl From<BlockId> for LockTarget {
    fn from(id: BlockId) -> Self {
        LockTarget::Block(id)
    }
}

impl From<WireId> for LockTarget {
    fn from(id: WireId) -> Self {
        LockTarget::Wire(id)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Geometry primitives
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Direction
// ────────────────────────────────────────────────────────────────────────────

/// Direction tag carried by every pin and diagram pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Input => Direction::Output,
            Direction::Output => Direction::Input,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Input => "input",
            Direction::Output => "output",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Entities
// ────────────────────────────────────────────────────────────────────────────

/// A named node with ordered input and output pins.
///
/// `inputs` and `outputs` are in vertical order: the index of a pin in its list
/// determines where its anchor sits on the block edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub name: String,
    /// Top-left corner.
    pub position: Point,
    pub size: Size,
    pub inputs: Vec<PinId>,
    pub outputs: Vec<PinId>,
}

impl Block {
    pub fn pins(&self, direction: Direction) -> &[PinId] {
        match direction {
            Direction::Input => &self.inputs,
            Direction::Output => &self.outputs,
        }
    }

    pub(crate) fn pins_mut(&mut self, direction: Direction) -> &mut Vec<PinId> {
        match direction {
            Direction::Input => &mut self.inputs,
            Direction::Output => &mut self.outputs,
        }
    }

    /// All pins, inputs first.
    pub fn all_pins(&self) -> impl Iterator<Item = PinId> + '_ {
        self.inputs.iter().chain(self.outputs.iter()).copied()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pin {
    pub id: PinId,
    pub owner: BlockId,
    pub direction: Direction,
    pub name: String,
    /// Incident wires. Input pins hold at most one.
    pub wires: Vec<WireId>,
}

/// A diagram-level terminal.
///
/// A diagram *input* feeds the canvas and therefore acts as a wire source; a
/// diagram *output* acts as a wire sink. See [`DiagramPin::wiring_role`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagramPin {
    pub id: DiagramPinId,
    pub direction: Direction,
    pub name: String,
    /// Anchor point of the terminal.
    pub position: Point,
    pub wires: Vec<WireId>,
}

impl DiagramPin {
    /// The block-pin direction this terminal behaves like when wiring.
    pub fn wiring_role(&self) -> Direction {
        self.direction.opposite()
    }
}

/// A directed connection from an output-capable endpoint to an input-capable one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wire {
    pub id: WireId,
    pub source: Endpoint,
    pub destination: Endpoint,
}

impl Wire {
    pub fn touches(&self, endpoint: Endpoint) -> bool {
        self.source == endpoint || self.destination == endpoint
    }
}
