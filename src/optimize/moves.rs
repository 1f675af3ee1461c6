//! Candidate moves and their inverses.
//!
//! A [`Move`] names *what* may be perturbed; applying it draws the concrete
//! perturbation from the RNG and yields an [`AppliedMove`] carrying exactly
//! the state needed to put things back.

use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::Result;
use crate::geometry::{Rect, align_diagram_pins, obstacles, overlaps_any};
use crate::locks::LockRegistry;
use crate::model::{BlockId, DiagramPinId, Direction, Endpoint, PinId, Point};
use crate::store::EntityStore;

use super::Context;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Move {
    /// Shift an unlocked block by a random offset.
    MoveBlock(BlockId),
    /// Shuffle the free pins on one side of an unlocked block.
    ReorderBlockPins(BlockId, Direction),
    /// Shuffle the free diagram pins of one direction.
    ReorderDiagramPins(Direction),
}

#[derive(Debug, Clone)]
pub(crate) enum AppliedMove {
    MoveBlock {
        block: BlockId,
        old_position: Point,
        old_diagram_pins: Vec<(DiagramPinId, Point)>,
    },
    ReorderBlockPins {
        block: BlockId,
        direction: Direction,
        old_order: Vec<PinId>,
    },
    ReorderDiagramPins {
        direction: Direction,
        old_order: Vec<DiagramPinId>,
        old_diagram_pins: Vec<(DiagramPinId, Point)>,
    },
}

fn pin_is_pinned(store: &EntityStore, locks: &LockRegistry, endpoint: Endpoint) -> bool {
    store
        .wires_touching(endpoint)
        .map(|wires| wires.iter().any(|w| locks.is_wire_locked(*w)))
        .unwrap_or(false)
}

/// Shuffle `order` in place, leaving every element for which `fixed` holds in
/// its slot. Returns false if fewer than two elements are free to move.
fn shuffle_free<T: Copy>(order: &mut [T], fixed: impl Fn(T) -> bool, rng: &mut StdRng) -> bool {
    let slots: Vec<usize> = (0..order.len()).filter(|i| !fixed(order[*i])).collect();
    if slots.len() < 2 {
        return false;
    }
    let mut free: Vec<T> = slots.iter().map(|i| order[*i]).collect();
    free.shuffle(rng);
    for (slot, item) in slots.into_iter().zip(free) {
        order[slot] = item;
    }
    true
}

fn free_count<T: Copy>(order: &[T], fixed: impl Fn(T) -> bool) -> usize {
    order.iter().filter(|item| !fixed(**item)).count()
}

/// Every move the optimizer may propose for the current graph.
///
/// Locked blocks contribute nothing. Pin reorders are only offered where at
/// least two pins are free of locked wires.
pub(crate) fn candidate_moves(store: &EntityStore, locks: &LockRegistry, ctx: &Context) -> Vec<Move> {
    let mut moves = Vec::new();
    for block in store.blocks().filter(|b| !locks.is_block_locked(b.id)) {
        moves.push(Move::MoveBlock(block.id));
        for direction in [Direction::Input, Direction::Output] {
            let fixed = |p: PinId| pin_is_pinned(store, locks, Endpoint::Block(p));
            if free_count(block.pins(direction), fixed) >= 2 {
                moves.push(Move::ReorderBlockPins(block.id, direction));
            }
        }
    }
    if ctx.geometry.auto_align_diagram_pins {
        for direction in [Direction::Input, Direction::Output] {
            let fixed = |p: DiagramPinId| pin_is_pinned(store, locks, Endpoint::Diagram(p));
            if free_count(&store.diagram_pins_of(direction), fixed) >= 2 {
                moves.push(Move::ReorderDiagramPins(direction));
            }
        }
    }
    moves
}

fn diagram_pin_positions(store: &EntityStore) -> Vec<(DiagramPinId, Point)> {
    store.diagram_pins().map(|p| (p.id, p.position)).collect()
}

impl Move {
    /// Draw a concrete perturbation and apply it to `store`.
    ///
    /// Returns `None` when the draw is a no-op or would overlap another item;
    /// `store` is untouched in that case.
    pub(crate) fn apply(
        &self,
        store: &mut EntityStore,
        locks: &LockRegistry,
        ctx: &Context,
        rng: &mut StdRng,
    ) -> Result<Option<AppliedMove>> {
        match *self {
            Move::MoveBlock(block) => {
                let (old_position, size) = {
                    let b = store.block(block)?;
                    (b.position, b.size)
                };
                let step = ctx.move_step();
                let proposed = ctx.grid.snap(Point::new(
                    old_position.x + rng.random_range(-step..=step),
                    old_position.y + rng.random_range(-step..=step),
                ));
                if proposed == old_position {
                    return Ok(None);
                }
                let others = obstacles(store, ctx.geometry, Some(block));
                if overlaps_any(&Rect::from_origin_size(proposed, size), &others) {
                    return Ok(None);
                }
                let old_diagram_pins = diagram_pin_positions(store);
                store.set_block_position(block, proposed)?;
                if ctx.geometry.auto_align_diagram_pins {
                    align_diagram_pins(store, ctx.geometry, &ctx.grid)?;
                }
                Ok(Some(AppliedMove::MoveBlock {
                    block,
                    old_position,
                    old_diagram_pins,
                }))
            }
            Move::ReorderBlockPins(block, direction) => {
                let old_order = store.block(block)?.pins(direction).to_vec();
                let mut order = old_order.clone();
                let fixed = |p: PinId| pin_is_pinned(store, locks, Endpoint::Block(p));
                if !shuffle_free(&mut order, fixed, rng) || order == old_order {
                    return Ok(None);
                }
                store.set_pin_order(block, direction, order)?;
                Ok(Some(AppliedMove::ReorderBlockPins {
                    block,
                    direction,
                    old_order,
                }))
            }
            Move::ReorderDiagramPins(direction) => {
                let old_order = store.diagram_pins_of(direction);
                let mut order = old_order.clone();
                let fixed = |p: DiagramPinId| pin_is_pinned(store, locks, Endpoint::Diagram(p));
                if !shuffle_free(&mut order, fixed, rng) || order == old_order {
                    return Ok(None);
                }
                let old_diagram_pins = diagram_pin_positions(store);
                store.set_diagram_pin_order(direction, &order)?;
                align_diagram_pins(store, ctx.geometry, &ctx.grid)?;
                Ok(Some(AppliedMove::ReorderDiagramPins {
                    direction,
                    old_order,
                    old_diagram_pins,
                }))
            }
        }
    }
}

impl AppliedMove {
    /// Undo the move exactly.
    pub(crate) fn revert(self, store: &mut EntityStore) -> Result<()> {
        match self {
            AppliedMove::MoveBlock {
                block,
                old_position,
                old_diagram_pins,
            } => {
                store.set_block_position(block, old_position)?;
                restore_diagram_pins(store, old_diagram_pins)
            }
            AppliedMove::ReorderBlockPins {
                block,
                direction,
                old_order,
            } => store.set_pin_order(block, direction, old_order),
            AppliedMove::ReorderDiagramPins {
                direction,
                old_order,
                old_diagram_pins,
            } => {
                store.set_diagram_pin_order(direction, &old_order)?;
                restore_diagram_pins(store, old_diagram_pins)
            }
        }
    }
}

fn restore_diagram_pins(store: &mut EntityStore, positions: Vec<(DiagramPinId, Point)>) -> Result<()> {
    for (id, position) in positions {
        store.set_diagram_pin_position(id, position)?;
    }
    Ok(())
}
