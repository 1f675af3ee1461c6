//! Wiring legality.
//!
//! [`can_connect`] decides whether a wire may be created; [`can_delete`]
//! decides whether an entity may be removed given the current locks. Neither
//! mutates anything.

use crate::error::{DiagramError, Result};
use crate::locks::LockRegistry;
use crate::model::{Direction, Endpoint, Entity, LockTarget};
use crate::store::EntityStore;

/// Check a candidate wire `source -> destination`.
///
/// Rules are applied in a fixed order and the first violation is returned:
/// direction, occupied destination, self loop, duplicate wire.
pub fn can_connect(store: &EntityStore, source: Endpoint, destination: Endpoint) -> Result<()> {
    let source_role = store.wiring_role(source)?;
    let destination_role = store.wiring_role(destination)?;

    if source_role != Direction::Output || destination_role != Direction::Input {
        return Err(DiagramError::Direction {
            source_desc: store.describe(source),
            source_role,
            destination_desc: store.describe(destination),
            destination_role,
        });
    }

    if store.incoming_wire_count(destination)? > 0 {
        return Err(DiagramError::DestinationOccupied(store.describe(destination)));
    }

    if let (Some(a), Some(b)) = (
        store.endpoint_owner(source)?,
        store.endpoint_owner(destination)?,
    ) {
        if a == b {
            return Err(DiagramError::SelfLoop(store.block(a)?.name.clone()));
        }
    }

    // Never reached from create_wire: an existing pair already fails the
    // occupied check above.
    if store.find_wire(source, destination).is_some() {
        return Err(DiagramError::DuplicateWire {
            source_desc: store.describe(source),
            destination_desc: store.describe(destination),
        });
    }

    Ok(())
}

/// Check that `entity` exists and that removing it would not drop a locked
/// block or a locked wire (directly or by cascade).
pub fn can_delete(store: &EntityStore, locks: &LockRegistry, entity: Entity) -> Result<()> {
    let cascaded = match entity {
        Entity::Wire(id) => {
            store.wire(id)?;
            vec![id]
        }
        Entity::Block(id) => {
            if locks.is_locked(id) {
                return Err(DiagramError::Locked(LockTarget::Block(id)));
            }
            store.wires_touching_block(id)?
        }
        Entity::Pin(id) => store.wires_touching(Endpoint::Block(id))?,
        Entity::DiagramPin(id) => store.wires_touching(Endpoint::Diagram(id))?,
    };
    match cascaded.into_iter().find(|w| locks.is_locked(*w)) {
        Some(wire) => Err(DiagramError::Locked(LockTarget::Wire(wire))),
        None => Ok(()),
    }
}
