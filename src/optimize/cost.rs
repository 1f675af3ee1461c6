//! Layout cost: weighted crossings plus total wire length.

use serde::Serialize;

use crate::config::{CostWeights, GeometryConfig};
use crate::error::Result;
use crate::geometry::{block_rect, endpoint_anchor, segment_intersects_rect, segments_cross};
use crate::grid::GridSnapper;
use crate::model::{BlockId, Endpoint, Point};
use crate::store::EntityStore;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CostBreakdown {
    /// Wire/wire crossings plus wires running through foreign blocks.
    pub crossings: usize,
    /// Sum of Euclidean wire lengths.
    pub wire_length: f64,
    pub total: f64,
}

struct Segment {
    source: Endpoint,
    destination: Endpoint,
    from: Point,
    to: Point,
    owners: [Option<BlockId>; 2],
}

impl Segment {
    fn shares_pin(&self, other: &Segment) -> bool {
        self.source == other.source
            || self.source == other.destination
            || self.destination == other.source
            || self.destination == other.destination
    }
}

pub fn evaluate(
    store: &EntityStore,
    geometry: &GeometryConfig,
    grid: &GridSnapper,
    weights: &CostWeights,
) -> Result<CostBreakdown> {
    let mut segments = Vec::with_capacity(store.wire_count());
    for wire in store.wires() {
        segments.push(Segment {
            source: wire.source,
            destination: wire.destination,
            from: endpoint_anchor(store, wire.source, geometry, grid)?,
            to: endpoint_anchor(store, wire.destination, geometry, grid)?,
            owners: [
                store.endpoint_owner(wire.source)?,
                store.endpoint_owner(wire.destination)?,
            ],
        });
    }

    let mut crossings = 0;
    for (i, a) in segments.iter().enumerate() {
        for b in &segments[i + 1..] {
            if !a.shares_pin(b) && segments_cross(a.from, a.to, b.from, b.to) {
                crossings += 1;
            }
        }
    }
    for block in store.blocks() {
        let rect = block_rect(block);
        crossings += segments
            .iter()
            .filter(|s| !s.owners.contains(&Some(block.id)))
            .filter(|s| segment_intersects_rect(s.from, s.to, &rect))
            .count();
    }

    let wire_length: f64 = segments.iter().map(|s| s.from.distance(s.to)).sum();
    Ok(CostBreakdown {
        crossings,
        wire_length,
        total: weights.intersection_weight * crossings as f64
            + weights.wirelength_weight * wire_length,
    })
}
