//! Lock-aware placement optimization.
//!
//! The optimizer works on a private copy of the [`EntityStore`]. Each
//! iteration draws one candidate [`Move`](moves::Move), applies it, scores the
//! result with [`cost::evaluate`] and lets the configured acceptance rule
//! decide whether to keep it or revert it. The best layout seen, including
//! the starting one, is written back at the end, so a run never makes the
//! cost worse.
//!
//! Guarantees:
//! - locked blocks never move, and pins on locked wires keep their slots;
//! - wires and their endpoints are never touched;
//! - the same input, settings and seed give the same output.

pub mod cost;
pub(crate) mod moves;
pub(crate) mod strategy;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use log::{debug, info, trace};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use serde::Serialize;

use crate::config::{GeometryConfig, OptimizerSettings};
use crate::error::Result;
use crate::grid::GridSnapper;
use crate::locks::LockRegistry;
use crate::model::{BlockId, Point};
use crate::store::EntityStore;

pub use cost::CostBreakdown;

/// Shared flag a caller can flip to stop a running optimization early.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// No unlocked block, or nothing that could be perturbed.
    NothingToOptimize,
    IterationBudget,
    TimeLimit,
    /// Too many proposals in a row without a new best layout.
    Converged,
    Cancelled,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StopReason::NothingToOptimize => "nothing to optimize",
            StopReason::IterationBudget => "iteration budget exhausted",
            StopReason::TimeLimit => "time limit reached",
            StopReason::Converged => "converged",
            StopReason::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationReport {
    /// Blocks whose position differs from before the run.
    pub moved_count: usize,
    pub cost_before: f64,
    pub cost_after: f64,
    pub iterations: usize,
    pub accepted_moves: usize,
    pub stop_reason: StopReason,
}

/// Everything a move needs besides the store itself.
pub(crate) struct Context<'a> {
    pub(crate) geometry: &'a GeometryConfig,
    pub(crate) grid: GridSnapper,
    pub(crate) settings: &'a OptimizerSettings,
}

impl Context<'_> {
    /// Largest displacement of a block move, in scene units.
    pub(crate) fn move_step(&self) -> f64 {
        f64::from(self.settings.move_step_cells) * self.grid.pitch()
    }

    fn cost(&self, store: &EntityStore) -> Result<f64> {
        Ok(cost::evaluate(store, self.geometry, &self.grid, &self.settings.weights)?.total)
    }
}

fn positions(store: &EntityStore) -> Vec<(BlockId, Point)> {
    store.blocks().map(|b| (b.id, b.position)).collect()
}

/// Reposition unlocked blocks (and reorder free pins) to lower the layout cost.
///
/// `store` is only written once, at the end, with the best layout found. On
/// cancellation that is the best layout seen so far.
pub fn optimize(
    store: &mut EntityStore,
    locks: &LockRegistry,
    geometry: &GeometryConfig,
    grid: GridSnapper,
    settings: &OptimizerSettings,
    cancel: &CancelToken,
) -> Result<OptimizationReport> {
    settings.validate()?;
    let ctx = Context {
        geometry,
        grid,
        settings,
    };

    let cost_before = ctx.cost(store)?;
    let candidates = moves::candidate_moves(store, locks, &ctx);
    if candidates.is_empty() {
        info!(cost = cost_before; "Nothing to optimize: no unlocked blocks");
        return Ok(OptimizationReport {
            moved_count: 0,
            cost_before,
            cost_after: cost_before,
            iterations: 0,
            accepted_moves: 0,
            stop_reason: StopReason::NothingToOptimize,
        });
    }

    info!(
        blocks = store.block_count(),
        wires = store.wire_count(),
        candidate_moves = candidates.len(),
        strategy:? = settings.strategy,
        seed = settings.seed,
        cost = cost_before;
        "Starting placement optimization"
    );

    let started = Instant::now();
    let mut rng = StdRng::seed_from_u64(settings.seed);
    let mut acceptance = strategy::acceptance_for(&settings.strategy);
    let stall_limit = settings.stall_sweeps.saturating_mul(candidates.len());

    let mut working = store.clone();
    let mut current_cost = cost_before;
    let mut best_cost = cost_before;
    let mut best: Option<EntityStore> = None;
    let mut iterations = 0;
    let mut accepted_moves = 0;
    let mut stall = 0;

    let stop_reason = loop {
        if cancel.is_cancelled() {
            break StopReason::Cancelled;
        }
        if iterations >= settings.budget.max_iterations {
            break StopReason::IterationBudget;
        }
        if settings
            .budget
            .time_limit
            .is_some_and(|limit| started.elapsed() >= limit)
        {
            break StopReason::TimeLimit;
        }
        if stall_limit > 0 && stall >= stall_limit {
            break StopReason::Converged;
        }

        iterations += 1;
        stall += 1;
        let Some(candidate) = candidates.choose(&mut rng) else {
            break StopReason::NothingToOptimize;
        };
        if let Some(applied) = candidate.apply(&mut working, locks, &ctx, &mut rng)? {
            let new_cost = ctx.cost(&working)?;
            if acceptance.accept(current_cost, new_cost, &mut rng) {
                current_cost = new_cost;
                accepted_moves += 1;
                if new_cost < best_cost - 1e-9 {
                    best_cost = new_cost;
                    best = Some(working.clone());
                    stall = 0;
                }
            } else {
                applied.revert(&mut working)?;
            }
        }
        acceptance.step();

        if settings.reporting_interval > 0 && iterations % settings.reporting_interval == 0 {
            trace!(
                iteration = iterations,
                current = current_cost,
                best = best_cost;
                "Optimizer progress"
            );
        }
    };

    let before = positions(store);
    if let Some(best) = best {
        *store = best;
    }
    let moved_count = before
        .iter()
        .filter(|(id, old)| store.block(*id).map(|b| b.position != *old).unwrap_or(false))
        .count();

    debug!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        accepted = accepted_moves;
        "Optimizer loop finished"
    );
    info!(
        reason:% = stop_reason,
        iterations = iterations,
        moved = moved_count,
        cost_before = cost_before,
        cost_after = best_cost;
        "Placement optimization finished"
    );

    Ok(OptimizationReport {
        moved_count,
        cost_before,
        cost_after: best_cost,
        iterations,
        accepted_moves,
        stop_reason,
    })
}
