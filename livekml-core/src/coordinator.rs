//! Cycle orchestration.
//!
//! The coordinator owns the renderer and the cycle counter and is the only
//! entry point the transport needs: one [`SyncCoordinator::run_cycle`] per
//! poll, one [`SyncCoordinator::run_initial`] for the one-time fetch of the
//! initial scene.

use std::num::NonZeroUsize;

use livekml_types::{CycleId, SyncError};
use serde::Serialize;

use crate::batch::{BatchBuilder, OpCounts, OperationBatch};
use crate::node::Node;
use crate::render::Renderer;

/// Default maximum number of operations per cycle.
pub const DEFAULT_OP_LIMIT: usize = 100;

/// Coordinator settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Maximum entries per cycle; `None` disables the cap.
    pub op_limit: Option<NonZeroUsize>,
    /// Run [`Node::validate`] before every cycle.
    pub validate_structure: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            op_limit: NonZeroUsize::new(DEFAULT_OP_LIMIT),
            validate_structure: false,
        }
    }
}

/// Running totals over all cycles of one coordinator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleStats {
    /// Cycles that produced at least one entry.
    pub cycles: u64,
    /// Cycles that found nothing to do.
    pub empty_cycles: u64,
    /// Create entries emitted.
    pub creates: u64,
    /// Change entries emitted.
    pub changes: u64,
    /// Delete entries emitted.
    pub deletes: u64,
}

impl CycleStats {
    fn record(&mut self, counts: OpCounts) {
        if counts.total() == 0 {
            self.empty_cycles += 1;
            return;
        }
        self.cycles += 1;
        self.creates += counts.creates as u64;
        self.changes += counts.changes as u64;
        self.deletes += counts.deletes as u64;
    }
}

/// Runs synchronization cycles against a root Container.
#[derive(Debug)]
pub struct SyncCoordinator<R> {
    renderer: R,
    config: CoordinatorConfig,
    last_cycle: CycleId,
    stats: CycleStats,
}

impl<R: Renderer> SyncCoordinator<R> {
    /// Create a coordinator.
    pub fn new(renderer: R, config: CoordinatorConfig) -> Self {
        Self {
            renderer,
            config,
            last_cycle: CycleId::zero(),
            stats: CycleStats::default(),
        }
    }

    /// Run one bounded cycle.
    ///
    /// Returns an empty batch (numbered with the last cycle id) when nothing
    /// is pending, so calling this with no intervening mutation is harmless.
    pub fn run_cycle(
        &mut self,
        root: &mut Node,
    ) -> Result<OperationBatch<R::Fragment>, SyncError> {
        self.check(root)?;
        self.run(root, BatchBuilder::new(self.config.op_limit))
    }

    /// Run the unbounded cycle that accompanies the initial scene fetch.
    ///
    /// The root is activated if it is not already and marked delivered
    /// (the caller ships it in full), then everything pending beneath it is
    /// drained regardless of the op limit.
    pub fn run_initial(
        &mut self,
        root: &mut Node,
    ) -> Result<OperationBatch<R::Fragment>, SyncError> {
        self.check(root)?;
        if !root.state().is_active() {
            root.activate(true, false);
        }
        root.synchronized();
        tracing::debug!(root = %root.id(), "root delivered with initial scene");
        self.run(root, BatchBuilder::unbounded())
    }

    fn check(&self, root: &Node) -> Result<(), SyncError> {
        if !root.is_container() {
            tracing::warn!(id = %root.id(), "cycle root is not a container");
            return Err(SyncError::NotAContainer { id: root.id() });
        }
        root.check_names().inspect_err(|e| {
            tracing::warn!(error = %e, "tree cannot be rendered");
        })?;
        if self.config.validate_structure {
            root.validate().inspect_err(|e| {
                tracing::warn!(error = %e, "tree failed validation");
            })?;
        }
        Ok(())
    }

    fn run(
        &mut self,
        root: &mut Node,
        builder: BatchBuilder,
    ) -> Result<OperationBatch<R::Fragment>, SyncError> {
        let entries = builder.build(root, &self.renderer);
        let cycle = if entries.is_empty() {
            self.last_cycle
        } else {
            self.last_cycle = self.last_cycle.next();
            self.last_cycle
        };
        let batch = OperationBatch::new(cycle, entries);
        let counts = batch.counts();
        self.stats.record(counts);

        if !batch.is_empty() {
            tracing::debug!(
                %cycle,
                creates = counts.creates,
                changes = counts.changes,
                deletes = counts.deletes,
                "cycle complete"
            );
        }
        Ok(batch)
    }

    /// The renderer used for every entry.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Current settings.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Change the cap for subsequent cycles.
    pub fn set_op_limit(&mut self, op_limit: Option<NonZeroUsize>) {
        self.config.op_limit = op_limit;
    }

    /// Totals since construction.
    pub fn stats(&self) -> CycleStats {
        self.stats
    }

    /// Id of the most recent non-empty cycle (zero before the first one).
    pub fn last_cycle(&self) -> CycleId {
        self.last_cycle
    }
}
