//! The served scene: one root Container, its coordinator and its outbox.
//!
//! Everything that touches the tree goes through [`SceneHandle::lock`], so
//! application mutations and viewer polls never interleave inside a cycle.

use std::num::NonZeroUsize;
use std::sync::Arc;

use livekml_core::{CycleStats, Node, OperationBatch, Outbox, SyncCoordinator};
use livekml_kml::{cycle_cookie, KmlConfig, KmlRenderer};
use livekml_types::{CycleId, NodeId, SyncError};
use tokio::sync::{Mutex, MutexGuard};

use crate::config::Config;
use crate::error::Result;

/// Where the batch of an update came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateSource {
    /// Produced by a new cycle.
    Fresh,
    /// An unacknowledged batch sent again.
    Redelivered,
    /// Nothing pending.
    Idle,
}

/// One response to a viewer poll.
#[derive(Debug, Clone)]
pub struct Update {
    /// The complete KML document.
    pub document: String,
    /// Cycle of the carried batch, or the last cycle for an empty update.
    pub cycle: CycleId,
    /// Number of operations carried.
    pub entries: usize,
    /// How the batch was obtained.
    pub source: UpdateSource,
}

/// A root Container with everything needed to serve it.
#[derive(Debug)]
pub struct Scene {
    root: Node,
    coordinator: SyncCoordinator<KmlRenderer>,
    outbox: Outbox<String>,
}

impl Scene {
    /// Build an empty scene from configuration.
    pub fn new(config: &Config) -> Self {
        let mut root = Node::container(config.scene.container_tag.as_str())
            .with_field("name", config.scene.name.as_str());
        if let Some(uuid) = config.scene.root_id {
            root = root.with_id(NodeId::from_uuid(uuid));
        }
        let renderer = KmlRenderer::new(
            KmlConfig::new(config.server.elements_href()).with_link_control(config.link.clone()),
        );
        Self {
            root,
            coordinator: SyncCoordinator::new(renderer, config.sync.coordinator_config()),
            outbox: Outbox::new(),
        }
    }

    /// The root Container.
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// The root Container, for mutation.
    pub fn root_mut(&mut self) -> &mut Node {
        &mut self.root
    }

    /// Find any node of the scene for mutation.
    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.root
            .find_mut(id)
            .ok_or_else(|| SyncError::NodeNotFound { id }.into())
    }

    /// Number of nodes in the scene, root included.
    pub fn node_count(&self) -> usize {
        self.root.subtree_size()
    }

    /// Batches waiting for delivery or acknowledgement.
    pub fn outbox_depth(&self) -> usize {
        self.outbox.total_count()
    }

    /// Most recent non-empty cycle.
    pub fn last_cycle(&self) -> CycleId {
        self.coordinator.last_cycle()
    }

    /// Cycle totals.
    pub fn stats(&self) -> CycleStats {
        self.coordinator.stats()
    }

    /// The current op limit.
    pub fn op_limit(&self) -> Option<NonZeroUsize> {
        self.coordinator.config().op_limit
    }

    /// Change the op limit for subsequent cycles.
    pub fn set_op_limit(&mut self, op_limit: Option<NonZeroUsize>) {
        tracing::info!(?op_limit, "op limit changed");
        self.coordinator.set_op_limit(op_limit);
    }

    /// Deactivate everything below the root. Published nodes are deleted
    /// over the following updates.
    pub fn clear(&mut self) {
        let ids: Vec<NodeId> = self.root.dependents().iter().map(Node::id).collect();
        for id in ids {
            if let Some(dependent) = self.root.dependent_mut(id) {
                dependent.activate(false, true);
            }
        }
        tracing::info!("scene cleared");
    }

    /// The full scene for a viewer that (re)loads it.
    ///
    /// Everything the document contains is recorded as delivered, and
    /// batches buffered for an earlier load are dropped.
    pub fn initial_elements(&mut self) -> Result<String> {
        self.outbox.clear();
        self.coordinator.run_initial(&mut self.root)?;
        Ok(self.coordinator.renderer().elements_document(&self.root)?)
    }

    /// Answer one viewer poll.
    ///
    /// `ack` is the cycle the viewer last applied, echoed from the cookie
    /// of the previous update. Later batches still in flight were lost and
    /// are sent again, oldest first, before any new cycle runs.
    ///
    /// A poll without a cookie acknowledges everything in flight: the viewer
    /// either applied the previous update or was never sent one.
    pub fn poll_update(&mut self, ack: Option<CycleId>) -> Result<Update> {
        match ack {
            Some(cycle) => {
                let released = self.outbox.ack_through(cycle);
                tracing::trace!(%cycle, released, "acknowledged");
                let requeued = self.outbox.nack_all();
                if requeued > 0 {
                    tracing::warn!(requeued, %cycle, "redelivering unacknowledged updates");
                }
            }
            None => {
                let released = self.outbox.ack_all();
                tracing::trace!(released, "acknowledged without cookie");
            }
        }

        let source = if self.outbox.is_empty() {
            let batch = self.coordinator.run_cycle(&mut self.root)?;
            if batch.is_empty() {
                return self.empty_update(UpdateSource::Idle);
            }
            self.outbox.enqueue(batch);
            UpdateSource::Fresh
        } else {
            UpdateSource::Redelivered
        };

        let Some(batch) = self.outbox.dequeue() else {
            return self.empty_update(UpdateSource::Idle);
        };
        let cookie = cycle_cookie(batch.cycle());
        let document = self
            .coordinator
            .renderer()
            .update_document(&batch, Some(cookie.as_str()))?;
        tracing::debug!(cycle = %batch.cycle(), entries = batch.len(), ?source, "update");

        Ok(Update {
            document,
            cycle: batch.cycle(),
            entries: batch.len(),
            source,
        })
    }

    fn empty_update(&self, source: UpdateSource) -> Result<Update> {
        let cycle = self.coordinator.last_cycle();
        let batch = OperationBatch::new(cycle, Vec::new());
        let cookie = cycle_cookie(cycle);
        Ok(Update {
            document: self
                .coordinator
                .renderer()
                .update_document(&batch, Some(cookie.as_str()))?,
            cycle,
            entries: 0,
            source,
        })
    }
}

/// Shared, lockable access to a [`Scene`].
#[derive(Debug, Clone)]
pub struct SceneHandle(Arc<Mutex<Scene>>);

impl SceneHandle {
    /// Wrap a scene.
    pub fn new(scene: Scene) -> Self {
        Self(Arc::new(Mutex::new(scene)))
    }

    /// Wait for exclusive access.
    pub async fn lock(&self) -> MutexGuard<'_, Scene> {
        self.0.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene_with_limit(op_limit: usize) -> Scene {
        let mut config = Config::default();
        config.sync.op_limit = op_limit;
        Scene::new(&config)
    }

    fn publish(scene: &mut Scene, name: &str) -> NodeId {
        let node = Node::leaf("Placemark").with_field("name", name);
        let id = node.id();
        scene.root_mut().add_dependent(node).unwrap();
        scene.node_mut(id).unwrap().activate(true, false);
        id
    }

    #[test]
    fn new_scene_uses_configured_root() {
        let mut config = Config::default();
        config.scene.container_tag = "Folder".to_string();
        config.scene.root_id = Some(uuid::Uuid::nil());
        let scene = Scene::new(&config);

        assert_eq!(scene.root().tag(), "Folder");
        assert_eq!(scene.root().field("name"), Some("Root"));
        assert_eq!(scene.root().id(), NodeId::from_uuid(uuid::Uuid::nil()));
        assert_eq!(scene.node_count(), 1);
    }

    #[test]
    fn initial_elements_delivers_everything() {
        let mut scene = scene_with_limit(1);
        publish(&mut scene, "A");
        publish(&mut scene, "B");

        let kml = scene.initial_elements().unwrap();
        assert!(kml.contains("<name>A</name>"));
        assert!(kml.contains("<name>B</name>"));

        let update = scene.poll_update(None).unwrap();
        assert_eq!(update.source, UpdateSource::Idle);
        assert_eq!(update.entries, 0);
        assert!(update.document.contains("<cookie>cycle=1</cookie>"));
    }

    #[test]
    fn polls_drain_in_capped_updates() {
        let mut scene = scene_with_limit(2);
        scene.initial_elements().unwrap();
        for name in ["A", "B", "C"] {
            publish(&mut scene, name);
        }

        let first = scene.poll_update(None).unwrap();
        assert_eq!(first.source, UpdateSource::Fresh);
        assert_eq!(first.entries, 2);

        let second = scene.poll_update(Some(first.cycle)).unwrap();
        assert_eq!(second.source, UpdateSource::Fresh);
        assert_eq!(second.entries, 1);
        assert!(second.document.contains("<name>C</name>"));

        let third = scene.poll_update(Some(second.cycle)).unwrap();
        assert_eq!(third.source, UpdateSource::Idle);
        assert_eq!(scene.outbox_depth(), 0);
    }

    #[test]
    fn unacknowledged_update_is_redelivered_verbatim() {
        let mut scene = scene_with_limit(10);
        scene.initial_elements().unwrap();
        publish(&mut scene, "A");

        let sent = scene.poll_update(None).unwrap();
        // the viewer never applied it and still reports the older cycle
        let resent = scene.poll_update(Some(CycleId::zero())).unwrap();

        assert_eq!(resent.source, UpdateSource::Redelivered);
        assert_eq!(resent.cycle, sent.cycle);
        assert_eq!(resent.document, sent.document);

        let after = scene.poll_update(Some(resent.cycle)).unwrap();
        assert_eq!(after.source, UpdateSource::Idle);
    }

    #[test]
    fn changes_made_during_redelivery_follow_later() {
        let mut scene = scene_with_limit(10);
        scene.initial_elements().unwrap();
        let a = publish(&mut scene, "A");
        let sent = scene.poll_update(None).unwrap();

        scene.node_mut(a).unwrap().set_field("name", "A2");
        let resent = scene.poll_update(Some(CycleId::zero())).unwrap();
        assert_eq!(resent.source, UpdateSource::Redelivered);
        assert_eq!(resent.cycle, sent.cycle);

        let next = scene.poll_update(Some(resent.cycle)).unwrap();
        assert_eq!(next.source, UpdateSource::Fresh);
        assert!(next.document.contains("<Change>"));
        assert!(next.document.contains("<name>A2</name>"));
    }

    #[test]
    fn polls_without_cookie_keep_producing_new_cycles() {
        let mut scene = scene_with_limit(10);
        scene.initial_elements().unwrap();

        let mut seen = Vec::new();
        for name in ["A", "B", "C"] {
            publish(&mut scene, name);
            let update = scene.poll_update(None).unwrap();
            assert_eq!(update.source, UpdateSource::Fresh);
            assert_eq!(update.entries, 1);
            assert!(update.document.contains(&format!("<name>{name}</name>")));
            seen.push(update.cycle);
        }

        seen.dedup();
        assert_eq!(seen.len(), 3);
        assert_eq!(scene.outbox_depth(), 1);
    }

    #[test]
    fn stale_cookie_redelivers_after_cookieless_poll() {
        let mut scene = scene_with_limit(10);
        scene.initial_elements().unwrap();
        let initial = scene.last_cycle();
        publish(&mut scene, "A");
        let first = scene.poll_update(None).unwrap();
        publish(&mut scene, "B");
        let second = scene.poll_update(None).unwrap();
        assert_ne!(first.cycle, second.cycle);

        // the first update was released by the cookieless poll; only the
        // second is still in flight
        let resent = scene.poll_update(Some(initial)).unwrap();
        assert_eq!(resent.source, UpdateSource::Redelivered);
        assert_eq!(resent.cycle, second.cycle);
        assert_eq!(resent.document, second.document);
    }

    #[test]
    fn link_control_from_config_reaches_updates() {
        let mut config = Config::default();
        config.link.min_refresh_period_secs = Some(2.0);
        config.link.message = Some("hello".to_string());
        let mut scene = Scene::new(&config);
        scene.initial_elements().unwrap();

        let update = scene.poll_update(None).unwrap();
        assert!(update
            .document
            .contains("<minRefreshPeriod>2</minRefreshPeriod>"));
        assert!(update.document.contains("<message>hello</message>"));
    }

    #[test]
    fn clear_deletes_published_nodes() {
        let mut scene = scene_with_limit(10);
        publish(&mut scene, "A");
        scene.initial_elements().unwrap();

        scene.clear();
        let update = scene.poll_update(None).unwrap();
        assert!(update.document.contains("<Delete>"));
        assert!(scene.root().dependents().is_empty());
    }

    #[test]
    fn node_lookup_reports_missing_ids() {
        let mut scene = scene_with_limit(10);
        let missing = NodeId::new();
        let err = scene.node_mut(missing).unwrap_err();
        assert!(matches!(
            err,
            crate::error::ServerError::Sync(SyncError::NodeNotFound { id }) if id == missing
        ));
    }

    #[test]
    fn op_limit_is_adjustable() {
        let mut scene = scene_with_limit(10);
        scene.set_op_limit(NonZeroUsize::new(3));
        assert_eq!(scene.op_limit(), NonZeroUsize::new(3));
    }

    #[tokio::test]
    async fn handle_serializes_access() {
        let handle = SceneHandle::new(scene_with_limit(10));
        let other = handle.clone();
        {
            let mut scene = handle.lock().await;
            publish(&mut scene, "A");
        }
        assert_eq!(other.lock().await.node_count(), 2);
    }
}
