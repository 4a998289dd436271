//! A moving demonstration scene.
//!
//! Markers circle a center point, each Placemark carrying its position in
//! an embedded Point. Useful for watching updates arrive in a viewer.

use std::f64::consts::TAU;
use std::time::Duration;

use livekml_core::Node;
use livekml_types::NodeId;

use crate::error::Result;
use crate::scene::SceneHandle;

/// Demo scene settings.
#[derive(Debug, Clone, PartialEq)]
pub struct DemoConfig {
    /// Number of markers.
    pub markers: usize,
    /// Time between position updates.
    pub period: Duration,
    /// Center of the circle, as (longitude, latitude).
    pub center: (f64, f64),
    /// Circle radius in degrees.
    pub radius_deg: f64,
    /// Steps for one full revolution.
    pub steps_per_turn: u32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            markers: 8,
            period: Duration::from_secs(1),
            center: (-0.1276, 51.5072),
            radius_deg: 0.05,
            steps_per_turn: 60,
        }
    }
}

/// Ids of one demo marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    /// The Placemark, a dependent of the demo Folder.
    pub placemark: NodeId,
    /// The Point embedded in the Placemark.
    pub point: NodeId,
}

impl DemoConfig {
    fn coordinates(&self, index: usize, step: u64) -> String {
        let markers = self.markers.max(1) as f64;
        let turn = (step % u64::from(self.steps_per_turn.max(1))) as f64
            / f64::from(self.steps_per_turn.max(1));
        let angle = TAU * (turn + index as f64 / markers);
        let (lon, lat) = self.center;
        format!(
            "{:.6},{:.6},0",
            lon + self.radius_deg * angle.cos(),
            lat + self.radius_deg * angle.sin()
        )
    }
}

/// Add the demo Folder to the scene and publish it.
pub async fn install(handle: &SceneHandle, config: &DemoConfig) -> Result<Vec<Marker>> {
    let mut folder = Node::container("Folder")
        .with_field("name", "Demo")
        .with_field("open", "1");
    let folder_id = folder.id();
    let mut markers = Vec::with_capacity(config.markers);

    for index in 0..config.markers {
        let point = Node::leaf("Point").with_field("coordinates", config.coordinates(index, 0));
        let point_id = point.id();
        let placemark = Node::leaf("Placemark")
            .with_field("name", format!("Marker {index}"))
            .with_child(point);
        let marker = Marker {
            placemark: placemark.id(),
            point: point_id,
        };
        folder.add_dependent(placemark)?;
        markers.push(marker);
    }

    let mut scene = handle.lock().await;
    scene.root_mut().add_dependent(folder)?;
    scene.node_mut(folder_id)?.activate(true, true);
    tracing::info!(markers = markers.len(), "demo scene installed");
    Ok(markers)
}

/// Move every marker to its position for `step`.
pub async fn advance(
    handle: &SceneHandle,
    config: &DemoConfig,
    markers: &[Marker],
    step: u64,
) -> Result<()> {
    let mut scene = handle.lock().await;
    for (index, marker) in markers.iter().enumerate() {
        if scene
            .node_mut(marker.point)?
            .set_field("coordinates", config.coordinates(index, step))
        {
            // the Point travels inside its Placemark
            scene.node_mut(marker.placemark)?.field_changed();
        }
    }
    Ok(())
}

/// Run the demo until the scene loses one of its markers.
pub fn spawn(
    handle: SceneHandle,
    config: DemoConfig,
    markers: Vec<Marker>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(config.period);
        let mut step: u64 = 0;
        loop {
            interval.tick().await;
            step = step.wrapping_add(1);
            if let Err(e) = advance(&handle, &config, &markers, step).await {
                tracing::warn!(error = %e, "demo stopped");
                break;
            }
        }
    })
}
