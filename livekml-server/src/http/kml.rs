//! The documents a KML viewer fetches.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::Query;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::Extension;
use livekml_kml::{LoaderDocument, KML_CONTENT_TYPE};
use livekml_types::CycleId;
use serde::Deserialize;

use crate::error::Result;
use crate::scene::UpdateSource;
use crate::server::LiveKmlServer;

/// Query string of an update poll: the cookie of the previous update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateQuery {
    /// Last cycle the viewer applied.
    pub cycle: Option<u64>,
}

fn kml_response(body: String) -> Response {
    ([(CONTENT_TYPE, KML_CONTENT_TYPE)], body).into_response()
}

fn count_error<T>(server: &LiveKmlServer, result: Result<T>) -> Result<T> {
    if result.is_err() {
        server.metrics().errors_total.fetch_add(1, Ordering::Relaxed);
    }
    result
}

/// `GET /loader.kml`
pub async fn loader_handler(
    Extension(server): Extension<Arc<LiveKmlServer>>,
) -> Result<Response> {
    let config = server.config();
    let loader = LoaderDocument {
        name: config.scene.name.clone(),
        elements_href: config.server.elements_href(),
        update_href: config.server.update_href(),
        refresh_interval_secs: config.http.refresh_interval_secs,
    };
    let document = count_error(&server, loader.render().map_err(Into::into))?;
    Ok(kml_response(document))
}

/// `GET /elements.kml`
pub async fn elements_handler(
    Extension(server): Extension<Arc<LiveKmlServer>>,
) -> Result<Response> {
    let document = {
        let mut scene = server.scene().lock().await;
        count_error(&server, scene.initial_elements())?
    };
    server.metrics().elements_served.fetch_add(1, Ordering::Relaxed);
    tracing::info!("viewer loaded the scene");
    Ok(kml_response(document))
}

/// `GET /update.kml?cycle=N`
pub async fn update_handler(
    Extension(server): Extension<Arc<LiveKmlServer>>,
    Query(query): Query<UpdateQuery>,
) -> Result<Response> {
    let update = {
        let mut scene = server.scene().lock().await;
        count_error(&server, scene.poll_update(query.cycle.map(CycleId::new)))?
    };

    let m = server.metrics();
    m.polls_total.fetch_add(1, Ordering::Relaxed);
    match update.source {
        UpdateSource::Fresh => {
            m.updates_sent.fetch_add(1, Ordering::Relaxed);
        }
        UpdateSource::Redelivered => {
            m.updates_sent.fetch_add(1, Ordering::Relaxed);
            m.redeliveries_total.fetch_add(1, Ordering::Relaxed);
        }
        UpdateSource::Idle => {}
    }

    Ok(kml_response(update.document))
}
