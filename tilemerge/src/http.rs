//! HTTP surface: `GET /tiles/:z/:x/:y` and `GET /healthz`.
//!
//! Status mapping:
//!
//! | Outcome                              | Status |
//! |--------------------------------------|--------|
//! | Patched tile                         | 200    |
//! | No stored tile / outside zoom grid   | 404    |
//! | Zoom above `MAX_ZOOM`, bad path      | 400    |
//! | Storage, decode, encode, lookup error| 500    |

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::coord::{CoordError, TileCoordinate};
use crate::service::TileService;

/// Build the application router around a shared tile service.
pub fn router(service: Arc<TileService>) -> Router {
    Router::new()
        .route("/tiles/:z/:x/:y", get(get_tile))
        .route("/healthz", get(healthz))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn get_tile(
    State(service): State<Arc<TileService>>,
    Path((z, x, y)): Path<(u8, u64, u64)>,
) -> Response {
    let coord = match TileCoordinate::new(z, x, y) {
        Ok(coord) => coord,
        Err(e @ CoordError::InvalidZoom(_)) => {
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
        Err(CoordError::OutOfGrid { .. }) => return StatusCode::NOT_FOUND.into_response(),
    };

    match service.get_tile(coord).await {
        Ok(Some(tile)) => {
            let content_type = HeaderValue::from_static(tile.content_type());
            let content_encoding = HeaderValue::from_static(tile.content_encoding());
            (
                [
                    (header::CONTENT_TYPE, content_type),
                    (header::CONTENT_ENCODING, content_encoding),
                ],
                tile.data,
            )
                .into_response()
        }
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            error!(tile = %e.coord(), stage = %e.stage(), error = %e, "Tile request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
