// Supermarket Dashboard - REST API
// Routes are built here so tests can drive them without a socket

use crate::dashboard::{Dashboard, FacetOptions, ViewModel};
use crate::filter::FilterSelection;
use axum::{
    extract::{RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub dashboard: Arc<Dashboard>,
}

/// API Response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

/// Dashboard response: the selection that was applied and the five views
/// in positional order.
#[derive(Serialize)]
pub struct DashboardResponse {
    pub selection: FilterSelection,
    pub records_total: usize,
    pub views: [ViewModel; 5],
}

/// Build a selection from a raw query string.
/// Repeated keys are multi-select values: `gender=Male&gender=Female&city=Yangon`.
/// `selected_genders` / `selected_cities` are accepted as aliases.
pub fn parse_selection(query: Option<&str>) -> FilterSelection {
    let mut selection = FilterSelection::all();

    let Some(query) = query else {
        return selection;
    };

    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let value = decode_component(value);
        if value.is_empty() {
            continue;
        }

        match decode_component(key).as_str() {
            "gender" | "selected_genders" => {
                selection.genders.insert(value);
            }
            "city" | "selected_cities" => {
                selection.cities.insert(value);
            }
            _ => {}
        }
    }

    selection
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/facets - Selectable genders and cities
async fn get_facets(State(state): State<AppState>) -> impl IntoResponse {
    let options: FacetOptions = state.dashboard.facet_options();
    (StatusCode::OK, Json(ApiResponse::ok(options)))
}

/// GET /api/dashboard?gender=..&city=.. - The five views for a selection
async fn get_dashboard(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> impl IntoResponse {
    let selection = parse_selection(query.as_deref());
    let views = state.dashboard.update(&selection);

    tracing::debug!(
        genders = selection.genders.len(),
        cities = selection.cities.len(),
        "Served dashboard"
    );

    let response = DashboardResponse {
        records_total: state.dashboard.store().len(),
        selection,
        views: views.into_array(),
    };

    (StatusCode::OK, Json(ApiResponse::ok(response)))
}

pub fn router(dashboard: Arc<Dashboard>) -> Router {
    let state = AppState { dashboard };

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/facets", get(get_facets))
        .route("/dashboard", get(get_dashboard))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::three_sales;
    use crate::dataset::DatasetStore;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> Router {
        let store = Arc::new(DatasetStore::new(three_sales()));
        router(Arc::new(Dashboard::new(store)))
    }

    async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_parse_selection_multi_values() {
        let selection = parse_selection(Some("gender=Male&gender=Female&city=Yangon&foo=bar"));

        assert_eq!(selection, FilterSelection::new(["Female", "Male"], ["Yangon"]));
    }

    #[test]
    fn test_parse_selection_decodes_and_skips_blanks() {
        let selection = parse_selection(Some(
            "city=New%20York&city=Ho+Chi+Minh&gender=&&selected_genders=Male",
        ));

        assert_eq!(
            selection,
            FilterSelection::new(["Male"], ["New York", "Ho Chi Minh"])
        );
        assert!(parse_selection(None).is_unfiltered());
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json("/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "OK");
    }

    #[tokio::test]
    async fn test_facets() {
        let (_, body) = get_json("/api/facets").await;
        assert_eq!(body["data"]["genders"], serde_json::json!(["Male", "Female"]));
        assert_eq!(body["data"]["cities"], serde_json::json!(["Yangon", "Mandalay"]));
        assert_eq!(body["data"]["first_date"], "2019-01-07");
        assert_eq!(body["data"]["last_date"], "2019-01-15");
    }

    #[tokio::test]
    async fn test_dashboard_filtered() {
        let (status, body) = get_json("/api/dashboard?gender=Male").await;

        assert_eq!(status, StatusCode::OK);
        let views = body["data"]["views"].as_array().unwrap();
        assert_eq!(views.len(), 5);
        assert_eq!(views[0]["value"], 15.0);
        assert_eq!(views[1]["value"], 7.0);
        assert_eq!(views[3]["rows"].as_array().unwrap().len(), 2);
        assert_eq!(body["data"]["records_total"], 3);
    }

    #[tokio::test]
    async fn test_dashboard_unknown_city_is_empty_not_error() {
        let (status, body) = get_json("/api/dashboard?city=Atlantis").await;

        assert_eq!(status, StatusCode::OK);
        let views = body["data"]["views"].as_array().unwrap();
        assert_eq!(views[0]["value"], 0.0);
        assert!(views[1]["value"].is_null());
        assert_eq!(views[2]["points"], serde_json::json!([]));
    }
}
