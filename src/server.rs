// Web server - serves the dashboard page and its JSON API
//
// Every API call re-runs filter → aggregate → render against the shared,
// read-only dataset. No state survives between requests.

use crate::chart::{ChartKind, Figure};
use crate::config::Config;
use crate::dashboard::{self, DashboardOptions, SummaryCards, Tab, TabContent, UnitProfile};
use crate::dataset::{CrimeRecord, Dataset};
use crate::error::{Error, Result};
use crate::filter::{Filter, FilterRequest};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub dataset: Arc<Dataset>,
    pub config: Arc<Config>,
    /// Configured default selection, resolved against the dataset at startup.
    pub defaults: Arc<Filter>,
}

impl AppState {
    pub fn new(dataset: Dataset, config: Config) -> Self {
        let defaults = Filter::from_defaults(&dataset, &config.defaults);
        Self {
            dataset: Arc::new(dataset),
            config: Arc::new(config),
            defaults: Arc::new(defaults),
        }
    }

    fn resolve(&self, request: &FilterRequest) -> Result<Filter> {
        request.resolve(&self.dataset, &self.defaults)
    }
}

/// API Response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// Error half of every handler: a dashboard error rendered as an envelope.
pub struct ApiError {
    error: Error,
    status: StatusCode,
}

impl ApiError {
    /// Same error, different status.
    fn with_status(error: Error, status: StatusCode) -> Self {
        Self { error, status }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let status =
            StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self { error, status }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(error = %self.error, "request failed");
        } else {
            tracing::debug!(error = %self.error, status = self.status.as_u16(), "rejected request");
        }
        (self.status, Json(ApiResponse::<()>::err(self.error.to_string()))).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

/// Query for the records endpoint: the usual filter plus a row limit.
#[derive(Debug, Default, Deserialize)]
pub struct RecordsQuery {
    #[serde(flatten)]
    pub filter: FilterRequest,
    pub limit: Option<String>,
}

/// Filtered rows plus how many matched before the limit.
#[derive(Debug, Serialize)]
pub struct RecordsResponse {
    pub matched: usize,
    pub returned: usize,
    pub records: Vec<CrimeRecord>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/options - Control values and initial selection
async fn get_options(State(state): State<AppState>) -> Json<ApiResponse<DashboardOptions>> {
    Json(ApiResponse::ok(dashboard::options(&state.dataset, &state.defaults)))
}

/// GET /api/summary - Summary cards for a filter
async fn get_summary(
    State(state): State<AppState>,
    Query(request): Query<FilterRequest>,
) -> ApiResult<SummaryCards> {
    let filter = state.resolve(&request)?;
    Ok(Json(ApiResponse::ok(dashboard::summary_cards(
        &state.dataset,
        &filter,
    ))))
}

/// GET /api/tabs/:tab - Figures and table for one tab
async fn get_tab(
    State(state): State<AppState>,
    Path(tab): Path<String>,
    Query(request): Query<FilterRequest>,
) -> ApiResult<TabContent> {
    let tab: Tab = tab.parse()?;
    let filter = state.resolve(&request)?;
    Ok(Json(ApiResponse::ok(dashboard::render_tab(
        &state.dataset,
        &filter,
        tab,
        state.config.table.max_rows,
    ))))
}

/// GET /api/charts/:chart - A single figure
async fn get_chart(
    State(state): State<AppState>,
    Path(chart): Path<String>,
    Query(request): Query<FilterRequest>,
) -> ApiResult<Figure> {
    let kind: ChartKind = chart.parse()?;
    let filter = state.resolve(&request)?;
    Ok(Json(ApiResponse::ok(dashboard::render_chart(
        &state.dataset,
        &filter,
        kind,
    ))))
}

/// GET /api/records - Filtered raw rows
async fn get_records(
    State(state): State<AppState>,
    Query(query): Query<RecordsQuery>,
) -> ApiResult<RecordsResponse> {
    let filter = state.resolve(&query.filter)?;

    let table = &state.config.table;
    let limit = match query.limit.as_deref() {
        None => table.max_rows,
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .map_err(|_| Error::InvalidParameter {
                name: "limit",
                value: raw.to_string(),
            })?
            .min(table.row_limit_cap),
    };

    let rows = filter.apply(&state.dataset);
    let records: Vec<CrimeRecord> = rows.iter().take(limit).map(|r| (*r).clone()).collect();

    Ok(Json(ApiResponse::ok(RecordsResponse {
        matched: rows.len(),
        returned: records.len(),
        records,
    })))
}

/// GET /api/units/:unit - Profile of a single unit
async fn get_unit(
    State(state): State<AppState>,
    Path(unit): Path<String>,
) -> ApiResult<UnitProfile> {
    // `Path` has already percent-decoded the segment ("Dhaka%20Range")
    // An unknown unit in the path is a missing resource, not a bad filter
    let profile = dashboard::unit_profile(&state.dataset, &unit).map_err(|err| match err {
        Error::UnknownUnit(_) => ApiError::with_status(err, StatusCode::NOT_FOUND),
        other => other.into(),
    })?;

    Ok(Json(ApiResponse::ok(profile)))
}

/// GET / - Serve the dashboard page
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

// ============================================================================
// Router & Server
// ============================================================================

pub fn router(state: AppState) -> Router {
    let static_dir = state.config.server.static_dir.clone();

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/options", get(get_options))
        .route("/summary", get(get_summary))
        .route("/tabs/:tab", get(get_tab))
        .route("/charts/:chart", get(get_chart))
        .route("/records", get(get_records))
        .route("/units/:unit", get(get_unit))
        .with_state(state);

    Router::new()
        .route("/", get(serve_index))
        .nest("/api", api_routes)
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind and serve until Ctrl+C.
pub async fn serve(config: Config, dataset: Dataset) -> Result<()> {
    let addr = config.bind_address();
    let state = AppState::new(dataset, config);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("dashboard listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
