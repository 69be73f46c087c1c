/*!
blockdash REST API Server

Renders dashboards from a catalog over HTTP.

## Usage

```bash
blockdash-rest --host 127.0.0.1 --port 3000 --load-sample-data
```

## Endpoints

- `POST /api/v1/dashboard` - Render a data source with stored preferences
- `POST /api/v1/sql` - Show the data and count SQL a dashboard would run
- `GET /api/v1/sources` - List the catalog's data sources
- `GET /api/v1/health` - Health check
- `GET /api/v1/version` - Version information
*/

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use blockdash::reader::data::{load_sample_data, SAMPLE_CATALOG};
use blockdash::reader::SqliteReader;
use blockdash::{
    Catalog, ComposedQuery, DashError, Dashboard, LayoutKind, Preferences, QueryParams,
    RenderOutcome, Viewer, VERSION,
};

/// CLI arguments for the REST API server
#[derive(Parser)]
#[command(name = "blockdash-rest")]
#[command(about = "blockdash REST API Server")]
#[command(version = VERSION)]
struct Cli {
    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind to
    #[arg(long, default_value = "3334")]
    port: u16,

    /// CORS allowed origins (comma-separated)
    #[arg(long, default_value = "*")]
    cors_origin: String,

    /// Load the bundled sample tables into the database
    #[arg(long, default_value = "false")]
    load_sample_data: bool,

    /// Catalog JSON file (defaults to the bundled demo catalog)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Database connection string
    #[arg(long, default_value = "sqlite://memory")]
    reader: String,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    catalog: Arc<Catalog>,
    /// Wrapped in Arc<Mutex> since the SQLite connection is not Sync
    reader: Arc<Mutex<SqliteReader>>,
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for /api/v1/dashboard and /api/v1/sql
#[derive(Debug, Deserialize)]
struct DashboardRequest {
    /// Data source id
    source: String,
    /// Stored preferences for this dashboard
    #[serde(default)]
    preferences: Preferences,
    /// Whether the caller may see error details
    #[serde(default)]
    privileged: bool,
}

/// Successful API response
#[derive(Debug, Serialize)]
struct ApiSuccess<T> {
    status: String,
    data: T,
}

/// Error API response
#[derive(Debug, Serialize)]
struct ApiError {
    status: String,
    error: ErrorDetails,
}

#[derive(Debug, Serialize)]
struct ErrorDetails {
    message: String,
    #[serde(rename = "type")]
    error_type: String,
}

/// Summary of one data source
#[derive(Debug, Serialize)]
struct SourceSummary {
    id: String,
    title: String,
    layout: LayoutKind,
    fields: Vec<String>,
    filters: Vec<String>,
}

/// Composed SQL for one dashboard request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SqlResult {
    sql: String,
    count_sql: String,
    params: QueryParams,
}

impl From<ComposedQuery> for SqlResult {
    fn from(query: ComposedQuery) -> Self {
        SqlResult {
            sql: query.sql,
            count_sql: query.count_sql,
            params: query.params,
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Version response
#[derive(Debug, Serialize)]
struct VersionResponse {
    version: String,
    features: Vec<String>,
}

// ============================================================================
// Error Handling
// ============================================================================

/// Custom error type for API responses
struct ApiErrorResponse {
    status: StatusCode,
    error: ApiError,
}

impl ApiErrorResponse {
    fn new(status: StatusCode, error_type: &str, message: String) -> Self {
        ApiErrorResponse {
            status,
            error: ApiError {
                status: "error".to_string(),
                error: ErrorDetails {
                    message,
                    error_type: error_type.to_string(),
                },
            },
        }
    }

    fn unknown_source(id: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "NotFound",
            format!("Unknown data source '{}'", id),
        )
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        let json = Json(self.error);
        (self.status, json).into_response()
    }
}

impl From<DashError> for ApiErrorResponse {
    fn from(err: DashError) -> Self {
        let (status, error_type) = match &err {
            DashError::ConfigurationError(_) => (StatusCode::BAD_REQUEST, "ConfigurationError"),
            DashError::ValidationError(_) => (StatusCode::BAD_REQUEST, "ValidationError"),
            DashError::InvalidOperator { .. } => (StatusCode::BAD_REQUEST, "InvalidOperator"),
            DashError::QueryError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "QueryError"),
            DashError::InternalError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
        };
        Self::new(status, error_type, err.to_string())
    }
}

// ============================================================================
// Handler Functions
// ============================================================================

/// POST /api/v1/dashboard - Render a dashboard
///
/// Render failures are part of the outcome, so this only fails for unknown
/// sources or an unusable database handle.
async fn dashboard_handler(
    State(state): State<AppState>,
    Json(request): Json<DashboardRequest>,
) -> Result<Json<ApiSuccess<RenderOutcome>>, ApiErrorResponse> {
    info!("Rendering data source '{}'", request.source);

    let source = state
        .catalog
        .source(&request.source)
        .ok_or_else(|| ApiErrorResponse::unknown_source(&request.source))?;

    let reader = state
        .reader
        .lock()
        .map_err(|e| DashError::InternalError(format!("Failed to lock reader: {}", e)))?;

    let outcome = Dashboard::new(&state.catalog, source, request.preferences).render_safely(
        &*reader,
        Viewer {
            privileged: request.privileged,
        },
    );

    Ok(Json(ApiSuccess {
        status: "success".to_string(),
        data: outcome,
    }))
}

/// POST /api/v1/sql - Compose a dashboard's queries without running them
async fn sql_handler(
    State(state): State<AppState>,
    Json(request): Json<DashboardRequest>,
) -> Result<Json<ApiSuccess<SqlResult>>, ApiErrorResponse> {
    let source = state
        .catalog
        .source(&request.source)
        .ok_or_else(|| ApiErrorResponse::unknown_source(&request.source))?;

    let composed = Dashboard::new(&state.catalog, source, request.preferences).compose()?;

    Ok(Json(ApiSuccess {
        status: "success".to_string(),
        data: composed.into(),
    }))
}

/// GET /api/v1/sources - List data sources
async fn sources_handler(State(state): State<AppState>) -> Json<ApiSuccess<Vec<SourceSummary>>> {
    let sources = state
        .catalog
        .sources()
        .iter()
        .map(|source| SourceSummary {
            id: source.id.clone(),
            title: source.title().to_string(),
            layout: source.layout,
            fields: source.fields.clone(),
            filters: source.filters.iter().map(|f| f.name.clone()).collect(),
        })
        .collect();

    Json(ApiSuccess {
        status: "success".to_string(),
        data: sources,
    })
}

/// GET /api/v1/health - Health check
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: VERSION.to_string(),
    })
}

/// GET /api/v1/version - Version information
async fn version_handler() -> Json<VersionResponse> {
    let mut features = Vec::new();

    #[cfg(feature = "sqlite")]
    features.push("sqlite".to_string());

    features.push("rest-api".to_string());

    Json(VersionResponse {
        version: VERSION.to_string(),
        features,
    })
}

/// Root handler
async fn root_handler() -> &'static str {
    "blockdash REST API Server - See /api/v1/health for status"
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/api/v1/dashboard", post(dashboard_handler))
        .route("/api/v1/sql", post(sql_handler))
        .route("/api/v1/sources", get(sources_handler))
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/version", get(version_handler))
        .with_state(state)
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blockdash_rest=info,blockdash=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let catalog = match &cli.catalog {
        Some(path) => Catalog::from_json(&std::fs::read_to_string(path)?)?,
        None => Catalog::from_json(SAMPLE_CATALOG)?,
    };
    info!(
        "Catalog loaded: {} fields, {} data sources",
        catalog.fields().len(),
        catalog.sources().len()
    );

    let reader = SqliteReader::from_connection_string(&cli.reader)?;
    if cli.load_sample_data {
        info!("Loading sample data (users, courses, enrolments tables)");
        load_sample_data(&reader)?;
    }

    let state = AppState {
        catalog: Arc::new(catalog),
        reader: Arc::new(Mutex::new(reader)),
    };

    // Configure CORS
    let cors = if cli.cors_origin == "*" {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(vec![header::CONTENT_TYPE])
    } else {
        let origins: Vec<_> = cli
            .cors_origin
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(vec![header::CONTENT_TYPE])
    };

    let app = router(state)
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port).parse()?;

    info!("Starting blockdash REST API server on {}", addr);
    info!("API documentation:");
    info!("  POST /api/v1/dashboard - Render a dashboard");
    info!("  POST /api/v1/sql       - Compose dashboard SQL");
    info!("  GET  /api/v1/sources   - List data sources");
    info!("  GET  /api/v1/health    - Health check");
    info!("  GET  /api/v1/version   - Version info");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
