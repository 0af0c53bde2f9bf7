//! Tally Web Server
//!
//! Axum-based REST API for the Tally personal finance dashboard.
//!
//! Security features:
//! - API key authentication (secure by default, use --no-auth for local dev)
//! - Billing webhooks authenticated by signature, outside the API key layer
//! - Restrictive CORS policy
//! - Input validation (pagination limits, month ranges)
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, warn};

use tally_core::db::Database;
use tally_core::identity::IdentityStore;
use tally_core::{EntitlementReconciler, ReportGenerator};

mod handlers;

/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Header carrying the identity provider's user id, set by the front end
pub const USER_ID_HEADER: &str = "x-tally-user-id";

/// User id used for every request when authentication is disabled
pub const LOCAL_DEV_USER: &str = "local-dev";

/// Authorization header for API key auth
const AUTHORIZATION_HEADER: &str = "authorization";

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Whether authentication is required (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only in production)
    pub allowed_origins: Vec<String>,
    /// API keys accepted as "Bearer <key>" in the Authorization header
    pub api_keys: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            api_keys: vec![],
        }
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("require_auth", &self.require_auth)
            .field("allowed_origins", &self.allowed_origins)
            .field("api_keys", &format!("<{} redacted>", self.api_keys.len()))
            .finish()
    }
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    pub identity: Arc<dyn IdentityStore>,
    /// Billing webhook endpoint; the route only exists when configured
    pub reconciler: Option<EntitlementReconciler>,
    /// AI reports; `None` when no completion backend is configured
    pub reports: Option<ReportGenerator>,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig, identity: Arc<dyn IdentityStore>) -> Self {
        Self {
            db,
            config,
            identity,
            reconciler: None,
            reports: None,
        }
    }

    pub fn with_reconciler(mut self, reconciler: EntitlementReconciler) -> Self {
        self.reconciler = Some(reconciler);
        self
    }

    pub fn with_reports(mut self, reports: ReportGenerator) -> Self {
        self.reports = Some(reports);
        self
    }
}

/// The user a request acts on behalf of, inserted by `auth_middleware`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

/// Authentication middleware
///
/// With auth enabled, a request needs a valid API key (`Authorization: Bearer
/// <key>`, compared in constant time) and a non-empty `x-tally-user-id`
/// header naming the identity-provider user. With auth disabled the header is
/// still honored, falling back to `local-dev`.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let header_user = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from);

    if !state.config.require_auth {
        let user = header_user.unwrap_or_else(|| LOCAL_DEV_USER.to_string());
        request.extensions_mut().insert(AuthenticatedUser(user));
        return next.run(request).await;
    }

    let api_key_valid = request
        .headers()
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(|key| validate_api_key(key, &state.config.api_keys))
        .unwrap_or(false);

    match (api_key_valid, header_user) {
        (true, Some(user)) => {
            info!(user = %user, path = %request.uri().path(), "Authenticated via API key");
            request.extensions_mut().insert(AuthenticatedUser(user));
            next.run(request).await
        }
        (true, None) => {
            warn!(path = %request.uri().path(), "API key valid but no user id header");
            unauthorized()
        }
        (false, _) => {
            warn!(path = %request.uri().path(), "Unauthorized request - no valid auth");
            unauthorized()
        }
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "Authentication required"
        })),
    )
        .into_response()
}

/// Validate an API key against the configured keys using constant-time comparison
/// to prevent timing attacks.
fn validate_api_key(provided: &str, valid_keys: &[String]) -> bool {
    use subtle::ConstantTimeEq;

    let provided_bytes = provided.as_bytes();

    valid_keys.iter().any(|key| {
        let key_bytes = key.as_bytes();
        // Only compare if lengths match (constant-time for same-length keys)
        provided_bytes.len() == key_bytes.len() && bool::from(provided_bytes.ct_eq(key_bytes))
    })
}

/// Parse a comma-separated list of API keys
pub fn parse_api_keys(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router
pub fn create_router(state: AppState, static_dir: Option<&str>) -> Router {
    if state.reconciler.is_none() {
        info!("ℹ️  Billing webhook not configured (set STRIPE_WEBHOOK_SECRET and STRIPE_SECRET_KEY)");
    }
    match &state.reports {
        Some(reports) => info!("AI reports configured (model: {})", reports.model()),
        None => info!("ℹ️  AI reports not configured (set OPENAI_API_KEY to enable)"),
    }

    let config = state.config.clone();
    let state = Arc::new(state);

    let mut api_routes = Router::new()
        // Auth
        .route("/me", get(handlers::get_me))
        // Dashboard
        .route("/dashboard", get(handlers::get_dashboard))
        // Transactions
        .route(
            "/transactions",
            get(handlers::list_transactions).post(handlers::create_transaction),
        )
        .route(
            "/transactions/:id",
            get(handlers::get_transaction)
                .put(handlers::update_transaction)
                .delete(handlers::delete_transaction),
        )
        // Reports
        .route("/reports/ai", post(handlers::generate_ai_report))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Billing webhooks authenticate by signature; added after the auth layer
    if state.reconciler.is_some() {
        api_routes = api_routes.route("/webhooks/stripe", post(handlers::stripe_webhook));
    }

    // Build CORS layer
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let allowed_headers = [
        header::CONTENT_TYPE,
        header::AUTHORIZATION,
        HeaderName::from_static(USER_ID_HEADER),
    ];
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers(allowed_headers)
    } else {
        // Allow specified origins
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(allowed_headers)
    };

    // Security headers
    // CSP: restrict scripts to same-origin, allow inline styles
    let csp_value = HeaderValue::from_static(
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' data:; font-src 'self'; connect-src 'self'; frame-ancestors 'none'"
    );

    let mut app = Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ));

    // Serve static files if directory provided
    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app
}

/// Start the server
pub async fn serve(
    state: AppState,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
) -> anyhow::Result<()> {
    if !state.config.require_auth {
        warn!("⚠️  Authentication disabled - do not expose to network!");
    } else if state.config.api_keys.is_empty() {
        warn!("⚠️  No API keys configured (set TALLY_API_KEYS); all API requests will be rejected");
    }

    let app = create_router(state, static_dir);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, msg)
    }

    pub fn forbidden(msg: &str) -> Self {
        Self::with_status(StatusCode::FORBIDDEN, msg)
    }

    pub fn not_found(msg: &str) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, msg)
    }

    pub fn internal(msg: &str) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    pub fn service_unavailable(msg: &str) -> Self {
        Self::with_status(StatusCode::SERVICE_UNAVAILABLE, msg)
    }

    fn with_status(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
            internal: None,
        }
    }

    /// Attach the underlying error for logging
    pub fn with_internal(mut self, err: impl Into<anyhow::Error>) -> Self {
        self.internal = Some(err.into());
        self
    }

    /// Map a core library error to a response, keeping messages generic
    /// unless the error is the caller's fault
    pub fn from_core(err: tally_core::Error) -> Self {
        use tally_core::Error;

        match err {
            Error::InvalidData(msg) => Self::bad_request(&msg),
            Error::NotFound(msg) => Self::not_found(&msg),
            Error::PremiumRequired => Self::forbidden("A premium plan is required"),
            err @ Error::PlanLimitReached(_) => Self::forbidden(&err.to_string()),
            other => Self::from(other),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}

#[cfg(test)]
mod tests;
