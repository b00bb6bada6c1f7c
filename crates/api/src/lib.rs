//! Smart Health Surveillance API Server
//!
//! REST API for water-quality disease risk scoring, field surveys and
//! public health alerts.

use axum::{
    http::HeaderValue,
    routing::{get, patch, post},
    Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tower::ServiceBuilder;
use tower_governor::GovernorLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

pub mod config;
pub mod error;
mod extract;
pub mod rate_limit;
mod routes;

pub use crate::config::ServiceConfig;
pub use error::{ApiError, ApiResult};
pub use extract::AuthUser;

use auth::{hash_password, AuthError, Role, TokenService};
use crate::config::{LogFormat, LoggingConfig, ServerConfig, DEFAULT_TOKEN_SECRET};
use inference_engine::{InferenceError, ModelArtifact, RiskScorer};
use storage::{NewUser, Repository, StorageError};

/// Startup failures
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
    #[error(transparent)]
    Model(#[from] InferenceError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("Logging setup failed: {0}")]
    Logging(String),
    #[error("Metrics setup failed: {0}")]
    Metrics(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state shared across handlers
pub struct AppState {
    /// Risk scorer over the loaded model artifact
    pub scorer: RiskScorer,
    /// Storage repository
    pub repository: Repository,
    /// Token issuer and verifier
    pub tokens: TokenService,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: Instant,
    /// Prometheus exporter, when metrics are enabled
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new application state
    pub fn new(scorer: RiskScorer, repository: Repository, tokens: TokenService) -> Self {
        Self {
            scorer,
            repository,
            tokens,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Load the model, open the database and set up tokens from configuration
    pub async fn from_config(config: &ServiceConfig) -> Result<Self, ServerError> {
        let artifact = ModelArtifact::load_or_mock(&config.model.dir)?;
        info!(
            "Model ready: {} classifier, {} features, {} classes",
            artifact.classifier().kind(),
            artifact.schema().len(),
            artifact.disease_classes().len()
        );
        let scorer = RiskScorer::new(Arc::new(artifact)).with_thresholds(config.risk);

        let repository =
            Repository::connect(&config.database.url, config.database.max_connections).await?;

        if config.auth.token_secret == DEFAULT_TOKEN_SECRET {
            warn!("Using the built-in token secret; set SHS__AUTH__TOKEN_SECRET in production");
        }
        let tokens = TokenService::new(&config.auth.token_secret, config.auth.token_ttl_hours)?;

        if let Some(password) = &config.auth.admin_password {
            bootstrap_admin(&repository, password).await?;
        }

        Ok(Self::new(scorer, repository, tokens))
    }
}

/// Create the `admin` account when no admin exists yet
pub async fn bootstrap_admin(repository: &Repository, password: &str) -> Result<bool, ServerError> {
    if repository.has_admin().await? {
        return Ok(false);
    }

    let password_hash = hash_password(password)?;
    repository
        .create_user(NewUser {
            username: "admin".to_string(),
            email: "admin@health.gov".to_string(),
            password_hash,
            role: Role::Admin.as_str().to_string(),
            full_name: "System Administrator".to_string(),
            phone: None,
            location: None,
        })
        .await?;
    info!("Created bootstrap admin account");
    Ok(true)
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health::health))
        .route("/metrics", get(routes::health::metrics))
        .route("/predict", post(routes::predict::predict))
        .route("/hygiene-tips", get(routes::catalog::hygiene_tips))
        .route("/diseases", get(routes::catalog::diseases))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/register", post(routes::auth::register))
        .route(
            "/surveys",
            get(routes::surveys::list_surveys).post(routes::surveys::create_survey),
        )
        .route("/surveys/:id/status", patch(routes::surveys::update_status))
        .route(
            "/alerts",
            get(routes::alerts::list_alerts).post(routes::alerts::create_alert),
        )
        .route("/alerts/:id/status", patch(routes::alerts::update_status))
        .route("/predictions", get(routes::predictions::list_predictions))
        .route("/stats", get(routes::stats::stats))
        .with_state(state)
}

/// CORS policy for the configured origins
pub fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if server.cors_origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let origins: Vec<_> = server
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(origins))
}

/// Initialize logging
pub fn init_logging(config: &LoggingConfig) -> Result<(), ServerError> {
    let level = Level::from_str(&config.level)
        .map_err(|_| ServerError::Logging(format!("unknown log level '{}'", config.level)))?;

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let result = match config.format {
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    };
    result.map_err(|e| ServerError::Logging(e.to_string()))
}

/// Install the global Prometheus recorder
pub fn init_metrics() -> Result<PrometheusHandle, ServerError> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ServerError::Metrics(e.to_string()))
}

/// Run the server until it stops
pub async fn run_server(config: ServiceConfig) -> Result<(), ServerError> {
    let mut state = AppState::from_config(&config).await?;
    if config.metrics.enabled {
        state = state.with_metrics(init_metrics()?);
    }

    let layers = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.server));
    let mut app = create_router(Arc::new(state)).layer(layers);

    match rate_limit::create_governor_config(&config.rate_limit) {
        Some(governor) => {
            info!(
                "Rate limiting: burst {}, one request replenished every {}s",
                config.rate_limit.burst_size, config.rate_limit.per_second
            );
            app = app.layer(GovernorLayer { config: governor });
        }
        None => info!("Rate limiting disabled"),
    }

    info!("Starting API server on {}", config.server.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use axum::response::Response;
    use serde_json::Value;
    use tower::ServiceExt;

    pub const TEST_SECRET: &str = "test-secret";

    /// State over the mock model and a private in-memory database
    pub async fn test_state() -> Arc<AppState> {
        let scorer = RiskScorer::new(Arc::new(ModelArtifact::mock()));
        let repository = Repository::in_memory().await.unwrap();
        let tokens = TokenService::new(TEST_SECRET, 24).unwrap();
        Arc::new(AppState::new(scorer, repository, tokens))
    }

    /// Register a user directly and return a token for it
    pub async fn token_for(state: &AppState, username: &str, role: Role) -> String {
        let user = state
            .repository
            .create_user(NewUser {
                username: username.to_string(),
                email: format!("{}@example.org", username),
                password_hash: hash_password("password").unwrap(),
                role: role.as_str().to_string(),
                full_name: username.to_string(),
                phone: None,
                location: None,
            })
            .await
            .unwrap();
        state.tokens.issue(user.id, &user.username, role).unwrap()
    }

    pub async fn send(
        state: &Arc<AppState>,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        create_router(state.clone())
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }

    pub async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    pub async fn expect_json(response: Response, status: StatusCode) -> Value {
        assert_eq!(response.status(), status);
        json_body(response).await
    }
}
