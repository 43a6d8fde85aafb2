/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use collabhub_api::{app::{build_router, AppState}, config::Config};
/// use collabhub_shared::db::memory::MemoryStore;
/// use collabhub_shared::notify::LogNotifier;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(Arc::new(MemoryStore::new()), Arc::new(LogNotifier), config);
/// let app = build_router(state);
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, post, put},
    Router,
};
use collabhub_shared::db::store::Store;
use collabhub_shared::notify::InvitationNotifier;
use collabhub_shared::services::Services;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::Config;
use crate::middleware::auth::require_auth;
use crate::routes;

/// Shared application state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub services: Services,

    pub store: Arc<dyn Store>,

    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        notifier: Arc<dyn InvitationNotifier>,
        config: Config,
    ) -> Self {
        let services = Services::new(store.clone(), notifier, config.service_settings());
        Self {
            services,
            store,
            config: Arc::new(config),
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete router with all routes and middleware
///
/// ```text
/// /
/// ├── /health
/// └── /v1/
///     ├── /auth/                      public
///     │   ├── POST /register | /login | /refresh
///     │   └── POST /external | /external/complete
///     ├── /users/me                   GET, DELETE
///     ├── /projects/                  GET, POST
///     │   ├── /roles/:role            GET
///     │   └── /:id                    GET, PUT, DELETE
///     │       ├── /leave              POST
///     │       ├── /members            GET
///     │       │   └── /:user_id       PUT (role), DELETE (kick)
///     │       ├── /invitations        GET, POST
///     │       ├── /activity           GET
///     │       └── /notices            GET
///     ├── /invitations/accept         POST
///     └── /admin/
///         ├── /projects               GET
///         ├── /projects/:id           DELETE
///         ├── /activity               GET
///         └── /users/:id/role         PUT
/// ```
///
/// Everything under `/v1` except `/auth` requires a Bearer access token.
pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .route("/external", post(routes::auth::external_login))
        .route("/external/complete", post(routes::auth::complete_signup));

    let protected_routes = Router::new()
        .route(
            "/users/me",
            get(routes::users::me).delete(routes::users::delete_me),
        )
        .route(
            "/projects",
            get(routes::projects::list_mine).post(routes::projects::create),
        )
        .route("/projects/roles/:role", get(routes::projects::list_by_role))
        .route(
            "/projects/:id",
            get(routes::projects::get)
                .put(routes::projects::update)
                .delete(routes::projects::delete),
        )
        .route("/projects/:id/leave", post(routes::projects::leave))
        .route("/projects/:id/members", get(routes::members::list))
        .route(
            "/projects/:id/members/:user_id",
            put(routes::members::update_role).delete(routes::members::kick),
        )
        .route(
            "/projects/:id/invitations",
            get(routes::invitations::list).post(routes::invitations::create),
        )
        .route("/projects/:id/activity", get(routes::boards::activity))
        .route("/projects/:id/notices", get(routes::boards::notices))
        .route("/invitations/accept", post(routes::invitations::accept))
        .route("/admin/projects", get(routes::admin::list_projects))
        .route("/admin/projects/:id", delete(routes::admin::delete_project))
        .route("/admin/activity", get(routes::admin::activity))
        .route("/admin/users/:id/role", put(routes::admin::set_role))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .merge(protected_routes);

    let cors = if !state.config.api.production
        || state.config.api.cors_origins.iter().any(|o| o == "*")
    {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}
