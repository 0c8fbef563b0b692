#![allow(clippy::needless_for_each)]

use crate::digibank::handlers::{account, admin, chatbot, digilocker, flow, health, otp, risk, root};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::{get, post},
    Extension, Router,
};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{error, info, info_span, Span};
use ulid::Ulid;
use url::Url;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

pub mod chat;
pub mod config;
mod error;
pub mod handlers;
pub mod session;
pub mod sms;
pub mod storage;

pub use error::{ApiError, ErrorBody};

use chat::ChatClient;
use config::FlowConfig;
use session::SessionStore;
use sms::SmsSender;

const SESSION_REAP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(OpenApi)]
#[openapi(
    paths(
        root::root,
        health::health,
        flow::signup,
        flow::register,
        flow::login,
        flow::logout,
        otp::send_otp,
        otp::verify_otp,
        digilocker::digilocker,
        digilocker::digilocker_login,
        digilocker::digilocker_otp,
        digilocker::consent_info,
        digilocker::consent,
        digilocker::fetch_kyc,
        digilocker::kyc_form,
        risk::risk_check,
        risk::extra_verification,
        risk::under_review,
        risk::view_status,
        risk::rejected,
        account::dashboard,
        account::service_catalog,
        account::activate_services,
        admin::admin,
        admin::approve,
        admin::reject,
        admin::reset_demo,
        chatbot::chatbot,
    ),
    components(schemas(ErrorBody, handlers::FlowResponse, health::Health)),
    modifiers(&BearerAuth),
    tags(
        (name = "onboarding", description = "Phone verification and session flow"),
        (name = "kyc", description = "DigiLocker link, consent and KYC fetch"),
        (name = "risk", description = "Risk scoring and review status"),
        (name = "account", description = "Dashboard and service activation"),
        (name = "admin", description = "Application review"),
        (name = "chatbot", description = "Banking assistant"),
        (name = "health", description = "Liveness")
    )
)]
struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Shared services every request may reach for.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<FlowConfig>,
    pub sessions: Arc<SessionStore>,
    pub sms: Arc<dyn SmsSender>,
    pub chat: Arc<ChatClient>,
}

/// Build the application router.
/// # Errors
/// Return error if the base URL can not be turned into a CORS origin
pub fn router(pool: PgPool, ctx: &AppContext) -> Result<Router> {
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(frontend_origin(ctx.config.base_url())?)
        .allow_credentials(true);

    let app = Router::new()
        .route("/", get(root::root))
        .route("/signup", post(flow::signup))
        .route("/register", post(flow::register))
        .route("/login", post(flow::login))
        .route("/logout", post(flow::logout))
        .route("/send-otp", post(otp::send_otp))
        .route("/verify-otp", post(otp::verify_otp))
        .route("/digilocker", get(digilocker::digilocker))
        .route("/digilocker-login", post(digilocker::digilocker_login))
        .route("/digilocker-otp", post(digilocker::digilocker_otp))
        .route(
            "/consent",
            get(digilocker::consent_info).post(digilocker::consent),
        )
        .route("/fetch-kyc", post(digilocker::fetch_kyc))
        .route("/kyc-form", get(digilocker::kyc_form))
        .route("/risk-check", get(risk::risk_check))
        .route("/extra-verification", post(risk::extra_verification))
        .route("/under-review", get(risk::under_review))
        .route("/view-status", get(risk::view_status))
        .route("/rejected", get(risk::rejected))
        .route("/dashboard", get(account::dashboard))
        .route(
            "/activate-services",
            get(account::service_catalog).post(account::activate_services),
        )
        .route("/admin", get(admin::admin))
        .route("/approve/:id", post(admin::approve))
        .route("/reject/:id", post(admin::reject))
        .route("/reset-demo", post(admin::reset_demo))
        .route("/chatbot", post(chatbot::chatbot))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(ctx.config.clone()))
                .layer(Extension(ctx.sessions.clone()))
                .layer(Extension(ctx.sms.clone()))
                .layer(Extension(ctx.chat.clone()))
                .layer(Extension(pool.clone())),
        )
        .route("/health", get(health::health).options(health::health))
        .layer(Extension(pool));

    Ok(app)
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, dsn: String, ctx: AppContext) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    storage::apply_schema(&pool).await?;

    let reaper = session::spawn_reaper(ctx.sessions.clone(), SESSION_REAP_INTERVAL);

    let app = router(pool, &ctx)?;

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", err);
            }
            info!("Gracefully shutdown");
        })
        .await?;

    reaper.abort();

    Ok(())
}

/// Origin (scheme, host, port) of the public base URL, used for CORS.
/// # Errors
/// Return error if the URL is invalid
pub fn frontend_origin(base_url: &str) -> Result<HeaderValue> {
    let url = Url::parse(base_url).with_context(|| format!("Invalid base URL: {base_url}"))?;
    let origin = url.origin().ascii_serialization();
    HeaderValue::from_str(&origin).context("Invalid origin header")
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin(base_url: &str) -> Option<String> {
        frontend_origin(base_url)
            .ok()
            .and_then(|value| value.to_str().ok().map(ToString::to_string))
    }

    #[test]
    fn origin_strips_path() {
        assert_eq!(
            origin("https://bank.example.com/app/").as_deref(),
            Some("https://bank.example.com")
        );
        assert_eq!(
            origin("http://localhost:8080").as_deref(),
            Some("http://localhost:8080")
        );
    }

    #[test]
    fn origin_rejects_garbage() {
        assert!(frontend_origin("not a url").is_err());
    }

    #[test]
    fn openapi_lists_routes() {
        let doc = openapi();
        for path in ["/register", "/verify-otp", "/risk-check", "/approve/{id}", "/chatbot"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        assert!(doc
            .components
            .as_ref()
            .is_some_and(|components| components.security_schemes.contains_key("bearer")));
    }
}
