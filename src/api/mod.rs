use crate::{
    accounts::{
        notify::{HttpNotifier, LogNotifier, Notifier},
        password::CredentialHasher,
        postgres::PgCredentialStore,
        service::{AccountService, ServiceConfig},
    },
    api::handlers::{auth, health, user_register, users},
    cli::globals::GlobalArgs,
};
use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::{get, post, put},
    Extension, Router,
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use url::Url;
use utoipa_swagger_ui::SwaggerUi;

pub(crate) mod handlers;
// OpenAPI document lives in openapi.rs; route registration stays here.
mod openapi;

pub use openapi::openapi;

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, dsn: String, globals: &GlobalArgs) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let store = Arc::new(PgCredentialStore::new(pool.clone()));
    let notifier: Arc<dyn Notifier> = match &globals.notify_url {
        Some(endpoint) => Arc::new(HttpNotifier::new(endpoint.clone())?),
        None => Arc::new(LogNotifier),
    };
    let config = ServiceConfig::new(globals.session_secret.clone())
        .with_session_ttl_seconds(globals.session_ttl_seconds)
        .with_reset_token_ttl_seconds(globals.reset_token_ttl_seconds)
        .with_email_token_ttl_seconds(globals.email_token_ttl_seconds)
        .with_public_base_url(globals.public_base_url.clone())
        .with_list_include_inactive(globals.list_include_inactive);
    let service = Arc::new(AccountService::new(
        store,
        notifier,
        CredentialHasher::new()?,
        config,
    ));

    let frontend_origin = frontend_origin(&globals.public_base_url)?;
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_origin(AllowOrigin::exact(frontend_origin))
        .allow_credentials(true);

    let app = Router::new()
        .route("/", get(|| async { "🎫" }))
        .route("/users/register", post(user_register::register))
        .route("/users", get(users::list_users))
        .route(
            "/users/:id",
            get(users::get_user).put(users::update_user),
        )
        .route("/users/:id/status", put(users::set_status))
        .route("/users/:id/delete", post(users::delete_user))
        .route("/auth/login", post(auth::login::login))
        .route("/auth/session", get(auth::session::session))
        .route(
            "/auth/password-reset/request",
            post(auth::recovery::request_password_reset),
        )
        .route(
            "/auth/password-reset/redeem",
            post(auth::recovery::redeem_password_reset),
        )
        .route(
            "/auth/email-change/request",
            post(auth::confirmation::request_email_change),
        )
        .route(
            "/auth/email-change/confirm",
            post(auth::confirmation::confirm_email_change),
        )
        .route("/auth/email-confirm", post(auth::confirmation::confirm_email))
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
                .layer(Extension(service.clone()))
                .layer(Extension(pool.clone())),
        )
        .route("/health", get(health::health).options(health::health))
        .layer(Extension(pool));

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;

            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
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

fn frontend_origin(public_base_url: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(public_base_url)
        .with_context(|| format!("Invalid public base URL: {public_base_url}"))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow!("Public base URL must include a valid host: {public_base_url}"))?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build frontend origin header")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frontend_origin_strips_path_and_keeps_port() {
        let origin = frontend_origin("http://localhost:3000/app/").unwrap();
        assert_eq!(origin, HeaderValue::from_static("http://localhost:3000"));

        let origin = frontend_origin("https://accounts.example.com").unwrap();
        assert_eq!(
            origin,
            HeaderValue::from_static("https://accounts.example.com")
        );
    }

    #[test]
    fn frontend_origin_rejects_unparseable_urls() {
        assert!(frontend_origin("not a url").is_err());
        assert!(frontend_origin("unix:/var/run/sock").is_err());
    }
}
