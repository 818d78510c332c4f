use std::{net::SocketAddr, time::Duration};

use axum::{
    error_handling::HandleErrorLayer,
    extract::Request,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method, Uri,
    },
    response::Response,
    BoxError, Router,
};
use tower::{buffer::BufferLayer, load_shed::error::Overloaded, ServiceBuilder};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    auth, companies,
    config::AppConfig,
    error::AppError,
    health,
    state::AppState,
    users,
};

/// Requests queued for the limiter's worker. The worker sheds instead of
/// waiting, so this only bounds bursts of concurrent arrivals.
const REQUEST_QUEUE: usize = 1024;

pub fn build_app(state: AppState) -> Router {
    let config = state.config.clone();

    let api = Router::new()
        .merge(health::health_routes())
        .nest(
            "/api/v1",
            Router::new()
                .merge(health::api_root())
                .merge(auth::router())
                .merge(users::router())
                .merge(companies::router()),
        )
        .fallback(not_found)
        .with_state(state);

    let retry_after = config.rate_limit.window_secs;

    // Router::layer wraps each route on its own; the limiter must see every
    // request, so the stack wraps the whole router instead. Tracing and CORS
    // stay outside the limiter: throttled requests get spans, preflights are
    // not counted.
    let service = ServiceBuilder::new()
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(|res: &Response, _latency: Duration, span: &tracing::Span| {
                    let status = res.status();
                    span.record("status", tracing::field::display(status));
                    if status.is_server_error() {
                        tracing::error!(%status, "response");
                    } else {
                        tracing::info!(%status, "response");
                    }
                }),
        )
        .layer(cors_layer(&config))
        .layer(HandleErrorLayer::new(move |err: BoxError| async move {
            handle_middleware_error(err, retry_after)
        }))
        .layer(BufferLayer::<Request>::new(REQUEST_QUEUE))
        .load_shed()
        .rate_limit(
            config.rate_limit.max_requests,
            Duration::from_secs(config.rate_limit.window_secs),
        )
        .service(api);

    Router::new().fallback_service(service)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if !config.is_production() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true)
}

async fn not_found(uri: Uri) -> AppError {
    AppError::RouteNotFound(uri.path().to_string())
}

fn handle_middleware_error(err: BoxError, retry_after: u64) -> AppError {
    if err.is::<Overloaded>() {
        tracing::warn!(retry_after, "rate limit exceeded; shedding request");
        AppError::RateLimited { retry_after }
    } else {
        AppError::internal("Internal Server Error", anyhow::anyhow!(err))
    }
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
