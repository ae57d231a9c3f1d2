use axum::{
    Router,
    extract::Request,
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Error as AxumError, Header},
    typed_header::TypedHeaderRejection,
};

use std::{sync::Arc, time::Duration};

use crate::{budgets, reports, transactions};
use engine::Engine;

static OWNER_HEADER: axum::http::HeaderName = axum::http::HeaderName::from_static("x-owner-id");

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub report_timeout: Duration,
}

/// Where and how the boundary serves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: String,
    /// Upper bound on one report computation.
    pub report_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            report_timeout: Duration::from_secs(5),
        }
    }
}

/// `TypedHeader` for the owner resolved upstream.
///
/// Every request must carry a non-blank "x-owner-id" entry in the header.
#[derive(Debug)]
struct OwnerHeader(String);

impl Header for OwnerHeader {
    fn name() -> &'static axum::http::HeaderName {
        &OWNER_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, AxumError>
    where
        Self: Sized,
        I: Iterator<Item = &'i axum::http::HeaderValue>,
    {
        let value = values.next().ok_or_else(AxumError::invalid)?;
        let Ok(value) = value.to_str() else {
            return Err(AxumError::invalid());
        };
        let value = value.trim();
        if value.is_empty() {
            return Err(AxumError::invalid());
        }

        Ok(OwnerHeader(value.to_string()))
    }

    fn encode<E: Extend<axum::http::HeaderValue>>(&self, values: &mut E) {
        match axum::http::HeaderValue::from_str(&self.0) {
            Ok(value) => values.extend(std::iter::once(value)),
            Err(_) => tracing::error!("failed to encode x-owner-id header"),
        }
    }
}

/// Owner of the current request.
#[derive(Clone, Debug)]
pub(crate) struct Owner(pub String);

async fn owner(
    owner_header: Result<TypedHeader<OwnerHeader>, TypedHeaderRejection>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Ok(TypedHeader(OwnerHeader(owner))) = owner_header else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    request.extensions_mut().insert(Owner(owner));
    Ok(next.run(request).await)
}

pub fn router(engine: Arc<Engine>, config: &ServerConfig) -> Router {
    let state = ServerState {
        engine,
        report_timeout: config.report_timeout,
    };

    Router::new()
        .route(
            "/transactions",
            post(transactions::create).get(transactions::list),
        )
        .route("/transactions/import", post(transactions::import))
        .route("/transactions/export", get(transactions::export))
        .route("/budgets", get(budgets::list).put(budgets::set))
        .route("/reports", get(reports::get))
        .route_layer(middleware::from_fn(owner))
        .with_state(state)
}

pub async fn run(engine: Engine, config: ServerConfig) {
    let listener = match tokio::net::TcpListener::bind(&config.bind).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener on {}: {err}", config.bind);
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, config, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    config: ServerConfig,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(Arc::new(engine), &config)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    config: ServerConfig,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, config, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
