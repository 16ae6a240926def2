use std::future::Future;
use std::net::TcpListener;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use ethers::types::Address;
use http::StatusCode;
use log::info;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::prelude::*;
use crate::relayer::api::{HealthResponse, NonceResponse, RelayBody, RelayErrorBody, RelayResponse};
use crate::relayer::{ForwarderChain, RelayerService};

/// An [`Error`] rendered as a relayer error response.
#[derive(Debug)]
pub struct ApiError {
    error: Error,
    request_id: Option<String>,
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        ApiError {
            error,
            request_id: None,
        }
    }
}

pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::Validation(_)
        | Error::MissingFields(_)
        | Error::JsonParse(_)
        | Error::UntrustedForwarder { .. }
        | Error::ExpiredRequest { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = RelayErrorBody::from(&self.error);
        if let Some(request_id) = self.request_id {
            body = body.with_request_id(request_id);
        }
        (status_for(&self.error), Json(body)).into_response()
    }
}

type SharedService<C> = State<Arc<RelayerService<C>>>;

async fn health<C: ForwarderChain + 'static>(
    State(service): SharedService<C>,
) -> Json<HealthResponse> {
    Json(service.health())
}

async fn nonce<C: ForwarderChain + 'static>(
    State(service): SharedService<C>,
    Path(address): Path<String>,
) -> std::result::Result<Json<NonceResponse>, ApiError> {
    let owner: Address = address.parse().map_err(|_| {
        Error::Validation(format!("{address:?} is not a 20-byte hex address"))
    })?;
    let nonce = service.nonce(owner).await?;
    Ok(Json(NonceResponse {
        nonce: nonce.to_string(),
    }))
}

async fn relay<C: ForwarderChain + 'static>(
    State(service): SharedService<C>,
    body: std::result::Result<Json<RelayBody>, JsonRejection>,
) -> std::result::Result<Json<RelayResponse>, ApiError> {
    let request_id = Uuid::new_v4().to_string();
    let with_id = |error: Error| ApiError {
        error,
        request_id: Some(request_id.clone()),
    };

    let Json(body) = body.map_err(|rejection| with_id(Error::Validation(rejection.body_text())))?;
    service
        .relay(&request_id, body.request)
        .await
        .map(Json)
        .map_err(with_id)
}

pub fn router<C: ForwarderChain + 'static>(service: Arc<RelayerService<C>>) -> Router {
    Router::new()
        .route("/health", get(health::<C>))
        .route("/nonce/:address", get(nonce::<C>))
        .route("/relay", post(relay::<C>))
        .layer(CorsLayer::permissive())
        .with_state(service)
}

/// Serves the relayer API on an already bound listener until `shutdown`
/// resolves.
pub async fn serve<C, F>(
    service: Arc<RelayerService<C>>,
    listener: TcpListener,
    shutdown: F,
) -> Result<()>
where
    C: ForwarderChain + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    listener
        .set_nonblocking(true)
        .map_err(|e| Error::Config(format!("failed to configure listener: {e}")))?;
    let local_addr = listener
        .local_addr()
        .map_err(|e| Error::Config(format!("failed to read listener address: {e}")))?;

    info!("Relayer running on {local_addr}");
    info!("   Health check: http://{local_addr}/health");
    info!("   Relay endpoint: http://{local_addr}/relay");

    axum::Server::from_tcp(listener)
        .map_err(|e| Error::Config(format!("failed to start server: {e}")))?
        .serve(router(service).into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::GenericRequest(format!("server error: {e}")))
}
