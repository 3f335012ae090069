use crate::crypto;
use crate::error::{AppError, AppResult};
use crate::provision::{EncodeRequest, ProvisionRequest, Provisioner};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use sealbridge_types::{CreateSecretBody, EncodeSecretBody, EncodedSecretResponse, PingResponse};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

/// Shared state for the API handlers
#[derive(Clone, Debug)]
pub struct AppState {
    pub provisioner: Provisioner,
}

impl AppState {
    pub fn new(provisioner: Provisioner) -> Self {
        Self { provisioner }
    }
}

/// Unwrap a JSON body, turning every rejection into a 400.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => {
            warn!("Rejected request body: {}", rejection.body_text());
            Err(AppError::validation(rejection.body_text()))
        }
    }
}

/// Liveness check
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse::pong())
}

/// Seal a secret for a repository and store it there
pub async fn create_secret(
    State(state): State<AppState>,
    payload: Result<Json<CreateSecretBody>, JsonRejection>,
) -> AppResult<StatusCode> {
    let request = ProvisionRequest::try_from(json_body(payload)?).map_err(|e| {
        warn!("Rejected provisioning request: {}", e);
        e
    })?;

    state.provisioner.provision(&request).await?;
    Ok(StatusCode::CREATED)
}

/// Seal a secret for a caller-supplied key and hand the box back
pub async fn encode_secret(
    payload: Result<Json<EncodeSecretBody>, JsonRejection>,
) -> AppResult<Json<EncodedSecretResponse>> {
    let request = EncodeRequest::from(json_body(payload)?);

    let encoded_secret = crypto::encode_secret(request.secret(), request.public_key()).map_err(|e| {
        error!("Encoding with caller-supplied key failed: {}", e);
        AppError::from(e)
    })?;

    Ok(Json(EncodedSecretResponse { encoded_secret }))
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/secret", post(create_secret))
        .route("/api/v1/secret/", post(create_secret))
        .route("/api/v1/secret/encode", post(encode_secret))
        .route("/api/v1/ping", get(ping))
        .route("/api/ping", get(ping))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
