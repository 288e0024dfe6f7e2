//! HTTP API server for the Attestor node.
//!
//! Provides REST endpoints for the registration workflow, credential offers,
//! proof requests, DID resolution and reactor bookkeeping.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use attestor_agent::{
    AgentError, CredentialAttribute, CredentialExchangeRecord, DidDocument, ProofExchangeRecord,
};
use attestor_core::RegistrationStage;
use attestor_issuer::{ExchangeProgress, IssuerError, ProofQuery};

use crate::state::NodeState;

// --- Request / response types ---

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub version: String,
    pub label: String,
    pub stage: RegistrationStage,
    pub uptime_secs: u64,
    pub in_flight_exchanges: usize,
    pub completed_exchanges: usize,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityResponse {
    pub did: Option<String>,
    pub schema_id: Option<String>,
    pub credential_definition_id: Option<String>,
    pub stage: RegistrationStage,
}

#[derive(Deserialize)]
pub struct ImportDidRequest {
    pub seed: String,
    pub did: String,
    #[serde(default)]
    pub overwrite: bool,
}

#[derive(Serialize)]
pub struct ImportDidResponse {
    pub did: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSchemaRequest {
    pub issuer_did: Option<String>,
    pub attribute_names: Option<Vec<String>>,
    pub name: Option<String>,
    pub version: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSchemaResponse {
    pub schema_id: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RegisterCredentialDefinitionRequest {
    pub issuer_did: Option<String>,
    pub schema_id: Option<String>,
    pub tag: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterCredentialDefinitionResponse {
    pub credential_definition_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferCredentialRequest {
    pub connection_id: String,
    #[serde(default)]
    pub attributes: Vec<CredentialAttribute>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestProofRequest {
    pub connection_id: String,
    #[serde(flatten)]
    pub query: ProofQuery,
}

#[derive(Serialize)]
pub struct DidsResponse {
    pub dids: Vec<String>,
    pub count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedExchange {
    pub exchange_id: String,
    pub progress: ExchangeProgress,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactorResponse {
    pub exchanges: Vec<TrackedExchange>,
    pub in_flight: usize,
    pub completed: usize,
    pub failed_accepts: usize,
    pub resyncs: usize,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

/// Issuer error rendered as a status code plus `{error, kind}` body.
pub struct ApiError(pub IssuerError);

impl From<IssuerError> for ApiError {
    fn from(e: IssuerError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            IssuerError::MissingDid
            | IssuerError::MissingSchema
            | IssuerError::MissingCredentialDefinition
            | IssuerError::StaleIdentifier { .. } => StatusCode::CONFLICT,
            IssuerError::InvalidPredicate(_)
            | IssuerError::InvalidRequest(_)
            | IssuerError::Core(_)
            | IssuerError::Agent(AgentError::InvalidRequest(_)) => StatusCode::BAD_REQUEST,
            IssuerError::Agent(AgentError::NotFound(_)) => StatusCode::NOT_FOUND,
            IssuerError::ImportError(_)
            | IssuerError::SchemaRegistrationError { .. }
            | IssuerError::CredentialDefinitionRegistrationError { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            IssuerError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            IssuerError::AcceptError(_) | IssuerError::Agent(_) => StatusCode::BAD_GATEWAY,
            IssuerError::InvariantViolation(_) | IssuerError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = self.0.kind(), error = %self.0, "request failed");
        } else {
            tracing::debug!(kind = self.0.kind(), error = %self.0, "request rejected");
        }
        let body = ErrorResponse {
            error: self.0.to_string(),
            kind: self.0.kind().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// --- Handlers ---

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
    })
}

async fn handle_status(State(state): State<Arc<NodeState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        label: state.label.clone(),
        stage: state.registry.stage(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        in_flight_exchanges: state.reactor.in_flight(),
        completed_exchanges: state.reactor.completed(),
    })
}

async fn handle_identity(State(state): State<Arc<NodeState>>) -> Json<IdentityResponse> {
    let record = state.registry.get();
    Json(IdentityResponse {
        stage: record.stage(),
        did: record.did.map(|d| d.to_string()),
        schema_id: record.schema_id.map(|s| s.to_string()),
        credential_definition_id: record.credential_definition_id.map(|c| c.to_string()),
    })
}

async fn handle_created_dids(State(state): State<Arc<NodeState>>) -> ApiResult<DidsResponse> {
    let dids = state.workflow.created_dids().await?;
    let count = dids.len();
    Ok(Json(DidsResponse { dids, count }))
}

async fn handle_resolve_did(
    State(state): State<Arc<NodeState>>,
    Path(did): Path<String>,
) -> ApiResult<DidDocument> {
    Ok(Json(state.workflow.resolve_did(&did).await?))
}

async fn handle_import_did(
    State(state): State<Arc<NodeState>>,
    Json(req): Json<ImportDidRequest>,
) -> ApiResult<ImportDidResponse> {
    let did = state
        .workflow
        .import_did(&req.seed, &req.did, req.overwrite)
        .await?;
    Ok(Json(ImportDidResponse {
        did: did.to_string(),
    }))
}

async fn handle_register_schema(
    State(state): State<Arc<NodeState>>,
    body: Option<Json<RegisterSchemaRequest>>,
) -> ApiResult<RegisterSchemaResponse> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let defaults = &state.registration;
    let issuer_did = req
        .issuer_did
        .or_else(|| state.registry.did().map(|d| d.to_string()))
        .unwrap_or_default();
    let schema_id = state
        .workflow
        .register_schema(
            &issuer_did,
            req.attribute_names
                .unwrap_or_else(|| defaults.attribute_names.clone()),
            req.name.as_deref().unwrap_or(&defaults.schema_name),
            req.version.as_deref().unwrap_or(&defaults.schema_version),
        )
        .await?;
    Ok(Json(RegisterSchemaResponse {
        schema_id: schema_id.to_string(),
    }))
}

async fn handle_register_credential_definition(
    State(state): State<Arc<NodeState>>,
    body: Option<Json<RegisterCredentialDefinitionRequest>>,
) -> ApiResult<RegisterCredentialDefinitionResponse> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let record = state.registry.get();
    let issuer_did = req
        .issuer_did
        .or_else(|| record.did.map(|d| d.to_string()))
        .unwrap_or_default();
    let schema_id = req
        .schema_id
        .or_else(|| record.schema_id.map(|s| s.to_string()))
        .unwrap_or_default();
    let tag = req
        .tag
        .unwrap_or_else(|| state.registration.credential_definition_tag.clone());
    let credential_definition_id = state
        .workflow
        .register_credential_definition(&issuer_did, &schema_id, &tag)
        .await?;
    Ok(Json(RegisterCredentialDefinitionResponse {
        credential_definition_id: credential_definition_id.to_string(),
    }))
}

async fn handle_offer_credential(
    State(state): State<Arc<NodeState>>,
    Json(req): Json<OfferCredentialRequest>,
) -> ApiResult<CredentialExchangeRecord> {
    let record = state
        .issuance
        .offer_credential(&req.connection_id, req.attributes)
        .await?;
    Ok(Json(record))
}

async fn handle_credential_exchanges(
    State(state): State<Arc<NodeState>>,
) -> ApiResult<Vec<CredentialExchangeRecord>> {
    Ok(Json(state.issuance.exchanges().await?))
}

async fn handle_request_proof(
    State(state): State<Arc<NodeState>>,
    Json(req): Json<RequestProofRequest>,
) -> ApiResult<ProofExchangeRecord> {
    let query = if req.query.is_empty() {
        ProofQuery::entrance_check()
    } else {
        req.query
    };
    let record = state.proofs.submit(&req.connection_id, &query).await?;
    Ok(Json(record))
}

async fn handle_proof_exchanges(
    State(state): State<Arc<NodeState>>,
) -> ApiResult<Vec<ProofExchangeRecord>> {
    Ok(Json(state.proofs.exchanges().await?))
}

async fn handle_reactor(State(state): State<Arc<NodeState>>) -> Json<ReactorResponse> {
    let exchanges = state
        .reactor
        .tracked()
        .into_iter()
        .map(|(exchange_id, progress)| TrackedExchange {
            exchange_id,
            progress,
        })
        .collect();
    Json(ReactorResponse {
        exchanges,
        in_flight: state.reactor.in_flight(),
        completed: state.reactor.completed(),
        failed_accepts: state.reactor.failed_accepts(),
        resyncs: state.reactor.resyncs(),
    })
}

// --- Server ---

pub fn build_router(state: Arc<NodeState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(handle_health))
        .route("/api/v1/status", get(handle_status))
        .route("/api/v1/identity", get(handle_identity))
        .route("/api/v1/dids", get(handle_created_dids))
        .route("/api/v1/dids/import", post(handle_import_did))
        .route("/api/v1/dids/{did}", get(handle_resolve_did))
        .route("/api/v1/schemas", post(handle_register_schema))
        .route(
            "/api/v1/credential-definitions",
            post(handle_register_credential_definition),
        )
        .route("/api/v1/credentials/offer", post(handle_offer_credential))
        .route("/api/v1/credentials", get(handle_credential_exchanges))
        .route("/api/v1/proofs/request", post(handle_request_proof))
        .route("/api/v1/proofs", get(handle_proof_exchanges))
        .route("/api/v1/reactor", get(handle_reactor))
        .with_state(state)
}

pub async fn serve(listener: tokio::net::TcpListener, state: Arc<NodeState>) -> anyhow::Result<()> {
    let app = build_router(state);
    let local_addr = listener.local_addr()?;
    tracing::info!(%local_addr, "HTTP API server started");
    axum::serve(listener, app).await?;
    Ok(())
}
