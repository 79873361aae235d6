use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

const ALLOWED_CLASSIFICATIONS: [&str; 2] = ["Personal", "Business"];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub organisation_id: Uuid,
    #[serde(rename = "type")]
    pub account_type: String,
    #[serde(default)]
    pub version: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Account>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error_message: String,
}

#[derive(Deserialize)]
pub struct DeleteParams {
    pub version: i64,
}

/// A failed request: a status plus an optional `{"error_message": ...}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: Option<String>,
}

impl ApiError {
    fn with_message(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: Some(message.into()),
        }
    }

    fn bare(status: StatusCode) -> Self {
        Self {
            status,
            message: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.message {
            Some(error_message) => (self.status, Json(ErrorBody { error_message })).into_response(),
            None => self.status.into_response(),
        }
    }
}

pub type Db = Arc<RwLock<HashMap<Uuid, Account>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/v1/organisation/accounts", post(create_account))
        .route(
            "/v1/organisation/accounts/{id}",
            get(fetch_account).delete(delete_account),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn fetch_account(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope>, ApiError> {
    let accounts = db.read().await;
    match accounts.get(&id) {
        Some(account) => Ok(Json(Envelope {
            data: Some(account.clone()),
        })),
        None => Err(ApiError::with_message(
            StatusCode::NOT_FOUND,
            format!("record {id} does not exist"),
        )),
    }
}

async fn create_account(
    State(db): State<Db>,
    body: Result<Json<Envelope>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope>), ApiError> {
    let Json(envelope) =
        body.map_err(|e| ApiError::with_message(StatusCode::BAD_REQUEST, e.body_text()))?;
    let mut account = envelope.data.ok_or_else(|| {
        ApiError::with_message(
            StatusCode::BAD_REQUEST,
            "validation failure list:\ndata in body is required",
        )
    })?;
    validate_classification(&account)?;

    let mut accounts = db.write().await;
    if accounts.contains_key(&account.id) {
        return Err(ApiError::with_message(
            StatusCode::CONFLICT,
            "Account cannot be created as it violates a duplicate constraint",
        ));
    }
    if account.version.is_none() {
        account.version = Some(0);
    }
    accounts.insert(account.id, account.clone());
    tracing::info!(id = %account.id, "account created");

    Ok((
        StatusCode::CREATED,
        Json(Envelope {
            data: Some(account),
        }),
    ))
}

async fn delete_account(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Query(params): Query<DeleteParams>,
) -> Result<StatusCode, ApiError> {
    let mut accounts = db.write().await;
    let stored = accounts
        .get(&id)
        .ok_or_else(|| ApiError::bare(StatusCode::NOT_FOUND))?;
    if stored.version != Some(params.version) {
        return Err(ApiError::with_message(StatusCode::CONFLICT, "invalid version"));
    }
    accounts.remove(&id);
    tracing::info!(%id, version = params.version, "account deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn validate_classification(account: &Account) -> Result<(), ApiError> {
    let classification = account
        .attributes
        .as_ref()
        .and_then(|attrs| attrs.get("account_classification"))
        .and_then(|value| value.as_str());
    match classification {
        Some(value) if !ALLOWED_CLASSIFICATIONS.contains(&value) => Err(ApiError::with_message(
            StatusCode::BAD_REQUEST,
            "validation failure list:\nvalidation failure list:\nvalidation failure list:\naccount_classification in body should be one of [Personal Business]",
        )),
        _ => Ok(()),
    }
}
