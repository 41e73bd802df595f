//! Activation-token endpoint stub.
//!
//! Token issuance and validation are not implemented yet; the endpoint
//! acknowledges the request with an empty body so the registration flow
//! can be exercised end to end.

use axum::{Json, extract::Path};
use serde_json::{Value, json};

/// `POST /api/v1/activation/{token_id}`
pub async fn activate(Path(_token_id): Path<String>) -> Json<Value> {
    Json(json!({}))
}
