//! Order lookup endpoints.
//!
//! - `GET /order?uid=<uid>`
//! - `GET /order/{uid}`
//!
//! A hit returns the payload exactly as it was ingested, with
//! `Content-Type: application/json`. Lookups read the cache only.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OrderQuery {
    pub uid: Option<String>,
}

/// GET /order?uid=<uid>
pub async fn get_order_by_query(
    State(state): State<AppState>,
    Query(query): Query<OrderQuery>,
) -> ApiResult<Response> {
    let uid = query.uid.ok_or_else(|| ApiError::missing_field("uid"))?;
    lookup(&state, &uid)
}

/// GET /order/{uid}
pub async fn get_order_by_path(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> ApiResult<Response> {
    lookup(&state, &uid)
}

/// The UID is matched exactly as given. Surrounding whitespace is part of
/// the key; a blank UID can never be stored, so it is rejected up front.
fn lookup(state: &AppState, uid: &str) -> ApiResult<Response> {
    if uid.trim().is_empty() {
        return Err(ApiError::invalid_input("uid must not be empty"));
    }

    let data = state.service.get(uid).map_err(|e| {
        tracing::debug!(uid, "Order lookup missed");
        ApiError::from(e)
    })?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        data.to_vec(),
    )
        .into_response())
}
