//! Entry JSON APIs: producer intake and read access to the log table.

use crate::{
  app::AppState,
  db::{entry_store::EntryFilter, retention::ExecutionContext},
  logger::NewEntry,
  models::{entry::api_entry::ApiEntry, severity::level::Severity},
};
use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::error;

#[derive(Debug, Serialize)]
pub struct CreateResponse {
  pub id: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub since: Option<i64>,
  pub severity: Option<String>,
  pub facility: Option<String>,
  pub run_id: Option<String>,
  pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RunParams {
  pub limit: Option<u32>,
}

/// Translate query parameters into a store filter and a row limit.
pub fn compute_list_params(p: &ListParams) -> Result<(EntryFilter, i64), String> {
  let severity = match p.severity.as_deref().map(str::trim) {
    None | Some("") => None,
    Some(raw) => Some(raw.parse::<Severity>()?.code()),
  };
  let filter = EntryFilter {
    since: p.since,
    severity,
    facility: p.facility.clone().filter(|f| !f.is_empty()),
    run_id: p.run_id.clone().filter(|r| !r.is_empty()),
    ..EntryFilter::default()
  };
  let limit = p.limit.unwrap_or(100).clamp(1, 500);
  Ok((filter, i64::from(limit)))
}

pub async fn create_entry(
  State(state): State<AppState>,
  Json(req): Json<NewEntry>,
) -> impl IntoResponse {
  if req.facility.trim().is_empty() {
    return (StatusCode::BAD_REQUEST, "field 'facility' must not be empty").into_response();
  }
  let mut ctx = ExecutionContext::new();
  match state.devlog.log(&mut ctx, req).await {
    Ok(Some(id)) => (StatusCode::CREATED, Json(CreateResponse { id })).into_response(),
    Ok(None) => StatusCode::NO_CONTENT.into_response(),
    Err(e) => {
      error!("create_entry error: {e}");
      (StatusCode::INTERNAL_SERVER_ERROR, "db error").into_response()
    }
  }
}

pub async fn list_entries(
  State(state): State<AppState>,
  Query(params): Query<ListParams>,
) -> impl IntoResponse {
  let (filter, limit) = match compute_list_params(&params) {
    Ok(parsed) => parsed,
    Err(e) => return (StatusCode::BAD_REQUEST, e).into_response(),
  };
  match state.store().list(&filter, limit).await {
    Ok(entries) => {
      let out: Vec<ApiEntry> = entries.into_iter().map(ApiEntry::from).collect();
      Json(out).into_response()
    }
    Err(e) => {
      error!("list_entries error: {e}");
      (StatusCode::INTERNAL_SERVER_ERROR, "db error").into_response()
    }
  }
}

pub async fn list_runs(
  State(state): State<AppState>,
  Query(params): Query<RunParams>,
) -> impl IntoResponse {
  let limit = params.limit.unwrap_or(50).clamp(1, 500);
  match state.store().select_grouped_run_ids(i64::from(limit)).await {
    Ok(runs) => Json(runs).into_response(),
    Err(e) => {
      error!("list_runs error: {e}");
      (StatusCode::INTERNAL_SERVER_ERROR, "db error").into_response()
    }
  }
}

pub async fn list_facilities(State(state): State<AppState>) -> impl IntoResponse {
  match state.store().select_distinct_facilities().await {
    Ok(facilities) => Json(facilities).into_response(),
    Err(e) => {
      error!("list_facilities error: {e}");
      (StatusCode::INTERNAL_SERVER_ERROR, "db error").into_response()
    }
  }
}
