//! Search endpoint
//!
//! POST /api/v1/search runs a [`NetworkQuery`] and draws from its results
//! according to the request's sampling fields. The applied query is echoed
//! back so a client can refine it.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use super::API_VERSION;
use crate::error::{ApiError, ApiResult};
use crate::query::{ConstraintSpec, NetworkQuery, SampleOutcome, Sampling};
use crate::AppState;

/// Search request body
#[derive(Debug, Default, Deserialize)]
pub struct SearchRequest {
    /// API version the client speaks; checked when present
    #[serde(rename = "_version")]
    pub version: Option<Value>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, alias = "metadata")]
    pub constraints: Vec<ConstraintSpec>,
    /// Networks to draw; absent or non-positive returns every match
    pub n: Option<i64>,
    /// Minimum number of matches required before drawing
    pub pool: Option<i64>,
    #[serde(default)]
    pub exclude: Vec<Uuid>,
}

impl SearchRequest {
    fn check_version(&self) -> Result<(), ApiError> {
        let requested = match &self.version {
            None => return Ok(()),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(other) => other.to_string(),
        };
        if requested != API_VERSION {
            return Err(ApiError::BadRequest(format!(
                "Unsupported API version {} (server speaks {})",
                requested, API_VERSION
            )));
        }
        Ok(())
    }

    fn sampling(&self) -> Sampling {
        Sampling::new(self.n.unwrap_or(0), self.pool).excluding(self.exclude.iter().copied())
    }
}

/// Search response body
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    #[serde(rename = "_version")]
    pub version: &'static str,
    /// Normalised tags the query applied
    pub tags: Vec<String>,
    /// Constraints the query applied
    pub constraints: Vec<ConstraintSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuids: Option<Vec<Uuid>>,
    /// Why nothing was returned, when the pool was too small
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// POST /api/v1/search
pub async fn search(
    State(state): State<AppState>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> ApiResult<Json<SearchResponse>> {
    let Json(request) = body?;
    request.check_version()?;

    // Reject bad operators and pool sizes before touching the store
    let sampling = request.sampling();
    sampling.validate()?;
    let query = NetworkQuery::from_specs(&request.tags, request.constraints.clone())?;

    let candidates = query.evaluate(&state.db).await?;
    let matched = candidates.len();
    let outcome = sampling.draw(candidates, &mut rand::thread_rng())?;

    let (uuids, message) = match outcome {
        SampleOutcome::Drawn(networks) => (Some(networks.iter().map(|n| n.id).collect::<Vec<_>>()), None),
        SampleOutcome::InsufficientPool {
            required,
            available,
        } => (
            None,
            Some(format!(
                "Only {} networks match after exclusions, fewer than the pool of {} requested",
                available, required
            )),
        ),
    };

    info!(
        tags = ?query.tags(),
        constraints = ?query.describe(),
        matched,
        returned = uuids.as_ref().map_or(0, Vec::len),
        "Search"
    );

    Ok(Json(SearchResponse {
        version: API_VERSION,
        tags: query.tags().to_vec(),
        constraints: query.constraints().iter().map(|c| c.to_spec()).collect(),
        uuids,
        message,
    }))
}
