//! Network endpoints
//!
//! Listing, inspection and download of archived networks, plus the owner
//! operations: submit, edit and delete.

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Multipart, Path, State},
    http::header,
    response::IntoResponse,
    Extension, Json,
};
use chrono::SecondsFormat;
use netarchive_common::db::{networks, tags, Owner};
use netarchive_common::tags::parse_tag_list;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::API_VERSION;
use crate::archive::{NetworkDetails, NetworkEdit, Submission};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct TagsResponse {
    #[serde(rename = "_version")]
    pub version: &'static str,
    pub tags: Vec<String>,
}

/// GET /api/v1/tags
pub async fn list_tags(State(state): State<AppState>) -> ApiResult<Json<TagsResponse>> {
    Ok(Json(TagsResponse {
        version: API_VERSION,
        tags: tags::list_tags(&state.db).await?,
    }))
}

#[derive(Debug, Serialize)]
pub struct UuidsResponse {
    #[serde(rename = "_version")]
    pub version: &'static str,
    pub uuids: Vec<Uuid>,
}

/// GET /api/v1/networks
///
/// Every archived network, including ones still unavailable to search.
pub async fn list_networks(State(state): State<AppState>) -> ApiResult<Json<UuidsResponse>> {
    let uuids = networks::list_networks(&state.db)
        .await?
        .into_iter()
        .map(|n| n.id)
        .collect();
    Ok(Json(UuidsResponse {
        version: API_VERSION,
        uuids,
    }))
}

/// Full description of one network
#[derive(Debug, Serialize)]
pub struct NetworkInfo {
    #[serde(rename = "_version")]
    pub version: &'static str,
    pub uuid: Uuid,
    pub uploaded: String,
    pub title: String,
    pub description: String,
    pub owner: Option<String>,
    pub available: bool,
    pub tags: Vec<String>,
    /// Latest value recorded under each key
    pub metadata: BTreeMap<String, String>,
}

impl From<NetworkDetails> for NetworkInfo {
    fn from(details: NetworkDetails) -> Self {
        let network = details.network;
        Self {
            version: API_VERSION,
            uuid: network.id,
            uploaded: network.uploaded_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            title: network.title,
            description: network.description,
            owner: details.owner.map(|o| o.email),
            available: network.available,
            tags: details.tags,
            metadata: details
                .metadata
                .into_iter()
                .map(|entry| (entry.key, entry.value))
                .collect(),
        }
    }
}

/// GET /api/v1/network/info/:id
pub async fn network_info(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<NetworkInfo>> {
    let Path(id) = path?;
    let details = state.archive.details(id).await?;
    Ok(Json(details.into()))
}

/// GET /api/v1/network/raw/:id
///
/// The backing file exactly as uploaded.
pub async fn network_raw(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = path?;
    let (network, data) = state.archive.raw(id).await?;

    let content_type = if network.filename.ends_with(".gz") {
        "application/gzip"
    } else {
        "text/plain; charset=utf-8"
    };
    let headers = [
        (header::CONTENT_TYPE, content_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", network.filename),
        ),
    ];
    Ok((headers, data))
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    #[serde(rename = "_version")]
    pub version: &'static str,
    pub uuid: Uuid,
    /// Metadata rows derived on submission
    pub derived: usize,
    /// Analysers that could not contribute
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_analysers: Vec<&'static str>,
}

/// POST /api/v1/submit
///
/// Multipart form with a `raw` file part and optional `filename`, `title`,
/// `description` and comma-separated `tags` text parts. Without a
/// `filename` part the file part's own name is used.
pub async fn submit_network(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    mut multipart: Multipart,
) -> ApiResult<Json<SubmitResponse>> {
    let mut submission = Submission::default();
    let mut filename: Option<String> = None;
    let mut upload_name: Option<String> = None;
    let mut received_file = false;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "raw" => {
                upload_name = field.file_name().map(str::to_string);
                submission.data = field.bytes().await?.to_vec();
                received_file = true;
            }
            "filename" => filename = Some(field.text().await?),
            "title" => submission.title = field.text().await?,
            "description" => submission.description = field.text().await?,
            "tags" => submission.tags = parse_tag_list(&field.text().await?),
            _ => {}
        }
    }

    if !received_file {
        return Err(ApiError::BadRequest("Missing 'raw' file part".to_string()));
    }
    submission.filename = filename
        .or(upload_name)
        .ok_or_else(|| ApiError::BadRequest("Missing 'filename'".to_string()))?;

    let (network, report) = state.archive.submit(&owner, submission).await?;
    Ok(Json(SubmitResponse {
        version: API_VERSION,
        uuid: network.id,
        derived: report.rows.len(),
        failed_analysers: report.failures.iter().map(|f| f.analyser).collect(),
    }))
}

/// Body of an edit request; absent fields are left unchanged
#[derive(Debug, Default, Deserialize)]
pub struct EditRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// PATCH /api/v1/network/:id
pub async fn edit_network(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<EditRequest>, JsonRejection>,
) -> ApiResult<Json<NetworkInfo>> {
    let Path(id) = path?;
    let Json(request) = body?;

    state
        .archive
        .edit(
            &owner,
            id,
            NetworkEdit {
                title: request.title,
                description: request.description,
                tags: request.tags,
            },
        )
        .await?;

    let details = state.archive.details(id).await?;
    Ok(Json(details.into()))
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    #[serde(rename = "_version")]
    pub version: &'static str,
    pub uuid: Uuid,
    pub deleted: bool,
}

/// DELETE /api/v1/network/:id
pub async fn delete_network(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<DeleteResponse>> {
    let Path(id) = path?;
    state.archive.delete(&owner, id).await?;
    Ok(Json(DeleteResponse {
        version: API_VERSION,
        uuid: id,
        deleted: true,
    }))
}
