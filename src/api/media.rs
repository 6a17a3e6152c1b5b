/// Media upload, download and delete endpoints
use crate::{
    context::{AppContext, Identity},
    encoding,
    error::{VaultError, VaultResult},
    media::{Media, MediaId, MediaMeta},
};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

/// Upload response entry for one stored file.
#[derive(Debug, Serialize, Deserialize)]
pub struct MediaIdResponse {
    pub id: String,
    pub filename: String,
}

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    width: Option<String>,
}

/// Store every file of a multipart upload.
///
/// Each file is processed on its own task; the first failure aborts the
/// remaining in-flight tasks. Work completed before the failure is not
/// rolled back, a retry of the same upload reconverges.
pub async fn upload(
    State(ctx): State<AppContext>,
    Extension(identity): Extension<Identity>,
    mut multipart: Multipart,
) -> VaultResult<Json<Vec<MediaIdResponse>>> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| VaultError::InvalidInput(format!("multipart form: {e}")))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| VaultError::InvalidInput(format!("read {filename}: {e}")))?;

        files.push((filename, data));
    }

    if files.is_empty() {
        return Err(VaultError::InvalidInput("no multipart files".to_string()));
    }

    let mut tasks = JoinSet::new();

    for (filename, data) in files {
        let images = ctx.images.clone();
        let owner = identity.username.clone();

        tasks.spawn(async move {
            // Cheap checks before the content is touched
            images.check_upload_constraints(&filename, data.len() as u64, None)?;
            let mime = images.check_upload_constraints(&filename, data.len() as u64, Some(&data))?;

            let media = Media::new(data.to_vec(), MediaMeta::draft(filename.as_str(), owner, mime));
            images.store(&media).await?;

            tracing::debug!(
                id = %media.id(),
                filename = %filename,
                size = media.size(),
                "media uploaded"
            );

            Ok::<_, VaultError>(MediaIdResponse {
                id: media.id().to_string(),
                filename,
            })
        });
    }

    let mut responses = Vec::new();
    let mut failure: Option<VaultError> = None;

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(resp)) => responses.push(resp),
            Ok(Err(e)) => {
                if failure.is_none() {
                    failure = Some(e);
                    tasks.abort_all();
                }
            }
            Err(join_err) if join_err.is_cancelled() => {}
            Err(join_err) => {
                if failure.is_none() {
                    failure = Some(VaultError::Internal(format!("upload task: {join_err}")));
                    tasks.abort_all();
                }
            }
        }
    }

    if let Some(e) = failure {
        return Err(e);
    }

    responses.sort_by(|a, b| a.id.cmp(&b.id));

    Ok(Json(responses))
}

/// Serve a media file, optionally resized to the requested width.
pub async fn download(
    State(ctx): State<AppContext>,
    Extension(identity): Extension<Identity>,
    Path(media_id): Path<String>,
    Query(params): Query<DownloadParams>,
) -> VaultResult<Response> {
    let media_id = normalize_id(&media_id)?;

    let width = match params.width.as_deref() {
        None | Some("") => 0,
        Some(raw) => raw
            .parse::<u32>()
            .map_err(|e| VaultError::InvalidInput(format!("width: {e}")))?,
    };

    let media = ctx
        .images
        .fetch(&identity.username, &media_id, width)
        .await
        .map_err(mask_unauthorized)?;

    let mime_type = media.mime_type().to_string();
    let size = media.size();
    let filename = media.meta().filename.clone();

    let mut response = (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime_type),
            (header::CONTENT_LENGTH, size.to_string()),
        ],
        media.into_bytes(),
    )
        .into_response();

    if ctx.config.content_disposition_download {
        if let Ok(value) =
            header::HeaderValue::from_str(&format!("attachment; filename={filename}"))
        {
            response
                .headers_mut()
                .insert(header::CONTENT_DISPOSITION, value);
        }
    }

    Ok(response)
}

/// Delete a media file owned by the caller.
pub async fn remove(
    State(ctx): State<AppContext>,
    Extension(identity): Extension<Identity>,
    Path(media_id): Path<String>,
) -> VaultResult<StatusCode> {
    let media_id = normalize_id(&media_id)?;

    ctx.images
        .delete(&identity.username, &media_id)
        .await
        .map_err(mask_unauthorized)?;

    Ok(StatusCode::OK)
}

fn normalize_id(raw: &str) -> VaultResult<MediaId> {
    let normalized = encoding::normalize(raw);

    if normalized.is_empty() {
        return Err(VaultError::InvalidInput("missing media id".to_string()));
    }

    Ok(MediaId::from(normalized))
}

/// Ownership failures leave media endpoints as NotFound; everything else
/// passes through.
fn mask_unauthorized(err: VaultError) -> VaultError {
    if matches!(err, VaultError::Unauthorized(_)) {
        VaultError::NotFound("media".to_string())
    } else {
        err
    }
}
