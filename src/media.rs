use crate::store::BlobStore;
use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

/// Uploads run in fixed-size batches; within a batch every upload is in
/// flight at once, so total concurrency is bounded here regardless of input
/// size.
pub const UPLOAD_CONCURRENCY: usize = 3;

/// A candidate file from the presentation layer. Anything whose content
/// type is not `image/*` is filtered out before it counts toward anything.
#[derive(Debug, Clone)]
pub struct UploadCandidate {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadFailure {
    pub file_name: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct UploadOutcome {
    pub uploaded_paths: Vec<String>,
    pub errors: Vec<UploadFailure>,
}

/// Uploads image files under `key_prefix` with per-file failure isolation:
/// one failed upload never cancels its siblings, it becomes an entry in the
/// outcome's error list. After each batch the progress callback fires once
/// with `(completed, total)`; completed counts attempts, so it ends at
/// `total` even when some files failed.
///
/// Empty input (or all-non-image input) returns immediately without
/// contacting the store.
pub async fn upload_images<F>(
    blobs: &dyn BlobStore,
    key_prefix: &str,
    files: Vec<UploadCandidate>,
    mut on_progress: F,
) -> UploadOutcome
where
    F: FnMut(usize, usize),
{
    let files: Vec<UploadCandidate> = files
        .into_iter()
        .filter(|file| file.content_type.starts_with("image/"))
        .collect();
    if files.is_empty() {
        return UploadOutcome::default();
    }

    let total = files.len();
    let mut completed = 0usize;
    let mut outcome = UploadOutcome::default();

    for batch in files.chunks(UPLOAD_CONCURRENCY) {
        let uploads = batch.iter().map(|file| {
            let path = storage_path(key_prefix, &file.file_name);
            async move {
                let result = blobs.upload(&path, file.bytes.clone()).await;
                (file.file_name.clone(), path, result)
            }
        });
        for (file_name, path, result) in join_all(uploads).await {
            completed += 1;
            match result {
                Ok(()) => outcome.uploaded_paths.push(path),
                Err(err) => {
                    warn!(file = %file_name, error = %err, "image upload failed");
                    outcome.errors.push(UploadFailure {
                        file_name,
                        message: err.to_string(),
                    });
                }
            }
        }
        on_progress(completed, total);
    }

    outcome
}

/// Collision-resistant storage path: millisecond timestamp, random suffix,
/// and the original name reduced to a safe character set.
fn storage_path(prefix: &str, original_name: &str) -> String {
    let safe_name: String = original_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{prefix}/{}-{}-{safe_name}",
        Utc::now().timestamp_millis(),
        &suffix[..8]
    )
}
