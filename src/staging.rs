// 📂 File Staging - uploaded photos on local disk before deposit
// Names follow `{client}_{n}.jpg`; extra photos beyond the direct limit also get collages

use crate::collage;
use crate::error::{DepotError, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Photos past this count are additionally grouped into collages
pub const DIRECT_LIMIT: usize = 12;

/// Photos per collage
pub const COLLAGE_GROUP: usize = 3;

const ACCEPTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// A photo as received from the form: original file name and raw bytes
#[derive(Debug, Clone)]
pub struct UploadedPhoto {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadedPhoto {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        UploadedPhoto {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Only JPEG and PNG uploads are accepted
    pub fn has_accepted_extension(&self) -> bool {
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| ACCEPTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }
}

/// Client name made safe for use as a file name prefix
pub fn sanitize_client_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

pub fn staged_file_name(client_name: &str, index: usize) -> String {
    format!("{}_{}.jpg", sanitize_client_name(client_name), index)
}

/// Write every photo to `dir` as `{client}_{n}.jpg`, n starting at 1.
///
/// Existing files with the same name are overwritten.
pub async fn stage_photos(
    dir: &Path,
    client_name: &str,
    photos: &[UploadedPhoto],
) -> Result<Vec<PathBuf>> {
    if let Some(bad) = photos.iter().find(|p| !p.has_accepted_extension()) {
        return Err(DepotError::Business(format!(
            "{} n'est pas un fichier JPEG ou PNG",
            bad.file_name
        )));
    }

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| DepotError::io(dir, e))?;

    let mut staged = Vec::with_capacity(photos.len());
    for (idx, photo) in photos.iter().enumerate() {
        let path = dir.join(staged_file_name(client_name, idx + 1));
        tokio::fs::write(&path, &photo.bytes)
            .await
            .map_err(|e| DepotError::io(&path, e))?;
        staged.push(path);
    }

    info!(count = staged.len(), dir = %dir.display(), "photos staged");
    Ok(staged)
}

// ============================================================================
// COLLAGE PLANNING
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollageGroup {
    /// 0-based index of the first source in the staged list
    pub start: usize,
    pub sources: Vec<PathBuf>,
    pub output: PathBuf,
}

/// Groups of up to three photos starting at index 12; the last group may be short
pub fn plan_collages(dir: &Path, staged: &[PathBuf]) -> Vec<CollageGroup> {
    if staged.len() <= DIRECT_LIMIT {
        return Vec::new();
    }

    (DIRECT_LIMIT..staged.len())
        .step_by(COLLAGE_GROUP)
        .map(|start| {
            let end = (start + COLLAGE_GROUP).min(staged.len());
            CollageGroup {
                start,
                sources: staged[start..end].to_vec(),
                output: dir.join(format!("collage_{}.jpg", start)),
            }
        })
        .collect()
}

/// Build the planned collages and return the full upload list:
/// staged photos first, then collages in group order
pub async fn with_collages(dir: &Path, staged: Vec<PathBuf>) -> Result<(Vec<PathBuf>, usize)> {
    let groups = plan_collages(dir, &staged);
    let built = groups.len();

    let mut files = staged;
    for group in groups {
        let path = tokio::task::spawn_blocking(move || {
            collage::build_collage(&group.sources, &group.output)
        })
        .await
        .map_err(|e| DepotError::Business(format!("collage task failed: {}", e)))??;
        files.push(path);
    }

    Ok((files, built))
}
