// decision_core/src/artifact_store.rs

use crate::contracts::{AnalysisError, AnalysisResult};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// # NDOC
/// component: `artifact_store`
/// purpose: Handle to a persisted binary. Consumers hold only the handle;
///          the store exclusively owns the file bytes.
/// invariants:
///   - On success at least one of `url` / `data_uri` is non-empty.
///   - `filename` is epoch-unique and immutable once minted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub filename: String,
    pub url: Option<String>,
    pub data_uri: Option<String>,
    pub width: u32,
    pub height: u32,
    pub error: Option<String>,
}

impl ArtifactRef {
    pub fn is_usable(&self) -> bool {
        self.url.is_some() || self.data_uri.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactHealth {
    pub exists: bool,
    pub is_dir: bool,
    pub path: String,
    pub sample_files: Vec<String>,
}

/// # NDOC
/// component: `artifact_store`
/// purpose: Persist screenshots and mint stable URLs for them.
/// invariants:
///   - Construction fails fatally if the directory cannot be written to.
///   - `put` never lets an error cross the component boundary; failures come
///     back as a handle with `url=None, data_uri=None` and an error string.
pub struct ArtifactStore {
    dir: PathBuf,
    public_base_url: Option<String>,
}

impl ArtifactStore {
    /// Scoped acquisition of the writable directory. `dir = None` resolves to
    /// the OS temp dir + `artifacts`.
    pub fn new(dir: Option<PathBuf>, public_base_url: Option<String>) -> AnalysisResult<Self> {
        let dir = dir.unwrap_or_else(|| std::env::temp_dir().join("artifacts"));
        fs::create_dir_all(&dir).map_err(|e| {
            AnalysisError::internal(format!(
                "artifact directory '{}' is not creatable: {}",
                dir.display(),
                e
            ))
        })?;

        // Probe writability up front rather than at first screenshot.
        let probe = dir.join(".write_probe");
        fs::write(&probe, b"ok").map_err(|e| {
            AnalysisError::internal(format!(
                "artifact directory '{}' is not writable: {}",
                dir.display(),
                e
            ))
        })?;
        let _ = fs::remove_file(&probe);

        Ok(ArtifactStore {
            dir,
            public_base_url: public_base_url.map(|b| b.trim_end_matches('/').to_string()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Persists `bytes` and returns the handle. `inbound_base` is used for URL
    /// minting only when no public base URL is configured; with neither
    /// available the handle falls back to an inline data URI.
    pub fn put(
        &self,
        bytes: &[u8],
        kind: &str,
        viewport: &str,
        inbound_base: Option<&str>,
        want_data_uri: bool,
    ) -> ArtifactRef {
        let (width, height) = png_dimensions(bytes);
        let filename = format!(
            "{}_{}_{}.png",
            sanitize_component(kind),
            sanitize_component(viewport),
            chrono::Utc::now().timestamp_millis()
        );

        if let Err(e) = self.write_atomic(&filename, bytes) {
            log::warn!(target: "artifact_store", "artifact write failed: {}", e);
            return ArtifactRef {
                filename,
                url: None,
                data_uri: None,
                width,
                height,
                error: Some(e.to_string()),
            };
        }

        let base = self
            .public_base_url
            .as_deref()
            .or(inbound_base)
            .map(|b| b.trim_end_matches('/'));
        let url = base.map(|b| format!("{}/api/artifacts/{}", b, filename));

        let data_uri = if want_data_uri || url.is_none() {
            Some(format!(
                "data:image/png;base64,{}",
                base64::engine::general_purpose::STANDARD.encode(bytes)
            ))
        } else {
            None
        };

        ArtifactRef {
            filename,
            url,
            data_uri,
            width,
            height,
            error: None,
        }
    }

    /// Read-only lookup. Filenames are flat; anything path-like is rejected.
    pub fn get(&self, filename: &str) -> AnalysisResult<Vec<u8>> {
        if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
            return Err(AnalysisError::validation(format!(
                "invalid artifact filename '{}'",
                filename
            )));
        }

        let path = self.dir.join(filename);
        fs::read(&path).map_err(|_| {
            AnalysisError::validation(format!("artifact '{}' not found", filename))
        })
    }

    /// Directory listing is O(n); only invoked by explicit probes.
    pub fn health(&self) -> ArtifactHealth {
        let exists = self.dir.exists();
        let is_dir = self.dir.is_dir();
        let mut sample_files = Vec::new();

        if let Ok(entries) = fs::read_dir(&self.dir) {
            for entry in entries.flatten().take(5) {
                sample_files.push(entry.file_name().to_string_lossy().to_string());
            }
        }

        ArtifactHealth {
            exists,
            is_dir,
            path: self.dir.display().to_string(),
            sample_files,
        }
    }

    // Atomic write: temp file in the same directory, then rename.
    fn write_atomic(&self, filename: &str, bytes: &[u8]) -> std::io::Result<()> {
        let final_path = self.dir.join(filename);
        let tmp_path = self.dir.join(format!(".{}.tmp", filename));
        fs::write(&tmp_path, bytes)?;
        fs::rename(&tmp_path, &final_path)
    }
}

fn sanitize_component(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

/// Best-effort PNG dimensions; screenshots that fail to decode keep 0x0.
fn png_dimensions(bytes: &[u8]) -> (u32, u32) {
    use image::GenericImageView;
    match image::load_from_memory(bytes) {
        Ok(img) => img.dimensions(),
        Err(_) => (0, 0),
    }
}
