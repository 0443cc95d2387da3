//! Asset storage on the local filesystem
//!
//! Layout beneath the asset root:
//! `<YYYYMMDD>/<base><ext>`, `<base>_thumb<ext>`, `<base>_preview<pext>`.
//! The public URL of a main variant is `/uploads/<YYYYMMDD>/<base><ext>`, and
//! all three variant paths are derivable from it.

use chrono::Local;
use rand::Rng;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use crate::services::variant_encoder::{OutputFormat, VariantSet};

/// Public URL prefix of the asset root
pub const URL_PREFIX: &str = "/uploads";

pub const THUMB_SUFFIX: &str = "_thumb";
pub const PREVIEW_SUFFIX: &str = "_preview";

/// On-disk locations of one asset's three variants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantPaths {
    pub main: PathBuf,
    pub thumbnail: PathBuf,
    pub preview: PathBuf,
}

impl VariantPaths {
    /// Derive thumbnail and preview paths from the main variant path
    pub fn from_main(main: &Path) -> Self {
        let stem = main
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = main
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let preview_ext = if ext.eq_ignore_ascii_case(".svg") {
            ".svg"
        } else {
            ".jpg"
        };

        Self {
            main: main.to_path_buf(),
            thumbnail: main.with_file_name(format!("{}{}{}", stem, THUMB_SUFFIX, ext)),
            preview: main.with_file_name(format!("{}{}{}", stem, PREVIEW_SUFFIX, preview_ext)),
        }
    }

    pub fn all(&self) -> [&Path; 3] {
        [&self.main, &self.thumbnail, &self.preview]
    }
}

/// Where a new asset will be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatedLocation {
    /// Filename of the main variant
    pub stored_name: String,
    pub url: String,
    pub paths: VariantPaths,
}

/// Filesystem asset root
#[derive(Debug, Clone)]
pub struct AssetStorage {
    root: PathBuf,
}

impl AssetStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Choose a fresh base name under today's date directory
    pub fn allocate(&self, output: OutputFormat) -> AllocatedLocation {
        let date_dir = Local::now().format("%Y%m%d").to_string();
        let stored_name = format!("{}{}", generate_base_name(), output.extension());

        let paths = VariantPaths::from_main(&self.root.join(&date_dir).join(&stored_name));

        AllocatedLocation {
            url: format!("{}/{}/{}", URL_PREFIX, date_dir, stored_name),
            stored_name,
            paths,
        }
    }

    /// Write all three variants, creating the date directory if absent
    ///
    /// On failure, variants already written by this call are removed.
    pub async fn write_variants(&self, location: &AllocatedLocation, set: &VariantSet) -> io::Result<()> {
        if let Some(dir) = location.paths.main.parent() {
            fs::create_dir_all(dir).await?;
        }

        let writes = [
            (&location.paths.main, &set.main),
            (&location.paths.thumbnail, &set.thumbnail),
            (&location.paths.preview, &set.preview),
        ];

        for (i, (path, bytes)) in writes.iter().enumerate() {
            if let Err(e) = fs::write(path, bytes).await {
                for (written, _) in &writes[..i] {
                    let _ = remove_file(written).await;
                }
                return Err(e);
            }
        }

        Ok(())
    }

    /// Map a public URL back to its variant paths
    ///
    /// Returns None for URLs outside the asset root or containing
    /// parent/absolute components.
    pub fn paths_for_url(&self, url: &str) -> Option<VariantPaths> {
        let relative = url.strip_prefix(URL_PREFIX)?.strip_prefix('/')?;
        if relative.is_empty() {
            return None;
        }

        let relative = Path::new(relative);
        if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
            return None;
        }

        Some(VariantPaths::from_main(&self.root.join(relative)))
    }

    /// Remove all three variants, ignoring ones already gone
    pub async fn remove_variants(&self, paths: &VariantPaths) -> io::Result<()> {
        for path in paths.all() {
            remove_file(path).await?;
        }
        Ok(())
    }
}

/// Read a stored variant
pub async fn read_file(path: &Path) -> io::Result<Vec<u8>> {
    fs::read(path).await
}

/// Remove a file; "not found" counts as success
pub async fn remove_file(path: &Path) -> io::Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Hex nanosecond timestamp followed by a random three-digit number
fn generate_base_name() -> String {
    let nanos = Local::now().timestamp_nanos_opt().unwrap_or_default();
    let suffix: u32 = rand::thread_rng().gen_range(100..1000);
    format!("{:x}{}", nanos, suffix)
}
