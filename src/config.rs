//! Repository configuration: root discovery via the `repo.json` marker and
//! resolution of the skins / class-model / translations locations.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::SkinError;
use crate::host::FileSystem;

/// Exact file names the two class-model files must carry.
pub const SKIN_ELEMENTS_MODEL: &str = "Skin Elements.classModel";
pub const VISUAL_STYLES_MODEL: &str = "Visual Styles.classModel";

/// Marker file that identifies the repository root.
pub const REPO_MARKER: &str = "repo.json";

fn default_skins() -> Vec<String> {
    vec!["skins".to_string()]
}

fn default_classmodels() -> Vec<String> {
    vec!["classmodels".to_string()]
}

fn default_translations() -> Vec<String> {
    vec!["translations".to_string()]
}

/// Parsed `repo.json`. Missing keys fall back to the conventional layout.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RepoConfig {
    #[serde(default = "default_skins")]
    pub skins: Vec<String>,
    #[serde(default = "default_classmodels")]
    pub classmodels: Vec<String>,
    #[serde(default = "default_translations")]
    pub translations: Vec<String>,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            skins: default_skins(),
            classmodels: default_classmodels(),
            translations: default_translations(),
        }
    }
}

/// Walk up from `start` (a file or directory) to the nearest directory
/// containing `repo.json`.
pub fn find_repo_root(start: &Path, fs: &dyn FileSystem) -> Option<PathBuf> {
    let mut dir = if fs.is_dir(start) { start } else { start.parent()? };
    loop {
        if fs.exists(&dir.join(REPO_MARKER)) {
            return Some(dir.to_path_buf());
        }
        dir = dir.parent()?;
    }
}

/// A located repository: root directory plus its configuration.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
    pub config: RepoConfig,
}

impl Workspace {
    /// Discover the repository containing `start` and load its config.
    pub fn discover(start: &Path, fs: &dyn FileSystem) -> Result<Self, SkinError> {
        let root = find_repo_root(start, fs)
            .ok_or_else(|| SkinError::RepoNotFound(start.to_path_buf()))?;
        Self::open(root, fs)
    }

    /// Load the config of a known repository root.
    pub fn open(root: PathBuf, fs: &dyn FileSystem) -> Result<Self, SkinError> {
        let marker = root.join(REPO_MARKER);
        let config = match fs.read(&marker) {
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| SkinError::InvalidConfig { path: marker.clone(), source: e })?,
            Err(_) => RepoConfig::default(),
        };
        debug!(root = %root.display(), ?config, "workspace opened");
        Ok(Self { root, config })
    }

    /// Absolute skins locations, in configuration order.
    pub fn skins_locations(&self) -> Vec<PathBuf> {
        self.config.skins.iter().map(|s| self.root.join(s)).collect()
    }

    pub fn translations_locations(&self) -> Vec<PathBuf> {
        self.config.translations.iter().map(|s| self.root.join(s)).collect()
    }

    /// Path of the "Skin Elements" model: first classmodels location that
    /// actually contains the file, else the conventional spot.
    pub fn skin_elements_model(&self, fs: &dyn FileSystem) -> PathBuf {
        self.model_path(SKIN_ELEMENTS_MODEL, fs)
    }

    pub fn visual_styles_model(&self, fs: &dyn FileSystem) -> PathBuf {
        self.model_path(VISUAL_STYLES_MODEL, fs)
    }

    fn model_path(&self, file_name: &str, fs: &dyn FileSystem) -> PathBuf {
        for location in &self.config.classmodels {
            let candidate = self.root.join(location).join(file_name);
            if fs.exists(&candidate) {
                return candidate;
            }
        }
        self.root.join(&self.config.classmodels[0]).join(file_name)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
