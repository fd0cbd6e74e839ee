//! File-backed implementation of the collaborator contracts.
//!
//! One `store.json` holds projects, clips, settings, the media library, and
//! the license tier. Every status change is written through to disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use clipforge_common::error::{ClipError, ClipResult};

use crate::audio::ResolvedTrack;
use crate::contracts::{
    ClipRecord, ClipStore, LicenseService, MediaLibrary, ProjectRecord, SettingsStore,
};
use crate::encoding::SettingsMap;
use crate::license::{LicenseTier, RenderLimits};
use crate::status::ClipStatus;

/// On-disk contents of the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreData {
    pub projects: BTreeMap<String, ProjectRecord>,
    pub clips: BTreeMap<String, ClipRecord>,
    pub settings: SettingsMap,
    pub library: BTreeMap<String, ResolvedTrack>,
    pub license: LicenseConfig,
}

/// License tier plus optional explicit limits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LicenseConfig {
    pub tier: LicenseTier,
    /// Overrides the tier defaults when present.
    pub limits: Option<RenderLimits>,
}

#[derive(Debug)]
pub struct JsonClipStore {
    path: PathBuf,
    data: Mutex<StoreData>,
}

impl JsonClipStore {
    /// Load a store file.
    pub fn open(path: impl AsRef<Path>) -> ClipResult<Self> {
        let path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            ClipError::store(format!("Failed to read store {}: {e}", path.display()))
        })?;
        let data: StoreData = serde_json::from_str(&content).map_err(|e| {
            ClipError::store(format!("Failed to parse store {}: {e}", path.display()))
        })?;
        tracing::debug!(
            path = %path.display(),
            projects = data.projects.len(),
            clips = data.clips.len(),
            "Loaded clip store"
        );
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    /// Create a store at `path` with the given contents and write it out.
    pub fn create(path: impl AsRef<Path>, data: StoreData) -> ClipResult<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            data: Mutex::new(data),
        };
        {
            let guard = store.lock()?;
            store.persist(&guard)?;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> ClipResult<StoreData> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> ClipResult<MutexGuard<'_, StoreData>> {
        self.data
            .lock()
            .map_err(|_| ClipError::store("Clip store lock poisoned"))
    }

    fn persist(&self, data: &StoreData) -> ClipResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(data)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl ClipStore for JsonClipStore {
    fn load_clip(&self, clip_id: &str) -> ClipResult<ClipRecord> {
        self.lock()?
            .clips
            .get(clip_id)
            .cloned()
            .ok_or_else(|| ClipError::invalid_input(format!("Unknown clip: {clip_id}")))
    }

    fn load_project(&self, project_id: &str) -> ClipResult<ProjectRecord> {
        self.lock()?
            .projects
            .get(project_id)
            .cloned()
            .ok_or_else(|| ClipError::invalid_input(format!("Unknown project: {project_id}")))
    }

    fn set_status(&self, clip_id: &str, status: ClipStatus) -> ClipResult<()> {
        let mut data = self.lock()?;
        let clip = data
            .clips
            .get_mut(clip_id)
            .ok_or_else(|| ClipError::invalid_input(format!("Unknown clip: {clip_id}")))?;

        let current = std::mem::take(&mut clip.status);
        match current.clone().transition(status) {
            Ok(next) => {
                tracing::debug!(clip_id, from = current.name(), to = next.name(), "Clip status");
                clip.status = next;
            }
            Err(e) => {
                clip.status = current;
                return Err(e);
            }
        }
        self.persist(&data)
    }
}

impl LicenseService for JsonClipStore {
    fn render_limits(&self) -> ClipResult<RenderLimits> {
        let data = self.lock()?;
        Ok(data
            .license
            .limits
            .unwrap_or_else(|| RenderLimits::for_tier(data.license.tier)))
    }
}

impl SettingsStore for JsonClipStore {
    fn settings(&self) -> ClipResult<SettingsMap> {
        Ok(self.lock()?.settings.clone())
    }
}

impl MediaLibrary for JsonClipStore {
    fn resolve(&self, track_id: &str) -> ClipResult<ResolvedTrack> {
        let track = self
            .lock()?
            .library
            .get(track_id)
            .cloned()
            .ok_or_else(|| ClipError::invalid_input(format!("Unknown library track: {track_id}")))?;
        if !track.path.exists() {
            return Err(ClipError::SourceNotFound { path: track.path });
        }
        Ok(track)
    }
}
