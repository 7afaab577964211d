// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use log::{info, warn};

use telmount_elements::mount_error::{MountError, MountResult};
use telmount_elements::mount_types::MountGeometry;

use crate::pointing_model::PointingModel;

/// Process-wide holder of the active pointing model. Readers take an
/// immutable snapshot; a reload parses into a staging model and swaps it in
/// only on success, so a failed load leaves the previous model active.
pub struct ModelHandle {
    geometry: MountGeometry,
    active: RwLock<Option<Arc<PointingModel>>>,
    // Bumped on every successful swap.
    generation: AtomicU64,
}

impl ModelHandle {
    pub fn new(geometry: MountGeometry) -> Self {
        ModelHandle {
            geometry,
            active: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub fn geometry(&self) -> MountGeometry {
        self.geometry
    }

    /// Snapshot of the active model, if any.
    pub fn current(&self) -> Option<Arc<PointingModel>> {
        let guard = self.active.read().unwrap_or_else(|e| e.into_inner());
        guard.clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Parses `text` and makes it the active model. Returns the new
    /// generation.
    pub fn load_str(&self, text: &str) -> MountResult<u64> {
        let staged = PointingModel::parse(text).map_err(|e| {
            warn!("pointing model rejected, keeping previous: {}", e);
            e
        })?;
        self.replace(staged)
    }

    pub fn load_file(&self, path: &Path) -> MountResult<u64> {
        let staged = PointingModel::load_file(path).map_err(|e| {
            warn!("pointing model {} rejected: {}", path.display(), e);
            e
        })?;
        self.replace(staged)
    }

    /// Installs an already-built model.
    pub fn replace(&self, model: PointingModel) -> MountResult<u64> {
        if !model.supports(self.geometry) {
            return Err(MountError::model_parse(
                1,
                "header",
                &format!("model frame does not match {:?} mount", self.geometry),
            ));
        }
        let staged = Arc::new(model);
        let mut guard = self.active.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(staged);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        drop(guard);
        info!("pointing model generation {} active", generation);
        Ok(generation)
    }

    /// Removes the active model; conversions then run uncorrected.
    pub fn clear(&self) {
        let mut guard = self.active.write().unwrap_or_else(|e| e.into_inner());
        *guard = None;
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

// mod tests.
