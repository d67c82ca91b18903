// SPDX-FileCopyrightText: Copyright (c) 2025 SmartPath Authors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Startup-built registry of per-sensor models.
//!
//! Artifacts live in a flat directory, one file per sensor, named like
//! `model_<sensor_id>.json`. The sensor id is the token between the first
//! `_` and the next `.`, parsed as an integer. The registry never changes
//! after startup, so request handlers read it without locks.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::model::{LinearModel, SharedPredictor};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("model directory not found: {0}")]
    ModelDirMissing(PathBuf),

    #[error("cannot derive a sensor id from artifact name: {0}")]
    MalformedArtifactName(String),

    #[error("failed to load model artifact {path}: {source}")]
    ArtifactLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // The display string is the wire contract for 404 bodies.
    #[error("Sensor{0} model not found")]
    ModelNotFound(i64),
}

/// Immutable mapping of sensor id to loaded model.
///
/// Listing order is the order ids were first seen. A duplicate id replaces
/// the stored model but keeps its original listing position.
pub struct SensorModelRegistry {
    models: HashMap<i64, SharedPredictor>,
    scan_order: Vec<i64>,
}

impl SensorModelRegistry {
    /// Scan `dir` and load every artifact in it.
    ///
    /// Fails on the first problem rather than serving a partial registry: a
    /// missing directory, an artifact name without a parseable sensor id, or
    /// an artifact that does not deserialize all abort startup.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(RegistryError::ModelDirMissing(dir.to_path_buf()));
        }

        let entries = std::fs::read_dir(dir).map_err(|source| RegistryError::ArtifactLoad {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut registry = Self::empty();
        for entry in entries {
            let entry = entry.map_err(|source| RegistryError::ArtifactLoad {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let sensor_id = parse_sensor_id(&file_name)
                .ok_or_else(|| RegistryError::MalformedArtifactName(file_name.clone()))?;
            let model = LinearModel::load_from_json_file(&path)
                .map_err(|source| RegistryError::ArtifactLoad { path, source })?;
            registry.insert(sensor_id, Arc::new(model));
            tracing::debug!(sensor_id, file = %file_name, "loaded sensor model");
        }

        tracing::info!(
            total = registry.len(),
            dir = %dir.display(),
            "sensor model registry loaded"
        );
        Ok(registry)
    }

    /// Build a registry from explicit (id, model) pairs, preserving order.
    pub fn from_entries(entries: impl IntoIterator<Item = (i64, SharedPredictor)>) -> Self {
        let mut registry = Self::empty();
        for (sensor_id, model) in entries {
            registry.insert(sensor_id, model);
        }
        registry
    }

    fn empty() -> Self {
        Self {
            models: HashMap::new(),
            scan_order: Vec::new(),
        }
    }

    fn insert(&mut self, sensor_id: i64, model: SharedPredictor) {
        if self.models.insert(sensor_id, model).is_none() {
            self.scan_order.push(sensor_id);
        }
    }

    pub fn get(&self, sensor_id: i64) -> Result<SharedPredictor, RegistryError> {
        self.models
            .get(&sensor_id)
            .cloned()
            .ok_or(RegistryError::ModelNotFound(sensor_id))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Sensor ids in the order they were first seen.
    pub fn sensor_ids(&self) -> &[i64] {
        &self.scan_order
    }
}

/// Derive the sensor id from an artifact file name.
///
/// `model_772.json` -> 772, `sensor_12.bak.json` -> 12.
fn parse_sensor_id(file_name: &str) -> Option<i64> {
    let after_underscore = file_name.split('_').nth(1)?;
    let token = after_underscore.split('.').next()?;
    token.parse().ok()
}
