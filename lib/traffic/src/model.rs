// SPDX-FileCopyrightText: Copyright (c) 2025 SmartPath Authors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Model artifacts and the prediction capability.
//!
//! A serialized model is a JSON [`LinearModel`]: a coefficient vector, an
//! intercept, and an optional training timestamp. The services talk to
//! models through the [`Predictor`] trait so the artifact format can evolve
//! without touching the HTTP layer.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    #[error("feature vector has {got} entries, model expects {expected}")]
    FeatureShape { expected: usize, got: usize },
}

/// A loaded model that can score a feature vector.
pub trait Predictor: Send + Sync {
    fn predict(&self, features: &[f64]) -> Result<f64, PredictError>;
}

/// Models are shared across request handlers.
pub type SharedPredictor = Arc<dyn Predictor>;

/// An ordinary least-squares linear model, as serialized on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,

    /// When the artifact was produced. Absent in hand-written artifacts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trained_at: Option<DateTime<Utc>>,
}

impl LinearModel {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            coefficients,
            intercept,
            trained_at: None,
        }
    }

    /// Load a model artifact from a JSON file
    pub fn load_from_json_file<P: AsRef<Path>>(file: P) -> std::io::Result<Self> {
        Ok(serde_json::from_str(&std::fs::read_to_string(file)?)?)
    }

    /// Load a model artifact from a JSON string
    pub fn load_from_json_str(json: &str) -> Result<Self, anyhow::Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the artifact to JSON
    pub fn to_json(&self) -> Result<String, anyhow::Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Save the model artifact to a JSON file
    pub fn save_to_json_file<P: AsRef<Path>>(&self, file: P) -> Result<(), anyhow::Error> {
        std::fs::write(file, self.to_json()?)?;
        Ok(())
    }

    /// Width of the feature vectors this model was trained with.
    pub fn num_features(&self) -> usize {
        self.coefficients.len()
    }
}

impl Predictor for LinearModel {
    fn predict(&self, features: &[f64]) -> Result<f64, PredictError> {
        if features.len() != self.coefficients.len() {
            return Err(PredictError::FeatureShape {
                expected: self.coefficients.len(),
                got: features.len(),
            });
        }
        let dot: f64 = self
            .coefficients
            .iter()
            .zip(features.iter())
            .map(|(c, x)| c * x)
            .sum();
        Ok(dot + self.intercept)
    }
}
