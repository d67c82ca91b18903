// SPDX-FileCopyrightText: Copyright (c) 2025 SmartPath Authors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Offline tooling for SmartPath model artifacts: train the route model,
//! train per-sensor models, and inspect existing artifacts.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};

use smartpath_traffic::logging;
use smartpath_traffic::model::{LinearModel, Predictor};

mod data;
mod fit;

use data::SpeedMatrix;

#[derive(Parser)]
#[command(
    author = "SmartPath Team",
    version,
    about = "Train and inspect SmartPath traffic model artifacts",
    long_about = None,
    disable_help_subcommand = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit the route model on per-timestep network statistics
    TrainRoute {
        /// CSV speed matrix: header of sensor ids, one row per timestep
        #[arg(long)]
        data: PathBuf,

        /// Output artifact path
        #[arg(long, default_value = "model.json")]
        out: PathBuf,
    },

    /// Fit one lag-1 model per sensor column
    TrainSensors {
        /// CSV speed matrix: header of sensor ids, one row per timestep
        #[arg(long)]
        data: PathBuf,

        /// Output directory for `model_<sensor_id>.json` artifacts
        #[arg(long, default_value = "sensor_models")]
        out_dir: PathBuf,
    },

    /// Print an artifact's coefficients and a sample prediction
    Inspect {
        /// Artifact path
        artifact: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::TrainRoute { data, out } => train_route(&data, &out),
        Commands::TrainSensors { data, out_dir } => train_sensors(&data, &out_dir),
        Commands::Inspect { artifact } => inspect(&artifact),
    }
}

/// Features per timestep: `[mean, std, max]` across all sensors. The target
/// is the network mean speed for the same timestep.
fn train_route(data: &Path, out: &Path) -> anyhow::Result<()> {
    let matrix = SpeedMatrix::load_csv(data)?;

    let mut features = Vec::with_capacity(matrix.num_rows());
    let mut targets = Vec::with_capacity(matrix.num_rows());
    for row in matrix.rows() {
        features.push(vec![row_mean(row), row_std(row), row_max(row)]);
        targets.push(row_mean(row));
    }

    let mut model = fit::fit_least_squares(&features, &targets)?;
    model.trained_at = Some(chrono::Utc::now());
    model
        .save_to_json_file(out)
        .with_context(|| format!("cannot write artifact {}", out.display()))?;

    tracing::info!(out = %out.display(), rows = matrix.num_rows(), "route model written");
    println!("wrote {} ({} features)", out.display(), model.num_features());
    Ok(())
}

fn train_sensors(data: &Path, out_dir: &Path) -> anyhow::Result<()> {
    let matrix = SpeedMatrix::load_csv(data)?;
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("cannot create output directory {}", out_dir.display()))?;

    let mut written = 0usize;
    for (col, &sensor_id) in matrix.sensor_ids().iter().enumerate() {
        let series = matrix.column(col);
        let mut model = match fit::fit_lag1(&series) {
            Ok(model) => model,
            Err(err) => {
                tracing::warn!(sensor_id, %err, "skipping sensor");
                continue;
            }
        };
        model.trained_at = Some(chrono::Utc::now());

        let out = out_dir.join(format!("model_{sensor_id}.json"));
        model
            .save_to_json_file(&out)
            .with_context(|| format!("cannot write artifact {}", out.display()))?;
        written += 1;
    }

    anyhow::ensure!(written > 0, "no sensor column produced a model");
    println!("wrote {written} sensor models to {}", out_dir.display());
    Ok(())
}

fn inspect(artifact: &Path) -> anyhow::Result<()> {
    let model = LinearModel::load_from_json_file(artifact)
        .with_context(|| format!("failed to load artifact {}", artifact.display()))?;

    println!("artifact:     {}", artifact.display());
    println!("coefficients: {:?}", model.coefficients);
    println!("intercept:    {}", model.intercept);
    match model.trained_at {
        Some(at) => println!("trained at:   {at}"),
        None => println!("trained at:   unknown"),
    }

    let sample = vec![1.0; model.num_features()];
    let prediction = model.predict(&sample)?;
    println!("predict({sample:?}) = {prediction}");
    Ok(())
}

fn row_mean(row: &[f64]) -> f64 {
    row.iter().sum::<f64>() / row.len() as f64
}

/// Population standard deviation.
fn row_std(row: &[f64]) -> f64 {
    let mean = row_mean(row);
    let variance = row.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / row.len() as f64;
    variance.sqrt()
}

fn row_max(row: &[f64]) -> f64 {
    row.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_statistics() {
        let row = vec![2.0, 4.0, 6.0];
        assert_eq!(row_mean(&row), 4.0);
        assert!((row_std(&row) - (8.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(row_max(&row), 6.0);
    }

    #[test]
    fn test_train_route_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("speeds.csv");
        // network speeds drift downward over six timesteps
        std::fs::write(
            &csv,
            "1,2,3\n60.0,58.0,61.0\n55.0,54.0,57.0\n50.0,49.0,52.0\n45.0,44.5,47.0\n40.0,41.0,42.0\n35.0,36.0,38.0\n",
        )
        .unwrap();

        let out = dir.path().join("model.json");
        train_route(&csv, &out).unwrap();

        let model = LinearModel::load_from_json_file(&out).unwrap();
        assert_eq!(model.num_features(), 3);
        assert!(model.trained_at.is_some());

        // the target equals the first feature, so the fit reproduces row means
        let y = model.predict(&[45.0, 1.2, 47.0]).unwrap();
        assert!((y - 45.0).abs() < 1e-6, "got {y}");
    }

    #[test]
    fn test_train_sensors_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("speeds.csv");
        // column 7 follows next = 0.5 * previous + 20; column 8 is constant
        let mut rows = String::from("7,8\n");
        let mut speed: f64 = 60.0;
        for _ in 0..10 {
            rows.push_str(&format!("{speed},30.0\n"));
            speed = 0.5 * speed + 20.0;
        }
        std::fs::write(&csv, rows).unwrap();

        let out_dir = dir.path().join("sensor_models");
        train_sensors(&csv, &out_dir).unwrap();

        let model = LinearModel::load_from_json_file(out_dir.join("model_7.json")).unwrap();
        assert!((model.coefficients[0] - 0.5).abs() < 1e-6);
        assert!((model.intercept - 20.0).abs() < 1e-6);

        // the constant column cannot be fit and is skipped
        assert!(!out_dir.join("model_8.json").exists());
    }
}
