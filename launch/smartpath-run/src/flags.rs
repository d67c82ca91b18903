// SPDX-FileCopyrightText: Copyright (c) 2025 SmartPath Authors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Which service this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Service {
    /// Sensor model registry service
    Sensor,

    /// Route estimation service
    Route,
}

/// Command line flags. Unset flags fall back to the layered service
/// configuration (environment variables, then TOML, then defaults).
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Flags {
    /// Service to run
    #[arg(value_enum)]
    pub service: Service,

    /// Bind port; overrides configuration
    #[arg(long)]
    pub port: Option<u16>,

    /// Bind host; overrides configuration
    #[arg(long)]
    pub host: Option<String>,

    /// Sensor service: directory of `model_<sensor_id>.json` artifacts; overrides configuration
    #[arg(long)]
    pub model_dir: Option<PathBuf>,

    /// Route service: path to the model artifact; overrides configuration
    #[arg(long)]
    pub model_path: Option<PathBuf>,

    /// Verbosity (-v for debug, -vv for trace)
    #[arg(short = 'v', action = clap::ArgAction::Count, default_value_t = 0)]
    pub verbosity: u8,
}

impl Flags {
    /// Flags must match the chosen service.
    pub fn validate(&self) -> anyhow::Result<()> {
        match self.service {
            Service::Sensor => {
                if self.model_path.is_some() {
                    anyhow::bail!(
                        "--model-path applies to the route service; did you mean --model-dir?"
                    );
                }
            }
            Service::Route => {
                if self.model_dir.is_some() {
                    anyhow::bail!(
                        "--model-dir applies to the sensor service; did you mean --model-path?"
                    );
                }
            }
        }
        Ok(())
    }
}
