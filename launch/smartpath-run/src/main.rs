// SPDX-FileCopyrightText: Copyright (c) 2025 SmartPath Authors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;

use smartpath_traffic::config::{RouteServiceConfig, SensorServiceConfig};
use smartpath_traffic::http::service::route::RouteHttpService;
use smartpath_traffic::http::service::sensor::SensorHttpService;
use smartpath_traffic::{logging, CancellationToken};

mod flags;
use flags::{Flags, Service};

fn main() -> anyhow::Result<()> {
    // Set log level based on verbosity flag
    let log_level = match Flags::try_parse() {
        Ok(flags) => match flags.verbosity {
            0 => "info",
            1 => "debug",
            2 => "trace",
            _ => {
                return Err(anyhow::anyhow!(
                    "Invalid verbosity level. Valid values are v (debug) and vv (trace)"
                ));
            }
        },
        Err(_) => "info",
    };
    if log_level != "info" {
        std::env::set_var("SP_LOG", log_level);
    }
    logging::init();

    let flags = Flags::parse();
    flags.validate()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(flags))
}

async fn run(flags: Flags) -> anyhow::Result<()> {
    let cancel_token = CancellationToken::new();

    // ctrl-c starts a graceful shutdown
    let shutdown = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested");
            shutdown.cancel();
        }
    });

    match flags.service {
        Service::Sensor => {
            let config = SensorServiceConfig::from_settings()?;
            let service = SensorHttpService::builder()
                .port(flags.port.unwrap_or(config.port))
                .host(flags.host.unwrap_or(config.host))
                .model_dir(flags.model_dir.unwrap_or(config.model_dir))
                .build()?;
            for doc in service.route_docs() {
                tracing::info!("serving {doc}");
            }
            service.run(cancel_token).await
        }
        Service::Route => {
            let config = RouteServiceConfig::from_settings()?;
            let service = RouteHttpService::builder()
                .port(flags.port.unwrap_or(config.port))
                .host(flags.host.unwrap_or(config.host))
                .model_path(flags.model_path.or(config.model_path))
                .build()?;
            for doc in service.route_docs() {
                tracing::info!("serving {doc}");
            }
            service.run(cancel_token).await
        }
    }
}
