// SPDX-FileCopyrightText: Copyright (c) 2025 SmartPath Authors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Process-wide logging setup.
//!
//! Output is human-readable by default, or JSON lines when the
//! `SP_LOGGING_JSONL` environment variable is truthy. Filters come from the
//! `SP_LOG` environment variable as comma-separated `target=level`
//! directives, with a default level of `info`.

use std::sync::Once;

use tracing_subscriber::filter::Directive;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{disable_ansi_logging, jsonl_logging_enabled};

/// ENV used to set the log level
const FILTER_ENV: &str = "SP_LOG";

/// Default log level
const DEFAULT_FILTER_LEVEL: &str = "info";

/// Dependency targets pinned to `error` by default
const NOISY_TARGETS: &[&str] = &[
    "h2",
    "hyper",
    "hyper_util",
    "tower",
    "rustls",
    "axum",
    "reqwest",
];

/// Once instance to ensure the logger is only initialized once
static INIT: Once = Once::new();

/// Initialize the logger
pub fn init() {
    INIT.call_once(setup_logging);
}

fn setup_logging() {
    let f = filters();
    // fmt builder methods specialize the layer type, so the two output
    // forms are spelled out separately
    if jsonl_logging_enabled() {
        let l = fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(std::io::stderr)
            .with_filter(f);
        tracing_subscriber::registry().with(l).init();
    } else {
        let l = fmt::layer()
            .with_ansi(!disable_ansi_logging())
            .event_format(fmt::format().compact())
            .with_writer(std::io::stderr)
            .with_filter(f);
        tracing_subscriber::registry().with(l).init();
    }
}

fn filters() -> EnvFilter {
    // DEFAULT_FILTER_LEVEL is a valid directive, so the parse cannot fail
    let mut filter_layer = EnvFilter::builder()
        .with_default_directive(DEFAULT_FILTER_LEVEL.parse().unwrap())
        .with_env_var(FILTER_ENV)
        .from_env_lossy();

    for target in NOISY_TARGETS {
        match format!("{target}=error").parse::<Directive>() {
            Ok(directive) => {
                filter_layer = filter_layer.add_directive(directive);
            }
            Err(err) => {
                eprintln!("Failed parsing log directive for target '{target}': {err}");
            }
        }
    }
    filter_layer
}
