// SPDX-FileCopyrightText: Copyright (c) 2025 SmartPath Authors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! # SmartPath Traffic
//!
//! Serving layer for pre-trained traffic-speed regression models: a
//! per-sensor model registry service and a single-model route estimation
//! service, plus the artifact and geometry types they share.

pub mod config;
pub mod geo;
pub mod http;
pub mod logging;
pub mod model;
pub mod registry;

pub use tokio_util::sync::CancellationToken;
