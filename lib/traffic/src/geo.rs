// SPDX-FileCopyrightText: Copyright (c) 2025 SmartPath Authors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Great-circle geometry for the route estimation service.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometers, as used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A geographic coordinate as it appears on the wire.
///
/// The serialized longitude field is `lng`, not `lon`; map clients already
/// send it that way.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Great-circle distance between two coordinates, in kilometers.
///
/// Inputs are degrees.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_KM * c
}

/// [`haversine_km`] over wire points.
pub fn distance_km(source: &GeoPoint, destination: &GeoPoint) -> f64 {
    haversine_km(source.lat, source.lng, destination.lat, destination.lng)
}
