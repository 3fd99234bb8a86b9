// Linehaul: SLA path feasibility for parcel middle-mile networks
// Copyright (C) 2025 Linehaul contributors
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Geographic primitives: great-circle distance, distance-to-zone mapping,
//! and linehaul transit time.

use thiserror::Error;

use crate::types::{FacilityMap, MileageBand};

/// Earth radius used for great-circle distances, in miles.
pub const EARTH_RADIUS_MILES: f64 = 3958.756;

/// Error raised by geographic computations.
#[derive(Debug, Error, PartialEq)]
pub enum GeoError {
    /// Linehaul speed must be strictly positive.
    #[error("speed must be positive, got {0} mph")]
    BadSpeed(f64),
    /// A path references a facility that is not in the map.
    #[error("unknown facility in path: {0}")]
    UnknownFacility(String),
}

/// Great-circle distance between two coordinates via the haversine formula.
pub fn great_circle_miles(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_r = lat1.to_radians();
    let lat2_r = lat2.to_radians();
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1_r.cos() * lat2_r.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * a.sqrt().asin() * EARTH_RADIUS_MILES
}

/// Map a distance onto its mileage band. Bands are lower-inclusive and
/// upper-exclusive, except that the last band also claims its upper bound and
/// any distance beyond it. `bands` must be sorted by zone.
pub fn zone_for_distance(distance_miles: f64, bands: &[MileageBand]) -> Option<&MileageBand> {
    for band in bands {
        if band.miles_min <= distance_miles && distance_miles < band.miles_max {
            return Some(band);
        }
    }

    // everything at or past the last band's upper bound rates as the last band
    match bands.last() {
        Some(last) if distance_miles >= last.miles_max => Some(last),
        _ => None,
    }
}

/// Linehaul minutes for a distance under a band's circuity and speed.
pub fn transit_minutes(distance_miles: f64, circuity_factor: f64, mph: f64) -> Result<f64, GeoError> {
    if mph <= 0.0 {
        return Err(GeoError::BadSpeed(mph));
    }
    Ok(distance_miles * circuity_factor / mph * 60.0)
}

/// Per-edge great-circle distances along a node sequence, plus their sum.
pub fn path_legs(nodes: &[String], facilities: &FacilityMap) -> Result<(f64, Vec<f64>), GeoError> {
    if nodes.len() < 2 {
        return Ok((0.0, Vec::new()));
    }

    let mut legs = Vec::with_capacity(nodes.len() - 1);
    for pair in nodes.windows(2) {
        let from = facilities
            .get(&pair[0])
            .ok_or_else(|| GeoError::UnknownFacility(pair[0].clone()))?;
        let to = facilities
            .get(&pair[1])
            .ok_or_else(|| GeoError::UnknownFacility(pair[1].clone()))?;
        legs.push(great_circle_miles(from.lat, from.lon, to.lat, to.lon));
    }

    Ok((legs.iter().sum(), legs))
}

/// Around-the-world factor: path miles over direct miles, 1.0 when the
/// direct distance is zero.
pub fn atw_factor(total_path_miles: f64, direct_miles: f64) -> f64 {
    if direct_miles <= 0.0 {
        1.0
    } else {
        total_path_miles / direct_miles
    }
}
