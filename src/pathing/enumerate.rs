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

//! Candidate path enumeration. Sequences are produced lazily: the
//! permutation space over intermediate hubs explodes combinatorially, so the
//! caller chains each candidate straight into the timing engine instead of
//! materializing the product.

use boolinator::Boolinator;
use itertools::Itertools;
use log::warn;
use thiserror::Error;

use crate::geo::{atw_factor, great_circle_miles, path_legs};
use crate::types::{FacilityMap, PathCandidate, PathType, RunSettings, SortLevel};

/// Paths never route through more than this many intermediate touches.
const MAX_INTERMEDIATES: usize = 3;

/// Error raised when an OD pair cannot be enumerated at all.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnumerateError {
    /// The origin facility is not in the map.
    #[error("unknown origin facility: {0}")]
    UnknownOrigin(String),
    /// The destination facility is not in the map.
    #[error("unknown destination facility: {0}")]
    UnknownDest(String),
}

/// Enumerates [`PathCandidate`]s for OD pairs under the hub-hierarchy rules.
#[derive(Debug)]
pub struct PathEnumerator<'a> {
    /// Facility lookup.
    facilities: &'a FacilityMap,
    /// Names of all sorting (HUB or HYBRID) facilities, in map order.
    sorting_pool: Vec<&'a str>,
    /// Maximum number of edges in a path.
    max_edges: usize,
    /// Maximum allowed around-the-world factor.
    max_atw: f64,
}

impl<'a> PathEnumerator<'a> {
    /// Build the enumerator over the facility map.
    pub fn new(facilities: &'a FacilityMap, settings: &RunSettings) -> Self {
        let sorting_pool: Vec<&str> = facilities
            .iter()
            .filter(|(_, f)| f.kind.is_sorting())
            .map(|(name, _)| name.as_str())
            .collect();

        Self {
            facilities,
            sorting_pool,
            max_edges: settings.max_path_touches as usize,
            max_atw: settings.max_path_atw_factor,
        }
    }

    /// Lazily produce every candidate variant for an OD pair: all simple
    /// node sequences up to the edge budget, fanned into their sort-level
    /// variants and filtered by the ATW budget. O = D yields exactly one
    /// degenerate candidate.
    pub fn candidates(
        &self,
        origin: &str,
        dest: &str,
    ) -> Result<Box<dyn Iterator<Item = PathCandidate> + '_>, EnumerateError> {
        let origin_fac = self
            .facilities
            .get(origin)
            .ok_or_else(|| EnumerateError::UnknownOrigin(origin.to_string()))?;
        let dest_fac = self
            .facilities
            .get(dest)
            .ok_or_else(|| EnumerateError::UnknownDest(dest.to_string()))?;

        if origin == dest {
            return Ok(Box::new(std::iter::once(od_equal_candidate(origin))));
        }

        // A pair that cannot legally start or end a path has no candidates.
        if !origin_fac.kind.is_sorting() || !dest_fac.kind.is_delivery() {
            return Ok(Box::new(std::iter::empty()));
        }

        let direct_miles = great_circle_miles(origin_fac.lat, origin_fac.lon, dest_fac.lat, dest_fac.lon);

        // The hierarchy rule: unless the origin is (or shares) the
        // destination's parent hub, every sequence must route through it.
        let required_via: Option<String> = dest_fac
            .parent_hub
            .clone()
            .filter(|parent| {
                origin != parent.as_str() && origin_fac.parent_hub.as_ref() != Some(parent)
            });

        let regional_hub = dest_fac.regional_sort_hub.clone();

        let pool: Vec<String> = self
            .sorting_pool
            .iter()
            .filter(|name| **name != origin && **name != dest)
            .map(|name| name.to_string())
            .collect();
        let max_intermediates = self.max_edges.saturating_sub(1).min(MAX_INTERMEDIATES);

        let origin = origin.to_string();
        let dest = dest.to_string();
        let max_atw = self.max_atw;

        // permutations() is itself lazy, so the full product is never held
        let sequences =
            (0..=max_intermediates).flat_map(move |k| pool.clone().into_iter().permutations(k));

        let iter = sequences
            .map(move |mids| {
                let mut nodes = Vec::with_capacity(mids.len() + 2);
                nodes.push(origin.clone());
                nodes.extend(mids);
                nodes.push(dest.clone());
                nodes
            })
            .filter(move |nodes| match &required_via {
                Some(via) => nodes.contains(via),
                None => true,
            })
            .flat_map(move |nodes| {
                self.expand_variants(nodes, direct_miles, regional_hub.as_deref())
            })
            .filter(move |candidate| candidate.atw_factor <= max_atw);

        Ok(Box::new(iter))
    }

    /// Fan one node sequence into its sort-level variants.
    fn expand_variants(
        &self,
        nodes: Vec<String>,
        direct_miles: f64,
        regional_hub: Option<&str>,
    ) -> Vec<PathCandidate> {
        let (total_path_miles, _) = match path_legs(&nodes, self.facilities) {
            Ok(legs) => legs,
            Err(e) => {
                warn!("dropping path {}: {e}", nodes.join("->"));
                return Vec::new();
            }
        };

        let edges = nodes.len() - 1;
        let is_direct = edges == 1;
        let second_to_last = &nodes[nodes.len() - 2];

        let mut variants = vec![
            (SortLevel::SortGroup, SortLevel::SortGroup),
            (SortLevel::Market, SortLevel::Market),
        ];
        // REGION defers the fine sort to the regional hub, so it exists only
        // when that hub is the last touch before the destination.
        let region_allowed = !is_direct && regional_hub == Some(second_to_last.as_str());
        variants.extend(
            region_allowed
                .as_some([
                    (SortLevel::Region, SortLevel::Market),
                    (SortLevel::Region, SortLevel::SortGroup),
                ])
                .into_iter()
                .flatten(),
        );

        variants
            .into_iter()
            .map(|(sort_level, dest_sort_level)| PathCandidate {
                origin: nodes[0].clone(),
                dest: nodes[nodes.len() - 1].clone(),
                nodes: nodes.clone(),
                path_type: PathType::from_edges(edges),
                sort_level,
                dest_sort_level,
                total_path_miles,
                direct_miles,
                atw_factor: atw_factor(total_path_miles, direct_miles),
            })
            .collect()
    }
}

/// The single degenerate candidate for an O = D pair.
fn od_equal_candidate(facility: &str) -> PathCandidate {
    PathCandidate {
        origin: facility.to_string(),
        dest: facility.to_string(),
        nodes: vec![facility.to_string(), facility.to_string()],
        path_type: PathType::Direct,
        sort_level: SortLevel::SortGroup,
        dest_sort_level: SortLevel::SortGroup,
        total_path_miles: 0.0,
        direct_miles: 0.0,
        atw_factor: 1.0,
    }
}
