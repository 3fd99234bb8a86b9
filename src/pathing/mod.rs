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

//! The evaluation pipeline: for every OD pair with network volume, enumerate
//! candidates, time each one, annotate SLA feasibility, and keep the
//! survivors. OD pairs are independent, so the fold runs data-parallel over
//! a read-only [`NetworkContext`].

use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::{info, warn};
use rayon::prelude::*;

use crate::cpt::CptTable;
use crate::demand::{DemandBuilder, DemandError};
use crate::io::ModelInputs;
use crate::types::{
    FacilityMap, MileageBand, OdDemand, PathTiming, RunSettings, SortLevel, TimingParams,
};

pub mod enumerate;
pub mod feasibility;
pub mod timing;

use enumerate::PathEnumerator;
use feasibility::CommitmentIndex;
use timing::TimingEngine;

/// Read-only network state shared by every per-OD evaluation.
#[derive(Debug)]
pub struct NetworkContext<'a> {
    /// Facility lookup.
    pub facilities: &'a FacilityMap,
    /// Mileage bands sorted by zone.
    pub bands: &'a [MileageBand],
    /// Processing durations.
    pub params: TimingParams,
    /// Resolved departure schedules.
    pub cpts: CptTable,
    /// Indexed service commitments.
    pub commitments: CommitmentIndex,
    /// Run settings.
    pub settings: &'a RunSettings,
}

impl<'a> NetworkContext<'a> {
    /// Build the shared context from loaded inputs.
    pub fn new(inputs: &'a ModelInputs) -> Self {
        Self {
            facilities: &inputs.facilities,
            bands: &inputs.mileage_bands,
            params: inputs.timing_params,
            cpts: CptTable::new(&inputs.facilities, inputs.arc_cpts.clone()),
            commitments: CommitmentIndex::new(&inputs.service_commitments),
            settings: &inputs.run_settings,
        }
    }
}

/// Build OD demand for every scenario of the loaded inputs.
pub fn build_demand(inputs: &ModelInputs) -> Result<Vec<OdDemand>, DemandError> {
    DemandBuilder::new(
        &inputs.facilities,
        &inputs.zips,
        &inputs.demand,
        &inputs.injection_distribution,
        &inputs.scenarios,
        &inputs.mileage_bands,
    )
    .build()
}

/// All annotated timings, grouped per OD pair.
pub type OdTimings = BTreeMap<(String, String), Vec<PathTiming>>;

/// Evaluate every OD pair with network volume (zone > 0): enumerate, time,
/// and annotate. Failures inside a single path are logged and that path is
/// dropped; the rest of its OD continues.
pub fn evaluate(ctx: &NetworkContext<'_>, demands: &[OdDemand]) -> OdTimings {
    let od_pairs: BTreeSet<(String, String)> = demands
        .iter()
        .filter(|d| d.zone > 0)
        .map(|d| (d.origin.clone(), d.dest.clone()))
        .collect();

    let od_zones: HashMap<(String, String), u32> = demands
        .iter()
        .map(|d| ((d.origin.clone(), d.dest.clone()), d.zone))
        .collect();

    info!("evaluating {} unique OD pairs", od_pairs.len());

    let enumerator = PathEnumerator::new(ctx.facilities, ctx.settings);
    let engine = TimingEngine::new(ctx.facilities, ctx.bands, ctx.params, &ctx.cpts, ctx.settings);

    let od_timings: OdTimings = od_pairs
        .into_par_iter()
        .map(|(origin, dest)| {
            let timings = evaluate_od(ctx, &enumerator, &engine, &origin, &dest, &od_zones);
            ((origin, dest), timings)
        })
        .collect();

    let total: usize = od_timings.values().map(Vec::len).sum();
    let feasible: usize = od_timings
        .values()
        .flatten()
        .filter(|t| t.sla_met)
        .count();
    info!(
        "evaluated {total} path timings across {} OD pairs, {feasible} meet SLA",
        od_timings.len()
    );

    od_timings
}

/// Evaluate one OD pair end to end.
fn evaluate_od(
    ctx: &NetworkContext<'_>,
    enumerator: &PathEnumerator<'_>,
    engine: &TimingEngine<'_>,
    origin: &str,
    dest: &str,
    od_zones: &HashMap<(String, String), u32>,
) -> Vec<PathTiming> {
    let candidates = match enumerator.candidates(origin, dest) {
        Ok(candidates) => candidates,
        Err(e) => {
            warn!("cannot enumerate {origin}->{dest}: {e}");
            return Vec::new();
        }
    };

    let zone = od_zones
        .get(&(origin.to_string(), dest.to_string()))
        .copied()
        .unwrap_or(1);

    let mut timings = Vec::new();
    for candidate in candidates {
        match engine.path_timing(&candidate) {
            Ok(mut timing) => {
                ctx.commitments.annotate(&mut timing, zone);
                timings.push(timing);
            }
            Err(e) => warn!("failed to time path {candidate}: {e}"),
        }
    }

    if let Some(keep) = ctx.settings.top_paths_per_sort_level {
        timings = prune_top_paths(timings, keep);
    }
    timings
}

/// Keep only the `keep` best timings per (origin sort level, destination
/// sort level) group, under the ranking key.
pub fn prune_top_paths(timings: Vec<PathTiming>, keep: usize) -> Vec<PathTiming> {
    let mut groups: BTreeMap<(SortLevel, SortLevel), Vec<PathTiming>> = BTreeMap::new();
    for timing in timings {
        groups
            .entry((timing.path.sort_level, timing.path.dest_sort_level))
            .or_default()
            .push(timing);
    }

    let mut kept = Vec::new();
    for (_, mut group) in groups {
        group.sort_by(|a, b| a.ranking_cmp(b));
        group.truncate(keep);
        kept.extend(group);
    }
    kept
}
