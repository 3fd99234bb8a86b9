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

//! The timing engine: forward-chains a deterministic step trace for one
//! [`PathCandidate`] from the fixed reference injection instant. Every hop
//! waits for its facility's sort window and its arc's next trailer pull; the
//! waits are attributed as dwell on the step they delay.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;

use crate::cpt::CptTable;
use crate::geo::{self, great_circle_miles, zone_for_distance, GeoError};
use crate::timealg::{align_to_window_start, local_naive_to_utc, minutes_between, minutes_duration};
use crate::types::{
    Facility, FacilityMap, MileageBand, PathCandidate, PathStep, PathTiming, RunSettings,
    SortLevel, StepKind, TimingParams,
};

/// Fallback linehaul speed when no mileage band rates a distance.
const FALLBACK_MPH: f64 = 50.0;

/// Error raised while timing a single path. Callers isolate these per path.
#[derive(Debug, Error, PartialEq)]
pub enum TimingError {
    /// The path references a facility that is not in the map.
    #[error("unknown facility in path: {0}")]
    UnknownFacility(String),
    /// A geographic computation failed.
    #[error(transparent)]
    Geo(#[from] GeoError),
}

/// Forward-chains step traces for path candidates.
#[derive(Debug)]
pub struct TimingEngine<'a> {
    /// Facility lookup.
    facilities: &'a FacilityMap,
    /// Bands sorted by zone, for per-leg transit rating.
    bands: &'a [MileageBand],
    /// Processing durations.
    params: TimingParams,
    /// Departure schedules.
    cpts: &'a CptTable,
    /// Calendar date of the reference injection.
    reference_date: NaiveDate,
    /// Local injection time-of-day at the origin.
    injection_time: NaiveTime,
}

impl<'a> TimingEngine<'a> {
    /// Build the engine over read-only network state.
    pub fn new(
        facilities: &'a FacilityMap,
        bands: &'a [MileageBand],
        params: TimingParams,
        cpts: &'a CptTable,
        settings: &RunSettings,
    ) -> Self {
        Self {
            facilities,
            bands,
            params,
            cpts,
            reference_date: settings.reference_injection_date,
            injection_time: settings.reference_injection_time,
        }
    }

    /// Compute the full timed trace of one candidate. The SLA fields of the
    /// result are left at their unannotated defaults for the feasibility
    /// checker to fill in.
    pub fn path_timing(&self, path: &PathCandidate) -> Result<PathTiming, TimingError> {
        let origin_fac = self.facility(&path.origin)?;
        let dest_fac = self.facility(&path.dest)?;

        let injection_utc = local_naive_to_utc(
            self.reference_date.and_time(self.injection_time),
            origin_fac.zone,
        );

        let mut steps: Vec<PathStep> = Vec::with_capacity(2 * path.nodes.len());
        let mut current_utc = injection_utc;
        let mut all_arcs_active = true;

        // Step 1: induction sort at the origin, inside its middle-mile
        // window. A missing window degenerates to sorting immediately.
        let (induction_start, window_dwell) = match origin_fac.mm_sort_window() {
            Some(window) => {
                align_to_window_start(current_utc, &window, self.params.induction_sort_minutes)
            }
            None => (current_utc, 0.0),
        };
        current_utc = self.push_step(
            &mut steps,
            StepKind::InductionSort {
                facility: path.origin.clone(),
                window_dwell_minutes: window_dwell,
            },
            induction_start,
            self.params.induction_sort_minutes,
        );

        // Transit legs; an O = D path has no network legs at all.
        if path.origin != path.dest {
            let second_to_last = &path.nodes[path.nodes.len() - 2];
            for (i, pair) in path.nodes.windows(2).enumerate() {
                let (from, to) = (&pair[0], &pair[1]);
                let from_fac = self.facility(from)?;
                let to_fac = self.facility(to)?;

                let (departure_utc, cpt_dwell, arc_active) =
                    self.cpts.next_cpt_at_or_after(from, to, current_utc);
                all_arcs_active &= arc_active;

                let distance =
                    great_circle_miles(from_fac.lat, from_fac.lon, to_fac.lat, to_fac.lon);
                let transit_minutes = match zone_for_distance(distance, self.bands) {
                    Some(band) => geo::transit_minutes(distance, band.circuity_factor, band.mph)?,
                    None => distance / FALLBACK_MPH * 60.0,
                };

                let arrival_utc = departure_utc + minutes_duration(transit_minutes);
                steps.push(PathStep {
                    sequence: steps.len() + 1,
                    kind: StepKind::Transit {
                        from: from.clone(),
                        to: to.clone(),
                        distance_miles: distance,
                        cpt_dwell_minutes: cpt_dwell,
                        departed_on_active_cpt: arc_active,
                    },
                    start_utc: departure_utc,
                    end_utc: arrival_utc,
                    duration_minutes: transit_minutes,
                });
                current_utc = arrival_utc;

                // intermediate processing; never at the destination itself
                let is_last_leg = i == path.nodes.len() - 2;
                if !is_last_leg {
                    current_utc = self.intermediate_processing(
                        &mut steps,
                        to_fac,
                        path,
                        to == second_to_last,
                        current_utc,
                    );
                }
            }
        }

        // Final step: last-mile sort, only for MARKET-level arrivals at a
        // facility that actually delivers.
        if path.dest_sort_level == SortLevel::Market && dest_fac.kind.is_delivery() {
            let (lm_start, window_dwell) = match dest_fac.lm_sort_window() {
                Some(window) => {
                    align_to_window_start(current_utc, &window, self.params.last_mile_sort_minutes)
                }
                None => (current_utc, 0.0),
            };
            current_utc = self.push_step(
                &mut steps,
                StepKind::LastMileSort {
                    facility: path.dest.clone(),
                    window_dwell_minutes: window_dwell,
                },
                lm_start,
                self.params.last_mile_sort_minutes,
            );
        }

        let delivery_utc = current_utc;
        let sort_window_dwell: f64 = steps.iter().map(|s| s.kind.window_dwell_minutes()).sum();
        let cpt_dwell: f64 = steps.iter().map(|s| s.kind.cpt_dwell_minutes()).sum();

        Ok(PathTiming {
            path: path.clone(),
            steps,
            injection_utc,
            delivery_utc,
            tit_hours: minutes_between(delivery_utc, injection_utc) / 60.0,
            sort_window_dwell_hours: sort_window_dwell / 60.0,
            cpt_dwell_hours: cpt_dwell / 60.0,
            total_dwell_hours: (sort_window_dwell + cpt_dwell) / 60.0,
            uses_only_active_arcs: all_arcs_active,
            sla_days: 0,
            sla_buffer_days: 0.0,
            sla_target_hours: 0.0,
            sla_met: false,
            sla_slack_hours: 0.0,
            priority_weight: 1.0,
        })
    }

    /// Crossdock or full sort at an intermediate facility, aligned to its
    /// middle-mile window. REGION-level paths re-sort at the regional hub
    /// (the second-to-last node); everything else crossdocks through.
    fn intermediate_processing(
        &self,
        steps: &mut Vec<PathStep>,
        facility: &Facility,
        path: &PathCandidate,
        at_second_to_last: bool,
        arrival_utc: NaiveDateTime,
    ) -> NaiveDateTime {
        let full_sort = path.sort_level == SortLevel::Region && at_second_to_last;
        let duration = if full_sort {
            self.params.middle_mile_sort_minutes
        } else {
            self.params.middle_mile_crossdock_minutes
        };

        let (start_utc, window_dwell) = match facility.mm_sort_window() {
            Some(window) => align_to_window_start(arrival_utc, &window, duration),
            None => (arrival_utc, 0.0),
        };

        let kind = if full_sort {
            StepKind::FullSort {
                facility: facility.name.clone(),
                window_dwell_minutes: window_dwell,
            }
        } else {
            StepKind::Crossdock {
                facility: facility.name.clone(),
                window_dwell_minutes: window_dwell,
            }
        };
        self.push_step(steps, kind, start_utc, duration)
    }

    /// Append a processing step and return its end instant.
    fn push_step(
        &self,
        steps: &mut Vec<PathStep>,
        kind: StepKind,
        start_utc: NaiveDateTime,
        duration_minutes: f64,
    ) -> NaiveDateTime {
        let end_utc = start_utc + minutes_duration(duration_minutes);
        steps.push(PathStep {
            sequence: steps.len() + 1,
            kind,
            start_utc,
            end_utc,
            duration_minutes,
        });
        end_utc
    }

    /// Facility lookup with a typed error.
    fn facility(&self, name: &str) -> Result<&Facility, TimingError> {
        self.facilities
            .get(name)
            .ok_or_else(|| TimingError::UnknownFacility(name.to_string()))
    }
}
