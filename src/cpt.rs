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

//! Per-arc trailer departure schedules. Explicit `arc_cpts` overrides take
//! precedence; every sorting facility with an outbound window additionally
//! gets a synthesized wildcard schedule spaced evenly across that window.

use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDateTime};
use log::{debug, info, warn};

use crate::timealg::{local_naive_to_utc, minutes_between, utc_to_local_naive};
use crate::types::{
    minutes_to_time, time_to_minutes, Cpt, DaySet, FacilityMap, SortWindow, MINUTES_PER_DAY,
};

/// How many days ahead (or back) a departure search probes before giving up.
const CPT_SEARCH_DAYS: i64 = 4;

/// Resolved departure for an arc: the pull instant, the minutes waited for
/// it, and whether the trailer is active. A missing schedule departs
/// immediately but is flagged inactive.
pub type CptDeparture = (NaiveDateTime, f64, bool);

/// All departure schedules of the network, resolvable per arc.
#[derive(Debug, Clone)]
pub struct CptTable {
    /// Overrides keyed by `(origin, dest)` exactly, sorted by sequence.
    explicit: HashMap<(String, String), Vec<Cpt>>,
    /// Synthesized wildcard schedules keyed by origin.
    synthesized: HashMap<String, Vec<Cpt>>,
}

impl CptTable {
    /// Build the table from the facility map and the explicit overrides.
    pub fn new(facilities: &FacilityMap, overrides: Vec<Cpt>) -> Self {
        let mut explicit: HashMap<(String, String), Vec<Cpt>> = HashMap::new();
        for cpt in overrides {
            explicit
                .entry((cpt.origin.clone(), cpt.dest.clone()))
                .or_default()
                .push(cpt);
        }
        for cpts in explicit.values_mut() {
            cpts.sort_by_key(|c| c.sequence);
        }

        let mut synthesized = HashMap::new();
        for (name, fac) in facilities {
            if !fac.kind.is_sorting() {
                continue;
            }
            let (window, count) = match (fac.outbound_window(), fac.outbound_cpt_count) {
                (Some(w), Some(n)) if n >= 1 => (w, n),
                _ => continue,
            };
            synthesized.insert(name.clone(), synthesize_schedule(name, &window, count));
        }

        info!(
            "CPT table ready: {} explicit arcs, {} synthesized facility schedules",
            explicit.len(),
            synthesized.len()
        );

        Self {
            explicit,
            synthesized,
        }
    }

    /// Departures for an arc: the explicit entry verbatim when present, else
    /// the origin's wildcard schedule rebound to this destination, else
    /// nothing.
    pub fn cpts_for_arc(&self, origin: &str, dest: &str) -> Vec<Cpt> {
        if let Some(cpts) = self.explicit.get(&(origin.to_string(), dest.to_string())) {
            return cpts.clone();
        }
        if let Some(cpts) = self.synthesized.get(origin) {
            return cpts
                .iter()
                .cloned()
                .map(|mut c| {
                    c.dest = dest.to_string();
                    c
                })
                .collect();
        }
        debug!("no CPTs defined for arc {origin}->{dest}");
        Vec::new()
    }

    /// Departures for every arc of a node sequence.
    pub fn cpts_for_path(&self, nodes: &[String]) -> HashMap<(String, String), Vec<Cpt>> {
        nodes
            .windows(2)
            .map(|pair| {
                (
                    (pair[0].clone(), pair[1].clone()),
                    self.cpts_for_arc(&pair[0], &pair[1]),
                )
            })
            .collect()
    }

    /// The earliest departure at or after `ready_utc`, searching up to
    /// [`CPT_SEARCH_DAYS`] days ahead and honoring each departure's day mask.
    pub fn next_cpt_at_or_after(
        &self,
        origin: &str,
        dest: &str,
        ready_utc: NaiveDateTime,
    ) -> CptDeparture {
        let cpts = self.cpts_for_arc(origin, dest);
        if cpts.is_empty() {
            return (ready_utc, 0.0, false);
        }

        let mut best: Option<(NaiveDateTime, bool)> = None;
        for cpt in &cpts {
            let search_date = utc_to_local_naive(ready_utc, cpt.zone).date();
            for day_offset in 0..=CPT_SEARCH_DAYS {
                let date = search_date + Duration::days(day_offset);
                if !cpt.days.contains(date.weekday()) {
                    continue;
                }
                let cpt_utc = local_naive_to_utc(date.and_time(cpt.local_time), cpt.zone);
                if cpt_utc >= ready_utc && best.map_or(true, |(b, _)| cpt_utc < b) {
                    best = Some((cpt_utc, cpt.is_active));
                }
            }
        }

        match best {
            Some((cpt_utc, is_active)) => {
                let dwell = minutes_between(cpt_utc, ready_utc).max(0.0);
                (cpt_utc, dwell, is_active)
            }
            None => {
                warn!("no CPT within {CPT_SEARCH_DAYS} days for arc {origin}->{dest}, departing at ready time");
                (ready_utc, 0.0, false)
            }
        }
    }

    /// The latest departure at or before `target_utc`, searching up to
    /// [`CPT_SEARCH_DAYS`] days back. Diagnostics counterpart of
    /// [`next_cpt_at_or_after`](Self::next_cpt_at_or_after).
    pub fn latest_cpt_at_or_before(
        &self,
        origin: &str,
        dest: &str,
        target_utc: NaiveDateTime,
    ) -> Option<CptDeparture> {
        let cpts = self.cpts_for_arc(origin, dest);

        let mut best: Option<(NaiveDateTime, bool)> = None;
        for cpt in &cpts {
            let search_date = utc_to_local_naive(target_utc, cpt.zone).date();
            for day_offset in 0..=CPT_SEARCH_DAYS {
                let date = search_date - Duration::days(day_offset);
                if !cpt.days.contains(date.weekday()) {
                    continue;
                }
                let cpt_utc = local_naive_to_utc(date.and_time(cpt.local_time), cpt.zone);
                if cpt_utc <= target_utc && best.map_or(true, |(b, _)| cpt_utc > b) {
                    best = Some((cpt_utc, cpt.is_active));
                }
            }
        }

        best.map(|(cpt_utc, is_active)| {
            (
                cpt_utc,
                minutes_between(target_utc, cpt_utc).max(0.0),
                is_active,
            )
        })
    }
}

/// Evenly space `count` departures across an outbound window: a single CPT
/// sits at the window close; more than one start at the opening with spacing
/// `duration / (count - 1)`, wrapping past midnight as needed.
fn synthesize_schedule(origin: &str, window: &SortWindow, count: u32) -> Vec<Cpt> {
    let start = time_to_minutes(window.start_local);
    let duration = window.duration_minutes();

    let times: Vec<f64> = if count == 1 {
        vec![time_to_minutes(window.end_local)]
    } else {
        let interval = duration / (count - 1) as f64;
        (0..count)
            .map(|i| {
                let mut m = start + i as f64 * interval;
                if m >= MINUTES_PER_DAY {
                    m -= MINUTES_PER_DAY;
                }
                m
            })
            .collect()
    };

    times
        .into_iter()
        .enumerate()
        .map(|(i, minutes)| Cpt {
            origin: origin.to_string(),
            dest: "*".to_string(),
            sequence: i as u32 + 1,
            local_time: minutes_to_time(minutes),
            zone: window.zone,
            days: DaySet::every_day(),
            is_active: true,
        })
        .collect()
}
