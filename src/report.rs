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

//! Per-scenario aggregation of the evaluated paths into the four output
//! tables handed to the downstream sort-selection model: `summary`,
//! `od_demand`, `feasible_paths` and `sla_miss_detail`.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::info;
use serde::Serialize;

use crate::pathing::OdTimings;
use crate::types::{FlowType, OdDemand, PathTiming};

/// One row of the per-scenario `summary` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRecord {
    /// Scenario identifier.
    pub scenario_id: String,
    /// Number of OD demand rows.
    pub total_od_pairs: usize,
    /// Total packages per day.
    pub total_packages: f64,
    /// Path timings produced across the scenario's OD pairs.
    pub paths_evaluated: usize,
    /// Of those, timings meeting their SLA.
    pub paths_feasible: usize,
    /// Fraction of volume with at least one feasible path.
    pub pct_volume_at_sla: f64,
    /// Fraction of volume whose every path misses.
    pub pct_volume_missed: f64,
    /// Mean best TIT over the scenario's evaluated OD pairs.
    pub avg_tit_hours: f64,
}

/// One row of the `od_demand` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OdDemandRecord {
    /// Scenario identifier.
    pub scenario_id: String,
    /// Origin facility.
    pub origin: String,
    /// Destination facility.
    pub dest: String,
    /// Packages per day.
    pub pkgs_day: f64,
    /// Rating zone.
    pub zone: u32,
    /// Flow family.
    pub flow_type: String,
    /// Day profile.
    pub day_type: String,
}

/// One row of the `feasible_paths` table: a path x sort-level candidate with
/// its TIT decomposition, SLA annotation, and the OD's demand split.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeasiblePathRecord {
    /// Scenario identifier.
    pub scenario_id: String,
    /// Origin facility.
    pub origin: String,
    /// Destination facility.
    pub dest: String,
    /// First path node.
    pub node_1: Option<String>,
    /// Second path node.
    pub node_2: Option<String>,
    /// Third path node.
    pub node_3: Option<String>,
    /// Fourth path node.
    pub node_4: Option<String>,
    /// Fifth path node.
    pub node_5: Option<String>,
    /// Path shape tag.
    pub path_type: String,
    /// Origin sort level.
    pub sort_level: String,
    /// Destination sort level.
    pub dest_sort_level: String,
    /// Total path miles, rounded to a tenth.
    pub total_path_miles: f64,
    /// Direct great-circle miles, rounded to a tenth.
    pub direct_miles: f64,
    /// Around-the-world factor, rounded to thousandths.
    pub atw_factor: f64,
    /// Time in transit, hours.
    pub tit_hours: f64,
    /// Hours waiting on sort windows.
    pub sort_window_dwell_hours: f64,
    /// Hours waiting on trailer pulls.
    pub cpt_dwell_hours: f64,
    /// Total dwell hours.
    pub total_dwell_hours: f64,
    /// Matched commitment days.
    pub sla_days: u32,
    /// Allowed hours.
    pub sla_target_hours: f64,
    /// Whether the path makes service.
    pub sla_met: bool,
    /// Slack hours against the target.
    pub sla_slack_hours: f64,
    /// Whether every transit used an active CPT.
    pub uses_only_active_arcs: bool,
    /// Middle-mile packages per day on this OD.
    pub pkgs_mm: f64,
    /// Zone-skip packages per day on this OD.
    pub pkgs_zs: f64,
    /// Direct-injection packages per day on this OD.
    pub pkgs_di: f64,
    /// Rating zone.
    pub zone: u32,
}

/// One row of the `sla_miss_detail` table: an OD whose best path misses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlaMissRecord {
    /// Scenario identifier.
    pub scenario_id: String,
    /// Origin facility.
    pub origin: String,
    /// Destination facility.
    pub dest: String,
    /// Rating zone.
    pub zone: u32,
    /// Packages per day affected.
    pub pkgs_day: f64,
    /// Matched commitment days.
    pub sla_days: u32,
    /// TIT of the best path.
    pub best_tit_hours: f64,
    /// Hours by which the best path misses.
    pub miss_hours: f64,
}

/// The four output tables of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reports {
    /// One row per scenario.
    pub summary: Vec<SummaryRecord>,
    /// One row per OD demand flow.
    pub od_demand: Vec<OdDemandRecord>,
    /// One row per path x sort-level candidate.
    pub feasible_paths: Vec<FeasiblePathRecord>,
    /// One row per OD whose best path misses service.
    pub sla_miss_detail: Vec<SlaMissRecord>,
}

/// Demand volume of one OD pair split by flow family.
#[derive(Debug, Clone, Copy, Default)]
struct FlowVolumes {
    /// Middle-mile packages.
    mm: f64,
    /// Zone-skip packages.
    zs: f64,
    /// Direct-injection packages.
    di: f64,
}

/// Build all four tables from the demand and the evaluated timings.
pub fn build_reports(demands: &[OdDemand], od_timings: &OdTimings) -> Reports {
    let by_scenario = demands_by_scenario(demands);

    let reports = Reports {
        summary: build_summary(&by_scenario, od_timings),
        od_demand: build_od_demand(demands),
        feasible_paths: build_feasible_paths(&by_scenario, od_timings),
        sla_miss_detail: build_sla_miss_detail(&by_scenario, od_timings),
    };

    info!(
        "built reports: {} summary, {} od_demand, {} feasible_paths, {} sla_miss_detail rows",
        reports.summary.len(),
        reports.od_demand.len(),
        reports.feasible_paths.len(),
        reports.sla_miss_detail.len()
    );
    reports
}

/// Group demand rows by scenario, in scenario-id order.
fn demands_by_scenario<'a>(demands: &'a [OdDemand]) -> BTreeMap<&'a str, Vec<&'a OdDemand>> {
    let mut by_scenario: BTreeMap<&str, Vec<&OdDemand>> = BTreeMap::new();
    for demand in demands {
        by_scenario
            .entry(demand.scenario_id.as_str())
            .or_default()
            .push(demand);
    }
    by_scenario
}

/// Sum a scenario's demand per OD pair, split by flow family.
fn flow_volumes<'a>(
    scenario_demands: &[&'a OdDemand],
) -> HashMap<(&'a str, &'a str), FlowVolumes> {
    let mut volumes: HashMap<(&str, &str), FlowVolumes> = HashMap::new();
    for demand in scenario_demands {
        let entry = volumes
            .entry((demand.origin.as_str(), demand.dest.as_str()))
            .or_default();
        match demand.flow_type {
            FlowType::MiddleMile => entry.mm += demand.pkgs_day,
            FlowType::ZoneSkip => entry.zs += demand.pkgs_day,
            FlowType::DirectInjection => entry.di += demand.pkgs_day,
        }
    }
    volumes
}

/// The best timing of a list under the ranking key, preferring feasible
/// timings when any exist.
fn best_timing<'a>(timings: &'a [PathTiming]) -> Option<&'a PathTiming> {
    let feasible = timings.iter().filter(|t| t.sla_met);
    feasible
        .min_by(|a, b| a.ranking_cmp(b))
        .or_else(|| timings.iter().min_by(|a, b| a.ranking_cmp(b)))
}

/// Build the `summary` table.
fn build_summary(
    by_scenario: &BTreeMap<&str, Vec<&OdDemand>>,
    od_timings: &OdTimings,
) -> Vec<SummaryRecord> {
    let mut rows = Vec::new();

    for (scenario_id, scenario_demands) in by_scenario {
        let total_packages: f64 = scenario_demands.iter().map(|d| d.pkgs_day).sum();

        let od_pairs: BTreeSet<(&str, &str)> = scenario_demands
            .iter()
            .filter(|d| d.flow_type != FlowType::DirectInjection)
            .map(|d| (d.origin.as_str(), d.dest.as_str()))
            .collect();

        let mut paths_evaluated = 0;
        let mut paths_feasible = 0;
        let mut tit_sum = 0.0;
        let mut tit_count = 0usize;
        let mut od_feasible: HashMap<(&str, &str), bool> = HashMap::new();

        for (origin, dest) in &od_pairs {
            let timings = od_timings
                .get(&(origin.to_string(), dest.to_string()))
                .map(Vec::as_slice)
                .unwrap_or_default();
            paths_evaluated += timings.len();
            let feasible = timings.iter().filter(|t| t.sla_met).count();
            paths_feasible += feasible;
            od_feasible.insert((*origin, *dest), feasible > 0);

            if let Some(best) = best_timing(timings) {
                tit_sum += best.tit_hours;
                tit_count += 1;
            }
        }

        // direct injection is same-roof zone-0 volume, always at service
        let mut volume_at_sla = 0.0;
        let mut volume_missed = 0.0;
        for demand in scenario_demands {
            if demand.flow_type == FlowType::DirectInjection {
                volume_at_sla += demand.pkgs_day;
                continue;
            }
            match od_feasible.get(&(demand.origin.as_str(), demand.dest.as_str())) {
                Some(true) => volume_at_sla += demand.pkgs_day,
                Some(false) => volume_missed += demand.pkgs_day,
                None => {}
            }
        }

        rows.push(SummaryRecord {
            scenario_id: scenario_id.to_string(),
            total_od_pairs: scenario_demands.len(),
            total_packages: total_packages.round(),
            paths_evaluated,
            paths_feasible,
            pct_volume_at_sla: ratio(volume_at_sla, total_packages),
            pct_volume_missed: ratio(volume_missed, total_packages),
            avg_tit_hours: if tit_count > 0 {
                round2(tit_sum / tit_count as f64)
            } else {
                0.0
            },
        });
    }

    rows
}

/// Build the `od_demand` table.
fn build_od_demand(demands: &[OdDemand]) -> Vec<OdDemandRecord> {
    demands
        .iter()
        .map(|d| OdDemandRecord {
            scenario_id: d.scenario_id.clone(),
            origin: d.origin.clone(),
            dest: d.dest.clone(),
            pkgs_day: d.pkgs_day,
            zone: d.zone,
            flow_type: d.flow_type.to_string(),
            day_type: d.day_type.to_string(),
        })
        .collect()
}

/// Build the `feasible_paths` table: one row per timing, plus one special
/// row per direct-injection demand.
fn build_feasible_paths(
    by_scenario: &BTreeMap<&str, Vec<&OdDemand>>,
    od_timings: &OdTimings,
) -> Vec<FeasiblePathRecord> {
    let mut rows = Vec::new();

    for (scenario_id, scenario_demands) in by_scenario {
        let volumes = flow_volumes(scenario_demands);

        // direct injection never traverses the network; emit it as its own
        // degenerate at-service row
        for demand in scenario_demands {
            if demand.flow_type != FlowType::DirectInjection {
                continue;
            }
            let volume = volumes
                .get(&(demand.origin.as_str(), demand.dest.as_str()))
                .copied()
                .unwrap_or_default();
            rows.push(FeasiblePathRecord {
                scenario_id: scenario_id.to_string(),
                origin: demand.origin.clone(),
                dest: demand.dest.clone(),
                node_1: Some(demand.dest.clone()),
                node_2: None,
                node_3: None,
                node_4: None,
                node_5: None,
                path_type: "direct_injection".to_string(),
                sort_level: "n/a".to_string(),
                dest_sort_level: "n/a".to_string(),
                total_path_miles: 0.0,
                direct_miles: 0.0,
                atw_factor: 1.0,
                tit_hours: 0.0,
                sort_window_dwell_hours: 0.0,
                cpt_dwell_hours: 0.0,
                total_dwell_hours: 0.0,
                sla_days: 0,
                sla_target_hours: 0.0,
                sla_met: true,
                sla_slack_hours: 0.0,
                uses_only_active_arcs: true,
                pkgs_mm: 0.0,
                pkgs_zs: 0.0,
                pkgs_di: volume.di,
                zone: 0,
            });
        }

        let od_pairs: BTreeSet<(&str, &str, u32)> = scenario_demands
            .iter()
            .filter(|d| d.flow_type != FlowType::DirectInjection)
            .map(|d| (d.origin.as_str(), d.dest.as_str(), d.zone))
            .collect();

        for (origin, dest, zone) in od_pairs {
            let timings = match od_timings.get(&(origin.to_string(), dest.to_string())) {
                Some(timings) if !timings.is_empty() => timings,
                _ => continue,
            };
            let volume = volumes.get(&(origin, dest)).copied().unwrap_or_default();

            for timing in timings {
                let nodes = &timing.path.nodes;
                rows.push(FeasiblePathRecord {
                    scenario_id: scenario_id.to_string(),
                    origin: origin.to_string(),
                    dest: dest.to_string(),
                    node_1: nodes.first().cloned(),
                    node_2: nodes.get(1).cloned(),
                    node_3: nodes.get(2).cloned(),
                    node_4: nodes.get(3).cloned(),
                    node_5: nodes.get(4).cloned(),
                    path_type: timing.path.path_type.to_string(),
                    sort_level: timing.path.sort_level.to_string(),
                    dest_sort_level: timing.path.dest_sort_level.to_string(),
                    total_path_miles: round1(timing.path.total_path_miles),
                    direct_miles: round1(timing.path.direct_miles),
                    atw_factor: round3(timing.path.atw_factor),
                    tit_hours: round2(timing.tit_hours),
                    sort_window_dwell_hours: round2(timing.sort_window_dwell_hours),
                    cpt_dwell_hours: round2(timing.cpt_dwell_hours),
                    total_dwell_hours: round2(timing.total_dwell_hours),
                    sla_days: timing.sla_days,
                    sla_target_hours: round2(timing.sla_target_hours),
                    sla_met: timing.sla_met,
                    sla_slack_hours: round2(timing.sla_slack_hours),
                    uses_only_active_arcs: timing.uses_only_active_arcs,
                    pkgs_mm: volume.mm,
                    pkgs_zs: volume.zs,
                    pkgs_di: 0.0,
                    zone,
                });
            }
        }
    }

    rows
}

/// Build the `sla_miss_detail` table.
fn build_sla_miss_detail(
    by_scenario: &BTreeMap<&str, Vec<&OdDemand>>,
    od_timings: &OdTimings,
) -> Vec<SlaMissRecord> {
    let mut rows = Vec::new();

    for (scenario_id, scenario_demands) in by_scenario {
        let volumes = flow_volumes(scenario_demands);

        let od_pairs: BTreeSet<(&str, &str, u32)> = scenario_demands
            .iter()
            .filter(|d| d.flow_type != FlowType::DirectInjection)
            .map(|d| (d.origin.as_str(), d.dest.as_str(), d.zone))
            .collect();

        for (origin, dest, zone) in od_pairs {
            let timings = match od_timings.get(&(origin.to_string(), dest.to_string())) {
                Some(timings) if !timings.is_empty() => timings,
                _ => continue,
            };
            let best = match timings.iter().min_by(|a, b| a.ranking_cmp(b)) {
                Some(best) => best,
                None => continue,
            };
            if best.sla_met {
                continue;
            }

            let volume = volumes.get(&(origin, dest)).copied().unwrap_or_default();
            rows.push(SlaMissRecord {
                scenario_id: scenario_id.to_string(),
                origin: origin.to_string(),
                dest: dest.to_string(),
                zone,
                pkgs_day: (volume.mm + volume.zs).round(),
                sla_days: best.sla_days,
                best_tit_hours: round2(best.tit_hours),
                miss_hours: round2(-best.sla_slack_hours),
            });
        }
    }

    rows
}

/// Safe ratio, rounded to four decimals.
fn ratio(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        (part / whole * 10_000.0).round() / 10_000.0
    } else {
        0.0
    }
}

/// Round to one decimal.
fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Round to two decimals.
fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Round to three decimals.
fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DayType, PathCandidate, PathType, SortLevel};
    use chrono::NaiveDate;

    fn demand(
        scenario: &str,
        origin: &str,
        dest: &str,
        pkgs: f64,
        zone: u32,
        flow: FlowType,
    ) -> OdDemand {
        OdDemand {
            scenario_id: scenario.to_string(),
            origin: origin.to_string(),
            dest: dest.to_string(),
            pkgs_day: pkgs,
            zone,
            flow_type: flow,
            day_type: DayType::Offpeak,
        }
    }

    fn timing(origin: &str, dest: &str, tit_hours: f64, sla_met: bool) -> PathTiming {
        let now = NaiveDate::from_ymd_opt(2025, 6, 15)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap();
        PathTiming {
            path: PathCandidate {
                origin: origin.to_string(),
                dest: dest.to_string(),
                nodes: vec![origin.to_string(), dest.to_string()],
                path_type: PathType::Direct,
                sort_level: SortLevel::SortGroup,
                dest_sort_level: SortLevel::SortGroup,
                total_path_miles: 100.0,
                direct_miles: 100.0,
                atw_factor: 1.0,
            },
            steps: Vec::new(),
            injection_utc: now,
            delivery_utc: now,
            tit_hours,
            sort_window_dwell_hours: 0.0,
            cpt_dwell_hours: 0.0,
            total_dwell_hours: 0.0,
            uses_only_active_arcs: true,
            sla_days: 3,
            sla_buffer_days: 0.0,
            sla_target_hours: 72.0,
            sla_met,
            sla_slack_hours: 72.0 - tit_hours,
            priority_weight: 1.0,
        }
    }

    fn od_timings(entries: Vec<PathTiming>) -> OdTimings {
        let mut map = OdTimings::new();
        for t in entries {
            map.entry((t.path.origin.clone(), t.path.dest.clone()))
                .or_default()
                .push(t);
        }
        map
    }

    #[test]
    fn summary_counts_volume_at_sla() {
        let demands = vec![
            demand("s1", "C", "C", 100.0, 0, FlowType::DirectInjection),
            demand("s1", "A", "C", 200.0, 4, FlowType::MiddleMile),
            demand("s1", "B", "C", 50.0, 2, FlowType::ZoneSkip),
        ];
        let timings = od_timings(vec![
            timing("A", "C", 60.0, true),
            timing("A", "C", 90.0, false),
            timing("B", "C", 80.0, false),
        ]);

        let summary = build_summary(&demands_by_scenario(&demands), &timings);
        assert_eq!(summary.len(), 1);
        let row = &summary[0];
        assert_eq!(row.total_od_pairs, 3);
        assert_eq!(row.paths_evaluated, 3);
        assert_eq!(row.paths_feasible, 1);
        // DI (100) plus the feasible A->C (200) out of 350
        assert_eq!(row.pct_volume_at_sla, ratio(300.0, 350.0));
        assert_eq!(row.pct_volume_missed, ratio(50.0, 350.0));
        // best per OD: 60 and 80
        assert_eq!(row.avg_tit_hours, 70.0);
    }

    #[test]
    fn feasible_paths_split_demand_by_flow() {
        // the same OD carries both middle-mile and zone-skip volume
        let demands = vec![
            demand("s1", "A", "C", 200.0, 4, FlowType::MiddleMile),
            demand("s1", "A", "C", 50.0, 4, FlowType::ZoneSkip),
        ];
        let timings = od_timings(vec![timing("A", "C", 60.0, true)]);

        let rows = build_feasible_paths(&demands_by_scenario(&demands), &timings);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].pkgs_mm, 200.0);
        assert_eq!(rows[0].pkgs_zs, 50.0);
        assert_eq!(rows[0].pkgs_di, 0.0);
        assert_eq!(rows[0].node_1.as_deref(), Some("A"));
        assert_eq!(rows[0].node_2.as_deref(), Some("C"));
        assert_eq!(rows[0].node_3, None);
    }

    #[test]
    fn direct_injection_gets_a_degenerate_row() {
        let demands = vec![demand("s1", "C", "C", 100.0, 0, FlowType::DirectInjection)];
        let rows = build_feasible_paths(&demands_by_scenario(&demands), &OdTimings::new());

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].path_type, "direct_injection");
        assert_eq!(rows[0].sort_level, "n/a");
        assert!(rows[0].sla_met);
        assert_eq!(rows[0].pkgs_di, 100.0);
        assert_eq!(rows[0].zone, 0);
    }

    #[test]
    fn miss_detail_reports_only_misses() {
        let demands = vec![
            demand("s1", "A", "C", 200.0, 4, FlowType::MiddleMile),
            demand("s1", "B", "C", 50.0, 2, FlowType::ZoneSkip),
        ];
        let timings = od_timings(vec![
            timing("A", "C", 60.0, true),
            timing("B", "C", 80.0, false),
        ]);

        let rows = build_sla_miss_detail(&demands_by_scenario(&demands), &timings);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].origin, "B");
        assert_eq!(rows[0].miss_hours, 8.0);
        assert_eq!(rows[0].pkgs_day, 50.0);
    }

    #[test]
    fn best_timing_prefers_feasible_paths() {
        let timings = vec![timing("A", "C", 90.0, false), timing("A", "C", 95.0, true)];
        assert_eq!(best_timing(&timings).unwrap().tit_hours, 95.0);

        let none_feasible = vec![timing("A", "C", 90.0, false)];
        assert_eq!(best_timing(&none_feasible).unwrap().tit_hours, 90.0);
    }
}
