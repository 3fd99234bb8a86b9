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

//! SLA feasibility: match each OD against the priority-ordered commitment
//! set and annotate timings with target hours, slack, and whether the path
//! makes service. Annotation is idempotent and never fails; an OD with no
//! matching commitment passes unconstrained.

use std::collections::HashMap;

use crate::types::{PathTiming, ServiceCommitment};

/// Commitments bucketed for O(1) lookup. Priority order: exact OD, then
/// origin-only, then dest-only, then zone, then the all-wildcard default.
#[derive(Debug, Default)]
pub struct CommitmentIndex {
    /// Exact `(origin, dest)` commitments.
    od: HashMap<(String, String), ServiceCommitment>,
    /// Origin-specific commitments (`dest = *`).
    origin: HashMap<String, ServiceCommitment>,
    /// Destination-specific commitments (`origin = *`).
    dest: HashMap<String, ServiceCommitment>,
    /// Zone-scoped commitments (both endpoints wildcarded).
    zone: HashMap<u32, ServiceCommitment>,
    /// The all-wildcard fallback.
    default: Option<ServiceCommitment>,
}

impl CommitmentIndex {
    /// Bucket a commitment list. Later rows overwrite earlier ones that land
    /// in the same bucket slot.
    pub fn new(commitments: &[ServiceCommitment]) -> Self {
        let mut index = Self::default();
        for sc in commitments {
            match (sc.origin.as_str(), sc.dest.as_str()) {
                ("*", "*") => match sc.zone {
                    Some(zone) => {
                        index.zone.insert(zone, sc.clone());
                    }
                    None => index.default = Some(sc.clone()),
                },
                ("*", dest) => {
                    index.dest.insert(dest.to_string(), sc.clone());
                }
                (origin, "*") => {
                    index.origin.insert(origin.to_string(), sc.clone());
                }
                (origin, dest) => {
                    index
                        .od
                        .insert((origin.to_string(), dest.to_string()), sc.clone());
                }
            }
        }
        index
    }

    /// The highest-priority commitment applying to an OD pair.
    pub fn lookup(&self, origin: &str, dest: &str, zone: u32) -> Option<&ServiceCommitment> {
        self.od
            .get(&(origin.to_string(), dest.to_string()))
            .or_else(|| self.origin.get(origin))
            .or_else(|| self.dest.get(dest))
            .or_else(|| self.zone.get(&zone))
            .or(self.default.as_ref())
    }

    /// Write the SLA fields of a timing from its matched commitment. With no
    /// match the timing passes unconstrained (infinite target).
    pub fn annotate(&self, timing: &mut PathTiming, zone: u32) {
        match self.lookup(&timing.path.origin, &timing.path.dest, zone) {
            Some(sc) => {
                let target = sc.target_hours();
                timing.sla_days = sc.sla_days;
                timing.sla_buffer_days = sc.sla_buffer_days;
                timing.sla_target_hours = target;
                timing.sla_met = timing.tit_hours <= target;
                timing.sla_slack_hours = target - timing.tit_hours;
                timing.priority_weight = sc.priority_weight;
            }
            None => {
                timing.sla_days = 0;
                timing.sla_buffer_days = 0.0;
                timing.sla_target_hours = f64::INFINITY;
                timing.sla_met = true;
                timing.sla_slack_hours = f64::INFINITY;
                timing.priority_weight = 1.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PathCandidate, PathType, SortLevel};
    use chrono::NaiveDate;

    fn commitment(origin: &str, dest: &str, zone: Option<u32>, sla_days: u32) -> ServiceCommitment {
        ServiceCommitment {
            origin: origin.to_string(),
            dest: dest.to_string(),
            zone,
            sla_days,
            sla_buffer_days: 0.0,
            priority_weight: 1.0,
        }
    }

    fn timing(tit_hours: f64) -> PathTiming {
        let now = NaiveDate::from_ymd_opt(2025, 6, 15)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap();
        PathTiming {
            path: PathCandidate {
                origin: "A".to_string(),
                dest: "C".to_string(),
                nodes: vec!["A".to_string(), "C".to_string()],
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
            sla_days: 0,
            sla_buffer_days: 0.0,
            sla_target_hours: 0.0,
            sla_met: false,
            sla_slack_hours: 0.0,
            priority_weight: 1.0,
        }
    }

    #[test]
    fn lookup_follows_priority_order() {
        let index = CommitmentIndex::new(&[
            commitment("*", "*", None, 5),
            commitment("*", "*", Some(4), 4),
            commitment("*", "C", None, 3),
            commitment("A", "*", None, 2),
            commitment("A", "C", None, 1),
        ]);

        assert_eq!(index.lookup("A", "C", 4).unwrap().sla_days, 1);
        assert_eq!(index.lookup("A", "X", 4).unwrap().sla_days, 2);
        assert_eq!(index.lookup("B", "C", 4).unwrap().sla_days, 3);
        assert_eq!(index.lookup("B", "X", 4).unwrap().sla_days, 4);
        assert_eq!(index.lookup("B", "X", 9).unwrap().sla_days, 5);
    }

    #[test]
    fn annotation_computes_target_and_slack() {
        let index = CommitmentIndex::new(&[commitment("*", "*", None, 3)]);
        let mut t = timing(60.0);
        index.annotate(&mut t, 4);

        assert_eq!(t.sla_days, 3);
        assert_eq!(t.sla_target_hours, 72.0);
        assert!(t.sla_met);
        assert_eq!(t.sla_slack_hours, 12.0);

        let mut miss = timing(80.0);
        index.annotate(&mut miss, 4);
        assert!(!miss.sla_met);
        assert_eq!(miss.sla_slack_hours, -8.0);
    }

    #[test]
    fn no_commitment_means_unconstrained_pass() {
        let index = CommitmentIndex::new(&[]);
        let mut t = timing(500.0);
        index.annotate(&mut t, 1);

        assert!(t.sla_met);
        assert_eq!(t.sla_target_hours, f64::INFINITY);
        assert_eq!(t.sla_slack_hours, f64::INFINITY);
    }

    #[test]
    fn annotation_is_idempotent() {
        let index = CommitmentIndex::new(&[commitment("*", "*", None, 3)]);
        let mut once = timing(60.0);
        index.annotate(&mut once, 2);
        let mut twice = once.clone();
        index.annotate(&mut twice, 2);
        assert_eq!(once, twice);
    }
}
