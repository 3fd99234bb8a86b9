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

//! Cross-table input validation. Every check runs and every error is logged
//! before the run aborts; warnings never abort.

use std::collections::HashSet;

use log::{error, info, warn};
use thiserror::Error;

use crate::io::ModelInputs;

/// Raised after all validation errors have been reported.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("input validation failed with {0} error(s)")]
pub struct ValidationError(pub usize);

/// Collects errors and warnings across all checks.
#[derive(Debug, Default)]
struct Findings {
    /// Fatal problems.
    errors: Vec<String>,
    /// Non-fatal problems.
    warnings: Vec<String>,
}

impl Findings {
    /// Record a fatal problem.
    fn error(&mut self, message: String) {
        self.errors.push(message);
    }

    /// Record a non-fatal problem.
    fn warning(&mut self, message: String) {
        self.warnings.push(message);
    }
}

/// Validate the loaded inputs. All errors are logged at once; the first
/// warning never stops a run.
pub fn validate(inputs: &ModelInputs) -> Result<(), ValidationError> {
    let mut findings = Findings::default();

    check_facilities(inputs, &mut findings);
    check_facility_references(inputs, &mut findings);
    check_injection_distribution(inputs, &mut findings);
    check_mileage_bands(inputs, &mut findings);
    check_timing_params(inputs, &mut findings);
    check_scenarios(inputs, &mut findings);
    check_service_commitments(inputs, &mut findings);

    for warning in &findings.warnings {
        warn!("validation warning: {warning}");
    }
    if !findings.errors.is_empty() {
        for e in &findings.errors {
            error!("validation error: {e}");
        }
        return Err(ValidationError(findings.errors.len()));
    }

    info!("input validation passed ({} warnings)", findings.warnings.len());
    Ok(())
}

/// Per-facility shape checks.
fn check_facilities(inputs: &ModelInputs, findings: &mut Findings) {
    for (name, fac) in &inputs.facilities {
        if !(-90.0..=90.0).contains(&fac.lat) {
            findings.error(format!("facility {name} has invalid latitude: {}", fac.lat));
        }
        if !(-180.0..=180.0).contains(&fac.lon) {
            findings.error(format!("facility {name} has invalid longitude: {}", fac.lon));
        }

        if fac.kind.is_sorting() && fac.mm_sort_window().is_none() {
            findings.warning(format!(
                "facility {name} ({}) missing middle-mile sort window",
                fac.kind
            ));
        }
        if fac.kind.is_delivery() && fac.lm_sort_window().is_none() {
            findings.warning(format!(
                "facility {name} ({}) missing last-mile sort window",
                fac.kind
            ));
        }

        if fac.is_injection_node {
            if fac.outbound_window().is_none() {
                findings.error(format!("injection facility {name} missing outbound window"));
            }
            match fac.outbound_cpt_count {
                Some(n) if n >= 1 => {}
                _ => findings.error(format!(
                    "injection facility {name} must have outbound_cpt_count >= 1"
                )),
            }
            if !fac.kind.is_sorting() {
                findings.error(format!(
                    "injection facility {name} must be hub or hybrid, got {}",
                    fac.kind
                ));
            }
        }
    }
}

/// `parent_hub` and `regional_sort_hub` must resolve.
fn check_facility_references(inputs: &ModelInputs, findings: &mut Findings) {
    for (name, fac) in &inputs.facilities {
        if let Some(parent) = &fac.parent_hub {
            if !inputs.facilities.contains_key(parent) {
                findings.error(format!(
                    "facility {name} references unknown parent_hub: {parent}"
                ));
            }
        }
        if let Some(hub) = &fac.regional_sort_hub {
            if !inputs.facilities.contains_key(hub) {
                findings.error(format!(
                    "facility {name} references unknown regional_sort_hub: {hub}"
                ));
            }
        }
    }
}

/// Injection distribution rows must name real, injectable sorting sites.
fn check_injection_distribution(inputs: &ModelInputs, findings: &mut Findings) {
    let mut listed = HashSet::new();
    for row in &inputs.injection_distribution {
        let name = &row.facility_name;
        listed.insert(name.clone());

        let fac = match inputs.facilities.get(name) {
            Some(fac) => fac,
            None => {
                findings.error(format!(
                    "injection distribution references unknown facility: {name}"
                ));
                continue;
            }
        };
        if !fac.is_injection_node {
            findings.warning(format!(
                "facility {name} in injection distribution but is_injection_node is false"
            ));
        }
        if !fac.kind.is_sorting() {
            findings.error(format!(
                "injection facility {name} must be hub or hybrid, got {}",
                fac.kind
            ));
        }
    }

    for (name, fac) in &inputs.facilities {
        if fac.is_injection_node && !listed.contains(name) {
            findings.warning(format!(
                "facility {name} has is_injection_node set but is not in injection_distribution"
            ));
        }
    }
}

/// Bands must be ordered, contiguous and physically sensible.
fn check_mileage_bands(inputs: &ModelInputs, findings: &mut Findings) {
    let bands = &inputs.mileage_bands;
    if bands.is_empty() {
        findings.error("no mileage bands defined".to_string());
        return;
    }

    for pair in bands.windows(2) {
        let (current, next) = (&pair[0], &pair[1]);
        if next.zone <= current.zone {
            findings.error(format!(
                "mileage band zones must be strictly ascending: {} then {}",
                current.zone, next.zone
            ));
        } else if next.zone - current.zone != 1 {
            findings.warning(format!(
                "gap in mileage band zones: {} to {}",
                current.zone, next.zone
            ));
        }

        if current.miles_max > next.miles_min {
            findings.error(format!(
                "mileage bands overlap: zone {} max ({}) > zone {} min ({})",
                current.zone, current.miles_max, next.zone, next.miles_min
            ));
        } else if current.miles_max < next.miles_min {
            findings.warning(format!(
                "gap in mileage bands between zone {} and {}: {} to {}",
                current.zone, next.zone, current.miles_max, next.miles_min
            ));
        }
    }

    for band in bands {
        if band.circuity_factor < 1.0 {
            findings.warning(format!(
                "zone {} has circuity_factor < 1.0: {}",
                band.zone, band.circuity_factor
            ));
        }
        if band.mph <= 0.0 {
            findings.error(format!(
                "zone {} has non-positive mph: {}",
                band.zone, band.mph
            ));
        }
    }
}

/// All processing durations must be non-negative.
fn check_timing_params(inputs: &ModelInputs, findings: &mut Findings) {
    let p = &inputs.timing_params;
    for (name, value) in [
        ("induction_sort_minutes", p.induction_sort_minutes),
        ("middle_mile_crossdock_minutes", p.middle_mile_crossdock_minutes),
        ("middle_mile_sort_minutes", p.middle_mile_sort_minutes),
        ("last_mile_sort_minutes", p.last_mile_sort_minutes),
    ] {
        if value < 0.0 {
            findings.error(format!("{name} must be non-negative: {value}"));
        }
    }
}

/// Scenarios must reference demand years that exist.
fn check_scenarios(inputs: &ModelInputs, findings: &mut Findings) {
    let years: HashSet<i32> = inputs.demand.iter().map(|d| d.year).collect();
    for scenario in &inputs.scenarios {
        if !years.contains(&scenario.year) {
            findings.error(format!(
                "scenario {} references unknown year {}",
                scenario.scenario_id, scenario.year
            ));
        }
    }
}

/// Commitments must reference known endpoints and carry sane targets.
fn check_service_commitments(inputs: &ModelInputs, findings: &mut Findings) {
    let mut zones: HashSet<u32> = inputs.mileage_bands.iter().map(|b| b.zone).collect();
    zones.insert(0); // zone 0 is direct injection

    for sc in &inputs.service_commitments {
        if sc.origin != "*" && !inputs.facilities.contains_key(&sc.origin) {
            findings.error(format!(
                "service commitment references unknown origin: {}",
                sc.origin
            ));
        }
        if sc.dest != "*" && !inputs.facilities.contains_key(&sc.dest) {
            findings.error(format!(
                "service commitment references unknown dest: {}",
                sc.dest
            ));
        }
        if let Some(zone) = sc.zone {
            if !zones.contains(&zone) {
                findings.warning(format!(
                    "service commitment references zone {zone} not in mileage_bands"
                ));
            }
        }
        if sc.sla_days < 1 {
            findings.error(format!(
                "service commitment sla_days must be >= 1: {}",
                sc.sla_days
            ));
        }
        if sc.sla_buffer_days < 0.0 {
            findings.warning(format!(
                "service commitment has negative sla_buffer_days: {}",
                sc.sla_buffer_days
            ));
        }
        if sc.priority_weight <= 0.0 {
            findings.error(format!(
                "service commitment priority_weight must be positive: {}",
                sc.priority_weight
            ));
        }
    }
}
