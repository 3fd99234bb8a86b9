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

//! Builds the OD demand matrix per scenario: annual volume is split into a
//! daily rate, fanned across the three flow families (direct injection, zone
//! skip, middle mile), and distributed by injection share times destination
//! population share.

use std::collections::BTreeMap;

use log::{debug, info, warn};
use thiserror::Error;

use crate::geo::{great_circle_miles, zone_for_distance};
use crate::types::{
    DayShares, DayType, DemandYear, FacilityKind, FacilityMap, FlowType, InjectionShare,
    MileageBand, OdDemand, ScenarioDef, ZipAssignment,
};

/// OD volumes below this many packages per day are dropped.
const MIN_OD_PKGS: f64 = 0.01;
/// Injection shares below this contribute nothing and are skipped.
const MIN_INJECTION_SHARE: f64 = 1e-4;
/// Allowed deviation of the three flow shares from 1.0.
const FLOW_SHARE_TOLERANCE: f64 = 0.01;

/// Error raised while building demand.
#[derive(Debug, Error, PartialEq)]
pub enum DemandError {
    /// The three flow shares of a day profile do not sum to 1.0.
    #[error(
        "flow shares must sum to 1.0, got {total:.4} (mm={mm}, zs={zs}, di={di})"
    )]
    SharesDoNotSum {
        /// Actual sum.
        total: f64,
        /// Middle-mile share.
        mm: f64,
        /// Zone-skip share.
        zs: f64,
        /// Direct-injection share.
        di: f64,
    },
    /// A scenario references a year absent from the demand table.
    #[error("no demand data for year {0}")]
    NoDataForScenario(i32),
}

/// Builds [`OdDemand`] records for every scenario.
#[derive(Debug)]
pub struct DemandBuilder<'a> {
    /// Facility lookup.
    facilities: &'a FacilityMap,
    /// Annual demand rows.
    demand_years: &'a [DemandYear],
    /// Scenarios to build.
    scenarios: &'a [ScenarioDef],
    /// Bands sorted by zone, for OD zone rating.
    bands: &'a [MileageBand],
    /// Destination share per delivery facility, population-derived.
    dest_shares: BTreeMap<String, f64>,
    /// Facility name to its regional sort hub.
    regional_hub_of: BTreeMap<String, String>,
    /// Injection share per facility.
    injection_shares: BTreeMap<String, f64>,
}

impl<'a> DemandBuilder<'a> {
    /// Derive all share tables from the raw inputs.
    pub fn new(
        facilities: &'a FacilityMap,
        zips: &'a [ZipAssignment],
        demand_years: &'a [DemandYear],
        injection: &'a [InjectionShare],
        scenarios: &'a [ScenarioDef],
        bands: &'a [MileageBand],
    ) -> Self {
        let dest_shares = destination_shares(facilities, zips);

        let regional_hub_of: BTreeMap<String, String> = facilities
            .iter()
            .filter_map(|(name, fac)| {
                fac.regional_sort_hub
                    .as_ref()
                    .map(|hub| (name.clone(), hub.clone()))
            })
            .collect();

        let injection_shares: BTreeMap<String, f64> = injection
            .iter()
            .map(|i| (i.facility_name.clone(), i.absolute_share))
            .collect();
        let total: f64 = injection_shares.values().sum();
        if (total - 1.0).abs() > FLOW_SHARE_TOLERANCE {
            warn!("injection shares sum to {total:.3}, expected 1.0");
        }

        info!(
            "demand builder ready: {} destination shares, {} regional hub mappings, {} injection facilities",
            dest_shares.len(),
            regional_hub_of.len(),
            injection_shares.len()
        );

        Self {
            facilities,
            demand_years,
            scenarios,
            bands,
            dest_shares,
            regional_hub_of,
            injection_shares,
        }
    }

    /// Build the OD demand records of every scenario.
    pub fn build(&self) -> Result<Vec<OdDemand>, DemandError> {
        let mut demands = Vec::new();

        for scenario in self.scenarios {
            info!(
                "building demand for scenario {} (year={}, {})",
                scenario.scenario_id, scenario.year, scenario.day_type
            );

            let (daily_pkgs, shares) = self.day_params(scenario.year, scenario.day_type)?;
            if daily_pkgs <= 0.0 {
                warn!("zero demand for scenario {}", scenario.scenario_id);
                continue;
            }

            let start = demands.len();
            self.build_direct_injection(scenario, daily_pkgs * shares.direct_injection_share, &mut demands);
            self.build_zone_skip(scenario, daily_pkgs * shares.zone_skip_share, &mut demands);
            self.build_middle_mile(scenario, daily_pkgs * shares.middle_mile_share, &mut demands);

            info!(
                "scenario {}: {} OD pairs, {:.0} pkgs/day",
                scenario.scenario_id,
                demands.len() - start,
                daily_pkgs
            );
        }

        info!("built {} OD demand records", demands.len());
        Ok(demands)
    }

    /// Daily volume and flow shares for a year under a day profile.
    fn day_params(&self, year: i32, day_type: DayType) -> Result<(f64, DayShares), DemandError> {
        let row = self
            .demand_years
            .iter()
            .find(|d| d.year == year)
            .ok_or(DemandError::NoDataForScenario(year))?;

        let shares = match day_type {
            DayType::Peak => row.peak,
            DayType::Offpeak => row.offpeak,
        };

        let total = shares.flow_share_total();
        if (total - 1.0).abs() > FLOW_SHARE_TOLERANCE {
            return Err(DemandError::SharesDoNotSum {
                total,
                mm: shares.middle_mile_share,
                zs: shares.zone_skip_share,
                di: shares.direct_injection_share,
            });
        }

        // pct_of_annual is already a daily rate, not an annual fraction to be
        // divided by a day count.
        Ok((row.annual_pkgs * shares.pct_of_annual, shares))
    }

    /// O = D volume entering at the delivery facility itself, zone 0.
    fn build_direct_injection(
        &self,
        scenario: &ScenarioDef,
        di_daily: f64,
        out: &mut Vec<OdDemand>,
    ) {
        if di_daily <= 0.0 {
            return;
        }
        for (dest, dest_share) in &self.dest_shares {
            let pkgs = di_daily * dest_share;
            if pkgs < MIN_OD_PKGS || !self.facilities.contains_key(dest) {
                continue;
            }
            out.push(OdDemand {
                scenario_id: scenario.scenario_id.clone(),
                origin: dest.clone(),
                dest: dest.clone(),
                pkgs_day: pkgs,
                zone: 0,
                flow_type: FlowType::DirectInjection,
                day_type: scenario.day_type,
            });
        }
    }

    /// Volume injected at each destination's regional sort hub.
    fn build_zone_skip(&self, scenario: &ScenarioDef, zs_daily: f64, out: &mut Vec<OdDemand>) {
        if zs_daily <= 0.0 {
            return;
        }
        for (dest, dest_share) in &self.dest_shares {
            if !self.facilities.contains_key(dest) {
                continue;
            }
            let hub = match self.regional_hub_of.get(dest) {
                Some(hub) => hub,
                None => {
                    debug!("no regional_sort_hub for dest {dest}, skipping zone skip");
                    continue;
                }
            };
            if !self.facilities.contains_key(hub) {
                warn!("regional hub {hub} not in facilities");
                continue;
            }
            let pkgs = zs_daily * dest_share;
            if pkgs < MIN_OD_PKGS {
                continue;
            }
            out.push(OdDemand {
                scenario_id: scenario.scenario_id.clone(),
                origin: hub.clone(),
                dest: dest.clone(),
                pkgs_day: pkgs,
                // zone skip still rates by distance; zone 0 is reserved for
                // direct injection
                zone: self.zone_between(hub, dest),
                flow_type: FlowType::ZoneSkip,
                day_type: scenario.day_type,
            });
        }
    }

    /// The injection-facility x destination outer product.
    fn build_middle_mile(&self, scenario: &ScenarioDef, mm_daily: f64, out: &mut Vec<OdDemand>) {
        if mm_daily <= 0.0 {
            return;
        }
        for (origin, inj_share) in &self.injection_shares {
            if *inj_share < MIN_INJECTION_SHARE {
                continue;
            }
            let origin_fac = match self.facilities.get(origin) {
                Some(fac) => fac,
                None => {
                    warn!("unknown injection facility: {origin}");
                    continue;
                }
            };
            let origin_daily = mm_daily * inj_share;

            for (dest, dest_share) in &self.dest_shares {
                let pkgs = origin_daily * dest_share;
                if pkgs < MIN_OD_PKGS || !self.facilities.contains_key(dest) {
                    continue;
                }
                // O = D middle mile only makes sense where injection and
                // delivery share a roof
                if origin == dest && origin_fac.kind != FacilityKind::Hybrid {
                    continue;
                }
                out.push(OdDemand {
                    scenario_id: scenario.scenario_id.clone(),
                    origin: origin.clone(),
                    dest: dest.clone(),
                    pkgs_day: pkgs,
                    zone: self.zone_between(origin, dest),
                    flow_type: FlowType::MiddleMile,
                    day_type: scenario.day_type,
                });
            }
        }
    }

    /// Rating zone for the great-circle distance between two facilities.
    fn zone_between(&self, origin: &str, dest: &str) -> u32 {
        let (o, d) = (&self.facilities[origin], &self.facilities[dest]);
        let distance = great_circle_miles(o.lat, o.lon, d.lat, d.lon);
        zone_for_distance(distance, self.bands)
            .map(|b| b.zone)
            .unwrap_or_default()
    }
}

/// Destination share per delivery facility: population summed by assigned
/// facility, or an equal split over LAUNCH and HYBRID facilities when no ZIP
/// data is present.
fn destination_shares(facilities: &FacilityMap, zips: &[ZipAssignment]) -> BTreeMap<String, f64> {
    if zips.is_empty() {
        let delivery: Vec<&String> = facilities
            .iter()
            .filter(|(_, f)| f.kind.is_delivery())
            .map(|(name, _)| name)
            .collect();
        let n = delivery.len();
        return delivery
            .into_iter()
            .map(|name| (name.clone(), 1.0 / n as f64))
            .collect();
    }

    let mut pop_by_fac: BTreeMap<String, f64> = BTreeMap::new();
    for zip in zips {
        *pop_by_fac.entry(zip.facility_name_assigned.clone()).or_default() += zip.population;
    }
    let total: f64 = pop_by_fac.values().sum();
    if total <= 0.0 {
        return BTreeMap::new();
    }
    pop_by_fac
        .into_iter()
        .map(|(name, pop)| (name, pop / total))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Facility;
    use chrono_tz::UTC;

    fn facility(name: &str, kind: FacilityKind, lon: f64, regional_hub: Option<&str>) -> Facility {
        Facility {
            name: name.to_string(),
            kind,
            lat: 40.0,
            lon,
            zone: UTC,
            parent_hub: None,
            regional_sort_hub: regional_hub.map(str::to_string),
            is_injection_node: kind.is_sorting(),
            mm_sort_start_local: None,
            mm_sort_end_local: None,
            lm_sort_start_local: None,
            lm_sort_end_local: None,
            outbound_window_start_local: None,
            outbound_window_end_local: None,
            outbound_cpt_count: None,
            max_inbound_trucks_per_hour: None,
            max_outbound_trucks_per_hour: None,
        }
    }

    fn bands() -> Vec<MileageBand> {
        vec![
            MileageBand {
                zone: 1,
                miles_min: 0.0,
                miles_max: 150.0,
                circuity_factor: 1.2,
                mph: 50.0,
            },
            MileageBand {
                zone: 2,
                miles_min: 150.0,
                miles_max: 5000.0,
                circuity_factor: 1.2,
                mph: 50.0,
            },
        ]
    }

    fn demand_year(mm: f64, zs: f64, di: f64) -> DemandYear {
        let shares = DayShares {
            pct_of_annual: 0.004,
            middle_mile_share: mm,
            zone_skip_share: zs,
            direct_injection_share: di,
        };
        DemandYear {
            year: 2026,
            annual_pkgs: 1_000_000.0,
            peak: shares,
            offpeak: shares,
        }
    }

    fn scenario() -> ScenarioDef {
        ScenarioDef {
            scenario_id: "s1".to_string(),
            year: 2026,
            day_type: DayType::Offpeak,
        }
    }

    fn network() -> FacilityMap {
        [
            facility("HUB1", FacilityKind::Hub, -75.0, None),
            facility("HYB1", FacilityKind::Hybrid, -80.0, Some("HUB1")),
            facility("LCH1", FacilityKind::Launch, -120.0, Some("HYB1")),
        ]
        .into_iter()
        .map(|f| (f.name.clone(), f))
        .collect()
    }

    #[test]
    fn bad_flow_shares_fail_the_build() {
        let facilities = network();
        let demand = [demand_year(0.5, 0.3, 0.1)];
        let injection = [InjectionShare {
            facility_name: "HUB1".to_string(),
            absolute_share: 1.0,
        }];
        let scenarios = [scenario()];
        let bands = bands();
        let builder = DemandBuilder::new(&facilities, &[], &demand, &injection, &scenarios, &bands);
        assert!(matches!(
            builder.build(),
            Err(DemandError::SharesDoNotSum { .. })
        ));
    }

    #[test]
    fn missing_year_fails_the_build() {
        let facilities = network();
        let demand = [demand_year(0.6, 0.2, 0.2)];
        let injection: [InjectionShare; 0] = [];
        let scenarios = [ScenarioDef {
            scenario_id: "s1".to_string(),
            year: 2031,
            day_type: DayType::Peak,
        }];
        let bands = bands();
        let builder = DemandBuilder::new(&facilities, &[], &demand, &injection, &scenarios, &bands);
        assert_eq!(builder.build(), Err(DemandError::NoDataForScenario(2031)));
    }

    #[test]
    fn builds_all_three_flow_families() {
        let facilities = network();
        let demand = [demand_year(0.6, 0.2, 0.2)];
        let injection = [InjectionShare {
            facility_name: "HUB1".to_string(),
            absolute_share: 1.0,
        }];
        let scenarios = [scenario()];
        let bands = bands();
        let builder = DemandBuilder::new(&facilities, &[], &demand, &injection, &scenarios, &bands);
        let demands = builder.build().unwrap();

        // DI: O=D zone 0 for both delivery facilities (equal fallback shares)
        let di: Vec<_> = demands
            .iter()
            .filter(|d| d.flow_type == FlowType::DirectInjection)
            .collect();
        assert_eq!(di.len(), 2);
        for d in &di {
            assert_eq!(d.origin, d.dest);
            assert_eq!(d.zone, 0);
        }

        // ZS: injected at each destination's regional hub, distance-rated
        let zs: Vec<_> = demands
            .iter()
            .filter(|d| d.flow_type == FlowType::ZoneSkip)
            .collect();
        assert_eq!(zs.len(), 2);
        let to_launch = zs.iter().find(|d| d.dest == "LCH1").unwrap();
        assert_eq!(to_launch.origin, "HYB1");
        assert_eq!(to_launch.zone, 2);

        // MM: HUB1 (not a delivery facility) never appears as O=D
        let mm: Vec<_> = demands
            .iter()
            .filter(|d| d.flow_type == FlowType::MiddleMile)
            .collect();
        assert_eq!(mm.len(), 2);
        assert!(mm.iter().all(|d| d.origin == "HUB1" && d.origin != d.dest));
    }

    #[test]
    fn hybrid_keeps_o_equals_d_middle_mile() {
        let facilities = network();
        let demand = [demand_year(1.0, 0.0, 0.0)];
        let injection = [InjectionShare {
            facility_name: "HYB1".to_string(),
            absolute_share: 1.0,
        }];
        let scenarios = [scenario()];
        let bands = bands();
        let builder = DemandBuilder::new(&facilities, &[], &demand, &injection, &scenarios, &bands);
        let demands = builder.build().unwrap();

        assert!(demands
            .iter()
            .any(|d| d.flow_type == FlowType::MiddleMile && d.origin == "HYB1" && d.dest == "HYB1"));
    }

    #[test]
    fn tiny_volumes_are_dropped() {
        let facilities = network();
        let mut year = demand_year(0.6, 0.2, 0.2);
        year.annual_pkgs = 1.0;
        let demand = [year];
        let injection = [InjectionShare {
            facility_name: "HUB1".to_string(),
            absolute_share: 1.0,
        }];
        let scenarios = [scenario()];
        let bands = bands();
        let builder = DemandBuilder::new(&facilities, &[], &demand, &injection, &scenarios, &bands);
        assert!(builder.build().unwrap().is_empty());
    }

    #[test]
    fn population_drives_destination_shares() {
        let facilities = network();
        let zips = vec![
            ZipAssignment {
                zip: "19104".to_string(),
                facility_name_assigned: "LCH1".to_string(),
                population: 3000.0,
            },
            ZipAssignment {
                zip: "19010".to_string(),
                facility_name_assigned: "HYB1".to_string(),
                population: 1000.0,
            },
        ];
        let shares = destination_shares(&facilities, &zips);
        assert_eq!(shares["LCH1"], 0.75);
        assert_eq!(shares["HYB1"], 0.25);
    }
}
