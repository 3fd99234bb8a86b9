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

//! Tabular I/O: the input workbook is a directory of CSV tables (one file
//! per table of the input contract), loaded into a typed [`ModelInputs`]
//! projection; outputs are written back as CSV tables plus an optional JSON
//! step-trace artifact.

use std::collections::HashMap;
use std::fs::{create_dir_all, File};
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;
use itertools::Itertools;
use log::info;
use serde::Deserialize;
use thiserror::Error;

use crate::pathing::OdTimings;
use crate::report::Reports;
use crate::types::{
    Cpt, DaySet, DayShares, DemandYear, Facility, FacilityMap, InjectionShare, MileageBand,
    RunSettings, ScenarioDef, ServiceCommitment, TimingParams, ZipAssignment,
};

/// Tables that must exist in every input workbook.
const REQUIRED_TABLES: [&str; 9] = [
    "facilities",
    "zips",
    "demand",
    "injection_distribution",
    "scenarios",
    "mileage_bands",
    "timing_params",
    "service_commitments",
    "run_settings",
];

/// Error raised while loading or parsing the input workbook.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The input directory does not exist.
    #[error("input not found: {0}")]
    MissingInput(PathBuf),
    /// A required table file is absent.
    #[error("missing required table: {0}")]
    MissingTable(String),
    /// A table failed to parse at the CSV/serde layer.
    #[error("table {table}: {source}")]
    Table {
        /// Offending table.
        table: String,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },
    /// A cell failed domain parsing.
    #[error("table {table} row {row}: {message}")]
    BadValue {
        /// Offending table.
        table: String,
        /// 1-based data row.
        row: usize,
        /// What went wrong.
        message: String,
    },
    /// A facility declares a zone the tz database does not know.
    #[error("unknown time zone '{zone}' for facility {facility}")]
    UnknownZone {
        /// The unresolvable zone string.
        zone: String,
        /// Facility declaring it.
        facility: String,
    },
    /// A required key is missing from a key/value table.
    #[error("table {table}: missing required key {key}")]
    MissingKey {
        /// Offending table.
        table: String,
        /// The absent key.
        key: String,
    },
    /// Filesystem failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Error raised while writing outputs.
#[derive(Debug, Error)]
pub enum WriteError {
    /// CSV serialization failure.
    #[error("writing {table}: {source}")]
    Table {
        /// Offending table.
        table: String,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },
    /// JSON serialization failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Filesystem failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The typed projection of the whole input workbook.
#[derive(Debug, Clone)]
pub struct ModelInputs {
    /// All facilities, keyed by name.
    pub facilities: FacilityMap,
    /// ZIP population assignments.
    pub zips: Vec<ZipAssignment>,
    /// Annual demand rows.
    pub demand: Vec<DemandYear>,
    /// Injection share per facility.
    pub injection_distribution: Vec<InjectionShare>,
    /// Scenarios to evaluate.
    pub scenarios: Vec<ScenarioDef>,
    /// Mileage bands, sorted by zone.
    pub mileage_bands: Vec<MileageBand>,
    /// Processing durations.
    pub timing_params: TimingParams,
    /// Explicit CPT overrides; empty when the table is absent.
    pub arc_cpts: Vec<Cpt>,
    /// Service commitments.
    pub service_commitments: Vec<ServiceCommitment>,
    /// Run settings.
    pub run_settings: RunSettings,
}

/// Load the workbook directory into its typed projection.
pub fn load(dir: &Path) -> Result<ModelInputs, LoadError> {
    if !dir.is_dir() {
        return Err(LoadError::MissingInput(dir.to_path_buf()));
    }
    for table in REQUIRED_TABLES {
        if !table_path(dir, table).is_file() {
            return Err(LoadError::MissingTable(table.to_string()));
        }
    }

    let facilities = load_facilities(dir)?;
    let inputs = ModelInputs {
        zips: load_zips(dir)?,
        demand: load_demand(dir)?,
        injection_distribution: load_injection(dir)?,
        scenarios: load_scenarios(dir)?,
        mileage_bands: load_mileage_bands(dir)?,
        timing_params: load_timing_params(dir)?,
        arc_cpts: load_arc_cpts(dir, &facilities)?,
        service_commitments: load_service_commitments(dir)?,
        run_settings: load_run_settings(dir)?,
        facilities,
    };

    info!(
        "loaded inputs: {} facilities, {} zips, {} demand years, {} scenarios, {} bands, {} arc CPTs, {} commitments",
        inputs.facilities.len(),
        inputs.zips.len(),
        inputs.demand.len(),
        inputs.scenarios.len(),
        inputs.mileage_bands.len(),
        inputs.arc_cpts.len(),
        inputs.service_commitments.len()
    );
    Ok(inputs)
}

/// Path of one table file inside the workbook directory.
fn table_path(dir: &Path, table: &str) -> PathBuf {
    dir.join(format!("{table}.csv"))
}

/// Open a CSV reader over a table.
fn reader(dir: &Path, table: &str) -> Result<csv::Reader<File>, LoadError> {
    csv::Reader::from_path(table_path(dir, table)).map_err(|source| LoadError::Table {
        table: table.to_string(),
        source,
    })
}

/// Collect a table's rows through serde.
fn rows<T: for<'de> Deserialize<'de>>(dir: &Path, table: &str) -> Result<Vec<T>, LoadError> {
    reader(dir, table)?
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()
        .map_err(|source| LoadError::Table {
            table: table.to_string(),
            source,
        })
}

/// Parse a time-of-day cell: `HH:MM[:SS]`, or the bare integer forms `HH`
/// (0..=24) and `HHMM` (100..=2400) that spreadsheets tend to leak.
fn parse_time_cell(value: &str) -> Result<NaiveTime, String> {
    let value = value.trim();
    if let Ok(t) = NaiveTime::parse_from_str(value, "%H:%M:%S") {
        return Ok(t);
    }
    if let Ok(t) = NaiveTime::parse_from_str(value, "%H:%M") {
        return Ok(t);
    }
    if let Ok(n) = value.parse::<u32>() {
        let (hour, minute) = match n {
            0..=24 => (n % 24, 0),
            100..=2400 => ((n / 100) % 24, n % 100),
            _ => return Err(format!("cannot parse time value '{value}'")),
        };
        return NaiveTime::from_hms_opt(hour, minute, 0)
            .ok_or_else(|| format!("cannot parse time value '{value}'"));
    }
    Err(format!("cannot parse time value '{value}'"))
}

/// Parse an optional time cell; empty means absent.
fn parse_opt_time(value: &Option<String>) -> Result<Option<NaiveTime>, String> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => parse_time_cell(v).map(Some),
    }
}

/// Truthiness of a flag cell: `1`, `true`, or `yes` (any case).
fn parse_flag(value: &Option<String>) -> bool {
    matches!(
        value.as_deref().map(str::trim).map(str::to_ascii_lowercase).as_deref(),
        Some("1") | Some("true") | Some("yes")
    )
}

/// Trim a cell and drop it if empty.
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Raw `facilities` row as it appears on disk.
#[derive(Debug, Deserialize)]
struct FacilityRow {
    /// Facility name.
    facility_name: String,
    /// Facility kind.
    r#type: String,
    /// Latitude.
    lat: f64,
    /// Longitude.
    lon: f64,
    /// IANA zone string.
    timezone: String,
    /// Parent hub name, optional.
    parent_hub_name: Option<String>,
    /// Regional sort hub name, optional.
    regional_sort_hub: Option<String>,
    /// Injection-node flag.
    is_injection_node: Option<String>,
    /// Middle-mile sort window opening.
    mm_sort_start_local: Option<String>,
    /// Middle-mile sort window closing.
    mm_sort_end_local: Option<String>,
    /// Last-mile sort window opening.
    lm_sort_start_local: Option<String>,
    /// Last-mile sort window closing.
    lm_sort_end_local: Option<String>,
    /// Outbound window opening.
    outbound_window_start_local: Option<String>,
    /// Outbound window closing.
    outbound_window_end_local: Option<String>,
    /// Synthesized CPT count.
    outbound_cpt_count: Option<u32>,
    /// Inbound dock capacity.
    max_inbound_trucks_per_hour: Option<f64>,
    /// Outbound dock capacity.
    max_outbound_trucks_per_hour: Option<f64>,
}

/// Load and type the `facilities` table.
fn load_facilities(dir: &Path) -> Result<FacilityMap, LoadError> {
    let mut facilities = FacilityMap::new();
    for (i, row) in rows::<FacilityRow>(dir, "facilities")?.into_iter().enumerate() {
        let name = row.facility_name.trim().to_string();
        let bad = |message: String| LoadError::BadValue {
            table: "facilities".to_string(),
            row: i + 1,
            message,
        };

        let zone: Tz = row
            .timezone
            .trim()
            .parse()
            .map_err(|_| LoadError::UnknownZone {
                zone: row.timezone.clone(),
                facility: name.clone(),
            })?;
        let kind = row.r#type.parse().map_err(|e| bad(format!("{e}")))?;

        let facility = Facility {
            name: name.clone(),
            kind,
            lat: row.lat,
            lon: row.lon,
            zone,
            parent_hub: non_empty(row.parent_hub_name),
            regional_sort_hub: non_empty(row.regional_sort_hub),
            is_injection_node: parse_flag(&row.is_injection_node),
            mm_sort_start_local: parse_opt_time(&row.mm_sort_start_local).map_err(&bad)?,
            mm_sort_end_local: parse_opt_time(&row.mm_sort_end_local).map_err(&bad)?,
            lm_sort_start_local: parse_opt_time(&row.lm_sort_start_local).map_err(&bad)?,
            lm_sort_end_local: parse_opt_time(&row.lm_sort_end_local).map_err(&bad)?,
            outbound_window_start_local: parse_opt_time(&row.outbound_window_start_local)
                .map_err(&bad)?,
            outbound_window_end_local: parse_opt_time(&row.outbound_window_end_local)
                .map_err(&bad)?,
            outbound_cpt_count: row.outbound_cpt_count,
            max_inbound_trucks_per_hour: row.max_inbound_trucks_per_hour,
            max_outbound_trucks_per_hour: row.max_outbound_trucks_per_hour,
        };
        facilities.insert(name, facility);
    }
    Ok(facilities)
}

/// Raw `zips` row.
#[derive(Debug, Deserialize)]
struct ZipRow {
    /// ZIP code as written.
    zip: String,
    /// Assigned delivery facility.
    facility_name_assigned: String,
    /// Population.
    population: f64,
}

/// Load the `zips` table, zero-padding codes to five digits.
fn load_zips(dir: &Path) -> Result<Vec<ZipAssignment>, LoadError> {
    Ok(rows::<ZipRow>(dir, "zips")?
        .into_iter()
        .map(|row| ZipAssignment {
            zip: format!("{:0>5}", row.zip.trim()),
            facility_name_assigned: row.facility_name_assigned.trim().to_string(),
            population: row.population,
        })
        .collect())
}

/// Raw `demand` row.
#[derive(Debug, Deserialize)]
struct DemandRow {
    /// Calendar year.
    year: i32,
    /// Annual packages.
    annual_pkgs: f64,
    /// Peak daily rate.
    peak_pct_of_annual: f64,
    /// Off-peak daily rate.
    offpeak_pct_of_annual: f64,
    /// Peak middle-mile share.
    middle_mile_share_peak: f64,
    /// Peak zone-skip share.
    zone_skip_share_peak: f64,
    /// Peak direct-injection share.
    direct_injection_share_peak: f64,
    /// Off-peak middle-mile share.
    middle_mile_share_offpeak: f64,
    /// Off-peak zone-skip share.
    zone_skip_share_offpeak: f64,
    /// Off-peak direct-injection share.
    direct_injection_share_offpeak: f64,
}

/// Load the `demand` table.
fn load_demand(dir: &Path) -> Result<Vec<DemandYear>, LoadError> {
    Ok(rows::<DemandRow>(dir, "demand")?
        .into_iter()
        .map(|row| DemandYear {
            year: row.year,
            annual_pkgs: row.annual_pkgs,
            peak: DayShares {
                pct_of_annual: row.peak_pct_of_annual,
                middle_mile_share: row.middle_mile_share_peak,
                zone_skip_share: row.zone_skip_share_peak,
                direct_injection_share: row.direct_injection_share_peak,
            },
            offpeak: DayShares {
                pct_of_annual: row.offpeak_pct_of_annual,
                middle_mile_share: row.middle_mile_share_offpeak,
                zone_skip_share: row.zone_skip_share_offpeak,
                direct_injection_share: row.direct_injection_share_offpeak,
            },
        })
        .collect())
}

/// Raw `injection_distribution` row.
#[derive(Debug, Deserialize)]
struct InjectionRow {
    /// Injection facility.
    facility_name: String,
    /// Absolute share.
    absolute_share: f64,
}

/// Load the `injection_distribution` table.
fn load_injection(dir: &Path) -> Result<Vec<InjectionShare>, LoadError> {
    Ok(rows::<InjectionRow>(dir, "injection_distribution")?
        .into_iter()
        .map(|row| InjectionShare {
            facility_name: row.facility_name.trim().to_string(),
            absolute_share: row.absolute_share,
        })
        .collect())
}

/// Raw `scenarios` row.
#[derive(Debug, Deserialize)]
struct ScenarioRow {
    /// Scenario identifier.
    scenario_id: String,
    /// Demand year.
    year: i32,
    /// Day profile.
    day_type: String,
}

/// Load the `scenarios` table.
fn load_scenarios(dir: &Path) -> Result<Vec<ScenarioDef>, LoadError> {
    rows::<ScenarioRow>(dir, "scenarios")?
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            Ok(ScenarioDef {
                scenario_id: row.scenario_id.trim().to_string(),
                year: row.year,
                day_type: row.day_type.parse().map_err(|e| LoadError::BadValue {
                    table: "scenarios".to_string(),
                    row: i + 1,
                    message: format!("{e}"),
                })?,
            })
        })
        .collect()
}

/// Raw `mileage_bands` row.
#[derive(Debug, Deserialize)]
struct MileageBandRow {
    /// Rating zone.
    zone: u32,
    /// Lower bound, inclusive.
    mileage_band_min: f64,
    /// Upper bound, exclusive (inclusive on the last band).
    mileage_band_max: f64,
    /// Circuity factor.
    circuity_factor: f64,
    /// Linehaul speed.
    mph: f64,
}

/// Load the `mileage_bands` table, sorted by zone.
fn load_mileage_bands(dir: &Path) -> Result<Vec<MileageBand>, LoadError> {
    let mut bands: Vec<MileageBand> = rows::<MileageBandRow>(dir, "mileage_bands")?
        .into_iter()
        .map(|row| MileageBand {
            zone: row.zone,
            miles_min: row.mileage_band_min,
            miles_max: row.mileage_band_max,
            circuity_factor: row.circuity_factor,
            mph: row.mph,
        })
        .collect();
    bands.sort_by_key(|b| b.zone);
    Ok(bands)
}

/// Raw key/value row used by `timing_params` and `run_settings`.
#[derive(Debug, Deserialize)]
struct KeyValueRow {
    /// Setting key.
    key: String,
    /// Setting value, as written.
    value: String,
}

/// Load a key/value table into a map.
fn load_key_values(dir: &Path, table: &str) -> Result<HashMap<String, String>, LoadError> {
    Ok(rows::<KeyValueRow>(dir, table)?
        .into_iter()
        .map(|row| (row.key.trim().to_string(), row.value.trim().to_string()))
        .collect())
}

/// Load the `timing_params` key/value table.
fn load_timing_params(dir: &Path) -> Result<TimingParams, LoadError> {
    let table = "timing_params";
    let kv = load_key_values(dir, table)?;
    let get = |key: &str| -> Result<f64, LoadError> {
        kv.get(key)
            .ok_or_else(|| LoadError::MissingKey {
                table: table.to_string(),
                key: key.to_string(),
            })?
            .parse()
            .map_err(|_| LoadError::BadValue {
                table: table.to_string(),
                row: 0,
                message: format!("cannot parse {key} as a number"),
            })
    };

    Ok(TimingParams {
        induction_sort_minutes: get("induction_sort_minutes")?,
        middle_mile_crossdock_minutes: get("middle_mile_crossdock_minutes")?,
        middle_mile_sort_minutes: get("middle_mile_sort_minutes")?,
        last_mile_sort_minutes: get("last_mile_sort_minutes")?,
    })
}

/// Raw `arc_cpts` row.
#[derive(Debug, Deserialize)]
struct ArcCptRow {
    /// Departing facility.
    origin: String,
    /// Destination facility or `*`.
    dest: String,
    /// Position in the day's schedule.
    cpt_sequence: u32,
    /// Local departure time.
    cpt_local: String,
    /// Day-of-week mask, empty for daily.
    days_of_week: Option<String>,
    /// Active flag (0/1).
    active_arc: Option<String>,
}

/// Load the optional `arc_cpts` table. Departure zones come from the origin
/// facility, which must therefore exist.
fn load_arc_cpts(dir: &Path, facilities: &FacilityMap) -> Result<Vec<Cpt>, LoadError> {
    let table = "arc_cpts";
    if !table_path(dir, table).is_file() {
        info!("no arc_cpts table found, CPTs will be synthesized from outbound windows");
        return Ok(Vec::new());
    }

    rows::<ArcCptRow>(dir, table)?
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            let bad = |message: String| LoadError::BadValue {
                table: table.to_string(),
                row: i + 1,
                message,
            };
            let origin = row.origin.trim().to_string();
            let origin_fac = facilities
                .get(&origin)
                .ok_or_else(|| bad(format!("unknown origin facility: {origin}")))?;

            Ok(Cpt {
                zone: origin_fac.zone,
                origin,
                dest: row.dest.trim().to_string(),
                sequence: row.cpt_sequence,
                local_time: parse_time_cell(&row.cpt_local).map_err(&bad)?,
                days: row
                    .days_of_week
                    .as_deref()
                    .unwrap_or_default()
                    .parse::<DaySet>()
                    .map_err(|e| bad(format!("{e}")))?,
                is_active: parse_flag(&row.active_arc),
            })
        })
        .collect()
}

/// Raw `service_commitments` row.
#[derive(Debug, Deserialize)]
struct CommitmentRow {
    /// Origin or `*`.
    origin: String,
    /// Destination or `*`.
    dest: String,
    /// Optional zone scope.
    zone: Option<u32>,
    /// Contractual days.
    sla_days: u32,
    /// Buffer days.
    sla_buffer_days: Option<f64>,
    /// Priority weight.
    priority_weight: Option<f64>,
}

/// Load the `service_commitments` table.
fn load_service_commitments(dir: &Path) -> Result<Vec<ServiceCommitment>, LoadError> {
    Ok(rows::<CommitmentRow>(dir, "service_commitments")?
        .into_iter()
        .map(|row| ServiceCommitment {
            origin: row.origin.trim().to_string(),
            dest: row.dest.trim().to_string(),
            zone: row.zone,
            sla_days: row.sla_days,
            sla_buffer_days: row.sla_buffer_days.unwrap_or(0.0),
            priority_weight: row.priority_weight.unwrap_or(1.0),
        })
        .collect())
}

/// Load the `run_settings` key/value table, falling back to defaults for
/// absent keys.
fn load_run_settings(dir: &Path) -> Result<RunSettings, LoadError> {
    let table = "run_settings";
    let kv = load_key_values(dir, table)?;
    let defaults = RunSettings::default();
    let bad = |message: String| LoadError::BadValue {
        table: table.to_string(),
        row: 0,
        message,
    };

    let objective = match kv.get("objective_type") {
        Some(v) => v.parse().map_err(|e| bad(format!("{e}")))?,
        None => defaults.objective,
    };
    let max_path_touches = match kv.get("max_path_touches") {
        Some(v) => v
            .parse()
            .map_err(|_| bad(format!("cannot parse max_path_touches '{v}'")))?,
        None => defaults.max_path_touches,
    };
    let max_path_atw_factor = match kv.get("max_path_atw_factor") {
        Some(v) => v
            .parse()
            .map_err(|_| bad(format!("cannot parse max_path_atw_factor '{v}'")))?,
        None => defaults.max_path_atw_factor,
    };
    let reference_injection_date = match kv.get("reference_injection_date") {
        Some(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d")
            .map_err(|_| bad(format!("cannot parse reference_injection_date '{v}'")))?,
        None => defaults.reference_injection_date,
    };
    let reference_injection_time = match kv.get("reference_injection_time") {
        Some(v) => parse_time_cell(v).map_err(&bad)?,
        None => defaults.reference_injection_time,
    };
    let top_paths_per_sort_level = match kv.get("top_paths_per_sort_level") {
        Some(v) if !v.is_empty() => Some(
            v.parse()
                .map_err(|_| bad(format!("cannot parse top_paths_per_sort_level '{v}'")))?,
        ),
        _ => None,
    };

    Ok(RunSettings {
        objective,
        max_path_touches,
        max_path_atw_factor,
        reference_injection_date,
        reference_injection_time,
        top_paths_per_sort_level,
    })
}

/// Default output directory name: scenario ids joined by `_`, keeping at
/// most the first three.
pub fn default_output_name(scenarios: &[ScenarioDef]) -> String {
    let name = scenarios
        .iter()
        .map(|s| s.scenario_id.as_str())
        .take(3)
        .join("_");
    if name.is_empty() {
        "output".to_string()
    } else {
        name
    }
}

/// Write the four report tables as CSV files into `dir`, creating it as
/// needed.
pub fn write_reports(dir: &Path, reports: &Reports) -> Result<(), WriteError> {
    create_dir_all(dir)?;

    write_table(dir, "summary", &reports.summary)?;
    write_table(dir, "od_demand", &reports.od_demand)?;
    write_table(dir, "feasible_paths", &reports.feasible_paths)?;
    write_table(dir, "sla_miss_detail", &reports.sla_miss_detail)?;

    info!("wrote output tables to {}", dir.display());
    Ok(())
}

/// Serialize one record list as a CSV table.
fn write_table<T: serde::Serialize>(
    dir: &Path,
    table: &str,
    records: &[T],
) -> Result<(), WriteError> {
    let mut writer =
        csv::Writer::from_path(table_path(dir, table)).map_err(|source| WriteError::Table {
            table: table.to_string(),
            source,
        })?;
    for record in records {
        writer.serialize(record).map_err(|source| WriteError::Table {
            table: table.to_string(),
            source,
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the best path's full step decomposition per OD as a JSON artifact,
/// for downstream diagnostics.
pub fn write_step_traces(path: &Path, od_timings: &OdTimings) -> Result<(), WriteError> {
    let traces: std::collections::BTreeMap<String, _> = od_timings
        .iter()
        .filter_map(|((origin, dest), timings)| {
            timings
                .iter()
                .min_by(|a, b| a.ranking_cmp(b))
                .map(|best| (format!("{origin}->{dest}"), best))
        })
        .collect();

    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, &traces)?;
    info!("wrote step traces for {} OD pairs to {}", traces.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, table: &str, content: &str) {
        fs::write(table_path(dir, table), content).unwrap();
    }

    /// A minimal but complete workbook with two hubs and a launch site.
    fn workbook(dir: &Path) {
        write(
            dir,
            "facilities",
            "facility_name,type,lat,lon,timezone,parent_hub_name,regional_sort_hub,is_injection_node,mm_sort_start_local,mm_sort_end_local,lm_sort_start_local,lm_sort_end_local,outbound_window_start_local,outbound_window_end_local,outbound_cpt_count,max_inbound_trucks_per_hour,max_outbound_trucks_per_hour\n\
             A,hub,40.0,-75.0,UTC,,,1,18:00,06:00,,,18:00,23:00,2,,\n\
             B,hub,40.0,-80.0,UTC,,,1,18:00,06:00,,,18:00,23:00,2,,\n\
             C,launch,40.0,-120.0,UTC,B,B,0,,,02:00,08:00,,,,,\n",
        );
        write(
            dir,
            "zips",
            "zip,facility_name_assigned,population\n19104,C,1000\n",
        );
        write(
            dir,
            "demand",
            "year,annual_pkgs,peak_pct_of_annual,offpeak_pct_of_annual,middle_mile_share_peak,zone_skip_share_peak,direct_injection_share_peak,middle_mile_share_offpeak,zone_skip_share_offpeak,direct_injection_share_offpeak\n\
             2026,1000000,0.006,0.004,0.6,0.2,0.2,0.6,0.2,0.2\n",
        );
        write(
            dir,
            "injection_distribution",
            "facility_name,absolute_share\nA,1.0\n",
        );
        write(dir, "scenarios", "scenario_id,year,day_type\nbase_2026,2026,offpeak\n");
        write(
            dir,
            "mileage_bands",
            "zone,mileage_band_min,mileage_band_max,circuity_factor,mph\n\
             1,0,150,1.2,50\n2,150,5000,1.2,50\n",
        );
        write(
            dir,
            "timing_params",
            "key,value\ninduction_sort_minutes,60\nmiddle_mile_crossdock_minutes,60\nmiddle_mile_sort_minutes,180\nlast_mile_sort_minutes,90\n",
        );
        write(
            dir,
            "service_commitments",
            "origin,dest,zone,sla_days,sla_buffer_days,priority_weight\n*,*,,3,0,1.0\n",
        );
        write(
            dir,
            "run_settings",
            "key,value\nobjective_type,weighted_sla\nmax_path_touches,2\nmax_path_atw_factor,1.5\nreference_injection_date,2025-06-15\nreference_injection_time,18:00\n",
        );
    }

    #[test]
    fn loads_a_complete_workbook() {
        let dir = tempfile::tempdir().unwrap();
        workbook(dir.path());

        let inputs = load(dir.path()).unwrap();
        assert_eq!(inputs.facilities.len(), 3);
        assert_eq!(inputs.facilities["C"].parent_hub.as_deref(), Some("B"));
        assert!(inputs.facilities["A"].mm_sort_window().is_some());
        assert_eq!(inputs.facilities["A"].outbound_cpt_count, Some(2));
        assert_eq!(inputs.zips[0].zip, "19104");
        assert_eq!(inputs.demand[0].offpeak.middle_mile_share, 0.6);
        assert_eq!(inputs.mileage_bands.len(), 2);
        assert_eq!(inputs.run_settings.max_path_touches, 2);
        assert!(inputs.arc_cpts.is_empty());
        assert_eq!(inputs.service_commitments[0].sla_days, 3);
    }

    #[test]
    fn missing_table_fails_the_load() {
        let dir = tempfile::tempdir().unwrap();
        workbook(dir.path());
        fs::remove_file(table_path(dir.path(), "demand")).unwrap();

        assert!(matches!(
            load(dir.path()),
            Err(LoadError::MissingTable(t)) if t == "demand"
        ));
    }

    #[test]
    fn unknown_zone_fails_the_load() {
        let dir = tempfile::tempdir().unwrap();
        workbook(dir.path());
        write(
            dir.path(),
            "facilities",
            "facility_name,type,lat,lon,timezone,parent_hub_name,regional_sort_hub,is_injection_node,mm_sort_start_local,mm_sort_end_local,lm_sort_start_local,lm_sort_end_local,outbound_window_start_local,outbound_window_end_local,outbound_cpt_count,max_inbound_trucks_per_hour,max_outbound_trucks_per_hour\n\
             A,hub,40.0,-75.0,Mars/Olympus,,,1,,,,,,,,,\n",
        );

        assert!(matches!(
            load(dir.path()),
            Err(LoadError::UnknownZone { zone, .. }) if zone == "Mars/Olympus"
        ));
    }

    #[test]
    fn arc_cpts_resolve_origin_zone_and_days() {
        let dir = tempfile::tempdir().unwrap();
        workbook(dir.path());
        write(
            dir.path(),
            "arc_cpts",
            "origin,dest,cpt_sequence,cpt_local,days_of_week,active_arc\n\
             A,C,1,22:00,\"Mon,Wed,Fri\",1\nA,C,2,2330,,0\n",
        );

        let inputs = load(dir.path()).unwrap();
        assert_eq!(inputs.arc_cpts.len(), 2);
        assert!(!inputs.arc_cpts[0].days.is_empty());
        assert!(inputs.arc_cpts[0].is_active);
        assert_eq!(
            inputs.arc_cpts[1].local_time,
            NaiveTime::from_hms_opt(23, 30, 0).unwrap()
        );
        assert!(inputs.arc_cpts[1].days.is_empty());
        assert!(!inputs.arc_cpts[1].is_active);
    }

    #[test]
    fn time_cells_accept_spreadsheet_forms() {
        assert_eq!(
            parse_time_cell("06:30").unwrap(),
            NaiveTime::from_hms_opt(6, 30, 0).unwrap()
        );
        assert_eq!(
            parse_time_cell("18:00:30").unwrap(),
            NaiveTime::from_hms_opt(18, 0, 30).unwrap()
        );
        assert_eq!(
            parse_time_cell("1830").unwrap(),
            NaiveTime::from_hms_opt(18, 30, 0).unwrap()
        );
        assert_eq!(
            parse_time_cell("6").unwrap(),
            NaiveTime::from_hms_opt(6, 0, 0).unwrap()
        );
        assert_eq!(
            parse_time_cell("24").unwrap(),
            NaiveTime::from_hms_opt(0, 0, 0).unwrap()
        );
        assert!(parse_time_cell("25:00:00:00").is_err());
    }

    #[test]
    fn output_name_truncates_beyond_three_scenarios() {
        let scenarios: Vec<ScenarioDef> = ["a", "b", "c", "d"]
            .iter()
            .map(|id| ScenarioDef {
                scenario_id: id.to_string(),
                year: 2026,
                day_type: crate::types::DayType::Peak,
            })
            .collect();
        assert_eq!(default_output_name(&scenarios), "a_b_c");
        assert_eq!(default_output_name(&scenarios[..1]), "a");
        assert_eq!(default_output_name(&[]), "output");
    }

    #[test]
    fn reports_round_trip_through_csv() {
        let dir = tempfile::tempdir().unwrap();
        let reports = Reports {
            summary: vec![],
            od_demand: vec![],
            feasible_paths: vec![],
            sla_miss_detail: vec![],
        };
        write_reports(&dir.path().join("out"), &reports).unwrap();
        for table in ["summary", "od_demand", "feasible_paths", "sla_miss_detail"] {
            assert!(table_path(&dir.path().join("out"), table).is_file());
        }
    }
}
