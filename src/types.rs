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

//! Basic datastructures describing the parcel network, the demand it carries,
//! and the evaluated paths. Facilities are identified by name; `parent_hub`
//! and `regional_sort_hub` are name keys into the [`FacilityMap`], never
//! owning links.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minutes in a day.
pub const MINUTES_PER_DAY: f64 = 1440.0;
/// Hours in a day.
pub const HOURS_PER_DAY: f64 = 24.0;

/// Error raised when parsing an enumeration-like input cell.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {what}: '{value}'")]
pub struct ParseEnumError {
    /// What kind of value was expected.
    pub what: &'static str,
    /// The offending input.
    pub value: String,
}

/// The role a facility plays in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacilityKind {
    /// Middle-mile sortation only.
    Hub,
    /// Both middle-mile sortation and last-mile delivery.
    Hybrid,
    /// Last-mile delivery only.
    Launch,
}

impl FacilityKind {
    /// Whether the facility can sort middle-mile volume (HUB or HYBRID).
    pub fn is_sorting(&self) -> bool {
        matches!(self, Self::Hub | Self::Hybrid)
    }

    /// Whether the facility can deliver (LAUNCH or HYBRID).
    pub fn is_delivery(&self) -> bool {
        matches!(self, Self::Launch | Self::Hybrid)
    }
}

impl fmt::Display for FacilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Hub => "hub",
            Self::Hybrid => "hybrid",
            Self::Launch => "launch",
        })
    }
}

impl FromStr for FacilityKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hub" => Ok(Self::Hub),
            "hybrid" => Ok(Self::Hybrid),
            "launch" => Ok(Self::Launch),
            _ => Err(ParseEnumError {
                what: "facility type",
                value: s.to_string(),
            }),
        }
    }
}

/// Sortation granularity at a processing point, from coarsest to finest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortLevel {
    /// Sorted only to the destination region.
    Region,
    /// Sorted to the destination market.
    Market,
    /// Sorted to the final sort group.
    SortGroup,
}

impl fmt::Display for SortLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Region => "region",
            Self::Market => "market",
            Self::SortGroup => "sort_group",
        })
    }
}

/// Shape of a physical path, derived from its number of edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathType {
    /// Origin straight to destination.
    Direct,
    /// One intermediate touch.
    OneTouch,
    /// Two intermediate touches.
    TwoTouch,
    /// Three intermediate touches.
    ThreeTouch,
}

impl PathType {
    /// Classify a path by its number of edges.
    pub fn from_edges(edges: usize) -> Self {
        match edges {
            0 | 1 => Self::Direct,
            2 => Self::OneTouch,
            3 => Self::TwoTouch,
            _ => Self::ThreeTouch,
        }
    }
}

impl fmt::Display for PathType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Direct => "direct",
            Self::OneTouch => "1_touch",
            Self::TwoTouch => "2_touch",
            Self::ThreeTouch => "3_touch",
        })
    }
}

/// How volume enters the network for an OD pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowType {
    /// Injected at the delivery facility itself (zone 0, O = D).
    DirectInjection,
    /// Injected at the destination's regional sort hub.
    ZoneSkip,
    /// Injected upstream and hauled across the middle mile.
    MiddleMile,
}

impl fmt::Display for FlowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DirectInjection => "direct_injection",
            Self::ZoneSkip => "zone_skip",
            Self::MiddleMile => "middle_mile",
        })
    }
}

/// Which day profile a scenario models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayType {
    /// Peak-season day.
    Peak,
    /// Off-peak day.
    Offpeak,
}

impl fmt::Display for DayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Peak => "peak",
            Self::Offpeak => "offpeak",
        })
    }
}

impl FromStr for DayType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "peak" => Ok(Self::Peak),
            "offpeak" => Ok(Self::Offpeak),
            _ => Err(ParseEnumError {
                what: "day type",
                value: s.to_string(),
            }),
        }
    }
}

/// Objective tag carried through to the downstream sort-selection model. The
/// feasibility pre-filter reports it but never optimizes on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveType {
    /// Maximize the volume delivered within SLA.
    MaximizeVolumeAtSla,
    /// Weight SLA attainment by commitment priority.
    WeightedSla,
}

impl fmt::Display for ObjectiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MaximizeVolumeAtSla => "maximize_volume_at_sla",
            Self::WeightedSla => "weighted_sla",
        })
    }
}

impl FromStr for ObjectiveType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "maximize_volume_at_sla" => Ok(Self::MaximizeVolumeAtSla),
            "weighted_sla" => Ok(Self::WeightedSla),
            _ => Err(ParseEnumError {
                what: "objective type",
                value: s.to_string(),
            }),
        }
    }
}

/// Set of weekdays on which a scheduled departure runs. The empty set means
/// every day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DaySet(u8);

/// Weekday abbreviations in mask order, Monday first.
const DAY_ABBREVS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

impl DaySet {
    /// The set that runs every day.
    pub fn every_day() -> Self {
        Self(0)
    }

    /// Whether no explicit days were given (runs daily).
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Whether the departure runs on the given weekday.
    pub fn contains(&self, day: Weekday) -> bool {
        self.is_empty() || self.0 & (1 << day.num_days_from_monday()) != 0
    }

    /// Insert a weekday into the set.
    pub fn insert(&mut self, day: Weekday) {
        self.0 |= 1 << day.num_days_from_monday();
    }
}

impl fmt::Display for DaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (i, abbrev) in DAY_ABBREVS.iter().enumerate() {
            if self.0 & (1 << i) != 0 {
                if !first {
                    f.write_str(",")?;
                }
                f.write_str(abbrev)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl FromStr for DaySet {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut set = Self::every_day();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match DAY_ABBREVS.iter().position(|d| d.eq_ignore_ascii_case(part)) {
                Some(i) => set.0 |= 1 << i,
                None => {
                    return Err(ParseEnumError {
                        what: "day of week",
                        value: part.to_string(),
                    })
                }
            }
        }
        Ok(set)
    }
}

/// A daily processing window in a facility's local time. The window crosses
/// midnight iff `end_local < start_local`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortWindow {
    /// Local wall-clock opening time.
    pub start_local: NaiveTime,
    /// Local wall-clock closing time.
    pub end_local: NaiveTime,
    /// IANA zone in which the wall-clock times are expressed.
    pub zone: Tz,
}

impl SortWindow {
    /// Whether the window spans local midnight.
    pub fn crosses_midnight(&self) -> bool {
        self.end_local < self.start_local
    }

    /// Window length in minutes, accounting for midnight crossing.
    pub fn duration_minutes(&self) -> f64 {
        let start = time_to_minutes(self.start_local);
        let end = time_to_minutes(self.end_local);
        if self.crosses_midnight() {
            (MINUTES_PER_DAY - start) + end
        } else {
            end - start
        }
    }

    /// Whether a local wall-clock time falls inside the window. Start is
    /// inclusive, end exclusive; a midnight-crossing window contains `t` iff
    /// `t >= start` or `t < end`.
    pub fn contains(&self, t: NaiveTime) -> bool {
        if self.crosses_midnight() {
            t >= self.start_local || t < self.end_local
        } else {
            self.start_local <= t && t < self.end_local
        }
    }
}

/// Fractional minutes since local midnight.
pub(crate) fn time_to_minutes(t: NaiveTime) -> f64 {
    t.num_seconds_from_midnight() as f64 / 60.0
}

/// Wall-clock time-of-day from fractional minutes, wrapping past midnight.
pub(crate) fn minutes_to_time(minutes: f64) -> NaiveTime {
    let minutes = minutes.rem_euclid(MINUTES_PER_DAY);
    let secs = (minutes * 60.0).round() as u32 % 86_400;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, 0)
        .unwrap_or(NaiveTime::MIN)
}

/// A Critical Pull Time: one scheduled trailer departure on an arc.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cpt {
    /// Departing facility.
    pub origin: String,
    /// Destination facility, or `"*"` for a schedule bound to every arc.
    pub dest: String,
    /// Position of the departure within the day's schedule.
    pub sequence: u32,
    /// Local wall-clock departure time at the origin.
    pub local_time: NaiveTime,
    /// Zone of the origin facility.
    pub zone: Tz,
    /// Days on which the departure runs; empty = daily.
    pub days: DaySet,
    /// Whether the trailer is actually running today.
    pub is_active: bool,
}

/// A contiguous distance range mapped to a rating zone with its linehaul
/// speed assumptions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MileageBand {
    /// Rating zone index.
    pub zone: u32,
    /// Lower distance bound, inclusive.
    pub miles_min: f64,
    /// Upper distance bound, exclusive except on the last band.
    pub miles_max: f64,
    /// Road miles per great-circle mile.
    pub circuity_factor: f64,
    /// Average linehaul speed.
    pub mph: f64,
}

/// A contractual delivery commitment matched against OD pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCommitment {
    /// Origin facility, or `"*"`.
    pub origin: String,
    /// Destination facility, or `"*"`.
    pub dest: String,
    /// Rating zone the commitment applies to, if zone-scoped.
    pub zone: Option<u32>,
    /// Contractual days in transit.
    pub sla_days: u32,
    /// Additional buffer days on top of the contract.
    pub sla_buffer_days: f64,
    /// Weight used by the downstream weighted-SLA objective.
    pub priority_weight: f64,
}

impl ServiceCommitment {
    /// Total allowed hours: `(sla_days + sla_buffer_days) * 24`.
    pub fn target_hours(&self) -> f64 {
        (self.sla_days as f64 + self.sla_buffer_days) * HOURS_PER_DAY
    }
}

/// Per-step processing durations, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingParams {
    /// Induction sort at the origin.
    pub induction_sort_minutes: f64,
    /// Crossdock at an intermediate facility.
    pub middle_mile_crossdock_minutes: f64,
    /// Full sort at the regional sort hub.
    pub middle_mile_sort_minutes: f64,
    /// Last-mile sort at the delivery facility.
    pub last_mile_sort_minutes: f64,
}

/// Model-wide settings for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    /// Objective tag, reported to the downstream model only.
    pub objective: ObjectiveType,
    /// Maximum number of edges in an enumerated path.
    pub max_path_touches: u32,
    /// Maximum allowed around-the-world factor.
    pub max_path_atw_factor: f64,
    /// Calendar date of the reference injection.
    pub reference_injection_date: NaiveDate,
    /// Local time-of-day of the reference injection at the origin.
    pub reference_injection_time: NaiveTime,
    /// Keep only the best N timings per (OD, sort level) when set.
    pub top_paths_per_sort_level: Option<usize>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            objective: ObjectiveType::WeightedSla,
            max_path_touches: 4,
            max_path_atw_factor: 1.5,
            reference_injection_date: NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(),
            reference_injection_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            top_paths_per_sort_level: None,
        }
    }
}

/// A physical facility in the network. Identity is the (case-preserving)
/// name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    /// Facility name.
    pub name: String,
    /// Role of the facility.
    pub kind: FacilityKind,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// IANA zone the facility operates in.
    pub zone: Tz,
    /// Name of the parent hub, if any.
    pub parent_hub: Option<String>,
    /// Name of the hub holding the final sort before last mile, if any.
    pub regional_sort_hub: Option<String>,
    /// Whether volume can be injected here.
    pub is_injection_node: bool,
    /// Middle-mile sort window opening, local.
    pub mm_sort_start_local: Option<NaiveTime>,
    /// Middle-mile sort window closing, local.
    pub mm_sort_end_local: Option<NaiveTime>,
    /// Last-mile sort window opening, local.
    pub lm_sort_start_local: Option<NaiveTime>,
    /// Last-mile sort window closing, local.
    pub lm_sort_end_local: Option<NaiveTime>,
    /// Outbound (CPT generation) window opening, local.
    pub outbound_window_start_local: Option<NaiveTime>,
    /// Outbound (CPT generation) window closing, local.
    pub outbound_window_end_local: Option<NaiveTime>,
    /// Number of CPTs synthesized across the outbound window.
    pub outbound_cpt_count: Option<u32>,
    /// Inbound dock capacity; read but unused by the feasibility model.
    pub max_inbound_trucks_per_hour: Option<f64>,
    /// Outbound dock capacity; read but unused by the feasibility model.
    pub max_outbound_trucks_per_hour: Option<f64>,
}

impl Facility {
    /// The middle-mile sort window, when both bounds are set.
    pub fn mm_sort_window(&self) -> Option<SortWindow> {
        match (self.mm_sort_start_local, self.mm_sort_end_local) {
            (Some(start_local), Some(end_local)) => Some(SortWindow {
                start_local,
                end_local,
                zone: self.zone,
            }),
            _ => None,
        }
    }

    /// The last-mile sort window, when both bounds are set.
    pub fn lm_sort_window(&self) -> Option<SortWindow> {
        match (self.lm_sort_start_local, self.lm_sort_end_local) {
            (Some(start_local), Some(end_local)) => Some(SortWindow {
                start_local,
                end_local,
                zone: self.zone,
            }),
            _ => None,
        }
    }

    /// The outbound window from which default CPTs are synthesized.
    pub fn outbound_window(&self) -> Option<SortWindow> {
        match (
            self.outbound_window_start_local,
            self.outbound_window_end_local,
        ) {
            (Some(start_local), Some(end_local)) => Some(SortWindow {
                start_local,
                end_local,
                zone: self.zone,
            }),
            _ => None,
        }
    }
}

/// Read-only lookup table of all facilities, keyed by name. A `BTreeMap`
/// keeps iteration (and thus enumeration output) deterministic.
pub type FacilityMap = BTreeMap<String, Facility>;

/// One ZIP code's population, assigned to its delivery facility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZipAssignment {
    /// ZIP code, zero-padded to five digits.
    pub zip: String,
    /// Delivery facility serving the ZIP.
    pub facility_name_assigned: String,
    /// Population of the ZIP.
    pub population: f64,
}

/// Flow parameters for one day profile of a demand year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayShares {
    /// Daily rate: fraction of the annual volume flowing on one such day.
    /// Despite the name this is NOT divided by a day count downstream.
    pub pct_of_annual: f64,
    /// Share entering as middle mile.
    pub middle_mile_share: f64,
    /// Share entering as zone skip.
    pub zone_skip_share: f64,
    /// Share entering as direct injection.
    pub direct_injection_share: f64,
}

impl DayShares {
    /// Sum of the three flow shares; must be 1.0 within tolerance.
    pub fn flow_share_total(&self) -> f64 {
        self.middle_mile_share + self.zone_skip_share + self.direct_injection_share
    }
}

/// Annual volume and flow shares for one year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DemandYear {
    /// Calendar year.
    pub year: i32,
    /// Total annual packages.
    pub annual_pkgs: f64,
    /// Peak-day parameters.
    pub peak: DayShares,
    /// Off-peak-day parameters.
    pub offpeak: DayShares,
}

/// Share of injected volume entering at one facility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectionShare {
    /// Injection facility.
    pub facility_name: String,
    /// Absolute share of all middle-mile injection; shares sum to ~1.0.
    pub absolute_share: f64,
}

/// One scenario to evaluate: a year under a day profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDef {
    /// Scenario identifier, carried through all outputs.
    pub scenario_id: String,
    /// Demand year to draw volumes from.
    pub year: i32,
    /// Day profile to model.
    pub day_type: DayType,
}

/// Daily package volume for one OD pair in one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OdDemand {
    /// Scenario the demand belongs to.
    pub scenario_id: String,
    /// Origin facility.
    pub origin: String,
    /// Destination facility.
    pub dest: String,
    /// Packages per day.
    pub pkgs_day: f64,
    /// Rating zone of the pair; 0 only for direct injection.
    pub zone: u32,
    /// How the volume enters the network.
    pub flow_type: FlowType,
    /// Day profile of the scenario.
    pub day_type: DayType,
}

/// One candidate physical routing, fanned out to a sort-level variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathCandidate {
    /// Origin facility.
    pub origin: String,
    /// Destination facility.
    pub dest: String,
    /// Ordered facility names from origin to destination (length 2..=5).
    pub nodes: Vec<String>,
    /// Shape tag derived from the number of edges.
    pub path_type: PathType,
    /// Sortation granularity applied at the origin.
    pub sort_level: SortLevel,
    /// Granularity the volume arrives with at the destination.
    pub dest_sort_level: SortLevel,
    /// Sum of great-circle leg distances.
    pub total_path_miles: f64,
    /// Great-circle origin-to-destination distance.
    pub direct_miles: f64,
    /// `total_path_miles / direct_miles`, or 1.0 when direct is zero.
    pub atw_factor: f64,
}

impl PathCandidate {
    /// Number of edges in the path.
    pub fn hops(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }
}

impl fmt::Display for PathCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                f.write_str("->")?;
            }
            f.write_str(node)?;
        }
        write!(f, " [{}/{}]", self.sort_level, self.dest_sort_level)
    }
}

/// What happens during one step of a path trace. Each variant carries only
/// the fields that exist for that step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Induction sort at the origin, aligned to its middle-mile window.
    InductionSort {
        /// Facility performing the sort.
        facility: String,
        /// Minutes spent waiting for the window to open.
        window_dwell_minutes: f64,
    },
    /// Linehaul between two facilities, departing on a CPT.
    Transit {
        /// Departing facility.
        from: String,
        /// Arriving facility.
        to: String,
        /// Great-circle leg distance.
        distance_miles: f64,
        /// Minutes spent waiting for the trailer to pull.
        cpt_dwell_minutes: f64,
        /// Whether the departure used an active CPT.
        departed_on_active_cpt: bool,
    },
    /// Pass-through handling at an intermediate facility.
    Crossdock {
        /// Facility performing the crossdock.
        facility: String,
        /// Minutes spent waiting for the window to open.
        window_dwell_minutes: f64,
    },
    /// Full re-sort at the regional sort hub (REGION-level paths only).
    FullSort {
        /// Facility performing the sort.
        facility: String,
        /// Minutes spent waiting for the window to open.
        window_dwell_minutes: f64,
    },
    /// Final sort at the delivery facility (MARKET-level arrivals only).
    LastMileSort {
        /// Facility performing the sort.
        facility: String,
        /// Minutes spent waiting for the window to open.
        window_dwell_minutes: f64,
    },
}

impl StepKind {
    /// Snake-case tag used in reports and traces.
    pub fn label(&self) -> &'static str {
        match self {
            Self::InductionSort { .. } => "induction_sort",
            Self::Transit { .. } => "transit",
            Self::Crossdock { .. } => "crossdock",
            Self::FullSort { .. } => "full_sort",
            Self::LastMileSort { .. } => "last_mile_sort",
        }
    }

    /// Minutes spent waiting for a sort window before this step.
    pub fn window_dwell_minutes(&self) -> f64 {
        match self {
            Self::InductionSort {
                window_dwell_minutes,
                ..
            }
            | Self::Crossdock {
                window_dwell_minutes,
                ..
            }
            | Self::FullSort {
                window_dwell_minutes,
                ..
            }
            | Self::LastMileSort {
                window_dwell_minutes,
                ..
            } => *window_dwell_minutes,
            Self::Transit { .. } => 0.0,
        }
    }

    /// Minutes spent waiting for a trailer departure before this step.
    pub fn cpt_dwell_minutes(&self) -> f64 {
        match self {
            Self::Transit {
                cpt_dwell_minutes, ..
            } => *cpt_dwell_minutes,
            _ => 0.0,
        }
    }

    /// All dwell minutes attributed to this step.
    pub fn total_dwell_minutes(&self) -> f64 {
        self.window_dwell_minutes() + self.cpt_dwell_minutes()
    }
}

/// One chained step of a path trace. Any gap before the step is attributed
/// to the dwell fields of its [`StepKind`]; `end_utc - start_utc` always
/// equals `duration_minutes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathStep {
    /// 1-based position in the trace.
    pub sequence: usize,
    /// What the step does, with its per-kind fields.
    pub kind: StepKind,
    /// Step start, UTC.
    pub start_utc: NaiveDateTime,
    /// Step end, UTC.
    pub end_utc: NaiveDateTime,
    /// Processing duration in minutes.
    pub duration_minutes: f64,
}

/// The timed evaluation of one [`PathCandidate`], with its step trace and
/// SLA annotation. Built by the timing engine; the SLA fields are written
/// exactly once by the feasibility checker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathTiming {
    /// The candidate this timing belongs to.
    pub path: PathCandidate,
    /// Ordered, non-empty step trace.
    pub steps: Vec<PathStep>,
    /// Fixed injection instant (first step start minus its dwell), UTC.
    pub injection_utc: NaiveDateTime,
    /// Arrival instant (last step end), UTC.
    pub delivery_utc: NaiveDateTime,
    /// Wall-clock hours from injection to arrival.
    pub tit_hours: f64,
    /// Hours spent waiting for sort windows.
    pub sort_window_dwell_hours: f64,
    /// Hours spent waiting for trailer departures.
    pub cpt_dwell_hours: f64,
    /// Total dwell hours.
    pub total_dwell_hours: f64,
    /// Whether every transit departed on an active CPT.
    pub uses_only_active_arcs: bool,
    /// Contractual days of the matched commitment.
    pub sla_days: u32,
    /// Buffer days of the matched commitment.
    pub sla_buffer_days: f64,
    /// Allowed hours; infinite when no commitment matched.
    pub sla_target_hours: f64,
    /// Whether `tit_hours <= sla_target_hours`.
    pub sla_met: bool,
    /// `sla_target_hours - tit_hours`.
    pub sla_slack_hours: f64,
    /// Priority weight of the matched commitment.
    pub priority_weight: f64,
}

impl PathTiming {
    /// Ranking used everywhere a "best" path is chosen: ascending TIT, then
    /// fewest hops, then shortest path miles.
    pub fn ranking_cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.tit_hours
            .total_cmp(&other.tit_hours)
            .then(self.path.hops().cmp(&other.path.hops()))
            .then(self.path.total_path_miles.total_cmp(&other.path.total_path_miles))
    }
}
