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

//! # Linehaul: SLA path feasibility for parcel middle-mile networks
//!
//! For every origin-destination pair in a parcel network, this crate answers
//! one question: given a fixed daily injection time at the origin, which
//! physical routings through the hub/hybrid/launch network deliver inside the
//! contractual service level, and with how much slack? It is a pre-filter
//! feeding a downstream cost-optimizing sort-selection model with a pruned
//! set of path x sort-level candidates annotated with time-in-transit and
//! feasibility. It never optimizes cost, picks a single winner, or models
//! capacity.
//!
//! ## Structure
//!
//! The source code of this program is structured as follows:
//! - The module [`pathing`] (function [`evaluate`] and structure
//!   [`NetworkContext`]) contains the entire evaluation core. It holds the
//!   Enumerator ([`pathing::enumerate`]), the timing engine
//!   ([`pathing::timing`]) and the SLA checker ([`pathing::feasibility`]).
//! - The modules [`geo`], [`timealg`] and [`cpt`] are the leaves the core
//!   stands on: great-circle distance and zone rating, DST-aware wall-clock
//!   algebra over IANA zones, and the per-arc trailer departure schedules.
//! - The module [`demand`] splits annual volume into the per-scenario OD
//!   demand matrix the evaluation runs over.
//! - The module [`report`] aggregates evaluated paths into the four output
//!   tables, and [`io`] moves tables between disk and the typed projection
//!   ([`io::ModelInputs`]); [`validate`] cross-checks the projection before
//!   anything runs.
//! - The basic datastructures shared by all of the above live in [`types`].

#![deny(
    missing_docs,
    clippy::missing_docs_in_private_items,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::result_large_err)]

pub mod cpt;
pub mod demand;
pub mod geo;
pub mod io;
pub mod pathing;
pub mod report;
pub mod timealg;
pub mod types;
pub mod validate;

#[cfg(test)]
mod test;

pub use pathing::{build_demand, evaluate, NetworkContext, OdTimings};
pub use types::{Facility, OdDemand, PathCandidate, PathTiming, RunSettings};
