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

//! Wall-clock algebra over IANA zones. Instants are carried as naive UTC
//! datetimes; local wall-clock values exist only at the boundaries of these
//! functions. A local time falling into a DST gap resolves to the next valid
//! wall-clock instant; an ambiguous (fold) time resolves to the earlier one.

use chrono::{Duration, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use log::warn;

use crate::types::SortWindow;

/// Convert a naive local wall-clock datetime to naive UTC.
pub fn local_naive_to_utc(local: NaiveDateTime, zone: Tz) -> NaiveDateTime {
    let mut candidate = local;
    // A DST gap invalidates up to a few hours of wall clock; probe forward in
    // quarter-hour steps until the zone accepts the value.
    for _ in 0..16 {
        match zone.from_local_datetime(&candidate) {
            LocalResult::Single(dt) => return dt.naive_utc(),
            LocalResult::Ambiguous(earlier, _) => return earlier.naive_utc(),
            LocalResult::None => candidate = candidate + Duration::minutes(15),
        }
    }
    // unreachable for any real tzdata zone; fall back to treating it as UTC
    warn!("could not resolve local time {local} in zone {zone}");
    local
}

/// Convert a naive UTC datetime to the naive local wall clock of a zone.
pub fn utc_to_local_naive(utc: NaiveDateTime, zone: Tz) -> NaiveDateTime {
    Utc.from_utc_datetime(&utc).with_timezone(&zone).naive_local()
}

/// Signed minutes from `b` to `a`.
pub(crate) fn minutes_between(a: NaiveDateTime, b: NaiveDateTime) -> f64 {
    (a - b).num_seconds() as f64 / 60.0
}

/// A fractional-minute duration, rounded to whole seconds.
pub(crate) fn minutes_duration(minutes: f64) -> Duration {
    Duration::seconds((minutes * 60.0).round() as i64)
}

/// Forward-chain alignment: the earliest instant at or after `ready_utc` at
/// which the window is open, and the minutes waited to get there. Returns
/// `(ready_utc, 0)` when the ready time already falls inside the window.
pub fn align_to_window_start(
    ready_utc: NaiveDateTime,
    window: &SortWindow,
    _processing_minutes: f64,
) -> (NaiveDateTime, f64) {
    let ready_local = utc_to_local_naive(ready_utc, window.zone);

    if window.contains(ready_local.time()) {
        return (ready_utc, 0.0);
    }

    // Outside the window: the next opening is today's start if we have not
    // reached it yet, else tomorrow's. A midnight-crossing window whose gap
    // we are in always opens later the same day.
    let next_start_local = if window.crosses_midnight() || ready_local.time() < window.start_local {
        ready_local.date().and_time(window.start_local)
    } else {
        (ready_local.date() + Duration::days(1)).and_time(window.start_local)
    };

    let next_start_utc = local_naive_to_utc(next_start_local, window.zone);
    let dwell = minutes_between(next_start_utc, ready_utc).max(0.0);
    (next_start_utc, dwell)
}

/// Backward-chain alignment: the latest processing start such that the work
/// finishes by `target_utc` while starting inside the window. Returns the
/// start instant and the dwell between the actual processing end and the
/// target. Retained for diagnostics; the production engine chains forward.
pub fn align_to_window_end(
    target_utc: NaiveDateTime,
    window: &SortWindow,
    processing_minutes: f64,
) -> (NaiveDateTime, f64) {
    let target_local = utc_to_local_naive(target_utc, window.zone);

    let proposed_start_local = target_local - minutes_duration(processing_minutes);

    if window.contains(proposed_start_local.time()) {
        return (local_naive_to_utc(proposed_start_local, window.zone), 0.0);
    }

    // Processing longer than the window cannot fit in one window instance;
    // clamp to the window and surface the surplus.
    let mut processing_minutes = processing_minutes;
    let window_duration = window.duration_minutes();
    if processing_minutes > window_duration {
        warn!(
            "processing of {processing_minutes:.0} min exceeds a {window_duration:.0} min window; \
             clamping (dwell will be underreported by {:.0} min)",
            processing_minutes - window_duration
        );
        processing_minutes = window_duration;
    }

    // Anchor processing so that it ends exactly at the most recent window
    // close at or before the target.
    let proposed_time = proposed_start_local.time();
    let proposed_date = proposed_start_local.date();
    let window_end_date = if window.crosses_midnight() {
        if proposed_time < window.end_local {
            proposed_date - Duration::days(1)
        } else {
            proposed_date
        }
    } else if proposed_time >= window.end_local {
        proposed_date
    } else {
        proposed_date - Duration::days(1)
    };

    let mut actual_end_local = window_end_date.and_time(window.end_local);
    let mut actual_end_utc = local_naive_to_utc(actual_end_local, window.zone);
    let mut dwell = minutes_between(target_utc, actual_end_utc);

    if dwell < 0.0 {
        actual_end_local -= Duration::days(1);
        actual_end_utc = local_naive_to_utc(actual_end_local, window.zone);
        dwell = minutes_between(target_utc, actual_end_utc);
    }

    let actual_start_local = actual_end_local - minutes_duration(processing_minutes);
    (
        local_naive_to_utc(actual_start_local, window.zone),
        dwell.max(0.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use chrono_tz::America::New_York;
    use chrono_tz::UTC;

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn round_trip_outside_transitions() {
        let local = dt(2025, 6, 15, 18, 0);
        let utc = local_naive_to_utc(local, New_York);
        assert_eq!(utc, dt(2025, 6, 15, 22, 0)); // EDT is UTC-4
        assert_eq!(utc_to_local_naive(utc, New_York), local);
    }

    #[test]
    fn dst_gap_resolves_to_next_valid_instant() {
        // 02:30 on 2025-03-09 does not exist in New York; clocks jump to 03:00.
        let gap = dt(2025, 3, 9, 2, 30);
        let utc = local_naive_to_utc(gap, New_York);
        let back = utc_to_local_naive(utc, New_York);
        assert_eq!(back, dt(2025, 3, 9, 3, 0));
    }

    #[test]
    fn ambiguous_fold_resolves_to_earlier_instant() {
        // 01:30 on 2025-11-02 occurs twice in New York; pick the EDT reading.
        let fold = dt(2025, 11, 2, 1, 30);
        let utc = local_naive_to_utc(fold, New_York);
        assert_eq!(utc, dt(2025, 11, 2, 5, 30));
    }

    #[test]
    fn forward_alignment_inside_window_is_free() {
        let w = SortWindow {
            start_local: t(18, 0),
            end_local: t(6, 0),
            zone: UTC,
        };
        let ready = dt(2025, 6, 15, 19, 0);
        assert_eq!(align_to_window_start(ready, &w, 60.0), (ready, 0.0));
    }

    #[test]
    fn forward_alignment_waits_for_opening() {
        let w = SortWindow {
            start_local: t(18, 0),
            end_local: t(6, 0),
            zone: UTC,
        };
        // 10:00 sits in the gap of a 18:00-06:00 window; opens at 18:00 today.
        let (start, dwell) = align_to_window_start(dt(2025, 6, 15, 10, 0), &w, 60.0);
        assert_eq!(start, dt(2025, 6, 15, 18, 0));
        assert_eq!(dwell, 480.0);
    }

    #[test]
    fn forward_alignment_rolls_to_next_day() {
        let w = SortWindow {
            start_local: t(6, 0),
            end_local: t(14, 0),
            zone: UTC,
        };
        // After close: next opening is tomorrow 06:00.
        let (start, dwell) = align_to_window_start(dt(2025, 6, 15, 15, 0), &w, 60.0);
        assert_eq!(start, dt(2025, 6, 16, 6, 0));
        assert_eq!(dwell, 900.0);
    }

    #[test]
    fn forward_alignment_converts_zones() {
        let w = SortWindow {
            start_local: t(18, 0),
            end_local: t(6, 0),
            zone: New_York,
        };
        // 20:00 UTC on Jun 15 is 16:00 in New York, two hours before opening.
        let (start, dwell) = align_to_window_start(dt(2025, 6, 15, 20, 0), &w, 60.0);
        assert_eq!(start, dt(2025, 6, 15, 22, 0));
        assert_eq!(dwell, 120.0);
    }

    #[test]
    fn backward_alignment_fits_without_dwell() {
        let w = SortWindow {
            start_local: t(18, 0),
            end_local: t(6, 0),
            zone: UTC,
        };
        // Finishing at 23:00 means starting at 22:00, squarely inside.
        let (start, dwell) = align_to_window_end(dt(2025, 6, 15, 23, 0), &w, 60.0);
        assert_eq!(start, dt(2025, 6, 15, 22, 0));
        assert_eq!(dwell, 0.0);
    }

    #[test]
    fn backward_alignment_anchors_to_previous_close() {
        let w = SortWindow {
            start_local: t(18, 0),
            end_local: t(6, 0),
            zone: UTC,
        };
        // A 12:00 target proposes an 11:00 start, outside the window; the
        // work anchors to end at the 06:00 close with six hours of dwell.
        let (start, dwell) = align_to_window_end(dt(2025, 6, 15, 12, 0), &w, 60.0);
        assert_eq!(start, dt(2025, 6, 15, 5, 0));
        assert_eq!(dwell, 360.0);
    }

    #[test]
    fn backward_alignment_clamps_oversized_processing() {
        let w = SortWindow {
            start_local: t(4, 0),
            end_local: t(6, 0),
            zone: UTC,
        };
        // Three hours of work cannot fit a two-hour window; the start clamps
        // to the window opening.
        let (start, _) = align_to_window_end(dt(2025, 6, 15, 12, 0), &w, 180.0);
        assert_eq!(start, dt(2025, 6, 15, 4, 0));
    }
}
