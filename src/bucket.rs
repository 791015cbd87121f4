use std::collections::HashMap;

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc};

use crate::models::{Category, DayOfWeek, SlotKey, StatusReport};

/// Korea Standard Time, UTC+9 with no daylight saving.
const CAMPUS_UTC_OFFSET_SECS: i32 = 9 * 3600;

pub const FIRST_HOUR: u32 = 8;
pub const LAST_HOUR: u32 = 22;
pub const SLOT_MINUTES: u32 = 15;
pub const MINUTE_OFFSETS: [u32; 4] = [0, 15, 30, 45];

fn campus_offset() -> FixedOffset {
    FixedOffset::east_opt(CAMPUS_UTC_OFFSET_SECS).expect("UTC+9 is within offset bounds")
}

/// Maps a timestamp to its local weekday, hour and floored quarter-hour.
pub fn slot_key(created_at: DateTime<Utc>) -> SlotKey {
    let local = created_at.with_timezone(&campus_offset());
    SlotKey {
        day: DayOfWeek::from(local.weekday()),
        hour: local.hour(),
        minute_offset: (local.minute() / SLOT_MINUTES) * SLOT_MINUTES,
    }
}

/// Whether a bucket can contribute to a forecast: a workday inside operating hours.
pub fn is_forecast_slot(key: &SlotKey) -> bool {
    key.day.is_workday() && (FIRST_HOUR..=LAST_HOUR).contains(&key.hour)
}

/// Every candidate `(hour, minute_offset)` pair in ascending order.
pub fn slot_domain() -> impl Iterator<Item = (u32, u32)> {
    (FIRST_HOUR..=LAST_HOUR)
        .flat_map(|hour| MINUTE_OFFSETS.iter().map(move |minute| (hour, *minute)))
}

/// Groups report categories by slot, keeping the scan order of `reports`
/// within each group. Weekend and out-of-hours reports are dropped here.
pub fn group_reports(reports: &[StatusReport]) -> HashMap<SlotKey, Vec<Category>> {
    let mut groups: HashMap<SlotKey, Vec<Category>> = HashMap::new();

    for report in reports {
        let key = slot_key(report.created_at);
        if !is_forecast_slot(&key) {
            continue;
        }
        groups.entry(key).or_default().push(report.category.clone());
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn kst(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        campus_offset()
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .single()
            .expect("valid local time")
            .with_timezone(&Utc)
    }

    fn report(at: DateTime<Utc>, category: &str) -> StatusReport {
        StatusReport {
            content: "queue".to_string(),
            category: Category::from(category),
            created_at: at,
        }
    }

    #[test]
    fn converts_utc_to_campus_local_time() {
        // 2026-10-18 (Sunday) 23:10 UTC is Monday 08:10 in Seoul.
        let at = Utc.with_ymd_and_hms(2026, 10, 18, 23, 10, 0).single().expect("utc");
        let key = slot_key(at);
        assert_eq!(key.day, DayOfWeek::Mon);
        assert_eq!(key.hour, 8);
        assert_eq!(key.minute_offset, 0);
    }

    #[test]
    fn minutes_floor_to_quarter_hour() {
        // 2026-10-19 is a Monday.
        assert_eq!(slot_key(kst(2026, 10, 19, 12, 44)).minute_offset, 30);
        assert_eq!(slot_key(kst(2026, 10, 19, 12, 45)).minute_offset, 45);
        assert_eq!(slot_key(kst(2026, 10, 19, 12, 59)).minute_offset, 45);
        assert_eq!(slot_key(kst(2026, 10, 19, 12, 3)).minute_offset, 0);
    }

    #[test]
    fn filters_weekends_and_out_of_hours() {
        assert!(is_forecast_slot(&slot_key(kst(2026, 10, 19, 8, 0))));
        assert!(is_forecast_slot(&slot_key(kst(2026, 10, 23, 22, 59))));
        assert!(!is_forecast_slot(&slot_key(kst(2026, 10, 19, 7, 59))));
        assert!(!is_forecast_slot(&slot_key(kst(2026, 10, 19, 23, 0))));
        assert!(!is_forecast_slot(&slot_key(kst(2026, 10, 24, 12, 0))));
        assert!(!is_forecast_slot(&slot_key(kst(2026, 10, 25, 12, 0))));
    }

    #[test]
    fn slot_domain_covers_operating_hours_in_order() {
        let domain: Vec<(u32, u32)> = slot_domain().collect();
        assert_eq!(domain.len(), 15 * 4);
        assert_eq!(domain.first(), Some(&(8, 0)));
        assert_eq!(domain.last(), Some(&(22, 45)));
        assert!(domain.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn groups_preserve_scan_order() {
        let reports = vec![
            report(kst(2026, 10, 19, 9, 1), "EVENT"),
            report(kst(2026, 10, 19, 9, 14), "TRAFFIC"),
            report(kst(2026, 10, 19, 9, 20), "WEATHER"),
            report(kst(2026, 10, 24, 9, 1), "CAFETERIA"),
        ];
        let groups = group_reports(&reports);
        assert_eq!(groups.len(), 2);

        let key = SlotKey {
            day: DayOfWeek::Mon,
            hour: 9,
            minute_offset: 0,
        };
        assert_eq!(groups[&key], vec![Category::Event, Category::Traffic]);
    }
}
