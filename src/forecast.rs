use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::bucket::slot_domain;
use crate::models::{Category, DayOfWeek, SlotKey, TimeSlot, Timeline};
use crate::summary::summarize;

/// Reports per slot treated as typical activity.
const BASELINE_REPORTS: u64 = 4;
const SCALE: u64 = 20;
const FLOOR_OFFSET: u64 = 10;
const MAX_CONGESTION: u64 = 100;

/// `min(100, floor(count / 4 * 20 + 10))`, computed in integers.
pub fn congestion_score(report_count: usize) -> u8 {
    let count = u64::try_from(report_count).unwrap_or(u64::MAX);
    let raw = count.saturating_mul(SCALE) / BASELINE_REPORTS + FLOOR_OFFSET;
    u8::try_from(raw.min(MAX_CONGESTION)).unwrap_or(u8::MAX)
}

/// Most frequent category. Ties go to whichever category appeared first.
pub fn dominant_category(categories: &[Category]) -> Option<Category> {
    let mut counts: Vec<(&Category, usize)> = Vec::new();

    for category in categories {
        match counts.iter_mut().find(|(seen, _)| *seen == category) {
            Some(entry) => entry.1 += 1,
            None => counts.push((category, 1)),
        }
    }

    let mut best: Option<(&Category, usize)> = None;
    for (category, count) in counts {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((category, count));
        }
    }

    best.map(|(category, _)| category.clone())
}

/// Reduces one slot's categories to a `TimeSlot`; an empty slot yields nothing.
pub fn aggregate_slot(hour: u32, minute_offset: u32, categories: &[Category]) -> Option<TimeSlot> {
    let dominant = dominant_category(categories)?;
    let report_count = categories.len();

    Some(TimeSlot {
        hour,
        minute_offset,
        summary: summarize(&dominant, hour).to_string(),
        dominant_category: dominant,
        report_count,
        congestion_score: congestion_score(report_count),
    })
}

/// Builds the timeline for one weekday from grouped reports, walking the slot
/// domain in ascending order. Returns `None` when no slot is populated.
pub fn build_timeline(
    university_id: i32,
    day: DayOfWeek,
    groups: &HashMap<SlotKey, Vec<Category>>,
    updated_at: DateTime<Utc>,
) -> Option<Timeline> {
    let slots: Vec<TimeSlot> = slot_domain()
        .filter_map(|(hour, minute_offset)| {
            let key = SlotKey {
                day,
                hour,
                minute_offset,
            };
            let categories = groups.get(&key)?;
            aggregate_slot(hour, minute_offset, categories)
        })
        .collect();

    if slots.is_empty() {
        return None;
    }

    Some(Timeline {
        university_id,
        day,
        slots,
        updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories(values: &[&str]) -> Vec<Category> {
        values.iter().map(|value| Category::from(*value)).collect()
    }

    #[test]
    fn congestion_follows_baseline_formula() {
        assert_eq!(congestion_score(1), 15);
        assert_eq!(congestion_score(2), 20);
        assert_eq!(congestion_score(3), 25);
        assert_eq!(congestion_score(4), 30);
        assert_eq!(congestion_score(18), 100);
        assert_eq!(congestion_score(40), 100);
        assert_eq!(congestion_score(usize::MAX), 100);
    }

    #[test]
    fn congestion_stays_within_bounds() {
        for count in 0..500 {
            assert!(congestion_score(count) <= 100);
        }
    }

    #[test]
    fn mode_picks_most_frequent() {
        let values = categories(&["EVENT", "TRAFFIC", "TRAFFIC", "EVENT", "TRAFFIC"]);
        assert_eq!(dominant_category(&values), Some(Category::Traffic));
    }

    #[test]
    fn mode_ties_go_to_first_seen() {
        let values = categories(&["WEATHER", "CAFETERIA", "CAFETERIA", "WEATHER"]);
        assert_eq!(dominant_category(&values), Some(Category::Weather));

        let values = categories(&["LIBRARY", "EVENT"]);
        assert_eq!(dominant_category(&values), Some(Category::from("LIBRARY")));
    }

    #[test]
    fn empty_slot_produces_nothing() {
        assert_eq!(dominant_category(&[]), None);
        assert_eq!(aggregate_slot(9, 0, &[]), None);
    }

    #[test]
    fn morning_traffic_slot() {
        let values = categories(&["TRAFFIC", "EVENT", "TRAFFIC", "EVENT", "TRAFFIC"]);
        let slot = aggregate_slot(9, 15, &values).expect("slot");
        assert_eq!(slot.dominant_category, Category::Traffic);
        assert_eq!(slot.report_count, 5);
        assert_eq!(slot.congestion_score, 35);
        assert_eq!(slot.summary, "morning shuttle/bus queue expected");
        assert_eq!(slot.time_label(), "09:15");
    }

    #[test]
    fn timeline_is_ordered_and_skips_other_days() {
        let mut groups = HashMap::new();
        groups.insert(
            SlotKey {
                day: DayOfWeek::Tue,
                hour: 14,
                minute_offset: 30,
            },
            categories(&["EVENT"]),
        );
        groups.insert(
            SlotKey {
                day: DayOfWeek::Tue,
                hour: 8,
                minute_offset: 45,
            },
            categories(&["CAFETERIA", "CAFETERIA"]),
        );
        groups.insert(
            SlotKey {
                day: DayOfWeek::Wed,
                hour: 10,
                minute_offset: 0,
            },
            categories(&["WEATHER"]),
        );

        let now = Utc::now();
        let timeline = build_timeline(7, DayOfWeek::Tue, &groups, now).expect("timeline");
        let labels: Vec<String> = timeline.slots.iter().map(TimeSlot::time_label).collect();
        assert_eq!(labels, vec!["08:45", "14:30"]);
        assert_eq!(timeline.university_id, 7);
        assert_eq!(timeline.updated_at, now);

        assert!(build_timeline(7, DayOfWeek::Thu, &groups, now).is_none());
    }
}
