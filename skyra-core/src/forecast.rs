//! Shaping the 3-hour forecast feed into daily and hourly views.

use std::collections::HashMap;

use crate::model::ForecastEntry;

/// Days shown on the multi-day view.
pub const DAILY_WINDOW: usize = 5;

/// Slots shown on the hourly strip.
pub const HOURLY_SLOTS: usize = 6;

const NOON: &str = "12:00:00";

/// Splits an entry into its UTC calendar date and time of day.
fn day_and_time(entry: &ForecastEntry) -> (String, String) {
    if let Some((day, time)) = entry
        .time_text
        .as_deref()
        .and_then(|text| text.split_once(' '))
    {
        return (day.to_string(), time.to_string());
    }

    (
        entry.time.format("%Y-%m-%d").to_string(),
        entry.time.format("%H:%M:%S").to_string(),
    )
}

/// One entry per calendar day, in the order the days first appear.
///
/// The noon slot represents a day when the feed has one; otherwise the first
/// slot seen for that day does. At most `window` days are returned.
pub fn bucket_daily(entries: &[ForecastEntry], window: usize) -> Vec<ForecastEntry> {
    let mut days: Vec<ForecastEntry> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for entry in entries {
        let (day, time) = day_and_time(entry);
        match index.get(&day) {
            None => {
                index.insert(day, days.len());
                days.push(entry.clone());
            }
            Some(&slot) if time == NOON => days[slot] = entry.clone(),
            Some(_) => {}
        }
    }

    days.truncate(window);
    days
}

/// The first `n` slots of the feed.
pub fn hourly(entries: &[ForecastEntry], n: usize) -> &[ForecastEntry] {
    &entries[..n.min(entries.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn feed(start_hour: u32, slots: usize) -> Vec<ForecastEntry> {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, start_hour, 0, 0).unwrap();
        (0..slots)
            .map(|i| {
                let time = start + Duration::hours(3 * i as i64);
                let mut entry = ForecastEntry::at(time);
                entry.time_text = Some(time.format("%Y-%m-%d %H:%M:%S").to_string());
                entry.temperature_c = Some(i as f64);
                entry
            })
            .collect()
    }

    #[test]
    fn picks_noon_for_every_full_day() {
        // 15:00 on day one through 12:00 on day six: 40 slots.
        let entries = feed(15, 40);
        let days = bucket_daily(&entries, DAILY_WINDOW);

        assert_eq!(days.len(), 5);
        // Day one starts after noon, so its first slot stands in.
        assert_eq!(days[0].time_text.as_deref(), Some("2026-03-01 15:00:00"));
        for day in &days[1..] {
            assert!(day.time_text.as_deref().unwrap().ends_with("12:00:00"));
        }
        assert_eq!(days[1].time_text.as_deref(), Some("2026-03-02 12:00:00"));
    }

    #[test]
    fn result_length_is_distinct_days_when_under_window() {
        let entries = feed(0, 16); // two full days
        let days = bucket_daily(&entries, DAILY_WINDOW);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].time_text.as_deref(), Some("2026-03-01 12:00:00"));
        assert_eq!(days[1].time_text.as_deref(), Some("2026-03-02 12:00:00"));
    }

    #[test]
    fn window_caps_days() {
        let entries = feed(0, 40);
        assert_eq!(bucket_daily(&entries, 3).len(), 3);
        assert!(bucket_daily(&entries, 0).is_empty());
    }

    #[test]
    fn falls_back_to_timestamp_without_text() {
        let mut entries = feed(9, 3); // 09:00, 12:00, 15:00
        for e in &mut entries {
            e.time_text = None;
        }
        let days = bucket_daily(&entries, DAILY_WINDOW);
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].temperature_c, Some(1.0));
    }

    #[test]
    fn empty_feed_yields_nothing() {
        assert!(bucket_daily(&[], DAILY_WINDOW).is_empty());
        assert!(hourly(&[], HOURLY_SLOTS).is_empty());
    }

    #[test]
    fn hourly_takes_leading_slots() {
        let entries = feed(0, 10);
        let strip = hourly(&entries, HOURLY_SLOTS);
        assert_eq!(strip.len(), 6);
        assert_eq!(strip[0], entries[0]);

        let short = feed(0, 2);
        assert_eq!(hourly(&short, HOURLY_SLOTS).len(), 2);
    }
}
