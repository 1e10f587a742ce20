//! Month view over one-off events and weekly masses.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::{event, mass};

const DAY_NAMES: [&str; 7] = [
    "Dimanche", "Lundi", "Mardi", "Mercredi", "Jeudi", "Vendredi", "Samedi",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Event,
    Mass,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarEntry {
    pub id: String,
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub kind: EntryKind,
    pub source_id: Uuid,
    pub location: Option<String>,
    pub description: Option<String>,
}

/// First and last day of a calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    pub first: NaiveDate,
    pub last: NaiveDate,
}

impl MonthWindow {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        Some(Self {
            first,
            last: next.pred_opt()?,
        })
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.first.iter_days().take_while(|d| *d <= self.last)
    }

    fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        start <= self.last && end >= self.first
    }
}

pub fn build(window: MonthWindow, events: &[event::Model], masses: &[mass::Model]) -> Vec<CalendarEntry> {
    let mut entries: Vec<CalendarEntry> = events
        .iter()
        .filter_map(|e| event_entry(&window, e))
        .collect();

    for m in masses {
        entries.extend(mass_entries(&window, m));
    }

    entries.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
    entries
}

fn event_entry(window: &MonthWindow, e: &event::Model) -> Option<CalendarEntry> {
    let end = e.end_date.unwrap_or(e.date);
    if !window.overlaps(e.date.date(), end.date()) {
        return None;
    }
    Some(CalendarEntry {
        id: format!("event-{}", e.id),
        title: e.title.clone(),
        start: e.date,
        end,
        kind: EntryKind::Event,
        source_id: e.id,
        location: e.location.clone(),
        description: e.description.clone(),
    })
}

fn mass_entries(window: &MonthWindow, m: &mass::Model) -> Vec<CalendarEntry> {
    let Some(day_name) = usize::try_from(m.day_of_week)
        .ok()
        .and_then(|d| DAY_NAMES.get(d))
    else {
        return Vec::new();
    };
    let title = format!("Messe - {}", m.description.as_deref().unwrap_or(day_name));

    window
        .days()
        .filter(|day| i64::from(day.weekday().num_days_from_sunday()) == i64::from(m.day_of_week))
        .filter(|day| m.valid_from.is_none_or(|from| *day >= from))
        .filter(|day| m.valid_until.is_none_or(|until| *day <= until))
        .map(|day| {
            let start = day.and_time(m.time_of_day);
            CalendarEntry {
                id: format!("mass-{}-{}", m.id, day.format("%Y-%m-%d")),
                title: title.clone(),
                start,
                end: start + Duration::hours(1),
                kind: EntryKind::Mass,
                source_id: m.id,
                location: m.location.clone(),
                description: m.description.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn at(y: i32, mo: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn event(title: &str, date: NaiveDateTime, end: Option<NaiveDateTime>) -> event::Model {
        event::Model {
            id: Uuid::new_v4(),
            parish_id: Uuid::nil(),
            title: title.into(),
            description: None,
            date,
            end_date: end,
            location: Some("Église".into()),
            event_type: "other".into(),
            image_url: None,
            organizer: None,
            contact_email: None,
            contact_phone: None,
            max_participants: None,
            registered_count: 0,
            created_at: date,
            updated_at: date,
        }
    }

    fn sunday_mass() -> mass::Model {
        mass::Model {
            id: Uuid::new_v4(),
            parish_id: Uuid::nil(),
            day_of_week: 0,
            time_of_day: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
            description: None,
            location: None,
            celebrant: None,
            lang: None,
            is_exceptional: false,
            valid_from: None,
            valid_until: None,
            created_at: at(2024, 1, 1, 0),
            updated_at: at(2024, 1, 1, 0),
        }
    }

    #[test]
    fn month_window_handles_december_and_leap_years() {
        let dec = MonthWindow::new(2024, 12).unwrap();
        assert_eq!(dec.last, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        let feb = MonthWindow::new(2024, 2).unwrap();
        assert_eq!(feb.days().count(), 29);
        assert!(MonthWindow::new(2024, 13).is_none());
    }

    #[test]
    fn weekly_mass_expands_on_matching_weekdays() {
        // June 2025 has five Sundays: 1, 8, 15, 22, 29.
        let window = MonthWindow::new(2025, 6).unwrap();
        let entries = build(window, &[], &[sunday_mass()]);

        assert_eq!(entries.len(), 5);
        assert!(entries.iter().all(|e| e.start.weekday() == chrono::Weekday::Sun));
        assert_eq!(entries[0].title, "Messe - Dimanche");
        assert_eq!(entries[0].start, at(2025, 6, 1, 10) + Duration::minutes(30));
        assert_eq!(entries[0].end - entries[0].start, Duration::hours(1));
        assert!(entries[0].id.ends_with("-2025-06-01"));
    }

    #[test]
    fn validity_window_limits_mass_dates() {
        let mut mass = sunday_mass();
        mass.description = Some("Messe des familles".into());
        mass.valid_from = NaiveDate::from_ymd_opt(2025, 6, 8);
        mass.valid_until = NaiveDate::from_ymd_opt(2025, 6, 22);

        let entries = build(MonthWindow::new(2025, 6).unwrap(), &[], &[mass]);

        let days: Vec<u32> = entries.iter().map(|e| e.start.day()).collect();
        assert_eq!(days, vec![8, 15, 22]);
        assert_eq!(entries[0].title, "Messe - Messe des familles");
    }

    #[test]
    fn only_overlapping_events_are_included() {
        let window = MonthWindow::new(2025, 6).unwrap();
        let events = vec![
            event("Kermesse", at(2025, 6, 14, 9), None),
            event("Retraite", at(2025, 5, 30, 9), Some(at(2025, 6, 2, 17))),
            event("Pèlerinage", at(2025, 7, 3, 9), None),
            event("Camp", at(2025, 5, 1, 9), Some(at(2025, 5, 31, 17))),
        ];

        let entries = build(window, &events, &[]);

        let titles: Vec<&str> = entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Retraite", "Kermesse"]);
        assert!(entries[1].id.starts_with("event-"));
    }

    #[test]
    fn entries_are_sorted_by_start() {
        let window = MonthWindow::new(2025, 6).unwrap();
        let events = vec![event("Concert", at(2025, 6, 1, 20), None)];
        let entries = build(window, &events, &[sunday_mass()]);

        assert!(entries.windows(2).all(|w| w[0].start <= w[1].start));
        assert_eq!(entries[0].kind, EntryKind::Mass);
        assert_eq!(entries[1].kind, EntryKind::Event);
    }
}
