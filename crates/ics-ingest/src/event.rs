//! The canonical event model produced by ingestion.
//!
//! Field names serialize in camelCase and the variant is carried in a `type`
//! tag (`"single"` or `"rrule"`), which is the shape the downstream event
//! store consumes.

use serde::{Deserialize, Serialize};

/// Time-of-day fields, present together on timed events and absent on
/// all-day ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeOfDay {
    /// `HH:mm`, 24-hour.
    pub start_time: String,
    /// `HH:mm`, 24-hour.
    pub end_time: String,
}

/// A unique occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleEvent {
    pub uid: String,
    pub title: String,
    /// `YYYY-MM-DD`.
    pub date: String,
    /// Inclusive last day, `None` when the event ends on `date`.
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub timezone: Option<String>,
    pub all_day: bool,
    #[serde(flatten)]
    pub time: Option<TimeOfDay>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub url: Option<String>,
}

/// A rule-driven series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringEvent {
    /// Stable series identifier, `ics::<uid>::<startDate>::recurring`.
    pub id: String,
    pub uid: String,
    pub title: String,
    /// First occurrence anchor, `YYYY-MM-DD`.
    pub start_date: String,
    /// Inclusive last day of each occurrence, only for multi-day occurrences.
    pub end_date: Option<String>,
    pub rrule: String,
    /// Excluded occurrence dates, in insertion order, without duplicates.
    pub skip_dates: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub timezone: Option<String>,
    pub all_day: bool,
    #[serde(flatten)]
    pub time: Option<TimeOfDay>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub url: Option<String>,
}

impl RecurringEvent {
    pub fn series_id(uid: &str, start_date: &str) -> String {
        format!("ics::{uid}::{start_date}::recurring")
    }

    /// Add `date` to `skip_dates` unless it is already there. Returns whether
    /// it was added.
    pub fn push_skip_date(&mut self, date: &str) -> bool {
        if self.skip_dates.iter().any(|d| d == date) {
            return false;
        }
        self.skip_dates.push(date.to_string());
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CanonicalEvent {
    #[serde(rename = "single")]
    Single(SingleEvent),
    #[serde(rename = "rrule")]
    Recurring(RecurringEvent),
}

impl CanonicalEvent {
    pub fn uid(&self) -> &str {
        match self {
            CanonicalEvent::Single(e) => &e.uid,
            CanonicalEvent::Recurring(e) => &e.uid,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            CanonicalEvent::Single(e) => &e.title,
            CanonicalEvent::Recurring(e) => &e.title,
        }
    }

    pub fn is_recurring(&self) -> bool {
        matches!(self, CanonicalEvent::Recurring(_))
    }

    pub fn as_single(&self) -> Option<&SingleEvent> {
        match self {
            CanonicalEvent::Single(e) => Some(e),
            CanonicalEvent::Recurring(_) => None,
        }
    }

    pub fn as_recurring(&self) -> Option<&RecurringEvent> {
        match self {
            CanonicalEvent::Recurring(e) => Some(e),
            CanonicalEvent::Single(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timed_single() -> SingleEvent {
        SingleEvent {
            uid: "u1".into(),
            title: "Standup".into(),
            date: "2024-01-10".into(),
            end_date: None,
            timezone: Some("Europe/Berlin".into()),
            all_day: false,
            time: Some(TimeOfDay {
                start_time: "09:00".into(),
                end_time: "09:15".into(),
            }),
            description: String::new(),
            url: None,
        }
    }

    #[test]
    fn test_single_serializes_flat_camel_case() {
        let json = serde_json::to_value(CanonicalEvent::Single(timed_single())).unwrap();
        assert_eq!(json["type"], "single");
        assert_eq!(json["date"], "2024-01-10");
        assert_eq!(json["endDate"], serde_json::Value::Null);
        assert_eq!(json["allDay"], false);
        assert_eq!(json["startTime"], "09:00");
        assert_eq!(json["endTime"], "09:15");
        assert!(json.get("url").is_none());
    }

    #[test]
    fn test_all_day_omits_time_and_timezone() {
        let mut event = timed_single();
        event.all_day = true;
        event.time = None;
        event.timezone = None;
        let json = serde_json::to_value(CanonicalEvent::Single(event)).unwrap();
        assert!(json.get("startTime").is_none());
        assert!(json.get("timezone").is_none());
    }

    #[test]
    fn test_recurring_tag_and_skip_dates() {
        let mut event = RecurringEvent {
            id: RecurringEvent::series_id("u2", "2024-03-04"),
            uid: "u2".into(),
            title: "Weekly".into(),
            start_date: "2024-03-04".into(),
            end_date: None,
            rrule: "FREQ=WEEKLY".into(),
            skip_dates: vec![],
            timezone: None,
            all_day: true,
            time: None,
            description: String::new(),
            url: None,
        };
        assert!(event.push_skip_date("2024-03-11"));
        assert!(!event.push_skip_date("2024-03-11"));
        let json = serde_json::to_value(CanonicalEvent::Recurring(event)).unwrap();
        assert_eq!(json["type"], "rrule");
        assert_eq!(json["id"], "ics::u2::2024-03-04::recurring");
        assert_eq!(json["skipDates"], serde_json::json!(["2024-03-11"]));
    }
}
