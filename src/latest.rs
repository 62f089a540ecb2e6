//! Latest dated event within one snapshot's timetable.

use crate::types::{LatestEvent, TimetableEntry};

/// Pick the item that sorts last under `(date, action)` ascending.
///
/// Undated items are ignored. The action label only orders events that share
/// a date. Only the given snapshot's list is ever consulted.
pub fn latest_event(timetable: &[TimetableEntry]) -> Option<LatestEvent> {
    timetable
        .iter()
        .filter_map(|entry| entry.date.map(|date| (date, entry)))
        .max_by(|(a_date, a), (b_date, b)| {
            a_date.cmp(b_date).then_with(|| a.action.cmp(&b.action))
        })
        .map(|(date, entry)| LatestEvent {
            action: entry.action.clone(),
            date,
            precision: entry.precision,
            fr_citation: entry.fr_citation.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{read_timetable_date, DatePrecision};

    fn entry(action: &str, raw: &str) -> TimetableEntry {
        let partial = read_timetable_date(raw).partial();
        TimetableEntry {
            action: action.to_string(),
            date_raw: raw.to_string(),
            date: partial.date,
            precision: partial.precision,
            fr_citation: String::new(),
        }
    }

    #[test]
    fn test_no_dated_events() {
        assert_eq!(latest_event(&[]), None);
        assert_eq!(
            latest_event(&[entry("NPRM", "To Be Determined"), entry("Final", "")]),
            None
        );
    }

    #[test]
    fn test_picks_latest_date() {
        let events = vec![
            entry("Final Rule", "06/00/1997"),
            entry("NPRM", "10/15/1995"),
            entry("Next Action Undetermined", "To Be Determined"),
        ];
        let latest = latest_event(&events).unwrap();
        assert_eq!(latest.action, "Final Rule");
        assert_eq!(latest.date_iso(), "1997-06-01");
        assert_eq!(latest.precision, DatePrecision::Month);
    }

    #[test]
    fn test_same_date_ties_break_on_action_label() {
        let events = vec![entry("Proposed", "01/01/1996"), entry("Final", "01/01/1996")];
        assert_eq!(latest_event(&events).unwrap().action, "Proposed");

        let reversed = vec![entry("Final", "01/01/1996"), entry("Proposed", "01/01/1996")];
        assert_eq!(latest_event(&reversed).unwrap().action, "Proposed");
    }

    #[test]
    fn test_source_order_is_untouched() {
        let events = vec![entry("B", "01/01/1997"), entry("A", "01/01/1996")];
        let _ = latest_event(&events);
        assert_eq!(events[0].action, "B");
    }
}
