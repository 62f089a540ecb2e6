//! Text and value normalizers shared by the flattener and the structured view.
//!
//! Everything here is total: malformed input degrades to an empty or `None`
//! result instead of an error.

use chrono::NaiveDate;
use quick_xml::escape::{resolve_html5_entity, unescape_with};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::OnceLock;

fn entity_re() -> &'static Regex {
    static ENTITY_RE: OnceLock<Regex> = OnceLock::new();
    ENTITY_RE.get_or_init(|| Regex::new(r"&#?[A-Za-z0-9]+;").expect("valid entity regex"))
}

fn full_date_re() -> &'static Regex {
    static FULL_DATE_RE: OnceLock<Regex> = OnceLock::new();
    FULL_DATE_RE.get_or_init(|| {
        Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").expect("valid date regex")
    })
}

fn month_year_re() -> &'static Regex {
    static MONTH_YEAR_RE: OnceLock<Regex> = OnceLock::new();
    MONTH_YEAR_RE.get_or_init(|| Regex::new(r"^(\d{1,2})/(\d{4})$").expect("valid date regex"))
}

fn scheme_re() -> &'static Regex {
    static SCHEME_RE: OnceLock<Regex> = OnceLock::new();
    SCHEME_RE.get_or_init(|| Regex::new(r"^[A-Za-z]+://").expect("valid scheme regex"))
}

/// Decode XML/HTML entity references.
///
/// Entities are resolved one at a time; a bare `&` or an unknown entity is
/// kept as written.
pub fn decode_entities(raw: &str) -> Cow<'_, str> {
    if !raw.contains('&') {
        return Cow::Borrowed(raw);
    }
    entity_re().replace_all(raw, |caps: &regex::Captures| {
        let entity = &caps[0];
        match unescape_with(entity, resolve_html5_entity) {
            Ok(text) => text.into_owned(),
            Err(_) => entity.to_string(),
        }
    })
}

/// Collapse whitespace runs to one space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode entities, collapse whitespace runs and trim.
pub fn clean_text(raw: &str) -> String {
    collapse_whitespace(&decode_entities(raw))
}

/// [`clean_text`] for callers that need to tell "absent" from "present".
pub fn clean_optional(raw: Option<&str>) -> Option<String> {
    raw.map(clean_text).filter(|s| !s.is_empty())
}

/// How much of a partial date is actually known
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatePrecision {
    Day,
    Month,
    Unknown,
}

impl DatePrecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatePrecision::Day => "day",
            DatePrecision::Month => "month",
            DatePrecision::Unknown => "unknown",
        }
    }
}

/// A date that may only be known to the month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialDate {
    pub date: Option<NaiveDate>,
    pub precision: DatePrecision,
}

impl PartialDate {
    pub const UNKNOWN: PartialDate = PartialDate {
        date: None,
        precision: DatePrecision::Unknown,
    };

    fn day(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            precision: DatePrecision::Day,
        }
    }

    fn month(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            precision: DatePrecision::Month,
        }
    }

    /// ISO `YYYY-MM-DD`, or empty when unknown
    pub fn iso(&self) -> String {
        self.date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }
}

/// Parse `MM/DD/YYYY` where `00` marks an unknown component.
///
/// `MM/00/YYYY` anchors to the first of the month with month precision.
/// Anything that is not a real calendar date is unknown; no other anchors
/// are guessed.
pub fn parse_partial_date(raw: &str) -> PartialDate {
    let s = raw.trim();
    let Some(caps) = full_date_re().captures(s) else {
        return PartialDate::UNKNOWN;
    };
    let (Ok(month), Ok(day), Ok(year)) = (
        caps[1].parse::<u32>(),
        caps[2].parse::<u32>(),
        caps[3].parse::<i32>(),
    ) else {
        return PartialDate::UNKNOWN;
    };
    if month == 0 {
        return PartialDate::UNKNOWN;
    }
    if day == 0 {
        return NaiveDate::from_ymd_opt(year, month, 1)
            .map(PartialDate::month)
            .unwrap_or(PartialDate::UNKNOWN);
    }
    NaiveDate::from_ymd_opt(year, month, day)
        .map(PartialDate::day)
        .unwrap_or(PartialDate::UNKNOWN)
}

/// Outcome of reading a timetable date under the tabular convention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateReading {
    Dated(PartialDate),
    /// "To Be Determined" and friends
    Undetermined,
    Blank,
    Unparseable,
}

impl DateReading {
    pub fn partial(&self) -> PartialDate {
        match self {
            DateReading::Dated(partial) => *partial,
            _ => PartialDate::UNKNOWN,
        }
    }
}

/// Tabular reading of a timetable date: [`parse_partial_date`] plus `MM/YYYY`
/// anchored to day 1, with "to be ..." kept distinct from garbage.
pub fn read_timetable_date(raw: &str) -> DateReading {
    let s = raw.trim();
    if s.is_empty() {
        return DateReading::Blank;
    }
    if s.to_lowercase().starts_with("to be") {
        return DateReading::Undetermined;
    }
    let partial = parse_partial_date(s);
    if partial.date.is_some() {
        return DateReading::Dated(partial);
    }
    if let Some(caps) = month_year_re().captures(s) {
        if let (Ok(month), Ok(year)) = (caps[1].parse::<u32>(), caps[2].parse::<i32>()) {
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, 1) {
                return DateReading::Dated(PartialDate::month(date));
            }
        }
    }
    DateReading::Unparseable
}

/// Tri-state flag: recognized yes/no vocabulary, or the original text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TriState {
    Flag(bool),
    Other(String),
}

const TRUTHY: [&str; 5] = ["yes", "y", "true", "t", "1"];
const FALSY: [&str; 5] = ["no", "n", "false", "f", "0"];

/// Map yes/no tokens to booleans, pass any other text through unchanged.
pub fn to_tri_state_bool(raw: &str) -> Option<TriState> {
    let cleaned = clean_text(raw);
    if cleaned.is_empty() {
        return None;
    }
    let lowered = cleaned.to_lowercase();
    if TRUTHY.contains(&lowered.as_str()) {
        Some(TriState::Flag(true))
    } else if FALSY.contains(&lowered.as_str()) {
        Some(TriState::Flag(false))
    } else {
        Some(TriState::Other(cleaned))
    }
}

/// Digits only, E.164-style for US numbers.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        0 => None,
        10 => Some(format!("+1{}", digits)),
        11 if digits.starts_with('1') => Some(format!("+{}", digits)),
        _ => Some(digits),
    }
}

/// Prepend `http://` when the text carries no scheme.
pub fn normalize_url(raw: &str) -> Option<String> {
    let cleaned = clean_text(raw);
    if cleaned.is_empty() {
        None
    } else if scheme_re().is_match(&cleaned) {
        Some(cleaned)
    } else {
        Some(format!("http://{}", cleaned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_clean_text_collapses_whitespace_and_entities() {
        assert_eq!(clean_text("  Clean\n\t Air &amp; Water  "), "Clean Air & Water");
        assert_eq!(clean_text("Section&nbsp;112"), "Section 112");
        assert_eq!(clean_text("AT&T &lt;b&gt;"), "AT&T <b>");
        assert_eq!(clean_text("   "), "");
        assert_eq!(decode_entities("Use &lt;b&gt; & more"), "Use <b> & more");
        assert_eq!(collapse_whitespace(" Use &lt;b&gt;\n "), "Use &lt;b&gt;");
        assert_eq!(clean_optional(Some(" \n ")), None);
        assert_eq!(clean_optional(None), None);
    }

    #[test]
    fn test_partial_date_laws() {
        let month = parse_partial_date("04/00/1996");
        assert_eq!(month.date, ymd(1996, 4, 1));
        assert_eq!(month.precision, DatePrecision::Month);

        assert_eq!(parse_partial_date("00/00/1996"), PartialDate::UNKNOWN);
        assert_eq!(parse_partial_date("02/30/1996"), PartialDate::UNKNOWN);
        assert_eq!(parse_partial_date(""), PartialDate::UNKNOWN);

        let day = parse_partial_date("04/15/1996");
        assert_eq!(day.date, ymd(1996, 4, 15));
        assert_eq!(day.precision, DatePrecision::Day);
        assert_eq!(day.iso(), "1996-04-15");
    }

    #[test]
    fn test_partial_date_rejects_month_zero_and_other_shapes() {
        assert_eq!(parse_partial_date("00/15/1996"), PartialDate::UNKNOWN);
        assert_eq!(parse_partial_date("13/01/1996"), PartialDate::UNKNOWN);
        assert_eq!(parse_partial_date("1996-04-15"), PartialDate::UNKNOWN);
        assert_eq!(parse_partial_date("04/1996"), PartialDate::UNKNOWN);
    }

    #[test]
    fn test_timetable_date_conventions() {
        assert_eq!(
            read_timetable_date("06/1997").partial().date,
            ymd(1997, 6, 1)
        );
        assert_eq!(
            read_timetable_date("06/1997").partial().precision,
            DatePrecision::Month
        );
        assert_eq!(read_timetable_date("To Be Determined"), DateReading::Undetermined);
        assert_eq!(read_timetable_date("to be announced"), DateReading::Undetermined);
        assert_eq!(read_timetable_date(" "), DateReading::Blank);
        assert_eq!(read_timetable_date("Spring 1997"), DateReading::Unparseable);
        assert_eq!(read_timetable_date("13/1997"), DateReading::Unparseable);
        assert_eq!(read_timetable_date("Spring 1997").partial(), PartialDate::UNKNOWN);
    }

    #[test]
    fn test_tri_state() {
        assert_eq!(to_tri_state_bool("Yes"), Some(TriState::Flag(true)));
        assert_eq!(to_tri_state_bool(" n "), Some(TriState::Flag(false)));
        assert_eq!(to_tri_state_bool("0"), Some(TriState::Flag(false)));
        assert_eq!(
            to_tri_state_bool("Undetermined"),
            Some(TriState::Other("Undetermined".to_string()))
        );
        assert_eq!(to_tri_state_bool(""), None);
    }

    #[test]
    fn test_phone() {
        assert_eq!(normalize_phone("202-555-0100").as_deref(), Some("+12025550100"));
        assert_eq!(normalize_phone("1-202-555-0100").as_deref(), Some("+12025550100"));
        assert_eq!(normalize_phone("555-0100").as_deref(), Some("5550100"));
        assert_eq!(normalize_phone("n/a"), None);
    }

    #[test]
    fn test_url() {
        assert_eq!(
            normalize_url("www.epa.gov/rules").as_deref(),
            Some("http://www.epa.gov/rules")
        );
        assert_eq!(
            normalize_url("https://www.regulations.gov").as_deref(),
            Some("https://www.regulations.gov")
        );
        assert_eq!(normalize_url("  "), None);
    }
}
