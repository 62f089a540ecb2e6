//! Snapshot (publication issue) identifiers: `YYYYMM` tokens.

use crate::error::{Error, Result};
use crate::schema::FILENAME_PREFIX;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

/// Rank given to empty or non-numeric snapshot ids; sorts below every real issue
pub const UNKNOWN_RANK: i64 = -1;

fn filename_re() -> &'static Regex {
    static FILENAME_RE: OnceLock<Regex> = OnceLock::new();
    FILENAME_RE.get_or_init(|| {
        Regex::new(&format!(r"(?i)^{}(\d{{6}})\.xml$", regex::escape(FILENAME_PREFIX)))
            .expect("valid filename regex")
    })
}

/// Does this file name follow `REGINFO_RIN_DATA_YYYYMM.xml`?
pub fn is_canonical_filename(path: &Path) -> bool {
    path.file_name()
        .map(|n| filename_re().is_match(&n.to_string_lossy()))
        .unwrap_or(false)
}

/// `YYYYMM` from a canonical document name, if it is one
pub fn snapshot_from_filename(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy().to_string();
    filename_re()
        .captures(&name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Six digits after stripping everything that is not a digit
fn six_digit_token(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    (digits.len() == 6).then_some(digits)
}

/// Embedded `PUBLICATION_ID` wins when it is a six-digit token, otherwise the
/// filename-derived id; the empty string when neither qualifies.
pub fn resolve_snapshot_id(embedded: &str, from_filename: Option<&str>) -> String {
    six_digit_token(embedded)
        .or_else(|| from_filename.and_then(six_digit_token))
        .unwrap_or_default()
}

/// Numeric order of a snapshot id, [`UNKNOWN_RANK`] when it is not `YYYYMM`
pub fn rank(snapshot_id: &str) -> i64 {
    if snapshot_id.len() == 6 && snapshot_id.chars().all(|c| c.is_ascii_digit()) {
        snapshot_id.parse().unwrap_or(UNKNOWN_RANK)
    } else {
        UNKNOWN_RANK
    }
}

/// `Spring` for April issues, `Fall` for October issues
pub fn season(snapshot_id: &str) -> &'static str {
    if rank(snapshot_id) == UNKNOWN_RANK {
        return "";
    }
    match &snapshot_id[4..] {
        "04" => "Spring",
        "10" => "Fall",
        _ => "",
    }
}

/// Inclusive range of snapshot ids used to reproduce a fixed historical cohort
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotWindow {
    pub start: i64,
    pub end: i64,
}

impl SnapshotWindow {
    pub fn new(start: &str, end: &str) -> Result<Self> {
        let (start_rank, end_rank) = (rank(start.trim()), rank(end.trim()));
        if start_rank == UNKNOWN_RANK || end_rank == UNKNOWN_RANK {
            return Err(Error::Config(format!(
                "Snapshot window bounds must be YYYYMM, got '{}' and '{}'",
                start, end
            )));
        }
        if start_rank > end_rank {
            return Err(Error::Config(format!(
                "Snapshot window starts after it ends: {}-{}",
                start, end
            )));
        }
        Ok(Self {
            start: start_rank,
            end: end_rank,
        })
    }

    /// Parse `YYYYMM-YYYYMM` (also accepts `..` or `:` as the separator)
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = if s.contains("..") {
            s.splitn(2, "..").collect()
        } else {
            s.splitn(2, |c: char| c == '-' || c == ':').collect()
        };
        match parts.as_slice() {
            [start, end] => Self::new(start, end),
            _ => Err(Error::Config(format!(
                "Invalid snapshot window '{}'. Expected YYYYMM-YYYYMM",
                s
            ))),
        }
    }

    /// Unknown snapshot ids never fall inside a window
    pub fn contains(&self, snapshot_id: &str) -> bool {
        let r = rank(snapshot_id);
        r != UNKNOWN_RANK && r >= self.start && r <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_from_filename() {
        assert_eq!(
            snapshot_from_filename(Path::new("/data/REGINFO_RIN_DATA_199510.xml")).as_deref(),
            Some("199510")
        );
        assert_eq!(
            snapshot_from_filename(Path::new("reginfo_rin_data_201810.XML")).as_deref(),
            Some("201810")
        );
        assert_eq!(snapshot_from_filename(Path::new("REGINFO_RIN_DATA_1995.xml")), None);
        assert_eq!(snapshot_from_filename(Path::new("agenda.xml")), None);
        assert!(is_canonical_filename(Path::new("REGINFO_RIN_DATA_202410.xml")));
    }

    #[test]
    fn test_embedded_id_wins_when_six_digits() {
        assert_eq!(resolve_snapshot_id("201810", Some("199510")), "201810");
        assert_eq!(resolve_snapshot_id(" 2018-10 ", Some("199510")), "201810");
        assert_eq!(resolve_snapshot_id("", Some("199510")), "199510");
        assert_eq!(resolve_snapshot_id("Fall", Some("199510")), "199510");
        assert_eq!(resolve_snapshot_id("", None), "");
        assert_eq!(resolve_snapshot_id("", Some("")), "");
    }

    #[test]
    fn test_rank_and_season() {
        assert_eq!(rank("199510"), 199510);
        assert_eq!(rank(""), UNKNOWN_RANK);
        assert_eq!(rank("1995-10"), UNKNOWN_RANK);
        assert_eq!(season("199504"), "Spring");
        assert_eq!(season("199510"), "Fall");
        assert_eq!(season("199512"), "");
        assert_eq!(season(""), "");
    }

    #[test]
    fn test_window() {
        let window = SnapshotWindow::parse("199510-201904").unwrap();
        assert!(window.contains("199510"));
        assert!(window.contains("201904"));
        assert!(!window.contains("201910"));
        assert!(!window.contains(""));
        assert_eq!(SnapshotWindow::parse("199510..199512").unwrap().end, 199512);
        assert!(SnapshotWindow::parse("201904-199510").is_err());
        assert!(SnapshotWindow::parse("1995").is_err());
    }
}
