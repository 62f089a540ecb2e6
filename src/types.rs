use crate::normalize::DatePrecision;
use crate::schema::{self, GROUPS};
use crate::snapshot;
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A fixed nested bundle of scalars (e.g. an agency's code/name/acronym)
pub type Group = IndexMap<String, String>;

/// One flattened regulatory-agenda entry as published in one snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// RIN; never empty
    pub identity: String,
    /// `YYYYMM`, or empty when neither the document nor its name carries one
    pub snapshot_id: String,
    pub publication_title: String,
    /// Basename of the document this record was read from
    pub source: String,
    /// Every known scalar, in schema order, empty when absent
    pub scalars: IndexMap<String, String>,
    /// Every known group keyed by tag, each with all of its fields
    pub groups: IndexMap<String, Group>,
    pub lists: EntityLists,
    /// Unrecognized top-level leaves, keyed by their upper-cased local name
    pub extras: IndexMap<String, String>,
    /// Chronologically last dated timetable event within this snapshot
    pub latest_event: Option<LatestEvent>,
}

/// One-to-many blocks in source order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityLists {
    pub unfunded_mandates: Vec<String>,
    pub cfr: Vec<String>,
    pub legal_authorities: Vec<String>,
    pub legal_deadlines: Vec<LegalDeadline>,
    pub timetable: Vec<TimetableEntry>,
    pub small_entities: Vec<String>,
    pub govt_levels: Vec<String>,
    pub naics_codes: Vec<String>,
    pub related_rins: Vec<RelatedRin>,
    pub child_rins: Vec<ChildRin>,
    pub contacts: Vec<Contact>,
}

/// A dated step on the rule's timetable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimetableEntry {
    pub action: String,
    pub date_raw: String,
    pub date: Option<NaiveDate>,
    pub precision: DatePrecision,
    pub fr_citation: String,
}

impl TimetableEntry {
    pub fn date_iso(&self) -> String {
        self.date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }
}

/// Statutory or judicial compliance deadline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegalDeadline {
    pub dline_type: String,
    pub action_stage: String,
    pub date: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelatedRin {
    pub rin: String,
    pub relation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChildRin {
    pub rin: String,
    pub rule_title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MailingAddress {
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

/// Agency contact; phone-like fields hold cleaned source text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub prefix: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub suffix: String,
    pub title: String,
    pub phone: String,
    pub phone_ext: String,
    pub tdd_phone: String,
    pub fax: String,
    pub email: String,
    /// Present only when the contact carries its own `AGENCY` block
    pub agency: Option<Group>,
    pub mailing_address: Option<MailingAddress>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestEvent {
    pub action: String,
    pub date: NaiveDate,
    pub precision: DatePrecision,
    pub fr_citation: String,
}

impl LatestEvent {
    pub fn date_iso(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

/// Address of a backfillable scalar inside a record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FieldKey {
    Scalar(String),
    Group { group: String, field: String },
    Extra(String),
}

impl FieldKey {
    /// Tabular column this field is written to
    pub fn column(&self) -> String {
        match self {
            FieldKey::Scalar(name) | FieldKey::Extra(name) => name.clone(),
            FieldKey::Group { group, field } => GROUPS
                .iter()
                .find(|g| g.tag == group.as_str())
                .map(|g| g.column(field))
                .unwrap_or_else(|| format!("{}_{}", group, field)),
        }
    }
}

impl EntityRecord {
    /// Known scalar by tag; empty when unknown
    pub fn scalar(&self, tag: &str) -> &str {
        self.scalars.get(tag).map(String::as_str).unwrap_or("")
    }

    pub fn group_field(&self, group: &str, field: &str) -> &str {
        self.groups
            .get(group)
            .and_then(|g| g.get(field))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn season(&self) -> &'static str {
        snapshot::season(&self.snapshot_id)
    }

    pub fn snapshot_rank(&self) -> i64 {
        snapshot::rank(&self.snapshot_id)
    }

    /// Any compliance deadline whose type starts with "statutory"
    pub fn has_statutory_deadline(&self) -> bool {
        self.lists
            .legal_deadlines
            .iter()
            .any(|d| d.dline_type.trim().to_lowercase().starts_with("statutory"))
    }

    /// Every scalar the cross-snapshot reducer may fill from older snapshots
    pub fn backfillable_keys(&self) -> Vec<FieldKey> {
        let mut keys: Vec<FieldKey> = self
            .scalars
            .keys()
            .map(|k| FieldKey::Scalar(k.clone()))
            .collect();
        for (group, fields) in &self.groups {
            for field in fields.keys() {
                keys.push(FieldKey::Group {
                    group: group.clone(),
                    field: field.clone(),
                });
            }
        }
        keys.extend(self.extras.keys().map(|k| FieldKey::Extra(k.clone())));
        keys
    }

    /// Value at `key`; absent fields read as empty
    pub fn field(&self, key: &FieldKey) -> &str {
        match key {
            FieldKey::Scalar(tag) => self.scalar(tag),
            FieldKey::Group { group, field } => self.group_field(group, field),
            FieldKey::Extra(name) => self.extras.get(name).map(String::as_str).unwrap_or(""),
        }
    }

    pub fn set_field(&mut self, key: &FieldKey, value: String) {
        match key {
            FieldKey::Scalar(tag) => {
                self.scalars.insert(tag.clone(), value);
            }
            FieldKey::Group { group, field } => {
                self.groups
                    .entry(group.clone())
                    .or_default()
                    .insert(field.clone(), value);
            }
            FieldKey::Extra(name) => {
                self.extras.insert(name.clone(), value);
            }
        }
    }

    /// An identity with every known field present and empty
    pub fn empty(identity: impl Into<String>, snapshot_id: impl Into<String>) -> Self {
        let scalars = schema::SCALARS
            .iter()
            .map(|s| (s.tag.to_string(), String::new()))
            .collect();
        let groups = GROUPS
            .iter()
            .map(|g| {
                let fields = g
                    .fields
                    .iter()
                    .map(|f| (f.to_string(), String::new()))
                    .collect();
                (g.tag.to_string(), fields)
            })
            .collect();
        Self {
            identity: identity.into(),
            snapshot_id: snapshot_id.into(),
            publication_title: String::new(),
            source: String::new(),
            scalars,
            groups,
            lists: EntityLists::default(),
            extras: IndexMap::new(),
            latest_event: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_record_carries_full_schema() {
        let record = EntityRecord::empty("2060-AA00", "199510");
        assert_eq!(record.scalars.len(), schema::SCALARS.len());
        assert_eq!(record.group_field("AGENCY", "NAME"), "");
        assert!(record.groups.contains_key("COMPLIANCE_COST"));
        assert_eq!(record.season(), "Fall");
        assert_eq!(record.snapshot_rank(), 199510);
    }

    #[test]
    fn test_field_keys_round_trip() {
        let mut record = EntityRecord::empty("2060-AA00", "199510");
        let agency = FieldKey::Group {
            group: "AGENCY".to_string(),
            field: "NAME".to_string(),
        };
        record.set_field(&agency, "EPA".to_string());
        record.set_field(&FieldKey::Extra("NEW_FIELD".to_string()), "x".to_string());

        assert_eq!(record.field(&agency), "EPA");
        assert_eq!(agency.column(), "AGENCY_NAME");
        assert_eq!(record.field(&FieldKey::Extra("NEW_FIELD".to_string())), "x");
        assert_eq!(record.field(&FieldKey::Extra("OTHER".to_string())), "");
        assert!(record
            .backfillable_keys()
            .contains(&FieldKey::Extra("NEW_FIELD".to_string())));
    }

    #[test]
    fn test_statutory_deadline_flag() {
        let mut record = EntityRecord::empty("2060-AA00", "199510");
        assert!(!record.has_statutory_deadline());
        record.lists.legal_deadlines.push(LegalDeadline {
            dline_type: "Statutory".to_string(),
            ..Default::default()
        });
        assert!(record.has_statutory_deadline());
    }
}
