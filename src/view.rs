//! The two caller-facing renderings of an [`EntityRecord`].
//!
//! The tabular view is one string per column with list fields serialized to
//! JSON. The structured view keeps typed values, nested lists and `null` for
//! anything absent, with the flag/URL/phone normalizers applied.

use crate::normalize::{normalize_phone, normalize_url, to_tri_state_bool, TriState};
use crate::schema::{self, ColumnSource, ColumnSpec, ListKind, Normalizer, SCALARS};
use crate::types::{Contact, EntityRecord, Group, TimetableEntry};
use indexmap::IndexMap;
use serde_json::{json, Map, Value};

/// One flat output row, keyed by column name in column order
pub type Row = IndexMap<String, String>;

/// Tabular value of one schema column
pub fn column_value(record: &EntityRecord, column: &ColumnSpec) -> String {
    match column.source {
        ColumnSource::Identity => record.identity.clone(),
        ColumnSource::SnapshotId => record.snapshot_id.clone(),
        ColumnSource::PublicationTitle => record.publication_title.clone(),
        ColumnSource::SourceXml => record.source.clone(),
        ColumnSource::PubSeason => record.season().to_string(),
        ColumnSource::Group(group, field) => record.group_field(group.tag, field).to_string(),
        ColumnSource::Scalar(spec) => record.scalar(spec.tag).to_string(),
        ColumnSource::List(kind) => tabular_list(record, kind).to_string(),
        ColumnSource::LatestAction => record
            .latest_event
            .as_ref()
            .map(|e| e.action.clone())
            .unwrap_or_default(),
        ColumnSource::LatestActionDate => record
            .latest_event
            .as_ref()
            .map(|e| e.date_iso())
            .unwrap_or_default(),
        ColumnSource::HasStatutoryDeadline => {
            let flag = if record.has_statutory_deadline() { "1" } else { "0" };
            flag.to_string()
        }
    }
}

/// Every schema column in order, then this record's extras
pub fn to_row(record: &EntityRecord) -> Row {
    let mut row: Row = schema::columns()
        .iter()
        .map(|column| (column.name.clone(), column_value(record, column)))
        .collect();
    for (name, value) in &record.extras {
        row.entry(name.clone()).or_insert_with(|| value.clone());
    }
    row
}

fn upper_group(group: &Group) -> Value {
    Value::Object(
        group
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}

fn tabular_contact(contact: &Contact) -> Value {
    let mut object = json!({
        "PREFIX": contact.prefix,
        "FIRST_NAME": contact.first_name,
        "MIDDLE_NAME": contact.middle_name,
        "LAST_NAME": contact.last_name,
        "SUFFIX": contact.suffix,
        "TITLE": contact.title,
        "PHONE": contact.phone,
        "PHONE_EXT": contact.phone_ext,
        "TDD_PHONE": contact.tdd_phone,
        "FAX": contact.fax,
        "EMAIL": contact.email,
    });
    if let Some(map) = object.as_object_mut() {
        if let Some(agency) = &contact.agency {
            map.insert("AGENCY".to_string(), upper_group(agency));
        }
        if let Some(address) = &contact.mailing_address {
            map.insert(
                "MAILING_ADDRESS".to_string(),
                json!({
                    "STREET_ADDRESS": address.street_address,
                    "CITY": address.city,
                    "STATE": address.state,
                    "ZIP": address.zip,
                }),
            );
        }
    }
    object
}

fn tabular_timetable(entry: &TimetableEntry) -> Value {
    json!({
        "TTBL_ACTION": entry.action,
        "TTBL_DATE": entry.date_raw,
        "TTBL_DATE_ISO": entry.date_iso(),
        "FR_CITATION": entry.fr_citation,
    })
}

/// A list field as the JSON array written into its tabular column
pub fn tabular_list(record: &EntityRecord, kind: ListKind) -> Value {
    let lists = &record.lists;
    match kind {
        ListKind::UnfundedMandates => json!(lists.unfunded_mandates),
        ListKind::Cfr => json!(lists.cfr),
        ListKind::LegalAuthorities => json!(lists.legal_authorities),
        ListKind::SmallEntities => json!(lists.small_entities),
        ListKind::GovtLevels => json!(lists.govt_levels),
        ListKind::NaicsCodes => json!(lists.naics_codes),
        ListKind::LegalDeadlines => Value::Array(
            lists
                .legal_deadlines
                .iter()
                .map(|d| {
                    json!({
                        "DLINE_TYPE": d.dline_type,
                        "DLINE_ACTION_STAGE": d.action_stage,
                        "DLINE_DATE": d.date,
                        "DLINE_DESC": d.description,
                    })
                })
                .collect(),
        ),
        ListKind::Timetable => Value::Array(lists.timetable.iter().map(tabular_timetable).collect()),
        ListKind::RelatedRins => Value::Array(
            lists
                .related_rins
                .iter()
                .map(|r| json!({ "RIN": r.rin, "RIN_RELATION": r.relation }))
                .collect(),
        ),
        ListKind::ChildRins => Value::Array(
            lists
                .child_rins
                .iter()
                .map(|c| json!({ "RIN": c.rin, "RULE_TITLE": c.rule_title }))
                .collect(),
        ),
        ListKind::Contacts => Value::Array(lists.contacts.iter().map(tabular_contact).collect()),
    }
}

fn text_or_null(s: &str) -> Value {
    if s.is_empty() {
        Value::Null
    } else {
        Value::String(s.to_string())
    }
}

fn normalized_scalar(raw: &str, normalizer: Normalizer) -> Value {
    match normalizer {
        Normalizer::Text => text_or_null(raw),
        Normalizer::TriState => match to_tri_state_bool(raw) {
            Some(TriState::Flag(flag)) => Value::Bool(flag),
            Some(TriState::Other(text)) => Value::String(text),
            None => Value::Null,
        },
        Normalizer::Url => normalize_url(raw).map(Value::String).unwrap_or(Value::Null),
    }
}

fn structured_group(group: Option<&Group>) -> Value {
    match group {
        Some(fields) => Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.to_lowercase(), text_or_null(v)))
                .collect(),
        ),
        None => Value::Null,
    }
}

fn phone_or_null(raw: &str) -> Value {
    normalize_phone(raw).map(Value::String).unwrap_or(Value::Null)
}

fn structured_contact(contact: &Contact) -> Value {
    json!({
        "prefix": text_or_null(&contact.prefix),
        "first_name": text_or_null(&contact.first_name),
        "middle_name": text_or_null(&contact.middle_name),
        "last_name": text_or_null(&contact.last_name),
        "suffix": text_or_null(&contact.suffix),
        "title": text_or_null(&contact.title),
        "phone": phone_or_null(&contact.phone),
        "phone_ext": text_or_null(&contact.phone_ext),
        "tdd_phone": phone_or_null(&contact.tdd_phone),
        "fax": phone_or_null(&contact.fax),
        "email": text_or_null(&contact.email),
        "agency": structured_group(contact.agency.as_ref()),
        "mailing_address": contact.mailing_address.as_ref().map(|a| json!({
            "street_address": text_or_null(&a.street_address),
            "city": text_or_null(&a.city),
            "state": text_or_null(&a.state),
            "zip": text_or_null(&a.zip),
        })),
    })
}

/// Typed rendering with normalized flags, URLs and phone numbers
pub fn to_structured(record: &EntityRecord) -> Value {
    let lists = &record.lists;

    let mut scalars = Map::new();
    for spec in SCALARS {
        scalars.insert(
            spec.tag.to_lowercase(),
            normalized_scalar(record.scalar(spec.tag), spec.normalizer),
        );
    }

    let mut groups = Map::new();
    for (tag, fields) in &record.groups {
        groups.insert(tag.to_lowercase(), structured_group(Some(fields)));
    }

    let extras: Map<String, Value> = record
        .extras
        .iter()
        .map(|(k, v)| (k.clone(), text_or_null(v)))
        .collect();

    json!({
        "rin": record.identity,
        "publication_id": text_or_null(&record.snapshot_id),
        "publication_title": text_or_null(&record.publication_title),
        "source_xml": record.source,
        "pub_season": text_or_null(record.season()),
        "scalars": scalars,
        "groups": groups,
        "unfunded_mandates": lists.unfunded_mandates,
        "cfr": lists.cfr,
        "legal_authorities": lists.legal_authorities,
        "legal_deadlines": lists.legal_deadlines.iter().map(|d| json!({
            "type": text_or_null(&d.dline_type),
            "action_stage": text_or_null(&d.action_stage),
            "date": text_or_null(&d.date),
            "description": text_or_null(&d.description),
        })).collect::<Vec<_>>(),
        "has_statutory_deadline": record.has_statutory_deadline(),
        "timetable": lists.timetable.iter().map(|t| json!({
            "action": text_or_null(&t.action),
            "date_raw": text_or_null(&t.date_raw),
            "date": t.date.map(|d| d.format("%Y-%m-%d").to_string()),
            "precision": t.precision,
            "fr_citation": text_or_null(&t.fr_citation),
        })).collect::<Vec<_>>(),
        "small_entities": lists.small_entities,
        "govt_levels": lists.govt_levels,
        "naics": lists.naics_codes,
        "related_rins": lists.related_rins.iter().map(|r| json!({
            "rin": text_or_null(&r.rin),
            "relation": text_or_null(&r.relation),
        })).collect::<Vec<_>>(),
        "child_rins": lists.child_rins.iter().map(|c| json!({
            "rin": text_or_null(&c.rin),
            "rule_title": text_or_null(&c.rule_title),
        })).collect::<Vec<_>>(),
        "contacts": lists.contacts.iter().map(structured_contact).collect::<Vec<_>>(),
        "latest_event": record.latest_event.as_ref().map(|e| json!({
            "action": e.action,
            "date": e.date_iso(),
            "precision": e.precision,
            "fr_citation": text_or_null(&e.fr_citation),
        })),
        "extras": extras,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LegalDeadline, MailingAddress};

    fn record() -> EntityRecord {
        let mut record = EntityRecord::empty("2060-AA00", "199510");
        record.source = "REGINFO_RIN_DATA_199510.xml".to_string();
        record.scalars.insert("MAJOR".to_string(), "Yes".to_string());
        record
            .scalars
            .insert("FEDERALISM".to_string(), "Undetermined".to_string());
        record
            .scalars
            .insert("FURTHER_INFO_URL".to_string(), "www.epa.gov".to_string());
        record.lists.cfr = vec!["40 CFR 60".to_string()];
        record.lists.contacts.push(Contact {
            last_name: "Smith".to_string(),
            phone: "202-555-0100".to_string(),
            mailing_address: Some(MailingAddress {
                city: "Washington".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        });
        record.lists.legal_deadlines.push(LegalDeadline {
            dline_type: "Statutory".to_string(),
            ..Default::default()
        });
        record.extras.insert("NEW_FIELD".to_string(), "x".to_string());
        record
    }

    #[test]
    fn test_tabular_row_keeps_source_text() {
        let row = to_row(&record());
        assert_eq!(row["RIN"], "2060-AA00");
        assert_eq!(row["PUB_SEASON"], "Fall");
        assert_eq!(row["MAJOR"], "Yes");
        assert_eq!(row["FURTHER_INFO_URL"], "www.epa.gov");
        assert_eq!(row["CFR_LIST"], r#"["40 CFR 60"]"#);
        assert_eq!(row["TIMETABLE_LIST"], "[]");
        assert_eq!(row["HAS_STATUTORY_DEADLINE"], "1");
        assert_eq!(row["LATEST_ACTION"], "");
        assert_eq!(row.get_index(row.len() - 1).map(|(k, _)| k.as_str()), Some("NEW_FIELD"));

        let contacts: Value = serde_json::from_str(&row["AGENCY_CONTACT_LIST"]).unwrap();
        assert_eq!(contacts[0]["PHONE"], "202-555-0100");
        assert_eq!(contacts[0]["MAILING_ADDRESS"]["CITY"], "Washington");
        assert!(contacts[0].get("AGENCY").is_none());
    }

    #[test]
    fn test_structured_view_normalizes() {
        let value = to_structured(&record());
        assert_eq!(value["scalars"]["major"], Value::Bool(true));
        assert_eq!(value["scalars"]["federalism"], "Undetermined");
        assert_eq!(value["scalars"]["rule_title"], Value::Null);
        assert_eq!(value["scalars"]["further_info_url"], "http://www.epa.gov");
        assert_eq!(value["groups"]["agency"]["name"], Value::Null);
        assert_eq!(value["contacts"][0]["phone"], "+12025550100");
        assert_eq!(value["contacts"][0]["agency"], Value::Null);
        assert_eq!(value["latest_event"], Value::Null);
        assert_eq!(value["has_statutory_deadline"], Value::Bool(true));
        assert_eq!(value["extras"]["NEW_FIELD"], "x");
    }
}
