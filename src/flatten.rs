//! Entity element → [`EntityRecord`].
//!
//! Malformed or missing sub-elements degrade to empty values. The only way an
//! entity is dropped is a blank identity.

use crate::latest::latest_event;
use crate::normalize::{read_timetable_date, DateReading};
use crate::schema::{
    self, ListKind, AGENCY_FIELDS, GROUPS, IDENTITY_TAG, PUBLICATION_ID_TAG, PUBLICATION_TAG,
    PUBLICATION_TITLE_TAG, SCALARS,
};
use crate::snapshot::resolve_snapshot_id;
use crate::tree::{children_by_name, first_child_by_name, text_child, text_child_of, Element};
use crate::types::{
    ChildRin, Contact, EntityLists, EntityRecord, Group, LegalDeadline, MailingAddress,
    RelatedRin, TimetableEntry,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::debug;

/// Per-entity defects that degrade gracefully instead of failing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Entities skipped because `RIN` was blank
    pub missing_identity: usize,
    /// Unrecognized leaves captured as extra columns
    pub schema_drift: usize,
    /// Timetable dates matching no recognized pattern
    pub unparseable_dates: usize,
    /// Timetable dates reading "To Be Determined" or similar
    pub undetermined_dates: usize,
    /// Unrecognized nested blocks whose leaves were captured as extra columns
    pub unrecognized_blocks: usize,
}

impl Diagnostics {
    pub fn merge(&mut self, other: &Diagnostics) {
        self.missing_identity += other.missing_identity;
        self.schema_drift += other.schema_drift;
        self.unparseable_dates += other.unparseable_dates;
        self.undetermined_dates += other.undetermined_dates;
        self.unrecognized_blocks += other.unrecognized_blocks;
    }
}

/// Column names an extra leaf may not shadow
fn reserved_columns() -> &'static HashSet<String> {
    static RESERVED: OnceLock<HashSet<String>> = OnceLock::new();
    RESERVED.get_or_init(|| schema::column_names().into_iter().collect())
}

/// Flattens the entities of one document
#[derive(Debug, Clone)]
pub struct Flattener {
    source_name: String,
    filename_snapshot: Option<String>,
}

impl Flattener {
    /// `filename_snapshot` is the `YYYYMM` parsed from the document name, if any
    pub fn new(source_name: impl Into<String>, filename_snapshot: Option<String>) -> Self {
        Self {
            source_name: source_name.into(),
            filename_snapshot,
        }
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Flatten one entity root; `None` when it carries no identity
    pub fn flatten(&self, entity: &Element, diagnostics: &mut Diagnostics) -> Option<EntityRecord> {
        let identity = text_child(entity, IDENTITY_TAG);
        if identity.is_empty() {
            diagnostics.missing_identity += 1;
            debug!(source = %self.source_name, "Skipping entity without {}", IDENTITY_TAG);
            return None;
        }

        let publication = first_child_by_name(entity, PUBLICATION_TAG);
        let snapshot_id = resolve_snapshot_id(
            &text_child_of(publication, PUBLICATION_ID_TAG),
            self.filename_snapshot.as_deref(),
        );

        let scalars = SCALARS
            .iter()
            .map(|spec| (spec.tag.to_string(), text_child(entity, spec.tag)))
            .collect();

        let groups = GROUPS
            .iter()
            .map(|group| {
                let node = first_child_by_name(entity, group.tag);
                (group.tag.to_string(), read_group(node, group.fields))
            })
            .collect();

        let lists = self.read_lists(entity, &identity, diagnostics);
        let extras = self.read_extras(entity, &identity, diagnostics);
        let latest = latest_event(&lists.timetable);

        Some(EntityRecord {
            identity,
            snapshot_id,
            publication_title: text_child_of(publication, PUBLICATION_TITLE_TAG),
            source: self.source_name.clone(),
            scalars,
            groups,
            lists,
            extras,
            latest_event: latest,
        })
    }

    fn read_lists(&self, entity: &Element, identity: &str, diagnostics: &mut Diagnostics) -> EntityLists {
        let strings = |kind: ListKind| -> Vec<String> {
            list_items(entity, kind)
                .into_iter()
                .map(Element::clean_text)
                .filter(|s| !s.is_empty())
                .collect()
        };

        EntityLists {
            unfunded_mandates: strings(ListKind::UnfundedMandates),
            cfr: strings(ListKind::Cfr),
            legal_authorities: strings(ListKind::LegalAuthorities),
            small_entities: strings(ListKind::SmallEntities),
            govt_levels: strings(ListKind::GovtLevels),
            naics_codes: strings(ListKind::NaicsCodes),
            legal_deadlines: list_items(entity, ListKind::LegalDeadlines)
                .into_iter()
                .map(|item| LegalDeadline {
                    dline_type: text_child(item, "DLINE_TYPE"),
                    action_stage: text_child(item, "DLINE_ACTION_STAGE"),
                    date: text_child(item, "DLINE_DATE"),
                    description: text_child(item, "DLINE_DESC"),
                })
                .collect(),
            timetable: list_items(entity, ListKind::Timetable)
                .into_iter()
                .map(|item| self.read_timetable_entry(item, identity, diagnostics))
                .collect(),
            related_rins: list_items(entity, ListKind::RelatedRins)
                .into_iter()
                .map(|item| RelatedRin {
                    rin: text_child(item, "RIN"),
                    relation: text_child(item, "RIN_RELATION"),
                })
                .collect(),
            child_rins: list_items(entity, ListKind::ChildRins)
                .into_iter()
                .map(|item| ChildRin {
                    rin: text_child(item, "RIN"),
                    rule_title: text_child(item, "RULE_TITLE"),
                })
                .collect(),
            contacts: list_items(entity, ListKind::Contacts)
                .into_iter()
                .map(read_contact)
                .collect(),
        }
    }

    fn read_timetable_entry(
        &self,
        item: &Element,
        identity: &str,
        diagnostics: &mut Diagnostics,
    ) -> TimetableEntry {
        let date_raw = text_child(item, "TTBL_DATE");
        let reading = read_timetable_date(&date_raw);
        match reading {
            DateReading::Unparseable => {
                diagnostics.unparseable_dates += 1;
                debug!(
                    source = %self.source_name,
                    rin = identity,
                    "Unparseable timetable date '{}'",
                    date_raw
                );
            }
            DateReading::Undetermined => diagnostics.undetermined_dates += 1,
            DateReading::Dated(_) | DateReading::Blank => {}
        }
        let partial = reading.partial();
        TimetableEntry {
            action: text_child(item, "TTBL_ACTION"),
            date_raw,
            date: partial.date,
            precision: partial.precision,
            fr_citation: text_child(item, "FR_CITATION"),
        }
    }

    /// Unclaimed leaves, keyed by upper-cased local name; first wins.
    ///
    /// Immediate leaves become `NAME`. The leaf children of an unrecognized
    /// block become `BLOCK_NAME`; anything nested deeper is not captured.
    fn read_extras(
        &self,
        entity: &Element,
        identity: &str,
        diagnostics: &mut Diagnostics,
    ) -> IndexMap<String, String> {
        let mut extras = IndexMap::new();
        for child in &entity.children {
            let tag = child.local_name();
            if schema::is_known_tag(tag) {
                continue;
            }
            if child.is_leaf() {
                self.capture_extra(&mut extras, tag.to_uppercase(), child, identity, diagnostics);
                continue;
            }

            diagnostics.unrecognized_blocks += 1;
            debug!(
                source = %self.source_name,
                rin = identity,
                "Flattening unrecognized block {}",
                tag
            );
            let block = tag.to_uppercase();
            for leaf in child.children.iter().filter(|c| c.is_leaf()) {
                let column = format!("{}_{}", block, leaf.local_name().to_uppercase());
                self.capture_extra(&mut extras, column, leaf, identity, diagnostics);
            }
        }
        extras
    }

    fn capture_extra(
        &self,
        extras: &mut IndexMap<String, String>,
        column: String,
        leaf: &Element,
        identity: &str,
        diagnostics: &mut Diagnostics,
    ) {
        if reserved_columns().contains(&column) || extras.contains_key(&column) {
            return;
        }
        diagnostics.schema_drift += 1;
        debug!(
            source = %self.source_name,
            rin = identity,
            "Capturing unrecognized field {}",
            column
        );
        extras.insert(column, leaf.clean_text());
    }
}

/// Items of every container of this kind, in source order
fn list_items(entity: &Element, kind: ListKind) -> Vec<&Element> {
    let spec = schema::list_spec(kind);
    children_by_name(entity, spec.container)
        .into_iter()
        .flat_map(|container| children_by_name(container, spec.item))
        .collect()
}

fn read_group(node: Option<&Element>, fields: &[&str]) -> Group {
    fields
        .iter()
        .map(|field| (field.to_string(), text_child_of(node, field)))
        .collect()
}

fn read_contact(item: &Element) -> Contact {
    Contact {
        prefix: text_child(item, "PREFIX"),
        first_name: text_child(item, "FIRST_NAME"),
        middle_name: text_child(item, "MIDDLE_NAME"),
        last_name: text_child(item, "LAST_NAME"),
        suffix: text_child(item, "SUFFIX"),
        title: text_child(item, "TITLE"),
        phone: text_child(item, "PHONE"),
        phone_ext: text_child(item, "PHONE_EXT"),
        tdd_phone: text_child(item, "TDD_PHONE"),
        fax: text_child(item, "FAX"),
        email: text_child(item, "EMAIL"),
        agency: first_child_by_name(item, "AGENCY").map(|a| read_group(Some(a), AGENCY_FIELDS)),
        mailing_address: first_child_by_name(item, "MAILING_ADDRESS").map(|address| {
            MailingAddress {
                street_address: text_child(address, "STREET_ADDRESS"),
                city: text_child(address, "CITY"),
                state: text_child(address, "STATE"),
                zip: text_child(address, "ZIP"),
            }
        }),
    }
}
