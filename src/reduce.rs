//! Last-known state per identity across snapshots, with backfill.
//!
//! The current record of an identity is its highest-ranked snapshot (first
//! ingested on ties). Blank backfillable scalars are filled from strictly
//! earlier snapshots only: the latest one carrying a value, first ingested on
//! ties. Lists and the latest event always come from the
//! current record, so later history never leaks into an earlier cohort.

use crate::schema::DEFAULT_DESIGNATION_FIELD;
use crate::snapshot::SnapshotWindow;
use crate::types::{EntityRecord, FieldKey};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReduceOptions {
    /// Only snapshots inside this window are considered
    pub window: Option<SnapshotWindow>,
    /// Field given the audited designation backfill; `None` disables it
    pub designation_field: Option<String>,
    /// General forward-fill of blank scalars
    pub backfill: bool,
}

impl Default for ReduceOptions {
    fn default() -> Self {
        Self {
            window: None,
            designation_field: Some(DEFAULT_DESIGNATION_FIELD.to_string()),
            backfill: true,
        }
    }
}

/// One value copied into the current record from an earlier snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backfill {
    pub field: FieldKey,
    pub value: String,
    pub from_snapshot: String,
    pub from_source: String,
}

/// Audited fill of the designation field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignationFill {
    pub field: String,
    pub value: String,
    pub from_snapshot: String,
    pub from_source: String,
}

/// One identity's current state assembled from its snapshot history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeRecord {
    /// Copy of the current record with backfilled scalars applied
    pub record: EntityRecord,
    pub backfilled: Vec<Backfill>,
    pub designation_fill: Option<DesignationFill>,
}

impl CompositeRecord {
    /// Snapshot id of the record this state was taken from
    pub fn last_pub_ym(&self) -> &str {
        &self.record.snapshot_id
    }

    pub fn source_of_last(&self) -> &str {
        &self.record.source
    }
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Latest earlier record with a value at `key`; first ingested among equal snapshots
fn fill_source<'a>(earlier: &[&'a EntityRecord], key: &FieldKey) -> Option<&'a EntityRecord> {
    earlier
        .iter()
        .copied()
        .filter(|older| !is_blank(older.field(key)))
        .min_by_key(|older| Reverse(older.snapshot_rank()))
}

/// Reduce a whole batch to one composite record per identity, sorted by identity.
///
/// `records` must be in ingestion order.
pub fn last_per_identity(records: &[EntityRecord], options: &ReduceOptions) -> Vec<CompositeRecord> {
    let mut by_identity: BTreeMap<&str, Vec<&EntityRecord>> = BTreeMap::new();
    for record in records {
        if let Some(window) = &options.window {
            if !window.contains(&record.snapshot_id) {
                continue;
            }
        }
        by_identity
            .entry(record.identity.as_str())
            .or_default()
            .push(record);
    }

    by_identity
        .into_values()
        .filter_map(|history| reduce_identity(history, options))
        .collect()
}

/// Reduce one identity's history (in ingestion order) to its composite record
pub fn reduce_identity(mut history: Vec<&EntityRecord>, options: &ReduceOptions) -> Option<CompositeRecord> {
    // Stable: equal ranks keep ingestion order
    history.sort_by_key(|r| r.snapshot_rank());

    let max_rank = history.last()?.snapshot_rank();
    let current_at = history.iter().position(|r| r.snapshot_rank() == max_rank)?;
    let current = history[current_at];
    let earlier = &history[..current_at];

    let mut record = current.clone();
    let mut backfilled = Vec::new();
    let designation = options.designation_field.as_deref();

    if options.backfill {
        let mut keys: IndexSet<FieldKey> = current.backfillable_keys().into_iter().collect();
        for older in earlier {
            keys.extend(older.extras.keys().map(|k| FieldKey::Extra(k.clone())));
        }

        for key in keys {
            if matches!((&key, designation), (FieldKey::Scalar(tag), Some(field)) if tag == field) {
                continue;
            }
            if !is_blank(record.field(&key)) {
                continue;
            }
            if let Some(older) = fill_source(earlier, &key) {
                let value = older.field(&key).to_string();
                record.set_field(&key, value.clone());
                backfilled.push(Backfill {
                    field: key,
                    value,
                    from_snapshot: older.snapshot_id.clone(),
                    from_source: older.source.clone(),
                });
            }
        }
    }

    let designation_fill = designation.and_then(|field| {
        let key = FieldKey::Scalar(field.to_string());
        if !is_blank(record.field(&key)) {
            return None;
        }
        let older = fill_source(earlier, &key)?;
        let value = older.field(&key).to_string();
        record.set_field(&key, value.clone());
        Some(DesignationFill {
            field: field.to_string(),
            value,
            from_snapshot: older.snapshot_id.clone(),
            from_source: older.source.clone(),
        })
    });

    Some(CompositeRecord {
        record,
        backfilled,
        designation_fill,
    })
}
