//! Tabular outputs with deferred column finalization.
//!
//! Rows may carry extra columns discovered at parse time, so the header is
//! only fixed once every row is known: the base columns in order, then every
//! other column seen in any row, sorted.

use crate::error::Result;
use crate::reduce::CompositeRecord;
use crate::schema::{self, COL_PUBLICATION_ID, COL_PUB_SEASON, COL_RIN, COL_SOURCE_XML};
use crate::snapshot;
use crate::types::EntityRecord;
use crate::view::{to_row, Row};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const COL_LAST_PUB_YM: &str = "LAST_PUB_YM";
pub const COL_SOURCE_XML_OF_LAST: &str = "SOURCE_XML_OF_LAST";

/// Rows plus the finalized union of their columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    /// `base` columns first, then any other column present in `rows`, sorted
    pub fn with_union(base: Vec<String>, rows: Vec<Row>) -> Self {
        let known: HashSet<&str> = base.iter().map(String::as_str).collect();
        let extra: BTreeSet<String> = rows
            .iter()
            .flat_map(|row| row.keys())
            .filter(|k| !known.contains(k.as_str()))
            .cloned()
            .collect();
        let mut columns = base;
        columns.extend(extra);
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write as CSV; columns a row lacks are written empty
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(&self.columns)?;
        for row in &self.rows {
            csv.write_record(
                self.columns
                    .iter()
                    .map(|c| row.get(c).map(String::as_str).unwrap_or("")),
            )?;
        }
        csv.flush()?;
        Ok(())
    }

    pub fn write_csv_path(&self, path: &Path) -> Result<()> {
        self.write_csv(BufWriter::new(File::create(path)?))
    }
}

/// One JSON document per line
pub fn write_json_lines<W: Write, T: Serialize>(mut writer: W, items: &[T]) -> Result<()> {
    for item in items {
        serde_json::to_writer(&mut writer, item)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// One row per record, superset columns first
pub fn entity_table(records: &[EntityRecord]) -> Table {
    Table::with_union(schema::column_names(), records.iter().map(to_row).collect())
}

/// One row per identity with the provenance of its current snapshot
pub fn last_table(composites: &[CompositeRecord]) -> Table {
    let mut base = schema::column_names();
    base.push(COL_LAST_PUB_YM.to_string());
    base.push(COL_SOURCE_XML_OF_LAST.to_string());

    let rows = composites
        .iter()
        .map(|composite| {
            let mut row = to_row(&composite.record);
            row.insert(COL_LAST_PUB_YM.to_string(), composite.last_pub_ym().to_string());
            row.insert(
                COL_SOURCE_XML_OF_LAST.to_string(),
                composite.source_of_last().to_string(),
            );
            row
        })
        .collect();
    Table::with_union(base, rows)
}

const TIMETABLE_COLUMNS: &[&str] = &[
    COL_RIN,
    COL_PUBLICATION_ID,
    COL_SOURCE_XML,
    "TTBL_SEQ",
    "TTBL_ACTION",
    "TTBL_DATE",
    "TTBL_DATE_ISO",
    "TTBL_DATE_PRECISION",
    "FR_CITATION",
];

fn fixed_row(columns: &[&str], values: Vec<String>) -> Row {
    columns
        .iter()
        .map(|c| c.to_string())
        .zip(values)
        .collect()
}

/// Long form of every timetable: one row per event, source order kept
pub fn timetable_table(records: &[EntityRecord]) -> Table {
    let rows = records
        .iter()
        .flat_map(|record| {
            record
                .lists
                .timetable
                .iter()
                .enumerate()
                .map(move |(seq, entry)| {
                    fixed_row(
                        TIMETABLE_COLUMNS,
                        vec![
                            record.identity.clone(),
                            record.snapshot_id.clone(),
                            record.source.clone(),
                            seq.to_string(),
                            entry.action.clone(),
                            entry.date_raw.clone(),
                            entry.date_iso(),
                            entry.precision.as_str().to_string(),
                            entry.fr_citation.clone(),
                        ],
                    )
                })
        })
        .collect();
    Table::with_union(TIMETABLE_COLUMNS.iter().map(|c| c.to_string()).collect(), rows)
}

const COUNT_COLUMNS: &[&str] = &[COL_PUBLICATION_ID, COL_PUB_SEASON, "RIN_COUNT"];

/// Distinct identities per snapshot, in snapshot order
pub fn counts_table(records: &[EntityRecord]) -> Table {
    let mut per_snapshot: BTreeMap<(i64, &str), HashSet<&str>> = BTreeMap::new();
    for record in records {
        per_snapshot
            .entry((record.snapshot_rank(), record.snapshot_id.as_str()))
            .or_default()
            .insert(record.identity.as_str());
    }
    let rows = per_snapshot
        .into_iter()
        .map(|((_, snapshot_id), identities)| {
            fixed_row(
                COUNT_COLUMNS,
                vec![
                    snapshot_id.to_string(),
                    snapshot::season(snapshot_id).to_string(),
                    identities.len().to_string(),
                ],
            )
        })
        .collect();
    Table::with_union(COUNT_COLUMNS.iter().map(|c| c.to_string()).collect(), rows)
}

const DESIGNATION_LOG_COLUMNS: &[&str] = &[
    COL_RIN,
    COL_LAST_PUB_YM,
    COL_SOURCE_XML_OF_LAST,
    "FIELD",
    "FILLED_VALUE",
    "FILLED_FROM_PUB_YM",
    "FILLED_FROM_SOURCE_XML",
];

/// Audit trail of every designation fill
pub fn designation_log_table(composites: &[CompositeRecord]) -> Table {
    let rows = composites
        .iter()
        .filter_map(|composite| {
            let fill = composite.designation_fill.as_ref()?;
            Some(fixed_row(
                DESIGNATION_LOG_COLUMNS,
                vec![
                    composite.record.identity.clone(),
                    composite.last_pub_ym().to_string(),
                    composite.source_of_last().to_string(),
                    fill.field.clone(),
                    fill.value.clone(),
                    fill.from_snapshot.clone(),
                    fill.from_source.clone(),
                ],
            ))
        })
        .collect();
    Table::with_union(
        DESIGNATION_LOG_COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv_string(table: &Table) -> String {
        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_union_appends_sorted_extras_and_fills_blanks() {
        let mut a = EntityRecord::empty("A", "199510");
        a.extras.insert("ZETA".to_string(), "z".to_string());
        let mut b = EntityRecord::empty("B", "201810");
        b.extras.insert("ALPHA".to_string(), "a".to_string());

        let table = entity_table(&[a, b]);
        let n = schema::column_names().len();
        assert_eq!(table.columns.len(), n + 2);
        assert_eq!(table.columns[n], "ALPHA");
        assert_eq!(table.columns[n + 1], "ZETA");

        let csv = csv_string(&table);
        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][n], "");
        assert_eq!(&rows[0][n + 1], "z");
        assert_eq!(&rows[1][n], "a");
    }

    #[test]
    fn test_counts_are_distinct_and_ordered() {
        let records = vec![
            EntityRecord::empty("A", "201810"),
            EntityRecord::empty("A", "201810"),
            EntityRecord::empty("B", "201810"),
            EntityRecord::empty("A", "199504"),
        ];
        insta::assert_snapshot!(csv_string(&counts_table(&records)).trim_end(), @r"
        PUBLICATION_ID,PUB_SEASON,RIN_COUNT
        199504,Spring,1
        201810,Fall,2
        ");
    }

    #[test]
    fn test_json_lines() {
        let mut out = Vec::new();
        write_json_lines(&mut out, &[serde_json::json!({"a": 1}), serde_json::json!({"a": 2})])
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "{\"a\":1}\n{\"a\":2}\n");
    }
}
