use crate::config::Config;
use crate::error::{Error, Result};
use crate::flatten::{Diagnostics, Flattener};
use crate::schema::ENTITY_TAG;
use crate::snapshot::{is_canonical_filename, snapshot_from_filename};
use crate::stream::{EntityStream, ParseMode};
use crate::types::EntityRecord;
use async_stream::stream;
use futures::{Stream, StreamExt};
use jwalk::WalkDir;
use serde::Serialize;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Lazy records of one document; entities without identity are skipped
pub struct Records<R: BufRead> {
    entities: EntityStream<R>,
    flattener: Flattener,
    diagnostics: Diagnostics,
    entities_seen: usize,
}

impl<R: BufRead> Records<R> {
    pub fn new(entities: EntityStream<R>, filename_snapshot: Option<String>) -> Self {
        let flattener = Flattener::new(entities.source_name(), filename_snapshot);
        Self {
            entities,
            flattener,
            diagnostics: Diagnostics::default(),
            entities_seen: 0,
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Counters for everything read so far
    pub fn stats(&self, records: usize) -> DocumentStats {
        DocumentStats {
            entities: self.entities_seen,
            records,
            recovered_errors: self.entities.recovered_errors(),
            diagnostics: self.diagnostics,
        }
    }
}

impl<R: BufRead> Iterator for Records<R> {
    type Item = Result<EntityRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entity = match self.entities.next()? {
                Ok(entity) => entity,
                Err(e) => return Some(Err(e)),
            };
            self.entities_seen += 1;
            if let Some(record) = self.flattener.flatten(&entity, &mut self.diagnostics) {
                return Some(Ok(record));
            }
        }
    }
}

/// Open a document as a lazy sequence of records
pub fn stream_records(path: &Path, mode: ParseMode) -> Result<Records<std::io::BufReader<std::fs::File>>> {
    let entities = EntityStream::from_path(path, ENTITY_TAG, mode)?;
    Ok(Records::new(entities, snapshot_from_filename(path)))
}

/// Per-document counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DocumentStats {
    /// Entity elements encountered
    pub entities: usize,
    /// Records produced (entities with an identity)
    pub records: usize,
    /// XML syntax errors skipped in recover mode
    pub recovered_errors: usize,
    #[serde(flatten)]
    pub diagnostics: Diagnostics,
}

/// Every record of one document
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub source: String,
    pub records: Vec<EntityRecord>,
    pub stats: DocumentStats,
}

/// Parse an in-memory or already-open document
pub fn parse_reader<R: BufRead>(
    reader: R,
    source_name: &str,
    filename_snapshot: Option<String>,
    mode: ParseMode,
) -> Result<ParsedDocument> {
    let entities = EntityStream::new(reader, source_name, ENTITY_TAG, mode);
    collect_records(Records::new(entities, filename_snapshot))
}

/// Parse one document on disk
pub fn parse_document(path: &Path, mode: ParseMode) -> Result<ParsedDocument> {
    collect_records(stream_records(path, mode)?)
}

fn collect_records<R: BufRead>(mut records: Records<R>) -> Result<ParsedDocument> {
    let collected = records.by_ref().collect::<Result<Vec<_>>>()?;
    let stats = records.stats(collected.len());
    Ok(ParsedDocument {
        source: records.flattener.source_name().to_string(),
        records: collected,
        stats,
    })
}

/// Outcome of one document in a batch
#[derive(Debug)]
pub struct DocumentReport {
    pub path: PathBuf,
    pub result: Result<ParsedDocument>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub path: PathBuf,
    pub stats: DocumentStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Records of a whole batch in ingestion order
#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub records: Vec<EntityRecord>,
    pub documents: Vec<DocumentSummary>,
    pub failures: Vec<DocumentFailure>,
    /// Per-entity defects totalled over every parsed document
    pub diagnostics: Diagnostics,
}

/// Parses many documents, isolating failures per document
pub struct BatchProcessor {
    config: Config,
}

impl BatchProcessor {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Expand the configured inputs into documents, in ingestion order.
    ///
    /// Directories are walked for canonically named documents, falling back
    /// to every `.xml` file when none is canonical. Plain paths are kept
    /// as given so a missing one is reported as its own failure.
    pub fn discover_documents(config: &Config) -> Result<Vec<PathBuf>> {
        let mut documents = Vec::new();
        for input in &config.inputs {
            if !input.is_dir() {
                documents.push(input.clone());
                continue;
            }

            let mut xml_files: Vec<PathBuf> = WalkDir::new(input)
                .sort(true)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.path())
                .filter(|path| {
                    path.extension()
                        .map(|ext| ext.eq_ignore_ascii_case("xml"))
                        .unwrap_or(false)
                })
                .collect();
            xml_files.sort();

            let canonical: Vec<PathBuf> = xml_files
                .iter()
                .filter(|path| is_canonical_filename(path))
                .cloned()
                .collect();
            if canonical.is_empty() {
                if xml_files.is_empty() {
                    warn!("No XML documents under {}", input.display());
                }
                documents.extend(xml_files);
            } else {
                documents.extend(canonical);
            }
        }
        Ok(documents)
    }

    /// Parse every document, yielding reports in ingestion order.
    ///
    /// Up to `jobs` documents are parsed at once on the blocking pool.
    pub fn process(&self) -> impl Stream<Item = Result<DocumentReport>> {
        let config = self.config.clone();
        Box::pin(stream! {
            let discovery_config = config.clone();
            let documents = match tokio::task::spawn_blocking(move || {
                Self::discover_documents(&discovery_config)
            }).await {
                Ok(Ok(documents)) => documents,
                Ok(Err(e)) => {
                    yield Err(e);
                    return;
                }
                Err(e) => {
                    yield Err(Error::Io(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        format!("Task join error: {}", e)
                    )));
                    return;
                }
            };

            let mode = config.parse_mode;
            let mut reports = futures::stream::iter(documents)
                .map(move |path| async move {
                    let task_path = path.clone();
                    let result = match tokio::task::spawn_blocking(move || {
                        parse_document(&task_path, mode)
                    }).await {
                        Ok(result) => result,
                        Err(e) => Err(Error::Io(std::io::Error::new(
                            std::io::ErrorKind::Other,
                            format!("Task join error: {}", e)
                        ))),
                    };
                    DocumentReport { path, result }
                })
                .buffered(config.jobs.max(1));

            while let Some(report) = reports.next().await {
                yield Ok(report);
            }
        })
    }

    /// Run the whole batch and concatenate its records.
    ///
    /// Failed documents are logged and skipped. Only a batch that yields no
    /// records at all is an error.
    pub async fn collect(&self) -> Result<Batch> {
        let mut batch = Batch::default();
        let mut reports = self.process();
        while let Some(report) = reports.next().await {
            let report = report?;
            match report.result {
                Ok(document) => {
                    info!(
                        source = %document.source,
                        records = document.stats.records,
                        "Parsed document"
                    );
                    batch.diagnostics.merge(&document.stats.diagnostics);
                    batch.documents.push(DocumentSummary {
                        path: report.path,
                        stats: document.stats,
                    });
                    batch.records.extend(document.records);
                }
                Err(e) => {
                    warn!(path = %report.path.display(), "Skipping document: {}", e);
                    batch.failures.push(DocumentFailure {
                        path: report.path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let documents = batch.documents.len() + batch.failures.len();
        if batch.records.is_empty() {
            return Err(Error::EmptyBatch {
                documents,
                failed: batch.failures.len(),
            });
        }
        info!(
            documents,
            failed = batch.failures.len(),
            records = batch.records.len(),
            missing_identity = batch.diagnostics.missing_identity,
            schema_drift = batch.diagnostics.schema_drift,
            unrecognized_blocks = batch.diagnostics.unrecognized_blocks,
            unparseable_dates = batch.diagnostics.unparseable_dates,
            undetermined_dates = batch.diagnostics.undetermined_dates,
            "Batch complete"
        );
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<REGINFO_RIN_DATA>
  <RIN_INFO>
    <RIN>2060-AA00</RIN>
    <AGENCY><CODE>2000</CODE><NAME>Environmental Protection Agency</NAME><ACRONYM>EPA</ACRONYM></AGENCY>
  </RIN_INFO>
  <RIN_INFO><RULE_TITLE>No identity</RULE_TITLE></RIN_INFO>
  <RIN_INFO><RIN>2060-AA01</RIN></RIN_INFO>
</REGINFO_RIN_DATA>"#;

    #[test]
    fn test_parse_reader_counts_skipped_entities() {
        let document = parse_reader(
            DOC.as_bytes(),
            "REGINFO_RIN_DATA_199510.xml",
            Some("199510".to_string()),
            ParseMode::Recover,
        )
        .unwrap();
        assert_eq!(document.records.len(), 2);
        assert_eq!(document.stats.entities, 3);
        assert_eq!(document.stats.diagnostics.missing_identity, 1);
        assert_eq!(document.records[0].snapshot_id, "199510");
        assert_eq!(document.records[0].source, "REGINFO_RIN_DATA_199510.xml");
    }

    #[test]
    fn test_strict_parse_fails_whole_document() {
        let truncated = &DOC[..DOC.len() - 40];
        let result = parse_reader(truncated.as_bytes(), "x.xml", None, ParseMode::Strict);
        assert!(matches!(result, Err(Error::MalformedDocument { .. })));
    }

    #[test]
    fn test_empty_batch_is_an_error() {
        let config = ConfigBuilder::new(vec![PathBuf::from("/nonexistent/REGINFO_RIN_DATA_199510.xml")])
            .build()
            .unwrap();
        let result = tokio_test::block_on(BatchProcessor::new(config).collect());
        assert!(matches!(
            result,
            Err(Error::EmptyBatch { documents: 1, failed: 1 })
        ));
    }
}
