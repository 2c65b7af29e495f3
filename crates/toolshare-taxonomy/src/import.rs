//! External taxonomy import.
//!
//! Input is UTF-8, one record per line: `<numeric id>\t<path>`, where the
//! path joins category names with `" > "`. Blank lines and `#` comments are
//! skipped. Parent links are resolved after the whole text is parsed, so
//! descendants may precede their ancestors.
//!
//! Persistence replaces the whole table: delete-all, then batched inserts.
//! A failed batch is recorded and the remaining batches still run.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use toolshare_core::defaults::PATH_SEPARATOR;
use toolshare_core::{
    CategoryEvent, CategoryEventBus, FormatReport, ImportError, ImportResult, TaxonomyConfig,
    TaxonomyRecord, TaxonomyStore,
};

use crate::source::ImportSource;

const BOM: char = '\u{feff}';

/// Outcome of parsing taxonomy text, before anything is written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTaxonomy {
    pub records: Vec<TaxonomyRecord>,
    pub errors: Vec<ImportError>,
    /// Records whose parent path was absent and were kept as roots.
    pub warnings: Vec<String>,
    /// Non-blank, non-comment lines examined.
    pub lines_checked: usize,
}

/// Parse one data line into `(id, segments)`.
pub fn parse_line(line_no: usize, line: &str) -> Result<(i64, Vec<String>), ImportError> {
    let err = |message: String| ImportError::Line {
        line: line_no,
        message,
    };

    let columns: Vec<&str> = line.split('\t').collect();
    if columns.len() != 2 {
        return Err(err(format!(
            "expected 2 tab-separated columns, found {}",
            columns.len()
        )));
    }

    let raw_id = columns[0].trim();
    let id: i64 = raw_id
        .parse()
        .map_err(|_| err(format!("id '{}' is not a number", raw_id)))?;

    let raw_path = columns[1].trim();
    if raw_path.is_empty() {
        return Err(err("path is empty".to_string()));
    }
    // Only the spaced separator splits; a bare '>' is part of a name.
    let segments: Vec<String> = raw_path
        .split(PATH_SEPARATOR)
        .map(|s| s.trim().to_string())
        .collect();
    if segments.iter().any(String::is_empty) {
        return Err(err(format!("path '{}' has an empty segment", raw_path)));
    }
    Ok((id, segments))
}

/// Parse a whole taxonomy text.
pub fn parse_taxonomy(text: &str) -> ParsedTaxonomy {
    parse_lines(text, usize::MAX, Utc::now())
}

fn parse_lines(text: &str, max_lines: usize, now: DateTime<Utc>) -> ParsedTaxonomy {
    let text = text.strip_prefix(BOM).unwrap_or(text);
    let mut parsed = ParsedTaxonomy::default();
    let mut line_of_id: HashMap<i64, usize> = HashMap::new();
    let mut id_of_path: HashMap<String, i64> = HashMap::new();
    let mut record_lines: Vec<usize> = Vec::new();

    for (idx, line) in text.lines().take(max_lines).enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        parsed.lines_checked += 1;

        let (id, segments) = match parse_line(line_no, line) {
            Ok(v) => v,
            Err(e) => {
                parsed.errors.push(e);
                continue;
            }
        };
        let path = segments.join(PATH_SEPARATOR);

        if let Some(first) = line_of_id.get(&id) {
            parsed.errors.push(ImportError::Line {
                line: line_no,
                message: format!("duplicate id {} (first seen on line {})", id, first),
            });
            continue;
        }
        if id_of_path.contains_key(&path) {
            parsed.errors.push(ImportError::Line {
                line: line_no,
                message: format!("duplicate path '{}'", path),
            });
            continue;
        }

        line_of_id.insert(id, line_no);
        id_of_path.insert(path.clone(), id);
        record_lines.push(line_no);
        parsed.records.push(TaxonomyRecord {
            external_id: id,
            path,
            parent_external_id: None,
            level: segments.len() as i32,
            is_active: true,
            updated_at: now,
        });
    }

    // Link parents once every path is known.
    for (record, line_no) in parsed.records.iter_mut().zip(record_lines) {
        let segments = record.segments();
        if segments.len() < 2 {
            continue;
        }
        let parent_path = segments[..segments.len() - 1].join(PATH_SEPARATOR);
        match id_of_path.get(&parent_path) {
            Some(&parent_id) => record.parent_external_id = Some(parent_id),
            None => {
                debug!(
                    subsystem = "taxonomy",
                    component = "import",
                    line = line_no,
                    path = %record.path,
                    "Parent path not found; keeping record as a root"
                );
                parsed.warnings.push(format!(
                    "line {}: parent '{}' not found; '{}' imported without a parent at level {}",
                    line_no, parent_path, record.path, record.level
                ));
            }
        }
    }

    parsed
}

/// Pre-flight the first `sample_lines` lines without writing anything.
pub fn validate_format(text: &str, sample_lines: usize) -> FormatReport {
    let parsed = parse_lines(text, sample_lines, Utc::now());
    let mut errors = parsed.errors;
    if parsed.records.is_empty() && errors.is_empty() {
        errors.push(ImportError::Source {
            message: "no taxonomy records found".to_string(),
        });
    }
    FormatReport {
        is_valid: errors.is_empty(),
        lines_checked: parsed.lines_checked,
        record_count: parsed.records.len(),
        errors,
    }
}

/// Fetch a source and pre-flight it. Read failures become a report error.
pub async fn validate_source(
    source: &ImportSource,
    client: &reqwest::Client,
    config: &TaxonomyConfig,
) -> FormatReport {
    match source.fetch(client, config.fetch_timeout()).await {
        Ok(text) => validate_format(&text, config.format_sample_lines),
        Err(e) => FormatReport {
            is_valid: false,
            lines_checked: 0,
            record_count: 0,
            errors: vec![ImportError::Source {
                message: format!("failed to read {}: {}", source, e),
            }],
        },
    }
}

/// Replaces the stored external taxonomy from a source.
#[derive(Clone)]
pub struct TaxonomyImporter {
    store: Arc<dyn TaxonomyStore>,
    config: TaxonomyConfig,
    client: reqwest::Client,
    events: Option<CategoryEventBus>,
}

impl TaxonomyImporter {
    pub fn new(store: Arc<dyn TaxonomyStore>, config: TaxonomyConfig) -> Self {
        Self {
            store,
            config,
            client: reqwest::Client::new(),
            events: None,
        }
    }

    /// Announce completed imports on this bus.
    pub fn with_events(mut self, events: CategoryEventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Use a preconfigured HTTP client for URL sources.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn config(&self) -> &TaxonomyConfig {
        &self.config
    }

    /// Fetch and pre-flight a source.
    pub async fn validate_source(&self, source: &ImportSource) -> FormatReport {
        validate_source(source, &self.client, &self.config).await
    }

    /// Fetch a source and replace the stored taxonomy with its records.
    pub async fn import_from_source(&self, source: &ImportSource) -> ImportResult {
        info!(
            subsystem = "taxonomy",
            component = "import",
            op = "import",
            source = %source,
            "Starting taxonomy import"
        );
        match source.fetch(&self.client, self.config.fetch_timeout()).await {
            Ok(text) => self.import_text(&text).await,
            Err(e) => {
                warn!(
                    subsystem = "taxonomy",
                    component = "import",
                    source = %source,
                    error = %e,
                    "Failed to read taxonomy source"
                );
                ImportResult::failed(format!("failed to read {}: {}", source, e))
            }
        }
    }

    /// Replace the stored taxonomy with the records in `text`.
    pub async fn import_text(&self, text: &str) -> ImportResult {
        let start = Instant::now();
        let parsed = parse_taxonomy(text);
        let mut errors = parsed.errors;

        if parsed.records.is_empty() {
            errors.push(ImportError::Source {
                message: "no valid taxonomy records; stored taxonomy left unchanged".to_string(),
            });
            return ImportResult {
                success: false,
                imported_count: 0,
                errors,
                warnings: parsed.warnings,
            };
        }

        if let Err(e) = self.store.delete_all().await {
            warn!(
                subsystem = "taxonomy",
                component = "import",
                op = "delete_all",
                error = %e,
                "Failed to clear external taxonomy; nothing imported"
            );
            errors.push(ImportError::Source {
                message: format!("failed to clear existing taxonomy: {}", e),
            });
            return ImportResult {
                success: false,
                imported_count: 0,
                errors,
                warnings: parsed.warnings,
            };
        }

        let (imported_count, batch_errors) = self.insert_batches(&parsed.records).await;
        errors.extend(batch_errors);

        info!(
            subsystem = "taxonomy",
            component = "import",
            op = "import",
            record_count = parsed.records.len(),
            imported_count,
            error_count = errors.len(),
            warning_count = parsed.warnings.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Taxonomy import finished"
        );

        if let Some(events) = &self.events {
            events.emit(CategoryEvent::TaxonomyImported { imported_count });
        }

        ImportResult {
            success: errors.is_empty(),
            imported_count,
            errors,
            warnings: parsed.warnings,
        }
    }

    /// Insert in batches with bounded parallelism. Returns rows written and
    /// one error per failed batch, ordered by batch index.
    async fn insert_batches(&self, records: &[TaxonomyRecord]) -> (usize, Vec<ImportError>) {
        let batch_size = self.config.import_batch_size.max(1);
        let concurrency = self.config.import_concurrency.max(1);

        let outcomes: Vec<(usize, usize, toolshare_core::Result<u64>)> =
            stream::iter(records.chunks(batch_size).enumerate())
                .map(|(batch_index, chunk)| async move {
                    let outcome = self.store.insert_batch(chunk).await;
                    (batch_index, chunk.len(), outcome)
                })
                .buffered(concurrency)
                .collect()
                .await;

        let mut imported = 0usize;
        let mut errors = Vec::new();
        for (batch_index, rows, outcome) in outcomes {
            match outcome {
                Ok(written) => {
                    imported += written as usize;
                    debug!(
                        subsystem = "taxonomy",
                        component = "import",
                        batch_index,
                        batch_size = rows,
                        "Batch inserted"
                    );
                }
                Err(e) => {
                    warn!(
                        subsystem = "taxonomy",
                        component = "import",
                        batch_index,
                        batch_size = rows,
                        error = %e,
                        "Batch insert failed"
                    );
                    errors.push(ImportError::Batch {
                        batch_index,
                        rows,
                        message: e.to_string(),
                    });
                }
            }
        }
        (imported, errors)
    }
}
