//! Output formatting and persistence for pipeline results.
//!
//! Writes one `Name,Score,Tier` CSV per processed sheet (optionally gzip
//! compressed) and JSON documents for the report consumers.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::pipeline::types::{SheetResult, WorkbookReport};

/// One row of an exported sheet table.
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Score")]
    score: f64,
    #[serde(rename = "Tier")]
    tier: &'static str,
}

/// Writes the records of `result` as CSV with a `Name,Score,Tier` header.
pub fn write_table<W: Write>(writer: W, result: &SheetResult) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(writer);

    for record in result.records() {
        writer.serialize(ExportRow {
            name: &record.name,
            score: record.score,
            tier: record.tier.as_str(),
        })?;
    }
    writer.flush()?;

    Ok(())
}

/// Exports every processed sheet of `report` into `dir`, one file per sheet.
///
/// File names are derived from the sheet name; returns the written paths in
/// sheet order.
pub fn export_tables(dir: &Path, report: &WorkbookReport, gzip: bool) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;

    let mut used = HashSet::new();
    let mut written = Vec::new();

    for result in report.processed() {
        let stem = unique_stem(&sanitize_file_name(result.sheet_name()), &mut used);
        let extension = if gzip { "csv.gz" } else { "csv" };
        let path = dir.join(format!("{stem}.{extension}"));

        let file = File::create(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        if gzip {
            let mut encoder = GzEncoder::new(file, Compression::default());
            write_table(&mut encoder, result)?;
            encoder.finish()?;
        } else {
            write_table(file, result)?;
        }

        debug!(sheet = result.sheet_name(), path = %path.display(), "Sheet exported");
        written.push(path);
    }

    info!(files = written.len(), dir = %dir.display(), "Export complete");
    Ok(written)
}

/// Serializes `value` as pretty JSON into `path`.
pub fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    let body = serde_json::to_vec_pretty(value)?;
    std::fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Replaces characters that are not allowed in file names.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().trim_matches('.');

    if cleaned.is_empty() {
        "sheet".to_string()
    } else {
        cleaned.to_string()
    }
}

fn unique_stem(stem: &str, used: &mut HashSet<String>) -> String {
    let mut candidate = stem.to_string();
    let mut n = 2;
    while !used.insert(candidate.to_lowercase()) {
        candidate = format!("{stem}-{n}");
        n += 1;
    }
    candidate
}
