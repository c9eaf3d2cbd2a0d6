use crate::calc::{round1, GradeBook};
use crate::db;
use crate::model::{Assignment, Grade, Student};
use anyhow::{anyhow, Context};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MANIFEST_ENTRY: &str = "manifest.json";
const DB_ENTRY: &str = "db/classroom.sqlite3";
const ROSTER_ENTRY: &str = "exports/roster.csv";
const GRADEBOOK_ENTRY: &str = "exports/gradebook.csv";
pub const BUNDLE_FORMAT_V1: &str = "classroom-workspace-v1";

const ZIP_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub entry_count: usize,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub bundle_format_detected: String,
}

/// Snapshot used to render the CSV exports inside the bundle.
pub struct ExportData<'a> {
    pub students: &'a [Student],
    pub assignments: &'a [Assignment],
    pub grades: &'a [Grade],
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

fn csv_quote(s: &str) -> String {
    if s.chars().any(|c| matches!(c, ',' | '"' | '\n' | '\r')) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn roster_csv(students: &[Student]) -> String {
    let mut out = String::from("id,lastName,firstName,email,studentNo,gradeLevel\n");
    for s in students {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            s.id,
            csv_quote(&s.last_name),
            csv_quote(&s.first_name),
            csv_quote(&s.email),
            csv_quote(&s.student_no),
            csv_quote(&s.grade_level),
        ));
    }
    out
}

fn gradebook_csv(data: &ExportData<'_>) -> String {
    let book = GradeBook::index(data.grades);
    let mut out = String::from("student");
    for a in data.assignments {
        out.push(',');
        out.push_str(&csv_quote(&format!("{} ({} pts)", a.title, a.points)));
    }
    out.push_str(",average\n");

    for s in data.students {
        out.push_str(&csv_quote(&s.display_name()));
        for a in data.assignments {
            out.push(',');
            if let Some(g) = book.find(s.id, a.id) {
                out.push_str(&format!("{}", g.score));
            }
        }
        out.push_str(&format!(
            ",{}\n",
            round1(book.student_average(data.assignments, s.id))
        ));
    }
    out
}

pub fn export_workspace_bundle(
    workspace_path: &Path,
    data: &ExportData<'_>,
    out_path: &Path,
) -> anyhow::Result<ExportSummary> {
    let db_path = workspace_path.join(db::DB_FILE);
    if !db_path.is_file() {
        return Err(anyhow!("workspace database not found: {}", db_path.display()));
    }
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let db_bytes =
        std::fs::read(&db_path).with_context(|| format!("failed to read {}", db_path.display()))?;
    let entries: Vec<(&str, Vec<u8>)> = vec![
        (DB_ENTRY, db_bytes),
        (ROSTER_ENTRY, roster_csv(data.students).into_bytes()),
        (GRADEBOOK_ENTRY, gradebook_csv(data).into_bytes()),
    ];

    let exported_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let manifest = json!({
        "format": BUNDLE_FORMAT_V1,
        "version": 1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": exported_at,
        "entries": entries
            .iter()
            .map(|(path, bytes)| json!({ "path": path, "sha256": sha256_hex(bytes) }))
            .collect::<Vec<_>>(),
    });
    let manifest_text =
        serde_json::to_string_pretty(&manifest).context("failed to serialize manifest")?;

    let out_file = File::create(out_path)
        .with_context(|| format!("failed to create output file {}", out_path.display()))?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(manifest_text.as_bytes())
        .context("failed to write manifest entry")?;
    for (path, bytes) in &entries {
        zip.start_file(*path, opts)
            .with_context(|| format!("failed to start bundle entry {}", path))?;
        zip.write_all(bytes)
            .with_context(|| format!("failed to write bundle entry {}", path))?;
    }
    zip.finish().context("failed to finalize zip bundle")?;

    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        entry_count: entries.len() + 1,
    })
}

pub fn import_workspace_bundle(
    in_path: &Path,
    workspace_path: &Path,
) -> anyhow::Result<ImportSummary> {
    if !has_zip_signature(in_path)? {
        return Err(anyhow!("not a workspace bundle: {}", in_path.display()));
    }

    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.display()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let manifest = read_manifest(&mut archive)?;
    let format = manifest.get("format").and_then(|v| v.as_str()).unwrap_or("");
    if format != BUNDLE_FORMAT_V1 {
        return Err(anyhow!("unsupported bundle format: {}", format));
    }

    let mut db_bytes = Vec::new();
    archive
        .by_name(DB_ENTRY)
        .with_context(|| format!("bundle is missing {}", DB_ENTRY))?
        .read_to_end(&mut db_bytes)
        .context("failed to read database entry")?;
    if let Some(expected) = manifest_entry_sha(&manifest, DB_ENTRY) {
        let actual = sha256_hex(&db_bytes);
        if actual != expected {
            return Err(anyhow!(
                "database checksum mismatch: manifest says {}, bundle carries {}",
                expected,
                actual
            ));
        }
    }

    // Extract beside the target, then swap, so a torn write never leaves a
    // half-written database under the live name.
    std::fs::create_dir_all(workspace_path)
        .with_context(|| format!("failed to create workspace {}", workspace_path.display()))?;
    let dst = workspace_path.join(db::DB_FILE);
    let staging = workspace_path.join(format!("{}.incoming", db::DB_FILE));
    std::fs::write(&staging, &db_bytes)
        .with_context(|| format!("failed to stage database at {}", staging.display()))?;
    if dst.exists() {
        std::fs::remove_file(&dst)
            .with_context(|| format!("failed to replace {}", dst.display()))?;
    }
    std::fs::rename(&staging, &dst)
        .with_context(|| format!("failed to move database into {}", dst.display()))?;

    Ok(ImportSummary {
        bundle_format_detected: BUNDLE_FORMAT_V1.to_string(),
    })
}

fn read_manifest(archive: &mut ZipArchive<File>) -> anyhow::Result<serde_json::Value> {
    let mut text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .with_context(|| format!("bundle is missing {}", MANIFEST_ENTRY))?
        .read_to_string(&mut text)
        .context("failed to read manifest.json")?;
    serde_json::from_str(&text).context("manifest.json is invalid JSON")
}

fn manifest_entry_sha(manifest: &serde_json::Value, entry_path: &str) -> Option<String> {
    manifest
        .get("entries")?
        .as_array()?
        .iter()
        .find(|e| e.get("path").and_then(|p| p.as_str()) == Some(entry_path))?
        .get("sha256")?
        .as_str()
        .map(str::to_string)
}

fn has_zip_signature(path: &Path) -> anyhow::Result<bool> {
    let mut f = File::open(path)
        .with_context(|| format!("failed to open input file {}", path.display()))?;
    let mut sig = [0u8; 4];
    let read = f.read(&mut sig).context("failed to read file signature")?;
    Ok(read == 4 && sig == ZIP_SIGNATURE)
}
