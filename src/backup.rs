use crate::config::{DATA_FILE, DB_FILE};
use crate::error::{RecordsError, Result};
use crate::registry::Registry;
use crate::snapshot::write_atomic;
use crate::{db, snapshot};
use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MANIFEST_ENTRY: &str = "manifest.json";
const DATA_ENTRY: &str = "data/school.json";
const DB_ENTRY: &str = "db/school.sqlite3";
pub const BUNDLE_FORMAT_V1: &str = "schoold-workspace-v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    format: String,
    version: u32,
    app_version: String,
    exported_at: String,
    entries: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ManifestEntry {
    path: String,
    sha256: String,
    bytes: u64,
}

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub entry_count: usize,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub bundle_format_detected: String,
    pub restored: Vec<String>,
    /// Records decoded from the restored store, the JSON snapshot when the
    /// bundle carried one.
    pub registry: Registry,
}

/// Byte copy of a store file, e.g. `school.sqlite3` to `backup_school.sqlite3`.
/// `dst` is replaced atomically and may not be `src` itself.
pub fn backup_file(src: &Path, dst: &Path) -> Result<u64> {
    if !src.is_file() {
        return Err(RecordsError::FileNotFound(src.to_path_buf()));
    }
    if same_file(src, dst) {
        return Err(RecordsError::write(
            dst,
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "backup destination is the source file",
            ),
        ));
    }
    let bytes = std::fs::read(src).map_err(|e| RecordsError::write(dst, e))?;
    write_atomic(dst, &bytes)?;
    tracing::info!(src = %src.display(), dst = %dst.display(), bytes = bytes.len(), "backup written");
    Ok(bytes.len() as u64)
}

fn same_file(src: &Path, dst: &Path) -> bool {
    match (std::fs::canonicalize(src), std::fs::canonicalize(dst)) {
        (Ok(src), Ok(dst)) => src == dst,
        _ => false,
    }
}

fn bundle_payloads() -> [(&'static str, &'static str); 2] {
    [(DATA_ENTRY, DATA_FILE), (DB_ENTRY, DB_FILE)]
}

pub fn export_workspace_bundle(
    workspace_path: &Path,
    out_path: &Path,
) -> anyhow::Result<ExportSummary> {
    let present: Vec<(&str, PathBuf)> = bundle_payloads()
        .into_iter()
        .map(|(entry, file)| (entry, workspace_path.join(file)))
        .filter(|(_, p)| p.is_file())
        .collect();
    if present.is_empty() {
        return Err(anyhow!(
            "workspace has no {} or {}: {}",
            DATA_FILE,
            DB_FILE,
            workspace_path.to_string_lossy()
        ));
    }

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }

    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entries = Vec::new();
    for (entry, path) in &present {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read {}", path.to_string_lossy()))?;
        zip.start_file(*entry, opts)
            .with_context(|| format!("failed to start {} entry", entry))?;
        zip.write_all(&bytes)
            .with_context(|| format!("failed to write {} entry", entry))?;
        entries.push(ManifestEntry {
            path: entry.to_string(),
            sha256: format!("{:x}", Sha256::digest(&bytes)),
            bytes: bytes.len() as u64,
        });
    }

    let manifest = Manifest {
        format: BUNDLE_FORMAT_V1.to_string(),
        version: 1,
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        exported_at: chrono::Utc::now().to_rfc3339(),
        entries,
    };
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    zip.finish().context("failed to finalize zip bundle")?;

    tracing::info!(
        path = %out_path.display(),
        entries = manifest.entries.len() + 1,
        "workspace bundle exported"
    );
    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        entry_count: manifest.entries.len() + 1,
    })
}

/// Restores a workspace from a bundle, or from a bare SQLite file as written
/// by [`backup_file`]. Every payload is extracted next to its live file,
/// checked and decoded first; live files are only replaced once all of them
/// passed. On failure the workspace is left as it was.
pub fn import_workspace_bundle(
    in_path: &Path,
    workspace_path: &Path,
) -> anyhow::Result<ImportSummary> {
    std::fs::create_dir_all(workspace_path).with_context(|| {
        format!(
            "failed to create workspace {}",
            workspace_path.to_string_lossy()
        )
    })?;

    let mut staged = Vec::new();
    let prepared = if is_zip_file(in_path)? {
        stage_bundle(in_path, workspace_path, &mut staged)
    } else {
        stage_plain_sqlite(in_path, workspace_path, &mut staged)
    };
    let (format, registry) = match prepared {
        Ok(v) => v,
        Err(e) => {
            discard(&staged);
            return Err(e);
        }
    };

    let mut restored = Vec::new();
    for (i, (tmp, dst)) in staged.iter().enumerate() {
        if let Err(e) = std::fs::rename(tmp, dst) {
            discard(&staged[i..]);
            return Err(e).with_context(|| {
                format!(
                    "failed to move extracted file to {}",
                    dst.to_string_lossy()
                )
            });
        }
        restored.push(
            dst.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
    }

    tracing::info!(
        path = %in_path.display(),
        format = %format,
        restored = restored.len(),
        "workspace bundle imported"
    );
    Ok(ImportSummary {
        bundle_format_detected: format,
        restored,
        registry,
    })
}

fn staging_path(workspace_path: &Path, file: &str) -> PathBuf {
    workspace_path.join(format!("{file}.importing"))
}

fn discard(staged: &[(PathBuf, PathBuf)]) {
    for (tmp, _) in staged {
        let _ = std::fs::remove_file(tmp);
    }
}

fn stage_plain_sqlite(
    in_path: &Path,
    workspace_path: &Path,
    staged: &mut Vec<(PathBuf, PathBuf)>,
) -> anyhow::Result<(String, Registry)> {
    let tmp = staging_path(workspace_path, DB_FILE);
    staged.push((tmp.clone(), workspace_path.join(DB_FILE)));
    std::fs::copy(in_path, &tmp).with_context(|| {
        format!(
            "failed to copy sqlite backup from {}",
            in_path.to_string_lossy()
        )
    })?;
    let registry = db::load_db(&tmp)
        .with_context(|| format!("{} is not a usable database", in_path.to_string_lossy()))?;
    Ok(("plain-sqlite3".to_string(), registry))
}

fn stage_bundle(
    in_path: &Path,
    workspace_path: &Path,
    staged: &mut Vec<(PathBuf, PathBuf)>,
) -> anyhow::Result<(String, Registry)> {
    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("bundle missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: Manifest =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid")?;
    if manifest.format != BUNDLE_FORMAT_V1 {
        return Err(anyhow!("unsupported bundle format: {}", manifest.format));
    }

    let mut data = None;
    let mut database = None;
    for entry in &manifest.entries {
        let Some((_, file)) = bundle_payloads()
            .into_iter()
            .find(|(name, _)| *name == entry.path)
        else {
            return Err(anyhow!("unexpected bundle entry: {}", entry.path));
        };
        let tmp = staging_path(workspace_path, file);
        if staged.iter().any(|(t, _)| *t == tmp) {
            return Err(anyhow!("duplicate bundle entry: {}", entry.path));
        }
        staged.push((tmp.clone(), workspace_path.join(file)));
        let digest = extract_entry(&mut archive, &entry.path, &tmp)?;
        if digest != entry.sha256 {
            return Err(anyhow!("checksum mismatch for {}", entry.path));
        }

        if file == DATA_FILE {
            data = Some(
                snapshot::load(&tmp).with_context(|| format!("bundled {} is unusable", entry.path))?,
            );
        } else {
            database = Some(
                db::load_db(&tmp).with_context(|| format!("bundled {} is unusable", entry.path))?,
            );
        }
    }

    let registry = data
        .or(database)
        .ok_or_else(|| anyhow!("bundle carries no {} or {}", DATA_FILE, DB_FILE))?;
    Ok((BUNDLE_FORMAT_V1.to_string(), registry))
}

fn extract_entry(
    archive: &mut ZipArchive<File>,
    name: &str,
    tmp: &Path,
) -> anyhow::Result<String> {
    let mut entry = archive
        .by_name(name)
        .with_context(|| format!("bundle missing {}", name))?;
    let mut out = File::create(tmp)
        .with_context(|| format!("failed to create temp file {}", tmp.to_string_lossy()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = entry
            .read(&mut buf)
            .with_context(|| format!("failed to extract {}", name))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        out.write_all(&buf[..n])
            .with_context(|| format!("failed to write {}", tmp.to_string_lossy()))?;
    }
    out.flush().context("failed to flush extracted file")?;
    Ok(format!("{:x}", hasher.finalize()))
}

fn is_zip_file(path: &Path) -> anyhow::Result<bool> {
    let mut f = File::open(path)
        .with_context(|| format!("failed to open input file {}", path.to_string_lossy()))?;
    let mut sig = [0u8; 4];
    let read = read_prefix(&mut f, &mut sig).context("failed to read file signature")?;
    if read < 4 {
        return Ok(false);
    }
    Ok(sig == [0x50, 0x4B, 0x03, 0x04])
}

fn read_prefix(r: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}
