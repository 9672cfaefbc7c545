//! Writing extracted artifacts to disk.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracksift_media::Extraction;

/// A file written by [`write_extraction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub bytes: usize,
}

/// Write every artifact (and optionally every attachment) into `dir`.
///
/// Never overwrites: a name already used in this run or already present on
/// disk gets a ` (2)`, ` (3)`, ... suffix before its extension.
pub fn write_extraction(
    extraction: &Extraction,
    dir: &Path,
    include_attachments: bool,
) -> Result<Vec<WrittenFile>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {:?}", dir))?;

    let mut taken = HashSet::new();
    let mut written = Vec::new();

    let files = extraction
        .artifacts
        .iter()
        .map(|artifact| (artifact.name(), artifact.data()));
    let attachments = extraction
        .attachments
        .iter()
        .filter(|_| include_attachments)
        .map(|attachment| (attachment.name.as_str(), &attachment.data[..]));

    for (name, data) in files.chain(attachments) {
        let path = unique_path(dir, &sanitize_file_name(name), &mut taken);
        fs::write(&path, data).with_context(|| format!("Failed to write {:?}", path))?;
        tracing::debug!("Wrote {} bytes to {:?}", data.len(), path);
        written.push(WrittenFile {
            path,
            bytes: data.len(),
        });
    }

    Ok(written)
}

/// Reduce a container-supplied name to a single safe path component.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.');

    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned.to_string()
    }
}

fn unique_path(dir: &Path, name: &str, taken: &mut HashSet<PathBuf>) -> PathBuf {
    let (stem, extension) = match name.rfind('.') {
        Some(dot) if dot > 0 => (&name[..dot], &name[dot..]),
        _ => (name, ""),
    };

    let mut candidate = dir.join(name);
    let mut n = 2;
    while taken.contains(&candidate) || candidate.exists() {
        candidate = dir.join(format!("{} ({}){}", stem, n, extension));
        n += 1;
    }
    taken.insert(candidate.clone());
    candidate
}
