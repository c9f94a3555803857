//! Input collection, validation, and text extraction.
//!
//! Paths may be files or directories; directories are walked recursively
//! with hidden entries skipped. Validation failures are never fatal to the
//! pipeline, they are collected as skips and counted.
//!
//! Text and code files are split into 50-line segments so citations can
//! point at a line range. PDFs are extracted page by page.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use ragex_core::{Error, Result};
use ragex_store::{FileKind, Provenance};

/// Maximum accepted input file size.
pub const MAX_FILE_SIZE_BYTES: u64 = 50 * 1024 * 1024;

/// Line window per text/code segment, so citations stay narrow.
pub const LINES_PER_SEGMENT: usize = 50;

const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown"];
const CODE_EXTENSIONS: &[&str] = &[
    "py", "js", "ts", "java", "cpp", "c", "h", "hpp", "html", "css", "json", "yaml", "yml", "xml",
    "sh", "bash", "zsh", "rs", "go", "rb", "php",
];

/// One provenance-tagged span of extracted text, pre-chunking.
#[derive(Debug, Clone)]
pub struct DocumentSegment {
    pub text: String,
    pub filename: String,
    pub file_type: FileKind,
    pub provenance: Provenance,
}

/// Why an input was skipped. Carried for the verbose CLI path and logs.
#[derive(Debug, Clone)]
pub struct SkippedInput {
    pub path: PathBuf,
    pub reason: String,
}

/// Classify a path by extension, if the extension is supported.
pub fn classify(path: &Path) -> Option<FileKind> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    if ext == "pdf" {
        Some(FileKind::Pdf)
    } else if TEXT_EXTENSIONS.contains(&ext.as_str()) {
        Some(FileKind::Text)
    } else if CODE_EXTENSIONS.contains(&ext.as_str()) {
        Some(FileKind::Code)
    } else {
        None
    }
}

/// Resolve a set of input paths to validated files.
///
/// Duplicate paths and files reached through overlapping directories
/// collapse to one logical input. Returns the valid files (sorted, unique)
/// and the skipped inputs.
pub fn collect_inputs(paths: &[PathBuf]) -> (Vec<PathBuf>, Vec<SkippedInput>) {
    let mut valid: BTreeSet<PathBuf> = BTreeSet::new();
    let mut skipped = Vec::new();

    // Dedup the inputs themselves before touching the filesystem.
    let unique: BTreeSet<&PathBuf> = paths.iter().collect();

    for path in unique {
        if !path.exists() {
            skipped.push(SkippedInput {
                path: path.clone(),
                reason: "path does not exist".to_string(),
            });
            continue;
        }
        if path.is_dir() {
            walk_dir(path, &mut valid, &mut skipped);
        } else {
            match validate_file(path) {
                Ok(()) => {
                    valid.insert(canonical(path));
                }
                Err(reason) => skipped.push(SkippedInput {
                    path: path.clone(),
                    reason,
                }),
            }
        }
    }

    (valid.into_iter().collect(), skipped)
}

fn walk_dir(dir: &Path, valid: &mut BTreeSet<PathBuf>, skipped: &mut Vec<SkippedInput>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            skipped.push(SkippedInput {
                path: dir.to_path_buf(),
                reason: format!("cannot read directory: {}", e),
            });
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if is_hidden(&path) {
            continue;
        }
        if path.is_dir() {
            walk_dir(&path, valid, skipped);
        } else {
            match validate_file(&path) {
                Ok(()) => {
                    valid.insert(canonical(&path));
                }
                Err(reason) => {
                    debug!("Skipping {}: {}", path.display(), reason);
                    skipped.push(SkippedInput { path, reason });
                }
            }
        }
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn validate_file(path: &Path) -> std::result::Result<(), String> {
    if classify(path).is_none() {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("(no extension)");
        return Err(format!("unsupported file type: {}", ext));
    }
    let size = fs::metadata(path)
        .map_err(|e| format!("cannot stat file: {}", e))?
        .len();
    if size > MAX_FILE_SIZE_BYTES {
        return Err(format!(
            "file too large: {:.1}MB (max {}MB)",
            size as f64 / (1024.0 * 1024.0),
            MAX_FILE_SIZE_BYTES / (1024 * 1024)
        ));
    }
    Ok(())
}

/// Extract provenance-tagged segments from one validated file.
pub fn load_file(path: &Path) -> Result<Vec<DocumentSegment>> {
    let file_type = classify(path).ok_or_else(|| {
        Error::Internal(format!("unclassified file reached loader: {}", path.display()))
    })?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    match file_type {
        FileKind::Pdf => load_pdf(path, &filename),
        FileKind::Text | FileKind::Code => load_lines(path, &filename, file_type),
    }
}

fn load_pdf(path: &Path, filename: &str) -> Result<Vec<DocumentSegment>> {
    let doc = lopdf::Document::load(path)
        .map_err(|e| Error::Io(std::io::Error::other(format!("PDF load failed: {}", e))))?;

    let mut segments = Vec::new();
    for (page_num, _page_id) in doc.get_pages() {
        match doc.extract_text(&[page_num]) {
            Ok(text) if !text.trim().is_empty() => {
                segments.push(DocumentSegment {
                    text,
                    filename: filename.to_string(),
                    file_type: FileKind::Pdf,
                    provenance: Provenance::Page(page_num),
                });
            }
            Ok(_) => {}
            Err(e) => {
                warn!("No text from {} page {}: {}", filename, page_num, e);
            }
        }
    }
    Ok(segments)
}

fn load_lines(path: &Path, filename: &str, file_type: FileKind) -> Result<Vec<DocumentSegment>> {
    let content = fs::read_to_string(path)?;
    let lines: Vec<&str> = content.lines().collect();

    let mut segments = Vec::new();
    for (i, window) in lines.chunks(LINES_PER_SEGMENT).enumerate() {
        let text = window.join("\n");
        if text.trim().is_empty() {
            continue;
        }
        let start = (i * LINES_PER_SEGMENT + 1) as u32;
        let end = (i * LINES_PER_SEGMENT + window.len()) as u32;
        segments.push(DocumentSegment {
            text,
            filename: filename.to_string(),
            file_type,
            provenance: Provenance::Lines { start, end },
        });
    }
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_classify_extensions() {
        assert_eq!(classify(Path::new("a.pdf")), Some(FileKind::Pdf));
        assert_eq!(classify(Path::new("a.md")), Some(FileKind::Text));
        assert_eq!(classify(Path::new("a.rs")), Some(FileKind::Code));
        assert_eq!(classify(Path::new("a.exe")), None);
        assert_eq!(classify(Path::new("no_extension")), None);
    }

    #[test]
    fn test_collect_skips_unsupported() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        std::fs::write(dir.path().join("tool.exe"), b"\x00\x01").unwrap();

        let (valid, skipped) = collect_inputs(&[dir.path().to_path_buf()]);
        assert_eq!(valid.len(), 1);
        assert_eq!(skipped.len(), 1);
        assert!(skipped[0].reason.contains("unsupported"));
    }

    #[test]
    fn test_collect_dedups_overlapping_paths() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "hello").unwrap();

        // Same file reachable directly and via its directory.
        let (valid, skipped) =
            collect_inputs(&[dir.path().to_path_buf(), file.clone(), file.clone()]);
        assert_eq!(valid.len(), 1);
        assert!(skipped.is_empty());
    }

    #[test]
    fn test_collect_skips_hidden_and_missing() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".hidden.txt"), "secret").unwrap();

        let (valid, skipped) = collect_inputs(&[
            dir.path().to_path_buf(),
            PathBuf::from("/nonexistent/file.txt"),
        ]);
        assert!(valid.is_empty());
        assert_eq!(skipped.len(), 1);
        assert!(skipped[0].reason.contains("does not exist"));
    }

    #[test]
    fn test_line_segments_window() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("long.txt");
        let mut f = std::fs::File::create(&file).unwrap();
        for i in 1..=120 {
            writeln!(f, "line {}", i).unwrap();
        }
        drop(f);

        let segments = load_file(&file).unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].provenance, Provenance::Lines { start: 1, end: 50 });
        assert_eq!(segments[1].provenance, Provenance::Lines { start: 51, end: 100 });
        assert_eq!(segments[2].provenance, Provenance::Lines { start: 101, end: 120 });
    }

    #[test]
    fn test_blank_windows_dropped() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("sparse.txt");
        std::fs::write(&file, "\n\n\n\n").unwrap();

        let segments = load_file(&file).unwrap();
        assert!(segments.is_empty());
    }
}
