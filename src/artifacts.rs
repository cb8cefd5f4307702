//! Artifact layout and persistence.
//!
//! Every output path is a pure function of a unit's identity, which is what
//! makes a re-run after a crash find exactly the markers the previous run
//! left behind:
//!
//! ```text
//! <root>/<stem>_complete.md              combined document
//! <root>/<stem>/<stem>_page_<n>.md       one page (n is 1-based)
//! <root>/image_ocr/<stem>.md             one standalone image
//! ```
//!
//! Writes go to a temporary file in the target directory and are renamed
//! into place, so a half-written file can never pose as a completion marker.

use crate::error::UnitError;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Directory (under the root) holding standalone-image artifacts.
pub const IMAGE_DIR: &str = "image_ocr";

/// Separator between pages in a combined artifact.
pub const PAGE_SEPARATOR: &str = "\n\n---\n\n";

/// Maps unit identities to artifact paths under one root.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the per-page artifacts of a document.
    pub fn document_dir(&self, stem: &str) -> PathBuf {
        self.root.join(stem)
    }

    /// Per-page artifact for the 0-based `page_index`.
    pub fn page_artifact(&self, stem: &str, page_index: usize) -> PathBuf {
        self.document_dir(stem)
            .join(format!("{}_page_{}.md", stem, page_index + 1))
    }

    /// Combined artifact; its presence marks the document as done.
    pub fn complete_artifact(&self, stem: &str) -> PathBuf {
        self.root.join(format!("{stem}_complete.md"))
    }

    /// Artifact for a standalone image.
    pub fn image_artifact(&self, stem: &str) -> PathBuf {
        self.root.join(IMAGE_DIR).join(format!("{stem}.md"))
    }
}

/// File stem used as a unit's identity (`scan.01.pdf` → `scan.01`).
pub fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Whether the completion marker at `path` exists.
pub fn is_done(path: &Path) -> bool {
    path.is_file()
}

/// Read a persisted artifact.
pub fn read_artifact(path: &Path) -> std::io::Result<String> {
    std::fs::read_to_string(path)
}

/// Write `text` to `path` atomically, creating the parent directory.
pub fn write_artifact(path: &Path, text: &str) -> Result<(), UnitError> {
    let persist_err = |source: std::io::Error| UnitError::Persist {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(persist_err)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".tmp_")
        .suffix(".md")
        .tempfile_in(parent)
        .map_err(persist_err)?;
    tmp.write_all(text.as_bytes()).map_err(persist_err)?;
    tmp.as_file().sync_all().map_err(persist_err)?;
    tmp.persist(path).map_err(|e| persist_err(e.error))?;
    Ok(())
}

/// Join page texts in order, dropping empty ones.
pub fn assemble<'a>(pages: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let parts: Vec<&str> = pages.into_iter().filter(|t| !t.is_empty()).collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(PAGE_SEPARATOR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_derive_from_identity() {
        let layout = ArtifactLayout::new("/work");
        assert_eq!(layout.document_dir("book"), PathBuf::from("/work/book"));
        assert_eq!(
            layout.page_artifact("book", 0),
            PathBuf::from("/work/book/book_page_1.md")
        );
        assert_eq!(
            layout.page_artifact("book", 11),
            PathBuf::from("/work/book/book_page_12.md")
        );
        assert_eq!(
            layout.complete_artifact("book"),
            PathBuf::from("/work/book_complete.md")
        );
        assert_eq!(
            layout.image_artifact("receipt"),
            PathBuf::from("/work/image_ocr/receipt.md")
        );
    }

    #[test]
    fn stem_keeps_inner_dots() {
        assert_eq!(stem_of(Path::new("/w/scan.01.pdf")), "scan.01");
        assert_eq!(stem_of(Path::new("photo.JPG")), "photo");
    }

    #[test]
    fn write_creates_parent_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc").join("doc_page_1.md");
        write_artifact(&path, "hello").unwrap();
        assert_eq!(read_artifact(&path).unwrap(), "hello");
        assert!(is_done(&path));

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("doc"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".tmp_"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn write_replaces_existing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.md");
        write_artifact(&path, "old").unwrap();
        write_artifact(&path, "new").unwrap();
        assert_eq!(read_artifact(&path).unwrap(), "new");
    }

    #[test]
    fn directory_is_not_a_marker() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_done(dir.path()));
    }

    #[test]
    fn assemble_joins_non_empty_pages_in_order() {
        assert_eq!(
            assemble(["one", "", "three"]).unwrap(),
            "one\n\n---\n\nthree"
        );
        assert_eq!(assemble(["only"]).unwrap(), "only");
        assert!(assemble(["", ""]).is_none());
        assert!(assemble(Vec::<&str>::new()).is_none());
    }
}
