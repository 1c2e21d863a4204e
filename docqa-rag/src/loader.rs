//! Document loading and discovery.
//!
//! Only plain UTF-8 text formats are read here; richer formats are expected
//! to be converted to text by a dedicated [`DocumentLoader`] implementation.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::document::Document;
use crate::error::{RagError, Result};

/// File extensions understood by [`TextFileLoader`].
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["txt", "md", "markdown"];

/// A file to ingest together with the name users should see for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub display_name: String,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, display_name: impl Into<String>) -> Self {
        Self { path: path.into(), display_name: display_name.into() }
    }

    /// Use the file name component of `path` as the display name.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { path, display_name }
    }
}

/// Reads one file into zero or more [`Document`]s.
pub trait DocumentLoader: Send + Sync {
    /// Load the file at `path`, tagging every document with `display_name`
    /// and the file type.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Loader`] if the file cannot be read or its format
    /// is not supported.
    fn load(&self, path: &Path, display_name: &str) -> Result<Vec<Document>>;
}

/// Loads `.txt` and markdown files as a single document each.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextFileLoader;

impl DocumentLoader for TextFileLoader {
    fn load(&self, path: &Path, display_name: &str) -> Result<Vec<Document>> {
        let extension = file_extension(path);
        if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(RagError::Loader {
                path: path.display().to_string(),
                message: format!("unsupported file type: '.{extension}'"),
            });
        }

        let text = fs::read_to_string(path).map_err(|e| RagError::Loader {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        Ok(vec![Document {
            name: display_name.to_string(),
            source_path: path.to_path_buf(),
            file_type: format!(".{extension}"),
            text,
        }])
    }
}

/// Load every file in `files`, skipping the ones that fail.
///
/// A failing file is logged and dropped; it never aborts the batch.
pub fn load_documents(loader: &dyn DocumentLoader, files: &[SourceFile]) -> Vec<Document> {
    let mut documents = Vec::new();
    for file in files {
        match loader.load(&file.path, &file.display_name) {
            Ok(loaded) => {
                info!(file = %file.display_name, sections = loaded.len(), "loaded document");
                documents.extend(loaded);
            }
            Err(e) => {
                warn!(file = %file.display_name, error = %e, "skipping unreadable document");
            }
        }
    }
    documents
}

/// Collect supported files under `root`, sorted by path.
///
/// A plain file path is returned as-is when its extension is supported.
/// Display names are paths relative to `root`.
pub fn discover_documents(root: impl AsRef<Path>) -> Result<Vec<SourceFile>> {
    let root = root.as_ref();
    if root.is_file() {
        return Ok(vec![SourceFile::from_path(root)]);
    }
    if !root.is_dir() {
        return Err(RagError::Loader {
            path: root.display().to_string(),
            message: "no such file or directory".to_string(),
        });
    }

    let mut files = WalkDir::new(root)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| SUPPORTED_EXTENSIONS.contains(&file_extension(entry.path()).as_str()))
        .map(|entry| {
            let display_name = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .into_owned();
            SourceFile::new(entry.into_path(), display_name)
        })
        .collect::<Vec<_>>();

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

fn file_extension(path: &Path) -> String {
    path.extension().map(|ext| ext.to_string_lossy().to_lowercase()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_text_and_markdown_with_file_type() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("Guide.MD");
        fs::write(&path, "# Title\nBody").unwrap();

        let docs = TextFileLoader.load(&path, "guide").unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].name, "guide");
        assert_eq!(docs[0].file_type, ".md");
        assert_eq!(docs[0].text, "# Title\nBody");
    }

    #[test]
    fn rejects_unsupported_extension() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("report.pdf");
        fs::write(&path, "%PDF").unwrap();

        let err = TextFileLoader.load(&path, "report.pdf").unwrap_err();
        assert!(matches!(err, RagError::Loader { .. }));
    }

    #[test]
    fn batch_load_skips_failures() {
        let temp = tempfile::tempdir().unwrap();
        let good = temp.path().join("a.txt");
        fs::write(&good, "alpha").unwrap();

        let files = vec![
            SourceFile::from_path(temp.path().join("missing.txt")),
            SourceFile::from_path(&good),
            SourceFile::from_path(temp.path().join("image.png")),
        ];
        let docs = load_documents(&TextFileLoader, &files);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].name, "a.txt");
    }

    #[test]
    fn discovers_supported_files_recursively() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::write(root.join("b.md"), "b").unwrap();
        fs::write(root.join("nested/a.txt"), "a").unwrap();
        fs::write(root.join("notes.pdf"), "ignore").unwrap();

        let files = discover_documents(root).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().any(|f| f.display_name == "b.md"));
        assert!(files.iter().all(|f| !f.display_name.ends_with(".pdf")));
    }

    #[test]
    fn discover_reports_missing_root() {
        let temp = tempfile::tempdir().unwrap();
        assert!(discover_documents(temp.path().join("nope")).is_err());
    }
}
