//! Corpus loading.

use anyhow::{bail, Context, Result};
use chunkbench_core::CorpusDocument;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const EXTENSIONS: [&str; 3] = ["md", "markdown", "txt"];

/// Load every document named by `paths`.
///
/// Files are taken as given, whatever their extension. Directories are
/// walked recursively for markdown and text files, skipping hidden entries;
/// their documents are identified by the path relative to that directory.
pub fn load_corpus(paths: &[PathBuf]) -> Result<Vec<CorpusDocument>> {
    let mut documents = Vec::new();

    for path in paths {
        if path.is_file() {
            let id = path
                .file_name()
                .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().to_string());
            documents.push(read_document(path, id)?);
        } else if path.is_dir() {
            let mut files = Vec::new();
            visit_dir(path, &mut files);
            files.sort();
            for file in files {
                let id = relative_id(path, &file);
                documents.push(read_document(&file, id)?);
            }
        } else {
            bail!("Path does not exist: {}", path.display());
        }
    }

    if documents.is_empty() {
        bail!("No .md, .markdown or .txt documents found");
    }
    debug!("Loaded {} documents", documents.len());
    Ok(documents)
}

fn read_document(path: &Path, id: String) -> Result<CorpusDocument> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(CorpusDocument::new(id, text))
}

fn visit_dir(dir: &Path, files: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!("Cannot read directory {:?}: {}", dir, e);
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }

        if path.is_dir() {
            visit_dir(&path, files);
        } else if path.is_file() && has_text_extension(&path) {
            files.push(path);
        }
    }
}

fn has_text_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// `/`-separated path of `file` below `root`.
fn relative_id(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_walks_directories() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("guide/deep")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("README.md"), "# Readme").unwrap();
        fs::write(root.join("guide/intro.markdown"), "Intro").unwrap();
        fs::write(root.join("guide/deep/notes.TXT"), "Notes").unwrap();
        fs::write(root.join("guide/image.png"), "binary").unwrap();
        fs::write(root.join(".git/HEAD.md"), "hidden").unwrap();
        fs::write(root.join(".draft.md"), "hidden").unwrap();

        let docs = load_corpus(&[root.to_path_buf()]).unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.document_id.as_str()).collect();
        assert_eq!(ids, vec!["README.md", "guide/deep/notes.TXT", "guide/intro.markdown"]);
        assert_eq!(docs[0].text, "# Readme");
    }

    #[test]
    fn test_explicit_files_keep_any_extension() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("notes.rst");
        fs::write(&file, "Title\n=====").unwrap();

        let docs = load_corpus(&[file]).unwrap();
        assert_eq!(docs[0].document_id, "notes.rst");
    }

    #[test]
    fn test_missing_path() {
        let dir = tempdir().unwrap();
        assert!(load_corpus(&[dir.path().join("nope")]).is_err());
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempdir().unwrap();
        let err = load_corpus(&[dir.path().to_path_buf()]).unwrap_err();
        assert!(err.to_string().contains("No .md"));
    }
}
