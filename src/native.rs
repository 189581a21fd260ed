//! Filesystem collaborators for native hosts.
//!
//! [`FsPersistence`] reads and writes annotation files next to the images,
//! [`FolderClassNames`] collects previously used labels from a folder, and
//! [`build_report`] summarizes a folder for the `qcedit-native` tool.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::format::codec_for;
use crate::model::QcMode;
use crate::persistence::{AnnotationPersistence, ClassNameSource, PersistenceError};

/// Optional per-folder list of class names, one per line.
pub const CLASSES_FILENAME: &str = "classes.txt";

/// Annotation storage on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsPersistence;

impl AnnotationPersistence for FsPersistence {
    fn read_annotation(&self, path: &Path) -> Result<Option<String>, PersistenceError> {
        if !path.is_file() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            log::debug!("Annotation file {:?} is empty", path);
            return Ok(None);
        }
        Ok(Some(content))
    }

    fn write_annotation(&self, path: &Path, content: &str) -> Result<(), PersistenceError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        log::debug!("Wrote {} bytes to {:?}", content.len(), path);
        Ok(())
    }
}

/// Class names found in one annotation folder.
#[derive(Debug, Clone)]
pub struct FolderClassNames {
    folder: PathBuf,
}

impl FolderClassNames {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }
}

impl ClassNameSource for FolderClassNames {
    fn class_names(&self, mode: QcMode) -> Result<Vec<String>, PersistenceError> {
        let mut names = read_classes_file(&self.folder.join(CLASSES_FILENAME))?;
        for (path, result) in scan_annotations(&self.folder, mode)? {
            match result {
                Ok(found) => names.extend(found),
                Err(e) => log::warn!("Skipping {:?}: {}", path, e),
            }
        }
        names.sort();
        names.dedup();
        Ok(names)
    }
}

fn read_classes_file(path: &Path) -> Result<Vec<String>, PersistenceError> {
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Annotation files of the mode's format in `folder`, sorted, non-recursive.
fn annotation_files(folder: &Path, mode: QcMode) -> Result<Vec<PathBuf>, PersistenceError> {
    let extensions = codec_for(mode).extensions();
    let mut files: Vec<PathBuf> = std::fs::read_dir(folder)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| extensions.contains(&ext.to_ascii_lowercase().as_str()))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Shape names per annotation file. Per-file failures are returned, not propagated.
fn scan_annotations(
    folder: &Path,
    mode: QcMode,
) -> Result<Vec<(PathBuf, Result<Vec<String>, PersistenceError>)>, PersistenceError> {
    let codec = codec_for(mode);
    Ok(annotation_files(folder, mode)?
        .into_iter()
        .map(|path| {
            let names = std::fs::read_to_string(&path)
                .map_err(PersistenceError::from)
                .and_then(|raw| codec.parse(&raw).map_err(PersistenceError::from))
                .map(|parsed| parsed.shapes.into_iter().map(|s| s.name).collect());
            (path, names)
        })
        .collect())
}

/// Per-file entry of a [`QcReport`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub file: String,
    pub object_count: usize,
    /// Distinct labels, sorted
    pub names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub total_files: usize,
    pub total_objects: usize,
}

/// Object counts for every readable annotation file in a folder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QcReport {
    pub mode: &'static str,
    pub files: Vec<FileReport>,
    pub summary: ReportSummary,
}

/// Summarize the annotation files of `folder`. Unreadable files are skipped.
pub fn build_report(folder: &Path, mode: QcMode) -> Result<QcReport, PersistenceError> {
    let mut files = Vec::new();
    for (path, result) in scan_annotations(folder, mode)? {
        let names = match result {
            Ok(names) => names,
            Err(e) => {
                log::warn!("Skipping {:?} in report: {}", path, e);
                continue;
            }
        };
        let object_count = names.len();
        let mut distinct = names;
        distinct.sort();
        distinct.dedup();
        files.push(FileReport {
            file: path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default(),
            object_count,
            names: distinct,
        });
    }

    let summary = ReportSummary {
        total_files: files.len(),
        total_objects: files.iter().map(|f| f.object_count).sum(),
    };
    log::info!(
        "📋 Report for {:?}: {} files, {} objects",
        folder,
        summary.total_files,
        summary.total_objects
    );
    Ok(QcReport {
        mode: mode.name(),
        files,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOXES: &str = r#"<annotation>
  <object><name>car</name><bndbox><xmin>1</xmin><ymin>1</ymin><xmax>9</xmax><ymax>9</ymax></bndbox></object>
  <object><name>bus</name><bndbox><xmin>2</xmin><ymin>2</ymin><xmax>8</xmax><ymax>8</ymax></bndbox></object>
  <object><name>car</name><bndbox><xmin>3</xmin><ymin>3</ymin><xmax>7</xmax><ymax>7</ymax></bndbox></object>
</annotation>"#;

    fn temp_folder(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("qcedit-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_missing_and_empty_files_read_as_none() {
        let dir = temp_folder("read-none");
        let persistence = FsPersistence;
        assert!(persistence.read_annotation(&dir.join("nope.xml")).unwrap().is_none());

        std::fs::write(dir.join("empty.xml"), "  \n").unwrap();
        assert!(persistence.read_annotation(&dir.join("empty.xml")).unwrap().is_none());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_write_creates_parent_folders() {
        let dir = temp_folder("write");
        let path = dir.join("nested").join("IMG_1.xml");
        let persistence = FsPersistence;
        persistence.write_annotation(&path, BOXES).unwrap();
        assert_eq!(persistence.read_annotation(&path).unwrap().as_deref(), Some(BOXES));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_class_names_from_folder() {
        let dir = temp_folder("classes");
        std::fs::write(dir.join("a.xml"), BOXES).unwrap();
        std::fs::write(dir.join("broken.xml"), "<annotation><object>").unwrap();
        std::fs::write(dir.join("notes.json"), "{}").unwrap();
        std::fs::write(dir.join(CLASSES_FILENAME), "# labels\ntruck\n\n  car \n").unwrap();

        let names = FolderClassNames::new(&dir).class_names(QcMode::Detection).unwrap();
        assert_eq!(names, vec!["bus", "car", "truck"]);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_class_names_missing_folder_is_error() {
        let dir = std::env::temp_dir().join("qcedit-does-not-exist-anywhere");
        assert!(FolderClassNames::new(dir).class_names(QcMode::Detection).is_err());
    }

    #[test]
    fn test_report_counts_objects() {
        let dir = temp_folder("report");
        std::fs::write(dir.join("a.xml"), BOXES).unwrap();
        std::fs::write(dir.join("b.xml"), "<annotation></annotation>").unwrap();
        std::fs::write(dir.join("c.xml"), "<annotation><object>").unwrap();

        let report = build_report(&dir, QcMode::Detection).unwrap();
        assert_eq!(report.mode, QcMode::Detection.name());
        assert_eq!(report.summary.total_files, 2);
        assert_eq!(report.summary.total_objects, 3);
        assert_eq!(report.files[0].file, "a.xml");
        assert_eq!(report.files[0].names, vec!["bus", "car"]);
        assert_eq!(report.files[1].object_count, 0);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["summary"]["total_objects"], 3);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
