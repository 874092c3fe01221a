//! Zip packaging of the extension sources.
//!
//! Declared folders are added recursively and keep their project-relative
//! path inside the archive; declared files are stored under their parent
//! directory, or at the archive root for top-level files.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Errors that can occur while building an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
  #[error("archive source does not exist: {}", path.display())]
  MissingSource { path: PathBuf },

  #[error("failed to walk {}: {message}", path.display())]
  Walk { path: PathBuf, message: String },

  #[error("failed to read {}: {source}", path.display())]
  Read { path: PathBuf, source: io::Error },

  #[error("failed to write archive {}: {source}", path.display())]
  Write { path: PathBuf, source: io::Error },

  #[error("zip error: {0}")]
  Zip(#[from] zip::result::ZipError),

  #[error("archive task failed: {0}")]
  Task(String),
}

/// Build the archive filename: `<name>[-<version>][-beta][-<suffix>].zip`.
pub fn zip_filename(name: &str, version: Option<&str>, beta: bool, platform_suffix: Option<&str>) -> String {
  let mut filename = name.to_string();
  if let Some(version) = version.filter(|v| !v.is_empty()) {
    filename.push('-');
    filename.push_str(version);
  }
  if beta {
    filename.push_str("-beta");
  }
  if let Some(suffix) = platform_suffix.filter(|s| !s.is_empty()) {
    filename.push('-');
    filename.push_str(suffix);
  }
  filename.push_str(".zip");
  filename
}

/// A file to be stored in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
  /// Absolute path of the source file.
  pub source: PathBuf,
  /// Path inside the archive, `/`-separated.
  pub name: String,
}

/// Outcome of writing an archive.
#[derive(Debug, Clone)]
pub struct ArchiveSummary {
  pub path: PathBuf,
  pub entries: usize,
}

/// Convert a project-relative path to an archive entry name.
fn entry_name(relative: &Path) -> String {
  relative
    .components()
    .filter_map(|c| match c {
      Component::Normal(part) => Some(part.to_string_lossy().to_string()),
      _ => None,
    })
    .collect::<Vec<_>>()
    .join("/")
}

/// Resolve declared folders and files into archive entries.
///
/// Folder contents are sorted by path for a deterministic archive.
pub fn collect_entries(root: &Path, folders: &[PathBuf], files: &[PathBuf]) -> Result<Vec<ArchiveEntry>, ArchiveError> {
  let mut entries = Vec::new();

  for folder in folders {
    let folder_path = root.join(folder);
    if !folder_path.is_dir() {
      return Err(ArchiveError::MissingSource { path: folder_path });
    }

    for entry in WalkDir::new(&folder_path).sort_by_file_name() {
      let entry = entry.map_err(|e| ArchiveError::Walk {
        path: folder_path.clone(),
        message: e.to_string(),
      })?;
      if !entry.file_type().is_file() {
        continue;
      }
      let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
      entries.push(ArchiveEntry {
        source: entry.path().to_path_buf(),
        name: entry_name(relative),
      });
    }
  }

  for file in files {
    let file_path = root.join(file);
    if !file_path.is_file() {
      return Err(ArchiveError::MissingSource { path: file_path });
    }
    entries.push(ArchiveEntry {
      source: file_path,
      name: entry_name(file),
    });
  }

  Ok(entries)
}

fn write_zip(target: &Path, entries: &[ArchiveEntry]) -> Result<(), ArchiveError> {
  let write_err = |source| ArchiveError::Write {
    path: target.to_path_buf(),
    source,
  };

  let file = File::create(target).map_err(write_err)?;
  let mut writer = ZipWriter::new(BufWriter::new(file));
  let options = SimpleFileOptions::default()
    .compression_method(CompressionMethod::Deflated)
    .unix_permissions(0o644);

  for entry in entries {
    debug!(name = %entry.name, "adding archive entry");
    writer.start_file(entry.name.as_str(), options)?;
    let mut source = File::open(&entry.source).map_err(|source| ArchiveError::Read {
      path: entry.source.clone(),
      source,
    })?;
    io::copy(&mut source, &mut writer).map_err(write_err)?;
  }

  writer.finish()?.flush().map_err(write_err)?;
  Ok(())
}

/// Write `entries` to a new zip at `target`, replacing any existing file.
pub async fn create_archive(target: &Path, entries: Vec<ArchiveEntry>) -> Result<ArchiveSummary, ArchiveError> {
  let count = entries.len();
  let path = target.to_path_buf();
  let task_path = path.clone();

  tokio::task::spawn_blocking(move || write_zip(&task_path, &entries))
    .await
    .map_err(|e| ArchiveError::Task(e.to_string()))??;

  info!(path = %path.display(), entries = count, "archive written");
  Ok(ArchiveSummary { path, entries: count })
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Read;
  use tempfile::TempDir;

  fn project() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    std::fs::create_dir_all(root.join("src/popup")).unwrap();
    std::fs::create_dir_all(root.join("icons")).unwrap();
    std::fs::write(root.join("manifest.json"), "{}").unwrap();
    std::fs::write(root.join("src/background.js"), "bg").unwrap();
    std::fs::write(root.join("src/popup/popup.html"), "<html>").unwrap();
    std::fs::write(root.join("icons/icon.svg"), "<svg/>").unwrap();
    std::fs::write(root.join("icons/LICENSE"), "MIT").unwrap();
    temp
  }

  #[test]
  fn filename_variants() {
    assert_eq!(zip_filename("tab-counter", None, false, None), "tab-counter.zip");
    assert_eq!(zip_filename("tab-counter", Some("1.2.0"), false, None), "tab-counter-1.2.0.zip");
    assert_eq!(zip_filename("tab-counter", Some("1.2.0"), true, None), "tab-counter-1.2.0-beta.zip");
    assert_eq!(
      zip_filename("tab-counter", Some("1.2.0"), true, Some("chrome")),
      "tab-counter-1.2.0-beta-chrome.zip"
    );
    assert_eq!(zip_filename("tab-counter", Some(""), true, Some("fx")), "tab-counter-beta-fx.zip");
  }

  #[test]
  fn entries_mirror_declared_layout() {
    let temp = project();
    let entries = collect_entries(
      temp.path(),
      &[PathBuf::from("src")],
      &[PathBuf::from("manifest.json"), PathBuf::from("icons/icon.svg")],
    )
    .unwrap();

    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(
      names,
      vec!["src/background.js", "src/popup/popup.html", "manifest.json", "icons/icon.svg"]
    );
  }

  #[test]
  fn missing_sources_are_errors() {
    let temp = project();
    assert!(matches!(
      collect_entries(temp.path(), &[PathBuf::from("lib")], &[]),
      Err(ArchiveError::MissingSource { .. })
    ));
    assert!(matches!(
      collect_entries(temp.path(), &[], &[PathBuf::from("README.md")]),
      Err(ArchiveError::MissingSource { .. })
    ));
  }

  #[test]
  fn dot_prefixed_files_land_at_root() {
    let temp = project();
    let entries = collect_entries(temp.path(), &[], &[PathBuf::from("./manifest.json")]).unwrap();
    assert_eq!(entries[0].name, "manifest.json");
  }

  #[tokio::test]
  async fn writes_readable_zip() {
    let temp = project();
    let entries = collect_entries(temp.path(), &[PathBuf::from("icons")], &[PathBuf::from("manifest.json")]).unwrap();
    let target = temp.path().join("tab-counter.zip");

    let summary = create_archive(&target, entries).await.unwrap();
    assert_eq!(summary.entries, 3);

    let mut archive = zip::ZipArchive::new(File::open(&target).unwrap()).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(names, vec!["icons/LICENSE", "icons/icon.svg", "manifest.json"]);

    let mut content = String::new();
    archive
      .by_name("icons/icon.svg")
      .unwrap()
      .read_to_string(&mut content)
      .unwrap();
    assert_eq!(content, "<svg/>");
  }
}
