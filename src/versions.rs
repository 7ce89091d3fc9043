//! Document version store.
//!
//! Keeps exactly one current normalized file per document type and an
//! archive of every version it replaced:
//!
//! ```text
//! <data.dir>/
//! ├── document_config.json
//! ├── current/
//! │   ├── faq_latest.txt
//! │   ├── tender_notice_latest.txt
//! │   └── terms_latest.txt
//! └── archive/
//!     ├── faq_20240326_101500_123456.txt
//!     └── ...
//! ```
//!
//! Updating a type archives the existing current file first, then writes the
//! newly normalized text through a temp file and a rename, so a reader
//! never sees a half-written current version. Archive names come from the
//! type's chrono `archive_pattern`; a `~N` suffix keeps two updates within
//! the same microsecond from overwriting each other.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use tender_harness_core::models::{DocType, ProcessedDocument, RawDocument};
use tender_harness_core::normalize::Normalizer;
use tender_harness_core::{Error, Result};

use crate::extract;

pub const CONFIG_FILE: &str = "document_config.json";

/// Per-type record in `document_config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTypeConfig {
    /// Relative to the data directory.
    pub current_file: String,
    /// chrono format string for archive file names inside `archive/`.
    pub archive_pattern: String,
    /// Normalizer name (see [`Normalizer::from_name`]).
    pub preprocessor: String,
    pub description: String,
}

impl DocumentTypeConfig {
    fn default_for(doc_type: DocType) -> Option<Self> {
        let (current, archive, description) = match doc_type {
            DocType::Faq => (
                "current/faq_latest.txt",
                "faq_%Y%m%d_%H%M%S_%6f.txt",
                "Frequently Asked Questions document",
            ),
            DocType::TenderNotice => (
                "current/tender_notice_latest.txt",
                "tender_notice_%Y%m%d_%H%M%S_%6f.txt",
                "Current tender notice",
            ),
            DocType::TermsAndConditions => (
                "current/terms_latest.txt",
                "terms_%Y%m%d_%H%M%S_%6f.txt",
                "Terms and conditions document",
            ),
            DocType::ReferenceGuide | DocType::General => return None,
        };
        Some(Self {
            current_file: current.to_string(),
            archive_pattern: archive.to_string(),
            preprocessor: doc_type.as_str().to_string(),
            description: description.to_string(),
        })
    }

    /// Literal file-name prefix shared by every archive of this type.
    fn archive_prefix(&self) -> &str {
        self.archive_pattern
            .split('%')
            .next()
            .unwrap_or(&self.archive_pattern)
    }
}

/// Current and archived files for one type.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentVersions {
    pub current: Option<PathBuf>,
    /// Newest first.
    pub archived: Vec<PathBuf>,
}

/// Configuration plus on-disk status for one type.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    #[serde(rename = "type")]
    pub doc_type: DocType,
    #[serde(flatten)]
    pub config: DocumentTypeConfig,
    pub current_version_exists: bool,
    /// Local modification time of the current file, `%Y-%m-%d %H:%M:%S`.
    pub last_updated: Option<String>,
}

pub struct VersionStore {
    data_dir: PathBuf,
    archive_dir: PathBuf,
    config: BTreeMap<DocType, DocumentTypeConfig>,
}

impl VersionStore {
    /// Open (or initialize) the store rooted at `data_dir`.
    ///
    /// Missing default entries are added and persisted. A config file that
    /// exists but cannot be parsed is an error; it is never overwritten.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let current_dir = data_dir.join("current");
        let archive_dir = data_dir.join("archive");
        std::fs::create_dir_all(&current_dir)?;
        std::fs::create_dir_all(&archive_dir)?;

        let config_path = data_dir.join(CONFIG_FILE);
        let mut config = if config_path.exists() {
            read_config(&config_path)?
        } else {
            BTreeMap::new()
        };

        let mut added = false;
        for doc_type in DocType::ALL {
            if config.contains_key(&doc_type) {
                continue;
            }
            if let Some(default) = DocumentTypeConfig::default_for(doc_type) {
                config.insert(doc_type, default);
                added = true;
            }
        }
        if added {
            write_atomic(&config_path, &serde_json::to_string_pretty(&config)?)?;
            tracing::info!(path = %config_path.display(), "wrote default document configuration");
        }

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            archive_dir,
            config,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Configured types, in display order.
    pub fn document_types(&self) -> Vec<DocType> {
        self.config.keys().copied().collect()
    }

    pub fn type_config(&self, doc_type: DocType) -> Result<&DocumentTypeConfig> {
        self.config
            .get(&doc_type)
            .ok_or_else(|| Error::UnknownDocumentType(doc_type.to_string()))
    }

    fn current_path(&self, config: &DocumentTypeConfig) -> PathBuf {
        self.data_dir.join(&config.current_file)
    }

    /// Replace the current version of `doc_type` with a normalized copy of
    /// the file at `raw_path`.
    ///
    /// The raw file is read and normalized before anything on disk changes,
    /// so a failed extraction leaves the store untouched.
    pub fn update_document(&self, doc_type: DocType, raw_path: &Path) -> Result<ProcessedDocument> {
        let config = self.type_config(doc_type)?;
        if !raw_path.is_file() {
            return Err(Error::SourceFileMissing(raw_path.to_path_buf()));
        }

        let normalizer = Normalizer::from_name(&config.preprocessor).unwrap_or_else(|| {
            tracing::warn!(
                preprocessor = %config.preprocessor,
                doc_type = %doc_type,
                "unknown preprocessor, using the type default"
            );
            Normalizer::for_type(doc_type)
        });

        let text = extract::read_source(raw_path)?;
        let source = raw_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| doc_type.to_string());
        let processed = normalizer.process(&RawDocument::new(source, text, doc_type));

        let current = self.current_path(config);
        if current.exists() {
            let archived = self.archive(&current, config)?;
            tracing::info!(
                doc_type = %doc_type,
                archive = %archived.display(),
                "archived current version"
            );
        }

        write_atomic(&current, &processed.content)?;
        tracing::info!(
            doc_type = %doc_type,
            source = %raw_path.display(),
            bytes = processed.content.len(),
            "updated current version"
        );
        Ok(processed)
    }

    fn archive(&self, current: &Path, config: &DocumentTypeConfig) -> Result<PathBuf> {
        let mut name = String::new();
        write!(name, "{}", Local::now().format(&config.archive_pattern)).map_err(|_| {
            Error::Config(format!("invalid archive_pattern '{}'", config.archive_pattern))
        })?;

        let mut target = self.archive_dir.join(&name);
        let mut counter = 1;
        while target.exists() {
            target = self.archive_dir.join(with_counter(&name, counter));
            counter += 1;
        }

        std::fs::copy(current, &target)?;
        Ok(target)
    }

    /// Path of the current version, if one has been stored.
    pub fn get_current_file(&self, doc_type: DocType) -> Option<PathBuf> {
        let config = self.config.get(&doc_type)?;
        let path = self.current_path(config);
        path.is_file().then_some(path)
    }

    /// Current and archived files for every configured type.
    pub fn list_documents(&self) -> Result<BTreeMap<DocType, DocumentVersions>> {
        let mut archive_names = Vec::new();
        for entry in std::fs::read_dir(&self.archive_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                archive_names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        let mut result = BTreeMap::new();
        for (doc_type, config) in &self.config {
            let prefix = config.archive_prefix();
            let mut archived: Vec<&String> = archive_names
                .iter()
                .filter(|name| name.starts_with(prefix))
                .collect();
            archived.sort_by(|a, b| archive_sort_key(b).cmp(&archive_sort_key(a)));

            result.insert(
                *doc_type,
                DocumentVersions {
                    current: self.get_current_file(*doc_type),
                    archived: archived
                        .into_iter()
                        .map(|name| self.archive_dir.join(name))
                        .collect(),
                },
            );
        }
        Ok(result)
    }

    pub fn get_document_info(&self, doc_type: DocType) -> Result<DocumentInfo> {
        let config = self.type_config(doc_type)?;
        let current = self.current_path(config);

        let last_updated = match std::fs::metadata(&current) {
            Ok(meta) if meta.is_file() => {
                let modified: DateTime<Local> = meta.modified()?.into();
                Some(modified.format("%Y-%m-%d %H:%M:%S").to_string())
            }
            _ => None,
        };

        Ok(DocumentInfo {
            doc_type,
            config: config.clone(),
            current_version_exists: last_updated.is_some(),
            last_updated,
        })
    }
}

fn read_config(path: &Path) -> Result<BTreeMap<DocType, DocumentTypeConfig>> {
    let text = std::fs::read_to_string(path)?;
    let entries: BTreeMap<String, DocumentTypeConfig> = serde_json::from_str(&text)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

    let mut config = BTreeMap::new();
    for (name, entry) in entries {
        match name.parse::<DocType>() {
            Ok(doc_type) => {
                config.insert(doc_type, entry);
            }
            Err(_) => tracing::warn!(name = %name, "ignoring unknown document type in config"),
        }
    }
    Ok(config)
}

/// `faq_x.txt` + 2 → `faq_x~2.txt`.
fn with_counter(name: &str, counter: u32) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) => format!("{}~{}.{}", stem, counter, ext),
        None => format!("{}~{}", name, counter),
    }
}

/// Timestamp part, then collision counter.
fn archive_sort_key(name: &str) -> (&str, u32) {
    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    match stem.rsplit_once('~') {
        Some((base, counter)) => (base, counter.parse().unwrap_or(0)),
        None => (stem, 0),
    }
}

/// Write through a sibling temp file and rename over `path`.
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_counter() {
        assert_eq!(with_counter("faq_1.txt", 2), "faq_1~2.txt");
        assert_eq!(with_counter("faq_1", 1), "faq_1~1");
    }

    #[test]
    fn test_archive_sort_key_orders_counters_numerically() {
        let mut names = vec![
            "faq_20240101_000000_000001~10.txt",
            "faq_20240101_000000_000001.txt",
            "faq_20240102_000000_000000.txt",
            "faq_20240101_000000_000001~2.txt",
        ];
        names.sort_by(|a, b| archive_sort_key(b).cmp(&archive_sort_key(a)));
        assert_eq!(
            names,
            vec![
                "faq_20240102_000000_000000.txt",
                "faq_20240101_000000_000001~10.txt",
                "faq_20240101_000000_000001~2.txt",
                "faq_20240101_000000_000001.txt",
            ]
        );
    }

    #[test]
    fn test_archive_prefix() {
        let config = DocumentTypeConfig::default_for(DocType::TenderNotice).unwrap();
        assert_eq!(config.archive_prefix(), "tender_notice_");
    }
}
