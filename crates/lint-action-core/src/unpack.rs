//! Archive extraction with a bounded worker pool.
//!
//! Archive-packages are unpacked into the invocation's working area up front
//! so the engine reads pre-expanded directories instead of racing other
//! invocations on a shared unpack cache.

use crate::config::UnpackSettings;

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Suffix appended to an archive's file name to name its extraction directory.
pub const EXTRACTION_MARKER: &str = "-aar-contents";

/// File name of the custom rule bundle an archive may carry.
pub const RULE_BUNDLE_NAME: &str = "lint.jar";

/// Bytes copied between cancellation checks.
const COPY_CHUNK: usize = 64 * 1024;

/// Errors that can occur while unpacking archives.
#[derive(Debug, Error)]
pub enum UnpackError {
    /// The archive could not be opened.
    #[error("Failed to open archive {archive}: {source}")]
    Open {
        /// Archive path.
        archive: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The archive could not be read or extracted.
    #[error("Failed to extract {archive}: {source}")]
    Extract {
        /// Archive path.
        archive: PathBuf,
        /// Underlying zip error.
        source: zip::result::ZipError,
    },

    /// An archive entry would land outside its extraction directory.
    #[error("Archive {archive} contains unsafe entry {entry}")]
    UnsafeEntry {
        /// Archive path.
        archive: PathBuf,
        /// Entry name as stored in the archive.
        entry: String,
    },

    /// An extracted file could not be written.
    #[error("Failed to write {path}: {source}")]
    Write {
        /// Target file.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Extraction stopped because the bounded wait elapsed.
    #[error("Extraction of {0} was cancelled")]
    Cancelled(PathBuf),

    /// The extraction directory could not be created.
    #[error("Failed to create {path}: {source}")]
    CreateDir {
        /// Directory path.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Two archives share a file name and would share a directory.
    #[error("Archives {first} and {second} would both extract to {directory}")]
    DuplicateName {
        /// First archive.
        first: PathBuf,
        /// Second archive.
        second: PathBuf,
        /// Shared extraction directory.
        directory: PathBuf,
    },

    /// An extraction task panicked or was cancelled.
    #[error("Extraction worker failed: {0}")]
    Worker(String),

    /// Extractions did not finish within the bounded wait.
    #[error("{pending} archive extraction(s) still running after {timeout:?}")]
    TimedOut {
        /// Extractions not yet observed complete.
        pending: usize,
        /// The bounded wait.
        timeout: Duration,
    },
}

/// An archive and the directory it was extracted into.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnpackedArchive {
    /// Source archive.
    pub archive: PathBuf,
    /// Extraction directory.
    pub directory: PathBuf,
}

impl UnpackedArchive {
    /// Returns the rule bundle shipped inside this archive, if any.
    #[must_use]
    pub fn rule_bundle(&self) -> Option<PathBuf> {
        let candidate = self.directory.join(RULE_BUNDLE_NAME);
        candidate.is_file().then_some(candidate)
    }
}

/// Returns the extraction directory for `archive` under `destination`.
#[must_use]
pub fn extraction_dir(destination: &Path, archive: &Path) -> PathBuf {
    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    destination.join(format!("{name}{EXTRACTION_MARKER}"))
}

/// Collects the rule bundles carried by `unpacked` archives, in archive order.
#[must_use]
pub fn discover_rule_bundles(unpacked: &[UnpackedArchive]) -> Vec<PathBuf> {
    unpacked
        .iter()
        .filter_map(UnpackedArchive::rule_bundle)
        .collect()
}

/// Extracts archive-packages concurrently with a bounded pool.
#[derive(Debug, Clone)]
pub struct ArchiveUnpacker {
    pool_size: usize,
    timeout: Duration,
}

impl Default for ArchiveUnpacker {
    fn default() -> Self {
        Self::new(&UnpackSettings::default())
    }
}

impl ArchiveUnpacker {
    /// Creates an unpacker from settings.
    #[must_use]
    pub fn new(settings: &UnpackSettings) -> Self {
        Self {
            pool_size: settings.pool_size.max(1),
            timeout: settings.timeout(),
        }
    }

    /// Sets the bounded wait.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Extracts every archive into `destination/<file name>-aar-contents`.
    ///
    /// All archives are attempted even if some fail. Results are sorted by
    /// archive path.
    ///
    /// # Errors
    ///
    /// Returns the first failure observed, a duplicate-name conflict, or
    /// [`UnpackError::TimedOut`] if the pool does not drain in time.
    pub async fn unpack(
        &self,
        archives: &[PathBuf],
        destination: &Path,
    ) -> Result<Vec<UnpackedArchive>, UnpackError> {
        if archives.is_empty() {
            return Ok(Vec::new());
        }

        let mut plan = plan(archives, destination)?;
        plan.sort();

        tokio::fs::create_dir_all(destination)
            .await
            .map_err(|e| UnpackError::CreateDir {
                path: destination.to_path_buf(),
                source: e,
            })?;

        info!(
            "Unpacking {} archive(s) with pool size {}",
            plan.len(),
            self.pool_size
        );

        let semaphore = Arc::new(Semaphore::new(self.pool_size));
        let cancel = Arc::new(AtomicBool::new(false));
        let mut tasks = JoinSet::new();

        for entry in &plan {
            let semaphore = Arc::clone(&semaphore);
            let cancel = Arc::clone(&cancel);
            let entry = entry.clone();
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| UnpackError::Worker(e.to_string()))?;
                tokio::task::spawn_blocking(move || {
                    extract(&entry.archive, &entry.directory, &cancel)
                })
                .await
                .map_err(|e| UnpackError::Worker(e.to_string()))?
            });
        }

        let mut failures = Vec::new();
        let drained = tokio::time::timeout(self.timeout, async {
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => failures.push(e),
                    Err(e) => failures.push(UnpackError::Worker(e.to_string())),
                }
            }
        })
        .await;

        if drained.is_err() {
            let pending = tasks.len();
            warn!(
                "{pending} extraction(s) still running after {:?}, cancelling",
                self.timeout
            );
            // Blocking extractions cannot be aborted; stop them cooperatively
            // and wait so nothing writes into the working area afterwards.
            cancel.store(true, Ordering::Relaxed);
            while tasks.join_next().await.is_some() {}
            return Err(UnpackError::TimedOut {
                pending,
                timeout: self.timeout,
            });
        }

        for failure in failures.iter().skip(1) {
            warn!("{failure}");
        }
        if let Some(first) = failures.into_iter().next() {
            return Err(first);
        }

        Ok(plan)
    }
}

/// Pairs every archive with its extraction directory, rejecting collisions.
fn plan(archives: &[PathBuf], destination: &Path) -> Result<Vec<UnpackedArchive>, UnpackError> {
    let mut seen: HashMap<PathBuf, &PathBuf> = HashMap::new();
    let mut plan = Vec::with_capacity(archives.len());

    for archive in archives {
        let directory = extraction_dir(destination, archive);
        if let Some(first) = seen.get(&directory) {
            if *first == archive {
                continue;
            }
            return Err(UnpackError::DuplicateName {
                first: (*first).clone(),
                second: archive.clone(),
                directory,
            });
        }
        seen.insert(directory.clone(), archive);
        plan.push(UnpackedArchive {
            archive: archive.clone(),
            directory,
        });
    }

    Ok(plan)
}

/// Fully extracts one archive, preserving its internal layout.
///
/// `cancel` is checked before every entry and between copied chunks.
fn extract(archive: &Path, directory: &Path, cancel: &AtomicBool) -> Result<(), UnpackError> {
    if cancel.load(Ordering::Relaxed) {
        return Err(UnpackError::Cancelled(archive.to_path_buf()));
    }
    debug!("Extracting {} -> {}", archive.display(), directory.display());

    let zip_error = |e: zip::result::ZipError| UnpackError::Extract {
        archive: archive.to_path_buf(),
        source: e,
    };
    let file = File::open(archive).map_err(|e| UnpackError::Open {
        archive: archive.to_path_buf(),
        source: e,
    })?;
    let mut zip = zip::ZipArchive::new(BufReader::new(file)).map_err(zip_error)?;

    create_dir(directory)?;

    for index in 0..zip.len() {
        if cancel.load(Ordering::Relaxed) {
            return Err(UnpackError::Cancelled(archive.to_path_buf()));
        }

        let mut entry = zip.by_index(index).map_err(zip_error)?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(UnpackError::UnsafeEntry {
                archive: archive.to_path_buf(),
                entry: entry.name().to_string(),
            });
        };
        let target = directory.join(relative);

        if entry.is_dir() {
            create_dir(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            create_dir(parent)?;
        }
        let mut out = File::create(&target).map_err(|e| UnpackError::Write {
            path: target.clone(),
            source: e,
        })?;
        copy_entry(&mut entry, &mut out, cancel, archive, &target)?;
    }

    Ok(())
}

fn create_dir(path: &Path) -> Result<(), UnpackError> {
    std::fs::create_dir_all(path).map_err(|e| UnpackError::CreateDir {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Copies one entry in chunks, stopping early once `cancel` is set.
fn copy_entry(
    reader: &mut impl Read,
    writer: &mut impl Write,
    cancel: &AtomicBool,
    archive: &Path,
    target: &Path,
) -> Result<(), UnpackError> {
    let mut buffer = vec![0_u8; COPY_CHUNK];
    loop {
        if cancel.load(Ordering::Relaxed) {
            return Err(UnpackError::Cancelled(archive.to_path_buf()));
        }
        let read = match reader.read(&mut buffer) {
            Ok(0) => return Ok(()),
            Ok(read) => read,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(UnpackError::Extract {
                    archive: archive.to_path_buf(),
                    source: e.into(),
                })
            }
        };
        writer
            .write_all(&buffer[..read])
            .map_err(|e| UnpackError::Write {
                path: target.to_path_buf(),
                source: e,
            })?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn write_archive(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for (name, content) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn extraction_dir_uses_full_file_name() {
        assert_eq!(
            extraction_dir(Path::new("/work/aars"), Path::new("deps/core-1.0.aar")),
            PathBuf::from("/work/aars/core-1.0.aar-aar-contents")
        );
    }

    #[test]
    fn duplicate_file_names_are_rejected() {
        let archives = vec![PathBuf::from("a/core.aar"), PathBuf::from("b/core.aar")];
        let err = plan(&archives, Path::new("/work")).unwrap_err();
        assert!(matches!(err, UnpackError::DuplicateName { .. }));
    }

    #[test]
    fn repeated_archive_is_planned_once() {
        let archives = vec![PathBuf::from("a/core.aar"), PathBuf::from("a/core.aar")];
        assert_eq!(plan(&archives, Path::new("/work")).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unpacks_and_sorts_by_archive() {
        let tmp = TempDir::new().unwrap();
        let zeta = tmp.path().join("zeta.aar");
        let alpha = tmp.path().join("alpha.aar");
        write_archive(&zeta, &[("AndroidManifest.xml", b"<manifest/>")]);
        write_archive(
            &alpha,
            &[("classes.jar", b"jar"), ("res/values/values.xml", b"<resources/>")],
        );
        let destination = tmp.path().join("aars");

        let unpacked = ArchiveUnpacker::default()
            .unpack(&[zeta.clone(), alpha.clone()], &destination)
            .await
            .unwrap();

        assert_eq!(unpacked.len(), 2);
        assert_eq!(unpacked[0].archive, alpha);
        assert_eq!(unpacked[1].archive, zeta);
        assert!(unpacked[0]
            .directory
            .join("res/values/values.xml")
            .is_file());
        assert!(unpacked[1].directory.join("AndroidManifest.xml").is_file());
    }

    #[tokio::test]
    async fn discovers_rule_bundle() {
        let tmp = TempDir::new().unwrap();
        let with_rules = tmp.path().join("with-rules.aar");
        let without = tmp.path().join("without.aar");
        write_archive(&with_rules, &[(RULE_BUNDLE_NAME, b"rules")]);
        write_archive(&without, &[("classes.jar", b"jar")]);

        let unpacked = ArchiveUnpacker::default()
            .unpack(&[with_rules, without], &tmp.path().join("aars"))
            .await
            .unwrap();

        let bundles = discover_rule_bundles(&unpacked);
        assert_eq!(bundles.len(), 1);
        assert!(bundles[0].ends_with("with-rules.aar-aar-contents/lint.jar"));
    }

    #[tokio::test]
    async fn rule_bundle_directory_is_not_a_bundle() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("odd.aar");
        write_archive(&archive, &[("lint.jar/inner.txt", b"x")]);

        let unpacked = ArchiveUnpacker::default()
            .unpack(&[archive], &tmp.path().join("aars"))
            .await
            .unwrap();

        assert!(discover_rule_bundles(&unpacked).is_empty());
    }

    #[tokio::test]
    async fn failure_of_one_archive_still_extracts_others() {
        let tmp = TempDir::new().unwrap();
        let good = tmp.path().join("good.aar");
        let bad = tmp.path().join("bad.aar");
        write_archive(&good, &[("classes.jar", b"jar")]);
        std::fs::write(&bad, b"not a zip").unwrap();
        let destination = tmp.path().join("aars");

        let err = ArchiveUnpacker::default()
            .unpack(&[good, bad], &destination)
            .await
            .unwrap_err();

        assert!(matches!(err, UnpackError::Extract { .. }));
        assert!(destination
            .join("good.aar-aar-contents/classes.jar")
            .is_file());
    }

    #[tokio::test]
    async fn entries_escaping_the_directory_are_rejected() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("evil.aar");
        write_archive(&archive, &[("../../escaped.txt", b"x")]);
        let destination = tmp.path().join("aars");

        let result = ArchiveUnpacker::default()
            .unpack(&[archive], &destination)
            .await;

        assert!(matches!(result, Err(UnpackError::UnsafeEntry { .. })));
        assert!(!tmp.path().join("escaped.txt").exists());
    }

    #[test]
    fn cancelled_extraction_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("core.aar");
        write_archive(&archive, &[("classes.jar", b"jar")]);
        let directory = tmp.path().join("aars/core.aar-aar-contents");

        let err = extract(&archive, &directory, &AtomicBool::new(true)).unwrap_err();

        assert!(matches!(err, UnpackError::Cancelled(_)));
        assert!(!directory.exists());
    }

    #[test]
    fn copy_stops_once_cancelled() {
        let cancel = AtomicBool::new(true);
        let mut reader: &[u8] = &[7_u8; COPY_CHUNK * 4];
        let mut out = Vec::new();

        let err = copy_entry(&mut reader, &mut out, &cancel, Path::new("a.aar"), Path::new("x"))
            .unwrap_err();

        assert!(matches!(err, UnpackError::Cancelled(_)));
        assert!(out.is_empty());
    }

    #[test]
    fn copy_writes_every_chunk() {
        let data = vec![3_u8; COPY_CHUNK * 2 + 17];
        let mut reader: &[u8] = &data;
        let mut out = Vec::new();

        copy_entry(&mut reader, &mut out, &AtomicBool::new(false), Path::new("a.aar"), Path::new("x"))
            .unwrap();

        assert_eq!(out, data);
    }

    #[tokio::test]
    async fn missing_archive_reports_open_error() {
        let tmp = TempDir::new().unwrap();
        let err = ArchiveUnpacker::default()
            .unpack(&[tmp.path().join("missing.aar")], &tmp.path().join("aars"))
            .await
            .unwrap_err();
        assert!(matches!(err, UnpackError::Open { .. }));
    }

    #[tokio::test]
    async fn empty_list_touches_nothing() {
        let tmp = TempDir::new().unwrap();
        let destination = tmp.path().join("aars");
        let unpacked = ArchiveUnpacker::default()
            .unpack(&[], &destination)
            .await
            .unwrap();
        assert!(unpacked.is_empty());
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn zero_timeout_surfaces_an_error() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("slow.aar");
        write_archive(&archive, &[("classes.jar", b"jar")]);

        let result = ArchiveUnpacker::default()
            .with_timeout(Duration::ZERO)
            .unpack(&[archive], &tmp.path().join("aars"))
            .await;

        // A zero wait may still observe a very fast extraction; it must never
        // return success with the archive missing.
        match result {
            Err(UnpackError::TimedOut { pending, .. }) => assert_eq!(pending, 1),
            Ok(unpacked) => assert!(unpacked[0].directory.join("classes.jar").is_file()),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn timed_out_extractions_stop_writing_before_returning() {
        let tmp = TempDir::new().unwrap();
        let payload = vec![1_u8; 256 * 1024];
        let names: Vec<String> = (0..64).map(|i| format!("res/raw/blob{i}.bin")).collect();
        let entries: Vec<(&str, &[u8])> = names
            .iter()
            .map(|n| (n.as_str(), payload.as_slice()))
            .collect();
        let archive = tmp.path().join("large.aar");
        write_archive(&archive, &entries);
        let destination = tmp.path().join("aars");

        let result = ArchiveUnpacker::default()
            .with_timeout(Duration::ZERO)
            .unpack(&[archive], &destination)
            .await;
        if !matches!(result, Err(UnpackError::TimedOut { .. })) {
            return;
        }

        let count = || walkdir::WalkDir::new(&destination).into_iter().count();
        let settled = count();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(count(), settled);
    }
}
