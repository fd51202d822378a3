//! End-to-end pipeline runs against in-process fakes.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use relfetch_core::finalize::{Chmod, FileMode, FsChmod};
use relfetch_core::io::cache::{CacheError, LocalCache, SaveOutcome, ToolCache};
use relfetch_core::io::release::{ReleaseError, ReleaseSource};
use relfetch_core::{Config, Context, Host, InstallError, InstallRequest, NullReporter, Reporter, install};
use relfetch_schema::{Release, ReleaseAsset};
use tempfile::{TempDir, tempdir};

/// Serves one release and counts every call.
struct FakeReleases {
    release: Release,
    archive: Vec<u8>,
    latest_calls: AtomicUsize,
    tag_calls: Mutex<Vec<String>>,
    downloads: Mutex<Vec<String>>,
}

impl FakeReleases {
    fn new(names: &[&str], archive: Vec<u8>) -> Self {
        Self {
            release: Release {
                tag_name: "v1.2.3".to_string(),
                assets: names
                    .iter()
                    .map(|n| ReleaseAsset {
                        name: (*n).to_string(),
                        url: format!("https://api.example.com/assets/{n}"),
                    })
                    .collect(),
            },
            archive,
            latest_calls: AtomicUsize::new(0),
            tag_calls: Mutex::new(Vec::new()),
            downloads: Mutex::new(Vec::new()),
        }
    }

    fn network_calls(&self) -> usize {
        self.latest_calls.load(Ordering::SeqCst)
            + self.tag_calls.lock().unwrap().len()
            + self.downloads.lock().unwrap().len()
    }
}

#[async_trait]
impl ReleaseSource for FakeReleases {
    async fn latest_release(&self, _: &str, _: &str) -> Result<Release, ReleaseError> {
        self.latest_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.release.clone())
    }

    async fn release_by_tag(&self, _: &str, _: &str, tag: &str) -> Result<Release, ReleaseError> {
        self.tag_calls.lock().unwrap().push(tag.to_string());
        Ok(self.release.clone())
    }

    async fn download_asset(&self, asset: &ReleaseAsset, dest: &Path) -> Result<(), ReleaseError> {
        self.downloads.lock().unwrap().push(asset.name.clone());
        fs::write(dest, &self.archive)?;
        Ok(())
    }
}

/// Cache whose save always reports the same outcome.
struct ScriptedCache(SaveOutcome);

#[async_trait]
impl ToolCache for ScriptedCache {
    async fn restore(&self, _: &str, _: &Path) -> Result<bool, CacheError> {
        Ok(false)
    }

    async fn save(&self, _: &str, _: &Path) -> SaveOutcome {
        self.0.clone()
    }
}

#[derive(Default)]
struct RecordingReporter {
    infos: Mutex<Vec<String>>,
    warnings: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl Reporter for RecordingReporter {
    fn section(&self, _: &str) {}
    fn info(&self, msg: &str) {
        self.infos.lock().unwrap().push(msg.to_string());
    }
    fn success(&self, _: &str) {}
    fn warning(&self, msg: &str) {
        self.warnings.lock().unwrap().push(msg.to_string());
    }
    fn error(&self, msg: &str) {
        self.errors.lock().unwrap().push(msg.to_string());
    }
}

struct FailOn(&'static str);

impl Chmod for FailOn {
    fn chmod(&self, path: &Path, mode: FileMode) -> io::Result<()> {
        if path.file_name().is_some_and(|n| n == self.0) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        }
        FsChmod.chmod(path, mode)
    }
}

fn tar_gz(files: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, data) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, data.as_bytes())
            .unwrap();
    }
    let tar = builder.into_inner().unwrap();

    let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    enc.write_all(&tar).unwrap();
    enc.finish().unwrap()
}

fn linux_host() -> Host {
    Host {
        os: "linux".to_string(),
        arch: "x86_64".to_string(),
    }
}

fn context(root: &TempDir, releases: Arc<FakeReleases>, reporter: Arc<dyn Reporter>) -> Context {
    let config = Config::with_root(root.path());
    let cache = LocalCache::new(config.cache_dir.clone());
    Context::new(config, reporter)
        .unwrap()
        .with_host(linux_host())
        .with_releases(releases)
        .with_cache(Arc::new(cache))
}

fn request(tag: &str, cache: bool) -> InstallRequest {
    InstallRequest {
        tag: tag.to_string(),
        cache,
        ..InstallRequest::new("acme/tool".parse().unwrap())
    }
}

#[tokio::test]
async fn test_installs_matching_asset() {
    let root = tempdir().unwrap();
    let releases = Arc::new(FakeReleases::new(
        &["tool-windows-amd64.zip", "tool-linux-x86_64.tar.gz"],
        tar_gz(&[("tool", "#!/bin/sh\necho hi\n")]),
    ));
    let ctx = context(&root, releases.clone(), Arc::new(NullReporter));

    let outcome = install(&ctx, &request("v1.2.3", false)).await.unwrap();

    assert!(!outcome.cache_hit);
    assert!(!outcome.has_failures());
    assert_eq!(outcome.asset.as_deref(), Some("tool-linux-x86_64.tar.gz"));
    assert_eq!(
        outcome.bin_dir,
        root.path().join("tools/acme/tool/v1.2.3/linux-x64")
    );
    assert!(outcome.bin_dir.join("tool").is_file());
    assert_eq!(*releases.tag_calls.lock().unwrap(), ["v1.2.3"]);
    assert_eq!(releases.latest_calls.load(Ordering::SeqCst), 0);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(outcome.bin_dir.join("tool"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}

#[tokio::test]
async fn test_latest_uses_latest_endpoint_and_skips_cache() {
    let root = tempdir().unwrap();
    let releases = Arc::new(FakeReleases::new(
        &["tool-linux-amd64.tar.gz"],
        tar_gz(&[("tool", "bin")]),
    ));
    let reporter = Arc::new(RecordingReporter::default());
    let ctx = context(&root, releases.clone(), reporter.clone());

    install(&ctx, &request("latest", true)).await.unwrap();
    install(&ctx, &request("latest", true)).await.unwrap();

    assert_eq!(releases.latest_calls.load(Ordering::SeqCst), 2);
    assert_eq!(releases.downloads.lock().unwrap().len(), 2);
    assert!(
        reporter
            .infos
            .lock()
            .unwrap()
            .iter()
            .any(|m| m.contains("floating tag"))
    );
    assert!(!root.path().join("cache").exists());
}

#[tokio::test]
async fn test_cache_replay_skips_network() {
    let root = tempdir().unwrap();
    let releases = Arc::new(FakeReleases::new(
        &["tool-linux-x86_64.tar.gz"],
        tar_gz(&[("tool", "bin")]),
    ));
    let ctx = context(&root, releases.clone(), Arc::new(NullReporter));

    let first = install(&ctx, &request("v1.2.3", true)).await.unwrap();
    assert!(!first.cache_hit);
    let calls_after_first = releases.network_calls();

    // Simulate a fresh machine: the install dir is gone but the cache remains.
    fs::remove_dir_all(root.path().join("tools")).unwrap();

    let second = install(&ctx, &request("v1.2.3", true)).await.unwrap();
    assert!(second.cache_hit);
    assert!(second.asset.is_none());
    assert_eq!(releases.network_calls(), calls_after_first);
    assert!(second.bin_dir.join("tool").is_file());
}

#[tokio::test]
async fn test_cache_disabled_always_fetches() {
    let root = tempdir().unwrap();
    let releases = Arc::new(FakeReleases::new(
        &["tool-linux-x86_64.tar.gz"],
        tar_gz(&[("tool", "bin")]),
    ));
    let ctx = context(&root, releases.clone(), Arc::new(NullReporter));

    install(&ctx, &request("v1.2.3", false)).await.unwrap();
    install(&ctx, &request("v1.2.3", false)).await.unwrap();

    assert_eq!(releases.downloads.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_no_matching_asset_lists_candidates() {
    let root = tempdir().unwrap();
    let releases = Arc::new(FakeReleases::new(
        &["tool-darwin-arm64.zip", "tool-windows-amd64.zip"],
        Vec::new(),
    ));
    let ctx = context(&root, releases.clone(), Arc::new(NullReporter));

    let err = install(&ctx, &request("v1.2.3", false)).await.unwrap_err();
    assert!(matches!(err, InstallError::NoMatch(_)));
    let msg = err.to_string();
    assert!(msg.contains("tool-darwin-arm64.zip"));
    assert!(msg.contains("tool-windows-amd64.zip"));
    assert!(releases.downloads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_archive_fails() {
    let root = tempdir().unwrap();
    let releases = Arc::new(FakeReleases::new(
        &["tool-linux-x64.tar.gz"],
        tar_gz(&[("docs/README", "only docs")]),
    ));
    let ctx = context(&root, releases, Arc::new(NullReporter));

    let err = install(&ctx, &request("v1.2.3", false)).await.unwrap_err();
    assert!(matches!(
        err,
        InstallError::Finalize(relfetch_core::finalize::FinalizeError::NoBinaries(_))
    ));
}

#[cfg(unix)]
#[tokio::test]
async fn test_chmod_failure_is_isolated() {
    use std::os::unix::fs::PermissionsExt;

    let root = tempdir().unwrap();
    let releases = Arc::new(FakeReleases::new(
        &["tool-linux-x64.tar.gz"],
        tar_gz(&[("a", "1"), ("b", "2"), ("c", "3")]),
    ));
    let reporter = Arc::new(RecordingReporter::default());
    let ctx = context(&root, releases, reporter.clone()).with_chmod(Arc::new(FailOn("b")));

    let outcome = install(&ctx, &request("v1.2.3", false)).await.unwrap();

    assert!(outcome.has_failures());
    let errors = reporter.errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Failed to chmod"));

    for name in ["a", "c"] {
        let mode = fs::metadata(outcome.bin_dir.join(name))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}

#[tokio::test]
async fn test_binaries_location() {
    let root = tempdir().unwrap();
    let releases = Arc::new(FakeReleases::new(
        &["tool-linux-x64.tar.gz"],
        tar_gz(&[("tool-1.2.3/bin/tool", "bin"), ("tool-1.2.3/LICENSE", "MIT")]),
    ));
    let ctx = context(&root, releases, Arc::new(NullReporter));

    let req = InstallRequest {
        binaries_location: Some("tool-1.2.3/bin".into()),
        ..request("v1.2.3", false)
    };
    let outcome = install(&ctx, &req).await.unwrap();

    assert!(outcome.bin_dir.ends_with("linux-x64/tool-1.2.3/bin"));
    let report = outcome.chmod.unwrap();
    assert_eq!(report.succeeded().count(), 1);
}

#[tokio::test]
async fn test_cache_validation_failure_is_fatal() {
    let root = tempdir().unwrap();
    let releases = Arc::new(FakeReleases::new(
        &["tool-linux-x64.tar.gz"],
        tar_gz(&[("tool", "bin")]),
    ));
    let ctx = context(&root, releases, Arc::new(NullReporter))
        .with_cache(Arc::new(ScriptedCache(SaveOutcome::Invalid("bad key".into()))));

    let err = install(&ctx, &request("v1.2.3", true)).await.unwrap_err();
    assert!(matches!(err, InstallError::CacheValidation(ref m) if m == "bad key"));
}

#[tokio::test]
async fn test_cache_conflict_and_failure_are_not_fatal() {
    let cases = [
        (SaveOutcome::ReservationConflict("already reserved".into()), false),
        (SaveOutcome::Failed("disk full".into()), true),
    ];

    for (outcome, expect_warning) in cases {
        let root = tempdir().unwrap();
        let releases = Arc::new(FakeReleases::new(
            &["tool-linux-x64.tar.gz"],
            tar_gz(&[("tool", "bin")]),
        ));
        let reporter = Arc::new(RecordingReporter::default());
        let ctx = context(&root, releases, reporter.clone())
            .with_cache(Arc::new(ScriptedCache(outcome)));

        let result = install(&ctx, &request("v1.2.3", true)).await;
        assert!(result.is_ok());

        let warned = !reporter.warnings.lock().unwrap().is_empty();
        assert_eq!(warned, expect_warning);
        if !expect_warning {
            assert!(
                reporter
                    .infos
                    .lock()
                    .unwrap()
                    .iter()
                    .any(|m| m == "already reserved")
            );
        }
    }
}

#[tokio::test]
async fn test_corrupt_archive_fails_extraction() {
    let root = tempdir().unwrap();
    let releases = Arc::new(FakeReleases::new(&["tool-linux-x64.zip"], b"not a zip".to_vec()));
    let ctx = context(&root, releases, Arc::new(NullReporter));

    let err = install(&ctx, &request("v1.2.3", false)).await.unwrap_err();
    assert!(matches!(err, InstallError::Extract(_)));

    let dest = root.path().join("tools/acme/tool/v1.2.3/linux-x64");
    assert!(!dest.join("tool-linux-x64.zip").exists());
}

#[tokio::test]
async fn test_upper_case_asset_is_extracted() {
    let root = tempdir().unwrap();
    let releases = Arc::new(FakeReleases::new(
        &["Tool-Linux-X86_64.TAR.GZ"],
        tar_gz(&[("tool", "bin")]),
    ));
    let ctx = context(&root, releases, Arc::new(NullReporter));

    let outcome = install(&ctx, &request("v1.2.3", false)).await.unwrap();

    assert_eq!(outcome.asset.as_deref(), Some("Tool-Linux-X86_64.TAR.GZ"));
    assert!(outcome.bin_dir.join("tool").is_file());
}
