//! Layout of the mashed directory.
//!
//! ```text
//! <mashed_dir>/<repo>-<stamp>/          output of one compose
//! <mashed_dir>/<repo>-<stamp>/mash.out  its log, written on success
//! <mashed_dir>/<repo>                   link to the latest good compose
//! <mashed_dir>/mash-failed-<stamp>      log of a failed compose
//! ```

use std::{
    io,
    path::{Path, PathBuf},
};

use time::OffsetDateTime;
use tokio::{fs::OpenOptions, io::AsyncWriteExt};
use tracing::debug;

const SUCCESS_LOG: &str = "mash.out";
const FAILED_PREFIX: &str = "mash-failed-";
const MAX_ATTEMPTS: u32 = 1000;

/// Compose timestamp, `YYMMDD.HHMM` in local time (UTC if the offset is unknown).
pub fn compose_stamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    format_stamp(now)
}

fn format_stamp(at: OffsetDateTime) -> String {
    format!(
        "{:02}{:02}{:02}.{:02}{:02}",
        at.year().rem_euclid(100),
        u8::from(at.month()),
        at.day(),
        at.hour(),
        at.minute()
    )
}

#[derive(Debug, Clone)]
pub struct MashedDir {
    root: PathBuf,
}

impl MashedDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn output_dir(&self, repo: &str, stamp: &str) -> PathBuf {
        self.root.join(format!("{repo}-{stamp}"))
    }

    /// Stable link consumers read the latest compose of `repo` through.
    pub fn link(&self, repo: &str) -> PathBuf {
        self.root.join(repo)
    }

    pub fn failure_log(&self, stamp: &str) -> PathBuf {
        self.root.join(format!("{FAILED_PREFIX}{stamp}"))
    }

    /// Create a fresh output directory for one compose.
    ///
    /// Never reuses an existing directory: a second compose of `repo` within the
    /// same minute gets `<repo>-<stamp>-2`, then `-3` and so on.
    pub async fn create_output_dir(&self, repo: &str, stamp: &str) -> io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.root).await?;
        let base = self.output_dir(repo, stamp);
        for attempt in 1..=MAX_ATTEMPTS {
            let dir = with_suffix(&base, attempt);
            match tokio::fs::create_dir(&dir).await {
                Ok(()) => return Ok(dir),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }
        Err(exhausted(&base))
    }

    pub async fn write_success_log(&self, output_dir: &Path, output: &[u8]) -> io::Result<PathBuf> {
        let path = output_dir.join(SUCCESS_LOG);
        tokio::fs::write(&path, output).await?;
        debug!(target: "masher.exec.mash", path = %path.display(), "wrote mash output");
        Ok(path)
    }

    /// Save the output of a failed compose without clobbering an earlier one.
    pub async fn write_failure_log(&self, stamp: &str, output: &[u8]) -> io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.root).await?;
        let base = self.failure_log(stamp);
        for attempt in 1..=MAX_ATTEMPTS {
            let path = with_suffix(&base, attempt);
            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            };
            file.write_all(output).await?;
            file.flush().await?;
            debug!(target: "masher.exec.mash", path = %path.display(), "wrote failed mash output");
            return Ok(path);
        }
        Err(exhausted(&base))
    }

    /// Point the stable link of `repo` at `output_dir`.
    ///
    /// Remove-then-create: the link is briefly absent but never points at
    /// anything but a finished compose.
    pub async fn publish(&self, repo: &str, output_dir: &Path) -> io::Result<PathBuf> {
        let link = self.link(repo);
        match tokio::fs::symlink_metadata(&link).await {
            Ok(_) => tokio::fs::remove_file(&link).await?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        symlink(output_dir, &link).await?;
        debug!(target: "masher.exec.mash", link = %link.display(), target_dir = %output_dir.display(), "repointed repo link");
        Ok(link)
    }
}

fn with_suffix(base: &Path, attempt: u32) -> PathBuf {
    if attempt == 1 {
        return base.to_path_buf();
    }
    let mut name = base.as_os_str().to_os_string();
    name.push(format!("-{attempt}"));
    PathBuf::from(name)
}

fn exhausted(base: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free name left for {}", base.display()),
    )
}

#[cfg(target_family = "unix")]
async fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    tokio::fs::symlink(target, link).await
}

#[cfg(target_family = "windows")]
async fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    tokio::fs::symlink_dir(target, link).await
}
