use std::{ffi::OsStr, path::Path};

use async_trait::async_trait;
use masher_core::{ComposeError, ComposeReport, Composer};
use tracing::{debug, info, instrument, trace, warn};

use crate::{
    config::MashConfig,
    error::{ExecError, ExecResult},
    mashed::{MashedDir, compose_stamp},
    util::{cmd_program, combine_output},
};

/// Composer running the external compose executable as
/// `<program> -o <output dir> -c <config> <repo>`.
pub struct MashComposer {
    cfg: MashConfig,
    mashed: MashedDir,
}

impl MashComposer {
    pub fn new(cfg: MashConfig) -> ExecResult<Self> {
        if cfg.program.trim().is_empty() {
            return Err(ExecError::MissingProgram);
        }
        let mashed = MashedDir::new(cfg.mashed_dir.clone());
        Ok(Self { cfg, mashed })
    }

    pub fn mashed(&self) -> &MashedDir {
        &self.mashed
    }

    async fn mash(&self, repo: &str) -> ExecResult<ComposeReport> {
        let stamp = compose_stamp();
        let output_dir = self.mashed.create_output_dir(repo, &stamp).await?;

        let (status, output) = self.run_program(repo, &output_dir).await?;
        info!(target: "masher.exec.mash", %repo, %status, "mash exited");

        if status.success() {
            let log_path = self.mashed.write_success_log(&output_dir, &output).await?;
            return Ok(ComposeReport {
                repo: repo.to_string(),
                output_dir,
                log_path,
            });
        }

        let log = self.mashed.write_failure_log(&stamp, &output).await?;
        warn!(target: "masher.exec.mash", %repo, log = %log.display(), "mash failed");
        match status.code() {
            Some(code) => Err(ExecError::NonZeroExit { code, log }),
            None => Err(ExecError::KilledBySignal { log }),
        }
    }

    async fn run_program(
        &self,
        repo: &str,
        output_dir: &Path,
    ) -> ExecResult<(std::process::ExitStatus, Vec<u8>)> {
        let mut cmd = cmd_program(
            &self.cfg.program,
            [
                OsStr::new("-o"),
                output_dir.as_os_str(),
                OsStr::new("-c"),
                self.cfg.config_path.as_os_str(),
                OsStr::new(repo),
            ],
        );
        cmd.envs(&self.cfg.env);

        trace!(target: "masher.exec.mash", program = %self.cfg.program, %repo, output_dir = %output_dir.display(), "spawn");
        let out = cmd.output().await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                ExecError::Spawn(format!("{}: program not found", self.cfg.program))
            }
            _ => ExecError::Spawn(format!("{}: {e}", self.cfg.program)),
        })?;
        debug!(target: "masher.exec.mash", stdout = out.stdout.len(), stderr = out.stderr.len(), "output captured");

        Ok((out.status, combine_output(out.stdout, &out.stderr)))
    }
}

#[async_trait]
impl Composer for MashComposer {
    #[instrument(level = "debug", target = "masher.exec.mash", skip(self))]
    async fn compose(&self, repo: &str) -> Result<ComposeReport, ComposeError> {
        self.mash(repo).await.map_err(|e| e.into_compose_error(repo))
    }

    #[instrument(level = "debug", target = "masher.exec.mash", skip(self, report), fields(repo = %report.repo))]
    async fn publish(&self, report: &ComposeReport) -> Result<(), ComposeError> {
        self.mashed
            .publish(&report.repo, &report.output_dir)
            .await
            .map(|_| ())
            .map_err(|e| ExecError::from(e).into_compose_error(&report.repo))
    }
}
