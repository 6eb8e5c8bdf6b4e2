use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;
use tokio::process::Command;
use tracing::info;

use crate::error::{AnalysisError, Result};

/// Everything needed to launch one non-GUI JMeter run.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerConfig {
    /// Path to the JMeter launcher script or binary.
    pub executable: PathBuf,
    /// `.jmx` test plan.
    pub test_plan: PathBuf,
    /// Where JMeter writes its result log.
    pub log_file: PathBuf,
    /// Extra command-line arguments, whitespace separated.
    #[serde(default)]
    pub extra_args: String,
}

impl RunnerConfig {
    /// The launcher and the test plan must both exist as files.
    pub fn validate(&self) -> Result<()> {
        if !self.executable.is_file() {
            return Err(AnalysisError::ProcessSpawn("wrong JMeter path".into()));
        }
        if !self.test_plan.is_file() {
            return Err(AnalysisError::ProcessSpawn("wrong test plan path".into()));
        }
        Ok(())
    }

    /// `-n -t <plan> -l <log>` followed by the extra arguments.
    pub fn command_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-n".into(),
            "-t".into(),
            self.test_plan.clone().into(),
            "-l".into(),
            self.log_file.clone().into(),
        ];
        args.extend(self.extra_args.split_whitespace().map(OsString::from));
        args
    }
}

impl fmt::Display for RunnerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Starting JMeter with following parameters:")?;
        writeln!(f, " - JMeter path: {}", self.executable.display())?;
        writeln!(f, " - Test plan path: {}", self.test_plan.display())?;
        writeln!(f, " - Log file path: {}", self.log_file.display())?;
        write!(f, " - Other parameters: {}", self.extra_args)
    }
}

/// Runs JMeter to completion. A non-zero exit status is an error.
pub async fn run(config: &RunnerConfig) -> Result<()> {
    config.validate()?;
    info!("{config}");

    let args = config.command_args();
    let status = Command::new(&config.executable)
        .args(&args)
        .status()
        .await
        .map_err(|e| {
            AnalysisError::ProcessSpawn(format!(
                "cannot start {}: {e}",
                config.executable.display()
            ))
        })?;

    if !status.success() {
        return Err(AnalysisError::ExternalProcessFailure { status });
    }
    info!(%status, "value returned by JMeter");
    Ok(())
}
