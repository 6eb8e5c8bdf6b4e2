use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use jtl_stats::config::{Overrides, Settings};
use jtl_stats::export::export_all;
use jtl_stats::runner::{self, RunnerConfig};
use jtl_stats::{analyze_file, Analysis, CancelFlag};

#[derive(Parser, Debug)]
#[command(name = "jtl-stats", version, about = "Statistics and reports from JMeter result logs")]
struct Cli {
    /// Debug output for this crate
    #[arg(short, long, global = true, env = "JTL_STATS_VERBOSE")]
    verbose: bool,

    /// Errors only
    #[arg(short, long, global = true, conflicts_with = "verbose", env = "JTL_STATS_QUIET")]
    quiet: bool,

    /// Structured JSON logs on stderr
    #[arg(long, global = true, env = "JTL_STATS_LOG_JSON")]
    log_json: bool,

    /// TOML settings file
    #[arg(short, long, global = true, env = "JTL_STATS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyse an existing result log
    Analyse {
        /// CSV or XML result log
        log: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Run a test plan in non-GUI mode, then analyse its log
    Run {
        /// JMeter launcher
        jmeter: PathBuf,
        /// Test plan (.jmx)
        plan: PathBuf,
        /// Result log JMeter writes to
        log: PathBuf,

        /// Further JMeter arguments, whitespace separated
        #[arg(long, default_value = "", allow_hyphen_values = true)]
        extra_args: String,

        #[command(flatten)]
        output: OutputArgs,
    },
}

/// Exporter selection. Naming any exporter runs exactly the named ones.
#[derive(Args, Debug)]
struct OutputArgs {
    #[arg(long)]
    html: bool,

    #[arg(long)]
    sql: bool,

    #[arg(long)]
    json: bool,

    /// HTML sections to leave out: 1 aggregate, 2 per-label samples,
    /// 4 response times, 8 all samples
    #[arg(long, env = "JTL_STATS_DISABLE")]
    disable: Option<u8>,

    /// Records between cancellation checks
    #[arg(long, env = "JTL_STATS_BATCH_SIZE")]
    batch_size: Option<usize>,
}

impl OutputArgs {
    fn overrides(&self) -> Overrides {
        let chosen = self.html || self.sql || self.json;
        let pick = |flag: bool| chosen.then_some(flag);
        Overrides {
            disable: self.disable,
            html: pick(self.html),
            sql: pick(self.sql),
            json: pick(self.json),
            batch_size: self.batch_size,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    jtl_stats::logging::init_logging(cli.verbose, cli.quiet, cli.log_json)?;

    if !cli.quiet {
        eprintln!();
        eprintln!("╔══════════════════════════════════════════════════╗");
        eprintln!("║   📊  JMETER RESULT LOG ANALYSER                ║");
        eprintln!("╚══════════════════════════════════════════════════╝");
        eprintln!();
    }

    // ── 1. Settings ──────────────────────────────────────────────
    let file_settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    let (log, output) = match &cli.command {
        Command::Analyse { log, output } => (log.clone(), output),
        Command::Run {
            jmeter,
            plan,
            log,
            extra_args,
            output,
        } => {
            // ── 2. Load test run ─────────────────────────────────
            let config = RunnerConfig {
                executable: jmeter.clone(),
                test_plan: plan.clone(),
                log_file: log.clone(),
                extra_args: extra_args.clone(),
            };
            runner::run(&config).await.context("JMeter run failed")?;
            (log.clone(), output)
        }
    };
    let settings = file_settings.merge(&output.overrides())?;

    // ── 3. Analysis ──────────────────────────────────────────────
    let cancel = CancelFlag::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping analysis");
            on_interrupt.cancel();
        }
    });

    let options = settings.analysis_options().with_cancel(cancel);
    let analysis = analyze_file(&log, &options)
        .await
        .with_context(|| format!("analysis of {} failed", log.display()))?;

    // ── 4. Exports ───────────────────────────────────────────────
    export(&analysis, &log, &settings).await;

    // ── 5. Return structure on stdout ────────────────────────────
    let structure = analysis.report.return_structure()?;
    println!("{}", serde_json::to_string_pretty(&structure)?);
    Ok(())
}

async fn export(analysis: &Analysis, log: &Path, settings: &Settings) {
    let exporters = settings.exporters();
    if exporters.is_empty() {
        return;
    }
    for outcome in export_all(analysis, log, &exporters).await {
        if let Ok(path) = &outcome.result {
            info!(exporter = outcome.exporter, path = %path.display(), "report written");
        }
    }
}
