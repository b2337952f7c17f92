use anyhow::{bail, Result};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use keeper_core::record::{record, RecordConfig};
use keeper_core::report::Reporter;
use keeper_core::verify::{verify, VerifyConfig};
use keeper_core::DEFAULT_BUFFER_SIZE;

mod batch;
mod elog;
mod pretty;

use elog::EchoReporter;

const SUMMARY_PATH_WIDTH: usize = 60;

#[derive(Parser)]
#[command(name = "keeper", version, about = "Record and verify SFV checksum manifests")]
struct Cli {
    /// File containing a sequence of commands, one per line
    #[arg(short = 'F', long = "batch")]
    batch: Option<PathBuf>,
    /// Also append every message to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Option<Cmd>,
}

/// One batch-file line parsed with the same grammar as the command line.
#[derive(Parser)]
#[command(name = "keeper", no_binary_name = true)]
struct BatchLine {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Clone, Debug)]
enum Cmd {
    /// Verify the files listed in an SFV manifest
    Check {
        sfv: PathBuf,
        /// Also report files next to the manifest that it does not list
        #[arg(long)]
        extra: bool,
        /// Look for extra files in subdirectories too
        #[arg(long)]
        recursive: bool,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
        #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE)]
        buffer_size: usize,
        #[arg(long)]
        parallel: bool,
        #[arg(long)]
        progress: bool,
    },
    /// Record checksums of the files in a directory into an SFV manifest
    Record {
        src: PathBuf,
        sfv: PathBuf,
        #[arg(long)]
        recursive: bool,
        /// Record other .sfv files too
        #[arg(long)]
        include_sfv: bool,
        /// Glob of relative paths to leave out (repeatable)
        #[arg(long)]
        exclude: Vec<String>,
        #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE)]
        buffer_size: usize,
        #[arg(long)]
        parallel: bool,
        #[arg(long)]
        progress: bool,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_env("KEEPER_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    if cli.cmd.is_none() && cli.batch.is_none() {
        eprintln!("Syntax: keeper <cmd> [<arg> ...]");
        print_known_commands();
        return ExitCode::from(2);
    }
    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn known_commands() -> Vec<String> {
    let mut cmds: Vec<String> =
        Cli::command().get_subcommands().map(|c| c.get_name().to_string()).collect();
    cmds.retain(|c| c != "help");
    cmds.sort();
    cmds
}

fn print_known_commands() {
    eprintln!("Known commands:");
    for c in known_commands() {
        eprintln!("   {}", c);
    }
}

/// Batch commands first, then the one on the command line. Returns whether
/// every command succeeded.
fn run(cli: Cli) -> Result<bool> {
    let mut cmds: Vec<Cmd> = Vec::new();
    if let Some(batch) = &cli.batch {
        for tokens in batch::read_batch(batch)? {
            cmds.push(parse_batch_line(&tokens)?);
        }
    }
    cmds.extend(cli.cmd);

    // JSON output owns stdout.
    let echo_info = !cmds.iter().any(|c| matches!(c, Cmd::Check { json: true, .. }));
    let reporter = EchoReporter::new(echo_info, cli.log_file.as_deref())?;
    if let Some(batch) = &cli.batch {
        reporter.info(&format!("Processing batch instruction file {:?}", batch));
    }

    let mut all_ok = true;
    for cmd in cmds {
        all_ok &= dispatch(cmd, &reporter)?;
    }
    Ok(all_ok)
}

fn parse_batch_line(tokens: &[String]) -> Result<Cmd> {
    let Some(name) = tokens.first() else {
        bail!("empty batch command");
    };
    let known = known_commands();
    if !known.iter().any(|k| k == name) {
        bail!("unsupported command: {} (known commands: {})", name, known.join(", "));
    }
    let line = BatchLine::try_parse_from(tokens)?;
    Ok(line.cmd)
}

fn dispatch(cmd: Cmd, reporter: &dyn Reporter) -> Result<bool> {
    match cmd {
        Cmd::Check { sfv, extra, recursive, json, buffer_size, parallel, progress } => {
            let cfg = VerifyConfig { buffer_size, report_extra: extra, recursive, parallel, progress };
            check(&sfv, &cfg, json, reporter)
        }
        Cmd::Record { src, sfv, recursive, include_sfv, exclude, buffer_size, parallel, progress } => {
            let cfg = RecordConfig {
                buffer_size,
                recursive,
                skip_sfv_files: !include_sfv,
                excludes: exclude,
                parallel,
                progress,
            };
            Ok(record_cmd(&src, &sfv, &cfg, reporter))
        }
    }
}

fn check(sfv: &Path, cfg: &VerifyConfig, json: bool, reporter: &dyn Reporter) -> Result<bool> {
    let report = match verify(sfv, cfg, reporter) {
        Ok(r) => r,
        Err(e) => {
            reporter.error(&format!("cannot read manifest: {}: {:#}", sfv.display(), e));
            return Ok(false);
        }
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(report.is_ok());
    }
    let (ok, _, _) = report.tally();
    if report.is_ok() {
        reporter.info(&format!(
            "Success! No errors. ({} files, {})",
            pretty::commify(ok as i64),
            pretty::human_readable(report.bytes_checked, "B")
        ));
    } else {
        reporter.info("");
        reporter.info("Summary of errors encountered:");
        for e in &report.errors {
            reporter.info(e);
        }
        reporter.info(&format!("Summary: {} errors", pretty::commify(report.errors.len() as i64)));
    }
    Ok(report.is_ok())
}

fn record_cmd(src: &Path, sfv: &Path, cfg: &RecordConfig, reporter: &dyn Reporter) -> bool {
    match record(src, sfv, cfg, reporter) {
        Ok(rep) => {
            reporter.info(&format!(
                "Recorded {} files ({}) to {}",
                pretty::commify(rep.files as i64),
                pretty::human_readable(rep.bytes, "B"),
                pretty::collapse_middle(&sfv.display().to_string(), SUMMARY_PATH_WIDTH)
            ));
            true
        }
        Err(e) => {
            reporter.error(&format!("record failed: {:#}", e));
            false
        }
    }
}
