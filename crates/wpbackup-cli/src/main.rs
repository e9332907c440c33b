use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use clap::{ArgAction, ColorChoice, Parser};
use console::style;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};
use wpbackup_core::{BackupJob, S3Options, S3Store, Settings, SiteReport, SiteStatus, WpBackup};

/// Back up WordPress installations (files and database) to an S3 bucket.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Name of the bucket that receives the archives.
    bucket: String,

    /// Path of the WordPress installation to back up.
    path: PathBuf,

    /// Additional WordPress installation. May be repeated.
    #[arg(short = 'p', long = "extra-path", value_name = "PATH")]
    extra_paths: Vec<PathBuf>,

    /// AWS access key. Ambient credentials are used when omitted.
    #[arg(short = 'a', long, requires = "secret_key")]
    access_key: Option<String>,

    /// AWS secret key.
    #[arg(short = 's', long, requires = "access_key")]
    secret_key: Option<String>,

    /// AWS region of the bucket.
    #[arg(short = 'r', long)]
    region: Option<String>,

    /// Settings file to use instead of the default one.
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Parse configurations and show what would be uploaded and pruned, without changing anything.
    #[arg(long)]
    dry_run: bool,

    /// Print the run report as JSON.
    #[arg(long)]
    json: bool,

    /// Set the verbosity level. Use -v for debug, -vv for trace.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Control when to use color output.
    #[arg(long, value_name = "WHEN", default_value_t = ColorChoice::Auto)]
    color: ColorChoice,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    let _log_guard = init_tracing(cli.verbose, cli.color, settings.log_dir.as_deref())?;

    let store = S3Store::connect(S3Options {
        bucket: cli.bucket,
        access_key: cli.access_key,
        secret_key: cli.secret_key,
        region: cli.region,
        endpoint_url: settings.endpoint_url.clone(),
        force_path_style: settings.force_path_style,
    })
    .context("Failed to initialize the storage client")?;

    let jobs: Vec<BackupJob> = std::iter::once(cli.path)
        .chain(cli.extra_paths)
        .map(BackupJob::new)
        .collect();

    let backup = WpBackup::new(settings, store);
    let reports = backup
        .run(&jobs, cli.dry_run)
        .context("The backup process failed")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        print_reports(&reports, cli.dry_run);
    }
    Ok(())
}

fn init_tracing(verbosity: u8, color: ColorChoice, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = match verbosity {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(color != ColorChoice::Never);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Could not create log directory '{}'", dir.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "wpbackup.log"));
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(guard)
}

fn print_reports(reports: &[SiteReport], dry_run: bool) {
    if dry_run {
        println!("{}", style("-- DRY RUN --").yellow().bold());
    }
    for report in reports {
        let site = style(report.site.display()).cyan();
        match &report.status {
            SiteStatus::Uploaded { archive, pruned } => {
                println!("{} {} -> {}", style("uploaded").green().bold(), site, archive);
                for key in pruned {
                    println!("    pruned {}", style(key).yellow());
                }
            }
            SiteStatus::Planned { archive, would_prune } => {
                println!("{} {} -> {}", style("would upload").bold(), site, archive);
                for key in would_prune {
                    println!("    would prune {}", style(key).yellow());
                }
            }
            SiteStatus::Skipped { reason } => {
                println!("{} {} ({})", style("skipped").red().bold(), site, reason);
            }
        }
    }
    if dry_run {
        println!("\nRun without --dry-run to perform these actions.");
    }
}
