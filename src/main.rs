//! CLI entry point for `reportfetch`.

use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;
use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use reportfetch::config::{self, Config};
use reportfetch::fetch::http::ReqwestFetcher;
use reportfetch::freshness;
use reportfetch::job::{self, Collaborators, RunSummary};
use reportfetch::mailbox::maildir::Maildir;
use reportfetch::notify::outbox::OutboxNotifier;
use reportfetch::notify::{LogNotifier, Notifier};
use reportfetch::registry::table::CsvTable;
use reportfetch::registry::ReportRegistry;
use reportfetch::store::directory::DirectoryStore;

/// Pull emailed report downloads from a Maildir inbox into a report folder,
/// and alert when an expected report has not arrived.
#[derive(Parser)]
#[command(name = "reportfetch", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file (default: $REPORTFETCH_CONFIG or the user config dir)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Process the inbox once and check report freshness (default)
    Run,
    /// Show when each report was last received
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => return cmd_completions(shell),
        Some(Commands::Manpage) => return cmd_manpage(),
        _ => {}
    }

    let config = config::load_config(cli.config.as_deref())?;

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Some(Commands::Status { json }) => cmd_status(&config, json),
        _ => cmd_run(&config),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "reportfetch.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "reportfetch", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Process the inbox once.
fn cmd_run(config: &Config) -> anyhow::Result<()> {
    let paths = config.validate()?;

    let mut mailbox = Maildir::open(&paths.maildir, paths.archive_dir.clone())?;
    let mut table = CsvTable::new(&paths.registry);
    let http = ReqwestFetcher::new(config.http_timeout(), &config.http.user_agent)?;
    let store = DirectoryStore::open(&paths.output_dir)?;
    let notifier: Box<dyn Notifier> = match &config.notification.outbox_dir {
        Some(dir) => Box::new(OutboxNotifier::open(dir, &config.notification.sender)?),
        None => Box::new(LogNotifier),
    };

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Processing [{bar:40.cyan/blue}] {pos}/{len} messages")
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let summary = job::run_batch(
        Collaborators {
            mailbox: &mut mailbox,
            table: &mut table,
            http: &http,
            store: &store,
            notifier: notifier.as_ref(),
        },
        &config.job_settings(),
        None,
        Some(&|current, total| {
            pb.set_length(total as u64);
            pb.set_position(current as u64);
        }),
    );
    pb.finish_and_clear();

    let summary = summary?;
    print_run_summary(&summary, start.elapsed());
    Ok(())
}

/// Print the registry with each report's freshness.
fn cmd_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let Some(path) = &config.registry.path else {
        anyhow::bail!("No registry configured (set registry.path)");
    };

    let registry = ReportRegistry::load(&CsvTable::new(path))?;
    let status = freshness::report_status(&registry, Utc::now());

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!();
    println!(
        "  {:<32} {:>9} {:<20} {:>8} {}",
        "Report", "Threshold", "Last received", "Age", "Status"
    );
    println!("  {}", "-".repeat(82));
    for s in &status {
        let name: String = s.name.chars().take(31).collect();
        let last = s
            .last_received_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string());
        let age = s
            .age_days
            .map(|d| format!("{d}d"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<32} {:>8}d {:<20} {:>8} {}",
            name,
            s.alert_threshold_days,
            last,
            age,
            if s.overdue { "OVERDUE" } else { "ok" }
        );
    }
    println!();
    Ok(())
}

/// Print what a run did as a human-readable table.
fn print_run_summary(summary: &RunSummary, elapsed: std::time::Duration) {
    use humansize::{format_size, BINARY};

    let stored: u64 = summary.pass.artifacts.iter().map(|a| a.size).sum();

    println!();
    println!("  {:<22} {}", "Threads", summary.pass.threads);
    println!("  {:<22} {}", "Messages", summary.pass.messages);
    println!("  {:<22} {}", "Ingested", summary.pass.ingested);
    println!("  {:<22} {}", "Failed", summary.pass.failed);
    println!("  {:<22} {}", "Skipped (flagged)", summary.pass.skipped);
    println!("  {:<22} {}", "Stored", format_size(stored, BINARY));
    println!("  {:<22} {}", "Registry updates", summary.registry_updates);
    println!("  {:<22} {:.2?}", "Elapsed", elapsed);

    if !summary.pass.artifacts.is_empty() {
        println!();
        for artifact in &summary.pass.artifacts {
            println!(
                "    {:>10}  {}",
                format_size(artifact.size, BINARY),
                artifact.location.display()
            );
        }
    }

    if !summary.overdue.is_empty() {
        println!();
        println!("  Overdue: {}", summary.overdue.join(", "));
    }
    println!();
}
