//! CLI entry point for `mailsnatch`.

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};

use mailsnatch::config::{AddressingMode, Config};
use mailsnatch::export::attachment::run;
use mailsnatch::export::report::ExtractionReport;
use mailsnatch::mime::classify::TraversalDepth;
use mailsnatch::session::imap::ImapSession;

#[derive(Parser)]
#[command(
    name = "mailsnatch",
    version,
    about = "Save attachments from an IMAP mailbox to disk"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract attachments from every message in the mailbox
    Extract(ExtractArgs),
    /// Print the effective configuration as TOML
    Config,
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

#[derive(clap::Args)]
struct ExtractArgs {
    /// Directory to write attachments to
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// IMAP server host
    #[arg(long)]
    host: Option<String>,

    /// IMAP over TLS port
    #[arg(long)]
    port: Option<u16>,

    /// Login user name
    #[arg(short, long)]
    user: Option<String>,

    /// Mailbox to read from
    #[arg(short, long)]
    mailbox: Option<String>,

    /// Login password (defaults to the configured environment variable)
    #[arg(long, env = "MAILSNATCH_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Skip parts with an inline disposition
    #[arg(long)]
    no_inline: bool,

    /// Keep messages instead of deleting them afterwards
    #[arg(long)]
    keep: bool,

    /// Look for attachments at every nesting level, not just the top level
    #[arg(long)]
    recursive: bool,

    /// Fetch each part by its own section number instead of a running counter
    #[arg(long)]
    structural: bool,

    /// Section number of the first attachment for the running counter
    #[arg(long, value_name = "N")]
    first_part: Option<u32>,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = mailsnatch::config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Extract(args) => cmd_extract(args, config),
        Commands::Config => cmd_config(&config),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Try to set up file logging
    let log_dir = mailsnatch::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mailsnatch.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Merge command-line overrides into the loaded configuration.
fn apply_overrides(args: &ExtractArgs, config: &mut Config) {
    if let Some(ref output) = args.output {
        config.extract.destination_dir = Some(output.clone());
    }
    if let Some(ref host) = args.host {
        config.mailbox.host = host.clone();
    }
    if let Some(port) = args.port {
        config.mailbox.port = port;
    }
    if let Some(ref user) = args.user {
        config.mailbox.username = user.clone();
    }
    if let Some(ref mailbox) = args.mailbox {
        config.mailbox.mailbox = mailbox.clone();
    }
    if args.no_inline {
        config.extract.include_inline = false;
    }
    if args.keep {
        config.extract.delete_after = false;
    }
    if args.recursive {
        config.extract.traversal = TraversalDepth::Recursive;
    }
    if args.structural {
        config.extract.addressing = AddressingMode::Structural;
    }
    if let Some(first) = args.first_part {
        config.extract.first_part_number = first;
    }
}

fn cmd_extract(args: ExtractArgs, mut config: Config) -> anyhow::Result<()> {
    apply_overrides(&args, &mut config);

    if config.mailbox.host.is_empty() {
        anyhow::bail!("No IMAP host given (use --host or set [mailbox].host)");
    }
    if config.mailbox.username.is_empty() {
        anyhow::bail!("No user given (use --user or set [mailbox].username)");
    }
    let options = config.extract.to_options()?;
    let password = match args.password {
        Some(password) => password,
        None => config.mailbox.password()?,
    };

    let mut session = ImapSession::open(&config.mailbox, &password)?;

    let pb = if args.json {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} Extracting [{bar:40.cyan/blue}] {pos}/{len}")
                .expect("valid template")
                .progress_chars("#>-"),
        );
        pb
    };

    let report = run(&mut session, &options, &|current, total| {
        pb.set_length(total as u64);
        pb.set_position(current as u64);
        true
    })?;
    pb.finish_and_clear();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, &options.destination_dir);
    }

    if let Some(problems) = report.problem_summary() {
        anyhow::bail!("Extraction incomplete: {problems}");
    }
    Ok(())
}

fn print_report(report: &ExtractionReport, dir: &std::path::Path) {
    println!(
        "  Processed {}/{} message(s)",
        report.messages_processed, report.messages_total
    );
    println!(
        "  Extracted {} attachment(s) ({}) to {}",
        report.written.len(),
        format_size(report.bytes_written(), BINARY),
        dir.display()
    );
    if report.messages_deleted > 0 || report.expunged {
        println!("  Deleted {} message(s)", report.messages_deleted);
    }
    for failure in &report.failures {
        match failure.section {
            Some(ref section) => println!(
                "  ! uid {} part {}: {}",
                failure.message.uid, section, failure.reason
            ),
            None => println!("  ! uid {}: {}", failure.message.uid, failure.reason),
        }
    }
    if let Some(ref error) = report.expunge_error {
        println!("  ! expunge failed: {error}");
    }
    if report.cancelled {
        println!("  Run was cancelled before all messages were processed");
    }
}

/// Print the effective configuration.
fn cmd_config(config: &Config) -> anyhow::Result<()> {
    if let Some(path) = mailsnatch::config::config_file_path() {
        println!("# {}", path.display());
    }
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailsnatch", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    man.render(&mut std::io::stdout())?;
    Ok(())
}
