//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use footprint_core::{
    AuditOutcome, AuditProgress, Auditor, DEFAULT_PREFIX, OpenRouterOracle, PageAction,
    report_value, write_report,
};
use footprint_crawler::Fetcher;
use footprint_shared::{
    AppConfig, AuditConfig, Category, FetchConfig, OracleConfig, RendererKind, init_config,
    load_config,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// footprint: audit a candidate's public web presence.
#[derive(Parser)]
#[command(
    name = "footprint",
    version,
    about = "Crawl a portfolio site and build a deduplicated resume profile from it.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Rendered-path backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum RendererArg {
    Chromium,
    Http,
}

impl From<RendererArg> for RendererKind {
    fn from(arg: RendererArg) -> Self {
        match arg {
            RendererArg::Chromium => RendererKind::Chromium,
            RendererArg::Http => RendererKind::Http,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Audit a site starting from its root URL.
    Audit {
        /// Root URL of the site to audit.
        url: String,

        /// Audit goal passed to the oracle.
        #[arg(short, long)]
        goal: Option<String>,

        /// Hard ceiling on state-machine steps.
        #[arg(long)]
        max_steps: Option<u32>,

        /// URLs processed concurrently per batch.
        #[arg(long)]
        batch_size: Option<usize>,

        /// Directory the report is written to.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Rendered-path backend.
        #[arg(long)]
        renderer: Option<RendererArg>,

        /// Show the browser window.
        #[arg(long)]
        headed: bool,

        /// Print the report to stdout instead of writing a file.
        #[arg(long)]
        stdout: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

/// Flag overrides for `audit`.
#[derive(Debug, Default)]
struct AuditOverrides {
    goal: Option<String>,
    max_steps: Option<u32>,
    batch_size: Option<usize>,
    out: Option<PathBuf>,
    renderer: Option<RendererArg>,
    headed: bool,
}

impl AuditOverrides {
    fn apply(self, config: &mut AppConfig) {
        if let Some(goal) = self.goal {
            config.audit.goal = goal;
        }
        if let Some(max_steps) = self.max_steps {
            config.audit.max_steps = max_steps;
        }
        if let Some(batch_size) = self.batch_size {
            config.audit.batch_size = batch_size;
        }
        if let Some(out) = self.out {
            config.audit.output_dir = out.to_string_lossy().to_string();
        }
        if let Some(renderer) = self.renderer {
            config.fetch.renderer = renderer.into();
        }
        if self.headed {
            config.fetch.headless = false;
        }
    }
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "footprint=info",
        1 => "footprint=debug",
        _ => "footprint=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Audit {
            url,
            goal,
            max_steps,
            batch_size,
            out,
            renderer,
            headed,
            stdout,
        } => {
            let overrides = AuditOverrides {
                goal,
                max_steps,
                batch_size,
                out,
                renderer,
                headed,
            };
            cmd_audit(&url, overrides, stdout).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_audit(url: &str, overrides: AuditOverrides, to_stdout: bool) -> Result<()> {
    let mut config = load_config()?;
    overrides.apply(&mut config);

    let parsed = Url::parse(url).map_err(|e| eyre!("invalid URL '{url}': {e}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(eyre!("unsupported URL scheme '{}': use http or https", parsed.scheme()));
    }

    // Fails fast on a missing API key, before a browser is launched.
    let oracle = OpenRouterOracle::new(OracleConfig::from_app_config(&config)?)?;
    let fetcher = Fetcher::launch(&FetchConfig::from(&config)).await?;
    let audit_config = AuditConfig::from(&config);

    info!(
        url,
        goal = %audit_config.goal,
        max_steps = audit_config.max_steps,
        batch_size = audit_config.batch_size,
        renderer = ?config.fetch.renderer,
        "starting audit"
    );

    let progress = CliProgress::new();
    let outcome = Auditor::new(Arc::new(fetcher), Arc::new(oracle), audit_config)
        .run(url, &progress)
        .await;
    progress.spinner.finish_and_clear();
    let outcome = outcome?;

    if to_stdout {
        println!("{}", serde_json::to_string_pretty(&report_value(&outcome.profile))?);
        return Ok(());
    }

    let path = write_report(
        &outcome.profile,
        &PathBuf::from(&config.audit.output_dir),
        DEFAULT_PREFIX,
    )?;
    print_summary(&outcome, &path);
    Ok(())
}

fn print_summary(outcome: &AuditOutcome, path: &std::path::Path) {
    let profile = &outcome.profile;
    println!();
    println!("  Audit complete!");
    println!("  Pages:        {}", outcome.visited.len());
    println!("  Projects:     {}", profile.items(&Category::Projects).len());
    println!("  Experience:   {}", profile.items(&Category::Experience).len());
    println!("  Code reviews: {}", profile.items(&Category::CodeReviews).len());
    println!("  Steps:        {} ({})", outcome.steps, outcome.stop_reason.as_str());
    println!("  Report:       {}", path.display());
    println!("  Time:         {:.1}s", outcome.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl AuditProgress for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn page_processed(&self, url: &str, action: PageAction, visited: usize) {
        self.spinner
            .set_message(format!("[{visited} visited] {} {url}", action.as_str()));
    }

    fn done(&self, _outcome: &AuditOutcome) {
        self.spinner.finish_and_clear();
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_audit_flags() {
        let cli = Cli::try_parse_from([
            "footprint",
            "-vv",
            "audit",
            "https://alice.dev",
            "--max-steps",
            "10",
            "--renderer",
            "http",
            "--headed",
            "--stdout",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);

        let Command::Audit {
            url,
            max_steps,
            renderer,
            headed,
            stdout,
            goal,
            ..
        } = cli.command
        else {
            panic!("expected audit command");
        };
        assert_eq!(url, "https://alice.dev");
        assert_eq!(max_steps, Some(10));
        assert_eq!(renderer, Some(RendererArg::Http));
        assert!(headed && stdout);
        assert!(goal.is_none());
    }

    #[test]
    fn overrides_take_precedence_over_config() {
        let mut config = AppConfig::default();
        AuditOverrides {
            goal: Some("Projects only".into()),
            batch_size: Some(4),
            renderer: Some(RendererArg::Http),
            headed: true,
            ..AuditOverrides::default()
        }
        .apply(&mut config);

        assert_eq!(config.audit.goal, "Projects only");
        assert_eq!(config.audit.batch_size, 4);
        assert_eq!(config.audit.max_steps, 50);
        assert_eq!(config.fetch.renderer, RendererKind::Http);
        assert!(!config.fetch.headless);
    }

    #[test]
    fn config_subcommands_parse() {
        let cli = Cli::try_parse_from(["footprint", "config", "show"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Config {
                action: ConfigAction::Show
            }
        ));
    }
}
