//! Clap derive structures for the `frontity` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// frontity -- inspect how a Frontity site resolves its links
#[derive(Debug, Parser)]
#[command(
    name = "frontity",
    version,
    about = "Resolve, fetch and route WordPress links the way a Frontity site does",
    long_about = "Command-line front-end for the Frontity source/router data layer.\n\n\
        Normalizes links into cache keys, fetches them from the WordPress REST API,\n\
        follows redirections and shows what server-side rendering would answer.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Site profile to use
    #[arg(long, short = 'p', env = "FRONTITY_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Frontity site URL (overrides profile)
    #[arg(long, short = 'u', env = "FRONTITY_URL", global = true)]
    pub url: Option<String>,

    /// WordPress URL, when it differs from the site URL
    #[arg(long, env = "FRONTITY_SOURCE_URL", global = true)]
    pub source_url: Option<String>,

    /// REST API root (overrides the derived one)
    #[arg(long, env = "FRONTITY_API", global = true)]
    pub api: Option<String>,

    /// Redirection mode: no, all, 404 or RegExp:<pattern>
    #[arg(long, env = "FRONTITY_REDIRECTIONS", global = true)]
    pub redirections: Option<String>,

    /// Bearer token for previews
    #[arg(long, env = "FRONTITY_PREVIEW_TOKEN", global = true, hide_env = true)]
    pub preview_token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "FRONTITY_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "FRONTITY_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "FRONTITY_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch a link and show its data descriptor
    #[command(alias = "g")]
    Get(GetArgs),

    /// Print the canonical cache key of links
    #[command(alias = "norm")]
    Normalize(NormalizeArgs),

    /// Simulate client-side navigation through a list of links
    #[command(alias = "nav")]
    Navigate(NavigateArgs),

    /// Show the status and redirect server-side rendering would answer
    Ssr(SsrArgs),

    /// Show the derived REST API and WordPress URLs
    Api,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Data commands ────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GetArgs {
    /// Link to fetch (path or absolute URL)
    pub link: String,

    /// Fetch again even if already fetched
    #[arg(long, short = 'f')]
    pub force: bool,

    /// Include the referenced entities in the output
    #[arg(long, short = 'e')]
    pub entities: bool,
}

#[derive(Debug, Args)]
pub struct NormalizeArgs {
    /// Links to normalize
    #[arg(required = true)]
    pub links: Vec<String>,
}

#[derive(Debug, Args)]
pub struct NavigateArgs {
    /// Links to visit, in order
    #[arg(required = true)]
    pub links: Vec<String>,

    /// Do not fetch; only normalize and follow known redirections
    #[arg(long)]
    pub no_fetch: bool,

    /// Seconds to wait for each link to settle
    #[arg(long, default_value = "30")]
    pub wait: u64,
}

#[derive(Debug, Args)]
pub struct SsrArgs {
    /// Request URL
    pub link: String,

    /// App option re-sent on redirects as frontity_<key> (key=value, repeatable)
    #[arg(long = "option", short = 'O', value_name = "KEY=VALUE")]
    pub options: Vec<String>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store a preview token in the system keyring
    SetToken {
        /// Profile the token belongs to (defaults to the active profile)
        #[arg(long)]
        profile: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
