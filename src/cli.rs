use clap::{Parser, Subcommand};

fn get_version() -> &'static str {
    const BASE_VERSION: &str = env!("CARGO_PKG_VERSION");

    // Tagged builds report just the tag
    if let Some(tag) = option_env!("FLUTTERVER_GIT_TAG") {
        return tag;
    }

    let commit = option_env!("FLUTTERVER_GIT_COMMIT").unwrap_or("unknown");
    let branch = option_env!("FLUTTERVER_GIT_BRANCH").unwrap_or("unknown");

    // Leaked once at startup for clap's 'static requirement
    let version = format!("v{}-{} ({})", BASE_VERSION, commit, branch);
    Box::leak(version.into_boxed_str())
}

#[derive(Parser)]
#[command(name = "flutterver")]
#[command(about = "Install, list and switch between Flutter SDK releases")]
#[command(version = get_version(), propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (use multiple times for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Reduce output to errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download and install a Flutter SDK release
    #[command(
        after_help = "Examples:\n  flutterver install 3.10.6\n  flutterver install 3.13\n  flutterver install lts\n  flutterver install latest   (newest beta release)"
    )]
    Install {
        /// Version to install: exact, partial (3.10), 'lts' or 'latest'
        #[arg(id = "version_arg", value_name = "VERSION")]
        version: String,
        /// Reinstall even if the version is already present
        #[arg(short, long)]
        force: bool,
    },

    /// Make an installed release the active one
    #[command(
        after_help = "Examples:\n  flutterver use 3.10.6\n  flutterver use 3.10\n  flutterver use newest"
    )]
    Use {
        /// Version to activate: exact, partial, 'newest', 'lts' or 'latest'
        #[arg(id = "version_arg", value_name = "VERSION")]
        version: String,
        /// Complete partial versions from the release feed instead of installed versions
        #[arg(long)]
        remote: bool,
    },

    /// Re-activate the newest installed release
    #[command(alias = "on")]
    Enable,

    /// Deactivate the current release
    #[command(alias = "off")]
    Disable,

    /// Show the active release
    Current,

    /// List installed releases
    List,

    /// List releases available for download
    Releases {
        /// Show the beta channel instead of stable
        #[arg(long)]
        beta: bool,
        /// Maximum number of releases to show
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
        /// Include Dart SDK version and checksum
        #[arg(long)]
        details: bool,
    },

    /// Remove an installed release
    Remove {
        /// Installed version to remove (exact or partial)
        #[arg(id = "version_arg", value_name = "VERSION")]
        version: String,
    },

    /// Manage flutterver's configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show the current version
    Version,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a configuration setting
    Get {
        /// Key to get (if omitted, shows all settings)
        key: Option<String>,
    },
    /// Set a configuration setting
    Set {
        /// Key and value (e.g., 'install-root=/opt/flutter' or 'install-root /opt/flutter')
        #[arg(trailing_var_arg = true, required = true)]
        args: Vec<String>,
    },
    /// Reset a configuration setting to its default
    Unset {
        /// Key to unset (e.g., 'feed-url')
        key: String,
    },
    /// Show full configuration
    Show {
        /// Output format (json, yaml, plain)
        #[arg(long, default_value = "json")]
        format: String,
    },
}
