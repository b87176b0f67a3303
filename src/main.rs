mod catalog;
mod cli;
mod config;
mod download;
mod index;
mod install;
mod platform;
mod resolver;
mod switch;
mod types;
mod version;


use anyhow::{anyhow, Result};
use catalog::{Channel, ReleaseSource, RemoteFeed};
use chrono::Utc;
use clap::Parser;
use cli::{Cli, Commands, ConfigAction};
use config::{get_setting, load_config, normalize_key, save_config, set_setting, SETTING_KEYS};
use console::style;
use install::{install_version, remove_version, Interrupted};
use resolver::{Resolution, VersionResolver};
use switch::{ActiveAlias, ActiveVersionSwitch, AliasState, SystemLinker};
use types::{ActivationRecord, FlutterverConfig};
use version::Version;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli)?;

    if let Err(e) = run(cli).await {
        if e.downcast_ref::<Interrupted>().is_some() {
            eprintln!("{}", e);
            std::process::exit(130);
        }
        return Err(e);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config()?;
    let root = config.settings.install_root();
    let feed = RemoteFeed::new(config.settings.feed_url.clone());

    match cli.command {
        Commands::Version => {
            println!("flutterver v{}", env!("CARGO_PKG_VERSION"));
        }

        Commands::Install { version, force } => {
            let resolution = VersionResolver::new(&feed, &root)
                .resolve(&version, false)
                .await?;
            echo_substitution(&resolution);
            let catalog = feed.fetch_releases().await?;
            let dir =
                install_version(&config.settings, &catalog, &resolution.version, force).await?;
            println!(
                "Flutter SDK {} is installed at {}",
                resolution.version,
                dir.display()
            );
            println!("Activate it with `flutterver use {}`", resolution.version);
        }

        Commands::Use { version, remote } => {
            let resolution = VersionResolver::new(&feed, &root)
                .resolve(&version, !remote)
                .await?;
            echo_substitution(&resolution);
            activate(&mut config, &resolution.version)?;
        }

        Commands::Enable => {
            let resolution = VersionResolver::new(&feed, &root)
                .resolve(resolver::NEWEST, true)
                .await?;
            activate(&mut config, &resolution.version)?;
        }

        Commands::Disable => {
            let alias = ActiveAlias::new(config.settings.alias_path());
            ActiveVersionSwitch::new(alias, SystemLinker).disable()?;
            if config.active.take().is_some() {
                save_config(&config)?;
            }
            println!("No Flutter SDK version is active");
        }

        Commands::Current => show_current(&config),

        Commands::List => {
            let installed = index::list_installed(&root)?;
            let active = ActiveAlias::new(config.settings.alias_path()).current_version();

            println!("--- Installed Flutter SDKs ---");
            if installed.is_empty() {
                println!("  No Flutter SDK versions installed yet.");
                return Ok(());
            }
            for version in installed {
                let channel = if version.is_prerelease() { " (beta)" } else { "" };
                if active.as_ref() == Some(&version) {
                    println!(
                        "  {} {}{}",
                        style("*").green(),
                        style(&version).green().bold(),
                        channel
                    );
                } else {
                    println!("    {}{}", version, channel);
                }
            }
        }

        Commands::Releases {
            beta,
            limit,
            details,
        } => {
            let catalog = feed.fetch_releases().await?;
            let channel = if beta { Channel::Beta } else { Channel::Stable };

            println!("--- {} releases ---", channel);
            for release in catalog.releases(channel).iter().take(limit) {
                let date = release
                    .release_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                let marker = if catalog.is_current(release) {
                    " (current)"
                } else {
                    ""
                };
                println!("  {:<20} {}{}", release.version, date, marker);
                if details {
                    if let Some(dart) = &release.dart_sdk_version {
                        println!("    Dart:    {}", dart);
                    }
                    if let Some(arch) = &release.dart_sdk_arch {
                        println!("    Arch:    {}", arch);
                    }
                    println!("    SHA-256: {}", release.sha256);
                }
            }
        }

        Commands::Remove { version } => {
            let resolution = VersionResolver::new(&feed, &root)
                .resolve(&version, true)
                .await?;
            remove_version(&config.settings, &resolution.version)?;
            if config
                .active
                .as_ref()
                .is_some_and(|a| a.version == resolution.version.to_string())
            {
                config.active = None;
                save_config(&config)?;
            }
            println!("Removed Flutter SDK {}", resolution.version);
        }

        Commands::Config { action } => handle_config(&mut config, action)?,
    }

    Ok(())
}

fn setup_logging(cli: &Cli) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if cli.quiet {
        "error"
    } else if cli.verbose == 0 {
        "warn"
    } else if cli.verbose == 1 {
        "info"
    } else {
        "debug"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    Ok(())
}

fn activate(config: &mut FlutterverConfig, version: &Version) -> Result<()> {
    let alias = ActiveAlias::new(config.settings.alias_path());
    let mut switch = ActiveVersionSwitch::new(alias, SystemLinker);
    switch.activate(&config.settings.install_root(), version)?;
    tracing::debug!("Alias is now {:?}", switch.state());

    config.active = Some(ActivationRecord {
        version: version.to_string(),
        switched_at: Utc::now(),
    });
    save_config(config)?;
    println!("{} Now using Flutter SDK {}", style("✓").green(), version);
    Ok(())
}

fn echo_substitution(resolution: &Resolution) {
    if let Some(alias) = resolution.substituted_from {
        eprintln!("'{}' resolved to Flutter SDK {}", alias, resolution.version);
    }
}

fn show_current(config: &FlutterverConfig) {
    let alias = ActiveAlias::new(config.settings.alias_path());
    match alias.inspect() {
        AliasState::LinkedTo(target) => {
            let Some(version) = index::version_from_dir(&target) else {
                println!("{} points at {}", alias.path().display(), target.display());
                return;
            };
            let since = config
                .active
                .as_ref()
                .filter(|record| record.version == version.to_string())
                .map(|record| record.switched_at);
            match since {
                Some(since) => println!(
                    "{} (active since {})",
                    version,
                    since.format("%Y-%m-%d %H:%M")
                ),
                None => println!("{}", version),
            }
        }
        AliasState::StaleLinkPresent(target) => {
            tracing::warn!(
                "{} points at {}, which no longer exists",
                alias.path().display(),
                target.display()
            );
            println!("No Flutter SDK version is active (stale link)");
        }
        AliasState::Foreign => {
            println!(
                "{} exists but is not managed by flutterver",
                alias.path().display()
            );
        }
        AliasState::Unlinked | AliasState::OperationInProgress => {
            println!("No Flutter SDK version is active");
        }
    }
}

fn handle_config(config: &mut FlutterverConfig, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Get { key } => {
            if let Some(key) = key {
                let value = get_setting(&config.settings, &key)
                    .ok_or_else(|| anyhow!("Setting '{}' not found", key))?;
                println!("{}", value);
            } else {
                println!("--- flutterver settings ---");
                for key in SETTING_KEYS {
                    if let Some(value) = get_setting(&config.settings, key) {
                        println!("  {}: {}", key, value);
                    }
                }
            }
        }
        ConfigAction::Set { args } => {
            let (key, value) = match args.as_slice() {
                [pair] => pair
                    .split_once('=')
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .ok_or_else(|| anyhow!("Invalid format. Use 'key=value' or 'key value'."))?,
                [key, value] => (key.clone(), value.clone()),
                _ => return Err(anyhow!("Invalid format. Use 'key=value' or 'key value'.")),
            };
            if !set_setting(&mut config.settings, &key, Some(&value)) {
                return Err(anyhow!(
                    "'{}' is not a valid configuration setting. Valid settings: {}",
                    normalize_key(&key),
                    SETTING_KEYS.join(", ")
                ));
            }
            save_config(config)?;
            tracing::info!("Setting '{}' updated to '{}'", normalize_key(&key), value);
        }
        ConfigAction::Unset { key } => {
            if !set_setting(&mut config.settings, &key, None) {
                return Err(anyhow!(
                    "'{}' is not a valid configuration setting. Valid settings: {}",
                    normalize_key(&key),
                    SETTING_KEYS.join(", ")
                ));
            }
            save_config(config)?;
            tracing::info!("Setting '{}' unset", normalize_key(&key));
        }
        ConfigAction::Show { format } => match format.as_str() {
            "json" => println!("{}", serde_json::to_string_pretty(config)?),
            "yaml" => print!("{}", serde_yaml::to_string(config)?),
            "plain" => {
                for key in SETTING_KEYS {
                    if let Some(value) = get_setting(&config.settings, key) {
                        println!("{}={}", key, value);
                    }
                }
                if let Some(active) = &config.active {
                    println!(
                        "active={} ({})",
                        active.version,
                        active.switched_at.to_rfc3339()
                    );
                }
            }
            other => return Err(anyhow!("Unknown format '{}'. Use json, yaml or plain", other)),
        },
    }
    Ok(())
}
