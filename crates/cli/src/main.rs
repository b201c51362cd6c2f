// FILE: crates/cli/src/main.rs

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use earmark_config::{Config, ConfigManager};
use std::path::PathBuf;

mod commands;
mod session;

fn build_cli() -> Command {
    Command::new("earmark")
        .version("0.1.0")
        .author("earmark contributors")
        .about("Keeps listening progress in sync with durable storage")
        .arg(
            Arg::new("database")
                .short('d')
                .long("database")
                .value_name("PATH")
                .help("Path to the database file (defaults to app.database_path)")
                .global(true),
        )
        .arg(
            Arg::new("config-dir")
                .long("config-dir")
                .value_name("DIR")
                .help("Directory holding config.toml")
                .global(true),
        )
        .subcommand(
            Command::new("init").about("Write the default config and create the progress database"),
        )
        .subcommand(
            Command::new("show")
                .about("Show the saved progress of one item")
                .arg(user_arg())
                .arg(item_arg()),
        )
        .subcommand(
            Command::new("stats")
                .about("Show listening statistics for a user")
                .arg(user_arg()),
        )
        .subcommand(
            Command::new("listen")
                .about("Run a simulated listening session against the database")
                .arg(user_arg())
                .arg(item_arg())
                .arg(
                    Arg::new("duration")
                        .long("duration")
                        .value_name("SECS")
                        .help("Length of the simulated item")
                        .value_parser(clap::value_parser!(f64))
                        .required(true),
                )
                .arg(
                    Arg::new("seconds")
                        .long("seconds")
                        .value_name("N")
                        .help("Seconds of wall time to listen for")
                        .value_parser(clap::value_parser!(f64))
                        .required(true),
                )
                .arg(
                    Arg::new("rate")
                        .long("rate")
                        .value_name("RATE")
                        .help("Playback rate to switch to after resuming (one of player.rate_options)")
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    Arg::new("skip")
                        .long("skip")
                        .value_name("STEPS")
                        .help("Skip player.skip_seconds this many times after resuming, negative to rewind")
                        .value_parser(clap::value_parser!(i64))
                        .allow_negative_numbers(true),
                )
                .arg(
                    Arg::new("realtime")
                        .long("realtime")
                        .help("Sleep between ticks instead of simulating instantly")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
}

fn user_arg() -> Arg {
    Arg::new("user")
        .short('u')
        .long("user")
        .value_name("USER_ID")
        .help("User ID (UUID), defaults to app.user_id")
}

fn item_arg() -> Arg {
    Arg::new("item")
        .short('i')
        .long("item")
        .value_name("ITEM_ID")
        .help("Item ID (UUID)")
        .required(true)
}

fn config_manager(matches: &ArgMatches) -> Result<ConfigManager> {
    match matches.get_one::<String>("config-dir") {
        Some(dir) => Ok(ConfigManager::with_directory(PathBuf::from(dir))),
        None => ConfigManager::new().context("Failed to locate config directory"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();
    let manager = config_manager(&matches)?;

    // Logging is configured from the file, so load errors are reported once the logger exists
    let loaded = manager.load_with_env_overrides();
    let config = loaded.as_ref().cloned().unwrap_or_else(|_| Config::default());

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.app.log_level.to_string()),
    )
    .init();

    if let Err(e) = &loaded {
        log::warn!("Failed to load config: {}, using defaults", e);
    }

    let db_path = matches
        .get_one::<String>("database")
        .map(PathBuf::from)
        .unwrap_or_else(|| config.app.database_path.clone());

    match matches.subcommand() {
        Some(("init", _)) => commands::init(&manager, &db_path).await,
        Some(("show", sub_matches)) => {
            let user = commands::resolve_user(sub_matches, &config)?
                .context("No user given and app.user_id is not set")?;
            let item = commands::parse_item(sub_matches)?;
            commands::show_progress(&db_path, user, item).await
        }
        Some(("stats", sub_matches)) => {
            let user = commands::resolve_user(sub_matches, &config)?
                .context("No user given and app.user_id is not set")?;
            commands::show_stats(&db_path, user).await
        }
        Some(("listen", sub_matches)) => {
            let args = session::ListenArgs::from_matches(sub_matches, &config)?;
            commands::listen(&db_path, &config, args).await
        }
        _ => {
            build_cli().print_help()?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_listen_requires_duration_and_seconds() {
        let item = "67e55044-10b1-426f-9247-bb680e5fe0c8";
        let result = build_cli().try_get_matches_from(["earmark", "listen", "--item", item]);
        assert!(result.is_err());

        let matches = build_cli()
            .try_get_matches_from([
                "earmark", "listen", "--item", item, "--duration", "600", "--seconds", "30",
            ])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "listen");
        assert_eq!(sub.get_one::<f64>("duration"), Some(&600.0));
        assert!(!sub.get_flag("realtime"));
    }

    #[test]
    fn test_global_database_flag() {
        let matches = build_cli()
            .try_get_matches_from(["earmark", "stats", "--database", "/tmp/p.db"])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        assert_eq!(
            sub.get_one::<String>("database").map(String::as_str),
            Some("/tmp/p.db")
        );
    }
}
