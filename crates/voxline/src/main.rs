// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Voxline - voice-call orchestration for FreeSWITCH tenants.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod commands;
mod orchestrator;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use voxline_config::model::VoxlineConfig;

/// Voxline - voice-call orchestration for FreeSWITCH tenants.
#[derive(Parser, Debug)]
#[command(name = "voxline", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the gateway, the session manager and the orchestrator.
    Serve,
    /// Load and validate the configuration, then exit.
    CheckConfig,
    /// Resolve a destination query for a tenant without touching the switch.
    Resolve {
        /// Tenant domain UUID.
        domain: String,
        /// Spoken name, alias, department or dialable number.
        query: String,
    },
    /// Evaluate a configured time condition now.
    CheckHours {
        /// Tenant domain UUID.
        domain: String,
        /// Time condition UUID.
        condition: String,
    },
}

fn load(path: Option<&PathBuf>) -> VoxlineConfig {
    let loaded = match path {
        Some(path) => voxline_config::load_and_validate_path(path),
        None => voxline_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            voxline_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load(cli.config.as_ref());

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::CheckConfig) => {
            let sources = voxline_config::toml_sources(cli.config.as_deref());
            let problems = commands::check_config(&config, &sources);
            if !problems.is_empty() {
                voxline_config::render_errors(&problems);
                std::process::exit(1);
            }
            println!(
                "voxline: config ok ({} tenant(s), service.name={})",
                config.domains.len(),
                config.service.name
            );
        }
        Some(Commands::Resolve { domain, query }) => {
            match commands::resolve(&config, &domain, &query).await {
                Ok(resolved) => {
                    println!("{}", commands::render_resolution(&query, resolved.as_ref()));
                }
                Err(e) => {
                    eprintln!("error: {e}");
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::CheckHours { domain, condition }) => {
            match commands::check_hours(&config, &domain, &condition).await {
                Ok(result) => println!("{}", commands::render_hours(&result)),
                Err(e) => {
                    eprintln!("error: {e}");
                    std::process::exit(1);
                }
            }
        }
        None => {
            println!("voxline: use --help for available commands");
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use serial_test::serial;

    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_resolve_with_global_config() {
        let cli = Cli::parse_from([
            "voxline",
            "resolve",
            "d1",
            "financeiro",
            "--config",
            "/tmp/voxline.toml",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/voxline.toml")));
        match cli.command {
            Some(Commands::Resolve { domain, query }) => {
                assert_eq!(domain, "d1");
                assert_eq!(query, "financeiro");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_check_hours() {
        let cli = Cli::parse_from(["voxline", "check-hours", "d1", "comercial"]);
        assert!(matches!(
            cli.command,
            Some(Commands::CheckHours { ref condition, .. }) if condition == "comercial"
        ));
    }

    #[test]
    #[serial]
    fn config_file_is_loaded_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voxline.toml");
        std::fs::write(
            &path,
            r#"
[service]
name = "voxline-test"

[session]
max_sessions_per_domain = 3
"#,
        )
        .unwrap();

        let config = voxline_config::load_and_validate_path(&path).unwrap();
        assert_eq!(config.service.name, "voxline-test");
        assert_eq!(config.session.max_sessions_per_domain, 3);
    }

    #[test]
    #[serial]
    fn invalid_config_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voxline.toml");
        std::fs::write(&path, "[session]\nmax_sessions_per_domain = 0\n").unwrap();

        let errors = voxline_config::load_and_validate_path(&path).unwrap_err();
        assert!(
            errors
                .iter()
                .any(|e| e.to_string().contains("session.max_sessions_per_domain"))
        );
    }
}
