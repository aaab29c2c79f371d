//! Command-line interface for the `stamper` binary.
//!
//! `start` runs the registry in the foreground; every other subcommand talks
//! to a running registry over HTTP.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::client::{RegistryClient, DEFAULT_SERVER_URL};
use crate::config::Config;
use crate::keyspace::PackageCoordinates;
use crate::storage::StorageBackend;

/// Command-line interface for the package registry
#[derive(Parser, Debug)]
#[command(name = "stamper")]
#[command(about = "Minimal package registry for versioned content")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Registry URL for client operations
    #[arg(long, default_value = DEFAULT_SERVER_URL, global = true)]
    pub server: String,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the registry server in the foreground
    Start {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
        /// Data directory for the filesystem backend (overrides config)
        #[arg(long)]
        data: Option<PathBuf>,
        /// JSON configuration file
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
        /// Keep packages in memory only
        #[arg(long)]
        memory: bool,
    },
    /// Publish a package version, updating it if it already exists
    Publish {
        #[command(flatten)]
        package: PackageArgs,
        #[command(flatten)]
        content: ContentArgs,
    },
    /// Replace the content of an existing package version
    Update {
        #[command(flatten)]
        package: PackageArgs,
        #[command(flatten)]
        content: ContentArgs,
    },
    /// Print the content of a package version
    Get {
        #[command(flatten)]
        package: PackageArgs,
    },
    /// Search package keys
    Search {
        /// Case-insensitive substring to look for
        query: String,
        /// Maximum number of results
        #[arg(long, short = 'l')]
        limit: Option<usize>,
    },
    /// Show registry status
    Status,
}

#[derive(Args, Debug, Clone)]
pub struct PackageArgs {
    #[arg(long)]
    pub owner: String,
    #[arg(long)]
    pub name: String,
    /// Version (defaults to the registry's default version)
    #[arg(long)]
    pub version: Option<String>,
}

impl PackageArgs {
    fn coordinates(&self) -> PackageCoordinates {
        let coords = PackageCoordinates::new(&self.owner, &self.name);
        match &self.version {
            Some(version) => coords.with_version(version),
            None => coords,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ContentArgs {
    /// Inline content
    #[arg(long, conflicts_with = "file")]
    pub content: Option<String>,
    /// Read content from a file
    #[arg(long)]
    pub file: Option<PathBuf>,
}

impl ContentArgs {
    async fn read(&self) -> Result<Option<String>> {
        if let Some(content) = &self.content {
            return Ok(Some(content.clone()));
        }
        match &self.file {
            Some(path) => {
                let content = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                Ok(Some(content))
            }
            None => Ok(None),
        }
    }
}

/// Parse arguments, initialize logging and run the selected command.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = stamper_logging::init_subscriber();
    handle_command(cli).await
}

async fn handle_command(cli: Cli) -> Result<()> {
    let client = RegistryClient::new(&cli.server);

    match cli.command {
        Commands::Start {
            host,
            port,
            data,
            config,
            memory,
        } => handle_start(host, port, data, config, memory).await,

        Commands::Publish { package, content } => {
            let content = content.read().await?;
            let outcome = client
                .publish(&package.coordinates(), content.as_deref())
                .await?;
            let receipt = &outcome.receipt;
            let verb = if outcome.created { "Published" } else { "Updated" };
            println!(
                "{} {}/{}@{} ({})",
                verb, receipt.owner, receipt.name, receipt.version, receipt.hash
            );
            Ok(())
        }

        Commands::Update { package, content } => {
            let Some(content) = content.read().await? else {
                bail!("update requires --content or --file");
            };
            let receipt = client.update(&package.coordinates(), &content).await?;
            println!(
                "Updated {}/{}@{} ({})",
                receipt.owner, receipt.name, receipt.version, receipt.hash
            );
            Ok(())
        }

        Commands::Get { package } => {
            let fetched = client.get(&package.coordinates()).await?;
            print!("{}", fetched.content);
            Ok(())
        }

        Commands::Search { query, limit } => {
            let results = client.search(&query, limit).await?;
            if results.results.is_empty() {
                println!("No packages match '{}'", results.query);
            }
            for hit in &results.results {
                println!("{}", hit.name);
            }
            Ok(())
        }

        Commands::Status => {
            let status = client.status().await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(())
        }
    }
}

/// Config file read by `start` when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "stamper.json";

/// Flags of `start` that override configuration values.
#[derive(Debug, Default, Clone)]
struct StartOverrides {
    host: Option<String>,
    port: Option<u16>,
    data: Option<PathBuf>,
    memory: bool,
}

/// Load the server configuration and apply command-line overrides.
///
/// An explicit `--config` file must exist; otherwise `stamper.json` in the
/// working directory is used when present. The merged result is validated.
fn start_config(config_path: Option<&Path>, overrides: StartOverrides) -> Result<Config> {
    let mut config = match config_path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load_or_default(DEFAULT_CONFIG_FILE)
            .with_context(|| format!("Failed to load config from {}", DEFAULT_CONFIG_FILE))?,
    };

    if let Some(host) = overrides.host {
        config.server.default_host = host;
    }
    if let Some(port) = overrides.port {
        config.server.default_port = port;
    }
    if let Some(data) = overrides.data {
        config.storage.default_data_dir = data;
    }
    if overrides.memory {
        config.storage.backend = StorageBackend::Memory;
    }

    config
        .validate()
        .context("Invalid configuration after applying command-line flags")?;
    Ok(config)
}

async fn handle_start(
    host: Option<String>,
    port: Option<u16>,
    data: Option<PathBuf>,
    config_path: Option<PathBuf>,
    memory: bool,
) -> Result<()> {
    let overrides = StartOverrides {
        host,
        port,
        data,
        memory,
    };
    let config = start_config(config_path.as_deref(), overrides)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting stamper");
    crate::server::run_server(config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_publish_with_defaults() {
        let cli = Cli::try_parse_from([
            "stamper", "publish", "--owner", "alice", "--name", "tool", "--content", "hello",
        ])
        .unwrap();
        assert_eq!(cli.server, DEFAULT_SERVER_URL);
        match cli.command {
            Commands::Publish { package, content } => {
                assert_eq!(
                    package.coordinates(),
                    PackageCoordinates::new("alice", "tool")
                );
                assert_eq!(content.content.as_deref(), Some("hello"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn global_server_flag_after_subcommand() {
        let cli = Cli::try_parse_from([
            "stamper",
            "get",
            "--owner",
            "alice",
            "--name",
            "tool",
            "--version",
            "2.0.0",
            "--server",
            "http://registry:8080",
        ])
        .unwrap();
        assert_eq!(cli.server, "http://registry:8080");
        match cli.command {
            Commands::Get { package } => assert_eq!(
                package.coordinates(),
                PackageCoordinates::new("alice", "tool").with_version("2.0.0")
            ),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn content_and_file_conflict() {
        let result = Cli::try_parse_from([
            "stamper", "update", "--owner", "a", "--name", "b", "--content", "x", "--file", "y",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn parses_search_limit() {
        let cli = Cli::try_parse_from(["stamper", "search", "too", "--limit", "5"]).unwrap();
        match cli.command {
            Commands::Search { query, limit } => {
                assert_eq!(query, "too");
                assert_eq!(limit, Some(5));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    fn write_config(dir: &tempfile::TempDir, json: &str) -> PathBuf {
        let path = dir.path().join("stamper.json");
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn start_flags_override_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"{"server": {"default_host": "127.0.0.1", "default_port": 4000}}"#,
        );

        let config = start_config(
            Some(&path),
            StartOverrides {
                port: Some(5000),
                data: Some(PathBuf::from("/srv/stamper")),
                memory: true,
                ..StartOverrides::default()
            },
        )
        .unwrap();
        assert_eq!(config.server.default_host, "127.0.0.1");
        assert_eq!(config.server.default_port, 5000);
        assert_eq!(config.storage.default_data_dir, PathBuf::from("/srv/stamper"));
        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn start_validates_merged_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_config(&dir, "{}");

        let err = start_config(
            Some(&path),
            StartOverrides {
                host: Some(String::new()),
                ..StartOverrides::default()
            },
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("server.default_host"));
    }

    #[test]
    fn start_requires_explicit_config_file_to_exist() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(start_config(Some(&missing), StartOverrides::default()).is_err());
    }

    #[tokio::test]
    async fn content_args_read_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("content.txt");
        std::fs::write(&path, "from file").unwrap();

        let args = ContentArgs {
            content: None,
            file: Some(path),
        };
        assert_eq!(args.read().await.unwrap().as_deref(), Some("from file"));

        let empty = ContentArgs {
            content: None,
            file: None,
        };
        assert_eq!(empty.read().await.unwrap(), None);
    }
}
