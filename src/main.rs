use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use version_checker::config::{CheckerConfig, EndpointsConfig, ReleaseConfig, ReleaseSpec, log_path};
use version_checker::credentials::CredentialStore;
use version_checker::release::client::ClientRegistry;
use version_checker::release::source::ReleaseSource;
use version_checker::release::sources::Release;
use version_checker::release::types::ReleaseKind;

#[derive(Parser)]
#[command(name = "version-checker")]
#[command(version, about = "Checks GitHub releases and container images for new versions")]
struct Cli {
    /// Write logs to a file; `--log-file` alone uses the default location
    #[arg(long, global = true, value_name = "PATH", require_equals = true)]
    log_file: Option<Option<PathBuf>>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// JSON file with backend endpoints
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check the latest release of a GitHub repository
    Github {
        /// Repository as <org>/<repo>
        repository: String,
        /// Release tag currently in use
        #[arg(long)]
        current: String,
        /// Overrides `endpoints.githubApiUrl` from the config file
        #[arg(long)]
        api_url: Option<String>,
    },
    /// Check the tags of a container image repository
    Container {
        /// Image repository as <org>/<name>
        repository: String,
        /// Image tag currently in use
        #[arg(long)]
        current: String,
        /// Overrides `endpoints.registryUrl` from the config file
        #[arg(long)]
        registry_url: Option<String>,
    },
}

impl Command {
    fn into_parts(self, config: CheckerConfig) -> anyhow::Result<(EndpointsConfig, ReleaseConfig)> {
        let mut endpoints = config.endpoints;
        let (kind, repository, current) = match self {
            Command::Github {
                repository,
                current,
                api_url,
            } => {
                if let Some(url) = api_url {
                    endpoints.github_api_url = url;
                }
                (ReleaseKind::GITHUB, repository, current)
            }
            Command::Container {
                repository,
                current,
                registry_url,
            } => {
                if let Some(url) = registry_url {
                    endpoints.registry_url = url;
                }
                (ReleaseKind::CONTAINER_REGISTRY, repository, current)
            }
        };

        let (org, repo) = repository
            .split_once('/')
            .ok_or_else(|| anyhow!("expected <org>/<name>, got {}", repository))?;

        let release = ReleaseConfig {
            name: repository.clone(),
            kind,
            version: current,
            spec: ReleaseSpec {
                org: org.to_string(),
                repo: repo.to_string(),
            },
        };

        Ok((endpoints, release))
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<CheckerConfig> {
    let Some(path) = path else {
        return Ok(CheckerConfig::default());
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("invalid config file {:?}", path))
}

fn init_logging(
    log_file: Option<Option<PathBuf>>,
    json: bool,
) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("version_checker=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let Some(path) = log_file else {
        let builder = builder.with_writer(std::io::stderr);
        if json {
            builder.json().init();
        } else {
            builder.init();
        }
        return Ok(None);
    };

    let path = path.unwrap_or_else(log_path);
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("log file path has no file name: {:?}", path))?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create log directory {:?}", dir))?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let builder = builder.with_writer(writer).with_ansi(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(Some(guard))
}

async fn run(command: Command, config: CheckerConfig) -> anyhow::Result<()> {
    let (endpoints, config) = command.into_parts(config)?;

    let credentials = CredentialStore::new();
    credentials.bootstrap();

    let clients = Arc::new(ClientRegistry::new(endpoints));
    let mut release = Release::from_config(&config, clients)?;
    release
        .bootstrap(&credentials)
        .with_context(|| format!("failed to bootstrap {} source {}", config.kind, config.name))?;

    let check = release
        .has_new_version()
        .await
        .with_context(|| format!("failed to check {}", config.name))?;

    println!("{}", serde_json::to_string_pretty(&check)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.log_file, cli.log_json)?;
    let config = load_config(cli.config.as_deref())?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli.command, config))
}
