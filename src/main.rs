//! playoff-odds: publish NHL playoff odds to Mastodon.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! wires the providers, cache, renderer and social client together and
//! performs a single publication run (or clears the cache).

use anyhow::{anyhow, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};

use playoff_odds::config::{self, AppConfig, MastodonCredentials};
use playoff_odds::data::nhl::NhlStandingsClient;
use playoff_odds::data::teams::{find_team, TEAMS};
use playoff_odds::engine::dedup::{ClearScope, Deduplicator};
use playoff_odds::engine::pipeline::{Pipeline, PipelineSettings, RunReport, Services};
use playoff_odds::providers::moneypuck::MoneyPuckClient;
use playoff_odds::providers::sportsclubstats::SportsClubStatsClient;
use playoff_odds::providers::OddsProvider;
use playoff_odds::render::Rasterizer;
use playoff_odds::social::{DryRunClient, MastodonClient, SocialClient};
use playoff_odds::storage::{CacheStore, JsonFileStore, ReadOnlyStore, RedisStore};
use playoff_odds::types::Team;

const REDIS_CONNECT_ATTEMPTS: u32 = 3;

#[derive(Debug, Parser)]
#[command(name = "playoff-odds", version, about = "Publish NHL playoff odds to Mastodon")]
struct Cli {
    /// Path to the TOML configuration file (optional).
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// Only process this team (league image is still considered).
    #[arg(long, env = "TEAM_CODE")]
    team: Option<String>,

    /// Delete stored fingerprints so the next run republishes, then exit.
    #[arg(long)]
    cache_clear: bool,

    /// Write images to DIR instead of posting. The cache is read, never written.
    #[arg(long, value_name = "DIR")]
    dry_run: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    init_logging();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Run aborted");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let cfg = AppConfig::load_or_default(&cli.config)?;
    info!(
        config = %cli.config,
        namespace = %cfg.bot.namespace,
        team = ?cli.team,
        dry_run = cli.dry_run.is_some(),
        "playoff-odds starting up"
    );

    let teams: Vec<Team> = match &cli.team {
        Some(code) => vec![*find_team(code).ok_or_else(|| anyhow!("Unknown team code: {code}"))?],
        None => TEAMS.to_vec(),
    };

    // Everything that can be missing is resolved before any I/O.
    let store_target = StoreTarget::resolve(&cfg)?;

    if cli.cache_clear {
        let store = store_target.open().await?;
        let dedup = Deduplicator::new(store.as_ref(), cfg.bot.namespace.clone());
        let scope = match &cli.team {
            Some(_) => ClearScope::Team(teams[0].abbreviation.to_string()),
            None => ClearScope::All,
        };
        let cleared = dedup.clear(&scope).await?;
        info!(keys = cleared.len(), "Cache cleared");
        return Ok(ExitCode::SUCCESS);
    }

    let settings = PipelineSettings::from_config(&cfg)?;
    let social: Box<dyn SocialClient> = match &cli.dry_run {
        Some(dir) => {
            warn!(dir = %dir.display(), "Dry run: images are written locally and nothing is posted");
            Box::new(DryRunClient::new(dir))
        }
        None => {
            let credentials = MastodonCredentials::from_env()?;
            info!(instance = %credentials.base_url, "Posting to Mastodon");
            Box::new(MastodonClient::new(
                credentials,
                Duration::from_secs(cfg.publish.timeout_secs),
            )?)
        }
    };

    let store = store_target.open().await?;
    let cache: Box<dyn CacheStore> = if cli.dry_run.is_some() {
        Box::new(ReadOnlyStore::new(store))
    } else {
        store
    };

    let providers: Vec<Box<dyn OddsProvider>> = vec![
        Box::new(MoneyPuckClient::new()?),
        Box::new(SportsClubStatsClient::new()?),
    ];
    let standings = NhlStandingsClient::new()?;
    let mut rasterizer = Rasterizer::from_config(&cfg.assets);

    let mut pipeline = Pipeline::new(
        settings,
        Services {
            providers: &providers,
            standings: &standings,
            cache: cache.as_ref(),
            social: social.as_ref(),
            renderer: &mut rasterizer,
        },
    );
    let report = pipeline.run(&teams, Utc::now()).await?;
    log_run_report(&report);

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Where publication records live.
enum StoreTarget {
    File(String),
    Redis(String),
}

impl StoreTarget {
    /// A configured file path wins over `REDIS_URL`.
    fn resolve(cfg: &AppConfig) -> Result<Self> {
        if let Some(path) = &cfg.cache.path {
            return Ok(StoreTarget::File(path.clone()));
        }
        Ok(StoreTarget::Redis(AppConfig::resolve_env(config::ENV_REDIS_URL)?))
    }

    async fn open(&self) -> Result<Box<dyn CacheStore>> {
        match self {
            StoreTarget::File(path) => {
                info!(path = %path, "Using JSON file cache");
                Ok(Box::new(JsonFileStore::open(path)?))
            }
            StoreTarget::Redis(url) => {
                info!("Connecting to Redis cache");
                Ok(Box::new(RedisStore::connect(url, REDIS_CONNECT_ATTEMPTS).await?))
            }
        }
    }
}

/// Log a run summary.
fn log_run_report(report: &RunReport) {
    info!(
        published = ?report.published,
        unchanged = report.unchanged.len(),
        suppressed = ?report.suppressed,
        skipped = ?report.skipped,
        failed = report.failed.len(),
        "Run complete"
    );
    for (scope, reason) in &report.failed {
        error!(scope = %scope, reason = %reason, "Publish failed");
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("playoff_odds=info"));

    let json_logging = std::env::var("PLAYOFF_ODDS_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
