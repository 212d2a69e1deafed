//! One publication run.
//!
//! Fetch every provider once, then process the league scope followed by
//! each team in scope, strictly in sequence. For every scope:
//! freshness filter → snapshot → change check → zero suppression →
//! standings (lazily, once per run) → layout → render → publish →
//! cache write-back. Team posts reply to the league post when one was
//! published in the same run.
//!
//! Only cache store failures abort the run. Everything else is recorded
//! in the `RunReport` and the run moves on to the next scope.

use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;
use tracing::{error, info, warn};

use crate::config::{AppConfig, FreshnessConfig};
use crate::data::teams::TEAMS;
use crate::data::StandingsSource;
use crate::engine::dedup::{ChangeCheck, Deduplicator};
use crate::engine::publisher::{Post, Publication, Publisher, RetryPolicy};
use crate::engine::staleness::{fresh_providers, FreshnessContext};
use crate::engine::standings::{build_tables, ConferenceTable};
use crate::providers::{self, OddsProvider};
use crate::render::format::format_odds;
use crate::render::layout::{league_scene, team_scene, LeagueView, Scene, TeamFigure, TeamView};
use crate::render::ImageRenderer;
use crate::social::SocialClient;
use crate::storage::CacheStore;
use crate::types::{
    ClinchIndicator, OddsSnapshot, PipelineError, ProviderOdds, RenderedImage, Scope, Standing,
    Team, Thread,
};

// ---------------------------------------------------------------------------
// Settings & collaborators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub namespace: String,
    pub season_games: u32,
    pub attribution: String,
    pub timezone: Tz,
    pub freshness: FreshnessConfig,
    pub retry: RetryPolicy,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, PipelineError> {
        let timezone: Tz = config.bot.timezone.parse().map_err(|_| {
            PipelineError::ConfigurationMissing(format!(
                "bot.timezone: unknown zone {}",
                config.bot.timezone
            ))
        })?;

        Ok(Self {
            namespace: config.bot.namespace.clone(),
            season_games: config.bot.season_games,
            attribution: config.bot.attribution.clone(),
            timezone,
            freshness: config.freshness.clone(),
            retry: RetryPolicy::from(&config.publish),
        })
    }
}

/// External services a run talks to.
pub struct Services<'a> {
    pub providers: &'a [Box<dyn OddsProvider>],
    pub standings: &'a dyn StandingsSource,
    pub cache: &'a dyn CacheStore,
    pub social: &'a dyn SocialClient,
    pub renderer: &'a mut dyn ImageRenderer,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// What happened to each scope in a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub published: Vec<String>,
    pub unchanged: Vec<String>,
    pub suppressed: Vec<String>,
    pub skipped: Vec<String>,
    /// Scope and reason.
    pub failed: Vec<(String, String)>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn fail(&mut self, scope: &Scope, error: &PipelineError) {
        error!(scope = %scope, error = %error, "Scope failed");
        self.failed.push((scope.to_string(), error.to_string()));
    }
}

// ---------------------------------------------------------------------------
// Lazily fetched standings
// ---------------------------------------------------------------------------

enum StandingsState {
    Pending,
    Loaded(Vec<Standing>),
    Unavailable(String),
}

impl StandingsState {
    async fn get(&mut self, source: &dyn StandingsSource) -> Result<&[Standing], PipelineError> {
        if let StandingsState::Pending = self {
            *self = match source.standings().await {
                Ok(standings) => {
                    info!(teams = standings.len(), "Standings retrieved");
                    StandingsState::Loaded(standings)
                }
                Err(e) => {
                    warn!(error = %e, "Standings unavailable");
                    StandingsState::Unavailable(e.to_string())
                }
            };
        }

        match self {
            StandingsState::Loaded(standings) => Ok(standings),
            StandingsState::Unavailable(message) => {
                Err(PipelineError::StandingsUnavailable(message.clone()))
            }
            StandingsState::Pending => Err(PipelineError::StandingsUnavailable(
                "standings not loaded".into(),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Message text
// ---------------------------------------------------------------------------

/// `March 9, 2024 12:50 AM ET` for the latest of `timestamps`.
pub fn updated_label<'t>(
    timestamps: impl IntoIterator<Item = &'t DateTime<FixedOffset>>,
    timezone: Tz,
) -> String {
    let Some(latest) = timestamps
        .into_iter()
        .max_by_key(|ts| ts.with_timezone(&Utc))
    else {
        return String::new();
    };
    let local = latest.with_timezone(&timezone);
    let zone = local.format("%Z").to_string();
    format!("{} {}", local.format("%B %-d, %Y %-I:%M %p"), generic_zone(&zone))
}

/// `EST`/`EDT` → `ET`, other abbreviations unchanged.
fn generic_zone(abbreviation: &str) -> String {
    let bytes = abbreviation.as_bytes();
    if bytes.len() == 3 && (abbreviation.ends_with("ST") || abbreviation.ends_with("DT")) {
        format!("{}T", &abbreviation[..1])
    } else {
        abbreviation.to_string()
    }
}

/// `#NHL` plus the hashtag of every team still alive with every provider.
pub fn league_status_text(snapshot: &OddsSnapshot) -> String {
    let providers = snapshot.providers();
    let mut text = String::from("#NHL");
    if providers.is_empty() {
        return text;
    }
    for team in TEAMS {
        let alive = providers.iter().all(|p| {
            snapshot
                .value(*p, team.abbreviation)
                .is_some_and(|v| v > 0.0)
        });
        if alive {
            text.push_str(" #");
            text.push_str(team.hashtag);
        }
    }
    text
}

/// Alt text for the league image: one line per team in table order.
pub fn league_description(
    tables: &[ConferenceTable<'_>],
    snapshot: &OddsSnapshot,
    updated_at: &str,
) -> String {
    let providers = snapshot.providers();
    let mut lines: Vec<String> = Vec::new();
    for row in tables.iter().flat_map(|t| t.rows.iter()) {
        let mut line = row.standing.team_name.clone();
        for provider in &providers {
            let figure = snapshot
                .value(*provider, &row.standing.team)
                .map(format_odds)
                .unwrap_or_else(|| "-".to_string());
            line.push_str(&format!(" | {}: {}", provider.short_label(), figure));
        }
        lines.push(line);
    }
    lines.push(String::new());
    lines.push(format!("Updated: {updated_at}"));
    lines.join("\n")
}

/// Status post for a team card. An official status replaces the odds.
pub fn team_status_text(
    team: &Team,
    figures: &[TeamFigure],
    status: Option<&ClinchIndicator>,
) -> String {
    let mut text = format!("Updated playoff chances for the {}:\n\n", team.name);
    for figure in figures {
        let shown = match status {
            Some(status) => status.headline(),
            None => format_odds(figure.current),
        };
        text.push_str(&format!("• {}: {}\n", figure.provider, shown));
    }
    text.push_str(&format!(
        "\n#NHL #{} #{} #{}",
        team.hashtag,
        team.abbreviation,
        team.compact_name()
    ));
    text
}

pub fn team_description(status_text: &str, updated_at: &str) -> String {
    format!("{status_text}\n\nUpdated {updated_at}")
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct Pipeline<'a> {
    settings: PipelineSettings,
    providers: &'a [Box<dyn OddsProvider>],
    standings: &'a dyn StandingsSource,
    dedup: Deduplicator<'a>,
    publisher: Publisher<'a>,
    renderer: &'a mut dyn ImageRenderer,
}

impl<'a> Pipeline<'a> {
    pub fn new(settings: PipelineSettings, services: Services<'a>) -> Self {
        Self {
            dedup: Deduplicator::new(services.cache, settings.namespace.clone()),
            publisher: Publisher::new(services.social, settings.retry),
            providers: services.providers,
            standings: services.standings,
            renderer: services.renderer,
            settings,
        }
    }

    /// Process the league and then each of `teams`.
    pub async fn run(&mut self, teams: &[Team], now: DateTime<Utc>) -> Result<RunReport, PipelineError> {
        let fetched = providers::fetch_all(self.providers).await;
        if fetched.is_empty() {
            warn!("No provider returned odds");
        }

        let mut standings = StandingsState::Pending;
        let mut report = RunReport::default();

        let thread = self
            .process_league(&fetched, now, &mut standings, &mut report)
            .await?;

        for team in teams {
            self.process_team(team, &fetched, now, thread.as_ref(), &mut standings, &mut report)
                .await?;
        }

        Ok(report)
    }

    async fn process_league(
        &mut self,
        fetched: &[ProviderOdds],
        now: DateTime<Utc>,
        standings: &mut StandingsState,
        report: &mut RunReport,
    ) -> Result<Option<Thread>, PipelineError> {
        let scope = Scope::League;
        let fresh = fresh_providers(fetched, FreshnessContext::League, &self.settings.freshness, now);
        if fresh.is_empty() {
            info!(scope = %scope, "No recent odds, skipping");
            report.skipped.push(scope.to_string());
            return Ok(None);
        }

        let mut snapshot = OddsSnapshot::new(scope.clone());
        for odds in &fresh {
            for (team, percentage) in &odds.odds {
                snapshot.insert(odds.provider, team, *percentage);
            }
        }

        let Some(check) = self.check(&snapshot, report).await? else {
            return Ok(None);
        };

        let all = match standings.get(self.standings).await {
            Ok(all) => all,
            Err(e) => {
                report.fail(&scope, &e);
                return Ok(None);
            }
        };
        let tables = build_tables(all, self.settings.season_games);
        let updated_at = updated_label(fresh.iter().map(|o| &o.last_update), self.settings.timezone);

        let scene = league_scene(&LeagueView {
            tables: &tables,
            snapshot: &snapshot,
            updated_at: &updated_at,
            attribution: &self.settings.attribution,
        });
        let Some(image) = self.render(&scope, &scene, report) else {
            return Ok(None);
        };

        let post = Post {
            image,
            description: league_description(&tables, &snapshot, &updated_at),
            text: league_status_text(&snapshot),
        };
        let publication = self.publish(&scope, &check, post, None, report).await?;
        Ok(publication.map(|p| p.thread))
    }

    async fn process_team(
        &mut self,
        team: &Team,
        fetched: &[ProviderOdds],
        now: DateTime<Utc>,
        reply_to: Option<&Thread>,
        standings: &mut StandingsState,
        report: &mut RunReport,
    ) -> Result<(), PipelineError> {
        let scope = Scope::Team(team.abbreviation.to_string());
        let fresh = fresh_providers(fetched, FreshnessContext::Team, &self.settings.freshness, now);

        let mut snapshot = OddsSnapshot::new(scope.clone());
        let mut contributing = Vec::new();
        for odds in fresh {
            match odds.sample(team.abbreviation) {
                Ok(sample) => {
                    snapshot.insert(sample.provider, &sample.team, sample.percentage);
                    contributing.push(odds);
                }
                Err(e) => {
                    report.fail(&scope, &e);
                    return Ok(());
                }
            }
        }

        if snapshot.is_empty() {
            info!(scope = %scope, "No recent odds, skipping");
            report.skipped.push(scope.to_string());
            return Ok(());
        }

        let Some(check) = self.check(&snapshot, report).await? else {
            return Ok(());
        };

        let previous = check.previous_snapshot(&scope);
        let figures: Vec<TeamFigure> = snapshot
            .providers()
            .into_iter()
            .filter_map(|provider| {
                snapshot.value(provider, team.abbreviation).map(|current| TeamFigure {
                    provider,
                    current,
                    previous: previous
                        .as_ref()
                        .and_then(|p| p.value(provider, team.abbreviation)),
                })
            })
            .collect();

        // A missing record line is not worth failing the card for.
        let standing = match standings.get(self.standings).await {
            Ok(all) => all.iter().find(|s| s.team == team.abbreviation),
            Err(e) => {
                warn!(scope = %scope, error = %e, "Drawing card without record");
                None
            }
        };

        let updated_at = updated_label(
            contributing.iter().map(|o| &o.last_update),
            self.settings.timezone,
        );
        let scene = team_scene(&TeamView {
            team,
            standing,
            figures: &figures,
            updated_at: &updated_at,
            attribution: &self.settings.attribution,
        });
        let Some(image) = self.render(&scope, &scene, report) else {
            return Ok(());
        };

        let text = team_status_text(team, &figures, standing.and_then(|s| s.clinch.as_ref()));
        let post = Post {
            image,
            description: team_description(&text, &updated_at),
            text,
        };
        self.publish(&scope, &check, post, reply_to, report).await?;
        Ok(())
    }

    /// Change check plus zero suppression. `None` means stop here.
    async fn check(
        &self,
        snapshot: &OddsSnapshot,
        report: &mut RunReport,
    ) -> Result<Option<ChangeCheck>, PipelineError> {
        let check = self.dedup.check(snapshot).await?;
        if !check.should_publish() {
            info!(scope = %snapshot.scope, "No new odds found.");
            report.unchanged.push(snapshot.scope.to_string());
            return Ok(None);
        }
        if snapshot.is_effectively_zero() {
            info!(scope = %snapshot.scope, "Odds are 0%, not posting");
            report.suppressed.push(snapshot.scope.to_string());
            return Ok(None);
        }
        Ok(Some(check))
    }

    fn render(&mut self, scope: &Scope, scene: &Scene, report: &mut RunReport) -> Option<RenderedImage> {
        match self.renderer.render(scene) {
            Ok(image) => Some(image),
            Err(e) => {
                report.fail(scope, &e);
                None
            }
        }
    }

    /// Publish and, on success, record the fingerprint. Publish failures
    /// are reported; cache failures abort the run.
    async fn publish(
        &self,
        scope: &Scope,
        check: &ChangeCheck,
        post: Post,
        reply_to: Option<&Thread>,
        report: &mut RunReport,
    ) -> Result<Option<Publication>, PipelineError> {
        info!(scope = %scope, reply = reply_to.is_some(), "Publishing");
        match self.publisher.publish(post, reply_to).await {
            Ok(publication) => {
                self.dedup.record(check).await?;
                report.published.push(scope.to_string());
                Ok(Some(publication))
            }
            Err(e) => {
                report.fail(scope, &e);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::teams::find_team;
    use crate::types::{Conference, ProviderKind};

    fn ts(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn test_updated_label_uses_latest_in_zone() {
        let stamps = [ts("2024-03-09T00:50:54-05:00"), ts("2024-03-08T12:00:00Z")];
        assert_eq!(
            updated_label(stamps.iter(), chrono_tz::America::New_York),
            "March 9, 2024 12:50 AM ET"
        );
        let summer = [ts("2024-04-02T13:03:00Z")];
        assert_eq!(
            updated_label(summer.iter(), chrono_tz::America::New_York),
            "April 2, 2024 9:03 AM ET"
        );
        assert_eq!(updated_label(summer.iter(), chrono_tz::UTC), "April 2, 2024 1:03 PM UTC");
    }

    #[test]
    fn test_league_status_text_only_alive_teams() {
        let mut snapshot = OddsSnapshot::new(Scope::League);
        snapshot.insert(ProviderKind::MoneyPuck, "BOS", 99.0);
        snapshot.insert(ProviderKind::SportsClubStats, "BOS", 98.0);
        snapshot.insert(ProviderKind::MoneyPuck, "NSH", 58.35);
        snapshot.insert(ProviderKind::SportsClubStats, "NSH", 0.0);
        snapshot.insert(ProviderKind::MoneyPuck, "SJS", 0.0);
        snapshot.insert(ProviderKind::SportsClubStats, "SJS", 0.0);

        assert_eq!(league_status_text(&snapshot), "#NHL #NHLBruins");
        assert_eq!(league_status_text(&OddsSnapshot::new(Scope::League)), "#NHL");
    }

    #[test]
    fn test_league_description_lines() {
        let mut nsh = Standing::sample("NSH", Conference::Western, "C");
        nsh.team_name = "Nashville Predators".into();
        let standings = vec![nsh];
        let tables = build_tables(&standings, 82);
        let mut snapshot = OddsSnapshot::new(Scope::League);
        snapshot.insert(ProviderKind::MoneyPuck, "NSH", 58.35);
        snapshot.insert(ProviderKind::SportsClubStats, "NSH", 61.2);

        assert_eq!(
            league_description(&tables, &snapshot, "March 9, 2024 12:50 AM ET"),
            "Nashville Predators | MP: 58.35% | SCS: 61.2%\n\nUpdated: March 9, 2024 12:50 AM ET"
        );
    }

    #[test]
    fn test_team_status_text() {
        let team = find_team("NSH").unwrap();
        let figures = [
            TeamFigure {
                provider: ProviderKind::MoneyPuck,
                current: 58.35,
                previous: Some(49.57),
            },
            TeamFigure {
                provider: ProviderKind::SportsClubStats,
                current: 61.2,
                previous: None,
            },
        ];
        let text = team_status_text(team, &figures, None);
        assert_eq!(
            text,
            format!(
                "Updated playoff chances for the Nashville Predators:\n\n\
                 • MoneyPuck: 58.35%\n\
                 • Sports Club Stats: 61.2%\n\n\
                 #NHL #{} #NSH #NashvillePredators",
                team.hashtag
            )
        );
        assert!(team_description(&text, "now").ends_with("\n\nUpdated now"));

        let clinched = team_status_text(team, &figures, Some(&ClinchIndicator::ClinchedPlayoffs));
        assert!(clinched.contains("• MoneyPuck: Clinched Playoffs\n"));
        assert!(clinched.contains("• Sports Club Stats: Clinched Playoffs\n"));
        assert!(!clinched.contains('%'));
    }

    #[test]
    fn test_settings_reject_unknown_timezone() {
        let mut config = AppConfig::default();
        config.bot.timezone = "Mars/Olympus".into();
        assert!(matches!(
            PipelineSettings::from_config(&config),
            Err(PipelineError::ConfigurationMissing(_))
        ));
        config.bot.timezone = "America/Toronto".into();
        assert!(PipelineSettings::from_config(&config).is_ok());
    }
}
