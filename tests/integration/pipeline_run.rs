//! End-to-end publication runs.

use chrono::{DateTime, Utc};
use std::time::Duration;

use playoff_odds::config::AppConfig;
use playoff_odds::data::teams::find_team;
use playoff_odds::engine::pipeline::{Pipeline, PipelineSettings, RunReport, Services};
use playoff_odds::engine::publisher::RetryPolicy;
use playoff_odds::providers::OddsProvider;
use playoff_odds::social::SocialError;
use playoff_odds::storage::{CacheStore, MemoryStore};
use playoff_odds::types::{ClinchIndicator, Conference, PipelineError, ProviderKind, Team};

use crate::mock_services::*;

const MP_UPDATED: &str = "2024-03-09T00:50:54-05:00";
const SCS_STALE_FOR_TEAMS: &str = "2024-03-06T00:00:00Z";

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-03-10T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn settings() -> PipelineSettings {
    let mut settings = PipelineSettings::from_config(&AppConfig::default()).unwrap();
    settings.retry = RetryPolicy {
        max_retries: 3,
        base_backoff: Duration::ZERO,
    };
    settings
}

fn teams(codes: &[&str]) -> Vec<Team> {
    codes.iter().map(|c| *find_team(c).unwrap()).collect()
}

fn western_standings() -> StaticStandings {
    StaticStandings::new(vec![
        standing("DAL", "Dallas Stars", Conference::Western, "C", 1, 0, 90),
        standing("NSH", "Nashville Predators", Conference::Western, "C", 4, 1, 78),
        standing("STL", "St. Louis Blues", Conference::Western, "C", 5, 2, 74),
        standing("SJS", "San Jose Sharks", Conference::Western, "P", 8, 9, 38),
    ])
}

fn moneypuck(odds: &[(&str, f64)]) -> Box<dyn OddsProvider> {
    Box::new(StaticProvider::new(ProviderKind::MoneyPuck, MP_UPDATED, odds))
}

async fn run(
    providers: &[Box<dyn OddsProvider>],
    standings: &StaticStandings,
    cache: &dyn CacheStore,
    social: &RecordingSocial,
    renderer: &mut CountingRenderer,
    teams: &[Team],
) -> Result<RunReport, PipelineError> {
    let mut pipeline = Pipeline::new(
        settings(),
        Services {
            providers,
            standings,
            cache,
            social,
            renderer,
        },
    );
    pipeline.run(teams, now()).await
}

#[tokio::test]
async fn test_second_identical_run_publishes_nothing() {
    let providers = vec![moneypuck(&[("DAL", 99.0), ("NSH", 58.35)])];
    let standings = western_standings();
    let cache = MemoryStore::new();
    let social = RecordingSocial::new();
    let mut renderer = CountingRenderer::default();
    let nsh = teams(&["NSH"]);

    let first = run(&providers, &standings, &cache, &social, &mut renderer, &nsh)
        .await
        .unwrap();
    assert_eq!(first.published, vec!["league".to_string(), "NSH".to_string()]);
    assert!(first.is_success());

    let second = run(&providers, &standings, &cache, &social, &mut renderer, &nsh)
        .await
        .unwrap();
    assert!(second.published.is_empty());
    assert_eq!(second.unchanged, vec!["league".to_string(), "NSH".to_string()]);

    assert_eq!(social.statuses().len(), 2);
    assert_eq!(renderer.scenes.len(), 2);
}

#[tokio::test]
async fn test_changed_team_odds_publish_and_replace_record() {
    let providers = vec![moneypuck(&[("NSH", 58.35)])];
    let standings = western_standings();
    let cache = MemoryStore::new();
    cache
        .set("hockey-bot-odds-league", r#"{"moneyPuck":{"NSH":58.35}}"#)
        .await
        .unwrap();
    cache
        .set("hockey-bot-odds-NSH", r#"{"moneyPuck":{"NSH":49.57}}"#)
        .await
        .unwrap();
    let social = RecordingSocial::new();
    let mut renderer = CountingRenderer::default();

    let report = run(&providers, &standings, &cache, &social, &mut renderer, &teams(&["NSH"]))
        .await
        .unwrap();

    assert_eq!(report.unchanged, vec!["league".to_string()]);
    assert_eq!(report.published, vec!["NSH".to_string()]);
    assert_eq!(
        cache.get("hockey-bot-odds-NSH").await.unwrap().as_deref(),
        Some(r#"{"moneyPuck":{"NSH":58.35}}"#)
    );

    let statuses = social.statuses();
    assert_eq!(statuses.len(), 1);
    let request = &statuses[0].1;
    assert!(request.text.starts_with("Updated playoff chances for the Nashville Predators:"));
    assert!(request.text.contains("• MoneyPuck: 58.35%"));
    assert!(request.text.contains("#NSH #NashvillePredators"));
    assert_eq!(request.in_reply_to_id, None);
    assert_eq!(request.media_ids, vec!["media-0".to_string()]);

    let descriptions = social.descriptions();
    assert!(descriptions[0].ends_with("Updated March 9, 2024 12:50 AM ET"));

    // The card shows the move since the last post and the team's record.
    let texts: Vec<&str> = renderer.scenes[0].texts().collect();
    assert!(texts.contains(&"▲ 8.78%"));
    assert!(texts.contains(&"Record: 39-23-4 • 78 points"));
}

#[tokio::test]
async fn test_identical_league_fingerprint_renders_nothing() {
    let providers = vec![moneypuck(&[("DAL", 99.0), ("NSH", 58.35)])];
    let standings = western_standings();
    let cache = MemoryStore::new();
    cache
        .set("hockey-bot-odds-league", r#"{"moneyPuck":{"DAL":99.0,"NSH":58.35}}"#)
        .await
        .unwrap();
    let social = RecordingSocial::new();
    let mut renderer = CountingRenderer::default();

    let report = run(&providers, &standings, &cache, &social, &mut renderer, &[])
        .await
        .unwrap();

    assert_eq!(report.unchanged, vec!["league".to_string()]);
    assert!(renderer.scenes.is_empty());
    assert_eq!(social.upload_attempts(), 0);
    assert!(social.statuses().is_empty());
    assert_eq!(standings.calls(), 0);
}

#[tokio::test]
async fn test_failed_publish_leaves_records_intact() {
    let providers = vec![moneypuck(&[("NSH", 58.35)])];
    let standings = western_standings();
    let cache = MemoryStore::new();
    cache
        .set("hockey-bot-odds-NSH", r#"{"moneyPuck":{"NSH":49.57}}"#)
        .await
        .unwrap();
    let social = RecordingSocial::failing(SocialError::Server {
        status: 503,
        body: "maintenance".into(),
    });
    let mut renderer = CountingRenderer::default();

    let report = run(&providers, &standings, &cache, &social, &mut renderer, &teams(&["NSH"]))
        .await
        .unwrap();

    assert!(!report.is_success());
    assert_eq!(report.failed.len(), 2);
    assert!(report.failed[0].1.contains("after 4 attempts"));
    // Four attempts per scope, league then team.
    assert_eq!(social.upload_attempts(), 8);
    assert!(social.statuses().is_empty());

    let records = cache.snapshot();
    assert_eq!(records.len(), 1);
    assert_eq!(records["hockey-bot-odds-NSH"], r#"{"moneyPuck":{"NSH":49.57}}"#);
}

#[tokio::test]
async fn test_rejected_publish_is_not_retried() {
    let providers = vec![moneypuck(&[("NSH", 58.35)])];
    let standings = western_standings();
    let cache = MemoryStore::new();
    let social = RecordingSocial::failing(SocialError::Rejected {
        status: 422,
        body: "Validation failed".into(),
    });
    let mut renderer = CountingRenderer::default();

    let report = run(&providers, &standings, &cache, &social, &mut renderer, &teams(&["NSH"]))
        .await
        .unwrap();

    assert_eq!(report.failed.len(), 2);
    assert_eq!(social.upload_attempts(), 2);
    assert!(cache.snapshot().is_empty());
}

#[tokio::test]
async fn test_stale_provider_is_left_out_of_team_cards() {
    let providers: Vec<Box<dyn OddsProvider>> = vec![
        moneypuck(&[("NSH", 58.35)]),
        Box::new(StaticProvider::new(
            ProviderKind::SportsClubStats,
            SCS_STALE_FOR_TEAMS,
            &[("NSH", 61.2)],
        )),
    ];
    let standings = western_standings();
    let cache = MemoryStore::new();
    let social = RecordingSocial::new();
    let mut renderer = CountingRenderer::default();

    let report = run(&providers, &standings, &cache, &social, &mut renderer, &teams(&["NSH"]))
        .await
        .unwrap();
    assert_eq!(report.published.len(), 2);

    let records = cache.snapshot();
    assert_eq!(
        records["hockey-bot-odds-league"],
        r#"{"moneyPuck":{"NSH":58.35},"sportsClubStats":{"NSH":61.2}}"#
    );
    assert_eq!(records["hockey-bot-odds-NSH"], r#"{"moneyPuck":{"NSH":58.35}}"#);

    let team_text = &social.statuses()[1].1.text;
    assert!(team_text.contains("• MoneyPuck: 58.35%"));
    assert!(!team_text.contains("Sports Club Stats"));
}

#[tokio::test]
async fn test_all_providers_stale_skips_team() {
    let providers = vec![Box::new(StaticProvider::new(
        ProviderKind::MoneyPuck,
        SCS_STALE_FOR_TEAMS,
        &[("NSH", 58.35)],
    )) as Box<dyn OddsProvider>];
    let standings = western_standings();
    let cache = MemoryStore::new();
    let social = RecordingSocial::new();
    let mut renderer = CountingRenderer::default();

    let report = run(&providers, &standings, &cache, &social, &mut renderer, &teams(&["NSH"]))
        .await
        .unwrap();

    assert_eq!(report.published, vec!["league".to_string()]);
    assert_eq!(report.skipped, vec!["NSH".to_string()]);
    assert!(report.is_success());
    assert!(cache.get("hockey-bot-odds-NSH").await.unwrap().is_none());
}

#[tokio::test]
async fn test_zero_odds_are_suppressed() {
    let providers = vec![moneypuck(&[("NSH", 58.35), ("SJS", 0.0)])];
    let standings = western_standings();
    let cache = MemoryStore::new();
    cache
        .set("hockey-bot-odds-league", r#"{"moneyPuck":{"NSH":58.35,"SJS":0.0}}"#)
        .await
        .unwrap();
    let social = RecordingSocial::new();
    let mut renderer = CountingRenderer::default();

    let report = run(&providers, &standings, &cache, &social, &mut renderer, &teams(&["SJS"]))
        .await
        .unwrap();

    assert_eq!(report.suppressed, vec!["SJS".to_string()]);
    assert!(report.is_success());
    assert!(renderer.scenes.is_empty());
    assert!(social.statuses().is_empty());
    assert!(cache.get("hockey-bot-odds-SJS").await.unwrap().is_none());
}

#[tokio::test]
async fn test_team_posts_reply_to_league_post() {
    let providers = vec![moneypuck(&[("DAL", 99.0), ("NSH", 58.35), ("STL", 30.1)])];
    let standings = western_standings();
    let cache = MemoryStore::new();
    let social = RecordingSocial::new();
    let mut renderer = CountingRenderer::default();

    let report = run(
        &providers,
        &standings,
        &cache,
        &social,
        &mut renderer,
        &teams(&["NSH", "STL"]),
    )
    .await
    .unwrap();
    assert_eq!(report.published.len(), 3);

    let statuses = social.statuses();
    let league_id = statuses[0].0.clone();
    assert!(statuses[0].1.text.starts_with("#NHL"));
    assert!(statuses[0].1.in_reply_to_id.is_none());
    assert_eq!(statuses[1].1.in_reply_to_id.as_deref(), Some(league_id.as_str()));
    assert_eq!(statuses[2].1.in_reply_to_id.as_deref(), Some(league_id.as_str()));

    // League alt text lists teams in table order.
    let league_description = &social.descriptions()[0];
    assert!(league_description.starts_with("Dallas Stars | MP: 99%\n"));
    assert!(league_description.contains("Nashville Predators | MP: 58.35%"));
    assert!(league_description.ends_with("Updated: March 9, 2024 12:50 AM ET"));

    // Standings are fetched once for the whole run.
    assert_eq!(standings.calls(), 1);
}

#[tokio::test]
async fn test_missing_standings_only_fail_the_league_image() {
    let providers = vec![moneypuck(&[("NSH", 58.35)])];
    let standings = StaticStandings::unavailable();
    let cache = MemoryStore::new();
    let social = RecordingSocial::new();
    let mut renderer = CountingRenderer::default();

    let report = run(&providers, &standings, &cache, &social, &mut renderer, &teams(&["NSH"]))
        .await
        .unwrap();

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "league");
    assert_eq!(report.published, vec!["NSH".to_string()]);
    assert_eq!(standings.calls(), 1);

    let statuses = social.statuses();
    assert_eq!(statuses.len(), 1);
    assert!(statuses[0].1.in_reply_to_id.is_none());
    assert!(!renderer.scenes[0].texts().any(|t| t.starts_with("Record")));
    assert!(cache.get("hockey-bot-odds-league").await.unwrap().is_none());
}

#[tokio::test]
async fn test_unavailable_provider_is_omitted() {
    let providers: Vec<Box<dyn OddsProvider>> = vec![
        Box::new(StaticProvider::unavailable(ProviderKind::MoneyPuck)),
        Box::new(StaticProvider::new(
            ProviderKind::SportsClubStats,
            MP_UPDATED,
            &[("NSH", 61.2)],
        )),
    ];
    let standings = western_standings();
    let cache = MemoryStore::new();
    let social = RecordingSocial::new();
    let mut renderer = CountingRenderer::default();

    let report = run(&providers, &standings, &cache, &social, &mut renderer, &teams(&["NSH"]))
        .await
        .unwrap();

    assert_eq!(report.published.len(), 2);
    assert_eq!(
        cache.get("hockey-bot-odds-NSH").await.unwrap().as_deref(),
        Some(r#"{"sportsClubStats":{"NSH":61.2}}"#)
    );
}

#[tokio::test]
async fn test_team_missing_from_fresh_feed_fails_that_team() {
    let providers: Vec<Box<dyn OddsProvider>> = vec![
        moneypuck(&[("DAL", 99.0), ("NSH", 58.35)]),
        Box::new(StaticProvider::new(
            ProviderKind::SportsClubStats,
            MP_UPDATED,
            &[("DAL", 99.9)],
        )),
    ];
    let standings = western_standings();
    let cache = MemoryStore::new();
    let social = RecordingSocial::new();
    let mut renderer = CountingRenderer::default();

    let report = run(
        &providers,
        &standings,
        &cache,
        &social,
        &mut renderer,
        &teams(&["NSH", "DAL"]),
    )
    .await
    .unwrap();

    assert!(!report.is_success());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "NSH");
    assert!(report.failed[0].1.contains("NSH not found"));
    assert!(report.skipped.is_empty());
    // The next team is still processed.
    assert_eq!(report.published, vec!["league".to_string(), "DAL".to_string()]);
    assert!(cache.get("hockey-bot-odds-NSH").await.unwrap().is_none());
    assert_eq!(social.statuses().len(), 2);
}

#[tokio::test]
async fn test_official_status_replaces_team_odds() {
    let providers = vec![moneypuck(&[("DAL", 99.2)])];
    let mut dal = standing("DAL", "Dallas Stars", Conference::Western, "C", 1, 0, 90);
    dal.clinch = Some(ClinchIndicator::ClinchedPlayoffs);
    let standings = StaticStandings::new(vec![dal]);
    let cache = MemoryStore::new();
    cache
        .set("hockey-bot-odds-league", r#"{"moneyPuck":{"DAL":99.2}}"#)
        .await
        .unwrap();
    let social = RecordingSocial::new();
    let mut renderer = CountingRenderer::default();

    let report = run(&providers, &standings, &cache, &social, &mut renderer, &teams(&["DAL"]))
        .await
        .unwrap();
    assert_eq!(report.published, vec!["DAL".to_string()]);

    let text = &social.statuses()[0].1.text;
    assert!(text.contains("• MoneyPuck: Clinched Playoffs"));
    assert!(!text.contains("99.2%"));

    let texts: Vec<&str> = renderer.scenes[0].texts().collect();
    assert!(texts.contains(&"Clinched Playoffs"));
    assert!(!texts.contains(&"99.2%"));
}

#[tokio::test]
async fn test_cache_failure_aborts_run() {
    let providers = vec![moneypuck(&[("NSH", 58.35)])];
    let standings = western_standings();
    let social = RecordingSocial::new();
    let mut renderer = CountingRenderer::default();

    let err = run(&providers, &standings, &BrokenStore, &social, &mut renderer, &teams(&["NSH"]))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Cache(_)));
    assert!(social.statuses().is_empty());
}
