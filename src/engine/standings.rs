//! Conference ranking and elimination.
//!
//! The league image lists each conference as three division blocks
//! followed by the wildcard race. The order comes from the official
//! sequence numbers; elimination is the official indicator when present,
//! otherwise a conservative mathematical check against the teams holding
//! the last playoff spots.

use std::cmp::Ordering;

use tracing::debug;

use crate::types::{ClinchIndicator, Conference, Standing};

/// Rank labels by position within a conference. Positions past the end
/// are unlabelled.
pub const RANK_LABELS: [&str; 8] = ["1", "2", "3", "1", "2", "3", "WC1", "WC2"];

/// Wildcard sequence of the last team currently holding a playoff spot.
const SECOND_WILDCARD: u32 = 2;

/// Division places that qualify directly.
const DIVISION_SEEDS: u32 = 3;

/// Conferences in the order they are drawn.
pub const CONFERENCE_ORDER: [Conference; 2] = [Conference::Western, Conference::Eastern];

/// One row of a conference table.
#[derive(Debug, Clone)]
pub struct RankedTeam<'a> {
    pub standing: &'a Standing,
    pub rank_label: &'static str,
    /// Official indicator, or `Eliminated` when computed.
    pub status: Option<ClinchIndicator>,
}

#[derive(Debug, Clone)]
pub struct ConferenceTable<'a> {
    pub conference: Conference,
    pub rows: Vec<RankedTeam<'a>>,
}

fn ranking_order(a: &Standing, b: &Standing) -> Ordering {
    (a.wildcard_sequence, &a.division, a.division_sequence).cmp(&(
        b.wildcard_sequence,
        &b.division,
        b.division_sequence,
    ))
}

/// Teams of one conference sorted by (wildcard sequence, division,
/// division sequence).
pub fn rank_conference(standings: &[Standing], conference: Conference) -> Vec<&Standing> {
    let mut teams: Vec<&Standing> = standings
        .iter()
        .filter(|s| s.conference == conference)
        .collect();
    teams.sort_by(|a, b| ranking_order(a, b));
    teams
}

pub fn rank_label(position: usize) -> &'static str {
    RANK_LABELS.get(position).copied().unwrap_or("")
}

/// Points still reachable by winning every remaining game.
pub fn max_possible_points(standing: &Standing, season_games: u32) -> u32 {
    let remaining = season_games.saturating_sub(standing.games_played);
    standing.points + 2 * remaining
}

/// The team holding the second wildcard spot in `conference`.
pub fn second_wildcard(standings: &[Standing], conference: Conference) -> Option<&Standing> {
    standings
        .iter()
        .find(|s| s.conference == conference && s.wildcard_sequence == SECOND_WILDCARD)
}

/// Last division seed: the third-place team in `standing`'s division.
pub fn last_division_seed<'a>(standing: &Standing, standings: &'a [Standing]) -> Option<&'a Standing> {
    standings.iter().find(|s| {
        s.conference == standing.conference
            && s.division == standing.division
            && s.division_sequence == DIVISION_SEEDS
    })
}

/// Whether `standing` can no longer catch `target`, even winning every
/// remaining game in regulation.
fn cannot_catch(standing: &Standing, target: &Standing, season_games: u32) -> bool {
    if target.team == standing.team {
        return false;
    }
    let max_points = max_possible_points(standing, season_games);
    match max_points.cmp(&target.points) {
        Ordering::Less => true,
        Ordering::Greater => false,
        Ordering::Equal => {
            let remaining = season_games.saturating_sub(standing.games_played);
            let best_case = (
                standing.regulation_wins + remaining,
                standing.regulation_plus_ot_wins + remaining,
            );
            best_case < (target.regulation_wins, target.regulation_plus_ot_wins)
        }
    }
}

/// Conservative elimination check.
///
/// A team is out only when it can catch neither the second wildcard team
/// nor the last division seed of its own division. Catching means
/// reaching more points, or equal points with best-case tiebreakers
/// (every remaining game a regulation win) that do not lose to the
/// target's current ones. A team holding a division seed is never out,
/// and without a second wildcard team nobody is.
pub fn is_eliminated(standing: &Standing, standings: &[Standing], season_games: u32) -> bool {
    if standing.wildcard_sequence == 0 && standing.division_sequence <= DIVISION_SEEDS {
        return false;
    }
    let Some(wildcard) = second_wildcard(standings, standing.conference) else {
        return false;
    };
    if !cannot_catch(standing, wildcard, season_games) {
        return false;
    }
    match last_division_seed(standing, standings) {
        Some(seed) => cannot_catch(standing, seed, season_games),
        None => true,
    }
}

/// What to show instead of odds, if anything. The official indicator
/// always wins over the computed one.
pub fn display_status(
    standing: &Standing,
    standings: &[Standing],
    season_games: u32,
) -> Option<ClinchIndicator> {
    if let Some(official) = &standing.clinch {
        return Some(official.clone());
    }
    if is_eliminated(standing, standings, season_games) {
        debug!(team = %standing.team, "Computed elimination");
        return Some(ClinchIndicator::Eliminated);
    }
    None
}

/// Ranked tables for every conference present, West first.
pub fn build_tables(standings: &[Standing], season_games: u32) -> Vec<ConferenceTable<'_>> {
    CONFERENCE_ORDER
        .iter()
        .map(|&conference| ConferenceTable {
            conference,
            rows: rank_conference(standings, conference)
                .into_iter()
                .enumerate()
                .map(|(position, standing)| RankedTeam {
                    standing,
                    rank_label: rank_label(position),
                    status: display_status(standing, standings, season_games),
                })
                .collect(),
        })
        .filter(|table| !table.rows.is_empty())
        .collect()
}
