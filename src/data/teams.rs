//! Static team roster.
//!
//! Identity data for the 32 franchises: abbreviation, names, hashtag,
//! brand color and conference/division membership.

use crate::types::{Conference, Team};

const fn team(
    abbreviation: &'static str,
    name: &'static str,
    short_name: &'static str,
    hashtag: &'static str,
    color: &'static str,
    conference: Conference,
    division: &'static str,
) -> Team {
    Team {
        abbreviation,
        name,
        short_name,
        hashtag,
        color,
        conference,
        division,
    }
}

use Conference::{Eastern as E, Western as W};

pub const TEAMS: &[Team] = &[
    // Atlantic
    team("BOS", "Boston Bruins", "Boston", "NHLBruins", "#FFB81C", E, "A"),
    team("BUF", "Buffalo Sabres", "Buffalo", "LetsGoBuffalo", "#003087", E, "A"),
    team("DET", "Detroit Red Wings", "Detroit", "LGRW", "#CE1126", E, "A"),
    team("FLA", "Florida Panthers", "Florida", "TimeToHunt", "#C8102E", E, "A"),
    team("MTL", "Montréal Canadiens", "Montreal", "GoHabsGo", "#AF1E2D", E, "A"),
    team("OTT", "Ottawa Senators", "Ottawa", "GoSensGo", "#C52032", E, "A"),
    team("TBL", "Tampa Bay Lightning", "Tampa Bay", "GoBolts", "#002868", E, "A"),
    team("TOR", "Toronto Maple Leafs", "Toronto", "LeafsForever", "#00205B", E, "A"),
    // Metropolitan
    team("CAR", "Carolina Hurricanes", "Carolina", "LetsGoCanes", "#CC0000", E, "M"),
    team("CBJ", "Columbus Blue Jackets", "Columbus", "CBJ", "#002654", E, "M"),
    team("NJD", "New Jersey Devils", "New Jersey", "NJDevils", "#CE1126", E, "M"),
    team("NYI", "New York Islanders", "NY Islanders", "Isles", "#00539B", E, "M"),
    team("NYR", "New York Rangers", "NY Rangers", "NYR", "#0038A8", E, "M"),
    team("PHI", "Philadelphia Flyers", "Philadelphia", "LetsGoFlyers", "#F74902", E, "M"),
    team("PIT", "Pittsburgh Penguins", "Pittsburgh", "LetsGoPens", "#FCB514", E, "M"),
    team("WSH", "Washington Capitals", "Washington", "ALLCAPS", "#C8102E", E, "M"),
    // Central
    team("CHI", "Chicago Blackhawks", "Chicago", "Blackhawks", "#CF0A2C", W, "C"),
    team("COL", "Colorado Avalanche", "Colorado", "GoAvsGo", "#6F263D", W, "C"),
    team("DAL", "Dallas Stars", "Dallas", "TexasHockey", "#006847", W, "C"),
    team("MIN", "Minnesota Wild", "Minnesota", "mnwild", "#154734", W, "C"),
    team("NSH", "Nashville Predators", "Nashville", "Preds", "#FFB81C", W, "C"),
    team("STL", "St. Louis Blues", "St. Louis", "stlblues", "#002F87", W, "C"),
    team("UTA", "Utah Hockey Club", "Utah", "UtahHC", "#71AFE5", W, "C"),
    team("WPG", "Winnipeg Jets", "Winnipeg", "GoJetsGo", "#041E42", W, "C"),
    // Pacific
    team("ANA", "Anaheim Ducks", "Anaheim", "FlyTogether", "#F47A38", W, "P"),
    team("CGY", "Calgary Flames", "Calgary", "Flames", "#C8102E", W, "P"),
    team("EDM", "Edmonton Oilers", "Edmonton", "LetsGoOilers", "#041E42", W, "P"),
    team("LAK", "Los Angeles Kings", "Los Angeles", "GoKingsGo", "#111111", W, "P"),
    team("SJS", "San Jose Sharks", "San Jose", "TheFutureIsTeal", "#006D75", W, "P"),
    team("SEA", "Seattle Kraken", "Seattle", "SeaKraken", "#001628", W, "P"),
    team("VAN", "Vancouver Canucks", "Vancouver", "Canucks", "#00205B", W, "P"),
    team("VGK", "Vegas Golden Knights", "Vegas", "VegasBorn", "#B4975A", W, "P"),
];

/// Find a team by abbreviation (case-insensitive).
pub fn find_team(abbreviation: &str) -> Option<&'static Team> {
    TEAMS
        .iter()
        .find(|t| t.abbreviation.eq_ignore_ascii_case(abbreviation.trim()))
}

/// Find a team by a provider label: full name, short name or abbreviation.
pub fn find_team_by_label(label: &str) -> Option<&'static Team> {
    let label = label.trim();
    TEAMS.iter().find(|t| {
        t.name.eq_ignore_ascii_case(label)
            || t.short_name.eq_ignore_ascii_case(label)
            || t.abbreviation.eq_ignore_ascii_case(label)
    })
}
