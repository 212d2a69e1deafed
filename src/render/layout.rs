//! Image layout: builds a display list for the league table and team
//! cards.
//!
//! Layout is a pure function of its inputs. It decides every position,
//! size, color and string that ends up in the image but touches no fonts
//! or files; `raster` turns the resulting `Scene` into PNG bytes.

use crate::engine::standings::{ConferenceTable, RankedTeam};
use crate::render::format::{format_delta, format_odds};
use crate::types::{OddsSnapshot, ProviderKind, Standing, Team};

// ---------------------------------------------------------------------------
// Display list
// ---------------------------------------------------------------------------

/// RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub [u8; 4]);

impl Color {
    pub const WHITE: Color = Color([0xFF, 0xFF, 0xFF, 0xFF]);
    pub const BLACK: Color = Color([0x00, 0x00, 0x00, 0xFF]);
    pub const GREY: Color = Color([0x99, 0x99, 0x99, 0xFF]);
    pub const NAVY: Color = Color([0x00, 0x00, 0x80, 0xFF]);
    pub const MAROON: Color = Color([0x80, 0x00, 0x00, 0xFF]);
    pub const GAIN: Color = Color([0x22, 0xBB, 0x33, 0xFF]);
    pub const LOSS: Color = Color([0xBB, 0x21, 0x24, 0xFF]);

    /// Parse `#RRGGBB`.
    pub fn from_hex(hex: &str) -> Option<Color> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        Some(Color([channel(0)?, channel(2)?, channel(4)?, 0xFF]))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontWeight {
    Regular,
    Black,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    FillRect {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        color: Color,
    },
    /// One-pixel horizontal line.
    Rule {
        x0: i32,
        x1: i32,
        y: i32,
        color: Color,
        dashed: bool,
    },
    /// Text anchored at `x` (per `align`) with its baseline at `baseline`.
    Text {
        text: String,
        x: i32,
        baseline: i32,
        size: f32,
        weight: FontWeight,
        align: Align,
        color: Color,
    },
    /// A team crest scaled to a `size`×`size` square.
    Crest {
        team: String,
        x: i32,
        y: i32,
        size: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub width: u32,
    pub height: u32,
    pub background: Color,
    pub ops: Vec<DrawOp>,
}

impl Scene {
    pub fn new(width: u32, height: u32, background: Color) -> Self {
        Self {
            width,
            height,
            background,
            ops: Vec::new(),
        }
    }

    fn push(&mut self, op: DrawOp) {
        self.ops.push(op);
    }

    #[allow(clippy::too_many_arguments)]
    fn text(
        &mut self,
        text: impl Into<String>,
        x: i32,
        baseline: i32,
        size: f32,
        weight: FontWeight,
        align: Align,
        color: Color,
    ) {
        self.push(DrawOp::Text {
            text: text.into(),
            x,
            baseline,
            size,
            weight,
            align,
            color,
        });
    }

    /// Every string drawn, in draw order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Teams whose crest is drawn, in draw order.
    pub fn crests(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Crest { team, .. } => Some(team.as_str()),
            _ => None,
        })
    }
}

// ---------------------------------------------------------------------------
// League table
// ---------------------------------------------------------------------------

const LEAGUE_WIDTH: u32 = 810;
const LEAGUE_HEIGHT: u32 = 560;
const COLUMN_X: [i32; 2] = [60, 460];
const COLUMN_WIDTH: i32 = 330;
const HEADER_BASELINE: i32 = 30;
const FIRST_ROW_Y: i32 = 40;
const ROW_HEIGHT: i32 = 30;
const CREST_SIZE: u32 = 30;
const ODDS_COLUMN_WIDTH: i32 = 65;
/// Solid dividers below these row counts: end of each division block and
/// of the wildcard spots.
const BLOCK_ENDS: [usize; 3] = [3, 6, 8];
const LEAGUE_FOOTER_BASELINE: i32 = 545;

pub struct LeagueView<'a> {
    pub tables: &'a [ConferenceTable<'a>],
    pub snapshot: &'a OddsSnapshot,
    pub updated_at: &'a str,
    pub attribution: &'a str,
}

/// Team name with the official status code appended, e.g. `Dallas Stars (x)`.
pub fn display_name(row: &RankedTeam<'_>) -> String {
    match &row.status {
        Some(status) => format!("{} ({})", row.standing.team_name, status.code()),
        None => row.standing.team_name.clone(),
    }
}

pub fn league_scene(view: &LeagueView<'_>) -> Scene {
    let mut scene = Scene::new(LEAGUE_WIDTH, LEAGUE_HEIGHT, Color::WHITE);
    let providers = view.snapshot.providers();
    let odds_columns = providers.len().max(1) as i32;
    let right = COLUMN_WIDTH;
    let points_x = right - odds_columns * ODDS_COLUMN_WIDTH - 10;

    for (table, &x) in view.tables.iter().zip(COLUMN_X.iter()) {
        scene.text(
            table.conference.to_string(),
            x,
            HEADER_BASELINE,
            14.0,
            FontWeight::Black,
            Align::Left,
            Color::BLACK,
        );
        scene.text("Pts.", x + points_x, HEADER_BASELINE, 12.0, FontWeight::Black, Align::Right, Color::BLACK);
        for (i, provider) in providers.iter().enumerate() {
            let column_right = x + right - (providers.len() - 1 - i) as i32 * ODDS_COLUMN_WIDTH;
            scene.text(
                provider.short_label(),
                column_right,
                HEADER_BASELINE,
                12.0,
                FontWeight::Black,
                Align::Right,
                Color::BLACK,
            );
        }

        for (i, row) in table.rows.iter().enumerate() {
            let top = FIRST_ROW_Y + i as i32 * ROW_HEIGHT;
            let baseline = top + 20;
            let standing = row.standing;

            scene.text(row.rank_label, x - 30, baseline, 12.0, FontWeight::Black, Align::Center, Color::BLACK);
            scene.push(DrawOp::Crest {
                team: standing.team.clone(),
                x,
                y: top,
                size: CREST_SIZE,
            });
            scene.text(display_name(row), x + 35, baseline, 13.0, FontWeight::Regular, Align::Left, Color::BLACK);
            scene.text(
                standing.points.to_string(),
                x + points_x,
                baseline,
                13.0,
                FontWeight::Regular,
                Align::Right,
                Color::BLACK,
            );

            match &row.status {
                Some(status) => {
                    // Any official or computed status replaces the odds,
                    // even one we have no label for.
                    if let Some(label) = status.label() {
                        scene.text(label, x + right, baseline, 12.0, FontWeight::Black, Align::Right, Color::BLACK);
                    }
                }
                None => {
                    for (j, provider) in providers.iter().enumerate() {
                        let column_right =
                            x + right - (providers.len() - 1 - j) as i32 * ODDS_COLUMN_WIDTH;
                        let figure = view
                            .snapshot
                            .value(*provider, &standing.team)
                            .map(format_odds)
                            .unwrap_or_else(|| "-".to_string());
                        scene.text(figure, column_right, baseline, 13.0, FontWeight::Black, Align::Right, Color::BLACK);
                    }
                }
            }

            let rows_drawn = i + 1;
            let line_y = top + ROW_HEIGHT;
            if rows_drawn < table.rows.len() {
                scene.push(DrawOp::Rule {
                    x0: x - 45,
                    x1: x + right,
                    y: line_y,
                    color: if BLOCK_ENDS.contains(&rows_drawn) { Color::BLACK } else { Color::GREY },
                    dashed: !BLOCK_ENDS.contains(&rows_drawn),
                });
            }
        }
    }

    scene.text(
        view.attribution,
        COLUMN_X[0] - 45,
        LEAGUE_FOOTER_BASELINE,
        11.0,
        FontWeight::Regular,
        Align::Left,
        Color::BLACK,
    );
    scene.text(
        format!("Updated {}", view.updated_at),
        COLUMN_X[1] + COLUMN_WIDTH,
        LEAGUE_FOOTER_BASELINE,
        11.0,
        FontWeight::Regular,
        Align::Right,
        Color::BLACK,
    );

    scene
}

// ---------------------------------------------------------------------------
// Team card
// ---------------------------------------------------------------------------

const CARD_WIDTH: u32 = 800;
const CARD_HEIGHT: u32 = 540;
const FIGURE_X: i32 = 230;
const FIRST_BLOCK_Y: i32 = 175;
const BLOCK_HEIGHT: i32 = 140;

/// One provider's headline figure on a team card.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeamFigure {
    pub provider: ProviderKind,
    pub current: f64,
    /// Last published value, when one is known.
    pub previous: Option<f64>,
}

impl TeamFigure {
    /// Signed change since the last published value, if it moved.
    pub fn change(&self) -> Option<f64> {
        self.previous
            .map(|previous| self.current - previous)
            .filter(|change| *change != 0.0)
    }
}

pub struct TeamView<'a> {
    pub team: &'a Team,
    pub standing: Option<&'a Standing>,
    pub figures: &'a [TeamFigure],
    pub updated_at: &'a str,
    pub attribution: &'a str,
}

pub fn team_scene(view: &TeamView<'_>) -> Scene {
    let mut scene = Scene::new(CARD_WIDTH, CARD_HEIGHT, Color::WHITE);
    let team_color = Color::from_hex(view.team.color).unwrap_or(Color::BLACK);

    scene.push(DrawOp::FillRect {
        x: 40,
        y: 40,
        width: 720,
        height: 80,
        color: team_color,
    });
    scene.text(
        format!("PLAYOFF ODDS FOR THE {}", view.team.name.to_uppercase()),
        400,
        90,
        24.0,
        FontWeight::Black,
        Align::Center,
        Color::WHITE,
    );
    scene.push(DrawOp::Crest {
        team: view.team.abbreviation.to_string(),
        x: 440,
        y: 150,
        size: 300,
    });

    // An official status replaces every printed percentage.
    let status = view.standing.and_then(|s| s.clinch.as_ref());

    for (i, figure) in view.figures.iter().enumerate() {
        let top = FIRST_BLOCK_Y + i as i32 * BLOCK_HEIGHT;
        scene.text(
            figure.provider.to_string(),
            FIGURE_X,
            top + 25,
            30.0,
            FontWeight::Black,
            Align::Center,
            Color::NAVY,
        );
        if let Some(status) = status {
            scene.text(
                status.headline(),
                FIGURE_X,
                top + 85,
                36.0,
                FontWeight::Black,
                Align::Center,
                Color::MAROON,
            );
            continue;
        }
        scene.text(
            format_odds(figure.current),
            FIGURE_X,
            top + 90,
            60.0,
            FontWeight::Black,
            Align::Center,
            Color::MAROON,
        );
        if let Some(change) = figure.change() {
            let (glyph, color) = if change > 0.0 {
                ("▲", Color::GAIN)
            } else {
                ("▼", Color::LOSS)
            };
            scene.text(
                format!("{glyph} {}", format_delta(change)),
                FIGURE_X,
                top + 122,
                22.0,
                FontWeight::Regular,
                Align::Center,
                color,
            );
        }
    }

    if let Some(standing) = view.standing {
        scene.text(
            format!("Record: {} • {} points", standing.record(), standing.points),
            FIGURE_X,
            468,
            16.0,
            FontWeight::Regular,
            Align::Center,
            Color::BLACK,
        );
    }

    scene.push(DrawOp::FillRect {
        x: 40,
        y: 480,
        width: 720,
        height: 2,
        color: team_color,
    });
    scene.text(view.attribution, 50, 510, 18.0, FontWeight::Regular, Align::Left, Color::BLACK);
    scene.text(
        format!("Updated {}", view.updated_at),
        750,
        510,
        18.0,
        FontWeight::Regular,
        Align::Right,
        Color::BLACK,
    );

    scene
}
