use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::scrims::database::{MatchEntry, SeasonPerformance};

/// One modal line per player: `ID,Kills,Deaths,Assists`, e.g. `017,15,10,5`.
static STAT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d{3})\s*,\s*(\d+)\s*,\s*(\d+)\s*,\s*(\d+)\s*$")
        .expect("stat line pattern is valid")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatParseError {
    #[error("invalid stat line '{0}', expected `ID,Kills,Deaths,Assists`")]
    Malformed(String),
    #[error("stat value out of range in '{0}'")]
    OutOfRange(String),
}

/// Parses a single submitted stat line into a well-typed match entry.
///
/// Validation happens here, at the form boundary: the store only ever sees
/// parsed non-negative integers and a 3-digit player id.
pub fn parse_stat_line(input: &str) -> Result<MatchEntry, StatParseError> {
    let captures = STAT_LINE
        .captures(input)
        .ok_or_else(|| StatParseError::Malformed(input.to_string()))?;
    let number = |index: usize| -> Result<i64, StatParseError> {
        captures[index]
            .parse()
            .map_err(|_| StatParseError::OutOfRange(input.to_string()))
    };
    Ok(MatchEntry {
        player_id: captures[1].to_string(),
        kills: number(2)?,
        deaths: number(3)?,
        assists: number(4)?,
    })
}

/// K/D with the zero-death fallback: a player who never died keeps their
/// kill count as the ratio instead of dividing by zero.
pub fn kd_ratio(kills: i64, deaths: i64) -> f64 {
    if deaths > 0 {
        kills as f64 / deaths as f64
    } else {
        kills as f64
    }
}

/// The `(season, ratio)` series a trend renderer consumes, in season order.
pub fn kd_trend(rows: &[SeasonPerformance]) -> Vec<(String, f64)> {
    rows.iter()
        .map(|row| {
            (
                row.season_name.clone(),
                kd_ratio(row.total_kills, row.total_deaths),
            )
        })
        .collect()
}
