use ::serenity::all::{Color, CreateEmbed};
use poise::serenity_prelude as serenity;

use crate::scrims::database::{LeaderboardEntry, SeasonPerformance};
use crate::scrims::stats;

pub fn welcome_embed(member: &serenity::Member, player_id: &str) -> CreateEmbed {
    CreateEmbed::new()
        .title(format!("Welcome to the Server, {}!", member.user.name))
        .description(format!(
            "We're glad to have you here.\nYour unique server ID is **#{player_id}**.\n\n\
             Please use the `/register` command to set your in-game name."
        ))
        .color(Color::BLUE)
        .thumbnail(member.user.face())
}

/// One field per season, oldest first, with the trend line appended when the
/// caller asked for it and there is more than one season to compare.
pub fn performance_embed(
    ingame_name: &str,
    rows: &[SeasonPerformance],
    with_trend: bool,
) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .title(format!("Performance for {ingame_name}"))
        .color(Color::BLUE);
    for row in rows {
        let kd = stats::kd_ratio(row.total_kills, row.total_deaths);
        embed = embed.field(
            format!("Season: {}", row.season_name),
            format!(
                "K/D: {kd:.2} | Kills: {} | Deaths: {} | Assists: {}",
                row.total_kills, row.total_deaths, row.total_assists
            ),
            false,
        );
    }
    if with_trend {
        let trend = stats::kd_trend(rows)
            .into_iter()
            .map(|(season, kd)| format!("{season} {kd:.2}"))
            .collect::<Vec<_>>()
            .join("  >  ");
        embed = embed.field("K/D trend", trend, false);
    }
    embed
}

pub fn leaderboard_embed(season_name: &str, rows: &[LeaderboardEntry]) -> CreateEmbed {
    let description = rows
        .iter()
        .enumerate()
        .map(|(rank, row)| {
            format!(
                "**{}. {}** - K/D: {:.2}",
                rank + 1,
                row.ingame_name,
                stats::kd_ratio(row.total_kills, row.total_deaths)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    CreateEmbed::new()
        .title(format!("Leaderboard for {season_name}"))
        .description(description)
        .color(Color::GOLD)
}
