pub mod embed;

use std::time::Duration;

use poise::serenity_prelude as serenity;
use poise::Modal;
use tracing::{error, info, warn};

use crate::scrims::database::{IdAssignment, MatchEntry, RosterChange, StoreError};
use crate::scrims::stats::{self, StatParseError};
use crate::{Context, Data, Error};

/// Command check for admin commands: the invoker must hold one of the roles
/// named in the bot config.
pub async fn authorized(ctx: Context<'_>) -> Result<bool, Error> {
    let Some(member) = ctx.author_member().await else {
        return Ok(false);
    };
    let allowed = {
        let Some(guild) = ctx.guild() else {
            return Ok(false);
        };
        member
            .roles
            .iter()
            .filter_map(|role_id| guild.roles.get(role_id))
            .any(|role| {
                ctx.data()
                    .config
                    .authorized_roles
                    .iter()
                    .any(|name| name == &role.name)
            })
    };
    if !allowed {
        warn!(
            "user {} (ID: {}) tried to use an admin command without permission: {}",
            ctx.author().name,
            ctx.author().id,
            ctx.command().name
        );
    }
    Ok(allowed)
}

/// Set your in-game name to participate in scrims
#[poise::command(slash_command, guild_only)]
pub async fn register(
    ctx: Context<'_>,
    #[description = "Your official in-game name"] ingame_name: String,
) -> Result<(), Error> {
    let store = &ctx.data().store;
    let updated = store
        .set_ingame_name(ctx.author().id.get() as i64, &ingame_name)
        .await?;
    let content = if updated {
        format!("Your in-game name has been set to **{ingame_name}**.")
    } else {
        "An error occurred. Make sure you are a member of this server.".to_string()
    };
    ctx.send(poise::CreateReply::default().content(content).ephemeral(true))
        .await?;
    Ok(())
}

/// Displays the unique ID of a specific user
#[poise::command(slash_command, guild_only)]
pub async fn getid(
    ctx: Context<'_>,
    #[description = "The user whose ID you want to see"] user: serenity::User,
) -> Result<(), Error> {
    let store = &ctx.data().store;
    let content = match store.find_player(user.id.get() as i64).await? {
        Some(player) => format!("The ID for {} is **#{}**.", user.name, player.id),
        None => format!("{} does not have an ID assigned yet.", user.name),
    };
    ctx.send(poise::CreateReply::default().content(content).ephemeral(true))
        .await?;
    Ok(())
}

/// View a player's performance statistics
#[poise::command(slash_command)]
pub async fn performance(
    ctx: Context<'_>,
    #[description = "The in-game name of the player"] ingame_name: String,
    #[description = "Whether to show the K/D trend over seasons"] graph: Option<bool>,
) -> Result<(), Error> {
    let rows = ctx.data().store.performance(&ingame_name).await?;
    if rows.is_empty() {
        ctx.say(format!(
            "No performance data found for player **{ingame_name}**."
        ))
        .await?;
        return Ok(());
    }
    let with_trend = graph.unwrap_or(false) && rows.len() > 1;
    let embed = embed::performance_embed(&ingame_name, &rows, with_trend);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show the leaderboard for the current season
#[poise::command(slash_command)]
pub async fn leaderboard(ctx: Context<'_>) -> Result<(), Error> {
    let store = &ctx.data().store;
    let Some(season) = store.get_active_season().await? else {
        ctx.send(
            poise::CreateReply::default()
                .content("There is no active season.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    };
    let rows = store.leaderboard().await?;
    if rows.is_empty() {
        ctx.send(
            poise::CreateReply::default()
                .content("No player data available for the current season's leaderboard.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }
    ctx.send(poise::CreateReply::default().embed(embed::leaderboard_embed(&season.name, &rows)))
        .await?;
    Ok(())
}

/// Assigns IDs to all existing members who don't have one
#[poise::command(slash_command, guild_only, check = "authorized")]
pub async fn assign_existing(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;
    let Some(guild_id) = ctx.guild_id() else {
        ctx.say("This command only works inside a server.").await?;
        return Ok(());
    };

    info!("admin command /assign_existing triggered by {}", ctx.author().name);
    let members = guild_id.members(ctx.http(), None, None).await?;
    let store = &ctx.data().store;
    let mut assigned = 0;
    for member in members {
        if member.user.bot {
            continue;
        }
        match store.ensure_player(member.user.id.get() as i64).await? {
            IdAssignment::Assigned(_) => assigned += 1,
            IdAssignment::AlreadyAssigned(_) => {}
            IdAssignment::PoolExhausted => {
                error!("ID ASSIGNMENT FAILURE: no available IDs left to assign");
                ctx.say(format!(
                    "Ran out of free IDs after assigning {assigned} members. \
                     No further members can be onboarded."
                ))
                .await?;
                return Ok(());
            }
        }
    }
    info!("assigned new IDs to {assigned} existing members");
    ctx.say(format!(
        "Process complete. Assigned new IDs to {assigned} existing members."
    ))
    .await?;
    Ok(())
}

/// Create a new scrims season
#[poise::command(slash_command, guild_only, check = "authorized")]
pub async fn createseason(
    ctx: Context<'_>,
    #[description = "Name of the new season"] name: String,
) -> Result<(), Error> {
    let content = match ctx.data().store.create_season(&name).await {
        Ok(season) => {
            info!("season '{}' created by {}", season.name, ctx.author().name);
            format!("Season '{name}' has been created and set as the active season.")
        }
        Err(StoreError::DuplicateSeason(_)) => {
            format!("A season named '{name}' already exists.")
        }
        Err(err) => return Err(err.into()),
    };
    ctx.send(poise::CreateReply::default().content(content).ephemeral(true))
        .await?;
    Ok(())
}

/// Delete a season and all its data
#[poise::command(slash_command, guild_only, check = "authorized")]
pub async fn deleteseason(
    ctx: Context<'_>,
    #[description = "Name of the season to delete"] name: String,
) -> Result<(), Error> {
    let confirm_id = format!("{}-confirm", ctx.id());
    let cancel_id = format!("{}-cancel", ctx.id());
    let components = vec![serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new(&confirm_id)
            .label("Confirm Delete")
            .style(serenity::ButtonStyle::Danger),
        serenity::CreateButton::new(&cancel_id)
            .label("Cancel")
            .style(serenity::ButtonStyle::Secondary),
    ])];
    let reply = ctx
        .send(
            poise::CreateReply::default()
                .content(format!(
                    "**WARNING:** Are you sure you want to delete '{name}'? This is permanent."
                ))
                .components(components)
                .ephemeral(true),
        )
        .await?;

    let message = reply.message().await?;
    let interaction = message
        .await_component_interaction(ctx.serenity_context())
        .timeout(Duration::from_secs(60))
        .await;

    let content = match interaction {
        Some(interaction) => {
            interaction
                .create_response(ctx.http(), serenity::CreateInteractionResponse::Acknowledge)
                .await?;
            if interaction.data.custom_id == confirm_id {
                if ctx.data().store.delete_season(&name).await? {
                    warn!(
                        "season '{}' and all its data was deleted by {}",
                        name,
                        ctx.author().name
                    );
                    format!("Season '{name}' deleted.")
                } else {
                    format!("Could not find season '{name}'.")
                }
            } else {
                "Deletion cancelled.".to_string()
            }
        }
        None => "Confirmation timed out. Nothing was deleted.".to_string(),
    };
    reply
        .edit(
            ctx,
            poise::CreateReply::default()
                .content(content)
                .components(Vec::new()),
        )
        .await?;
    Ok(())
}

/// Create a new team for the current season
#[poise::command(slash_command, guild_only, check = "authorized")]
pub async fn createteam(
    ctx: Context<'_>,
    #[description = "Name of the team"] name: String,
) -> Result<(), Error> {
    let store = &ctx.data().store;
    let Some(season) = store.get_active_season().await? else {
        ctx.send(
            poise::CreateReply::default()
                .content("There is no active season.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    };
    if store.find_team(&name, season.id).await?.is_some() {
        ctx.send(
            poise::CreateReply::default()
                .content(format!(
                    "Team '{name}' already exists in season '{}'.",
                    season.name
                ))
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }
    let team = store.create_team(&name, season.id).await?;
    info!(
        "team '{}' created by {} for season {}",
        team.name,
        ctx.author().name,
        season.name
    );
    ctx.send(
        poise::CreateReply::default()
            .content(format!(
                "Team '{name}' has been created for the current season."
            ))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Assign a player to a team
#[poise::command(slash_command, guild_only, check = "authorized")]
pub async fn assignteam(
    ctx: Context<'_>,
    #[description = "3-digit player ID"] player_id: String,
    #[description = "Name of the team"] team_name: String,
) -> Result<(), Error> {
    let store = &ctx.data().store;
    let Some(season) = store.get_active_season().await? else {
        ctx.send(
            poise::CreateReply::default()
                .content("There is no active season.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    };
    let content = match store.assign_player(&player_id, &team_name, season.id).await? {
        RosterChange::Added => {
            format!("Player {player_id} assigned to team {team_name}.")
        }
        RosterChange::TeamFull => format!("Team {team_name} is full."),
        RosterChange::AlreadyInTeam => {
            format!("Player {player_id} is already on a team this season.")
        }
        RosterChange::TeamNotFound => {
            format!("Team {team_name} not found in current season.")
        }
        RosterChange::PlayerNotFound => {
            format!("No player with ID {player_id} exists.")
        }
    };
    ctx.send(poise::CreateReply::default().content(content).ephemeral(true))
        .await?;
    Ok(())
}

/// Unassign a player from a team
#[poise::command(slash_command, guild_only, check = "authorized")]
pub async fn unassignteam(
    ctx: Context<'_>,
    #[description = "3-digit player ID"] player_id: String,
    #[description = "Name of the team"] team_name: String,
) -> Result<(), Error> {
    let store = &ctx.data().store;
    let Some(season) = store.get_active_season().await? else {
        ctx.send(
            poise::CreateReply::default()
                .content("There is no active season.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    };
    let content = if store
        .unassign_player(&player_id, &team_name, season.id)
        .await?
    {
        format!("Player {player_id} unassigned from team {team_name}.")
    } else {
        format!("Could not unassign player {player_id}.")
    };
    ctx.send(poise::CreateReply::default().content(content).ephemeral(true))
        .await?;
    Ok(())
}

/// One 5-player stat form, one line per player.
#[derive(Debug, Modal)]
#[name = "Enter Team Match Stats"]
struct TeamStatsModal {
    #[name = "Player 1 Stats (ID,Kills,Deaths,Assists)"]
    #[placeholder = "e.g., 123,15,10,5"]
    player1: String,
    #[name = "Player 2 Stats (ID,Kills,Deaths,Assists)"]
    #[placeholder = "e.g., 124,12,10,3"]
    player2: String,
    #[name = "Player 3 Stats (ID,Kills,Deaths,Assists)"]
    #[placeholder = "e.g., 125,10,10,8"]
    player3: String,
    #[name = "Player 4 Stats (ID,Kills,Deaths,Assists)"]
    #[placeholder = "e.g., 126,8,10,4"]
    player4: String,
    #[name = "Player 5 Stats (ID,Kills,Deaths,Assists)"]
    #[placeholder = "e.g., 127,5,10,6"]
    player5: String,
}

fn parse_team_stats(modal: &TeamStatsModal) -> Result<Vec<MatchEntry>, StatParseError> {
    [
        &modal.player1,
        &modal.player2,
        &modal.player3,
        &modal.player4,
        &modal.player5,
    ]
    .into_iter()
    .map(|line| stats::parse_stat_line(line))
    .collect()
}

/// Record the results of a 5v5 match using pop-up forms
#[poise::command(slash_command, guild_only, check = "authorized")]
pub async fn recordmatch(
    ctx: poise::ApplicationContext<'_, Data, Error>,
    #[description = "Name of the first team"] team1_name: String,
    #[description = "Name of the second team"] team2_name: String,
    #[description = "Final score for team 1"] team1_score: u32,
    #[description = "Final score for team 2"] team2_score: u32,
) -> Result<(), Error> {
    let pctx = poise::Context::Application(ctx);

    let Some(first) = TeamStatsModal::execute(ctx).await? else {
        return Ok(());
    };
    let mut entries = match parse_team_stats(&first) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("user {} submitted invalid match stats: {err}", pctx.author().name);
            pctx.send(
                poise::CreateReply::default()
                    .content(format!("{err}. Match recording cancelled."))
                    .ephemeral(true),
            )
            .await?;
            return Ok(());
        }
    };

    // The second roster needs its own modal, and a modal can only answer a
    // command or component interaction, so the handoff goes through a button.
    let button_id = format!("{}-second-team", pctx.id());
    let reply = pctx
        .send(
            poise::CreateReply::default()
                .content(format!(
                    "Stats for **{team1_name}** captured. Continue with **{team2_name}**."
                ))
                .components(vec![serenity::CreateActionRow::Buttons(vec![
                    serenity::CreateButton::new(&button_id)
                        .label(format!("Enter stats for {team2_name}"))
                        .style(serenity::ButtonStyle::Primary),
                ])])
                .ephemeral(true),
        )
        .await?;

    let message = reply.message().await?;
    let Some(interaction) = message
        .await_component_interaction(pctx.serenity_context())
        .timeout(Duration::from_secs(600))
        .await
    else {
        reply
            .edit(
                pctx,
                poise::CreateReply::default()
                    .content("Timed out waiting for the second team's stats. Nothing was recorded.")
                    .components(Vec::new()),
            )
            .await?;
        return Ok(());
    };

    let Some(second) = poise::execute_modal_on_component_interaction::<TeamStatsModal>(
        ctx,
        interaction,
        None,
        Some(Duration::from_secs(600)),
    )
    .await?
    else {
        return Ok(());
    };
    match parse_team_stats(&second) {
        Ok(more) => entries.extend(more),
        Err(err) => {
            warn!("user {} submitted invalid match stats: {err}", pctx.author().name);
            reply
                .edit(
                    pctx,
                    poise::CreateReply::default()
                        .content(format!("{err}. Match recording cancelled."))
                        .components(Vec::new()),
                )
                .await?;
            return Ok(());
        }
    }

    let store = &pctx.data().store;
    let Some(season) = store.get_active_season().await? else {
        error!(
            "could not record match for user {} because no active season was found",
            pctx.author().name
        );
        reply
            .edit(
                pctx,
                poise::CreateReply::default()
                    .content("Error: No active season found.")
                    .components(Vec::new()),
            )
            .await?;
        return Ok(());
    };
    store.record_match(season.id, &entries).await?;
    info!(
        "recorded match {team1_name} {team1_score} : {team2_score} {team2_name} \
         ({} player rows) submitted by {}",
        entries.len(),
        pctx.author().name
    );
    reply
        .edit(
            pctx,
            poise::CreateReply::default()
                .content("All match results recorded successfully!")
                .components(Vec::new()),
        )
        .await?;
    Ok(())
}
