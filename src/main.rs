mod config;
mod scrims;

use std::env::var;

use poise::serenity_prelude as serenity;
use tracing::{error, info};

use scrims::database::{IdAssignment, Store};

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

/// Shared state available to every command invocation.
pub struct Data {
    store: Store,
    config: config::BotConfig,
}

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => panic!("Failed to start bot: {:?}", error),
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("error in command `{}`: {:?}", ctx.command().name, error);
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("error while handling error: {}", e);
            }
        }
    }
}

async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot, .. } => {
            info!("logged in as {}", data_about_bot.user.name);
        }
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            if !new_member.user.bot {
                handle_member_join(ctx, data, new_member).await?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Assigns a permanent 3-digit ID to a freshly joined member and greets them
/// in the welcome channel, if one is configured.
async fn handle_member_join(
    ctx: &serenity::Context,
    data: &Data,
    member: &serenity::Member,
) -> Result<(), Error> {
    info!("new member joined: {} (ID: {})", member.user.name, member.user.id);
    match data.store.ensure_player(member.user.id.get() as i64).await? {
        IdAssignment::Assigned(player_id) => {
            if let Some(channel_id) = data.config.welcome_channel_id {
                let builder = serenity::CreateMessage::new()
                    .embed(scrims::commands::embed::welcome_embed(member, &player_id));
                serenity::ChannelId::new(channel_id)
                    .send_message(&ctx.http, builder)
                    .await?;
            }
        }
        IdAssignment::AlreadyAssigned(_) => {}
        IdAssignment::PoolExhausted => {
            // Blocks all future onboarding, so this is as loud as it gets.
            error!("ID ASSIGNMENT FAILURE: no available IDs left to assign");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let options = poise::FrameworkOptions {
        commands: vec![
            scrims::commands::register(),
            scrims::commands::getid(),
            scrims::commands::performance(),
            scrims::commands::leaderboard(),
            scrims::commands::assign_existing(),
            scrims::commands::createseason(),
            scrims::commands::deleteseason(),
            scrims::commands::createteam(),
            scrims::commands::assignteam(),
            scrims::commands::unassignteam(),
            scrims::commands::recordmatch(),
        ],
        // The global error handler for all error cases that may occur
        on_error: |error| Box::pin(on_error(error)),
        pre_command: |ctx| {
            Box::pin(async move {
                info!("executing command {}", ctx.command().qualified_name);
            })
        },
        event_handler: |ctx, event, framework, data| {
            Box::pin(event_handler(ctx, event, framework, data))
        },
        ..Default::default()
    };

    let framework = poise::Framework::builder()
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                let config = config::init_config().expect("could not load bot config");

                let store = Store::connect(&var("DATABASE_URL")?).await?;
                store.init_schema().await?;
                info!("database schema ready");

                Ok(Data { store, config })
            })
        })
        .options(options)
        .build();

    dotenv::dotenv().ok();
    let token = var("DISCORD_TOKEN").expect("Missing `DISCORD_TOKEN` env var");
    // GUILD_MEMBERS is privileged but required for join events and the
    // assign_existing backfill.
    let intents =
        serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::GUILD_MEMBERS;

    let client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await;

    client.unwrap().start().await.unwrap()
}
