mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{BanCommand, Cli, Commands, GuildCommand};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tusk=info,tusk_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate { draws, seed, sb } => {
            commands::simulate(&cli.config, draws, seed, sb)?;
        }

        Commands::Reconcile => {
            commands::reconcile(&cli.config, &cli.data_dir, &cli.users_dir)?;
        }

        Commands::Boards { metric, limit } => {
            commands::show_boards(&cli.config, &cli.data_dir, metric.as_deref(), limit)?;
        }

        Commands::Guild { command } => match command {
            GuildCommand::Show { id } => commands::guild_show(&cli.guild_dir, &id)?,
            GuildCommand::Remove { id } => commands::guild_remove(&cli.guild_dir, &id)?,
        },

        Commands::Quests { rotate } => {
            commands::quests(&cli.config, &cli.data_dir, rotate)?;
        }

        Commands::Bans { command } => match command {
            BanCommand::List => commands::bans_list(&cli.data_dir)?,
            BanCommand::Add { user_id } => commands::bans_add(&cli.data_dir, &user_id)?,
            BanCommand::Remove { user_id } => commands::bans_remove(&cli.data_dir, &user_id)?,
        },
    }

    Ok(())
}
