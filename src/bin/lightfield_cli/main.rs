//! lightfield-cli: command-line client for the back-office API.
//! Reuses the library's API client, sync driver and request models.
#![deny(clippy::all, clippy::pedantic)]

mod args;
mod client;
mod handlers;
mod io;
mod print;

#[cfg(test)]
mod tests;

use clap::Parser;

use args::{Cli, Commands};
use client::{CliError, build_ctx_from_cli};
use handlers::{auth, bookings, contacts, dashboard, resources};

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let ctx = build_ctx_from_cli(&cli)?;
    let kind = cli.command.resource();

    match cli.command {
        Commands::Login(args) => auth::login(&ctx, args).await?,
        Commands::Logout => auth::logout(&ctx).await?,
        Commands::Associates(cmd)
        | Commands::Categories(cmd)
        | Commands::Blogs(cmd)
        | Commands::Testimonials(cmd)
        | Commands::Grants(cmd)
        | Commands::Services(cmd) => {
            let kind = kind.ok_or_else(|| CliError::InvalidInput("unknown resource".into()))?;
            resources::handle(&ctx, kind, cmd.action).await?;
        }
        Commands::Bookings(cmd) => bookings::handle(&ctx, cmd.action).await?,
        Commands::Contacts(cmd) => contacts::handle(&ctx, cmd.action).await?,
        Commands::Dashboard(cmd) => dashboard::handle(&ctx, cmd.action).await?,
    }

    Ok(())
}
