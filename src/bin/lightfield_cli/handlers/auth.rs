#![deny(clippy::all, clippy::pedantic)]

use serde_json::json;

use crate::args::LoginArgs;
use crate::client::{CliError, Ctx};
use crate::print::print_json;

pub async fn login(ctx: &Ctx, args: LoginArgs) -> Result<(), CliError> {
    let password = match args.password_file {
        Some(path) => crate::io::read_value(None, Some(path))?.trim().to_string(),
        None => args.password.ok_or(CliError::MissingPassword)?,
    };
    let session = ctx.api.login(&args.username, &password).await?;
    print_json(&json!({
        "username": session.user.username,
        "is_superuser": session.user.is_superuser,
    }))
}

pub async fn logout(ctx: &Ctx) -> Result<(), CliError> {
    ctx.api.logout().await?;
    println!("signed out");
    Ok(())
}
