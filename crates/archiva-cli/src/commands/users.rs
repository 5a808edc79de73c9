//! users command - list local users

use super::CommandContext;
use crate::utils::{format_datetime, or_dash};
use anyhow::Result;
use colored::Colorize;
use std::process::ExitCode;

pub async fn execute(ctx: &CommandContext) -> Result<ExitCode> {
    let store = ctx.open_store().await?;
    let users = store.list_users().await?;

    if ctx.is_json() {
        println!("{}", serde_json::to_string_pretty(&users)?);
        return Ok(ExitCode::SUCCESS);
    }

    if users.is_empty() {
        ctx.info("No local users");
        return Ok(ExitCode::SUCCESS);
    }

    let width = users.iter().map(|u| u.login.len()).max().unwrap_or(0).max(5);
    println!(
        "{:<width$}  {:<19}  {}",
        "LOGIN".bold(),
        "CREATED".bold(),
        "FULL NAME".bold(),
        width = width
    );

    for user in &users {
        println!(
            "{:<width$}  {}  {}",
            user.login,
            format_datetime(&user.created_at),
            or_dash(&user.full_name),
            width = width
        );
    }

    ctx.info(&format!("\n{} user(s)", users.len()));
    Ok(ExitCode::SUCCESS)
}
