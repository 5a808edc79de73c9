//! user command - display a local user and its groups

use super::CommandContext;
use crate::utils::{format_datetime, or_dash};
use anyhow::{bail, Result};
use archiva_core::types::{LocalGroup, LocalUser};
use colored::Colorize;
use serde::Serialize;
use std::process::ExitCode;

#[derive(Serialize)]
struct UserInfoResult<'a> {
    #[serde(flatten)]
    user: &'a LocalUser,
    groups: Vec<&'a str>,
}

pub async fn execute(ctx: &CommandContext, login: &str) -> Result<ExitCode> {
    let store = ctx.open_store().await?;

    let Some(user) = store.get_user_by_login(login).await? else {
        bail!("No local user with login '{}'", login);
    };
    let groups = store.get_user_groups(&user.id).await?;

    if ctx.is_json() {
        let result = UserInfoResult {
            user: &user,
            groups: groups.iter().map(|g| g.name.as_str()).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_user(&user, &groups);
    }

    Ok(ExitCode::SUCCESS)
}

fn print_user(user: &LocalUser, groups: &[LocalGroup]) {
    println!("{}", user.login.blue().bold());
    println!();
    println!("  {}: {}", "Full name".cyan(), or_dash(&user.full_name));
    println!("  {}: {}", "Email".cyan(), or_dash(&user.email));
    println!("  {}: {}", "Language".cyan(), or_dash(&user.language));
    println!("  {}: {}", "Theme".cyan(), or_dash(&user.theme));
    println!("  {}: {}", "Admin".cyan(), if user.is_admin { "yes" } else { "no" });
    println!("  {}: {}", "Comment".cyan(), or_dash(&user.comment));
    println!("  {}: {}", "Created".cyan(), format_datetime(&user.created_at));

    if groups.is_empty() {
        println!("  {}: -", "Groups".cyan());
    } else {
        println!("  {}:", "Groups".cyan());
        for group in groups {
            println!("    {}", group.name);
        }
    }
}
