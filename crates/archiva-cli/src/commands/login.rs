//! login command - authenticate a user against the directory

use super::CommandContext;
use crate::utils::read_password;
use anyhow::{bail, Result};
use archiva_auth::{AuthOutcome, DirectoryAuthenticator, LdapConnector};
use archiva_core::types::LocalUser;
use colored::Colorize;
use serde::Serialize;
use std::process::ExitCode;
use std::sync::Arc;

/// Exit status for a rejected login
const EXIT_REJECTED: u8 = 2;

#[derive(Serialize)]
struct LoginResult<'a> {
    username: &'a str,
    authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<&'a LocalUser>,
}

pub async fn execute(
    ctx: &CommandContext,
    username: &str,
    password: Option<String>,
) -> Result<ExitCode> {
    let config = &ctx.config;
    if !config.ldap.enabled {
        bail!("Directory authentication is disabled; set [ldap] enabled = true or ARCHIVA_LDAP_HOST");
    }
    config.validate()?;

    let password = match password {
        Some(password) => password,
        None => read_password("Password")?,
    };

    let store = Arc::new(ctx.open_store().await?);
    let authenticator = DirectoryAuthenticator::new(
        config.ldap.clone(),
        config.provisioning.clone(),
        Arc::new(LdapConnector::new(&config.ldap)),
        store,
    );

    match authenticator.authenticate(username, &password).await {
        AuthOutcome::Authenticated(user) => {
            if ctx.is_json() {
                let result = LoginResult {
                    username,
                    authenticated: true,
                    reason: None,
                    user: Some(&user),
                };
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                ctx.info(&format!(
                    "{} {} ({})",
                    "Authenticated".green().bold(),
                    user.login,
                    user.full_name
                ));
            }
            Ok(ExitCode::SUCCESS)
        }
        AuthOutcome::Rejected(reason) => {
            if ctx.is_json() {
                let result = LoginResult {
                    username,
                    authenticated: false,
                    reason: Some(reason.to_string()),
                    user: None,
                };
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                ctx.error(&format!("{} {}", "Rejected:".red().bold(), reason));
            }
            Ok(ExitCode::from(EXIT_REJECTED))
        }
        AuthOutcome::SystemError(e) => {
            let context = failure_context(&e);
            Err(anyhow::Error::new(e).context(context))
        }
    }
}

/// Tell directory outages apart from local storage failures
fn failure_context(err: &archiva_core::Error) -> &'static str {
    if err.is_directory_fault() {
        "Directory login failed: the directory server could not be used"
    } else {
        "Directory login failed: the local user store could not be used"
    }
}
