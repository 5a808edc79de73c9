//! check-config command - validate configuration and optionally reach the directory

use super::CommandContext;
use anyhow::{Context, Result};
use archiva_auth::ldap::{server_url, LDAP_PROTOCOL_VERSION};
use archiva_auth::{DirectoryConnector, LdapConnector};
use archiva_core::{DirectoryConfig, ServerType};
use colored::Colorize;
use serde::Serialize;
use std::process::ExitCode;

#[derive(Serialize)]
struct ConfigCheckResult {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    directory_enabled: bool,
    server_url: String,
    server_type: String,
    base_dn: String,
    restricted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    service_bind: Option<bool>,
}

/// Overall result of a configuration check
#[derive(Debug, PartialEq)]
struct Verdict {
    valid: bool,
    service_bind: Option<bool>,
    error: Option<String>,
}

/// Fold the validation error and the optional service bind into one verdict.
/// A bind that could not be attempted counts as a failed bind.
fn verdict(validation_error: Option<String>, bind: Option<Result<bool>>) -> Verdict {
    let (service_bind, bind_error) = match bind {
        Some(Ok(true)) => (Some(true), None),
        Some(Ok(false)) => (
            Some(false),
            Some("the directory refused the service bind".to_string()),
        ),
        Some(Err(e)) => (Some(false), Some(format!("{:#}", e))),
        None => (None, None),
    };

    Verdict {
        valid: validation_error.is_none() && bind_error.is_none(),
        service_bind,
        error: validation_error.or(bind_error),
    }
}

pub async fn execute(ctx: &CommandContext, connect: bool) -> Result<ExitCode> {
    let ldap = &ctx.config.ldap;
    let validation = ctx.config.validate();

    let bind = if connect && validation.is_ok() && ldap.enabled {
        Some(service_bind(ldap).await)
    } else {
        None
    };
    let verdict = verdict(validation.as_ref().err().map(|e| e.to_string()), bind);

    if ctx.is_json() {
        let result = ConfigCheckResult {
            valid: verdict.valid,
            error: verdict.error.clone(),
            directory_enabled: ldap.enabled,
            server_url: server_url(&ldap.host, ldap.port),
            server_type: ldap.server_type.to_string(),
            base_dn: ldap.base_dn.clone(),
            restricted: ldap.restricted,
            service_bind: verdict.service_bind,
        };
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(ldap);
        if let Some(bound) = verdict.service_bind {
            let status = if bound { "ok".green() } else { "failed".red() };
            println!("  {}: {}", "Service bind".cyan(), status);
        }
        println!();

        match (&validation, &verdict.error) {
            (_, None) => ctx.info(&format!("{}", "Configuration OK".green().bold())),
            (Err(_), Some(e)) => {
                ctx.error(&format!("{} {}", "Invalid configuration:".red().bold(), e))
            }
            (Ok(()), Some(e)) => {
                ctx.error(&format!("{} {}", "Directory check failed:".red().bold(), e))
            }
        }
    }

    Ok(if verdict.valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Connect and bind the way a login would before searching
async fn service_bind(ldap: &DirectoryConfig) -> Result<bool> {
    let connector = LdapConnector::new(ldap);
    let mut conn = connector
        .connect(&ldap.host, ldap.port)
        .await
        .with_context(|| {
            format!(
                "Service bind failed: cannot reach {}",
                server_url(&ldap.host, ldap.port)
            )
        })?;

    if ldap.server_type == ServerType::ActiveDirectory {
        conn.disable_referrals();
    }

    let bound = match conn.set_protocol_version(LDAP_PROTOCOL_VERSION) {
        Ok(()) => conn.bind(ldap.bind_dn(), ldap.bind_password()).await,
        Err(e) => Err(e),
    };
    conn.close().await;

    bound.context("Service bind failed")
}

fn print_summary(ldap: &DirectoryConfig) {
    println!("{}", "Directory".blue().bold());
    println!();
    println!("  {}: {}", "Enabled".cyan(), ldap.enabled);
    println!("  {}: {}", "Server".cyan(), server_url(&ldap.host, ldap.port));
    println!("  {}: {}", "Type".cyan(), ldap.server_type);
    println!("  {}: {}", "Base DN".cyan(), ldap.base_dn);
    println!(
        "  {}: {}",
        "Bind DN".cyan(),
        ldap.bind_dn().unwrap_or("(anonymous)")
    );
    println!(
        "  {}: {}",
        "Search filter".cyan(),
        ldap.search_filter().unwrap_or("-")
    );
    println!(
        "  {}: {}",
        "Group attribute".cyan(),
        ldap.group_attribute().unwrap_or("-")
    );
    if ldap.server_type == ServerType::ActiveDirectory {
        println!(
            "  {}: {}",
            "Account domain".cyan(),
            ldap.account_domain().unwrap_or("-")
        );
    }
    println!("  {}: {}", "Restricted".cyan(), ldap.restricted);
    println!("  {}: {}", "STARTTLS".cyan(), ldap.start_tls);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_without_connect() {
        assert_eq!(
            verdict(None, None),
            Verdict {
                valid: true,
                service_bind: None,
                error: None,
            }
        );

        let invalid = verdict(Some("base DN is required".into()), None);
        assert!(!invalid.valid);
        assert_eq!(invalid.error.as_deref(), Some("base DN is required"));
    }

    #[test]
    fn test_verdict_refused_bind() {
        let refused = verdict(None, Some(Ok(false)));
        assert!(!refused.valid);
        assert_eq!(refused.service_bind, Some(false));
        assert!(refused.error.unwrap().contains("refused"));
    }

    #[tokio::test]
    async fn test_unreachable_directory_is_reported_not_raised() {
        let ldap = DirectoryConfig {
            enabled: true,
            host: "127.0.0.1".into(),
            port: Some(1),
            base_dn: "dc=example,dc=org".into(),
            timeout_seconds: 1,
            ..Default::default()
        };

        let bind = service_bind(&ldap).await;
        assert!(bind.is_err());

        let result = verdict(None, Some(bind));
        assert!(!result.valid);
        assert_eq!(result.service_bind, Some(false));
        assert!(result.error.unwrap().contains("Service bind failed"));
    }
}
