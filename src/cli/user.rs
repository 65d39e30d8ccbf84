use std::sync::Arc;

use inquire::{Password, Text};

use crate::auth::{Authenticator, SessionKeys, validate_password, validate_username};
use crate::config::ServerConfig;
use crate::types::Role;

use super::init_store;

fn prompt_username() -> anyhow::Result<String> {
    let username = Text::new("Username:")
        .with_validator(|input: &str| {
            Ok(validate_username(input)
                .map(|()| inquire::validator::Validation::Valid)
                .unwrap_or_else(|e| inquire::validator::Validation::Invalid(e.to_string().into())))
        })
        .prompt()?;
    Ok(username)
}

fn prompt_password() -> anyhow::Result<String> {
    let password = Password::new("Password:")
        .with_validator(|input: &str| {
            Ok(validate_password(input)
                .map(|()| inquire::validator::Validation::Valid)
                .unwrap_or_else(|e| inquire::validator::Validation::Invalid(e.to_string().into())))
        })
        .prompt()?;
    Ok(password)
}

pub fn run_user_add(
    data_dir: String,
    username: Option<String>,
    password: Option<String>,
    admin: bool,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;

    let username = match username {
        Some(name) => name,
        None if non_interactive => {
            anyhow::bail!("--username is required in non-interactive mode")
        }
        None => prompt_username()?,
    };

    let password = match password {
        Some(password) => password,
        None if non_interactive => {
            anyhow::bail!("--password is required in non-interactive mode")
        }
        None => prompt_password()?,
    };

    let config = ServerConfig {
        data_dir: data_dir.into(),
        ..ServerConfig::default()
    };
    let sessions = SessionKeys::new(config.resolve_session_secret()?.as_bytes(), None)?;
    let auth = Authenticator::new(Arc::new(store), sessions);

    let role = if admin { Role::Admin } else { Role::User };
    let user = auth.create_user(&username, &password, role)?;

    println!();
    println!("Created {} \"{}\" ({})", user.role, user.username, user.id);
    println!();

    Ok(())
}
