//! Login, registration, and logout.

use std::io::BufRead;

use anyhow::{Context, Result};
use jarvis_client::ApiClient;

fn resolve_password(password: Option<String>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }

    eprint!("Password: ");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        anyhow::bail!("No password provided");
    }
    Ok(password)
}

pub async fn login(
    client: &ApiClient,
    email: &str,
    password: Option<String>,
    remember: bool,
) -> Result<()> {
    let password = resolve_password(password)?;
    let response = client.auth().login(email, &password, remember).await?;
    let who = response.user.map_or_else(|| email.to_string(), |u| u.email);

    if remember {
        println!("Logged in as {who}.");
    } else {
        println!("Credentials for {who} verified; the session was not saved.");
    }
    Ok(())
}

pub async fn register(client: &ApiClient, email: &str, password: Option<String>) -> Result<()> {
    let password = resolve_password(password)?;
    let response = client.auth().register(email, &password).await?;
    let who = response.user.map_or_else(|| email.to_string(), |u| u.email);
    println!("Registered and logged in as {who}.");
    Ok(())
}

pub fn logout(client: &ApiClient) -> Result<()> {
    if client.session()?.is_none() {
        println!("Not logged in.");
        return Ok(());
    }
    client.auth().logout()?;
    println!("Logged out.");
    Ok(())
}

pub async fn whoami(client: &ApiClient) -> Result<()> {
    if client.session()?.is_none() {
        println!("Not logged in.");
        return Ok(());
    }
    let user = client.auth().me().await?;
    let verified = if user.is_verified { "" } else { " (unverified)" };
    println!("{} [id {}]{verified}", user.email, user.id);
    Ok(())
}
