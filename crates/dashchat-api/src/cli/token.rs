//! `dashchat issue-token`.

use anyhow::{bail, Result};
use console::style;

use dashchat_types::error::RepositoryError;

use crate::state::AppState;

/// Issue a bearer token for a user and print it once.
pub async fn issue_token(state: &AppState, user_id: i64, json: bool) -> Result<()> {
    let token = match state.identities.issue_token(user_id).await {
        Ok(token) => token,
        Err(RepositoryError::NotFound) => bail!("no user with id {user_id}"),
        Err(e) => return Err(e.into()),
    };
    tracing::info!(user_id, "Issued bearer token");

    if json {
        let out = serde_json::json!({ "userId": user_id, "token": token });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Token for user {} (save this -- it won't be shown again):",
        style("🔑").bold(),
        style(user_id).cyan()
    );
    println!();
    println!("  {}", style(&token).yellow().bold());
    println!();
    Ok(())
}
