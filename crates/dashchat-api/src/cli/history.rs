//! `dashchat clear-history`.

use anyhow::{anyhow, Result};
use console::style;

use crate::state::AppState;

/// Clear one user's session, addressed by project slug.
pub async fn clear_history(
    state: &AppState,
    user_id: i64,
    project_slug: Option<&str>,
    json: bool,
) -> Result<()> {
    let identity = state
        .identities
        .find_user(user_id)
        .await?
        .ok_or_else(|| anyhow!("no user with id {user_id}"))?;

    let project_id = match project_slug {
        Some(slug) => Some(
            state
                .projects
                .find_by_slug(slug)
                .await?
                .ok_or_else(|| anyhow!("no project with slug '{slug}'"))?
                .id,
        ),
        None => None,
    };

    let (session_key, deleted) = state
        .chat_service
        .clear_history(&identity, project_id)
        .await?;

    if json {
        let out = serde_json::json!({ "sessionKey": session_key, "deleted": deleted });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Cleared {} turn(s) from {}",
        style("✓").green(),
        style(deleted).bold(),
        style(&session_key).cyan()
    );
    println!();
    Ok(())
}
