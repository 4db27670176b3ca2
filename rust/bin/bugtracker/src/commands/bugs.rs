//! Bug commands: `bugtracker list`, `bugtracker report`, `bugtracker update`,
//! `bugtracker delete`.

use anyhow::Result;
use bugtracker_client::{Bug, BugBoard, BugClient, BugPatch, BugStatus, CreateBug};

use super::Output;

/// List all bugs.
pub async fn list(client: &BugClient, output: Output) -> Result<()> {
    let bugs = client.list().await?;
    match output {
        Output::Json => println!("{}", serde_json::to_string_pretty(&bugs)?),
        Output::Table => print!("{}", format_table(&bugs)),
    }
    Ok(())
}

/// Report a new bug. Without an explicit status this goes through the board
/// form, which re-reads the list after the create.
pub async fn report(
    client: &BugClient,
    title: String,
    description: Option<String>,
    status: Option<BugStatus>,
    output: Output,
) -> Result<()> {
    let created = match status {
        // The board form has no status field; go straight to the API.
        Some(status) => {
            client
                .create(&CreateBug {
                    title,
                    description,
                    status: Some(status),
                })
                .await?
        }
        None => {
            let mut board = BugBoard::new(client.clone());
            board.form.title = title;
            board.form.description = description.unwrap_or_default();
            board.submit().await?
        }
    };

    match output {
        Output::Json => println!("{}", serde_json::to_string_pretty(&created)?),
        Output::Table => {
            println!("bug {} created.", created.id);
            print!("{}", format_table(std::slice::from_ref(&created)));
        }
    }
    Ok(())
}

/// Apply a partial update.
pub async fn update(client: &BugClient, id: &str, patch: BugPatch, output: Output) -> Result<()> {
    if patch.is_empty() {
        anyhow::bail!("Nothing to update: pass --title, --description, --clear-description or --status.");
    }
    let Some(updated) = client.update(id, &patch).await? else {
        anyhow::bail!("Bug \"{}\" not found.", id);
    };

    match output {
        Output::Json => println!("{}", serde_json::to_string_pretty(&updated)?),
        Output::Table => {
            println!("bug {} updated.", updated.id);
            print!("{}", format_table(std::slice::from_ref(&updated)));
        }
    }
    Ok(())
}

/// Delete a bug.
pub async fn delete(client: &BugClient, id: &str, yes: bool) -> Result<()> {
    if !yes {
        eprint!("Delete bug {}? [y/N] ", id);
        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        if !matches!(answer.trim(), "y" | "Y" | "yes") {
            println!("Aborted.");
            return Ok(());
        }
    }
    let message = client.delete(id).await?;
    println!("{}", message);
    Ok(())
}

/// Render bugs as an aligned text table.
pub fn format_table(bugs: &[Bug]) -> String {
    if bugs.is_empty() {
        return "No bugs.\n".to_string();
    }

    let status_width = "in-progress".len();
    let title_width = bugs
        .iter()
        .map(|b| b.title.chars().count())
        .max()
        .unwrap_or(0)
        .max("TITLE".len());

    let mut out = format!(
        "{:<32}  {:<status_width$}  {:<title_width$}  CREATED\n",
        "ID", "STATUS", "TITLE"
    );
    for bug in bugs {
        out.push_str(&format!(
            "{:<32}  {:<status_width$}  {:<title_width$}  {}\n",
            bug.id,
            bug.status.as_str(),
            bug.title,
            bug.created_at
        ));
    }
    out
}
