//! `bugtracker status`: check the server is reachable.

use anyhow::Result;
use bugtracker_client::BugClient;

pub async fn status(client: &BugClient) -> Result<()> {
    let health = client
        .health()
        .await
        .map_err(|e| anyhow::anyhow!("Server {} unreachable: {}", client.base_url(), e))?;
    println!(
        "Server {}: {}",
        client.base_url(),
        health["status"].as_str().unwrap_or("unknown")
    );
    Ok(())
}
