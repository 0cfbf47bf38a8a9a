use ledger_chat_agent::{build_store, Agent, AgentConfig};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Owner id used for the local chat session
const LOCAL_OWNER: &str = "local";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Logs go to stderr so replies stay readable on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = AgentConfig::from_env()?;
    let owner_id = std::env::var("LEDGER_OWNER").unwrap_or_else(|_| LOCAL_OWNER.to_string());

    let store = build_store(&config);
    let agent = Agent::new(store, config);

    info!(owner_id = %owner_id, "Ledger chat starting");

    let mut stdout = tokio::io::stdout();
    stdout
        .write_all("Digite \"menu\" para começar. Ctrl-D encerra.\n> ".as_bytes())
        .await?;
    stdout.flush().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;
            continue;
        }

        let reply = agent.handle(&owner_id, &line).await;
        stdout
            .write_all(format!("{}\n\n> ", reply).as_bytes())
            .await?;
        stdout.flush().await?;
    }

    stdout.write_all(b"\n").await?;
    Ok(())
}
