//! Chat Agent - interactive terminal entry point.

use chat_agent::agent::{Agent, StdConsole, StdinInput};
use chat_agent::config::Config;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they never mix with the conversation.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_agent=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // A missing .env file is fine; the environment may already be set.
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e.into());
        }
    }

    let config = Config::from_env()?;
    info!(
        model = %config.model,
        workspace = %config.workspace_path.display(),
        max_tool_rounds = config.max_tool_rounds,
        "Loaded configuration"
    );

    let mut agent = Agent::from_config(&config)?;

    println!("Chat with Assistant (Ctrl+C to exit):");
    match agent.run(&mut StdinInput::stdin(), &mut StdConsole).await {
        Ok(summary) => {
            info!(
                turns = summary.turns,
                model_calls = summary.model_calls,
                tool_calls = summary.tool_calls,
                "Session ended"
            );
            Ok(())
        }
        // Already reported on the console.
        Err(_) => std::process::exit(1),
    }
}
