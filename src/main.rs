use std::sync::Arc;

use anyhow::Context;

use triage_assist::agent::EmailAssistant;
use triage_assist::config::AssistantConfig;
use triage_assist::llm::create_provider;
use triage_assist::server;
use triage_assist::store::{Database, LibSqlBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AssistantConfig::from_env().context("invalid configuration")?;

    eprintln!("📬 Triage Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.llm.model);
    eprintln!("   Database: {}", config.db_path.display());
    eprintln!("   API: http://0.0.0.0:{}", config.port);

    let llm = create_provider(&config.llm)?;

    // ── Database ─────────────────────────────────────────────────────────
    let db: Arc<dyn Database> = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .with_context(|| format!("failed to open database at {}", config.db_path.display()))?,
    );

    // ── Assistant + API ─────────────────────────────────────────────────
    let assistant = Arc::new(EmailAssistant::new(llm, db, config.workflow.clone()));
    let app = server::routes(assistant);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    server::serve(listener, app).await?;

    Ok(())
}
