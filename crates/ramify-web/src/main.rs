//! Ramify web backend - LLM-generated mind maps with gated learning flow.

use anyhow::Result;
use clap::Parser;
use ramify_core::relationships::UnlockRule;
use ramify_llm::{ClaudeBackend, LlmBackend, MockBackend};
use ramify_runtime::{GeneratorConfig, MemoryStore, SessionService};
use std::sync::Arc;

mod error;
mod routes;
mod state;

pub use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "ramify-web")]
#[command(about = "Ramify backend - interactive mind-map learning with LLM-generated content")]
struct Cli {
    /// Port to listen on
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Which related nodes gate an unlock
    #[arg(long, value_enum, default_value = "parents")]
    unlock_rule: UnlockRuleArg,

    /// Maximum mindmap depth (root counts as depth 1)
    #[arg(long, default_value = "3")]
    max_depth: usize,

    /// Maximum children generated per node
    #[arg(long, default_value = "4")]
    max_children: usize,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum UnlockRuleArg {
    /// A node unlocks once all of its parents are completed
    Parents,
    /// A node unlocks once all of its children are completed
    Children,
}

impl From<UnlockRuleArg> for UnlockRule {
    fn from(arg: UnlockRuleArg) -> Self {
        match arg {
            UnlockRuleArg::Parents => UnlockRule::ParentsComplete,
            UnlockRuleArg::Children => UnlockRule::ChildrenComplete,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let addr = format!("{}:{}", cli.host, cli.port);

    // Without an API key the server still runs, serving deterministic
    // fallback content for every generated artifact.
    let backend: Arc<dyn LlmBackend> = match ClaudeBackend::from_env() {
        Ok(backend) => Arc::new(backend),
        Err(_) => {
            tracing::warn!(
                "ANTHROPIC_API_KEY not set; running with the offline mock backend"
            );
            Arc::new(MockBackend::new())
        }
    };

    let generator_config = GeneratorConfig::default()
        .with_max_depth(cli.max_depth)
        .with_max_children(cli.max_children);
    let service = SessionService::new(
        Arc::new(MemoryStore::new()),
        backend,
        cli.unlock_rule.into(),
        generator_config,
    );
    let state = AppState::new(service);

    let app = routes::create_router(state);

    println!("Starting Ramify backend...");
    println!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
