use clap::Parser;
use nf_core::{Article, Result};
use nf_llm::{create_provider, Gateway, GatewayConfig, ProviderKind, ProviderSlot};
use nf_personalize::{PersonalizeConfig, Personalizer};
use nf_web::{create_app, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(long, default_value = "memory")]
    storage: String,
    #[arg(
        long,
        default_value = "deepseek",
        help = "Primary text provider. Available: deepseek, ollama"
    )]
    primary: String,
    #[arg(
        long,
        default_value = "ollama",
        help = "Fallback text provider, or 'none' to disable failover"
    )]
    fallback_provider: String,
    #[arg(long)]
    api_key: Option<String>,
    #[arg(long, help = "Preferred model, resolved per provider")]
    model: Option<String>,
    #[arg(long, help = "Override the provider base URL")]
    provider_url: Option<String>,
    /// Seed the in-memory store with a fixture corpus (JSON array of articles)
    #[arg(long)]
    seed: Option<PathBuf>,
    #[arg(long, default_value_t = 90)]
    lookback_days: i64,
    #[arg(long, default_value_t = 0.1)]
    decay_lambda: f32,
    #[arg(long, default_value_t = 3)]
    min_interactions: usize,
    #[arg(long, default_value_t = 900)]
    cache_ttl_secs: u64,
    #[arg(long, default_value_t = 10)]
    rate_limit_per_minute: usize,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Serve the personalization API over HTTP.
    Serve {
        #[arg(long, default_value = "127.0.0.1:3000")]
        listen: String,
    },
}

fn build_slots(cli: &Cli) -> Result<Vec<ProviderSlot>> {
    let primary: ProviderKind = cli.primary.parse()?;
    let mut slots = vec![ProviderSlot {
        kind: primary,
        provider: create_provider(primary, cli.api_key.clone(), cli.provider_url.clone())?,
    }];

    if cli.fallback_provider != "none" {
        let fallback: ProviderKind = cli.fallback_provider.parse()?;
        if fallback != primary {
            slots.push(ProviderSlot {
                kind: fallback,
                provider: create_provider(fallback, cli.api_key.clone(), None)?,
            });
        }
    }

    Ok(slots)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let storage = nf_storage::create_storage(&cli.storage).await?;
    info!("💾 Storage initialized (using {})", cli.storage);

    if let Some(path) = &cli.seed {
        let corpus = std::fs::read_to_string(path)?;
        let articles: Vec<Article> = serde_json::from_str(&corpus)?;
        let count = articles.len();
        for article in articles {
            storage.put_article(article).await;
        }
        info!("📰 Seeded {} fixture articles from {}", count, path.display());
    }

    let slots = build_slots(&cli)?;
    let provider_names: Vec<String> = slots
        .iter()
        .map(|s| s.provider.name().to_string())
        .collect();
    let gateway_config = GatewayConfig {
        default_model: cli.model.clone(),
        ..Default::default()
    };
    let gateway = Arc::new(Gateway::new(slots, gateway_config));
    info!("🧠 Text providers initialized: {}", provider_names.join(", "));

    let config = PersonalizeConfig {
        lookback_days: cli.lookback_days,
        decay_lambda: cli.decay_lambda,
        min_interactions: cli.min_interactions,
        cache_ttl: Duration::from_secs(cli.cache_ttl_secs),
        rate_limit_per_minute: cli.rate_limit_per_minute,
        ..Default::default()
    };
    let personalizer = Arc::new(Personalizer::new(
        storage.clone(),
        storage.clone(),
        gateway.clone(),
        config,
    ));

    match cli.command {
        Commands::Serve { listen } => {
            let app = create_app(AppState {
                personalizer,
                gateway,
            })
            .await;
            let listener = tokio::net::TcpListener::bind(&listen).await?;
            info!("🚀 Personalization API listening on {}", listen);
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
