use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bitcoin_ai_agent::analysis::improvement;
use bitcoin_ai_agent::analytics::{JsonlTradeStore, TradeStore};
use bitcoin_ai_agent::config::Config;
use bitcoin_ai_agent::exchange::{ExchangeInterface, UpbitClient};
use bitcoin_ai_agent::llm::{ChartSource, FileChartSource, OpenRouterClient, VisionModel};
use bitcoin_ai_agent::pricefeed::FearGreedClient;
use bitcoin_ai_agent::simulation::{MarketSimulator, PaperAccount};
use bitcoin_ai_agent::trader::Trader;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bitcoin_ai_agent=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Print startup banner
    print_banner(&config);

    // Trade ledger
    let store: Arc<dyn TradeStore> = Arc::new(JsonlTradeStore::new(&config.strategy.trade_log_path));

    // Market access: replay, paper or live
    let mut simulator = None;
    let exchange: Arc<dyn ExchangeInterface> = if config.agent.simulation_mode {
        let path = config
            .agent
            .simulation_data_path
            .as_deref()
            .context("SIMULATION_DATA_PATH is required when SIMULATION_MODE=true")?;
        info!("🎞️  Initializing Market Simulator from {}", path);
        let sim = Arc::new(MarketSimulator::from_json_file(
            path,
            config.agent.paper_initial_krw,
            config.trading.fee_rate,
        )?);
        simulator = Some(sim.clone());
        sim
    } else {
        info!("🌐 Initializing Upbit client for {}", config.exchange.symbol);
        let client = UpbitClient::new(&config.exchange);
        if config.agent.paper_trading {
            Arc::new(client.with_paper_account(PaperAccount::new(
                config.agent.paper_initial_krw,
                config.trading.fee_rate,
            )))
        } else {
            Arc::new(client)
        }
    };

    // Strategy improvements
    let improvements = match (&config.strategy.improvements_path, config.strategy.improvement_enabled) {
        (Some(path), true) => improvement::load_active(path).unwrap_or_else(|e| {
            warn!("⚠️ Could not load strategy improvements from {}: {}", path, e);
            Vec::new()
        }),
        _ => Vec::new(),
    };
    if !improvements.is_empty() {
        info!("🔧 Loaded {} active strategy improvements", improvements.len());
    }

    let mut trader = Trader::new(config.clone(), exchange, store)
        .with_improvements(improvements);

    if !config.agent.simulation_mode {
        trader = trader.with_fear_greed(FearGreedClient::new(&config.strategy.fear_greed_api_url));
    }

    // Chart analysis model
    if config.vision.enabled {
        match OpenRouterClient::new(&config.vision) {
            Ok(client) => {
                let chart = config
                    .vision
                    .chart_image_path
                    .as_ref()
                    .map(|p| Arc::new(FileChartSource::new(p)) as Arc<dyn ChartSource>);
                info!("👁️  Vision model: {}", client.name());
                trader = trader.with_vision(Arc::new(client), chart);
            }
            Err(e) => warn!("⚠️ Vision disabled: {}", e),
        }
    }

    if let Some(sim) = simulator {
        trader = trader.with_simulator(sim);
    }

    // Run trader (this blocks until Ctrl+C or end of replay)
    trader.run().await
}

fn print_banner(config: &Config) {
    println!("\n╔═══════════════════════════════════════════════════════════╗");
    println!("║              Bitcoin AI Trading Agent (Upbit)             ║");
    println!("╚═══════════════════════════════════════════════════════════╝");
    println!();
    println!("🪙 Market: {}", config.exchange.symbol);
    println!(
        "📊 Mode: {}",
        if config.agent.simulation_mode {
            "SIMULATION (replay)"
        } else if config.agent.paper_trading {
            "PAPER TRADING (Safe Mode)"
        } else {
            "⚠️  LIVE TRADING ⚠️"
        }
    );
    println!(
        "👁️  Vision: {}",
        if config.vision.enabled {
            config.vision.model.as_str()
        } else {
            "disabled (indicators only)"
        }
    );
    println!("💸 Order Rules:");
    println!("   • Min Order: {:.0} KRW", config.trading.min_trade_amount);
    println!("   • Trade Ratio: {:.0}%", config.trading.trade_ratio * 100.0);
    println!("   • Fee: {:.2}%", config.trading.fee_rate * 100.0);
    println!(
        "⏱️  Analysis Interval: {} seconds",
        config.agent.analysis_interval_secs
    );
    println!();
    println!("Press Ctrl+C to stop");
    println!("═══════════════════════════════════════════════════════════");
    println!();
}
