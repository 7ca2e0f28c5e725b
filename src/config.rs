use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub exchange: ExchangeConfig,
    pub trading: TradingConfig,
    pub vision: VisionConfig,
    pub agent: AgentConfig,
    pub strategy: StrategyConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExchangeConfig {
    pub access_key: String,
    pub secret_key: String,
    pub api_url: String,
    pub symbol: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TradingConfig {
    pub min_trade_amount: f64,
    pub trade_ratio: f64,
    pub fee_rate: f64,
    pub daily_candle_count: usize,
    pub minute_candle_count: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VisionConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub timeout_secs: u64,
    pub chart_image_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentConfig {
    pub paper_trading: bool,
    pub simulation_mode: bool,
    pub simulation_data_path: Option<String>,
    pub analysis_interval_secs: u64,
    pub retry_delay_secs: u64,
    pub paper_initial_krw: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StrategyConfig {
    pub improvement_enabled: bool,
    pub improvements_path: Option<String>,
    pub trade_log_path: String,
    pub fear_greed_api_url: String,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            min_trade_amount: 5000.0,
            trade_ratio: 0.95,
            fee_rate: 0.0005,
            daily_candle_count: 30,
            minute_candle_count: 200,
        }
    }
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            access_key: String::new(),
            secret_key: String::new(),
            api_url: "https://api.upbit.com".to_string(),
            symbol: "KRW-BTC".to_string(),
        }
    }
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            api_url: "https://openrouter.ai/api/v1".to_string(),
            model: "google/gemini-flash-1.5".to_string(),
            max_tokens: 300,
            temperature: 0.1,
            timeout_secs: 300,
            chart_image_path: None,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let exchange_defaults = ExchangeConfig::default();
        let exchange = ExchangeConfig {
            // Only needed for live trading; paper mode signs nothing
            access_key: env::var("UPBIT_ACCESS_KEY").unwrap_or_default(),
            secret_key: env::var("UPBIT_SECRET_KEY").unwrap_or_default(),
            api_url: env_string("UPBIT_API_URL", &exchange_defaults.api_url),
            symbol: env_string("TRADING_SYMBOL", &exchange_defaults.symbol),
        };

        let defaults = TradingConfig::default();
        let trading = TradingConfig {
            min_trade_amount: env_or("MIN_TRADE_AMOUNT", defaults.min_trade_amount),
            trade_ratio: env_or("TRADE_RATIO", defaults.trade_ratio),
            fee_rate: env_or("FEE_RATE", defaults.fee_rate),
            daily_candle_count: env_or("DAILY_CANDLE_COUNT", defaults.daily_candle_count),
            minute_candle_count: env_or("MINUTE_CANDLE_COUNT", defaults.minute_candle_count),
        };

        let vision_defaults = VisionConfig::default();
        let vision = VisionConfig {
            enabled: env_or("USE_VISION", vision_defaults.enabled),
            api_key: env_opt("VISION_API_KEY"),
            api_url: env_string("VISION_API_URL", &vision_defaults.api_url),
            model: env_string("VISION_MODEL", &vision_defaults.model),
            max_tokens: env_or("VISION_MAX_TOKENS", vision_defaults.max_tokens),
            temperature: env_or("VISION_TEMPERATURE", vision_defaults.temperature),
            timeout_secs: env_or("VISION_TIMEOUT_SECS", vision_defaults.timeout_secs),
            chart_image_path: env_opt("CHART_IMAGE_PATH"),
        };

        let agent = AgentConfig {
            paper_trading: env_or("PAPER_TRADING", true),
            simulation_mode: env_or("SIMULATION_MODE", false),
            simulation_data_path: env_opt("SIMULATION_DATA_PATH"),
            analysis_interval_secs: env_or("ANALYSIS_INTERVAL_SECS", 600),
            retry_delay_secs: env_or("RETRY_DELAY_SECS", 60),
            paper_initial_krw: env_or("PAPER_INITIAL_KRW", 1_000_000.0),
        };

        let strategy = StrategyConfig {
            improvement_enabled: env_or("STRATEGY_IMPROVEMENT_ENABLED", true),
            improvements_path: env_opt("STRATEGY_IMPROVEMENTS_PATH"),
            trade_log_path: env_string("TRADE_LOG_PATH", "data/trades.jsonl"),
            fear_greed_api_url: env_string("FEAR_GREED_API_URL", "https://api.alternative.me"),
        };

        if !agent.paper_trading && !agent.simulation_mode {
            if exchange.access_key.is_empty() || exchange.secret_key.is_empty() {
                anyhow::bail!(
                    "UPBIT_ACCESS_KEY and UPBIT_SECRET_KEY are required when PAPER_TRADING=false"
                );
            }
        }

        Ok(Config {
            exchange,
            trading,
            vision,
            agent,
            strategy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_or_falls_back_on_garbage() {
        env::set_var("BITCOIN_AGENT_TEST_RATIO", "not-a-number");
        assert_eq!(env_or("BITCOIN_AGENT_TEST_RATIO", 0.95), 0.95);

        env::set_var("BITCOIN_AGENT_TEST_RATIO", " 0.5 ");
        assert_eq!(env_or("BITCOIN_AGENT_TEST_RATIO", 0.95), 0.5);
        env::remove_var("BITCOIN_AGENT_TEST_RATIO");
    }

    #[test]
    fn test_env_opt_ignores_blank() {
        env::set_var("BITCOIN_AGENT_TEST_BLANK", "  ");
        assert!(env_opt("BITCOIN_AGENT_TEST_BLANK").is_none());
        env::remove_var("BITCOIN_AGENT_TEST_BLANK");
    }
}
