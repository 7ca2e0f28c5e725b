//! Vision-model access: the [`VisionModel`] seam, an OpenAI-compatible
//! client, the chart-analysis prompt and chart image sources.

pub mod chart;
pub mod client;
pub mod prompts;

use async_trait::async_trait;

use crate::error::VisionError;

pub use chart::{ChartSource, FileChartSource};
pub use client::OpenRouterClient;
pub use prompts::{chart_analysis_prompt, MarketContext};

#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Raw model text for `prompt`, with an optional PNG chart attached.
    async fn analyze(&self, prompt: &str, image: Option<&[u8]>) -> Result<String, VisionError>;

    fn name(&self) -> &str;
}
