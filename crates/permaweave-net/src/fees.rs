//! Reward estimation from gateway price quotes.

use tracing::debug;

use crate::error::QuoteUnavailableError;
use crate::gateway::Gateway;
use crate::retry::{with_retry, RetryPolicy};

/// Fee behavior knobs.
#[derive(Debug, Clone)]
pub struct FeeConfig {
    /// Percent added on top of the quoted price.
    pub markup_percent: u64,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self { markup_percent: 10 }
    }
}

/// Apply the markup to a raw quote, rounding up, clamped positive.
pub fn apply_markup(quote: u128, markup_percent: u64) -> u128 {
    quote
        .saturating_mul(100 + markup_percent as u128)
        .div_ceil(100)
        .max(1)
}

/// Converts payload sizes into reward amounts via the gateway's current
/// price quote. Stateless apart from its configuration.
pub struct FeeEstimator<G> {
    gateway: G,
    config: FeeConfig,
    retry: RetryPolicy,
}

impl<G: Gateway> FeeEstimator<G> {
    pub fn new(gateway: G, config: FeeConfig, retry: RetryPolicy) -> Self {
        Self {
            gateway,
            config,
            retry,
        }
    }

    /// Estimate the reward for storing `data_size` bytes.
    ///
    /// Pure in (size, current quote, markup); the quote is fetched with
    /// bounded retry and failure surfaces as [`QuoteUnavailableError`].
    pub async fn estimate(&self, data_size: u64) -> Result<u128, QuoteUnavailableError> {
        let quote = with_retry(&self.retry, || self.gateway.price(data_size))
            .await
            .map_err(|(attempts, source)| QuoteUnavailableError { attempts, source })?;
        let reward = apply_markup(quote, self.config.markup_percent);
        debug!(data_size, quote, reward, "estimated reward");
        Ok(reward)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::memory::{Endpoint, MemoryGateway};

    #[test]
    fn test_markup_rounds_up_and_stays_positive() {
        assert_eq!(apply_markup(100, 10), 110);
        assert_eq!(apply_markup(99, 10), 109); // ceil(108.9)
        assert_eq!(apply_markup(100, 0), 100);
        assert_eq!(apply_markup(0, 0), 1);
    }

    #[tokio::test]
    async fn test_estimate_applies_markup() {
        let gateway = MemoryGateway::new();
        gateway.set_price(10, 0).await;
        let estimator = FeeEstimator::new(
            gateway,
            FeeConfig { markup_percent: 10 },
            RetryPolicy::default(),
        );
        assert_eq!(estimator.estimate(100).await.unwrap(), 1_100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_estimate_retries_transient_failures() {
        let gateway = MemoryGateway::new();
        gateway.set_price(1, 0).await;
        gateway.fail_next(Endpoint::Price, 2).await;

        let estimator = FeeEstimator::new(
            gateway,
            FeeConfig { markup_percent: 0 },
            RetryPolicy::default(),
        );
        assert_eq!(estimator.estimate(500).await.unwrap(), 500);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quote_unavailable_after_budget() {
        let gateway = MemoryGateway::new();
        gateway.fail_next(Endpoint::Price, 10).await;

        let estimator = FeeEstimator::new(gateway, FeeConfig::default(), RetryPolicy::default());
        let err = estimator.estimate(1).await.unwrap_err();
        assert_eq!(err.attempts, 3);
    }
}
