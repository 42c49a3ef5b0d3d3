//! Rate resolution.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, instrument};

use crownfx_common::{CurrencyCode, CurrencyPair, ExchangeError, ProductId, Result};

use crate::rates::{ExchangeRate, ProductExchangeRate, ProductRateRepository, RateRepository};
use crate::registry::CurrencyRegistry;

/// Resolves the rate to use for a conversion.
///
/// Resolution is read-only. Both currency codes must denote active
/// currencies; beyond that the selection rule is: prefer the active rate
/// whose effective window contains the requested date, otherwise fall
/// back to the latest active rate for the pair.
pub struct RateResolver {
    currencies: Arc<CurrencyRegistry>,
    rates: Arc<dyn RateRepository>,
    product_rates: Arc<dyn ProductRateRepository>,
}

impl RateResolver {
    /// Create a new resolver.
    pub fn new(
        currencies: Arc<CurrencyRegistry>,
        rates: Arc<dyn RateRepository>,
        product_rates: Arc<dyn ProductRateRepository>,
    ) -> Self {
        Self {
            currencies,
            rates,
            product_rates,
        }
    }

    /// Resolve the active base rate for a currency pair.
    #[instrument(skip(self), fields(from = %from, to = %to))]
    pub async fn resolve_base(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        date: Option<NaiveDate>,
    ) -> Result<ExchangeRate> {
        self.currencies.require_active(from)?;
        self.currencies.require_active(to)?;

        let pair = CurrencyPair::new(from.clone(), to.clone());
        let date = date.unwrap_or_else(|| Utc::now().date_naive());

        if let Some(rate) = self.rates.active_rate_on(&pair, date).await {
            debug!(pair = %pair, rate = %rate.rate, "Resolved rate by effective date");
            return Ok(rate);
        }

        match self.rates.latest_active_rate(&pair).await {
            Some(rate) => {
                debug!(pair = %pair, rate = %rate.rate, "Resolved latest active rate");
                Ok(rate)
            }
            None => Err(ExchangeError::RateNotFound(pair)),
        }
    }

    /// Resolve the active product-specific rate, if one exists.
    #[instrument(skip(self), fields(product_id = %product_id, from = %from, to = %to))]
    pub async fn resolve_product(
        &self,
        product_id: ProductId,
        from: &CurrencyCode,
        to: &CurrencyCode,
        date: Option<NaiveDate>,
    ) -> Result<ProductExchangeRate> {
        self.currencies.require_active(from)?;
        self.currencies.require_active(to)?;

        let pair = CurrencyPair::new(from.clone(), to.clone());
        let date = date.unwrap_or_else(|| Utc::now().date_naive());

        if let Some(rate) = self.product_rates.active_rate_on(product_id, &pair, date).await {
            return Ok(rate);
        }

        self.product_rates
            .latest_active_rate(product_id, &pair)
            .await
            .ok_or(ExchangeError::ProductRateNotFound {
                product_id: product_id.value(),
                pair,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::{MemoryProductRateRepository, MemoryRateRepository};
    use rust_decimal_macros::dec;

    fn setup() -> (RateResolver, Arc<MemoryRateRepository>) {
        let currencies = Arc::new(CurrencyRegistry::new());
        currencies.register(CurrencyCode::oro(), "Ouro Real").unwrap();
        currencies.register(CurrencyCode::tib(), "Tibar").unwrap();

        let rates = Arc::new(MemoryRateRepository::new());
        let product_rates = Arc::new(MemoryProductRateRepository::new());

        (
            RateResolver::new(currencies, rates.clone(), product_rates),
            rates,
        )
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_unknown_currency_fails_before_rate_lookup() {
        let (resolver, _) = setup();
        let result = resolver
            .resolve_base(&CurrencyCode::new("XYZ"), &CurrencyCode::tib(), None)
            .await;
        assert!(matches!(result, Err(ExchangeError::CurrencyNotFound(_))));
    }

    #[tokio::test]
    async fn test_missing_rate_surfaces_not_found() {
        let (resolver, _) = setup();
        let result = resolver
            .resolve_base(&CurrencyCode::oro(), &CurrencyCode::tib(), None)
            .await;
        assert!(matches!(result, Err(ExchangeError::RateNotFound(_))));
    }

    #[tokio::test]
    async fn test_date_match_preferred_over_latest() {
        let (resolver, rates) = setup();
        let pair = CurrencyPair::new(CurrencyCode::oro(), CurrencyCode::tib());
        rates.save(pair.clone(), dec!(2.4), date("2024-01-01")).await.unwrap();
        rates.save(pair, dec!(2.5), date("2024-06-01")).await.unwrap();

        let resolved = resolver
            .resolve_base(
                &CurrencyCode::oro(),
                &CurrencyCode::tib(),
                Some(date("2024-03-01")),
            )
            .await
            .unwrap();
        assert_eq!(resolved.rate, dec!(2.4));
    }

    #[tokio::test]
    async fn test_fallback_to_latest_active() {
        let (resolver, rates) = setup();
        let pair = CurrencyPair::new(CurrencyCode::oro(), CurrencyCode::tib());
        rates.save(pair, dec!(2.5), date("2024-06-01")).await.unwrap();

        // Requested date precedes every effective window; the latest
        // active rate still answers.
        let resolved = resolver
            .resolve_base(
                &CurrencyCode::oro(),
                &CurrencyCode::tib(),
                Some(date("2024-01-01")),
            )
            .await
            .unwrap();
        assert_eq!(resolved.rate, dec!(2.5));
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent() {
        let (resolver, rates) = setup();
        let pair = CurrencyPair::new(CurrencyCode::oro(), CurrencyCode::tib());
        rates.save(pair, dec!(2.5), date("2024-01-01")).await.unwrap();

        let first = resolver
            .resolve_base(&CurrencyCode::oro(), &CurrencyCode::tib(), Some(date("2024-02-01")))
            .await
            .unwrap();
        let second = resolver
            .resolve_base(&CurrencyCode::oro(), &CurrencyCode::tib(), Some(date("2024-02-01")))
            .await
            .unwrap();
        assert_eq!(first, second);
    }
}
