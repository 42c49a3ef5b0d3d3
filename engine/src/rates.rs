//! Exchange rate records and repositories.
//!
//! Rate history is append-only: deactivating a rate writes a new inactive
//! record carrying its deactivation time instead of mutating the active
//! one in place. Repositories hand out owned snapshots, never live
//! handles.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crownfx_common::{CurrencyPair, ExchangeError, ProductId, Result};

/// An exchange rate between two currencies, versioned by effective date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    /// The currency pair.
    pub pair: CurrencyPair,
    /// Conversion rate, strictly positive.
    pub rate: Decimal,
    /// First date the rate applies to.
    pub effective_date: NaiveDate,
    /// Whether this record is the live version.
    pub active: bool,
    /// When the record was deactivated, for historical versions.
    pub deactivated_at: Option<DateTime<Utc>>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl ExchangeRate {
    /// Create a new active rate record.
    pub fn new(pair: CurrencyPair, rate: Decimal, effective_date: NaiveDate) -> Self {
        Self {
            pair,
            rate,
            effective_date,
            active: true,
            deactivated_at: None,
            created_at: Utc::now(),
        }
    }
}

/// A product-specific exchange rate override: base rate plus multiplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductExchangeRate {
    /// The product this rate applies to.
    pub product_id: ProductId,
    /// The currency pair.
    pub pair: CurrencyPair,
    /// Product-specific base rate, strictly positive.
    pub base_rate: Decimal,
    /// Multiplier applied on top of the base rate, strictly positive.
    pub product_multiplier: Decimal,
    /// First date the rate applies to.
    pub effective_date: NaiveDate,
    /// Whether this record is the live version.
    pub active: bool,
    /// When the record was deactivated, for historical versions.
    pub deactivated_at: Option<DateTime<Utc>>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl ProductExchangeRate {
    /// Create a new active product rate record.
    pub fn new(
        product_id: ProductId,
        pair: CurrencyPair,
        base_rate: Decimal,
        product_multiplier: Decimal,
        effective_date: NaiveDate,
    ) -> Self {
        Self {
            product_id,
            pair,
            base_rate,
            product_multiplier,
            effective_date,
            active: true,
            deactivated_at: None,
            created_at: Utc::now(),
        }
    }
}

/// Storage contract for currency-pair exchange rates.
#[async_trait]
pub trait RateRepository: Send + Sync {
    /// The active rate effective on the given date, if any.
    ///
    /// Of the active records whose effective date is not after `date`,
    /// the most recent wins.
    async fn active_rate_on(&self, pair: &CurrencyPair, date: NaiveDate) -> Option<ExchangeRate>;

    /// The most recently created active rate for the pair, if any.
    async fn latest_active_rate(&self, pair: &CurrencyPair) -> Option<ExchangeRate>;

    /// Append a new active rate.
    async fn save(
        &self,
        pair: CurrencyPair,
        rate: Decimal,
        effective_date: NaiveDate,
    ) -> Result<ExchangeRate>;

    /// Deactivate the active rate for the pair and effective date,
    /// preserving it as an inactive historical record.
    async fn deactivate(&self, pair: &CurrencyPair, effective_date: NaiveDate) -> Result<()>;

    /// Full version history for a pair, newest first.
    async fn history(&self, pair: &CurrencyPair) -> Vec<ExchangeRate>;
}

/// Storage contract for product-specific exchange rates.
#[async_trait]
pub trait ProductRateRepository: Send + Sync {
    /// The active product rate effective on the given date, if any.
    async fn active_rate_on(
        &self,
        product_id: ProductId,
        pair: &CurrencyPair,
        date: NaiveDate,
    ) -> Option<ProductExchangeRate>;

    /// The most recently created active product rate, if any.
    async fn latest_active_rate(
        &self,
        product_id: ProductId,
        pair: &CurrencyPair,
    ) -> Option<ProductExchangeRate>;

    /// Append a new active product rate.
    async fn save(&self, rate: ProductExchangeRate) -> Result<ProductExchangeRate>;
}

fn validate_rate(rate: Decimal) -> Result<()> {
    if rate <= Decimal::ZERO {
        return Err(ExchangeError::validation(
            "exchange rate must be greater than zero",
            "rate",
        ));
    }
    if rate > Decimal::from(1_000_000) {
        return Err(ExchangeError::validation("exchange rate too high", "rate"));
    }
    Ok(())
}

/// In-memory rate repository keyed by currency pair.
pub struct MemoryRateRepository {
    records: DashMap<String, Vec<ExchangeRate>>,
}

impl MemoryRateRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    fn key(pair: &CurrencyPair) -> String {
        pair.to_string()
    }
}

impl Default for MemoryRateRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateRepository for MemoryRateRepository {
    async fn active_rate_on(&self, pair: &CurrencyPair, date: NaiveDate) -> Option<ExchangeRate> {
        self.records.get(&Self::key(pair)).and_then(|versions| {
            versions
                .iter()
                .filter(|r| r.active && r.effective_date <= date)
                .max_by_key(|r| r.effective_date)
                .cloned()
        })
    }

    async fn latest_active_rate(&self, pair: &CurrencyPair) -> Option<ExchangeRate> {
        self.records.get(&Self::key(pair)).and_then(|versions| {
            versions
                .iter()
                .filter(|r| r.active)
                .max_by_key(|r| r.created_at)
                .cloned()
        })
    }

    async fn save(
        &self,
        pair: CurrencyPair,
        rate: Decimal,
        effective_date: NaiveDate,
    ) -> Result<ExchangeRate> {
        validate_rate(rate)?;

        let mut versions = self.records.entry(Self::key(&pair)).or_default();
        if versions
            .iter()
            .any(|r| r.active && r.effective_date == effective_date)
        {
            return Err(ExchangeError::RateAlreadyExists {
                pair,
                effective_date,
            });
        }

        let record = ExchangeRate::new(pair, rate, effective_date);
        versions.push(record.clone());
        debug!(pair = %record.pair, rate = %record.rate, "Exchange rate saved");
        Ok(record)
    }

    async fn deactivate(&self, pair: &CurrencyPair, effective_date: NaiveDate) -> Result<()> {
        let mut versions = self
            .records
            .get_mut(&Self::key(pair))
            .ok_or_else(|| ExchangeError::RateNotFound(pair.clone()))?;

        let position = versions
            .iter()
            .position(|r| r.active && r.effective_date == effective_date)
            .ok_or_else(|| ExchangeError::RateNotFound(pair.clone()))?;

        let mut inactive = versions.remove(position);
        inactive.active = false;
        inactive.deactivated_at = Some(Utc::now());
        versions.push(inactive);

        debug!(pair = %pair, %effective_date, "Exchange rate deactivated");
        Ok(())
    }

    async fn history(&self, pair: &CurrencyPair) -> Vec<ExchangeRate> {
        let mut versions = self
            .records
            .get(&Self::key(pair))
            .map(|v| v.clone())
            .unwrap_or_default();
        versions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        versions
    }
}

/// In-memory product rate repository keyed by product and pair.
pub struct MemoryProductRateRepository {
    records: DashMap<String, Vec<ProductExchangeRate>>,
}

impl MemoryProductRateRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    fn key(product_id: ProductId, pair: &CurrencyPair) -> String {
        format!("{}:{}", product_id, pair)
    }
}

impl Default for MemoryProductRateRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProductRateRepository for MemoryProductRateRepository {
    async fn active_rate_on(
        &self,
        product_id: ProductId,
        pair: &CurrencyPair,
        date: NaiveDate,
    ) -> Option<ProductExchangeRate> {
        self.records
            .get(&Self::key(product_id, pair))
            .and_then(|versions| {
                versions
                    .iter()
                    .filter(|r| r.active && r.effective_date <= date)
                    .max_by_key(|r| r.effective_date)
                    .cloned()
            })
    }

    async fn latest_active_rate(
        &self,
        product_id: ProductId,
        pair: &CurrencyPair,
    ) -> Option<ProductExchangeRate> {
        self.records
            .get(&Self::key(product_id, pair))
            .and_then(|versions| {
                versions
                    .iter()
                    .filter(|r| r.active)
                    .max_by_key(|r| r.created_at)
                    .cloned()
            })
    }

    async fn save(&self, rate: ProductExchangeRate) -> Result<ProductExchangeRate> {
        validate_rate(rate.base_rate)?;
        if rate.product_multiplier <= Decimal::ZERO {
            return Err(ExchangeError::validation(
                "product multiplier must be greater than zero",
                "productMultiplier",
            ));
        }

        let mut versions = self
            .records
            .entry(Self::key(rate.product_id, &rate.pair))
            .or_default();
        if versions
            .iter()
            .any(|r| r.active && r.effective_date == rate.effective_date)
        {
            return Err(ExchangeError::RateAlreadyExists {
                pair: rate.pair,
                effective_date: rate.effective_date,
            });
        }

        versions.push(rate.clone());
        debug!(
            product_id = %rate.product_id,
            pair = %rate.pair,
            base_rate = %rate.base_rate,
            "Product exchange rate saved"
        );
        Ok(rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crownfx_common::CurrencyCode;
    use rust_decimal_macros::dec;

    fn oro_tib() -> CurrencyPair {
        CurrencyPair::new(CurrencyCode::oro(), CurrencyCode::tib())
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_save_and_lookup() {
        let repo = MemoryRateRepository::new();
        repo.save(oro_tib(), dec!(2.5), date("2024-01-01")).await.unwrap();

        let rate = repo.latest_active_rate(&oro_tib()).await.unwrap();
        assert_eq!(rate.rate, dec!(2.5));
        assert!(rate.active);
    }

    #[tokio::test]
    async fn test_duplicate_active_rate_rejected() {
        let repo = MemoryRateRepository::new();
        repo.save(oro_tib(), dec!(2.5), date("2024-01-01")).await.unwrap();

        let result = repo.save(oro_tib(), dec!(2.6), date("2024-01-01")).await;
        assert!(matches!(result, Err(ExchangeError::RateAlreadyExists { .. })));
    }

    #[tokio::test]
    async fn test_date_selection_prefers_effective_window() {
        let repo = MemoryRateRepository::new();
        repo.save(oro_tib(), dec!(2.4), date("2024-01-01")).await.unwrap();
        repo.save(oro_tib(), dec!(2.5), date("2024-02-01")).await.unwrap();

        let in_january = repo
            .active_rate_on(&oro_tib(), date("2024-01-15"))
            .await
            .unwrap();
        assert_eq!(in_january.rate, dec!(2.4));

        let in_february = repo
            .active_rate_on(&oro_tib(), date("2024-02-15"))
            .await
            .unwrap();
        assert_eq!(in_february.rate, dec!(2.5));

        // Before any effective date there is no match.
        assert!(repo
            .active_rate_on(&oro_tib(), date("2023-12-31"))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_deactivate_preserves_history() {
        let repo = MemoryRateRepository::new();
        repo.save(oro_tib(), dec!(2.5), date("2024-01-01")).await.unwrap();
        repo.deactivate(&oro_tib(), date("2024-01-01")).await.unwrap();

        assert!(repo.latest_active_rate(&oro_tib()).await.is_none());

        let history = repo.history(&oro_tib()).await;
        assert_eq!(history.len(), 1);
        assert!(!history[0].active);
        assert!(history[0].deactivated_at.is_some());
        assert_eq!(history[0].rate, dec!(2.5));
    }

    #[tokio::test]
    async fn test_invalid_rates_rejected() {
        let repo = MemoryRateRepository::new();
        assert!(repo.save(oro_tib(), dec!(0), date("2024-01-01")).await.is_err());
        assert!(repo
            .save(oro_tib(), dec!(-1.5), date("2024-01-01"))
            .await
            .is_err());
        assert!(repo
            .save(oro_tib(), dec!(2000000), date("2024-01-01"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_product_rate_save_and_lookup() {
        let repo = MemoryProductRateRepository::new();
        let rate = ProductExchangeRate::new(
            ProductId::new(7),
            oro_tib(),
            dec!(3.0),
            dec!(1.2),
            date("2024-01-01"),
        );
        repo.save(rate).await.unwrap();

        let found = repo
            .latest_active_rate(ProductId::new(7), &oro_tib())
            .await
            .unwrap();
        assert_eq!(found.base_rate, dec!(3.0));
        assert_eq!(found.product_multiplier, dec!(1.2));

        assert!(repo
            .latest_active_rate(ProductId::new(8), &oro_tib())
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_non_positive_multiplier_rejected() {
        let repo = MemoryProductRateRepository::new();
        let rate = ProductExchangeRate::new(
            ProductId::new(7),
            oro_tib(),
            dec!(3.0),
            dec!(0),
            date("2024-01-01"),
        );
        assert!(repo.save(rate).await.is_err());
    }
}
