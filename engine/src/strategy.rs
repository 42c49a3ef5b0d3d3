//! Conversion strategies and strategy selection.
//!
//! Two strategies cover every request shape: `StandardStrategy` for plain
//! currency amounts and `ProductStrategy` for product counts carrying a
//! product ID. Their `supports` predicates are mutually exclusive — a
//! positive product ID always selects the product path — and the selector
//! registers the more specific product strategy first.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{debug, instrument};

use crownfx_common::{round_amount, ConversionRequest, ExchangeError, Result};

use crate::catalog::{CatalogProvider, KingdomInfo};
use crate::resolver::RateResolver;

/// Raw result of a strategy computation, before risk assessment.
#[derive(Debug, Clone)]
pub struct ConversionOutcome {
    /// Converted amount, rounded to 2 decimal places.
    pub converted_amount: Decimal,
    /// The rate actually applied, after any product multiplier.
    pub applied_rate: Decimal,
    /// Multiplier applied on top of the base rate (1 when none).
    pub multiplier: Decimal,
}

/// A conversion computation for one request shape.
#[async_trait]
pub trait ConversionStrategy: Send + Sync {
    /// Strategy name, for logging.
    fn name(&self) -> &'static str;

    /// Check whether this strategy handles the request.
    fn supports(&self, request: &ConversionRequest) -> bool;

    /// Compute the conversion.
    async fn convert(&self, request: &ConversionRequest) -> Result<ConversionOutcome>;
}

fn owner_bonus(kingdom: &KingdomInfo) -> Decimal {
    if kingdom.is_owner {
        // Owner kingdoms convert at a fixed 10% bonus.
        Decimal::new(11, 1)
    } else {
        Decimal::ONE
    }
}

/// Currency-only conversion.
///
/// `converted = amount × base_rate × kingdom_quality × owner_bonus`.
/// Kingdom factors are neutral when the request carries no kingdom
/// context.
pub struct StandardStrategy {
    resolver: Arc<RateResolver>,
    catalog: Arc<dyn CatalogProvider>,
}

impl StandardStrategy {
    /// Create a new standard strategy.
    pub fn new(resolver: Arc<RateResolver>, catalog: Arc<dyn CatalogProvider>) -> Self {
        Self { resolver, catalog }
    }
}

#[async_trait]
impl ConversionStrategy for StandardStrategy {
    fn name(&self) -> &'static str {
        "standard"
    }

    fn supports(&self, request: &ConversionRequest) -> bool {
        !request.is_product_conversion()
    }

    #[instrument(skip(self, request), fields(pair = %request.pair()))]
    async fn convert(&self, request: &ConversionRequest) -> Result<ConversionOutcome> {
        let amount = request.quantity_currency.ok_or_else(|| {
            ExchangeError::validation("currency amount is required", "quantityCurrency")
        })?;

        let (quality_rate, bonus) = match request.kingdom_id {
            Some(kingdom_id) => {
                let kingdom = self
                    .catalog
                    .kingdom(kingdom_id)
                    .await
                    .ok_or(ExchangeError::KingdomNotFound(kingdom_id.value()))?;
                (kingdom.quality_rate, owner_bonus(&kingdom))
            }
            None => (Decimal::ONE, Decimal::ONE),
        };

        let base = self
            .resolver
            .resolve_base(
                &request.from_currency_code,
                &request.to_currency_code,
                request.conversion_date,
            )
            .await?;

        let converted = round_amount(amount * base.rate * quality_rate * bonus);
        debug!(rate = %base.rate, converted = %converted, "Standard conversion computed");

        Ok(ConversionOutcome {
            converted_amount: converted,
            applied_rate: base.rate,
            multiplier: Decimal::ONE,
        })
    }
}

/// Product conversion.
///
/// `converted = count × effective_rate × product_multiplier × demand ×
/// quality × kingdom_quality × owner_bonus`, where the effective rate is
/// the product-specific base rate when one exists and the pair base rate
/// otherwise.
pub struct ProductStrategy {
    resolver: Arc<RateResolver>,
    catalog: Arc<dyn CatalogProvider>,
}

impl ProductStrategy {
    /// Create a new product strategy.
    pub fn new(resolver: Arc<RateResolver>, catalog: Arc<dyn CatalogProvider>) -> Self {
        Self { resolver, catalog }
    }
}

#[async_trait]
impl ConversionStrategy for ProductStrategy {
    fn name(&self) -> &'static str {
        "product"
    }

    fn supports(&self, request: &ConversionRequest) -> bool {
        request.is_product_conversion()
    }

    #[instrument(skip(self, request), fields(pair = %request.pair()))]
    async fn convert(&self, request: &ConversionRequest) -> Result<ConversionOutcome> {
        let count = request.quantity_product.ok_or_else(|| {
            ExchangeError::validation("product quantity is required", "quantityProduct")
        })?;
        let product_id = request.product_id.ok_or_else(|| {
            ExchangeError::validation("product id is required", "productId")
        })?;

        let product = self
            .catalog
            .product(product_id)
            .await
            .ok_or(ExchangeError::ProductNotFound(product_id.value()))?;
        let kingdom = self
            .catalog
            .kingdom(product.kingdom_id)
            .await
            .ok_or(ExchangeError::KingdomNotFound(product.kingdom_id.value()))?;

        let base = self
            .resolver
            .resolve_base(
                &request.from_currency_code,
                &request.to_currency_code,
                request.conversion_date,
            )
            .await?;

        // A missing product-specific rate is not a failure: the pair base
        // rate applies with a neutral multiplier.
        let product_rate = match self
            .resolver
            .resolve_product(
                product_id,
                &request.from_currency_code,
                &request.to_currency_code,
                request.conversion_date,
            )
            .await
        {
            Ok(rate) => Some(rate),
            Err(ExchangeError::ProductRateNotFound { .. }) => None,
            Err(e) => return Err(e),
        };

        let (effective_rate, product_multiplier) = match &product_rate {
            Some(rate) => (rate.base_rate, rate.product_multiplier),
            None => (base.rate, Decimal::ONE),
        };

        let converted = round_amount(
            Decimal::from(count)
                * effective_rate
                * product_multiplier
                * product.demand_multiplier
                * product.quality_multiplier
                * kingdom.quality_rate
                * owner_bonus(&kingdom),
        );

        debug!(
            product_id = %product_id,
            effective_rate = %effective_rate,
            multiplier = %product_multiplier,
            converted = %converted,
            "Product conversion computed"
        );

        Ok(ConversionOutcome {
            converted_amount: converted,
            applied_rate: effective_rate * product_multiplier,
            multiplier: product_multiplier,
        })
    }
}

/// Ordered strategy dispatch: the first strategy whose `supports`
/// predicate accepts the request wins.
pub struct StrategySelector {
    strategies: Vec<Arc<dyn ConversionStrategy>>,
}

impl StrategySelector {
    /// Create a selector from an ordered strategy set.
    ///
    /// Order is significant: the more specific strategy must come first
    /// so a request carrying a valid product ID is never handled
    /// generically.
    pub fn new(strategies: Vec<Arc<dyn ConversionStrategy>>) -> Self {
        Self { strategies }
    }

    /// The default set: product conversion ahead of standard.
    pub fn default_set(resolver: Arc<RateResolver>, catalog: Arc<dyn CatalogProvider>) -> Self {
        Self::new(vec![
            Arc::new(ProductStrategy::new(resolver.clone(), catalog.clone())),
            Arc::new(StandardStrategy::new(resolver, catalog)),
        ])
    }

    /// Select the strategy for a request, if any claims it.
    pub fn select(&self, request: &ConversionRequest) -> Option<&Arc<dyn ConversionStrategy>> {
        self.strategies.iter().find(|s| s.supports(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ProductInfo, StaticCatalog};
    use crate::rates::{
        MemoryProductRateRepository, MemoryRateRepository, ProductExchangeRate,
        ProductRateRepository, RateRepository,
    };
    use crate::registry::CurrencyRegistry;
    use crownfx_common::{CurrencyCode, CurrencyPair, KingdomId, ProductId};
    use rust_decimal_macros::dec;

    struct Fixture {
        selector: StrategySelector,
        rates: Arc<MemoryRateRepository>,
        product_rates: Arc<MemoryProductRateRepository>,
        catalog: Arc<StaticCatalog>,
    }

    fn fixture() -> Fixture {
        let currencies = Arc::new(CurrencyRegistry::new());
        currencies.register(CurrencyCode::oro(), "Ouro Real").unwrap();
        currencies.register(CurrencyCode::tib(), "Tibar").unwrap();

        let rates = Arc::new(MemoryRateRepository::new());
        let product_rates = Arc::new(MemoryProductRateRepository::new());
        let catalog = Arc::new(StaticCatalog::new());

        let resolver = Arc::new(RateResolver::new(
            currencies,
            rates.clone(),
            product_rates.clone(),
        ));
        let selector = StrategySelector::default_set(resolver, catalog.clone());

        Fixture {
            selector,
            rates,
            product_rates,
            catalog,
        }
    }

    fn oro_tib() -> CurrencyPair {
        CurrencyPair::new(CurrencyCode::oro(), CurrencyCode::tib())
    }

    fn effective_date() -> chrono::NaiveDate {
        "2024-01-01".parse().unwrap()
    }

    fn seed_kingdom(catalog: &StaticCatalog, quality: Decimal, is_owner: bool) {
        catalog.insert_kingdom(crate::catalog::KingdomInfo {
            id: KingdomId::new(1),
            name: "Altamura".to_string(),
            quality_rate: quality,
            is_owner,
        });
    }

    #[test]
    fn test_supports_is_mutually_exclusive() {
        let f = fixture();
        let currency = ConversionRequest::currency("ORO", "TIB", dec!(100));
        let product = ConversionRequest::product("ORO", "TIB", 5, ProductId::new(3));

        let mut zero_product = currency.clone();
        zero_product.product_id = Some(ProductId::new(0));

        for request in [&currency, &product, &zero_product] {
            let claiming: Vec<_> = f
                .selector
                .strategies
                .iter()
                .filter(|s| s.supports(request))
                .map(|s| s.name())
                .collect();
            assert_eq!(claiming.len(), 1, "exactly one strategy must claim {:?}", claiming);
        }

        assert_eq!(f.selector.select(&product).unwrap().name(), "product");
        assert_eq!(f.selector.select(&currency).unwrap().name(), "standard");
        assert_eq!(f.selector.select(&zero_product).unwrap().name(), "standard");
    }

    #[tokio::test]
    async fn test_standard_conversion_without_kingdom() {
        let f = fixture();
        f.rates.save(oro_tib(), dec!(2.5), effective_date()).await.unwrap();

        let request = ConversionRequest::currency("ORO", "TIB", dec!(100.00));
        let strategy = f.selector.select(&request).unwrap();
        let outcome = strategy.convert(&request).await.unwrap();

        assert_eq!(outcome.converted_amount, dec!(250.00));
        assert_eq!(outcome.applied_rate, dec!(2.5));
        assert_eq!(outcome.multiplier, Decimal::ONE);
    }

    #[tokio::test]
    async fn test_standard_conversion_with_owner_kingdom() {
        let f = fixture();
        f.rates.save(oro_tib(), dec!(2.5), effective_date()).await.unwrap();
        seed_kingdom(&f.catalog, dec!(1.2), true);

        let request =
            ConversionRequest::currency("ORO", "TIB", dec!(100.00)).with_kingdom(KingdomId::new(1));
        let outcome = f
            .selector
            .select(&request)
            .unwrap()
            .convert(&request)
            .await
            .unwrap();

        // 100 × 2.5 × 1.2 × 1.1
        assert_eq!(outcome.converted_amount, dec!(330.00));
    }

    #[tokio::test]
    async fn test_standard_conversion_unknown_kingdom() {
        let f = fixture();
        f.rates.save(oro_tib(), dec!(2.5), effective_date()).await.unwrap();

        let request =
            ConversionRequest::currency("ORO", "TIB", dec!(100.00)).with_kingdom(KingdomId::new(9));
        let result = f
            .selector
            .select(&request)
            .unwrap()
            .convert(&request)
            .await;
        assert!(matches!(result, Err(ExchangeError::KingdomNotFound(9))));
    }

    #[tokio::test]
    async fn test_standard_conversion_missing_rate() {
        let f = fixture();
        let request = ConversionRequest::currency("ORO", "TIB", dec!(100.00));
        let result = f
            .selector
            .select(&request)
            .unwrap()
            .convert(&request)
            .await;
        assert!(matches!(result, Err(ExchangeError::RateNotFound(_))));
    }

    #[tokio::test]
    async fn test_product_conversion_with_product_rate() {
        let f = fixture();
        f.rates.save(oro_tib(), dec!(2.5), effective_date()).await.unwrap();
        seed_kingdom(&f.catalog, dec!(1.0), false);
        f.catalog.insert_product(ProductInfo {
            id: ProductId::new(3),
            name: "Silverwood bow".to_string(),
            demand_multiplier: dec!(2.0),
            quality_multiplier: dec!(1.5),
            kingdom_id: KingdomId::new(1),
        });
        f.product_rates
            .save(ProductExchangeRate::new(
                ProductId::new(3),
                oro_tib(),
                dec!(3.0),
                dec!(1.2),
                effective_date(),
            ))
            .await
            .unwrap();

        let request = ConversionRequest::product("ORO", "TIB", 5, ProductId::new(3));
        let outcome = f
            .selector
            .select(&request)
            .unwrap()
            .convert(&request)
            .await
            .unwrap();

        // 5 × 3.0 × 1.2 × 2.0 × 1.5 × 1.0 × 1.0
        assert_eq!(outcome.converted_amount, dec!(54.00));
        assert_eq!(outcome.applied_rate, dec!(3.6));
        assert_eq!(outcome.multiplier, dec!(1.2));
    }

    #[tokio::test]
    async fn test_product_conversion_falls_back_to_base_rate() {
        let f = fixture();
        f.rates.save(oro_tib(), dec!(2.5), effective_date()).await.unwrap();
        seed_kingdom(&f.catalog, dec!(1.0), false);
        f.catalog.insert_product(ProductInfo {
            id: ProductId::new(3),
            name: "Silverwood bow".to_string(),
            demand_multiplier: dec!(1.0),
            quality_multiplier: dec!(1.0),
            kingdom_id: KingdomId::new(1),
        });

        let request = ConversionRequest::product("ORO", "TIB", 4, ProductId::new(3));
        let outcome = f
            .selector
            .select(&request)
            .unwrap()
            .convert(&request)
            .await
            .unwrap();

        assert_eq!(outcome.converted_amount, dec!(10.00));
        assert_eq!(outcome.applied_rate, dec!(2.5));
        assert_eq!(outcome.multiplier, Decimal::ONE);
    }

    #[tokio::test]
    async fn test_product_conversion_unknown_product() {
        let f = fixture();
        f.rates.save(oro_tib(), dec!(2.5), effective_date()).await.unwrap();

        let request = ConversionRequest::product("ORO", "TIB", 5, ProductId::new(77));
        let result = f
            .selector
            .select(&request)
            .unwrap()
            .convert(&request)
            .await;
        assert!(matches!(result, Err(ExchangeError::ProductNotFound(77))));
    }
}
