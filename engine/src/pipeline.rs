//! The conversion pipeline: validation, strategy dispatch, risk
//! assessment and pending-transaction creation.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crownfx_common::{
    ConversionDecision, ConversionRequest, ExchangeError, Result, TransactionId,
    TransactionStatus,
};

use crate::catalog::CatalogProvider;
use crate::resolver::RateResolver;
use crate::risk::RiskAnalyzer;
use crate::store::{PendingTransaction, TransactionStore};
use crate::strategy::StrategySelector;

/// Orchestrates one conversion from request to decision.
pub struct ConversionPipeline {
    selector: StrategySelector,
    analyzer: RiskAnalyzer,
    store: Arc<dyn TransactionStore>,
}

impl ConversionPipeline {
    /// Create a pipeline from its parts.
    pub fn new(
        selector: StrategySelector,
        analyzer: RiskAnalyzer,
        store: Arc<dyn TransactionStore>,
    ) -> Self {
        Self {
            selector,
            analyzer,
            store,
        }
    }

    /// Run a conversion.
    ///
    /// Validation failures and not-found conditions are errors; a
    /// guard-rail rejection is a normal decision. When no strategy claims
    /// the request the pipeline returns a terminal `NOT_APPROVED`
    /// decision rather than failing.
    #[instrument(skip(self, request), fields(pair = %request.pair()))]
    pub async fn convert(&self, request: &ConversionRequest) -> Result<ConversionDecision> {
        validate(request)?;

        let strategy = match self.selector.select(request) {
            Some(strategy) => strategy,
            None => {
                warn!(pair = %request.pair(), "No conversion strategy claimed the request");
                return Ok(ConversionDecision::not_approved(
                    request.from_currency_code.clone(),
                    request.to_currency_code.clone(),
                    "no conversion strategy available for the given parameters",
                ));
            }
        };

        let outcome = strategy.convert(request).await?;
        let assessment = self
            .analyzer
            .assess(&request.pair(), outcome.applied_rate, outcome.multiplier);

        let mut decision = ConversionDecision {
            converted_amount: outcome.converted_amount,
            applied_rate: outcome.applied_rate,
            from_currency_code: request.from_currency_code.clone(),
            to_currency_code: request.to_currency_code.clone(),
            status: assessment.status,
            reason: assessment.reason,
            risk_score: assessment.risk_score,
            warnings: assessment.warnings,
            recommendations: assessment.recommendations,
            can_proceed: assessment.can_proceed,
            requires_approval: assessment.requires_approval,
            transaction_id: None,
            expires_at: None,
            confirmation_url: None,
        };

        if decision.status == TransactionStatus::Requested {
            let entry = self.store.create(&decision, request);
            decision.transaction_id = Some(entry.transaction_id);
            decision.expires_at = Some(entry.expires_at);
            decision.confirmation_url = Some(format!(
                "/api/v1/transactions/{}/confirm",
                entry.transaction_id
            ));
        }

        info!(
            strategy = strategy.name(),
            status = %decision.status,
            risk_score = %decision.risk_score,
            converted = %decision.converted_amount,
            "Conversion decided"
        );

        Ok(decision)
    }

    /// Confirm a pending transaction, consuming its entry.
    ///
    /// Expired and unknown transactions are indistinguishable.
    pub fn confirm(&self, transaction_id: &TransactionId) -> Result<PendingTransaction> {
        let entry = self
            .store
            .get(transaction_id)
            .ok_or_else(|| ExchangeError::TransactionNotFound(transaction_id.to_string()))?;
        self.store.delete(transaction_id);

        info!(transaction_id = %transaction_id, "Pending transaction confirmed");
        Ok(entry)
    }

    /// The pending-transaction store backing this pipeline.
    pub fn store(&self) -> &Arc<dyn TransactionStore> {
        &self.store
    }
}

fn validate(request: &ConversionRequest) -> Result<()> {
    if !request.from_currency_code.is_valid() {
        return Err(ExchangeError::validation(
            format!("invalid source currency code: {}", request.from_currency_code),
            "fromCurrencyCode",
        ));
    }
    if !request.to_currency_code.is_valid() {
        return Err(ExchangeError::validation(
            format!("invalid target currency code: {}", request.to_currency_code),
            "toCurrencyCode",
        ));
    }
    if request.from_currency_code == request.to_currency_code {
        return Err(ExchangeError::validation(
            "source and target currencies must differ",
            "toCurrencyCode",
        ));
    }

    if request.is_product_conversion() {
        match request.quantity_product {
            Some(count) if count > 0 => {}
            _ => {
                return Err(ExchangeError::validation(
                    "product quantity must be greater than zero",
                    "quantityProduct",
                ))
            }
        }
    } else {
        match request.quantity_currency {
            Some(amount) if amount > rust_decimal::Decimal::ZERO => {}
            _ => {
                return Err(ExchangeError::validation(
                    "currency amount must be greater than zero",
                    "quantityCurrency",
                ))
            }
        }
    }

    Ok(())
}

/// Builder assembling a pipeline with in-memory backends.
pub struct PipelineBuilder {
    currencies: Arc<crate::registry::CurrencyRegistry>,
    rates: Arc<dyn crate::rates::RateRepository>,
    product_rates: Arc<dyn crate::rates::ProductRateRepository>,
    catalog: Arc<dyn CatalogProvider>,
    analyzer: RiskAnalyzer,
    store: Arc<dyn TransactionStore>,
}

impl PipelineBuilder {
    /// Start a builder over fresh in-memory backends.
    pub fn new() -> Self {
        Self {
            currencies: Arc::new(crate::registry::CurrencyRegistry::new()),
            rates: Arc::new(crate::rates::MemoryRateRepository::new()),
            product_rates: Arc::new(crate::rates::MemoryProductRateRepository::new()),
            catalog: Arc::new(crate::catalog::StaticCatalog::new()),
            analyzer: RiskAnalyzer::default(),
            store: Arc::new(crate::store::MemoryTransactionStore::new()),
        }
    }

    /// Use a specific currency registry.
    pub fn currencies(mut self, currencies: Arc<crate::registry::CurrencyRegistry>) -> Self {
        self.currencies = currencies;
        self
    }

    /// Use a specific rate repository.
    pub fn rates(mut self, rates: Arc<dyn crate::rates::RateRepository>) -> Self {
        self.rates = rates;
        self
    }

    /// Use a specific product rate repository.
    pub fn product_rates(
        mut self,
        product_rates: Arc<dyn crate::rates::ProductRateRepository>,
    ) -> Self {
        self.product_rates = product_rates;
        self
    }

    /// Use a specific catalog provider.
    pub fn catalog(mut self, catalog: Arc<dyn CatalogProvider>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Use a specific risk analyzer.
    pub fn analyzer(mut self, analyzer: RiskAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Use a specific pending-transaction store.
    pub fn store(mut self, store: Arc<dyn TransactionStore>) -> Self {
        self.store = store;
        self
    }

    /// Build the pipeline.
    pub fn build(self) -> ConversionPipeline {
        let resolver = Arc::new(RateResolver::new(
            self.currencies,
            self.rates,
            self.product_rates,
        ));
        let selector = StrategySelector::default_set(resolver, self.catalog);
        ConversionPipeline::new(selector, self.analyzer, self.store)
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
