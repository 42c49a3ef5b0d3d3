//! CrownFX Conversion Engine
//!
//! The decision engine behind every conversion: rate storage and
//! resolution, the strategy set (currency-only and product conversions),
//! the risk guard rail, and the time-bound store for conversions that
//! await confirmation.
//!
//! # Example
//!
//! ```rust,ignore
//! use crownfx_engine::{ConversionPipeline, PipelineBuilder};
//! use crownfx_common::ConversionRequest;
//! use rust_decimal_macros::dec;
//!
//! let pipeline = PipelineBuilder::new()
//!     .rates(rates)
//!     .catalog(catalog)
//!     .build();
//!
//! let request = ConversionRequest::currency("ORO", "TIB", dec!(100.00));
//! let decision = pipeline.convert(&request).await?;
//! ```

pub mod catalog;
pub mod pipeline;
pub mod rates;
pub mod registry;
pub mod resolver;
pub mod risk;
pub mod store;
pub mod strategy;

pub use catalog::{CatalogProvider, KingdomInfo, ProductInfo, StaticCatalog};
pub use pipeline::{ConversionPipeline, PipelineBuilder};
pub use rates::{
    ExchangeRate, MemoryProductRateRepository, MemoryRateRepository, ProductExchangeRate,
    ProductRateRepository, RateRepository,
};
pub use registry::CurrencyRegistry;
pub use resolver::RateResolver;
pub use risk::{ReferenceRates, RiskAnalyzer, RiskAssessment};
pub use store::{MemoryTransactionStore, PendingTransaction, TransactionStore};
pub use strategy::{
    ConversionOutcome, ConversionStrategy, ProductStrategy, StandardStrategy, StrategySelector,
};
