//! Active currency registry.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crownfx_common::{CurrencyCode, ExchangeError, Result};

/// A registered currency, versioned like rate records: deactivation
/// appends an inactive copy instead of rewriting the active one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyRecord {
    /// Currency code.
    pub code: CurrencyCode,
    /// Display name.
    pub name: String,
    /// Whether this record is the live version.
    pub active: bool,
    /// When the record was deactivated.
    pub deactivated_at: Option<DateTime<Utc>>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

/// Registry of currencies known to the exchange.
pub struct CurrencyRegistry {
    records: DashMap<String, Vec<CurrencyRecord>>,
}

impl CurrencyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Register a new active currency.
    pub fn register(&self, code: CurrencyCode, name: impl Into<String>) -> Result<CurrencyRecord> {
        if !code.is_valid() {
            return Err(ExchangeError::validation(
                format!("invalid currency code: {}", code),
                "currencyCode",
            ));
        }

        let mut versions = self.records.entry(code.as_str().to_string()).or_default();
        if versions.iter().any(|r| r.active) {
            return Err(ExchangeError::CurrencyAlreadyExists(code));
        }

        let record = CurrencyRecord {
            code: code.clone(),
            name: name.into(),
            active: true,
            deactivated_at: None,
            created_at: Utc::now(),
        };
        versions.push(record.clone());
        debug!(code = %code, "Currency registered");
        Ok(record)
    }

    /// Deactivate a currency, keeping its history.
    pub fn deactivate(&self, code: &CurrencyCode) -> Result<()> {
        let mut versions = self
            .records
            .get_mut(code.as_str())
            .ok_or_else(|| ExchangeError::CurrencyNotFound(code.clone()))?;

        let position = versions
            .iter()
            .position(|r| r.active)
            .ok_or_else(|| ExchangeError::CurrencyNotFound(code.clone()))?;

        let mut inactive = versions.remove(position);
        inactive.active = false;
        inactive.deactivated_at = Some(Utc::now());
        versions.push(inactive);

        debug!(code = %code, "Currency deactivated");
        Ok(())
    }

    /// Get the active record for a code, if any.
    pub fn active(&self, code: &CurrencyCode) -> Option<CurrencyRecord> {
        self.records
            .get(code.as_str())
            .and_then(|versions| versions.iter().find(|r| r.active).cloned())
    }

    /// Get the active record or fail with `CurrencyNotFound`.
    pub fn require_active(&self, code: &CurrencyCode) -> Result<CurrencyRecord> {
        self.active(code)
            .ok_or_else(|| ExchangeError::CurrencyNotFound(code.clone()))
    }

    /// All active currencies.
    pub fn active_currencies(&self) -> Vec<CurrencyRecord> {
        self.records
            .iter()
            .filter_map(|versions| versions.iter().find(|r| r.active).cloned())
            .collect()
    }
}

impl Default for CurrencyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let registry = CurrencyRegistry::new();
        registry.register(CurrencyCode::oro(), "Ouro Real").unwrap();

        let record = registry.require_active(&CurrencyCode::oro()).unwrap();
        assert_eq!(record.name, "Ouro Real");
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let registry = CurrencyRegistry::new();
        registry.register(CurrencyCode::tib(), "Tibar").unwrap();

        let result = registry.register(CurrencyCode::tib(), "Tibar again");
        assert!(matches!(result, Err(ExchangeError::CurrencyAlreadyExists(_))));
    }

    #[test]
    fn test_deactivate_keeps_history() {
        let registry = CurrencyRegistry::new();
        registry.register(CurrencyCode::oro(), "Ouro Real").unwrap();
        registry.deactivate(&CurrencyCode::oro()).unwrap();

        assert!(registry.active(&CurrencyCode::oro()).is_none());
        assert!(matches!(
            registry.require_active(&CurrencyCode::oro()),
            Err(ExchangeError::CurrencyNotFound(_))
        ));

        // Re-registration after deactivation is allowed.
        registry.register(CurrencyCode::oro(), "Ouro Real").unwrap();
        assert!(registry.active(&CurrencyCode::oro()).is_some());
    }

    #[test]
    fn test_invalid_code_rejected() {
        let registry = CurrencyRegistry::new();
        assert!(registry.register(CurrencyCode::new("X"), "too short").is_err());
    }
}
