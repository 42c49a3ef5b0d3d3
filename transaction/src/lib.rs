//! CrownFX Transaction Service
//!
//! The initiating side of the conversion saga. The client publishes a
//! conversion command and returns immediately; the event worker later
//! matches the answering event to the local transaction record by
//! correlation ID and updates it. Events with no matching record are
//! logged and dropped, never retried.

pub mod client;
pub mod config;
pub mod ledger;
pub mod record;
pub mod worker;

pub use client::{ConversionClient, ConversionReceipt};
pub use config::TransactionConfig;
pub use ledger::TransactionLedger;
pub use record::TransactionRecord;
pub use worker::EventWorker;
