//! CrownFX Exchange Service
//!
//! The processing side of the conversion saga. A command worker consumes
//! conversion commands from the broker, runs the decision engine, and
//! publishes a result event that echoes the command's correlation
//! identifiers. The inbound command is acknowledged only after the event
//! has been published, so a crash in between leads to redelivery rather
//! than a lost answer.

pub mod config;
pub mod worker;

pub use config::ExchangeConfig;
pub use worker::CommandWorker;
