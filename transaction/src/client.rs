//! Conversion client: the command-publishing side of the saga.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crownfx_broker::{Broker, Topic};
use crownfx_common::{
    CommandId, ConversionRequest, CorrelationId, ExchangeError, Result, TransactionStatus,
};
use crownfx_protocol::ConversionCommand;

use crate::config::TransactionConfig;
use crate::ledger::TransactionLedger;
use crate::record::TransactionRecord;

/// Immediate acknowledgment returned when a conversion command has been
/// published. The actual decision arrives later as an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionReceipt {
    /// The command that was published.
    pub command_id: CommandId,
    /// Correlation token the answering event will carry.
    pub correlation_id: CorrelationId,
    /// Initial status; always `REQUESTED` at publish time.
    pub status: TransactionStatus,
}

/// Publishes conversion commands and records them in the local ledger.
pub struct ConversionClient {
    commands: Arc<Topic>,
    ledger: Arc<TransactionLedger>,
}

impl ConversionClient {
    /// Wire a client against a broker.
    pub fn new(config: &TransactionConfig, broker: &Broker, ledger: Arc<TransactionLedger>) -> Self {
        Self {
            commands: broker.topic(&config.command_topic),
            ledger,
        }
    }

    /// Publish a conversion command, fire-and-forget.
    ///
    /// The call does not wait for the decision: it records the request
    /// locally, hands the command to the broker and returns. The event
    /// worker finalizes the record when the answering event arrives.
    #[instrument(skip(self, request), fields(pair = %request.pair()))]
    pub fn request_conversion(&self, request: &ConversionRequest) -> Result<ConversionReceipt> {
        let command = ConversionCommand::from_request(request);

        self.ledger.insert(TransactionRecord::for_command(&command));
        self.commands
            .publish(&command.partition_key(), &command)
            .map_err(|e| ExchangeError::Broker(e.to_string()))?;

        info!(
            command_id = %command.command_id,
            correlation_id = %command.correlation_id,
            "Conversion command published"
        );

        Ok(ConversionReceipt {
            command_id: command.command_id,
            correlation_id: command.correlation_id,
            status: TransactionStatus::Requested,
        })
    }
}
