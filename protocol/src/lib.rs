//! CrownFX Protocol
//!
//! Message types exchanged between the initiating (transaction) service and
//! the processing (exchange) service of the conversion saga. A command asks
//! for a conversion; the answering event echoes the command's identifiers so
//! the initiator can correlate the asynchronous response.

pub mod messages;

pub use messages::{
    ConversionCommand, ConversionEvent, CONVERSION_COMMAND_TOPIC, CONVERSION_EVENT_TOPIC,
};
