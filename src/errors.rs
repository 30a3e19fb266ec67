// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Error Types for the Queue Consumer
//!
//! This module provides the error type shared by the queue consumer, the channel
//! and connection abstractions, and the lapin adapter. Transport errors carry the
//! message reported by the AMQP client so they can be surfaced unchanged.

use thiserror::Error;

/// Represents errors that can occur while setting up or driving a queue consumer.
///
/// Configuration errors (`ConfigurationError`, `UnimplementedError`) come from
/// missing [`QueueHandler`](crate::handler::QueueHandler) overrides. Every other
/// variant is produced by the channel or connection and is passed through by the
/// consumer without translation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmqpError {
    /// Internal errors that don't fit into other categories
    #[error("internal error")]
    InternalError,

    /// A required setting or override is missing or invalid
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    /// A required hook was not implemented
    #[error("unimplemented: {0}")]
    UnimplementedError(String),

    /// Error establishing a connection to the AMQP server
    #[error("failure to connect: {0}")]
    ConnectionError(String),

    /// Error creating or operating a channel
    #[error("channel failure: {0}")]
    ChannelError(String),

    /// Error declaring a queue with the given name
    #[error("failure to declare a queue `{0}`: {1}")]
    DeclareQueueError(String, String),

    /// Error binding an exchange to a queue
    #[error("failure to binding exchange `{0}` to queue `{1}`: {2}")]
    BindingExchangeToQueueError(String, String, String),

    /// Error removing the binding between an exchange and a queue
    #[error("failure to unbind exchange `{0}` from queue `{1}`: {2}")]
    UnbindingExchangeFromQueueError(String, String, String),

    /// Error registering a consumer on a queue
    #[error("failure to declare consumer on queue `{0}`: {1}")]
    ConsumerDeclarationError(String, String),

    /// Error parsing a message payload
    #[error("failure to parse payload: {0}")]
    ParsePayloadError(String),

    /// Error acknowledging a message
    #[error("failure to ack message: {0}")]
    AckMessageError(String),

    /// Error negative-acknowledging a message
    #[error("failure to nack message: {0}")]
    NackMessageError(String),

    /// Error rejecting a message
    #[error("failure to reject message: {0}")]
    RejectMessageError(String),

    /// Error configuring Quality of Service parameters
    #[error("failure to configure qos: {0}")]
    QoSDeclarationError(String),

    /// Error requeuing unacknowledged messages
    #[error("failure to recover messages: {0}")]
    RecoverError(String),

    /// Error deleting a queue
    #[error("failure to delete queue `{0}`: {1}")]
    DeleteQueueError(String, String),

    /// Error purging a queue
    #[error("failure to purge queue `{0}`: {1}")]
    PurgeQueueError(String, String),

    /// Error polling a queue for a single message
    #[error("failure to get message from queue `{0}`: {1}")]
    GetMessageError(String, String),

    /// Error closing a channel
    #[error("failure to close channel: {0}")]
    CloseChannelError(String),

    /// Error closing a connection
    #[error("failure to close connection: {0}")]
    CloseConnectionError(String),

    /// Error reported by a message handler
    #[error("handler failure: {0}")]
    HandlerError(String),
}
