// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Queue Options and Bindings
//!
//! This module provides the option types used when asserting a queue, binding it
//! to exchanges, deleting it and polling it for single messages.

use lapin::{
    options::{BasicGetOptions, QueueDeclareOptions, QueueDeleteOptions},
    types::{AMQPValue, FieldTable, LongInt, LongString, ShortString},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Constant for the header field used to specify a dead letter exchange
pub const AMQP_HEADERS_DEAD_LETTER_EXCHANGE: &str = "x-dead-letter-exchange";
/// Constant for the header field used to specify a dead letter routing key
pub const AMQP_HEADERS_DEAD_LETTER_ROUTING_KEY: &str = "x-dead-letter-routing-key";
/// Constant for the header field used to specify message TTL
pub const AMQP_HEADERS_MESSAGE_TTL: &str = "x-message-ttl";
/// Constant for the header field used to specify the queue expiration
pub const AMQP_HEADERS_EXPIRES: &str = "x-expires";
/// Constant for the header field used to specify maximum queue length
pub const AMQP_HEADERS_MAX_LENGTH: &str = "x-max-length";
/// Constant for the header field used to specify maximum queue size in bytes
pub const AMQP_HEADERS_MAX_LENGTH_BYTES: &str = "x-max-length-bytes";
/// Constant for the header field used to specify the maximum message priority
pub const AMQP_HEADERS_MAX_PRIORITY: &str = "x-max-priority";

/// Options used when asserting a queue.
///
/// Queues are durable unless told otherwise. The optional limits are sent to the
/// broker as `x-` arguments next to any free-form arguments set with
/// [`QueueOptions::argument`].
#[derive(Debug, Clone, PartialEq)]
pub struct QueueOptions {
    pub(crate) durable: bool,
    pub(crate) exclusive: bool,
    pub(crate) auto_delete: bool,
    pub(crate) passive: bool,
    pub(crate) no_wait: bool,
    pub(crate) message_ttl: Option<i32>,
    pub(crate) expires: Option<i32>,
    pub(crate) max_length: Option<i32>,
    pub(crate) max_length_bytes: Option<i32>,
    pub(crate) max_priority: Option<i32>,
    pub(crate) dead_letter_exchange: Option<String>,
    pub(crate) dead_letter_routing_key: Option<String>,
    pub(crate) arguments: BTreeMap<ShortString, AMQPValue>,
}

impl Default for QueueOptions {
    fn default() -> Self {
        QueueOptions {
            durable: true,
            exclusive: false,
            auto_delete: false,
            passive: false,
            no_wait: false,
            message_ttl: None,
            expires: None,
            max_length: None,
            max_length_bytes: None,
            max_priority: None,
            dead_letter_exchange: None,
            dead_letter_routing_key: None,
            arguments: BTreeMap::default(),
        }
    }
}

impl QueueOptions {
    /// Creates the default options: a durable, shared, persistent queue.
    pub fn new() -> QueueOptions {
        QueueOptions::default()
    }

    /// Makes the queue transient; it will not survive a broker restart.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn transient(mut self) -> Self {
        self.durable = false;
        self
    }

    /// Makes the queue exclusive to the connection.
    ///
    /// Exclusive queues are deleted when the connection closes.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    /// Sets the queue to auto-delete once its last consumer goes away.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn auto_delete(mut self) -> Self {
        self.auto_delete = true;
        self
    }

    /// Only checks that the queue exists, without creating it.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn passive(mut self) -> Self {
        self.passive = true;
        self
    }

    /// Sets no_wait flag, making the operation non-blocking.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn no_wait(mut self) -> Self {
        self.no_wait = true;
        self
    }

    /// Sets the message Time-To-Live (TTL) for the queue, in milliseconds.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn message_ttl(mut self, ttl: i32) -> Self {
        self.message_ttl = Some(ttl);
        self
    }

    /// Deletes the queue after it has been unused for the given milliseconds.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn expires(mut self, expires: i32) -> Self {
        self.expires = Some(expires);
        self
    }

    /// Sets the maximum number of messages the queue can hold.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn max_length(mut self, max: i32) -> Self {
        self.max_length = Some(max);
        self
    }

    /// Sets the maximum size in bytes the queue can hold.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn max_length_bytes(mut self, max_bytes: i32) -> Self {
        self.max_length_bytes = Some(max_bytes);
        self
    }

    /// Sets the highest priority the queue supports.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn max_priority(mut self, max: i32) -> Self {
        self.max_priority = Some(max);
        self
    }

    /// Sends rejected or expired messages to the given exchange.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn dead_letter_exchange(mut self, exchange: &str) -> Self {
        self.dead_letter_exchange = Some(exchange.to_owned());
        self
    }

    /// Sets the routing key used when dead-lettering.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn dead_letter_routing_key(mut self, key: &str) -> Self {
        self.dead_letter_routing_key = Some(key.to_owned());
        self
    }

    /// Adds a free-form argument.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn argument(mut self, key: &str, value: AMQPValue) -> Self {
        self.arguments.insert(ShortString::from(key), value);
        self
    }

    pub(crate) fn declare_options(&self) -> QueueDeclareOptions {
        QueueDeclareOptions {
            passive: self.passive,
            durable: self.durable,
            exclusive: self.exclusive,
            auto_delete: self.auto_delete,
            nowait: self.no_wait,
        }
    }

    /// Builds the declaration arguments, shortcuts taking precedence over
    /// free-form arguments with the same key.
    pub(crate) fn declare_arguments(&self) -> FieldTable {
        let mut args = self.arguments.clone();

        let ints = [
            (AMQP_HEADERS_MESSAGE_TTL, self.message_ttl),
            (AMQP_HEADERS_EXPIRES, self.expires),
            (AMQP_HEADERS_MAX_LENGTH, self.max_length),
            (AMQP_HEADERS_MAX_LENGTH_BYTES, self.max_length_bytes),
            (AMQP_HEADERS_MAX_PRIORITY, self.max_priority),
        ];
        for (key, value) in ints {
            if let Some(value) = value {
                args.insert(
                    ShortString::from(key),
                    AMQPValue::LongInt(LongInt::from(value)),
                );
            }
        }

        let strings = [
            (AMQP_HEADERS_DEAD_LETTER_EXCHANGE, &self.dead_letter_exchange),
            (
                AMQP_HEADERS_DEAD_LETTER_ROUTING_KEY,
                &self.dead_letter_routing_key,
            ),
        ];
        for (key, value) in strings {
            if let Some(value) = value {
                args.insert(
                    ShortString::from(key),
                    AMQPValue::LongString(LongString::from(value.as_str())),
                );
            }
        }

        FieldTable::from(args)
    }
}

/// Result of asserting a queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueInfo {
    /// The queue name, as assigned by the server when an empty name was asserted.
    pub name: String,
    pub message_count: u32,
    pub consumer_count: u32,
}

/// Binding of the consumer's queue to an exchange.
///
/// Bindings are applied once while the consumer is being constructed and are not
/// retained afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueBinding {
    pub(crate) exchange: String,
    pub(crate) routing_key: String,
    pub(crate) args: FieldTable,
}

impl QueueBinding {
    /// Creates a binding from the given exchange with the routing key pattern.
    pub fn new(exchange: &str, routing_key: &str) -> QueueBinding {
        QueueBinding {
            exchange: exchange.to_owned(),
            routing_key: routing_key.to_owned(),
            args: FieldTable::default(),
        }
    }

    /// Sets the binding arguments.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn args(mut self, args: FieldTable) -> Self {
        self.args = args;
        self
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }
}

/// Guards applied when deleting a queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteQueueOptions {
    /// Only delete the queue if it has no consumers.
    pub if_unused: bool,
    /// Only delete the queue if it holds no messages.
    pub if_empty: bool,
}

impl From<DeleteQueueOptions> for QueueDeleteOptions {
    fn from(opts: DeleteQueueOptions) -> QueueDeleteOptions {
        QueueDeleteOptions {
            if_unused: opts.if_unused,
            if_empty: opts.if_empty,
            nowait: false,
        }
    }
}

/// Options for polling a queue for a single message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetOptions {
    /// When true the server considers the message acknowledged on delivery.
    pub no_ack: bool,
}

impl From<GetOptions> for BasicGetOptions {
    fn from(opts: GetOptions) -> BasicGetOptions {
        BasicGetOptions {
            no_ack: opts.no_ack,
        }
    }
}
