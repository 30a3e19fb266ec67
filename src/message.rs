// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Delivered Messages
//!
//! The message handed to queue handlers, built from lapin deliveries.

use crate::errors::AmqpError;
use lapin::{message::Delivery, types::FieldTable, BasicProperties};
use serde::de::DeserializeOwned;

/// A message delivered by the broker.
///
/// The payload is kept as raw bytes. The delivery tag identifies the message
/// when acknowledging or rejecting it through the
/// [`QueueConsumer`](crate::consumer::QueueConsumer).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    pub delivery_tag: u64,
    pub exchange: String,
    pub routing_key: String,
    pub redelivered: bool,
    pub headers: FieldTable,
    pub content_type: Option<String>,
    pub kind: Option<String>,
    pub message_id: Option<String>,
    pub data: Vec<u8>,
}

impl Message {
    /// Creates a message with the given delivery tag and payload.
    pub fn new(delivery_tag: u64, data: impl Into<Vec<u8>>) -> Message {
        Message {
            delivery_tag,
            data: data.into(),
            ..Default::default()
        }
    }

    /// Deserializes the JSON payload.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, AmqpError> {
        serde_json::from_slice(&self.data)
            .map_err(|err| AmqpError::ParsePayloadError(err.to_string()))
    }

    /// The payload as UTF-8 text, with invalid sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

impl From<Delivery> for Message {
    fn from(delivery: Delivery) -> Message {
        let mut message = from_properties(&delivery.properties);
        message.delivery_tag = delivery.delivery_tag;
        message.exchange = delivery.exchange.to_string();
        message.routing_key = delivery.routing_key.to_string();
        message.redelivered = delivery.redelivered;
        message.data = delivery.data;
        message
    }
}

fn from_properties(props: &BasicProperties) -> Message {
    Message {
        headers: props.headers().clone().unwrap_or_default(),
        content_type: props.content_type().as_ref().map(|v| v.to_string()),
        kind: props.kind().as_ref().map(|v| v.to_string()),
        message_id: props.message_id().as_ref().map(|v| v.to_string()),
        ..Default::default()
    }
}
