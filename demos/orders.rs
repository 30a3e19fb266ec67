// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! Consumes the `orders` queue, printing every message.
//!
//! The server is read from `AMQP_URL` (or the `RABBITMQ_*` variables).
//! Ctrl+C closes the channel, then the connection.

use amqp_queue::{
    bootstrap,
    connection::{AmqpConnection, ConnectionOptions, LapinConnector},
    consumer::{ConsumeOptions, QueueConsumer},
    errors::AmqpError,
    events::{ConnectionEvent, ConnectionEventKind},
    handler::QueueHandler,
    message::Message,
    queue::QueueBinding,
    settings::AmqpSettings,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};

struct Orders {
    settings: AmqpSettings,
}

#[async_trait]
impl QueueHandler for Orders {
    fn url(&self) -> Result<String, AmqpError> {
        Ok(self.settings.uri())
    }

    fn socket_options(&self) -> Option<ConnectionOptions> {
        Some(self.settings.connection_options())
    }

    fn queue_name(&self) -> Option<String> {
        Some("orders".to_owned())
    }

    async fn before_create_channel(
        &self,
        connection: &Arc<dyn AmqpConnection>,
    ) -> Result<(), AmqpError> {
        connection.on(
            ConnectionEventKind::Close,
            Box::new(|_: &ConnectionEvent| info!("connection closed")),
        );
        Ok(())
    }

    fn consume_options(&self) -> Option<ConsumeOptions> {
        Some(ConsumeOptions::new().exclusive())
    }

    fn bindings(&self) -> Vec<QueueBinding> {
        vec![QueueBinding::new("amq.topic", "orders.#")]
    }

    async fn consume(&self, queue: &QueueConsumer, msg: Message) -> Result<(), AmqpError> {
        info!(queue = queue.name(), payload = msg.text(), "consume");
        queue.ack(&msg, false).await
    }

    fn on_close(&self) {
        info!("channel closed");
    }

    fn on_error(&self, err: &AmqpError) {
        error!(error = err.to_string(), "channel error");
    }
}

#[tokio::main]
async fn main() -> Result<(), AmqpError> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let handler = Orders {
        settings: AmqpSettings::from_env()?,
    };

    let running = bootstrap::start(&LapinConnector, handler).await?;
    running.queue().prefetch(10, false).await?;
    info!(queue = running.queue().name(), "waiting for messages");

    tokio::signal::ctrl_c()
        .await
        .map_err(|_| AmqpError::InternalError)?;

    info!("ctrl+c: closing");
    running.close().await
}
