// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Queue Bootstrap
//!
//! Brings a [`QueueHandler`] online: connects to the server, runs the
//! pre-channel hook, opens a channel, asserts the queue and subscribes the
//! handler to it.

use crate::{
    channel::AmqpChannel,
    connection::{AmqpConnection, Connector},
    consumer::QueueConsumer,
    errors::AmqpError,
    handler::QueueHandler,
};
use std::{any::type_name, sync::Arc};
use tracing::{debug, error};

/// A queue being consumed, together with the connection it runs on.
#[derive(Clone)]
pub struct RunningQueue {
    connection: Arc<dyn AmqpConnection>,
    queue: QueueConsumer,
}

impl RunningQueue {
    pub fn queue(&self) -> &QueueConsumer {
        &self.queue
    }

    pub fn connection(&self) -> &Arc<dyn AmqpConnection> {
        &self.connection
    }

    /// Closes the channel, then the connection.
    pub async fn close(&self) -> Result<(), AmqpError> {
        self.queue.close_channel().await?;
        self.connection.close().await
    }
}

/// Connects with `connector` and subscribes `handler` to its queue.
///
/// The URL is requested from the handler before anything touches the network;
/// a missing or empty URL is a configuration error. Every other error is
/// returned as reported by the connection or channel.
pub async fn start<H>(connector: &dyn Connector, handler: H) -> Result<RunningQueue, AmqpError>
where
    H: QueueHandler,
{
    let url = handler.url()?;
    if url.is_empty() {
        error!("empty amqp url");
        return Err(AmqpError::ConfigurationError(
            "the queue handler returned an empty url".to_owned(),
        ));
    }

    let options = handler.socket_options().unwrap_or_default();
    let connection = connector.connect(&url, &options).await?;

    handler.before_create_channel(&connection).await?;

    let channel: Arc<dyn AmqpChannel> = connection.create_channel().await?;

    let name = handler
        .queue_name()
        .unwrap_or_else(|| default_queue_name::<H>().to_owned());
    let queue_options = handler.queue_options().unwrap_or_default();
    let info = channel.assert_queue(&name, &queue_options).await?;
    debug!(
        queue = %info.name,
        messages = info.message_count,
        consumers = info.consumer_count,
        "queue asserted"
    );

    let handler: Arc<dyn QueueHandler> = Arc::new(handler);
    let queue = QueueConsumer::new(channel, &info.name, handler).await?;

    Ok(RunningQueue { connection, queue })
}

/// The handler's type name without its module path.
pub fn default_queue_name<H: ?Sized>() -> &'static str {
    let full = type_name::<H>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
