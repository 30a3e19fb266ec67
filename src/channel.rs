// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # AMQP Channel Abstraction
//!
//! This module defines the channel operations the queue consumer relies on and
//! implements them on top of a lapin channel. The consumer only ever talks to the
//! [`AmqpChannel`] trait, so the client behind it can be swapped or mocked.

use crate::{
    consumer::ConsumeOptions,
    errors::AmqpError,
    events::{ChannelEvent, ChannelEventKind, ChannelListener, Listeners},
    message::Message,
    queue::{DeleteQueueOptions, GetOptions, QueueInfo, QueueOptions},
};
use async_trait::async_trait;
use futures_util::{future::BoxFuture, StreamExt};
use lapin::{
    options::{
        BasicAckOptions, BasicNackOptions, BasicQosOptions, BasicRecoverOptions,
        BasicRejectOptions, QueueBindOptions, QueuePurgeOptions,
    },
    types::FieldTable,
    Channel,
};
use std::sync::Arc;
use tracing::{debug, error};

/// Delivery tag that, with `multiple` set, addresses every outstanding message.
pub const ALL_OUTSTANDING: u64 = 0;

/// Reply code sent when closing a channel on request.
pub const REPLY_SUCCESS: u16 = 200;

/// Callback invoked once per delivered message.
pub type DeliveryCallback =
    Arc<dyn Fn(Message) -> BoxFuture<'static, Result<(), AmqpError>> + Send + Sync>;

/// Operations of a live AMQP channel.
///
/// Every method maps to a single call on the underlying client and reports that
/// client's result.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AmqpChannel: Send + Sync {
    /// Registers a listener for a channel event.
    fn on(&self, kind: ChannelEventKind, listener: ChannelListener);

    /// Declares the queue, creating it unless it already exists.
    async fn assert_queue(&self, name: &str, options: &QueueOptions)
        -> Result<QueueInfo, AmqpError>;

    async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
        args: &FieldTable,
    ) -> Result<(), AmqpError>;

    async fn unbind_queue(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
        args: &FieldTable,
    ) -> Result<(), AmqpError>;

    /// Starts consuming the queue, returning the consumer tag.
    async fn consume(
        &self,
        queue: &str,
        options: &ConsumeOptions,
        callback: DeliveryCallback,
    ) -> Result<String, AmqpError>;

    async fn ack(&self, delivery_tag: u64, multiple: bool) -> Result<(), AmqpError>;

    async fn ack_all(&self) -> Result<(), AmqpError>;

    async fn nack(&self, delivery_tag: u64, multiple: bool, requeue: bool)
        -> Result<(), AmqpError>;

    async fn nack_all(&self, requeue: bool) -> Result<(), AmqpError>;

    async fn reject(&self, delivery_tag: u64, requeue: bool) -> Result<(), AmqpError>;

    async fn prefetch(&self, count: u16, global: bool) -> Result<(), AmqpError>;

    /// Requeues every unacknowledged message on the channel.
    async fn recover(&self) -> Result<(), AmqpError>;

    /// Deletes the queue, returning the number of messages it held.
    async fn delete_queue(&self, queue: &str, options: DeleteQueueOptions)
        -> Result<u32, AmqpError>;

    /// Removes every undelivered message, returning how many were removed.
    async fn purge_queue(&self, queue: &str) -> Result<u32, AmqpError>;

    async fn get(&self, queue: &str, options: GetOptions) -> Result<Option<Message>, AmqpError>;

    async fn close(&self) -> Result<(), AmqpError>;
}

/// lapin implementation of the AmqpChannel trait.
///
/// Channel errors reported by lapin are emitted as an `Error` event followed by
/// a single `Close` event. lapin exposes neither returned messages outside
/// publisher confirms nor write-buffer drain, so `Return` and `Drain` listeners
/// are accepted but never invoked.
pub struct LapinChannel {
    inner: Channel,
    listeners: Arc<Listeners<ChannelEvent>>,
}

impl LapinChannel {
    /// Wraps a lapin channel and starts forwarding its errors to listeners.
    pub fn new(inner: Channel) -> Arc<LapinChannel> {
        let listeners = Arc::new(Listeners::<ChannelEvent>::default());

        let emitter = listeners.clone();
        let id = inner.id();
        inner.on_error(move |err| {
            error!(error = err.to_string(), channel = id, "channel error");
            emitter.emit(&ChannelEvent::Error(AmqpError::ChannelError(
                err.to_string(),
            )));
            emitter.emit_close(&ChannelEvent::Close);
        });

        Arc::new(LapinChannel { inner, listeners })
    }

    /// The wrapped lapin channel.
    pub fn inner(&self) -> &Channel {
        &self.inner
    }
}

#[async_trait]
impl AmqpChannel for LapinChannel {
    fn on(&self, kind: ChannelEventKind, listener: ChannelListener) {
        self.listeners.on(kind, listener);
    }

    async fn assert_queue(
        &self,
        name: &str,
        options: &QueueOptions,
    ) -> Result<QueueInfo, AmqpError> {
        debug!("creating queue: {}", name);

        match self
            .inner
            .queue_declare(
                name,
                options.declare_options(),
                options.declare_arguments(),
            )
            .await
        {
            Err(err) => {
                error!(error = err.to_string(), name = name, "error to declare the queue");
                Err(AmqpError::DeclareQueueError(name.to_owned(), err.to_string()))
            }
            Ok(queue) => {
                debug!("queue: {} was created", queue.name());
                Ok(QueueInfo {
                    name: queue.name().to_string(),
                    message_count: queue.message_count(),
                    consumer_count: queue.consumer_count(),
                })
            }
        }
    }

    async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
        args: &FieldTable,
    ) -> Result<(), AmqpError> {
        debug!(
            "binding queue: {} to the exchange: {} with the key: {}",
            queue, exchange, routing_key
        );

        self.inner
            .queue_bind(
                queue,
                exchange,
                routing_key,
                QueueBindOptions { nowait: false },
                args.clone(),
            )
            .await
            .map_err(|err| {
                error!(error = err.to_string(), "error to bind queue to exchange");
                AmqpError::BindingExchangeToQueueError(
                    exchange.to_owned(),
                    queue.to_owned(),
                    err.to_string(),
                )
            })
    }

    async fn unbind_queue(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
        args: &FieldTable,
    ) -> Result<(), AmqpError> {
        self.inner
            .queue_unbind(queue, exchange, routing_key, args.clone())
            .await
            .map_err(|err| {
                error!(error = err.to_string(), "error to unbind queue from exchange");
                AmqpError::UnbindingExchangeFromQueueError(
                    exchange.to_owned(),
                    queue.to_owned(),
                    err.to_string(),
                )
            })
    }

    async fn consume(
        &self,
        queue: &str,
        options: &ConsumeOptions,
        callback: DeliveryCallback,
    ) -> Result<String, AmqpError> {
        let mut consumer = match self
            .inner
            .basic_consume(
                queue,
                &options.tag(),
                options.consume_options(),
                options.arguments(),
            )
            .await
        {
            Err(err) => {
                error!(error = err.to_string(), "error to create the consumer");
                Err(AmqpError::ConsumerDeclarationError(
                    queue.to_owned(),
                    err.to_string(),
                ))
            }
            Ok(c) => Ok(c),
        }?;

        let tag = consumer.tag().to_string();
        let channel = self.inner.clone();
        let listeners = self.listeners.clone();

        tokio::spawn({
            let tag = tag.clone();
            async move {
                while let Some(result) = consumer.next().await {
                    match result {
                        Ok(delivery) => {
                            let handled = callback(Message::from(delivery));
                            tokio::spawn(async move {
                                if let Err(err) = handled.await {
                                    error!(error = err.to_string(), "error consume msg");
                                }
                            });
                        }

                        Err(err) => error!(error = err.to_string(), "errors consume msg"),
                    }
                }

                debug!(consumer = tag, "consumer stream ended");
                if !channel.status().connected() {
                    listeners.emit_close(&ChannelEvent::Close);
                }
            }
        });

        Ok(tag)
    }

    async fn ack(&self, delivery_tag: u64, multiple: bool) -> Result<(), AmqpError> {
        self.inner
            .basic_ack(delivery_tag, BasicAckOptions { multiple })
            .await
            .map_err(|err| {
                error!(error = err.to_string(), "error whiling ack msg");
                AmqpError::AckMessageError(err.to_string())
            })
    }

    async fn ack_all(&self) -> Result<(), AmqpError> {
        self.ack(ALL_OUTSTANDING, true).await
    }

    async fn nack(
        &self,
        delivery_tag: u64,
        multiple: bool,
        requeue: bool,
    ) -> Result<(), AmqpError> {
        self.inner
            .basic_nack(delivery_tag, BasicNackOptions { multiple, requeue })
            .await
            .map_err(|err| {
                error!(error = err.to_string(), "error whiling nack msg");
                AmqpError::NackMessageError(err.to_string())
            })
    }

    async fn nack_all(&self, requeue: bool) -> Result<(), AmqpError> {
        self.nack(ALL_OUTSTANDING, true, requeue).await
    }

    async fn reject(&self, delivery_tag: u64, requeue: bool) -> Result<(), AmqpError> {
        self.inner
            .basic_reject(delivery_tag, BasicRejectOptions { requeue })
            .await
            .map_err(|err| {
                error!(error = err.to_string(), "error whiling reject msg");
                AmqpError::RejectMessageError(err.to_string())
            })
    }

    async fn prefetch(&self, count: u16, global: bool) -> Result<(), AmqpError> {
        self.inner
            .basic_qos(count, BasicQosOptions { global })
            .await
            .map_err(|err| {
                error!(error = err.to_string(), "failure to configure qos");
                AmqpError::QoSDeclarationError(err.to_string())
            })
    }

    async fn recover(&self) -> Result<(), AmqpError> {
        self.inner
            .basic_recover(BasicRecoverOptions { requeue: true })
            .await
            .map_err(|err| {
                error!(error = err.to_string(), "failure to recover messages");
                AmqpError::RecoverError(err.to_string())
            })
    }

    async fn delete_queue(
        &self,
        queue: &str,
        options: DeleteQueueOptions,
    ) -> Result<u32, AmqpError> {
        self.inner
            .queue_delete(queue, options.into())
            .await
            .map_err(|err| {
                error!(error = err.to_string(), name = queue, "failure to delete queue");
                AmqpError::DeleteQueueError(queue.to_owned(), err.to_string())
            })
    }

    async fn purge_queue(&self, queue: &str) -> Result<u32, AmqpError> {
        self.inner
            .queue_purge(queue, QueuePurgeOptions { nowait: false })
            .await
            .map_err(|err| {
                error!(error = err.to_string(), name = queue, "failure to purge queue");
                AmqpError::PurgeQueueError(queue.to_owned(), err.to_string())
            })
    }

    async fn get(&self, queue: &str, options: GetOptions) -> Result<Option<Message>, AmqpError> {
        match self.inner.basic_get(queue, options.into()).await {
            Err(err) => {
                error!(error = err.to_string(), name = queue, "failure to get message");
                Err(AmqpError::GetMessageError(queue.to_owned(), err.to_string()))
            }
            Ok(msg) => Ok(msg.map(|m| Message::from(m.delivery))),
        }
    }

    async fn close(&self) -> Result<(), AmqpError> {
        debug!(channel = self.inner.id(), "closing channel");

        let result = self
            .inner
            .close(REPLY_SUCCESS, "OK")
            .await
            .map_err(|err| {
                error!(error = err.to_string(), "failure to close channel");
                AmqpError::CloseChannelError(err.to_string())
            });

        if result.is_ok() {
            self.listeners.emit_close(&ChannelEvent::Close);
        }

        result
    }
}
