// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Queue Consumer
//!
//! This module provides [`QueueConsumer`], which subscribes a
//! [`QueueHandler`] to a queue on an already open channel and forwards the
//! queue-management operations (ack, nack, purge, prefetch, ...) to that
//! channel. Deliveries are traced with OpenTelemetry consumer spans.

use crate::{
    channel::{AmqpChannel, DeliveryCallback},
    errors::AmqpError,
    events::{ChannelEvent, ChannelEventKind},
    handler::QueueHandler,
    message::Message,
    otel,
    queue::{DeleteQueueOptions, GetOptions},
};
use futures_util::{future::BoxFuture, FutureExt};
use lapin::{
    options::BasicConsumeOptions,
    types::{AMQPValue, FieldTable, LongInt, ShortString},
};
use opentelemetry::{
    global,
    trace::{Span, Status},
};
use std::{borrow::Cow, collections::BTreeMap, sync::Arc};
use tracing::{debug, warn};
use uuid::Uuid;

/// Constant for the argument used to specify the consumer priority
pub const AMQP_ARGUMENTS_PRIORITY: &str = "x-priority";

/// Options used when registering the consumer.
///
/// By default deliveries must be acknowledged explicitly and the consumer tag
/// is `ctag-` followed by a random UUID, generated on the client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsumeOptions {
    pub(crate) consumer_tag: Option<String>,
    pub(crate) no_ack: bool,
    pub(crate) exclusive: bool,
    pub(crate) no_local: bool,
    pub(crate) no_wait: bool,
    pub(crate) priority: Option<i32>,
    pub(crate) arguments: BTreeMap<ShortString, AMQPValue>,
}

impl ConsumeOptions {
    pub fn new() -> ConsumeOptions {
        ConsumeOptions::default()
    }

    /// Sets the consumer tag.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn consumer_tag(mut self, tag: &str) -> Self {
        self.consumer_tag = Some(tag.to_owned());
        self
    }

    /// Lets the server consider messages acknowledged once delivered.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn no_ack(mut self) -> Self {
        self.no_ack = true;
        self
    }

    /// Requires this to be the only consumer of the queue.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    /// Skips messages published on this consumer's own connection.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn no_local(mut self) -> Self {
        self.no_local = true;
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

    /// Sets the consumer priority.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Adds a free-form consumer argument.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn argument(mut self, key: &str, value: AMQPValue) -> Self {
        self.arguments.insert(ShortString::from(key), value);
        self
    }

    pub(crate) fn tag(&self) -> String {
        self.consumer_tag
            .clone()
            .unwrap_or_else(|| format!("ctag-{}", Uuid::new_v4()))
    }

    pub(crate) fn consume_options(&self) -> BasicConsumeOptions {
        BasicConsumeOptions {
            no_local: self.no_local,
            no_ack: self.no_ack,
            exclusive: self.exclusive,
            nowait: self.no_wait,
        }
    }

    pub(crate) fn arguments(&self) -> FieldTable {
        let mut args = self.arguments.clone();
        if let Some(priority) = self.priority {
            args.insert(
                ShortString::from(AMQP_ARGUMENTS_PRIORITY),
                AMQPValue::LongInt(LongInt::from(priority)),
            );
        }
        FieldTable::from(args)
    }
}

/// A queue subscribed on a channel.
///
/// Cloning is cheap and the clone refers to the same channel and queue.
#[derive(Clone)]
pub struct QueueConsumer {
    channel: Arc<dyn AmqpChannel>,
    name: Arc<str>,
}

impl std::fmt::Debug for QueueConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueConsumer")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl QueueConsumer {
    /// Subscribes the handler to the queue.
    ///
    /// This registers one listener per channel event (close, error, return,
    /// drain), binds the queue to every exchange listed by
    /// [`QueueHandler::bindings`] and finally starts consuming. The queue must
    /// already exist. Any channel error is returned as-is.
    ///
    /// Listeners are registered first so a channel error raised by a failed
    /// binding still reaches [`QueueHandler::on_error`]. They are not removed
    /// when construction fails: the handler keeps receiving the events of that
    /// channel until it closes.
    pub async fn new(
        channel: Arc<dyn AmqpChannel>,
        name: &str,
        handler: Arc<dyn QueueHandler>,
    ) -> Result<QueueConsumer, AmqpError> {
        let consumer = QueueConsumer {
            channel,
            name: Arc::from(name),
        };

        consumer.register_listeners(&handler);

        for binding in handler.bindings() {
            consumer
                .channel
                .bind_queue(
                    name,
                    &binding.exchange,
                    &binding.routing_key,
                    &binding.args,
                )
                .await?;
        }

        let options = handler.consume_options().unwrap_or_default();
        let tag = consumer
            .channel
            .consume(name, &options, consumer.delivery_callback(handler))
            .await?;

        debug!(queue = name, consumer = tag, "consuming");

        Ok(consumer)
    }

    fn register_listeners(&self, handler: &Arc<dyn QueueHandler>) {
        let hooks = handler.clone();
        self.channel.on(
            ChannelEventKind::Close,
            Box::new(move |_: &ChannelEvent| hooks.on_close()),
        );

        let hooks = handler.clone();
        self.channel.on(
            ChannelEventKind::Error,
            Box::new(move |event: &ChannelEvent| {
                if let ChannelEvent::Error(err) = event {
                    hooks.on_error(err);
                }
            }),
        );

        let hooks = handler.clone();
        self.channel.on(
            ChannelEventKind::Return,
            Box::new(move |event: &ChannelEvent| {
                if let ChannelEvent::Return(msg) = event {
                    hooks.on_return(msg);
                }
            }),
        );

        let hooks = handler.clone();
        self.channel.on(
            ChannelEventKind::Drain,
            Box::new(move |_: &ChannelEvent| hooks.on_drain()),
        );
    }

    fn delivery_callback(&self, handler: Arc<dyn QueueHandler>) -> DeliveryCallback {
        let consumer = self.clone();

        Arc::new(move |msg: Message| -> BoxFuture<'static, Result<(), AmqpError>> {
            let consumer = consumer.clone();
            let handler = handler.clone();

            async move {
                let tracer = global::tracer("amqp consumer");
                let mut span = otel::new_span(&msg.headers, &tracer, consumer.name());

                debug!(
                    "received: {} - exchange: {}",
                    msg.delivery_tag, msg.exchange
                );

                let result = handler.consume(&consumer, msg).await;
                match &result {
                    Ok(_) => span.set_status(Status::Ok),
                    Err(err) => {
                        warn!(error = err.to_string(), queue = consumer.name(), "handler failure");
                        span.record_error(err);
                        span.set_status(Status::Error {
                            description: Cow::from(err.to_string()),
                        });
                    }
                }
                span.end();

                result
            }
            .boxed()
        })
    }

    /// Queue name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The channel the queue is consumed on.
    pub fn channel(&self) -> &Arc<dyn AmqpChannel> {
        &self.channel
    }

    /// Polls the queue for a single message.
    pub async fn ask_for_messages(&self, options: GetOptions) -> Result<Option<Message>, AmqpError> {
        self.channel.get(&self.name, options).await
    }

    /// Closes the channel.
    pub async fn close_channel(&self) -> Result<(), AmqpError> {
        self.channel.close().await
    }

    /// Acknowledges the message, or every outstanding message up to and
    /// including it when `all_up_to` is set.
    pub async fn ack(&self, msg: &Message, all_up_to: bool) -> Result<(), AmqpError> {
        self.channel.ack(msg.delivery_tag, all_up_to).await
    }

    /// Acknowledges every outstanding message on the channel.
    pub async fn ack_all(&self) -> Result<(), AmqpError> {
        self.channel.ack_all().await
    }

    /// Rejects the message, or every outstanding message up to and including
    /// it, asking the server to requeue or drop them.
    pub async fn nack(&self, msg: &Message, all_up_to: bool, requeue: bool) -> Result<(), AmqpError> {
        self.channel.nack(msg.delivery_tag, all_up_to, requeue).await
    }

    /// Rejects every outstanding message on the channel.
    pub async fn nack_all(&self, requeue: bool) -> Result<(), AmqpError> {
        self.channel.nack_all(requeue).await
    }

    pub async fn reject(&self, msg: &Message, requeue: bool) -> Result<(), AmqpError> {
        self.channel.reject(msg.delivery_tag, requeue).await
    }

    /// Limits how many unacknowledged messages the channel may hold.
    pub async fn prefetch(&self, count: u16, global: bool) -> Result<(), AmqpError> {
        self.channel.prefetch(count, global).await
    }

    /// Requeues unacknowledged messages on this channel.
    pub async fn recover(&self) -> Result<(), AmqpError> {
        self.channel.recover().await
    }

    /// Removes the binding between the queue and an exchange.
    pub async fn unbind_from(
        &self,
        exchange: &str,
        pattern: &str,
        args: &FieldTable,
    ) -> Result<(), AmqpError> {
        self.channel
            .unbind_queue(&self.name, exchange, pattern, args)
            .await
    }

    /// Deletes the queue, returning how many messages it held.
    pub async fn destroy(&self, options: DeleteQueueOptions) -> Result<u32, AmqpError> {
        self.channel.delete_queue(&self.name, options).await
    }

    /// Removes every undelivered message, returning how many were removed.
    pub async fn purge(&self) -> Result<u32, AmqpError> {
        self.channel.purge_queue(&self.name).await
    }
}
