// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # AMQP Queue Consumer
//!
//! A thin layer over lapin that subscribes a [`handler::QueueHandler`] to a
//! queue: it registers the channel lifecycle hooks, applies exchange bindings,
//! consumes the queue and forwards the queue-management operations to the
//! channel.

mod otel;

#[cfg(test)]
mod testing;

pub mod bootstrap;
pub mod channel;
pub mod connection;
pub mod consumer;
pub mod errors;
pub mod events;
pub mod handler;
pub mod message;
pub mod queue;
pub mod settings;
