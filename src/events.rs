// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Channel and Connection Events
//!
//! Lifecycle events emitted by channels and connections, and the listener
//! registry the adapters use to fan them out.

use crate::{errors::AmqpError, message::Message};
use std::{
    collections::HashMap,
    hash::Hash,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, RwLock,
    },
};
use tracing::{debug, error};

/// An event carrying a discriminant used to route it to listeners.
pub trait Event: Send + Sync {
    type Kind: Copy + Eq + Hash + Send + Sync + std::fmt::Debug;

    fn kind(&self) -> Self::Kind;
}

/// The kinds of events a channel emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelEventKind {
    Close,
    Error,
    Return,
    Drain,
}

/// Events emitted by a channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// The channel has been closed.
    Close,
    /// The server closed the channel because of an error.
    Error(AmqpError),
    /// A published message could not be routed.
    Return(Message),
    /// The write buffer has been emptied.
    Drain,
}

impl Event for ChannelEvent {
    type Kind = ChannelEventKind;

    fn kind(&self) -> ChannelEventKind {
        match self {
            ChannelEvent::Close => ChannelEventKind::Close,
            ChannelEvent::Error(_) => ChannelEventKind::Error,
            ChannelEvent::Return(_) => ChannelEventKind::Return,
            ChannelEvent::Drain => ChannelEventKind::Drain,
        }
    }
}

/// The kinds of events a connection emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionEventKind {
    Close,
    Error,
}

/// Events emitted by a connection.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    Close,
    Error(AmqpError),
}

impl Event for ConnectionEvent {
    type Kind = ConnectionEventKind;

    fn kind(&self) -> ConnectionEventKind {
        match self {
            ConnectionEvent::Close => ConnectionEventKind::Close,
            ConnectionEvent::Error(_) => ConnectionEventKind::Error,
        }
    }
}

/// Callback invoked for every emitted event of the kind it was registered for.
pub type Listener<E> = Box<dyn Fn(&E) + Send + Sync>;

pub type ChannelListener = Listener<ChannelEvent>;
pub type ConnectionListener = Listener<ConnectionEvent>;

/// Registry of listeners keyed by event kind.
///
/// Close events are delivered at most once: after the first close, further
/// close emissions are ignored. Listeners run without the registry lock held,
/// so they may register further listeners.
pub struct Listeners<E: Event> {
    listeners: RwLock<HashMap<E::Kind, Vec<Arc<dyn Fn(&E) + Send + Sync>>>>,
    closed: AtomicBool,
}

impl<E: Event> Default for Listeners<E> {
    fn default() -> Self {
        Listeners {
            listeners: RwLock::new(HashMap::default()),
            closed: AtomicBool::new(false),
        }
    }
}

impl<E: Event> Listeners<E> {
    /// Registers a listener for the given event kind.
    pub fn on(&self, kind: E::Kind, listener: Listener<E>) {
        match self.listeners.write() {
            Ok(mut listeners) => listeners.entry(kind).or_default().push(Arc::from(listener)),
            Err(_) => error!(kind = ?kind, "listener registry poisoned, dropping listener"),
        }
    }

    /// Invokes every listener registered for the event's kind.
    pub fn emit(&self, event: &E) {
        let kind = event.kind();
        debug!(kind = ?kind, "emitting event");

        let registered = match self.listeners.read() {
            Ok(listeners) => listeners.get(&kind).cloned().unwrap_or_default(),
            Err(_) => {
                error!(kind = ?kind, "listener registry poisoned, event dropped");
                return;
            }
        };

        for listener in registered {
            listener(event);
        }
    }

    /// Emits a close event unless one was already emitted.
    ///
    /// Returns `true` when the event was delivered.
    pub fn emit_close(&self, event: &E) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }

        self.emit(event);
        true
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of listeners registered for the given kind.
    pub fn count(&self, kind: E::Kind) -> usize {
        self.listeners
            .read()
            .map(|listeners| listeners.get(&kind).map(Vec::len).unwrap_or_default())
            .unwrap_or_default()
    }
}
