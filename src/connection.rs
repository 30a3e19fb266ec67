// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # AMQP Connection Management
//!
//! This module handles the creation of AMQP connections and the channels opened
//! on them. The [`Connector`] and [`AmqpConnection`] traits describe what the
//! queue bootstrap needs from a client; `LapinConnector` and `LapinConnection`
//! implement them with lapin.

use crate::{
    channel::{AmqpChannel, LapinChannel, REPLY_SUCCESS},
    errors::AmqpError,
    events::{ConnectionEvent, ConnectionEventKind, ConnectionListener, Listeners},
};
use async_trait::async_trait;
use lapin::{
    types::{AMQPValue, LongString, ShortString},
    Connection, ConnectionProperties,
};
use std::{collections::BTreeMap, sync::Arc};
use tracing::{debug, error};

/// Options for the underlying connection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionOptions {
    pub(crate) connection_name: Option<String>,
    pub(crate) locale: Option<String>,
    pub(crate) client_properties: BTreeMap<ShortString, AMQPValue>,
}

impl ConnectionOptions {
    pub fn new() -> ConnectionOptions {
        ConnectionOptions::default()
    }

    /// Sets the name shown for this connection in the broker.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn connection_name(mut self, name: &str) -> Self {
        self.connection_name = Some(name.to_owned());
        self
    }

    /// Sets the locale negotiated with the broker.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn locale(mut self, locale: &str) -> Self {
        self.locale = Some(locale.to_owned());
        self
    }

    /// Adds a client property sent during the handshake.
    ///
    /// # Returns
    /// Self for method chaining
    pub fn client_property(mut self, key: &str, value: AMQPValue) -> Self {
        self.client_properties.insert(ShortString::from(key), value);
        self
    }

    pub(crate) fn properties(&self) -> ConnectionProperties {
        let mut properties = ConnectionProperties::default();

        if let Some(name) = &self.connection_name {
            properties = properties.with_connection_name(LongString::from(name.as_str()));
        }

        if let Some(locale) = &self.locale {
            properties.locale = locale.clone();
        }

        for (key, value) in &self.client_properties {
            properties
                .client_properties
                .insert(key.clone(), value.clone());
        }

        properties
    }
}

/// An open connection to the AMQP server.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AmqpConnection: Send + Sync {
    /// Registers a listener for a connection event.
    fn on(&self, kind: ConnectionEventKind, listener: ConnectionListener);

    /// Opens a new channel, shared by nothing else.
    async fn create_channel(&self) -> Result<Arc<dyn AmqpChannel>, AmqpError>;

    async fn close(&self) -> Result<(), AmqpError>;
}

/// Opens connections.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        url: &str,
        options: &ConnectionOptions,
    ) -> Result<Arc<dyn AmqpConnection>, AmqpError>;
}

/// lapin implementation of the Connector trait.
#[derive(Debug, Clone, Copy, Default)]
pub struct LapinConnector;

#[async_trait]
impl Connector for LapinConnector {
    async fn connect(
        &self,
        url: &str,
        options: &ConnectionOptions,
    ) -> Result<Arc<dyn AmqpConnection>, AmqpError> {
        debug!("creating amqp connection...");

        let conn = match Connection::connect(url, options.properties()).await {
            Ok(c) => Ok(c),
            Err(err) => {
                error!(error = err.to_string(), "failure to connect");
                Err(AmqpError::ConnectionError(err.to_string()))
            }
        }?;
        debug!("amqp connected");

        Ok(LapinConnection::new(conn))
    }
}

/// lapin implementation of the AmqpConnection trait.
///
/// Connection errors are emitted as an `Error` event followed by a single
/// `Close` event.
pub struct LapinConnection {
    inner: Connection,
    listeners: Arc<Listeners<ConnectionEvent>>,
}

impl LapinConnection {
    pub fn new(inner: Connection) -> Arc<LapinConnection> {
        let listeners = Arc::new(Listeners::<ConnectionEvent>::default());

        let emitter = listeners.clone();
        inner.on_error(move |err| {
            error!(error = err.to_string(), "connection error");
            emitter.emit(&ConnectionEvent::Error(AmqpError::ConnectionError(
                err.to_string(),
            )));
            emitter.emit_close(&ConnectionEvent::Close);
        });

        Arc::new(LapinConnection { inner, listeners })
    }

    /// The wrapped lapin connection.
    pub fn inner(&self) -> &Connection {
        &self.inner
    }
}

#[async_trait]
impl AmqpConnection for LapinConnection {
    fn on(&self, kind: ConnectionEventKind, listener: ConnectionListener) {
        self.listeners.on(kind, listener);
    }

    async fn create_channel(&self) -> Result<Arc<dyn AmqpChannel>, AmqpError> {
        debug!("creating amqp channel...");

        match self.inner.create_channel().await {
            Ok(c) => {
                debug!("channel created");
                Ok(LapinChannel::new(c))
            }
            Err(err) => {
                error!(error = err.to_string(), "error to create the channel");
                Err(AmqpError::ChannelError(err.to_string()))
            }
        }
    }

    async fn close(&self) -> Result<(), AmqpError> {
        debug!("closing amqp connection");

        self.inner
            .close(REPLY_SUCCESS, "OK")
            .await
            .map_err(|err| {
                error!(error = err.to_string(), "failure to close connection");
                AmqpError::CloseConnectionError(err.to_string())
            })?;

        self.listeners.emit_close(&ConnectionEvent::Close);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn properties_carry_the_options() {
        let properties = ConnectionOptions::new()
            .connection_name("orders-service")
            .locale("pt_BR")
            .client_property("team", AMQPValue::LongString("payments".into()))
            .properties();

        assert_eq!(properties.locale, "pt_BR");
        assert_eq!(
            properties.client_properties.inner().get("team"),
            Some(&AMQPValue::LongString("payments".into()))
        );
        assert_eq!(
            properties.client_properties.inner().get("connection_name"),
            Some(&AMQPValue::LongString("orders-service".into()))
        );
    }

    #[test]
    fn default_options_keep_lapin_defaults() {
        let properties = ConnectionOptions::default().properties();

        assert_eq!(properties.locale, ConnectionProperties::default().locale);
        assert_eq!(
            properties.client_properties.inner().get("connection_name"),
            None
        );
    }
}
