// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Connection Settings
//!
//! Settings a [`QueueHandler`](crate::handler::QueueHandler) can use to build
//! the server URL, read from the process environment.

use crate::{connection::ConnectionOptions, errors::AmqpError};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};

pub const ENV_AMQP_URL: &str = "AMQP_URL";
pub const ENV_RABBITMQ_HOST: &str = "RABBITMQ_HOST";
pub const ENV_RABBITMQ_PORT: &str = "RABBITMQ_PORT";
pub const ENV_RABBITMQ_USER: &str = "RABBITMQ_USER";
pub const ENV_RABBITMQ_PASSWORD: &str = "RABBITMQ_PASSWORD";
pub const ENV_RABBITMQ_VHOST: &str = "RABBITMQ_VHOST";
pub const ENV_APP_NAME: &str = "APP_NAME";

/// Characters escaped in the user, password and vhost parts of the URI.
const URI_COMPONENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b':')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// AMQP server settings.
///
/// When `url` is set it is used as-is; otherwise the URI is assembled from the
/// individual parts. `vhost` is the plain vhost name (`/` by default), not its
/// URI-encoded form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmqpSettings {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub vhost: String,
    pub app_name: Option<String>,
}

impl Default for AmqpSettings {
    fn default() -> Self {
        AmqpSettings {
            url: None,
            host: "localhost".to_owned(),
            port: 5672,
            user: "guest".to_owned(),
            password: "guest".to_owned(),
            vhost: "/".to_owned(),
            app_name: None,
        }
    }
}

impl AmqpSettings {
    /// Reads the settings from the process environment.
    ///
    /// Unset variables keep their default value.
    pub fn from_env() -> Result<AmqpSettings, AmqpError> {
        AmqpSettings::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the settings through `lookup`, which maps a variable name to its
    /// value.
    pub fn from_lookup<F>(lookup: F) -> Result<AmqpSettings, AmqpError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = AmqpSettings::default();

        settings.url = lookup(ENV_AMQP_URL).filter(|url| !url.is_empty());
        settings.app_name = lookup(ENV_APP_NAME);

        if let Some(host) = lookup(ENV_RABBITMQ_HOST) {
            settings.host = host;
        }
        if let Some(port) = lookup(ENV_RABBITMQ_PORT) {
            settings.port = port.parse().map_err(|_| {
                AmqpError::ConfigurationError(format!(
                    "{} must be a port number, got `{}`",
                    ENV_RABBITMQ_PORT, port
                ))
            })?;
        }
        if let Some(user) = lookup(ENV_RABBITMQ_USER) {
            settings.user = user;
        }
        if let Some(password) = lookup(ENV_RABBITMQ_PASSWORD) {
            settings.password = password;
        }
        if let Some(vhost) = lookup(ENV_RABBITMQ_VHOST) {
            settings.vhost = vhost;
        }

        Ok(settings)
    }

    /// The server URI.
    pub fn uri(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }

        format!(
            "amqp://{}:{}@{}:{}/{}",
            utf8_percent_encode(&self.user, URI_COMPONENT),
            utf8_percent_encode(&self.password, URI_COMPONENT),
            self.host,
            self.port,
            utf8_percent_encode(&self.vhost, URI_COMPONENT)
        )
    }

    /// Connection options naming the connection after the application.
    pub fn connection_options(&self) -> ConnectionOptions {
        match &self.app_name {
            Some(name) => ConnectionOptions::new().connection_name(name),
            None => ConnectionOptions::new(),
        }
    }
}
