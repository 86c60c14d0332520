//! Connection configuration.
//!
//! A [`Config`] is assembled with the builder methods, handed to
//! `Connection::connect`, and frozen from then on: the connection exposes
//! it back to callers only as a read-only snapshot.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// SSL mode for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SslMode {
    /// Do not use SSL
    #[default]
    Disabled,
    /// Use SSL if the server offers it, fall back to plaintext otherwise
    Preferred,
    /// Require SSL
    Required,
    /// Require SSL and verify the server certificate against a CA
    VerifyCa,
    /// Require SSL and verify the certificate matches the hostname
    VerifyIdentity,
}

impl SslMode {
    /// Whether SSL should be attempted at all.
    pub const fn should_try_ssl(self) -> bool {
        !matches!(self, SslMode::Disabled)
    }

    /// Whether a plaintext fallback is forbidden.
    pub const fn is_required(self) -> bool {
        matches!(
            self,
            SslMode::Required | SslMode::VerifyCa | SslMode::VerifyIdentity
        )
    }
}

/// TLS material and verification options.
#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    /// CA certificate bundle (PEM) for server verification
    pub ca_cert_path: Option<PathBuf>,
    /// Client certificate (PEM) for mutual TLS
    pub client_cert_path: Option<PathBuf>,
    /// Client private key (PEM) for mutual TLS
    pub client_key_path: Option<PathBuf>,
    /// Override the SNI/verification name (defaults to the connect host)
    pub server_name: Option<String>,
    /// Skip certificate verification entirely. Dangerous.
    pub danger_skip_verify: bool,
}

impl TlsConfig {
    /// Create an empty TLS configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the CA certificate path.
    pub fn ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert_path = Some(path.into());
        self
    }

    /// Set the client certificate path.
    pub fn client_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.client_cert_path = Some(path.into());
        self
    }

    /// Set the client private key path.
    pub fn client_key(mut self, path: impl Into<PathBuf>) -> Self {
        self.client_key_path = Some(path.into());
        self
    }

    /// Override the server name used for SNI and verification.
    pub fn server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self
    }

    /// Skip certificate verification.
    pub fn skip_verify(mut self, skip: bool) -> Self {
        self.danger_skip_verify = skip;
        self
    }
}

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Hostname or IP address
    pub host: String,
    /// Port number (default: 3306)
    pub port: u16,
    /// Username for authentication
    pub username: String,
    /// Password for authentication
    pub password: Option<String>,
    /// Default schema to select at connect time
    pub database: Option<String>,
    /// Character set code (default: utf8mb4)
    pub charset: u8,
    /// SSL mode
    pub ssl_mode: SslMode,
    /// TLS material and verification options
    pub tls: TlsConfig,
    /// Timeout for TCP connect and every handshake read/write
    pub connect_timeout: Duration,
    /// Timeout for each socket read after the handshake
    pub read_timeout: Option<Duration>,
    /// Timeout for each socket write after the handshake
    pub write_timeout: Option<Duration>,
    /// Decode text-protocol fields into typed values (default) or leave
    /// them as raw text/bytes
    pub cast_values: bool,
    /// Max packet size advertised to the server
    pub max_packet_size: u32,
    /// Connection attributes sent during the handshake
    pub attributes: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            username: String::new(),
            password: None,
            database: None,
            charset: crate::protocol::charset::DEFAULT_CHARSET,
            ssl_mode: SslMode::default(),
            tls: TlsConfig::default(),
            connect_timeout: Duration::from_secs(30),
            read_timeout: None,
            write_timeout: None,
            cast_values: true,
            max_packet_size: 64 * 1024 * 1024,
            attributes: HashMap::new(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the hostname.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the username.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Set the password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the default schema.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the character set code.
    pub fn charset(mut self, charset: u8) -> Self {
        self.charset = charset;
        self
    }

    /// Set the SSL mode.
    pub fn ssl_mode(mut self, mode: SslMode) -> Self {
        self.ssl_mode = mode;
        self
    }

    /// Set the TLS options.
    pub fn tls(mut self, tls: TlsConfig) -> Self {
        self.tls = tls;
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the per-read timeout.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Set the per-write timeout.
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }

    /// Enable or disable type-aware casting of text-protocol fields.
    pub fn cast_values(mut self, cast: bool) -> Self {
        self.cast_values = cast;
        self
    }

    /// Set the max packet size advertised to the server.
    pub fn max_packet_size(mut self, size: u32) -> Self {
        self.max_packet_size = size;
        self
    }

    /// Add a connection attribute.
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Capability flags requested by this configuration.
    pub fn capability_flags(&self) -> u32 {
        use crate::protocol::capabilities::{
            CLIENT_CONNECT_ATTRS, CLIENT_CONNECT_WITH_DB, CLIENT_SSL, DEFAULT_CLIENT_FLAGS,
        };

        let mut flags = DEFAULT_CLIENT_FLAGS;

        if self.database.is_some() {
            flags |= CLIENT_CONNECT_WITH_DB;
        }

        if self.ssl_mode.should_try_ssl() {
            flags |= CLIENT_SSL;
        }

        if !self.attributes.is_empty() {
            flags |= CLIENT_CONNECT_ATTRS;
        }

        flags
    }
}
