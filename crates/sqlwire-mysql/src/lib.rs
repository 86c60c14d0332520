//! MySQL/MariaDB client wire protocol engine.
//!
//! This crate implements the client side of the MySQL wire protocol over
//! std TCP streams:
//!
//! - Packet framing with sequence-number verification and >16MB splitting
//! - Handshake and authentication (mysql_native_password,
//!   caching_sha2_password with RSA full auth, mysql_clear_password),
//!   with an optional in-handshake TLS upgrade (`tls` feature)
//! - Text and binary (prepared statement) query protocols
//! - Server error classification into the `sqlwire_core` taxonomy
//!
//! One connection is one strictly sequential conversation: commands take
//! `&mut self` and are never interleaved. Run independent connections for
//! parallelism.
//!
//! # Example
//!
//! ```rust,ignore
//! use sqlwire_mysql::{Config, Connection};
//!
//! let config = Config::new()
//!     .host("localhost")
//!     .port(3306)
//!     .username("root")
//!     .database("mydb");
//!
//! let mut conn = Connection::connect(config)?;
//! let result = conn.query("SELECT id, name FROM users")?;
//! for row in &result {
//!     println!("{:?}", row.get_by_name("name"));
//! }
//! ```

pub mod auth;
pub mod classify;
pub mod config;
pub mod connection;
pub mod framer;
pub mod handshake;
pub mod prepared;
pub mod protocol;
pub mod result;
pub mod tls;
pub mod transport;
pub mod types;

pub use classify::classify;
pub use config::{Config, SslMode, TlsConfig};
pub use connection::{Connection, ConnectionState, ServerInfo};
pub use prepared::PreparedStatement;
pub use result::QueryResult;

pub use sqlwire_core::{Error, ErrorClass, ErrorKind, Result, Row, Value};
