//! Handshake packet parsing and building.
//!
//! The connect sequence is driven by `Connection::connect`; this module
//! owns the wire layouts: the server's initial greeting (protocol version
//! 10) and the client's handshake response.

use sqlwire_core::{Error, Result};

use crate::auth;
use crate::config::Config;
use crate::protocol::{PacketReader, PacketWriter, capabilities};

/// The initial greeting sent by the server after TCP connect.
#[derive(Debug, Clone)]
pub struct ServerGreeting {
    /// Protocol version (always 10 for supported servers)
    pub protocol_version: u8,
    /// Server version string, e.g. "8.0.36"
    pub server_version: String,
    /// Server-assigned connection (thread) id
    pub connection_id: u32,
    /// Auth plugin seed (scramble), both parts concatenated
    pub auth_data: Vec<u8>,
    /// Server capability flags
    pub capabilities: u32,
    /// Server default charset
    pub charset: u8,
    /// Initial server status flags
    pub status_flags: u16,
    /// Default auth plugin name
    pub auth_plugin: String,
}

impl ServerGreeting {
    /// Parse the greeting payload.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let mut reader = PacketReader::new(payload);

        let protocol_version = reader
            .read_u8()
            .ok_or_else(|| Error::protocol("greeting missing protocol version"))?;
        if protocol_version != 10 {
            return Err(Error::protocol(format!(
                "unsupported protocol version {protocol_version}"
            )));
        }

        let server_version = reader
            .read_null_string()
            .ok_or_else(|| Error::protocol("greeting missing server version"))?;
        let connection_id = reader
            .read_u32_le()
            .ok_or_else(|| Error::protocol("greeting missing connection id"))?;

        let auth_data_1 = reader
            .read_bytes(8)
            .ok_or_else(|| Error::protocol("greeting missing auth seed"))?;
        reader.skip(1); // filler

        let caps_lower = reader
            .read_u16_le()
            .ok_or_else(|| Error::protocol("greeting missing capability flags"))?;

        let charset = reader
            .read_u8()
            .unwrap_or(crate::protocol::charset::DEFAULT_CHARSET);
        let status_flags = reader.read_u16_le().unwrap_or(0);
        let caps_upper = reader.read_u16_le().unwrap_or(0);
        let server_caps = u32::from(caps_lower) | (u32::from(caps_upper) << 16);

        let auth_data_len = if server_caps & capabilities::CLIENT_PLUGIN_AUTH != 0 {
            reader.read_u8().unwrap_or(0) as usize
        } else {
            0
        };
        reader.skip(10); // reserved

        // Second scramble part, trailing NUL stripped.
        let mut auth_data = auth_data_1.to_vec();
        if server_caps & capabilities::CLIENT_SECURE_CONNECTION != 0 {
            let len2 = if auth_data_len > 8 { auth_data_len - 8 } else { 13 };
            if let Some(part2) = reader.read_bytes(len2) {
                let part2 = if part2.last() == Some(&0) {
                    &part2[..part2.len() - 1]
                } else {
                    part2
                };
                auth_data.extend_from_slice(part2);
            }
        }

        let auth_plugin = if server_caps & capabilities::CLIENT_PLUGIN_AUTH != 0 {
            reader.read_null_string().unwrap_or_default()
        } else {
            auth::plugins::MYSQL_NATIVE_PASSWORD.to_string()
        };

        Ok(Self {
            protocol_version,
            server_version,
            connection_id,
            auth_data,
            capabilities: server_caps,
            charset,
            status_flags,
            auth_plugin,
        })
    }
}

/// Compute the capability set for a connection: the bitwise intersection
/// of what the client requests and what the server advertises.
pub fn negotiate_capabilities(config: &Config, greeting: &ServerGreeting) -> u32 {
    config.capability_flags() & greeting.capabilities
}

/// Build the handshake response payload (sent after the greeting, and
/// after the TLS upgrade when one was negotiated).
pub fn build_handshake_response(
    config: &Config,
    negotiated_caps: u32,
    auth_plugin: &str,
    auth_response: &[u8],
) -> Vec<u8> {
    let mut writer = PacketWriter::new();

    writer.write_u32_le(negotiated_caps);
    writer.write_u32_le(config.max_packet_size);
    writer.write_u8(config.charset);
    writer.write_zeros(23); // reserved

    writer.write_null_string(&config.username);

    if negotiated_caps & capabilities::CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA != 0 {
        writer.write_lenenc_bytes(auth_response);
    } else if negotiated_caps & capabilities::CLIENT_SECURE_CONNECTION != 0 {
        // Auth responses are always short (SHA1 = 20, SHA256 = 32 bytes).
        #[allow(clippy::cast_possible_truncation)]
        writer.write_u8(auth_response.len() as u8);
        writer.write_bytes(auth_response);
    } else {
        writer.write_bytes(auth_response);
        writer.write_u8(0);
    }

    if negotiated_caps & capabilities::CLIENT_CONNECT_WITH_DB != 0 {
        match &config.database {
            Some(db) => writer.write_null_string(db),
            None => writer.write_u8(0),
        }
    }

    if negotiated_caps & capabilities::CLIENT_PLUGIN_AUTH != 0 {
        writer.write_null_string(auth_plugin);
    }

    if negotiated_caps & capabilities::CLIENT_CONNECT_ATTRS != 0 && !config.attributes.is_empty() {
        let mut attrs = PacketWriter::new();
        for (key, value) in &config.attributes {
            attrs.write_lenenc_string(key);
            attrs.write_lenenc_string(value);
        }
        writer.write_lenenc_bytes(attrs.as_bytes());
    }

    writer.into_bytes()
}

/// Compute the auth response for a plugin over the server seed.
///
/// Unknown plugins fall back to `mysql_native_password`; if the server
/// rejects that it will answer with an auth-switch request.
pub fn compute_auth_response(plugin: &str, password: &str, auth_data: &[u8]) -> Vec<u8> {
    match plugin {
        auth::plugins::MYSQL_NATIVE_PASSWORD => auth::mysql_native_password(password, auth_data),
        auth::plugins::CACHING_SHA2_PASSWORD => auth::caching_sha2_password(password, auth_data),
        auth::plugins::MYSQL_CLEAR_PASSWORD => auth::clear_password(password),
        _ => auth::mysql_native_password(password, auth_data),
    }
}
