//! Connection establishment, command dispatch, and state tracking.
//!
//! A [`Connection`] is one strictly sequential conversation with the
//! server: every command takes `&mut self`, so the borrow checker is the
//! exclusivity lock the protocol demands. Fatal failures (network errors,
//! framing violations, timeouts) poison the connection: the transport is
//! shut down and the state moves to `Failed`, after which every command
//! reports the connection as closed until the caller reconnects. Server
//! query errors and value cast errors leave the connection usable.

use std::sync::Arc;
use std::time::Instant;

use sqlwire_core::{ColumnInfo, Error, ErrorClass, ErrorKind, Result, Row, Value};

use crate::auth;
use crate::config::Config;
use crate::framer::Framer;
use crate::handshake::{
    ServerGreeting, build_handshake_response, compute_auth_response, negotiate_capabilities,
};
use crate::prepared::{
    PreparedStatement, build_stmt_close, build_stmt_execute, build_stmt_prepare,
    parse_stmt_prepare_ok,
};
use crate::protocol::{
    Command, MAX_PACKET_SIZE, OkPacket, PacketReader, PacketType, PacketWriter, capabilities,
    server_status,
};
use crate::result::QueryResult;
use crate::tls::{build_ssl_request, validate_ssl_mode, validate_tls_config};
use crate::transport::{Stream, connect_tcp};
use crate::types::{ColumnDef, decode_binary_row, decode_text_row};

/// Upper bound on auth-switch/more-data rounds during the handshake. The
/// longest legitimate exchange (switch, then full caching_sha2 auth with
/// an RSA key fetch) stays well under this.
const MAX_AUTH_ROUNDS: usize = 6;

/// Connection protocol phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// TCP established, greeting not yet processed
    Connecting,
    /// Handshake response sent, waiting for the auth verdict
    Authenticating,
    /// Ready for commands
    Ready,
    /// A command is in flight
    InQuery,
    /// Ready, with an open transaction
    InTransaction,
    /// Poisoned by a fatal error; reconnect required
    Failed,
    /// Closed by the caller
    Closed,
}

/// Server version information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    /// The raw server version string, e.g. "8.0.36"
    pub version: String,
    /// Numeric version `major * 10000 + minor * 100 + patch`, when the
    /// version string starts with a recognizable triple
    pub id: Option<u32>,
}

/// A client connection to a MySQL/MariaDB server.
pub struct Connection {
    framer: Framer<Stream>,
    state: ConnectionState,
    config: Config,
    /// Negotiated capability flags (client ∩ server)
    capabilities: u32,
    connection_id: u32,
    server_version: String,
    status_flags: u16,
    affected_rows: u64,
    last_insert_id: u64,
    warnings: u16,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state)
            .field("connection_id", &self.connection_id)
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("database", &self.config.database)
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Connect and authenticate.
    ///
    /// Runs the whole connect sequence: TCP, server greeting, capability
    /// negotiation, optional TLS upgrade (before credentials leave the
    /// client), the bounded auth exchange, and the final OK. Every network
    /// operation in this phase is bounded by `config.connect_timeout`.
    pub fn connect(config: Config) -> Result<Self> {
        validate_tls_config(config.ssl_mode, &config.tls)?;

        tracing::debug!(host = %config.host, port = config.port, "connecting");
        let tcp = connect_tcp(&config.host, config.port, config.connect_timeout)?;
        tcp.set_read_timeout(Some(config.connect_timeout))
            .map_err(|e| Error::from_io(e, "failed to set handshake timeout"))?;
        tcp.set_write_timeout(Some(config.connect_timeout))
            .map_err(|e| Error::from_io(e, "failed to set handshake timeout"))?;

        let mut framer = Framer::new(Stream::Plain(tcp));

        // Server greeting; a server can refuse with an ERR packet instead.
        let payload = framer.read_packet()?;
        if payload.first() == Some(&0xFF) {
            return Err(err_packet_to_error(&payload));
        }
        let greeting = ServerGreeting::parse(&payload)?;

        let negotiated = negotiate_capabilities(&config, &greeting);
        let use_ssl = validate_ssl_mode(config.ssl_mode, greeting.capabilities)?;

        if use_ssl {
            framer.write_packet(&build_ssl_request(
                negotiated,
                config.max_packet_size,
                config.charset,
            ))?;
            framer = upgrade_to_tls(framer, &config)?;
            tracing::debug!(host = %config.host, "transport upgraded to TLS");
        }

        let mut conn = Self {
            framer,
            state: ConnectionState::Authenticating,
            capabilities: negotiated,
            connection_id: greeting.connection_id,
            server_version: greeting.server_version.clone(),
            status_flags: greeting.status_flags,
            affected_rows: 0,
            last_insert_id: 0,
            warnings: 0,
            config,
        };

        conn.authenticate(&greeting)?;
        conn.state = ConnectionState::Ready;

        // Handshake over: switch to the per-operation timeouts.
        conn.framer
            .stream_mut()
            .set_read_timeout(conn.config.read_timeout)?;
        conn.framer
            .stream_mut()
            .set_write_timeout(conn.config.write_timeout)?;

        tracing::debug!(
            connection_id = conn.connection_id,
            server_version = %conn.server_version,
            "connected"
        );
        Ok(conn)
    }

    /// Drive the auth exchange to its final OK, bounded by
    /// `MAX_AUTH_ROUNDS` switch/more-data rounds.
    fn authenticate(&mut self, greeting: &ServerGreeting) -> Result<()> {
        let password = self.config.password.clone().unwrap_or_default();
        let mut plugin = greeting.auth_plugin.clone();
        let mut auth_data = greeting.auth_data.clone();

        let auth_response = compute_auth_response(&plugin, &password, &auth_data);
        let response =
            build_handshake_response(&self.config, self.capabilities, &plugin, &auth_response);
        self.framer.write_packet(&response)?;

        for _ in 0..MAX_AUTH_ROUNDS {
            let payload = self.framer.read_packet()?;

            match payload.first() {
                Some(0x00) => {
                    let ok = parse_ok(&payload)?;
                    self.apply_ok(&ok);
                    return Ok(());
                }
                Some(0xFF) => return Err(err_packet_to_error(&payload)),
                Some(0xFE) => {
                    // AuthSwitchRequest: re-derive with the new plugin/seed.
                    let mut reader = PacketReader::new(&payload[1..]);
                    plugin = reader
                        .read_null_string()
                        .ok_or_else(|| Error::protocol("auth switch missing plugin name"))?;
                    auth_data = reader.read_rest().to_vec();
                    tracing::debug!(plugin = %plugin, "server requested auth switch");

                    let response = compute_auth_response(&plugin, &password, &auth_data);
                    self.framer.write_packet(&response)?;
                }
                Some(0x01) => {
                    // AuthMoreData, used by caching_sha2_password.
                    self.handle_auth_more_data(&payload[1..], &password, &auth_data)?;
                }
                Some(first) => {
                    return Err(Error::protocol(format!(
                        "unexpected auth packet 0x{first:02X}"
                    )));
                }
                None => return Err(Error::protocol("empty auth packet")),
            }
        }

        Err(Error::protocol(format!(
            "authentication did not complete within {MAX_AUTH_ROUNDS} rounds"
        )))
    }

    /// One round of caching_sha2_password extra data.
    fn handle_auth_more_data(
        &mut self,
        data: &[u8],
        password: &str,
        auth_data: &[u8],
    ) -> Result<()> {
        match data.first() {
            // Fast auth accepted; the final OK arrives next.
            Some(&auth::caching_sha2::FAST_AUTH_SUCCESS) => Ok(()),
            Some(&auth::caching_sha2::PERFORM_FULL_AUTH) => {
                if self.framer_is_tls() {
                    // Over TLS the plaintext form is acceptable.
                    self.framer.write_packet(&auth::clear_password(password))
                } else {
                    // Ask for the server's RSA key and encrypt with it.
                    self.framer
                        .write_packet(&[auth::caching_sha2::REQUEST_PUBLIC_KEY])
                }
            }
            // An RSA public key answering a previous key request.
            Some(0x2D) => {
                let encrypted =
                    auth::rsa_encrypted_password(password, auth_data, data, true)?;
                self.framer.write_packet(&encrypted)
            }
            Some(first) => Err(Error::protocol(format!(
                "unexpected auth continuation 0x{first:02X}"
            ))),
            None => Err(Error::protocol("empty auth continuation")),
        }
    }

    fn framer_is_tls(&mut self) -> bool {
        #[cfg(feature = "tls")]
        {
            matches!(self.framer.stream_mut(), Stream::Tls(_))
        }
        #[cfg(not(feature = "tls"))]
        {
            false
        }
    }

    /// Execute a text-protocol statement.
    ///
    /// Statements without a result set (INSERT, UPDATE, ...) return an
    /// empty result; their counts are available from [`affected_rows`]
    /// and [`last_insert_id`].
    ///
    /// [`affected_rows`]: Connection::affected_rows
    /// [`last_insert_id`]: Connection::last_insert_id
    pub fn query(&mut self, sql: &str) -> Result<QueryResult> {
        self.ensure_ready()?;
        self.state = ConnectionState::InQuery;
        self.framer.reset_sequence();
        tracing::trace!(sql_len = sql.len(), "dispatching query");

        let started = Instant::now();
        let result = self.run_query(sql, started);
        match &result {
            Err(err) if is_fatal(err) => self.poison(),
            _ => self.settle_state(),
        }
        result
    }

    fn run_query(&mut self, sql: &str, started: Instant) -> Result<QueryResult> {
        let mut writer = PacketWriter::with_capacity(1 + sql.len());
        writer.write_u8(Command::Query as u8);
        writer.write_bytes(sql.as_bytes());
        self.framer.write_packet(writer.as_bytes())?;

        let payload = self.framer.read_packet()?;
        match first_byte_type(&payload)? {
            PacketType::Ok => {
                let ok = parse_ok(&payload)?;
                self.apply_ok(&ok);
                Ok(QueryResult::empty(started.elapsed()))
            }
            PacketType::Error => Err(err_packet_to_error(&payload)),
            PacketType::LocalInfile => self.refuse_local_infile(),
            _ => self.read_result_set(&payload, started, RowEncoding::Text),
        }
    }

    /// Execute a statement and return the affected row count.
    pub fn execute(&mut self, sql: &str) -> Result<u64> {
        self.query(sql)?;
        Ok(self.affected_rows)
    }

    /// Prepare a statement for binary-protocol execution.
    pub fn prepare(&mut self, sql: &str) -> Result<PreparedStatement> {
        self.ensure_ready()?;
        self.state = ConnectionState::InQuery;
        self.framer.reset_sequence();

        let result = self.run_prepare(sql);
        match &result {
            Err(err) if is_fatal(err) => self.poison(),
            _ => self.settle_state(),
        }
        result
    }

    fn run_prepare(&mut self, sql: &str) -> Result<PreparedStatement> {
        self.framer.write_packet(&build_stmt_prepare(sql))?;

        let payload = self.framer.read_packet()?;
        if payload.first() == Some(&0xFF) {
            return Err(err_packet_to_error(&payload));
        }
        let ok = parse_stmt_prepare_ok(&payload)
            .ok_or_else(|| Error::protocol("malformed prepare response"))?;

        let params = self.read_definitions(ok.num_params as usize)?;
        let columns = self.read_definitions(ok.num_columns as usize)?;

        Ok(PreparedStatement {
            statement_id: ok.statement_id,
            sql: sql.to_string(),
            params,
            columns,
        })
    }

    /// Execute a prepared statement with bound parameters.
    pub fn execute_prepared(
        &mut self,
        statement: &PreparedStatement,
        params: &[Value],
    ) -> Result<QueryResult> {
        if params.len() != statement.param_count() {
            return Err(Error::new(
                ErrorKind::Query,
                format!(
                    "statement expects {} parameters, got {}",
                    statement.param_count(),
                    params.len()
                ),
            ));
        }

        self.ensure_ready()?;
        self.state = ConnectionState::InQuery;
        self.framer.reset_sequence();

        let started = Instant::now();
        let result = self.run_execute_prepared(statement, params, started);
        match &result {
            Err(err) if is_fatal(err) => self.poison(),
            _ => self.settle_state(),
        }
        result
    }

    fn run_execute_prepared(
        &mut self,
        statement: &PreparedStatement,
        params: &[Value],
        started: Instant,
    ) -> Result<QueryResult> {
        self.framer
            .write_packet(&build_stmt_execute(statement.statement_id, params))?;

        let payload = self.framer.read_packet()?;
        match first_byte_type(&payload)? {
            PacketType::Ok => {
                let ok = parse_ok(&payload)?;
                self.apply_ok(&ok);
                Ok(QueryResult::empty(started.elapsed()))
            }
            PacketType::Error => Err(err_packet_to_error(&payload)),
            _ => self.read_result_set(&payload, started, RowEncoding::Binary),
        }
    }

    /// Close a prepared statement. The server sends no reply.
    pub fn close_statement(&mut self, statement: &PreparedStatement) -> Result<()> {
        self.ensure_ready()?;
        self.framer.reset_sequence();
        self.framer
            .write_packet(&build_stmt_close(statement.statement_id))
            .map_err(|e| {
                self.poison();
                e
            })
    }

    /// Ping the server.
    pub fn ping(&mut self) -> Result<()> {
        self.ensure_ready()?;
        self.framer.reset_sequence();

        let mut writer = PacketWriter::with_capacity(1);
        writer.write_u8(Command::Ping as u8);

        let result: Result<()> = (|| {
            self.framer.write_packet(writer.as_bytes())?;
            let payload = self.framer.read_packet()?;
            match first_byte_type(&payload)? {
                PacketType::Ok => {
                    let ok = parse_ok(&payload)?;
                    self.apply_ok(&ok);
                    Ok(())
                }
                PacketType::Error => Err(err_packet_to_error(&payload)),
                _ => Err(Error::protocol("unexpected ping response")),
            }
        })();

        if let Err(err) = &result {
            if is_fatal(err) {
                self.poison();
            }
        }
        result
    }

    /// Ask the server to kill another connection.
    ///
    /// Cancelling an in-flight query requires this out-of-band path: the
    /// connection running the query is blocked reading its response, so
    /// the kill is sent from a *different* connection, targeting the
    /// stuck one's [`connection_id`](Connection::connection_id).
    pub fn kill(&mut self, connection_id: u32) -> Result<()> {
        self.ensure_ready()?;
        self.framer.reset_sequence();

        let mut writer = PacketWriter::with_capacity(5);
        writer.write_u8(Command::ProcessKill as u8);
        writer.write_u32_le(connection_id);

        let result: Result<()> = (|| {
            self.framer.write_packet(writer.as_bytes())?;
            let payload = self.framer.read_packet()?;
            match first_byte_type(&payload)? {
                PacketType::Ok => {
                    let ok = parse_ok(&payload)?;
                    self.apply_ok(&ok);
                    Ok(())
                }
                PacketType::Error => Err(err_packet_to_error(&payload)),
                _ => Err(Error::protocol("unexpected kill response")),
            }
        })();

        if let Err(err) = &result {
            if is_fatal(err) {
                self.poison();
            }
        }
        result
    }

    /// Close the connection, sending COM_QUIT best-effort.
    pub fn close(mut self) -> Result<()> {
        if matches!(self.state, ConnectionState::Closed | ConnectionState::Failed) {
            return Ok(());
        }

        self.framer.reset_sequence();
        let mut writer = PacketWriter::with_capacity(1);
        writer.write_u8(Command::Quit as u8);
        let _ = self.framer.write_packet(writer.as_bytes());

        self.framer.stream_mut().shutdown();
        self.state = ConnectionState::Closed;
        Ok(())
    }

    // === Status accessors ===

    /// The current protocol phase.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the connection can accept a command.
    pub fn is_ready(&self) -> bool {
        matches!(
            self.state,
            ConnectionState::Ready | ConnectionState::InTransaction
        )
    }

    /// The server-assigned connection (thread) id.
    pub fn connection_id(&self) -> u32 {
        self.connection_id
    }

    /// The raw server version string.
    pub fn server_version(&self) -> &str {
        &self.server_version
    }

    /// Server version string plus its numeric form
    /// (`major * 10000 + minor * 100 + patch`).
    pub fn server_info(&self) -> ServerInfo {
        ServerInfo {
            version: self.server_version.clone(),
            id: parse_version_id(&self.server_version),
        }
    }

    /// The server status bitmask from the most recent OK/EOF packet.
    pub fn server_status(&self) -> u16 {
        self.status_flags
    }

    /// Whether the transaction bit is set in the latest server status.
    ///
    /// Updated by every executed statement, including ones that commit or
    /// roll back implicitly.
    pub fn in_transaction(&self) -> bool {
        self.status_flags & server_status::SERVER_STATUS_IN_TRANS != 0
    }

    /// The negotiated capability flags.
    pub fn capability_flags(&self) -> u32 {
        self.capabilities
    }

    /// Read-only snapshot of the connection options. The live
    /// configuration cannot be changed through this.
    pub fn options(&self) -> &Config {
        &self.config
    }

    /// Rows affected by the last statement.
    pub fn affected_rows(&self) -> u64 {
        self.affected_rows
    }

    /// Insert id generated by the last statement.
    pub fn last_insert_id(&self) -> u64 {
        self.last_insert_id
    }

    /// Warning count from the last statement.
    pub fn warnings(&self) -> u16 {
        self.warnings
    }

    /// The hostname the server reports for itself.
    ///
    /// A dedicated helper around `select @@hostname`, flattening the
    /// single-column result.
    pub fn connected_host(&mut self) -> Result<Option<String>> {
        let result = self.query("select @@hostname")?;
        let host = result.rows().first().and_then(|row| match row.get(0) {
            Some(Value::Text(s)) => Some(s.clone()),
            Some(Value::Bytes(b)) => Some(String::from_utf8_lossy(b).into_owned()),
            _ => None,
        });
        Ok(host)
    }

    // === Internals ===

    fn ensure_ready(&self) -> Result<()> {
        match self.state {
            ConnectionState::Ready | ConnectionState::InTransaction => Ok(()),
            ConnectionState::Closed => Err(Error::closed("connection is closed")),
            ConnectionState::Failed => {
                Err(Error::closed("connection failed; reconnect required"))
            }
            _ => Err(Error::connection("connection is not ready for commands")),
        }
    }

    /// Fold an OK/EOF status into the tracked connection state.
    fn apply_ok(&mut self, ok: &OkPacket) {
        self.affected_rows = ok.affected_rows;
        self.last_insert_id = ok.last_insert_id;
        self.status_flags = ok.status_flags;
        self.warnings = ok.warnings;
    }

    /// Land on Ready or InTransaction according to the latest status bits.
    fn settle_state(&mut self) {
        self.state = if self.in_transaction() {
            ConnectionState::InTransaction
        } else {
            ConnectionState::Ready
        };
    }

    /// Mark the connection unusable and tear the transport down before the
    /// error surfaces to the caller.
    fn poison(&mut self) {
        tracing::debug!(connection_id = self.connection_id, "connection poisoned");
        self.framer.stream_mut().shutdown();
        self.state = ConnectionState::Failed;
    }

    /// Read a result set: column definitions, then rows, then the
    /// EOF/OK terminator.
    ///
    /// Cast failures don't abort the read: the remaining packets are
    /// drained so the connection stays in sync, then the first failure is
    /// surfaced.
    fn read_result_set(
        &mut self,
        header_payload: &[u8],
        started: Instant,
        encoding: RowEncoding,
    ) -> Result<QueryResult> {
        let mut reader = PacketReader::new(header_payload);
        let column_count = reader
            .read_lenenc_int()
            .ok_or_else(|| Error::protocol("invalid result set column count"))?
            as usize;

        let columns = self.read_definitions(column_count)?;
        let column_info = Arc::new(ColumnInfo::new(
            columns.iter().map(|c| c.name.clone()).collect(),
        ));

        let mut rows = Vec::new();
        let mut cast_failure: Option<Error> = None;

        loop {
            let payload = self.framer.read_packet()?;

            match payload.first() {
                None => return Err(Error::protocol("empty row packet")),
                Some(0xFF) => return Err(err_packet_to_error(&payload)),
                // Result-set terminator: a bare EOF packet or, with
                // CLIENT_DEPRECATE_EOF, an EOF-headed OK packet. A row
                // can only start with 0xFE if it is at least 16MB long.
                Some(0xFE) if payload.len() < MAX_PACKET_SIZE => {
                    if payload.len() < 9 {
                        let eof = PacketReader::new(&payload)
                            .parse_eof_packet()
                            .ok_or_else(|| Error::protocol("malformed EOF packet"))?;
                        self.status_flags = eof.status_flags;
                        self.warnings = eof.warnings;
                    } else {
                        let ok = parse_ok(&payload)?;
                        self.apply_ok(&ok);
                    }
                    break;
                }
                Some(_) => {
                    if cast_failure.is_some() {
                        continue; // draining
                    }
                    let decoded = match encoding {
                        RowEncoding::Text => {
                            decode_text_row(&payload, &columns, self.config.cast_values)
                        }
                        RowEncoding::Binary => decode_binary_row(&payload, &columns),
                    };
                    match decoded {
                        Ok(values) => {
                            rows.push(Row::with_columns(Arc::clone(&column_info), values));
                        }
                        Err(err) if err.kind == ErrorKind::Cast => cast_failure = Some(err),
                        Err(err) => return Err(err),
                    }
                }
            }
        }

        match cast_failure {
            Some(err) => Err(err),
            None => Ok(QueryResult::new(column_info, rows, started.elapsed())),
        }
    }

    /// Read `count` column definition packets, plus the trailing EOF on
    /// servers that still send one.
    fn read_definitions(&mut self, count: usize) -> Result<Vec<ColumnDef>> {
        let mut defs = Vec::with_capacity(count);
        for _ in 0..count {
            let payload = self.framer.read_packet()?;
            if payload.first() == Some(&0xFF) {
                return Err(err_packet_to_error(&payload));
            }
            defs.push(ColumnDef::parse(&payload)?);
        }

        if count > 0 && self.capabilities & capabilities::CLIENT_DEPRECATE_EOF == 0 {
            let payload = self.framer.read_packet()?;
            if payload.first() != Some(&0xFE) {
                return Err(Error::protocol("expected EOF after column definitions"));
            }
        }

        Ok(defs)
    }

    /// Refuse a LOCAL INFILE request while keeping the conversation in
    /// sync: an empty packet tells the server no data is coming, and the
    /// server answers with its final OK/ERR.
    fn refuse_local_infile(&mut self) -> Result<QueryResult> {
        self.framer.write_packet(&[])?;
        let payload = self.framer.read_packet()?;
        if payload.first() == Some(&0x00) {
            let ok = parse_ok(&payload)?;
            self.apply_ok(&ok);
        }
        Err(Error::new(
            ErrorKind::Query,
            "LOCAL INFILE is not supported",
        ))
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.framer.stream_mut().shutdown();
    }
}

/// Row encodings a result set can arrive in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowEncoding {
    Text,
    Binary,
}

/// Fatal errors poison the connection; client-class errors do not.
fn is_fatal(err: &Error) -> bool {
    matches!(err.class(), ErrorClass::Connection | ErrorClass::Protocol) && err.code.is_none()
}

fn first_byte_type(payload: &[u8]) -> Result<PacketType> {
    let first = *payload
        .first()
        .ok_or_else(|| Error::protocol("empty response packet"))?;
    #[allow(clippy::cast_possible_truncation)]
    Ok(PacketType::from_first_byte(first, payload.len() as u32))
}

fn parse_ok(payload: &[u8]) -> Result<OkPacket> {
    PacketReader::new(payload)
        .parse_ok_packet()
        .ok_or_else(|| Error::protocol("malformed OK packet"))
}

/// Parse and classify a server ERR packet.
fn err_packet_to_error(payload: &[u8]) -> Error {
    match PacketReader::new(payload).parse_err_packet() {
        Some(err) => err.into_error(),
        None => Error::protocol("malformed error packet"),
    }
}

/// Swap the plain transport for a TLS-wrapped one, keeping the packet
/// sequence counter running across the swap.
#[cfg(feature = "tls")]
fn upgrade_to_tls(framer: Framer<Stream>, config: &Config) -> Result<Framer<Stream>> {
    use crate::tls::TlsStream;

    let (stream, sequence) = framer.into_parts();
    let tcp = match stream {
        Stream::Plain(tcp) => tcp,
        Stream::Tls(_) => return Err(Error::ssl("transport is already TLS")),
    };

    let tls = TlsStream::connect(tcp, &config.tls, &config.host, config.ssl_mode)?;
    Ok(Framer::from_parts(
        Stream::Tls(Box::new(tls)),
        sequence,
    ))
}

#[cfg(not(feature = "tls"))]
fn upgrade_to_tls(_framer: Framer<Stream>, _config: &Config) -> Result<Framer<Stream>> {
    Err(Error::ssl(
        "TLS requested but sqlwire-mysql was built without the 'tls' feature",
    ))
}

/// Numeric version id from a server version string:
/// `major * 10000 + minor * 100 + patch` for a leading `x.y.z` triple.
fn parse_version_id(version: &str) -> Option<u32> {
    let mut parts = version.splitn(3, '.');
    let major: u32 = parts.next()?.parse().ok()?;
    let minor: u32 = parts.next()?.parse().ok()?;
    let patch_part = parts.next()?;
    let digits: String = patch_part
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let patch: u32 = digits.parse().ok()?;
    Some(major * 10_000 + minor * 100 + patch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;

    #[test]
    fn version_id_parsing() {
        assert_eq!(parse_version_id("8.0.36"), Some(80_036));
        assert_eq!(parse_version_id("8.0.36-0ubuntu0.22.04.1"), Some(80_036));
        assert_eq!(parse_version_id("10.11.2-MariaDB"), Some(101_102));
        assert_eq!(parse_version_id("5.7.44-log"), Some(50_744));
        assert_eq!(parse_version_id("weird"), None);
        assert_eq!(parse_version_id("8.0"), None);
    }

    #[test]
    fn fatal_error_detection() {
        // Transport failures and framing violations are fatal.
        assert!(is_fatal(&Error::timeout("read timed out")));
        assert!(is_fatal(&Error::closed("eof")));
        assert!(is_fatal(&Error::protocol("packets out of order")));

        // Server-reported and client-side failures are not.
        assert!(!is_fatal(&classify(Some(1064), "syntax error")));
        assert!(!is_fatal(&classify(Some(1062), "duplicate")));
        assert!(!is_fatal(&Error::cast("bad value")));
        assert!(!is_fatal(&Error::new(ErrorKind::Query, "param mismatch")));
    }

    #[test]
    fn server_err_with_connection_kind_is_not_fatal_to_classification() {
        // A server-sent 1927 (connection killed) carries a code; the
        // transport is still coherent, so the dispatcher does not poison
        // the connection for it.
        let err = classify(Some(1927), "Connection was killed");
        assert_eq!(err.kind, ErrorKind::Connection);
        assert!(!is_fatal(&err));
    }
}
