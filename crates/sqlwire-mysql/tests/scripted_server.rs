//! End-to-end protocol tests against an in-process scripted server.
//!
//! Each test spins up a TCP listener that speaks just enough of the
//! server side of the wire protocol to drive the client through connect,
//! query, and failure paths, with exact control over every byte.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::JoinHandle;
use std::time::Duration;

use sqlwire_mysql::protocol::{capabilities, server_status};
use sqlwire_mysql::{Config, Connection, ErrorKind, Value};

// === server-side packet plumbing ===

fn write_packet(stream: &mut TcpStream, seq: u8, payload: &[u8]) {
    let len = payload.len();
    let header = [
        (len & 0xFF) as u8,
        ((len >> 8) & 0xFF) as u8,
        ((len >> 16) & 0xFF) as u8,
        seq,
    ];
    stream.write_all(&header).unwrap();
    stream.write_all(payload).unwrap();
}

fn read_packet(stream: &mut TcpStream) -> (u8, Vec<u8>) {
    let mut header = [0u8; 4];
    stream.read_exact(&mut header).unwrap();
    let len = usize::from(header[0]) | (usize::from(header[1]) << 8) | (usize::from(header[2]) << 16);
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).unwrap();
    (header[3], payload)
}

fn lenenc_str(out: &mut Vec<u8>, s: &str) {
    out.push(s.len() as u8);
    out.extend_from_slice(s.as_bytes());
}

const SERVER_CAPS: u32 = capabilities::DEFAULT_CLIENT_FLAGS
    | capabilities::CLIENT_CONNECT_WITH_DB
    | capabilities::CLIENT_CONNECT_ATTRS;

fn greeting_payload(connection_id: u32, version: &str) -> Vec<u8> {
    let mut p = Vec::new();
    p.push(10); // protocol version
    p.extend_from_slice(version.as_bytes());
    p.push(0);
    p.extend_from_slice(&connection_id.to_le_bytes());
    p.extend_from_slice(b"abcdefgh"); // scramble part 1
    p.push(0); // filler
    p.extend_from_slice(&((SERVER_CAPS & 0xFFFF) as u16).to_le_bytes());
    p.push(255); // charset
    p.extend_from_slice(&server_status::SERVER_STATUS_AUTOCOMMIT.to_le_bytes());
    p.extend_from_slice(&((SERVER_CAPS >> 16) as u16).to_le_bytes());
    p.push(21); // auth data length
    p.extend_from_slice(&[0u8; 10]); // reserved
    p.extend_from_slice(b"ijklmnopqrst"); // scramble part 2
    p.push(0);
    p.extend_from_slice(b"mysql_native_password");
    p.push(0);
    p
}

fn ok_payload(affected: u8, last_insert_id: u8, status: u16) -> Vec<u8> {
    let mut p = vec![0x00, affected, last_insert_id];
    p.extend_from_slice(&status.to_le_bytes());
    p.extend_from_slice(&0u16.to_le_bytes()); // warnings
    p
}

fn eof_payload(status: u16) -> Vec<u8> {
    let mut p = vec![0xFE];
    p.extend_from_slice(&0u16.to_le_bytes()); // warnings
    p.extend_from_slice(&status.to_le_bytes());
    p
}

fn err_payload(code: u16, message: &str) -> Vec<u8> {
    let mut p = vec![0xFF];
    p.extend_from_slice(&code.to_le_bytes());
    p.push(b'#');
    p.extend_from_slice(b"HY000");
    p.extend_from_slice(message.as_bytes());
    p
}

fn column_payload(name: &str, type_code: u8, flags: u16) -> Vec<u8> {
    let mut p = Vec::new();
    lenenc_str(&mut p, "def");
    lenenc_str(&mut p, "");
    lenenc_str(&mut p, "");
    lenenc_str(&mut p, "");
    lenenc_str(&mut p, name);
    lenenc_str(&mut p, name);
    p.push(0x0C); // length of fixed fields
    p.extend_from_slice(&255u16.to_le_bytes()); // charset
    p.extend_from_slice(&64u32.to_le_bytes()); // display length
    p.push(type_code);
    p.extend_from_slice(&flags.to_le_bytes());
    p.push(0); // decimals
    p.extend_from_slice(&[0, 0]); // filler
    p
}

fn text_row_payload(fields: &[Option<&str>]) -> Vec<u8> {
    let mut p = Vec::new();
    for field in fields {
        match field {
            None => p.push(0xFB),
            Some(s) => lenenc_str(&mut p, s),
        }
    }
    p
}

/// Accept one connection and run the scripted exchange on it.
fn serve(script: impl FnOnce(&mut TcpStream) + Send + 'static) -> (u16, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream.set_nodelay(true).ok();
        script(&mut stream);
    });
    (port, handle)
}

/// Greeting, handshake response, final OK.
fn do_handshake(stream: &mut TcpStream) {
    write_packet(stream, 0, &greeting_payload(17, "8.0.36-scripted"));
    let (seq, response) = read_packet(stream);
    assert_eq!(seq, 1);
    // Handshake response leads with the negotiated capabilities.
    let caps = u32::from_le_bytes([response[0], response[1], response[2], response[3]]);
    assert_eq!(caps & !SERVER_CAPS, 0, "client asked for unoffered capability");
    write_packet(
        stream,
        2,
        &ok_payload(0, 0, server_status::SERVER_STATUS_AUTOCOMMIT),
    );
}

fn test_config(port: u16) -> Config {
    Config::new()
        .host("127.0.0.1")
        .port(port)
        .username("tester")
        .password("secret")
        .connect_timeout(Duration::from_secs(2))
        .read_timeout(Duration::from_secs(2))
        .write_timeout(Duration::from_secs(2))
}

// === tests ===

#[test]
fn connect_and_select_one() {
    let (port, server) = serve(|stream| {
        do_handshake(stream);

        let (seq, query) = read_packet(stream);
        assert_eq!(seq, 0);
        assert_eq!(query[0], 0x03); // COM_QUERY
        assert_eq!(&query[1..], b"SELECT 1");

        write_packet(stream, 1, &[0x01]); // one column
        write_packet(stream, 2, &column_payload("1", 0xFD, 0)); // VAR_STRING
        write_packet(stream, 3, &text_row_payload(&[Some("1")]));
        write_packet(stream, 4, &eof_payload(server_status::SERVER_STATUS_AUTOCOMMIT));
    });

    let mut conn = Connection::connect(test_config(port)).unwrap();
    assert_eq!(conn.connection_id(), 17);
    assert!(conn.is_ready());

    let result = conn.query("SELECT 1").unwrap();
    assert_eq!(result.fields(), &["1"]);
    assert_eq!(result.count(), 1);
    assert_eq!(result.rows()[0].get(0), Some(&Value::Text("1".to_string())));
    assert!(result.query_time() > Duration::ZERO);

    server.join().unwrap();
}

#[test]
fn non_result_statement_updates_counters() {
    let (port, server) = serve(|stream| {
        do_handshake(stream);

        let (_, query) = read_packet(stream);
        assert_eq!(&query[1..], b"INSERT INTO t VALUES (1)");
        write_packet(
            stream,
            1,
            &ok_payload(3, 42, server_status::SERVER_STATUS_AUTOCOMMIT),
        );
    });

    let mut conn = Connection::connect(test_config(port)).unwrap();
    let result = conn.query("INSERT INTO t VALUES (1)").unwrap();
    assert!(result.is_empty());
    assert_eq!(conn.affected_rows(), 3);
    assert_eq!(conn.last_insert_id(), 42);

    server.join().unwrap();
}

#[test]
fn query_error_is_classified_and_connection_survives() {
    let (port, server) = serve(|stream| {
        do_handshake(stream);

        let _ = read_packet(stream);
        write_packet(stream, 1, &err_payload(1064, "syntax error"));

        // The connection must still be usable for the next command.
        let (seq, query) = read_packet(stream);
        assert_eq!(seq, 0);
        assert_eq!(&query[1..], b"SELECT 2");
        write_packet(stream, 1, &[0x01]);
        write_packet(stream, 2, &column_payload("2", 0x08, 0)); // BIGINT
        write_packet(stream, 3, &text_row_payload(&[Some("2")]));
        write_packet(stream, 4, &eof_payload(server_status::SERVER_STATUS_AUTOCOMMIT));
    });

    let mut conn = Connection::connect(test_config(port)).unwrap();

    let err = conn.query("SELEC 1").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Query);
    assert_eq!(err.code, Some(1064));
    assert!(err.is_client_error());

    assert!(conn.is_ready());
    let result = conn.query("SELECT 2").unwrap();
    assert_eq!(result.rows()[0].get(0), Some(&Value::BigInt(2)));

    server.join().unwrap();
}

#[test]
fn transaction_bit_tracks_server_status() {
    let in_trans = server_status::SERVER_STATUS_IN_TRANS;
    let autocommit = server_status::SERVER_STATUS_AUTOCOMMIT;

    let (port, server) = serve(move |stream| {
        do_handshake(stream);

        let (_, query) = read_packet(stream);
        assert_eq!(&query[1..], b"BEGIN");
        write_packet(stream, 1, &ok_payload(0, 0, in_trans));

        let (_, query) = read_packet(stream);
        assert_eq!(&query[1..], b"COMMIT");
        write_packet(stream, 1, &ok_payload(0, 0, autocommit));
    });

    let mut conn = Connection::connect(test_config(port)).unwrap();
    assert!(!conn.in_transaction());

    conn.query("BEGIN").unwrap();
    assert!(conn.in_transaction());
    assert_eq!(conn.server_status() & in_trans, in_trans);

    conn.query("COMMIT").unwrap();
    assert!(!conn.in_transaction());

    server.join().unwrap();
}

#[test]
fn null_field_is_semantic_null() {
    let (port, server) = serve(|stream| {
        do_handshake(stream);

        let _ = read_packet(stream);
        write_packet(stream, 1, &[0x02]);
        write_packet(stream, 2, &column_payload("a", 0xFD, 0));
        write_packet(stream, 3, &column_payload("b", 0xFD, 0));
        write_packet(stream, 4, &text_row_payload(&[None, Some("")]));
        write_packet(stream, 5, &eof_payload(server_status::SERVER_STATUS_AUTOCOMMIT));
    });

    let mut conn = Connection::connect(test_config(port)).unwrap();
    let result = conn.query("SELECT a, b FROM t").unwrap();
    let row = &result.rows()[0];
    assert_eq!(row.get(0), Some(&Value::Null));
    assert_eq!(row.get(1), Some(&Value::Text(String::new())));

    server.join().unwrap();
}

#[test]
fn keyed_rows_zip_fields() {
    let (port, server) = serve(|stream| {
        do_handshake(stream);

        let _ = read_packet(stream);
        write_packet(stream, 1, &[0x02]);
        write_packet(stream, 2, &column_payload("id", 0x08, 0));
        write_packet(stream, 3, &column_payload("name", 0xFD, 0));
        write_packet(stream, 4, &text_row_payload(&[Some("7"), Some("ada")]));
        write_packet(stream, 5, &eof_payload(server_status::SERVER_STATUS_AUTOCOMMIT));
    });

    let mut conn = Connection::connect(test_config(port)).unwrap();
    let result = conn.query("SELECT id, name FROM users").unwrap();
    let keyed: Vec<_> = result.keyed_rows().collect();
    assert_eq!(keyed[0]["id"], Value::BigInt(7));
    assert_eq!(keyed[0]["name"], Value::Text("ada".to_string()));

    server.join().unwrap();
}

#[test]
fn ping_roundtrip() {
    let (port, server) = serve(|stream| {
        do_handshake(stream);

        let (seq, ping) = read_packet(stream);
        assert_eq!(seq, 0);
        assert_eq!(ping, vec![0x0E]); // COM_PING
        write_packet(stream, 1, &ok_payload(0, 0, server_status::SERVER_STATUS_AUTOCOMMIT));
    });

    let mut conn = Connection::connect(test_config(port)).unwrap();
    conn.ping().unwrap();

    server.join().unwrap();
}

#[test]
fn connected_host_flattens_single_column() {
    let (port, server) = serve(|stream| {
        do_handshake(stream);

        let (_, query) = read_packet(stream);
        assert_eq!(&query[1..], b"select @@hostname");
        write_packet(stream, 1, &[0x01]);
        write_packet(stream, 2, &column_payload("@@hostname", 0xFD, 0));
        write_packet(stream, 3, &text_row_payload(&[Some("db-1.internal")]));
        write_packet(stream, 4, &eof_payload(server_status::SERVER_STATUS_AUTOCOMMIT));
    });

    let mut conn = Connection::connect(test_config(port)).unwrap();
    assert_eq!(
        conn.connected_host().unwrap(),
        Some("db-1.internal".to_string())
    );

    server.join().unwrap();
}

#[test]
fn server_info_reports_numeric_version() {
    let (port, server) = serve(|stream| {
        do_handshake(stream);
    });

    let conn = Connection::connect(test_config(port)).unwrap();
    let info = conn.server_info();
    assert_eq!(info.version, "8.0.36-scripted");
    assert_eq!(info.id, Some(80_036));

    server.join().unwrap();
}

#[test]
fn auth_rejection_is_connection_error() {
    let (port, server) = serve(|stream| {
        write_packet(stream, 0, &greeting_payload(5, "8.0.36-scripted"));
        let _ = read_packet(stream);
        write_packet(stream, 2, &err_payload(1045, "Access denied for user"));
    });

    let err = Connection::connect(test_config(port)).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Connection);
    assert_eq!(err.code, Some(1045));
    assert!(err.is_connection_error());

    server.join().unwrap();
}

#[test]
fn sequence_mismatch_fails_the_connection() {
    let (port, server) = serve(|stream| {
        // Greeting arrives with a bogus sequence number.
        write_packet(stream, 5, &greeting_payload(5, "8.0.36-scripted"));
        // The client hangs up without responding.
        let mut buf = [0u8; 64];
        let _ = stream.read(&mut buf);
    });

    let err = Connection::connect(test_config(port)).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Protocol);
    assert!(err.message.contains("out of order"));

    server.join().unwrap();
}

#[test]
fn cast_failure_keeps_connection_usable() {
    let (port, server) = serve(|stream| {
        do_handshake(stream);

        let _ = read_packet(stream);
        write_packet(stream, 1, &[0x01]);
        write_packet(stream, 2, &column_payload("n", 0x03, 0)); // INT column
        write_packet(stream, 3, &text_row_payload(&[Some("not-a-number")]));
        write_packet(stream, 4, &text_row_payload(&[Some("5")]));
        write_packet(stream, 5, &eof_payload(server_status::SERVER_STATUS_AUTOCOMMIT));

        // Still in sync: the next query works.
        let (seq, query) = read_packet(stream);
        assert_eq!(seq, 0);
        assert_eq!(&query[1..], b"SELECT 3");
        write_packet(stream, 1, &ok_payload(0, 0, server_status::SERVER_STATUS_AUTOCOMMIT));
    });

    let mut conn = Connection::connect(test_config(port)).unwrap();

    let err = conn.query("SELECT n FROM t").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Cast);
    assert!(err.is_client_error());

    assert!(conn.is_ready());
    conn.query("SELECT 3").unwrap();

    server.join().unwrap();
}

#[test]
fn prepared_statement_roundtrip() {
    let (port, server) = serve(|stream| {
        do_handshake(stream);

        // COM_STMT_PREPARE
        let (seq, prepare) = read_packet(stream);
        assert_eq!(seq, 0);
        assert_eq!(prepare[0], 0x16);
        assert_eq!(&prepare[1..], b"SELECT n FROM t WHERE id = ?");

        let mut prepare_ok = vec![0x00];
        prepare_ok.extend_from_slice(&9u32.to_le_bytes()); // statement id
        prepare_ok.extend_from_slice(&1u16.to_le_bytes()); // one column
        prepare_ok.extend_from_slice(&1u16.to_le_bytes()); // one param
        prepare_ok.push(0);
        prepare_ok.extend_from_slice(&0u16.to_le_bytes()); // warnings
        write_packet(stream, 1, &prepare_ok);
        write_packet(stream, 2, &column_payload("?", 0x08, 0)); // param def
        write_packet(stream, 3, &column_payload("n", 0x08, 0)); // column def

        // COM_STMT_EXECUTE
        let (seq, execute) = read_packet(stream);
        assert_eq!(seq, 0);
        assert_eq!(execute[0], 0x17);
        assert_eq!(u32::from_le_bytes([execute[1], execute[2], execute[3], execute[4]]), 9);

        write_packet(stream, 1, &[0x01]);
        write_packet(stream, 2, &column_payload("n", 0x08, 0)); // BIGINT
        // binary row: marker, null bitmap, i64 value
        let mut row = vec![0x00, 0x00];
        row.extend_from_slice(&42i64.to_le_bytes());
        write_packet(stream, 3, &row);
        write_packet(stream, 4, &eof_payload(server_status::SERVER_STATUS_AUTOCOMMIT));

        // COM_STMT_CLOSE has no response
        let (_, close) = read_packet(stream);
        assert_eq!(close[0], 0x19);
        assert_eq!(u32::from_le_bytes([close[1], close[2], close[3], close[4]]), 9);
    });

    let mut conn = Connection::connect(test_config(port)).unwrap();

    let stmt = conn.prepare("SELECT n FROM t WHERE id = ?").unwrap();
    assert_eq!(stmt.statement_id, 9);
    assert_eq!(stmt.param_count(), 1);
    assert_eq!(stmt.column_count(), 1);

    let result = conn.execute_prepared(&stmt, &[Value::Int(5)]).unwrap();
    assert_eq!(result.fields(), &["n"]);
    assert_eq!(result.rows()[0].get(0), Some(&Value::BigInt(42)));

    conn.close_statement(&stmt).unwrap();

    server.join().unwrap();
}

#[test]
fn prepared_param_count_mismatch_is_client_error() {
    let (port, server) = serve(|stream| {
        do_handshake(stream);

        let _ = read_packet(stream);
        let mut prepare_ok = vec![0x00];
        prepare_ok.extend_from_slice(&3u32.to_le_bytes());
        prepare_ok.extend_from_slice(&0u16.to_le_bytes()); // no columns
        prepare_ok.extend_from_slice(&2u16.to_le_bytes()); // two params
        prepare_ok.push(0);
        prepare_ok.extend_from_slice(&0u16.to_le_bytes());
        write_packet(stream, 1, &prepare_ok);
        write_packet(stream, 2, &column_payload("?", 0x08, 0));
        write_packet(stream, 3, &column_payload("?", 0x08, 0));
    });

    let mut conn = Connection::connect(test_config(port)).unwrap();
    let stmt = conn.prepare("INSERT INTO t VALUES (?, ?)").unwrap();

    let err = conn.execute_prepared(&stmt, &[Value::Int(1)]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Query);
    assert!(err.is_client_error());

    server.join().unwrap();
}

#[test]
fn commands_after_failure_report_closed() {
    let (port, server) = serve(|stream| {
        do_handshake(stream);
        // Kill the connection mid-query: read the command, then hang up.
        let _ = read_packet(stream);
    });

    let mut conn = Connection::connect(test_config(port)).unwrap();

    let err = conn.query("SELECT 1").unwrap_err();
    assert!(err.is_connection_error());

    // Poisoned: every later command fails fast without touching the wire.
    let err = conn.query("SELECT 1").unwrap_err();
    assert_eq!(err.kind, ErrorKind::ConnectionClosed);
    let err = conn.ping().unwrap_err();
    assert_eq!(err.kind, ErrorKind::ConnectionClosed);

    server.join().unwrap();
}
