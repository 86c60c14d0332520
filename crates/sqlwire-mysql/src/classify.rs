//! Server error classification.
//!
//! Maps server error codes to error kinds so callers never see a raw code
//! without an accompanying kind. The table is an immutable map built once
//! at startup; codes outside the table become protocol-kind errors that
//! keep the code for inspection.

use std::collections::HashMap;
use std::sync::LazyLock;

use sqlwire_core::{Error, ErrorKind};

use crate::protocol::ErrPacket;

/// ER_LOCK_WAIT_TIMEOUT
pub const ER_LOCK_WAIT_TIMEOUT: u16 = 1205;
/// ER_DBACCESS_DENIED_ERROR
pub const ER_DBACCESS_DENIED_ERROR: u16 = 1044;
/// ER_ACCESS_DENIED_ERROR
pub const ER_ACCESS_DENIED_ERROR: u16 = 1045;
/// ER_PARSE_ERROR
pub const ER_PARSE_ERROR: u16 = 1064;
/// ER_ABORTING_CONNECTION
pub const ER_ABORTING_CONNECTION: u16 = 1152;
/// ER_NET_PACKET_TOO_LARGE
pub const ER_NET_PACKET_TOO_LARGE: u16 = 1153;
/// ER_NET_READ_ERROR_FROM_PIPE
pub const ER_NET_READ_ERROR_FROM_PIPE: u16 = 1154;
/// ER_NET_FCNTL_ERROR
pub const ER_NET_FCNTL_ERROR: u16 = 1155;
/// ER_NET_PACKETS_OUT_OF_ORDER
pub const ER_NET_PACKETS_OUT_OF_ORDER: u16 = 1156;
/// ER_NET_UNCOMPRESS_ERROR
pub const ER_NET_UNCOMPRESS_ERROR: u16 = 1157;
/// ER_NET_READ_ERROR
pub const ER_NET_READ_ERROR: u16 = 1158;
/// ER_NET_READ_INTERRUPTED
pub const ER_NET_READ_INTERRUPTED: u16 = 1159;
/// ER_NET_ERROR_ON_WRITE
pub const ER_NET_ERROR_ON_WRITE: u16 = 1160;
/// ER_NET_WRITE_INTERRUPTED
pub const ER_NET_WRITE_INTERRUPTED: u16 = 1161;
/// ER_CONNECTION_KILLED
pub const ER_CONNECTION_KILLED: u16 = 1927;

/// Code-to-kind table, built on first use.
static SERVER_ERROR_KINDS: LazyLock<HashMap<u16, ErrorKind>> = LazyLock::new(|| {
    HashMap::from([
        (ER_LOCK_WAIT_TIMEOUT, ErrorKind::Timeout),
        (ER_DBACCESS_DENIED_ERROR, ErrorKind::Connection),
        (ER_ACCESS_DENIED_ERROR, ErrorKind::Connection),
        (ER_PARSE_ERROR, ErrorKind::Query),
        (ER_ABORTING_CONNECTION, ErrorKind::Connection),
        (ER_NET_PACKET_TOO_LARGE, ErrorKind::Connection),
        (ER_NET_READ_ERROR_FROM_PIPE, ErrorKind::Connection),
        (ER_NET_FCNTL_ERROR, ErrorKind::Connection),
        (ER_NET_PACKETS_OUT_OF_ORDER, ErrorKind::Connection),
        (ER_NET_UNCOMPRESS_ERROR, ErrorKind::Connection),
        (ER_NET_READ_ERROR, ErrorKind::Connection),
        (ER_NET_READ_INTERRUPTED, ErrorKind::Connection),
        (ER_NET_ERROR_ON_WRITE, ErrorKind::Connection),
        (ER_NET_WRITE_INTERRUPTED, ErrorKind::Connection),
        (ER_CONNECTION_KILLED, ErrorKind::Connection),
    ])
});

/// Classify a server-reported failure into the error taxonomy.
///
/// With a code, the table decides the kind and the code is retained on the
/// error either way. Without one (a malformed ERR packet), the failure is
/// a protocol error.
pub fn classify(code: Option<u16>, message: impl Into<String>) -> Error {
    match code {
        Some(code) => {
            let kind = SERVER_ERROR_KINDS
                .get(&code)
                .copied()
                .unwrap_or(ErrorKind::Protocol);
            Error::with_code(kind, message, code)
        }
        None => Error::protocol(message),
    }
}

impl ErrPacket {
    /// Classify this ERR packet into the error taxonomy.
    pub fn into_error(self) -> Error {
        classify(Some(self.error_code), self.error_message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlwire_core::ErrorClass;

    #[test]
    fn parse_error_is_query_class() {
        let err = classify(Some(1064), "syntax error");
        assert_eq!(err.kind, ErrorKind::Query);
        assert_eq!(err.code, Some(1064));
        assert_eq!(err.class(), ErrorClass::Client);
    }

    #[test]
    fn lock_wait_timeout_is_timeout() {
        let err = classify(Some(1205), "Lock wait timeout exceeded");
        assert_eq!(err.kind, ErrorKind::Timeout);
        assert_eq!(err.code, Some(1205));
        assert_eq!(err.class(), ErrorClass::Connection);
    }

    #[test]
    fn every_mapped_code_keeps_its_kind() {
        for (&code, &kind) in SERVER_ERROR_KINDS.iter() {
            let err = classify(Some(code), "x");
            assert_eq!(err.kind, kind, "code {code}");
            assert_eq!(err.code, Some(code));
        }
    }

    #[test]
    fn access_denied_is_connection_class() {
        for code in [1044u16, 1045] {
            let err = classify(Some(code), "Access denied");
            assert_eq!(err.kind, ErrorKind::Connection);
            assert!(err.is_connection_error());
        }
    }

    #[test]
    fn unmapped_code_is_protocol_with_code() {
        let err = classify(Some(1062), "Duplicate entry 'x'");
        assert_eq!(err.kind, ErrorKind::Protocol);
        assert_eq!(err.code, Some(1062));
    }

    #[test]
    fn missing_code_is_protocol_without_code() {
        let err = classify(None, "malformed error packet");
        assert_eq!(err.kind, ErrorKind::Protocol);
        assert_eq!(err.code, None);
    }

    #[test]
    fn err_packet_classification() {
        let packet = ErrPacket {
            error_code: 1064,
            sql_state: "42000".to_string(),
            error_message: "You have an error in your SQL syntax".to_string(),
        };
        let err = packet.into_error();
        assert_eq!(err.kind, ErrorKind::Query);
        assert_eq!(err.code, Some(1064));
        assert!(err.message.contains("SQL syntax"));
    }
}
