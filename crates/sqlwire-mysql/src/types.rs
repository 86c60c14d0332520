//! Field types, column definitions, and value decoding.
//!
//! Result sets arrive in one of two encodings. The text protocol sends
//! every field as a length-prefixed string (0xFB for NULL); the binary
//! protocol (prepared-statement execution) sends a NULL bitmap followed by
//! type-specific encodings. Both paths land in [`sqlwire_core::Value`].
//!
//! Decode failures are cast-kind errors: they condemn the value, not the
//! connection.

#![allow(clippy::cast_possible_truncation)]

use sqlwire_core::{Error, Result, Value};

use crate::protocol::PacketReader;
use crate::protocol::reader::NULL_MARKER;

/// MySQL field type codes (`MYSQL_TYPE_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FieldType {
    /// DECIMAL
    Decimal = 0x00,
    /// TINYINT
    Tiny = 0x01,
    /// SMALLINT
    Short = 0x02,
    /// INT
    Long = 0x03,
    /// FLOAT
    Float = 0x04,
    /// DOUBLE
    Double = 0x05,
    /// NULL
    Null = 0x06,
    /// TIMESTAMP
    Timestamp = 0x07,
    /// BIGINT
    LongLong = 0x08,
    /// MEDIUMINT
    Int24 = 0x09,
    /// DATE
    Date = 0x0A,
    /// TIME
    Time = 0x0B,
    /// DATETIME
    DateTime = 0x0C,
    /// YEAR
    Year = 0x0D,
    /// NEWDATE (internal)
    NewDate = 0x0E,
    /// VARCHAR
    VarChar = 0x0F,
    /// BIT
    Bit = 0x10,
    /// TIMESTAMP2 (MySQL 5.6+)
    Timestamp2 = 0x11,
    /// DATETIME2 (MySQL 5.6+)
    DateTime2 = 0x12,
    /// TIME2 (MySQL 5.6+)
    Time2 = 0x13,
    /// JSON (MySQL 5.7.8+)
    Json = 0xF5,
    /// NEWDECIMAL
    NewDecimal = 0xF6,
    /// ENUM
    Enum = 0xF7,
    /// SET
    Set = 0xF8,
    /// TINYBLOB
    TinyBlob = 0xF9,
    /// MEDIUMBLOB
    MediumBlob = 0xFA,
    /// LONGBLOB
    LongBlob = 0xFB,
    /// BLOB
    Blob = 0xFC,
    /// VAR_STRING
    VarString = 0xFD,
    /// STRING
    String = 0xFE,
    /// GEOMETRY
    Geometry = 0xFF,
}

impl FieldType {
    /// Parse a field type from its wire byte. Unknown codes decode as
    /// strings, matching server behavior for types this client predates.
    #[must_use]
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x00 => FieldType::Decimal,
            0x01 => FieldType::Tiny,
            0x02 => FieldType::Short,
            0x03 => FieldType::Long,
            0x04 => FieldType::Float,
            0x05 => FieldType::Double,
            0x06 => FieldType::Null,
            0x07 => FieldType::Timestamp,
            0x08 => FieldType::LongLong,
            0x09 => FieldType::Int24,
            0x0A => FieldType::Date,
            0x0B => FieldType::Time,
            0x0C => FieldType::DateTime,
            0x0D => FieldType::Year,
            0x0E => FieldType::NewDate,
            0x0F => FieldType::VarChar,
            0x10 => FieldType::Bit,
            0x11 => FieldType::Timestamp2,
            0x12 => FieldType::DateTime2,
            0x13 => FieldType::Time2,
            0xF5 => FieldType::Json,
            0xF6 => FieldType::NewDecimal,
            0xF7 => FieldType::Enum,
            0xF8 => FieldType::Set,
            0xF9 => FieldType::TinyBlob,
            0xFA => FieldType::MediumBlob,
            0xFB => FieldType::LongBlob,
            0xFC => FieldType::Blob,
            0xFD => FieldType::VarString,
            0xFE => FieldType::String,
            0xFF => FieldType::Geometry,
            _ => FieldType::String,
        }
    }

    /// Check if this is a date/time type.
    #[must_use]
    pub const fn is_temporal(self) -> bool {
        matches!(
            self,
            FieldType::Date
                | FieldType::Time
                | FieldType::DateTime
                | FieldType::Timestamp
                | FieldType::NewDate
                | FieldType::Timestamp2
                | FieldType::DateTime2
                | FieldType::Time2
        )
    }

    /// Check if this is a binary/blob type.
    #[must_use]
    pub const fn is_blob(self) -> bool {
        matches!(
            self,
            FieldType::TinyBlob
                | FieldType::MediumBlob
                | FieldType::LongBlob
                | FieldType::Blob
                | FieldType::Geometry
        )
    }
}

/// Column flags in result set metadata.
#[allow(dead_code)]
pub mod column_flags {
    pub const NOT_NULL: u16 = 1;
    pub const PRIMARY_KEY: u16 = 2;
    pub const UNIQUE_KEY: u16 = 4;
    pub const MULTIPLE_KEY: u16 = 8;
    pub const BLOB: u16 = 16;
    pub const UNSIGNED: u16 = 32;
    pub const ZEROFILL: u16 = 64;
    pub const BINARY: u16 = 128;
    pub const ENUM: u16 = 256;
    pub const AUTO_INCREMENT: u16 = 512;
    pub const TIMESTAMP: u16 = 1024;
    pub const SET: u16 = 2048;
    pub const NO_DEFAULT_VALUE: u16 = 4096;
    pub const ON_UPDATE_NOW: u16 = 8192;
    pub const NUM: u16 = 32768;
}

/// Column definition from a result set, immutable for its lifetime.
#[derive(Debug, Clone)]
pub struct ColumnDef {
    /// Catalog name (always "def")
    pub catalog: String,
    /// Schema (database) name
    pub schema: String,
    /// Table name (or alias)
    pub table: String,
    /// Original table name
    pub org_table: String,
    /// Column name (or alias)
    pub name: String,
    /// Original column name
    pub org_name: String,
    /// Character set number
    pub charset: u16,
    /// Display length
    pub column_length: u32,
    /// Wire type
    pub column_type: FieldType,
    /// Column flags
    pub flags: u16,
    /// Number of decimals
    pub decimals: u8,
}

impl ColumnDef {
    /// Parse a column definition packet (protocol 4.1 layout).
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let mut reader = PacketReader::new(payload);

        let mut lenenc_str = |field: &str| {
            reader
                .read_lenenc_string()
                .ok_or_else(|| Error::protocol(format!("column definition missing {field}")))
        };

        let catalog = lenenc_str("catalog")?;
        let schema = lenenc_str("schema")?;
        let table = lenenc_str("table")?;
        let org_table = lenenc_str("org_table")?;
        let name = lenenc_str("name")?;
        let org_name = lenenc_str("org_name")?;

        let _fixed_len = reader.read_lenenc_int();

        let charset = reader
            .read_u16_le()
            .ok_or_else(|| Error::protocol("column definition missing charset"))?;
        let column_length = reader
            .read_u32_le()
            .ok_or_else(|| Error::protocol("column definition missing length"))?;
        let column_type = FieldType::from_u8(
            reader
                .read_u8()
                .ok_or_else(|| Error::protocol("column definition missing type"))?,
        );
        let flags = reader
            .read_u16_le()
            .ok_or_else(|| Error::protocol("column definition missing flags"))?;
        let decimals = reader
            .read_u8()
            .ok_or_else(|| Error::protocol("column definition missing decimals"))?;

        Ok(Self {
            catalog,
            schema,
            table,
            org_table,
            name,
            org_name,
            charset,
            column_length,
            column_type,
            flags,
            decimals,
        })
    }

    /// Check if the column is unsigned.
    #[must_use]
    pub const fn is_unsigned(&self) -> bool {
        self.flags & column_flags::UNSIGNED != 0
    }

    /// Check if the column holds binary data.
    #[must_use]
    pub const fn is_binary(&self) -> bool {
        self.flags & column_flags::BINARY != 0
    }

    /// Check if the column is NOT NULL.
    #[must_use]
    pub const fn is_not_null(&self) -> bool {
        self.flags & column_flags::NOT_NULL != 0
    }
}

/// Decode one text-protocol row into values.
///
/// Each field is a lenenc string or the 0xFB NULL marker. With `cast` off,
/// fields come back as raw text (bytes for blob-typed columns).
pub fn decode_text_row(payload: &[u8], columns: &[ColumnDef], cast: bool) -> Result<Vec<Value>> {
    let mut reader = PacketReader::new(payload);
    let mut values = Vec::with_capacity(columns.len());

    for col in columns {
        if reader.peek() == Some(NULL_MARKER) {
            reader.skip(1);
            values.push(Value::Null);
            continue;
        }

        let data = reader.read_lenenc_bytes().ok_or_else(|| {
            Error::protocol(format!("row packet truncated at column '{}'", col.name))
        })?;

        let value = if cast {
            decode_text_value(col, data)?
        } else if col.column_type.is_blob() || col.is_binary() {
            Value::Bytes(data.to_vec())
        } else {
            Value::Text(String::from_utf8_lossy(data).into_owned())
        };
        values.push(value);
    }

    Ok(values)
}

/// Cast one text-protocol field by its column type.
fn decode_text_value(col: &ColumnDef, data: &[u8]) -> Result<Value> {
    let field_type = col.column_type;
    let text = String::from_utf8_lossy(data);

    let cast_err = |expected: &str| {
        Error::cast(format!(
            "cannot cast '{}' in column '{}' to {expected}",
            text, col.name
        ))
    };

    let value = match field_type {
        FieldType::Tiny => {
            if col.is_unsigned() {
                let v: u8 = text.parse().map_err(|_| cast_err("TINYINT UNSIGNED"))?;
                Value::TinyInt(v as i8)
            } else {
                Value::TinyInt(text.parse().map_err(|_| cast_err("TINYINT"))?)
            }
        }
        FieldType::Short | FieldType::Year => {
            if col.is_unsigned() {
                let v: u16 = text.parse().map_err(|_| cast_err("SMALLINT UNSIGNED"))?;
                Value::SmallInt(v as i16)
            } else {
                Value::SmallInt(text.parse().map_err(|_| cast_err("SMALLINT"))?)
            }
        }
        FieldType::Long | FieldType::Int24 => {
            if col.is_unsigned() {
                let v: u32 = text.parse().map_err(|_| cast_err("INT UNSIGNED"))?;
                Value::Int(v as i32)
            } else {
                Value::Int(text.parse().map_err(|_| cast_err("INT"))?)
            }
        }
        FieldType::LongLong => {
            if col.is_unsigned() {
                let v: u64 = text.parse().map_err(|_| cast_err("BIGINT UNSIGNED"))?;
                Value::from_u64_clamped(v)
            } else {
                Value::BigInt(text.parse().map_err(|_| cast_err("BIGINT"))?)
            }
        }

        FieldType::Float => Value::Float(text.parse().map_err(|_| cast_err("FLOAT"))?),
        FieldType::Double => Value::Double(text.parse().map_err(|_| cast_err("DOUBLE"))?),

        // Kept textual to preserve precision.
        FieldType::Decimal | FieldType::NewDecimal => Value::Decimal(text.into_owned()),

        FieldType::TinyBlob
        | FieldType::MediumBlob
        | FieldType::LongBlob
        | FieldType::Blob
        | FieldType::Geometry
        | FieldType::Bit => Value::Bytes(data.to_vec()),

        FieldType::Json => {
            serde_json::from_str(&text).map(Value::Json).map_err(|_| cast_err("JSON"))?
        }

        FieldType::Null => Value::Null,

        // Strings, enums, sets, and temporal types stay textual; the text
        // protocol already renders temporals in ISO form.
        _ => Value::Text(text.into_owned()),
    };

    Ok(value)
}

/// Decode one binary-protocol row into values.
///
/// Layout: 0x00 marker, NULL bitmap of `(columns + 9) / 8` bytes with a
/// 2-bit offset, then one encoded value per non-NULL column.
pub fn decode_binary_row(payload: &[u8], columns: &[ColumnDef]) -> Result<Vec<Value>> {
    let mut reader = PacketReader::new(payload);

    match reader.read_u8() {
        Some(0x00) => {}
        _ => return Err(Error::protocol("binary row missing 0x00 marker")),
    }

    let bitmap_len = (columns.len() + 9) / 8;
    let null_bitmap = reader
        .read_bytes(bitmap_len)
        .ok_or_else(|| Error::protocol("binary row truncated in NULL bitmap"))?
        .to_vec();

    let mut values = Vec::with_capacity(columns.len());
    for (i, col) in columns.iter().enumerate() {
        let bit = i + 2;
        if null_bitmap[bit / 8] & (1 << (bit % 8)) != 0 {
            values.push(Value::Null);
        } else {
            values.push(decode_binary_value(&mut reader, col)?);
        }
    }

    Ok(values)
}

/// Decode one binary-protocol value by its column type.
///
/// Sub-64-bit unsigned integers are reinterpreted as their signed
/// same-width twins (interpretation is left to the application); unsigned
/// BIGINT is clamped into `i64`.
fn decode_binary_value(reader: &mut PacketReader<'_>, col: &ColumnDef) -> Result<Value> {
    let truncated = || {
        Error::cast(format!(
            "binary value truncated in column '{}'",
            col.name
        ))
    };

    let value = match col.column_type {
        FieldType::Tiny => Value::TinyInt(reader.read_u8().ok_or_else(truncated)? as i8),
        FieldType::Short | FieldType::Year => {
            Value::SmallInt(reader.read_u16_le().ok_or_else(truncated)? as i16)
        }
        FieldType::Long | FieldType::Int24 => {
            Value::Int(reader.read_u32_le().ok_or_else(truncated)? as i32)
        }
        FieldType::LongLong => {
            let raw = reader.read_u64_le().ok_or_else(truncated)?;
            if col.is_unsigned() {
                Value::from_u64_clamped(raw)
            } else {
                Value::BigInt(raw as i64)
            }
        }

        FieldType::Float => {
            let bytes = reader.read_bytes(4).ok_or_else(truncated)?;
            Value::Float(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        }
        FieldType::Double => {
            let bytes = reader.read_bytes(8).ok_or_else(truncated)?;
            let mut buf = [0u8; 8];
            buf.copy_from_slice(bytes);
            Value::Double(f64::from_le_bytes(buf))
        }

        FieldType::Date | FieldType::NewDate => decode_binary_date(reader, col)?,
        FieldType::Time | FieldType::Time2 => decode_binary_time(reader, col)?,
        FieldType::DateTime
        | FieldType::Timestamp
        | FieldType::DateTime2
        | FieldType::Timestamp2 => decode_binary_datetime(reader, col)?,

        FieldType::TinyBlob
        | FieldType::MediumBlob
        | FieldType::LongBlob
        | FieldType::Blob
        | FieldType::Geometry
        | FieldType::Bit => Value::Bytes(
            reader
                .read_lenenc_bytes()
                .ok_or_else(truncated)?
                .to_vec(),
        ),

        FieldType::Json => {
            let data = reader.read_lenenc_bytes().ok_or_else(truncated)?;
            let text = String::from_utf8_lossy(data);
            serde_json::from_str(&text).map(Value::Json).map_err(|_| {
                Error::cast(format!("malformed JSON in column '{}'", col.name))
            })?
        }

        FieldType::Decimal | FieldType::NewDecimal => {
            let data = reader.read_lenenc_bytes().ok_or_else(truncated)?;
            Value::Decimal(String::from_utf8_lossy(data).into_owned())
        }

        FieldType::Null => Value::Null,

        _ => {
            let data = reader.read_lenenc_bytes().ok_or_else(truncated)?;
            Value::Text(String::from_utf8_lossy(data).into_owned())
        }
    };

    Ok(value)
}

/// Binary DATE: length byte 0 (zero date) or 4 (year, month, day).
fn decode_binary_date(reader: &mut PacketReader<'_>, col: &ColumnDef) -> Result<Value> {
    let malformed = || Error::cast(format!("malformed binary date in column '{}'", col.name));

    let len = reader.read_u8().ok_or_else(malformed)?;
    match len {
        0 => Ok(Value::Text("0000-00-00".to_string())),
        4 | 7 | 11 => {
            let bytes = reader.read_bytes(len as usize).ok_or_else(malformed)?;
            let year = u16::from_le_bytes([bytes[0], bytes[1]]);
            Ok(Value::Text(format!(
                "{year:04}-{:02}-{:02}",
                bytes[2], bytes[3]
            )))
        }
        _ => Err(malformed()),
    }
}

/// Binary TIME: length byte 0, 8, or 12 (with microseconds).
fn decode_binary_time(reader: &mut PacketReader<'_>, col: &ColumnDef) -> Result<Value> {
    let malformed = || Error::cast(format!("malformed binary time in column '{}'", col.name));

    let len = reader.read_u8().ok_or_else(malformed)?;
    match len {
        0 => Ok(Value::Text("00:00:00".to_string())),
        8 | 12 => {
            let bytes = reader.read_bytes(len as usize).ok_or_else(malformed)?;
            let negative = bytes[0] != 0;
            let days = u32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
            let hours = days * 24 + u32::from(bytes[5]);
            let sign = if negative { "-" } else { "" };
            let mut text = format!("{sign}{hours:02}:{:02}:{:02}", bytes[6], bytes[7]);
            if len == 12 {
                let micros = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
                text.push_str(&format!(".{micros:06}"));
            }
            Ok(Value::Text(text))
        }
        _ => Err(malformed()),
    }
}

/// Binary DATETIME/TIMESTAMP: length byte 0, 4, 7, or 11.
fn decode_binary_datetime(reader: &mut PacketReader<'_>, col: &ColumnDef) -> Result<Value> {
    let malformed = || Error::cast(format!("malformed binary datetime in column '{}'", col.name));

    let len = reader.read_u8().ok_or_else(malformed)?;
    if !matches!(len, 0 | 4 | 7 | 11) {
        return Err(malformed());
    }
    if len == 0 {
        return Ok(Value::Text("0000-00-00 00:00:00".to_string()));
    }

    let bytes = reader.read_bytes(len as usize).ok_or_else(malformed)?;
    let year = u16::from_le_bytes([bytes[0], bytes[1]]);
    let (month, day) = (bytes[2], bytes[3]);

    let text = match len {
        4 => format!("{year:04}-{month:02}-{day:02} 00:00:00"),
        7 => format!(
            "{year:04}-{month:02}-{day:02} {:02}:{:02}:{:02}",
            bytes[4], bytes[5], bytes[6]
        ),
        _ => {
            let micros = u32::from_le_bytes([bytes[7], bytes[8], bytes[9], bytes[10]]);
            format!(
                "{year:04}-{month:02}-{day:02} {:02}:{:02}:{:02}.{micros:06}",
                bytes[4], bytes[5], bytes[6]
            )
        }
    };
    Ok(Value::Text(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlwire_core::ErrorKind;

    fn column(name: &str, column_type: FieldType, flags: u16) -> ColumnDef {
        ColumnDef {
            catalog: "def".to_string(),
            schema: "test".to_string(),
            table: "t".to_string(),
            org_table: "t".to_string(),
            name: name.to_string(),
            org_name: name.to_string(),
            charset: 255,
            column_length: 11,
            column_type,
            flags,
            decimals: 0,
        }
    }

    /// Encode a text row out of lenenc fields (None = NULL).
    fn text_row(fields: &[Option<&[u8]>]) -> Vec<u8> {
        let mut payload = Vec::new();
        for field in fields {
            match field {
                None => payload.push(NULL_MARKER),
                Some(data) => {
                    payload.push(data.len() as u8);
                    payload.extend_from_slice(data);
                }
            }
        }
        payload
    }

    #[test]
    fn field_type_roundtrip() {
        assert_eq!(FieldType::from_u8(0x01), FieldType::Tiny);
        assert_eq!(FieldType::from_u8(0x03), FieldType::Long);
        assert_eq!(FieldType::from_u8(0x08), FieldType::LongLong);
        assert_eq!(FieldType::from_u8(0xF5), FieldType::Json);
        assert_eq!(FieldType::from_u8(0xFC), FieldType::Blob);
        // unknown code falls back to string
        assert_eq!(FieldType::from_u8(0x42), FieldType::String);
    }

    #[test]
    fn column_def_parse() {
        let mut payload = Vec::new();
        for s in ["def", "test", "users", "users", "id", "id"] {
            payload.push(s.len() as u8);
            payload.extend_from_slice(s.as_bytes());
        }
        payload.push(0x0C); // fixed-length fields marker
        payload.extend_from_slice(&63u16.to_le_bytes()); // charset
        payload.extend_from_slice(&11u32.to_le_bytes()); // length
        payload.push(0x03); // INT
        payload.extend_from_slice(
            &(column_flags::NOT_NULL | column_flags::PRIMARY_KEY | column_flags::UNSIGNED)
                .to_le_bytes(),
        );
        payload.push(0); // decimals

        let col = ColumnDef::parse(&payload).unwrap();
        assert_eq!(col.name, "id");
        assert_eq!(col.table, "users");
        assert_eq!(col.column_type, FieldType::Long);
        assert!(col.is_unsigned());
        assert!(col.is_not_null());
    }

    #[test]
    fn column_def_truncated() {
        let err = ColumnDef::parse(&[0x03, b'd', b'e']).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Protocol);
    }

    #[test]
    fn text_row_casts_by_type() {
        let columns = [
            column("n", FieldType::Long, 0),
            column("f", FieldType::Double, 0),
            column("s", FieldType::VarChar, 0),
        ];
        let payload = text_row(&[Some(b"-42"), Some(b"2.5"), Some(b"hello")]);
        let values = decode_text_row(&payload, &columns, true).unwrap();
        assert_eq!(values[0], Value::Int(-42));
        assert_eq!(values[1], Value::Double(2.5));
        assert_eq!(values[2], Value::Text("hello".to_string()));
    }

    #[test]
    fn text_null_is_semantic_null() {
        let columns = [column("s", FieldType::VarChar, 0)];
        // NULL marker, not an empty string
        let values = decode_text_row(&text_row(&[None]), &columns, true).unwrap();
        assert_eq!(values[0], Value::Null);

        // and an actual empty string stays a string
        let values = decode_text_row(&text_row(&[Some(b"")]), &columns, true).unwrap();
        assert_eq!(values[0], Value::Text(String::new()));
    }

    #[test]
    fn text_row_without_cast_stays_raw() {
        let columns = [column("n", FieldType::Long, 0)];
        let values = decode_text_row(&text_row(&[Some(b"42")]), &columns, false).unwrap();
        assert_eq!(values[0], Value::Text("42".to_string()));
    }

    #[test]
    fn text_unsigned_bigint_clamps() {
        let columns = [column("n", FieldType::LongLong, column_flags::UNSIGNED)];
        let payload = text_row(&[Some(u64::MAX.to_string().as_bytes())]);
        let values = decode_text_row(&payload, &columns, true).unwrap();
        assert_eq!(values[0], Value::BigInt(i64::MAX));
    }

    #[test]
    fn text_cast_failure_is_cast_error() {
        let columns = [column("n", FieldType::Long, 0)];
        let err = decode_text_row(&text_row(&[Some(b"not-a-number")]), &columns, true).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Cast);
        assert!(err.is_client_error());
    }

    #[test]
    fn binary_row_with_null_bitmap() {
        let columns = [
            column("a", FieldType::Long, 0),
            column("b", FieldType::VarChar, 0),
            column("c", FieldType::Tiny, 0),
        ];

        let mut payload = vec![0x00];
        // bitmap: column 1 (bit 3 with offset 2) is NULL
        payload.push(0b0000_1000);
        payload.extend_from_slice(&7i32.to_le_bytes());
        payload.push(0xFE); // -2 as i8

        let values = decode_binary_row(&payload, &columns).unwrap();
        assert_eq!(values[0], Value::Int(7));
        assert_eq!(values[1], Value::Null);
        assert_eq!(values[2], Value::TinyInt(-2));
    }

    #[test]
    fn binary_temporal_values() {
        let columns = [
            column("d", FieldType::Date, 0),
            column("t", FieldType::Time, 0),
            column("dt", FieldType::DateTime, 0),
        ];

        let mut payload = vec![0x00, 0x00];
        // DATE 2024-02-29
        payload.push(4);
        payload.extend_from_slice(&2024u16.to_le_bytes());
        payload.extend_from_slice(&[2, 29]);
        // TIME +26:03:04 (1 day + 2h)
        payload.push(8);
        payload.push(0); // positive
        payload.extend_from_slice(&1u32.to_le_bytes());
        payload.extend_from_slice(&[2, 3, 4]);
        // DATETIME 2024-02-29 12:34:56
        payload.push(7);
        payload.extend_from_slice(&2024u16.to_le_bytes());
        payload.extend_from_slice(&[2, 29, 12, 34, 56]);

        let values = decode_binary_row(&payload, &columns).unwrap();
        assert_eq!(values[0], Value::Text("2024-02-29".to_string()));
        assert_eq!(values[1], Value::Text("26:03:04".to_string()));
        assert_eq!(values[2], Value::Text("2024-02-29 12:34:56".to_string()));
    }

    #[test]
    fn binary_zero_date() {
        let columns = [column("d", FieldType::Date, 0)];
        let payload = vec![0x00, 0x00, 0]; // length 0 = zero date
        let values = decode_binary_row(&payload, &columns).unwrap();
        assert_eq!(values[0], Value::Text("0000-00-00".to_string()));
    }

    #[test]
    fn malformed_binary_date_is_cast_error() {
        let columns = [column("d", FieldType::Date, 0)];
        // length byte claims 5, which no DATE encoding uses
        let payload = vec![0x00, 0x00, 5, 1, 2, 3, 4, 5];
        let err = decode_binary_row(&payload, &columns).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Cast);
    }

    #[test]
    fn binary_unsigned_bigint_clamps() {
        let columns = [column("n", FieldType::LongLong, column_flags::UNSIGNED)];
        let mut payload = vec![0x00, 0x00];
        payload.extend_from_slice(&u64::MAX.to_le_bytes());
        let values = decode_binary_row(&payload, &columns).unwrap();
        assert_eq!(values[0], Value::BigInt(i64::MAX));
    }

    #[test]
    fn binary_floats() {
        let columns = [
            column("f", FieldType::Float, 0),
            column("d", FieldType::Double, 0),
        ];
        let mut payload = vec![0x00, 0x00];
        payload.extend_from_slice(&1.5f32.to_le_bytes());
        payload.extend_from_slice(&(-2.25f64).to_le_bytes());
        let values = decode_binary_row(&payload, &columns).unwrap();
        assert_eq!(values[0], Value::Float(1.5));
        assert_eq!(values[1], Value::Double(-2.25));
    }
}
