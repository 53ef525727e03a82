//! Primitive value codec for the HME wire format.
//!
//! Wire encodings:
//! ```text
//! bool    [0x00 | 0x01]
//! vint    [0ggggggg]* [1sdddddd]     7-bit groups, least significant first;
//!                                    terminal byte carries 6 bits and the sign
//! vuint   [0ggggggg]* [1ddddddd]     as vint, terminal byte carries 7 bits
//! float   [f32 big-endian]
//! vdata   [vuint len][len bytes]
//! string  [vdata of UTF-8]
//! dict    ([string key] ([tag:1 = 1|2][string | dict])* [0x00])* [string ""]
//! ```
//!
//! Composite payloads are described by a schema string with one letter per
//! field: `b` bool, `i` vint, `f` float, `v` vdata, `s` string, `d` dict and
//! `r` raw bytes (the rest of the payload, unprefixed).

use std::collections::BTreeMap;

use thiserror::Error;

/// Errors that can occur while encoding or decoding HME payloads.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The buffer ended before a complete value could be read.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// A variable-length integer does not fit in 64 bits.
    #[error("variable-length integer overflows 64 bits")]
    VarintOverflow,

    /// A string field contained bytes that are not valid UTF-8.
    #[error("string field is not valid UTF-8")]
    InvalidUtf8,

    /// A dictionary item carried a tag other than string (1) or nested dict (2).
    #[error("invalid dictionary item tag: {0}")]
    InvalidDictTag(u8),

    /// The event number at the head of an event payload is not recognized.
    #[error("unknown event kind: {0}")]
    UnknownEventKind(i64),

    /// The command number at the head of a command payload is not recognized.
    #[error("unknown command: {0}")]
    UnknownCommand(i64),

    /// A key event carried an action other than press, repeat or release.
    #[error("unknown key action: {0}")]
    UnknownKeyAction(i64),

    /// The values supplied to [`pack`] do not line up with the schema.
    #[error("schema mismatch at field {index} of '{schema}'")]
    SchemaMismatch { schema: String, index: usize },

    /// The payload could not be parsed (field value out of range, etc.).
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

// ── Values ────────────────────────────────────────────────────────────────────

/// A string-keyed dictionary as carried on the wire.
///
/// Keys are kept sorted so that encoding is deterministic.
pub type Dict = BTreeMap<String, DictValue>;

/// One entry of a [`Dict`].
#[derive(Debug, Clone, PartialEq)]
pub enum DictValue {
    Text(String),
    Dict(Dict),
    /// Several items recorded under the same key.
    List(Vec<DictValue>),
}

impl DictValue {
    /// Returns the text if this entry is a single string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            DictValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for DictValue {
    fn from(s: &str) -> Self {
        DictValue::Text(s.to_string())
    }
}

impl From<String> for DictValue {
    fn from(s: String) -> Self {
        DictValue::Text(s)
    }
}

impl From<Dict> for DictValue {
    fn from(d: Dict) -> Self {
        DictValue::Dict(d)
    }
}

/// One field of a schema-described payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f32),
    Data(Vec<u8>),
    Str(String),
    Dict(Dict),
    Raw(Vec<u8>),
}

impl Value {
    fn matches(&self, code: char) -> bool {
        matches!(
            (code, self),
            ('b', Value::Bool(_))
                | ('i', Value::Int(_))
                | ('f', Value::Float(_))
                | ('v', Value::Data(_))
                | ('s', Value::Str(_))
                | ('d', Value::Dict(_))
                | ('r', Value::Raw(_))
        )
    }
}

// ── Encoding ──────────────────────────────────────────────────────────────────

pub fn write_bool(buf: &mut Vec<u8>, value: bool) {
    buf.push(u8::from(value));
}

/// Appends a signed variable-length integer.
pub fn write_vint(buf: &mut Vec<u8>, value: i64) {
    let mut magnitude = value.unsigned_abs();
    while magnitude > 0x3f {
        buf.push((magnitude & 0x7f) as u8);
        magnitude >>= 7;
    }
    let sign = if value < 0 { 0x40 } else { 0x00 };
    buf.push(magnitude as u8 | sign | 0x80);
}

/// Appends an unsigned variable-length integer.
pub fn write_vuint(buf: &mut Vec<u8>, mut value: u64) {
    while value > 0x7f {
        buf.push((value & 0x7f) as u8);
        value >>= 7;
    }
    buf.push(value as u8 | 0x80);
}

pub fn write_float(buf: &mut Vec<u8>, value: f32) {
    buf.extend_from_slice(&value.to_be_bytes());
}

/// Appends a length-prefixed byte block.
pub fn write_vdata(buf: &mut Vec<u8>, data: &[u8]) {
    write_vuint(buf, data.len() as u64);
    buf.extend_from_slice(data);
}

pub fn write_string(buf: &mut Vec<u8>, s: &str) {
    write_vdata(buf, s.as_bytes());
}

/// Appends a dictionary: keys in ascending order, each followed by its
/// tagged items and a zero byte, closed by an empty key.
pub fn write_dict(buf: &mut Vec<u8>, dict: &Dict) {
    for (key, value) in dict {
        write_string(buf, key);
        match value {
            DictValue::List(items) => {
                for item in items {
                    write_dict_item(buf, item);
                }
            }
            single => write_dict_item(buf, single),
        }
        buf.push(0);
    }
    write_string(buf, "");
}

fn write_dict_item(buf: &mut Vec<u8>, item: &DictValue) {
    match item {
        DictValue::Text(s) => {
            buf.push(1);
            write_string(buf, s);
        }
        DictValue::Dict(d) => {
            buf.push(2);
            write_dict(buf, d);
        }
        // Nested lists have no wire form; their members are flattened into the same key.
        DictValue::List(items) => {
            for inner in items {
                write_dict_item(buf, inner);
            }
        }
    }
}

/// Encodes `values` according to `schema` into a fresh buffer.
///
/// # Errors
///
/// Returns [`ProtocolError::SchemaMismatch`] if the number or kinds of values
/// do not match the schema letters.
pub fn pack(schema: &str, values: &[Value]) -> Result<Vec<u8>, ProtocolError> {
    let mut buf = Vec::new();
    pack_into(&mut buf, schema, values)?;
    Ok(buf)
}

/// Appends `values` encoded according to `schema` to `buf`.
///
/// # Errors
///
/// See [`pack`].
pub fn pack_into(buf: &mut Vec<u8>, schema: &str, values: &[Value]) -> Result<(), ProtocolError> {
    let mismatch = |index| ProtocolError::SchemaMismatch {
        schema: schema.to_string(),
        index,
    };
    if schema.chars().count() != values.len() {
        return Err(mismatch(values.len().min(schema.chars().count())));
    }
    for (index, (code, value)) in schema.chars().zip(values).enumerate() {
        if !value.matches(code) {
            return Err(mismatch(index));
        }
        match value {
            Value::Bool(b) => write_bool(buf, *b),
            Value::Int(i) => write_vint(buf, *i),
            Value::Float(f) => write_float(buf, *f),
            Value::Data(d) => write_vdata(buf, d),
            Value::Str(s) => write_string(buf, s),
            Value::Dict(d) => write_dict(buf, d),
            Value::Raw(r) => buf.extend_from_slice(r),
        }
    }
    Ok(())
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// A forward-only cursor over a decoded chunk payload.
///
/// Every read checks bounds and returns [`ProtocolError::InsufficientData`]
/// instead of panicking on truncated input.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ProtocolError> {
        if self.remaining() < len {
            return Err(ProtocolError::InsufficientData {
                needed: self.pos.saturating_add(len),
                available: self.buf.len(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Advances past `len` bytes without interpreting them.
    pub fn skip(&mut self, len: usize) -> Result<(), ProtocolError> {
        self.take(len).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.take(1)?[0])
    }

    /// Reads a bool; any non-zero byte is `true`.
    pub fn read_bool(&mut self) -> Result<bool, ProtocolError> {
        Ok(self.read_u8()? != 0)
    }

    /// Accumulates 7-bit groups up to and including the terminal byte.
    ///
    /// Returns the magnitude and whether the terminal sign bit was set.
    fn read_varint(&mut self, signed: bool) -> Result<(u64, bool), ProtocolError> {
        let mut acc: u128 = 0;
        let mut shift: u32 = 0;
        loop {
            if shift > 70 {
                return Err(ProtocolError::VarintOverflow);
            }
            let byte = self.read_u8()?;
            if byte & 0x80 != 0 {
                let (group, negative) = if signed {
                    (byte & 0x3f, byte & 0x40 != 0)
                } else {
                    (byte & 0x7f, false)
                };
                acc |= u128::from(group) << shift;
                let magnitude = u64::try_from(acc).map_err(|_| ProtocolError::VarintOverflow)?;
                return Ok((magnitude, negative));
            }
            acc |= u128::from(byte) << shift;
            shift += 7;
        }
    }

    /// Reads a signed variable-length integer.
    pub fn read_vint(&mut self) -> Result<i64, ProtocolError> {
        let (magnitude, negative) = self.read_varint(true)?;
        if negative {
            // 2^63 is representable only as i64::MIN.
            if magnitude > i64::MIN.unsigned_abs() {
                return Err(ProtocolError::VarintOverflow);
            }
            Ok((magnitude as i64).wrapping_neg())
        } else {
            i64::try_from(magnitude).map_err(|_| ProtocolError::VarintOverflow)
        }
    }

    pub fn read_vuint(&mut self) -> Result<u64, ProtocolError> {
        Ok(self.read_varint(false)?.0)
    }

    pub fn read_float(&mut self) -> Result<f32, ProtocolError> {
        let bytes = self.take(4)?;
        Ok(f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_vdata(&mut self) -> Result<Vec<u8>, ProtocolError> {
        let len = self.read_vuint()?;
        let len = usize::try_from(len).map_err(|_| ProtocolError::VarintOverflow)?;
        Ok(self.take(len)?.to_vec())
    }

    pub fn read_string(&mut self) -> Result<String, ProtocolError> {
        String::from_utf8(self.read_vdata()?).map_err(|_| ProtocolError::InvalidUtf8)
    }

    /// Reads a dictionary. A key with one item decodes to that item; a key
    /// with several items decodes to [`DictValue::List`].
    pub fn read_dict(&mut self) -> Result<Dict, ProtocolError> {
        let mut dict = Dict::new();
        loop {
            let key = self.read_string()?;
            if key.is_empty() {
                return Ok(dict);
            }
            let mut items = Vec::new();
            loop {
                match self.read_u8()? {
                    0 => break,
                    1 => items.push(DictValue::Text(self.read_string()?)),
                    2 => items.push(DictValue::Dict(self.read_dict()?)),
                    tag => return Err(ProtocolError::InvalidDictTag(tag)),
                }
            }
            let value = if items.len() == 1 {
                items.remove(0)
            } else {
                DictValue::List(items)
            };
            dict.insert(key, value);
        }
    }

    /// Returns every byte not yet consumed.
    pub fn read_rest(&mut self) -> Vec<u8> {
        let rest = self.buf[self.pos..].to_vec();
        self.pos = self.buf.len();
        rest
    }

    /// Decodes one value per schema letter.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MalformedPayload`] for an unknown schema letter,
    /// or the error of the first field that fails to decode.
    pub fn unpack(&mut self, schema: &str) -> Result<Vec<Value>, ProtocolError> {
        schema
            .chars()
            .map(|code| match code {
                'b' => self.read_bool().map(Value::Bool),
                'i' => self.read_vint().map(Value::Int),
                'f' => self.read_float().map(Value::Float),
                'v' => self.read_vdata().map(Value::Data),
                's' => self.read_string().map(Value::Str),
                'd' => self.read_dict().map(Value::Dict),
                'r' => Ok(Value::Raw(self.read_rest())),
                other => Err(ProtocolError::MalformedPayload(format!(
                    "unknown schema letter '{other}'"
                ))),
            })
            .collect()
    }
}

/// Decodes `schema` from the start of `bytes`. Trailing bytes are ignored.
pub fn unpack(schema: &str, bytes: &[u8]) -> Result<Vec<Value>, ProtocolError> {
    Reader::new(bytes).unpack(schema)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
