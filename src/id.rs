//! Record identifiers
//!
//! An id is 18 characters: a 3-character key prefix naming the object, a
//! 12-character body, and a 3-character suffix encoding the upper/lower case
//! pattern of the first 15 characters. The suffix keeps ids unique under
//! case-insensitive comparison. 15-character ids are widened on parse.

use std::fmt;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const BASE62: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const SUFFIX_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ012345";

/// Instance and reserved characters between the key prefix and the sequence
const BODY_PREFIX: &str = "000";
const SEQUENCE_WIDTH: usize = 9;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(String);

impl RecordId {
    /// Parse a 15- or 18-character id. The suffix of an 18-character id is
    /// matched and stored in upper case.
    pub fn parse(value: &str) -> Result<Self, InvalidRecordId> {
        if !value.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(InvalidRecordId(value.to_string()));
        }
        match value.len() {
            15 => Ok(Self(format!("{}{}", value, checksum_suffix(value)))),
            18 => {
                let (base, suffix) = value.split_at(15);
                let suffix = suffix.to_ascii_uppercase();
                if checksum_suffix(base) != suffix {
                    return Err(InvalidRecordId(value.to_string()));
                }
                Ok(Self(format!("{}{}", base, suffix)))
            }
            _ => Err(InvalidRecordId(value.to_string())),
        }
    }

    /// Build the id for the `sequence`-th record of an object
    pub fn from_sequence(key_prefix: &str, sequence: u64) -> Self {
        let base = format!(
            "{}{}{}",
            key_prefix,
            BODY_PREFIX,
            encode_base62(sequence, SEQUENCE_WIDTH)
        );
        let suffix = checksum_suffix(&base);
        Self(base + &suffix)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 3-character object key prefix
    pub fn key_prefix(&self) -> &str {
        &self.0[..3]
    }

    /// The case-sensitive 15-character form
    pub fn to_15(&self) -> &str {
        &self.0[..15]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid record id: {0}")]
pub struct InvalidRecordId(pub String);

fn encode_base62(mut value: u64, width: usize) -> String {
    let mut digits = vec![b'0'; width];
    for slot in digits.iter_mut().rev() {
        *slot = BASE62[(value % 62) as usize];
        value /= 62;
    }
    // width is fixed; callers keep sequences below 62^width
    String::from_utf8_lossy(&digits).into_owned()
}

/// Three characters, one per 5-character chunk, each a bitmap of uppercase positions
fn checksum_suffix(id15: &str) -> String {
    id15.as_bytes()
        .chunks(5)
        .map(|chunk| {
            let bits = chunk
                .iter()
                .enumerate()
                .filter(|(_, b)| b.is_ascii_uppercase())
                .fold(0usize, |acc, (i, _)| acc | (1 << i));
            SUFFIX_ALPHABET[bits] as char
        })
        .collect()
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for RecordId {
    type Err = InvalidRecordId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl ToSql for RecordId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.as_str()))
    }
}

impl FromSql for RecordId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        RecordId::parse(text).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        RecordId::parse(&raw).map_err(serde::de::Error::custom)
    }
}
