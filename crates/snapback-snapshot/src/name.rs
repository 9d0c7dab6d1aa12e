//! On-disk naming grammar.
//!
//! ```text
//! live subvolume   {group}                       under the pool directory
//! snapshot         {group}.{timestamp}           under the snapshots directory
//! displaced copy   {group}.BROKEN.{timestamp}    under the pool directory
//! ```
//!
//! `{group}` always starts with [`GROUP_SENTINEL`] and never contains a dot,
//! so names are split at the first dot. Timestamps are accepted in two
//! shapes, `YYYYMMDDTHHMMSS` and `YYYYMMDD_HHMMSS`, and rendered in the
//! underscore shape.

use chrono::{NaiveDateTime, Timelike};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// First character of every group identifier.
pub const GROUP_SENTINEL: char = '@';

/// Marker placed between the group and the timestamp of a displaced copy.
pub const BROKEN_MARKER: &str = "BROKEN";

const PAYLOAD_LEN: usize = 15;
const SEPARATOR_INDEX: usize = 8;

static BROKEN_REGEX: OnceLock<Regex> = OnceLock::new();

fn broken_regex() -> &'static Regex {
    BROKEN_REGEX.get_or_init(|| {
        Regex::new(r"^(?P<origin>.+)\.BROKEN(?:\.(?P<stamp>.*))?$")
            .expect("broken-name pattern compiles")
    })
}

/// Why a directory entry name could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The name has no `.` separating group and timestamp.
    #[error("no '.' separator in {0:?}")]
    MissingSeparator(String),

    /// The group part is empty or does not start with the sentinel.
    #[error("invalid group {0:?}: must start with '{GROUP_SENTINEL}'")]
    InvalidGroup(String),

    /// The timestamp payload matches neither accepted shape.
    #[error("unrecognized timestamp {0:?}")]
    UnrecognizedTimestamp(String),
}

/// Accepted timestamp shapes, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFormat {
    /// `YYYYMMDDTHHMMSS`
    Compact,
    /// `YYYYMMDD_HHMMSS`
    Underscore,
}

impl TimestampFormat {
    pub const ALL: [TimestampFormat; 2] = [TimestampFormat::Compact, TimestampFormat::Underscore];

    fn separator(self) -> u8 {
        match self {
            TimestampFormat::Compact => b'T',
            TimestampFormat::Underscore => b'_',
        }
    }

    fn pattern(self) -> &'static str {
        match self {
            TimestampFormat::Compact => "%Y%m%dT%H%M%S",
            TimestampFormat::Underscore => "%Y%m%d_%H%M%S",
        }
    }

    fn parse(self, payload: &str) -> Option<NaiveDateTime> {
        let bytes = payload.as_bytes();
        if bytes.len() != PAYLOAD_LEN || bytes[SEPARATOR_INDEX] != self.separator() {
            return None;
        }
        let digits_only = bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == SEPARATOR_INDEX || b.is_ascii_digit());
        if !digits_only {
            return None;
        }
        NaiveDateTime::parse_from_str(payload, self.pattern()).ok()
    }
}

/// Point in time with whole-second resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(NaiveDateTime);

impl Timestamp {
    /// Wrap a date-time, dropping any sub-second part.
    pub fn from_datetime(datetime: NaiveDateTime) -> Self {
        Self(datetime.with_nanosecond(0).unwrap_or(datetime))
    }

    /// Decode a timestamp payload, trying each [`TimestampFormat`] in turn.
    pub fn parse(payload: &str) -> Result<Self, DecodeError> {
        TimestampFormat::ALL
            .iter()
            .find_map(|format| format.parse(payload))
            .map(Self)
            .ok_or_else(|| DecodeError::UnrecognizedTimestamp(payload.to_string()))
    }

    pub fn as_datetime(&self) -> NaiveDateTime {
        self.0
    }

    /// Render as `YYYYMMDD_HHMMSS`.
    pub fn to_payload(&self) -> String {
        self.0.format(TimestampFormat::Underscore.pattern()).to_string()
    }

    /// Render as `YYYY-MM-DD HH:MM:SS` for display.
    pub fn to_display(&self) -> String {
        self.0.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_payload())
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(datetime: NaiveDateTime) -> Self {
        Self::from_datetime(datetime)
    }
}

/// Identifier of a family of snapshots (`@`, `@home`, ...).
///
/// Derived from entry names at scan time; never an enumerated set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    /// Validate a group identifier.
    pub fn parse(s: impl Into<String>) -> Result<Self, DecodeError> {
        let s = s.into();
        let valid =
            s.starts_with(GROUP_SENTINEL) && !s.contains(|c: char| matches!(c, '.' | '/' | '\0'));
        if valid {
            Ok(Self(s))
        } else {
            Err(DecodeError::InvalidGroup(s))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The root group is the bare sentinel.
    pub fn is_root(&self) -> bool {
        self.0.len() == GROUP_SENTINEL.len_utf8()
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for GroupId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Split a snapshot name into its group and timestamp.
pub fn decode(name: &str) -> Result<(GroupId, Timestamp), DecodeError> {
    let (group, payload) = name
        .split_once('.')
        .ok_or_else(|| DecodeError::MissingSeparator(name.to_string()))?;
    let group = GroupId::parse(group)?;
    let timestamp = Timestamp::parse(payload)?;
    Ok((group, timestamp))
}

/// Render a snapshot name.
pub fn encode(group: &GroupId, timestamp: Timestamp) -> String {
    format!("{}.{}", group, timestamp.to_payload())
}

/// Name under which a live subvolume is displaced at `now`.
pub fn broken_name(group: &GroupId, now: Timestamp) -> String {
    format!("{}.{}.{}", group, BROKEN_MARKER, now.to_payload())
}

/// A name matching the displaced-copy grammar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokenName {
    /// Full entry name.
    pub name: String,
    /// Everything before `.BROKEN`.
    pub origin: String,
    /// When the copy was displaced, if the trailing timestamp decodes.
    pub displaced_at: Option<Timestamp>,
}

impl BrokenName {
    /// Match `name` against `{anything}.BROKEN[.{anything}]`.
    ///
    /// Only the marker is required; a malformed or missing timestamp still
    /// matches and leaves `displaced_at` empty.
    pub fn parse(name: &str) -> Option<Self> {
        let caps = broken_regex().captures(name)?;
        let origin = caps.name("origin")?.as_str().to_string();
        let displaced_at = caps
            .name("stamp")
            .and_then(|m| Timestamp::parse(m.as_str()).ok());
        Some(Self {
            name: name.to_string(),
            origin,
            displaced_at,
        })
    }
}
