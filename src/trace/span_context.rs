//! Span identity: trace/span ids, flags, trace state and the immutable
//! [`SpanContext`] value that propagates them.

use std::collections::VecDeque;
use std::fmt;
use std::num::ParseIntError;
use std::ops::{BitAnd, BitOr, Not};
use thiserror::Error;

/// Flags that can be set on a [`SpanContext`].
///
/// Only a single flag, [`TraceFlags::SAMPLED`], is currently defined.
#[derive(Clone, Debug, Default, PartialEq, Eq, Copy, Hash)]
pub struct TraceFlags(u8);

impl TraceFlags {
    /// Trace flags with the `sampled` flag cleared.
    pub const NOT_SAMPLED: TraceFlags = TraceFlags(0x00);

    /// Trace flags with the `sampled` flag set.
    ///
    /// Spans that are not sampled are ignored by most tracing backends.
    pub const SAMPLED: TraceFlags = TraceFlags(0x01);

    /// Construct new trace flags.
    pub const fn new(flags: u8) -> Self {
        TraceFlags(flags)
    }

    /// Returns `true` if the `sampled` flag is set.
    pub fn is_sampled(&self) -> bool {
        (*self & TraceFlags::SAMPLED) == TraceFlags::SAMPLED
    }

    /// Returns a copy of the current flags with the `sampled` flag updated.
    pub fn with_sampled(&self, sampled: bool) -> Self {
        if sampled {
            *self | TraceFlags::SAMPLED
        } else {
            *self & !TraceFlags::SAMPLED
        }
    }

    /// Returns the flags as a `u8`.
    pub fn to_u8(self) -> u8 {
        self.0
    }
}

impl BitAnd for TraceFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl BitOr for TraceFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl Not for TraceFlags {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self(!self.0)
    }
}

impl fmt::LowerHex for TraceFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// A 16-byte value which identifies a given trace.
///
/// The id is valid if it contains at least one non-zero byte.
#[derive(Clone, PartialEq, Eq, Copy, Hash)]
pub struct TraceId(u128);

impl TraceId {
    /// The invalid (all-zero) trace id.
    pub const INVALID: TraceId = TraceId(0);

    /// Create a trace id from its representation as a byte array.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        TraceId(u128::from_be_bytes(bytes))
    }

    /// Return the representation of this trace id as a byte array.
    pub const fn to_bytes(self) -> [u8; 16] {
        self.0.to_be_bytes()
    }

    /// Converts a string in base 16 to a trace id.
    pub fn from_hex(hex: &str) -> Result<Self, ParseIntError> {
        u128::from_str_radix(hex, 16).map(TraceId)
    }
}

impl From<u128> for TraceId {
    fn from(value: u128) -> Self {
        TraceId(value)
    }
}

impl fmt::Debug for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{:032x}", self.0))
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{:032x}", self.0))
    }
}

impl fmt::LowerHex for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// An 8-byte value which identifies a given span.
///
/// The id is valid if it contains at least one non-zero byte.
#[derive(Clone, PartialEq, Eq, Copy, Hash)]
pub struct SpanId(u64);

impl SpanId {
    /// The invalid (all-zero) span id.
    pub const INVALID: SpanId = SpanId(0);

    /// Create a span id from its representation as a byte array.
    pub const fn from_bytes(bytes: [u8; 8]) -> Self {
        SpanId(u64::from_be_bytes(bytes))
    }

    /// Return the representation of this span id as a byte array.
    pub const fn to_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    /// Converts a string in base 16 to a span id.
    pub fn from_hex(hex: &str) -> Result<Self, ParseIntError> {
        u64::from_str_radix(hex, 16).map(SpanId)
    }
}

impl From<u64> for SpanId {
    fn from(value: u64) -> Self {
        SpanId(value)
    }
}

impl fmt::Debug for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{:016x}", self.0))
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{:016x}", self.0))
    }
}

impl fmt::LowerHex for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// System-specific configuration data carried alongside a trace, represented
/// as an ordered list of key-value pairs.
///
/// `TraceState` allows multiple tracing systems to participate in the same
/// trace. All mutating operations return a new value; the original is never
/// modified.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct TraceState(Option<VecDeque<(String, String)>>);

/// Error returned by [`TraceState`] operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TraceStateError {
    /// The key contains characters outside the allowed set or is too long.
    #[error("{0} is not a valid trace state key")]
    InvalidKey(String),

    /// The value contains a reserved character or is too long.
    #[error("{0} is not a valid trace state value")]
    InvalidValue(String),
}

impl TraceState {
    /// The default, empty `TraceState`, as a constant.
    pub const NONE: TraceState = TraceState(None);

    const MAX_ENTRY_LEN: usize = 256;

    fn valid_key(key: &str) -> bool {
        if key.is_empty() || key.len() > Self::MAX_ENTRY_LEN {
            return false;
        }
        let bytes = key.as_bytes();
        let simple = |b: u8| {
            b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'_' | b'-' | b'*' | b'/')
        };
        if !bytes[0].is_ascii_lowercase() && !bytes[0].is_ascii_digit() {
            return false;
        }
        // At most one `@` separating a tenant id from a (max 14 byte) vendor
        // suffix, per the W3C tracestate key grammar.
        match key.bytes().filter(|&b| b == b'@').count() {
            0 => bytes.iter().all(|&b| simple(b)),
            1 => {
                let at = key.bytes().position(|b| b == b'@').unwrap_or(0);
                let (tenant, vendor) = (&bytes[..at], &bytes[at + 1..]);
                tenant.iter().all(|&b| simple(b))
                    && !vendor.is_empty()
                    && vendor.len() <= 13
                    && (vendor[0].is_ascii_lowercase() || vendor[0].is_ascii_digit())
                    && vendor.iter().all(|&b| simple(b))
            }
            _ => false,
        }
    }

    fn valid_value(value: &str) -> bool {
        value.len() <= Self::MAX_ENTRY_LEN && !value.contains(',') && !value.contains('=')
    }

    /// Creates a new `TraceState` from the given key-value collection.
    pub fn from_key_value<T, K, V>(entries: T) -> Result<Self, TraceStateError>
    where
        T: IntoIterator<Item = (K, V)>,
        K: ToString,
        V: ToString,
    {
        let entries = entries
            .into_iter()
            .map(|(key, value)| {
                let (key, value) = (key.to_string(), value.to_string());
                if !TraceState::valid_key(&key) {
                    return Err(TraceStateError::InvalidKey(key));
                }
                if !TraceState::valid_value(&value) {
                    return Err(TraceStateError::InvalidValue(value));
                }
                Ok((key, value))
            })
            .collect::<Result<VecDeque<_>, TraceStateError>>()?;

        if entries.is_empty() {
            Ok(TraceState(None))
        } else {
            Ok(TraceState(Some(entries)))
        }
    }

    /// Retrieves the value for a given key, if it exists.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.as_ref().and_then(|entries| {
            entries
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        })
    }

    /// Returns a new `TraceState` with the given key-value pair inserted at
    /// the front. An existing entry for the key is replaced and moved.
    pub fn insert<K, V>(&self, key: K, value: V) -> Result<TraceState, TraceStateError>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let (key, value) = (key.into(), value.into());
        if !TraceState::valid_key(&key) {
            return Err(TraceStateError::InvalidKey(key));
        }
        if !TraceState::valid_value(&value) {
            return Err(TraceStateError::InvalidValue(value));
        }

        let mut state = self.without_entry(&key);
        state
            .0
            .get_or_insert_with(|| VecDeque::with_capacity(1))
            .push_front((key, value));
        Ok(state)
    }

    /// Returns a new `TraceState` with the entry for the given key removed.
    ///
    /// If the key is absent, a clone of the original state is returned.
    pub fn delete<K: Into<String>>(&self, key: K) -> Result<TraceState, TraceStateError> {
        let key = key.into();
        if !TraceState::valid_key(&key) {
            return Err(TraceStateError::InvalidKey(key));
        }
        Ok(self.without_entry(&key))
    }

    fn without_entry(&self, key: &str) -> TraceState {
        let mut state = self.clone();
        if let Some(entries) = state.0.as_mut() {
            entries.retain(|(k, _)| k != key);
        }
        state
    }

    /// Renders the trace state as a `key=value` list delimited by commas.
    pub fn header(&self) -> String {
        self.0
            .as_ref()
            .map(|entries| {
                entries
                    .iter()
                    .map(|(key, value)| format!("{}={}", key, value))
                    .collect::<Vec<String>>()
                    .join(",")
            })
            .unwrap_or_default()
    }
}

/// The immutable, propagatable identity of a span.
///
/// Spans that do not have the `sampled` flag set in their [`TraceFlags`]
/// will be ignored by most tracing backends.
#[derive(Clone, Debug, PartialEq, Hash, Eq)]
pub struct SpanContext {
    trace_id: TraceId,
    span_id: SpanId,
    trace_flags: TraceFlags,
    is_remote: bool,
    trace_state: TraceState,
}

impl SpanContext {
    /// An invalid span context.
    pub const NONE: SpanContext = SpanContext {
        trace_id: TraceId::INVALID,
        span_id: SpanId::INVALID,
        trace_flags: TraceFlags::NOT_SAMPLED,
        is_remote: false,
        trace_state: TraceState::NONE,
    };

    /// Create an invalid empty span context.
    pub fn empty_context() -> Self {
        SpanContext::NONE
    }

    /// Construct a new `SpanContext`.
    pub fn new(
        trace_id: TraceId,
        span_id: SpanId,
        trace_flags: TraceFlags,
        is_remote: bool,
        trace_state: TraceState,
    ) -> Self {
        SpanContext {
            trace_id,
            span_id,
            trace_flags,
            is_remote,
            trace_state,
        }
    }

    /// The [`TraceId`] for this span context.
    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    /// The [`SpanId`] for this span context.
    pub fn span_id(&self) -> SpanId {
        self.span_id
    }

    /// The flags for this span context.
    pub fn trace_flags(&self) -> TraceFlags {
        self.trace_flags
    }

    /// Returns `true` if the context has a non-zero trace id and a non-zero
    /// span id.
    pub fn is_valid(&self) -> bool {
        self.trace_id != TraceId::INVALID && self.span_id != SpanId::INVALID
    }

    /// Returns `true` if the context was propagated from a remote parent.
    pub fn is_remote(&self) -> bool {
        self.is_remote
    }

    /// Returns `true` if the `sampled` trace flag is set.
    pub fn is_sampled(&self) -> bool {
        self.trace_flags.is_sampled()
    }

    /// A reference to this context's [`TraceState`].
    pub fn trace_state(&self) -> &TraceState {
        &self.trace_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_hex_round_trips() {
        let trace_id = TraceId::from(126642714606581564793456114182061442190u128);
        assert_eq!(format!("{}", trace_id), "5f467fe7bf42676c05e20ba4a90e448e");
        assert_eq!(
            TraceId::from_hex("5f467fe7bf42676c05e20ba4a90e448e").unwrap(),
            trace_id
        );

        let span_id = SpanId::from(5508496025762705295u64);
        assert_eq!(format!("{}", span_id), "4c721bf33e3caf8f");
        assert_eq!(SpanId::from_hex("4c721bf33e3caf8f").unwrap(), span_id);
    }

    #[test]
    fn all_zero_ids_are_invalid() {
        assert_eq!(TraceId::from(0), TraceId::INVALID);
        assert_eq!(SpanId::from(0), SpanId::INVALID);
        assert!(!SpanContext::empty_context().is_valid());
        let sc = SpanContext::new(
            TraceId::from(1),
            SpanId::from(1),
            TraceFlags::default(),
            false,
            TraceState::default(),
        );
        assert!(sc.is_valid());
    }

    #[test]
    fn sampled_flag() {
        let flags = TraceFlags::default();
        assert!(!flags.is_sampled());
        assert!(flags.with_sampled(true).is_sampled());
        assert!(!flags.with_sampled(true).with_sampled(false).is_sampled());
    }

    #[test]
    fn trace_state_keys() {
        let cases: Vec<(&'static str, bool)> = vec![
            ("123", true),
            ("bar", true),
            ("foo@bar", true),
            ("foo@0123456789abcdef", false),
            ("foo@012345678", true),
            ("FOO@BAR", false),
            ("", false),
            ("你好", false),
        ];
        for (key, expected) in cases {
            assert_eq!(TraceState::valid_key(key), expected, "key: {:?}", key);
        }
    }

    #[test]
    fn trace_state_insert_is_persistent() {
        let state = TraceState::from_key_value(vec![("foo", "bar")]).unwrap();
        let inserted = state.insert("testkey", "testvalue").unwrap();
        assert!(state.get("testkey").is_none());
        assert_eq!(inserted.get("testkey"), Some("testvalue"));
        // updated entries move to the front
        assert!(inserted.header().starts_with("testkey=testvalue"));
    }

    #[test]
    fn trace_state_delete() {
        let state = TraceState::from_key_value(vec![("foo", "bar"), ("apple", "banana")]).unwrap();
        let deleted = state.delete("apple").unwrap();
        assert!(deleted.get("apple").is_none());
        assert_eq!(deleted.header(), "foo=bar");
    }

    #[test]
    fn trace_state_rejects_invalid_values() {
        assert!(TraceState::NONE.insert("key", "a,b").is_err());
        assert!(TraceState::NONE.insert("key", "a=b").is_err());
    }
}
