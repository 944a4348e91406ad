//! Request body and query-string validation.
//!
//! Bodies deserialize into `#[derive(Deserialize)]` structs whose members are
//! [`Field`]s. A `Field` never fails to decode: a wrong type is kept as
//! [`Field::Invalid`] so [`Checks`] can report every bad member in one
//! response. Getters for required values return a placeholder after
//! recording an error; callers must call [`Checks::finish`] before using
//! anything they extracted.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use url::form_urlencoded;
use uuid::Uuid;

use fleet_core::{ApiError, FieldError, Patch};

/// ISO 8601 date or date-time. Dates mean midnight UTC; date-times without
/// an offset are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    if let Ok(at) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(at.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|at| at.and_utc())
}

/// Decode a JSON object body. An empty body is treated as `{}`.
pub fn parse<T: DeserializeOwned + Default>(bytes: &[u8]) -> Result<T, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(value @ Value::Object(_)) => T::deserialize(value)
            .map_err(|_| ApiError::bad_request("INVALID_JSON", "Malformed JSON body")),
        Ok(_) => Err(ApiError::bad_request(
            "VALIDATION",
            "Request body must be a JSON object",
        )),
        Err(_) => Err(ApiError::bad_request("INVALID_JSON", "Malformed JSON body")),
    }
}

/// One member of a request body.
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    Absent,
    Null,
    Valid(T),
    /// Present but not a `T`.
    Invalid(Value),
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Self::Absent
    }
}

impl<T> Field<T> {
    const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// `null` or a blank string.
    fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Invalid(Value::String(s)) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Field<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if value.is_null() {
            return Ok(Self::Null);
        }
        Ok(match T::deserialize(&value) {
            Ok(parsed) => Self::Valid(parsed),
            Err(_) => Self::Invalid(value),
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose<N> {
    Number(N),
    Text(String),
}

/// Integer sent as a JSON number or a numeric string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Int(pub i64);

impl<'de> Deserialize<'de> for Int {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Loose::<i64>::deserialize(deserializer)? {
            Loose::Number(n) => Ok(Self(n)),
            Loose::Text(s) => s.trim().parse().map(Self).map_err(de::Error::custom),
        }
    }
}

/// Decimal sent as a JSON number or a numeric string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Amount(pub f64);

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Loose::<f64>::deserialize(deserializer)? {
            Loose::Number(n) => Ok(Self(n)),
            Loose::Text(s) => s.trim().parse().map(Self).map_err(de::Error::custom),
        }
    }
}

/// A date or date-time accepted by [`parse_timestamp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stamp(pub DateTime<Utc>);

impl<'de> Deserialize<'de> for Stamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw)
            .map(Self)
            .ok_or_else(|| de::Error::custom("invalid date"))
    }
}

/// Collects field errors in the order members are checked.
#[derive(Debug, Default)]
pub struct Checks {
    errors: Vec<FieldError>,
}

impl Checks {
    pub fn new() -> Self {
        Self::default()
    }

    fn reject(&mut self, key: &str, message: &str) {
        self.errors.push(FieldError::new(key, message));
    }

    pub fn required_text(&mut self, key: &str, field: Field<String>, message: &str) -> String {
        match field {
            Field::Valid(s) if !s.trim().is_empty() => s.trim().to_string(),
            _ => {
                self.reject(key, message);
                String::new()
            }
        }
    }

    /// Absent leaves the value unchanged; present must be non-empty.
    pub fn replacement_text(
        &mut self,
        key: &str,
        field: Field<String>,
        message: &str,
    ) -> Option<String> {
        if field.is_absent() {
            return None;
        }
        Some(self.required_text(key, field, message)).filter(|value| !value.is_empty())
    }

    /// Trimmed; empty text counts as absent.
    pub fn optional_text(&mut self, key: &str, field: Field<String>) -> Option<String> {
        match field {
            Field::Valid(s) => Some(s.trim().to_string()).filter(|value| !value.is_empty()),
            Field::Invalid(_) => {
                self.reject(key, "Must be a string");
                None
            }
            Field::Absent | Field::Null => None,
        }
    }

    /// `null` or `""` clears, text sets, absence keeps.
    pub fn text_patch(&mut self, key: &str, field: Field<String>) -> Patch<String> {
        match field {
            Field::Absent => Patch::Keep,
            Field::Null => Patch::Clear,
            Field::Valid(s) if s.trim().is_empty() => Patch::Clear,
            Field::Valid(s) => Patch::Set(s.trim().to_string()),
            Field::Invalid(_) => {
                self.reject(key, "Must be a string");
                Patch::Keep
            }
        }
    }

    /// Loose shape check: one `@`, text on both sides, a dot inside the domain.
    pub fn email(&mut self, key: &str, field: Field<String>, message: &str) -> String {
        let value = self.required_text(key, field, message);
        if value.is_empty() {
            return value;
        }
        let valid = value.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.contains(char::is_whitespace)
        });
        if !valid {
            self.reject(key, message);
        }
        value
    }

    /// Required text of at least `min` characters after trimming.
    pub fn min_length(
        &mut self,
        key: &str,
        field: Field<String>,
        min: usize,
        message: &str,
    ) -> String {
        let value = match field {
            Field::Valid(s) => s.trim().to_string(),
            _ => String::new(),
        };
        if value.chars().count() < min {
            self.reject(key, message);
        }
        value
    }

    /// Anything but a valid value is an error; `fallback` stands in for it.
    pub fn required<T>(&mut self, key: &str, field: Field<T>, fallback: T, message: &str) -> T {
        match field {
            Field::Valid(value) => value,
            _ => {
                self.reject(key, message);
                fallback
            }
        }
    }

    /// Absent and `null` give `None`.
    pub fn optional<T>(&mut self, key: &str, field: Field<T>, message: &str) -> Option<T> {
        match field {
            Field::Valid(value) => Some(value),
            Field::Invalid(_) => {
                self.reject(key, message);
                None
            }
            Field::Absent | Field::Null => None,
        }
    }

    /// `null` or `""` clears, a valid value sets, absence keeps.
    pub fn patch<T>(&mut self, key: &str, field: Field<T>, message: &str) -> Patch<T> {
        if field.is_absent() {
            return Patch::Keep;
        }
        if field.is_blank() {
            return Patch::Clear;
        }
        self.optional(key, field, message)
            .map_or(Patch::Keep, Patch::Set)
    }

    /// Absent, `null` and `""` give `None`.
    pub fn optional_timestamp(
        &mut self,
        key: &str,
        field: Field<Stamp>,
        message: &str,
    ) -> Option<DateTime<Utc>> {
        if field.is_blank() {
            return None;
        }
        self.optional(key, field, message).map(|stamp| stamp.0)
    }

    pub fn required_timestamp(
        &mut self,
        key: &str,
        field: Field<Stamp>,
        message: &str,
    ) -> DateTime<Utc> {
        self.required(key, field, Stamp(DateTime::UNIX_EPOCH), message).0
    }

    pub fn timestamp_patch(
        &mut self,
        key: &str,
        field: Field<Stamp>,
        message: &str,
    ) -> Patch<DateTime<Utc>> {
        match self.patch(key, field, message) {
            Patch::Keep => Patch::Keep,
            Patch::Clear => Patch::Clear,
            Patch::Set(stamp) => Patch::Set(stamp.0),
        }
    }

    pub fn required_uuid(&mut self, key: &str, field: Field<Uuid>, message: &str) -> Uuid {
        self.required(key, field, Uuid::nil(), message)
    }

    /// Absent and `null` give `None`; a negative value is an error.
    pub fn non_negative_int(&mut self, key: &str, field: Field<Int>, message: &str) -> Option<i64> {
        match field {
            Field::Absent | Field::Null => None,
            Field::Valid(Int(value)) if value >= 0 => Some(value),
            Field::Valid(_) | Field::Invalid(_) => {
                self.reject(key, message);
                None
            }
        }
    }

    pub fn int_patch(&mut self, key: &str, field: Field<Int>, message: &str) -> Patch<i64> {
        match field {
            Field::Absent => Patch::Keep,
            Field::Null => Patch::Clear,
            field => self
                .non_negative_int(key, field, message)
                .map_or(Patch::Keep, Patch::Set),
        }
    }

    /// Required, finite and not below zero.
    pub fn non_negative_number(
        &mut self,
        key: &str,
        field: Field<Amount>,
        message: &str,
    ) -> Option<f64> {
        match field {
            Field::Valid(Amount(value)) if value.is_finite() && value >= 0.0 => Some(value),
            _ => {
                self.reject(key, message);
                None
            }
        }
    }

    /// Record a cross-field problem found by the caller.
    pub fn add_error(&mut self, key: &str, message: &str) {
        self.reject(key, message);
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}

/// Decoded query string. The first occurrence of a key wins.
pub struct Query(HashMap<String, String>);

impl Query {
    pub fn parse(raw: Option<&str>) -> Self {
        let mut values = HashMap::new();
        for (key, value) in form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
            values.entry(key.into_owned()).or_insert_with(|| value.into_owned());
        }
        Self(values)
    }

    /// Trimmed, with empty values treated as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    pub fn timestamp(&self, key: &str) -> Result<Option<DateTime<Utc>>, ApiError> {
        self.get(key)
            .map(|raw| parse_timestamp(raw).ok_or_else(|| ApiError::field(key, "Invalid date")))
            .transpose()
    }

    pub fn choice<T>(
        &self,
        key: &str,
        parse: fn(&str) -> Option<T>,
        message: &str,
    ) -> Result<Option<T>, ApiError> {
        self.get(key)
            .map(|raw| parse(raw).ok_or_else(|| ApiError::field(key, message)))
            .transpose()
    }

    pub fn uuid(&self, key: &str, message: &str) -> Result<Option<Uuid>, ApiError> {
        self.get(key)
            .map(|raw| Uuid::parse_str(raw).map_err(|_| ApiError::field(key, message)))
            .transpose()
    }

    pub fn number(&self, key: &str) -> Option<u32> {
        self.get(key).and_then(|raw| raw.parse().ok())
    }
}
