//! Secure types for handling secret values and their rotation metadata.
//!
//! [`SecureValue`] prevents accidental exposure of secrets through logging,
//! debugging, or serialization. [`SecretSet`] is the unit the cache swaps
//! atomically: every logical name fetched from one store secret.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::error::{Result, SecretsError};

/// Fixed placeholder rendered instead of a secret value.
pub const REDACTION_MARKER: &str = "[SECURE_SECRET]";

/// A string wrapper that redacts its contents in Debug, Display, and serialization.
///
/// # Security
///
/// - Debug output shows `SecureValue([SECURE_SECRET])`
/// - Display output shows `[SECURE_SECRET]`
/// - Serialization outputs `"[SECURE_SECRET]"` (NEVER the actual value)
/// - **Memory is securely zeroed when dropped** (via `zeroize` crate)
/// - The raw value is only reachable through [`SecureValue::reveal`]
///
/// # Example
///
/// ```rust
/// use vigil::secrets::SecureValue;
///
/// let password = SecureValue::new("hunter2");
/// assert_eq!(format!("{}", password), "[SECURE_SECRET]");
/// assert_eq!(password.reveal(), "hunter2");
/// ```
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecureValue(String);

impl SecureValue {
    /// Wraps a freshly fetched secret value.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Exposes the underlying secret value.
    ///
    /// # Security Warning
    ///
    /// Only call this where the raw value is actually needed (building a
    /// connection string, signing a request). Never log or print the result.
    pub fn reveal(&self) -> &str {
        &self.0
    }

    /// Returns the length of the secret without exposing the value.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the secret is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for SecureValue {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // SECURITY: Never serialize the actual secret value
        serializer.serialize_str(REDACTION_MARKER)
    }
}

impl fmt::Debug for SecureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecureValue({})", REDACTION_MARKER)
    }
}

impl fmt::Display for SecureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTION_MARKER)
    }
}

impl PartialEq for SecureValue {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for SecureValue {}

impl From<String> for SecureValue {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecureValue {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Logical group of secrets tracked by the lifecycle manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretGroup {
    /// Application configuration secrets (API keys, hosts, feature tokens)
    AppConfig,
    /// Database credentials, usually the rotation-tracked secret
    Database,
}

impl SecretGroup {
    /// Every tracked group, in refresh order.
    pub const ALL: [SecretGroup; 2] = [SecretGroup::AppConfig, SecretGroup::Database];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AppConfig => "app_config",
            Self::Database => "database",
        }
    }
}

impl FromStr for SecretGroup {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "app_config" | "app" => Ok(Self::AppConfig),
            "database" | "db" => Ok(Self::Database),
            other => Err(format!("Unknown secret group: {}", other)),
        }
    }
}

impl fmt::Display for SecretGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a secret lives in the external store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SecretLocation {
    pub name: String,
    pub region: String,
}

impl SecretLocation {
    pub fn new(name: impl Into<String>, region: impl Into<String>) -> Self {
        Self { name: name.into(), region: region.into() }
    }
}

impl fmt::Display for SecretLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.region)
    }
}

/// Rotation timestamps reported by the store for one secret.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RotationMetadata {
    /// When the store last replaced the secret value
    pub last_rotated_at: Option<DateTime<Utc>>,
    /// When the store expects to rotate it next
    pub next_rotation_at: Option<DateTime<Utc>>,
}

impl RotationMetadata {
    pub fn new(
        last_rotated_at: Option<DateTime<Utc>>,
        next_rotation_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self { last_rotated_at, next_rotation_at }
    }
}

/// All logical secrets fetched from one store secret.
///
/// Immutable once built; a refresh produces a new set that replaces this one
/// wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct SecretSet {
    values: HashMap<String, SecureValue>,
    fetched_at: DateTime<Utc>,
}

impl SecretSet {
    pub fn new(values: HashMap<String, SecureValue>) -> Self {
        Self { values, fetched_at: Utc::now() }
    }

    /// Build a set from plain key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(
            pairs.into_iter().map(|(k, v)| (k.into(), SecureValue::new(v.into()))).collect(),
        )
    }

    pub fn get(&self, name: &str) -> Option<&SecureValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Logical names in this set, sorted for stable output.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.values.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SecureValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }
}

/// Parse a JSON object payload into a [`SecretSet`].
///
/// String values are kept verbatim, numbers and booleans keep their JSON
/// text, `null` entries are skipped. Nested arrays or objects are rejected.
pub fn parse_secret_payload(name: &str, payload: &str) -> Result<SecretSet> {
    let parsed: serde_json::Value = serde_json::from_str(payload)
        .map_err(|e| SecretsError::malformed(name, format!("invalid JSON: {}", e)))?;

    let object = match parsed {
        serde_json::Value::Object(map) => map,
        _ => return Err(SecretsError::malformed(name, "payload is not a JSON object")),
    };

    let mut values = HashMap::with_capacity(object.len());
    for (key, value) in object {
        let text = match value {
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Null => continue,
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                return Err(SecretsError::malformed(
                    name,
                    format!("key '{}' holds a nested value", key),
                ));
            }
        };
        values.insert(key, SecureValue::new(text));
    }

    Ok(SecretSet::new(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_secure_value_redacts_debug() {
        let secret = SecureValue::new("super-secret-value");
        let debug_output = format!("{:?}", secret);

        assert_eq!(debug_output, "SecureValue([SECURE_SECRET])");
        assert!(!debug_output.contains("super-secret"));
    }

    #[test]
    fn test_secure_value_redacts_display() {
        let secret = SecureValue::new("super-secret-value");
        assert_eq!(secret.to_string(), REDACTION_MARKER);
    }

    #[test]
    fn test_secure_value_serialization_redacts() {
        let secret = SecureValue::new("super-secret-value");
        let json = serde_json::to_string(&secret).unwrap();

        assert_eq!(json, "\"[SECURE_SECRET]\"");
        assert!(!json.contains("super-secret"));
    }

    #[test]
    fn test_secure_value_not_in_struct_json() {
        #[derive(Serialize)]
        struct Row {
            public_field: String,
            secret_field: SecureValue,
        }

        let row = Row {
            public_field: "visible".to_string(),
            secret_field: SecureValue::new("hidden-password"),
        };

        let json = serde_json::to_string(&row).unwrap();
        assert!(json.contains("visible"));
        assert!(json.contains(REDACTION_MARKER));
        assert!(!json.contains("hidden-password"));
    }

    #[test]
    fn test_secure_value_empty_and_marker_inputs() {
        let empty = SecureValue::new("");
        assert_eq!(empty.to_string(), REDACTION_MARKER);
        assert!(empty.is_empty());
        assert_eq!(empty.reveal(), "");

        let marker = SecureValue::new(REDACTION_MARKER);
        assert_eq!(marker.to_string(), REDACTION_MARKER);
        assert_eq!(marker.reveal(), REDACTION_MARKER);
    }

    #[test]
    fn test_secret_set_keys_sorted() {
        let set = SecretSet::from_pairs([("DB_USER", "app"), ("API_KEY", "k"), ("DB_HOST", "h")]);
        assert_eq!(set.keys(), vec!["API_KEY", "DB_HOST", "DB_USER"]);
        assert_eq!(set.len(), 3);
        assert_eq!(set.get("API_KEY").map(SecureValue::reveal), Some("k"));
    }

    #[test]
    fn test_secret_set_debug_is_redacted() {
        let set = SecretSet::from_pairs([("password", "pa55word")]);
        let debug = format!("{:?}", set);
        assert!(debug.contains("password"));
        assert!(!debug.contains("pa55word"));
    }

    #[test]
    fn test_parse_payload_scalars() {
        let set = parse_secret_payload(
            "db",
            r#"{"username":"app","password":"p","port":5432,"ssl":true,"replica":null}"#,
        )
        .unwrap();

        assert_eq!(set.get("port").unwrap().reveal(), "5432");
        assert_eq!(set.get("ssl").unwrap().reveal(), "true");
        assert!(!set.contains("replica"));
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn test_parse_payload_rejects_non_object() {
        let err = parse_secret_payload("db", r#"["a","b"]"#).unwrap_err();
        assert!(matches!(err, SecretsError::Malformed { .. }));

        let err = parse_secret_payload("db", "not json").unwrap_err();
        assert!(matches!(err, SecretsError::Malformed { .. }));
    }

    #[test]
    fn test_parse_payload_rejects_nested() {
        let err = parse_secret_payload("db", r#"{"hosts":["a","b"]}"#).unwrap_err();
        assert_eq!(err.kind(), "malformed_secret");
        assert!(err.to_string().contains("hosts"));
    }

    #[test]
    fn test_secret_group_parsing() {
        assert_eq!("database".parse::<SecretGroup>().unwrap(), SecretGroup::Database);
        assert_eq!("APP_CONFIG".parse::<SecretGroup>().unwrap(), SecretGroup::AppConfig);
        assert!("cache".parse::<SecretGroup>().is_err());
        assert_eq!(SecretGroup::Database.to_string(), "database");
    }

    proptest! {
        #[test]
        fn prop_default_rendering_is_always_marker(raw in any::<String>()) {
            let value = SecureValue::new(raw.clone());
            prop_assert_eq!(value.to_string(), REDACTION_MARKER);
            prop_assert_eq!(format!("{:?}", value), format!("SecureValue({})", REDACTION_MARKER));
            prop_assert_eq!(
                serde_json::to_string(&value).unwrap(),
                format!("\"{}\"", REDACTION_MARKER)
            );
        }

        #[test]
        fn prop_reveal_round_trips(raw in any::<String>()) {
            let value = SecureValue::new(raw.clone());
            prop_assert_eq!(value.reveal(), raw.as_str());
        }
    }
}
