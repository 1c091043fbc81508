//! Database, collection and view configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How [`Database::serialize`](crate::Database::serialize) lays out the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerializationMethod {
    /// Compact JSON, documents inline.
    #[default]
    Normal,
    /// Indented JSON, documents inline.
    Pretty,
    /// Metadata and document payloads in separate `$<` delimited segments.
    Destructured,
}

/// Configuration for a [`Database`](crate::Database).
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Whether a background task periodically saves dirty databases.
    pub autosave: bool,

    /// Interval between autosave ticks.
    pub autosave_interval: Duration,

    /// Layout used by `save`.
    pub serialization_method: SerializationMethod,

    /// Whether `Database::open` loads the stored database immediately.
    pub autoload: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            autosave: false,
            autosave_interval: Duration::from_secs(5),
            serialization_method: SerializationMethod::Normal,
            autoload: false,
        }
    }
}

impl DatabaseConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables autosave.
    #[must_use]
    pub const fn autosave(mut self, value: bool) -> Self {
        self.autosave = value;
        self
    }

    /// Sets the autosave interval.
    #[must_use]
    pub const fn autosave_interval(mut self, interval: Duration) -> Self {
        self.autosave_interval = interval;
        self
    }

    /// Sets the serialization method used by `save`.
    #[must_use]
    pub const fn serialization_method(mut self, method: SerializationMethod) -> Self {
        self.serialization_method = method;
        self
    }

    /// Sets whether `Database::open` loads immediately.
    #[must_use]
    pub const fn autoload(mut self, value: bool) -> Self {
        self.autoload = value;
        self
    }
}

/// Options for a [`Collection`](crate::Collection).
///
/// Serialized with the collection so a restored collection keeps its
/// unique constraints, TTL policy and change tracking settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CollectionOptions {
    /// Fields carrying a unique constraint.
    pub unique: Vec<String>,

    /// Fields carrying a binary index. Persisted as part of the
    /// collection's `binaryIndices` instead.
    #[serde(skip)]
    pub indices: Vec<String>,

    /// Maximum document age before the TTL sweep removes it.
    #[serde(with = "opt_duration_ms")]
    pub ttl: Option<Duration>,

    /// Period of the TTL sweep.
    #[serde(with = "opt_duration_ms")]
    pub ttl_interval: Option<Duration>,

    /// Disables the change log.
    pub disable_changes_api: bool,

    /// Disables delta recording of updates in the change log.
    pub disable_delta_changes_api: bool,

    /// Maintain binary indices on every mutation instead of rebuilding lazily.
    pub adaptive_binary_indices: bool,

    /// Skip stamping the `meta` field on stored documents.
    pub disable_meta: bool,
}

impl Default for CollectionOptions {
    fn default() -> Self {
        Self {
            unique: Vec::new(),
            indices: Vec::new(),
            ttl: None,
            ttl_interval: None,
            disable_changes_api: true,
            disable_delta_changes_api: true,
            adaptive_binary_indices: true,
            disable_meta: false,
        }
    }
}

impl CollectionOptions {
    /// Creates options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a unique constraint on `field`.
    #[must_use]
    pub fn unique(mut self, field: impl Into<String>) -> Self {
        self.unique.push(field.into());
        self
    }

    /// Adds a binary index on `field`.
    #[must_use]
    pub fn index(mut self, field: impl Into<String>) -> Self {
        self.indices.push(field.into());
        self
    }

    /// Configures TTL expiry.
    #[must_use]
    pub const fn ttl(mut self, age: Duration, interval: Duration) -> Self {
        self.ttl = Some(age);
        self.ttl_interval = Some(interval);
        self
    }

    /// Enables or disables the change log.
    #[must_use]
    pub const fn changes_api(mut self, enabled: bool) -> Self {
        self.disable_changes_api = !enabled;
        self
    }

    /// Enables or disables delta changes for updates.
    #[must_use]
    pub const fn delta_changes(mut self, enabled: bool) -> Self {
        self.disable_delta_changes_api = !enabled;
        self
    }

    /// Sets adaptive binary index maintenance.
    #[must_use]
    pub const fn adaptive_binary_indices(mut self, value: bool) -> Self {
        self.adaptive_binary_indices = value;
        self
    }

    /// Disables metadata stamping.
    #[must_use]
    pub const fn disable_meta(mut self, value: bool) -> Self {
        self.disable_meta = value;
        self
    }
}

/// Options for a [`DynamicView`](crate::DynamicView).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DynamicViewOptions {
    /// Keep the materialized result current on every mutation.
    pub persistent: bool,
}

impl DynamicViewOptions {
    /// Creates options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets persistence.
    #[must_use]
    pub const fn persistent(mut self, value: bool) -> Self {
        self.persistent = value;
        self
    }
}

mod opt_duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = DatabaseConfig::default();
        assert!(!config.autosave);
        assert_eq!(config.autosave_interval, Duration::from_secs(5));
        assert_eq!(config.serialization_method, SerializationMethod::Normal);
    }

    #[test]
    fn builder_pattern() {
        let config = DatabaseConfig::new()
            .autosave(true)
            .autosave_interval(Duration::from_millis(250))
            .serialization_method(SerializationMethod::Destructured);

        assert!(config.autosave);
        assert_eq!(config.autosave_interval, Duration::from_millis(250));
        assert_eq!(config.serialization_method, SerializationMethod::Destructured);
    }

    #[test]
    fn collection_options_defaults() {
        let options = CollectionOptions::default();
        assert!(options.disable_changes_api);
        assert!(options.adaptive_binary_indices);
        assert!(options.ttl.is_none());
    }

    #[test]
    fn collection_options_serde_uses_millis() {
        let options = CollectionOptions::new()
            .unique("email")
            .index("age")
            .ttl(Duration::from_secs(60), Duration::from_secs(1));
        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["ttl"], 60_000);
        assert_eq!(json["ttlInterval"], 1_000);
        assert!(json.get("indices").is_none());

        let back: CollectionOptions = serde_json::from_value(json).unwrap();
        assert_eq!(back.ttl, Some(Duration::from_secs(60)));
        assert_eq!(back.unique, vec!["email".to_string()]);
        assert!(back.indices.is_empty());
    }
}
