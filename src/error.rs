use thiserror::Error;

/// Errors reported by [`Store`](crate::store::Store) operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The inserted record (or seed fixture) is not a JSON object
    #[error("invalid entry: expected an object")]
    InvalidEntry,

    /// No collection was ever created under this name
    #[error("entity '{0}' does not exist")]
    EntityNotFound(String),

    /// The collection exists but does not hold a sequence of records
    #[error("entity '{0}' is not an array")]
    EntityNotArray(String),

    /// The next auto-increment key does not fit in an `i64`
    #[error("entity '{collection}' has no key left after {field} = i64::MAX")]
    KeyOverflow { collection: String, field: String },

    #[error("store lock poisoned during {0}")]
    LockPoisoned(&'static str),
}

/// Errors raised while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_messages() {
        assert_eq!(
            StoreError::EntityNotFound("users".to_string()).to_string(),
            "entity 'users' does not exist"
        );
        assert_eq!(
            StoreError::EntityNotArray("settings".to_string()).to_string(),
            "entity 'settings' is not an array"
        );
        assert_eq!(
            StoreError::InvalidEntry.to_string(),
            "invalid entry: expected an object"
        );
    }

    #[test]
    fn test_missing_and_not_array_are_distinct() {
        assert_ne!(
            StoreError::EntityNotFound("t".to_string()),
            StoreError::EntityNotArray("t".to_string())
        );
    }
}
