//! Error types for the terminal registry.

use std::path::PathBuf;

use crate::models::ShopId;

/// Result alias used across the crate.
pub type Result<T> = core::result::Result<T, TpeError>;

/// All errors that can occur when using the registry.
#[derive(Debug, thiserror::Error)]
pub enum TpeError {
    /// A value object or terminal record failed validation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A record with the same shop ID is already stored.
    #[error("shop ID {0} already exists")]
    DuplicateShopId(ShopId),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CBOR snapshot encoding or decoding failed.
    #[error("snapshot error: {0}")]
    Snapshot(String),

    /// The persisted data was written by a newer, incompatible schema.
    #[error("unsupported schema version {found} (this build reads up to {supported})")]
    UnsupportedSchema {
        /// Version tag found in the file.
        found: String,
        /// Newest version this build understands.
        supported: String,
    },

    /// Storage backend failed (I/O, missing file, permissions).
    #[error("storage error: {0}")]
    Storage(Box<dyn core::error::Error + Send + Sync>),

    /// The requested file does not exist.
    #[error("file not found: {}", .0.display())]
    MissingFile(PathBuf),

    /// Spreadsheet export failed.
    #[cfg(feature = "xlsx")]
    #[error("export error: {0}")]
    Export(#[from] rust_xlsxwriter::XlsxError),

    /// No user account with the given name exists.
    #[error("unknown user: {0}")]
    UnknownUser(String),

    /// A user account with the given name already exists.
    #[error("user already exists: {0}")]
    UserExists(String),

    /// The user account is deactivated.
    #[error("user is inactive: {0}")]
    InactiveUser(String),

    /// The supplied password does not match.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The operation is not permitted on a built-in account.
    #[error("operation not permitted on protected user {0}")]
    ProtectedUser(String),

    /// Password hashing failed.
    #[error("password hashing error: {0}")]
    PasswordHash(String),
}

/// Reasons a value object or terminal record is rejected at construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A required part was never supplied to the builder.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A required text field is empty or whitespace-only.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// The terminal has no merchant card.
    #[error("at least one merchant card is required")]
    NoCards,

    /// The terminal has more merchant cards than allowed.
    #[error("too many merchant cards: {count} (max {max})")]
    TooManyCards {
        /// Number of cards supplied.
        count: usize,
        /// Maximum allowed.
        max: usize,
    },

    /// A card number is empty or whitespace-only.
    #[error("merchant card number must not be empty")]
    EmptyCardNumber,

    /// A card number exceeds the maximum length.
    #[error("merchant card number too long: {len} characters (max {max})")]
    CardNumberTooLong {
        /// Length in characters.
        len: usize,
        /// Maximum allowed.
        max: usize,
    },

    /// A device serial number exceeds the maximum length.
    #[error("terminal serial number too long: {len} characters (max {max})")]
    SerialTooLong {
        /// Length in characters.
        len: usize,
        /// Maximum allowed.
        max: usize,
    },

    /// The shop ID is negative.
    #[error("shop ID must be zero or positive, got {0}")]
    NegativeShopId(i64),

    /// The shop ID does not fit the key range.
    #[error("shop ID out of range: {0}")]
    ShopIdOutOfRange(i64),

    /// The device count is below one.
    #[error("device count must be at least 1, got {0}")]
    InvalidDeviceCount(i64),

    /// Neither wired nor cellular connectivity is selected.
    #[error("select at least one connectivity type (ethernet or 4/5G)")]
    NoConnectivity,

    /// Wired connectivity is selected without a network configuration.
    #[error("network configuration is required for ethernet terminals")]
    MissingNetworkConfig,

    /// A network address is not a valid dotted quad.
    #[error("invalid {field}: {value}")]
    InvalidAddress {
        /// Which address (IP, mask, gateway).
        field: &'static str,
        /// The rejected value.
        value: String,
    },

    /// The backoffice email is malformed.
    #[error("invalid email: {0}")]
    InvalidEmail(String),

    /// The user role tag is not recognised.
    #[error("unknown role: {0}")]
    UnknownRole(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_from_serde_json() {
        let serde_err = serde_json::from_str::<String>("not json").unwrap_err();
        let err = TpeError::from(serde_err);
        assert!(matches!(err, TpeError::Serialization(_)));
        let msg = err.to_string();
        assert!(msg.contains("serialization error"));
    }

    #[test]
    fn error_from_validation() {
        let err = TpeError::from(ValidationError::NoCards);
        assert!(matches!(err, TpeError::Validation(ValidationError::NoCards)));
        assert!(err.to_string().contains("at least one merchant card"));
    }

    #[test]
    fn error_storage_display() {
        let inner = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = TpeError::Storage(Box::new(inner));
        let msg = err.to_string();
        assert!(msg.contains("storage error"));
        assert!(msg.contains("file missing"));
    }

    #[test]
    fn duplicate_shop_id_display() {
        let err = TpeError::DuplicateShopId(ShopId::new(42));
        assert_eq!(err.to_string(), "shop ID 42 already exists");
    }

    #[test]
    fn unsupported_schema_display() {
        let err = TpeError::UnsupportedSchema {
            found: "9.0".to_owned(),
            supported: "2.0".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("9.0"));
        assert!(msg.contains("2.0"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TpeError>();
    }
}
