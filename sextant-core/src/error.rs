use thiserror::Error;

#[derive(Error, Debug)]
pub enum SextantError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid version '{raw}': {reason}")]
    VersionParseError { raw: String, reason: String },

    #[error("Found more than one resolved migration with version {version}: '{first}' and '{second}'")]
    DuplicateVersion {
        version: String,
        first: String,
        second: String,
    },

    #[error("Resolved migration version {resolved} does not match applied migration version {applied}")]
    VersionMismatch { resolved: String, applied: String },

    #[error("A migration info needs a resolved or an applied migration, got neither")]
    EmptyMigrationInfo,

    #[error("Resolved migration '{script}' (version {version}) has no checksum")]
    MissingChecksum { version: String, script: String },

    #[error("Failed to read snapshot '{path}': {reason}")]
    SnapshotError { path: String, reason: String },

    #[error("Validation failed:\n{0}")]
    ValidationFailed(String),

    #[error("Schema history contains failed migrations that need repair: {versions}")]
    InterventionRequired { versions: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SextantError>;
