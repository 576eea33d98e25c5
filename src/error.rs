use std::net::IpAddr;

use camino::Utf8PathBuf;

/// Error types for the geoipenrich library.
///
/// None of these ever reach a caller of [`crate::GeoIpResolverEngine::filter`]; they
/// surface from backend construction, lookups and configuration loading, and the
/// engine absorbs them at the resolver boundary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A geo database file could not be opened or is not a valid MMDB file.
    #[error("failed to open database {path}")]
    DatabaseOpen {
        path: Utf8PathBuf,
        #[source]
        source: maxminddb::MaxMindDBError,
    },

    /// The database reader failed while resolving an address.
    #[error("lookup failed for {ip}")]
    Lookup {
        ip: IpAddr,
        #[source]
        source: maxminddb::MaxMindDBError,
    },

    /// A line of the fallback range table is malformed.
    #[error("{path}:{line}: invalid range table entry: {reason}")]
    RangeTable {
        path: Utf8PathBuf,
        line: usize,
        reason: String,
    },

    /// Configuration values are inconsistent.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// The configured database vendor is not supported.
    #[error("unknown database vendor: {name}")]
    UnknownVendor { name: String },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A configuration document failed to parse.
    #[error("invalid configuration document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for Results using the library error.
pub type Result<T> = std::result::Result<T, Error>;
