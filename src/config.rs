//! Engine configuration.
//!
//! The configuration is fixed when an engine is built and never changes afterwards.
//! It can be loaded from a JSON document using the same keys as the pipeline's
//! plugin settings, or assembled in code:
//!
//! ```
//! use geoipenrich::config::{DatabaseVendor, EnrichmentConfig, SchemaMode};
//!
//! let config = EnrichmentConfig::default()
//!     .with_enabled(true)
//!     .with_vendor(DatabaseVendor::MaxMind)
//!     .with_city_db("/usr/share/GeoIP/GeoLite2-City.mmdb")
//!     .with_locale("de");
//! assert_eq!(config.schema_mode(), SchemaMode::Strict);
//! ```

use std::fmt;
use std::fs;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Which database layout the lookup backends read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseVendor {
    /// GeoIP2 / GeoLite2 City and ASN databases.
    #[default]
    #[serde(rename = "MAXMIND")]
    MaxMind,
    /// IPinfo location and ASN databases.
    #[serde(rename = "IPINFO")]
    IpInfo,
}

impl fmt::Display for DatabaseVendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseVendor::MaxMind => f.write_str("MAXMIND"),
            DatabaseVendor::IpInfo => f.write_str("IPINFO"),
        }
    }
}

impl FromStr for DatabaseVendor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "maxmind" => Ok(DatabaseVendor::MaxMind),
            "ipinfo" => Ok(DatabaseVendor::IpInfo),
            _ => Err(Error::UnknownVendor { name: s.to_string() }),
        }
    }
}

/// Output naming scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaMode {
    /// Any field may be enriched; older, flat output names.
    Legacy,
    /// Only well-known schema fields are enriched, under fixed prefixes.
    Strict,
}

/// Immutable engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Master switch; a disabled configuration yields a no-op engine.
    pub enabled: bool,
    pub enforce_graylog_schema: bool,
    pub db_vendor_type: DatabaseVendor,
    /// Location database. Empty means "no location backend".
    pub city_db_path: Utf8PathBuf,
    /// ASN database. Empty means "no ASN backend".
    pub asn_db_path: Utf8PathBuf,
    /// Secondary range table consulted when the location database has no answer.
    pub fallback_range_table_path: Option<Utf8PathBuf>,
    pub city_enabled: bool,
    pub asn_enabled: bool,
    /// Preferred language for display names, falling back to English.
    pub locale: String,
    /// Whether legacy output includes `{prefix}_timezone`.
    pub legacy_timezone: bool,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            enforce_graylog_schema: true,
            db_vendor_type: DatabaseVendor::MaxMind,
            city_db_path: Utf8PathBuf::new(),
            asn_db_path: Utf8PathBuf::new(),
            fallback_range_table_path: None,
            city_enabled: true,
            asn_enabled: true,
            locale: "en".to_string(),
            legacy_timezone: true,
        }
    }
}

impl EnrichmentConfig {
    /// Load and validate a JSON configuration file.
    pub fn from_path(path: impl AsRef<Utf8Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: EnrichmentConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot check on its own.
    pub fn validate(&self) -> Result<()> {
        let locale_ok = !self.locale.is_empty()
            && self
                .locale
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if !locale_ok {
            return Err(Error::InvalidConfig {
                reason: format!("locale {:?} is not a language tag", self.locale),
            });
        }
        Ok(())
    }

    #[inline]
    pub fn schema_mode(&self) -> SchemaMode {
        if self.enforce_graylog_schema {
            SchemaMode::Strict
        } else {
            SchemaMode::Legacy
        }
    }

    /// The location database path, if one is configured and the variant is on.
    pub fn city_db(&self) -> Option<&Utf8Path> {
        non_empty(&self.city_db_path).filter(|_| self.city_enabled)
    }

    /// The ASN database path, if one is configured and the variant is on.
    pub fn asn_db(&self) -> Option<&Utf8Path> {
        non_empty(&self.asn_db_path).filter(|_| self.asn_enabled)
    }

    pub fn fallback_range_table(&self) -> Option<&Utf8Path> {
        self.fallback_range_table_path
            .as_deref()
            .and_then(non_empty)
            .filter(|_| self.city_enabled)
    }

    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_enforce_schema(mut self, enforce: bool) -> Self {
        self.enforce_graylog_schema = enforce;
        self
    }

    #[must_use]
    pub fn with_vendor(mut self, vendor: DatabaseVendor) -> Self {
        self.db_vendor_type = vendor;
        self
    }

    #[must_use]
    pub fn with_city_db(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.city_db_path = path.into();
        self
    }

    #[must_use]
    pub fn with_asn_db(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.asn_db_path = path.into();
        self
    }

    #[must_use]
    pub fn with_fallback_range_table(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.fallback_range_table_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    #[must_use]
    pub fn with_legacy_timezone(mut self, timezone: bool) -> Self {
        self.legacy_timezone = timezone;
        self
    }
}

fn non_empty(path: &Utf8Path) -> Option<&Utf8Path> {
    (!path.as_str().trim().is_empty()).then_some(path)
}
