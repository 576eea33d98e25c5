//! Output naming and emission rules.
//!
//! Both schema modes write the same kinds of facts; they differ in field names and in
//! whether low-confidence display names are suppressed. One [`EnrichmentPolicy`] covers
//! both, driven by a per-mode [`FieldNames`] table.
//!
//! | Fact          | Legacy               | Strict                    |
//! |---------------|----------------------|---------------------------|
//! | coordinates   | `{p}_geolocation`    | `{p}_geo_coordinates`     |
//! | country code  | `{p}_country_code`   | `{p}_geo_country_iso`     |
//! | city          | `{p}_city_name`      | `{p}_geo_city`            |
//! | region        | `{p}_region`         | `{p}_geo_region`          |
//! | country name  | `{p}_country`        | `{p}_geo_country` *       |
//! | time zone     | `{p}_timezone` **    | `{p}_geo_timezone`        |
//! | "city, ISO"   | -                    | `{p}_geo_name` *          |
//! | ASN           | -                    | `{p}_as_number`, `{p}_as_organization` |
//!
//! \* only when the names involved are real values, not blank or `N/A`.
//! \*\* only when the legacy time zone field is configured on.

use crate::config::{EnrichmentConfig, SchemaMode};
use crate::fields::mapped_prefix;
use crate::location::{are_valid_geo_names, GeoAsnInformation, GeoLocationInformation};
use crate::record::{FieldValue, Record};

const RESERVED_IP_SUFFIX: &str = "_reserved_ip";

/// Field-name suffixes for one schema mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldNames {
    pub coordinates: &'static str,
    pub country_iso: &'static str,
    pub city: &'static str,
    pub region: &'static str,
    pub country: &'static str,
    pub timezone: &'static str,
    pub geo_name: Option<&'static str>,
    pub as_number: Option<&'static str>,
    pub as_organization: Option<&'static str>,
}

pub const LEGACY_FIELDS: FieldNames = FieldNames {
    coordinates: "_geolocation",
    country_iso: "_country_code",
    city: "_city_name",
    region: "_region",
    country: "_country",
    timezone: "_timezone",
    geo_name: None,
    as_number: None,
    as_organization: None,
};

pub const STRICT_FIELDS: FieldNames = FieldNames {
    coordinates: "_geo_coordinates",
    country_iso: "_geo_country_iso",
    city: "_geo_city",
    region: "_geo_region",
    country: "_geo_country",
    timezone: "_geo_timezone",
    geo_name: Some("_geo_name"),
    as_number: Some("_as_number"),
    as_organization: Some("_as_organization"),
};

/// Decides field names and which resolved values get written.
#[derive(Debug, Clone, Copy)]
pub struct EnrichmentPolicy {
    mode: SchemaMode,
    names: &'static FieldNames,
    emit_timezone: bool,
    suppress_placeholders: bool,
}

impl EnrichmentPolicy {
    /// `legacy_timezone` only matters in legacy mode; strict mode always writes the zone.
    pub fn new(mode: SchemaMode, legacy_timezone: bool) -> Self {
        match mode {
            SchemaMode::Legacy => Self {
                mode,
                names: &LEGACY_FIELDS,
                emit_timezone: legacy_timezone,
                suppress_placeholders: false,
            },
            SchemaMode::Strict => Self {
                mode,
                names: &STRICT_FIELDS,
                emit_timezone: true,
                suppress_placeholders: true,
            },
        }
    }

    pub fn from_config(config: &EnrichmentConfig) -> Self {
        Self::new(config.schema_mode(), config.legacy_timezone)
    }

    #[inline]
    pub fn mode(&self) -> SchemaMode {
        self.mode
    }

    #[inline]
    pub fn field_names(&self) -> &'static FieldNames {
        self.names
    }

    /// ASN data has a home only in the strict schema.
    #[inline]
    pub fn wants_asn(&self) -> bool {
        self.names.as_number.is_some()
    }

    /// Prefix for derived fields of `field`.
    #[inline]
    pub fn prefix<'a>(&self, field: &'a str) -> &'a str {
        match self.mode {
            SchemaMode::Strict => mapped_prefix(field).unwrap_or(field),
            SchemaMode::Legacy => field,
        }
    }

    /// The single marker written for a reserved address.
    pub fn mark_reserved<R: Record>(&self, record: &mut R, prefix: &str) {
        record.add_field(join(prefix, RESERVED_IP_SUFFIX), FieldValue::Bool(true));
    }

    pub fn apply_location<R: Record>(
        &self,
        record: &mut R,
        prefix: &str,
        info: &GeoLocationInformation,
    ) {
        let n = self.names;
        record.add_field(join(prefix, n.coordinates), info.coordinates().into());
        record.add_field(join(prefix, n.country_iso), info.country_iso_code.clone().into());
        record.add_field(join(prefix, n.city), info.city_name.clone().into());
        record.add_field(join(prefix, n.region), info.region.clone().into());

        if !self.suppress_placeholders || are_valid_geo_names(&[info.country_name.as_str()]) {
            record.add_field(join(prefix, n.country), info.country_name.clone().into());
        }

        if self.emit_timezone {
            record.add_field(join(prefix, n.timezone), info.time_zone.clone().into());
        }

        if let Some(suffix) = n.geo_name {
            if are_valid_geo_names(&[info.city_name.as_str(), info.country_iso_code.as_str()]) {
                let name = format!("{}, {}", info.city_name, info.country_iso_code);
                record.add_field(join(prefix, suffix), name.into());
            }
        }
    }

    /// Write ASN fields; a no-op in modes without ASN fields.
    pub fn apply_asn<R: Record>(&self, record: &mut R, prefix: &str, info: &GeoAsnInformation) {
        if let Some(suffix) = self.names.as_organization {
            record.add_field(join(prefix, suffix), info.organization.clone().into());
        }
        if let Some(suffix) = self.names.as_number {
            record.add_field(join(prefix, suffix), info.asn.clone().into());
        }
    }
}

#[inline]
fn join(prefix: &str, suffix: &str) -> String {
    let mut name = String::with_capacity(prefix.len() + suffix.len());
    name.push_str(prefix);
    name.push_str(suffix);
    name
}
