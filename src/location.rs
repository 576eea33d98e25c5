//! Resolved geo and network-ownership values.

use serde::Serialize;

/// Placeholder a backend uses for "no data" in a string field.
///
/// This is a value, not an error: callers decide per field whether it is worth emitting.
pub const NOT_AVAILABLE: &str = "N/A";

/// Location data for a public address.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoLocationInformation {
    pub latitude: f64,
    pub longitude: f64,
    pub country_iso_code: String,
    pub country_name: String,
    pub city_name: String,
    /// First-level subdivision (state, province, region).
    pub region: String,
    pub time_zone: String,
}

impl GeoLocationInformation {
    /// `"{latitude},{longitude}"` with shortest round-trip float formatting.
    ///
    /// Integral values keep a trailing `.0`, so `0.0` renders as `"0.0,0.0"`.
    #[must_use]
    pub fn coordinates(&self) -> String {
        let mut buf = ryu::Buffer::new();
        let mut out = String::with_capacity(24);
        out.push_str(buf.format(self.latitude));
        out.push(',');
        out.push_str(buf.format(self.longitude));
        out
    }
}

/// Autonomous-system data for a public address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeoAsnInformation {
    /// Decimal AS number without any `AS` prefix.
    pub asn: String,
    pub organization: String,
}

impl GeoAsnInformation {
    pub fn from_number(asn: u32, organization: impl Into<String>) -> Self {
        let mut buf = itoa::Buffer::new();
        GeoAsnInformation {
            asn: buf.format(asn).to_owned(),
            organization: organization.into(),
        }
    }
}

/// True when every name is non-blank and not the [`NOT_AVAILABLE`] placeholder.
#[must_use]
pub fn are_valid_geo_names(names: &[&str]) -> bool {
    names
        .iter()
        .all(|name| !name.trim().is_empty() && !name.eq_ignore_ascii_case(NOT_AVAILABLE))
}
