//! MMDB-backed lookup backends for the supported database vendors.
//!
//! Both vendors ship memory-mapped MMDB files read through [`maxminddb::Reader`]. The
//! readers are immutable once opened, so lookups take `&self` and need no locking.
//!
//! | Vendor  | Location backend | ASN backend |
//! |---------|------------------|-------------|
//! | MaxMind | [`MaxMindCity`] (GeoIP2/GeoLite2 City) | [`MaxMindAsn`] (GeoLite2 ASN) |
//! | IPinfo  | [`IpInfoLocation`] (standard location) | [`IpInfoAsn`] (ASN) |
//!
//! [`city_resolver`] and [`asn_resolver`] turn an [`EnrichmentConfig`] into ready
//! resolvers. A database that fails to open is logged and leaves its variant disabled.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;

use camino::Utf8Path;
use maxminddb::{geoip2, MaxMindDBError, Mmap, Reader};
use serde_json::Value;
use tracing::{debug, error};

use crate::config::{DatabaseVendor, EnrichmentConfig};
use crate::error::{Error, Result};
use crate::location::{GeoAsnInformation, GeoLocationInformation, NOT_AVAILABLE};
use crate::metrics::ResolveTimer;
use crate::range_table::{RangeTable, WithFallback};
use crate::resolver::{AsnBackend, AsnResolver, CityResolver, LocationBackend, LookupBackend};

const FALLBACK_LOCALE: &str = "en";

fn open_reader(path: &Utf8Path) -> Result<Reader<Mmap>> {
    let reader = Reader::open_mmap(path).map_err(|source| Error::DatabaseOpen {
        path: path.to_owned(),
        source,
    })?;
    debug!(
        path = %path,
        database_type = %reader.metadata.database_type,
        build_epoch = reader.metadata.build_epoch,
        "opened geo database"
    );
    Ok(reader)
}

/// Map reader results so that "address not in database" is `Ok(None)`.
fn found<T>(ip: IpAddr, result: std::result::Result<T, MaxMindDBError>) -> Result<Option<T>> {
    match result {
        Ok(record) => Ok(Some(record)),
        Err(MaxMindDBError::AddressNotFoundError(_)) => Ok(None),
        Err(source) => Err(Error::Lookup { ip, source }),
    }
}

/// Pick a display name: requested locale, then its language, then English.
fn localized(names: Option<&BTreeMap<&str, &str>>, locale: &str) -> String {
    let Some(names) = names else {
        return NOT_AVAILABLE.to_string();
    };
    let language = locale.split(['-', '_']).next().unwrap_or(locale);
    [locale, language, FALLBACK_LOCALE]
        .into_iter()
        .find_map(|key| names.get(key))
        .filter(|name| !name.is_empty())
        .map_or_else(|| NOT_AVAILABLE.to_string(), |name| (*name).to_string())
}

fn or_not_available(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// GeoIP2 / GeoLite2 City database.
#[derive(Debug)]
pub struct MaxMindCity {
    name: String,
    reader: Reader<Mmap>,
    locale: String,
}

impl MaxMindCity {
    pub fn open(path: &Utf8Path, locale: &str) -> Result<Self> {
        Ok(Self {
            name: format!("maxmind-city:{}", path.file_name().unwrap_or(path.as_str())),
            reader: open_reader(path)?,
            locale: locale.to_string(),
        })
    }
}

impl LookupBackend for MaxMindCity {
    type Output = GeoLocationInformation;

    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, ip: IpAddr) -> Result<Option<GeoLocationInformation>> {
        let Some(record) = found(ip, self.reader.lookup::<geoip2::City>(ip))? else {
            return Ok(None);
        };

        let (country_iso_code, country_name) = match &record.country {
            Some(c) => (
                or_not_available(c.iso_code),
                localized(c.names.as_ref(), &self.locale),
            ),
            None => (NOT_AVAILABLE.to_string(), NOT_AVAILABLE.to_string()),
        };

        let city_name = localized(
            record.city.as_ref().and_then(|c| c.names.as_ref()),
            &self.locale,
        );

        let region = localized(
            record
                .subdivisions
                .as_ref()
                .and_then(|s| s.first())
                .and_then(|s| s.names.as_ref()),
            &self.locale,
        );

        let (latitude, longitude, time_zone) = match &record.location {
            Some(loc) => (
                loc.latitude.unwrap_or(0.0),
                loc.longitude.unwrap_or(0.0),
                or_not_available(loc.time_zone),
            ),
            None => (0.0, 0.0, NOT_AVAILABLE.to_string()),
        };

        Ok(Some(GeoLocationInformation {
            latitude,
            longitude,
            country_iso_code,
            country_name,
            city_name,
            region,
            time_zone,
        }))
    }
}

/// GeoLite2 ASN database.
#[derive(Debug)]
pub struct MaxMindAsn {
    name: String,
    reader: Reader<Mmap>,
}

impl MaxMindAsn {
    pub fn open(path: &Utf8Path) -> Result<Self> {
        Ok(Self {
            name: format!("maxmind-asn:{}", path.file_name().unwrap_or(path.as_str())),
            reader: open_reader(path)?,
        })
    }
}

impl LookupBackend for MaxMindAsn {
    type Output = GeoAsnInformation;

    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, ip: IpAddr) -> Result<Option<GeoAsnInformation>> {
        let Some(record) = found(ip, self.reader.lookup::<geoip2::Asn>(ip))? else {
            return Ok(None);
        };
        Ok(record.autonomous_system_number.map(|asn| {
            GeoAsnInformation::from_number(
                asn,
                or_not_available(record.autonomous_system_organization),
            )
        }))
    }
}

/// IPinfo location database. Names are only available in English.
#[derive(Debug)]
pub struct IpInfoLocation {
    name: String,
    reader: Reader<Mmap>,
}

impl IpInfoLocation {
    pub fn open(path: &Utf8Path) -> Result<Self> {
        Ok(Self {
            name: format!("ipinfo-location:{}", path.file_name().unwrap_or(path.as_str())),
            reader: open_reader(path)?,
        })
    }
}

/// IPinfo stores coordinates as strings in some editions and as numbers in others.
fn coordinate(record: &Value, key: &str) -> f64 {
    match record.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn text<'a>(record: &'a Value, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str)
}

impl LookupBackend for IpInfoLocation {
    type Output = GeoLocationInformation;

    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, ip: IpAddr) -> Result<Option<GeoLocationInformation>> {
        let Some(record) = found(ip, self.reader.lookup::<Value>(ip))? else {
            return Ok(None);
        };
        Ok(Some(ipinfo_location(&record)))
    }
}

fn ipinfo_location(record: &Value) -> GeoLocationInformation {
    GeoLocationInformation {
        latitude: coordinate(record, "lat"),
        longitude: coordinate(record, "lng"),
        country_iso_code: or_not_available(text(record, "country")),
        country_name: or_not_available(text(record, "country_name")),
        city_name: or_not_available(text(record, "city")),
        region: or_not_available(text(record, "region")),
        time_zone: or_not_available(text(record, "timezone")),
    }
}

/// IPinfo ASN database.
#[derive(Debug)]
pub struct IpInfoAsn {
    name: String,
    reader: Reader<Mmap>,
}

impl IpInfoAsn {
    pub fn open(path: &Utf8Path) -> Result<Self> {
        Ok(Self {
            name: format!("ipinfo-asn:{}", path.file_name().unwrap_or(path.as_str())),
            reader: open_reader(path)?,
        })
    }
}

impl LookupBackend for IpInfoAsn {
    type Output = GeoAsnInformation;

    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, ip: IpAddr) -> Result<Option<GeoAsnInformation>> {
        let Some(record) = found(ip, self.reader.lookup::<Value>(ip))? else {
            return Ok(None);
        };
        Ok(ipinfo_asn(&record))
    }
}

fn ipinfo_asn(record: &Value) -> Option<GeoAsnInformation> {
    let raw = text(record, "asn")?;
    let digits = raw
        .strip_prefix("AS")
        .or_else(|| raw.strip_prefix("as"))
        .unwrap_or(raw);
    let number: u32 = digits.parse().ok()?;
    let organization = text(record, "name").or_else(|| text(record, "as_name"));
    Some(GeoAsnInformation::from_number(number, or_not_available(organization)))
}

fn open_location(
    vendor: DatabaseVendor,
    path: &Utf8Path,
    locale: &str,
) -> Result<LocationBackend> {
    Ok(match vendor {
        DatabaseVendor::MaxMind => Box::new(MaxMindCity::open(path, locale)?),
        DatabaseVendor::IpInfo => Box::new(IpInfoLocation::open(path)?),
    })
}

fn open_asn(vendor: DatabaseVendor, path: &Utf8Path) -> Result<AsnBackend> {
    Ok(match vendor {
        DatabaseVendor::MaxMind => Box::new(MaxMindAsn::open(path)?),
        DatabaseVendor::IpInfo => Box::new(IpInfoAsn::open(path)?),
    })
}

/// Build the location variant from configuration.
///
/// Never fails: open errors are logged and leave the variant (or its fallback) out.
pub fn city_resolver(config: &EnrichmentConfig, timer: Arc<ResolveTimer>) -> CityResolver {
    let primary = config.city_db().and_then(|path| {
        open_location(config.db_vendor_type, path, &config.locale)
            .map_err(|err| {
                error!(vendor = %config.db_vendor_type, error = %err, "location lookups disabled");
            })
            .ok()
    });

    let fallback = config.fallback_range_table().and_then(|path| {
        RangeTable::open(path)
            .map_err(|err| error!(path = %path, error = %err, "fallback range table disabled"))
            .ok()
    });

    match (primary, fallback) {
        (primary, Some(table)) => {
            CityResolver::new(Box::new(WithFallback::new(primary, table)), timer)
        }
        (Some(primary), None) => CityResolver::new(primary, timer),
        (None, None) => CityResolver::disabled(timer),
    }
}

/// Build the ASN variant from configuration.
///
/// Never fails: an open error is logged and leaves the variant disabled.
pub fn asn_resolver(config: &EnrichmentConfig, timer: Arc<ResolveTimer>) -> AsnResolver {
    let backend = config.asn_db().and_then(|path| {
        open_asn(config.db_vendor_type, path)
            .map_err(|err| {
                error!(vendor = %config.db_vendor_type, error = %err, "ASN lookups disabled");
            })
            .ok()
    });

    match backend {
        Some(backend) => AsnResolver::new(backend, timer),
        None => AsnResolver::disabled(timer),
    }
}
