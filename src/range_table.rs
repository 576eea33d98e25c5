//! Local fallback table of address ranges.
//!
//! When the location database has no answer for an address, a small hand-maintained table
//! can still supply country and city names. The file holds one range per line:
//!
//! ```text
//! # start_ip,end_ip,country_iso,country_name,region,city
//! 1.0.1.0,1.0.3.255,CN,China,Fujian,Fuzhou
//! 2001:250::,2001:252:ffff:ffff:ffff:ffff:ffff:ffff,CN,China,,
//! ```
//!
//! Empty columns become [`NOT_AVAILABLE`]. The table carries no coordinates or time zone,
//! so answers from it report `0.0,0.0` and a `N/A` time zone.

use std::fs;
use std::net::IpAddr;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::location::{GeoLocationInformation, NOT_AVAILABLE};
use crate::resolver::{LocationBackend, LookupBackend};

#[derive(Debug, Clone)]
struct Entry {
    country_iso_code: String,
    country_name: String,
    region: String,
    city_name: String,
}

/// Sorted, non-overlapping IPv4 and IPv6 ranges.
#[derive(Debug, Default)]
pub struct RangeTable {
    name: String,
    v4: Vec<(u32, u32, usize)>,
    v6: Vec<(u128, u128, usize)>,
    entries: Vec<Entry>,
}

impl RangeTable {
    /// Read and index a range table file.
    pub fn open(path: &Utf8Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let table = Self::parse(path, &text)?;
        info!(
            path = %path,
            ipv4_ranges = table.v4.len(),
            ipv6_ranges = table.v6.len(),
            "loaded fallback range table"
        );
        Ok(table)
    }

    /// Parse table text; `path` is only used for naming and error messages.
    pub fn parse(path: &Utf8Path, text: &str) -> Result<Self> {
        let invalid = |line: usize, reason: String| Error::RangeTable {
            path: Utf8PathBuf::from(path),
            line,
            reason,
        };

        let mut table = RangeTable {
            name: format!("range-table:{}", path.file_name().unwrap_or(path.as_str())),
            ..Default::default()
        };

        for (idx, raw) in text.lines().enumerate() {
            let lineno = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let cols: Vec<&str> = line.split(',').map(str::trim).collect();
            if cols.len() != 6 {
                let reason = format!("expected 6 columns, found {}", cols.len());
                return Err(invalid(lineno, reason));
            }

            let start: IpAddr = cols[0]
                .parse()
                .map_err(|_| invalid(lineno, format!("bad start address {:?}", cols[0])))?;
            let end: IpAddr = cols[1]
                .parse()
                .map_err(|_| invalid(lineno, format!("bad end address {:?}", cols[1])))?;

            let entry = table.entries.len();
            match (start, end) {
                (IpAddr::V4(s), IpAddr::V4(e)) if u32::from(s) <= u32::from(e) => {
                    table.v4.push((s.into(), e.into(), entry));
                }
                (IpAddr::V6(s), IpAddr::V6(e)) if u128::from(s) <= u128::from(e) => {
                    table.v6.push((s.into(), e.into(), entry));
                }
                _ => return Err(invalid(lineno, format!("invalid range {start} - {end}"))),
            }

            table.entries.push(Entry {
                country_iso_code: or_not_available(cols[2]),
                country_name: or_not_available(cols[3]),
                region: or_not_available(cols[4]),
                city_name: or_not_available(cols[5]),
            });
        }

        table.v4.sort_unstable_by_key(|r| r.0);
        table.v6.sort_unstable_by_key(|r| r.0);
        if table.v4.windows(2).any(|w| w[1].0 <= w[0].1) {
            return Err(invalid(0, "overlapping IPv4 ranges".to_string()));
        }
        if table.v6.windows(2).any(|w| w[1].0 <= w[0].1) {
            return Err(invalid(0, "overlapping IPv6 ranges".to_string()));
        }

        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find(&self, ip: IpAddr) -> Option<&Entry> {
        let idx = match ip {
            IpAddr::V4(v4) => find_range(&self.v4, u32::from(v4)),
            IpAddr::V6(v6) => find_range(&self.v6, u128::from(v6)),
        }?;
        self.entries.get(idx)
    }
}

fn find_range<T: Ord + Copy>(ranges: &[(T, T, usize)], ip: T) -> Option<usize> {
    let pos = ranges.partition_point(|r| r.0 <= ip);
    let (_, end, idx) = *ranges.get(pos.checked_sub(1)?)?;
    (ip <= end).then_some(idx)
}

fn or_not_available(s: &str) -> String {
    if s.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        s.to_string()
    }
}

impl LookupBackend for RangeTable {
    type Output = GeoLocationInformation;

    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, ip: IpAddr) -> Result<Option<GeoLocationInformation>> {
        Ok(self.find(ip).map(|e| GeoLocationInformation {
            latitude: 0.0,
            longitude: 0.0,
            country_iso_code: e.country_iso_code.clone(),
            country_name: e.country_name.clone(),
            city_name: e.city_name.clone(),
            region: e.region.clone(),
            time_zone: NOT_AVAILABLE.to_string(),
        }))
    }
}

/// Location backend that asks a range table when the primary source has nothing.
#[derive(Debug)]
pub struct WithFallback {
    name: String,
    primary: Option<LocationBackend>,
    fallback: RangeTable,
}

impl WithFallback {
    pub fn new(primary: Option<LocationBackend>, fallback: RangeTable) -> Self {
        let name = match &primary {
            Some(p) => format!("{}+{}", p.name(), fallback.name()),
            None => fallback.name().to_string(),
        };
        Self {
            name,
            primary,
            fallback,
        }
    }
}

impl LookupBackend for WithFallback {
    type Output = GeoLocationInformation;

    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, ip: IpAddr) -> Result<Option<GeoLocationInformation>> {
        if let Some(primary) = &self.primary {
            match primary.lookup(ip) {
                Ok(Some(found)) => return Ok(Some(found)),
                Ok(None) => {}
                Err(err) => {
                    debug!(
                        backend = primary.name(),
                        %ip,
                        error = %err,
                        "primary lookup failed, trying fallback"
                    );
                }
            }
        }
        self.fallback.lookup(ip)
    }
}
