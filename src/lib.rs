//! The geoipenrich library for location and ASN enrichment of log records.
//!
//! A [`GeoIpResolverEngine`] inspects the fields of a [`Record`], and for every field that
//! holds an IP address it either marks the address as reserved or appends the location
//! (and, in strict schema mode, the autonomous system) the configured databases report
//! for it.
//!
//! # Examples
//!
//! ```rust,no_run
//! use geoipenrich::{EnrichmentConfig, GeoIpResolverEngine, Message, Record};
//!
//! let config = EnrichmentConfig::default()
//!     .with_enabled(true)
//!     .with_city_db("/usr/share/GeoIP/GeoLite2-City.mmdb")
//!     .with_asn_db("/usr/share/GeoIP/GeoLite2-ASN.mmdb");
//! let engine = GeoIpResolverEngine::new(&config);
//!
//! let mut msg = Message::new().with_field("source_ip", "8.8.8.8");
//! engine.filter(&mut msg);
//! println!("{:?}", msg.field("source_geo_country_iso"));
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod fields;
pub mod input;
pub mod location;
pub mod metrics;
pub mod mmdb;
pub mod policy;
pub mod range_table;
pub mod record;
pub mod resolver;

pub use crate::config::{DatabaseVendor, EnrichmentConfig, SchemaMode};
pub use crate::engine::GeoIpResolverEngine;
pub use crate::error::{Error, Result};
pub use crate::location::{GeoAsnInformation, GeoLocationInformation, NOT_AVAILABLE};
pub use crate::metrics::{ResolveTimer, TimerSnapshot};
pub use crate::record::{FieldValue, Message, Record};
pub use crate::resolver::{AsnResolver, CityResolver, LookupBackend, Resolver};
