//! Per-record orchestration.
//!
//! For every candidate field of a record the engine walks the same short path:
//!
//! 1. value is not an address: skip
//! 2. address is reserved: write `{prefix}_reserved_ip` and stop
//! 3. strict schema: resolve location and ASN, write strict fields
//! 4. legacy schema: resolve location only, write legacy fields
//!
//! Whether the engine does anything at all is settled once, at construction.

use std::sync::Arc;

use ip_classify::{is_reserved, parse_address};
use tracing::{debug, info, warn};

use crate::config::EnrichmentConfig;
use crate::fields::FieldSelector;
use crate::metrics::{ResolveTimer, TimerSnapshot};
use crate::mmdb;
use crate::policy::EnrichmentPolicy;
use crate::record::Record;
use crate::resolver::{AsnResolver, CityResolver};

/// Enriches records with location and ASN data for the addresses they carry.
///
/// Immutable after construction and safe to share between worker threads.
#[derive(Debug)]
pub struct GeoIpResolverEngine {
    city: CityResolver,
    asn: AsnResolver,
    policy: EnrichmentPolicy,
    selector: FieldSelector,
    enabled: bool,
    timer: Arc<ResolveTimer>,
}

impl GeoIpResolverEngine {
    /// Open the configured databases and build the engine.
    ///
    /// This never fails. A disabled or invalid configuration, or databases that cannot be
    /// opened, produce an engine whose [`filter`](Self::filter) is a no-op.
    pub fn new(config: &EnrichmentConfig) -> Self {
        let timer = Arc::new(ResolveTimer::new());

        if !config.enabled {
            info!("geo enrichment is disabled by configuration");
            return Self::inert(config, timer);
        }
        if let Err(err) = config.validate() {
            warn!(error = %err, "geo enrichment disabled");
            return Self::inert(config, timer);
        }

        let city = mmdb::city_resolver(config, timer.clone());
        let asn = mmdb::asn_resolver(config, timer.clone());
        Self::with_resolvers(config, city, asn, timer)
    }

    /// Build an engine around already constructed resolvers.
    pub fn with_resolvers(
        config: &EnrichmentConfig,
        city: CityResolver,
        asn: AsnResolver,
        timer: Arc<ResolveTimer>,
    ) -> Self {
        let enabled = config.enabled && (city.is_enabled() || asn.is_enabled());
        let policy = EnrichmentPolicy::from_config(config);
        debug!(
            enabled,
            mode = ?policy.mode(),
            city = city.name(),
            asn = asn.name(),
            "geo enrichment engine ready"
        );
        Self {
            city,
            asn,
            policy,
            selector: FieldSelector::new(config.schema_mode()),
            enabled,
            timer,
        }
    }

    fn inert(config: &EnrichmentConfig, timer: Arc<ResolveTimer>) -> Self {
        Self {
            city: CityResolver::disabled(timer.clone()),
            asn: AsnResolver::disabled(timer.clone()),
            policy: EnrichmentPolicy::from_config(config),
            selector: FieldSelector::new(config.schema_mode()),
            enabled: false,
            timer,
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn policy(&self) -> &EnrichmentPolicy {
        &self.policy
    }

    /// Enrich `record` in place.
    ///
    /// Returns whether enrichment was applicable, which is `false` exactly when the engine
    /// is disabled. Lookup failures only affect the field being resolved.
    pub fn filter<R: Record>(&self, record: &mut R) -> bool {
        if !self.enabled {
            return false;
        }

        // the record is mutated below, so the names are taken up front
        let candidates: Vec<String> = self
            .selector
            .candidates(record)
            .map(str::to_owned)
            .collect();

        for name in &candidates {
            let Some(ip) = record
                .field(name)
                .and_then(|value| parse_address(value.as_address_input()))
            else {
                continue;
            };

            let prefix = self.policy.prefix(name);
            if is_reserved(ip) {
                self.policy.mark_reserved(record, prefix);
                continue;
            }

            if let Some(location) = self.city.resolve(ip) {
                self.policy.apply_location(record, prefix, &location);
            }
            if self.policy.wants_asn() {
                if let Some(asn) = self.asn.resolve(ip) {
                    self.policy.apply_asn(record, prefix, &asn);
                }
            }
        }

        true
    }

    /// Timing of every lookup made so far, both variants combined.
    pub fn resolve_time(&self) -> TimerSnapshot {
        self.timer.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FieldValue, Message};

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn engine_is_shareable() {
        assert_send_sync::<GeoIpResolverEngine>();
    }

    #[test]
    fn disabled_config_is_inert() {
        let engine = GeoIpResolverEngine::new(&EnrichmentConfig::default());
        assert!(!engine.is_enabled());

        let mut msg = Message::new().with_field("source_ip", "8.8.8.8");
        assert!(!engine.filter(&mut msg));
        assert_eq!(msg.len(), 1);
    }

    #[test]
    fn invalid_locale_disables() {
        let config = EnrichmentConfig::default()
            .with_enabled(true)
            .with_locale("en US");
        assert!(!GeoIpResolverEngine::new(&config).is_enabled());
    }

    #[test]
    fn reserved_marking_needs_no_lookup() {
        #[derive(Debug)]
        struct Nowhere;

        impl crate::resolver::LookupBackend for Nowhere {
            type Output = crate::location::GeoLocationInformation;
            fn name(&self) -> &str {
                "nowhere"
            }
            fn lookup(
                &self,
                _ip: std::net::IpAddr,
            ) -> crate::Result<Option<crate::location::GeoLocationInformation>> {
                Ok(None)
            }
        }

        let timer = Arc::new(ResolveTimer::new());
        let config = EnrichmentConfig::default().with_enabled(true);
        let engine = GeoIpResolverEngine::with_resolvers(
            &config,
            CityResolver::new(Box::new(Nowhere), timer.clone()),
            AsnResolver::disabled(timer.clone()),
            timer,
        );

        let mut msg = Message::new().with_field("host_ip", "192.168.1.1");
        assert!(engine.filter(&mut msg));
        assert_eq!(msg.field("host_reserved_ip"), Some(&FieldValue::Bool(true)));
        assert_eq!(msg.len(), 2);
        assert_eq!(engine.resolve_time().count, 0);
    }
}
