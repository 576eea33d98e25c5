//! Lookup backends and the policy of calling them.
//!
//! A [`LookupBackend`] is anything that can answer "what do you know about this public
//! address": an MMDB reader, a range table, or a fake in tests. Backends may fail.
//!
//! A [`Resolver`] wraps one optional backend for one lookup variant and turns every
//! outcome into `Option`: a missing backend, a "not found" and a backend error all become
//! `None`, so the engine never sees an error. Every call is timed.

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::location::{GeoAsnInformation, GeoLocationInformation};
use crate::metrics::ResolveTimer;

/// A source of data of one kind for public addresses.
///
/// Implementations are shared across pipeline workers, so they must be usable through
/// `&self` from many threads at once.
pub trait LookupBackend: fmt::Debug + Send + Sync {
    type Output;

    /// Short name used in logs.
    fn name(&self) -> &str;

    /// `Ok(None)` means the address is simply not in the data set.
    fn lookup(&self, ip: IpAddr) -> Result<Option<Self::Output>>;
}

/// A boxed location backend.
pub type LocationBackend = Box<dyn LookupBackend<Output = GeoLocationInformation>>;
/// A boxed ASN backend.
pub type AsnBackend = Box<dyn LookupBackend<Output = GeoAsnInformation>>;

/// One lookup variant: enabled iff it has a backend.
pub struct Resolver<T> {
    backend: Option<Box<dyn LookupBackend<Output = T>>>,
    timer: Arc<ResolveTimer>,
}

/// Location lookup variant.
pub type CityResolver = Resolver<GeoLocationInformation>;
/// ASN lookup variant.
pub type AsnResolver = Resolver<GeoAsnInformation>;

impl<T> Resolver<T> {
    pub fn new(backend: Box<dyn LookupBackend<Output = T>>, timer: Arc<ResolveTimer>) -> Self {
        Self {
            backend: Some(backend),
            timer,
        }
    }

    /// A variant that never answers.
    pub fn disabled(timer: Arc<ResolveTimer>) -> Self {
        Self {
            backend: None,
            timer,
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Name of the backing source, or `"disabled"`.
    pub fn name(&self) -> &str {
        self.backend.as_deref().map_or("disabled", |b| b.name())
    }

    /// Resolve an address, absorbing every failure into `None`.
    pub fn resolve(&self, ip: IpAddr) -> Option<T> {
        let backend = self.backend.as_deref()?;
        let result = {
            let _ctx = self.timer.time();
            backend.lookup(ip)
        };
        match result {
            Ok(found) => found,
            Err(err) => {
                debug!(backend = backend.name(), %ip, error = %err, "could not resolve address");
                None
            }
        }
    }
}

impl<T> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}
