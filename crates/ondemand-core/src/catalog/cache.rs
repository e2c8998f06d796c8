//! Memoized remote catalog owned by its caller, with explicit refresh and optional expiry.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::{Catalog, CatalogSource};

/// Time source for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct Memo {
    catalog: Arc<Catalog>,
    fetched_at: Instant,
}

/// Last successfully fetched catalog from `source`.
///
/// `get` serves the memo while it is fresh (forever when `ttl` is `None`),
/// `refresh` always goes to the source. A failed fetch never clears the memo.
pub struct DynamicCatalog<S, C = SystemClock> {
    source: S,
    clock: C,
    ttl: Option<Duration>,
    memo: Mutex<Option<Memo>>,
}

impl<S: CatalogSource> DynamicCatalog<S, SystemClock> {
    pub fn new(source: S, ttl: Option<Duration>) -> Self {
        Self::with_clock(source, ttl, SystemClock)
    }
}

impl<S: CatalogSource, C: Clock> DynamicCatalog<S, C> {
    pub fn with_clock(source: S, ttl: Option<Duration>, clock: C) -> Self {
        Self {
            source,
            clock,
            ttl,
            memo: Mutex::new(None),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Memoized catalog if fresh, else a new fetch; on fetch failure the stale memo (if any).
    pub fn get(&self) -> Option<Arc<Catalog>> {
        let mut memo = self.memo.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(m) = memo.as_ref() {
            if self.is_fresh(m) {
                return Some(Arc::clone(&m.catalog));
            }
        }
        match self.source.fetch_catalog() {
            Ok(catalog) => Some(self.store(&mut memo, catalog)),
            Err(e) => {
                tracing::error!("remote catalog unavailable: {}", e);
                memo.as_ref().map(|m| {
                    tracing::warn!("serving previously fetched catalog");
                    Arc::clone(&m.catalog)
                })
            }
        }
    }

    /// Bypasses the memo. `None` if the fetch fails; the previous memo is kept for `get`.
    pub fn refresh(&self) -> Option<Arc<Catalog>> {
        let mut memo = self.memo.lock().unwrap_or_else(PoisonError::into_inner);
        match self.source.fetch_catalog() {
            Ok(catalog) => Some(self.store(&mut memo, catalog)),
            Err(e) => {
                tracing::error!("remote catalog refresh failed: {}", e);
                None
            }
        }
    }

    /// Current memo without touching the network.
    pub fn cached(&self) -> Option<Arc<Catalog>> {
        self.memo
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|m| Arc::clone(&m.catalog))
    }

    fn is_fresh(&self, memo: &Memo) -> bool {
        match self.ttl {
            None => true,
            Some(ttl) => self.clock.now().saturating_duration_since(memo.fetched_at) < ttl,
        }
    }

    fn store(&self, memo: &mut Option<Memo>, catalog: Catalog) -> Arc<Catalog> {
        let catalog = Arc::new(catalog);
        *memo = Some(Memo {
            catalog: Arc::clone(&catalog),
            fetched_at: self.clock.now(),
        });
        catalog
    }
}
