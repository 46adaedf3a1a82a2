// in-memory cache for artifacts that are expensive to build (e.g. a parsed
// password file) but cheap to share.
//
// entries are built lazily, on the first `checkout` of a key, and served to
// every caller until their TTL runs out; the next checkout after that builds a
// fresh entry. callers never own an entry, they hold a `Checkout`, which is
// just a reference count: an expired (or evicted) entry is only dropped once
// the last outstanding `Checkout` is released.

use std::collections::HashMap;
use std::fmt::Debug;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;
use std::time::Instant;

use once_cell::sync::OnceCell;

type BuildFn<T> = dyn Fn(&str) -> Result<T, anyhow::Error> + Send + Sync;

pub struct Cache<T> {
    // actix-web runs one worker (thread) per core, so bookkeeping needs a real
    // lock. it is never held while an entry is being built
    slots: Mutex<HashMap<String, Arc<Slot<T>>>>,
    build: Box<BuildFn<T>>,
    ttl: Duration,
}

/// Placeholder for an entry; `value` is filled in exactly once. Callers that
/// race on an empty slot block until the first one finishes building.
struct Slot<T> {
    value: OnceCell<Built<T>>,
}

/// Why a slot did not end up holding an entry
enum Miss {
    /// The slot was dropped from the map while this caller waited on it
    Stale,
    Failed(anyhow::Error),
}

impl From<anyhow::Error> for Miss {
    fn from(e: anyhow::Error) -> Self { Self::Failed(e) }
}

struct Built<T> {
    created_at: Instant,
    value: Arc<T>,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self {
            value: OnceCell::new(),
        }
    }

    /// A slot still being built is never expired
    fn is_expired(
        &self,
        ttl: Duration,
    ) -> bool {
        self.value
            .get()
            .is_some_and(|built| built.created_at.elapsed() >= ttl)
    }
}

/// A reference-counted handle to a cache entry. The entry stays alive (even
/// past its TTL) for as long as the handle does.
pub struct Checkout<T>(Arc<T>);

impl<T> Checkout<T> {
    /// Whether both handles point to the very same entry
    pub fn ptr_eq(
        this: &Self,
        other: &Self,
    ) -> bool {
        Arc::ptr_eq(&this.0, &other.0)
    }
}

impl<T> Clone for Checkout<T> {
    fn clone(&self) -> Self { Self(Arc::clone(&self.0)) }
}

impl<T> Deref for Checkout<T> {
    type Target = T;
    fn deref(&self) -> &Self::Target { &self.0 }
}

impl<T: Debug> Debug for Checkout<T> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_tuple("Checkout").field(&self.0).finish()
    }
}

impl<T> Cache<T> {
    /// `build` is called (at most once at a time per key) on every miss.
    /// Errors are passed on to the caller of `checkout`, and are not cached.
    pub fn new<F>(
        build: F,
        ttl: Duration,
    ) -> Self
    where
        F: Fn(&str) -> Result<T, anyhow::Error> + Send + Sync + 'static,
    {
        Self {
            slots: Mutex::new(HashMap::new()),
            build: Box::new(build),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration { self.ttl }

    /// Return the live entry for `key`, building it first if there is none (or
    /// if the current one has expired).
    pub fn checkout(
        &self,
        key: &str,
    ) -> Result<Checkout<T>, anyhow::Error> {
        loop {
            let slot = self.slot(key)?;

            let built = slot.value.get_or_try_init(|| {
                // a failed build takes its slot out of the map; callers that were
                // queued on it start over on whichever slot replaced it
                if !self.is_current(key, &slot)? {
                    return Err(Miss::Stale);
                }
                tracing::debug!(key, "Cache miss, building entry");
                match (self.build)(key) {
                    Ok(value) => Ok(Built {
                        created_at: Instant::now(),
                        value: Arc::new(value),
                    }),
                    Err(e) => {
                        // must happen before the slot is released to the next
                        // caller in line, so that the next checkout retries
                        self.remove_if_same(key, &slot)?;
                        Err(Miss::Failed(e))
                    }
                }
            });

            match built {
                Ok(built) => return Ok(Checkout(Arc::clone(&built.value))),
                Err(Miss::Stale) => continue,
                Err(Miss::Failed(e)) => return Err(e),
            }
        }
    }

    /// Evict `key`. Outstanding `Checkout`s keep the old entry alive.
    pub fn invalidate(
        &self,
        key: &str,
    ) -> Result<(), anyhow::Error> {
        let evicted = self.lock()?.remove(key);
        if evicted.is_some() {
            tracing::debug!(key, "Cache entry invalidated");
        }
        // dropped here, outside the lock
        drop(evicted);
        Ok(())
    }

    /// Evict everything
    pub fn clear(&self) -> Result<(), anyhow::Error> {
        let evicted = std::mem::take(&mut *self.lock()?);
        tracing::debug!(entries = evicted.len(), "Cache cleared");
        drop(evicted);
        Ok(())
    }

    /// Number of slots currently held, expired ones included
    pub fn len(&self) -> Result<usize, anyhow::Error> { Ok(self.lock()?.len()) }

    pub fn is_empty(&self) -> Result<bool, anyhow::Error> { Ok(self.lock()?.is_empty()) }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Arc<Slot<T>>>>, anyhow::Error> {
        self.slots
            .lock()
            .map_err(|_| anyhow::anyhow!("Cache lock was poisoned"))
    }

    /// Find (or create) the slot for `key`, replacing it if its entry expired
    fn slot(
        &self,
        key: &str,
    ) -> Result<Arc<Slot<T>>, anyhow::Error> {
        let mut slots = self.lock()?;

        let is_expired = slots
            .get(key)
            .is_some_and(|slot| slot.is_expired(self.ttl));
        let expired = match is_expired {
            true => {
                tracing::debug!(key, "Cache entry expired");
                slots.remove(key)
            }
            false => None,
        };

        let slot = slots
            .entry(key.to_owned())
            .or_insert_with(|| Arc::new(Slot::new()));
        let slot = Arc::clone(slot);

        // the expired entry may be the last reference; don't destroy it while
        // holding the lock
        drop(slots);
        drop(expired);
        Ok(slot)
    }

    fn is_current(
        &self,
        key: &str,
        slot: &Arc<Slot<T>>,
    ) -> Result<bool, anyhow::Error> {
        Ok(self.lock()?.get(key).is_some_and(|s| Arc::ptr_eq(s, slot)))
    }

    fn remove_if_same(
        &self,
        key: &str,
        slot: &Arc<Slot<T>>,
    ) -> Result<(), anyhow::Error> {
        let mut slots = self.lock()?;
        if slots.get(key).is_some_and(|s| Arc::ptr_eq(s, slot)) {
            slots.remove(key);
        }
        Ok(())
    }
}
