//! Shared resolution state
//!
//! One `ResolutionStore` exists per service instance and is passed by `Arc`
//! to every component; it owns the memory caches, the in-flight registry and
//! the event broadcaster. `reset()` returns the store to its constructed
//! state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, RwLock};

use kashi_common::events::LyricsEvent;
use kashi_common::types::{TranslationRecord, VersionedLyrics};

/// Outcome shared between the resolving claimant and its waiters.
///
/// `None` means the resolution settled with a failure; waiters surface their
/// own "no lyrics found" error and may retry later.
pub type SharedOutcome = Option<VersionedLyrics>;

type InFlightMap = Arc<Mutex<HashMap<String, broadcast::Sender<SharedOutcome>>>>;

fn lock_in_flight(
    map: &InFlightMap,
) -> std::sync::MutexGuard<'_, HashMap<String, broadcast::Sender<SharedOutcome>>> {
    map.lock().unwrap_or_else(|e| e.into_inner())
}

/// Exclusive right to resolve one key
///
/// Exactly one claim exists per key at a time. The holder must call
/// [`InFlightClaim::settle`] with the outcome; if the claim is dropped
/// without settling (error path, panic unwind), the registry entry is still
/// removed and waiters are released with a failure, so a later call can
/// retry.
pub struct InFlightClaim {
    key: String,
    tx: broadcast::Sender<SharedOutcome>,
    map: InFlightMap,
    settled: bool,
}

impl InFlightClaim {
    /// Publish the outcome to all waiters and release the key
    pub fn settle(mut self, outcome: SharedOutcome) {
        self.finish(outcome);
    }

    fn finish(&mut self, outcome: SharedOutcome) {
        if self.settled {
            return;
        }
        self.settled = true;
        lock_in_flight(&self.map).remove(&self.key);
        // No waiters is fine
        let _ = self.tx.send(outcome);
    }
}

impl Drop for InFlightClaim {
    fn drop(&mut self) {
        self.finish(None);
    }
}

/// Result of asking the registry for a key
pub enum InFlight {
    /// Nobody is resolving this key; the caller now is
    Claimed(InFlightClaim),
    /// Another caller is resolving this key; await its outcome
    Waiting(broadcast::Receiver<SharedOutcome>),
}

/// Shared state accessible by all components
pub struct ResolutionStore {
    /// Fast in-memory lyrics cache, keyed by the song cache key
    lyrics: RwLock<HashMap<String, VersionedLyrics>>,

    /// In-memory translation cache, keyed by the composite translation key
    translations: RwLock<HashMap<String, TranslationRecord>>,

    /// At most one outstanding resolution per key
    in_flight: InFlightMap,

    /// Event broadcaster for SSE listeners
    event_tx: broadcast::Sender<LyricsEvent>,

    /// Total provider-chain executions since startup.
    ///
    /// Concurrent callers sharing one in-flight resolution count as a single
    /// round trip.
    provider_round_trips: AtomicU64,
}

impl ResolutionStore {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(100); // Buffer up to 100 events
        Self {
            lyrics: RwLock::new(HashMap::new()),
            translations: RwLock::new(HashMap::new()),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            event_tx,
            provider_round_trips: AtomicU64::new(0),
        }
    }

    pub async fn get_lyrics(&self, key: &str) -> Option<VersionedLyrics> {
        self.lyrics.read().await.get(key).cloned()
    }

    pub async fn put_lyrics(&self, key: String, value: VersionedLyrics) {
        self.lyrics.write().await.insert(key, value);
    }

    pub async fn get_translation(&self, key: &str) -> Option<TranslationRecord> {
        self.translations.read().await.get(key).cloned()
    }

    pub async fn put_translation(&self, key: String, record: TranslationRecord) {
        self.translations.write().await.insert(key, record);
    }

    /// Ask for the right to resolve `key`, or a waiter on whoever holds it
    pub fn begin(&self, key: &str) -> InFlight {
        let mut map = lock_in_flight(&self.in_flight);
        if let Some(tx) = map.get(key) {
            return InFlight::Waiting(tx.subscribe());
        }
        let (tx, _) = broadcast::channel(1);
        map.insert(key.to_string(), tx.clone());
        InFlight::Claimed(InFlightClaim {
            key: key.to_string(),
            tx,
            map: Arc::clone(&self.in_flight),
            settled: false,
        })
    }

    /// Clear every cache map; outstanding resolutions settle normally
    pub async fn reset(&self) {
        self.lyrics.write().await.clear();
        self.translations.write().await.clear();
        lock_in_flight(&self.in_flight).clear();
    }

    /// Broadcast an event to all SSE listeners
    pub fn broadcast_event(&self, event: LyricsEvent) {
        // Ignore send errors (no receivers is OK)
        let _ = self.event_tx.send(event);
    }

    /// Subscribe to event stream for SSE
    pub fn subscribe_events(&self) -> broadcast::Receiver<LyricsEvent> {
        self.event_tx.subscribe()
    }

    pub fn note_provider_round_trip(&self) {
        self.provider_round_trips.fetch_add(1, Ordering::Relaxed);
    }

    pub fn provider_round_trips(&self) -> u64 {
        self.provider_round_trips.load(Ordering::Relaxed)
    }
}

impl Default for ResolutionStore {
    fn default() -> Self {
        Self::new()
    }
}
