/*!
 * Audio caching for prefetched chunks.
 *
 * Prefetch stores synthesized audio by chunk index; the engine takes an
 * entry out at the moment that chunk starts playing. An index present in
 * the cache has therefore never been played.
 */

use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::providers::AudioPayload;

/// Chunk-indexed store of synthesized audio
#[derive(Debug, Clone, Default)]
pub struct AudioCache {
    /// Internal cache storage
    entries: Arc<RwLock<HashMap<usize, AudioPayload>>>,

    /// Cache hit counter
    hits: Arc<RwLock<usize>>,

    /// Cache miss counter
    misses: Arc<RwLock<usize>>,
}

impl AudioCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the audio for a chunk without consuming it
    pub fn get(&self, index: usize) -> Option<AudioPayload> {
        let entries = self.entries.read();

        match entries.get(&index) {
            Some(audio) => {
                *self.hits.write() += 1;
                debug!("Audio cache hit for chunk {}", index);
                Some(audio.clone())
            }
            None => {
                *self.misses.write() += 1;
                debug!("Audio cache miss for chunk {}", index);
                None
            }
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.entries.read().contains_key(&index)
    }

    /// Store prefetched audio for a chunk
    pub fn insert(&self, index: usize, audio: AudioPayload) {
        debug!("Cached audio for chunk {} ({} bytes)", index, audio.len());
        self.entries.write().insert(index, audio);
    }

    /// Remove and return the audio for a chunk that is about to play
    pub fn take(&self, index: usize) -> Option<AudioPayload> {
        self.entries.write().remove(&index)
    }

    /// Hits, misses and hit rate since the last clear
    pub fn stats(&self) -> (usize, usize, f64) {
        let hits = *self.hits.read();
        let misses = *self.misses.read();
        let total = hits + misses;

        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };

        (hits, misses, hit_rate)
    }

    /// Drop every entry and reset the counters
    pub fn clear(&self) {
        self.entries.write().clear();
        *self.hits.write() = 0;
        *self.misses.write() = 0;
        debug!("Audio cache cleared");
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Cached chunk indices in ascending order
    pub fn indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.entries.read().keys().copied().collect();
        indices.sort_unstable();
        indices
    }
}
