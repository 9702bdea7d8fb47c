/*!
 * Request shaping for speech synthesis.
 *
 * Vendors throttle aggressively, so every request goes through a wrapper
 * that spaces consecutive requests by a cooldown, caps the number of
 * requests pending at once and bounds each request with a timeout.
 * Exceeding the cap fails fast instead of queuing.
 */

use async_trait::async_trait;
use log::{debug, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

use super::{AudioPayload, SpeechSynthesizer, VoiceConfig};
use crate::app_config::RequestLimits;
use crate::errors::SynthesisError;

/// Synthesizer wrapper enforcing cooldown, pending cap and timeout
#[derive(Debug)]
pub struct ThrottledSynthesizer<S> {
    inner: S,
    cooldown: Duration,
    max_pending: usize,
    timeout: Duration,
    pending: Arc<AtomicUsize>,
    /// Earliest instant the next request may fire
    next_slot: Mutex<Option<Instant>>,
}

/// Releases a pending slot when the request finishes or is dropped
struct PendingSlot(Arc<AtomicUsize>);

impl Drop for PendingSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<S: SpeechSynthesizer> ThrottledSynthesizer<S> {
    /// Wrap a synthesizer using the configured limits
    pub fn new(inner: S, limits: &RequestLimits) -> Self {
        Self::with_limits(
            inner,
            Duration::from_millis(limits.request_cooldown_ms),
            limits.max_pending_requests,
            Duration::from_secs(limits.synthesis_timeout_secs),
        )
    }

    pub fn with_limits(inner: S, cooldown: Duration, max_pending: usize, timeout: Duration) -> Self {
        Self {
            inner,
            cooldown,
            max_pending: max_pending.max(1),
            timeout,
            pending: Arc::new(AtomicUsize::new(0)),
            next_slot: Mutex::new(None),
        }
    }

    /// Number of requests currently pending
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn reserve_slot(&self) -> Option<PendingSlot> {
        let max = self.max_pending;
        self.pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| (n < max).then_some(n + 1))
            .ok()
            .map(|_| PendingSlot(Arc::clone(&self.pending)))
    }

    /// Reserve the next firing time and return how long to wait for it
    fn claim_start(&self) -> Duration {
        let mut next = self.next_slot.lock();
        let now = Instant::now();
        let start = match *next {
            Some(slot) if slot > now => slot,
            _ => now,
        };
        *next = Some(start + self.cooldown);
        start.saturating_duration_since(now)
    }
}

#[async_trait]
impl<S: SpeechSynthesizer> SpeechSynthesizer for ThrottledSynthesizer<S> {
    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<AudioPayload, SynthesisError> {
        let Some(_slot) = self.reserve_slot() else {
            warn!("Rejecting synthesis request: {} requests already pending", self.max_pending);
            return Err(SynthesisError::TooManyPendingRequests);
        };

        let wait = self.claim_start();
        if !wait.is_zero() {
            debug!("Synthesis cooldown: waiting {}ms", wait.as_millis());
            tokio::time::sleep(wait).await;
        }

        match tokio::time::timeout(self.timeout, self.inner.synthesize(text, voice)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Synthesis request timed out after {}s", self.timeout.as_secs());
                Err(SynthesisError::Timeout)
            }
        }
    }
}
