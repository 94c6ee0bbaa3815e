// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Subscriber registry (§4.4): a bounded set of `(address, port)` sinks
with health counters, timeouts, and admission policy.

No direct counterpart in `stream_server.py` (the Python original
streams to one fixed destination); grounded on the subscriber
bookkeeping `examples/original_source/tests/test_subscriber_management.py`
exercises — capacity, timeout-based eviction, and the failure
threshold are all asserted there.
*/

use std::net::IpAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default bound on the number of live subscribers (§4.4).
pub(crate) const MAX_SUBSCRIBERS: usize = 16;
/// Default consecutive-failure threshold before a slot is marked inactive (§4.4).
pub(crate) const FAIL_THRESHOLD: u32 = 10;
/// Default subscriber liveness timeout (§4.4).
pub(crate) const SUBSCRIBER_TIMEOUT: Duration = Duration::from_secs(30);

/// One registered subscriber (§3).
#[derive(Clone, Debug)]
pub struct Subscriber {
    /// Subscriber's address.
    pub address: IpAddr,
    /// Subscriber's UDP port.
    pub port: u16,
    /// When this slot was first registered.
    pub first_seen: Instant,
    /// When this slot was last refreshed or had a successful send.
    pub last_seen: Instant,
    /// Packets successfully sent to this subscriber.
    pub packets_sent: u64,
    /// Consecutive send failures since the last success.
    pub consecutive_failures: u32,
    /// Total send failures over the slot's lifetime.
    pub total_failures: u64,
    /// Whether the slot is currently eligible for fan-out.
    pub active: bool,
}

impl Subscriber {
    fn new(address: IpAddr, port: u16, now: Instant) -> Subscriber {
        Subscriber {
            address,
            port,
            first_seen: now,
            last_seen: now,
            packets_sent: 0,
            consecutive_failures: 0,
            total_failures: 0,
            active: true,
        }
    }

    /// A subscriber is live iff active and seen within `timeout` (§3).
    pub fn is_live(&self, now: Instant, timeout: Duration) -> bool {
        self.active && now.duration_since(self.last_seen) < timeout
    }

    fn matches(&self, address: IpAddr, port: u16) -> bool {
        self.address == address && self.port == port
    }
}

/// Outcome of [`SubscriberRegistry::register_or_refresh`].
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum RegistrationOutcome {
    /// A new slot was created.
    Added,
    /// An existing slot was refreshed (marked active, `last_seen` updated).
    Refreshed,
    /// The registry is at capacity and has no inactive slot to reuse.
    Rejected,
}

/// Bounded, mutex-guarded set of subscriber records (§4.4). All
/// mutators are serialized by one lock; [`SubscriberRegistry::snapshot`]
/// clones the live entries out so the streaming thread's fan-out loop
/// never holds the lock while sending.
pub struct SubscriberRegistry {
    slots: Mutex<Vec<Subscriber>>,
    capacity: usize,
    fail_threshold: u32,
    timeout: Duration,
}

impl SubscriberRegistry {
    /// Creates an empty registry with the given capacity, failure
    /// threshold, and liveness timeout.
    pub fn new(capacity: usize, fail_threshold: u32, timeout: Duration) -> SubscriberRegistry {
        SubscriberRegistry {
            slots: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
            fail_threshold,
            timeout,
        }
    }

    /// Creates an empty registry using the spec's default constants
    /// (capacity 16, failure threshold 10, timeout 30s).
    pub fn with_defaults() -> SubscriberRegistry {
        SubscriberRegistry::new(MAX_SUBSCRIBERS, FAIL_THRESHOLD, SUBSCRIBER_TIMEOUT)
    }

    /// Registers `(address, port)` as a subscriber, or refreshes it if
    /// already present. Replaces the first inactive slot if the
    /// registry is full of dead entries; rejects outright only when
    /// every slot is live and none matches (§4.4).
    pub fn register_or_refresh(&self, address: IpAddr, port: u16) -> RegistrationOutcome {
        let now = Instant::now();
        let mut slots = self.slots.lock().unwrap();

        if let Some(existing) = slots.iter_mut().find(|s| s.matches(address, port)) {
            existing.active = true;
            existing.last_seen = now;
            return RegistrationOutcome::Refreshed;
        }

        if let Some(dead) = slots
            .iter_mut()
            .find(|s| !s.is_live(now, self.timeout))
        {
            *dead = Subscriber::new(address, port, now);
            return RegistrationOutcome::Added;
        }

        if slots.len() < self.capacity {
            slots.push(Subscriber::new(address, port, now));
            return RegistrationOutcome::Added;
        }

        RegistrationOutcome::Rejected
    }

    /// Records a successful send: increments `packets_sent`, resets
    /// `consecutive_failures`, and refreshes `last_seen` (§4.4).
    pub fn record_success(&self, address: IpAddr, port: u16) {
        let mut slots = self.slots.lock().unwrap();
        if let Some(s) = slots.iter_mut().find(|s| s.matches(address, port)) {
            s.packets_sent += 1;
            s.consecutive_failures = 0;
            s.last_seen = Instant::now();
        }
    }

    /// Records a send failure: increments both failure counters, and
    /// deactivates the slot once `consecutive_failures` reaches the
    /// threshold (§4.4).
    pub fn record_failure(&self, address: IpAddr, port: u16) {
        let mut slots = self.slots.lock().unwrap();
        if let Some(s) = slots.iter_mut().find(|s| s.matches(address, port)) {
            s.consecutive_failures += 1;
            s.total_failures += 1;
            if s.consecutive_failures >= self.fail_threshold {
                s.active = false;
            }
        }
    }

    /// Marks inactive any live slot that has gone unseen past the
    /// timeout. Intended to be called at a bounded cadence, roughly
    /// 1 Hz (§4.4).
    pub fn sweep(&self, now: Instant) {
        let mut slots = self.slots.lock().unwrap();
        for s in slots.iter_mut() {
            if s.active && now.duration_since(s.last_seen) >= self.timeout {
                s.active = false;
            }
        }
    }

    /// Returns a cheap clone of the currently live slots, for the
    /// streaming thread to fan out to without holding the lock.
    pub fn snapshot(&self) -> Vec<Subscriber> {
        let now = Instant::now();
        let slots = self.slots.lock().unwrap();
        slots
            .iter()
            .filter(|s| s.is_live(now, self.timeout))
            .cloned()
            .collect()
    }

    /// Total number of slots held (live or dead), for invariant checks.
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap().len()
    }

    /// Returns true if the registry holds no slots at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn addr(n: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(127, 0, 0, n))
    }

    #[test]
    fn register_then_refresh_leaves_one_record() {
        let reg = SubscriberRegistry::with_defaults();
        assert_eq!(
            reg.register_or_refresh(addr(1), 9000),
            RegistrationOutcome::Added
        );
        assert_eq!(
            reg.register_or_refresh(addr(1), 9000),
            RegistrationOutcome::Refreshed
        );
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn registry_never_exceeds_capacity() {
        let reg = SubscriberRegistry::new(16, FAIL_THRESHOLD, SUBSCRIBER_TIMEOUT);
        for i in 0..16u8 {
            assert_eq!(
                reg.register_or_refresh(addr(i), 9000 + i as u16),
                RegistrationOutcome::Added
            );
        }
        for i in 16..20u8 {
            assert_eq!(
                reg.register_or_refresh(addr(i), 9000 + i as u16),
                RegistrationOutcome::Rejected
            );
        }
        assert_eq!(reg.len(), 16);
    }

    #[test]
    fn failure_threshold_deactivates_slot() {
        let reg = SubscriberRegistry::new(4, 3, SUBSCRIBER_TIMEOUT);
        reg.register_or_refresh(addr(1), 9000);
        for _ in 0..3 {
            reg.record_failure(addr(1), 9000);
        }
        let snap = reg.snapshot();
        assert!(snap.is_empty(), "slot should be inactive after 3 failures");
    }

    #[test]
    fn success_resets_consecutive_failures() {
        let reg = SubscriberRegistry::new(4, 3, SUBSCRIBER_TIMEOUT);
        reg.register_or_refresh(addr(1), 9000);
        reg.record_failure(addr(1), 9000);
        reg.record_failure(addr(1), 9000);
        reg.record_success(addr(1), 9000);
        let snap = reg.snapshot();
        assert_eq!(snap[0].consecutive_failures, 0);
    }

    #[test]
    fn sweep_evicts_timed_out_slots_and_frees_capacity() {
        let reg = SubscriberRegistry::new(1, FAIL_THRESHOLD, Duration::from_millis(1));
        reg.register_or_refresh(addr(1), 9000);
        std::thread::sleep(Duration::from_millis(5));
        reg.sweep(Instant::now());
        assert!(reg.snapshot().is_empty());
        assert_eq!(
            reg.register_or_refresh(addr(2), 9001),
            RegistrationOutcome::Added
        );
    }

    #[test]
    fn eighteenth_subscriber_succeeds_after_a_dropped_one_times_out() {
        let reg = SubscriberRegistry::new(2, FAIL_THRESHOLD, Duration::from_millis(1));
        reg.register_or_refresh(addr(1), 9000);
        reg.register_or_refresh(addr(2), 9001);
        assert_eq!(
            reg.register_or_refresh(addr(3), 9002),
            RegistrationOutcome::Rejected
        );
        std::thread::sleep(Duration::from_millis(5));
        reg.sweep(Instant::now());
        assert_eq!(
            reg.register_or_refresh(addr(3), 9002),
            RegistrationOutcome::Added
        );
    }
}
