//! # chathub-id
//!
//! Distributed 64-bit ID generation for ChatHub.
//!
//! Ids pack a millisecond timestamp, a per-process service id, and a
//! per-millisecond sequence: `(millis << 22) | (service_id << 12) | seq`.
//! Within one generator ids are strictly increasing; across processes
//! distinct service ids guarantee uniqueness at identical timestamps.
//!
//! The generator assumes a forward-moving clock: sequence exhaustion
//! spin-waits for the next millisecond, but a backward clock jump can
//! produce non-monotonic ids until the clock catches up.

use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use tracing::info;

use chathub_core::config::id::IdGeneratorConfig;
use chathub_core::error::AppError;
use chathub_core::result::AppResult;

/// Custom epoch: 2020-01-01T00:00:00Z, in Unix milliseconds.
const EPOCH_MILLIS: i64 = 1_577_836_800_000;

/// Bits reserved for the per-process service id.
const SERVICE_BITS: u8 = 10;

/// Bits reserved for the per-millisecond sequence.
const SEQUENCE_BITS: u8 = 12;

/// Highest valid service id (inclusive).
pub const MAX_SERVICE_ID: u16 = (1 << SERVICE_BITS) - 1;

const MAX_SEQUENCE: u16 = (1 << SEQUENCE_BITS) - 1;

#[derive(Debug)]
struct GeneratorState {
    last_millis: i64,
    sequence: u16,
}

/// Thread-safe snowflake-style ID generator.
///
/// One instance per process; every process in the deployment must be
/// configured with a distinct service id.
#[derive(Debug)]
pub struct IdGenerator {
    service_id: u16,
    state: Mutex<GeneratorState>,
}

impl IdGenerator {
    /// Create a generator for the given service id.
    pub fn new(service_id: u16) -> AppResult<Self> {
        if service_id > MAX_SERVICE_ID {
            return Err(AppError::configuration(format!(
                "service_id {service_id} exceeds maximum {MAX_SERVICE_ID}"
            )));
        }

        info!(service_id, "ID generator initialized");
        Ok(Self {
            service_id,
            state: Mutex::new(GeneratorState {
                last_millis: -1,
                sequence: 0,
            }),
        })
    }

    /// Create a generator from configuration.
    pub fn from_config(config: &IdGeneratorConfig) -> AppResult<Self> {
        Self::new(config.service_id)
    }

    /// This generator's service id.
    pub fn service_id(&self) -> u16 {
        self.service_id
    }

    /// Generate the next id.
    ///
    /// Strictly increasing for this instance under a forward-moving clock.
    /// When the per-millisecond sequence is exhausted, spins until the
    /// clock advances.
    pub fn next_id(&self) -> i64 {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let mut now = current_millis();
        if now == state.last_millis {
            if state.sequence == MAX_SEQUENCE {
                while now <= state.last_millis {
                    std::hint::spin_loop();
                    now = current_millis();
                }
                state.sequence = 0;
            } else {
                state.sequence += 1;
            }
        } else {
            state.sequence = 0;
        }
        state.last_millis = now;

        (now << (SERVICE_BITS + SEQUENCE_BITS))
            | (i64::from(self.service_id) << SEQUENCE_BITS)
            | i64::from(state.sequence)
    }
}

/// Milliseconds since the ChatHub epoch.
fn current_millis() -> i64 {
    Utc::now().timestamp_millis() - EPOCH_MILLIS
}

/// Split an id back into `(millis_since_epoch, service_id, sequence)`.
pub fn decompose(id: i64) -> (i64, u16, u16) {
    let millis = id >> (SERVICE_BITS + SEQUENCE_BITS);
    let service_id = ((id >> SEQUENCE_BITS) & i64::from(MAX_SERVICE_ID)) as u16;
    let sequence = (id & i64::from(MAX_SEQUENCE)) as u16;
    (millis, service_id, sequence)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_rejects_out_of_range_service_id() {
        assert!(IdGenerator::new(MAX_SERVICE_ID).is_ok());
        assert!(IdGenerator::new(MAX_SERVICE_ID + 1).is_err());
    }

    #[test]
    fn test_ids_are_strictly_increasing_and_unique() {
        let generator = IdGenerator::new(1).unwrap();
        let mut seen = HashSet::new();
        let mut last = 0i64;
        for _ in 0..5000 {
            let id = generator.next_id();
            assert!(id > last, "id {id} not greater than {last}");
            assert!(seen.insert(id));
            last = id;
        }
    }

    #[test]
    fn test_decompose_round_trip() {
        let generator = IdGenerator::new(42).unwrap();
        let id = generator.next_id();
        let (_millis, service_id, _sequence) = decompose(id);
        assert_eq!(service_id, 42);
    }

    #[test]
    fn test_distinct_service_ids_never_collide() {
        let a = IdGenerator::new(1).unwrap();
        let b = IdGenerator::new(2).unwrap();
        let ids_a: HashSet<i64> = (0..1000).map(|_| a.next_id()).collect();
        let ids_b: HashSet<i64> = (0..1000).map(|_| b.next_id()).collect();
        assert!(ids_a.is_disjoint(&ids_b));
    }

    #[test]
    fn test_concurrent_generation_is_unique() {
        let generator = std::sync::Arc::new(IdGenerator::new(3).unwrap());
        let mut handles = Vec::new();
        for _ in 0..4 {
            let g = generator.clone();
            handles.push(std::thread::spawn(move || {
                (0..2000).map(|_| g.next_id()).collect::<Vec<_>>()
            }));
        }
        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
    }
}
