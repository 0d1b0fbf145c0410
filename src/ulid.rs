//! Record identifier generation.
//!
//! Identifiers are ULIDs. Within one millisecond the generator increments the
//! random component instead of redrawing it, so a single generator yields
//! strictly ascending identifiers.
use crate::clock::{Clock, SystemClock};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;
use tracing::warn;
use ::ulid::{Generator, Ulid};

pub const ULID_LEN: usize = 26;

/// Source of record identifiers for one or more conversions.
pub trait IdGenerator {
    fn next_id(&mut self) -> String;
}

/// Monotonic ULID generator bound to an injectable clock.
pub struct UlidGenerator {
    clock: Arc<dyn Clock>,
    rng: StdRng,
    generator: Generator,
}

impl UlidGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            rng: StdRng::from_entropy(),
            generator: Generator::new(),
        }
    }

    /// Deterministic generator for reproducible identifier sequences.
    pub fn seeded(clock: Arc<dyn Clock>, seed: u64) -> Self {
        Self {
            clock,
            rng: StdRng::seed_from_u64(seed),
            generator: Generator::new(),
        }
    }

    fn next_ulid(&mut self) -> Ulid {
        let now = SystemTime::from(self.clock.now());
        match self
            .generator
            .generate_from_datetime_with_source(now, &mut self.rng)
        {
            Ok(ulid) => ulid,
            Err(err) => {
                warn!("monotonic identifier space exhausted ({err}); drawing a fresh one");
                Ulid::from_datetime_with_source(now, &mut self.rng)
            }
        }
    }
}

impl Default for UlidGenerator {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl IdGenerator for UlidGenerator {
    fn next_id(&mut self) -> String {
        self.next_ulid().to_string()
    }
}

/// Generator that hands out the same identifier every time.
#[derive(Debug, Clone)]
pub struct FixedIdGenerator(pub String);

impl IdGenerator for FixedIdGenerator {
    fn next_id(&mut self) -> String {
        self.0.clone()
    }
}

/// A generator shared between worker threads.
pub struct SharedIds<G>(Mutex<G>);

impl<G: IdGenerator> SharedIds<G> {
    pub fn new(inner: G) -> Self {
        Self(Mutex::new(inner))
    }
}

impl<G: IdGenerator> IdGenerator for &SharedIds<G> {
    fn next_id(&mut self) -> String {
        match self.0.lock() {
            Ok(mut guard) => guard.next_id(),
            Err(poisoned) => poisoned.into_inner().next_id(),
        }
    }
}

/// Parse an identifier in its canonical form: 26 upper-case Crockford
/// characters that encode back to the same text.
fn parse_canonical(value: &str) -> Option<Ulid> {
    if value.len() != ULID_LEN {
        return None;
    }
    Ulid::from_string(value)
        .ok()
        .filter(|ulid| ulid.to_string() == value)
}

/// Check the ISAAC `record_id` shape.
pub fn is_valid_ulid(value: &str) -> bool {
    parse_canonical(value).is_some()
}

/// Recover the millisecond timestamp encoded in an identifier.
pub fn timestamp_ms(value: &str) -> Option<u64> {
    parse_canonical(value).map(|ulid| ulid.timestamp_ms())
}

#[cfg(test)]
#[path = "ulid_tests.rs"]
mod tests;
