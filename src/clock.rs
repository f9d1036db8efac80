//! Injected clock and id generator, so a run can be made deterministic (I6).

use chrono::{DateTime, Utc};

/// Supplies the current time. The real implementation wraps [`Utc::now`];
/// tests inject a fixed clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Real wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Generates the random 128-bit page identifiers described in the data
/// model. The real implementation is backed by a UUIDv4; tests inject a
/// sequential generator.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> [u8; 16];
}

/// Generates identifiers from the system random source.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn next_id(&self) -> [u8; 16] {
        *uuid::Uuid::new_v4().as_bytes()
    }
}

#[cfg(test)]
pub(crate) struct FixedClock(pub DateTime<Utc>);

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
pub(crate) struct SequentialIdGenerator(pub std::sync::atomic::AtomicU128);

#[cfg(test)]
impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> [u8; 16] {
        let value = self
            .0
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        value.to_be_bytes()
    }
}
