//! Production implementations of the core environment seams.

use chrono::{DateTime, Utc};
use eventline_core::environment::{Clock, IdGenerator};

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Random 128-bit hex identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn next_id(&self) -> String {
        format!("{:032x}", rand::random::<u128>())
    }
}
