use std::time::Duration;

/// Caps the doubling so a misconfigured retry count cannot overflow.
const MAX_BACKOFF_EXPONENT: u32 = 6;

/// Exponential delay between connect attempts: base, 2·base, 4·base, ...
pub(super) struct Backoff {
    base: Duration,
    attempt: u32,
}

impl Backoff {
    pub(super) fn new(base: Duration) -> Self {
        Self { base, attempt: 0 }
    }

    pub(super) fn next(&mut self) -> Duration {
        self.attempt += 1;
        self.base * 2u32.pow((self.attempt - 1).min(MAX_BACKOFF_EXPONENT))
    }
}
