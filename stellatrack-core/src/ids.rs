//! Time-based run identifiers.
use std::time::{SystemTime, UNIX_EPOCH};

/// Issues millisecond tokens that never repeat within one generator.
#[derive(Debug, Clone, Default)]
pub struct RunIdGenerator {
    last: u128,
}

impl RunIdGenerator {
    #[must_use]
    pub const fn new() -> Self {
        Self { last: 0 }
    }

    /// Next token: the current epoch milliseconds, bumped past the previous token.
    pub fn next_token(&mut self) -> u128 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        self.last = now.max(self.last + 1);
        self.last
    }

    /// Next id with `prefix` that `taken` does not already contain.
    pub fn next_id(&mut self, prefix: &str, taken: impl Fn(&str) -> bool) -> String {
        loop {
            let id = format!("{prefix}{}", self.next_token());
            if !taken(&id) {
                return id;
            }
        }
    }
}
