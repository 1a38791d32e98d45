//! Per-slot request tokens used to drop responses that arrive after a newer
//! request was issued for the same slot.

/// Identifies one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestToken(u64);

/// A monotonically increasing counter for one logical slot
/// (the path view or the search view).
#[derive(Debug, Default)]
pub struct RequestSequence {
    latest: u64,
}

impl RequestSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a token that supersedes every earlier one.
    pub fn issue(&mut self) -> RequestToken {
        self.latest += 1;
        RequestToken(self.latest)
    }

    /// Whether a response carrying `token` may still be applied.
    pub fn is_latest(&self, token: RequestToken) -> bool {
        token.0 == self.latest
    }

    /// Supersedes all outstanding tokens without issuing a new request.
    pub fn invalidate(&mut self) {
        self.latest += 1;
    }
}
