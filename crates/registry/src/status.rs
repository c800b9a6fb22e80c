use merkle::Hash32;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a published root. Only ever moves forward:
/// Unknown -> Issued -> Invalidated, or Unknown -> Invalidated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Unknown,
    Issued,
    Invalidated,
}

impl Status {
    fn rank(self) -> u8 {
        match self {
            Status::Unknown => 0,
            Status::Issued => 1,
            Status::Invalidated => 2,
        }
    }

    /// Invalidated is sticky; issuing never resurrects a revoked root.
    pub fn after_issue(self) -> Status {
        match self {
            Status::Unknown => Status::Issued,
            other => other,
        }
    }

    pub fn after_invalidate(self) -> Status {
        Status::Invalidated
    }

    pub fn can_advance_to(self, next: Status) -> bool {
        next.rank() > self.rank()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Unknown => "unknown",
            Status::Issued => "issued",
            Status::Invalidated => "invalidated",
        };
        f.write_str(s)
    }
}

/// Outcome of a registry mutation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    #[serde(with = "hex::serde")]
    pub root: Hash32,
    pub previous: Status,
    pub current: Status,
}

impl Transition {
    /// False for idempotent no-ops
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}
