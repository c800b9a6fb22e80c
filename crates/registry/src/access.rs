//! Authorization seam
//!
//! Who may issue or invalidate is decided by an `AccessPolicy` supplied by
//! the embedding application. The registry only accepts mutations carrying a
//! `Permit`, and a `Permit` can only be obtained from
//! `RegistryService::authorize`.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Issue,
    Invalidate,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Issue => f.write_str("issue"),
            Action::Invalidate => f.write_str("invalidate"),
        }
    }
}

/// Opaque caller identity (account, key fingerprint, service name)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallerId(String);

impl CallerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CallerId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

pub trait AccessPolicy: Send + Sync {
    fn may_invoke(&self, caller: &CallerId, action: Action) -> bool;
}

/// Single authority account allowed to do everything
#[derive(Clone, Debug)]
pub struct OwnerOnly {
    owner: CallerId,
}

impl OwnerOnly {
    pub fn new(owner: impl Into<CallerId>) -> Self {
        Self { owner: owner.into() }
    }
}

impl AccessPolicy for OwnerOnly {
    fn may_invoke(&self, caller: &CallerId, _action: Action) -> bool {
        *caller == self.owner
    }
}

/// Per-caller grants, e.g. separate issuing and revoking accounts
#[derive(Clone, Debug, Default)]
pub struct AllowList {
    grants: HashMap<CallerId, HashSet<Action>>,
}

impl AllowList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, caller: impl Into<CallerId>, action: Action) -> Self {
        self.grants.entry(caller.into()).or_default().insert(action);
        self
    }
}

impl AccessPolicy for AllowList {
    fn may_invoke(&self, caller: &CallerId, action: Action) -> bool {
        self.grants.get(caller).is_some_and(|actions| actions.contains(&action))
    }
}

/// Capability for exactly one kind of mutation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Permit {
    caller: CallerId,
    action: Action,
}

impl Permit {
    pub(crate) fn new(caller: CallerId, action: Action) -> Self {
        Self { caller, action }
    }

    pub fn caller(&self) -> &CallerId {
        &self.caller
    }

    pub fn action(&self) -> Action {
        self.action
    }
}
