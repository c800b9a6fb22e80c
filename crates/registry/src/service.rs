//! Registry service
//!
//! A credential is valid only when its root is currently Issued *and* its
//! proof links the leaf to that root. A mathematically valid proof against a
//! revoked or never-issued root reads as invalid.

use crate::{
    AccessPolicy, Action, CallerId, InMemoryStatusStore, OwnerOnly, Permit, RegistryConfig, RegistryError,
    RegistryState, Result, Status, StatusStore, Transition,
};
use merkle::{encode_hash, verify, verify_sorted, Hash32, Hasher, Keccak256, MerkleProof};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Detailed outcome of a proof check
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofCheck {
    Valid,
    /// Root was never issued
    NotIssued,
    /// Root was invalidated
    Revoked,
    /// Root is issued but the proof does not lead to it
    ProofMismatch,
}

impl ProofCheck {
    pub fn is_valid(self) -> bool {
        self == ProofCheck::Valid
    }
}

pub struct RegistryService<S = InMemoryStatusStore, P = OwnerOnly, H = Keccak256>
where
    S: StatusStore,
    P: AccessPolicy,
    H: Hasher,
{
    config: RegistryConfig,
    state: RegistryState<S>,
    policy: P,
    hasher: H,
}

impl<S: StatusStore, P: AccessPolicy> RegistryService<S, P, Keccak256> {
    pub fn new(config: RegistryConfig, state: RegistryState<S>, policy: P) -> Self {
        Self::with_hasher(config, state, policy, Keccak256)
    }
}

impl<S: StatusStore, P: AccessPolicy, H: Hasher> RegistryService<S, P, H> {
    pub fn with_hasher(config: RegistryConfig, state: RegistryState<S>, policy: P, hasher: H) -> Self {
        Self {
            config,
            state,
            policy,
            hasher,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn verification_url(&self) -> &str {
        &self.config.verification_url
    }

    pub fn state(&self) -> &RegistryState<S> {
        &self.state
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Run the access policy; the returned permit unlocks one action
    pub fn authorize(&self, caller: &CallerId, action: Action) -> Result<Permit> {
        if !self.policy.may_invoke(caller, action) {
            warn!(%caller, %action, "caller not authorized");
            return Err(RegistryError::Unauthorized {
                caller: caller.clone(),
                action,
            });
        }
        Ok(Permit::new(caller.clone(), action))
    }

    pub fn issue(&self, permit: &Permit, root: Hash32) -> Result<Transition> {
        check_permit(permit, Action::Issue)?;
        debug!(caller = %permit.caller(), root = %encode_hash(&root), "issue requested");
        self.state.issue(root)
    }

    pub fn invalidate(&self, permit: &Permit, root: Hash32) -> Result<Transition> {
        check_permit(permit, Action::Invalidate)?;
        debug!(caller = %permit.caller(), root = %encode_hash(&root), "invalidate requested");
        self.state.invalidate(root)
    }

    pub fn status(&self, root: &Hash32) -> Status {
        self.state.status(root)
    }

    pub fn is_issued(&self, root: &Hash32) -> bool {
        self.state.is_issued(root)
    }

    pub fn assess(&self, root: Hash32, leaf: Hash32, proof: &MerkleProof) -> ProofCheck {
        self.gate(root, || verify(&self.hasher, root, leaf, proof))
    }

    /// Is `leaf` under `root` a currently valid, non-revoked credential?
    pub fn check_proof(&self, root: Hash32, leaf: Hash32, proof: &MerkleProof) -> bool {
        self.assess(root, leaf, proof).is_valid()
    }

    /// `check_proof` for bare sorted-pair sibling arrays
    pub fn check_sorted_proof(&self, root: Hash32, leaf: Hash32, siblings: &[Hash32]) -> bool {
        let outcome = self.gate(root, || verify_sorted(&self.hasher, root, leaf, siblings));
        outcome.is_valid()
    }

    fn gate(&self, root: Hash32, proof_holds: impl FnOnce() -> bool) -> ProofCheck {
        let outcome = match self.state.status(&root) {
            Status::Unknown => ProofCheck::NotIssued,
            Status::Invalidated => ProofCheck::Revoked,
            Status::Issued => {
                if proof_holds() {
                    ProofCheck::Valid
                } else {
                    ProofCheck::ProofMismatch
                }
            }
        };
        debug!(root = %encode_hash(&root), ?outcome, "proof checked");
        outcome
    }
}

fn check_permit(permit: &Permit, expected: Action) -> Result<()> {
    if permit.action() != expected {
        return Err(RegistryError::PermitMismatch {
            expected,
            actual: permit.action(),
        });
    }
    Ok(())
}
