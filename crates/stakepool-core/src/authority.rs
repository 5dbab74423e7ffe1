//! Signature authority
//!
//! The engine does not verify keys. It asks an [`Authority`] whether the
//! calling principal signed the request, then compares the principal with the
//! record's creator or owner itself.

use crate::types::Address;
use parking_lot::RwLock;
use std::collections::HashSet;

/// Answers whether a principal authorized the current call
pub trait Authority: Send + Sync {
    fn is_signer(&self, principal: &Address) -> bool;
}

/// Fixed set of principals considered to have signed
#[derive(Debug, Default)]
pub struct SignerSet {
    signers: RwLock<HashSet<Address>>,
}

impl SignerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_signers(signers: impl IntoIterator<Item = Address>) -> Self {
        Self {
            signers: RwLock::new(signers.into_iter().collect()),
        }
    }

    pub fn add(&self, principal: Address) {
        self.signers.write().insert(principal);
    }

    pub fn revoke(&self, principal: &Address) -> bool {
        self.signers.write().remove(principal)
    }
}

impl Authority for SignerSet {
    fn is_signer(&self, principal: &Address) -> bool {
        self.signers.read().contains(principal)
    }
}
