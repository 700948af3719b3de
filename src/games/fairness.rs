//! Seed commitments for provably fair rounds.
//!
//! The server publishes `commitment = SHA-256(server_seed)` before play, the
//! player contributes a client seed, and each round uses the next nonce. After
//! the seed is revealed anyone can check the commitment and replay the draws
//! with [`SeededSource`](crate::games::random::SeededSource).

use crate::errors::{FairdrawResult, FairnessError};
use crate::games::random::{RandomSource, SeededSource, SourceProvider};
use crate::games::types::RoundContext;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};

/// Hex SHA-256 of a server seed
pub fn commitment(server_seed: &str) -> String {
    hex::encode(Sha256::digest(server_seed.as_bytes()))
}

/// Check a revealed server seed against the commitment published earlier
pub fn verify_commitment(server_seed: &str, published: &str) -> Result<(), FairnessError> {
    if commitment(server_seed).eq_ignore_ascii_case(published.trim()) {
        Ok(())
    } else {
        Err(FairnessError::CommitmentMismatch)
    }
}

/// Generate a fresh 32-byte hex server seed
pub fn generate_server_seed() -> String {
    let mut bytes = [0u8; 32];
    rand_core::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Seed triple that fully determines a round's draws
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FairSeed {
    server_seed: String,
    client_seed: String,
    nonce: u64,
}

impl FairSeed {
    pub fn new(server_seed: &str, client_seed: &str, nonce: u64) -> Result<Self, FairnessError> {
        if server_seed.is_empty() {
            return Err(FairnessError::EmptySeed);
        }
        Ok(Self {
            server_seed: server_seed.to_string(),
            client_seed: client_seed.to_string(),
            nonce,
        })
    }

    pub fn server_seed(&self) -> &str {
        &self.server_seed
    }

    pub fn client_seed(&self) -> &str {
        &self.client_seed
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Public part of the seed; the server seed itself stays hidden until reveal.
    pub fn trace(&self) -> SeedTrace {
        SeedTrace {
            server_seed_hash: commitment(&self.server_seed),
            client_seed: self.client_seed.clone(),
            nonce: self.nonce,
        }
    }
}

/// Attached to round results so players can verify them later
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeedTrace {
    pub server_seed_hash: String,
    pub client_seed: String,
    pub nonce: u64,
}

/// One committed server seed shared by consecutive rounds, nonce incrementing per round
pub struct SeedChain {
    server_seed: String,
    client_seed: String,
    next_nonce: AtomicU64,
}

impl SeedChain {
    pub fn new(server_seed: &str, client_seed: &str) -> Result<Self, FairnessError> {
        if server_seed.is_empty() {
            return Err(FairnessError::EmptySeed);
        }
        Ok(Self {
            server_seed: server_seed.to_string(),
            client_seed: client_seed.to_string(),
            next_nonce: AtomicU64::new(0),
        })
    }

    /// Chain with a freshly generated server seed
    pub fn generate(client_seed: &str) -> Self {
        Self {
            server_seed: generate_server_seed(),
            client_seed: client_seed.to_string(),
            next_nonce: AtomicU64::new(0),
        }
    }

    pub fn commitment(&self) -> String {
        commitment(&self.server_seed)
    }

    pub fn next_nonce(&self) -> u64 {
        self.next_nonce.load(Ordering::SeqCst)
    }

    /// Reveal the server seed; the chain should be rotated afterwards.
    pub fn reveal(&self) -> &str {
        &self.server_seed
    }

    pub fn next_source(&self) -> Result<SeededSource, FairnessError> {
        let nonce = self.next_nonce.fetch_add(1, Ordering::SeqCst);
        Ok(SeededSource::new(FairSeed::new(
            &self.server_seed,
            &self.client_seed,
            nonce,
        )?))
    }
}

impl SourceProvider for SeedChain {
    fn source_for(&self, _round: &RoundContext) -> FairdrawResult<Box<dyn RandomSource + Send>> {
        Ok(Box::new(self.next_source()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commitment_round_trip() {
        let seed = generate_server_seed();
        let published = commitment(&seed);
        assert_eq!(published.len(), 64);
        assert!(verify_commitment(&seed, &published).is_ok());
        assert_eq!(
            verify_commitment("other", &published),
            Err(FairnessError::CommitmentMismatch)
        );
    }

    #[test]
    fn test_empty_server_seed_rejected() {
        assert_eq!(FairSeed::new("", "c", 0), Err(FairnessError::EmptySeed));
        assert!(SeedChain::new("", "c").is_err());
    }

    #[test]
    fn test_seed_chain_increments_nonce() {
        let chain = SeedChain::new("server", "client").unwrap();
        let first = chain.next_source().unwrap();
        let second = chain.next_source().unwrap();
        assert_eq!(first.trace().unwrap().nonce, 0);
        assert_eq!(second.trace().unwrap().nonce, 1);
        assert_eq!(chain.next_nonce(), 2);
    }

    #[test]
    fn test_trace_hides_server_seed() {
        let seed = FairSeed::new("very-secret", "client", 3).unwrap();
        let trace = seed.trace();
        assert_eq!(trace.server_seed_hash, commitment("very-secret"));
        assert!(!trace.server_seed_hash.contains("very-secret"));
    }
}
