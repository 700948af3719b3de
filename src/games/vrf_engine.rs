use crate::errors::{FairdrawResult, FairnessError};
use crate::games::fairness::FairSeed;
use crate::games::random::{RandomSource, SeededSource, SourceProvider};
use crate::games::types::{GameType, RoundContext};
use schnorrkel::{context::SigningContext, Keypair, PublicKey, Signature};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

const VRF_SIGNING_CONTEXT: &[u8] = b"fairdraw-round";

/// VRF bundle containing cryptographic proof
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VRFBundle {
    /// Hex-encoded VRF output (32 bytes), used as the round's server seed
    pub vrf_output: String,
    /// Hex-encoded VRF proof (64-byte schnorrkel signature)
    pub vrf_proof: String,
    /// Hex-encoded public key (32 bytes)
    pub public_key: String,
    /// Input message used for VRF
    pub input_message: String,
}

/// Derives per-round server seeds that the house cannot pick after the fact
pub struct VRFGameEngine {
    keypair: Arc<Keypair>,
}

impl VRFGameEngine {
    pub fn new(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    /// Random keypair (for testing and ephemeral tables)
    pub fn new_random() -> Self {
        use rand_core::OsRng;
        let keypair = Keypair::generate_with(OsRng);
        Self::new(keypair)
    }

    /// Deterministic input message for a round
    pub fn input_message(
        round_id: &str,
        game_type: GameType,
        player_id: &str,
        client_seed: &str,
    ) -> String {
        format!("{}:{}:{}:{}", round_id, game_type, player_id, client_seed)
    }

    /// Sign the round context and derive the server seed from the signature
    pub fn derive_server_seed(
        &self,
        round_id: &str,
        game_type: GameType,
        player_id: &str,
        client_seed: &str,
    ) -> VRFBundle {
        let input_message = Self::input_message(round_id, game_type, player_id, client_seed);
        let (vrf_output, vrf_proof) = self.vrf_sign(input_message.as_bytes());

        VRFBundle {
            vrf_output: hex::encode(vrf_output),
            vrf_proof: hex::encode(vrf_proof),
            public_key: hex::encode(self.keypair.public.to_bytes()),
            input_message,
        }
    }

    /// Output is SHA-256 of the signature; the signature is the proof.
    fn vrf_sign(&self, message: &[u8]) -> ([u8; 32], [u8; 64]) {
        let ctx = SigningContext::new(VRF_SIGNING_CONTEXT);
        let signature = self.keypair.sign(ctx.bytes(message));
        let proof = signature.to_bytes();
        let output: [u8; 32] = Sha256::digest(proof).into();
        (output, proof)
    }

    /// Public verification of a bundle against the input the verifier expects
    pub fn verify_vrf_proof(bundle: &VRFBundle, expected_input: &str) -> Result<bool, FairnessError> {
        if bundle.input_message != expected_input {
            return Ok(false);
        }

        let vrf_output = hex::decode(&bundle.vrf_output).map_err(|e| FairnessError::InvalidHex {
            field: "vrf_output",
            reason: e.to_string(),
        })?;
        let vrf_proof = hex::decode(&bundle.vrf_proof).map_err(|e| FairnessError::InvalidHex {
            field: "vrf_proof",
            reason: e.to_string(),
        })?;
        let public_key_bytes =
            hex::decode(&bundle.public_key).map_err(|e| FairnessError::InvalidHex {
                field: "public_key",
                reason: e.to_string(),
            })?;

        let public_key = PublicKey::from_bytes(&public_key_bytes)
            .map_err(|e| FairnessError::InvalidKey(format!("{:?}", e)))?;
        let signature = Signature::from_bytes(&vrf_proof)
            .map_err(|e| FairnessError::InvalidSignature(format!("{:?}", e)))?;

        let ctx = SigningContext::new(VRF_SIGNING_CONTEXT);
        if public_key
            .verify(ctx.bytes(expected_input.as_bytes()), &signature)
            .is_err()
        {
            return Ok(false);
        }

        let computed_output = Sha256::digest(&vrf_proof);
        Ok(computed_output.as_slice() == vrf_output.as_slice())
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.keypair.public.to_bytes())
    }
}

/// Source provider that derives every round's server seed through the VRF.
///
/// The nonce is always 0: each round already has its own signed input.
pub struct VrfSourceProvider {
    engine: VRFGameEngine,
    client_seed: String,
}

impl VrfSourceProvider {
    pub fn new(engine: VRFGameEngine, client_seed: &str) -> Self {
        Self {
            engine,
            client_seed: client_seed.to_string(),
        }
    }

    pub fn engine(&self) -> &VRFGameEngine {
        &self.engine
    }

    /// Rebuild the source a round used from its published bundle
    pub fn replay(bundle: &VRFBundle, client_seed: &str) -> Result<SeededSource, FairnessError> {
        Ok(SeededSource::new(FairSeed::new(
            &bundle.vrf_output,
            client_seed,
            0,
        )?))
    }
}

impl SourceProvider for VrfSourceProvider {
    fn source_for(&self, round: &RoundContext) -> FairdrawResult<Box<dyn RandomSource + Send>> {
        let bundle = self.engine.derive_server_seed(
            &round.round_id,
            round.game,
            &round.player_id,
            &self.client_seed,
        );
        tracing::debug!(round_id = %round.round_id, public_key = %bundle.public_key, "derived VRF server seed");
        Ok(Box::new(Self::replay(&bundle, &self.client_seed)?))
    }
}
