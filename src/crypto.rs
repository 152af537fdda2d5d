//! Cryptographic primitives for AuthChain (ECDSA over NIST P-384)

use crate::error::{ChainError, Result};
use p384::ecdsa::signature::hazmat::{PrehashVerifier, RandomizedPrehashSigner};
use p384::ecdsa::{Signature, SigningKey, VerifyingKey};
use p384::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 32-byte SHA-256 digest used for block identity and signed messages.
pub type Sha256Hash = [u8; 32];

pub const HASH_SIZE: usize = 32;

/// Length of a P-384 public key encoded as DER SubjectPublicKeyInfo
/// (uncompressed point). Validator fields in blocks have exactly this width.
pub const VALIDATOR_SIZE: usize = 120;

pub fn sha256(data: &[u8]) -> Sha256Hash {
    Sha256::digest(data).into()
}

/// Canonical fixed-width validator identity, used as the permission map key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValidatorKey([u8; VALIDATOR_SIZE]);

impl ValidatorKey {
    pub const fn from_bytes(bytes: [u8; VALIDATOR_SIZE]) -> Self {
        ValidatorKey(bytes)
    }

    /// Copies an encoded public key into the fixed-width field.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; VALIDATOR_SIZE] =
            bytes.try_into().map_err(|_| ChainError::SizeMismatch {
                field: "validator",
                expected: VALIDATOR_SIZE,
                actual: bytes.len(),
            })?;
        Ok(ValidatorKey(array))
    }

    pub fn as_bytes(&self) -> &[u8; VALIDATOR_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str.trim())?;
        Self::from_slice(&bytes)
    }

    fn verifying_key(&self) -> Result<VerifyingKey> {
        VerifyingKey::from_public_key_der(&self.0)
            .map_err(|e| ChainError::InvalidSignature(format!("Undecodable public key: {}", e)))
    }
}

impl fmt::Debug for ValidatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValidatorKey({})", self.to_hex())
    }
}

impl fmt::Display for ValidatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Signing capability consumed by block construction. Key management lives
/// behind this trait; the ledger never touches private key material.
pub trait BlockSigner {
    /// The encoded public key that will be embedded as the block validator.
    fn public_key_bytes(&self) -> Result<Vec<u8>>;

    /// Produces an ASN.1 DER signature over a precomputed digest.
    fn sign_digest(&self, digest: &Sha256Hash) -> Result<Vec<u8>>;
}

/// Verifies a DER-encoded ECDSA signature over `digest` against a validator key.
pub fn verify_signature(validator: &ValidatorKey, digest: &Sha256Hash, signature: &[u8]) -> Result<()> {
    let verifying_key = validator.verifying_key()?;

    let signature = Signature::from_der(signature)
        .map_err(|e| ChainError::InvalidSignature(format!("Malformed signature: {}", e)))?;

    verifying_key
        .verify_prehash(digest, &signature)
        .map_err(|_| ChainError::InvalidSignature("Signature verification failed".to_string()))
}

/// A named P-384 key pair.
#[derive(Clone)]
pub struct Identity {
    label: String,
    signing_key: SigningKey,
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity").field("label", &self.label).finish_non_exhaustive()
    }
}

impl Identity {
    /// Generates a new random identity using the OS random number generator.
    pub fn generate(label: &str) -> Self {
        Identity {
            label: label.to_string(),
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        self.signing_key.verifying_key()
    }

    pub fn validator_key(&self) -> Result<ValidatorKey> {
        ValidatorKey::from_slice(&self.public_key_bytes()?)
    }

    fn key_paths(dir: &Path, label: &str) -> (PathBuf, PathBuf) {
        (
            dir.join(format!("{}_prv.pem", label)),
            dir.join(format!("{}_pub.pem", label)),
        )
    }

    /// Writes the key pair as PKCS#8 / SPKI PEM files. Refuses to overwrite
    /// an existing identity.
    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        let (prv_path, pub_path) = Self::key_paths(dir, &self.label);
        if prv_path.exists() || pub_path.exists() {
            return Err(ChainError::Io(format!(
                "Keys for identity '{}' already exist in {}",
                self.label,
                dir.display()
            )));
        }

        let prv_pem = self
            .signing_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| ChainError::Io(format!("Failed to encode private key: {}", e)))?;
        let pub_pem = self
            .verifying_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| ChainError::Io(format!("Failed to encode public key: {}", e)))?;

        fs::write(&pub_path, pub_pem.as_bytes())?;
        fs::write(&prv_path, prv_pem.as_bytes())?;
        info!("Saved identity '{}' to {}", self.label, dir.display());
        Ok(())
    }

    /// Loads a key pair from PEM files and runs the challenge self-test.
    pub fn load(dir: &Path, label: &str) -> Result<Self> {
        let (prv_path, pub_path) = Self::key_paths(dir, label);
        if !prv_path.exists() {
            return Err(ChainError::NotFound(format!("identity '{}'", label)));
        }
        let prv_pem = fs::read_to_string(&prv_path)?;
        let pub_pem = fs::read_to_string(&pub_path)?;

        let signing_key = SigningKey::from_pkcs8_pem(&prv_pem)
            .map_err(|e| ChainError::Decode(format!("Invalid private key PEM: {}", e)))?;
        let public_key = VerifyingKey::from_public_key_pem(&pub_pem)
            .map_err(|e| ChainError::Decode(format!("Invalid public key PEM: {}", e)))?;

        if signing_key.verifying_key() != &public_key {
            return Err(ChainError::InvalidSignature(format!(
                "Public key on disk does not belong to identity '{}'",
                label
            )));
        }

        let identity = Identity {
            label: label.to_string(),
            signing_key,
        };
        identity.self_test()?;
        debug!("Loaded identity '{}'", label);
        Ok(identity)
    }

    pub fn load_or_create(dir: &Path, label: &str) -> Result<Self> {
        match Self::load(dir, label) {
            Ok(identity) => Ok(identity),
            Err(ChainError::NotFound(_)) => {
                info!("Generating keys for identity '{}'", label);
                let identity = Self::generate(label);
                identity.save(dir)?;
                Ok(identity)
            }
            Err(e) => Err(e),
        }
    }

    /// Signs a random challenge and checks it against the public key.
    pub fn self_test(&self) -> Result<()> {
        let mut challenge = [0u8; 16];
        OsRng.fill_bytes(&mut challenge);
        let digest = sha256(&challenge);
        let signature = self.sign_digest(&digest)?;
        verify_signature(&self.validator_key()?, &digest, &signature)
    }
}

impl BlockSigner for Identity {
    fn public_key_bytes(&self) -> Result<Vec<u8>> {
        let document = self
            .verifying_key()
            .to_public_key_der()
            .map_err(|e| ChainError::Decode(format!("Failed to encode public key: {}", e)))?;
        Ok(document.as_bytes().to_vec())
    }

    fn sign_digest(&self, digest: &Sha256Hash) -> Result<Vec<u8>> {
        let signature: Signature = self
            .signing_key
            .sign_prehash_with_rng(&mut OsRng, digest)
            .map_err(|e| ChainError::InvalidSignature(format!("Signing failed: {}", e)))?;
        Ok(signature.to_der().as_bytes().to_vec())
    }
}
