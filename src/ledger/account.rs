use ed25519_dalek::{Signer as _, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use sha3::{Digest, Sha3_256};
use std::fmt;

use super::AccountAddress;
use crate::error::{AgentError, AgentResult};

/// Authentication-key scheme byte for single ed25519 keys.
const ED25519_SCHEME: u8 = 0x00;

/// A key pair held by this process. Holding it is what authenticates an
/// account as a transaction sender.
pub struct LocalAccount {
    signing_key: SigningKey,
    address: AccountAddress,
}

impl LocalAccount {
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = authentication_key(&signing_key.verifying_key());
        Self { signing_key, address }
    }

    pub fn from_private_key_hex(private_key: &str) -> AgentResult<Self> {
        let digits = private_key.trim().trim_start_matches("0x");
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| AgentError::signing(format!("invalid ed25519 private key: {}", e)))?;

        Ok(Self::from_signing_key(SigningKey::from_bytes(&bytes)))
    }

    pub fn address(&self) -> AccountAddress {
        self.address
    }

    pub fn public_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    pub fn public_key_hex(&self) -> String {
        format!("0x{}", hex::encode(self.public_key().as_bytes()))
    }

    pub fn private_key_hex(&self) -> String {
        format!("0x{}", hex::encode(self.signing_key.to_bytes()))
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl fmt::Debug for LocalAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalAccount")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// `sha3_256(public_key || scheme)`, which is also the address of a freshly
/// created account.
pub fn authentication_key(public_key: &VerifyingKey) -> AccountAddress {
    let mut hasher = Sha3_256::new();
    hasher.update(public_key.as_bytes());
    hasher.update([ED25519_SCHEME]);
    let digest = hasher.finalize();
    let mut bytes = [0u8; AccountAddress::LENGTH];
    bytes.copy_from_slice(&digest);
    AccountAddress::new(bytes)
}
