//! Sealing of secrets kept in the key-value store (the remote API key).
//!
//! Secrets are sealed with AES-256-GCM under a random per-install key. The
//! key lives in its own file next to the database, never in the store, so a
//! copy of the database alone does not reveal the secret.

use std::fs;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use tracing::info;
use zeroize::Zeroizing;

use crate::types::credential::SealedSecret;
use crate::types::errors::CryptoError;

/// AES-256-GCM key length in bytes.
pub const KEY_LENGTH: usize = 32;

/// Install-wide AES-256-GCM key for sealing secrets.
pub struct SealingKey {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl SealingKey {
    /// Builds a key from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != KEY_LENGTH {
            return Err(CryptoError::InvalidKey(format!(
                "Key must be {} bytes, got {}",
                KEY_LENGTH,
                bytes.len()
            )));
        }
        let unbound = UnboundKey::new(&AES_256_GCM, bytes)
            .map_err(|_| CryptoError::InvalidKey("Unusable key material".to_string()))?;
        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    /// Generates a fresh random key that is never written anywhere.
    pub fn generate() -> Result<Self, CryptoError> {
        let bytes = Self::random_bytes()?;
        Self::from_bytes(&bytes)
    }

    /// Reads the key file at `path`, creating it with a new random key when
    /// it does not exist yet.
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self, CryptoError> {
        let path = path.as_ref();
        if path.exists() {
            let bytes = Zeroizing::new(
                fs::read(path).map_err(|e| CryptoError::KeyStorage(e.to_string()))?,
            );
            return Self::from_bytes(&bytes);
        }

        let bytes = Self::random_bytes()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| CryptoError::KeyStorage(e.to_string()))?;
        }
        fs::write(path, bytes.as_slice()).map_err(|e| CryptoError::KeyStorage(e.to_string()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))
                .map_err(|e| CryptoError::KeyStorage(e.to_string()))?;
        }
        info!(path = %path.display(), "created sealing key");
        Self::from_bytes(&bytes)
    }

    fn random_bytes() -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let mut bytes = Zeroizing::new(vec![0u8; KEY_LENGTH]);
        SystemRandom::new()
            .fill(&mut bytes)
            .map_err(|_| CryptoError::RandomGeneration("Failed to generate key".to_string()))?;
        Ok(bytes)
    }

    /// Encrypts a UTF-8 secret into its storage form under a fresh nonce.
    pub fn seal(&self, secret: &str) -> Result<SealedSecret, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| CryptoError::RandomGeneration("Failed to generate nonce".to_string()))?;

        let mut in_out = secret.as_bytes().to_vec();
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::empty(),
                &mut in_out,
            )
            .map_err(|_| CryptoError::Encryption("Encryption operation failed".to_string()))?;

        Ok(SealedSecret {
            nonce: BASE64.encode(nonce_bytes),
            ciphertext: BASE64.encode(&in_out),
        })
    }

    /// Reverses [`SealingKey::seal`]. Fails on a foreign key or tampered data.
    pub fn open(&self, sealed: &SealedSecret) -> Result<Zeroizing<String>, CryptoError> {
        let nonce_bytes = decode_field("nonce", &sealed.nonce)?;
        let nonce = Nonce::try_assume_unique_for_key(&nonce_bytes).map_err(|_| {
            CryptoError::Decryption(format!(
                "Nonce must be {} bytes, got {}",
                NONCE_LEN,
                nonce_bytes.len()
            ))
        })?;

        let mut in_out = Zeroizing::new(decode_field("ciphertext", &sealed.ciphertext)?);
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| CryptoError::Decryption("invalid key or corrupted data".to_string()))?;

        let text = std::str::from_utf8(plaintext)
            .map_err(|e| CryptoError::Decryption(e.to_string()))?;
        Ok(Zeroizing::new(text.to_string()))
    }
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>, CryptoError> {
    BASE64
        .decode(value)
        .map_err(|e| CryptoError::Decryption(format!("Invalid base64 in {}: {}", name, e)))
}
