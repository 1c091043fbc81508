//! Encrypting persistence adapter decorator.
//!
//! Wraps any other adapter with AES-256-GCM encryption at rest.
//!
//! ## Security Model
//!
//! - The key is derived from a passphrase with HKDF-SHA256
//! - Every save draws a fresh random salt and a fresh random nonce
//! - Payload layout: `magic (4) || version (1) || salt (16) || nonce (12) || ciphertext || tag (16)`
//! - The authentication tag is verified on every load; a tampered or
//!   truncated payload fails with [`StorageError::InvalidEncryptedPayload`]
//! - Passphrases and derived keys are zeroized on drop

use crate::adapter::PersistenceAdapter;
use crate::error::{StorageError, StorageResult};
use aes_gcm::{
    aead::{generic_array::GenericArray, Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Size of the AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;
/// Size of the GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;
/// Size of the GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;
/// Size of the per-save key derivation salt in bytes.
pub const SALT_SIZE: usize = 16;

const MAGIC: &[u8; 4] = b"EMBE";
const FORMAT_VERSION: u8 = 1;
const HEADER_SIZE: usize = MAGIC.len() + 1 + SALT_SIZE + NONCE_SIZE;
const KDF_INFO: &[u8] = b"emberdb-adapter-key-v1";

/// Encryption key for AES-256-GCM.
///
/// The key is automatically zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey {
    bytes: [u8; KEY_SIZE],
}

impl EncryptionKey {
    /// Creates a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes slice is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> StorageResult<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(StorageError::KeyDerivation(format!(
                "invalid key size: expected {KEY_SIZE}, got {}",
                bytes.len()
            )));
        }
        let mut key_bytes = [0u8; KEY_SIZE];
        key_bytes.copy_from_slice(bytes);
        Ok(Self { bytes: key_bytes })
    }

    /// Derives a key from a passphrase using HKDF-SHA256.
    ///
    /// The same passphrase and salt always produce the same key.
    ///
    /// # Security
    ///
    /// HKDF is not a password hash and offers no brute-force resistance.
    /// The passphrase must already carry high entropy (a random token or
    /// generated key material), not a human-chosen password.
    pub fn derive_from_passphrase(passphrase: &[u8], salt: &[u8]) -> StorageResult<Self> {
        let hk = Hkdf::<Sha256>::new(Some(salt), passphrase);
        let mut bytes = [0u8; KEY_SIZE];
        hk.expand(KDF_INFO, &mut bytes)
            .map_err(|_| StorageError::KeyDerivation("HKDF expand failed".to_string()))?;
        Ok(Self { bytes })
    }

    /// Returns the key as a byte slice.
    ///
    /// Don't log or serialize the result.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(GenericArray::from_slice(&self.bytes))
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// An adapter that encrypts blobs before handing them to an inner adapter.
///
/// # Example
///
/// ```rust
/// use emberdb_storage::{EncryptedAdapter, MemoryAdapter, PersistenceAdapter};
///
/// let adapter = EncryptedAdapter::new(MemoryAdapter::new(), "correct horse battery staple");
/// adapter.save_database("app.db", b"secret").unwrap();
/// assert_eq!(adapter.load_database("app.db").unwrap(), Some(b"secret".to_vec()));
/// ```
pub struct EncryptedAdapter<A> {
    inner: A,
    passphrase: Zeroizing<Vec<u8>>,
}

impl<A: PersistenceAdapter> EncryptedAdapter<A> {
    /// Wraps `inner`, encrypting with a key derived from `passphrase`.
    ///
    /// The key comes from [`EncryptionKey::derive_from_passphrase`], so the
    /// passphrase must have high entropy. Low-entropy passwords can be
    /// brute-forced offline from a stolen file.
    pub fn new(inner: A, passphrase: impl AsRef<[u8]>) -> Self {
        Self {
            inner,
            passphrase: Zeroizing::new(passphrase.as_ref().to_vec()),
        }
    }

    /// Returns the wrapped adapter.
    pub fn inner(&self) -> &A {
        &self.inner
    }

    /// Encrypts `plaintext` into the self-describing payload layout.
    pub fn seal(&self, plaintext: &[u8]) -> StorageResult<Vec<u8>> {
        let mut rng = rand::thread_rng();
        let mut salt = [0u8; SALT_SIZE];
        rng.fill_bytes(&mut salt);
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rng.fill_bytes(&mut nonce_bytes);

        let key = EncryptionKey::derive_from_passphrase(&self.passphrase, &salt)?;
        let mut header = Vec::with_capacity(HEADER_SIZE);
        header.extend_from_slice(MAGIC);
        header.push(FORMAT_VERSION);
        header.extend_from_slice(&salt);
        header.extend_from_slice(&nonce_bytes);

        let ciphertext = key
            .cipher()
            .encrypt(
                Nonce::from_slice(&nonce_bytes),
                Payload {
                    msg: plaintext,
                    aad: &header[..MAGIC.len() + 1],
                },
            )
            .map_err(|_| StorageError::Encryption("AES-GCM encryption failed".to_string()))?;

        let mut sealed = header;
        sealed.extend(ciphertext);
        Ok(sealed)
    }

    /// Decrypts a payload produced by [`seal`](Self::seal).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidEncryptedPayload`] if the payload is too
    /// short, carries an unknown header, or fails authentication.
    pub fn open(&self, sealed: &[u8]) -> StorageResult<Vec<u8>> {
        if sealed.len() < HEADER_SIZE + TAG_SIZE {
            return Err(StorageError::invalid_payload("payload too short"));
        }
        if &sealed[..MAGIC.len()] != MAGIC {
            return Err(StorageError::invalid_payload("bad magic"));
        }
        let version = sealed[MAGIC.len()];
        if version != FORMAT_VERSION {
            return Err(StorageError::invalid_payload(format!(
                "unsupported payload version {version}"
            )));
        }

        let salt_start = MAGIC.len() + 1;
        let nonce_start = salt_start + SALT_SIZE;
        let salt = &sealed[salt_start..nonce_start];
        let nonce = Nonce::from_slice(&sealed[nonce_start..HEADER_SIZE]);

        let key = EncryptionKey::derive_from_passphrase(&self.passphrase, salt)?;
        key.cipher()
            .decrypt(
                nonce,
                Payload {
                    msg: &sealed[HEADER_SIZE..],
                    aad: &sealed[..salt_start],
                },
            )
            .map_err(|_| StorageError::invalid_payload("authentication failed"))
    }
}

impl<A: PersistenceAdapter> PersistenceAdapter for EncryptedAdapter<A> {
    fn load_database(&self, name: &str) -> StorageResult<Option<Vec<u8>>> {
        match self.inner.load_database(name)? {
            Some(sealed) => self.open(&sealed).map(Some),
            None => Ok(None),
        }
    }

    fn save_database(&self, name: &str, data: &[u8]) -> StorageResult<()> {
        let sealed = self.seal(data)?;
        debug!(name, plain = data.len(), sealed = sealed.len(), "encrypted database payload");
        self.inner.save_database(name, &sealed)
    }

    fn delete_database(&self, name: &str) -> StorageResult<()> {
        self.inner.delete_database(name)
    }

    fn kind(&self) -> &'static str {
        "encrypted"
    }
}

impl<A> std::fmt::Debug for EncryptedAdapter<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedAdapter")
            .field("cipher", &"Aes256Gcm")
            .field("passphrase", &"[REDACTED]")
            .finish()
    }
}
