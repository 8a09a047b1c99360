//! Device-bound storage for the provider API key.
//!
//! The key is encrypted with AES-256-CBC under a key derived from the host
//! name and OS user name, and persisted as `{"key": "<ivHex>:<cipherHex>"}`.
//! Nothing but the encrypted form is ever written to disk.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::constants::CREDENTIAL_PREFIX;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const IV_LEN: usize = 16;

/// The provider API key, held in memory only.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wraps a secret. Empty or whitespace-only input is not a credential.
    pub fn new(secret: impl Into<String>) -> Option<Self> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            None
        } else {
            Some(Self(secret))
        }
    }

    /// Accepts user input from the repair form: trimmed, and required to
    /// carry the provider prefix.
    pub fn parse_user_input(raw: &str) -> Result<Self, CredentialError> {
        let trimmed = raw.trim();
        if !trimmed.starts_with(CREDENTIAL_PREFIX) {
            return Err(CredentialError::InvalidFormat);
        }
        Self::new(trimmed).ok_or(CredentialError::InvalidFormat)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    InvalidFormat,
    Storage(String),
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialError::InvalidFormat => {
                write!(f, "API key must start with '{}'", CREDENTIAL_PREFIX)
            }
            CredentialError::Storage(message) => {
                write!(f, "Failed to store API key: {}", message)
            }
        }
    }
}

impl std::error::Error for CredentialError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptError {
    Malformed,
    Cipher,
    NotUtf8,
}

impl fmt::Display for DecryptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecryptError::Malformed => write!(f, "encrypted blob is malformed"),
            DecryptError::Cipher => write!(f, "ciphertext does not decrypt under this key"),
            DecryptError::NotUtf8 => write!(f, "decrypted bytes are not UTF-8"),
        }
    }
}

impl std::error::Error for DecryptError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineIdentity {
    pub hostname: String,
    pub username: String,
}

impl MachineIdentity {
    pub fn current() -> Self {
        Self {
            hostname: whoami::fallible::hostname().unwrap_or_else(|_| "unknown".to_string()),
            username: whoami::username(),
        }
    }

    pub fn new(hostname: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            username: username.into(),
        }
    }
}

/// 256-bit key recomputed for every encrypt/decrypt, never stored.
#[derive(Clone, PartialEq, Eq)]
pub struct DerivedKey([u8; 32]);

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey(***)")
    }
}

pub fn derive_key(identity: &MachineIdentity) -> DerivedKey {
    let mut hasher = Sha256::new();
    hasher.update(identity.hostname.as_bytes());
    hasher.update(identity.username.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest);
    DerivedKey(bytes)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedBlob {
    iv: [u8; IV_LEN],
    ciphertext: Vec<u8>,
}

impl EncryptedBlob {
    #[cfg(test)]
    pub(crate) fn ciphertext_mut(&mut self) -> &mut Vec<u8> {
        &mut self.ciphertext
    }
}

impl fmt::Display for EncryptedBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", hex::encode(self.iv), hex::encode(&self.ciphertext))
    }
}

impl FromStr for EncryptedBlob {
    type Err = DecryptError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (iv_hex, cipher_hex) = raw.trim().split_once(':').ok_or(DecryptError::Malformed)?;
        let iv_bytes = hex::decode(iv_hex).map_err(|_| DecryptError::Malformed)?;
        let iv: [u8; IV_LEN] = iv_bytes.try_into().map_err(|_| DecryptError::Malformed)?;
        let ciphertext = hex::decode(cipher_hex).map_err(|_| DecryptError::Malformed)?;
        if ciphertext.is_empty() || ciphertext.len() % IV_LEN != 0 {
            return Err(DecryptError::Malformed);
        }
        Ok(Self { iv, ciphertext })
    }
}

pub fn encrypt(secret: &str, key: &DerivedKey) -> EncryptedBlob {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    seal_with_iv(secret, key, iv)
}

pub(crate) fn seal_with_iv(secret: &str, key: &DerivedKey, iv: [u8; IV_LEN]) -> EncryptedBlob {
    let cipher = Aes256CbcEnc::new(GenericArray::from_slice(&key.0), GenericArray::from_slice(&iv));
    let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(secret.as_bytes());
    EncryptedBlob { iv, ciphertext }
}

pub fn open(blob: &EncryptedBlob, key: &DerivedKey) -> Result<String, DecryptError> {
    let cipher =
        Aes256CbcDec::new(GenericArray::from_slice(&key.0), GenericArray::from_slice(&blob.iv));
    let plaintext = cipher
        .decrypt_padded_vec_mut::<Pkcs7>(&blob.ciphertext)
        .map_err(|_| DecryptError::Cipher)?;
    String::from_utf8(plaintext).map_err(|_| DecryptError::NotUtf8)
}

/// Empty string on any failure; callers treat it as "no credential".
pub fn decrypt(blob: &EncryptedBlob, key: &DerivedKey) -> String {
    match open(blob, key) {
        Ok(secret) => secret,
        Err(err) => {
            debug!("Stored API key could not be decrypted: {}", err);
            String::new()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<String>,
}

pub struct CredentialVault {
    path: PathBuf,
    identity: MachineIdentity,
}

impl CredentialVault {
    pub fn new(path: PathBuf) -> Self {
        Self::with_identity(path, MachineIdentity::current())
    }

    pub fn with_identity(path: PathBuf, identity: MachineIdentity) -> Self {
        Self { path, identity }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn key(&self) -> DerivedKey {
        derive_key(&self.identity)
    }

    fn read_stored(&self) -> Option<StoredConfig> {
        let raw = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(config) => Some(config),
            Err(err) => {
                warn!("Ignoring unreadable key store {}: {}", self.path.display(), err);
                None
            }
        }
    }

    /// Missing file, missing `key`, undecryptable blobs, and plaintext
    /// without the key prefix all mean `None`. CBC has no MAC; the prefix
    /// check catches IV bit flips that still decrypt cleanly.
    pub fn load(&self) -> Option<Credential> {
        let stored = self.read_stored()?.key?;
        let blob = match stored.parse::<EncryptedBlob>() {
            Ok(blob) => blob,
            Err(err) => {
                debug!("Stored API key is not a valid blob: {}", err);
                return None;
            }
        };
        let secret = decrypt(&blob, &self.key());
        if !secret.is_empty() && !secret.starts_with(CREDENTIAL_PREFIX) {
            warn!("Stored API key decrypted to an unexpected value, ignoring it");
            return None;
        }
        Credential::new(secret)
    }

    pub fn save(&self, credential: &Credential) -> Result<(), CredentialError> {
        let blob = encrypt(credential.expose(), &self.key());
        let config = StoredConfig {
            key: Some(blob.to_string()),
        };
        let raw = serde_json::to_string(&config)
            .map_err(|e| CredentialError::Storage(format!("serialize: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| CredentialError::Storage(format!("create dir: {}", e)))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw).map_err(|e| CredentialError::Storage(format!("write: {}", e)))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            CredentialError::Storage(format!("replace: {}", e))
        })?;
        info!("API key saved to {}", self.path.display());
        Ok(())
    }

    pub fn clear(&self) -> Result<(), CredentialError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(CredentialError::Storage(format!("remove: {}", err))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn home_key() -> DerivedKey {
        derive_key(&MachineIdentity::new("mac-mini", "lan"))
    }

    #[test]
    fn derive_key_is_stable_and_identity_bound() {
        assert_eq!(home_key(), home_key());
        assert_ne!(home_key(), derive_key(&MachineIdentity::new("mac-mini", "minh")));
        assert_ne!(home_key(), derive_key(&MachineIdentity::new("office-pc", "lan")));
    }

    #[test]
    fn round_trips_secrets() {
        let key = home_key();
        let long = "x".repeat(257);
        for secret in ["gsk_abc123", "", "khóa bí mật 秘密 🔑", long.as_str()] {
            let blob = encrypt(secret, &key);
            assert_eq!(decrypt(&blob, &key), secret);
        }
    }

    #[test]
    fn fresh_iv_per_encryption() {
        let key = home_key();
        let a = encrypt("gsk_same", &key);
        let b = encrypt("gsk_same", &key);
        assert_ne!(a.to_string(), b.to_string());
    }

    #[test]
    fn blob_string_format() {
        let blob = seal_with_iv("gsk_abc", &home_key(), [7u8; 16]);
        let text = blob.to_string();
        let (iv_hex, cipher_hex) = text.split_once(':').unwrap();
        assert_eq!(iv_hex.len(), 32);
        assert_eq!(iv_hex, "07".repeat(16));
        assert_eq!(cipher_hex.len(), 32);
        assert_eq!(text.parse::<EncryptedBlob>().unwrap(), blob);
    }

    #[test]
    fn wrong_key_yields_empty() {
        let blob = seal_with_iv("gsk_live_secret_value", &home_key(), [3u8; 16]);
        let other = derive_key(&MachineIdentity::new("stranger", "eve"));
        assert_eq!(decrypt(&blob, &other), "");
    }

    #[test]
    fn tampered_ciphertext_never_returns_original() {
        let key = home_key();
        let secret = "gsk_0123456789abcdef0123456789";
        let mut blob = seal_with_iv(secret, &key, [9u8; 16]);
        let last = blob.ciphertext_mut().len() - 1;
        blob.ciphertext_mut()[last] ^= 0x5a;
        assert_ne!(decrypt(&blob, &key), secret);

        let mut blob = seal_with_iv(secret, &key, [9u8; 16]);
        blob.ciphertext_mut()[0] ^= 0x01;
        assert_ne!(decrypt(&blob, &key), secret);
    }

    #[test]
    fn malformed_blobs_are_rejected() {
        let empty_cipher = format!("{}:", "00".repeat(16));
        for raw in ["", "nocolon", "zz:00", "0011:abcd", empty_cipher.as_str()] {
            assert_eq!(raw.parse::<EncryptedBlob>(), Err(DecryptError::Malformed), "{raw}");
        }
    }

    #[test]
    fn credential_debug_is_redacted() {
        let credential = Credential::new("gsk_top_secret").unwrap();
        assert!(!format!("{:?}", credential).contains("top_secret"));
    }

    #[test]
    fn parse_user_input_checks_prefix() {
        assert!(matches!(
            Credential::parse_user_input("sk-openai"),
            Err(CredentialError::InvalidFormat)
        ));
        assert!(Credential::parse_user_input("").is_err());
        let parsed = Credential::parse_user_input("  gsk_abc \n").unwrap();
        assert_eq!(parsed.expose(), "gsk_abc");
    }

    #[test]
    fn save_then_load_in_a_new_vault() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let identity = MachineIdentity::new("mac-mini", "lan");

        let vault = CredentialVault::with_identity(path.clone(), identity.clone());
        assert!(vault.load().is_none());
        vault.save(&Credential::new("gsk_persisted").unwrap()).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("gsk_persisted"));
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(doc["key"].as_str().unwrap().contains(':'));
        assert!(!path.with_extension("json.tmp").exists());

        let reopened = CredentialVault::with_identity(path, identity);
        assert_eq!(reopened.load().unwrap().expose(), "gsk_persisted");
    }

    #[test]
    fn load_treats_foreign_or_broken_files_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mine = CredentialVault::with_identity(path.clone(), MachineIdentity::new("a", "b"));
        mine.save(&Credential::new("gsk_mine").unwrap()).unwrap();
        let theirs = CredentialVault::with_identity(path.clone(), MachineIdentity::new("c", "d"));
        assert!(theirs.load().is_none());

        fs::write(&path, "{}").unwrap();
        assert!(mine.load().is_none());
        fs::write(&path, "not json").unwrap();
        assert!(mine.load().is_none());
        fs::write(&path, r#"{"key":"deadbeef"}"#).unwrap();
        assert!(mine.load().is_none());
    }

    #[test]
    fn iv_bit_flip_is_not_accepted_as_a_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let vault = CredentialVault::with_identity(path.clone(), MachineIdentity::new("a", "b"));
        vault.save(&Credential::new("gsk_mine").unwrap()).unwrap();

        let doc: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let (iv_hex, cipher_hex) = doc["key"].as_str().unwrap().split_once(':').unwrap();
        let mut iv = hex::decode(iv_hex).unwrap();
        // 'g' ^ 0x01 == 'f': still valid padding, wrong prefix
        iv[0] ^= 0x01;
        let tampered = format!("{}:{}", hex::encode(&iv), cipher_hex);
        fs::write(&path, serde_json::json!({ "key": tampered }).to_string()).unwrap();

        assert!(vault.load().is_none());
    }

    #[test]
    fn clear_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let vault = CredentialVault::with_identity(
            dir.path().join("config.json"),
            MachineIdentity::new("a", "b"),
        );
        vault.save(&Credential::new("gsk_x").unwrap()).unwrap();
        vault.clear().unwrap();
        assert!(vault.load().is_none());
        vault.clear().unwrap();
    }
}
