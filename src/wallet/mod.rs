//! The wallet file: a versioned, tagged-record JSON store of address
//! items. Atomic save follows a "write, then persist" discipline;
//! on-disk records are explicit tagged variants (plaintext vs. encrypted)
//! so an unknown tag is a hard deserialize error rather than a
//! silently-ignored field.

pub mod crypto;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use crate::error::{Result, WalletError};

pub const CURRENT_VERSION: u32 = 1;

/// One address's plaintext secret material, serialized and encrypted as a
/// unit when the wallet is encrypted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlainSecret {
    pub extended_seed_hex: String,
    pub mnemonic: String,
    pub height: u8,
    pub hash_function: u8,
}

/// A single wallet entry, either with its seed material in the clear or as
/// an opaque encrypted blob. `qaddress` and `ots_index` always stay in the
/// clear (even when encrypted) so the daemon can list addresses and
/// enforce the OTS monotonicity invariant without asking for the
/// passphrase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum AddressRecord {
    Plain {
        qaddress: String,
        extended_seed_hex: String,
        mnemonic: String,
        ots_index: u32,
        height: u8,
        hash_function: u8,
    },
    Encrypted {
        qaddress: String,
        ots_index: u32,
        /// Hex-encoded AES-256-GCM ciphertext of a serialized `PlainSecret`.
        encrypted_blob: String,
    },
}

impl AddressRecord {
    pub fn qaddress(&self) -> &str {
        match self {
            Self::Plain { qaddress, .. } | Self::Encrypted { qaddress, .. } => qaddress,
        }
    }

    pub fn ots_index(&self) -> u32 {
        match self {
            Self::Plain { ots_index, .. } | Self::Encrypted { ots_index, .. } => *ots_index,
        }
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self, Self::Encrypted { .. })
    }

    fn set_ots_index(&mut self, new_index: u32) {
        match self {
            Self::Plain { ots_index, .. } | Self::Encrypted { ots_index, .. } => *ots_index = new_index,
        }
    }

    /// Height and hash function are needed to drive the XMSS engine even
    /// when encrypted, since signing needs them before the seed is
    /// decrypted... except the seed itself is required too, so callers
    /// must decrypt first. This accessor only serves the plaintext case.
    fn plain_fields(&self) -> Option<(&str, &str, u8, u8)> {
        match self {
            Self::Plain {
                extended_seed_hex,
                mnemonic,
                height,
                hash_function,
                ..
            } => Some((extended_seed_hex, mnemonic, *height, *hash_function)),
            Self::Encrypted { .. } => None,
        }
    }
}

/// The on-disk wallet file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletFile {
    pub version: u32,
    pub encrypted: bool,
    pub addresses: Vec<AddressRecord>,
    /// Fields the current schema doesn't model, round-tripped verbatim.
    #[serde(flatten)]
    pub unknown_fields: Map<String, Value>,
}

impl Default for WalletFile {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            encrypted: false,
            addresses: Vec::new(),
            unknown_fields: Map::new(),
        }
    }
}

impl WalletFile {
    /// Load a wallet file, migrating forward from older schema versions.
    /// A file with no `version` key at all is treated as version 0 and
    /// upgraded in memory, then saved back, before this call returns.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let mut value: Value = serde_json::from_str(&raw)?;

        let version = value
            .get("version")
            .and_then(Value::as_u64)
            .unwrap_or(0);

        if version < CURRENT_VERSION as u64 {
            value
                .as_object_mut()
                .ok_or_else(|| WalletError::CorruptWallet("wallet file is not a JSON object".to_string()))?
                .insert("version".to_string(), Value::from(CURRENT_VERSION));
            let migrated: Self = serde_json::from_value(value)
                .map_err(|e| WalletError::CorruptWallet(format!("migration produced invalid schema: {e}")))?;
            migrated.save(path)?;
            return Ok(migrated);
        }

        let wallet: Self = serde_json::from_value(value)
            .map_err(|e| WalletError::CorruptWallet(format!("{e}")))?;
        Ok(wallet)
    }

    /// Load an existing wallet, or start a fresh empty one if the file
    /// doesn't exist yet.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Serialize to `<path>.tmp`, fsync, then rename over `path`. Rename
    /// is atomic on POSIX filesystems; no extra primitive is used for
    /// non-POSIX hosts.
    pub fn save(&self, path: &Path) -> Result<()> {
        let tmp_path = tmp_path_for(path);
        let bytes = serde_json::to_vec_pretty(self)?;

        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    pub fn find(&self, qaddress: &str) -> Option<&AddressRecord> {
        self.addresses.iter().find(|a| a.qaddress() == qaddress)
    }

    fn find_mut(&mut self, qaddress: &str) -> Option<&mut AddressRecord> {
        self.addresses.iter_mut().find(|a| a.qaddress() == qaddress)
    }

    /// True if any plaintext record already holds this hex seed. Duplicate
    /// detection across encrypted records is not attempted (it would need
    /// the passphrase); callers adding while encrypted rely on the qaddress
    /// derived from the seed instead, which is always in the clear.
    pub fn contains_seed_hex(&self, extended_seed_hex: &str) -> bool {
        self.addresses.iter().any(|a| {
            matches!(a, AddressRecord::Plain { extended_seed_hex: existing, .. } if existing == extended_seed_hex)
        })
    }

    pub fn contains_qaddress(&self, qaddress: &str) -> bool {
        self.addresses.iter().any(|a| a.qaddress() == qaddress)
    }

    /// Append a new plaintext record. Returns its qaddress.
    pub fn push_plain(
        &mut self,
        qaddress: String,
        extended_seed_hex: String,
        mnemonic: String,
        height: u8,
        hash_function: u8,
    ) -> String {
        self.addresses.push(AddressRecord::Plain {
            qaddress: qaddress.clone(),
            extended_seed_hex,
            mnemonic,
            ots_index: 0,
            height,
            hash_function,
        });
        qaddress
    }

    /// Remove by qaddress. Returns whether an entry was removed.
    pub fn remove(&mut self, qaddress: &str) -> bool {
        let before = self.addresses.len();
        self.addresses.retain(|a| a.qaddress() != qaddress);
        self.addresses.len() != before
    }

    pub fn ots_index(&self, qaddress: &str) -> Result<u32> {
        self.find(qaddress)
            .map(AddressRecord::ots_index)
            .ok_or_else(|| WalletError::UnknownSigner(qaddress.to_string()))
    }

    pub fn set_ots_index(&mut self, qaddress: &str, new_index: u32) -> Result<()> {
        let record = self
            .find_mut(qaddress)
            .ok_or_else(|| WalletError::UnknownSigner(qaddress.to_string()))?;
        record.set_ots_index(new_index);
        Ok(())
    }

    /// Plaintext seed material for signing. Fails with `WalletLocked`'s
    /// sibling condition if the record is encrypted — callers must decrypt
    /// the wallet (or the single item) first.
    pub fn plain_fields(&self, qaddress: &str) -> Result<(String, String, u8, u8)> {
        let record = self
            .find(qaddress)
            .ok_or_else(|| WalletError::UnknownSigner(qaddress.to_string()))?;
        record
            .plain_fields()
            .map(|(seed, mnemonic, height, hf)| (seed.to_string(), mnemonic.to_string(), height, hf))
            .ok_or(WalletError::Locked)
    }

    /// Encrypt every plaintext record's sensitive fields under `passphrase`,
    /// turning the wallet into its encrypted on-disk form.
    pub fn encrypt_all(&mut self, passphrase: &str) -> Result<()> {
        for record in &mut self.addresses {
            let plain = match &*record {
                AddressRecord::Plain {
                    qaddress,
                    extended_seed_hex,
                    mnemonic,
                    ots_index,
                    height,
                    hash_function,
                } => Some((
                    qaddress.clone(),
                    extended_seed_hex.clone(),
                    mnemonic.clone(),
                    *ots_index,
                    *height,
                    *hash_function,
                )),
                AddressRecord::Encrypted { .. } => None,
            };

            if let Some((qaddress, extended_seed_hex, mnemonic, ots_index, height, hash_function)) = plain {
                let secret = PlainSecret {
                    extended_seed_hex,
                    mnemonic,
                    height,
                    hash_function,
                };
                let plaintext = serde_json::to_vec(&secret)?;
                let ciphertext = crypto::encrypt(passphrase, &plaintext)?;
                *record = AddressRecord::Encrypted {
                    qaddress,
                    ots_index,
                    encrypted_blob: hex::encode(ciphertext),
                };
            }
        }
        self.encrypted = true;
        Ok(())
    }

    /// Decrypt every encrypted record under `passphrase`. Fails the whole
    /// operation (leaving state untouched) if any record fails to
    /// decrypt, which in practice means the passphrase is wrong.
    pub fn decrypt_all(&mut self, passphrase: &str) -> Result<()> {
        let mut decrypted = Vec::with_capacity(self.addresses.len());
        for record in &self.addresses {
            match record {
                AddressRecord::Encrypted {
                    qaddress,
                    ots_index,
                    encrypted_blob,
                } => {
                    let ciphertext = hex::decode(encrypted_blob)
                        .map_err(|_| WalletError::CorruptWallet("encrypted_blob is not valid hex".to_string()))?;
                    let plaintext = crypto::decrypt(passphrase, &ciphertext)?;
                    let secret: PlainSecret = serde_json::from_slice(&plaintext)
                        .map_err(|e| WalletError::CorruptWallet(format!("{e}")))?;
                    decrypted.push(AddressRecord::Plain {
                        qaddress: qaddress.clone(),
                        extended_seed_hex: secret.extended_seed_hex,
                        mnemonic: secret.mnemonic,
                        ots_index: *ots_index,
                        height: secret.height,
                        hash_function: secret.hash_function,
                    });
                }
                plain => decrypted.push(plain.clone()),
            }
        }
        self.addresses = decrypted;
        self.encrypted = false;
        Ok(())
    }
}

fn tmp_path_for(path: &Path) -> std::path::PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    std::path::PathBuf::from(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wallet.json");

        let mut wallet = WalletFile::default();
        wallet.push_plain(
            "Qdeadbeef".to_string(),
            "aa".repeat(51),
            "word ".repeat(34).trim().to_string(),
            4,
            1,
        );
        wallet.save(&path).unwrap();

        let loaded = WalletFile::load(&path).unwrap();
        assert_eq!(loaded.addresses.len(), 1);
        assert_eq!(loaded.version, CURRENT_VERSION);
        assert!(!dir.path().join("wallet.json.tmp").exists());
    }

    #[test]
    fn missing_version_is_migrated_and_persisted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wallet.json");
        fs::write(&path, r#"{"encrypted": false, "addresses": []}"#).unwrap();

        let loaded = WalletFile::load(&path).unwrap();
        assert_eq!(loaded.version, CURRENT_VERSION);

        let on_disk = fs::read_to_string(&path).unwrap();
        assert!(on_disk.contains("\"version\""));
    }

    #[test]
    fn encrypt_then_decrypt_restores_plain_fields() {
        let mut wallet = WalletFile::default();
        wallet.push_plain("Qabc".to_string(), "bb".repeat(51), "m ".repeat(34), 6, 0);

        wallet.encrypt_all("pw").unwrap();
        assert!(wallet.encrypted);
        assert!(wallet.find("Qabc").unwrap().is_encrypted());

        wallet.decrypt_all("pw").unwrap();
        assert!(!wallet.encrypted);
        let (seed_hex, _, height, _) = wallet.plain_fields("Qabc").unwrap();
        assert_eq!(seed_hex, "bb".repeat(51));
        assert_eq!(height, 6);
    }

    #[test]
    fn decrypt_with_wrong_passphrase_fails_and_leaves_state() {
        let mut wallet = WalletFile::default();
        wallet.push_plain("Qxyz".to_string(), "cc".repeat(51), "m ".repeat(34), 4, 0);
        wallet.encrypt_all("right").unwrap();

        let before = wallet.clone_for_test();
        let err = wallet.decrypt_all("wrong");
        assert!(err.is_err());
        assert_eq!(wallet.clone_for_test(), before);
    }

    #[test]
    fn remove_absent_qaddress_returns_false() {
        let mut wallet = WalletFile::default();
        assert!(!wallet.remove("Qnope"));
    }

    impl WalletFile {
        fn clone_for_test(&self) -> Vec<String> {
            self.addresses.iter().map(|a| a.qaddress().to_string()).collect()
        }
    }
}
