//! Transaction variants, canonical byte encoding, and hash binding.
//!
//! The canonical encoding is a dedicated routine: a hash format is its own
//! thing, not whatever the crate's general serializer happens to emit.
//! `serde`/`serde_json` remain available elsewhere (the wallet file's
//! non-hashed bookkeeping); they are deliberately not used here.

use crate::address::{Address, ADDRESS_LEN};
use crate::error::{Result, WalletError};
use crate::hash::sha2_256;
use crate::xmss::XmssSignature;

const TAG_TRANSFER: u8 = 0;
const TAG_TOKEN: u8 = 1;
const TAG_TRANSFER_TOKEN: u8 = 2;
const TAG_MESSAGE: u8 = 3;
const TAG_SLAVE: u8 = 4;
const TAG_LATTICE_PUBLIC_KEY: u8 = 5;

const MAX_SYMBOL_LEN: usize = 10;
const MAX_NAME_LEN: usize = 30;
const MAX_DECIMALS: u8 = 19;
const MIN_MESSAGE_LEN: usize = 1;
const MAX_MESSAGE_LEN: usize = 80;
const MAX_SLAVES: usize = 100;

/// Appends fixed- and variable-length fields in a fixed order, with
/// explicit length prefixes on variable-length data so the resulting bytes
/// are unambiguous to re-parse.
struct CanonicalWriter(Vec<u8>);

impl CanonicalWriter {
    fn new() -> Self {
        Self(Vec::new())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.0.extend_from_slice(bytes);
        self
    }

    fn write_u64_be(&mut self, value: u64) -> &mut Self {
        self.0.extend_from_slice(&value.to_be_bytes());
        self
    }

    fn write_len_prefixed(&mut self, bytes: &[u8]) -> &mut Self {
        self.0.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        self.0.extend_from_slice(bytes);
        self
    }

    fn finish(self) -> Vec<u8> {
        self.0
    }
}

/// A (destination address, amount) pair shared by the Transfer and
/// TransferToken variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub address: Address,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxVariant {
    Transfer { destinations: Vec<Destination> },
    Token {
        symbol: Vec<u8>,
        name: Vec<u8>,
        owner: Address,
        decimals: u8,
        initial_balances: Vec<Destination>,
    },
    TransferToken {
        token_hash: [u8; 32],
        destinations: Vec<Destination>,
    },
    Message { data: Vec<u8> },
    Slave {
        slave_public_keys: Vec<Vec<u8>>,
        access_types: Vec<u8>,
    },
    LatticePublicKey {
        kyber_public_key: Vec<u8>,
        dilithium_public_key: Vec<u8>,
    },
}

impl TxVariant {
    fn tag(&self) -> u8 {
        match self {
            Self::Transfer { .. } => TAG_TRANSFER,
            Self::Token { .. } => TAG_TOKEN,
            Self::TransferToken { .. } => TAG_TRANSFER_TOKEN,
            Self::Message { .. } => TAG_MESSAGE,
            Self::Slave { .. } => TAG_SLAVE,
            Self::LatticePublicKey { .. } => TAG_LATTICE_PUBLIC_KEY,
        }
    }

    /// Per-variant field validation (address counts, amounts, payload sizes).
    fn validate(&self) -> Result<()> {
        match self {
            Self::Transfer { destinations } => validate_destinations(destinations),
            Self::Token {
                symbol,
                name,
                decimals,
                initial_balances,
                ..
            } => {
                if symbol.is_empty() || symbol.len() > MAX_SYMBOL_LEN {
                    return Err(WalletError::Validation(format!(
                        "token symbol must be 1..={MAX_SYMBOL_LEN} bytes, got {}",
                        symbol.len()
                    )));
                }
                if name.is_empty() || name.len() > MAX_NAME_LEN {
                    return Err(WalletError::Validation(format!(
                        "token name must be 1..={MAX_NAME_LEN} bytes, got {}",
                        name.len()
                    )));
                }
                if *decimals > MAX_DECIMALS {
                    return Err(WalletError::Validation(format!(
                        "decimals must be <= {MAX_DECIMALS}, got {decimals}"
                    )));
                }
                validate_destinations(initial_balances)
            }
            Self::TransferToken { destinations, .. } => validate_destinations(destinations),
            Self::Message { data } => {
                if data.len() < MIN_MESSAGE_LEN || data.len() > MAX_MESSAGE_LEN {
                    return Err(WalletError::Validation(format!(
                        "message must be {MIN_MESSAGE_LEN}..={MAX_MESSAGE_LEN} bytes, got {}",
                        data.len()
                    )));
                }
                Ok(())
            }
            Self::Slave {
                slave_public_keys,
                access_types,
            } => {
                if slave_public_keys.is_empty() {
                    return Err(WalletError::Validation("slave list must not be empty".to_string()));
                }
                if slave_public_keys.len() != access_types.len() {
                    return Err(WalletError::Validation(format!(
                        "slave_public_keys ({}) and access_types ({}) length mismatch",
                        slave_public_keys.len(),
                        access_types.len()
                    )));
                }
                if slave_public_keys.len() > MAX_SLAVES {
                    return Err(WalletError::Validation(format!(
                        "too many slaves: {} > {MAX_SLAVES}",
                        slave_public_keys.len()
                    )));
                }
                if access_types.iter().any(|a| *a > 1) {
                    return Err(WalletError::Validation("access_type must be 0 or 1".to_string()));
                }
                Ok(())
            }
            Self::LatticePublicKey { .. } => Ok(()),
        }
    }

    fn write_canonical(&self, w: &mut CanonicalWriter) {
        match self {
            Self::Transfer { destinations } => {
                write_destinations(w, destinations);
            }
            Self::Token {
                symbol,
                name,
                owner,
                decimals,
                initial_balances,
            } => {
                w.write_len_prefixed(symbol);
                w.write_len_prefixed(name);
                w.write_bytes(&owner.0);
                w.write_bytes(&[*decimals]);
                write_destinations(w, initial_balances);
            }
            Self::TransferToken { token_hash, destinations } => {
                w.write_bytes(token_hash);
                write_destinations(w, destinations);
            }
            Self::Message { data } => {
                w.write_len_prefixed(data);
            }
            Self::Slave {
                slave_public_keys,
                access_types,
            } => {
                w.write_u64_be(slave_public_keys.len() as u64);
                for (pk, access_type) in slave_public_keys.iter().zip(access_types.iter()) {
                    w.write_len_prefixed(pk);
                    w.write_bytes(&[*access_type]);
                }
            }
            Self::LatticePublicKey {
                kyber_public_key,
                dilithium_public_key,
            } => {
                w.write_len_prefixed(kyber_public_key);
                w.write_len_prefixed(dilithium_public_key);
            }
        }
    }
}

fn validate_destinations(destinations: &[Destination]) -> Result<()> {
    if destinations.is_empty() {
        return Err(WalletError::Validation("destination list must not be empty".to_string()));
    }
    if destinations.iter().any(|d| d.amount == 0) {
        return Err(WalletError::Validation("amounts must be greater than zero".to_string()));
    }
    Ok(())
}

fn write_destinations(w: &mut CanonicalWriter, destinations: &[Destination]) {
    w.write_u64_be(destinations.len() as u64);
    for d in destinations {
        w.write_bytes(&d.address.0);
        w.write_u64_be(d.amount);
    }
}

/// The 67-byte public key carried in every transaction envelope:
/// descriptor(3) || public-key-seed(32) || root(32).
pub const PUBLIC_KEY_LEN: usize = 3 + 32 + 32;

/// A fully built transaction: common envelope fields plus one variant.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub master_addr: Option<Address>,
    pub fee: u64,
    pub public_key: [u8; PUBLIC_KEY_LEN],
    pub nonce: u64,
    pub transaction_hash: [u8; 32],
    pub signature: Option<XmssSignature>,
    pub variant: TxVariant,
}

impl Transaction {
    /// Build and validate a transaction, computing its canonical hash.
    /// `nonce` and `signature` are left unset (0 / `None`) until the daemon
    /// fills them in during the relay pipeline.
    pub fn build(
        master_addr: Option<Address>,
        fee: u64,
        public_key: [u8; PUBLIC_KEY_LEN],
        variant: TxVariant,
    ) -> Result<Self> {
        variant.validate()?;

        let mut writer = CanonicalWriter::new();
        writer.write_bytes(&[variant.tag()]);
        variant.write_canonical(&mut writer);
        writer.write_len_prefixed(master_addr.map(|a| a.0).unwrap_or([0u8; ADDRESS_LEN]).as_slice());
        writer.write_bytes(&[u8::from(master_addr.is_some())]);
        writer.write_u64_be(fee);
        writer.write_bytes(&public_key);
        let canonical_bytes = writer.finish();

        let transaction_hash = sha2_256(&canonical_bytes);

        Ok(Self {
            master_addr,
            fee,
            public_key,
            nonce: 0,
            transaction_hash,
            signature: None,
            variant,
        })
    }
}
