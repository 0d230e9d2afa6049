//! A post-quantum wallet daemon for an XMSS-signed blockchain.
//!
//! The daemon manages a persistent set of XMSS key-pairs, mints and signs
//! transactions of several kinds, and relays them to a remote node. The
//! hard part is the XMSS key-state manager: correct bookkeeping of
//! one-time-signature indices, since reusing an OTS leaf catastrophically
//! weakens the signature and allows fund theft.
//!
//! # Architecture
//!
//! * **`xmss`** — seed-to-key derivation, WOTS+ chains, the Merkle
//!   authentication path, signing and verification. Stateless: it never
//!   owns an OTS cursor.
//! * **`seed`** — bidirectional mapping between the 51-byte extended seed,
//!   its 102-char hex form, and its 34-word mnemonic form.
//! * **`address`** — public-key to 39-byte address to `Q`-prefixed
//!   "qaddress" derivation and parsing.
//! * **`transaction`** — canonical, hash-stable encoding for every
//!   transaction variant, and the field-level validation each enforces.
//! * **`wallet`** — the on-disk, optionally encrypted, versioned store of
//!   address items, with atomic save.
//! * **`daemon`** — orchestrates the above behind the lock-state machine
//!   and relay pipeline: the library core the CLI and HTTP front ends
//!   both drive.
//! * **`node_client`** — the outbound contract to the remote blockchain
//!   node.
//! * **`api`** — the JSON-RPC-style HTTP front end exposing the daemon's
//!   method surface.
//! * **`config`** — TOML daemon configuration with environment overrides.
//! * **`error`** — the crate-wide error enum and its HTTP mapping.

pub mod address;
pub mod api;
pub mod config;
pub mod daemon;
pub mod descriptor;
pub mod error;
pub mod hash;
pub mod node_client;
pub mod seed;
pub mod transaction;
pub mod wallet;
pub mod xmss;

#[cfg(test)]
mod tests;
