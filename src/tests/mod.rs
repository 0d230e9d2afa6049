//! Scenarios spanning more than one module, kept in-tree rather than as a
//! crate-root integration-test crate — each file here drives `WalletD`
//! through its public surface the way a real front end would.

mod lifecycle;
