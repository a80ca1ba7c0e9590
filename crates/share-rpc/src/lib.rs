//! Medshare RPC - Ethereum JSON-RPC access ledger
//!
//! Implements [`medshare_core::AccessLedger`] and
//! [`medshare_core::RecordCatalog`] against deployed access and catalog
//! contracts:
//! - Keccak-256 selectors and a minimal ABI codec
//! - `eth_call` reads at the latest block
//! - Writes through `eth_sendTransaction` that resolve only once mined
//!
//! # Example
//!
//! ```rust
//! use medshare_rpc::abi::selector;
//!
//! assert_eq!(selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
//! ```

pub mod abi;
pub mod client;
pub mod config;
pub mod contracts;
pub mod error;

pub use client::{ConfirmationPolicy, JsonRpcClient};
pub use config::LedgerConfig;
pub use contracts::EthLedger;
pub use error::{ConfigError, RpcError};
