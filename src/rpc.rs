//! External RPC surface (§6): a contract boundary only. Transport,
//! authentication, and method marshaling are out of scope — this trait
//! exists so a future transport crate has a single well-typed interface
//! to implement, mirroring the teacher's `queries::Queries` static
//! query-method shape but as an object-safe trait instead of free
//! functions, since a real implementation will need connection state
//! (wallet handle, auth session) behind `self`.

use async_trait::async_trait;
use thiserror::Error;

use crate::ids::Amount;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("not authenticated")]
    Unauthenticated,
    #[error("unknown transaction id {0}")]
    UnknownTransaction(u64),
    #[error("unknown block height {0}")]
    UnknownBlock(u64),
    #[error("invalid address")]
    InvalidAddress,
}

/// Placeholder wire types: callers behind this boundary supply their
/// own transaction/block encodings; the core never constructs these
/// itself.
pub type SignedTransaction = Vec<u8>;
pub type SignedBlockHeader = Vec<u8>;

/// The JSON request/response surface described in §6. One in-flight
/// call per connection; the core publishes no events on this channel
/// beyond call replies.
#[async_trait]
pub trait RpcSurface: Send + Sync {
    async fn login(&self, user: &str, pass: &str) -> Result<bool, RpcError>;
    async fn transfer(&self, amount: Amount, address: &str) -> Result<u64, RpcError>;
    async fn getbalance(&self, asset_type: &str) -> Result<Amount, RpcError>;
    async fn get_transaction(&self, tx_id: u64) -> Result<SignedTransaction, RpcError>;
    async fn getblock(&self, height: u64) -> Result<SignedBlockHeader, RpcError>;
    async fn validateaddress(&self, address: &str) -> Result<bool, RpcError>;
    async fn import_bitcoin_wallet(&self, path: &str, pass: &str) -> Result<bool, RpcError>;
}
