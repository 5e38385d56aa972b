//! Error taxonomy for the wallet session core.
//!
//! Every failure a caller can observe maps to exactly one of these kinds so
//! presentation layers can show a stable message per kind. Validation errors
//! (`InvalidAmount`, `Busy`, `WrongNetwork`) are raised locally and never
//! reach the chain client.

use std::time::Duration;

use thiserror::Error;

use crate::networks::ChainId;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// No wallet provider is reachable, or the wallet revoked access.
    #[error("wallet is unavailable")]
    WalletUnavailable,

    /// The user declined a wallet prompt.
    #[error("user rejected the wallet request")]
    UserRejected,

    /// The active chain is not accepted for the requesting surface.
    #[error("chain id {0} is not accepted for this surface")]
    WrongNetwork(ChainId),

    /// Local amount validation failed; the chain client was never contacted.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("insufficient funds")]
    InsufficientFunds,

    /// The chain rejected the call or transaction.
    #[error("call reverted: {0}")]
    CallReverted(String),

    /// Confirmation wait exceeded the configured timeout. The underlying
    /// transaction may still confirm later.
    #[error("confirmation wait exceeded {0:?}")]
    Timeout(Duration),

    /// The wallet refused or failed the add-network request.
    #[error("wallet could not add the requested network")]
    NetworkAddFailed,

    /// Another operation is already in flight for this session.
    #[error("another operation is already in flight")]
    Busy,

    /// The wallet does not know the requested chain (the add-network
    /// fallback in `ChainClient::switch_network` handles this one).
    #[error("chain id {0} is not known to the wallet")]
    UnknownChain(ChainId),

    /// A deployment artifact could not be parsed or did not describe the
    /// requested method.
    #[error("invalid deployment artifact: {0}")]
    Artifact(String),

    /// Transport-level failure that fits no other kind.
    #[error("rpc failure: {0}")]
    Rpc(String),
}
