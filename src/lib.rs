//! Walletflow - wallet session and transaction submission core for EVM dApps.
//!
//! A [`session::WalletSession`] state machine tracks connection status, the
//! active account, and network validity against a static
//! [`networks`] registry, reacting to wallet-pushed events in arrival order.
//! A [`runner::OperationRunner`] serializes user-initiated operations behind
//! a single busy flag and maps every outcome (confirmed, failed, timed out)
//! into a uniform operation record. Contract surfaces - [`bank::Bank`],
//! [`dex::Dex`], [`sender::WalletSender`] - are parameterized by deployment
//! artifacts and submit through the [`chain::ChainClient`] boundary, which
//! has a wallet-backed implementation ([`rpc::RpcChainClient`]) and a
//! scripted one for tests ([`scripted::ScriptedClient`]).
//!
//! Presentation layers subscribe to session snapshots and operation records;
//! they own no state of their own.

pub mod amount;
pub mod artifact;
pub mod bank;
pub mod chain;
pub mod dex;
pub mod error;
pub mod networks;
pub mod rpc;
pub mod runner;
pub mod scripted;
pub mod sender;
pub mod session;

pub use artifact::DeploymentArtifact;
pub use chain::{CallSpec, ChainClient, TxHandle, TxReceipt};
pub use error::{Error, Result};
pub use networks::{ChainId, NetworkDescriptor, SurfaceContext};
pub use runner::{
    Operation, OperationKind, OperationRunner, OperationStatus, DEFAULT_CONFIRMATION_TIMEOUT,
};
pub use session::{Session, SessionStatus, WalletEvent, WalletEventSender, WalletSession};
