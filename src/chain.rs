//! The chain client boundary.
//!
//! All blockchain reads and writes funnel through the [`ChainClient`] trait.
//! The wallet-backed implementation lives in [`crate::rpc`]; the scripted
//! test implementation in [`crate::scripted`].

use std::time::Duration;

use async_trait::async_trait;
use ethers::abi::Token;
use ethers::types::{Address, Bytes, TransactionReceipt, TxHash, U256};
use tracing::{info, warn};

use crate::artifact::DeploymentArtifact;
use crate::error::{Error, Result};
use crate::networks::{ChainId, NetworkDescriptor};

/// Handle to a submitted transaction.
pub type TxHandle = TxHash;

/// Confirmation receipt; opaque to this core beyond presence and status.
pub type TxReceipt = TransactionReceipt;

/// A value transfer or contract method call to submit through the wallet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallSpec {
    pub to: Address,
    pub data: Option<Bytes>,
    pub value: Option<U256>,
    pub gas_price: Option<U256>,
}

impl CallSpec {
    /// A plain native-currency transfer.
    pub fn transfer(to: Address, value: U256) -> Self {
        Self {
            to,
            data: None,
            value: Some(value),
            gas_price: None,
        }
    }

    /// A contract method call built from a deployment artifact.
    pub fn method(artifact: &DeploymentArtifact, name: &str, args: &[Token]) -> Result<Self> {
        let data = artifact
            .function(name)?
            .encode_input(args)
            .map_err(|e| Error::Artifact(format!("{name}: {e}")))?;
        Ok(Self {
            to: artifact.address,
            data: Some(data.into()),
            value: None,
            gas_price: None,
        })
    }

    /// Attach native currency to the call.
    pub fn with_value(mut self, value: U256) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_gas_price(mut self, gas_price: U256) -> Self {
        self.gas_price = Some(gas_price);
        self
    }
}

/// Capability set of a wallet-injected provider.
///
/// Implementations are not responsible for mutual exclusion or timeouts
/// beyond [`ChainClient::wait`]; that policy lives in the operation runner.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Accounts already authorized for this app, without prompting.
    /// Empty when the wallet has not granted access.
    async fn current_accounts(&self) -> Result<Vec<Address>>;

    async fn current_chain_id(&self) -> Result<ChainId>;

    /// Prompt the user for account access; returns the first authorized
    /// account. Fails with `UserRejected` or `WalletUnavailable`.
    async fn request_account_access(&self) -> Result<Address>;

    /// Make `chain_id` the active chain. Fails with `UnknownChain` when the
    /// wallet has never been told about it.
    async fn switch_chain(&self, chain_id: ChainId) -> Result<()>;

    /// Register a network with the wallet.
    async fn add_chain(&self, descriptor: &NetworkDescriptor) -> Result<()>;

    /// Read-only contract call.
    async fn call(&self, spec: &CallSpec) -> Result<Bytes>;

    /// Submit a transaction.
    async fn send(&self, spec: &CallSpec) -> Result<TxHandle>;

    /// Wait until `handle` is confirmed, up to `timeout`. Fails with
    /// `Timeout` or `CallReverted`.
    async fn wait(&self, handle: TxHandle, timeout: Duration) -> Result<TxReceipt>;

    /// Switch to `descriptor`'s network, registering it with the wallet if
    /// unknown: exactly one add attempt followed by exactly one retry of the
    /// switch. A failed add maps to `NetworkAddFailed` and ends the attempt.
    async fn switch_network(&self, descriptor: &NetworkDescriptor) -> Result<()> {
        match self.switch_chain(descriptor.chain_id).await {
            Err(Error::UnknownChain(_)) => {
                info!(
                    chain_id = descriptor.chain_id,
                    network = descriptor.display_name,
                    "chain unknown to wallet, requesting add"
                );
                if let Err(e) = self.add_chain(descriptor).await {
                    warn!(
                        chain_id = descriptor.chain_id,
                        error = %e,
                        "add-network request failed"
                    );
                    return Err(Error::NetworkAddFailed);
                }
                self.switch_chain(descriptor.chain_id).await
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::networks::{self, BNB_TESTNET_CHAIN_ID, HARDHAT_CHAIN_ID};
    use crate::scripted::ScriptedClient;

    fn bnb_testnet() -> &'static NetworkDescriptor {
        networks::lookup(BNB_TESTNET_CHAIN_ID).unwrap()
    }

    #[test]
    fn test_callspec_transfer_carries_value_only() {
        let spec = CallSpec::transfer(Address::zero(), U256::from(7u64));
        assert_eq!(spec.value, Some(U256::from(7u64)));
        assert!(spec.data.is_none());
    }

    #[tokio::test]
    async fn test_switch_network_known_chain_switches_directly() {
        let client = ScriptedClient::new(HARDHAT_CHAIN_ID);
        client.add_known_chain(BNB_TESTNET_CHAIN_ID);

        client.switch_network(bnb_testnet()).await.unwrap();

        assert_eq!(client.current_chain_id().await.unwrap(), BNB_TESTNET_CHAIN_ID);
        assert_eq!(client.switch_calls(), 1);
        assert_eq!(client.add_calls(), 0);
    }

    #[tokio::test]
    async fn test_switch_network_unknown_chain_adds_then_retries_once() {
        let client = ScriptedClient::new(HARDHAT_CHAIN_ID);

        client.switch_network(bnb_testnet()).await.unwrap();

        assert_eq!(client.current_chain_id().await.unwrap(), BNB_TESTNET_CHAIN_ID);
        assert_eq!(client.switch_calls(), 2);
        assert_eq!(client.add_calls(), 1);
    }

    #[tokio::test]
    async fn test_switch_network_failed_add_is_network_add_failed_without_retry() {
        let client = ScriptedClient::new(HARDHAT_CHAIN_ID);
        client.fail_next_add(Error::UserRejected);

        let err = client.switch_network(bnb_testnet()).await.unwrap_err();

        assert_eq!(err, Error::NetworkAddFailed);
        assert_eq!(client.switch_calls(), 1);
        assert_eq!(client.add_calls(), 1);
        assert_eq!(client.current_chain_id().await.unwrap(), HARDHAT_CHAIN_ID);
    }
}
