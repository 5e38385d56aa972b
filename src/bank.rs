//! Bank contract surface: deposits, withdrawals, and balance reads.
//!
//! One parameterized pairing of chain client and operation runner, configured
//! by the bank deployment artifact. Withdraw amounts are validated against
//! the last-known balance snapshot before the chain client is contacted.

use std::sync::{Arc, Mutex};

use ethers::abi::Token;
use ethers::types::U256;

use crate::amount;
use crate::artifact::DeploymentArtifact;
use crate::chain::{CallSpec, ChainClient};
use crate::error::Result;
use crate::runner::{Operation, OperationKind, OperationRunner};
use crate::session::Session;

pub struct Bank<C> {
    client: Arc<C>,
    runner: OperationRunner<C>,
    artifact: DeploymentArtifact,
    last_balance: Mutex<Option<U256>>,
}

impl<C: ChainClient> Bank<C> {
    pub fn new(client: Arc<C>, runner: OperationRunner<C>, artifact: DeploymentArtifact) -> Self {
        Self {
            client,
            runner,
            artifact,
            last_balance: Mutex::new(None),
        }
    }

    /// The caller's balance held in the bank. Refreshes the snapshot used by
    /// withdraw validation.
    pub async fn my_balance(&self) -> Result<U256> {
        let spec = CallSpec::method(&self.artifact, "getMyBalance", &[])?;
        let raw = self.client.call(&spec).await?;
        let balance = self.artifact.decode_uint("getMyBalance", &raw)?;
        *self.last_balance.lock().expect("balance snapshot lock poisoned") = Some(balance);
        Ok(balance)
    }

    /// Total value held by the bank contract itself.
    pub async fn contract_balance(&self) -> Result<U256> {
        let spec = CallSpec::method(&self.artifact, "getContractBalance", &[])?;
        let raw = self.client.call(&spec).await?;
        self.artifact.decode_uint("getContractBalance", &raw)
    }

    /// The balance snapshot from the most recent `my_balance` read.
    pub fn last_known_balance(&self) -> Option<U256> {
        *self.last_balance.lock().expect("balance snapshot lock poisoned")
    }

    /// Deposit `amount` (decimal ether string) into the bank.
    pub async fn deposit(&self, session: &Session, amount: &str) -> Result<Operation> {
        session.require_ready()?;
        let value = amount::parse_amount(amount)?;
        let spec = CallSpec::method(&self.artifact, "deposit", &[])?.with_value(value);
        let client = Arc::clone(&self.client);
        self.runner
            .run(OperationKind::Deposit, move || async move {
                client.send(&spec).await
            })
            .await
    }

    /// Withdraw `amount` from the bank. Fails fast with `InvalidAmount` when
    /// the amount is not positive or exceeds the last-known balance snapshot
    /// (a never-refreshed snapshot counts as zero).
    pub async fn withdraw(&self, session: &Session, amount: &str) -> Result<Operation> {
        session.require_ready()?;
        let snapshot = self.last_known_balance().unwrap_or_default();
        let value = amount::validate_withdraw(amount, snapshot)?;
        let spec = CallSpec::method(&self.artifact, "withdraw", &[Token::Uint(value)])?;
        let client = Arc::clone(&self.client);
        self.runner
            .run(OperationKind::Withdraw, move || async move {
                client.send(&spec).await
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::networks::HARDHAT_CHAIN_ID;
    use crate::runner::OperationStatus;
    use crate::scripted::{receipt_with_status, ScriptedClient};
    use crate::session::SessionStatus;
    use ethers::abi::encode;
    use ethers::types::{Address, TxHash};

    const BANK_JSON: &str = r#"{
        "address": "0x5FbDB2315678afecb367f032d93F642f64180aa3",
        "abi": [
            { "type": "function", "name": "deposit", "inputs": [], "outputs": [], "stateMutability": "payable" },
            { "type": "function", "name": "withdraw",
              "inputs": [{ "name": "amount", "type": "uint256" }], "outputs": [],
              "stateMutability": "nonpayable" },
            { "type": "function", "name": "getMyBalance", "inputs": [],
              "outputs": [{ "name": "", "type": "uint256" }], "stateMutability": "view" },
            { "type": "function", "name": "getContractBalance", "inputs": [],
              "outputs": [{ "name": "", "type": "uint256" }], "stateMutability": "view" }
        ]
    }"#;

    fn ready_session() -> Session {
        Session {
            status: SessionStatus::Connected,
            account: Some(Address::from_low_u64_be(0xabc)),
            chain_id: Some(HARDHAT_CHAIN_ID),
            network_valid: true,
        }
    }

    fn bank() -> (Arc<ScriptedClient>, Bank<ScriptedClient>) {
        let client = Arc::new(ScriptedClient::new(HARDHAT_CHAIN_ID));
        let runner = OperationRunner::new(Arc::clone(&client));
        let artifact = DeploymentArtifact::from_json(BANK_JSON).unwrap();
        let bank = Bank::new(Arc::clone(&client), runner, artifact);
        (client, bank)
    }

    fn eth(n: u64) -> U256 {
        U256::from(n) * U256::from(10u64.pow(18))
    }

    fn uint_output(value: U256) -> ethers::types::Bytes {
        encode(&[Token::Uint(value)]).into()
    }

    #[tokio::test]
    async fn test_my_balance_refreshes_snapshot() {
        let (client, bank) = bank();
        client.script_call(Ok(uint_output(eth(3))));

        let balance = bank.my_balance().await.unwrap();

        assert_eq!(balance, eth(3));
        assert_eq!(bank.last_known_balance(), Some(eth(3)));
    }

    #[tokio::test]
    async fn test_deposit_submits_and_confirms() {
        let (client, bank) = bank();
        let handle = TxHash::from_low_u64_be(1);
        client.script_send(Ok(handle));
        client.script_receipt(handle, Ok(receipt_with_status(true)));

        let op = bank.deposit(&ready_session(), "0.01").await.unwrap();

        assert_eq!(op.status, OperationStatus::Succeeded);
        assert_eq!(client.send_calls(), 1);
    }

    #[tokio::test]
    async fn test_deposit_invalid_amount_never_reaches_chain() {
        let (client, bank) = bank();

        let err = bank.deposit(&ready_session(), "abc").await.unwrap_err();

        assert!(matches!(err, Error::InvalidAmount(_)));
        assert_eq!(client.send_calls(), 0);
    }

    #[tokio::test]
    async fn test_deposit_on_wrong_network_rejected_locally() {
        let (client, bank) = bank();
        let mut session = ready_session();
        session.chain_id = Some(1);
        session.network_valid = false;

        let err = bank.deposit(&session, "0.01").await.unwrap_err();

        assert_eq!(err, Error::WrongNetwork(1));
        assert_eq!(client.send_calls(), 0);
    }

    #[tokio::test]
    async fn test_withdraw_exact_snapshot_succeeds() {
        let (client, bank) = bank();
        client.script_call(Ok(uint_output(eth(2))));
        bank.my_balance().await.unwrap();

        let handle = TxHash::from_low_u64_be(2);
        client.script_send(Ok(handle));
        client.script_receipt(handle, Ok(receipt_with_status(true)));

        let op = bank.withdraw(&ready_session(), "2").await.unwrap();

        assert_eq!(op.status, OperationStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_withdraw_over_snapshot_fails_locally() {
        let (client, bank) = bank();
        client.script_call(Ok(uint_output(eth(2))));
        bank.my_balance().await.unwrap();

        let err = bank
            .withdraw(&ready_session(), "2.000000000000000001")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidAmount(_)));
        assert_eq!(client.send_calls(), 0);
    }

    #[tokio::test]
    async fn test_withdraw_without_snapshot_fails_locally() {
        let (client, bank) = bank();

        let err = bank.withdraw(&ready_session(), "1").await.unwrap_err();

        assert!(matches!(err, Error::InvalidAmount(_)));
        assert_eq!(client.send_calls(), 0);
    }
}
