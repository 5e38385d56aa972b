//! Scripted chain client.
//!
//! Null implementation with scripted responses, used by the test suites for
//! the session, runner, and surface modules. Records how many times each
//! wallet capability was exercised so tests can assert on interaction counts.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use ethers::types::{Address, Bytes};

use crate::chain::{CallSpec, ChainClient, TxHandle, TxReceipt};
use crate::error::{Error, Result};
use crate::networks::{ChainId, NetworkDescriptor};

struct Script {
    accounts: Vec<Address>,
    chain_id: ChainId,
    known_chains: HashSet<ChainId>,
    access_responses: VecDeque<Result<Address>>,
    call_responses: VecDeque<Result<Bytes>>,
    send_responses: VecDeque<Result<TxHandle>>,
    /// Receipts by handle; a handle with no entry never confirms.
    receipts: HashMap<TxHandle, Result<TxReceipt>>,
    next_add_failure: Option<Error>,
    access_prompts: u32,
    switch_calls: u32,
    add_calls: u32,
    send_calls: u32,
}

pub struct ScriptedClient {
    script: Mutex<Script>,
}

impl ScriptedClient {
    pub fn new(chain_id: ChainId) -> Self {
        Self {
            script: Mutex::new(Script {
                accounts: Vec::new(),
                chain_id,
                known_chains: HashSet::from([chain_id]),
                access_responses: VecDeque::new(),
                call_responses: VecDeque::new(),
                send_responses: VecDeque::new(),
                receipts: HashMap::new(),
                next_add_failure: None,
                access_prompts: 0,
                switch_calls: 0,
                add_calls: 0,
                send_calls: 0,
            }),
        }
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().expect("script lock poisoned")
    }

    // ---- scripting ----

    pub fn authorize(&self, account: Address) {
        self.script().accounts = vec![account];
    }

    pub fn set_accounts(&self, accounts: Vec<Address>) {
        self.script().accounts = accounts;
    }

    pub fn set_chain_id(&self, chain_id: ChainId) {
        self.script().chain_id = chain_id;
    }

    pub fn add_known_chain(&self, chain_id: ChainId) {
        self.script().known_chains.insert(chain_id);
    }

    pub fn script_access(&self, response: Result<Address>) {
        self.script().access_responses.push_back(response);
    }

    pub fn script_call(&self, response: Result<Bytes>) {
        self.script().call_responses.push_back(response);
    }

    pub fn script_send(&self, response: Result<TxHandle>) {
        self.script().send_responses.push_back(response);
    }

    pub fn script_receipt(&self, handle: TxHandle, response: Result<TxReceipt>) {
        self.script().receipts.insert(handle, response);
    }

    pub fn fail_next_add(&self, error: Error) {
        self.script().next_add_failure = Some(error);
    }

    // ---- interaction counters ----

    pub fn access_prompts(&self) -> u32 {
        self.script().access_prompts
    }

    pub fn switch_calls(&self) -> u32 {
        self.script().switch_calls
    }

    pub fn add_calls(&self) -> u32 {
        self.script().add_calls
    }

    pub fn send_calls(&self) -> u32 {
        self.script().send_calls
    }
}

#[async_trait]
impl ChainClient for ScriptedClient {
    async fn current_accounts(&self) -> Result<Vec<Address>> {
        Ok(self.script().accounts.clone())
    }

    async fn current_chain_id(&self) -> Result<ChainId> {
        Ok(self.script().chain_id)
    }

    async fn request_account_access(&self) -> Result<Address> {
        let mut script = self.script();
        script.access_prompts += 1;
        if let Some(response) = script.access_responses.pop_front() {
            return response;
        }
        script.accounts.first().copied().ok_or(Error::UserRejected)
    }

    async fn switch_chain(&self, chain_id: ChainId) -> Result<()> {
        let mut script = self.script();
        script.switch_calls += 1;
        if script.known_chains.contains(&chain_id) {
            script.chain_id = chain_id;
            Ok(())
        } else {
            Err(Error::UnknownChain(chain_id))
        }
    }

    async fn add_chain(&self, descriptor: &NetworkDescriptor) -> Result<()> {
        let mut script = self.script();
        script.add_calls += 1;
        if let Some(error) = script.next_add_failure.take() {
            return Err(error);
        }
        script.known_chains.insert(descriptor.chain_id);
        Ok(())
    }

    async fn call(&self, _spec: &CallSpec) -> Result<Bytes> {
        self.script()
            .call_responses
            .pop_front()
            .unwrap_or_else(|| Err(Error::Rpc("unscripted call".to_string())))
    }

    async fn send(&self, _spec: &CallSpec) -> Result<TxHandle> {
        let mut script = self.script();
        script.send_calls += 1;
        let fallback = TxHandle::from_low_u64_be(script.send_calls as u64);
        script.send_responses.pop_front().unwrap_or(Ok(fallback))
    }

    async fn wait(&self, handle: TxHandle, timeout: Duration) -> Result<TxReceipt> {
        let scripted = self.script().receipts.get(&handle).cloned();
        match scripted {
            Some(response) => response,
            // Unscripted handles never confirm within the wait.
            None => {
                tokio::time::timeout(timeout, std::future::pending::<()>())
                    .await
                    .map_err(|_| Error::Timeout(timeout))?;
                unreachable!("pending future resolved")
            }
        }
    }
}

/// A receipt with the given status bit, for scripting confirmations.
pub fn receipt_with_status(success: bool) -> TxReceipt {
    let mut receipt = TxReceipt::default();
    receipt.status = Some(u64::from(success).into());
    receipt
}
