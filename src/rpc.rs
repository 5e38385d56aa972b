//! Wallet-backed chain client over an ethers JSON-RPC provider.
//!
//! Outside a browser there is no injected provider, so the local signer
//! plays the wallet's role: it holds the key, decides the active chain, and
//! tracks which networks it has been told about. `add_chain`/`switch_chain`
//! repoint the provider at the descriptor's first RPC endpoint, and a
//! successful switch pushes a `chainChanged` event to the session, the same
//! way a browser wallet would.

use std::collections::HashMap;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use async_trait::async_trait;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionRequest};
use tokio::sync::RwLock;
use tracing::{info, warn};
use url::Url;

use crate::chain::{CallSpec, ChainClient, TxHandle, TxReceipt};
use crate::error::{Error, Result};
use crate::networks::{ChainId, NetworkDescriptor};
use crate::session::WalletEventSender;

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(500);

type RpcMiddleware = SignerMiddleware<Provider<Http>, LocalWallet>;

struct ActiveNetwork {
    client: RpcMiddleware,
    chain_id: ChainId,
}

pub struct RpcChainClient {
    wallet: LocalWallet,
    active: RwLock<ActiveNetwork>,
    known_chains: RwLock<HashMap<ChainId, NetworkDescriptor>>,
    authorized: StdMutex<bool>,
    events: StdMutex<Option<WalletEventSender>>,
}

impl RpcChainClient {
    /// Connect to `descriptor`'s first RPC endpoint with the given signer.
    pub fn connect(descriptor: &NetworkDescriptor, wallet: LocalWallet) -> Result<Self> {
        let client = build_middleware(descriptor, &wallet)?;
        Ok(Self {
            wallet,
            active: RwLock::new(ActiveNetwork {
                client,
                chain_id: descriptor.chain_id,
            }),
            known_chains: RwLock::new(HashMap::from([(
                descriptor.chain_id,
                descriptor.clone(),
            )])),
            authorized: StdMutex::new(false),
            events: StdMutex::new(None),
        })
    }

    /// Wire the wallet-event channel so chain switches are pushed to the
    /// session like a browser wallet's `chainChanged`.
    pub fn set_event_sink(&self, sender: WalletEventSender) {
        *self.events.lock().expect("event sink lock poisoned") = Some(sender);
    }

    fn is_authorized(&self) -> bool {
        *self.authorized.lock().expect("authorization lock poisoned")
    }

    fn emit_chain_changed(&self, chain_id: ChainId) {
        let sink = self.events.lock().expect("event sink lock poisoned").clone();
        if let Some(events) = sink {
            events.chain_changed(chain_id);
        }
    }
}

fn build_middleware(descriptor: &NetworkDescriptor, wallet: &LocalWallet) -> Result<RpcMiddleware> {
    let raw = descriptor
        .rpc_urls
        .first()
        .ok_or_else(|| Error::Rpc(format!("{}: no rpc url", descriptor.display_name)))?;
    let url = Url::parse(raw).map_err(|e| Error::Rpc(format!("invalid rpc url '{raw}': {e}")))?;
    let provider = Provider::<Http>::try_from(url.as_str())
        .map_err(|e| Error::Rpc(format!("'{raw}': {e}")))?;
    Ok(SignerMiddleware::new(
        provider,
        wallet.clone().with_chain_id(descriptor.chain_id),
    ))
}

fn to_request(spec: &CallSpec) -> TransactionRequest {
    let mut tx = TransactionRequest::new().to(spec.to);
    if let Some(data) = &spec.data {
        tx = tx.data(data.clone());
    }
    if let Some(value) = spec.value {
        tx = tx.value(value);
    }
    if let Some(gas_price) = spec.gas_price {
        tx = tx.gas_price(gas_price);
    }
    tx
}

/// Classify a provider error message into the taxonomy, by substring the way
/// wallets and nodes phrase these failures.
fn classify_provider_error(raw: impl ToString) -> Error {
    let message = raw.to_string();
    let lower = message.to_lowercase();
    if lower.contains("rejected") || lower.contains("denied") {
        Error::UserRejected
    } else if lower.contains("insufficient funds") {
        Error::InsufficientFunds
    } else if lower.contains("revert") {
        Error::CallReverted(message)
    } else if lower.contains("connection")
        || lower.contains("transport")
        || lower.contains("network")
        || lower.contains("timed out")
    {
        Error::WalletUnavailable
    } else {
        Error::Rpc(message)
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn current_accounts(&self) -> Result<Vec<Address>> {
        if self.is_authorized() {
            Ok(vec![self.wallet.address()])
        } else {
            Ok(Vec::new())
        }
    }

    async fn current_chain_id(&self) -> Result<ChainId> {
        let active = self.active.read().await;
        let chain_id = active
            .client
            .get_chainid()
            .await
            .map_err(classify_provider_error)?;
        Ok(chain_id.as_u64())
    }

    async fn request_account_access(&self) -> Result<Address> {
        *self.authorized.lock().expect("authorization lock poisoned") = true;
        let account = self.wallet.address();
        info!(?account, "account access granted");
        Ok(account)
    }

    async fn switch_chain(&self, chain_id: ChainId) -> Result<()> {
        let descriptor = self
            .known_chains
            .read()
            .await
            .get(&chain_id)
            .cloned()
            .ok_or(Error::UnknownChain(chain_id))?;
        let client = build_middleware(&descriptor, &self.wallet)?;
        {
            let mut active = self.active.write().await;
            active.client = client;
            active.chain_id = chain_id;
        }
        info!(chain_id, network = descriptor.display_name, "active chain switched");
        self.emit_chain_changed(chain_id);
        Ok(())
    }

    async fn add_chain(&self, descriptor: &NetworkDescriptor) -> Result<()> {
        // Validate the endpoint before the wallet accepts the network.
        build_middleware(descriptor, &self.wallet)?;
        self.known_chains
            .write()
            .await
            .insert(descriptor.chain_id, descriptor.clone());
        info!(
            chain_id = descriptor.chain_id,
            network = descriptor.display_name,
            "network added to wallet"
        );
        Ok(())
    }

    async fn call(&self, spec: &CallSpec) -> Result<Bytes> {
        let tx: TypedTransaction = to_request(spec).into();
        let active = self.active.read().await;
        active
            .client
            .call(&tx, None)
            .await
            .map_err(classify_provider_error)
    }

    async fn send(&self, spec: &CallSpec) -> Result<TxHandle> {
        let tx = to_request(spec);
        let active = self.active.read().await;
        let pending = active
            .client
            .send_transaction(tx, None)
            .await
            .map_err(classify_provider_error)?;
        let handle = *pending;
        info!(?handle, to = ?spec.to, "transaction submitted");
        Ok(handle)
    }

    async fn wait(&self, handle: TxHandle, timeout: Duration) -> Result<TxReceipt> {
        let poll = async {
            loop {
                let found = {
                    let active = self.active.read().await;
                    active
                        .client
                        .get_transaction_receipt(handle)
                        .await
                        .map_err(classify_provider_error)?
                };
                if let Some(receipt) = found {
                    if receipt.status == Some(0u64.into()) {
                        warn!(?handle, "transaction reverted on chain");
                        return Err(Error::CallReverted(format!(
                            "transaction {handle:?} reverted"
                        )));
                    }
                    return Ok(receipt);
                }
                tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
            }
        };
        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| Error::Timeout(timeout))?
    }
}
