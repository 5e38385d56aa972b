//! Wallet session state machine.
//!
//! Tracks connection status, the active account, and whether the active
//! network is valid for the surface in question. Wallet-pushed events
//! (`accountsChanged`, `chainChanged`) arrive through an ordered channel and
//! are applied by [`WalletSession::pump_events`], never interleaved into a
//! `connect()` that is in flight.

use std::sync::Arc;

use ethers::types::Address;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::chain::ChainClient;
use crate::error::{Error, Result};
use crate::networks::{self, ChainId, SurfaceContext};
use crate::runner::{OperationKind, OperationRunner};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Disconnected,
    Connecting,
    Connected,
}

/// Immutable snapshot of session state handed to presentation layers.
///
/// Invariant: `status == Connected` implies `account.is_some()`, and every
/// Connected state carries a definite `network_valid` verdict.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub status: SessionStatus,
    pub account: Option<Address>,
    pub chain_id: Option<ChainId>,
    pub network_valid: bool,
}

impl Session {
    fn disconnected() -> Self {
        Self {
            status: SessionStatus::Disconnected,
            account: None,
            chain_id: None,
            network_valid: false,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == SessionStatus::Connected && self.network_valid
    }

    /// Gate for financial operations: connected, on an accepted network.
    /// Resolved locally, the chain client is never contacted.
    pub fn require_ready(&self) -> Result<Address> {
        match self.status {
            SessionStatus::Connected if self.network_valid => {
                self.account.ok_or(Error::WalletUnavailable)
            }
            SessionStatus::Connected => {
                Err(Error::WrongNetwork(self.chain_id.unwrap_or_default()))
            }
            _ => Err(Error::WalletUnavailable),
        }
    }
}

/// Event pushed by the wallet provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WalletEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(ChainId),
}

/// Sending half of the wallet event channel; hand this to the provider glue.
#[derive(Clone)]
pub struct WalletEventSender(mpsc::UnboundedSender<WalletEvent>);

impl WalletEventSender {
    pub fn accounts_changed(&self, accounts: Vec<Address>) {
        let _ = self.0.send(WalletEvent::AccountsChanged(accounts));
    }

    pub fn chain_changed(&self, chain_id: ChainId) {
        let _ = self.0.send(WalletEvent::ChainChanged(chain_id));
    }
}

pub struct WalletSession<C> {
    client: Arc<C>,
    context: SurfaceContext,
    runner: OperationRunner<C>,
    state: Session,
    events: mpsc::UnboundedReceiver<WalletEvent>,
}

impl<C: ChainClient> WalletSession<C> {
    pub fn new(
        client: Arc<C>,
        context: SurfaceContext,
        runner: OperationRunner<C>,
    ) -> (Self, WalletEventSender) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let session = Self {
            client,
            context,
            runner,
            state: Session::disconnected(),
            events: event_rx,
        };
        (session, WalletEventSender(event_tx))
    }

    pub fn snapshot(&self) -> Session {
        self.state.clone()
    }

    /// Re-derive session state at startup by silently querying already
    /// authorized accounts; no user prompt. Jumps straight to Connected when
    /// an account exists and the network checks out.
    pub async fn resume(&mut self) -> Result<Session> {
        let accounts = self.client.current_accounts().await?;
        if let Some(account) = accounts.first().copied() {
            let chain_id = self.client.current_chain_id().await?;
            let network_valid = networks::is_accepted(chain_id, self.context);
            self.state.chain_id = Some(chain_id);
            self.state.network_valid = network_valid;
            if network_valid {
                self.state.status = SessionStatus::Connected;
                self.state.account = Some(account);
                info!(?account, chain_id, "session resumed from existing authorization");
            }
        }
        self.pump_events();
        Ok(self.snapshot())
    }

    /// Connect via a wallet prompt, as a tracked `Connect` operation.
    ///
    /// Idempotent when already Connected on a valid network: returns the
    /// current account without re-prompting. On wallet failure the session
    /// falls back to Disconnected and the error is surfaced. An account on a
    /// wrong network still connects; `network_valid` stays false until a
    /// chain change fixes it.
    pub async fn connect(&mut self) -> Result<Address> {
        if self.state.is_ready() {
            if let Some(account) = self.state.account {
                return Ok(account);
            }
        }

        let previous = self.state.clone();
        self.state.status = SessionStatus::Connecting;

        let client = Arc::clone(&self.client);
        let outcome = self
            .runner
            .run_control(OperationKind::Connect, move || async move {
                let account = client.request_account_access().await?;
                let chain_id = client.current_chain_id().await?;
                Ok((account, chain_id))
            })
            .await;

        let result = match outcome {
            Ok((_, (account, chain_id))) => {
                self.state = Session {
                    status: SessionStatus::Connected,
                    account: Some(account),
                    chain_id: Some(chain_id),
                    network_valid: networks::is_accepted(chain_id, self.context),
                };
                info!(
                    ?account,
                    chain_id,
                    valid = self.state.network_valid,
                    "wallet connected"
                );
                Ok(account)
            }
            Err(Error::Busy) => {
                // Local rejection, not a wallet failure: keep prior state.
                self.state = previous;
                Err(Error::Busy)
            }
            Err(e) => {
                warn!(error = %e, "wallet connect failed");
                self.state = Session::disconnected();
                Err(e)
            }
        };

        // Events that arrived while connect was in flight apply strictly
        // after the transition, in arrival order.
        self.pump_events();
        result
    }

    /// Explicit local reset; wallet-side disconnection is not assumed
    /// possible, so this only clears local state.
    pub fn disconnect_local(&mut self) {
        self.state = Session::disconnected();
        info!("session reset locally");
    }

    /// Apply queued wallet events in arrival order.
    pub fn pump_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.apply(event);
        }
    }

    fn apply(&mut self, event: WalletEvent) {
        match event {
            WalletEvent::AccountsChanged(accounts) => match accounts.first().copied() {
                None => {
                    warn!("wallet reports no authorized accounts, disconnecting");
                    self.state = Session::disconnected();
                    self.runner.fail_pending(Error::WalletUnavailable);
                }
                Some(account) => {
                    if self.state.status == SessionStatus::Connected {
                        info!(?account, "active account changed");
                        self.state.account = Some(account);
                    }
                }
            },
            WalletEvent::ChainChanged(chain_id) => {
                let network_valid = networks::is_accepted(chain_id, self.context);
                self.state.chain_id = Some(chain_id);
                self.state.network_valid = network_valid;
                info!(chain_id, valid = network_valid, "active chain changed");
            }
        }
    }
}
