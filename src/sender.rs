//! Raw value-transfer surface with wallet network switching.
//!
//! The only surface allowed to target the public testnets; transfers pin the
//! gas price rather than estimating it.

use std::sync::Arc;

use ethers::types::{Address, U256};

use crate::amount;
use crate::chain::{CallSpec, ChainClient};
use crate::error::{Error, Result};
use crate::networks::{self, ChainId};
use crate::runner::{Operation, OperationKind, OperationRunner};
use crate::session::Session;

/// Fixed gas price for raw transfers, in gwei.
pub const TRANSFER_GAS_PRICE_GWEI: u64 = 200;

fn transfer_gas_price() -> U256 {
    U256::from(TRANSFER_GAS_PRICE_GWEI) * U256::from(1_000_000_000u64)
}

pub struct WalletSender<C> {
    client: Arc<C>,
    runner: OperationRunner<C>,
}

impl<C: ChainClient> WalletSender<C> {
    pub fn new(client: Arc<C>, runner: OperationRunner<C>) -> Self {
        Self { client, runner }
    }

    /// Send native currency to `to`.
    pub async fn transfer(&self, session: &Session, to: Address, amount: &str) -> Result<Operation> {
        session.require_ready()?;
        let value = amount::parse_amount(amount)?;
        let spec = CallSpec::transfer(to, value).with_gas_price(transfer_gas_price());
        let client = Arc::clone(&self.client);
        self.runner
            .run(OperationKind::Transfer, move || async move {
                client.send(&spec).await
            })
            .await
    }

    /// Switch the wallet to one of the registered networks, as a tracked
    /// operation. The wallet pushes `chainChanged` on success, which is how
    /// the session's network verdict gets refreshed.
    pub async fn switch_network(&self, chain_id: ChainId) -> Result<Operation> {
        let descriptor = networks::lookup(chain_id)
            .ok_or(Error::UnknownChain(chain_id))?
            .clone();
        let client = Arc::clone(&self.client);
        let (op, ()) = self
            .runner
            .run_control(OperationKind::SwitchNetwork, move || async move {
                client.switch_network(&descriptor).await
            })
            .await?;
        Ok(op)
    }
}
