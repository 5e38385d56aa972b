//! DEX contract surface: reserves, liquidity, and both swap directions.
//!
//! Flows that spend tokens (token-for-ETH swap, add-liquidity) sequence an
//! allowance check and, when short, an approve-and-wait step before the
//! primary call. The whole sequence runs inside one Operation and never
//! releases the busy flag between steps.

use std::sync::Arc;
use std::time::Duration;

use ethers::abi::Token;
use ethers::types::{Address, U256};
use tracing::info;

use crate::amount;
use crate::artifact::DeploymentArtifact;
use crate::chain::{CallSpec, ChainClient};
use crate::error::Result;
use crate::runner::{Operation, OperationKind, OperationRunner};
use crate::session::Session;

pub struct Dex<C> {
    client: Arc<C>,
    runner: OperationRunner<C>,
    dex: DeploymentArtifact,
    token: DeploymentArtifact,
}

impl<C: ChainClient> Dex<C> {
    pub fn new(
        client: Arc<C>,
        runner: OperationRunner<C>,
        dex: DeploymentArtifact,
        token: DeploymentArtifact,
    ) -> Self {
        Self {
            client,
            runner,
            dex,
            token,
        }
    }

    /// Current pool reserves as (eth, token).
    pub async fn reserves(&self) -> Result<(U256, U256)> {
        let spec = CallSpec::method(&self.dex, "getReserves", &[])?;
        let raw = self.client.call(&spec).await?;
        self.dex.decode_uint_pair("getReserves", &raw)
    }

    /// Swap native currency for tokens.
    pub async fn swap_eth_for_token(&self, session: &Session, eth_amount: &str) -> Result<Operation> {
        session.require_ready()?;
        let value = amount::parse_amount(eth_amount)?;
        let spec = CallSpec::method(&self.dex, "swapETHForToken", &[])?.with_value(value);
        let client = Arc::clone(&self.client);
        self.runner
            .run(OperationKind::Swap, move || async move {
                client.send(&spec).await
            })
            .await
    }

    /// Swap tokens for native currency, approving the DEX first when the
    /// current allowance is short.
    pub async fn swap_token_for_eth(
        &self,
        session: &Session,
        token_amount: &str,
    ) -> Result<Operation> {
        let owner = session.require_ready()?;
        let value = amount::parse_amount(token_amount)?;
        let swap = CallSpec::method(&self.dex, "swapTokenForETH", &[Token::Uint(value)])?;
        let client = Arc::clone(&self.client);
        let token = self.token.clone();
        let spender = self.dex.address;
        let timeout = self.runner.confirmation_timeout();
        self.runner
            .run(OperationKind::Swap, move || async move {
                ensure_allowance(client.as_ref(), &token, owner, spender, value, timeout).await?;
                client.send(&swap).await
            })
            .await
    }

    /// Add liquidity: tokens plus attached native currency.
    pub async fn add_liquidity(
        &self,
        session: &Session,
        token_amount: &str,
        eth_amount: &str,
    ) -> Result<Operation> {
        let owner = session.require_ready()?;
        let tokens = amount::parse_amount(token_amount)?;
        let value = amount::parse_amount(eth_amount)?;
        let call = CallSpec::method(&self.dex, "addLiquidity", &[Token::Uint(tokens)])?
            .with_value(value);
        let client = Arc::clone(&self.client);
        let token = self.token.clone();
        let spender = self.dex.address;
        let timeout = self.runner.confirmation_timeout();
        self.runner
            .run(OperationKind::AddLiquidity, move || async move {
                ensure_allowance(client.as_ref(), &token, owner, spender, tokens, timeout).await?;
                client.send(&call).await
            })
            .await
    }
}

/// Check the spender's allowance and, when short, approve the required amount
/// and wait for the approval to confirm. Runs inside the caller's Operation.
async fn ensure_allowance<C: ChainClient + ?Sized>(
    client: &C,
    token: &DeploymentArtifact,
    owner: Address,
    spender: Address,
    required: U256,
    timeout: Duration,
) -> Result<()> {
    let spec = CallSpec::method(
        token,
        "allowance",
        &[Token::Address(owner), Token::Address(spender)],
    )?;
    let raw = client.call(&spec).await?;
    let allowance = token.decode_uint("allowance", &raw)?;
    if allowance >= required {
        return Ok(());
    }
    info!(%allowance, %required, "allowance short, requesting approval");
    let approve = CallSpec::method(
        token,
        "approve",
        &[Token::Address(spender), Token::Uint(required)],
    )?;
    let handle = client.send(&approve).await?;
    client.wait(handle, timeout).await?;
    Ok(())
}
