//! Deployment artifact input.
//!
//! Each deployed contract is described externally by `{ address, abi }` JSON
//! produced by the deployment tooling. The core treats the ABI as opaque
//! configuration: it is only handed to call construction and output decoding,
//! never interpreted beyond that.

use std::path::Path;

use ethers::abi::{Abi, Function, Token};
use ethers::types::{Address, U256};
use serde::Deserialize;

use crate::error::{Error, Result};

/// One on-chain contract surface, as supplied at startup.
#[derive(Clone, Debug, Deserialize)]
pub struct DeploymentArtifact {
    pub address: Address,
    pub abi: Abi,
}

impl DeploymentArtifact {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| Error::Artifact(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Artifact(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_json(&raw)
    }

    /// Degenerate configuration: a known fixed address with no callable
    /// interface, usable only as a transfer target.
    pub fn address_only(address: Address) -> Self {
        Self {
            address,
            abi: Abi::default(),
        }
    }

    pub(crate) fn function(&self, name: &str) -> Result<&Function> {
        self.abi
            .function(name)
            .map_err(|e| Error::Artifact(format!("{name}: {e}")))
    }

    /// Decode a single-uint return value.
    pub(crate) fn decode_uint(&self, name: &str, raw: &[u8]) -> Result<U256> {
        let tokens = self.decode_output(name, raw)?;
        match tokens.as_slice() {
            [Token::Uint(value)] => Ok(*value),
            _ => Err(Error::Artifact(format!("{name}: unexpected return shape"))),
        }
    }

    /// Decode a two-uint return value (e.g. pool reserves).
    pub(crate) fn decode_uint_pair(&self, name: &str, raw: &[u8]) -> Result<(U256, U256)> {
        let tokens = self.decode_output(name, raw)?;
        match tokens.as_slice() {
            [Token::Uint(a), Token::Uint(b)] => Ok((*a, *b)),
            _ => Err(Error::Artifact(format!("{name}: unexpected return shape"))),
        }
    }

    fn decode_output(&self, name: &str, raw: &[u8]) -> Result<Vec<Token>> {
        self.function(name)?
            .decode_output(raw)
            .map_err(|e| Error::Artifact(format!("{name}: {e}")))
    }
}
