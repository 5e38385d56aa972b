//! Static registry of supported networks.
//!
//! Pure lookup tables, no state. Which chains count as valid depends on the
//! app surface asking: the bank and DEX deployments live on the local dev
//! chain, while the raw-transfer sender targets public testnets.

/// Numeric identifier of a blockchain network.
pub type ChainId = u64;

/// Native currency metadata as wallets expect it in add-network requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NativeCurrency {
    pub name: &'static str,
    pub symbol: &'static str,
    pub decimals: u8,
}

/// A supported network with display metadata and RPC endpoints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkDescriptor {
    pub chain_id: ChainId,
    pub display_name: &'static str,
    pub rpc_urls: &'static [&'static str],
    pub block_explorer_urls: &'static [&'static str],
    pub native_currency: NativeCurrency,
}

pub const HARDHAT_CHAIN_ID: ChainId = 31337;
pub const BNB_TESTNET_CHAIN_ID: ChainId = 97;
pub const POLYGON_MUMBAI_CHAIN_ID: ChainId = 80001;

const ETH: NativeCurrency = NativeCurrency {
    name: "Ether",
    symbol: "ETH",
    decimals: 18,
};

/// All networks this app knows how to describe to a wallet.
pub const NETWORKS: &[NetworkDescriptor] = &[
    NetworkDescriptor {
        chain_id: HARDHAT_CHAIN_ID,
        display_name: "Hardhat Local",
        rpc_urls: &["http://127.0.0.1:8545"],
        block_explorer_urls: &[],
        native_currency: ETH,
    },
    NetworkDescriptor {
        chain_id: BNB_TESTNET_CHAIN_ID,
        display_name: "BNB Smart Chain Testnet",
        rpc_urls: &["https://data-seed-prebsc-1-s1.binance.org:8545/"],
        block_explorer_urls: &["https://bsc-testnet.publicnode.com"],
        native_currency: NativeCurrency {
            name: "BNB",
            symbol: "BNB",
            decimals: 18,
        },
    },
    NetworkDescriptor {
        chain_id: POLYGON_MUMBAI_CHAIN_ID,
        display_name: "Polygon Mumbai",
        rpc_urls: &["https://polygon-mumbai-bor-rpc.publicnode.com"],
        block_explorer_urls: &["https://mumbai.polygonscan.com"],
        native_currency: NativeCurrency {
            name: "MATIC",
            symbol: "MATIC",
            decimals: 18,
        },
    },
];

/// Which app surface is asking; surfaces accept different network sets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceContext {
    Bank,
    Dex,
    Sender,
}

const LOCAL_CHAINS: &[ChainId] = &[HARDHAT_CHAIN_ID];
const SENDER_CHAINS: &[ChainId] = &[BNB_TESTNET_CHAIN_ID, POLYGON_MUMBAI_CHAIN_ID];

/// Find a network descriptor by chain ID.
pub fn lookup(chain_id: ChainId) -> Option<&'static NetworkDescriptor> {
    NETWORKS.iter().find(|n| n.chain_id == chain_id)
}

/// The chain IDs a surface accepts.
pub fn accepted_chain_ids(context: SurfaceContext) -> &'static [ChainId] {
    match context {
        SurfaceContext::Bank | SurfaceContext::Dex => LOCAL_CHAINS,
        SurfaceContext::Sender => SENDER_CHAINS,
    }
}

/// Check whether a chain ID is valid for the given surface.
pub fn is_accepted(chain_id: ChainId, context: SurfaceContext) -> bool {
    accepted_chain_ids(context).contains(&chain_id)
}

/// Parse a wallet-style hex chain ID ("0x7a69" -> 31337).
pub fn parse_chain_id_hex(raw: &str) -> Option<ChainId> {
    let digits = raw.trim().strip_prefix("0x")?;
    ChainId::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== lookup tests ====================

    #[test]
    fn test_lookup_hardhat() {
        let network = lookup(HARDHAT_CHAIN_ID);
        assert!(network.is_some());
        let network = network.unwrap();
        assert_eq!(network.display_name, "Hardhat Local");
        assert_eq!(network.native_currency.symbol, "ETH");
    }

    #[test]
    fn test_lookup_bnb_testnet() {
        let network = lookup(BNB_TESTNET_CHAIN_ID);
        assert!(network.is_some());
        assert_eq!(network.unwrap().native_currency.symbol, "BNB");
    }

    #[test]
    fn test_lookup_not_found() {
        assert!(lookup(999999).is_none());
    }

    // ==================== is_accepted tests ====================

    #[test]
    fn test_bank_accepts_local_only() {
        assert!(is_accepted(HARDHAT_CHAIN_ID, SurfaceContext::Bank));
        assert!(!is_accepted(BNB_TESTNET_CHAIN_ID, SurfaceContext::Bank));
        assert!(!is_accepted(1, SurfaceContext::Bank));
    }

    #[test]
    fn test_dex_accepts_local_only() {
        assert!(is_accepted(HARDHAT_CHAIN_ID, SurfaceContext::Dex));
        assert!(!is_accepted(POLYGON_MUMBAI_CHAIN_ID, SurfaceContext::Dex));
    }

    #[test]
    fn test_sender_accepts_public_testnets() {
        assert!(is_accepted(BNB_TESTNET_CHAIN_ID, SurfaceContext::Sender));
        assert!(is_accepted(POLYGON_MUMBAI_CHAIN_ID, SurfaceContext::Sender));
        assert!(!is_accepted(HARDHAT_CHAIN_ID, SurfaceContext::Sender));
    }

    // ==================== parse_chain_id_hex tests ====================

    #[test]
    fn test_parse_chain_id_hex_hardhat() {
        assert_eq!(parse_chain_id_hex("0x7a69"), Some(HARDHAT_CHAIN_ID));
    }

    #[test]
    fn test_parse_chain_id_hex_bnb_testnet() {
        assert_eq!(parse_chain_id_hex("0x61"), Some(BNB_TESTNET_CHAIN_ID));
    }

    #[test]
    fn test_parse_chain_id_hex_mumbai() {
        assert_eq!(parse_chain_id_hex("0x13881"), Some(POLYGON_MUMBAI_CHAIN_ID));
    }

    #[test]
    fn test_parse_chain_id_hex_rejects_bare_decimal() {
        assert_eq!(parse_chain_id_hex("31337"), None);
    }

    #[test]
    fn test_parse_chain_id_hex_rejects_garbage() {
        assert_eq!(parse_chain_id_hex("0xzz"), None);
        assert_eq!(parse_chain_id_hex(""), None);
    }
}
