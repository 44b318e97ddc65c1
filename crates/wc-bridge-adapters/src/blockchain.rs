use wc_bridge_core::WcBlockchainHelper;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkEntry {
    pub chain_id: String,
    pub network_id: String,
    pub name: String,
}

impl NetworkEntry {
    fn new(chain_id: &str, network_id: &str, name: &str) -> Self {
        Self {
            chain_id: chain_id.to_owned(),
            network_id: network_id.to_owned(),
            name: name.to_owned(),
        }
    }

    fn namespace(&self) -> &str {
        self.chain_id
            .split_once(':')
            .map_or(self.chain_id.as_str(), |(namespace, _)| namespace)
    }
}

/// Fixed table of networks the wallet supports.
#[derive(Debug, Clone)]
pub struct StaticBlockchainHelper {
    networks: Vec<NetworkEntry>,
}

impl Default for StaticBlockchainHelper {
    fn default() -> Self {
        Self::new(vec![
            NetworkEntry::new("eip155:1", "ethereum", "Ethereum"),
            NetworkEntry::new("eip155:56", "bsc", "BNB Smart Chain"),
            NetworkEntry::new("eip155:137", "polygon", "Polygon"),
            NetworkEntry::new("eip155:43114", "avalanche", "Avalanche C-Chain"),
            NetworkEntry::new("eip155:250", "fantom", "Fantom"),
            NetworkEntry::new("eip155:42161", "arbitrum", "Arbitrum One"),
            NetworkEntry::new("eip155:10", "optimism", "Optimism"),
            NetworkEntry::new("eip155:100", "xdai", "Gnosis Chain"),
            NetworkEntry::new("eip155:8453", "base", "Base"),
            NetworkEntry::new("solana:4sGjMW1sUnHzSxGspuhpqLDx6wiyjNtZ", "solana", "Solana"),
            NetworkEntry::new("binance:Binance-Chain-Tigris", "binance", "BNB Beacon Chain"),
        ])
    }
}

impl StaticBlockchainHelper {
    pub fn new(networks: Vec<NetworkEntry>) -> Self {
        Self { networks }
    }

    pub fn networks(&self) -> &[NetworkEntry] {
        &self.networks
    }

    fn by_chain_id(&self, chain_id: &str) -> Option<&NetworkEntry> {
        self.networks.iter().find(|n| n.chain_id == chain_id)
    }
}

impl WcBlockchainHelper for StaticBlockchainHelper {
    fn chain_id_to_network_id(&self, chain_id: &str) -> Option<String> {
        self.by_chain_id(chain_id).map(|n| n.network_id.clone())
    }

    fn network_id_to_chain_id(&self, network_id: &str) -> Option<String> {
        self.networks
            .iter()
            .find(|n| n.network_id == network_id)
            .map(|n| n.chain_id.clone())
    }

    fn namespace_from_full_chain_id(&self, chain_id: &str) -> Option<String> {
        self.by_chain_id(chain_id).map(|n| n.namespace().to_owned())
    }

    fn chain_id_to_full_name(&self, chain_id: &str) -> Option<String> {
        self.by_chain_id(chain_id).map(|n| n.name.clone())
    }

    fn chain_id_to_missing_network_name(&self, chain_id: &str) -> Option<String> {
        self.by_chain_id(chain_id).map(|n| n.name.clone())
    }
}
