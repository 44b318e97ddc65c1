pub mod blockchain;
pub mod config;
pub mod sessions;
pub mod signer;
pub mod wc;

pub use blockchain::{NetworkEntry, StaticBlockchainHelper};
pub use config::BridgeConfig;
pub use sessions::{InMemorySessionsRepository, JsonFileSessionsRepository};
pub use signer::DeterministicSigner;
pub use wc::{settled_topic, LocalWalletConnectRepository, RawSessionRequest, RelayResponse};
