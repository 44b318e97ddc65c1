use std::collections::BTreeMap;
use std::future::Future;

use thiserror::Error;
use tokio::sync::broadcast;

use crate::domain::{
    Account, NetworkNamespace, RequestData, Session, SessionProposal, WalletConnectError,
    WalletConnectEvents, WalletConnectSession, WcSessionForScreen,
};
use crate::prepared::{
    DappMetadata, WcBinanceTransactionData, WcEthTransactionData, WcEthereumSignData,
    WcPreparedRequest,
};
use crate::request::{
    WcBinanceTradeOrder, WcBinanceTransferOrder, WcEthTransactionType, WcEthereumSignMessage,
    WcEthereumSignMessageType, WcEthereumTransaction,
};

pub type UserNamespaces = BTreeMap<NetworkNamespace, Vec<Account>>;

#[derive(Debug, Error)]
pub enum PortError {
    #[error("port not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Translation between WalletConnect chain ids (`eip155:1`) and the app's
/// network ids.
pub trait WcBlockchainHelper: Send + Sync {
    fn chain_id_to_network_id(&self, chain_id: &str) -> Option<String>;
    /// Reverse lookup for callers that build [`Account`](crate::Account)s from
    /// app networks; the interactor itself only maps chain ids to networks.
    fn network_id_to_chain_id(&self, network_id: &str) -> Option<String>;
    fn namespace_from_full_chain_id(&self, chain_id: &str) -> Option<String>;
    fn chain_id_to_full_name(&self, chain_id: &str) -> Option<String>;
    fn chain_id_to_missing_network_name(&self, chain_id: &str) -> Option<String>;
}

/// WalletConnect client: event source and session mutation sink.
pub trait WalletConnectRepository: Send + Sync {
    fn subscribe_events(&self) -> broadcast::Receiver<WalletConnectEvents>;
    fn subscribe_active_sessions(&self) -> broadcast::Receiver<Vec<WalletConnectSession>>;

    fn init(&self, project_id: &str) -> Result<(), PortError>;
    fn update_sessions(&self) -> Result<(), PortError>;
    fn set_user_namespaces(&self, namespaces: UserNamespaces) -> Result<(), PortError>;
    fn pair(&self, uri: &str) -> Result<(), PortError>;
    fn disconnect(&self, topic: &str) -> Result<(), PortError>;
    fn approve(&self, namespaces: UserNamespaces) -> Result<(), PortError>;
    fn reject(&self) -> Result<(), PortError>;
    fn send_request(&self, request_data: &RequestData, result: &str) -> Result<(), PortError>;
    fn reject_request(
        &self,
        request_data: &RequestData,
        error: &WalletConnectError,
    ) -> Result<(), PortError>;
    fn cancel_request(&self, topic: &str, id: u64) -> Result<(), PortError>;
}

/// Sessions owned by each user wallet.
pub trait SessionsRepository: Send + Sync {
    fn load_sessions(
        &self,
        user_wallet_id: &str,
    ) -> impl Future<Output = Result<Vec<Session>, PortError>> + Send;
    fn save_session(
        &self,
        user_wallet_id: &str,
        session: Session,
    ) -> impl Future<Output = Result<(), PortError>> + Send;
    fn remove_session(
        &self,
        user_wallet_id: &str,
        topic: &str,
    ) -> impl Future<Output = Result<(), PortError>> + Send;
}

/// Card signing SDK. `None` means the operation failed or was cancelled.
pub trait SigningSdk: Send + Sync {
    fn prepare_data_for_personal_sign(
        &self,
        message: &WcEthereumSignMessage,
        network_id: &str,
        dapp: &DappMetadata,
    ) -> impl Future<Output = Option<WcEthereumSignData>> + Send;

    fn prepare_transaction_data(
        &self,
        transaction: &WcEthereumTransaction,
        kind: WcEthTransactionType,
        network_id: &str,
        derivation_path: Option<&str>,
        dapp: &DappMetadata,
    ) -> impl Future<Output = Option<WcEthTransactionData>> + Send;

    fn prepare_bnb_trade_order(
        &self,
        order: &WcBinanceTradeOrder,
        dapp: &DappMetadata,
    ) -> impl Future<Output = Option<WcBinanceTransactionData>> + Send;

    fn prepare_bnb_transfer_order(
        &self,
        order: &WcBinanceTransferOrder,
        dapp: &DappMetadata,
    ) -> impl Future<Output = Option<WcBinanceTransactionData>> + Send;

    fn sign_bnb_transaction(
        &self,
        data: &[u8],
        network_id: &str,
        derivation_path: Option<&str>,
        card_id: Option<&str>,
    ) -> impl Future<Output = Option<String>> + Send;

    fn complete_transaction(
        &self,
        data: &WcEthTransactionData,
        card_id: Option<&str>,
    ) -> impl Future<Output = Option<String>> + Send;

    fn sign_personal_message(
        &self,
        hash: &[u8],
        network_id: &str,
        kind: WcEthereumSignMessageType,
        derivation_path: Option<&str>,
        card_id: Option<&str>,
    ) -> impl Future<Output = Option<String>> + Send;

    fn sign_transaction(
        &self,
        hash: &[u8],
        network_id: &str,
        derivation_path: Option<&str>,
        card_id: Option<&str>,
    ) -> impl Future<Output = Option<String>> + Send;

    fn sign_transactions(
        &self,
        hashes: &[Vec<u8>],
        network_id: &str,
        derivation_path: Option<&str>,
        card_id: Option<&str>,
    ) -> impl Future<Output = Option<String>> + Send;
}

/// UI sink driven by the interactor.
pub trait WalletConnectEventsHandler: Send + Sync {
    fn on_proposal_received(&self, proposal: &SessionProposal, networks_formatted: &str);
    fn on_session_established(&self);
    fn on_session_rejected(&self, error: &WalletConnectError);
    fn on_list_of_sessions_updated(&self, sessions: &[WcSessionForScreen]);
    fn on_session_request(&self, request: &WcPreparedRequest);
    fn on_session_request_for_wrong_user_wallet(&self);
    fn on_unsupported_request(&self);
    fn on_pair_connect_error(&self, message: &str);
}
