#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use wc_bridge_adapters::{
    DeterministicSigner, InMemorySessionsRepository, LocalWalletConnectRepository,
    StaticBlockchainHelper,
};
use wc_bridge_core::prepared::{WcBinanceTransactionData, WcEthTransactionData, WcEthereumSignData};
use wc_bridge_core::request::{
    WcBinanceTradeOrder, WcBinanceTransferOrder, WcEthTransactionType, WcEthereumSignMessage,
    WcEthereumSignMessageType, WcEthereumTransaction,
};
use wc_bridge_core::{
    decode_request, Account, DappMetadata, Session, SessionProposal, SessionRequest,
    SessionsRepository, SigningSdk, WalletConnectError, WalletConnectEventsHandler,
    WalletConnectInteractor, WalletConnectSession, WcPreparedRequest, WcSessionForScreen,
};

pub const WALLET: &str = "wallet-1";
pub const CARD: &str = "card-1";
pub const TOPIC: &str = "topic-1";
pub const SIGNER: &str = "0xabcdef0000000000000000000000000000000001";
pub const ETH_PATH: &str = "m/44'/60'/0'/0/0";
pub const SOLANA_CHAIN: &str = "solana:4sGjMW1sUnHzSxGspuhpqLDx6wiyjNtZ";
pub const SOLANA_PAYER: &str = "FeePayer1111111111111111111111111111111111";

#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    ProposalReceived { name: String, networks: String },
    SessionEstablished,
    SessionRejected(WalletConnectError),
    SessionsUpdated(Vec<WcSessionForScreen>),
    SessionRequest(WcPreparedRequest),
    WrongUserWallet,
    UnsupportedRequest,
    PairConnectError(String),
}

#[derive(Debug, Default)]
pub struct RecordingEventsHandler {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingEventsHandler {
    fn push(&self, event: SinkEvent) {
        self.events.lock().expect("sink lock").push(event);
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().expect("sink lock").clone()
    }

    pub fn clear(&self) {
        self.events.lock().expect("sink lock").clear();
    }

    pub fn last_request(&self) -> Option<WcPreparedRequest> {
        self.events().into_iter().rev().find_map(|event| match event {
            SinkEvent::SessionRequest(request) => Some(request),
            _ => None,
        })
    }
}

impl WalletConnectEventsHandler for RecordingEventsHandler {
    fn on_proposal_received(&self, proposal: &SessionProposal, networks_formatted: &str) {
        self.push(SinkEvent::ProposalReceived {
            name: proposal.name.clone(),
            networks: networks_formatted.to_owned(),
        });
    }

    fn on_session_established(&self) {
        self.push(SinkEvent::SessionEstablished);
    }

    fn on_session_rejected(&self, error: &WalletConnectError) {
        self.push(SinkEvent::SessionRejected(error.clone()));
    }

    fn on_list_of_sessions_updated(&self, sessions: &[WcSessionForScreen]) {
        self.push(SinkEvent::SessionsUpdated(sessions.to_vec()));
    }

    fn on_session_request(&self, request: &WcPreparedRequest) {
        self.push(SinkEvent::SessionRequest(request.clone()));
    }

    fn on_session_request_for_wrong_user_wallet(&self) {
        self.push(SinkEvent::WrongUserWallet);
    }

    fn on_unsupported_request(&self) {
        self.push(SinkEvent::UnsupportedRequest);
    }

    fn on_pair_connect_error(&self, message: &str) {
        self.push(SinkEvent::PairConnectError(message.to_owned()));
    }
}

/// Deterministic signer whose signing calls can be made to fail.
#[derive(Debug, Default)]
pub struct CountingSigner {
    inner: DeterministicSigner,
    fail: AtomicBool,
    sign_calls: AtomicUsize,
}

impl CountingSigner {
    pub fn fail_signing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sign_calls(&self) -> usize {
        self.sign_calls.load(Ordering::SeqCst)
    }

    fn should_sign(&self) -> bool {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        !self.fail.load(Ordering::SeqCst)
    }
}

impl SigningSdk for CountingSigner {
    async fn prepare_data_for_personal_sign(
        &self,
        message: &WcEthereumSignMessage,
        network_id: &str,
        dapp: &DappMetadata,
    ) -> Option<WcEthereumSignData> {
        self.inner
            .prepare_data_for_personal_sign(message, network_id, dapp)
            .await
    }

    async fn prepare_transaction_data(
        &self,
        transaction: &WcEthereumTransaction,
        kind: WcEthTransactionType,
        network_id: &str,
        derivation_path: Option<&str>,
        dapp: &DappMetadata,
    ) -> Option<WcEthTransactionData> {
        self.inner
            .prepare_transaction_data(transaction, kind, network_id, derivation_path, dapp)
            .await
    }

    async fn prepare_bnb_trade_order(
        &self,
        order: &WcBinanceTradeOrder,
        dapp: &DappMetadata,
    ) -> Option<WcBinanceTransactionData> {
        self.inner.prepare_bnb_trade_order(order, dapp).await
    }

    async fn prepare_bnb_transfer_order(
        &self,
        order: &WcBinanceTransferOrder,
        dapp: &DappMetadata,
    ) -> Option<WcBinanceTransactionData> {
        self.inner.prepare_bnb_transfer_order(order, dapp).await
    }

    async fn sign_bnb_transaction(
        &self,
        data: &[u8],
        network_id: &str,
        derivation_path: Option<&str>,
        card_id: Option<&str>,
    ) -> Option<String> {
        if !self.should_sign() {
            return None;
        }
        self.inner
            .sign_bnb_transaction(data, network_id, derivation_path, card_id)
            .await
    }

    async fn complete_transaction(
        &self,
        data: &WcEthTransactionData,
        card_id: Option<&str>,
    ) -> Option<String> {
        if !self.should_sign() {
            return None;
        }
        self.inner.complete_transaction(data, card_id).await
    }

    async fn sign_personal_message(
        &self,
        hash: &[u8],
        network_id: &str,
        kind: WcEthereumSignMessageType,
        derivation_path: Option<&str>,
        card_id: Option<&str>,
    ) -> Option<String> {
        if !self.should_sign() {
            return None;
        }
        self.inner
            .sign_personal_message(hash, network_id, kind, derivation_path, card_id)
            .await
    }

    async fn sign_transaction(
        &self,
        hash: &[u8],
        network_id: &str,
        derivation_path: Option<&str>,
        card_id: Option<&str>,
    ) -> Option<String> {
        if !self.should_sign() {
            return None;
        }
        self.inner
            .sign_transaction(hash, network_id, derivation_path, card_id)
            .await
    }

    async fn sign_transactions(
        &self,
        hashes: &[Vec<u8>],
        network_id: &str,
        derivation_path: Option<&str>,
        card_id: Option<&str>,
    ) -> Option<String> {
        if !self.should_sign() {
            return None;
        }
        self.inner
            .sign_transactions(hashes, network_id, derivation_path, card_id)
            .await
    }
}

pub type TestInteractor = WalletConnectInteractor<
    LocalWalletConnectRepository,
    InMemorySessionsRepository,
    CountingSigner,
    RecordingEventsHandler,
    StaticBlockchainHelper,
>;

pub fn new_interactor() -> TestInteractor {
    let interactor = WalletConnectInteractor::new(
        LocalWalletConnectRepository::default(),
        InMemorySessionsRepository::default(),
        CountingSigner::default(),
        RecordingEventsHandler::default(),
        StaticBlockchainHelper::default(),
    );
    interactor
        .set_wallet(WALLET, Some(CARD.to_owned()))
        .expect("set wallet");
    interactor
}

pub fn eth_account() -> Account {
    Account::new("eip155:1", SIGNER, Some(ETH_PATH.to_owned()))
}

pub fn solana_account() -> Account {
    Account::new(SOLANA_CHAIN, SOLANA_PAYER, Some("m/44'/501'/0'".to_owned()))
}

/// Stores `accounts` under `topic` for the test wallet and marks the session
/// active on the client.
pub async fn seed_session(interactor: &TestInteractor, topic: &str, accounts: Vec<Account>) {
    interactor
        .sessions
        .save_session(
            WALLET,
            Session {
                topic: topic.to_owned(),
                accounts,
                name: Some("Test dApp".to_owned()),
            },
        )
        .await
        .expect("save session");
    interactor
        .repository
        .insert_active_session(WalletConnectSession {
            topic: topic.to_owned(),
            icon: None,
            name: Some("Test dApp".to_owned()),
            url: Some("https://dapp.example".to_owned()),
        })
        .expect("insert active session");
}

pub fn session_request(topic: &str, chain_id: &str, id: u64, method: &str, params: &str) -> SessionRequest {
    SessionRequest {
        request: decode_request(method, params),
        chain_id: Some(chain_id.to_owned()),
        topic: topic.to_owned(),
        id,
        meta_url: "https://dapp.example".to_owned(),
        meta_name: "Test dApp".to_owned(),
        method: method.to_owned(),
    }
}

pub fn personal_sign_request(id: u64) -> SessionRequest {
    session_request(
        TOPIC,
        "eip155:1",
        id,
        "personal_sign",
        &format!(r#"["0xdeadbeef","{SIGNER}"]"#),
    )
}

pub fn proposal(required: &[&str], optional: &[&str]) -> SessionProposal {
    SessionProposal {
        name: "Test dApp".to_owned(),
        description: "test".to_owned(),
        url: "https://dapp.example".to_owned(),
        icons: vec!["https://dapp.example/icon.png".to_owned()],
        required_chain_ids: required.iter().map(|c| (*c).to_owned()).collect(),
        optional_chain_ids: optional.iter().map(|c| (*c).to_owned()).collect(),
        proposer_public_key: "proposer-key".to_owned(),
    }
}

pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}
