use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use alloy::hex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use wc_bridge_core::{
    decode_request, is_wallet_connect_uri, PortError, RequestData, SessionProposal,
    SessionRequest, UserNamespaces, WalletConnectError, WalletConnectEvents,
    WalletConnectRepository, WalletConnectSession, WcJrpcMethod, WcRequest,
};

pub const DEFAULT_EVENT_BUFFER: usize = 64;
pub const DEFAULT_RELAY_URL: &str = "wss://relay.walletconnect.com";

/// JSON-RPC response the wallet sent back over the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RelayResponse {
    #[serde(rename_all = "camelCase")]
    Result {
        topic: String,
        id: u64,
        method: String,
        result: String,
    },
    #[serde(rename_all = "camelCase")]
    Error {
        topic: String,
        id: u64,
        code: i64,
        message: String,
    },
}

/// Session request as it arrives from the relay, before decoding.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSessionRequest {
    pub topic: String,
    #[serde(default)]
    pub chain_id: Option<String>,
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl RawSessionRequest {
    fn params_text(&self) -> String {
        match &self.params {
            Value::String(raw) => raw.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct WalletConnectState {
    project_id: Option<String>,
    server_url: Option<String>,
    paired_uris: Vec<String>,
    user_namespaces: UserNamespaces,
    pending_proposal: Option<SessionProposal>,
    active_sessions: Vec<WalletConnectSession>,
    responses: Vec<RelayResponse>,
}

/// In-process WalletConnect client.
///
/// Inbound relay traffic is injected with the `receive_*` methods; responses
/// the wallet sends are recorded and can be inspected with [`Self::responses`].
#[derive(Debug, Clone)]
pub struct LocalWalletConnectRepository {
    events: broadcast::Sender<WalletConnectEvents>,
    sessions: broadcast::Sender<Vec<WalletConnectSession>>,
    relay_url: String,
    inner: Arc<Mutex<WalletConnectState>>,
}

impl Default for LocalWalletConnectRepository {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER)
    }
}

impl LocalWalletConnectRepository {
    pub fn new(event_buffer: usize) -> Self {
        let (events, _) = broadcast::channel(event_buffer.max(1));
        let (sessions, _) = broadcast::channel(event_buffer.max(1));
        Self {
            events,
            sessions,
            relay_url: DEFAULT_RELAY_URL.to_owned(),
            inner: Arc::new(Mutex::new(WalletConnectState::default())),
        }
    }

    pub fn with_relay_url(mut self, relay_url: impl Into<String>) -> Self {
        self.relay_url = relay_url.into();
        self
    }

    pub fn relay_url(&self) -> &str {
        &self.relay_url
    }

    fn lock(&self) -> Result<MutexGuard<'_, WalletConnectState>, PortError> {
        self.inner
            .lock()
            .map_err(|e| PortError::Transport(format!("wc lock poisoned: {e}")))
    }

    fn emit(&self, event: WalletConnectEvents) {
        if self.events.send(event).is_err() {
            debug!("no walletconnect event listeners");
        }
    }

    fn emit_sessions(&self) -> Result<(), PortError> {
        let active = self.lock()?.active_sessions.clone();
        if self.sessions.send(active).is_err() {
            debug!("no walletconnect session listeners");
        }
        Ok(())
    }

    fn record(&self, response: RelayResponse) -> Result<(), PortError> {
        self.lock()?.responses.push(response);
        Ok(())
    }

    /// Number of live event subscriptions.
    pub fn listener_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// Events not yet consumed by every listener.
    pub fn queued_events(&self) -> usize {
        self.events.len()
    }

    pub fn responses(&self) -> Result<Vec<RelayResponse>, PortError> {
        Ok(self.lock()?.responses.clone())
    }

    pub fn take_responses(&self) -> Result<Vec<RelayResponse>, PortError> {
        Ok(std::mem::take(&mut self.lock()?.responses))
    }

    pub fn paired_uris(&self) -> Result<Vec<String>, PortError> {
        Ok(self.lock()?.paired_uris.clone())
    }

    pub fn project_id(&self) -> Result<Option<String>, PortError> {
        Ok(self.lock()?.project_id.clone())
    }

    /// Relay endpoint with the project id attached, set by `init`.
    pub fn server_url(&self) -> Result<Option<String>, PortError> {
        Ok(self.lock()?.server_url.clone())
    }

    pub fn user_namespaces(&self) -> Result<UserNamespaces, PortError> {
        Ok(self.lock()?.user_namespaces.clone())
    }

    pub fn pending_proposal(&self) -> Result<Option<SessionProposal>, PortError> {
        Ok(self.lock()?.pending_proposal.clone())
    }

    pub fn active_sessions(&self) -> Result<Vec<WalletConnectSession>, PortError> {
        Ok(self.lock()?.active_sessions.clone())
    }

    /// Registers an already settled session, as restored from the relay.
    pub fn insert_active_session(&self, session: WalletConnectSession) -> Result<(), PortError> {
        let mut g = self.lock()?;
        g.active_sessions.retain(|s| s.topic != session.topic);
        g.active_sessions.push(session);
        Ok(())
    }

    pub fn receive_session_proposal(&self, proposal: SessionProposal) -> Result<(), PortError> {
        info!(dapp = %proposal.name, url = %proposal.url, "walletconnect proposal received");
        self.lock()?.pending_proposal = Some(proposal.clone());
        self.emit(WalletConnectEvents::SessionProposal(proposal));
        Ok(())
    }

    pub fn receive_pair_error(&self, message: impl Into<String>) {
        self.emit(WalletConnectEvents::PairConnectError {
            message: message.into(),
        });
    }

    /// Decodes an inbound request and either auto-acknowledges it or hands it
    /// to the event stream.
    pub fn receive_session_request(&self, raw: RawSessionRequest) -> Result<(), PortError> {
        let params = raw.params_text();
        let request = decode_request(&raw.method, &params);

        if let WcRequest::AddChain(add_chain) = &request {
            debug!(topic = %raw.topic, request_id = raw.id, chain_id = %add_chain.chain_id, "auto-acknowledging add chain");
            return self.send_request(
                &RequestData {
                    topic: raw.topic,
                    request_id: raw.id,
                    blockchain: raw.chain_id.unwrap_or_default(),
                    method: WcJrpcMethod::WalletAddEthereumChain.code().to_owned(),
                },
                "",
            );
        }

        let (meta_name, meta_url) = {
            let g = self.lock()?;
            g.active_sessions
                .iter()
                .find(|s| s.topic == raw.topic)
                .map(|s| {
                    (
                        s.name.clone().unwrap_or_default(),
                        s.url.clone().unwrap_or_default(),
                    )
                })
                .unwrap_or_default()
        };

        self.emit(WalletConnectEvents::SessionRequest(SessionRequest {
            request,
            chain_id: raw.chain_id,
            topic: raw.topic,
            id: raw.id,
            meta_url,
            meta_name,
            method: raw.method,
        }));
        Ok(())
    }

    pub fn receive_session_delete(&self, topic: &str) -> Result<(), PortError> {
        self.lock()?.active_sessions.retain(|s| s.topic != topic);
        self.emit(WalletConnectEvents::SessionDeleted {
            topic: topic.to_owned(),
        });
        self.emit_sessions()
    }
}

/// Required chains of `proposal` that no granted account covers, in order.
fn missing_networks(proposal: &SessionProposal, namespaces: &UserNamespaces) -> Vec<String> {
    let granted: BTreeSet<&str> = namespaces
        .values()
        .flatten()
        .map(|account| account.chain_id.as_str())
        .collect();
    let mut missing: Vec<String> = Vec::new();
    for chain_id in &proposal.required_chain_ids {
        if !granted.contains(chain_id.as_str()) && !missing.contains(chain_id) {
            missing.push(chain_id.clone());
        }
    }
    missing
}

pub fn settled_topic(proposer_public_key: &str) -> String {
    hex::encode(Sha256::digest(proposer_public_key.as_bytes()))
}

impl WalletConnectRepository for LocalWalletConnectRepository {
    fn subscribe_events(&self) -> broadcast::Receiver<WalletConnectEvents> {
        self.events.subscribe()
    }

    fn subscribe_active_sessions(&self) -> broadcast::Receiver<Vec<WalletConnectSession>> {
        self.sessions.subscribe()
    }

    fn init(&self, project_id: &str) -> Result<(), PortError> {
        if project_id.trim().is_empty() {
            warn!("walletconnect project id is empty");
            self.emit(WalletConnectEvents::SessionApprovalError(
                WalletConnectError::ExternalApprovalError(Some(
                    "project id is required".to_owned(),
                )),
            ));
            return Ok(());
        }
        let server_url = format!("{}?projectId={project_id}", self.relay_url);
        {
            let mut state = self.lock()?;
            state.project_id = Some(project_id.to_owned());
            state.server_url = Some(server_url.clone());
        }
        info!(project_id, %server_url, "walletconnect client initialized");
        Ok(())
    }

    fn update_sessions(&self) -> Result<(), PortError> {
        self.emit_sessions()
    }

    fn set_user_namespaces(&self, namespaces: UserNamespaces) -> Result<(), PortError> {
        self.lock()?.user_namespaces = namespaces;
        Ok(())
    }

    fn pair(&self, uri: &str) -> Result<(), PortError> {
        if !is_wallet_connect_uri(uri) {
            warn!(uri, "refusing to pair with non-walletconnect uri");
            self.receive_pair_error(format!("invalid pairing uri: {uri}"));
            return Ok(());
        }
        self.lock()?.paired_uris.push(uri.to_owned());
        info!(uri, "walletconnect pairing started");
        Ok(())
    }

    fn disconnect(&self, topic: &str) -> Result<(), PortError> {
        {
            let mut g = self.lock()?;
            let before = g.active_sessions.len();
            g.active_sessions.retain(|s| s.topic != topic);
            if g.active_sessions.len() == before {
                return Err(PortError::NotFound(format!("wc session missing: {topic}")));
            }
        }
        info!(topic, "walletconnect session disconnected");
        self.emit_sessions()
    }

    fn approve(&self, namespaces: UserNamespaces) -> Result<(), PortError> {
        let proposal = {
            let mut g = self.lock()?;
            g.user_namespaces = namespaces.clone();
            g.pending_proposal
                .clone()
                .ok_or_else(|| PortError::NotFound("no pending wc proposal".to_owned()))?
        };

        let missing = missing_networks(&proposal, &namespaces);
        if !missing.is_empty() {
            warn!(dapp = %proposal.name, ?missing, "approval is missing required networks");
            self.emit(WalletConnectEvents::SessionApprovalError(
                WalletConnectError::ApprovalErrorMissingNetworks(missing),
            ));
            return Ok(());
        }

        let topic = settled_topic(&proposal.proposer_public_key);
        let accounts: Vec<_> = namespaces.into_values().flatten().collect();
        {
            let mut g = self.lock()?;
            g.pending_proposal = None;
            g.active_sessions.retain(|s| s.topic != topic);
            g.active_sessions.push(WalletConnectSession {
                topic: topic.clone(),
                icon: proposal.icons.first().cloned(),
                name: Some(proposal.name.clone()),
                url: Some(proposal.url.clone()),
            });
        }
        info!(%topic, dapp = %proposal.name, "walletconnect session settled");
        self.emit(WalletConnectEvents::SessionApprovalSuccess { topic, accounts });
        self.emit_sessions()
    }

    fn reject(&self) -> Result<(), PortError> {
        match self.lock()?.pending_proposal.take() {
            Some(proposal) => info!(dapp = %proposal.name, "walletconnect proposal rejected"),
            None => debug!("no pending walletconnect proposal to reject"),
        }
        Ok(())
    }

    fn send_request(&self, request_data: &RequestData, result: &str) -> Result<(), PortError> {
        debug!(
            topic = %request_data.topic,
            request_id = request_data.request_id,
            method = %request_data.method,
            "walletconnect request answered"
        );
        self.record(RelayResponse::Result {
            topic: request_data.topic.clone(),
            id: request_data.request_id,
            method: request_data.method.clone(),
            result: result.to_owned(),
        })
    }

    fn reject_request(
        &self,
        request_data: &RequestData,
        error: &WalletConnectError,
    ) -> Result<(), PortError> {
        debug!(
            topic = %request_data.topic,
            request_id = request_data.request_id,
            method = %request_data.method,
            %error,
            "walletconnect request rejected"
        );
        self.record(RelayResponse::Error {
            topic: request_data.topic.clone(),
            id: request_data.request_id,
            code: 0,
            message: error.to_string(),
        })
    }

    fn cancel_request(&self, topic: &str, id: u64) -> Result<(), PortError> {
        self.record(RelayResponse::Error {
            topic: topic.to_owned(),
            id,
            code: 0,
            message: String::new(),
        })
    }
}
