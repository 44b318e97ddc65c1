use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::runtime::Handle;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

use crate::converter::WcSessionRequestConverter;
use crate::domain::{
    Account, NetworkNamespace, RequestData, Session, SessionProposal, SessionRequest,
    WalletConnectError, WalletConnectEvents, WalletConnectSession, WcSessionForScreen,
};
use crate::ports::{
    PortError, SessionsRepository, SigningSdk, UserNamespaces, WalletConnectEventsHandler,
    WalletConnectRepository, WcBlockchainHelper,
};
use crate::prepared::{WcPreparedPayload, WcPreparedRequest};
use crate::request::WcRequest;

const WC_SCHEME: &str = "wc";

pub fn is_wallet_connect_uri(uri: &str) -> bool {
    uri.to_lowercase().starts_with(WC_SCHEME)
}

#[derive(Debug, Clone, Default)]
pub struct InteractorSettings {
    /// Reject requests the converter cannot prepare instead of dropping them.
    pub reject_unconvertible_requests: bool,
}

#[derive(Debug, Default)]
struct InteractorState {
    user_wallet_id: String,
    card_id: Option<String>,
    current_request: Option<SessionRequest>,
    deeplinks: Vec<String>,
    ready_for_deeplinks: bool,
    listeners: Option<AbortHandle>,
}

/// Routes WalletConnect client events to the UI sink and the signing SDK.
///
/// At most one session request is pending user approval at a time; a newer
/// request replaces it. All mutable state lives behind one mutex that is never
/// held across an await point.
pub struct WalletConnectInteractor<R, S, K, H, B>
where
    R: WalletConnectRepository,
    S: SessionsRepository,
    K: SigningSdk,
    H: WalletConnectEventsHandler,
    B: WcBlockchainHelper,
{
    pub repository: R,
    pub sessions: S,
    pub sdk: K,
    pub handler: H,
    pub blockchain_helper: B,
    settings: InteractorSettings,
    state: Mutex<InteractorState>,
}

impl<R, S, K, H, B> WalletConnectInteractor<R, S, K, H, B>
where
    R: WalletConnectRepository,
    S: SessionsRepository,
    K: SigningSdk,
    H: WalletConnectEventsHandler,
    B: WcBlockchainHelper,
{
    pub fn new(repository: R, sessions: S, sdk: K, handler: H, blockchain_helper: B) -> Self {
        Self {
            repository,
            sessions,
            sdk,
            handler,
            blockchain_helper,
            settings: InteractorSettings::default(),
            state: Mutex::new(InteractorState::default()),
        }
    }

    pub fn with_settings(mut self, settings: InteractorSettings) -> Self {
        self.settings = settings;
        self
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, InteractorState>, PortError> {
        self.state
            .lock()
            .map_err(|e| PortError::Transport(format!("interactor lock poisoned: {e}")))
    }

    pub fn set_wallet(
        &self,
        user_wallet_id: impl Into<String>,
        card_id: Option<String>,
    ) -> Result<(), PortError> {
        let mut state = self.lock_state()?;
        state.user_wallet_id = user_wallet_id.into();
        state.card_id = card_id;
        Ok(())
    }

    pub fn user_wallet_id(&self) -> Result<String, PortError> {
        Ok(self.lock_state()?.user_wallet_id.clone())
    }

    pub fn current_request(&self) -> Result<Option<SessionRequest>, PortError> {
        Ok(self.lock_state()?.current_request.clone())
    }

    pub fn is_ready_for_deeplinks(&self) -> Result<bool, PortError> {
        Ok(self.lock_state()?.ready_for_deeplinks)
    }

    /// Binds the wallet identity, refreshes sessions and consumes both client
    /// streams until they close or handling an event fails.
    pub async fn start_listening(
        &self,
        user_wallet_id: String,
        card_id: Option<String>,
    ) -> Result<(), PortError> {
        info!(user_wallet_id = %user_wallet_id, "starting walletconnect listeners");
        self.set_wallet(user_wallet_id, card_id)?;

        // Subscribe before the refresh so its emission is not missed.
        let events = self.repository.subscribe_events();
        let sessions = self.repository.subscribe_active_sessions();
        self.repository.update_sessions()?;

        tokio::try_join!(self.listen_events(events), self.listen_sessions(sessions))?;
        Ok(())
    }

    /// Runs [`Self::start_listening`] on `runtime`, cancelling listeners started
    /// by a previous call.
    pub fn spawn_listeners(
        self: Arc<Self>,
        runtime: &Handle,
        user_wallet_id: String,
        card_id: Option<String>,
    ) -> Result<JoinHandle<Result<(), PortError>>, PortError>
    where
        R: 'static,
        S: 'static,
        K: 'static,
        H: 'static,
        B: 'static,
    {
        let this = Arc::clone(&self);
        let task =
            runtime.spawn(async move { this.start_listening(user_wallet_id, card_id).await });
        if let Some(previous) = self.lock_state()?.listeners.replace(task.abort_handle()) {
            previous.abort();
        }
        Ok(task)
    }

    async fn listen_events(
        &self,
        mut events: broadcast::Receiver<WalletConnectEvents>,
    ) -> Result<(), PortError> {
        loop {
            match events.recv().await {
                Ok(event) => self.handle_event(event).await?,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "walletconnect event stream lagged");
                }
                Err(RecvError::Closed) => {
                    debug!("walletconnect event stream closed");
                    return Ok(());
                }
            }
        }
    }

    async fn listen_sessions(
        &self,
        mut sessions: broadcast::Receiver<Vec<WalletConnectSession>>,
    ) -> Result<(), PortError> {
        loop {
            match sessions.recv().await {
                Ok(active) => self.handle_active_sessions(active).await?,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "walletconnect session stream lagged");
                }
                Err(RecvError::Closed) => {
                    debug!("walletconnect session stream closed");
                    return Ok(());
                }
            }
        }
    }

    pub async fn handle_event(&self, event: WalletConnectEvents) -> Result<(), PortError> {
        match event {
            WalletConnectEvents::SessionProposal(proposal) => {
                self.handle_proposal(&proposal);
                Ok(())
            }
            WalletConnectEvents::SessionApprovalError(error) => {
                let error = self.remap_approval_error(error);
                warn!(%error, "walletconnect session approval failed");
                self.handler.on_session_rejected(&error);
                Ok(())
            }
            WalletConnectEvents::SessionApprovalSuccess { topic, accounts } => {
                let user_wallet_id = self.user_wallet_id()?;
                info!(%topic, accounts = accounts.len(), "walletconnect session established");
                self.sessions
                    .save_session(
                        &user_wallet_id,
                        Session {
                            topic,
                            accounts,
                            name: None,
                        },
                    )
                    .await?;
                self.repository.update_sessions()?;
                self.handler.on_session_established();
                Ok(())
            }
            WalletConnectEvents::SessionDeleted { topic } => {
                let user_wallet_id = self.user_wallet_id()?;
                info!(%topic, "walletconnect session deleted by peer");
                self.sessions.remove_session(&user_wallet_id, &topic).await
            }
            WalletConnectEvents::SessionRequest(request) => self.handle_request(request).await,
            WalletConnectEvents::PairConnectError { message } => {
                warn!(%message, "walletconnect pairing failed");
                self.handler.on_pair_connect_error(&message);
                Ok(())
            }
        }
    }

    pub async fn handle_active_sessions(
        &self,
        active: Vec<WalletConnectSession>,
    ) -> Result<(), PortError> {
        let user_wallet_id = self.user_wallet_id()?;
        let topics: HashSet<String> = self
            .sessions
            .load_sessions(&user_wallet_id)
            .await?
            .into_iter()
            .map(|s| s.topic)
            .collect();
        let filtered: Vec<WcSessionForScreen> = active
            .into_iter()
            .filter(|s| topics.contains(&s.topic))
            .map(|s| WcSessionForScreen {
                description: s.name.unwrap_or_default(),
                session_id: s.topic,
            })
            .collect();
        self.handler.on_list_of_sessions_updated(&filtered);
        Ok(())
    }

    fn handle_proposal(&self, proposal: &SessionProposal) {
        let unsupported: Vec<String> = proposal
            .required_chain_ids
            .iter()
            .filter(|chain_id| {
                self.blockchain_helper
                    .chain_id_to_network_id(chain_id)
                    .is_none()
            })
            .cloned()
            .collect();
        if !unsupported.is_empty() {
            info!(dapp = %proposal.name, ?unsupported, "rejecting proposal with unsupported networks");
            self.handler
                .on_session_rejected(&WalletConnectError::ApprovalErrorUnsupportedNetwork(
                    unsupported,
                ));
            return;
        }

        let mut seen = HashSet::new();
        let names: Vec<String> = proposal
            .required_chain_ids
            .iter()
            .chain(&proposal.optional_chain_ids)
            .filter(|chain_id| seen.insert(chain_id.as_str()))
            .filter_map(|chain_id| self.blockchain_helper.chain_id_to_full_name(chain_id))
            .collect();
        self.handler
            .on_proposal_received(proposal, &format!("[{}]", names.join(", ")));
    }

    fn remap_approval_error(&self, error: WalletConnectError) -> WalletConnectError {
        match error {
            WalletConnectError::ApprovalErrorMissingNetworks(missing) => {
                WalletConnectError::ApprovalErrorAddNetwork(
                    missing
                        .iter()
                        .filter_map(|chain_id| {
                            self.blockchain_helper
                                .chain_id_to_missing_network_name(chain_id)
                        })
                        .collect(),
                )
            }
            other => other,
        }
    }

    async fn handle_request(&self, request: SessionRequest) -> Result<(), PortError> {
        let user_wallet_id = self.user_wallet_id()?;
        let owned = self
            .sessions
            .load_sessions(&user_wallet_id)
            .await?
            .iter()
            .any(|session| session.topic == request.topic);

        let error = if !owned {
            Some(WalletConnectError::WrongUserWallet)
        } else if request.request.is_custom() {
            Some(WalletConnectError::UnsupportedMethod)
        } else {
            None
        };

        let network_id = request
            .chain_id
            .as_deref()
            .and_then(|chain_id| self.blockchain_helper.chain_id_to_network_id(chain_id))
            .unwrap_or_default();
        let request_data = RequestData {
            topic: request.topic.clone(),
            request_id: request.id,
            blockchain: network_id,
            method: request.method.clone(),
        };

        if let Some(error) = error {
            warn!(
                topic = %request.topic,
                request_id = request.id,
                method = %request.method,
                %error,
                "rejecting walletconnect request"
            );
            self.repository.reject_request(&request_data, &error)?;
            if error == WalletConnectError::WrongUserWallet {
                self.handler.on_session_request_for_wrong_user_wallet();
            } else {
                self.handler.on_unsupported_request();
            }
            return Ok(());
        }

        match &request.request {
            WcRequest::BnbCancel(_) => {
                debug!(topic = %request.topic, request_id = request.id, "bnb cancel acknowledged");
                Ok(())
            }
            WcRequest::BnbTxConfirm(_) => self.repository.send_request(&request_data, ""),
            _ => {
                self.lock_state()?.current_request = Some(request.clone());
                let converter = WcSessionRequestConverter::new(
                    &self.blockchain_helper,
                    &self.sessions,
                    &self.sdk,
                );
                match converter.prepare_request(&request, &user_wallet_id).await? {
                    Some(prepared) => self.handler.on_session_request(&prepared),
                    None if self.settings.reject_unconvertible_requests => {
                        let error = WalletConnectError::ConversionFailed;
                        warn!(
                            topic = %request.topic,
                            request_id = request.id,
                            method = %request.method,
                            "rejecting walletconnect request that could not be prepared"
                        );
                        self.repository.reject_request(&request_data, &error)?;
                        self.handler.on_session_rejected(&error);
                    }
                    None => {
                        warn!(
                            topic = %request.topic,
                            request_id = request.id,
                            method = %request.method,
                            "dropping walletconnect request that could not be prepared"
                        );
                    }
                }
                Ok(())
            }
        }
    }

    /// Signs the approved request and answers the dApp.
    ///
    /// Stale approvals (no pending request, or a different topic) are ignored.
    /// The pending request is cleared only when it is the one being approved.
    pub async fn continue_with_request(&self, request: &WcPreparedRequest) -> Result<(), PortError> {
        let (current, card_id) = {
            let state = self.lock_state()?;
            (state.current_request.clone(), state.card_id.clone())
        };
        let Some(current) = current.filter(|current| current.topic == request.topic) else {
            debug!(topic = %request.topic, "ignoring approval without matching pending request");
            return Ok(());
        };
        let Some(network_id) = self
            .blockchain_helper
            .chain_id_to_network_id(current.chain_id.as_deref().unwrap_or_default())
        else {
            debug!(topic = %request.topic, chain_id = ?current.chain_id, "no network for pending request");
            return Ok(());
        };

        let card_id = card_id.as_deref();
        let derivation_path = request.derivation_path.as_deref();
        let signed = match &request.payload {
            WcPreparedPayload::BnbTransaction(data) => {
                self.sdk
                    .sign_bnb_transaction(&data.data, &network_id, derivation_path, card_id)
                    .await
            }
            WcPreparedPayload::EthTransaction(data) => {
                self.sdk.complete_transaction(data, card_id).await
            }
            WcPreparedPayload::EthSign(data) => {
                self.sdk
                    .sign_personal_message(
                        data.hash.as_slice(),
                        &network_id,
                        data.kind,
                        derivation_path,
                        card_id,
                    )
                    .await
            }
            WcPreparedPayload::SignTransaction(data) => {
                self.sdk
                    .sign_transaction(&data.hash_to_sign, &network_id, derivation_path, card_id)
                    .await
            }
            WcPreparedPayload::SignTransactions(data) => {
                self.sdk
                    .sign_transactions(&data.hashes_to_sign, &network_id, derivation_path, card_id)
                    .await
            }
        };

        let request_data = RequestData {
            topic: request.topic.clone(),
            request_id: request.request_id,
            blockchain: network_id,
            method: current.method.clone(),
        };

        match signed {
            Some(result) => self.repository.send_request(&request_data, &result)?,
            None => {
                let error = WalletConnectError::SigningError;
                warn!(topic = %request.topic, request_id = request.request_id, "signing failed");
                self.repository.reject_request(&request_data, &error)?;
                self.handler.on_session_rejected(&error);
            }
        }

        let mut state = self.lock_state()?;
        if state
            .current_request
            .as_ref()
            .is_some_and(|pending| {
                pending.topic == request.topic && pending.id == request.request_id
            })
        {
            state.current_request = None;
        }
        Ok(())
    }

    fn group_by_namespace(&self, accounts: Vec<Account>) -> UserNamespaces {
        let mut grouped = UserNamespaces::new();
        for account in accounts {
            match self
                .blockchain_helper
                .namespace_from_full_chain_id(&account.chain_id)
            {
                Some(namespace) => grouped
                    .entry(NetworkNamespace(namespace))
                    .or_default()
                    .push(account),
                None => {
                    debug!(chain_id = %account.chain_id, "dropping account without namespace");
                }
            }
        }
        grouped
    }

    /// Publishes the wallet's accounts and, once any exist, opens the most
    /// recently buffered deeplink.
    pub fn set_user_chains(&self, accounts: Vec<Account>) -> Result<(), PortError> {
        let has_accounts = !accounts.is_empty();
        self.repository
            .set_user_namespaces(self.group_by_namespace(accounts))?;
        if !has_accounts {
            return Ok(());
        }
        let deeplink = {
            let mut state = self.lock_state()?;
            state.ready_for_deeplinks = true;
            state.deeplinks.pop()
        };
        if let Some(uri) = deeplink {
            self.repository.pair(&uri)?;
        }
        Ok(())
    }

    pub fn approve_session_proposal(&self, accounts: Vec<Account>) -> Result<(), PortError> {
        self.repository.approve(self.group_by_namespace(accounts))
    }

    pub fn reject_session_proposal(&self) -> Result<(), PortError> {
        self.repository.reject()
    }

    pub fn disconnect_session(&self, topic: &str) -> Result<(), PortError> {
        self.repository.disconnect(topic)
    }

    /// Cancels the request at the protocol level. The pending request is kept.
    pub fn cancel_request(&self, topic: &str, id: u64) -> Result<(), PortError> {
        self.repository.cancel_request(topic, id)
    }

    pub fn init(&self, project_id: &str) -> Result<(), PortError> {
        self.repository.init(project_id)
    }

    pub fn pair(&self, uri: &str) -> Result<(), PortError> {
        self.repository.pair(uri)
    }

    /// Pairs with `uri` now if accounts are published, otherwise buffers it.
    pub fn add_deeplink(&self, uri: impl Into<String>) -> Result<(), PortError> {
        let uri = uri.into();
        {
            let mut state = self.lock_state()?;
            if !state.ready_for_deeplinks {
                state.deeplinks.push(uri);
                return Ok(());
            }
        }
        self.repository.pair(&uri)
    }
}
