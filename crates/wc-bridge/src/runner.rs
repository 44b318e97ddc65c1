use std::sync::Arc;
use std::time::Duration;

use eyre::{eyre, Result, WrapErr};
use serde::Deserialize;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{info, warn};

use wc_bridge_adapters::{
    BridgeConfig, DeterministicSigner, JsonFileSessionsRepository, LocalWalletConnectRepository,
    RawSessionRequest, RelayResponse, StaticBlockchainHelper,
};
use wc_bridge_core::{
    Account, SessionProposal, WalletConnectError, WalletConnectEventsHandler,
    WalletConnectInteractor, WcPreparedRequest, WcSessionForScreen,
};

const SETTLE_INTERVAL: Duration = Duration::from_millis(10);
const LISTENER_START_ATTEMPTS: usize = 200;
const QUIET_ROUNDS: usize = 3;

/// One line of a replay script.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Step {
    Accounts { accounts: Vec<Account> },
    Pair { uri: String },
    PairError { message: String },
    Proposal { proposal: SessionProposal },
    Request(RawSessionRequest),
    Delete { topic: String },
    Disconnect { topic: String },
}

pub fn parse_script(script: &str) -> Result<Vec<Step>> {
    script
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(n, line)| {
            serde_json::from_str(line).wrap_err_with(|| format!("script line {}", n + 1))
        })
        .collect()
}

#[derive(Debug)]
enum Decision {
    ApproveProposal,
    Sign(WcPreparedRequest),
}

/// Event sink that approves every proposal and request it is shown.
#[derive(Debug)]
struct AutoApproveHandler {
    decisions: mpsc::UnboundedSender<Decision>,
}

impl AutoApproveHandler {
    fn decide(&self, decision: Decision) {
        if self.decisions.send(decision).is_err() {
            warn!("replay finished, dropping decision");
        }
    }
}

impl WalletConnectEventsHandler for AutoApproveHandler {
    fn on_proposal_received(&self, proposal: &SessionProposal, networks_formatted: &str) {
        info!(dapp = %proposal.name, networks = networks_formatted, "approving proposal");
        self.decide(Decision::ApproveProposal);
    }

    fn on_session_established(&self) {
        info!("session established");
    }

    fn on_session_rejected(&self, error: &WalletConnectError) {
        warn!(%error, "session rejected");
    }

    fn on_list_of_sessions_updated(&self, sessions: &[WcSessionForScreen]) {
        info!(count = sessions.len(), "sessions updated");
    }

    fn on_session_request(&self, request: &WcPreparedRequest) {
        info!(topic = %request.topic, request_id = request.request_id, "approving request");
        self.decide(Decision::Sign(request.clone()));
    }

    fn on_session_request_for_wrong_user_wallet(&self) {
        warn!("request for another user wallet");
    }

    fn on_unsupported_request(&self) {
        warn!("unsupported request");
    }

    fn on_pair_connect_error(&self, message: &str) {
        warn!(message, "pairing failed");
    }
}

type BridgeInteractor = WalletConnectInteractor<
    LocalWalletConnectRepository,
    JsonFileSessionsRepository,
    DeterministicSigner,
    AutoApproveHandler,
    StaticBlockchainHelper,
>;

pub async fn run_script_file(config: &BridgeConfig, path: &str) -> Result<Vec<RelayResponse>> {
    let script = tokio::fs::read_to_string(path)
        .await
        .wrap_err_with(|| format!("read script {path}"))?;
    run_steps(config, parse_script(&script)?).await
}

pub async fn run_steps(config: &BridgeConfig, steps: Vec<Step>) -> Result<Vec<RelayResponse>> {
    let (decisions_tx, mut decisions) = mpsc::unbounded_channel();
    let interactor: Arc<BridgeInteractor> = Arc::new(
        WalletConnectInteractor::new(
            LocalWalletConnectRepository::new(config.event_buffer)
                .with_relay_url(&config.relay_url),
            JsonFileSessionsRepository::new(&config.sessions_path),
            DeterministicSigner::new(config.signer_seed.clone()),
            AutoApproveHandler {
                decisions: decisions_tx,
            },
            StaticBlockchainHelper::default(),
        )
        .with_settings(config.interactor_settings()),
    );

    interactor.init(&config.project_id)?;
    let listeners = Arc::clone(&interactor).spawn_listeners(
        &Handle::current(),
        config.user_wallet_id.clone(),
        config.card_id.clone(),
    )?;
    wait_for_listeners(&interactor).await?;

    let mut accounts: Vec<Account> = Vec::new();
    for step in steps {
        match step {
            Step::Accounts { accounts: granted } => {
                accounts = granted.clone();
                interactor.set_user_chains(granted)?;
            }
            Step::Pair { uri } => interactor.add_deeplink(uri)?,
            Step::PairError { message } => interactor.repository.receive_pair_error(message),
            Step::Proposal { proposal } => {
                interactor.repository.receive_session_proposal(proposal)?
            }
            Step::Request(raw) => interactor.repository.receive_session_request(raw)?,
            Step::Delete { topic } => interactor.repository.receive_session_delete(&topic)?,
            Step::Disconnect { topic } => interactor.disconnect_session(&topic)?,
        }
        settle(&interactor, &mut decisions, &accounts).await?;
    }

    listeners.abort();
    Ok(interactor.repository.take_responses()?)
}

async fn wait_for_listeners(interactor: &BridgeInteractor) -> Result<()> {
    for _ in 0..LISTENER_START_ATTEMPTS {
        if interactor.repository.listener_count() > 0 {
            return Ok(());
        }
        tokio::time::sleep(SETTLE_INTERVAL).await;
    }
    Err(eyre!("walletconnect listeners did not start"))
}

/// Applies decisions until the listeners go quiet.
async fn settle(
    interactor: &BridgeInteractor,
    decisions: &mut mpsc::UnboundedReceiver<Decision>,
    accounts: &[Account],
) -> Result<()> {
    let mut quiet_rounds = 0;
    while quiet_rounds < QUIET_ROUNDS {
        tokio::time::sleep(SETTLE_INTERVAL).await;
        let mut applied = 0;
        while let Ok(decision) = decisions.try_recv() {
            applied += 1;
            match decision {
                Decision::ApproveProposal => {
                    interactor.approve_session_proposal(accounts.to_vec())?
                }
                Decision::Sign(request) => interactor.continue_with_request(&request).await?,
            }
        }
        if applied == 0 && interactor.repository.queued_events() == 0 {
            quiet_rounds += 1;
        } else {
            quiet_rounds = 0;
        }
    }
    Ok(())
}
