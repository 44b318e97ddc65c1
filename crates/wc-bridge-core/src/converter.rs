use alloy::hex;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::debug;

use crate::domain::{Account, SessionRequest};
use crate::ports::{PortError, SessionsRepository, SigningSdk, WcBlockchainHelper};
use crate::prepared::{
    DappMetadata, WcGenericTransactionData, WcGenericTransactionsData, WcPreparedPayload,
    WcPreparedRequest, WcSignTransactionKind,
};
use crate::request::WcRequest;

/// Turns a decoded session request into a [`WcPreparedRequest`].
///
/// Returns `Ok(None)` when the chain is unknown, no granted account matches the
/// declared signer, or the method has nothing to sign.
pub struct WcSessionRequestConverter<'a, B, S, K> {
    blockchain_helper: &'a B,
    sessions: &'a S,
    sdk: &'a K,
}

impl<'a, B, S, K> WcSessionRequestConverter<'a, B, S, K>
where
    B: WcBlockchainHelper,
    S: SessionsRepository,
    K: SigningSdk,
{
    pub fn new(blockchain_helper: &'a B, sessions: &'a S, sdk: &'a K) -> Self {
        Self {
            blockchain_helper,
            sessions,
            sdk,
        }
    }

    pub async fn prepare_request(
        &self,
        request: &SessionRequest,
        user_wallet_id: &str,
    ) -> Result<Option<WcPreparedRequest>, PortError> {
        let Some(network_id) = request
            .chain_id
            .as_deref()
            .and_then(|chain_id| self.blockchain_helper.chain_id_to_network_id(chain_id))
        else {
            debug!(topic = %request.topic, chain_id = ?request.chain_id, "no network for chain id");
            return Ok(None);
        };

        let Some(account) = self.find_account(request, user_wallet_id).await? else {
            debug!(
                topic = %request.topic,
                signer = ?request.request.signer_address(),
                "no granted account matches request signer"
            );
            return Ok(None);
        };
        let derivation_path = account.derivation_path;

        let dapp = DappMetadata {
            name: request.meta_name.clone(),
            url: request.meta_url.clone(),
        };

        let payload = match &request.request {
            WcRequest::EthSign(message) => self
                .sdk
                .prepare_data_for_personal_sign(message, &network_id, &dapp)
                .await
                .map(WcPreparedPayload::EthSign),
            WcRequest::EthTransaction { kind, transaction } => self
                .sdk
                .prepare_transaction_data(
                    transaction,
                    *kind,
                    &network_id,
                    derivation_path.as_deref(),
                    &dapp,
                )
                .await
                .map(WcPreparedPayload::EthTransaction),
            WcRequest::BnbTrade(order) => self
                .sdk
                .prepare_bnb_trade_order(order, &dapp)
                .await
                .map(WcPreparedPayload::BnbTransaction),
            WcRequest::BnbTransfer(order) => self
                .sdk
                .prepare_bnb_transfer_order(order, &dapp)
                .await
                .map(WcPreparedPayload::BnbTransaction),
            WcRequest::SignTransaction(tx) => {
                Some(WcPreparedPayload::SignTransaction(WcGenericTransactionData {
                    kind: WcSignTransactionKind::Generic,
                    hash_to_sign: hex_or_raw(&tx.transaction),
                    network_id: network_id.clone(),
                    dapp: dapp.clone(),
                }))
            }
            WcRequest::SolanaSignTransaction(tx) => {
                BASE64.decode(&tx.transaction).ok().map(|bytes| {
                    WcPreparedPayload::SignTransaction(WcGenericTransactionData {
                        kind: WcSignTransactionKind::Solana,
                        hash_to_sign: bytes,
                        network_id: network_id.clone(),
                        dapp: dapp.clone(),
                    })
                })
            }
            WcRequest::SolanaSignAllTransactions(txs) => txs
                .transactions
                .iter()
                .map(|tx| BASE64.decode(tx).ok())
                .collect::<Option<Vec<_>>>()
                .filter(|hashes| !hashes.is_empty())
                .map(|hashes_to_sign| {
                    WcPreparedPayload::SignTransactions(WcGenericTransactionsData {
                        kind: WcSignTransactionKind::Solana,
                        hashes_to_sign,
                        network_id: network_id.clone(),
                        dapp: dapp.clone(),
                    })
                }),
            WcRequest::BnbCancel(_)
            | WcRequest::BnbTxConfirm(_)
            | WcRequest::AddChain(_)
            | WcRequest::CustomRequest(_) => None,
        };

        Ok(payload.map(|payload| WcPreparedRequest {
            topic: request.topic.clone(),
            request_id: request.id,
            derivation_path,
            payload,
        }))
    }

    async fn find_account(
        &self,
        request: &SessionRequest,
        user_wallet_id: &str,
    ) -> Result<Option<Account>, PortError> {
        let Some(chain_id) = request.chain_id.as_deref() else {
            return Ok(None);
        };
        let signer = request.request.signer_address();
        let sessions = self.sessions.load_sessions(user_wallet_id).await?;
        Ok(sessions
            .into_iter()
            .find(|session| session.topic == request.topic)
            .and_then(|session| {
                session.accounts.into_iter().find(|account| {
                    account.chain_id == chain_id
                        && signer.map_or(true, |s| account.wallet_address.eq_ignore_ascii_case(s))
                })
            }))
    }
}

fn hex_or_raw(encoded: &str) -> Vec<u8> {
    hex::decode(encoded).unwrap_or_else(|_| encoded.as_bytes().to_vec())
}
