use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::request::WcRequest;

/// WalletConnect namespace key such as `eip155` or `solana`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NetworkNamespace(pub String);

impl NetworkNamespace {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One blockchain account a session may use.
///
/// `chain_id` is the full `namespace:reference` identifier. The derivation path
/// routes later signing requests to the right key on the card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub chain_id: String,
    pub wallet_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derivation_path: Option<String>,
}

impl Account {
    pub fn new(
        chain_id: impl Into<String>,
        wallet_address: impl Into<String>,
        derivation_path: Option<String>,
    ) -> Self {
        Self {
            chain_id: chain_id.into(),
            wallet_address: wallet_address.into(),
            derivation_path,
        }
    }
}

/// Session persisted for a user wallet once a proposal is approved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub topic: String,
    pub accounts: Vec<Account>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Active session as reported by the WalletConnect client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletConnectSession {
    pub topic: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WcSessionForScreen {
    pub description: String,
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProposal {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub icons: Vec<String>,
    pub required_chain_ids: Vec<String>,
    #[serde(default)]
    pub optional_chain_ids: Vec<String>,
    #[serde(default)]
    pub proposer_public_key: String,
}

/// JSON-RPC call on an established session, already decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRequest {
    pub request: WcRequest,
    pub chain_id: Option<String>,
    pub topic: String,
    pub id: u64,
    pub meta_url: String,
    pub meta_name: String,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WalletConnectEvents {
    SessionProposal(SessionProposal),
    SessionApprovalSuccess { topic: String, accounts: Vec<Account> },
    SessionApprovalError(WalletConnectError),
    SessionDeleted { topic: String },
    SessionRequest(SessionRequest),
    PairConnectError { message: String },
}

/// Address of a pending JSON-RPC call for the response path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestData {
    pub topic: String,
    pub request_id: u64,
    pub blockchain: String,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletConnectError {
    #[error("unsupported networks requested: {}", .0.join(", "))]
    ApprovalErrorUnsupportedNetwork(Vec<String>),
    #[error("networks missing from approval: {}", .0.join(", "))]
    ApprovalErrorMissingNetworks(Vec<String>),
    #[error("add networks before connecting: {}", .0.join(", "))]
    ApprovalErrorAddNetwork(Vec<String>),
    #[error("approval failed: {}", .0.as_deref().unwrap_or("unknown error"))]
    ExternalApprovalError(Option<String>),
    #[error("request belongs to a different user wallet")]
    WrongUserWallet,
    #[error("unsupported method")]
    UnsupportedMethod,
    #[error("signing failed")]
    SigningError,
    #[error("request could not be prepared for signing")]
    ConversionFailed,
}
