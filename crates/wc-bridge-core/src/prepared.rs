use alloy::primitives::{B256, U256};

use crate::request::{WcEthTransactionType, WcEthereumSignMessageType, WcEthereumTransaction};

/// dApp identity shown on confirmation screens.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DappMetadata {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WcEthereumSignData {
    pub kind: WcEthereumSignMessageType,
    pub address: String,
    /// Human-readable rendering of the payload.
    pub message: String,
    pub hash: B256,
    pub network_id: String,
    pub dapp: DappMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WcEthTransactionData {
    pub kind: WcEthTransactionType,
    pub transaction: WcEthereumTransaction,
    pub network_id: String,
    pub derivation_path: Option<String>,
    pub value: U256,
    pub gas_limit: Option<U256>,
    pub fee: Option<U256>,
    pub dapp: DappMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WcBinanceTransactionData {
    /// Canonical sign-doc bytes.
    pub data: Vec<u8>,
    pub address: String,
    pub summary: String,
    pub dapp: DappMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WcSignTransactionKind {
    Generic,
    Solana,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WcGenericTransactionData {
    pub kind: WcSignTransactionKind,
    pub hash_to_sign: Vec<u8>,
    pub network_id: String,
    pub dapp: DappMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WcGenericTransactionsData {
    pub kind: WcSignTransactionKind,
    pub hashes_to_sign: Vec<Vec<u8>>,
    pub network_id: String,
    pub dapp: DappMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WcPreparedPayload {
    EthSign(WcEthereumSignData),
    EthTransaction(WcEthTransactionData),
    BnbTransaction(WcBinanceTransactionData),
    SignTransaction(WcGenericTransactionData),
    SignTransactions(WcGenericTransactionsData),
}

/// A session request ready for user confirmation and signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WcPreparedRequest {
    pub topic: String,
    pub request_id: u64,
    pub derivation_path: Option<String>,
    pub payload: WcPreparedPayload,
}
