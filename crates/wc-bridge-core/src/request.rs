use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WcEthereumSignMessageType {
    Message,
    PersonalMessage,
    TypedMessage,
}

/// Message to sign, normalized to `(address, data)` whatever the method's
/// parameter order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WcEthereumSignMessage {
    pub kind: WcEthereumSignMessageType,
    pub address: String,
    pub data: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WcEthTransactionType {
    EthSignTransaction,
    EthSendTransaction,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WcEthereumTransaction {
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// Binance Chain sign doc as sent by `bnb_sign`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WcBinanceOrder<M> {
    #[serde(deserialize_with = "string_or_number")]
    pub account_number: String,
    pub chain_id: String,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub memo: String,
    pub msgs: Vec<M>,
    #[serde(deserialize_with = "string_or_number")]
    pub sequence: String,
    #[serde(deserialize_with = "string_or_number")]
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WcBinanceCancelMessage {
    pub refid: String,
    pub sender: String,
    pub symbol: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WcBinanceTradeMessage {
    pub id: String,
    pub ordertype: i32,
    pub price: i64,
    pub quantity: i64,
    pub sender: String,
    pub side: i32,
    pub symbol: String,
    pub timeinforce: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WcBinanceCoin {
    pub amount: i64,
    pub denom: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WcBinanceInOut {
    pub address: String,
    pub coins: Vec<WcBinanceCoin>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WcBinanceTransferMessage {
    pub inputs: Vec<WcBinanceInOut>,
    pub outputs: Vec<WcBinanceInOut>,
}

pub type WcBinanceCancelOrder = WcBinanceOrder<WcBinanceCancelMessage>;
pub type WcBinanceTradeOrder = WcBinanceOrder<WcBinanceTradeMessage>;
pub type WcBinanceTransferOrder = WcBinanceOrder<WcBinanceTransferMessage>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WcBinanceTxConfirmParam {
    pub ok: bool,
    #[serde(default)]
    pub error_msg: Option<String>,
}

/// `trust_signTransaction` payload: SLIP-44 network id plus an encoded transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WcSignTransaction {
    pub network: u64,
    pub transaction: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WcAddChain {
    pub chain_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WcSolanaSignTransaction {
    #[serde(default)]
    pub fee_payer: Option<String>,
    #[serde(default)]
    pub recent_blockhash: Option<String>,
    /// Base64 serialized transaction.
    pub transaction: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WcSolanaSignAllTransactions {
    pub transactions: Vec<String>,
}

/// Unrecognized or unparsable call, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WcCustomRequest {
    pub method: String,
    pub params: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WcRequest {
    EthSign(WcEthereumSignMessage),
    EthTransaction {
        kind: WcEthTransactionType,
        transaction: WcEthereumTransaction,
    },
    BnbTrade(WcBinanceTradeOrder),
    BnbTransfer(WcBinanceTransferOrder),
    BnbCancel(WcBinanceCancelOrder),
    BnbTxConfirm(WcBinanceTxConfirmParam),
    SignTransaction(WcSignTransaction),
    AddChain(WcAddChain),
    SolanaSignTransaction(WcSolanaSignTransaction),
    SolanaSignAllTransactions(WcSolanaSignAllTransactions),
    CustomRequest(WcCustomRequest),
}

impl WcRequest {
    /// Address the dApp expects to sign with, when the method declares one.
    pub fn signer_address(&self) -> Option<&str> {
        match self {
            WcRequest::BnbTrade(order) => Some(&order.account_number),
            WcRequest::BnbTransfer(order) => Some(&order.account_number),
            WcRequest::EthTransaction { transaction, .. } => Some(&transaction.from),
            WcRequest::EthSign(message) => Some(&message.address),
            WcRequest::SolanaSignTransaction(tx) => tx.fee_payer.as_deref(),
            WcRequest::BnbCancel(_)
            | WcRequest::BnbTxConfirm(_)
            | WcRequest::SignTransaction(_)
            | WcRequest::AddChain(_)
            | WcRequest::SolanaSignAllTransactions(_)
            | WcRequest::CustomRequest(_) => None,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, WcRequest::CustomRequest(_))
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}
