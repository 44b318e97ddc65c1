//! Decoding of WalletConnect session-request payloads.
//!
//! Decoding is total: every `(method, params)` pair yields a [`WcRequest`].
//! Unknown methods and payloads that fail to parse come back as
//! [`WcRequest::CustomRequest`] carrying the raw params untouched.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::request::{
    WcAddChain, WcBinanceCancelMessage, WcBinanceOrder, WcBinanceTradeMessage,
    WcBinanceTransferMessage, WcBinanceTxConfirmParam, WcCustomRequest, WcEthTransactionType,
    WcEthereumSignMessage, WcEthereumSignMessageType, WcEthereumTransaction, WcRequest,
    WcSignTransaction, WcSolanaSignAllTransactions, WcSolanaSignTransaction,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WcJrpcMethod {
    EthSign,
    PersonalSign,
    EthSignTypedData,
    EthSignTypedDataV4,
    EthSignTransaction,
    EthSendTransaction,
    BnbSign,
    BnbTxConfirmation,
    TrustSignTransaction,
    WalletAddEthereumChain,
    SolanaSignTransaction,
    SolanaSignAllTransactions,
}

impl WcJrpcMethod {
    pub const ALL: [WcJrpcMethod; 12] = [
        WcJrpcMethod::EthSign,
        WcJrpcMethod::PersonalSign,
        WcJrpcMethod::EthSignTypedData,
        WcJrpcMethod::EthSignTypedDataV4,
        WcJrpcMethod::EthSignTransaction,
        WcJrpcMethod::EthSendTransaction,
        WcJrpcMethod::BnbSign,
        WcJrpcMethod::BnbTxConfirmation,
        WcJrpcMethod::TrustSignTransaction,
        WcJrpcMethod::WalletAddEthereumChain,
        WcJrpcMethod::SolanaSignTransaction,
        WcJrpcMethod::SolanaSignAllTransactions,
    ];

    pub fn code(self) -> &'static str {
        match self {
            WcJrpcMethod::EthSign => "eth_sign",
            WcJrpcMethod::PersonalSign => "personal_sign",
            WcJrpcMethod::EthSignTypedData => "eth_signTypedData",
            WcJrpcMethod::EthSignTypedDataV4 => "eth_signTypedData_v4",
            WcJrpcMethod::EthSignTransaction => "eth_signTransaction",
            WcJrpcMethod::EthSendTransaction => "eth_sendTransaction",
            WcJrpcMethod::BnbSign => "bnb_sign",
            WcJrpcMethod::BnbTxConfirmation => "bnb_tx_confirmation",
            WcJrpcMethod::TrustSignTransaction => "trust_signTransaction",
            WcJrpcMethod::WalletAddEthereumChain => "wallet_addEthereumChain",
            WcJrpcMethod::SolanaSignTransaction => "solana_signTransaction",
            WcJrpcMethod::SolanaSignAllTransactions => "solana_signAllTransactions",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.code() == code)
    }
}

#[derive(Debug, Error)]
enum DecodeError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Shape(&'static str),
}

pub fn decode_request(method: &str, params: &str) -> WcRequest {
    let Some(known) = WcJrpcMethod::from_code(method) else {
        return custom(method, params);
    };

    let decoded = match known {
        WcJrpcMethod::EthSign => sign_message(params, WcEthereumSignMessageType::Message),
        WcJrpcMethod::PersonalSign => {
            sign_message(params, WcEthereumSignMessageType::PersonalMessage)
        }
        WcJrpcMethod::EthSignTypedData | WcJrpcMethod::EthSignTypedDataV4 => {
            sign_typed_data(params)
        }
        WcJrpcMethod::EthSignTransaction => {
            eth_transaction(params, WcEthTransactionType::EthSignTransaction)
        }
        WcJrpcMethod::EthSendTransaction => {
            eth_transaction(params, WcEthTransactionType::EthSendTransaction)
        }
        WcJrpcMethod::BnbSign => bnb_sign(params),
        WcJrpcMethod::BnbTxConfirmation => {
            first_param::<WcBinanceTxConfirmParam>(params).map(WcRequest::BnbTxConfirm)
        }
        WcJrpcMethod::TrustSignTransaction => {
            first_param::<WcSignTransaction>(params).map(WcRequest::SignTransaction)
        }
        WcJrpcMethod::WalletAddEthereumChain => {
            first_param::<WcAddChain>(params).map(WcRequest::AddChain)
        }
        WcJrpcMethod::SolanaSignTransaction => {
            first_param::<WcSolanaSignTransaction>(params).map(WcRequest::SolanaSignTransaction)
        }
        WcJrpcMethod::SolanaSignAllTransactions => {
            first_param::<WcSolanaSignAllTransactions>(params)
                .map(WcRequest::SolanaSignAllTransactions)
        }
    };

    decoded.unwrap_or_else(|e| {
        warn!(method, error = %e, "wc request params did not parse, treating as custom request");
        custom(method, params)
    })
}

fn custom(method: &str, params: &str) -> WcRequest {
    WcRequest::CustomRequest(WcCustomRequest {
        method: method.to_owned(),
        params: params.to_owned(),
    })
}

/// Structured payload of a call: the first array element, or the value itself
/// when a dApp sends a bare object.
fn first_param<T: DeserializeOwned>(params: &str) -> Result<T, DecodeError> {
    let value: Value = serde_json::from_str(params)?;
    let first = match value {
        Value::Array(items) => items
            .into_iter()
            .next()
            .ok_or(DecodeError::Shape("empty params array"))?,
        other @ Value::Object(_) => other,
        _ => return Err(DecodeError::Shape("params must be an array or object")),
    };
    Ok(serde_json::from_value(first)?)
}

fn string_params(params: &str) -> Result<Vec<Value>, DecodeError> {
    match serde_json::from_str::<Value>(params)? {
        Value::Array(items) => Ok(items),
        _ => Err(DecodeError::Shape("params must be an array")),
    }
}

fn as_text(value: Option<&Value>) -> Result<String, DecodeError> {
    value
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or(DecodeError::Shape("expected string parameter"))
}

// eth_sign is [address, data]; personal_sign is [data, address].
fn sign_message(
    params: &str,
    kind: WcEthereumSignMessageType,
) -> Result<WcRequest, DecodeError> {
    let items = string_params(params)?;
    let (address, data) = match kind {
        WcEthereumSignMessageType::PersonalMessage => (items.get(1), items.first()),
        _ => (items.first(), items.get(1)),
    };
    Ok(WcRequest::EthSign(WcEthereumSignMessage {
        kind,
        address: as_text(address)?,
        data: as_text(data)?,
    }))
}

fn sign_typed_data(params: &str) -> Result<WcRequest, DecodeError> {
    let items = string_params(params)?;
    let address = as_text(items.first())?;
    let data = match items.get(1) {
        Some(Value::String(s)) => s.clone(),
        Some(obj @ Value::Object(_)) => serde_json::to_string(obj)?,
        _ => return Err(DecodeError::Shape("typed data must be a string or object")),
    };
    Ok(WcRequest::EthSign(WcEthereumSignMessage {
        kind: WcEthereumSignMessageType::TypedMessage,
        address,
        data,
    }))
}

fn eth_transaction(params: &str, kind: WcEthTransactionType) -> Result<WcRequest, DecodeError> {
    let transaction = first_param::<WcEthereumTransaction>(params)?;
    Ok(WcRequest::EthTransaction { kind, transaction })
}

// First matching shape wins: cancel, trade, transfer.
fn bnb_sign(params: &str) -> Result<WcRequest, DecodeError> {
    if let Some(order) = bnb_order::<WcBinanceCancelMessage>(params) {
        return Ok(WcRequest::BnbCancel(order));
    }
    if let Some(order) = bnb_order::<WcBinanceTradeMessage>(params) {
        return Ok(WcRequest::BnbTrade(order));
    }
    if let Some(order) = bnb_order::<WcBinanceTransferMessage>(params) {
        return Ok(WcRequest::BnbTransfer(order));
    }
    Err(DecodeError::Shape("bnb_sign payload matches no known order"))
}

fn bnb_order<M: DeserializeOwned>(params: &str) -> Option<WcBinanceOrder<M>> {
    first_param::<WcBinanceOrder<M>>(params)
        .ok()
        .filter(|order| !order.msgs.is_empty())
}
