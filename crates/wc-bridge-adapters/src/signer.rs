use alloy::dyn_abi::TypedData;
use alloy::hex;
use alloy::primitives::{eip191_hash_message, keccak256, Address, Bytes, B256, U256};
use serde::Serialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::warn;

use wc_bridge_core::prepared::{WcBinanceTransactionData, WcEthTransactionData, WcEthereumSignData};
use wc_bridge_core::request::{
    WcBinanceTradeOrder, WcBinanceTransferOrder, WcEthTransactionType, WcEthereumSignMessage,
    WcEthereumSignMessageType, WcEthereumTransaction,
};
use wc_bridge_core::{DappMetadata, SigningSdk};

pub const DEFAULT_SIGNER_SEED: &str = "wc-bridge-dev-seed";

/// Signing SDK that derives every signature from its inputs.
///
/// Stands in for the card: same seed, key path, card and payload always give
/// the same 65-byte signature.
#[derive(Debug, Clone)]
pub struct DeterministicSigner {
    seed: String,
}

impl Default for DeterministicSigner {
    fn default() -> Self {
        Self::new(DEFAULT_SIGNER_SEED)
    }
}

impl DeterministicSigner {
    pub fn new(seed: impl Into<String>) -> Self {
        Self { seed: seed.into() }
    }

    fn deterministic_signature(
        &self,
        domain: &str,
        derivation_path: Option<&str>,
        card_id: Option<&str>,
        payload: &[u8],
    ) -> Bytes {
        let mut seed = Vec::new();
        seed.extend_from_slice(self.seed.as_bytes());
        seed.extend_from_slice(domain.as_bytes());
        seed.extend_from_slice(derivation_path.unwrap_or_default().as_bytes());
        seed.extend_from_slice(card_id.unwrap_or_default().as_bytes());
        seed.extend_from_slice(payload);
        let hash = keccak256(seed);
        let mut sig = Vec::with_capacity(65);
        sig.extend_from_slice(hash.as_slice());
        sig.extend_from_slice(keccak256(hash).as_slice());
        sig.push(27);
        Bytes::from(sig)
    }

    fn public_key(&self, derivation_path: Option<&str>, card_id: Option<&str>) -> B256 {
        let mut seed = Vec::new();
        seed.extend_from_slice(self.seed.as_bytes());
        seed.extend_from_slice(derivation_path.unwrap_or_default().as_bytes());
        seed.extend_from_slice(card_id.unwrap_or_default().as_bytes());
        keccak256(seed)
    }

    fn message_hash(message: &WcEthereumSignMessage) -> Option<(B256, String)> {
        match message.kind {
            WcEthereumSignMessageType::Message | WcEthereumSignMessageType::PersonalMessage => {
                let bytes = message_bytes(&message.data);
                let display = String::from_utf8(bytes.clone())
                    .unwrap_or_else(|_| message.data.clone());
                Some((eip191_hash_message(&bytes), display))
            }
            WcEthereumSignMessageType::TypedMessage => {
                let typed: TypedData = serde_json::from_str(&message.data)
                    .map_err(|e| warn!(error = %e, "typed data did not parse"))
                    .ok()?;
                let hash = typed
                    .eip712_signing_hash()
                    .map_err(|e| warn!(error = %e, "typed data could not be hashed"))
                    .ok()?;
                Some((hash, message.data.clone()))
            }
        }
    }
}

fn message_bytes(data: &str) -> Vec<u8> {
    if data.starts_with("0x") || data.starts_with("0X") {
        if let Ok(bytes) = hex::decode(data) {
            return bytes;
        }
    }
    data.as_bytes().to_vec()
}

fn parse_u256(raw: &str) -> Option<U256> {
    let parsed = if raw.starts_with("0x") || raw.starts_with("0X") {
        U256::from_str_radix(&raw[2..], 16).ok()
    } else {
        raw.parse().ok()
    };
    if parsed.is_none() {
        warn!(value = raw, "invalid transaction integer");
    }
    parsed
}

fn parse_optional_u256(raw: Option<&str>) -> Option<Option<U256>> {
    match raw {
        Some(raw) => parse_u256(raw).map(Some),
        None => Some(None),
    }
}

fn parse_address(raw: &str) -> Option<Address> {
    raw.parse()
        .map_err(|e| warn!(address = raw, error = %e, "invalid transaction address"))
        .ok()
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k, sort_keys(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Key-sorted JSON encoding used as the Binance sign doc.
fn canonical_json_bytes<T: Serialize>(value: &T) -> Option<Vec<u8>> {
    let value = serde_json::to_value(value)
        .map_err(|e| warn!(error = %e, "order did not serialize"))
        .ok()?;
    serde_json::to_vec(&sort_keys(value)).ok()
}

fn hex_signature(signature: &Bytes) -> String {
    hex::encode_prefixed(signature)
}

impl SigningSdk for DeterministicSigner {
    async fn prepare_data_for_personal_sign(
        &self,
        message: &WcEthereumSignMessage,
        network_id: &str,
        dapp: &DappMetadata,
    ) -> Option<WcEthereumSignData> {
        let (hash, display) = Self::message_hash(message)?;
        Some(WcEthereumSignData {
            kind: message.kind,
            address: message.address.clone(),
            message: display,
            hash,
            network_id: network_id.to_owned(),
            dapp: dapp.clone(),
        })
    }

    async fn prepare_transaction_data(
        &self,
        transaction: &WcEthereumTransaction,
        kind: WcEthTransactionType,
        network_id: &str,
        derivation_path: Option<&str>,
        dapp: &DappMetadata,
    ) -> Option<WcEthTransactionData> {
        parse_address(&transaction.from)?;
        if let Some(to) = &transaction.to {
            parse_address(to)?;
        }
        let value = parse_optional_u256(transaction.value.as_deref())?.unwrap_or(U256::ZERO);
        let gas_limit =
            parse_optional_u256(transaction.gas_limit.as_deref().or(transaction.gas.as_deref()))?;
        let gas_price = parse_optional_u256(
            transaction
                .gas_price
                .as_deref()
                .or(transaction.max_fee_per_gas.as_deref()),
        )?;
        let fee = match (gas_limit, gas_price) {
            (Some(limit), Some(price)) => Some(limit.checked_mul(price)?),
            _ => None,
        };
        Some(WcEthTransactionData {
            kind,
            transaction: transaction.clone(),
            network_id: network_id.to_owned(),
            derivation_path: derivation_path.map(str::to_owned),
            value,
            gas_limit,
            fee,
            dapp: dapp.clone(),
        })
    }

    async fn prepare_bnb_trade_order(
        &self,
        order: &WcBinanceTradeOrder,
        dapp: &DappMetadata,
    ) -> Option<WcBinanceTransactionData> {
        let msg = order.msgs.first()?;
        let side = if msg.side == 1 { "buy" } else { "sell" };
        Some(WcBinanceTransactionData {
            data: canonical_json_bytes(order)?,
            address: msg.sender.clone(),
            summary: format!("{side} {} {} @ {}", msg.quantity, msg.symbol, msg.price),
            dapp: dapp.clone(),
        })
    }

    async fn prepare_bnb_transfer_order(
        &self,
        order: &WcBinanceTransferOrder,
        dapp: &DappMetadata,
    ) -> Option<WcBinanceTransactionData> {
        let msg = order.msgs.first()?;
        let from = msg.inputs.first()?;
        let outputs: Vec<String> = msg
            .outputs
            .iter()
            .flat_map(|output| {
                output
                    .coins
                    .iter()
                    .map(move |coin| format!("{} {} to {}", coin.amount, coin.denom, output.address))
            })
            .collect();
        Some(WcBinanceTransactionData {
            data: canonical_json_bytes(order)?,
            address: from.address.clone(),
            summary: format!("transfer {}", outputs.join(", ")),
            dapp: dapp.clone(),
        })
    }

    async fn sign_bnb_transaction(
        &self,
        data: &[u8],
        network_id: &str,
        derivation_path: Option<&str>,
        card_id: Option<&str>,
    ) -> Option<String> {
        let digest = Sha256::digest(data);
        let signature =
            self.deterministic_signature(network_id, derivation_path, card_id, digest.as_slice());
        Some(
            json!({
                "signature": hex::encode(&signature[..64]),
                "publicKey": hex::encode(self.public_key(derivation_path, card_id)),
            })
            .to_string(),
        )
    }

    async fn complete_transaction(
        &self,
        data: &WcEthTransactionData,
        card_id: Option<&str>,
    ) -> Option<String> {
        let payload = serde_json::to_vec(&data.transaction)
            .map_err(|e| warn!(error = %e, "transaction did not serialize"))
            .ok()?;
        let signature = self.deterministic_signature(
            &data.network_id,
            data.derivation_path.as_deref(),
            card_id,
            &payload,
        );
        Some(match data.kind {
            WcEthTransactionType::EthSignTransaction => hex_signature(&signature),
            WcEthTransactionType::EthSendTransaction => {
                let mut raw = payload;
                raw.extend_from_slice(&signature);
                keccak256(raw).to_string()
            }
        })
    }

    async fn sign_personal_message(
        &self,
        hash: &[u8],
        network_id: &str,
        kind: WcEthereumSignMessageType,
        derivation_path: Option<&str>,
        card_id: Option<&str>,
    ) -> Option<String> {
        let domain = format!("{network_id}:{kind:?}");
        Some(hex_signature(&self.deterministic_signature(
            &domain,
            derivation_path,
            card_id,
            hash,
        )))
    }

    async fn sign_transaction(
        &self,
        hash: &[u8],
        network_id: &str,
        derivation_path: Option<&str>,
        card_id: Option<&str>,
    ) -> Option<String> {
        Some(hex_signature(&self.deterministic_signature(
            network_id,
            derivation_path,
            card_id,
            hash,
        )))
    }

    async fn sign_transactions(
        &self,
        hashes: &[Vec<u8>],
        network_id: &str,
        derivation_path: Option<&str>,
        card_id: Option<&str>,
    ) -> Option<String> {
        if hashes.is_empty() {
            return None;
        }
        let signatures: Vec<String> = hashes
            .iter()
            .map(|hash| {
                hex_signature(&self.deterministic_signature(
                    network_id,
                    derivation_path,
                    card_id,
                    hash,
                ))
            })
            .collect();
        serde_json::to_string(&signatures).ok()
    }
}
