use serde_json::Value;
use wc_bridge_core::request::{WcEthTransactionType, WcEthereumSignMessageType};
use wc_bridge_core::{decode_request, WcJrpcMethod, WcRequest};

fn assert_custom(request: &WcRequest, method: &str, params: &str) {
    match request {
        WcRequest::CustomRequest(custom) => {
            assert_eq!(custom.method, method);
            assert_eq!(custom.params, params);
        }
        other => panic!("expected custom request, got {other:?}"),
    }
}

#[test]
fn method_codes_resolve_back_to_methods() {
    for method in WcJrpcMethod::ALL {
        assert_eq!(WcJrpcMethod::from_code(method.code()), Some(method));
    }
    assert_eq!(WcJrpcMethod::from_code("eth_chainId"), None);
}

#[test]
fn personal_sign_takes_data_before_address() {
    let request = decode_request("personal_sign", r#"["0xdeadbeef","0xSignerAddr"]"#);
    let WcRequest::EthSign(message) = request else {
        panic!("expected eth sign, got {request:?}");
    };
    assert_eq!(message.kind, WcEthereumSignMessageType::PersonalMessage);
    assert_eq!(message.data, "0xdeadbeef");
    assert_eq!(message.address, "0xSignerAddr");
}

#[test]
fn eth_sign_takes_address_before_data() {
    let request = decode_request("eth_sign", r#"["0xSignerAddr","0xdeadbeef"]"#);
    let WcRequest::EthSign(message) = request else {
        panic!("expected eth sign, got {request:?}");
    };
    assert_eq!(message.kind, WcEthereumSignMessageType::Message);
    assert_eq!(message.address, "0xSignerAddr");
    assert_eq!(message.data, "0xdeadbeef");
}

#[test]
fn typed_data_accepts_string_and_object_payloads() {
    let typed = r#"{"types":{"EIP712Domain":[]},"primaryType":"Mail","domain":{},"message":{}}"#;
    let as_string = serde_json::to_string(&vec!["0xSigner", typed]).expect("encode params");
    let as_object = format!(r#"["0xSigner",{typed}]"#);

    for (method, params) in [
        ("eth_signTypedData", as_string.as_str()),
        ("eth_signTypedData_v4", as_object.as_str()),
    ] {
        let request = decode_request(method, params);
        let WcRequest::EthSign(message) = request else {
            panic!("expected typed data, got {request:?}");
        };
        assert_eq!(message.kind, WcEthereumSignMessageType::TypedMessage);
        assert_eq!(message.address, "0xSigner");
        let decoded: Value = serde_json::from_str(&message.data).expect("typed data json");
        assert_eq!(decoded["primaryType"], "Mail");
    }
}

#[test]
fn eth_transactions_keep_their_kind_and_fields() {
    let params = r#"[{"from":"0xFrom","to":"0xTo","gas":"0x5208","gasPrice":"0x3b9aca00","value":"0xde0b6b3a7640000","data":"0x"}]"#;

    let request = decode_request("eth_sendTransaction", params);
    let WcRequest::EthTransaction { kind, transaction } = request else {
        panic!("expected transaction, got {request:?}");
    };
    assert_eq!(kind, WcEthTransactionType::EthSendTransaction);
    assert_eq!(transaction.from, "0xFrom");
    assert_eq!(transaction.to.as_deref(), Some("0xTo"));
    assert_eq!(transaction.gas.as_deref(), Some("0x5208"));
    assert_eq!(transaction.gas_price.as_deref(), Some("0x3b9aca00"));
    assert_eq!(transaction.max_fee_per_gas, None);

    let request = decode_request("eth_signTransaction", params);
    assert!(matches!(
        request,
        WcRequest::EthTransaction {
            kind: WcEthTransactionType::EthSignTransaction,
            ..
        }
    ));
}

#[test]
fn bnb_sign_fans_out_by_message_shape() {
    let cancel = r#"[{"account_number":"12","chain_id":"Binance-Chain-Tigris","data":null,"memo":"","msgs":[{"refid":"ref-1","sender":"bnb1sender","symbol":"BNB_BUSD-BD1"}],"sequence":"3","source":"1"}]"#;
    let trade = r#"[{"account_number":12,"chain_id":"Binance-Chain-Tigris","memo":"","msgs":[{"id":"order-1","ordertype":2,"price":100000000,"quantity":5000000,"sender":"bnb1sender","side":1,"symbol":"BNB_BUSD-BD1","timeinforce":1}],"sequence":3,"source":1}]"#;
    let transfer = r#"[{"account_number":"12","chain_id":"Binance-Chain-Tigris","memo":"gift","msgs":[{"inputs":[{"address":"bnb1from","coins":[{"amount":1000,"denom":"BNB"}]}],"outputs":[{"address":"bnb1to","coins":[{"amount":1000,"denom":"BNB"}]}]}],"sequence":"3","source":"1"}]"#;

    let WcRequest::BnbCancel(order) = decode_request("bnb_sign", cancel) else {
        panic!("expected cancel order");
    };
    assert_eq!(order.msgs[0].refid, "ref-1");

    let WcRequest::BnbTrade(order) = decode_request("bnb_sign", trade) else {
        panic!("expected trade order");
    };
    assert_eq!(order.account_number, "12");
    assert_eq!(order.sequence, "3");
    assert_eq!(order.msgs[0].quantity, 5_000_000);

    let WcRequest::BnbTransfer(order) = decode_request("bnb_sign", transfer) else {
        panic!("expected transfer order");
    };
    assert_eq!(order.memo, "gift");
    assert_eq!(order.msgs[0].outputs[0].address, "bnb1to");
}

#[test]
fn bnb_sign_without_messages_is_custom() {
    let params = r#"[{"account_number":"12","chain_id":"Binance-Chain-Tigris","memo":"","msgs":[],"sequence":"3","source":"1"}]"#;
    assert_custom(&decode_request("bnb_sign", params), "bnb_sign", params);
}

#[test]
fn single_object_methods_decode() {
    let request = decode_request("bnb_tx_confirmation", r#"[{"ok":false,"errorMsg":"rejected"}]"#);
    let WcRequest::BnbTxConfirm(confirm) = request else {
        panic!("expected tx confirm, got {request:?}");
    };
    assert!(!confirm.ok);
    assert_eq!(confirm.error_msg.as_deref(), Some("rejected"));

    let request = decode_request(
        "wallet_addEthereumChain",
        r#"[{"chainId":"0x89","chainName":"Polygon"}]"#,
    );
    let WcRequest::AddChain(chain) = request else {
        panic!("expected add chain, got {request:?}");
    };
    assert_eq!(chain.chain_id, "0x89");

    let request = decode_request(
        "trust_signTransaction",
        r#"[{"network":501,"transaction":"0a0b0c"}]"#,
    );
    let WcRequest::SignTransaction(tx) = request else {
        panic!("expected sign transaction, got {request:?}");
    };
    assert_eq!(tx.network, 501);
    assert_eq!(tx.transaction, "0a0b0c");
}

#[test]
fn solana_methods_accept_bare_objects() {
    let request = decode_request(
        "solana_signTransaction",
        r#"{"feePayer":"FeePayer111","recentBlockhash":"Hash111","transaction":"AQID"}"#,
    );
    let WcRequest::SolanaSignTransaction(tx) = request else {
        panic!("expected solana transaction, got {request:?}");
    };
    assert_eq!(tx.fee_payer.as_deref(), Some("FeePayer111"));
    assert_eq!(tx.transaction, "AQID");

    let request = decode_request(
        "solana_signAllTransactions",
        r#"{"transactions":["AQID","BAUG"]}"#,
    );
    let WcRequest::SolanaSignAllTransactions(txs) = request else {
        panic!("expected solana batch, got {request:?}");
    };
    assert_eq!(txs.transactions, vec!["AQID", "BAUG"]);
}

#[test]
fn decoding_never_fails() {
    let cases = [
        ("eth_chainId", "[]"),
        ("personal_sign", "[]"),
        ("personal_sign", "not json"),
        ("eth_sign", r#"[1,2]"#),
        ("eth_sendTransaction", r#"["0xnot-an-object"]"#),
        ("wallet_addEthereumChain", ""),
        ("bnb_sign", r#"[{"msgs":"nope"}]"#),
        ("solana_signTransaction", "42"),
    ];
    for (method, params) in cases {
        assert_custom(&decode_request(method, params), method, params);
    }
}
