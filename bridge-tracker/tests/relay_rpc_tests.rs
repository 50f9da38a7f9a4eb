//! End-to-end relay tracking over JSON-RPC
//!
//! Both chains are mocked HTTP nodes, so these tests cover the tracker, the
//! watcher and the HTTP client together.

use bridge_tracker::events::{RELAYED_MESSAGE, SENT_MESSAGE};
use bridge_tracker::{
    derive_message_hash, BridgeContext, BridgeTracker, TrackerError, VersionedNonce, WaitStrategy,
};
use chain_clients_evm::abi::{encode_arguments, event_topic, to_hex, Token};
use chain_clients_evm::{TransactionReceipt, H160, H256, U256};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[path = "mod.rs"]
mod test_helpers;
use test_helpers::{address_topic, test_config, tx, L1_MESSENGER, L2_MESSENGER};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

async fn mount_result(mock_server: &MockServer, rpc_method: &str, result: serde_json::Value) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": rpc_method})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": result
        })))
        .mount(mock_server)
        .await;
}

fn hex_h256(value: &H256) -> String {
    format!("{:#x}", value)
}

fn sent_message_receipt() -> serde_json::Value {
    let nonce = VersionedNonce::encode(U256::from(42u64), 1).unwrap();
    let data = encode_arguments(&[
        Token::Address(H160::repeat_byte(0xaa)),
        Token::Bytes(vec![0x12, 0x34]),
        Token::Uint(nonce),
        Token::Uint(U256::from(200_000u64)),
    ]);
    json!({
        "transactionHash": hex_h256(&tx(1)),
        "blockNumber": "0xa",
        "gasUsed": "0x5208",
        "effectiveGasPrice": "0x3b9aca00",
        "status": "0x1",
        "logs": [{
            "address": L1_MESSENGER,
            "topics": [
                hex_h256(&event_topic(SENT_MESSAGE)),
                hex_h256(&address_topic(&H160::repeat_byte(0xbb)))
            ],
            "data": to_hex(&data),
            "blockNumber": "0xa",
            "transactionHash": hex_h256(&tx(1)),
            "logIndex": "0x0"
        }]
    })
}

fn relay_log_json(msg_hash: &H256) -> serde_json::Value {
    json!({
        "address": L2_MESSENGER,
        "topics": [hex_h256(&event_topic(RELAYED_MESSAGE)), hex_h256(msg_hash)],
        "data": "0x",
        "blockNumber": "0x7c6",
        "transactionHash": hex_h256(&tx(0x77)),
        "logIndex": "0x0"
    })
}

fn relay_receipt_json() -> serde_json::Value {
    json!({
        "transactionHash": hex_h256(&tx(0x77)),
        "blockNumber": "0x7c6",
        "gasUsed": "0x0",
        "status": "0x1",
        "logs": []
    })
}

fn expected_msg_hash() -> H256 {
    let receipt: TransactionReceipt = serde_json::from_value(sent_message_receipt()).unwrap();
    derive_message_hash(&receipt, U256::from(1000u64)).unwrap()
}

fn tracker(hub: &MockServer, verse: &MockServer) -> BridgeTracker {
    let mut config = test_config();
    config.hub_chain.rpc_url = hub.uri();
    config.verse_chain.rpc_url = verse.uri();
    config.watcher.retry_delay_ms = 10;
    BridgeTracker::new(BridgeContext::from_config(&config).unwrap())
}

// ============================================================================
// TESTS
// ============================================================================

/// Test that a deposit is traced from its Hub receipt to the Verse relay transaction
/// Why: this is the complete confirmation path against real node responses
#[tokio::test]
async fn test_deposit_confirmed_over_rpc() {
    let hub = MockServer::start().await;
    let verse = MockServer::start().await;
    let msg_hash = expected_msg_hash();

    mount_result(&hub, "eth_getTransactionReceipt", sent_message_receipt()).await;
    mount_result(&verse, "eth_blockNumber", json!("0x7d0")).await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "eth_getLogs",
            "params": [{
                "address": L2_MESSENGER,
                "fromBlock": "0x1f4",
                "toBlock": "0x7d0"
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": [relay_log_json(&msg_hash)]
        })))
        .mount(&verse)
        .await;
    mount_result(&verse, "eth_getTransactionReceipt", relay_receipt_json()).await;

    let outcome = tracker(&hub, &verse)
        .wait_for_deposit_relay(tx(1), U256::from(1000u64), WaitStrategy::Scan)
        .await
        .unwrap();

    assert!(outcome.is_relayed());
    assert_eq!(outcome.msg_hash(), msg_hash);
    assert_eq!(outcome.transaction_hash(), tx(0x77));
}

/// Test that a marker-matched node error is retried until the relay is found
/// Why: nodes report some not-yet-available data as ordinary RPC errors
#[tokio::test]
async fn test_marker_error_retried_over_rpc() {
    let hub = MockServer::start().await;
    let verse = MockServer::start().await;
    let msg_hash = expected_msg_hash();

    mount_result(&hub, "eth_getTransactionReceipt", sent_message_receipt()).await;
    mount_result(&verse, "eth_blockNumber", json!("0x7d0")).await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "eth_getLogs"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32000, "message": "index out of bounds"}
        })))
        .up_to_n_times(1)
        .mount(&verse)
        .await;
    mount_result(&verse, "eth_getLogs", json!([relay_log_json(&msg_hash)])).await;
    mount_result(&verse, "eth_getTransactionReceipt", relay_receipt_json()).await;

    let outcome = tracker(&hub, &verse)
        .wait_for_deposit_relay(tx(1), U256::from(1000u64), WaitStrategy::Scan)
        .await
        .unwrap();

    assert_eq!(outcome.transaction_hash(), tx(0x77));
}

/// Test that other node errors end the wait at once
/// Why: retrying a rejected query would only delay the failure
#[tokio::test]
async fn test_terminal_error_over_rpc() {
    let hub = MockServer::start().await;
    let verse = MockServer::start().await;

    mount_result(&hub, "eth_getTransactionReceipt", sent_message_receipt()).await;
    mount_result(&verse, "eth_blockNumber", json!("0x7d0")).await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "eth_getLogs"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32602, "message": "invalid params"}
        })))
        .mount(&verse)
        .await;

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        tracker(&hub, &verse).wait_for_deposit_relay(tx(1), U256::from(1000u64), WaitStrategy::Scan),
    )
    .await
    .expect("terminal errors are not retried");

    assert!(matches!(result, Err(TrackerError::Rpc(_))));
}
