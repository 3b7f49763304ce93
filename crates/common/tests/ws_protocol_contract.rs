use std::collections::BTreeSet;

use parlor_common::protocol::ws::{
    decode_client_envelope, ClientEnvelope, ProtocolError, ServerEnvelope,
    CURRENT_PROTOCOL_VERSION, INBOUND_MESSAGE_TYPES, OUTBOUND_MESSAGE_TYPES,
};
use parlor_common::text::normalize::UsernameError;
use serde_json::Value;

fn load_contract() -> Value {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../contracts/chat-protocol.json");
    let content = std::fs::read_to_string(path).expect("contract file should be readable");
    serde_json::from_str(&content).expect("contract file should be valid JSON")
}

fn string_list(value: &Value, field: &str) -> Vec<String> {
    value[field]
        .as_array()
        .unwrap_or_else(|| panic!("{field} should be an array"))
        .iter()
        .map(|v| v.as_str().expect("entry should be a string").to_string())
        .collect()
}

fn keys(value: &Value) -> BTreeSet<String> {
    value.as_object().expect("value should be an object").keys().cloned().collect()
}

fn contract_keys(contract: &Value, direction: &str, tag: &str) -> BTreeSet<String> {
    contract[direction][tag]
        .as_array()
        .unwrap_or_else(|| panic!("{direction}.{tag} should be an array"))
        .iter()
        .map(|v| v.as_str().expect("key should be a string").to_string())
        .collect()
}

#[test]
fn current_version_matches_contract() {
    let contract = load_contract();
    let expected =
        contract["current_version"].as_str().expect("current_version should be a string");
    assert_eq!(CURRENT_PROTOCOL_VERSION, expected);
}

#[test]
fn message_type_lists_match_contract() {
    let contract = load_contract();
    assert_eq!(INBOUND_MESSAGE_TYPES, string_list(&contract, "inbound_order").as_slice());
    assert_eq!(OUTBOUND_MESSAGE_TYPES, string_list(&contract, "outbound_order").as_slice());
}

#[test]
fn outbound_shapes_match_contract() {
    let contract = load_contract();
    let samples = [
        ServerEnvelope::Joined {
            username: "alice".into(),
            message: "Welcome to the chat, alice!".into(),
            timestamp: 1,
        },
        ServerEnvelope::UserJoined { username: "alice".into(), timestamp: 1 },
        ServerEnvelope::UserLeft { username: "alice".into(), timestamp: 1 },
        ServerEnvelope::Message { username: "alice".into(), message: "hi".into(), timestamp: 1 },
        ServerEnvelope::Pong,
        ServerEnvelope::error("Unknown message type"),
    ];

    for envelope in samples {
        let value = serde_json::to_value(&envelope).expect("envelope should serialize");
        let tag = value["type"].as_str().expect("type should be a string").to_string();
        assert_eq!(
            keys(&value),
            contract_keys(&contract, "outbound", &tag),
            "serialized `{tag}` envelope diverged from contract",
        );
    }
}

#[test]
fn inbound_shapes_match_contract() {
    let contract = load_contract();
    let samples = [
        ClientEnvelope::Join { username: "alice".into() },
        ClientEnvelope::Message { message: "hi".into() },
        ClientEnvelope::Ping,
    ];

    for envelope in samples {
        let value = serde_json::to_value(&envelope).expect("envelope should serialize");
        let tag = value["type"].as_str().expect("type should be a string").to_string();
        assert_eq!(keys(&value), contract_keys(&contract, "inbound", &tag));

        let raw = serde_json::to_vec(&value).expect("value should encode");
        assert_eq!(decode_client_envelope(&raw), Ok(envelope));
    }
}

#[test]
fn error_texts_match_contract() {
    let contract = load_contract();
    let errors = &contract["errors"];
    assert_eq!(ProtocolError::MalformedPayload.to_string(), errors["malformed_payload"]);
    assert_eq!(
        ProtocolError::UnknownMessageType("nope".into()).to_string(),
        errors["unknown_message_type"]
    );
    assert_eq!(UsernameError::Empty.to_string(), errors["empty_username"]);
}
