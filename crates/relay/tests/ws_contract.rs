use serde_json::Value;

const RELAY_CONFIG_SOURCE: &str = include_str!("../src/config.rs");
const RELAY_WS_HANDLER_SOURCE: &str = include_str!("../src/ws/handler.rs");
const RELAY_CHAT_ERROR_SOURCE: &str = include_str!("../src/room/error.rs");

fn load_contract() -> Value {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../contracts/chat-protocol.json");
    let content = std::fs::read_to_string(path).expect("contract file should be readable");
    serde_json::from_str(&content).expect("contract file should be valid json")
}

#[test]
fn websocket_contract_default_frame_limit_matches_config() {
    let contract = load_contract();
    let max_frame_bytes = parse_u64_const(RELAY_CONFIG_SOURCE, "DEFAULT_MAX_FRAME_BYTES");

    assert_eq!(Some(max_frame_bytes), contract["limits"]["default_max_frame_bytes"].as_u64());
}

#[test]
fn websocket_contract_route_is_mounted_at_contract_path() {
    let contract = load_contract();
    let path = contract["path"].as_str().expect("contract path should be a string");

    assert!(
        RELAY_WS_HANDLER_SOURCE.contains(&format!(".route(\"{path}\", get(ws_upgrade))")),
        "ws handler must mount the upgrade route at `{path}`",
    );
}

#[test]
fn websocket_contract_room_error_texts_match() {
    let contract = load_contract();
    let room_errors =
        contract["room_errors"].as_object().expect("room_errors should be an object");

    assert!(!room_errors.is_empty());
    for (code, text) in room_errors {
        let text = text.as_str().expect("error text should be a string");
        assert!(
            RELAY_CHAT_ERROR_SOURCE.contains(&format!("#[error(\"{text}\")]")),
            "room error `{code}` must render as `{text}`",
        );
        assert!(
            RELAY_CHAT_ERROR_SOURCE.contains(&format!("=> \"{code}\"")),
            "room error `{code}` must have a stable code label",
        );
    }
}

fn parse_u64_const(source: &str, name: &str) -> u64 {
    let needle = format!("const {name}:");
    let index = source.find(&needle).expect("constant must be declared");
    let line = source[index..].lines().next().expect("constant declaration line must exist");
    let raw_value = line
        .split('=')
        .nth(1)
        .expect("constant must have assignment")
        .trim()
        .trim_end_matches(';')
        .replace('_', "");
    raw_value
        .parse::<u64>()
        .unwrap_or_else(|error| panic!("failed to parse `{name}` from `{line}`: {error}"))
}
