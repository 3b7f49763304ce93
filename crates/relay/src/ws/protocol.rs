use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};

/// Write one pre-serialized envelope as a text frame.
pub(crate) async fn send_frame(socket: &mut WebSocket, frame: &str) -> Result<(), axum::Error> {
    socket.send(Message::Text(frame.to_owned().into())).await
}

fn frame_size_exceeded_reason(max_frame_bytes: usize) -> String {
    format!("websocket frame exceeds maximum size of {max_frame_bytes} bytes")
}

pub(crate) fn is_frame_size_violation(error: &axum::Error) -> bool {
    let message = error.to_string().to_ascii_lowercase();
    message.contains("message too long")
        || message.contains("frame too long")
        || message.contains("too large")
        || message.contains("too big")
        || message.contains("size limit")
}

pub(crate) async fn close_frame_too_large(socket: &mut WebSocket, max_frame_bytes: usize) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code: close_code::SIZE,
            reason: frame_size_exceeded_reason(max_frame_bytes).into(),
        })))
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_violations_are_recognized_case_insensitively() {
        for message in [
            "Space limit exceeded: Message too long: 70000 > 65536",
            "frame too long",
            "payload TOO LARGE",
        ] {
            assert!(is_frame_size_violation(&axum::Error::new(message)), "{message}");
        }
        assert!(!is_frame_size_violation(&axum::Error::new("connection reset by peer")));
    }

    #[test]
    fn close_reason_names_limit() {
        assert_eq!(
            frame_size_exceeded_reason(1024),
            "websocket frame exceeds maximum size of 1024 bytes"
        );
    }
}
