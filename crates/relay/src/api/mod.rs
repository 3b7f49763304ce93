// Read-only HTTP views of the chat room.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

use crate::room::{OnlineUsers, Room};

pub fn router(room: Arc<Room>) -> Router {
    Router::new().route("/users", get(list_users)).with_state(room)
}

async fn list_users(State(room): State<Arc<Room>>) -> Json<OnlineUsers> {
    Json(room.list_users().await)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    use super::router;
    use crate::room::{OnlineUsers, Room};

    async fn fetch_users(room: Arc<Room>) -> OnlineUsers {
        let response = router(room)
            .oneshot(
                Request::builder()
                    .uri("/users")
                    .body(Body::empty())
                    .expect("users request should build"),
            )
            .await
            .expect("users request should succeed");
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("users body should be readable");
        serde_json::from_slice(&body).expect("users body should be valid json")
    }

    #[tokio::test]
    async fn empty_room_lists_nobody() {
        let users = fetch_users(Arc::new(Room::default())).await;
        assert!(users.users.is_empty());
        assert_eq!(users.count, 0);
    }

    #[tokio::test]
    async fn lists_joined_users_in_join_order() {
        let room = Arc::new(Room::default());
        let mut receivers = Vec::new();
        for name in ["zoe", "adam"] {
            let (sender, receiver) = mpsc::unbounded_channel();
            let connection_id = room.accept(sender).await;
            let raw = format!(r#"{{"type":"join","username":"{name}"}}"#);
            room.handle_frame(connection_id, raw.as_bytes()).await;
            receivers.push(receiver);
        }
        // A connected but unidentified client does not show up.
        let (lurker, _lurker_rx) = mpsc::unbounded_channel();
        room.accept(lurker).await;

        let users = fetch_users(room).await;
        assert_eq!(users.users, vec!["zoe", "adam"]);
        assert_eq!(users.count, 2);
    }
}
