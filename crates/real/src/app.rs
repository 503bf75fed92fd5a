use std::time::Duration;

use axum::{
    http::{header, HeaderName, Method, StatusCode},
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{
    context::USER_ID_HEADER,
    handlers::{
        albums::{create_album, delete_album, get_album, list_albums, update_album},
        cards::{card_events_sse, delete_card, list_cards},
        comments::{create_comment, delete_comment, flag_comment, list_comments, unflag_comment},
        feed::get_feed,
        follows::{accept, block, deny, follow, list_followed, list_followers, unblock, unfollow},
        health::{healthz, livez},
        posts::{
            archive_post, complete_post, create_post, delete_post, dislike_post, flag_post,
            get_post, like_post, list_likes, record_views, restore_post, unflag_post, update_post,
        },
        users::{
            create_user, delete_user, get_self, get_user, list_posts, set_dating_status,
            set_privacy_status, update_details,
        },
    },
    state::AppState,
};

/// Create the application router with all routes and middleware.
pub fn create_app(state: AppState) -> Router {
    // CORS configuration for API endpoints
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(USER_ID_HEADER)]);

    // API routes with CORS
    let api_routes = Router::new()
        // User routes
        .route("/users", post(create_user))
        .route(
            "/users/self",
            get(get_self).patch(update_details).delete(delete_user),
        )
        .route("/users/self/privacy", put(set_privacy_status))
        .route("/users/self/dating", put(set_dating_status))
        .route("/users/{user_id}", get(get_user))
        .route("/users/{user_id}/posts", get(list_posts))
        .route("/users/{user_id}/albums", get(list_albums))
        // Follow and block routes
        .route("/users/{user_id}/follow", post(follow).delete(unfollow))
        .route("/users/{user_id}/followers", get(list_followers))
        .route("/users/{user_id}/followed", get(list_followed))
        .route("/users/{user_id}/block", post(block).delete(unblock))
        .route("/followers/{user_id}/accept", post(accept))
        .route("/followers/{user_id}/deny", post(deny))
        // Post routes
        .route("/posts", post(create_post))
        .route("/posts/views", post(record_views))
        .route(
            "/posts/{post_id}",
            get(get_post).patch(update_post).delete(delete_post),
        )
        .route("/posts/{post_id}/complete", post(complete_post))
        .route("/posts/{post_id}/archive", post(archive_post))
        .route("/posts/{post_id}/restore", post(restore_post))
        .route("/posts/{post_id}/like", post(like_post).delete(dislike_post))
        .route("/posts/{post_id}/likes", get(list_likes))
        .route("/posts/{post_id}/flag", post(flag_post).delete(unflag_post))
        // Comment routes
        .route(
            "/posts/{post_id}/comments",
            get(list_comments).post(create_comment),
        )
        .route("/comments/{comment_id}", delete(delete_comment))
        .route(
            "/comments/{comment_id}/flag",
            post(flag_comment).delete(unflag_comment),
        )
        // Feed and card routes
        .route("/feed", get(get_feed))
        .route("/cards", get(list_cards))
        .route("/cards/events", get(card_events_sse))
        .route("/cards/{card_id}", delete(delete_card))
        // Album routes
        .route("/albums", post(create_album))
        .route(
            "/albums/{album_id}",
            get(get_album).patch(update_album).delete(delete_album),
        )
        .layer(cors);

    let router = Router::new()
        .route("/livez", get(livez))
        .route("/healthz", get(healthz))
        .nest("/api", api_routes);

    #[cfg(feature = "dynamodb")]
    let router = router.route(
        "/internal/stream",
        post(crate::handlers::stream::ingest_stream),
    );

    // Main application router
    router
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(10),
        ))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::storage::InMemoryRepository;

    struct TestApp {
        app: Router,
        state: AppState,
        store: Arc<InMemoryRepository>,
    }

    impl TestApp {
        fn new() -> Self {
            let store = Arc::new(InMemoryRepository::new());
            let state = AppState::with_store(store.clone());
            Self {
                app: create_app(state.clone()),
                state,
                store,
            }
        }

        async fn request(
            &self,
            method: &str,
            uri: &str,
            user_id: Option<&str>,
            body: Option<serde_json::Value>,
        ) -> (StatusCode, serde_json::Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(user_id) = user_id {
                builder = builder.header(USER_ID_HEADER, user_id);
            }
            let body = match body {
                Some(json) => {
                    builder = builder.header("Content-Type", "application/json");
                    Body::from(json.to_string())
                }
                None => Body::empty(),
            };

            let response = self
                .app
                .clone()
                .oneshot(builder.body(body).unwrap())
                .await
                .unwrap();
            let status = response.status();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
            (status, json)
        }

        /// Runs the stream hooks for everything written so far.
        async fn settle(&self) {
            self.state.dispatcher.settle(&*self.store).await;
        }

        async fn create_user(&self, user_id: &str, username: &str) {
            let (status, _) = self
                .request(
                    "POST",
                    "/api/users",
                    Some(user_id),
                    Some(serde_json::json!({ "username": username })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
        }
    }

    #[tokio::test]
    async fn test_livez() {
        let test = TestApp::new();
        let (status, _) = test.request("GET", "/livez", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_healthz_reports_storage() {
        let test = TestApp::new();
        let (status, json) = test.request("GET", "/healthz", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["healthy"], true);
    }

    #[tokio::test]
    async fn test_missing_caller_is_unauthorized() {
        let test = TestApp::new();
        let (status, _) = test.request("GET", "/api/users/self", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_and_get_self() {
        let test = TestApp::new();
        test.create_user("uid-1", "real.user").await;

        let (status, json) = test
            .request("GET", "/api/users/self", Some("uid-1"), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["userId"], "uid-1");
        assert_eq!(json["username"], "real.user");
        assert_eq!(json["privacyStatus"], "PUBLIC");
    }

    #[tokio::test]
    async fn test_unknown_post_is_not_found() {
        let test = TestApp::new();
        test.create_user("uid-1", "real.user").await;

        let (status, _) = test
            .request("GET", "/api/posts/missing", Some("uid-1"), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_followed_posts_reach_the_feed() {
        let test = TestApp::new();
        test.create_user("author", "the.author").await;
        test.create_user("reader", "the.reader").await;

        let (status, json) = test
            .request("POST", "/api/users/author/follow", Some("reader"), None)
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["followStatus"], "FOLLOWING");

        let (status, post) = test
            .request(
                "POST",
                "/api/posts",
                Some("author"),
                Some(serde_json::json!({ "postId": "pid-1", "text": "hello" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(post["postStatus"], "COMPLETED");
        test.settle().await;

        let (status, feed) = test.request("GET", "/api/feed", Some("reader"), None).await;
        assert_eq!(status, StatusCode::OK);
        let feed = feed.as_array().unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0]["postId"], "pid-1");
    }

    #[tokio::test]
    async fn test_like_is_counted_after_settle() {
        let test = TestApp::new();
        test.create_user("author", "the.author").await;
        test.create_user("fan", "the.fan").await;
        test.request(
            "POST",
            "/api/posts",
            Some("author"),
            Some(serde_json::json!({ "postId": "pid-1", "text": "hello" })),
        )
        .await;
        test.settle().await;

        let (status, _) = test
            .request(
                "POST",
                "/api/posts/pid-1/like",
                Some("fan"),
                Some(serde_json::json!({})),
            )
            .await;
        assert!(status.is_success());
        test.settle().await;

        let (status, post) = test
            .request("GET", "/api/posts/pid-1", Some("fan"), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(post["onymousLikeCount"], 1);

        let (status, _) = test
            .request(
                "POST",
                "/api/posts/pid-1/like",
                Some("fan"),
                Some(serde_json::json!({})),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }
}
