/// HTTP-level tests for the Helix client against a wiremock server
use serde_json::json;
use twitch_helix::{HelixClient, HelixError};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HelixClient {
    HelixClient::new("test-client", "test-secret").with_endpoints(
        format!("{}/helix", server.uri()),
        format!("{}/oauth2/token", server.uri()),
    )
}

async fn mount_token(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=test-client"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "app-token",
            "expires_in": 3600,
            "token_type": "bearer"
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn stream_json(id: &str, viewers: u64) -> serde_json::Value {
    json!({
        "id": id,
        "user_id": format!("user-{id}"),
        "user_login": format!("login{id}"),
        "user_name": format!("Name{id}"),
        "game_id": "509658",
        "game_name": "Just Chatting",
        "type": "live",
        "title": format!("Stream {id}"),
        "viewer_count": viewers,
        "started_at": "2021-03-10T15:04:21Z",
        "language": "fr",
        "thumbnail_url": "",
        "tag_ids": [],
        "tags": [],
        "is_mature": false
    })
}

#[tokio::test]
async fn test_get_streams_sends_filters_and_credentials() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/helix/streams"))
        .and(query_param("language", "fr"))
        .and(query_param("first", "100"))
        .and(header("Client-Id", "test-client"))
        .and(header("Authorization", "Bearer app-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [stream_json("1", 1200), stream_json("2", 80)],
            "pagination": { "cursor": "eyJiIjpudWxsfQ" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let streams = client.get_streams("fr", 100).await.unwrap();

    assert_eq!(streams.len(), 2);
    assert_eq!(streams[0].id, "1");
    assert_eq!(streams[0].viewer_count, 1200);
    assert_eq!(streams[1].user_name, "Name2");
}

#[tokio::test]
async fn test_page_size_is_capped() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/helix/streams"))
        .and(query_param("first", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let streams = client.get_streams("fr", 500).await.unwrap();
    assert!(streams.is_empty());
}

#[tokio::test]
async fn test_follower_total_reads_total_field() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/helix/channels/followers"))
        .and(query_param("broadcaster_id", "123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 8421,
            "data": [{ "user_id": "9", "user_login": "x", "user_name": "X", "followed_at": "2022-05-24T22:22:08Z" }],
            "pagination": {}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert_eq!(client.follower_total("123").await.unwrap(), 8421);
}

#[tokio::test]
async fn test_token_is_reused_between_calls() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/helix/channels/followers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "total": 1, "data": [] })))
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&server);
    for _ in 0..3 {
        client.follower_total("42").await.unwrap();
    }
}

#[tokio::test]
async fn test_non_success_status_is_api_error() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/helix/streams"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.get_streams("fr", 100).await.unwrap_err();

    assert_eq!(err.status(), Some(503));
    match err {
        HelixError::Api { message, .. } => assert!(message.contains("upstream unavailable")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_unauthorized_drops_cached_token() {
    let server = MockServer::start().await;
    mount_token(&server, 2).await;

    Mock::given(method("GET"))
        .and(path("/helix/streams"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "Unauthorized",
            "status": 401,
            "message": "Invalid OAuth token"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.get_streams("fr", 100).await.is_err());
    // Second call must go back to the token endpoint.
    assert!(client.get_streams("fr", 100).await.is_err());
}

#[tokio::test]
async fn test_rejected_credentials_surface_as_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "status": 400,
            "message": "invalid client secret"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.get_streams("fr", 100).await.unwrap_err();
    assert!(matches!(err, HelixError::Auth(_)));
}
