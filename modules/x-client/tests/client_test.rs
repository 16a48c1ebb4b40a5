use mockito::{Matcher, Server};
use x_client::{XClient, XSession};

fn client(url: &str) -> XClient {
    XClient::new(XSession {
        auth_token: "auth".to_string(),
        csrf_token: "csrf".to_string(),
        bearer_token: None,
    })
    .unwrap()
    .with_base_url(url)
}

#[tokio::test]
async fn list_tweets_sends_session_and_cursor() {
    let mut server = Server::new_async().await;
    let page = server
        .mock("GET", "/lists/123/tweets")
        .match_header("cookie", "auth_token=auth; ct0=csrf")
        .match_header("x-csrf-token", "csrf")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("count".into(), "100".into()),
            Matcher::UrlEncoded("cursor".into(), "abc".into()),
        ]))
        .with_status(200)
        .with_body(
            r#"{"tweets":[{"id":"1","text":"hello","user":{"id":"9","screen_name":"alice"}}],
                "next_cursor":"def"}"#,
        )
        .create_async()
        .await;

    let result = client(&server.url())
        .list_tweets("123", 100, Some("abc"))
        .await
        .unwrap();

    page.assert_async().await;
    assert_eq!(result.tweets.len(), 1);
    assert_eq!(result.tweets[0].author_handle(), Some("alice"));
    assert_eq!(result.next_cursor.as_deref(), Some("def"));
}

#[tokio::test]
async fn unauthorized_response_is_an_auth_failure() {
    let mut server = Server::new_async().await;
    let _m = server
        .mock("GET", "/lists/123/tweets")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(r#"{"errors":[{"message":"Could not authenticate you"}]}"#)
        .create_async()
        .await;

    let err = client(&server.url())
        .list_tweets("123", 20, None)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(err.is_auth_failure());
    assert!(!err.is_rate_limit());
}

#[tokio::test]
async fn too_many_requests_is_a_rate_limit() {
    let mut server = Server::new_async().await;
    let _m = server
        .mock("GET", "/account/verify_credentials")
        .with_status(429)
        .create_async()
        .await;

    let err = client(&server.url()).verify_credentials().await.unwrap_err();
    assert!(err.is_rate_limit());
}

#[tokio::test]
async fn list_info_reads_creator() {
    let mut server = Server::new_async().await;
    let _m = server
        .mock("GET", "/lists/77")
        .with_status(200)
        .with_body(
            r#"{"id":77,"name":"Rustaceans","member_count":42,
                "creator":{"id":"5","screen_name":"ferris"}}"#,
        )
        .create_async()
        .await;

    let info = client(&server.url()).list_info("77").await.unwrap();
    assert_eq!(info.id, "77");
    assert_eq!(info.name.as_deref(), Some("Rustaceans"));
    assert_eq!(info.member_count, 42);
    assert_eq!(info.user.unwrap().screen_name, "ferris");
}

#[tokio::test]
async fn memberships_omit_initial_cursor() {
    let mut server = Server::new_async().await;
    let first = server
        .mock("GET", "/users/5/memberships")
        .match_query(Matcher::Exact("count=50".into()))
        .with_status(200)
        .with_body(r#"{"lists":[{"id_str":"1","name":"A"}],"next_cursor_str":"0"}"#)
        .create_async()
        .await;

    let page = client(&server.url())
        .memberships("5", 50, Some("-1"))
        .await
        .unwrap();
    first.assert_async().await;
    assert_eq!(page.lists[0].name, "A");
    assert_eq!(page.next_cursor_str.as_deref(), Some("0"));
}

#[tokio::test]
async fn malformed_body_is_a_parse_error() {
    let mut server = Server::new_async().await;
    let _m = server
        .mock("GET", "/users/by/screen_name/alice")
        .with_status(200)
        .with_body("<html>not json</html>")
        .create_async()
        .await;

    let err = client(&server.url())
        .user_by_screen_name("alice")
        .await
        .unwrap_err();
    assert!(matches!(err, x_client::XError::Parse(_)));
}
