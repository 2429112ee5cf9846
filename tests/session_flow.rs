use hbdl::{Client, ClientConfig, ClientError, Credentials, LoginOutcome};
use wiremock::matchers::{body_string_contains, header, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HOME_PAGE: &str = r#"<html><body>
<script id="user-home-json-data" type="application/json">{"gamekeys": ["first", "second"]}</script>
</body></html>"#;

async fn mock_site() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).insert_header("set-cookie", "csrf_cookie=tok; Path=/"))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/processlogin"))
        .and(header("csrf-prevention-token", "tok"))
        .and(body_string_contains("guard=&"))
        .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"humble_guard_required": true}"#))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/processlogin"))
        .and(header("csrf-prevention-token", "tok"))
        .and(body_string_contains("guard=424242"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", "/")
                .insert_header("set-cookie", "_simpleauth_sess=s3cr3t; Path=/; Max-Age=3600; HttpOnly"),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/home/purchases"))
        .and(header_regex("cookie", "_simpleauth_sess=s3cr3t"))
        .respond_with(ResponseTemplate::new(200).set_body_string(HOME_PAGE))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/home/purchases"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>Sign in</html>"))
        .mount(&server)
        .await;

    server
}

fn config(server: &MockServer) -> ClientConfig {
    ClientConfig::builder().base_url(server.uri()).build().unwrap()
}

#[tokio::test]
async fn guard_login_survives_a_restart() {
    let server = mock_site().await;
    let dir = tempfile::tempdir().unwrap();
    let session_file = dir.path().join("cookies.json");

    let mut client = Client::new(config(&server)).unwrap();
    let creds = Credentials::new("alice@example.com", "correct");

    let first = client.attempt_login(&creds).await.unwrap();
    assert_eq!(first, LoginOutcome::GuardRequired);

    let second = client.attempt_login(&creds.with_guard("424242")).await.unwrap();
    assert_eq!(second, LoginOutcome::Success);
    client.save_session(&session_file).unwrap();

    let mut restarted = Client::new(config(&server)).unwrap();
    let installed = restarted.load_session(&session_file).unwrap();
    assert!(installed >= 1);
    assert_eq!(restarted.gamekeys().await.unwrap(), vec!["first", "second"]);

    // The csrf page was only visited once across both attempts.
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.iter().filter(|r| r.url.path() == "/login").count(), 1);
}

#[tokio::test]
async fn anonymous_session_has_no_library() {
    let server = mock_site().await;
    let mut client = Client::new(config(&server)).unwrap();

    let err = client.gamekeys().await.unwrap_err();
    assert!(matches!(err, ClientError::DataNotFound(_)));
    assert!(err.is_protocol_shape());
}

#[tokio::test]
async fn clients_do_not_share_sessions() {
    let server = mock_site().await;
    let mut a = Client::new(config(&server)).unwrap();
    let b = Client::new(config(&server)).unwrap();

    a.csrf_token().await.unwrap();
    assert!(!a.session().is_empty());
    assert!(b.session().is_empty());
}
