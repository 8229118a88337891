//! Token endpoint integration tests.
//!
//! A one-shot HTTP responder stands in for the provider's token endpoint so
//! the form encoding and error mapping are exercised over a real socket.

use std::collections::HashMap;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use url::Url;

use mailwatch_oauth::{AuthorizationCodeFlow, Error, LoopbackRedirect, OAuthClient, Provider, Token};

/// Serves exactly one request with `status` and `body`, returning the
/// request body it received.
async fn one_shot(status: &'static str, body: &'static str) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let body_start = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&buf[..body_start]).to_lowercase();
        let content_length: usize = head
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .map_or(0, |v| v.trim().parse().unwrap());
        while buf.len() < body_start + content_length {
            let n = stream.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
        }
        let request_body = String::from_utf8_lossy(&buf[body_start..]).to_string();

        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        let _ = tx.send(request_body);
    });

    (format!("http://127.0.0.1:{port}/token"), rx)
}

fn client(token_url: &str) -> OAuthClient {
    let provider = Provider::gmail_readonly()
        .unwrap()
        .with_token_url(token_url)
        .unwrap();
    OAuthClient::new("client-1", provider).with_client_secret("s3cret")
}

#[tokio::test]
async fn refresh_keeps_refresh_token_when_omitted() {
    let (url, request) = one_shot(
        "200 OK",
        r#"{"access_token":"new-access","token_type":"Bearer","expires_in":3599}"#,
    )
    .await;

    let old = Token::new("old-access", "Bearer").with_refresh_token("1//refresh");
    let new = client(&url).refresh_token(&old).await.unwrap();

    assert_eq!(new.access_token, "new-access");
    assert_eq!(new.refresh_token.as_deref(), Some("1//refresh"));
    assert!(new.is_valid());

    let form = request.await.unwrap();
    assert!(form.contains("grant_type=refresh_token"));
    assert!(form.contains("refresh_token=1%2F%2Frefresh"));
    assert!(form.contains("client_secret=s3cret"));
}

#[tokio::test]
async fn refresh_maps_invalid_grant() {
    let (url, _request) = one_shot(
        "400 Bad Request",
        r#"{"error":"invalid_grant","error_description":"Token has been expired or revoked."}"#,
    )
    .await;

    let old = Token::new("old-access", "Bearer").with_refresh_token("revoked");
    let err = client(&url).refresh_token(&old).await.unwrap_err();

    assert!(err.is_revoked_grant());
    assert!(matches!(err, Error::OAuth { ref error, .. } if error == "invalid_grant"));
}

#[tokio::test]
async fn consent_redirect_is_redeemed_at_token_endpoint() {
    let (url, request) = one_shot(
        "200 OK",
        r#"{"access_token":"first","token_type":"Bearer","expires_in":3599,"refresh_token":"1//kept"}"#,
    )
    .await;
    let flow = AuthorizationCodeFlow::new(client(&url)).with_pkce();
    let listener = LoopbackRedirect::bind().await.unwrap();

    // Plays the browser: follow the consent URL straight back to the redirect.
    let token = flow
        .authorize_with(listener, Duration::from_secs(60), |consent| {
            let params: HashMap<String, String> = consent.query_pairs().into_owned().collect();
            let port = Url::parse(&params["redirect_uri"]).unwrap().port().unwrap();
            let request_line = format!(
                "GET /?code=4%2Fgranted&state={} HTTP/1.1\r\nHost: 127.0.0.1\r\n\r\n",
                params["state"]
            );
            tokio::spawn(async move {
                let mut browser = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
                browser.write_all(request_line.as_bytes()).await.unwrap();
                let mut reply = String::new();
                browser.read_to_string(&mut reply).await.unwrap();
            });
        })
        .await
        .unwrap();

    assert_eq!(token.access_token, "first");
    assert_eq!(token.refresh_token.as_deref(), Some("1//kept"));

    let form = request.await.unwrap();
    assert!(form.contains("grant_type=authorization_code"));
    assert!(form.contains("code=4%2Fgranted"));
    assert!(form.contains("code_verifier="));
    assert!(form.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A"));
    assert!(form.contains("client_id=client-1"));
    assert!(form.contains("client_secret=s3cret"));
}
