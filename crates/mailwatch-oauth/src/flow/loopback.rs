//! Loopback redirect receiver for installed applications (RFC 8252 §7.3).
//!
//! Listens on `127.0.0.1` and waits for the browser to deliver the
//! authorization response as a `GET` request.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};

/// Largest request head accepted from the browser.
const MAX_REQUEST_HEAD: usize = 16 * 1024;

const SUCCESS_PAGE: &str = "Authorization complete. You can close this window.";
const FAILURE_PAGE: &str = "Authorization failed. You can close this window.";

/// A bound loopback listener awaiting one authorization redirect.
#[derive(Debug)]
pub struct LoopbackRedirect {
    listener: TcpListener,
    redirect_uri: String,
}

impl LoopbackRedirect {
    /// Binds to an ephemeral port on `127.0.0.1`.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub async fn bind() -> Result<Self> {
        Self::bind_port(0).await
    }

    /// Binds to a specific port on `127.0.0.1`.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub async fn bind_port(port: u16) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port)).await?;
        let port = listener.local_addr()?.port();
        Ok(Self {
            listener,
            redirect_uri: format!("http://127.0.0.1:{port}/"),
        })
    }

    /// Redirect URI to register with the authorization request.
    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Waits for the redirect and returns the authorization code.
    ///
    /// Requests that carry neither `code` nor `error` (a browser fetching
    /// `/favicon.ico`, for instance) are answered with 404 and ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccessDenied`] if the user declined consent,
    /// [`Error::StateMismatch`] if the `state` parameter does not match, and
    /// I/O errors from the socket.
    pub async fn wait_for_code(self, expected_state: &str) -> Result<String> {
        loop {
            let (mut stream, peer) = self.listener.accept().await?;
            debug!("Loopback redirect connection from {peer}");

            let target = match read_request_target(&mut stream).await {
                Ok(target) => target,
                Err(e) => {
                    warn!("Ignoring malformed redirect request: {e}");
                    continue;
                }
            };

            match parse_redirect(&target, expected_state) {
                Ok(Some(code)) => {
                    respond(&mut stream, "200 OK", SUCCESS_PAGE).await;
                    return Ok(code);
                }
                Ok(None) => respond(&mut stream, "404 Not Found", "").await,
                Err(e) => {
                    respond(&mut stream, "400 Bad Request", FAILURE_PAGE).await;
                    return Err(e);
                }
            }
        }
    }
}

/// Reads the request head and returns the request target of the request line.
async fn read_request_target(stream: &mut TcpStream) -> Result<String> {
    let mut head = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];

    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        head.extend_from_slice(&chunk[..n]);
        if head.len() > MAX_REQUEST_HEAD {
            return Err(Error::InvalidResponse("request head too large".into()));
        }
    }

    let head = String::from_utf8_lossy(&head);
    let request_line = head.lines().next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("GET"), Some(target)) => Ok(target.to_string()),
        _ => Err(Error::InvalidResponse(format!(
            "unexpected request line: {request_line}"
        ))),
    }
}

/// Interprets a redirect request target.
///
/// Returns `Ok(None)` when the request is not an authorization response.
fn parse_redirect(target: &str, expected_state: &str) -> Result<Option<String>> {
    let url = Url::parse("http://127.0.0.1")?.join(target)?;

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(if error == "access_denied" {
            Error::AccessDenied
        } else {
            Error::oauth_error(error, "authorization endpoint returned an error")
        });
    }

    let Some(code) = code else {
        return Ok(None);
    };

    if state.as_deref() != Some(expected_state) {
        return Err(Error::StateMismatch);
    }

    Ok(Some(code))
}

async fn respond(stream: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        debug!("Failed to answer loopback redirect: {e}");
    }
    let _ = stream.shutdown().await;
}
