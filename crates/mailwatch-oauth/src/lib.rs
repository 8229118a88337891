//! # mailwatch-oauth
//!
//! `OAuth2` authorization for desktop applications that read mail through a
//! provider's HTTP API.
//!
//! ## Features
//!
//! - **Installed-app flow**: Authorization Code Flow with PKCE and a loopback
//!   redirect listener on `127.0.0.1`
//! - **Token management**: refresh, expiration checking
//! - **Client secrets**: parses the `credentials.json` file issued by Google's
//!   developer console
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::time::Duration;
//! use mailwatch_oauth::{AuthorizationCodeFlow, ClientSecrets, LoopbackRedirect, Provider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let secrets = ClientSecrets::from_file("credentials.json")?;
//!     let listener = LoopbackRedirect::bind().await?;
//!     let client = secrets.into_client(Provider::gmail_readonly()?)?;
//!
//!     let flow = AuthorizationCodeFlow::new(client).with_pkce();
//!     let token = flow
//!         .authorize_with(listener, Duration::from_secs(300), |url| println!("Visit: {url}"))
//!         .await?;
//!
//!     println!("Access token: {}", token.access_token);
//!     Ok(())
//! }
//! ```
//!
//! ### Token Refresh
//!
//! ```ignore
//! if token.is_expired() && token.can_refresh() {
//!     let new_token = client.refresh_token(&token).await?;
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
pub mod flow;
pub mod provider;
pub mod secrets;
pub mod token;

pub use error::{Error, Result};
pub use flow::{AuthorizationCodeFlow, LoopbackRedirect, OAuthClient, PkceChallenge};
pub use provider::Provider;
pub use secrets::ClientSecrets;
pub use token::Token;
