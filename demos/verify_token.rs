//! Verifies an ID token from the command line.
//!
//! ```text
//! FIREBASE_PROJECT_ID=my-project cargo run --example verify_token -- <token>
//! echo "$TOKEN" | FIREBASE_PROJECT_ID=my-project cargo run --example verify_token
//! ```
//!
//! Set `RUST_LOG=securetoken_verifier=debug` to see the fetch and cache activity.

use securetoken_verifier::prelude::*;
use std::error::Error;
use std::process::ExitCode;
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let token = match std::env::args().nth(1) {
        Some(token) => token,
        None => {
            let mut input = String::new();
            tokio::io::stdin().read_to_string(&mut input).await?;
            input
        }
    };
    // Accept a raw token or a full `Bearer <token>` header value.
    let token = bearer_token(&token).unwrap_or(token.trim()).to_string();

    let config = ConfigBuilder::from_env()?.build()?;
    let service = TokenVerificationService::new(config)?;

    match service.verify(&token).await {
        Ok(verified) => {
            println!("{}", serde_json::to_string_pretty(&verified)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            for reason in failure.reasons() {
                eprintln!("rejected: {}", reason);
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
