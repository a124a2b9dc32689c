/// Example: dashboard client against a BFF backend
///
/// The backend owns the OAuth exchange and the tokens; this side holds
/// only a session cookie. Checks the session status, then either fetches
/// the proxied protected resource or prints the login URL.
///
/// Setup:
/// 1. Start a backend exposing /api/user-status and /api/photos
///    (default origin: http://localhost:8080)
/// 2. Optionally: export BACKEND_URL="http://localhost:8080"
///
/// Run:
/// cargo run --example dashboard
use proofkey::prelude::*;
use std::env;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "proofkey=debug".into()),
        )
        .init();

    let backend_url =
        env::var("BACKEND_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());

    println!("=== BFF Dashboard ===\n");
    println!("Backend: {}\n", backend_url);

    let client = DashboardClient::new(DashboardConfig {
        backend_url,
        provider: "google".to_string(),
    })?;

    let status = client.user_status()?;
    if !status.authenticated {
        println!("Not logged in.");
        println!("Login via: {}", client.login_url()?);
        println!("(the backend handles the whole OAuth redirect dance)");
        return Ok(());
    }

    println!("Logged in as: {}", status.name.as_deref().unwrap_or("<unknown>"));
    if let Some(email) = &status.email {
        println!("Email:        {}", email);
    }

    println!("\nFetching protected photos through the backend proxy...");
    match client.photos() {
        Ok(body) => {
            println!("Resource server response:\n{}", body);
        }
        Err(e) => {
            println!("Photos fetch failed: {}", e);
            println!("Hint: is the resource server behind the backend running?");
        }
    }

    println!("\nLogout via: {}", client.logout_url()?);
    Ok(())
}
