/// Example: step-by-step PKCE walkthrough with a simulated redirect
///
/// Walks one authorization attempt through all of its steps, printing each
/// artifact as it appears. No authorization server is contacted; the
/// redirect is simulated with a fabricated code, which is enough to show
/// the verifier handoff and single consumption.
///
/// Run:
/// cargo run --example walkthrough
use proofkey::prelude::*;

fn preview(s: &str) -> &str {
    &s[..s.len().min(30)]
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "proofkey=debug".into()),
        )
        .init();

    println!("=== PKCE Walkthrough ===\n");

    let store = MemoryFlowStore::new();
    let mut flow = AuthorizationFlow::new(FlowConfig {
        client_id: "YOUR_CLIENT_ID".to_string(),
        authorization_endpoint: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
        redirect_uri: "http://127.0.0.1:5173/".to_string(),
        scope: Some("openid email profile".to_string()),
    });

    // Step 1: generate code_verifier
    let verifier = flow.generate_verifier()?.to_string();
    println!("Step 1: generated code_verifier (random {} chars)", verifier.len());
    println!("        verifier: {}... (stays hidden)", preview(&verifier));

    // Step 2: derive code_challenge = base64url(SHA-256(verifier))
    let challenge = flow.derive_challenge()?.to_string();
    println!("Step 2: derived code_challenge = SHA256(code_verifier)");
    println!("        challenge: {} (one-way, safe to expose)", challenge);

    // Step 3: store verifier for the redirect handoff
    let state = flow.store_verifier(&store)?.to_string();
    println!("Step 3: stored code_verifier under state {}", state);

    // Step 4: the URL the browser would be sent to
    let url = flow.authorization_url()?;
    println!("Step 4: authorization URL (challenge in URL, verifier not):");
    println!("        {}", url);

    // Simulated: the authorization server redirects back with a code
    let fake_code = format!("4/0AY0e-{}", generate_verifier(43)?);
    let redirect = format!(
        "http://127.0.0.1:5173/?code={}&state={}",
        fake_code, state
    );
    flow.handle_redirect(&redirect, &store)?;
    println!("Step 5: received authorization code {}...", preview(&fake_code));

    // The exchange request carries code + verifier; the token POST itself
    // belongs to the backend
    let request = flow.exchange_request()?;
    println!("\nToken exchange request (conceptual):");
    println!("  code:          {}...", preview(&request.code));
    println!("  code_verifier: {}... (from the store)", preview(&request.code_verifier));
    println!("\nServer check: SHA256(code_verifier) == stored code_challenge");
    println!(
        "Locally:      {}",
        if derive_challenge(&request.code_verifier)? == challenge {
            "match, tokens would be issued"
        } else {
            "mismatch, exchange would be rejected"
        }
    );

    Ok(())
}
