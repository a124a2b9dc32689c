//! Proofkey - PKCE (RFC 7636) artifact derivation and flow sequencing
//!
//! This library derives the `code_verifier` / `code_challenge` pair for
//! the OAuth 2.0 authorization code flow with PKCE, hands the verifier
//! across the redirect boundary through a pluggable flow store, and walks
//! one authorization attempt through a strictly ordered set of steps.
//! A small dashboard client for backend-for-frontend deployments is
//! included; the token exchange itself and JWT handling stay with the
//! backend.
//!
//! # Features
//!
//! - Verifier generation and S256 challenge derivation (RFC 7636)
//! - Injected crypto capabilities, testable without the OS RNG
//! - Single-consumption verifier handoff (memory or file backed)
//! - Guarded linear flow sequencing with authorization-URL construction
//! - BFF dashboard client: session status and proxied resource fetch
//!
//! # Example
//!
//! ```
//! use proofkey::prelude::*;
//!
//! let store = MemoryFlowStore::new();
//! let mut flow = AuthorizationFlow::new(FlowConfig {
//!     client_id: "your-client-id".to_string(),
//!     authorization_endpoint: "https://auth.example.com/authorize".to_string(),
//!     redirect_uri: "http://127.0.0.1:8080/callback".to_string(),
//!     scope: Some("openid email profile".to_string()),
//! });
//!
//! flow.generate_verifier().unwrap();
//! flow.derive_challenge().unwrap();
//! flow.store_verifier(&store).unwrap();
//! println!("Authorization URL: {}", flow.authorization_url().unwrap());
//! ```

pub mod bff;
pub mod error;
pub mod flow;
pub mod lock;
pub mod pkce;
pub mod redirect;
pub mod session;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::bff::{DashboardClient, DashboardConfig, UserStatus};
    pub use crate::error::{PkceError, Result};
    pub use crate::flow::{AuthorizationFlow, ExchangeRequest, FlowConfig, FlowStep};
    pub use crate::pkce::{derive_challenge, generate_verifier, PkceMaterial};
    pub use crate::redirect::RedirectParams;
    pub use crate::session::{FileFlowStore, FlowRecord, FlowStore, MemoryFlowStore};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_full_authorization_walkthrough() {
        let store = MemoryFlowStore::new();
        let mut flow = AuthorizationFlow::new(FlowConfig {
            client_id: "test-client".to_string(),
            authorization_endpoint: "https://auth.example.com/authorize".to_string(),
            redirect_uri: "http://127.0.0.1:8080/callback".to_string(),
            scope: Some("openid email profile".to_string()),
        });

        let verifier = flow.generate_verifier().unwrap().to_string();
        let challenge = flow.derive_challenge().unwrap().to_string();
        assert_eq!(derive_challenge(&verifier).unwrap(), challenge);

        let state = flow.store_verifier(&store).unwrap().to_string();

        let url = flow.authorization_url().unwrap();
        assert!(url.contains("response_type=code"));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains(&format!("state={}", state)));

        // Authorization server redirects back with a code
        let redirect = format!(
            "http://127.0.0.1:8080/callback?code=test-auth-code&state={}",
            state
        );
        flow.handle_redirect(&redirect, &store).unwrap();

        let request = flow.exchange_request().unwrap();
        assert_eq!(request.code, "test-auth-code");
        assert_eq!(request.code_verifier, verifier);

        // The stored record is gone: the verifier was consumed exactly once
        assert!(store.take(&state).unwrap().is_none());
    }
}
