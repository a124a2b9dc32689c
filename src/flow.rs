/// Linear authorization-flow sequencing with guarded transitions
use crate::error::{PkceError, Result};
use crate::pkce::{self, PkceMaterial};
use crate::redirect::RedirectParams;
use crate::session::{FlowRecord, FlowStore};
use tracing::{debug, info};
use url::Url;

/// Steps of one authorization attempt, in order.
///
/// The progression is strictly linear; every transition checks the current
/// step and rejects anything skipped or repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FlowStep {
    /// Nothing generated yet
    Start,
    /// Verifier generated, challenge not yet derived
    VerifierReady,
    /// Challenge derived from the verifier
    ChallengeReady,
    /// Verifier stored for the redirect handoff; URL can be built
    VerifierStored,
    /// Authorization code received, stored verifier retrieved
    CodeReceived,
    /// Exchange request produced; the verifier has left the flow
    Complete,
}

impl FlowStep {
    /// Step name for error messages and logs
    pub fn name(self) -> &'static str {
        match self {
            FlowStep::Start => "start",
            FlowStep::VerifierReady => "verifier_ready",
            FlowStep::ChallengeReady => "challenge_ready",
            FlowStep::VerifierStored => "verifier_stored",
            FlowStep::CodeReceived => "code_received",
            FlowStep::Complete => "complete",
        }
    }
}

/// Client-side configuration for building the authorization URL
#[derive(Debug, Clone)]
pub struct FlowConfig {
    pub client_id: String,
    pub authorization_endpoint: String,
    pub redirect_uri: String,
    pub scope: Option<String>,
}

/// What the token-exchange caller needs: the authorization code and the
/// verifier that proves this client started the flow.
///
/// Producing this consumes the flow's copy of the verifier; the exchange
/// itself (token endpoint POST) is the caller's concern.
#[derive(Debug, Clone)]
pub struct ExchangeRequest {
    pub code: String,
    pub code_verifier: String,
}

/// Drives one authorization attempt through its steps.
///
/// # Examples
///
/// ```
/// use proofkey::flow::{AuthorizationFlow, FlowConfig};
/// use proofkey::session::MemoryFlowStore;
///
/// let store = MemoryFlowStore::new();
/// let mut flow = AuthorizationFlow::new(FlowConfig {
///     client_id: "demo-client".to_string(),
///     authorization_endpoint: "https://auth.example.com/authorize".to_string(),
///     redirect_uri: "http://127.0.0.1:8080/callback".to_string(),
///     scope: Some("openid email profile".to_string()),
/// });
///
/// flow.generate_verifier().unwrap();
/// flow.derive_challenge().unwrap();
/// flow.store_verifier(&store).unwrap();
/// let url = flow.authorization_url().unwrap();
/// assert!(url.contains("code_challenge_method=S256"));
/// ```
pub struct AuthorizationFlow {
    config: FlowConfig,
    step: FlowStep,
    verifier: Option<String>,
    challenge: Option<String>,
    state: Option<String>,
    code: Option<String>,
}

impl AuthorizationFlow {
    /// Create a flow at the start step
    pub fn new(config: FlowConfig) -> Self {
        Self {
            config,
            step: FlowStep::Start,
            verifier: None,
            challenge: None,
            state: None,
            code: None,
        }
    }

    /// Current step
    pub fn step(&self) -> FlowStep {
        self.step
    }

    /// The generated verifier, once step 1 has run
    pub fn code_verifier(&self) -> Option<&str> {
        self.verifier.as_deref()
    }

    /// The derived challenge, once step 2 has run
    pub fn code_challenge(&self) -> Option<&str> {
        self.challenge.as_deref()
    }

    /// The state parameter, once the verifier is stored
    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    fn require(&self, expected: FlowStep) -> Result<()> {
        if self.step != expected {
            return Err(PkceError::StepOutOfOrder {
                expected: expected.name(),
                found: self.step.name(),
            });
        }
        Ok(())
    }

    /// Step 1: generate the code verifier (default length)
    pub fn generate_verifier(&mut self) -> Result<&str> {
        self.generate_verifier_of(pkce::DEFAULT_VERIFIER_LEN)
    }

    /// Step 1: generate the code verifier with a specific length
    pub fn generate_verifier_of(&mut self, length: usize) -> Result<&str> {
        self.require(FlowStep::Start)?;
        let verifier = pkce::generate_verifier(length)?;
        debug!(length, "generated code_verifier");
        self.step = FlowStep::VerifierReady;
        Ok(self.verifier.insert(verifier).as_str())
    }

    /// Step 2: derive the code challenge from the verifier
    pub fn derive_challenge(&mut self) -> Result<&str> {
        self.require(FlowStep::VerifierReady)?;
        let verifier = self
            .verifier
            .as_deref()
            .ok_or(PkceError::StepOutOfOrder {
                expected: FlowStep::VerifierReady.name(),
                found: FlowStep::Start.name(),
            })?;
        let challenge = pkce::derive_challenge(verifier)?;
        debug!(challenge = %challenge, "derived code_challenge");
        self.step = FlowStep::ChallengeReady;
        Ok(self.challenge.insert(challenge).as_str())
    }

    /// Step 3: store the verifier for the redirect handoff.
    ///
    /// Generates the `state` parameter and saves a [`FlowRecord`] under it.
    /// Returns the state.
    pub fn store_verifier(&mut self, store: &dyn FlowStore) -> Result<&str> {
        self.require(FlowStep::ChallengeReady)?;
        let verifier = self
            .verifier
            .clone()
            .ok_or(PkceError::StepOutOfOrder {
                expected: FlowStep::ChallengeReady.name(),
                found: FlowStep::Start.name(),
            })?;
        let state = pkce::generate_state()?;
        store.save(FlowRecord::new(state.clone(), verifier))?;
        info!(state = %state, "stored code_verifier for redirect handoff");
        self.step = FlowStep::VerifierStored;
        Ok(self.state.insert(state).as_str())
    }

    /// Step 4: build the authorization URL.
    ///
    /// Carries the challenge, never the verifier. Available from the
    /// moment the verifier is stored until the flow completes.
    pub fn authorization_url(&self) -> Result<String> {
        if self.step < FlowStep::VerifierStored || self.step == FlowStep::Complete {
            return Err(PkceError::StepOutOfOrder {
                expected: FlowStep::VerifierStored.name(),
                found: self.step.name(),
            });
        }
        let state = self.state.as_deref().unwrap_or_default();
        let challenge = self.challenge.as_deref().unwrap_or_default();

        let mut url = Url::parse(&self.config.authorization_endpoint)?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("state", state)
            .append_pair("code_challenge", challenge)
            .append_pair("code_challenge_method", PkceMaterial::code_challenge_method());
        if let Some(scope) = &self.config.scope {
            url.query_pairs_mut().append_pair("scope", scope);
        }
        Ok(url.into())
    }

    /// Step 4, interactive variant: open the authorization URL in the
    /// default browser.
    pub fn open_authorization_url(&self) -> Result<()> {
        let url = self.authorization_url()?;
        webbrowser::open(&url)?;
        Ok(())
    }

    /// Step 5a: accept the redirect back from the authorization server.
    ///
    /// Verifies the returned `state` against this flow, then retrieves the
    /// stored verifier from `store` (consuming the record).
    pub fn handle_redirect(&mut self, redirect_url: &str, store: &dyn FlowStore) -> Result<()> {
        self.require(FlowStep::VerifierStored)?;
        let params = RedirectParams::from_url(redirect_url)?;

        let expected = self.state.as_deref().unwrap_or_default();
        if params.state != expected {
            return Err(PkceError::StateMismatch);
        }

        let record = store
            .take(&params.state)?
            .ok_or_else(|| PkceError::UnknownFlow(params.state.clone()))?;

        info!(state = %params.state, "authorization code received");
        self.verifier = Some(record.code_verifier);
        self.code = Some(params.code);
        self.step = FlowStep::CodeReceived;
        Ok(())
    }

    /// Step 5b: produce the exchange request, consuming the verifier.
    ///
    /// After this the flow is complete; the verifier cannot be read out a
    /// second time.
    pub fn exchange_request(&mut self) -> Result<ExchangeRequest> {
        self.require(FlowStep::CodeReceived)?;
        let code = self
            .code
            .take()
            .ok_or_else(|| PkceError::MissingField("code".into()))?;
        let code_verifier = self
            .verifier
            .take()
            .ok_or_else(|| PkceError::MissingField("code_verifier".into()))?;
        self.challenge = None;
        self.state = None;
        self.step = FlowStep::Complete;
        info!("flow complete; code_verifier consumed");
        Ok(ExchangeRequest {
            code,
            code_verifier,
        })
    }

    /// Reset to the start step, discarding all artifacts
    pub fn reset(&mut self) {
        self.verifier = None;
        self.challenge = None;
        self.state = None;
        self.code = None;
        self.step = FlowStep::Start;
    }
}
