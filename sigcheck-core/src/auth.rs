//! Account flows: sign-up, OTP confirmation, sign-in, sign-out.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, instrument, warn};

use crate::backend::{AuthProvider, SignUpRequest};
use crate::error::{Result, SigcheckError};
use crate::model::Session;
use crate::state::AppState;
use crate::validation::{normalize_otp, validate_email, validate_sign_in, validate_sign_up, SignUpForm};

/// Minimum spacing between one-time code emails.
pub const OTP_RESEND_COOLDOWN: Duration = Duration::from_secs(60);

/// Tracks when the last one-time code was sent.
#[derive(Debug, Clone)]
pub struct ResendCooldown {
    period: Duration,
    last_sent: Option<Instant>,
}

impl ResendCooldown {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_sent: None,
        }
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.last_sent
            .map(|sent| self.period.saturating_sub(now.saturating_duration_since(sent)))
            .unwrap_or(Duration::ZERO)
    }

    pub fn can_resend(&self, now: Instant) -> bool {
        self.remaining(now).is_zero()
    }

    pub fn mark_sent(&mut self, now: Instant) {
        self.last_sent = Some(now);
    }
}

impl Default for ResendCooldown {
    fn default() -> Self {
        Self::new(OTP_RESEND_COOLDOWN)
    }
}

pub struct AuthService {
    provider: Arc<dyn AuthProvider>,
    state: Arc<AppState>,
    cooldown: Mutex<ResendCooldown>,
}

impl AuthService {
    pub fn new(provider: Arc<dyn AuthProvider>, state: Arc<AppState>) -> Self {
        Self {
            provider,
            state,
            cooldown: Mutex::new(ResendCooldown::default()),
        }
    }

    /// Validate the form locally, then register. Starts the resend cooldown.
    #[instrument(level = "info", skip_all)]
    pub async fn sign_up(&self, form: &SignUpForm) -> Result<()> {
        validate_sign_up(form)?;
        self.provider
            .sign_up(SignUpRequest {
                name: form.name.trim(),
                email: form.email.trim(),
                password: &form.password,
            })
            .await?;
        self.mark_code_sent();
        info!("Sign-up accepted, verification code sent");
        Ok(())
    }

    #[instrument(level = "info", skip_all)]
    pub async fn verify_otp(&self, email: &str, code: &str) -> Result<()> {
        validate_email(email)?;
        let code = normalize_otp(code)?;
        self.provider.verify_otp(email.trim(), &code).await
    }

    /// Send a new code unless the previous one went out less than a minute ago.
    #[instrument(level = "info", skip_all)]
    pub async fn resend_otp(&self, email: &str) -> Result<()> {
        validate_email(email)?;
        let remaining = self.cooldown_remaining();
        if !remaining.is_zero() {
            return Err(SigcheckError::validation(format!(
                "Please wait {}s before requesting a new code",
                remaining.as_secs().max(1)
            )));
        }
        self.provider.resend_otp(email.trim()).await?;
        self.mark_code_sent();
        Ok(())
    }

    /// Sign in and store the session in the shared state.
    #[instrument(level = "info", skip_all)]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        validate_sign_in(email, password)?;
        let session = self
            .provider
            .sign_in_with_password(email.trim(), password)
            .await?;
        info!(user_id = %session.user_id, "Signed in");
        self.state.set_session(session.clone()).await;
        Ok(session)
    }

    /// Sign out. State is only cleared once the provider confirms.
    #[instrument(level = "info", skip_all)]
    pub async fn sign_out(&self) -> Result<()> {
        let session = self
            .state
            .session()
            .await
            .ok_or(SigcheckError::NotSignedIn)?;
        if let Err(e) = self.provider.sign_out(&session.access_token).await {
            warn!(error = %e, "Sign-out rejected");
            return Err(e);
        }
        self.state.clear().await;
        info!("Signed out");
        Ok(())
    }

    pub fn cooldown_remaining(&self) -> Duration {
        self.cooldown
            .lock()
            .map(|c| c.remaining(Instant::now()))
            .unwrap_or(Duration::ZERO)
    }

    fn mark_code_sent(&self) {
        if let Ok(mut cooldown) = self.cooldown.lock() {
            cooldown.mark_sent(Instant::now());
        }
    }
}
