//! Account commands: signup, verify-otp, resend-otp, signin, signout, whoami.

use anyhow::{Context as _, Result};
use chrono::Utc;
use colored::Colorize;
use sigcheck_core::{AuthService, SigcheckError, SignUpForm};
use tracing::info;

use crate::utils::{clear_session, format_timestamp, save_session, Context};

fn service(ctx: &Context) -> AuthService {
    AuthService::new(ctx.auth.clone(), ctx.state.clone())
}

pub async fn signup(
    ctx: &Context,
    name: String,
    email: String,
    password: String,
    confirm_password: String,
    accepted_terms: bool,
) -> Result<()> {
    let form = SignUpForm {
        name,
        email,
        password,
        confirm_password,
        accepted_terms,
    };
    service(ctx).sign_up(&form).await.context("Sign-up failed")?;

    println!();
    println!("{}", "Account created.".green().bold());
    println!(
        "   {} {}",
        "Next:".dimmed(),
        format!("sigcheck verify-otp --email {} --code <CODE>", form.email.trim())
    );

    if let Some(backend) = &ctx.mock_backend {
        if let Some(code) = backend.pending_otp(form.email.trim()) {
            println!("   {} {}", "Verification code (mock):".dimmed(), code.yellow());
        }
    }
    Ok(())
}

pub async fn verify_otp(ctx: &Context, email: &str, code: &str) -> Result<()> {
    service(ctx)
        .verify_otp(email, code)
        .await
        .context("Verification failed")?;
    println!("{}", "Email confirmed. You can now sign in.".green());
    Ok(())
}

pub async fn resend_otp(ctx: &Context, email: &str) -> Result<()> {
    service(ctx)
        .resend_otp(email)
        .await
        .context("Could not resend code")?;
    println!("{}", "A new code has been sent.".green());

    if let Some(backend) = &ctx.mock_backend {
        if let Some(code) = backend.pending_otp(email.trim()) {
            println!("   {} {}", "Verification code (mock):".dimmed(), code.yellow());
        }
    }
    Ok(())
}

pub async fn signin(ctx: &Context, email: &str, password: &str) -> Result<()> {
    let session = service(ctx)
        .sign_in(email, password)
        .await
        .context("Sign-in failed")?;
    save_session(&ctx.session_file, &session)?;
    info!(path = %ctx.session_file.display(), "Session saved");

    println!("{} {}", "Welcome,".green(), session.name.green().bold());
    Ok(())
}

pub async fn signout(ctx: &Context) -> Result<()> {
    service(ctx).sign_out().await.context("Sign-out failed")?;
    clear_session(&ctx.session_file)?;
    println!("{}", "Signed out.".green());
    Ok(())
}

pub async fn whoami(ctx: &Context) -> Result<()> {
    let session = ctx.state.session().await.ok_or(SigcheckError::NotSignedIn)?;
    println!("   {} {}", "Name:".dimmed(), session.name);
    println!("   {} {}", "Email:".dimmed(), session.email);
    println!("   {} {}", "Role:".dimmed(), session.role);
    let expires = format_timestamp(&session.expires_at);
    if session.is_expired(Utc::now()) {
        return Err(SigcheckError::NotSignedIn).context(format!("Session expired at {expires}"));
    }
    println!("   {} {}", "Expires:".dimmed(), expires);
    Ok(())
}
