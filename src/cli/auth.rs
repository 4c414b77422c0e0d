use super::ui;
use crate::core::auth::{IdentityProvider, Session};
use crate::core::store::SessionStore;
use anyhow::{Context, Result, bail};
use console::Term;
use tracing::debug;

fn prompt_credentials() -> Result<(String, String)> {
    let term = Term::stdout();
    term.write_str("Email: ")?;
    let email = term.read_line()?.trim().to_string();
    term.write_str("Password: ")?;
    let password = term.read_secure_line()?;
    if email.is_empty() || password.is_empty() {
        bail!("Email and password must not be empty");
    }
    Ok((email, password))
}

pub async fn register(identity: &dyn IdentityProvider) -> Result<()> {
    let (email, password) = prompt_credentials()?;
    identity
        .sign_up(&email, &password)
        .await
        .context("Could not create account")?;
    println!(
        "{}",
        ui::style_text("Account created. Run `finboard login` to sign in.", ui::StyleType::TotalValue)
    );
    Ok(())
}

pub async fn login(identity: &dyn IdentityProvider, sessions: &SessionStore) -> Result<()> {
    let (email, password) = prompt_credentials()?;
    let session = match identity.sign_in(&email, &password).await {
        Ok(session) => session,
        Err(e) => {
            debug!("Sign-in failed: {e}");
            bail!("Incorrect email or password");
        }
    };
    sessions.save(&session).await?;
    println!(
        "{}",
        ui::style_text(&format!("Signed in as {}", session.email), ui::StyleType::TotalValue)
    );
    Ok(())
}

pub async fn logout(sessions: &SessionStore) -> Result<()> {
    sessions.clear().await?;
    println!("{}", ui::style_text("Signed out.", ui::StyleType::Subtle));
    Ok(())
}

/// Resolves the locally persisted session and revalidates its token with the
/// identity provider. A missing or stale session is a user-facing message,
/// not a crash.
pub async fn require_session(
    identity: &dyn IdentityProvider,
    sessions: &SessionStore,
) -> Result<Session> {
    let Some(session) = sessions.load().await? else {
        bail!("Not signed in. Run `finboard login` first.");
    };

    match identity.lookup(&session.token).await {
        Ok(account) => Ok(Session {
            token: session.token,
            uid: account.uid,
            email: account.email,
        }),
        Err(e) => {
            debug!("Session token rejected: {e}");
            sessions.clear().await?;
            bail!("Session expired. Run `finboard login` to sign in again.");
        }
    }
}
