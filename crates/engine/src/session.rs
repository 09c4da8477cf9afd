//! Session lifecycle: login, liveness probing, re-authentication.

use std::sync::Arc;
use std::time::Duration;

use slotwatch_browser::{Bridge, Locator, PageAction};
use slotwatch_core::{Config, Error, Result};
use tracing::{debug, info, warn};

/// Name of the portal's session cookie.
pub const SESSION_COOKIE: &str = "_yatri_session";

/// Bounded wait for sign-in page elements and the post-login landmark.
const LANDMARK_TIMEOUT: Duration = Duration::from_secs(60);

/// Owns the login state. At most one session is active at a time; the
/// fetcher and transactor only read the session cookie through the bridge.
pub struct SessionManager {
    bridge: Arc<dyn Bridge>,
    config: Arc<Config>,
    logged_in: bool,
}

impl SessionManager {
    pub fn new(bridge: Arc<dyn Bridge>, config: Arc<Config>) -> Self {
        Self {
            bridge,
            config,
            logged_in: false,
        }
    }

    /// The post-login continue link. Its presence is the liveness signal.
    fn landmark(&self) -> Locator {
        Locator::link_with_text(&self.config.portal.landmark_text)
    }

    /// Drive the sign-in form and wait for the post-login landmark.
    /// Re-entrant: calling while already signed in just signs in again.
    pub async fn login(&mut self) -> Result<()> {
        self.logged_in = false;
        info!("Signing in");

        self.bridge.navigate(&self.config.sign_in_url()).await?;
        self.step_pause().await;
        self.bridge
            .wait_for(&Locator::name("commit"), LANDMARK_TIMEOUT)
            .await
            .map_err(|e| Error::AuthTimeout(e.to_string()))?;

        let steps = [
            (
                "bounce",
                Locator::xpath("//a[@class='down-arrow bounce']"),
                PageAction::Click,
            ),
            (
                "email",
                Locator::id("user_email"),
                PageAction::SendText(self.config.account.email.clone()),
            ),
            (
                "password",
                Locator::id("user_password"),
                PageAction::SendText(self.config.account.password.clone()),
            ),
            ("privacy", Locator::class("icheckbox"), PageAction::Click),
            ("submit", Locator::name("commit"), PageAction::Click),
        ];
        for (label, locator, action) in steps {
            debug!(step = label, "Login step");
            self.bridge.apply(&locator, &action).await?;
            self.step_pause().await;
        }

        self.bridge
            .wait_for(&self.landmark(), LANDMARK_TIMEOUT)
            .await
            .map_err(|e| Error::AuthTimeout(e.to_string()))?;

        self.logged_in = true;
        info!("Login successful");
        Ok(())
    }

    /// Probe for the landmark. Any probe error reads as "not logged in";
    /// the probe itself never fails the run.
    pub async fn is_logged_in(&self) -> bool {
        self.bridge.exists(&self.landmark()).await
    }

    /// Liveness as of the last login/probe/sign-out, without touching the
    /// page.
    pub fn last_known_logged_in(&self) -> bool {
        self.logged_in
    }

    /// Probe, then log in only if the probe failed. Safe to call before
    /// every poll cycle.
    pub async fn ensure_logged_in(&mut self) -> Result<()> {
        if self.is_logged_in().await {
            debug!("Already logged in");
            self.logged_in = true;
            return Ok(());
        }
        info!("Session expired, logging in again");
        self.login().await
    }

    /// Current session cookie value. The portal rejects requests without it.
    pub async fn session_cookie(&self) -> Result<String> {
        self.bridge
            .get_cookie(SESSION_COOKIE)
            .await?
            .ok_or_else(|| Error::Browser("session cookie missing".into()))
    }

    /// Best-effort sign-out, used on cooldowns and every terminal path.
    pub async fn sign_out(&mut self) {
        if let Err(e) = self.bridge.navigate(&self.config.sign_out_url()).await {
            warn!(error = %e, "Sign-out navigation failed");
        }
        self.logged_in = false;
    }

    async fn step_pause(&self) {
        tokio::time::sleep(Duration::from_millis(self.config.timing.step_delay_ms)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{test_config, MockBridge};

    #[tokio::test(start_paused = true)]
    async fn ensure_logged_in_skips_login_when_landmark_present() {
        let bridge = Arc::new(MockBridge::new());
        let mut session = SessionManager::new(bridge.clone(), Arc::new(test_config()));

        session.ensure_logged_in().await.unwrap();

        // No navigation means login() never ran.
        assert!(bridge.navigations.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn ensure_logged_in_logs_in_when_probe_fails() {
        let bridge = Arc::new(MockBridge::new());
        bridge.push_exists(false); // the liveness probe
        let config = Arc::new(test_config());
        let mut session = SessionManager::new(bridge.clone(), config.clone());

        session.ensure_logged_in().await.unwrap();

        let navigations = bridge.navigations.lock().unwrap().clone();
        assert_eq!(navigations, vec![config.sign_in_url()]);
        // All five form steps ran.
        assert_eq!(bridge.applied.lock().unwrap().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn login_times_out_as_auth_error() {
        let bridge = Arc::new(MockBridge::new());
        bridge.push_exists(false); // sign-in form never appears
        let mut session = SessionManager::new(bridge.clone(), Arc::new(test_config()));

        let err = session.login().await.unwrap_err();
        assert!(matches!(err, Error::AuthTimeout(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn session_cookie_missing_is_an_error() {
        let bridge = Arc::new(MockBridge::new());
        *bridge.cookie.lock().unwrap() = None;
        let session = SessionManager::new(bridge, Arc::new(test_config()));
        assert!(session.session_cookie().await.is_err());
    }
}
