//! crates/trip_journal_core/src/guard.rs
//!
//! The access guard for protected views.
//!
//! `assess` is a pure function of a session snapshot and a configuration.
//! `AuthGuard` wraps it with the one piece of memory the guard needs: the last
//! failure condition it already acted on. Re-evaluating the same condition
//! yields the same intercept UI but no new redirect or callback. The memory is
//! cleared as soon as every check passes, so a later failure fires again.
//!
//! The guard never navigates or starts timers itself. It returns commands in
//! a `GuardDecision` and the host carries them out.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::auth::AuthError;
use crate::domain::{AuthUser, Role, SessionSnapshot};

pub const DEFAULT_LOGIN_PATH: &str = "/auth/login";
pub const DEFAULT_UNAUTHORIZED_PATH: &str = "/unauthorized";
pub const DEFAULT_VERIFY_EMAIL_PATH: &str = "/auth/verify-email";
pub const DEFAULT_LOADING_MESSAGE: &str = "読み込み中...";
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

const REDIRECTING_TO_LOGIN_MESSAGE: &str = "ログイン画面に移動しています...";
const CHECKING_ROLE_MESSAGE: &str = "権限を確認しています...";
const REDIRECTING_TO_VERIFY_MESSAGE: &str = "メール認証画面に移動中...";

pub type AuthErrorHook = Arc<dyn Fn(&AuthError) + Send + Sync>;
pub type UnauthorizedHook = Arc<dyn Fn() + Send + Sync>;

//=========================================================================================
// Configuration
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadingSize {
    Sm,
    #[default]
    Md,
    Lg,
}

/// How a protected view wants to be guarded.
#[derive(Clone)]
pub struct GuardConfig {
    pub redirect_to: String,
    pub unauthorized_path: String,
    pub verify_email_path: String,
    /// Roles admitted by the view. Empty admits any authenticated user.
    pub required_roles: HashSet<Role>,
    pub require_email_verified: bool,
    pub enable_auto_refresh: bool,
    pub refresh_interval: Duration,
    pub loading_message: String,
    pub loading_size: LoadingSize,
    pub on_auth_error: Option<AuthErrorHook>,
    pub on_unauthorized: Option<UnauthorizedHook>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            redirect_to: DEFAULT_LOGIN_PATH.to_string(),
            unauthorized_path: DEFAULT_UNAUTHORIZED_PATH.to_string(),
            verify_email_path: DEFAULT_VERIFY_EMAIL_PATH.to_string(),
            required_roles: HashSet::new(),
            require_email_verified: false,
            enable_auto_refresh: true,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            loading_message: DEFAULT_LOADING_MESSAGE.to_string(),
            loading_size: LoadingSize::default(),
            on_auth_error: None,
            on_unauthorized: None,
        }
    }
}

impl GuardConfig {
    pub fn redirect_to(mut self, path: impl Into<String>) -> Self {
        self.redirect_to = path.into();
        self
    }

    pub fn require_role(self, role: Role) -> Self {
        self.require_any_role([role])
    }

    pub fn require_any_role(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.required_roles.extend(roles);
        self
    }

    pub fn require_email_verified(mut self) -> Self {
        self.require_email_verified = true;
        self
    }

    pub fn auto_refresh(mut self, enabled: bool) -> Self {
        self.enable_auto_refresh = enabled;
        self
    }

    pub fn refresh_every(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn loading_message(mut self, message: impl Into<String>) -> Self {
        self.loading_message = message.into();
        self
    }

    pub fn on_auth_error(mut self, hook: impl Fn(&AuthError) + Send + Sync + 'static) -> Self {
        self.on_auth_error = Some(Arc::new(hook));
        self
    }

    pub fn on_unauthorized(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_unauthorized = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for GuardConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardConfig")
            .field("redirect_to", &self.redirect_to)
            .field("unauthorized_path", &self.unauthorized_path)
            .field("verify_email_path", &self.verify_email_path)
            .field("required_roles", &self.required_roles)
            .field("require_email_verified", &self.require_email_verified)
            .field("enable_auto_refresh", &self.enable_auto_refresh)
            .field("refresh_interval", &self.refresh_interval)
            .field("on_auth_error", &self.on_auth_error.is_some())
            .field("on_unauthorized", &self.on_unauthorized.is_some())
            .finish_non_exhaustive()
    }
}

//=========================================================================================
// Derived State
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardState {
    Loading,
    Unauthenticated,
    AuthenticatedNoRole,
    AuthenticatedUnverified,
    AuthenticatedOk,
}

/// The three independent checks behind an access decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AccessChecks {
    pub authenticated: bool,
    pub has_required_role: bool,
    pub is_email_verified: bool,
}

impl AccessChecks {
    pub fn check_access(&self) -> bool {
        self.authenticated && self.has_required_role && self.is_email_verified
    }
}

/// Identifies a failure condition for de-duplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConditionKey {
    unauthenticated: bool,
    checks: AccessChecks,
}

/// The renderable intercept shown in place of a protected view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuardUi {
    pub message: String,
    pub size: LoadingSize,
    pub full_screen: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectReason {
    Unauthenticated,
    MissingRole,
    EmailUnverified,
}

/// A navigation command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redirect {
    pub to: String,
    pub reason: RedirectReason,
}

/// A callback the host should see, delivered at most once per condition.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardNotice {
    Unauthorized,
    AuthError(AuthError),
}

/// Ask the host to keep the session fresh while the view is mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSchedule {
    pub every: Duration,
}

/// Side-effect free reading of a snapshot against a configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub state: GuardState,
    pub user: Option<AuthUser>,
    pub checks: AccessChecks,
    /// The failure the current state implies, if it is a policy failure.
    pub error: Option<AuthError>,
}

impl Assessment {
    pub fn check_access(&self) -> bool {
        self.checks.check_access()
    }

    fn condition_key(&self) -> ConditionKey {
        ConditionKey {
            unauthenticated: self.state == GuardState::Unauthenticated,
            checks: self.checks,
        }
    }
}

/// Derives the guard state without touching any memory or callback.
pub fn assess(snapshot: &SessionSnapshot, config: &GuardConfig) -> Assessment {
    let user = snapshot.auth_user();

    let has_required_role = match &user {
        Some(user) if !config.required_roles.is_empty() => {
            config.required_roles.contains(&user.role)
        }
        _ => true,
    };
    let is_email_verified = !config.require_email_verified
        || user.as_ref().is_some_and(|user| user.email_verified.is_some());

    let checks = AccessChecks {
        authenticated: user.is_some(),
        has_required_role,
        is_email_verified,
    };

    let (state, error) = match (snapshot, &user) {
        (SessionSnapshot::Loading, _) => (GuardState::Loading, None),
        (SessionSnapshot::Unauthenticated, _) | (_, None) => (GuardState::Unauthenticated, None),
        (SessionSnapshot::Authenticated(_), Some(user)) => {
            if !has_required_role {
                (
                    GuardState::AuthenticatedNoRole,
                    Some(AuthError::missing_role(&config.required_roles, user.role)),
                )
            } else if !is_email_verified {
                (
                    GuardState::AuthenticatedUnverified,
                    Some(AuthError::email_unverified()),
                )
            } else {
                (GuardState::AuthenticatedOk, None)
            }
        }
    };

    Assessment {
        state,
        user,
        checks,
        error,
    }
}

/// The intercept UI for a state; `None` only when access is granted.
pub fn guard_ui(state: GuardState, config: &GuardConfig) -> Option<GuardUi> {
    let message = match state {
        GuardState::Loading => config.loading_message.as_str(),
        GuardState::Unauthenticated => REDIRECTING_TO_LOGIN_MESSAGE,
        GuardState::AuthenticatedNoRole => CHECKING_ROLE_MESSAGE,
        GuardState::AuthenticatedUnverified => REDIRECTING_TO_VERIFY_MESSAGE,
        GuardState::AuthenticatedOk => return None,
    };
    Some(GuardUi {
        message: message.to_string(),
        size: config.loading_size,
        full_screen: true,
    })
}

//=========================================================================================
// Decision and Guard
//=========================================================================================

/// Everything a host needs after one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardDecision {
    pub assessment: Assessment,
    pub ui: Option<GuardUi>,
    /// Present only on the evaluation that first enters a failure condition.
    pub redirect: Option<Redirect>,
    /// Present only on the evaluation that first enters a failure condition.
    pub notice: Option<GuardNotice>,
    pub refresh: Option<RefreshSchedule>,
}

impl GuardDecision {
    pub fn state(&self) -> GuardState {
        self.assessment.state
    }

    pub fn check_access(&self) -> bool {
        self.assessment.check_access()
    }

    pub fn render_guard(&self) -> Option<&GuardUi> {
        self.ui.as_ref()
    }

    pub fn user(&self) -> Option<&AuthUser> {
        self.assessment.user.as_ref()
    }

    pub fn error(&self) -> Option<&AuthError> {
        self.assessment.error.as_ref()
    }
}

/// A guard instance bound to one protected view for its lifetime.
#[derive(Debug)]
pub struct AuthGuard {
    config: GuardConfig,
    last_handled: Option<ConditionKey>,
    last_assessment: Option<Assessment>,
}

impl AuthGuard {
    pub fn new(config: GuardConfig) -> Self {
        Self {
            config,
            last_handled: None,
            last_assessment: None,
        }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Swaps the configuration. The handled-condition memory is kept; the
    /// host is expected to restart any refresh task from the next decision.
    pub fn reconfigure(&mut self, config: GuardConfig) {
        self.config = config;
    }

    /// Evaluates a snapshot, firing callbacks and emitting a redirect only the
    /// first time a failure condition is seen.
    pub fn evaluate(&mut self, snapshot: &SessionSnapshot) -> GuardDecision {
        let assessment = assess(snapshot, &self.config);
        let key = assessment.condition_key();
        let ui = guard_ui(assessment.state, &self.config);
        let refresh = (self.config.enable_auto_refresh && assessment.checks.authenticated).then(
            || RefreshSchedule {
                every: self.config.refresh_interval,
            },
        );

        let mut redirect = None;
        let mut notice = None;

        if self.last_handled != Some(key) {
            match assessment.state {
                GuardState::Loading => {}
                GuardState::AuthenticatedOk => self.last_handled = None,
                GuardState::Unauthenticated => {
                    self.last_handled = Some(key);
                    info!(to = %self.config.redirect_to, "Session is unauthenticated, redirecting.");
                    if let Some(hook) = &self.config.on_unauthorized {
                        hook();
                    }
                    notice = Some(GuardNotice::Unauthorized);
                    redirect = Some(Redirect {
                        to: self.config.redirect_to.clone(),
                        reason: RedirectReason::Unauthenticated,
                    });
                }
                GuardState::AuthenticatedNoRole | GuardState::AuthenticatedUnverified => {
                    self.last_handled = Some(key);
                    let (to, reason) = if assessment.state == GuardState::AuthenticatedNoRole {
                        (&self.config.unauthorized_path, RedirectReason::MissingRole)
                    } else {
                        (&self.config.verify_email_path, RedirectReason::EmailUnverified)
                    };
                    info!(to = %to, ?reason, "Access denied, redirecting.");
                    if let Some(error) = &assessment.error {
                        if let Some(hook) = &self.config.on_auth_error {
                            hook(error);
                        }
                        notice = Some(GuardNotice::AuthError(error.clone()));
                    }
                    redirect = Some(Redirect {
                        to: to.clone(),
                        reason,
                    });
                }
            }
        }

        self.last_assessment = Some(assessment.clone());

        GuardDecision {
            assessment,
            ui,
            redirect,
            notice,
            refresh,
        }
    }

    /// Access decision for the most recent evaluation. `false` before the
    /// first evaluation.
    pub fn check_access(&self) -> bool {
        self.last_assessment
            .as_ref()
            .is_some_and(Assessment::check_access)
    }

    /// Intercept UI for the most recent evaluation. Before the first
    /// evaluation the guard shows its loading indicator.
    pub fn render_guard(&self) -> Option<GuardUi> {
        let state = self
            .last_assessment
            .as_ref()
            .map_or(GuardState::Loading, |assessment| assessment.state);
        guard_ui(state, &self.config)
    }

    /// Reports a failed session refresh. Access is not revoked; the error is
    /// delivered to the auth-error callback and returned to the caller.
    pub fn report_refresh_failure(&self, cause: &str) -> AuthError {
        warn!(%cause, "Session refresh failed.");
        let error = AuthError::session_refresh_failed(cause);
        if let Some(hook) = &self.config.on_auth_error {
            hook(&error);
        }
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthErrorKind;
    use crate::domain::SessionUser;
    use chrono::Utc;
    use rstest::rstest;

    fn signed_in(role: Option<Role>, verified: bool) -> SessionSnapshot {
        SessionSnapshot::Authenticated(SessionUser {
            id: "7".to_string(),
            name: None,
            email: Some("user@example.com".to_string()),
            image: None,
            role,
            email_verified: verified.then(Utc::now),
        })
    }

    #[rstest]
    #[case(SessionSnapshot::Loading, GuardConfig::default(), GuardState::Loading)]
    #[case(SessionSnapshot::Unauthenticated, GuardConfig::default(), GuardState::Unauthenticated)]
    #[case(
        signed_in(Some(Role::General), false),
        GuardConfig::default().require_role(Role::Admin),
        GuardState::AuthenticatedNoRole
    )]
    #[case(
        signed_in(None, false),
        GuardConfig::default().require_role(Role::General).require_email_verified(),
        GuardState::AuthenticatedUnverified
    )]
    #[case(
        signed_in(Some(Role::Admin), true),
        GuardConfig::default().require_any_role([Role::General, Role::Admin]).require_email_verified(),
        GuardState::AuthenticatedOk
    )]
    fn assess_derives_state(
        #[case] snapshot: SessionSnapshot,
        #[case] config: GuardConfig,
        #[case] expected: GuardState,
    ) {
        let assessment = assess(&snapshot, &config);
        assert_eq!(assessment.state, expected);
        assert_eq!(assessment.check_access(), expected == GuardState::AuthenticatedOk);
    }

    #[test]
    fn required_general_does_not_admit_admin() {
        let config = GuardConfig::default().require_role(Role::General);
        let assessment = assess(&signed_in(Some(Role::Admin), false), &config);
        assert_eq!(assessment.state, GuardState::AuthenticatedNoRole);
    }

    #[test]
    fn guest_is_not_admitted_by_general() {
        let config = GuardConfig::default().require_role(Role::General);
        let assessment = assess(&signed_in(Some(Role::Guest), false), &config);
        assert!(!assessment.checks.has_required_role);
    }

    #[test]
    fn role_failure_takes_precedence_over_verification() {
        let config = GuardConfig::default()
            .require_role(Role::Admin)
            .require_email_verified();
        let assessment = assess(&signed_in(Some(Role::General), false), &config);
        assert_eq!(assessment.state, GuardState::AuthenticatedNoRole);
        let error = assessment.error.expect("derived error");
        assert_eq!(error.kind, AuthErrorKind::Forbidden);
    }

    #[test]
    fn loading_renders_configured_message_without_redirect() {
        let mut guard = AuthGuard::new(GuardConfig::default().loading_message("認証情報を確認中..."));
        let decision = guard.evaluate(&SessionSnapshot::Loading);
        assert_eq!(
            decision.render_guard().map(|ui| ui.message.as_str()),
            Some("認証情報を確認中...")
        );
        assert!(decision.redirect.is_none());
        assert!(decision.notice.is_none());
        assert!(decision.refresh.is_none());
    }

    #[test]
    fn granted_access_renders_nothing_and_schedules_refresh() {
        let mut guard = AuthGuard::new(GuardConfig::default());
        let decision = guard.evaluate(&signed_in(None, false));
        assert!(decision.check_access());
        assert!(decision.render_guard().is_none());
        assert_eq!(
            decision.refresh,
            Some(RefreshSchedule {
                every: DEFAULT_REFRESH_INTERVAL
            })
        );
        assert!(guard.check_access());
        assert!(guard.render_guard().is_none());
    }

    #[test]
    fn refresh_is_not_scheduled_when_disabled() {
        let mut guard = AuthGuard::new(GuardConfig::default().auto_refresh(false));
        assert!(guard.evaluate(&signed_in(None, false)).refresh.is_none());
    }

    #[test]
    fn unverified_redirects_to_verify_email() {
        let mut guard = AuthGuard::new(GuardConfig::default().require_email_verified());
        let decision = guard.evaluate(&signed_in(None, false));
        let redirect = decision.redirect.expect("redirect");
        assert_eq!(redirect.to, DEFAULT_VERIFY_EMAIL_PATH);
        assert_eq!(redirect.reason, RedirectReason::EmailUnverified);
        assert_eq!(
            decision.ui.map(|ui| ui.message),
            Some(REDIRECTING_TO_VERIFY_MESSAGE.to_string())
        );
    }

    #[test]
    fn guard_before_first_evaluation_is_loading() {
        let guard = AuthGuard::new(GuardConfig::default());
        assert!(!guard.check_access());
        assert_eq!(
            guard.render_guard().map(|ui| ui.message),
            Some(DEFAULT_LOADING_MESSAGE.to_string())
        );
    }

    #[test]
    fn refresh_failure_reports_session_expired() {
        let guard = AuthGuard::new(GuardConfig::default());
        let error = guard.report_refresh_failure("connection reset");
        assert_eq!(error.kind, AuthErrorKind::SessionExpired);
        assert_eq!(error.status, 401);
    }
}
