//! Role-gated session.
//!
//! # Lifecycle
//!
//! ```text
//! NoRole --select_role--> RoleSelected --sign_in--> Authenticated(role)
//!   ^                         ^   |                       |
//!   |                         |   +--sign_up (stays)      |
//!   +------- sign_out --------+---------------------------+
//! ```
//!
//! - Choosing a role always restarts the session: local state is wiped
//!   before the new role is stored
//! - A role-specific area is only reachable when the session is
//!   authenticated and the provider still reports an identity; a role
//!   mismatch redirects to the area of the stored role
//! - The guard is re-evaluated on every [`SessionGuard::enter`] call

mod error;
mod profile;

pub use error::AuthError;
pub use profile::{RoleLists, RoleProfile, USERS_COLLECTION, UserProfile};

use std::sync::Arc;

use bazaar_core::{Area, Email, Role};
use tracing::{error, info, instrument, warn};

use crate::error::{add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::store::{AuthProvider, DocumentStore, Identity, LocalStore, to_document};

/// Local store keys for session data.
pub mod keys {
    /// Key for the selected role (`"buyer"` / `"seller"`).
    pub const USER_ROLE: &str = "userRole";

    /// Key for the authenticated flag (`"true"` once signed in).
    pub const IS_AUTHENTICATED: &str = "isAuthenticated";
}

/// Where the app should navigate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// A role-specific area.
    Area(Area),
    /// The sign-in screen.
    SignIn,
    /// The role selection screen.
    RoleSelect,
}

impl Destination {
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Area(area) => area.path(),
            Self::SignIn => "/Signin",
            Self::RoleSelect => "/",
        }
    }
}

/// Session lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    NoRole,
    RoleSelected(Role),
    Authenticated { role: Role, identity: Identity },
}

/// The current session.
///
/// Owned by [`SessionGuard`]; other components receive it by reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    state: SessionState,
}

impl Session {
    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// The selected role, if any.
    #[must_use]
    pub const fn role(&self) -> Option<Role> {
        match &self.state {
            SessionState::NoRole => None,
            SessionState::RoleSelected(role) | SessionState::Authenticated { role, .. } => {
                Some(*role)
            }
        }
    }

    /// The authenticated identity, if any.
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        match &self.state {
            SessionState::Authenticated { identity, .. } => Some(identity),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated { .. })
    }

    /// The identity when signed in as a buyer.
    #[must_use]
    pub const fn buyer(&self) -> Option<&Identity> {
        match &self.state {
            SessionState::Authenticated {
                role: Role::Buyer,
                identity,
            } => Some(identity),
            _ => None,
        }
    }
}

/// Drives the session state machine against the auth provider, the profile
/// documents and local persistence.
pub struct SessionGuard {
    auth: Arc<dyn AuthProvider>,
    documents: Arc<dyn DocumentStore>,
    local: Arc<dyn LocalStore>,
    session: Session,
}

impl SessionGuard {
    /// Create a guard in the `NoRole` state. Call [`SessionGuard::restore`]
    /// to pick up a session persisted by an earlier run.
    #[must_use]
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        documents: Arc<dyn DocumentStore>,
        local: Arc<dyn LocalStore>,
    ) -> Self {
        Self {
            auth,
            documents,
            local,
            session: Session::default(),
        }
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Rebuild the session from local state and the provider's identity.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Local` if local state cannot be read.
    #[instrument(skip(self))]
    pub async fn restore(&mut self) -> Result<&Session, AuthError> {
        let role = self.stored_role().await?;
        let flagged = self
            .local
            .get(keys::IS_AUTHENTICATED)
            .await?
            .is_some_and(|v| v == "true");
        let identity = self.auth.current_identity().await;

        self.session.state = match (role, flagged, identity) {
            (Some(role), true, Some(identity)) => {
                set_sentry_user(&identity.uid, Some(&identity.email));
                SessionState::Authenticated { role, identity }
            }
            (Some(role), _, _) => SessionState::RoleSelected(role),
            (None, _, _) => SessionState::NoRole,
        };
        info!(state = ?self.session.state, "Session restored");
        Ok(&self.session)
    }

    /// Choose a role, discarding any previous session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Local` if local state cannot be written.
    #[instrument(skip(self))]
    pub async fn select_role(&mut self, role: Role) -> Result<&Session, AuthError> {
        self.local.clear().await?;
        self.session.state = SessionState::NoRole;
        clear_sentry_user();

        self.local.set(keys::USER_ROLE, role.as_str()).await?;
        self.session.state = SessionState::RoleSelected(role);
        add_breadcrumb("session", "Role selected", Some(&[("role", role.as_str())]));
        Ok(&self.session)
    }

    /// Sign in with email and password under the stored role.
    ///
    /// On failure the session is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField` for blank input,
    /// `AuthError::RoleNotSelected` without a role, and the provider's
    /// error (usually `AuthError::Rejected`) when sign-in fails.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<&Session, AuthError> {
        if email.trim().is_empty() {
            return Err(AuthError::MissingField("email"));
        }
        if password.is_empty() {
            return Err(AuthError::MissingField("password"));
        }
        let role = match self.stored_role().await? {
            Some(role) => role,
            None => self.session.role().ok_or(AuthError::RoleNotSelected)?,
        };

        let identity = self.auth.authenticate(email, password).await.map_err(|e| {
            warn!(error = %e, "Sign-in rejected");
            e
        })?;

        self.local.set(keys::IS_AUTHENTICATED, "true").await?;
        set_sentry_user(&identity.uid, Some(&identity.email));
        add_breadcrumb("session", "Signed in", Some(&[("role", role.as_str())]));
        info!(uid = %identity.uid, role = %role, "Signed in");

        self.session.state = SessionState::Authenticated { role, identity };
        Ok(&self.session)
    }

    /// Create an account for the selected role.
    ///
    /// Creates the identity, then `users/{uid}`, then the role profile.
    /// A profile write that fails after the identity exists is not rolled
    /// back. The session stays `RoleSelected`; the user signs in next.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField`, `AuthError::RoleNotSelected` or
    /// `AuthError::InvalidEmail` before any remote call, the provider's error
    /// if identity creation fails, and `AuthError::Profile` if a profile
    /// write fails.
    #[instrument(skip(self, password))]
    pub async fn sign_up(
        &mut self,
        email: &str,
        password: &str,
        user_name: &str,
    ) -> Result<Identity, AuthError> {
        if email.trim().is_empty() {
            return Err(AuthError::MissingField("email"));
        }
        if password.is_empty() {
            return Err(AuthError::MissingField("password"));
        }
        if user_name.trim().is_empty() {
            return Err(AuthError::MissingField("userName"));
        }
        let role = match self.stored_role().await? {
            Some(role) => role,
            None => self.session.role().ok_or(AuthError::RoleNotSelected)?,
        };
        let email = Email::parse(email)?;

        let identity = self.auth.create_identity(&email, password).await?;
        info!(uid = %identity.uid, role = %role, "Identity created");

        let created_at = chrono::Utc::now().to_rfc3339();
        let user_name = user_name.trim().to_owned();

        if let Err(e) = self
            .write_profiles(&identity, role, &user_name, &created_at)
            .await
        {
            error!(
                uid = %identity.uid,
                error = %e,
                "Identity created but profile write failed"
            );
            return Err(e);
        }

        add_breadcrumb("session", "Signed up", Some(&[("role", role.as_str())]));
        Ok(identity)
    }

    /// Decide where navigation into `area` ends up.
    ///
    /// Unauthenticated sessions go to sign-in; an authenticated session with
    /// the other role goes to its own area.
    #[instrument(skip(self))]
    pub async fn enter(&self, area: Area) -> Destination {
        let SessionState::Authenticated { role, identity } = &self.session.state else {
            return Destination::SignIn;
        };

        match self.auth.current_identity().await {
            Some(current) if current.uid == identity.uid => {}
            _ => {
                warn!(uid = %identity.uid, "Provider no longer reports the session identity");
                return Destination::SignIn;
            }
        }

        if area.role() == *role {
            Destination::Area(area)
        } else {
            Destination::Area(role.area())
        }
    }

    /// Where the app should go for the current state (cold start, or
    /// auto-redirect from the sign-in screen).
    #[must_use]
    pub const fn landing(&self) -> Destination {
        match &self.session.state {
            SessionState::Authenticated { role, .. } => Destination::Area(role.area()),
            SessionState::RoleSelected(_) => Destination::SignIn,
            SessionState::NoRole => Destination::RoleSelect,
        }
    }

    /// Sign out and wipe all local session state.
    ///
    /// A failed remote sign-out is logged; local state is cleared regardless.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Local` if local state cannot be cleared.
    #[instrument(skip(self))]
    pub async fn sign_out(&mut self) -> Result<Destination, AuthError> {
        if let Err(e) = self.auth.sign_out().await {
            warn!(error = %e, "Remote sign-out failed");
        }
        self.session.state = SessionState::NoRole;
        clear_sentry_user();
        self.local.clear().await?;
        info!("Signed out");
        Ok(Destination::RoleSelect)
    }

    /// Load the signed-in user's generic profile.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotSignedIn` without an identity and
    /// `AuthError::Profile` if the document cannot be read or decoded.
    #[instrument(skip(self))]
    pub async fn profile(&self) -> Result<Option<UserProfile>, AuthError> {
        let identity = self.session.identity().ok_or(AuthError::NotSignedIn)?;
        let Some(fields) = self
            .documents
            .get(USERS_COLLECTION, identity.uid.as_str())
            .await?
        else {
            return Ok(None);
        };
        let profile = serde_json::from_value(serde_json::Value::Object(fields))
            .map_err(crate::store::DocumentError::from)?;
        Ok(Some(profile))
    }

    async fn stored_role(&self) -> Result<Option<Role>, AuthError> {
        let Some(raw) = self.local.get(keys::USER_ROLE).await? else {
            return Ok(None);
        };
        match raw.parse::<Role>() {
            Ok(role) => Ok(Some(role)),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable stored role");
                Ok(None)
            }
        }
    }

    async fn write_profiles(
        &self,
        identity: &Identity,
        role: Role,
        user_name: &str,
        created_at: &str,
    ) -> Result<(), AuthError> {
        let user = UserProfile {
            user_name: user_name.to_owned(),
            email: identity.email.clone(),
            role,
            created_at: created_at.to_owned(),
        };
        self.documents
            .set(USERS_COLLECTION, identity.uid.as_str(), to_document(&user)?)
            .await?;

        let role_profile = RoleProfile {
            user_id: identity.uid.clone(),
            user_name: user_name.to_owned(),
            email: identity.email.clone(),
            created_at: created_at.to_owned(),
            lists: RoleLists::empty(role),
        };
        self.documents
            .set(
                role.profile_collection(),
                identity.uid.as_str(),
                to_document(&role_profile)?,
            )
            .await?;
        Ok(())
    }
}

impl std::fmt::Debug for SessionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGuard")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
