//! Identity resolution: from an authenticated principal to a durable role.
//!
//! Reading and repairing are separate steps. [`IdentityResolver::resolve_role`]
//! never writes; [`IdentityResolver::ensure_default_role`] is the only place a
//! missing role is backfilled, and [`IdentityResolver::resolve`] chains the two
//! so a single call performs at most one write.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use rendezvous_shared::constants::DEFAULT_DISPLAY_NAME;
use rendezvous_shared::identity::{Principal, StaffAllowList};
use rendezvous_shared::types::{Role, UserId};
use rendezvous_store::{AppointmentStore, StoreError, UserRecord};

use crate::error::{LifecycleError, Result};

/// Source of the currently authenticated principal.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_principal(&self) -> Option<Principal>;
}

/// An [`IdentityProvider`] whose principal is set by the embedding host after
/// it has completed authentication.
#[derive(Debug, Default)]
pub struct StaticIdentity {
    principal: RwLock<Option<Principal>>,
}

impl StaticIdentity {
    pub fn new(principal: Option<Principal>) -> Self {
        Self {
            principal: RwLock::new(principal),
        }
    }

    pub fn set(&self, principal: Principal) {
        match self.principal.write() {
            Ok(mut guard) => *guard = Some(principal),
            Err(poisoned) => *poisoned.into_inner() = Some(principal),
        }
    }

    pub fn clear(&self) {
        match self.principal.write() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_principal(&self) -> Option<Principal> {
        match self.principal.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// A signed-in user with a resolved role. The role is fixed for the
/// lifetime of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub email: Option<String>,
    pub role: Role,
}

impl Session {
    pub fn is_staff(&self) -> bool {
        self.role == Role::Staff
    }

    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }
}

/// What a signed-in user sees about themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: UserId,
    pub email: Option<String>,
    pub display_name: String,
    pub role: Option<Role>,
    pub created_at: DateTime<Utc>,
}

impl From<UserRecord> for UserProfile {
    fn from(user: UserRecord) -> Self {
        let display_name = if user.display_name.trim().is_empty() {
            DEFAULT_DISPLAY_NAME.to_string()
        } else {
            user.display_name
        };
        Self {
            user_id: user.user_id,
            email: user.email,
            display_name,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

pub struct IdentityResolver {
    store: Arc<dyn AppointmentStore>,
    staff: StaffAllowList,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn AppointmentStore>, staff: StaffAllowList) -> Self {
        Self { store, staff }
    }

    /// Look up the stored role without repairing anything.
    ///
    /// `Ok(None)` means the identity record exists but carries no role.
    pub async fn resolve_role(&self, user_id: &UserId) -> Result<Option<Role>> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| LifecycleError::RoleNotFound(user_id.clone()))?;
        Ok(user.role)
    }

    /// Backfill the default `student` role if the record has none, and
    /// return the effective role. Writes nothing when a role is present.
    pub async fn ensure_default_role(&self, user_id: &UserId) -> Result<Role> {
        if let Some(role) = self.resolve_role(user_id).await? {
            return Ok(role);
        }

        if self.store.set_role_if_missing(user_id, Role::Student).await? {
            info!(user = %user_id.short(), "backfilled default role");
            return Ok(Role::Student);
        }

        // Someone else filled it in between the read and the write.
        debug!(user = %user_id.short(), "role backfill lost race, re-reading");
        self.resolve_role(user_id)
            .await?
            .ok_or_else(|| LifecycleError::RoleNotFound(user_id.clone()))
    }

    /// Read the role, repairing a missing one on the way.
    pub async fn resolve(&self, user_id: &UserId) -> Result<Role> {
        match self.resolve_role(user_id).await? {
            Some(role) => Ok(role),
            None => self.ensure_default_role(user_id).await,
        }
    }

    /// Create the identity record for a freshly authenticated principal.
    ///
    /// The initial role comes from the staff allow-list.
    pub async fn register(
        &self,
        principal: &Principal,
        display_name: Option<String>,
    ) -> Result<UserProfile> {
        let display_name = display_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string());

        let user = UserRecord {
            user_id: principal.user_id.clone(),
            email: principal.email.clone(),
            display_name,
            role: Some(self.staff.role_for(principal.email.as_deref())),
            created_at: Utc::now(),
        };

        match self.store.insert_user(&user).await {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => {
                return Err(LifecycleError::AlreadyRegistered(user.user_id));
            }
            Err(e) => return Err(e.into()),
        }

        info!(user = %user.user_id.short(), role = ?user.role, "registered user");
        Ok(user.into())
    }

    /// The caller's own identity record.
    pub async fn profile(&self, session: &Session) -> Result<UserProfile> {
        let user = self
            .store
            .get_user(&session.user_id)
            .await?
            .ok_or_else(|| LifecycleError::RoleNotFound(session.user_id.clone()))?;
        Ok(user.into())
    }

    /// Rename the caller. Surrounding whitespace is dropped and a blank
    /// name is rejected.
    pub async fn update_display_name(
        &self,
        session: &Session,
        display_name: &str,
    ) -> Result<UserProfile> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(LifecycleError::Validation(
                "display name cannot be empty".to_string(),
            ));
        }

        if !self
            .store
            .set_display_name(&session.user_id, display_name)
            .await?
        {
            return Err(LifecycleError::RoleNotFound(session.user_id.clone()));
        }

        info!(user = %session.user_id.short(), "display name updated");
        self.profile(session).await
    }

    /// Start a session for whoever the provider reports as signed in.
    pub async fn sign_in(&self, provider: &dyn IdentityProvider) -> Result<Session> {
        let principal = provider
            .current_principal()
            .await
            .ok_or(LifecycleError::NotAuthenticated)?;

        let role = match self.resolve(&principal.user_id).await {
            Ok(role) => role,
            Err(e) => {
                warn!(user = %principal.user_id.short(), error = %e, "role resolution failed");
                return Err(e);
            }
        };

        info!(user = %principal.user_id.short(), %role, "signed in");
        Ok(Session {
            user_id: principal.user_id,
            email: principal.email,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::testing::FlakyStore;

    fn resolver(store: Arc<FlakyStore>, staff_csv: &str) -> IdentityResolver {
        IdentityResolver::new(store, StaffAllowList::from_csv(staff_csv))
    }

    async fn insert_roleless(store: &FlakyStore, uid: &str) {
        store
            .insert_user(&UserRecord {
                user_id: UserId::new(uid),
                email: None,
                display_name: "N/A".to_string(),
                role: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_resolve_role_does_not_repair() {
        let store = Arc::new(FlakyStore::new());
        insert_roleless(&store, "alice").await;
        let resolver = resolver(store.clone(), "");

        let writes_before = store.role_writes.load(Ordering::SeqCst);
        assert_eq!(resolver.resolve_role(&UserId::new("alice")).await.unwrap(), None);
        assert_eq!(store.role_writes.load(Ordering::SeqCst), writes_before);
    }

    #[tokio::test]
    async fn test_resolve_backfills_exactly_once() {
        let store = Arc::new(FlakyStore::new());
        insert_roleless(&store, "alice").await;
        let resolver = resolver(store.clone(), "");
        let uid = UserId::new("alice");

        assert_eq!(resolver.resolve(&uid).await.unwrap(), Role::Student);
        assert_eq!(store.role_writes.load(Ordering::SeqCst), 1);

        assert_eq!(resolver.resolve(&uid).await.unwrap(), Role::Student);
        assert_eq!(resolver.ensure_default_role(&uid).await.unwrap(), Role::Student);
        assert_eq!(store.role_writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_identity_is_role_not_found() {
        let store = Arc::new(FlakyStore::new());
        let resolver = resolver(store.clone(), "");

        let err = resolver.resolve(&UserId::new("ghost")).await.unwrap_err();
        assert!(matches!(err, LifecycleError::RoleNotFound(ref u) if u.as_str() == "ghost"));
        assert_eq!(store.role_writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_register_uses_allow_list() {
        let store = Arc::new(FlakyStore::new());
        let resolver = resolver(store.clone(), "dean@uni.edu");

        let staff = resolver
            .register(&Principal::new("s1", Some("Dean@Uni.edu".into())), None)
            .await
            .unwrap();
        assert_eq!(staff.role, Some(Role::Staff));
        assert_eq!(staff.display_name, "N/A");

        let student = resolver
            .register(&Principal::new("u1", Some("kid@uni.edu".into())), Some(" Kim ".into()))
            .await
            .unwrap();
        assert_eq!(student.role, Some(Role::Student));
        assert_eq!(student.display_name, "Kim");
    }

    #[tokio::test]
    async fn test_register_twice_is_rejected() {
        let store = Arc::new(FlakyStore::new());
        let resolver = resolver(store, "");
        let principal = Principal::new("u1", None);

        resolver.register(&principal, None).await.unwrap();
        assert!(matches!(
            resolver.register(&principal, None).await,
            Err(LifecycleError::AlreadyRegistered(_))
        ));
    }

    #[tokio::test]
    async fn test_sign_in_requires_principal() {
        let store = Arc::new(FlakyStore::new());
        let resolver = resolver(store, "");
        let provider = StaticIdentity::default();

        assert!(matches!(
            resolver.sign_in(&provider).await,
            Err(LifecycleError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_sign_in_resolves_role() {
        let store = Arc::new(FlakyStore::new());
        let resolver = resolver(store, "dean@uni.edu");
        let principal = Principal::new("s1", Some("dean@uni.edu".into()));
        resolver.register(&principal, None).await.unwrap();

        let provider = StaticIdentity::new(Some(principal));
        let session = resolver.sign_in(&provider).await.unwrap();
        assert!(session.is_staff());
        assert_eq!(session.user_id.as_str(), "s1");
    }

    #[tokio::test]
    async fn test_store_outage_is_reported() {
        let store = Arc::new(FlakyStore::new());
        insert_roleless(&store, "alice").await;
        store.fail_all.store(true, Ordering::SeqCst);
        let resolver = resolver(store, "");

        assert!(matches!(
            resolver.resolve(&UserId::new("alice")).await,
            Err(LifecycleError::StoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_profile_reflects_record() {
        let store = Arc::new(FlakyStore::new());
        insert_roleless(&store, "alice").await;
        store
            .set_display_name(&UserId::new("alice"), "   ")
            .await
            .unwrap();
        let resolver = resolver(store, "");
        let session = Session {
            user_id: UserId::new("alice"),
            email: None,
            role: Role::Student,
        };

        let profile = resolver.profile(&session).await.unwrap();
        assert_eq!(profile.display_name, "N/A");
        assert_eq!(profile.role, None);

        let ghost = Session {
            user_id: UserId::new("ghost"),
            ..session
        };
        assert!(matches!(
            resolver.profile(&ghost).await,
            Err(LifecycleError::RoleNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_display_name() {
        let store = Arc::new(FlakyStore::new());
        let resolver = resolver(store.clone(), "");
        let principal = Principal::new("u1", Some("kid@uni.edu".into()));
        resolver.register(&principal, Some("Kim".into())).await.unwrap();
        let session = Session {
            user_id: principal.user_id.clone(),
            email: principal.email.clone(),
            role: Role::Student,
        };

        let updated = resolver
            .update_display_name(&session, "  Kim Lee ")
            .await
            .unwrap();
        assert_eq!(updated.display_name, "Kim Lee");
        assert_eq!(updated.email.as_deref(), Some("kid@uni.edu"));

        let err = resolver.update_display_name(&session, " \t ").await.unwrap_err();
        assert!(matches!(err, LifecycleError::Validation(_)));
        let stored = store.get_user(&session.user_id).await.unwrap().unwrap();
        assert_eq!(stored.display_name, "Kim Lee");
    }

    #[tokio::test]
    async fn test_update_display_name_for_unknown_user() {
        let store = Arc::new(FlakyStore::new());
        let resolver = resolver(store, "");
        let session = Session {
            user_id: UserId::new("ghost"),
            email: None,
            role: Role::Student,
        };

        assert!(matches!(
            resolver.update_display_name(&session, "Casper").await,
            Err(LifecycleError::RoleNotFound(_))
        ));
    }
}
