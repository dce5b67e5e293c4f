//! Capability check in front of the notification manager.
//!
//! The manager has no notion of callers. [`AuthorisedNotifications`] checks
//! the caller's principal against an [`AuthorisationProvider`] before
//! delegating, so a denied call never reaches validator, queue or history.

use crate::error::{Error, Result};
use crate::manager::NotificationManager;
use crate::model::NotificationEvent;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

/// Role a caller must hold to use the notification entry points.
pub const NOTIFICATIONS_ROLE: &str = "Notifications";

/// An authenticated caller, as handed over by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub name: String,
    pub roles: HashSet<String>,
}

impl Principal {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            roles: HashSet::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }
}

pub trait AuthorisationProvider: Send + Sync {
    /// `Ok(())` if the principal may act in `role`, `Err(Unauthorised)` otherwise.
    fn authorise(&self, principal: &Principal, role: &str) -> Result<()>;
}

/// Lets every caller through. For embedded use and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl AuthorisationProvider for AllowAll {
    fn authorise(&self, _principal: &Principal, _role: &str) -> Result<()> {
        Ok(())
    }
}

/// Requires the principal to carry the role (case-insensitive).
#[derive(Debug, Default, Clone, Copy)]
pub struct RoleBasedAuthorisation;

impl AuthorisationProvider for RoleBasedAuthorisation {
    fn authorise(&self, principal: &Principal, role: &str) -> Result<()> {
        if principal.has_role(role) {
            Ok(())
        } else {
            warn!(principal = %principal.name, role, "authorisation denied");
            Err(Error::Unauthorised {
                role: role.to_string(),
            })
        }
    }
}

/// [`NotificationManager`] behind a capability check.
#[derive(Clone)]
pub struct AuthorisedNotifications {
    inner: NotificationManager,
    provider: Arc<dyn AuthorisationProvider>,
}

impl AuthorisedNotifications {
    pub fn new(inner: NotificationManager, provider: Arc<dyn AuthorisationProvider>) -> Self {
        Self { inner, provider }
    }

    fn check(&self, principal: &Principal) -> Result<()> {
        self.provider.authorise(principal, NOTIFICATIONS_ROLE)
    }

    pub async fn queue_event(
        &self,
        principal: &Principal,
        project_id: &str,
        group_id: &str,
        artifact_id: &str,
        version_id: &str,
        event_id: Option<i64>,
    ) -> Result<NotificationEvent> {
        self.check(principal)?;
        self.inner
            .queue_event(project_id, group_id, artifact_id, version_id, event_id)
            .await
    }

    pub async fn queue_refresh_all_event(&self, principal: &Principal) -> Result<NotificationEvent> {
        self.check(principal)?;
        self.inner.queue_refresh_all_event().await
    }

    pub async fn get_all_events(
        &self,
        principal: &Principal,
        since: &str,
        project_id: Option<&str>,
    ) -> Result<Vec<NotificationEvent>> {
        self.check(principal)?;
        self.inner.get_all_events(since, project_id).await
    }

    pub async fn get_all_events_in_queue(
        &self,
        principal: &Principal,
    ) -> Result<Vec<NotificationEvent>> {
        self.check(principal)?;
        self.inner.get_all_events_in_queue().await
    }
}
