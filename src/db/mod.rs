//! Postgres persistence: connection pool, migrations, and health check.
//!
//! [`Db`] implements [`EventQueue`](crate::queue::EventQueue),
//! [`EventHistory`](crate::history::EventHistory) and
//! [`ProjectRegistry`](crate::registry::ProjectRegistry) over one shared pool.

pub mod history;
pub mod projects;
pub mod queue;

use crate::error::{Error, Result};
use crate::model::{Coordinate, EventId, EventTarget, NotificationEvent};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

/// Database handle. Owns the connection pool shared across all modules.
pub struct Db {
    pool: PgPool,
}

impl Db {
    /// Connect to Postgres and create a connection pool.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    /// Run all pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Other(format!("migration failed: {e}")))?;
        Ok(())
    }

    /// Health check: run a SELECT 1.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Target columns as stored in both the queue and history tables.
struct TargetColumns<'a> {
    refresh_all: bool,
    project_id: Option<&'a str>,
    group_id: Option<&'a str>,
    artifact_id: Option<&'a str>,
    version_id: Option<&'a str>,
}

impl<'a> TargetColumns<'a> {
    fn of(target: &'a EventTarget) -> Self {
        let coordinate = target.coordinate();
        Self {
            refresh_all: target.is_refresh_all(),
            project_id: target.project_id(),
            group_id: coordinate.map(|c| c.group_id.as_str()),
            artifact_id: coordinate.map(|c| c.artifact_id.as_str()),
            version_id: coordinate.map(|c| c.version_id.as_str()),
        }
    }
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    refresh_all: bool,
    project_id: Option<String>,
    group_id: Option<String>,
    artifact_id: Option<String>,
    version_id: Option<String>,
    event_id: Option<i64>,
    last_updated: chrono::DateTime<chrono::Utc>,
}

impl NotificationRow {
    fn try_into_event(self) -> Result<NotificationEvent> {
        let target = if self.refresh_all {
            EventTarget::RefreshAll
        } else {
            match (
                self.project_id,
                self.group_id,
                self.artifact_id,
                self.version_id,
            ) {
                (Some(project_id), Some(group_id), Some(artifact_id), Some(version_id)) => {
                    EventTarget::Specific {
                        project_id,
                        coordinate: Coordinate {
                            group_id,
                            artifact_id,
                            version_id,
                        },
                    }
                }
                _ => {
                    return Err(Error::Other(format!(
                        "notification {} has an incomplete coordinate",
                        self.id
                    )));
                }
            }
        };

        Ok(NotificationEvent {
            id: EventId(self.id),
            target,
            event_id: self.event_id,
            last_updated: self.last_updated,
        })
    }
}
