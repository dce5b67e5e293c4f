//! Read-only project lookups.

use super::Db;
use crate::error::Result;
use crate::model::ProjectRecord;
use crate::registry::ProjectRegistry;

#[async_trait::async_trait]
impl ProjectRegistry for Db {
    async fn resolve_project(&self, project_id: &str) -> Result<Option<ProjectRecord>> {
        let row: Option<(String, String, String)> = sqlx::query_as(
            "SELECT project_id, group_id, artifact_id FROM projects WHERE project_id = $1",
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(project_id, group_id, artifact_id)| ProjectRecord {
            project_id,
            group_id,
            artifact_id,
        }))
    }
}
