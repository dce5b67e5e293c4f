//! Project registry boundary.
//!
//! The registry is owned elsewhere; this crate only resolves project ids
//! against it. [`StaticProjectRegistry`] is a fixed, in-process registry for
//! embedding and tests. The Postgres [`Db`](crate::db::Db) also implements
//! [`ProjectRegistry`] over its `projects` table.

use crate::error::{Error, Result};
use crate::model::ProjectRecord;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Read-only lookup of known projects.
#[async_trait::async_trait]
pub trait ProjectRegistry: Send + Sync {
    /// Resolve a project by id. `Ok(None)` means the project is unknown.
    async fn resolve_project(&self, project_id: &str) -> Result<Option<ProjectRecord>>;
}

/// Top-level TOML wrapper.
#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    project: Vec<ProjectRecord>,
}

/// Fixed set of projects, indexed by project id.
#[derive(Debug, Default)]
pub struct StaticProjectRegistry {
    projects: HashMap<String, ProjectRecord>,
}

impl StaticProjectRegistry {
    /// Create an empty registry with no projects.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(projects: impl IntoIterator<Item = ProjectRecord>) -> Self {
        Self {
            projects: projects
                .into_iter()
                .map(|p| (p.project_id.clone(), p))
                .collect(),
        }
    }

    /// Add or replace a project.
    pub fn with_project(mut self, project: ProjectRecord) -> Self {
        self.projects.insert(project.project_id.clone(), project);
        self
    }

    /// Load projects from a TOML file of `[[project]]` tables.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let file: RegistryFile = toml::from_str(&content).map_err(|e| {
            Error::Config(format!("bad project file {}: {e}", path.display()))
        })?;
        Ok(Self::new(file.project))
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

#[async_trait::async_trait]
impl ProjectRegistry for StaticProjectRegistry {
    async fn resolve_project(&self, project_id: &str) -> Result<Option<ProjectRecord>> {
        Ok(self.projects.get(project_id).cloned())
    }
}
