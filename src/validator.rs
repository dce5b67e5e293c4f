//! Coordinate validation against the project registry.

use crate::error::{Error, Result};
use crate::model::Coordinate;
use crate::registry::ProjectRegistry;
use std::sync::Arc;
use tracing::debug;

/// How much of the coordinate must agree with the registered project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Project must exist and its group and artifact must match.
    #[default]
    Strict,
    /// Project must exist; group and artifact are informational.
    ProjectOnly,
}

impl std::str::FromStr for ValidationMode {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(ValidationMode::Strict),
            "project-only" | "project_only" => Ok(ValidationMode::ProjectOnly),
            other => Err(Error::Config(format!("unknown validation mode: {other}"))),
        }
    }
}

/// Checks that a project id and coordinate refer to a known project.
///
/// A negative answer is not an error; the caller decides what to do with it.
/// Registry failures are errors and are never reported as `false`.
#[derive(Clone)]
pub struct CoordinateValidator {
    registry: Arc<dyn ProjectRegistry>,
    mode: ValidationMode,
}

impl CoordinateValidator {
    pub fn new(registry: Arc<dyn ProjectRegistry>, mode: ValidationMode) -> Self {
        Self { registry, mode }
    }

    pub async fn validate(&self, project_id: &str, coordinate: &Coordinate) -> Result<bool> {
        if project_id.is_empty() || coordinate.has_empty_field() {
            debug!(project_id, %coordinate, "coordinate has empty fields");
            return Ok(false);
        }

        let Some(project) = self.registry.resolve_project(project_id).await? else {
            debug!(project_id, "project not found in registry");
            return Ok(false);
        };

        let valid = match self.mode {
            ValidationMode::ProjectOnly => true,
            ValidationMode::Strict => {
                project.group_id == coordinate.group_id
                    && project.artifact_id == coordinate.artifact_id
            }
        };
        if !valid {
            debug!(
                project_id,
                %coordinate,
                registered_group = %project.group_id,
                registered_artifact = %project.artifact_id,
                "coordinate does not match registered project"
            );
        }
        Ok(valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProjectRecord;
    use crate::registry::StaticProjectRegistry;

    fn validator(mode: ValidationMode) -> CoordinateValidator {
        let registry = StaticProjectRegistry::empty()
            .with_project(ProjectRecord::new("1", "test.group", "artifact"));
        CoordinateValidator::new(Arc::new(registry), mode)
    }

    #[tokio::test]
    async fn accepts_registered_project() {
        let v = validator(ValidationMode::Strict);
        let c = Coordinate::new("test.group", "artifact", "1.0.0");
        assert!(v.validate("1", &c).await.unwrap());
    }

    #[tokio::test]
    async fn denies_unknown_project() {
        let v = validator(ValidationMode::ProjectOnly);
        let c = Coordinate::new("test.group", "artifact", "1.0.0");
        assert!(!v.validate("2", &c).await.unwrap());
    }

    #[tokio::test]
    async fn strict_mode_checks_group_and_artifact() {
        let c = Coordinate::new("other.group", "artifact", "1.0.0");
        assert!(!validator(ValidationMode::Strict).validate("1", &c).await.unwrap());
        assert!(
            validator(ValidationMode::ProjectOnly)
                .validate("1", &c)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn denies_empty_fields() {
        let v = validator(ValidationMode::ProjectOnly);
        assert!(!v.validate("", &Coordinate::new("g", "a", "v")).await.unwrap());
        assert!(!v.validate("1", &Coordinate::new("g", "a", "")).await.unwrap());
    }

    #[test]
    fn mode_parses() {
        assert_eq!(
            "project-only".parse::<ValidationMode>().unwrap(),
            ValidationMode::ProjectOnly
        );
        assert!("lenient".parse::<ValidationMode>().is_err());
    }
}
