//! Stack rule checks.
//!
//! Validation never stops at the first violation: every rule is checked and
//! the full list is returned so callers can report all problems at once.

use thiserror::Error;

use super::types::{Component, Stack};

/// A single stack rule violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("stack id is required")]
  MissingStackId,

  #[error("stack '{0}': version is required")]
  MissingStackVersion(String),

  #[error("invalid id '{0}': only lowercase letters, digits and '-' are allowed")]
  InvalidId(String),

  #[error("stack '{0}' has no components")]
  NoComponents(String),

  #[error("component key '{key}' does not match component id '{id}'")]
  IdMismatch { key: String, id: String },

  #[error("component '{0}': image name is required for non-buildable components")]
  MissingImage(String),

  #[error("component '{0}': version is required for buildable components")]
  MissingVersion(String),

  #[error("component '{0}': dockerfile is required")]
  MissingDockerfile(String),

  #[error("component '{component}': port '{label}' must be non-zero")]
  InvalidPort { component: String, label: String },

  #[error("component '{0}': head component must be buildable")]
  HeadNotBuildable(String),

  #[error("multiple head components: {0}")]
  MultipleHeads(String),
}

/// Flattened aggregate of every violation found in a stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
    self.0.iter()
  }
}

impl std::fmt::Display for ValidationErrors {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} validation error(s):", self.0.len())?;
    for err in &self.0 {
      write!(f, "\n  - {}", err)?;
    }
    Ok(())
  }
}

impl std::error::Error for ValidationErrors {}

pub(crate) fn valid_id(id: &str) -> bool {
  !id.is_empty()
    && id
      .chars()
      .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

impl Stack {
  /// Check every stack rule and return all violations.
  pub fn validate(&self) -> Vec<ValidationError> {
    let mut errs = Vec::new();

    if self.id.is_empty() {
      errs.push(ValidationError::MissingStackId);
    } else if !valid_id(&self.id) {
      errs.push(ValidationError::InvalidId(self.id.clone()));
    }

    if self.version.is_empty() {
      errs.push(ValidationError::MissingStackVersion(self.id.clone()));
    }

    if self.components.is_empty() {
      errs.push(ValidationError::NoComponents(self.id.clone()));
    }

    let mut heads = Vec::new();
    for (key, component) in &self.components {
      if key != &component.id {
        errs.push(ValidationError::IdMismatch {
          key: key.clone(),
          id: component.id.clone(),
        });
      }
      if !valid_id(&component.id) {
        errs.push(ValidationError::InvalidId(component.id.clone()));
      }
      validate_component(component, &mut errs);
      if component.head {
        heads.push(component.id.as_str());
      }
    }

    if heads.len() > 1 {
      errs.push(ValidationError::MultipleHeads(heads.join(", ")));
    }

    errs
  }

  /// Validate and flatten all violations into a single error.
  pub fn check(&self) -> Result<(), ValidationErrors> {
    let errs = self.validate();
    if errs.is_empty() {
      Ok(())
    } else {
      Err(ValidationErrors(errs))
    }
  }
}

fn validate_component(component: &Component, errs: &mut Vec<ValidationError>) {
  match &component.build {
    Some(build) => {
      if component.version.is_empty() {
        errs.push(ValidationError::MissingVersion(component.id.clone()));
      }
      if build.dockerfile.trim().is_empty() {
        errs.push(ValidationError::MissingDockerfile(component.id.clone()));
      }
    }
    None => {
      if component.name.is_empty() {
        errs.push(ValidationError::MissingImage(component.id.clone()));
      }
      if component.head {
        errs.push(ValidationError::HeadNotBuildable(component.id.clone()));
      }
    }
  }

  for (label, port) in &component.ports {
    if *port == 0 {
      errs.push(ValidationError::InvalidPort {
        component: component.id.clone(),
        label: label.clone(),
      });
    }
  }
}
