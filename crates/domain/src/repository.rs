use std::fmt::{Display, Formatter};

use reaper_core::{AppError, AppResult, NonEmptyString};

/// Repository coordinates in `owner/name` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositorySlug {
    owner: NonEmptyString,
    name: NonEmptyString,
}

impl RepositorySlug {
    /// Creates a slug from separate owner and name parts.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> AppResult<Self> {
        let owner = owner.into();
        let name = name.into();

        for part in [owner.as_str(), name.as_str()] {
            if part.contains('/') || part.chars().any(char::is_whitespace) {
                return Err(AppError::Config(format!(
                    "repository part '{part}' must not contain '/' or whitespace"
                )));
            }
        }

        Ok(Self {
            owner: NonEmptyString::new(owner)
                .map_err(|_| AppError::Config("repository owner must not be empty".to_owned()))?,
            name: NonEmptyString::new(name)
                .map_err(|_| AppError::Config("repository name must not be empty".to_owned()))?,
        })
    }

    /// Parses an `owner/name` string.
    pub fn parse(value: &str) -> AppResult<Self> {
        let (owner, name) = value.trim().split_once('/').ok_or_else(|| {
            AppError::Config(format!("repository '{value}' must have the form 'owner/name'"))
        })?;

        Self::new(owner, name)
    }

    /// Returns the owning account or organization.
    #[must_use]
    pub fn owner(&self) -> &str {
        self.owner.as_str()
    }

    /// Returns the repository name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }
}

impl Display for RepositorySlug {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}/{}", self.owner, self.name)
    }
}
