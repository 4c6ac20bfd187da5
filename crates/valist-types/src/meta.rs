use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Descriptive payload of an organization.
///
/// Stored as JSON in the content store and referenced from the ledger by
/// CID. Never mutated in place: an edit produces a new blob and a new CID.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationMeta {
    pub name: String,
    pub description: String,
}

impl OrganizationMeta {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Kind of project a repository publishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectType {
    #[serde(rename = "binary")]
    Binary,
    #[serde(rename = "node")]
    Node,
    #[serde(rename = "go")]
    Go,
    #[serde(rename = "rust")]
    Rust,
    #[serde(rename = "python")]
    Python,
    #[serde(rename = "docker")]
    Docker,
    #[serde(rename = "c++")]
    Cpp,
    #[serde(rename = "static")]
    Static,
}

impl ProjectType {
    pub const ALL: [ProjectType; 8] = [
        Self::Binary,
        Self::Node,
        Self::Go,
        Self::Rust,
        Self::Python,
        Self::Docker,
        Self::Cpp,
        Self::Static,
    ];

    /// Wire name of the project type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Node => "node",
            Self::Go => "go",
            Self::Rust => "rust",
            Self::Python => "python",
            Self::Docker => "docker",
            Self::Cpp => "c++",
            Self::Static => "static",
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| TypeError::UnknownProjectType(s.to_string()))
    }
}

/// Descriptive payload of a repository.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryMeta {
    pub name: String,
    pub description: String,
    #[serde(rename = "projectType")]
    pub project_type: ProjectType,
    pub homepage: String,
    /// Source repository URL.
    pub repository: String,
}

impl RepositoryMeta {
    pub fn new(name: impl Into<String>, project_type: ProjectType) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            project_type,
            homepage: String::new(),
            repository: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_homepage(mut self, homepage: impl Into<String>) -> Self {
        self.homepage = homepage.into();
        self
    }

    pub fn with_repository(mut self, url: impl Into<String>) -> Self {
        self.repository = url.into();
        self
    }
}
