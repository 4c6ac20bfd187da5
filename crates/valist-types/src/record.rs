use serde::{Deserialize, Serialize};

use crate::cid::Cid;
use crate::ids::OrgId;

/// On-chain organization record as observed after confirmation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrgId,
    /// Minimum number of distinct admin votes for a governance change.
    pub threshold: u64,
    /// Block timestamp (unix seconds) of the last threshold change.
    pub threshold_date: u64,
    pub meta_cid: Cid,
}

/// On-chain repository record, keyed by (organization, name).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub org_id: OrgId,
    pub name: String,
    pub threshold: u64,
    pub threshold_date: u64,
    pub meta_cid: Cid,
    /// Head of the release history, if any release has been published.
    pub latest_release: Option<Cid>,
}

impl Repository {
    /// `org/name` display path.
    pub fn path(&self) -> String {
        format!("{}/{}", self.org_id.short_hex(), self.name)
    }
}

/// Governance scope: the organization itself or one of its repositories.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    Organization,
    Repository(String),
}

impl Scope {
    pub fn repository(name: impl Into<String>) -> Self {
        Self::Repository(name.into())
    }

    /// Repository name, `None` for organization scope.
    pub fn repo_name(&self) -> Option<&str> {
        match self {
            Self::Organization => None,
            Self::Repository(name) => Some(name),
        }
    }

    pub fn from_repo_name(name: Option<String>) -> Self {
        name.map_or(Self::Organization, Self::Repository)
    }
}
