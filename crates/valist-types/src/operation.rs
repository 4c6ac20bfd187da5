use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of mutating registry operation. Exactly one per transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    CreateOrganization,
    SetOrganizationMeta,
    CreateRepository,
    SetRepositoryMeta,
    VoteAdminKey,
    VoteThreshold,
}

impl OperationKind {
    /// Whether the operation stages a metadata blob before submission.
    pub fn carries_meta(&self) -> bool {
        matches!(
            self,
            Self::CreateOrganization
                | Self::SetOrganizationMeta
                | Self::CreateRepository
                | Self::SetRepositoryMeta
        )
    }

    /// Whether the operation is a governance vote.
    pub fn is_vote(&self) -> bool {
        matches!(self, Self::VoteAdminKey | Self::VoteThreshold)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CreateOrganization => "CreateOrganization",
            Self::SetOrganizationMeta => "SetOrganizationMeta",
            Self::CreateRepository => "CreateRepository",
            Self::SetRepositoryMeta => "SetRepositoryMeta",
            Self::VoteAdminKey => "VoteAdminKey",
            Self::VoteThreshold => "VoteThreshold",
        };
        f.write_str(name)
    }
}

/// Membership change proposed by a key vote.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyOperation {
    /// Grant the key membership once enough votes accumulate.
    Add,
    /// Remove the key once enough votes accumulate.
    Revoke,
    /// Replace the voter's own key with the target key. Applies immediately.
    Rotate,
}

impl fmt::Display for KeyOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "ADD_KEY"),
            Self::Revoke => write!(f, "REVOKE_KEY"),
            Self::Rotate => write!(f, "ROTATE_KEY"),
        }
    }
}

/// Correlation identifier for one orchestrated operation (UUID v7).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperationId(uuid::Uuid);

impl OperationId {
    /// Generate a new time-ordered operation ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }

    /// First eight characters, for log lines.
    pub fn short_id(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OperationId({})", self.short_id())
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_and_vote_kinds_are_disjoint() {
        let all = [
            OperationKind::CreateOrganization,
            OperationKind::SetOrganizationMeta,
            OperationKind::CreateRepository,
            OperationKind::SetRepositoryMeta,
            OperationKind::VoteAdminKey,
            OperationKind::VoteThreshold,
        ];
        for kind in all {
            assert_ne!(kind.carries_meta(), kind.is_vote(), "{kind}");
        }
    }

    #[test]
    fn key_operation_display() {
        assert_eq!(KeyOperation::Add.to_string(), "ADD_KEY");
        assert_eq!(KeyOperation::Revoke.to_string(), "REVOKE_KEY");
        assert_eq!(KeyOperation::Rotate.to_string(), "ROTATE_KEY");
    }

    #[test]
    fn operation_ids_are_unique() {
        let a = OperationId::new();
        let b = OperationId::new();
        assert_ne!(a, b);
        assert_eq!(a.short_id().len(), 8);
    }
}
