//! Registry contract rules executed by the in-memory ledger.

use std::collections::{BTreeSet, HashMap};

use valist_crypto::ContentHasher;
use valist_types::{Address, Cid, EventTopic, KeyOperation, OrgId, Organization, Repository};

use crate::abi::{
    ContractEvent, MetaUpdate, OrgCreated, RepoCreated, VoteKeyEvent, VoteThresholdEvent,
};
use crate::tx::Call;

pub(crate) const ORG_NOT_EXIST: &str = "organization does not exist";
pub(crate) const REPO_NOT_EXIST: &str = "repository does not exist";
pub(crate) const REPO_EXISTS: &str = "repository already exists";
pub(crate) const ACCESS_DENIED: &str = "access denied";
pub(crate) const INVALID_REPO_NAME: &str = "invalid repository name";
pub(crate) const KEY_EXISTS: &str = "key already exists";
pub(crate) const KEY_NOT_EXIST: &str = "key does not exist";
pub(crate) const THRESHOLD_TOO_HIGH: &str = "threshold exceeds key count";
pub(crate) const THRESHOLD_UNCHANGED: &str = "threshold unchanged";
pub(crate) const ALREADY_VOTED: &str = "already voted";

/// Event emitted by a successful call, ready to become a log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Emitted {
    pub topic: EventTopic,
    pub org_id: OrgId,
    pub data: Vec<u8>,
}

impl Emitted {
    fn encode<E: ContractEvent>(event: &E) -> Result<Self, String> {
        let data = event
            .encode()
            .map_err(|e| format!("event encoding failed: {e}"))?;
        Ok(Self {
            topic: E::topic(),
            org_id: event.org_id(),
            data,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum PendingChange {
    Key(KeyOperation, Address),
    Threshold(u64),
}

/// Key set plus threshold voting state, shared by organizations and
/// repositories.
#[derive(Debug)]
struct Governed {
    /// Insertion order; the creator comes first.
    members: Vec<Address>,
    votes: HashMap<PendingChange, BTreeSet<Address>>,
    threshold: u64,
    threshold_date: u64,
}

impl Governed {
    fn founded_by(member: Address) -> Self {
        Self {
            members: vec![member],
            votes: HashMap::new(),
            threshold: 0,
            threshold_date: 0,
        }
    }

    fn is_member(&self, address: &Address) -> bool {
        self.members.contains(address)
    }

    fn required_votes(&self) -> u64 {
        self.threshold.max(1)
    }

    /// Signatures `change` would have after counting `voter`.
    fn count_vote(&self, change: &PendingChange, voter: &Address) -> Result<u64, String> {
        let voters = self.votes.get(change);
        if voters.is_some_and(|v| v.contains(voter)) {
            return Err(ALREADY_VOTED.into());
        }
        Ok(voters.map_or(0, |v| v.len() as u64) + 1)
    }

    fn record_vote(&mut self, change: PendingChange, voter: Address) {
        self.votes.entry(change).or_default().insert(voter);
    }

    /// Drop pending votes cast by keys that have since been revoked or
    /// rotated away. `admins` lists outside keys still allowed to vote here.
    fn prune_votes(&mut self, admins: &[Address]) {
        let members = &self.members;
        for voters in self.votes.values_mut() {
            voters.retain(|voter| members.contains(voter) || admins.contains(voter));
        }
        self.votes.retain(|_, voters| !voters.is_empty());
    }
}

#[derive(Debug)]
struct OrgState {
    governed: Governed,
    meta_cid: Cid,
    repos: HashMap<String, RepoState>,
}

#[derive(Debug)]
struct RepoState {
    governed: Governed,
    meta_cid: Cid,
    latest_release: Option<Cid>,
}

/// On-chain registry state and the rules that mutate it.
///
/// `execute` either applies a call completely and returns its events, or
/// leaves the state untouched and returns a revert reason.
#[derive(Debug)]
pub(crate) struct RegistryState {
    chain_id: u64,
    orgs: HashMap<OrgId, OrgState>,
    org_count: u64,
}

impl RegistryState {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            orgs: HashMap::new(),
            org_count: 0,
        }
    }

    pub fn organization(&self, org_id: &OrgId) -> Option<Organization> {
        self.orgs.get(org_id).map(|org| Organization {
            id: *org_id,
            threshold: org.governed.threshold,
            threshold_date: org.governed.threshold_date,
            meta_cid: org.meta_cid,
        })
    }

    pub fn repository(&self, org_id: &OrgId, name: &str) -> Option<Repository> {
        let repo = self.orgs.get(org_id)?.repos.get(name)?;
        Some(Repository {
            org_id: *org_id,
            name: name.to_string(),
            threshold: repo.governed.threshold,
            threshold_date: repo.governed.threshold_date,
            meta_cid: repo.meta_cid,
            latest_release: repo.latest_release,
        })
    }

    pub fn organization_members(&self, org_id: &OrgId) -> Option<Vec<Address>> {
        self.orgs
            .get(org_id)
            .map(|org| org.governed.members.clone())
    }

    pub fn repository_members(&self, org_id: &OrgId, name: &str) -> Option<Vec<Address>> {
        let repo = self.orgs.get(org_id)?.repos.get(name)?;
        Some(repo.governed.members.clone())
    }

    pub fn execute(
        &mut self,
        from: Address,
        call: &Call,
        block_timestamp: u64,
    ) -> Result<Vec<Emitted>, String> {
        match call {
            Call::CreateOrganization { meta_cid } => self.create_organization(from, *meta_cid),
            Call::SetOrganizationMeta { org_id, meta_cid } => {
                self.set_organization_meta(from, org_id, *meta_cid)
            }
            Call::CreateRepository {
                org_id,
                name,
                meta_cid,
            } => self.create_repository(from, org_id, name, *meta_cid),
            Call::SetRepositoryMeta {
                org_id,
                name,
                meta_cid,
            } => self.set_repository_meta(from, org_id, name, *meta_cid),
            Call::VoteKey {
                org_id,
                repo_name,
                operation,
                key,
            } => self.vote_key(from, org_id, repo_name.as_deref(), *operation, *key),
            Call::VoteThreshold {
                org_id,
                repo_name,
                threshold,
            } => self.vote_threshold(
                from,
                org_id,
                repo_name.as_deref(),
                *threshold,
                block_timestamp,
            ),
        }
    }

    fn create_organization(&mut self, from: Address, meta_cid: Cid) -> Result<Vec<Emitted>, String> {
        let sequence = self.org_count + 1;
        let org_id = ContentHasher::org_id(self.chain_id, sequence);
        let event = Emitted::encode(&OrgCreated {
            org_id,
            meta_cid,
            admin: from,
        })?;

        self.org_count = sequence;
        self.orgs.insert(
            org_id,
            OrgState {
                governed: Governed::founded_by(from),
                meta_cid,
                repos: HashMap::new(),
            },
        );
        Ok(vec![event])
    }

    fn set_organization_meta(
        &mut self,
        from: Address,
        org_id: &OrgId,
        meta_cid: Cid,
    ) -> Result<Vec<Emitted>, String> {
        let org = self.orgs.get_mut(org_id).ok_or(ORG_NOT_EXIST)?;
        if !org.governed.is_member(&from) {
            return Err(ACCESS_DENIED.into());
        }
        let event = Emitted::encode(&MetaUpdate {
            org_id: *org_id,
            repo_name: None,
            signer: from,
            meta_cid,
        })?;
        org.meta_cid = meta_cid;
        Ok(vec![event])
    }

    fn create_repository(
        &mut self,
        from: Address,
        org_id: &OrgId,
        name: &str,
        meta_cid: Cid,
    ) -> Result<Vec<Emitted>, String> {
        let org = self.orgs.get_mut(org_id).ok_or(ORG_NOT_EXIST)?;
        if !org.governed.is_member(&from) {
            return Err(ACCESS_DENIED.into());
        }
        if !is_valid_repo_name(name) {
            return Err(INVALID_REPO_NAME.into());
        }
        if org.repos.contains_key(name) {
            return Err(REPO_EXISTS.into());
        }
        let event = Emitted::encode(&RepoCreated {
            org_id: *org_id,
            repo_name: name.to_string(),
            meta_cid,
            signer: from,
        })?;
        org.repos.insert(
            name.to_string(),
            RepoState {
                governed: Governed::founded_by(from),
                meta_cid,
                latest_release: None,
            },
        );
        Ok(vec![event])
    }

    fn set_repository_meta(
        &mut self,
        from: Address,
        org_id: &OrgId,
        name: &str,
        meta_cid: Cid,
    ) -> Result<Vec<Emitted>, String> {
        let org = self.orgs.get_mut(org_id).ok_or(ORG_NOT_EXIST)?;
        let is_admin = org.governed.is_member(&from);
        let repo = org.repos.get_mut(name).ok_or(REPO_NOT_EXIST)?;
        if !is_admin && !repo.governed.is_member(&from) {
            return Err(ACCESS_DENIED.into());
        }
        let event = Emitted::encode(&MetaUpdate {
            org_id: *org_id,
            repo_name: Some(name.to_string()),
            signer: from,
            meta_cid,
        })?;
        repo.meta_cid = meta_cid;
        Ok(vec![event])
    }

    /// Governed key set a vote targets, after checking the voter may vote
    /// on it. Organization admins may vote on any of their repositories.
    fn governed_for_vote(
        &mut self,
        from: &Address,
        org_id: &OrgId,
        repo_name: Option<&str>,
    ) -> Result<&mut Governed, String> {
        let OrgState {
            governed: admins,
            repos,
            ..
        } = self.orgs.get_mut(org_id).ok_or(ORG_NOT_EXIST)?;
        let is_admin = admins.is_member(from);
        let governed = match repo_name {
            None => {
                admins.prune_votes(&[]);
                admins
            }
            Some(name) => {
                let repo = &mut repos.get_mut(name).ok_or(REPO_NOT_EXIST)?.governed;
                repo.prune_votes(&admins.members);
                repo
            }
        };
        if !is_admin && !governed.is_member(from) {
            return Err(ACCESS_DENIED.into());
        }
        Ok(governed)
    }

    fn vote_key(
        &mut self,
        from: Address,
        org_id: &OrgId,
        repo_name: Option<&str>,
        operation: KeyOperation,
        key: Address,
    ) -> Result<Vec<Emitted>, String> {
        let governed = self.governed_for_vote(&from, org_id, repo_name)?;
        let threshold = governed.threshold;
        let event = |sig_count| VoteKeyEvent {
            org_id: *org_id,
            repo_name: repo_name.map(str::to_string),
            signer: from,
            operation,
            key,
            sig_count,
            threshold,
        };

        match operation {
            KeyOperation::Rotate => {
                if !governed.is_member(&from) {
                    return Err(ACCESS_DENIED.into());
                }
                if governed.is_member(&key) {
                    return Err(KEY_EXISTS.into());
                }
                let emitted = Emitted::encode(&event(1))?;
                for member in governed.members.iter_mut() {
                    if *member == from {
                        *member = key;
                    }
                }
                Ok(vec![emitted])
            }
            KeyOperation::Add | KeyOperation::Revoke => {
                let present = governed.is_member(&key);
                if operation == KeyOperation::Add && present {
                    return Err(KEY_EXISTS.into());
                }
                if operation == KeyOperation::Revoke && !present {
                    return Err(KEY_NOT_EXIST.into());
                }

                let change = PendingChange::Key(operation, key);
                let sig_count = governed.count_vote(&change, &from)?;
                let emitted = Emitted::encode(&event(sig_count))?;

                if sig_count >= governed.required_votes() {
                    governed.votes.remove(&change);
                    if operation == KeyOperation::Add {
                        governed.members.push(key);
                    } else {
                        governed.members.retain(|member| *member != key);
                    }
                } else {
                    governed.record_vote(change, from);
                }
                Ok(vec![emitted])
            }
        }
    }

    fn vote_threshold(
        &mut self,
        from: Address,
        org_id: &OrgId,
        repo_name: Option<&str>,
        threshold: u64,
        block_timestamp: u64,
    ) -> Result<Vec<Emitted>, String> {
        let governed = self.governed_for_vote(&from, org_id, repo_name)?;
        if threshold == governed.threshold {
            return Err(THRESHOLD_UNCHANGED.into());
        }
        if threshold > governed.members.len() as u64 {
            return Err(THRESHOLD_TOO_HIGH.into());
        }

        let change = PendingChange::Threshold(threshold);
        let sig_count = governed.count_vote(&change, &from)?;
        let applies = sig_count >= governed.required_votes();
        let emitted = Emitted::encode(&VoteThresholdEvent {
            org_id: *org_id,
            repo_name: repo_name.map(str::to_string),
            signer: from,
            pending_threshold: threshold,
            sig_count,
            threshold: if applies { threshold } else { governed.threshold },
        })?;

        if applies {
            governed.votes.remove(&change);
            governed.threshold = threshold;
            governed.threshold_date = block_timestamp;
        } else {
            governed.record_vote(change, from);
        }
        Ok(vec![emitted])
    }
}

fn is_valid_repo_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('/') && !name.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::from_bytes([n; 20])
    }

    fn cid(tag: &str) -> Cid {
        Cid::for_content(tag.as_bytes())
    }

    fn org_with_admin(state: &mut RegistryState, admin: Address) -> OrgId {
        let events = state
            .execute(admin, &Call::CreateOrganization { meta_cid: cid("org") }, 100)
            .unwrap();
        OrgCreated::decode(&events[0].data).unwrap().org_id
    }

    fn vote(org_id: OrgId, repo: Option<&str>, operation: KeyOperation, key: Address) -> Call {
        Call::VoteKey {
            org_id,
            repo_name: repo.map(str::to_string),
            operation,
            key,
        }
    }

    fn threshold(org_id: OrgId, repo: Option<&str>, threshold: u64) -> Call {
        Call::VoteThreshold {
            org_id,
            repo_name: repo.map(str::to_string),
            threshold,
        }
    }

    #[test]
    fn create_organization_makes_sender_admin() {
        let mut state = RegistryState::new(1337);
        let org_id = org_with_admin(&mut state, addr(1));

        assert_eq!(org_id, ContentHasher::org_id(1337, 1));
        let org = state.organization(&org_id).unwrap();
        assert_eq!(org.meta_cid, cid("org"));
        assert_eq!(org.threshold, 0);
        assert_eq!(state.organization_members(&org_id), Some(vec![addr(1)]));
    }

    #[test]
    fn organizations_get_distinct_ids() {
        let mut state = RegistryState::new(1337);
        let a = org_with_admin(&mut state, addr(1));
        let b = org_with_admin(&mut state, addr(1));
        assert_ne!(a, b);
    }

    #[test]
    fn missing_entities_are_none() {
        let state = RegistryState::new(1);
        let org_id = OrgId::from_hash([9; 32]);
        assert!(state.organization(&org_id).is_none());
        assert!(state.repository(&org_id, "cli").is_none());
        assert!(state.organization_members(&org_id).is_none());
    }

    #[test]
    fn set_meta_on_missing_org_reverts() {
        let mut state = RegistryState::new(1);
        let err = state
            .execute(
                addr(1),
                &Call::SetOrganizationMeta {
                    org_id: OrgId::from_hash([9; 32]),
                    meta_cid: cid("x"),
                },
                0,
            )
            .unwrap_err();
        assert_eq!(err, ORG_NOT_EXIST);
    }

    #[test]
    fn only_admins_update_org_meta() {
        let mut state = RegistryState::new(1);
        let org_id = org_with_admin(&mut state, addr(1));
        let call = Call::SetOrganizationMeta {
            org_id,
            meta_cid: cid("v2"),
        };
        assert_eq!(state.execute(addr(2), &call, 0).unwrap_err(), ACCESS_DENIED);

        let events = state.execute(addr(1), &call, 0).unwrap();
        assert_eq!(events[0].topic, MetaUpdate::topic());
        assert_eq!(state.organization(&org_id).unwrap().meta_cid, cid("v2"));
    }

    #[test]
    fn repository_lifecycle() {
        let mut state = RegistryState::new(1);
        let org_id = org_with_admin(&mut state, addr(1));
        let create = Call::CreateRepository {
            org_id,
            name: "cli".into(),
            meta_cid: cid("repo"),
        };

        assert_eq!(state.execute(addr(2), &create, 0).unwrap_err(), ACCESS_DENIED);
        state.execute(addr(1), &create, 0).unwrap();
        assert_eq!(state.execute(addr(1), &create, 0).unwrap_err(), REPO_EXISTS);

        let repo = state.repository(&org_id, "cli").unwrap();
        assert_eq!(repo.meta_cid, cid("repo"));
        assert_eq!(repo.latest_release, None);
        assert_eq!(state.repository_members(&org_id, "cli"), Some(vec![addr(1)]));

        let bad = Call::CreateRepository {
            org_id,
            name: String::new(),
            meta_cid: cid("repo"),
        };
        assert_eq!(state.execute(addr(1), &bad, 0).unwrap_err(), INVALID_REPO_NAME);
    }

    #[test]
    fn repository_developers_may_update_meta() {
        let mut state = RegistryState::new(1);
        let org_id = org_with_admin(&mut state, addr(1));
        state
            .execute(
                addr(1),
                &Call::CreateRepository {
                    org_id,
                    name: "cli".into(),
                    meta_cid: cid("repo"),
                },
                0,
            )
            .unwrap();
        state
            .execute(addr(1), &vote(org_id, Some("cli"), KeyOperation::Add, addr(3)), 0)
            .unwrap();

        let update = Call::SetRepositoryMeta {
            org_id,
            name: "cli".into(),
            meta_cid: cid("repo-v2"),
        };
        state.execute(addr(3), &update, 0).unwrap();
        assert_eq!(state.repository(&org_id, "cli").unwrap().meta_cid, cid("repo-v2"));
        assert_eq!(state.execute(addr(4), &update, 0).unwrap_err(), ACCESS_DENIED);

        let missing = Call::SetRepositoryMeta {
            org_id,
            name: "nope".into(),
            meta_cid: cid("x"),
        };
        assert_eq!(state.execute(addr(1), &missing, 0).unwrap_err(), REPO_NOT_EXIST);
    }

    #[test]
    fn key_vote_applies_immediately_below_threshold_one() {
        let mut state = RegistryState::new(1);
        let org_id = org_with_admin(&mut state, addr(1));
        let events = state
            .execute(addr(1), &vote(org_id, None, KeyOperation::Add, addr(2)), 0)
            .unwrap();

        let event = VoteKeyEvent::decode(&events[0].data).unwrap();
        assert_eq!(event.sig_count, 1);
        assert!(event.is_applied());
        assert_eq!(
            state.organization_members(&org_id),
            Some(vec![addr(1), addr(2)])
        );
        assert_eq!(
            state
                .execute(addr(1), &vote(org_id, None, KeyOperation::Add, addr(2)), 0)
                .unwrap_err(),
            KEY_EXISTS
        );
    }

    #[test]
    fn threshold_two_needs_two_distinct_votes() {
        let mut state = RegistryState::new(1);
        let org_id = org_with_admin(&mut state, addr(1));
        state
            .execute(addr(1), &vote(org_id, None, KeyOperation::Add, addr(2)), 0)
            .unwrap();
        state.execute(addr(1), &threshold(org_id, None, 2), 500).unwrap();
        let org = state.organization(&org_id).unwrap();
        assert_eq!(org.threshold, 2);
        assert_eq!(org.threshold_date, 500);

        let add = vote(org_id, None, KeyOperation::Add, addr(3));
        let first = state.execute(addr(1), &add, 0).unwrap();
        let first = VoteKeyEvent::decode(&first[0].data).unwrap();
        assert_eq!((first.sig_count, first.threshold), (1, 2));
        assert!(!first.is_applied());
        assert_eq!(state.execute(addr(1), &add, 0).unwrap_err(), ALREADY_VOTED);
        assert_eq!(state.organization_members(&org_id).unwrap().len(), 2);

        let second = state.execute(addr(2), &add, 0).unwrap();
        assert!(VoteKeyEvent::decode(&second[0].data).unwrap().is_applied());
        assert!(state.organization_members(&org_id).unwrap().contains(&addr(3)));
    }

    #[test]
    fn threshold_vote_validation() {
        let mut state = RegistryState::new(1);
        let org_id = org_with_admin(&mut state, addr(1));
        assert_eq!(
            state.execute(addr(1), &threshold(org_id, None, 0), 0).unwrap_err(),
            THRESHOLD_UNCHANGED
        );
        assert_eq!(
            state.execute(addr(1), &threshold(org_id, None, 2), 0).unwrap_err(),
            THRESHOLD_TOO_HIGH
        );
        assert_eq!(
            state.execute(addr(9), &threshold(org_id, None, 1), 0).unwrap_err(),
            ACCESS_DENIED
        );
    }

    #[test]
    fn pending_threshold_vote_reports_current_threshold() {
        let mut state = RegistryState::new(1);
        let org_id = org_with_admin(&mut state, addr(1));
        state
            .execute(addr(1), &vote(org_id, None, KeyOperation::Add, addr(2)), 0)
            .unwrap();
        state.execute(addr(1), &threshold(org_id, None, 2), 0).unwrap();

        let events = state.execute(addr(1), &threshold(org_id, None, 1), 0).unwrap();
        let event = VoteThresholdEvent::decode(&events[0].data).unwrap();
        assert_eq!(event.pending_threshold, 1);
        assert_eq!(event.threshold, 2);
        assert!(!event.is_applied());
        assert_eq!(
            state.execute(addr(1), &threshold(org_id, None, 1), 0).unwrap_err(),
            ALREADY_VOTED
        );
    }

    #[test]
    fn rotate_replaces_own_key() {
        let mut state = RegistryState::new(1);
        let org_id = org_with_admin(&mut state, addr(1));
        let events = state
            .execute(addr(1), &vote(org_id, None, KeyOperation::Rotate, addr(5)), 0)
            .unwrap();
        assert!(VoteKeyEvent::decode(&events[0].data).unwrap().is_applied());
        assert_eq!(state.organization_members(&org_id), Some(vec![addr(5)]));
    }

    #[test]
    fn revoked_member_votes_stop_counting() {
        let mut state = RegistryState::new(1);
        let org_id = org_with_admin(&mut state, addr(1));
        for member in [addr(2), addr(3)] {
            state
                .execute(addr(1), &vote(org_id, None, KeyOperation::Add, member), 0)
                .unwrap();
        }
        state.execute(addr(1), &threshold(org_id, None, 2), 0).unwrap();

        let add = vote(org_id, None, KeyOperation::Add, addr(9));
        state.execute(addr(2), &add, 0).unwrap();

        let revoke = vote(org_id, None, KeyOperation::Revoke, addr(2));
        state.execute(addr(1), &revoke, 0).unwrap();
        state.execute(addr(3), &revoke, 0).unwrap();
        assert_eq!(state.organization_members(&org_id), Some(vec![addr(1), addr(3)]));

        let events = state.execute(addr(1), &add, 0).unwrap();
        let event = VoteKeyEvent::decode(&events[0].data).unwrap();
        assert_eq!(event.sig_count, 1);
        assert!(!event.is_applied());
        assert!(!state.organization_members(&org_id).unwrap().contains(&addr(9)));
    }

    #[test]
    fn rotated_key_votes_stop_counting() {
        let mut state = RegistryState::new(1);
        let org_id = org_with_admin(&mut state, addr(1));
        state
            .execute(addr(1), &vote(org_id, None, KeyOperation::Add, addr(2)), 0)
            .unwrap();
        state.execute(addr(1), &threshold(org_id, None, 2), 0).unwrap();

        let add = vote(org_id, None, KeyOperation::Add, addr(9));
        state.execute(addr(2), &add, 0).unwrap();
        state
            .execute(addr(2), &vote(org_id, None, KeyOperation::Rotate, addr(4)), 0)
            .unwrap();

        let events = state.execute(addr(1), &add, 0).unwrap();
        assert_eq!(VoteKeyEvent::decode(&events[0].data).unwrap().sig_count, 1);

        let events = state.execute(addr(4), &add, 0).unwrap();
        assert!(VoteKeyEvent::decode(&events[0].data).unwrap().is_applied());
    }

    #[test]
    fn revoke_requires_existing_key() {
        let mut state = RegistryState::new(1);
        let org_id = org_with_admin(&mut state, addr(1));
        assert_eq!(
            state
                .execute(addr(1), &vote(org_id, None, KeyOperation::Revoke, addr(2)), 0)
                .unwrap_err(),
            KEY_NOT_EXIST
        );
    }

    #[test]
    fn org_admin_governs_repository_keys() {
        let mut state = RegistryState::new(1);
        let org_id = org_with_admin(&mut state, addr(1));
        state
            .execute(addr(1), &vote(org_id, None, KeyOperation::Add, addr(2)), 0)
            .unwrap();
        state
            .execute(
                addr(2),
                &Call::CreateRepository {
                    org_id,
                    name: "cli".into(),
                    meta_cid: cid("repo"),
                },
                0,
            )
            .unwrap();
        assert_eq!(state.repository_members(&org_id, "cli"), Some(vec![addr(2)]));

        state
            .execute(addr(1), &vote(org_id, Some("cli"), KeyOperation::Add, addr(7)), 0)
            .unwrap();
        assert_eq!(
            state.repository_members(&org_id, "cli"),
            Some(vec![addr(2), addr(7)])
        );
        assert_eq!(
            state
                .execute(addr(1), &vote(org_id, Some("nope"), KeyOperation::Add, addr(7)), 0)
                .unwrap_err(),
            REPO_NOT_EXIST
        );
    }
}
