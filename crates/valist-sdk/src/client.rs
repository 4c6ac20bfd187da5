use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};
use valist_ledger::{
    CallContext, ContractEvent, Ledger, LogFilter, MetaUpdate, OrgCreated, RepoCreated, TxStatus,
    VoteKeyEvent, VoteThresholdEvent,
};
use valist_store::ContentStore;
use valist_types::{
    Address, Cid, KeyOperation, OrgId, Organization, OrganizationMeta, Repository,
    RepositoryMeta, Scope, TxHash,
};

use crate::account::TransactionSigner;
use crate::cache::{InMemoryRecordCache, RecordCache};
use crate::config::ClientConfig;
use crate::error::{SdkError, SdkResult};
use crate::events::{EventDecoder, RegistryEvent};
use crate::governance::GovernanceCoordinator;
use crate::orchestrator::{Confirmed, Operation, TransactionOrchestrator};

/// Entry point for applications using the registry.
///
/// Reads go through the optional record cache to the ledger and content
/// store. Writes run through the [`TransactionOrchestrator`] and take the
/// signer and call context explicitly.
pub struct Client {
    ledger: Arc<dyn Ledger>,
    store: Arc<dyn ContentStore>,
    cache: Option<Arc<dyn RecordCache>>,
    orchestrator: TransactionOrchestrator,
    governance: GovernanceCoordinator,
    config: ClientConfig,
}

impl Client {
    /// Build a client over `ledger` and `store`.
    ///
    /// Fails with `Config` if the configuration is invalid or names a
    /// different chain than the ledger serves.
    pub async fn connect(
        ledger: Arc<dyn Ledger>,
        store: Arc<dyn ContentStore>,
        config: ClientConfig,
    ) -> SdkResult<Self> {
        config.validate()?;
        let chain_id = ledger.chain_id().await?;
        if let Some(expected) = config.chain_id {
            if expected != chain_id {
                return Err(SdkError::Config(format!(
                    "expected chain {expected}, ledger serves chain {chain_id}"
                )));
            }
        }

        let cache = config.cache.enabled.then(|| {
            Arc::new(InMemoryRecordCache::new(config.record_ttl())) as Arc<dyn RecordCache>
        });
        let orchestrator =
            TransactionOrchestrator::new(ledger.clone(), store.clone(), chain_id, &config);
        info!(chain_id, cache = cache.is_some(), "registry client ready");

        Ok(Self {
            ledger,
            store,
            cache,
            governance: GovernanceCoordinator::new(orchestrator.clone()),
            orchestrator,
            config,
        })
    }

    /// Replace the record cache.
    pub fn with_cache(mut self, cache: Arc<dyn RecordCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.cache = None;
        self
    }

    pub fn chain_id(&self) -> u64 {
        self.orchestrator.chain_id()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn orchestrator(&self) -> &TransactionOrchestrator {
        &self.orchestrator
    }

    pub fn governance(&self) -> &GovernanceCoordinator {
        &self.governance
    }

    // ---- Organizations ----

    #[instrument(skip_all, fields(org = %org_id.short_hex()))]
    pub async fn get_organization(&self, org_id: &OrgId) -> SdkResult<Organization> {
        if let Some(org) = self.cache.as_ref().and_then(|c| c.organization(org_id)) {
            return Ok(org);
        }
        let org = self
            .ledger
            .organization(org_id)
            .await?
            .ok_or(SdkError::OrganizationNotExist(*org_id))?;
        if let Some(cache) = &self.cache {
            cache.put_organization(org.clone());
        }
        Ok(org)
    }

    #[instrument(skip_all, fields(cid = %cid.short_hex()))]
    pub async fn get_organization_meta(&self, cid: &Cid) -> SdkResult<OrganizationMeta> {
        self.fetch_meta(cid).await
    }

    #[instrument(skip_all, fields(name = %meta.name))]
    pub async fn create_organization(
        &self,
        signer: &dyn TransactionSigner,
        meta: OrganizationMeta,
        ctx: &CallContext,
    ) -> SdkResult<Confirmed<OrgCreated>> {
        self.orchestrator
            .execute(signer, Operation::CreateOrganization { meta }, ctx)
            .await
    }

    #[instrument(skip_all, fields(org = %org_id.short_hex()))]
    pub async fn set_organization_meta(
        &self,
        signer: &dyn TransactionSigner,
        org_id: OrgId,
        meta: OrganizationMeta,
        ctx: &CallContext,
    ) -> SdkResult<Confirmed<MetaUpdate>> {
        let result = self
            .orchestrator
            .execute(signer, Operation::SetOrganizationMeta { org_id, meta }, ctx)
            .await;
        self.invalidate(&org_id, None);
        result
    }

    #[instrument(skip_all, fields(org = %org_id.short_hex(), operation = %operation, key = %key))]
    pub async fn vote_organization_admin(
        &self,
        signer: &dyn TransactionSigner,
        org_id: OrgId,
        operation: KeyOperation,
        key: Address,
        ctx: &CallContext,
    ) -> SdkResult<Confirmed<VoteKeyEvent>> {
        let result = self
            .governance
            .vote_admin(signer, org_id, Scope::Organization, operation, key, ctx)
            .await;
        self.invalidate(&org_id, None);
        result
    }

    #[instrument(skip_all, fields(org = %org_id.short_hex(), threshold = threshold))]
    pub async fn vote_organization_threshold(
        &self,
        signer: &dyn TransactionSigner,
        org_id: OrgId,
        threshold: u64,
        ctx: &CallContext,
    ) -> SdkResult<Confirmed<VoteThresholdEvent>> {
        let result = self
            .governance
            .vote_threshold(signer, org_id, Scope::Organization, threshold, ctx)
            .await;
        self.invalidate(&org_id, None);
        result
    }

    #[instrument(skip_all, fields(org = %org_id.short_hex()))]
    pub async fn organization_members(&self, org_id: &OrgId) -> SdkResult<Vec<Address>> {
        self.ledger
            .organization_members(org_id)
            .await?
            .ok_or(SdkError::OrganizationNotExist(*org_id))
    }

    // ---- Repositories ----

    #[instrument(skip_all, fields(org = %org_id.short_hex(), repo = name))]
    pub async fn get_repository(&self, org_id: &OrgId, name: &str) -> SdkResult<Repository> {
        self.lookup_repository(org_id, name)
            .await?
            .ok_or_else(|| SdkError::RepositoryNotExist {
                org_id: *org_id,
                name: name.to_string(),
            })
    }

    #[instrument(skip_all, fields(cid = %cid.short_hex()))]
    pub async fn get_repository_meta(&self, cid: &Cid) -> SdkResult<RepositoryMeta> {
        self.fetch_meta(cid).await
    }

    /// Create a repository under `org_id`.
    ///
    /// The organization must exist and the name must be free; both are
    /// checked against the ledger before anything is stored or submitted.
    #[instrument(skip_all, fields(org = %org_id.short_hex(), repo = %name))]
    pub async fn create_repository(
        &self,
        signer: &dyn TransactionSigner,
        org_id: OrgId,
        name: String,
        meta: RepositoryMeta,
        ctx: &CallContext,
    ) -> SdkResult<Confirmed<RepoCreated>> {
        self.get_organization(&org_id).await?;
        if self.lookup_repository(&org_id, &name).await?.is_some() {
            debug!("repository name already taken");
            return Err(SdkError::RepositoryAlreadyExists { org_id, name });
        }
        self.orchestrator
            .execute(signer, Operation::CreateRepository { org_id, name, meta }, ctx)
            .await
    }

    #[instrument(skip_all, fields(org = %org_id.short_hex(), repo = %name))]
    pub async fn set_repository_meta(
        &self,
        signer: &dyn TransactionSigner,
        org_id: OrgId,
        name: String,
        meta: RepositoryMeta,
        ctx: &CallContext,
    ) -> SdkResult<Confirmed<MetaUpdate>> {
        let op = Operation::SetRepositoryMeta {
            org_id,
            name: name.clone(),
            meta,
        };
        let result = self.orchestrator.execute(signer, op, ctx).await;
        self.invalidate(&org_id, Some(&name));
        result
    }

    #[instrument(skip_all, fields(org = %org_id.short_hex(), repo = %name, operation = %operation, key = %key))]
    pub async fn vote_repository_developer(
        &self,
        signer: &dyn TransactionSigner,
        org_id: OrgId,
        name: String,
        operation: KeyOperation,
        key: Address,
        ctx: &CallContext,
    ) -> SdkResult<Confirmed<VoteKeyEvent>> {
        let scope = Scope::repository(name.clone());
        let result = self
            .governance
            .vote_admin(signer, org_id, scope, operation, key, ctx)
            .await;
        self.invalidate(&org_id, Some(&name));
        result
    }

    #[instrument(skip_all, fields(org = %org_id.short_hex(), repo = %name, threshold = threshold))]
    pub async fn vote_repository_threshold(
        &self,
        signer: &dyn TransactionSigner,
        org_id: OrgId,
        name: String,
        threshold: u64,
        ctx: &CallContext,
    ) -> SdkResult<Confirmed<VoteThresholdEvent>> {
        let scope = Scope::repository(name.clone());
        let result = self
            .governance
            .vote_threshold(signer, org_id, scope, threshold, ctx)
            .await;
        self.invalidate(&org_id, Some(&name));
        result
    }

    #[instrument(skip_all, fields(org = %org_id.short_hex(), repo = name))]
    pub async fn repository_members(&self, org_id: &OrgId, name: &str) -> SdkResult<Vec<Address>> {
        self.ledger
            .repository_members(org_id, name)
            .await?
            .ok_or_else(|| SdkError::RepositoryNotExist {
                org_id: *org_id,
                name: name.to_string(),
            })
    }

    // ---- History and status ----

    /// Every vote recorded for `scope` of `org_id`, oldest first.
    #[instrument(skip_all, fields(org = %org_id.short_hex(), repo = scope.repo_name()))]
    pub async fn vote_history(&self, org_id: &OrgId, scope: &Scope) -> SdkResult<Vec<RegistryEvent>> {
        let filter = LogFilter::for_org(*org_id)
            .with_topic(VoteKeyEvent::topic())
            .with_topic(VoteThresholdEvent::topic());
        let logs = self.ledger.logs(&filter).await?;

        let mut votes = Vec::with_capacity(logs.len());
        for log in &logs {
            let event = EventDecoder::decode_log(log)?;
            if event.repo_name() == scope.repo_name() {
                votes.push(event);
            }
        }
        Ok(votes)
    }

    /// What the ledger knows about a previously submitted transaction.
    /// Use after `ConfirmationTimeout` before deciding to retry.
    pub async fn transaction_status(&self, tx_hash: &TxHash) -> SdkResult<TxStatus> {
        Ok(self.ledger.transaction_status(tx_hash).await?)
    }

    /// Confirmed nonce of `address`.
    pub async fn next_nonce(&self, address: &Address) -> SdkResult<u64> {
        Ok(self.ledger.next_nonce(address).await?)
    }

    // ---- Internal ----

    async fn lookup_repository(&self, org_id: &OrgId, name: &str) -> SdkResult<Option<Repository>> {
        if let Some(repo) = self.cache.as_ref().and_then(|c| c.repository(org_id, name)) {
            return Ok(Some(repo));
        }
        let repo = self.ledger.repository(org_id, name).await?;
        if let (Some(cache), Some(repo)) = (&self.cache, &repo) {
            cache.put_repository(repo.clone());
        }
        Ok(repo)
    }

    async fn fetch_meta<T: DeserializeOwned>(&self, cid: &Cid) -> SdkResult<T> {
        let cached = self.cache.as_ref().and_then(|c| c.meta(cid));
        let bytes = match cached {
            Some(bytes) => bytes,
            None => self.store.get(cid).await?,
        };
        let meta = serde_json::from_slice(&bytes).map_err(|e| SdkError::MetaCorrupt {
            cid: *cid,
            reason: e.to_string(),
        })?;
        if let Some(cache) = &self.cache {
            cache.put_meta(*cid, bytes);
        }
        Ok(meta)
    }

    fn invalidate(&self, org_id: &OrgId, repo_name: Option<&str>) {
        let Some(cache) = &self.cache else {
            return;
        };
        match repo_name {
            None => cache.invalidate_organization(org_id),
            Some(name) => cache.invalidate_repository(org_id, name),
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("chain_id", &self.chain_id())
            .field("cached", &self.cache.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
