//! Typed extraction of registry events from receipts and logs.

use tracing::error;
use valist_ledger::{
    ContractEvent, LedgerError, LedgerResult, Log, MetaUpdate, OrgCreated, Receipt, RepoCreated,
    VoteKeyEvent, VoteThresholdEvent,
};
use valist_types::{EventTopic, OperationKind, OrgId};

use crate::error::{SdkError, SdkResult};

/// Any registry event, tagged by kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryEvent {
    OrgCreated(OrgCreated),
    RepoCreated(RepoCreated),
    MetaUpdate(MetaUpdate),
    VoteKey(VoteKeyEvent),
    VoteThreshold(VoteThresholdEvent),
}

impl RegistryEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OrgCreated(_) => OrgCreated::NAME,
            Self::RepoCreated(_) => RepoCreated::NAME,
            Self::MetaUpdate(_) => MetaUpdate::NAME,
            Self::VoteKey(_) => VoteKeyEvent::NAME,
            Self::VoteThreshold(_) => VoteThresholdEvent::NAME,
        }
    }

    pub fn org_id(&self) -> OrgId {
        match self {
            Self::OrgCreated(e) => e.org_id,
            Self::RepoCreated(e) => e.org_id,
            Self::MetaUpdate(e) => e.org_id,
            Self::VoteKey(e) => e.org_id,
            Self::VoteThreshold(e) => e.org_id,
        }
    }

    /// Repository the event concerns, `None` for organization scope.
    pub fn repo_name(&self) -> Option<&str> {
        match self {
            Self::OrgCreated(_) => None,
            Self::RepoCreated(e) => Some(&e.repo_name),
            Self::MetaUpdate(e) => e.repo_name.as_deref(),
            Self::VoteKey(e) => e.repo_name.as_deref(),
            Self::VoteThreshold(e) => e.repo_name.as_deref(),
        }
    }
}

/// Stateless decoder from raw logs to typed events.
pub struct EventDecoder;

impl EventDecoder {
    /// Name of the registry event identified by `topic`, if any.
    pub fn event_name(topic: &EventTopic) -> Option<&'static str> {
        [
            (OrgCreated::topic(), OrgCreated::NAME),
            (RepoCreated::topic(), RepoCreated::NAME),
            (MetaUpdate::topic(), MetaUpdate::NAME),
            (VoteKeyEvent::topic(), VoteKeyEvent::NAME),
            (VoteThresholdEvent::topic(), VoteThresholdEvent::NAME),
        ]
        .into_iter()
        .find_map(|(t, name)| (t == *topic).then_some(name))
    }

    /// Decode one log, dispatching on its topic.
    pub fn decode_log(log: &Log) -> LedgerResult<RegistryEvent> {
        let topic = log.topic;
        if topic == OrgCreated::topic() {
            OrgCreated::decode(&log.data).map(RegistryEvent::OrgCreated)
        } else if topic == RepoCreated::topic() {
            RepoCreated::decode(&log.data).map(RegistryEvent::RepoCreated)
        } else if topic == MetaUpdate::topic() {
            MetaUpdate::decode(&log.data).map(RegistryEvent::MetaUpdate)
        } else if topic == VoteKeyEvent::topic() {
            VoteKeyEvent::decode(&log.data).map(RegistryEvent::VoteKey)
        } else if topic == VoteThresholdEvent::topic() {
            VoteThresholdEvent::decode(&log.data).map(RegistryEvent::VoteThreshold)
        } else {
            Err(LedgerError::Encoding(format!(
                "unknown event topic {}",
                topic.short_hex()
            )))
        }
    }

    /// Decode every log of a receipt.
    pub fn decode_receipt(receipt: &Receipt) -> LedgerResult<Vec<RegistryEvent>> {
        receipt.logs.iter().map(Self::decode_log).collect()
    }

    /// Extract the single `E` event a confirmed `op` must have emitted.
    ///
    /// Zero matches, several matches, or an undecodable payload all fail
    /// with `UnexpectedEventShape`.
    pub fn decode_single<E: ContractEvent>(op: OperationKind, receipt: &Receipt) -> SdkResult<E> {
        let matches: Vec<&Log> = receipt.logs_with_topic(&E::topic()).collect();
        let result = match matches.as_slice() {
            [log] => E::decode(&log.data).map_err(|e| format!("undecodable payload ({e})")),
            [] => Err(describe_logs(&receipt.logs)),
            many => Err(format!("{} {} events", many.len(), E::NAME)),
        };

        result.map_err(|found| {
            error!(
                %op,
                tx = %receipt.tx_hash.short_hex(),
                expected = E::NAME,
                %found,
                "receipt does not match the expected event shape"
            );
            SdkError::UnexpectedEventShape {
                op,
                expected: E::NAME,
                found,
            }
        })
    }
}

fn describe_logs(logs: &[Log]) -> String {
    if logs.is_empty() {
        return "no logs".into();
    }
    let names: Vec<String> = logs
        .iter()
        .map(|log| match EventDecoder::event_name(&log.topic) {
            Some(name) => name.to_string(),
            None => format!("unknown({})", log.topic.short_hex()),
        })
        .collect();
    names.join(", ")
}

#[cfg(test)]
mod tests {
    use valist_ledger::ReceiptStatus;
    use valist_types::{Address, Cid, KeyOperation, TxHash};

    use super::*;

    fn log_for<E: ContractEvent>(event: &E, index: u32) -> Log {
        Log {
            tx_hash: TxHash::from_hash([1; 32]),
            block_number: 1,
            log_index: index,
            topic: E::topic(),
            org_id: event.org_id(),
            data: event.encode().unwrap(),
        }
    }

    fn receipt(logs: Vec<Log>) -> Receipt {
        Receipt {
            tx_hash: TxHash::from_hash([1; 32]),
            block_number: 1,
            block_timestamp: 0,
            status: ReceiptStatus::Success,
            logs,
        }
    }

    fn org_created() -> OrgCreated {
        OrgCreated {
            org_id: OrgId::from_hash([2; 32]),
            meta_cid: Cid::for_content(b"meta"),
            admin: Address::from_bytes([3; 20]),
        }
    }

    fn meta_update() -> MetaUpdate {
        MetaUpdate {
            org_id: OrgId::from_hash([2; 32]),
            repo_name: Some("cli".into()),
            signer: Address::from_bytes([3; 20]),
            meta_cid: Cid::for_content(b"v2"),
        }
    }

    #[test]
    fn single_event_is_extracted() {
        let event = org_created();
        let receipt = receipt(vec![log_for(&event, 0)]);
        let decoded: OrgCreated =
            EventDecoder::decode_single(OperationKind::CreateOrganization, &receipt).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn missing_event_names_what_was_found() {
        let receipt = receipt(vec![log_for(&meta_update(), 0)]);
        let err = EventDecoder::decode_single::<OrgCreated>(OperationKind::CreateOrganization, &receipt)
            .unwrap_err();
        match err {
            SdkError::UnexpectedEventShape {
                op,
                expected,
                found,
            } => {
                assert_eq!(op, OperationKind::CreateOrganization);
                assert_eq!(expected, "OrgCreated");
                assert_eq!(found, "MetaUpdate");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_receipt_is_unexpected() {
        let err = EventDecoder::decode_single::<RepoCreated>(
            OperationKind::CreateRepository,
            &receipt(vec![]),
        )
        .unwrap_err();
        assert!(matches!(err, SdkError::UnexpectedEventShape { ref found, .. } if found == "no logs"));
    }

    #[test]
    fn duplicate_events_are_unexpected() {
        let event = org_created();
        let receipt = receipt(vec![log_for(&event, 0), log_for(&event, 1)]);
        let err = EventDecoder::decode_single::<OrgCreated>(OperationKind::CreateOrganization, &receipt)
            .unwrap_err();
        assert!(matches!(err, SdkError::UnexpectedEventShape { .. }));
    }

    #[test]
    fn garbage_payload_is_unexpected() {
        let mut log = log_for(&org_created(), 0);
        log.data = vec![1, 2, 3];
        let err = EventDecoder::decode_single::<OrgCreated>(
            OperationKind::CreateOrganization,
            &receipt(vec![log]),
        )
        .unwrap_err();
        assert!(matches!(err, SdkError::UnexpectedEventShape { ref found, .. } if found.contains("undecodable")));
    }

    #[test]
    fn logs_decode_to_tagged_variants() {
        let vote = VoteKeyEvent {
            org_id: OrgId::from_hash([2; 32]),
            repo_name: None,
            signer: Address::from_bytes([3; 20]),
            operation: KeyOperation::Add,
            key: Address::from_bytes([4; 20]),
            sig_count: 1,
            threshold: 0,
        };
        let receipt = receipt(vec![log_for(&meta_update(), 0), log_for(&vote, 1)]);
        let events = EventDecoder::decode_receipt(&receipt).unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name(), "MetaUpdate");
        assert_eq!(events[0].repo_name(), Some("cli"));
        assert_eq!(events[1], RegistryEvent::VoteKey(vote));
        assert_eq!(events[1].repo_name(), None);
    }

    #[test]
    fn unknown_topic_fails_to_decode() {
        let mut log = log_for(&org_created(), 0);
        log.topic = EventTopic::from_hash([0xee; 32]);
        assert!(EventDecoder::decode_log(&log).is_err());
        assert_eq!(EventDecoder::event_name(&log.topic), None);
        assert_eq!(
            EventDecoder::event_name(&OrgCreated::topic()),
            Some("OrgCreated")
        );
    }
}
