use chrono::{DateTime, Utc};
use multisig_types::Pubkey;
use serde::{Deserialize, Serialize};

/// State transitions the gate reports after they are committed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MultisigEvent {
    MultisigCreated {
        multisig: Pubkey,
        creator: Pubkey,
        owners: usize,
        threshold: u64,
    },
    TransactionProposed {
        multisig: Pubkey,
        transaction: Pubkey,
        proposer: Pubkey,
        sequence: u64,
    },
    TransactionApproved {
        multisig: Pubkey,
        transaction: Pubkey,
        approver: Pubkey,
        approvals: usize,
        threshold: u64,
    },
    ApprovalRemoved {
        multisig: Pubkey,
        transaction: Pubkey,
        remover: Pubkey,
        approvals: usize,
    },
    TransactionExecuted {
        multisig: Pubkey,
        transaction: Pubkey,
        executor: Pubkey,
        sequence: u64,
        receipt_id: uuid::Uuid,
    },
}

/// Discriminant of [`MultisigEvent`], for filtering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    MultisigCreated,
    TransactionProposed,
    TransactionApproved,
    ApprovalRemoved,
    TransactionExecuted,
}

impl MultisigEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            MultisigEvent::MultisigCreated { .. } => EventKind::MultisigCreated,
            MultisigEvent::TransactionProposed { .. } => EventKind::TransactionProposed,
            MultisigEvent::TransactionApproved { .. } => EventKind::TransactionApproved,
            MultisigEvent::ApprovalRemoved { .. } => EventKind::ApprovalRemoved,
            MultisigEvent::TransactionExecuted { .. } => EventKind::TransactionExecuted,
        }
    }

    pub fn multisig(&self) -> &Pubkey {
        match self {
            MultisigEvent::MultisigCreated { multisig, .. }
            | MultisigEvent::TransactionProposed { multisig, .. }
            | MultisigEvent::TransactionApproved { multisig, .. }
            | MultisigEvent::ApprovalRemoved { multisig, .. }
            | MultisigEvent::TransactionExecuted { multisig, .. } => multisig,
        }
    }

    pub fn transaction(&self) -> Option<&Pubkey> {
        match self {
            MultisigEvent::MultisigCreated { .. } => None,
            MultisigEvent::TransactionProposed { transaction, .. }
            | MultisigEvent::TransactionApproved { transaction, .. }
            | MultisigEvent::ApprovalRemoved { transaction, .. }
            | MultisigEvent::TransactionExecuted { transaction, .. } => Some(transaction),
        }
    }
}

/// An event with its position in the log and the time it was recorded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub position: u64,
    pub recorded_at: DateTime<Utc>,
    pub event: MultisigEvent,
}

/// Filter for querying the event log.
#[derive(Clone, Debug, Default)]
pub struct EventFilter {
    pub multisig: Option<Pubkey>,
    pub transaction: Option<Pubkey>,
    pub kind: Option<EventKind>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_multisig(mut self, multisig: Pubkey) -> Self {
        self.multisig = Some(multisig);
        self
    }

    pub fn with_transaction(mut self, transaction: Pubkey) -> Self {
        self.transaction = Some(transaction);
        self
    }

    pub fn with_kind(mut self, kind: EventKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn matches(&self, recorded: &RecordedEvent) -> bool {
        let event = &recorded.event;

        if let Some(ref multisig) = self.multisig {
            if event.multisig() != multisig {
                return false;
            }
        }

        if let Some(ref transaction) = self.transaction {
            if event.transaction() != Some(transaction) {
                return false;
            }
        }

        if let Some(kind) = self.kind {
            if event.kind() != kind {
                return false;
            }
        }

        true
    }
}

/// Append-only log of committed state transitions.
///
/// No delete or modify operations exist. Rejected operations never reach
/// the log.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    entries: Vec<RecordedEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, event: MultisigEvent) -> &RecordedEvent {
        let position = self.entries.len() as u64;
        self.entries.push(RecordedEvent {
            position,
            recorded_at: Utc::now(),
            event,
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn query(&self, filter: &EventFilter) -> Vec<&RecordedEvent> {
        self.entries.iter().filter(|e| filter.matches(e)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecordedEvent> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&RecordedEvent> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
