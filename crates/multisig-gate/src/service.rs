use std::sync::Arc;

use multisig_types::{Pubkey, TransactionPayload};
use tokio::sync::Mutex;

use crate::caller::Caller;
use crate::engine::MultisigEngine;
use crate::error::{ExecutionError, MultisigError};
use crate::events::{EventFilter, RecordedEvent};
use crate::execution::{ExecutionReceipt, ResourceRef};
use crate::registry::MultisigRegistry;
use crate::transaction::TransactionRecord;

/// Shareable handle to a [`MultisigEngine`].
///
/// Operations on the engine are serialized behind an async mutex, so
/// concurrent callers observe each operation as one atomic step. The lock is
/// held across the executor call: no other operation can interleave between
/// the quorum check and marking the record executed. Execution runs on its
/// own task, so a caller that gives up waiting cannot leave an applied batch
/// unrecorded.
#[derive(Clone)]
pub struct MultisigService {
    engine: Arc<Mutex<MultisigEngine>>,
}

impl MultisigService {
    pub fn new(engine: MultisigEngine) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
        }
    }

    pub async fn create_multisig(
        &self,
        caller: Caller,
        owners: Vec<Pubkey>,
        threshold: u64,
    ) -> Result<Pubkey, MultisigError> {
        self.engine
            .lock()
            .await
            .create_multisig(&caller, owners, threshold)
    }

    pub async fn propose_transaction(
        &self,
        caller: Caller,
        multisig: Pubkey,
        payload: TransactionPayload,
    ) -> Result<Pubkey, MultisigError> {
        self.engine
            .lock()
            .await
            .propose_transaction(&caller, &multisig, payload)
    }

    pub async fn approve_transaction(
        &self,
        caller: Caller,
        multisig: Pubkey,
        transaction: Pubkey,
    ) -> Result<(), MultisigError> {
        self.engine
            .lock()
            .await
            .approve_transaction(&caller, &multisig, &transaction)
    }

    pub async fn remove_approval(
        &self,
        caller: Caller,
        multisig: Pubkey,
        transaction: Pubkey,
    ) -> Result<(), MultisigError> {
        self.engine
            .lock()
            .await
            .remove_approval(&caller, &multisig, &transaction)
    }

    /// Execute on a detached task that owns the engine lock.
    ///
    /// Dropping the returned future does not cancel the execution: the task
    /// still runs to completion and marks the record executed.
    pub async fn execute_transaction(
        &self,
        caller: Caller,
        multisig: Pubkey,
        transaction: Pubkey,
        resources: Vec<ResourceRef>,
    ) -> Result<ExecutionReceipt, MultisigError> {
        let mut engine = Arc::clone(&self.engine).lock_owned().await;
        let task = tokio::spawn(async move {
            engine
                .execute_transaction(&caller, &multisig, &transaction, &resources)
                .await
        });

        task.await
            .map_err(|err| ExecutionError::Unavailable(format!("execution task failed: {err}")))?
    }

    pub async fn registry(&self, multisig: Pubkey) -> Option<MultisigRegistry> {
        self.engine.lock().await.registry(&multisig).cloned()
    }

    pub async fn transaction(&self, transaction: Pubkey) -> Option<TransactionRecord> {
        self.engine.lock().await.transaction(&transaction).cloned()
    }

    pub async fn events(&self, filter: EventFilter) -> Vec<RecordedEvent> {
        self.engine
            .lock()
            .await
            .query_events(&filter)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Serialized store contents, see [`crate::AccountStore::snapshot`].
    pub async fn snapshot(&self) -> Result<Vec<u8>, serde_json::Error> {
        self.engine.lock().await.store().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use multisig_types::{AccountRef, Action};

    use super::*;
    use crate::config::EngineConfig;
    use crate::execution::AuthorizedBatch;
    use crate::mocks::RecordingExecutor;
    use crate::traits::ActionExecutor;

    /// Applies its effect immediately, then takes a while to report back.
    #[derive(Default)]
    struct SlowExecutor {
        effects: AtomicUsize,
    }

    #[async_trait]
    impl ActionExecutor for SlowExecutor {
        async fn execute(
            &self,
            batch: &AuthorizedBatch,
            _resources: &[ResourceRef],
        ) -> Result<ExecutionReceipt, ExecutionError> {
            self.effects.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(ExecutionReceipt::new(batch.actions.len()))
        }
    }

    fn service() -> (MultisigService, Arc<RecordingExecutor>) {
        let executor = Arc::new(RecordingExecutor::succeeding());
        let engine = MultisigEngine::new(EngineConfig::default(), executor.clone());
        (MultisigService::new(engine), executor)
    }

    fn payload() -> TransactionPayload {
        TransactionPayload::single(Action::new(
            Pubkey::new_unique(),
            vec![AccountRef::authority()],
            vec![],
        ))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_approvals_are_each_recorded_once() {
        let (service, _) = service();
        let owners: Vec<Caller> = (0..5)
            .map(|_| Caller::authenticated(Pubkey::new_unique()))
            .collect();
        let keys = owners.iter().map(|c| *c.key()).collect();
        let multisig = service.create_multisig(owners[0], keys, 3).await.unwrap();
        let tx = service
            .propose_transaction(owners[0], multisig, payload())
            .await
            .unwrap();

        // Every owner but the proposer approves twice, concurrently
        let mut handles = Vec::new();
        for owner in owners.iter().skip(1).chain(owners.iter().skip(1)) {
            let service = service.clone();
            let owner = *owner;
            handles.push(tokio::spawn(async move {
                service.approve_transaction(owner, multisig, tx).await
            }));
        }

        let mut ok = 0;
        let mut duplicate = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => ok += 1,
                Err(MultisigError::AlreadyApproved(_)) => duplicate += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(ok, 4);
        assert_eq!(duplicate, 4);

        let record = service.transaction(tx).await.unwrap();
        assert_eq!(record.approvals().len(), 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_executes_run_exactly_once() {
        let (service, executor) = service();
        let owner = Caller::authenticated(Pubkey::new_unique());
        let multisig = service
            .create_multisig(owner, vec![*owner.key()], 1)
            .await
            .unwrap();
        let tx = service
            .propose_transaction(owner, multisig, payload())
            .await
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                let caller = Caller::authenticated(Pubkey::new_unique());
                tokio::spawn(async move {
                    service.execute_transaction(caller, multisig, tx, vec![]).await
                })
            })
            .collect();

        let mut executed = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => executed += 1,
                Err(err) => assert!(matches!(err, MultisigError::AlreadyExecuted(_))),
            }
        }
        assert_eq!(executed, 1);
        assert_eq!(executor.calls(), 1);
        assert!(service.transaction(tx).await.unwrap().is_executed());
    }

    #[tokio::test]
    async fn abandoned_execute_still_completes_once() {
        let slow = Arc::new(SlowExecutor::default());
        let service = MultisigService::new(MultisigEngine::new(EngineConfig::default(), slow.clone()));
        let owner = Caller::authenticated(Pubkey::new_unique());
        let multisig = service
            .create_multisig(owner, vec![*owner.key()], 1)
            .await
            .unwrap();
        let tx = service
            .propose_transaction(owner, multisig, payload())
            .await
            .unwrap();

        let first = tokio::time::timeout(
            Duration::from_millis(5),
            service.execute_transaction(owner, multisig, tx, vec![]),
        )
        .await;
        assert!(first.is_err(), "caller should have stopped waiting");

        // Waits for the detached execution to release the engine
        let second = service.execute_transaction(owner, multisig, tx, vec![]).await;
        assert!(matches!(second, Err(MultisigError::AlreadyExecuted(k)) if k == tx));
        assert_eq!(slow.effects.load(Ordering::SeqCst), 1);
        assert!(service.transaction(tx).await.unwrap().is_executed());
    }
}
