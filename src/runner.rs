//! Operation runner.
//!
//! Serializes user-initiated wallet operations behind a single busy flag,
//! applies the confirmation timeout, and maps every outcome into a terminal
//! [`Operation`] record. The busy flag is a mutex acquired with `try_lock`
//! at entry: a second caller gets `Busy` immediately instead of queueing,
//! and the guard releases the flag on every exit path.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tracing::{error, info, warn};

use crate::chain::{ChainClient, TxHandle, TxReceipt};
use crate::error::{Error, Result};

/// Confirmation wait cap, matching the original sender's 15 second race.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationKind {
    Connect,
    SwitchNetwork,
    Deposit,
    Withdraw,
    Swap,
    AddLiquidity,
    Transfer,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationStatus {
    Pending,
    Succeeded,
    Failed,
    /// The confirmation wait expired. The underlying transaction may still
    /// confirm later; this record is never revisited if it does.
    TimedOut,
}

/// Record of one user-initiated operation; immutable once terminal and
/// retained as the session's "last operation" until superseded.
#[derive(Clone, Debug)]
pub struct Operation {
    pub id: u64,
    pub kind: OperationKind,
    pub status: OperationStatus,
    pub started_at: DateTime<Utc>,
    pub result: Option<TxReceipt>,
    pub error: Option<Error>,
}

impl Operation {
    pub fn is_terminal(&self) -> bool {
        self.status != OperationStatus::Pending
    }
}

type TerminalObserver = dyn Fn(&Operation) + Send + Sync;

struct Shared {
    busy: AsyncMutex<()>,
    next_id: AtomicU64,
    last: StdMutex<Option<Operation>>,
    /// Abort channel for the Pending operation, taken by `fail_pending`.
    abort: StdMutex<Option<oneshot::Sender<Error>>>,
    observer: StdMutex<Option<Arc<TerminalObserver>>>,
}

pub struct OperationRunner<C> {
    client: Arc<C>,
    confirmation_timeout: Duration,
    shared: Arc<Shared>,
}

impl<C> Clone for OperationRunner<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            confirmation_timeout: self.confirmation_timeout,
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C: ChainClient> OperationRunner<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            shared: Arc::new(Shared {
                busy: AsyncMutex::new(()),
                next_id: AtomicU64::new(1),
                last: StdMutex::new(None),
                abort: StdMutex::new(None),
                observer: StdMutex::new(None),
            }),
        }
    }

    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    pub fn confirmation_timeout(&self) -> Duration {
        self.confirmation_timeout
    }

    /// Register a synchronous callback fired on every terminal transition,
    /// so presentation can refresh derived state (balances, reserves).
    pub fn set_observer(&self, observer: impl Fn(&Operation) + Send + Sync + 'static) {
        *self.shared.observer.lock().expect("observer lock poisoned") = Some(Arc::new(observer));
    }

    /// The most recent operation record, Pending or terminal.
    pub fn last_operation(&self) -> Option<Operation> {
        self.shared.last.lock().expect("operation lock poisoned").clone()
    }

    /// Run a transaction operation: `action` performs the send and hands
    /// back the transaction handle; the runner then waits for confirmation
    /// under the configured timeout.
    ///
    /// Fails with `Busy` if another operation is Pending; any other outcome
    /// is reported through the returned terminal [`Operation`].
    pub async fn run<F, Fut>(&self, kind: OperationKind, action: F) -> Result<Operation>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TxHandle>>,
    {
        let _guard = self.shared.busy.try_lock().map_err(|_| Error::Busy)?;
        let (mut op, mut abort_rx) = self.begin(kind);

        let outcome = match action().await {
            Ok(handle) => {
                // An abort that landed while the action was in flight wins
                // over the confirmation wait.
                if let Ok(e) = abort_rx.try_recv() {
                    Err(e)
                } else {
                    tokio::select! {
                        res = self.client.wait(handle, self.confirmation_timeout) => res.map(Some),
                        aborted = &mut abort_rx => {
                            Err(aborted.unwrap_or(Error::WalletUnavailable))
                        }
                    }
                }
            }
            Err(e) => Err(e),
        };

        self.finish(&mut op, outcome);
        Ok(op)
    }

    /// Run a receipt-less operation (connect, network switch) under the same
    /// busy flag, so the one-Pending-per-session rule covers every kind.
    pub async fn run_control<F, Fut, T>(&self, kind: OperationKind, action: F) -> Result<(Operation, T)>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let _guard = self.shared.busy.try_lock().map_err(|_| Error::Busy)?;
        let (mut op, mut abort_rx) = self.begin(kind);

        let outcome = tokio::select! {
            res = action() => res,
            aborted = &mut abort_rx => Err(aborted.unwrap_or(Error::WalletUnavailable)),
        };

        match outcome {
            Ok(value) => {
                self.finish(&mut op, Ok(None));
                Ok((op, value))
            }
            Err(e) => {
                self.finish(&mut op, Err(e.clone()));
                Err(e)
            }
        }
    }

    /// Fail the Pending operation from outside the run loop, e.g. when the
    /// wallet revokes account access mid-flight. No-op when nothing is
    /// Pending or the operation already went terminal.
    pub fn fail_pending(&self, error: Error) {
        let sender = self.shared.abort.lock().expect("abort lock poisoned").take();
        if let Some(tx) = sender {
            let _ = tx.send(error);
        }
    }

    fn begin(&self, kind: OperationKind) -> (Operation, oneshot::Receiver<Error>) {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let op = Operation {
            id,
            kind,
            status: OperationStatus::Pending,
            started_at: Utc::now(),
            result: None,
            error: None,
        };
        info!(id, ?kind, "operation started");
        *self.shared.last.lock().expect("operation lock poisoned") = Some(op.clone());
        let (abort_tx, abort_rx) = oneshot::channel();
        *self.shared.abort.lock().expect("abort lock poisoned") = Some(abort_tx);
        (op, abort_rx)
    }

    fn finish(&self, op: &mut Operation, outcome: Result<Option<TxReceipt>>) {
        match outcome {
            Ok(receipt) => {
                op.status = OperationStatus::Succeeded;
                op.result = receipt;
                info!(id = op.id, kind = ?op.kind, "operation succeeded");
            }
            Err(Error::Timeout(t)) => {
                op.status = OperationStatus::TimedOut;
                op.error = Some(Error::Timeout(t));
                warn!(
                    id = op.id,
                    kind = ?op.kind,
                    "confirmation wait timed out; the transaction may still confirm"
                );
            }
            Err(e) => {
                op.status = OperationStatus::Failed;
                error!(id = op.id, kind = ?op.kind, error = %e, "operation failed");
                op.error = Some(e);
            }
        }
        *self.shared.abort.lock().expect("abort lock poisoned") = None;
        *self.shared.last.lock().expect("operation lock poisoned") = Some(op.clone());

        let observer = self
            .shared
            .observer
            .lock()
            .expect("observer lock poisoned")
            .clone();
        if let Some(callback) = observer {
            callback(op);
        }
    }
}
