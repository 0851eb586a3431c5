//! A bounded pool of solve workers. Requests share nothing but the pool's queue.

use std::sync::mpsc::{self, Receiver, TryRecvError};

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::api::{self, SolveOptions, SolveResponse};
use crate::config::SolverConfig;
use crate::error::FlowError;
use crate::solver::CancelToken;
use crate::space::Space;

/// Runs solves on a fixed set of worker threads.
pub struct SolvePool {
    pool: ThreadPool,
    config: SolverConfig,
}

impl SolvePool {
    /// Start `config.workers` workers, or one per core when that is 0.
    pub fn new(config: SolverConfig) -> Result<Self, FlowError> {
        config.validate()?;

        let pool = ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("flowcover-worker-{i}"))
            .build()
            .map_err(|err| FlowError::Config(format!("failed to start solve pool: {err}")))?;

        tracing::debug!(workers = pool.current_num_threads(), "solve pool started");

        Ok(Self { pool, config })
    }

    /// Number of worker threads.
    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// The settings this pool was started with.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Queue one solve. Options are checked against this pool's deadline bound before anything is queued.
    pub fn submit(&self, space: Space, options: SolveOptions) -> SolveTicket {
        let (sender, receiver) = mpsc::channel();
        let cancel = CancelToken::new();

        if let Err(err) = options.validate_within(self.config.max_deadline_ms) {
            // the receiver is still alive, so this cannot fail
            let _ = sender.send(Err(err));
            return SolveTicket { receiver, cancel };
        }

        let token = cancel.clone();
        self.pool.spawn(move || {
            // a dropped ticket means nobody is waiting for the answer
            let _ = sender.send(api::solve_with_cancel(&space, &options, &token));
        });

        SolveTicket { receiver, cancel }
    }
}

/// Handle on one queued solve.
pub struct SolveTicket {
    receiver: Receiver<Result<SolveResponse, FlowError>>,
    cancel: CancelToken,
}

impl SolveTicket {
    /// Stop the solve at its next deadline check; it then resolves to [`FlowError::TimedOut`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Block until the solve finishes.
    pub fn wait(self) -> Result<SolveResponse, FlowError> {
        self.receiver.recv()
            .map_err(|_| FlowError::Solver("solve worker exited without a result".to_string()))?
    }

    /// The result, if the solve has finished.
    pub fn try_result(&self) -> Option<Result<SolveResponse, FlowError>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(FlowError::Solver("solve worker exited without a result".to_string()))),
        }
    }
}
