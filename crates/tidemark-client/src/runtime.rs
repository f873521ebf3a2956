//! Production event loop wiring coordinator, socket, and REST together.
//!
//! [`SyncRuntime::run`] multiplexes its input sources into the coordinator:
//! user intents from the [`SyncHandle`], socket signals from the
//! [`ConnectionManager`], HTTP completions from spawned call tasks,
//! reconnect wakeups, and a periodic tick. Each produces actions, which the
//! loop executes; HTTP actions are spawned so a slow endpoint never stalls
//! socket processing, and their completions are funneled back through the
//! loop, so all state mutation still happens on one task.
//!
//! A dropped connection is retried from inside the loop with exponential
//! backoff; the backoff resets once a connect succeeds. Running with the
//! socket down is a valid state throughout: REST keeps working and queued
//! sends flush on the next successful reconnect.

use std::sync::Arc;
use std::time::Duration;

use tidemark_core::env::{Environment, SystemEnv};
use tidemark_proto::UserId;
use tokio::sync::mpsc;

use crate::{
    connection::{ConnectionManager, SocketSignal},
    coordinator::Coordinator,
    event::{SyncAction, SyncEvent},
    http::ChatApi,
};

/// Tick period driving debounce and typing-expiry checks.
const TICK_PERIOD: Duration = Duration::from_millis(50);

/// First reconnect delay after a drop.
const RECONNECT_BASE: Duration = Duration::from_millis(500);

/// Reconnect delay ceiling.
const RECONNECT_MAX: Duration = Duration::from_secs(30);

/// Channel depth for intents, signals, and completions.
const CHANNEL_BUFFER: usize = 64;

/// Handle for feeding user intents into a running [`SyncRuntime`].
#[derive(Clone)]
pub struct SyncHandle {
    intents: mpsc::Sender<SyncEvent>,
}

impl SyncHandle {
    /// Send a user intent. Returns `false` if the runtime has shut down.
    pub async fn send(&self, event: SyncEvent) -> bool {
        self.intents.send(event).await.is_ok()
    }
}

/// Event loop owning a [`Coordinator`] and its transports.
pub struct SyncRuntime<A: ChatApi + 'static> {
    env: SystemEnv,
    coordinator: Coordinator<SystemEnv>,
    api: Arc<A>,
    connection: ConnectionManager,
    backoff: Duration,
    signals_tx: mpsc::Sender<SocketSignal>,
    signals_rx: mpsc::Receiver<SocketSignal>,
    reconnect_tx: mpsc::Sender<()>,
    reconnect_rx: mpsc::Receiver<()>,
    intents_rx: mpsc::Receiver<SyncEvent>,
    completions_tx: mpsc::Sender<SyncEvent>,
    completions_rx: mpsc::Receiver<SyncEvent>,
    notices_tx: mpsc::Sender<String>,
}

impl<A: ChatApi + 'static> SyncRuntime<A> {
    /// Build a runtime for `user_id` against the given REST api and socket
    /// URL.
    ///
    /// Returns the runtime, the intent handle for the UI, and a receiver of
    /// user-facing notices.
    pub fn new(
        user_id: UserId,
        api: A,
        socket_url: impl Into<String>,
    ) -> (Self, SyncHandle, mpsc::Receiver<String>) {
        let env = SystemEnv;
        let (intents_tx, intents_rx) = mpsc::channel(CHANNEL_BUFFER);
        let (signals_tx, signals_rx) = mpsc::channel(CHANNEL_BUFFER);
        let (reconnect_tx, reconnect_rx) = mpsc::channel(1);
        let (completions_tx, completions_rx) = mpsc::channel(CHANNEL_BUFFER);
        let (notices_tx, notices_rx) = mpsc::channel(CHANNEL_BUFFER);
        let runtime = Self {
            coordinator: Coordinator::new(env.clone(), user_id),
            env,
            api: Arc::new(api),
            connection: ConnectionManager::new(socket_url),
            backoff: RECONNECT_BASE,
            signals_tx,
            signals_rx,
            reconnect_tx,
            reconnect_rx,
            intents_rx,
            completions_tx,
            completions_rx,
            notices_tx,
        };
        (runtime, SyncHandle { intents: intents_tx }, notices_rx)
    }

    /// Run until every [`SyncHandle`] is dropped.
    pub async fn run(mut self) {
        self.try_connect().await;

        let actions = self.coordinator.bootstrap();
        self.perform(actions);

        let mut ticker = tokio::time::interval(TICK_PERIOD);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = self.env.now();
                    let actions = self.coordinator.handle(SyncEvent::Tick { now });
                    self.perform(actions);
                },
                Some(signal) = self.signals_rx.recv() => self.handle_signal(signal),
                Some(()) = self.reconnect_rx.recv() => self.try_connect().await,
                Some(completion) = self.completions_rx.recv() => {
                    let actions = self.coordinator.handle(completion);
                    self.perform(actions);
                },
                intent = self.intents_rx.recv() => match intent {
                    Some(event) => {
                        let actions = self.coordinator.handle(event);
                        self.perform(actions);
                    },
                    None => break,
                },
            }
        }

        // Apply anything still debounced and stop outstanding typing
        // indicators before tearing the socket down
        let actions = self.coordinator.shutdown();
        self.perform(actions);
        self.connection.disconnect();
    }

    /// Attempt to connect; on failure, schedule the next attempt.
    async fn try_connect(&mut self) {
        if self.connection.is_connected() {
            return;
        }
        match self.connection.connect(self.coordinator.user_id(), self.signals_tx.clone()).await {
            Ok(()) => self.backoff = RECONNECT_BASE,
            Err(err) => {
                tracing::warn!(%err, delay = ?self.backoff, "socket connect failed, will retry");
                self.schedule_reconnect();
            },
        }
    }

    /// Arm a reconnect wakeup after the current backoff delay.
    fn schedule_reconnect(&mut self) {
        let delay = self.backoff;
        self.backoff = (self.backoff * 2).min(RECONNECT_MAX);
        let wakeup = self.reconnect_tx.clone();
        let env = self.env.clone();
        tokio::spawn(async move {
            env.sleep(delay).await;
            let _ = wakeup.send(()).await;
        });
    }

    fn handle_signal(&mut self, signal: SocketSignal) {
        match signal {
            SocketSignal::Connected => {
                let actions = self.coordinator.handle(SyncEvent::ConnectivityChanged { online: true });
                self.perform(actions);
            },
            SocketSignal::Event(event) => {
                let actions = self.coordinator.handle(SyncEvent::Socket(event));
                self.perform(actions);
            },
            SocketSignal::Disconnected(reason) => {
                tracing::warn!(reason, "socket disconnected");
                // Clear the dead link so the retry is not a no-op
                self.connection.disconnect();
                let actions =
                    self.coordinator.handle(SyncEvent::ConnectivityChanged { online: false });
                self.perform(actions);
                self.schedule_reconnect();
            },
        }
    }

    fn perform(&mut self, actions: Vec<SyncAction>) {
        for action in actions {
            match action {
                SyncAction::Http { token, call } => {
                    let api = Arc::clone(&self.api);
                    let completions = self.completions_tx.clone();
                    tokio::spawn(async move {
                        let completion = match api.execute(call).await {
                            Ok(response) => SyncEvent::HttpSucceeded { token, response },
                            Err(err) => {
                                SyncEvent::HttpFailed { token, error: err.to_string() }
                            },
                        };
                        let _ = completions.send(completion).await;
                    });
                },
                SyncAction::Emit(event) => self.connection.send(event),
                SyncAction::Notify { message } => {
                    if self.notices_tx.try_send(message).is_err() {
                        tracing::debug!("notice channel full, notice dropped");
                    }
                },
            }
        }
    }
}
