//! Per-viewer broadcast session.
//!
//! ```text
//! Connecting --upgrade--> Admitted --slot--> Active --first failure--> Closing --> Closed
//!                             \
//!                              --pool full--> Rejected (transport closed, nothing sent)
//! ```
//!
//! While active, two duties run concurrently on the same task:
//!
//! - **read duty** drains inbound frames only to detect liveness. Every
//!   frame (pongs included) pushes the read deadline out by `pong_wait`.
//!   Deadline expiry, a read error, a close frame, or end of stream ends
//!   the session.
//! - **write duty** pushes the rendered counter every `write_period` and a
//!   ping every `ping_period`. Each send is bounded by `write_wait`; a
//!   timeout or error ends the session.
//!
//! Whichever duty fails first calls [`SessionTeardown::trigger`], which
//! records the reason, cancels the other duty (including a send already in
//! flight), and returns the admission slot. Later triggers are no-ops. Once
//! both duties have stopped the transport is closed, waiting at most
//! [`CLOSE_GRACE`] for the close handshake; after a write failure the
//! transport is dropped without one.

use std::fmt::Display;
use std::sync::{Mutex, OnceLock, PoisonError};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::Message;
use clapper_core::config::SessionConfig;
use clapper_core::{AdmissionPool, AdmissionSlot, Counter};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{debug, warn};
use uuid::Uuid;

/// Upper bound on the close handshake once a session is over.
pub const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The admission pool was full; the session never became active.
    Rejected,
    /// The peer sent a close frame or dropped the connection.
    PeerClosed,
    /// No inbound frame arrived within the read deadline.
    ReadTimeout,
    /// Reading from the transport failed.
    ReadError,
    /// A send did not complete within the write deadline.
    WriteTimeout,
    /// Writing to the transport failed.
    WriteError,
}

impl SessionEnd {
    /// Short name for logging.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rejected => "rejected",
            Self::PeerClosed => "peer_closed",
            Self::ReadTimeout => "read_timeout",
            Self::ReadError => "read_error",
            Self::WriteTimeout => "write_timeout",
            Self::WriteError => "write_error",
        }
    }
}

/// One-shot teardown signal shared by a session's two duties.
#[derive(Debug)]
pub struct SessionTeardown {
    token: CancellationToken,
    slot: Mutex<Option<AdmissionSlot>>,
    reason: OnceLock<SessionEnd>,
}

impl SessionTeardown {
    /// Wrap the slot held by an admitted session.
    pub fn new(slot: AdmissionSlot) -> Self {
        Self {
            token: CancellationToken::new(),
            slot: Mutex::new(Some(slot)),
            reason: OnceLock::new(),
        }
    }

    /// End the session for `reason`.
    ///
    /// Only the first call has any effect: it records the reason, wakes
    /// both duties, and releases the admission slot. Returns `true` for
    /// that call and `false` for every later one.
    pub fn trigger(&self, reason: SessionEnd) -> bool {
        if self.reason.set(reason).is_err() {
            return false;
        }

        self.token.cancel();

        let slot = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(mut slot) = slot {
            slot.release();
        }
        true
    }

    /// The reason recorded by the first [`trigger`](Self::trigger).
    pub fn reason(&self) -> Option<SessionEnd> {
        self.reason.get().copied()
    }

    /// Whether teardown has started.
    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once teardown has started.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}

/// Run one viewer connection from admission to close.
///
/// `socket` is an already-upgraded connection. Returns once the session is
/// closed, reporting why.
pub async fn run_session<S, E>(
    mut socket: S,
    counter: &Counter,
    pool: &AdmissionPool,
    config: &SessionConfig,
    session_id: Uuid,
) -> SessionEnd
where
    S: Stream<Item = Result<Message, E>> + Sink<Message> + Unpin,
    <S as Sink<Message>>::Error: Display,
    E: Display,
{
    let slot = match pool.try_admit() {
        Ok(slot) => slot,
        Err(e) => {
            warn!(%session_id, error = %e, "session rejected");
            close_transport(&mut socket, close_grace(config)).await;
            return SessionEnd::Rejected;
        }
    };

    debug!(%session_id, active = pool.active(), "session admitted");

    let teardown = SessionTeardown::new(slot);
    let (mut sink, mut stream) = socket.split();

    tokio::join!(
        read_duty(&mut stream, &teardown, config.pong_wait(), session_id),
        write_duty(&mut sink, &teardown, counter, config, session_id),
    );

    let end = teardown.reason().unwrap_or(SessionEnd::PeerClosed);
    if !matches!(end, SessionEnd::WriteTimeout | SessionEnd::WriteError) {
        close_transport(&mut sink, close_grace(config)).await;
    }

    match end {
        SessionEnd::PeerClosed => debug!(%session_id, "session closed by peer"),
        other => warn!(%session_id, reason = other.as_str(), "session ended"),
    }
    end
}

/// Drain inbound frames until the peer goes quiet, errors, or leaves.
async fn read_duty<St, E>(
    stream: &mut St,
    teardown: &SessionTeardown,
    pong_wait: Duration,
    session_id: Uuid,
) where
    St: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    loop {
        let deadline = Instant::now() + pong_wait;

        let next = tokio::select! {
            () = teardown.cancelled() => return,
            next = tokio::time::timeout_at(deadline, stream.next()) => next,
        };

        let end = match next {
            Err(_elapsed) => SessionEnd::ReadTimeout,
            Ok(None | Some(Ok(Message::Close(_)))) => SessionEnd::PeerClosed,
            Ok(Some(Err(e))) => {
                debug!(%session_id, error = %e, "session read failed");
                SessionEnd::ReadError
            }
            Ok(Some(Ok(_))) => continue,
        };

        teardown.trigger(end);
        return;
    }
}

/// Push the counter and heartbeats until a send fails or teardown starts.
async fn write_duty<Si>(
    sink: &mut Si,
    teardown: &SessionTeardown,
    counter: &Counter,
    config: &SessionConfig,
    session_id: Uuid,
) where
    Si: Sink<Message> + Unpin,
    Si::Error: Display,
{
    let start = Instant::now();
    let mut push = tokio::time::interval_at(start + config.write_period(), config.write_period());
    push.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ping = tokio::time::interval_at(start + config.ping_period(), config.ping_period());
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let frame = tokio::select! {
            () = teardown.cancelled() => return,
            _ = push.tick() => Message::Text(counter.display().into()),
            _ = ping.tick() => Message::Ping(Bytes::new()),
        };

        let sent = tokio::select! {
            () = teardown.cancelled() => return,
            sent = send_bounded(sink, frame, config.write_wait(), session_id) => sent,
        };
        if let Err(end) = sent {
            teardown.trigger(end);
            return;
        }
    }
}

/// Send one frame, failing if it does not complete within `write_wait`.
async fn send_bounded<Si>(
    sink: &mut Si,
    frame: Message,
    write_wait: Duration,
    session_id: Uuid,
) -> Result<(), SessionEnd>
where
    Si: Sink<Message> + Unpin,
    Si::Error: Display,
{
    match tokio::time::timeout(write_wait, sink.send(frame)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            debug!(%session_id, error = %e, "session write failed");
            Err(SessionEnd::WriteError)
        }
        Err(_elapsed) => Err(SessionEnd::WriteTimeout),
    }
}

fn close_grace(config: &SessionConfig) -> Duration {
    config.write_wait().min(CLOSE_GRACE)
}

/// Close the transport, giving up after `grace`.
async fn close_transport<Si>(sink: &mut Si, grace: Duration)
where
    Si: Sink<Message> + Unpin,
{
    // The peer may already be gone; a failed close changes nothing.
    let _ = tokio::time::timeout(grace, sink.close()).await;
}
