use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dto::sse::{Handshake, ServerEvent},
    error::ServiceError,
    state::SharedState,
};

/// Event name of the first message sent on every group stream.
pub const EVENT_HANDSHAKE: &str = "handshake";

/// Subscribe to the events of an existing group.
pub async fn subscribe_group(
    state: &SharedState,
    group_id: Uuid,
) -> Result<broadcast::Receiver<ServerEvent>, ServiceError> {
    state
        .store()
        .find_group(group_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("group `{group_id}` not found")))?;
    Ok(state.sse().subscribe())
}

fn to_event(payload: ServerEvent) -> Event {
    let event = Event::default().data(payload.data);
    match payload.event {
        Some(name) => event.event(name),
        None => event,
    }
}

/// Forward `group_id`'s events from the hub, preceded by a handshake.
///
/// The forwarding task ends when the returned receiver is dropped or the hub closes.
pub fn forward_group_events(
    mut receiver: broadcast::Receiver<ServerEvent>,
    group_id: Uuid,
) -> mpsc::Receiver<ServerEvent> {
    let (tx, rx) = mpsc::channel::<ServerEvent>(8);

    tokio::spawn(async move {
        let handshake = ServerEvent::json(
            group_id,
            Some(EVENT_HANDSHAKE.to_string()),
            &Handshake {
                group_id,
                message: "subscribed to group events".into(),
            },
        );
        if let Ok(handshake) = handshake {
            if tx.send(handshake).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) if payload.group_id == group_id => {
                            if tx.send(payload).await.is_err() {
                                break;
                            }
                        }
                        Ok(_) => continue,
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(%group_id, skipped, "group SSE stream lagged");
                            continue;
                        }
                    }
                }
            }
        }

        info!(%group_id, "group SSE stream disconnected");
    });

    rx
}

/// Convert a hub receiver into an SSE response carrying only `group_id`'s events.
pub fn to_sse_stream(
    receiver: broadcast::Receiver<ServerEvent>,
    group_id: Uuid,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = ReceiverStream::new(forward_group_events(receiver, group_id))
        .map(|payload| Ok::<_, Infallible>(to_event(payload)));

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
