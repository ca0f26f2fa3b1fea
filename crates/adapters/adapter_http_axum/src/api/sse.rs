//! Server-Sent Events (SSE) stream for core notifications.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use chrono::TimeZone;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

use energyhub_app::ports::{Archive, RootMeterStore, ThingRegistry};

use crate::state::AppState;

/// `GET /api/energy/events/stream` — SSE stream of core notifications.
///
/// Subscribes to the event bus broadcast channel and sends JSON-encoded
/// events as SSE `data:` frames. The stream continues until the client
/// disconnects; subscribers that lag lose the oldest events and are not
/// replayed.
pub async fn stream<R, S, A, Tz>(
    State(state): State<AppState<R, S, A, Tz>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, std::convert::Infallible>>>
where
    R: ThingRegistry + Send + Sync + 'static,
    S: RootMeterStore + Send + Sync + 'static,
    A: Archive + Send + Sync + 'static,
    Tz: TimeZone + Send + Sync + 'static,
    Tz::Offset: Send + Sync,
{
    let event_rx = state.event_bus.subscribe();
    let event_stream = BroadcastStream::new(event_rx).filter_map(|result| match result {
        Ok(event) => match serde_json::to_string(&event) {
            Ok(json) => Some(Ok(Event::default().event(event.as_str()).data(json))),
            Err(err) => {
                tracing::warn!(%err, "failed to serialize event to JSON for SSE stream");
                None
            }
        },
        Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(n)) => {
            tracing::warn!(
                skipped = n,
                "SSE subscriber lagged, some events were dropped"
            );
            None
        }
    });

    Sse::new(event_stream).keep_alive(KeepAlive::default())
}
