//! SSE event stream for connected clients

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tracing::warn;

use super::server::AppContext;

/// `GET /api/events`: stream every `LyricsEvent` as it is broadcast
pub async fn events(
    State(ctx): State<AppContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = ctx.store.subscribe_events();
    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(lyrics_event) => {
                let event = Event::default()
                    .event(lyrics_event.event_type())
                    .json_data(&lyrics_event)
                    .ok();
                event.map(Ok)
            }
            Err(e) => {
                // Slow consumer lagged behind the broadcast buffer
                warn!("SSE client error: {:?}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
