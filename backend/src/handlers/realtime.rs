//! Server-sent change feed

use std::{convert::Infallible, time::Duration};

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Extension,
};
use futures::{Stream, StreamExt};

use crate::middleware::AuthUser;
use crate::AppState;

/// Stream change events of the caller's establishment.
///
/// Each event is sent as `event: change` with the JSON-encoded
/// [`ChangeEvent`](crate::services::realtime::ChangeEvent) as data.
pub async fn stream_changes(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::debug!(
        user_id = %user.user_id,
        establishment_id = %user.establishment_id,
        "Realtime subscriber connected"
    );

    let stream = state
        .realtime
        .subscribe(user.establishment_id)
        .map(|change| {
            let event = Event::default()
                .event("change")
                .json_data(&change)
                .unwrap_or_else(|_| Event::default().event("change").data(change.table));
            Ok::<Event, Infallible>(event)
        });

    let interval = Duration::from_secs(state.config.realtime.keep_alive_seconds.max(1));
    Sse::new(stream).keep_alive(KeepAlive::new().interval(interval).text("keep-alive"))
}
