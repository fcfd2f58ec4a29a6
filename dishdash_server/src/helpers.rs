use std::{fmt::Display, future::ready};

use actix_web::{http::header, web::Bytes, HttpResponse};
use dishdash_engine::live_views::{LiveQuery, LiveView};
use futures::{stream, Stream, StreamExt};
use log::*;
use serde::Serialize;
use serde_json::json;

use crate::errors::ServerError;

/// Formats one server-sent event.
pub fn sse_frame<T: Serialize>(event: &str, data: &T) -> Bytes {
    let json = serde_json::to_string(data).unwrap_or_else(|e| json!({ "error": e.to_string() }).to_string());
    Bytes::from(format!("event: {event}\ndata: {json}\n\n"))
}

/// Turns a live view into an event stream. The first frame is the view's current result; every later frame is a full
/// refetch after a change. `render` formats each result as a frame. The stream ends when the fabric shuts down, and
/// dropping it (the client went away) drops the subscription.
pub fn live_stream<Q, F>(
    event: &'static str,
    view: LiveView<Q>,
    render: F,
) -> impl Stream<Item = Result<Bytes, ServerError>>
where
    Q: LiveQuery + 'static,
    Q::Error: Display,
    F: Fn(&str, &Q::Item) -> Bytes + 'static,
{
    let initial = render(event, view.current());
    let updates = stream::unfold((view, render), move |(mut view, render)| async move {
        let frame = match view.next_change().await {
            None => {
                debug!("📬️ Fabric closed. Ending {event} stream");
                return None;
            },
            Some(Ok(item)) => render(event, item),
            Some(Err(e)) => {
                warn!("📬️ Refetch for {event} stream failed. {e}");
                sse_frame("error", &json!({ "error": e.to_string() }))
            },
        };
        Some((Ok(frame), (view, render)))
    });
    stream::once(ready(Ok(initial))).chain(updates)
}

/// Wraps a live view in a `text/event-stream` response. Each result is sent as it is.
pub fn sse_response<Q>(event: &'static str, view: LiveView<Q>) -> HttpResponse
where
    Q: LiveQuery + 'static,
    Q::Item: Serialize,
    Q::Error: Display,
{
    sse_response_with(event, view, sse_frame::<Q::Item>)
}

/// Like [`sse_response`], but each result goes through `render` first.
pub fn sse_response_with<Q, F>(event: &'static str, view: LiveView<Q>, render: F) -> HttpResponse
where
    Q: LiveQuery + 'static,
    Q::Error: Display,
    F: Fn(&str, &Q::Item) -> Bytes + 'static,
{
    HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, "text/event-stream"))
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(live_stream(event, view, render))
}
