//! Splitting bodies into transport events.

use bytes::Bytes;
use viewwire_codec::TransportEvent;

/// Split `body` at the given offsets.
///
/// Offsets are clamped to the body, sorted and deduplicated, so any list of
/// numbers yields a valid partition. Empty pieces are kept only when the
/// body itself is empty.
#[must_use]
pub fn split_at(body: &Bytes, points: &[usize]) -> Vec<Bytes> {
    let mut points: Vec<usize> = points.iter().map(|&p| p.min(body.len())).collect();
    points.sort_unstable();
    points.dedup();

    let mut chunks = Vec::with_capacity(points.len() + 1);
    let mut start = 0;
    for point in points {
        if point > start {
            chunks.push(body.slice(start..point));
            start = point;
        }
    }
    if start < body.len() || chunks.is_empty() {
        chunks.push(body.slice(start..));
    }
    chunks
}

/// Split `body` into pieces of at most `size` bytes.
#[must_use]
pub fn fixed_chunks(body: &Bytes, size: usize) -> Vec<Bytes> {
    let size = size.max(1);
    let points: Vec<usize> = (size..body.len()).step_by(size).collect();
    split_at(body, &points)
}

/// Split `body` into single bytes.
#[must_use]
pub fn byte_by_byte(body: &Bytes) -> Vec<Bytes> {
    fixed_chunks(body, 1)
}

/// Events for one complete response: a header, then every chunk with the
/// last one marked final.
#[must_use]
pub fn response_events(status: u16, chunks: Vec<Bytes>) -> Vec<TransportEvent> {
    let mut events = Vec::with_capacity(chunks.len() + 1);
    events.push(TransportEvent::header(status));
    let last = chunks.len().saturating_sub(1);
    for (i, chunk) in chunks.into_iter().enumerate() {
        if i == last {
            events.push(TransportEvent::FinalBody(chunk));
        } else {
            events.push(TransportEvent::Body(chunk));
        }
    }
    if events.len() == 1 {
        events.push(TransportEvent::FinalBody(Bytes::new()));
    }
    events
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_split_at_normalizes_points() {
        let body = Bytes::from_static(b"abcdef");
        let chunks = split_at(&body, &[4, 2, 2, 0, 99]);
        assert_eq!(chunks, [&b"ab"[..], b"cd", b"ef"]);
    }

    #[test]
    fn test_split_empty_body() {
        let chunks = split_at(&Bytes::new(), &[3]);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].is_empty());
    }

    #[test]
    fn test_fixed_and_byte_chunks() {
        let body = Bytes::from_static(b"abcdefg");
        assert_eq!(fixed_chunks(&body, 3), [&b"abc"[..], b"def", b"g"]);
        assert_eq!(byte_by_byte(&body).len(), 7);
    }

    #[test]
    fn test_response_events() {
        let events = response_events(200, vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")]);
        assert_eq!(
            events,
            [
                TransportEvent::header(200),
                TransportEvent::body(&b"a"[..]),
                TransportEvent::final_body(&b"b"[..]),
            ]
        );

        let events = response_events(404, Vec::new());
        assert_eq!(events[1], TransportEvent::final_body(Bytes::new()));
    }
}
