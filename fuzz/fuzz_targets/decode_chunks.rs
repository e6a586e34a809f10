#![no_main]

use arbitrary::Arbitrary;
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use viewwire_codec::{CodecConfig, Outcome, TransportEvent, pair};
use viewwire_protocol::Request;

/// One response: status, body bytes and where to cut them.
#[derive(Debug, Arbitrary)]
struct FuzzResponse {
    status: u16,
    raw_query: bool,
    body: Vec<u8>,
    cuts: Vec<u16>,
    abort: bool,
}

fuzz_target!(|responses: Vec<FuzzResponse>| {
    let (encoder, mut decoder) = pair(CodecConfig::default().max_buffer_size(1 << 20));

    for input in responses.iter().take(8) {
        let request = if input.raw_query {
            Request::query("select 1")
        } else {
            Request::view("b", "d", "v").into()
        };
        let _ = encoder.encode_to_bytes(&request);

        let Ok(Some(response)) = decoder.handle(TransportEvent::header(input.status)) else {
            continue;
        };

        let body = Bytes::copy_from_slice(&input.body);
        let mut cuts: Vec<usize> = input.cuts.iter().map(|&c| usize::from(c) % (body.len() + 1)).collect();
        cuts.sort_unstable();
        cuts.dedup();

        let mut start = 0;
        let mut failed = false;
        for cut in cuts {
            if decoder.handle(TransportEvent::Body(body.slice(start..cut))).is_err() {
                failed = true;
                break;
            }
            start = cut;
        }
        if !failed {
            if input.abort {
                let _ = decoder.handle(TransportEvent::aborted("fuzz"));
            } else {
                let _ = decoder.handle(TransportEvent::FinalBody(body.slice(start..)));
            }
        }

        // Every response must reach a terminal outcome and leave the decoder idle.
        assert!(decoder.is_idle());
        match response.outcome() {
            Some(Outcome::Completed) => {
                for row in response.row_handle().snapshot() {
                    assert!(row.as_bytes().starts_with(b"{"));
                    assert!(row.as_bytes().ends_with(b"}"));
                }
            }
            Some(Outcome::Failed(_)) => {}
            None => panic!("response left without a terminal outcome"),
        }
    }
});
