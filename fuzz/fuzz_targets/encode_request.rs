#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use viewwire_protocol::{EncodeOptions, HttpMethod, Request, encode_request};

#[derive(Debug, Arbitrary)]
struct FuzzView {
    bucket: String,
    design_doc: String,
    view_name: String,
    query_string: String,
    development: bool,
}

#[derive(Debug, Arbitrary)]
enum FuzzRequest {
    View(FuzzView),
    Query(String),
}

fuzz_target!(|input: FuzzRequest| {
    let request: Request = match input {
        FuzzRequest::View(v) => Request::view(v.bucket, v.design_doc, v.view_name)
            .with_query(v.query_string)
            .development(v.development)
            .into(),
        FuzzRequest::Query(text) => Request::query(text),
    };

    if let Ok(http) = encode_request(&request, &EncodeOptions::default()) {
        let bytes = http.to_bytes();
        assert_eq!(bytes.len(), http.encoded_len());

        // The request line must never be split by user input.
        let line_end = bytes.windows(2).position(|w| w == b"\r\n").unwrap_or(bytes.len());
        let line = &bytes[..line_end];
        assert!(line.ends_with(b" HTTP/1.1"));
        match http.method() {
            HttpMethod::Get => assert!(line.starts_with(b"GET /")),
            HttpMethod::Post => assert!(line.starts_with(b"POST /")),
        }
    }
});
