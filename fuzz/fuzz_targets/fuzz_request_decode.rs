//! Fuzz target: `decode_request`
//!
//! Splits the input at the first NUL into a topic and a payload and
//! decodes them as an inbound control request. Decoding must never
//! panic, and a request that decodes must survive the request queue's
//! size limits unchanged.
//!
//! cargo fuzz run fuzz_request_decode

#![no_main]

use libfuzzer_sys::fuzz_target;
use doorbell::rpc::channels::InboundRequest;
use doorbell::rpc::codec::decode_request;

fuzz_target!(|data: &[u8]| {
    let (topic, payload) = match data.iter().position(|&b| b == 0) {
        Some(split) => (&data[..split], &data[split + 1..]),
        None => (data, &[][..]),
    };
    let Ok(topic) = core::str::from_utf8(topic) else {
        return;
    };

    let direct = decode_request(topic, payload);

    if let Some(request) = InboundRequest::new(topic, payload) {
        assert_eq!(
            decode_request(request.topic.as_str(), &request.payload),
            direct,
            "queued request must decode like the original"
        );
    }
});
