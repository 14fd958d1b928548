#![no_main]

use adscope::server::rpc::{parse_request, INVALID_REQUEST, PARSE_ERROR};
use libfuzzer_sys::fuzz_target;

// Arbitrary request bodies must never panic the decoder, and every
// rejection must carry one of the two envelope-level error codes.
fuzz_target!(|data: &[u8]| {
    match parse_request(data) {
        Ok(request) => {
            let _ = request.method.len();
        }
        Err(response) => {
            assert!(response.result.is_none());
            let code = response.error.map(|e| e.code);
            assert!(code == Some(PARSE_ERROR) || code == Some(INVALID_REQUEST));
        }
    }
});
