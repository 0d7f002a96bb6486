#![no_main]

use libfuzzer_sys::fuzz_target;
use zodiac_core::gemini::GeminiResponse;

fuzz_target!(|data: &[u8]| {
    // Must not panic on any server output; whatever parses must
    // serialize back to something that parses the same way.
    if let Ok(resp) = GeminiResponse::parse(data) {
        let again = GeminiResponse::parse(&resp.to_bytes());
        assert_eq!(again.ok().map(|r| r.status), Some(resp.status));
    }
});
