#![no_main]

use libfuzzer_sys::fuzz_target;
use zodiac_core::url::Url;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Must not panic; resolving against a fixed base must not either.
        let _ = Url::parse(input);
        let base = Url::parse("gemini://example.com/dir/page.gmi").unwrap();
        let _ = base.resolve(input);
    }
});
