#![no_main]

use libfuzzer_sys::fuzz_target;
use lithos_sprout_gen::golang::extract_source;

fuzz_target!(|data: &[u8]| {
    if let Ok(source) = std::str::from_utf8(data) {
        if let Ok(package) = extract_source(source) {
            for function in &package.functions {
                assert!(function.body.is_empty() || function.body.starts_with('{'));
            }
        }
    }
});
