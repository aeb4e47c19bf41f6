//! Fuzz target for Content-Security-Policy header parsing.
//!
//! Parsing arbitrary input must never panic, and whatever it produces must
//! survive a serialize/parse round trip unchanged.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use strictcsp_core::{CspBuilder, Directives, MergeMode, algebra, codec};

#[derive(Debug, Arbitrary)]
struct FuzzPolicy {
    header: String,
    addition: String,
    prepend: bool,
}

fuzz_target!(|data: FuzzPolicy| {
    let parsed = codec::parse(&data.header);
    let serialized = codec::serialize(&parsed);
    assert_eq!(codec::parse(&serialized), parsed);
    assert_eq!(codec::serialize(&codec::parse(&serialized)), serialized);

    // Merging two parsed policies keeps the result serializable.
    let addition = Directives::parse(&data.addition);
    let mode = if data.prepend {
        MergeMode::Prepend
    } else {
        MergeMode::Append
    };
    let merged = algebra::extend(&parsed, &addition, mode);
    assert_eq!(codec::parse(&codec::serialize(&merged)), merged);

    // Builder entry points must accept anything.
    let builder = CspBuilder::from_header_value(&data.header)
        .with_strict_dynamic(data.addition.as_str())
        .with_report_only(data.prepend);
    let _ = builder.to_header_key_value();
});
