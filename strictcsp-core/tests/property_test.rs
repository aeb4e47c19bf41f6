//! Property tests for the header codec and directive algebra

use proptest::prelude::*;
use regex::Regex;
use strictcsp_core::{DirectivePatterns, Directives, MergeMode, algebra, codec};

const LIST_NAMES: &[&str] = &[
    "default-src",
    "script-src",
    "style-src",
    "img-src",
    "connect-src",
    "report-uri",
    "x-future-src",
];

const FLAG_NAMES: &[&str] = &["sandbox", "upgrade-insecure-requests", "block-all-mixed-content"];

fn source_token() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("self".to_string()),
        Just("none".to_string()),
        Just("unsafe-inline".to_string()),
        Just("strict-dynamic".to_string()),
        "[a-z]{1,8}\\.example\\.(com|org)",
        "https://[a-z]{1,8}\\.test(/[a-z]{0,6})?",
        "(https|data|blob|wss):",
        "nonce-[A-Za-z0-9+/]{4,22}={0,2}",
        "sha(256|384|512)-[A-Za-z0-9+/]{8,43}=?",
    ]
}

fn directives() -> impl Strategy<Value = Directives> {
    let lists = prop::collection::vec(
        (
            prop::sample::select(LIST_NAMES),
            prop::collection::vec(source_token(), 1..6),
        ),
        0..5,
    );
    let flags = prop::collection::vec(prop::sample::select(FLAG_NAMES), 0..3);

    (lists, flags).prop_map(|(lists, flags)| {
        let mut directives = Directives::new();
        for (name, values) in lists {
            directives.insert(name, values);
        }
        for name in flags {
            directives.insert(name, true);
        }
        directives
    })
}

proptest! {
    #[test]
    fn prop_serialize_then_parse_round_trips(d in directives()) {
        prop_assert_eq!(codec::parse(&codec::serialize(&d)), d);
    }

    #[test]
    fn prop_parse_is_stable(d in directives()) {
        let once = codec::parse(&codec::serialize(&d));
        let twice = codec::parse(&codec::serialize(&once));
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_extend_then_filter_is_identity(d in directives()) {
        let d = algebra::filter_out(
            &d,
            &DirectivePatterns::new().with("script-src", Regex::new(r"example\.com").unwrap()),
        );
        let extended = algebra::extend(
            &d,
            &Directives::new().with("script-src", ["https://example.com"]),
            MergeMode::Append,
        );
        let filtered = algebra::filter_out(
            &extended,
            &DirectivePatterns::new().with("script-src", Regex::new(r"example\.com").unwrap()),
        );
        prop_assert_eq!(filtered, d);
    }

    #[test]
    fn prop_append_preserves_base_prefix(base in directives(), addition in directives()) {
        let merged = algebra::extend(&base, &addition, MergeMode::Append);
        for (name, value) in base.iter() {
            if let (Some(before), Some(after)) = (value.sources(), merged.sources(name)) {
                prop_assert!(after.starts_with(before));
            }
        }
    }
}
