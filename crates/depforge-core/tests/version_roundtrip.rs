//! Property tests for source version parsing.

use depforge_core::SrcVersion;
use proptest::prelude::*;

fn prefix() -> impl Strategy<Value = String> {
    r"[0-9]{1,2}\.[0-9]{1,2}\.[0-9]{1,2}"
}

fn element_type() -> impl Strategy<Value = String> {
    "[a-z]{2,8}"
}

fn element_value() -> impl Strategy<Value = String> {
    // May contain dashes, but being lowercase it can never contain the
    // uppercase infix marker.
    r"[a-z0-9._]{1,12}(-[a-z0-9._]{1,6}){0,2}"
}

proptest! {
    /// `format(parse(s)) == s` for every well-formed source version, and
    /// the parsed elements reproduce what was glued together.
    #[test]
    fn round_trip(
        prefix in prefix(),
        elements in prop::collection::vec((element_type(), element_value()), 1..4),
    ) {
        let mut raw = prefix;
        for (version_type, version_value) in &elements {
            raw.push_str("-SRC-");
            raw.push_str(version_type);
            raw.push('-');
            raw.push_str(version_value);
        }

        let parsed = SrcVersion::parse(&raw).unwrap().unwrap();
        prop_assert_eq!(parsed.to_string(), raw.clone());
        prop_assert_eq!(parsed.elements().len(), elements.len());
        for (element, (version_type, version_value)) in parsed.elements().iter().zip(&elements) {
            prop_assert_eq!(element.version_type(), version_type.as_str());
            prop_assert_eq!(element.version_value(), version_value.as_str());
        }
    }

    /// Anything without the infix is not a source version, and that is not
    /// an error.
    #[test]
    fn no_infix_is_none(raw in r"[a-zA-Z0-9._-]{0,24}") {
        prop_assume!(!raw.contains("-SRC-"));
        prop_assert!(SrcVersion::parse(&raw).unwrap().is_none());
    }
}
