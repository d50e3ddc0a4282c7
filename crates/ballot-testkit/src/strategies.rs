//! Proptest strategies for ballot inputs

use proptest::prelude::*;

/// Addresses in canonical (already normalized) form.
pub fn address() -> impl Strategy<Value = String> {
    ("[a-z][a-z0-9._]{0,15}", "[a-z]{1,10}", "(com|org|net)")
        .prop_map(|(local, domain, tld)| format!("{local}@{domain}.{tld}"))
}

/// Registration-style voter identifiers.
pub fn voter_id() -> impl Strategy<Value = String> {
    "V[0-9A-Z]{1,12}"
}

/// Display names, including punctuation that CSV export must escape.
pub fn display_name() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z ,\"'.-]{0,30}"
}

/// Passcode lengths accepted by configuration.
pub fn code_length() -> impl Strategy<Value = usize> {
    4usize..=10
}
