//! Fuzz testing for request validation and confirmation tokens.
//!
//! Request bodies, query strings and tokens all arrive straight from
//! clients. This target feeds arbitrary bytes to each entry point and only
//! checks that nothing panics: every input must end in `Ok` or `Err`.
//!
//! # Running the Fuzz Tests
//!
//! ```bash
//! # Install cargo-fuzz (requires nightly)
//! cargo +nightly install cargo-fuzz
//!
//! # Run the validation fuzz target
//! cargo +nightly fuzz run fuzz_validation
//!
//! # Run with a time limit (e.g., 60 seconds)
//! cargo +nightly fuzz run fuzz_validation -- -max_total_time=60
//! ```
//!
//! # What This Tests
//!
//! - JSON bodies against the contact, newsletter and registration schemas
//! - Query strings against the content and listing schemas
//! - Confirmation token verification

#![no_main]

use std::sync::LazyLock;

use chrono::{Duration, Utc};
use consult_api::models::{
    ContactForm, ContactListQuery, ContentQuery, RegistrationRequest, SubscribeRequest,
};
use consult_api::token::ConfirmationTokens;
use consult_api::validation::{RawInput, Validate, parse_query, validate};
use libfuzzer_sys::fuzz_target;

static TOKENS: LazyLock<Option<ConfirmationTokens>> =
    LazyLock::new(|| ConfirmationTokens::new("fuzz-secret", Duration::hours(48)).ok());

fn check_json<T: Validate>(data: &[u8]) {
    let _ = validate::<T>(RawInput::Json(data), T::schema());
}

fn check_query<T: Validate>(query: &str) {
    let _ = validate::<T>(RawInput::Query(query), T::schema());
}

fuzz_target!(|data: &[u8]| {
    check_json::<ContactForm>(data);
    check_json::<SubscribeRequest>(data);
    check_json::<RegistrationRequest>(data);

    if let Ok(s) = std::str::from_utf8(data) {
        let _ = parse_query(s);
        check_query::<ContentQuery>(s);
        check_query::<ContactListQuery>(s);

        if let Some(tokens) = TOKENS.as_ref() {
            let _ = tokens.verify(s, Utc::now());
        }
    }
});
