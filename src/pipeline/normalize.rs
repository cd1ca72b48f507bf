//! Map the OCR service's raw field names onto the canonical form record.
//!
//! Each canonical field has an ordered list of source keys; the first one
//! holding a non-empty value wins. Date of birth is additionally rewritten
//! to `YYYY-MM-DD` when it arrives as `DD/MM/YYYY`-style text.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::form::{FieldName, FormFields};
use crate::pipeline::extraction::ExtractedFields;

/// Source keys per canonical field, in precedence order.
const FIELD_ALIASES: &[(FieldName, &[&str])] = &[
    (FieldName::FirstName, &["firstName", "givenNames"]),
    (FieldName::LastName, &["lastName", "surname"]),
    (FieldName::Dob, &["dateOfBirth"]),
    (FieldName::Sex, &["sex", "gender"]),
    (FieldName::Address, &["address"]),
    (FieldName::Nationality, &["StateName", "nationality"]),
    (FieldName::PassportNumber, &["passportNumber"]),
    (FieldName::LicenseNumber, &["licenseNumber"]),
];

/// Two digits, two digits, four digits; `/` or `-` separators (mixable).
/// ASCII digits only.
static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{2})[/-]([0-9]{2})[/-]([0-9]{4})$").unwrap());

/// First non-empty value among `keys`, or `""`.
fn first_present<'a>(raw: &'a ExtractedFields, keys: &[&str]) -> &'a str {
    keys.iter()
        .filter_map(|key| raw.get(key))
        .find(|value| !value.is_empty())
        .unwrap_or("")
}

/// Build the canonical record from raw service output. Never fails: every
/// field is present in the result, empty when no alias had a value.
pub fn normalize(raw: &ExtractedFields) -> FormFields {
    let mut fields = FormFields::default();
    for (field, keys) in FIELD_ALIASES {
        let value = first_present(raw, keys);
        let value = if *field == FieldName::Dob {
            normalize_date(value)
        } else {
            value.to_string()
        };
        fields.set(*field, value);
    }

    debug!(
        raw_keys = raw.len(),
        dob = %fields.dob,
        "Normalized extracted fields"
    );
    fields
}

/// Rewrite `AA/BB/YYYY` (or `-` separated) as ISO `YYYY-..-..`.
///
/// When `AA` is greater than 12 it cannot be a month, so the input is read
/// as day-first and produces `YYYY-BB-AA`. Otherwise it is read as
/// month-first and produces `YYYY-AA-BB`. No calendar validation is done.
/// Anything not matching the pattern is returned unchanged.
pub fn normalize_date(input: &str) -> String {
    let Some(caps) = DATE_PATTERN.captures(input) else {
        return input.to_string();
    };

    let (a, b, year) = (&caps[1], &caps[2], &caps[3]);
    let Ok(a_num) = a.parse::<u32>() else {
        return input.to_string();
    };

    if a_num > 12 {
        format!("{year}-{b}-{a}")
    } else {
        format!("{year}-{a}-{b}")
    }
}
