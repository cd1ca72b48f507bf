//! Registration form state: canonical values plus a per-field "missing" flag.
//!
//! Flags are kept as their own state rather than derived on read, so a bulk
//! pre-fill that only touches some fields leaves the other flags exactly as
//! they were. Whenever a field's value changes, its flag is recomputed as
//! `value.trim().is_empty()`.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("Unknown form field: '{0}'")]
    UnknownField(String),
}

// ═══════════════════════════════════════════════════════════
// Field names
// ═══════════════════════════════════════════════════════════

/// Canonical registration fields, in form order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldName {
    FirstName,
    LastName,
    Dob,
    Sex,
    Address,
    Nationality,
    PassportNumber,
    LicenseNumber,
}

impl FieldName {
    pub const ALL: [FieldName; 8] = [
        Self::FirstName,
        Self::LastName,
        Self::Dob,
        Self::Sex,
        Self::Address,
        Self::Nationality,
        Self::PassportNumber,
        Self::LicenseNumber,
    ];

    /// Wire name (camelCase), as used by the frontend inputs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstName => "firstName",
            Self::LastName => "lastName",
            Self::Dob => "dob",
            Self::Sex => "sex",
            Self::Address => "address",
            Self::Nationality => "nationality",
            Self::PassportNumber => "passportNumber",
            Self::LicenseNumber => "licenseNumber",
        }
    }

    /// Human label shown next to the input.
    pub fn label(&self) -> &'static str {
        match self {
            Self::FirstName => "First Name",
            Self::LastName => "Last Name",
            Self::Dob => "Date of Birth",
            Self::Sex => "Sex",
            Self::Address => "Address",
            Self::Nationality => "Nationality",
            Self::PassportNumber => "Passport Number",
            Self::LicenseNumber => "License Number",
        }
    }
}

impl FromStr for FieldName {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| FormError::UnknownField(s.to_string()))
    }
}

impl std::fmt::Display for FieldName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════
// FormFields
// ═══════════════════════════════════════════════════════════

/// A complete set of canonical field values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormFields {
    pub first_name: String,
    pub last_name: String,
    pub dob: String,
    pub sex: String,
    pub address: String,
    pub nationality: String,
    pub passport_number: String,
    pub license_number: String,
}

impl FormFields {
    pub fn get(&self, field: FieldName) -> &str {
        match field {
            FieldName::FirstName => &self.first_name,
            FieldName::LastName => &self.last_name,
            FieldName::Dob => &self.dob,
            FieldName::Sex => &self.sex,
            FieldName::Address => &self.address,
            FieldName::Nationality => &self.nationality,
            FieldName::PassportNumber => &self.passport_number,
            FieldName::LicenseNumber => &self.license_number,
        }
    }

    fn slot_mut(&mut self, field: FieldName) -> &mut String {
        match field {
            FieldName::FirstName => &mut self.first_name,
            FieldName::LastName => &mut self.last_name,
            FieldName::Dob => &mut self.dob,
            FieldName::Sex => &mut self.sex,
            FieldName::Address => &mut self.address,
            FieldName::Nationality => &mut self.nationality,
            FieldName::PassportNumber => &mut self.passport_number,
            FieldName::LicenseNumber => &mut self.license_number,
        }
    }

    pub fn set(&mut self, field: FieldName, value: impl Into<String>) {
        *self.slot_mut(field) = value.into();
    }

    /// `(name, value)` pairs in form order.
    pub fn iter(&self) -> impl Iterator<Item = (FieldName, &str)> + '_ {
        FieldName::ALL.iter().map(move |&f| (f, self.get(f)))
    }

    /// Every field as a patch entry. A complete record always overwrites
    /// all eight fields when pre-filled.
    pub fn into_patch(self) -> FieldPatch {
        FieldName::ALL
            .iter()
            .map(|&f| (f, self.get(f).to_string()))
            .collect()
    }
}

/// Partial set of values for a bulk pre-fill. Absent keys are left alone.
pub type FieldPatch = BTreeMap<FieldName, String>;

// ═══════════════════════════════════════════════════════════
// FormState
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormPhase {
    Empty,
    Prefilled,
    Editing,
}

/// Serializable view of the form for the frontend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormSnapshot {
    pub phase: FormPhase,
    pub values: FormFields,
    pub missing: BTreeMap<FieldName, bool>,
}

#[derive(Debug, Clone)]
pub struct FormState {
    values: FormFields,
    missing: BTreeMap<FieldName, bool>,
    phase: FormPhase,
}

impl Default for FormState {
    fn default() -> Self {
        Self::new()
    }
}

impl FormState {
    /// All fields empty, nothing flagged.
    pub fn new() -> Self {
        Self {
            values: FormFields::default(),
            missing: FieldName::ALL.iter().map(|&f| (f, false)).collect(),
            phase: FormPhase::Empty,
        }
    }

    /// Clear every value and every flag.
    pub fn reset(&mut self) {
        self.values = FormFields::default();
        for flag in self.missing.values_mut() {
            *flag = false;
        }
        self.phase = FormPhase::Empty;
        debug!("Form reset");
    }

    /// Merge extracted values into the form.
    ///
    /// An empty patch is a reset. Otherwise each provided field is
    /// overwritten and re-flagged; fields absent from the patch keep both
    /// their value and their flag.
    pub fn bulk_prefill(&mut self, patch: &FieldPatch) {
        if patch.is_empty() {
            self.reset();
            return;
        }

        for (&field, value) in patch {
            self.values.set(field, value.clone());
            self.missing.insert(field, is_blank(value));
        }
        self.phase = FormPhase::Prefilled;

        info!(
            provided = patch.len(),
            missing = ?self.missing_fields(),
            "Form pre-filled"
        );
    }

    /// User edit of a single field.
    pub fn set_field(&mut self, field: FieldName, value: impl Into<String>) {
        let value = value.into();
        self.missing.insert(field, is_blank(&value));
        self.values.set(field, value);
        self.phase = FormPhase::Editing;
    }

    /// `set_field` addressed by wire name.
    pub fn set_field_by_name(&mut self, name: &str, value: impl Into<String>) -> Result<(), FormError> {
        let field = name.parse::<FieldName>()?;
        self.set_field(field, value);
        Ok(())
    }

    pub fn value(&self, field: FieldName) -> &str {
        self.values.get(field)
    }

    pub fn values(&self) -> &FormFields {
        &self.values
    }

    pub fn is_missing(&self, field: FieldName) -> bool {
        self.missing.get(&field).copied().unwrap_or(false)
    }

    /// Flagged fields in form order.
    pub fn missing_fields(&self) -> Vec<FieldName> {
        FieldName::ALL
            .iter()
            .copied()
            .filter(|f| self.is_missing(*f))
            .collect()
    }

    pub fn phase(&self) -> FormPhase {
        self.phase
    }

    pub fn snapshot(&self) -> FormSnapshot {
        FormSnapshot {
            phase: self.phase,
            values: self.values.clone(),
            missing: self.missing.clone(),
        }
    }

    /// Save action: the canonical record is the output. Not persisted.
    pub fn submit(&self) -> FormFields {
        let record = self.values.clone();
        info!(
            record = %serde_json::to_string(&record).unwrap_or_default(),
            missing = ?self.missing_fields(),
            "Registration form submitted"
        );
        record
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
