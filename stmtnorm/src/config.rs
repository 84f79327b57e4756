//! Caller-supplied configuration: institution codes and MT940 settings.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Institution code to BIC.
pub const INSTITUTIONS: &[(&str, &str)] = &[
    ("ASN", "ASNBNL21"),
    ("MBANK", "BREXPLPW"),
    ("ABNAMRO", "ABNANL2A"),
    ("ING", "INGBNL2A"),
    ("KNAB", "KNABNL2H"),
    ("RABO", "RABONL2U"),
    ("SNS", "SNSBNL2A"),
    ("TRIODOS", "TRIONL2U"),
];

/// BIC for an institution code, case-insensitive.
pub fn institution_bic(code: &str) -> Option<&'static str> {
    INSTITUTIONS
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, bic)| *bic)
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Mt940Settings {
    /// Selects the tag dialect and, without `bank_id`, the BIC.
    pub bank_code: String,
    /// Explicit institution identifier; wins over the code's BIC.
    pub bank_id: Option<String>,
    /// Closing-date leniency: end date follows the last line when the closing balance is stale.
    pub end_date_derived_from_statements: bool,
}

impl Default for Mt940Settings {
    fn default() -> Self {
        Mt940Settings {
            bank_code: "ASN".to_string(),
            bank_id: None,
            end_date_derived_from_statements: false,
        }
    }
}

impl Mt940Settings {
    pub fn for_bank(code: &str) -> Self {
        Mt940Settings {
            bank_code: code.to_string(),
            ..Self::default()
        }
    }

    /// Reads string-valued plugin settings; unknown keys are ignored.
    pub fn from_settings(settings: &HashMap<String, String>) -> Self {
        let mut out = Self::default();
        if let Some(code) = settings.get("bank_code") {
            out.bank_code = code.clone();
        }
        if let Some(id) = settings.get("bank_id") {
            out.bank_id = Some(id.clone());
        }
        if let Some(flag) = settings.get("end_date_derived_from_statements") {
            out.end_date_derived_from_statements = flag.eq_ignore_ascii_case("true");
        }
        out
    }

    pub fn resolve_bank_id(&self) -> Result<String> {
        match &self.bank_id {
            Some(id) => Ok(id.clone()),
            None => institution_bic(&self.bank_code)
                .map(str::to_string)
                .ok_or_else(|| Error::UnknownInstitution(self.bank_code.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_case_insensitive() {
        assert_eq!(institution_bic("asn"), Some("ASNBNL21"));
        assert_eq!(institution_bic("Triodos"), Some("TRIONL2U"));
        assert_eq!(institution_bic("XYZ"), None);
    }

    #[test]
    fn override_wins_over_code() {
        let s = Mt940Settings {
            bank_code: "XYZ".into(),
            bank_id: Some("ASNBNL21".into()),
            ..Mt940Settings::default()
        };
        assert_eq!(s.resolve_bank_id().unwrap(), "ASNBNL21");
    }

    #[test]
    fn unknown_code_without_override() {
        let err = Mt940Settings::for_bank("XYZ").resolve_bank_id().unwrap_err();
        assert!(matches!(err, Error::UnknownInstitution(code) if code == "XYZ"));
    }

    #[test]
    fn string_settings() {
        let map: HashMap<String, String> = [
            ("bank_code", "MBANK"),
            ("end_date_derived_from_statements", "True"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let s = Mt940Settings::from_settings(&map);
        assert_eq!(s.bank_code, "MBANK");
        assert_eq!(s.bank_id, None);
        assert!(s.end_date_derived_from_statements);
    }

    #[test]
    fn deserializes_with_defaults() {
        let s: Mt940Settings = serde_json::from_str(r#"{"bank_code": "RABO"}"#).unwrap();
        assert_eq!(s.bank_code, "RABO");
        assert!(!s.end_date_derived_from_statements);
        assert_eq!(s.resolve_bank_id().unwrap(), "RABONL2U");
    }
}
