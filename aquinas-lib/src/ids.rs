use std::{fmt, str::FromStr};

use thiserror::Error;

/// Block inserted into an identity code to form the long-form admission number.
const ADMISSION_PADDING: &str = "0000";
/// Number of leading characters kept before the padding block.
const ADMISSION_PREFIX_LEN: usize = 4;

/// Expand a short identity code into its long-form admission number.
///
/// The padding block is inserted after the fourth character and the rest of the code is kept
/// as-is, so `AQ1234` becomes `AQ12000034`. The expansion is one-way, applying it to an
/// admission number pads it a second time.
pub fn derive_admission_number(code: &str) -> Result<String, ParseIdError> {
    if code.chars().count() < ADMISSION_PREFIX_LEN {
        return Err(ParseIdError::TooShort {
            given: code.to_owned(),
        });
    }
    let split = code
        .char_indices()
        .nth(ADMISSION_PREFIX_LEN)
        .map_or(code.len(), |(i, _)| i);

    let mut admission_number = String::with_capacity(code.len() + ADMISSION_PADDING.len());
    admission_number.push_str(&code[..split]);
    admission_number.push_str(ADMISSION_PADDING);
    admission_number.push_str(&code[split..]);
    Ok(admission_number)
}

/// The short-form code a student knows themselves by (e.g. `AQ123456`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityCode {
    code: String,
    admission_number: AdmissionNumber,
}

impl IdentityCode {
    pub fn as_str(&self) -> &str {
        &self.code
    }

    /// Long-form admission number used by every API request.
    pub fn admission_number(&self) -> &AdmissionNumber {
        &self.admission_number
    }
}

impl FromStr for IdentityCode {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = normalize(s);
        let admission_number = derive_admission_number(&code)
            .map(AdmissionNumber)
            .map_err(|_| ParseIdError::TooShort {
                given: s.to_owned(),
            })?;

        Ok(Self {
            code,
            admission_number,
        })
    }
}

impl fmt::Display for IdentityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

/// Long-form identifier sent to the server (e.g. `AQ120000345678`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AdmissionNumber(String);

impl AdmissionNumber {
    /// Wrap an admission number that is already in long form.
    pub fn new_raw(admission_number: impl Into<String>) -> Self {
        Self(admission_number.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&IdentityCode> for AdmissionNumber {
    fn from(code: &IdentityCode) -> Self {
        code.admission_number.clone()
    }
}

impl fmt::Display for AdmissionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize user input for use in [`FromStr`](std::str::FromStr) implementations.
fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Error when parsing an identity code.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseIdError {
    /// The code has fewer characters than the admission number prefix.
    #[error("`{given}` is too short to be an identity code")]
    TooShort { given: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserts_padding_after_fourth_character() {
        assert_eq!(derive_admission_number("AQ1234").unwrap(), "AQ12000034");
        assert_eq!(derive_admission_number("AQ123456").unwrap(), "AQ1200003456");
    }

    #[test]
    fn keeps_everything_but_the_padding() {
        for code in ["AQ12", "AQ12X", "aq123456", "ÄÖÜß99"] {
            let derived = derive_admission_number(code).unwrap();
            let prefix: String = code.chars().take(4).collect();
            let suffix: String = code.chars().skip(4).collect();
            assert_eq!(derived, format!("{prefix}0000{suffix}"));
        }
    }

    #[test]
    fn rejects_short_codes() {
        assert_eq!(
            derive_admission_number("AQ1"),
            Err(ParseIdError::TooShort {
                given: "AQ1".to_owned(),
            })
        );
        assert!("a q".parse::<IdentityCode>().is_err());
    }

    #[test]
    fn derivation_is_not_idempotent() {
        let once = derive_admission_number("AQ1234").unwrap();
        let twice = derive_admission_number(&once).unwrap();
        assert_ne!(once, twice);
        assert_eq!(twice.len(), once.len() + 4);
    }

    #[test]
    fn identity_code_is_normalized() {
        let code: IdentityCode = " aq12 34 ".parse().unwrap();
        assert_eq!(code.as_str(), "AQ1234");
        assert_eq!(code.admission_number().as_str(), "AQ12000034");
    }
}
