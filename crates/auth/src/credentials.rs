//! Random username/password generation.

use rand::Rng;
use serde::{Deserialize, Serialize};

use memberkit_core::DomainError;

const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz0123456789";
const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const SPECIAL: &str = "#+*&%$§()[]{}!.:-_,;";

/// Shape of an autogenerated credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSpec {
    pub length: usize,
    #[serde(default, alias = "addUpperCase")]
    pub add_upper_case: bool,
    #[serde(default, alias = "addSpecialCharacters")]
    pub add_special_characters: bool,
}

impl CredentialSpec {
    pub fn new(length: usize) -> Self {
        Self {
            length,
            add_upper_case: false,
            add_special_characters: false,
        }
    }

    pub fn with_upper_case(mut self) -> Self {
        self.add_upper_case = true;
        self
    }

    pub fn with_special_characters(mut self) -> Self {
        self.add_special_characters = true;
        self
    }

    /// Reject specs that would autogenerate an empty credential.
    pub fn validate(&self, what: &str) -> Result<(), DomainError> {
        if self.length == 0 {
            return Err(DomainError::configuration(format!(
                "autogenerate.{what}.length must be greater than zero"
            )));
        }
        Ok(())
    }

    fn alphabet(&self) -> Vec<char> {
        let mut chars: Vec<char> = LOWERCASE.chars().collect();
        if self.add_upper_case {
            chars.extend(UPPERCASE.chars());
        }
        if self.add_special_characters {
            chars.extend(SPECIAL.chars());
        }
        chars
    }
}

/// Generate a random string of exactly `spec.length` characters.
///
/// Draws from `rand::thread_rng()`, which is a CSPRNG reseeded from the OS.
pub fn generate(spec: &CredentialSpec) -> String {
    let alphabet = spec.alphabet();
    let mut rng = rand::thread_rng();
    (0..spec.length)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
        .collect()
}
