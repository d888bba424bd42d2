//! Random join code generation

use rand::Rng;

use crate::domain::team::{TeamCode, TeamCodeGenerator, TEAM_CODE_LENGTH};

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Draws codes uniformly from `[A-Z0-9]` using the thread-local CSPRNG
#[derive(Debug, Clone, Default)]
pub struct RandomCodeGenerator;

impl RandomCodeGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl TeamCodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> TeamCode {
        let mut rng = rand::thread_rng();

        let code: String = (0..TEAM_CODE_LENGTH)
            .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
            .collect();

        // Every character comes from the alphabet, so the code is always valid.
        TeamCode::new(code.clone()).unwrap_or_else(|_| unreachable!("invalid generated code {code}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_code_shape() {
        let generator = RandomCodeGenerator::new();

        for _ in 0..200 {
            let code = generator.generate();
            assert_eq!(code.as_str().len(), 8);
            assert!(code
                .as_str()
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_generated_codes_differ() {
        let generator = RandomCodeGenerator::new();
        let codes: HashSet<String> = (0..1000)
            .map(|_| generator.generate().to_string())
            .collect();

        assert_eq!(codes.len(), 1000);
    }

    #[test]
    fn test_alphabet_is_uppercase_alphanumeric() {
        assert_eq!(CODE_ALPHABET.len(), 36);
        assert!(CODE_ALPHABET
            .iter()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
    }
}
