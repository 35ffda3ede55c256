//! Proof Key for Code Exchange (RFC 7636).

use rebate_core::defaults::{PKCE_VERIFIER_MAX_LEN, PKCE_VERIFIER_MIN_LEN};
use rebate_core::CodeChallengeMethod;
use rebate_crypto::{constant_time_eq, sha256_base64url};

/// Length of an S256 challenge: base64url of 32 bytes, unpadded.
const S256_CHALLENGE_LEN: usize = 43;

fn is_unreserved(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~')
}

/// `code_verifier = 43*128unreserved`.
pub fn is_valid_verifier(verifier: &str) -> bool {
    (PKCE_VERIFIER_MIN_LEN..=PKCE_VERIFIER_MAX_LEN).contains(&verifier.len())
        && verifier.chars().all(is_unreserved)
}

/// Syntax check for a challenge at issue time.
pub fn is_valid_challenge(challenge: &str, method: CodeChallengeMethod) -> bool {
    match method {
        CodeChallengeMethod::Plain => is_valid_verifier(challenge),
        CodeChallengeMethod::S256 => {
            challenge.len() == S256_CHALLENGE_LEN
                && challenge
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        }
    }
}

/// Check a presented verifier against the stored challenge.
pub fn verify_code_verifier(
    verifier: &str,
    challenge: &str,
    method: CodeChallengeMethod,
) -> bool {
    if !is_valid_verifier(verifier) {
        return false;
    }
    match method {
        CodeChallengeMethod::Plain => constant_time_eq(verifier, challenge),
        CodeChallengeMethod::S256 => {
            constant_time_eq(&sha256_base64url(verifier.as_bytes()), challenge)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 7636 Appendix B
    const VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
    const CHALLENGE: &str = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";

    #[test]
    fn test_s256_rfc_vector() {
        assert!(verify_code_verifier(VERIFIER, CHALLENGE, CodeChallengeMethod::S256));
    }

    #[test]
    fn test_s256_wrong_verifier() {
        let other = "eBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        assert!(!verify_code_verifier(other, CHALLENGE, CodeChallengeMethod::S256));
    }

    #[test]
    fn test_plain() {
        assert!(verify_code_verifier(VERIFIER, VERIFIER, CodeChallengeMethod::Plain));
        assert!(!verify_code_verifier(VERIFIER, CHALLENGE, CodeChallengeMethod::Plain));
    }

    #[test]
    fn test_verifier_syntax() {
        assert!(is_valid_verifier(&"a".repeat(43)));
        assert!(is_valid_verifier(&"a".repeat(128)));
        assert!(!is_valid_verifier(&"a".repeat(42)));
        assert!(!is_valid_verifier(&"a".repeat(129)));
        assert!(!is_valid_verifier(&format!("{}+", "a".repeat(43))));
    }

    #[test]
    fn test_short_verifier_rejected_even_if_plain_matches() {
        assert!(!verify_code_verifier("short", "short", CodeChallengeMethod::Plain));
    }

    #[test]
    fn test_challenge_syntax() {
        assert!(is_valid_challenge(CHALLENGE, CodeChallengeMethod::S256));
        assert!(!is_valid_challenge("too-short", CodeChallengeMethod::S256));
        assert!(!is_valid_challenge(&format!("{}=", &CHALLENGE[..42]), CodeChallengeMethod::S256));
        assert!(is_valid_challenge(VERIFIER, CodeChallengeMethod::Plain));
    }
}
