//! Password generation under complexity constraints.
//!
//! The generated value has exactly `complexity.length` characters, at
//! least the requested number from each category, the rest drawn from
//! the full alphabet, and positions shuffled so categories are not
//! grouped. Randomness comes from the thread-local CSPRNG (ChaCha seeded
//! from the OS).

use rand::seq::{IndexedRandom, SliceRandom};
use rand::{CryptoRng, Rng};
use zeroize::Zeroizing;

use crate::errors::{ProviderError, Result};
use crate::record::Complexity;

pub const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
pub const DIGITS: &[u8] = b"0123456789";
pub const SPECIAL: &[u8] = b"!@#$%()+;<>=?[]{}^.,";

/// Check that the complexity can be satisfied at all.
pub fn validate(complexity: &Complexity) -> Result<()> {
    if complexity.length == 0 {
        return Err(ProviderError::Constraint(
            "length must be at least 1".into(),
        ));
    }
    let minimums = complexity.minimum_total();
    if minimums > complexity.length {
        return Err(ProviderError::Constraint(format!(
            "caps + lowercase + digits + special = {minimums} exceeds length {}",
            complexity.length
        )));
    }
    Ok(())
}

/// Generate a password with the thread-local CSPRNG.
pub fn generate_password(complexity: &Complexity) -> Result<Zeroizing<String>> {
    generate_password_with(&mut rand::rng(), complexity)
}

/// Generate a password with a caller-supplied cryptographic RNG.
pub fn generate_password_with<R>(rng: &mut R, complexity: &Complexity) -> Result<Zeroizing<String>>
where
    R: Rng + CryptoRng + ?Sized,
{
    validate(complexity)?;

    let alphabet: Vec<u8> = [UPPERCASE, LOWERCASE, DIGITS, SPECIAL].concat();
    let mut chars: Zeroizing<Vec<u8>> = Zeroizing::new(Vec::with_capacity(complexity.length));

    for (set, count) in [
        (UPPERCASE, complexity.caps),
        (LOWERCASE, complexity.lowercase),
        (DIGITS, complexity.digits),
        (SPECIAL, complexity.special),
    ] {
        for _ in 0..count {
            chars.extend(set.choose(rng));
        }
    }
    while chars.len() < complexity.length {
        chars.extend(alphabet.choose(rng));
    }
    chars.shuffle(rng);

    // Every byte comes from the ASCII sets above.
    let password: String = chars.iter().map(|&b| char::from(b)).collect();
    Ok(Zeroizing::new(password))
}

/// Count characters per category: (upper, lower, digit, special).
pub fn category_counts(value: &str) -> (usize, usize, usize, usize) {
    value.bytes().fold((0, 0, 0, 0), |(u, l, d, s), b| {
        if UPPERCASE.contains(&b) {
            (u + 1, l, d, s)
        } else if LOWERCASE.contains(&b) {
            (u, l + 1, d, s)
        } else if DIGITS.contains(&b) {
            (u, l, d + 1, s)
        } else if SPECIAL.contains(&b) {
            (u, l, d, s + 1)
        } else {
            (u, l, d, s)
        }
    })
}

/// Whether an existing value meets the complexity's length and minimums.
pub fn satisfies(value: &str, complexity: &Complexity) -> bool {
    let (u, l, d, s) = category_counts(value);
    value.chars().count() == complexity.length
        && u >= complexity.caps
        && l >= complexity.lowercase
        && d >= complexity.digits
        && s >= complexity.special
}
