//! Lobby code generation.
//!
//! A code is a fixed prefix plus a short random base-36 suffix, e.g.
//! `ACM7QZ`. Codes only have to be unique among lobbies that currently
//! exist, so a generated code is checked against the registry and
//! regenerated on collision.

use rand::Rng;
use typerace_protocol::LobbyCode;

const BASE36: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Collisions tolerated at one suffix length before growing it.
const ATTEMPTS_PER_LENGTH: usize = 32;

/// Generates one code: `prefix` followed by `suffix_len` random
/// characters from `0-9A-Z`.
pub fn generate_code<R: Rng + ?Sized>(rng: &mut R, prefix: &str, suffix_len: usize) -> LobbyCode {
    let mut code = String::with_capacity(prefix.len() + suffix_len);
    code.push_str(prefix);
    for _ in 0..suffix_len {
        code.push(BASE36[rng.random_range(0..BASE36.len())] as char);
    }
    LobbyCode(code)
}

/// Generates a code for which `is_taken` returns `false`.
///
/// After [`ATTEMPTS_PER_LENGTH`] collisions in a row the suffix gets one
/// character longer, so this terminates even when every code of the
/// configured length is in use.
pub fn generate_unique_code<R, F>(rng: &mut R, prefix: &str, suffix_len: usize, mut is_taken: F) -> LobbyCode
where
    R: Rng + ?Sized,
    F: FnMut(&LobbyCode) -> bool,
{
    let mut len = suffix_len.max(1);
    loop {
        for _ in 0..ATTEMPTS_PER_LENGTH {
            let code = generate_code(rng, prefix, len);
            if !is_taken(&code) {
                return code;
            }
        }
        tracing::warn!(prefix, suffix_len = len, "lobby code space crowded, lengthening suffix");
        len += 1;
    }
}

/// Canonical form of a code typed by a player: surrounding whitespace
/// removed, letters uppercased. `acm7qz ` finds lobby `ACM7QZ`.
pub fn normalize_code(code: &LobbyCode) -> LobbyCode {
    LobbyCode(code.as_str().trim().to_ascii_uppercase())
}
