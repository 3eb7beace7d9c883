// ABOUTME: Random value generation following a character-class policy.
// ABOUTME: Used for "generate" and "generate or enter manually" parameters.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::template::AutoGenerateConfig;

const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const NUMERIC: &[u8] = b"0123456789";
const SPECIAL: &[u8] = b"~!@#$%^&*()_+-={}[]:;<>,.?";

/// Generate a value satisfying `config`, or explain why it cannot be done.
pub fn generate(config: &AutoGenerateConfig) -> Result<String, String> {
    let classes = [
        (LOWER, config.no_lower, config.min_lower, "lower"),
        (UPPER, config.no_upper, config.min_upper, "upper"),
        (NUMERIC, config.no_numeric, config.min_numeric, "numeric"),
        (SPECIAL, config.no_special, config.min_special, "special"),
    ];

    let mut required = 0;
    let mut pool: Vec<u8> = Vec::new();
    for (chars, disabled, min, name) in classes {
        if disabled {
            if min > 0 {
                return Err(format!("{name} characters are disabled but a minimum of {min} is required"));
            }
            continue;
        }
        required += min;
        pool.extend_from_slice(chars);
    }

    if pool.is_empty() {
        return Err("all character classes are disabled".to_string());
    }
    if config.length == 0 {
        return Err("length must be greater than 0".to_string());
    }
    if required > config.length {
        return Err(format!(
            "minimum character counts ({required}) exceed the length ({})",
            config.length
        ));
    }

    let mut rng = rand::rng();
    let mut out: Vec<u8> = Vec::with_capacity(config.length);
    for (chars, disabled, min, _) in classes {
        if disabled {
            continue;
        }
        for _ in 0..min {
            out.push(chars[rng.random_range(0..chars.len())]);
        }
    }
    while out.len() < config.length {
        out.push(pool[rng.random_range(0..pool.len())]);
    }
    out.shuffle(&mut rng);

    Ok(out.into_iter().map(char::from).collect())
}
