//! # Phonetic Encoders
//!
//! Soundex, NYSIIS and Metaphone codes for normalized name tokens, backed by
//! `rphonetic`. Anything that is not an ASCII letter is dropped first; a
//! token without letters encodes to empty strings, which are never indexed.

use rphonetic::{Encoder, Metaphone, Nysiis, Soundex};
use serde::{Deserialize, Serialize};

/// Codes for one token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PhoneticCodes {
    pub soundex: String,
    pub nysiis: String,
    pub metaphone: String,
}

impl PhoneticCodes {
    pub fn is_empty(&self) -> bool {
        self.soundex.is_empty()
    }
}

/// Encode a normalized token with every algorithm.
pub fn encode(token: &str) -> PhoneticCodes {
    let word = letters(token);
    if word.is_empty() {
        return PhoneticCodes::default();
    }
    PhoneticCodes {
        soundex: soundex(&word),
        nysiis: nysiis(&word),
        metaphone: metaphone(&word),
    }
}

fn letters(token: &str) -> String {
    token
        .chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// American Soundex: first letter plus three digits, zero padded.
pub fn soundex(token: &str) -> String {
    let word = letters(token);
    if word.is_empty() {
        return String::new();
    }
    Soundex::default().encode(&word)
}

/// NYSIIS, truncated to six characters.
pub fn nysiis(token: &str) -> String {
    let word = letters(token);
    if word.is_empty() {
        return String::new();
    }
    Nysiis::default().encode(&word)
}

/// Metaphone, truncated to four characters.
pub fn metaphone(token: &str) -> String {
    let word = letters(token);
    if word.is_empty() {
        return String::new();
    }
    Metaphone::default().encode(&word)
}
