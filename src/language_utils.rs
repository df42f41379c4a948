use anyhow::{anyhow, Result};
use isolang::Language;

/// Language utilities for ISO language code handling
///
/// This module provides functions for validating and matching ISO 639-1
/// (2-letter) and ISO 639-3 (3-letter) language codes, used to reject
/// misconfigured language pairs at configuration time.
/// Language code type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageCodeType {
    /// ISO 639-1 (2-letter) code
    Part1,
    /// ISO 639-3 (3-letter) code
    Part3,
}

/// Validate if a language code is a valid ISO 639-1 or ISO 639-3 code
pub fn validate_language_code(code: &str) -> Result<LanguageCodeType> {
    let normalized_code = code.trim().to_lowercase();

    if normalized_code.len() == 2 {
        if Language::from_639_1(&normalized_code).is_some() {
            return Ok(LanguageCodeType::Part1);
        }
    } else if normalized_code.len() == 3 && Language::from_639_3(&normalized_code).is_some() {
        return Ok(LanguageCodeType::Part3);
    }

    Err(anyhow!("Invalid language code: {}", code))
}

/// Get the English name of a language from its code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    let language = if normalized_code.len() == 2 {
        Language::from_639_1(&normalized_code)
    } else {
        Language::from_639_3(&normalized_code)
    };

    language
        .map(|l| l.to_name().to_string())
        .ok_or_else(|| anyhow!("Unknown language code: {}", code))
}

/// Check whether two codes denote the same language regardless of code form
pub fn language_codes_match(a: &str, b: &str) -> bool {
    let parse = |code: &str| {
        let normalized = code.trim().to_lowercase();
        if normalized.len() == 2 {
            Language::from_639_1(&normalized)
        } else {
            Language::from_639_3(&normalized)
        }
    };

    match (parse(a), parse(b)) {
        (Some(lang_a), Some(lang_b)) => lang_a == lang_b,
        _ => a.trim().eq_ignore_ascii_case(b.trim()),
    }
}
