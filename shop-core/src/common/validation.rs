//! Custom validators plugged into `#[validate(custom(...))]` on input types.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::collections::HashSet;
use validator::ValidationError;

use crate::domain::Translation;

pub const SUPPORTED_LANGS: [&str; 3] = ["en", "ru", "uz"];

static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[0-9]{9,15}$").expect("valid phone regex"));

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

pub fn phone(value: &str) -> Result<(), ValidationError> {
    if PHONE_RE.is_match(value) {
        Ok(())
    } else {
        Err(error("phone", "phone must contain 9 to 15 digits with an optional leading +"))
    }
}

/// Upper bound for money fields, far below the range of `Decimal` so that
/// stock and order totals built from them cannot overflow.
pub fn max_amount() -> Decimal {
    Decimal::from(1_000_000_000_000i64)
}

fn within_max(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= max_amount() {
        Ok(())
    } else {
        Err(error("max_amount", "value must not exceed 1000000000000"))
    }
}

pub fn positive_decimal(value: &Decimal) -> Result<(), ValidationError> {
    if *value > Decimal::ZERO {
        within_max(value)
    } else {
        Err(error("positive", "value must be greater than zero"))
    }
}

pub fn non_negative_decimal(value: &Decimal) -> Result<(), ValidationError> {
    if *value >= Decimal::ZERO {
        within_max(value)
    } else {
        Err(error("non_negative", "value must not be negative"))
    }
}

pub fn lang(value: &str) -> Result<(), ValidationError> {
    if SUPPORTED_LANGS.contains(&value) {
        Ok(())
    } else {
        Err(error("lang", "unsupported language code"))
    }
}

/// At least one translation, one per language, none with an empty title.
pub fn translations(values: &[Translation]) -> Result<(), ValidationError> {
    if values.is_empty() {
        return Err(error("translations", "at least one translation is required"));
    }
    let mut seen = HashSet::new();
    for t in values {
        lang(&t.lang)?;
        if t.title.trim().is_empty() || t.title.len() > 255 {
            return Err(error("translations", "title must be 1 to 255 characters"));
        }
        if !seen.insert(t.lang.as_str()) {
            return Err(error("translations", "duplicate language in translations"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tr(lang: &str, title: &str) -> Translation {
        Translation {
            lang: lang.to_string(),
            title: title.to_string(),
            description: None,
        }
    }

    #[test]
    fn phone_numbers() {
        assert!(phone("+998901234567").is_ok());
        assert!(phone("998901234567").is_ok());
        assert!(phone("12-34").is_err());
        assert!(phone("").is_err());
    }

    #[test]
    fn decimals() {
        assert!(positive_decimal(&Decimal::new(1, 2)).is_ok());
        assert!(positive_decimal(&Decimal::ZERO).is_err());
        assert!(non_negative_decimal(&Decimal::ZERO).is_ok());
        assert!(non_negative_decimal(&Decimal::new(-1, 0)).is_err());
        assert!(non_negative_decimal(&max_amount()).is_ok());
        assert!(non_negative_decimal(&(max_amount() + Decimal::ONE)).is_err());
        assert!(positive_decimal(&Decimal::MAX).is_err());
    }

    #[test]
    fn translation_rules() {
        assert!(translations(&[tr("en", "Shoes"), tr("ru", "Обувь")]).is_ok());
        assert!(translations(&[]).is_err());
        assert!(translations(&[tr("de", "Schuhe")]).is_err());
        assert!(translations(&[tr("en", "Shoes"), tr("en", "Boots")]).is_err());
        assert!(translations(&[tr("en", "  ")]).is_err());
    }
}
