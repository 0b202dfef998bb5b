pub mod dex;
pub mod metadata;
pub mod price;
pub mod sentiment;

/// A record that cannot be normalized. The caller logs and skips it; one bad
/// record never aborts a batch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransformError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("invalid `{field}`: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },
}

pub(crate) fn required_symbol(raw: &str) -> Result<String, TransformError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TransformError::MissingField("symbol"));
    }
    Ok(trimmed.to_uppercase())
}

pub(crate) fn required_text(
    value: Option<&str>,
    field: &'static str,
) -> Result<String, TransformError> {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(TransformError::MissingField(field)),
    }
}

pub(crate) fn finite_non_negative(value: f64, field: &'static str) -> Result<f64, TransformError> {
    if !value.is_finite() {
        return Err(TransformError::InvalidValue {
            field,
            reason: "not a finite number".to_string(),
        });
    }
    if value < 0.0 {
        return Err(TransformError::InvalidValue {
            field,
            reason: "negative".to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_are_trimmed_and_uppercased() {
        assert_eq!(required_symbol("  btc "), Ok("BTC".to_string()));
        assert_eq!(
            required_symbol("   "),
            Err(TransformError::MissingField("symbol"))
        );
    }

    #[test]
    fn non_finite_values_are_rejected() {
        assert!(finite_non_negative(f64::NAN, "price").is_err());
        assert!(finite_non_negative(f64::INFINITY, "price").is_err());
        assert!(finite_non_negative(-0.01, "price").is_err());
        assert_eq!(finite_non_negative(0.0, "price"), Ok(0.0));
    }
}
