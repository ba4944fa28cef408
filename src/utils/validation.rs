use crate::utils::error::{PrepError, Result};

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_positive(field_name: &str, value: f64) -> Result<()> {
    if !(value > 0.0) || !value.is_finite() {
        return Err(PrepError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value must be a positive number".to_string(),
        });
    }
    Ok(())
}

pub fn validate_non_negative(field_name: &str, value: f64) -> Result<()> {
    if !(value >= 0.0) || !value.is_finite() {
        return Err(PrepError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value must be zero or greater".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range(field_name: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if value < min || value > max {
        return Err(PrepError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(PrepError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// Well identifiers follow the plate convention: one row letter, then a
/// column number ("A1", "C12").
pub fn validate_well_id(field_name: &str, value: &str) -> Result<()> {
    let mut chars = value.chars();
    let row_ok = chars
        .next()
        .map(|c| c.is_ascii_uppercase())
        .unwrap_or(false);
    let rest: String = chars.collect();
    let col_ok = !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit());

    if !row_ok || !col_ok {
        return Err(PrepError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Well id must be a row letter followed by a column number, e.g. A1".to_string(),
        });
    }
    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| PrepError::MissingConfigError {
        field: field_name.to_string(),
    })
}
