// ABOUTME: Validators for prompted parameter input.
// ABOUTME: Messages name the violated bound so the user can correct the value.

use crate::template::{ParamDef, ParamType, ParamValue};

/// Check a string against optional length bounds.
pub fn validate_length(
    value: &str,
    min_length: Option<usize>,
    max_length: Option<usize>,
) -> Result<(), String> {
    let len = value.chars().count();
    if let Some(min) = min_length
        && len < min
    {
        return Err(format!("value must be at least {min} characters long"));
    }
    if let Some(max) = max_length
        && len > max
    {
        return Err(format!("value must be at most {max} characters long"));
    }
    Ok(())
}

/// Check a number against optional inclusive bounds.
pub fn validate_range(value: i64, min_value: Option<i64>, max_value: Option<i64>) -> Result<(), String> {
    if let Some(min) = min_value
        && value < min
    {
        return Err(format!("value must be at least {min}"));
    }
    if let Some(max) = max_value
        && value > max
    {
        return Err(format!("value must be at most {max}"));
    }
    Ok(())
}

/// Parse and validate free-text input for `def`.
pub fn validate_input(def: &ParamDef, input: &str) -> Result<ParamValue, String> {
    let value = ParamValue::parse_input(def.param_type, input)?;
    match (&value, def.param_type) {
        (ParamValue::Number(n), ParamType::Number) => {
            validate_range(*n, def.min_value, def.max_value)?
        }
        (ParamValue::String(s), ParamType::String) => {
            validate_length(s, def.min_length, def.max_length)?
        }
        (ParamValue::Array(items), ParamType::Array) => {
            validate_length_count(items.len(), def.min_length, def.max_length)?
        }
        _ => {}
    }
    Ok(value)
}

fn validate_length_count(
    count: usize,
    min_length: Option<usize>,
    max_length: Option<usize>,
) -> Result<(), String> {
    if let Some(min) = min_length
        && count < min
    {
        return Err(format!("array must have at least {min} items"));
    }
    if let Some(max) = max_length
        && count > max
    {
        return Err(format!("array must have at most {max} items"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(min: i64, max: i64) -> ParamDef {
        let mut def = ParamDef::new("size", ParamType::Number);
        def.min_value = Some(min);
        def.max_value = Some(max);
        def
    }

    #[test]
    fn range_messages_name_the_bound() {
        let def = number(1, 10);
        assert_eq!(
            validate_input(&def, "0").unwrap_err(),
            "value must be at least 1"
        );
        assert_eq!(
            validate_input(&def, "11").unwrap_err(),
            "value must be at most 10"
        );
        assert_eq!(validate_input(&def, "5").unwrap(), ParamValue::Number(5));
    }

    #[test]
    fn non_numeric_input_is_rejected() {
        assert!(validate_input(&number(1, 10), "five").is_err());
    }

    #[test]
    fn length_bounds_count_characters() {
        assert!(validate_length("héllo", Some(5), Some(5)).is_ok());
        assert_eq!(
            validate_length("ab", Some(3), None).unwrap_err(),
            "value must be at least 3 characters long"
        );
        assert_eq!(
            validate_length("abcd", None, Some(3)).unwrap_err(),
            "value must be at most 3 characters long"
        );
    }

    #[test]
    fn structural_kinds_are_checked() {
        let array = ParamDef::new("tags", ParamType::Array);
        assert!(validate_input(&array, "[\"a\"]").is_ok());
        assert!(validate_input(&array, "{\"a\": 1}").is_err());

        let object = ParamDef::new("settings", ParamType::Object);
        assert!(validate_input(&object, "{\"a\": 1}").is_ok());
        assert!(validate_input(&object, "[1]").is_err());
    }
}
