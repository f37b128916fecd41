//! Custom `validator` rules.

use validator::ValidationError;

/// Rejects empty and whitespace-only strings with the `required` code.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}

/// Required email address: `local@domain.tld`, no whitespace, exactly one `@`,
/// and a dot inside the domain.
///
/// Blank input fails with `required`, malformed input with `email`.
pub fn email_address(value: &str) -> Result<(), ValidationError> {
    not_blank(value)?;

    let value = value.trim();
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && !value.chars().any(char::is_whitespace)
                && domain
                    .char_indices()
                    .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
        }
        None => false,
    };
    if !valid {
        return Err(ValidationError::new("email"));
    }
    Ok(())
}
