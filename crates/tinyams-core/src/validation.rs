//! Form input checks shared by every entry point that accepts user data.

use crate::error::{AmsError, AmsResult};
use crate::models::association::CreateAssociation;
use crate::models::person::{CreatePerson, PersonFields};

/// Return the trimmed value, or a validation error with `message` when
/// the field is missing or blank.
pub fn required<'a>(value: Option<&'a str>, message: &str) -> AmsResult<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AmsError::validation(message)),
    }
}

/// Checkbox semantics: an unchecked box is simply absent from the form.
pub fn is_checked(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "on" | "true" | "yes")
    )
}

impl CreateAssociation {
    pub fn validate(&self) -> AmsResult<()> {
        required(Some(&self.name), "Please enter an association name")?;
        required(Some(&self.username), "Please enter a username")?;
        required(Some(&self.password), "Please enter a password")?;
        Ok(())
    }
}

impl PersonFields {
    pub fn validate(&self) -> AmsResult<()> {
        required(Some(&self.username), "Please enter a username")?;
        Ok(())
    }
}

impl CreatePerson {
    pub fn validate(&self) -> AmsResult<()> {
        self.fields.validate()?;
        required(Some(&self.password), "Please enter a password")?;
        Ok(())
    }
}
