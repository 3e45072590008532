//! Field-level error collection shared by the HTML forms.

use std::collections::BTreeMap;

use crate::domain::error::DomainError;

/// Errors keyed by form field plus errors that belong to the whole form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    fields: BTreeMap<&'static str, Vec<String>>,
    non_field: Vec<String>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_default().push(message.into());
    }

    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.non_field.push(message.into());
    }

    /// Record the domain error against `field` and return the valid value.
    pub fn check<T>(&mut self, field: &'static str, result: Result<T, DomainError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.add(field, err.message());
                None
            }
        }
    }

    pub fn field(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn non_field(&self) -> &[String] {
        &self.non_field
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.non_field.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_collects_messages_per_field() {
        let mut errors = FormErrors::new();
        assert_eq!(errors.check("text", Ok::<_, DomainError>("ok")), Some("ok"));
        assert!(errors.is_empty());

        let missing: Option<String> =
            errors.check("text", Err(DomainError::validation("text must not be blank")));
        assert!(missing.is_none());
        assert_eq!(errors.field("text"), ["text must not be blank".to_string()]);
        assert!(errors.field("group").is_empty());
        assert!(!errors.is_empty());
    }
}
