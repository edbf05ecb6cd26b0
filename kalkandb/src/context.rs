//! Field context used for domain separation of ciphertext.

use std::fmt;

/// Identifies the entity field a ciphertext belongs to.
///
/// The context is bound to every encryption as associated data, so a
/// ciphertext lifted out of one column cannot be decrypted as another:
///
/// - Different entities produce different ciphertexts
/// - Different fields of the same entity produce different ciphertexts
///
/// # Example
///
/// ```
/// use kalkandb::context::FieldContext;
///
/// let ctx = FieldContext::new("users", "email");
/// assert_eq!(ctx.to_string(), "users|email");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldContext {
    entity_name: String,
    field_name: String,
}

impl FieldContext {
    /// Creates a new field context.
    ///
    /// # Arguments
    ///
    /// * `entity_name` - Name of the entity (table)
    /// * `field_name` - Name of the field (column)
    #[must_use]
    pub fn new(entity_name: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self { entity_name: entity_name.into(), field_name: field_name.into() }
    }

    /// Returns the entity name.
    #[must_use]
    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    /// Returns the field name.
    #[must_use]
    pub fn field_name(&self) -> &str {
        &self.field_name
    }
}

impl fmt::Display for FieldContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.entity_name, self.field_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_context_display() {
        let ctx = FieldContext::new("users", "email");
        assert_eq!(ctx.to_string(), "users|email");
    }

    #[test]
    fn test_field_context_accessors() {
        let ctx = FieldContext::new("users", "ssn");
        assert_eq!(ctx.entity_name(), "users");
        assert_eq!(ctx.field_name(), "ssn");
    }
}
