//! Filter operations for PostgrestClient

/// Operator for filter expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equal to
    Eq,

    /// Not equal to
    Neq,

    /// Greater than
    Gt,

    /// Greater than or equal to
    Gte,

    /// Less than
    Lt,

    /// Less than or equal to
    Lte,

    /// Is (`null`, `true`, `false`)
    Is,

    /// In a list of values
    In,
}

impl FilterOperator {
    /// Convert the operator to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Neq => "neq",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lt => "lt",
            FilterOperator::Lte => "lte",
            FilterOperator::Is => "is",
            FilterOperator::In => "in",
        }
    }

    /// Render `value` as a PostgREST filter expression
    pub fn expression(&self, value: &str) -> String {
        format!("{}.{}", self.as_str(), value)
    }
}

/// Negate a filter expression
pub fn not(expression: &str) -> String {
    format!("not.{}", expression)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_expressions() {
        assert_eq!(FilterOperator::Eq.expression("42"), "eq.42");
        assert_eq!(FilterOperator::Is.expression("null"), "is.null");
        assert_eq!(not(&FilterOperator::Is.expression("null")), "not.is.null");
    }
}
