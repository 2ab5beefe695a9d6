//! Types for the PostgrestClient

/// Count options for queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountOption {
    /// Exact count
    Exact,

    /// Planned count (estimated by the query planner)
    Planned,

    /// Estimated count
    Estimated,
}

impl CountOption {
    /// Convert the option to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            CountOption::Exact => "exact",
            CountOption::Planned => "planned",
            CountOption::Estimated => "estimated",
        }
    }
}

/// Options for returning data from writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnOption {
    /// Return representation (the written rows)
    Representation,

    /// Return nothing
    Minimal,
}

impl ReturnOption {
    /// The `Prefer` header value
    pub fn prefer(&self) -> &'static str {
        match self {
            ReturnOption::Representation => "return=representation",
            ReturnOption::Minimal => "return=minimal",
        }
    }
}

/// Total row count from a `Content-Range` header such as `0-24/3573` or `*/0`
pub fn parse_content_range(header: &str) -> Option<u64> {
    let (_, total) = header.rsplit_once('/')?;
    total.trim().parse().ok()
}
