//! Digit grouping styles for displayed amounts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseGroupingError;

/// How the integer part of an amount is split into groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grouping {
    /// Indian style: last three digits, then pairs (`12,34,567`).
    #[default]
    Lakh,
    /// Western style: groups of three (`1,234,567`).
    Thousands,
}

impl Grouping {
    /// Insert `,` separators into a string of ASCII digits.
    pub fn group_digits(&self, digits: &str) -> String {
        if digits.len() <= 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return digits.to_string();
        }

        let (head, tail) = digits.split_at(digits.len() - 3);
        let step = match self {
            Grouping::Lakh => 2,
            Grouping::Thousands => 3,
        };

        let mut groups: Vec<&str> = Vec::new();
        let mut end = head.len();
        while end > 0 {
            let start = end.saturating_sub(step);
            groups.push(&head[start..end]);
            end = start;
        }
        groups.reverse();

        let mut out = String::with_capacity(digits.len() + groups.len());
        for group in groups {
            out.push_str(group);
            out.push(',');
        }
        out.push_str(tail);
        out
    }
}

impl fmt::Display for Grouping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grouping::Lakh => write!(f, "lakh"),
            Grouping::Thousands => write!(f, "thousands"),
        }
    }
}

impl FromStr for Grouping {
    type Err = ParseGroupingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lakh" | "en-in" | "indian" => Ok(Grouping::Lakh),
            "thousands" | "en-us" | "western" => Ok(Grouping::Thousands),
            other => Err(ParseGroupingError(other.to_string())),
        }
    }
}
