//! Shared domain enumerations aligned with persisted database enums.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "grant_type", rename_all = "snake_case")]
pub enum GrantType {
    Scholarship,
    Grant,
    Award,
    Fellowship,
}

impl GrantType {
    pub fn as_str(self) -> &'static str {
        match self {
            GrantType::Scholarship => "scholarship",
            GrantType::Grant => "grant",
            GrantType::Award => "award",
            GrantType::Fellowship => "fellowship",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "grant_status", rename_all = "snake_case")]
pub enum GrantStatus {
    Upcoming,
    Open,
    Closed,
    Awarded,
}

impl GrantStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GrantStatus::Upcoming => "upcoming",
            GrantStatus::Open => "open",
            GrantStatus::Closed => "closed",
            GrantStatus::Awarded => "awarded",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "service_category", rename_all = "snake_case")]
pub enum ServiceCategory {
    AiLaw,
    Blockchain,
    DataPrivacy,
    TechContracts,
    Ip,
    Corporate,
    Other,
}

impl ServiceCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceCategory::AiLaw => "ai_law",
            ServiceCategory::Blockchain => "blockchain",
            ServiceCategory::DataPrivacy => "data_privacy",
            ServiceCategory::TechContracts => "tech_contracts",
            ServiceCategory::Ip => "ip",
            ServiceCategory::Corporate => "corporate",
            ServiceCategory::Other => "other",
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "currency_code", rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Ngn,
    Usd,
}

impl Currency {
    pub fn as_str(self) -> &'static str {
        match self {
            Currency::Ngn => "NGN",
            Currency::Usd => "USD",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Currency::Ngn => "₦",
            Currency::Usd => "$",
        }
    }

    /// Render an amount held in minor units (kobo/cents) as `₦25,000` or `$150.50`.
    ///
    /// Fractional units are shown only when non-zero.
    pub fn format_minor(self, amount_minor: i64) -> String {
        let negative = amount_minor < 0;
        let absolute = amount_minor.unsigned_abs();
        let major = absolute / 100;
        let minor = absolute % 100;

        let digits = major.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (index, ch) in digits.chars().enumerate() {
            if index > 0 && (digits.len() - index) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        let sign = if negative { "-" } else { "" };
        if minor == 0 {
            format!("{sign}{}{grouped}", self.symbol())
        } else {
            format!("{sign}{}{grouped}.{minor:02}", self.symbol())
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NGN" => Ok(Currency::Ngn),
            "USD" => Ok(Currency::Usd),
            other => Err(format!("unsupported currency `{other}`")),
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "contact_status", rename_all = "snake_case")]
pub enum ContactStatus {
    #[default]
    Unread,
    Read,
    Responded,
}

impl ContactStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ContactStatus::Unread => "unread",
            ContactStatus::Read => "read",
            ContactStatus::Responded => "responded",
        }
    }
}

/// Kind of an issued session token; the kind is also the token's textual prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "token_kind", rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }

    pub fn from_prefix(value: &str) -> Option<Self> {
        match value {
            "access" => Some(TokenKind::Access),
            "refresh" => Some(TokenKind::Refresh),
            _ => None,
        }
    }
}

/// Client-side status predicate for collections that expose an `is_active` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityFilter {
    Active,
    Inactive,
}

impl ActivityFilter {
    pub fn matches(self, is_active: bool) -> bool {
        match self {
            ActivityFilter::Active => is_active,
            ActivityFilter::Inactive => !is_active,
        }
    }
}

/// Client-side status predicate for blog posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicationFilter {
    Published,
    Draft,
}

impl PublicationFilter {
    pub fn matches(self, is_published: bool) -> bool {
        match self {
            PublicationFilter::Published => is_published,
            PublicationFilter::Draft => !is_published,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minor_units_with_grouping() {
        assert_eq!(Currency::Ngn.format_minor(2_500_000), "₦25,000");
        assert_eq!(Currency::Usd.format_minor(15_000), "$150");
        assert_eq!(Currency::Usd.format_minor(15_050), "$150.50");
        assert_eq!(Currency::Ngn.format_minor(0), "₦0");
        assert_eq!(Currency::Ngn.format_minor(123_456_789_00), "₦123,456,789");
    }

    #[test]
    fn currency_serializes_uppercase() {
        let json = serde_json::to_string(&Currency::Usd).expect("serialize");
        assert_eq!(json, "\"USD\"");
        assert_eq!("ngn".parse::<Currency>(), Ok(Currency::Ngn));
    }

    #[test]
    fn token_kind_prefix_round_trips() {
        for kind in [TokenKind::Access, TokenKind::Refresh] {
            assert_eq!(TokenKind::from_prefix(kind.as_str()), Some(kind));
        }
        assert_eq!(TokenKind::from_prefix("api"), None);
    }
}
