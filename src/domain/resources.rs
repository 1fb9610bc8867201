//! The six ordered collections managed by the back office.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "resource_kind", rename_all = "snake_case")]
pub enum ResourceKind {
    Associates,
    Categories,
    Blogs,
    Testimonials,
    Grants,
    ConsultationServices,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::Associates,
        ResourceKind::Categories,
        ResourceKind::Blogs,
        ResourceKind::Testimonials,
        ResourceKind::Grants,
        ResourceKind::ConsultationServices,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Associates => "associates",
            ResourceKind::Categories => "categories",
            ResourceKind::Blogs => "blogs",
            ResourceKind::Testimonials => "testimonials",
            ResourceKind::Grants => "grants",
            ResourceKind::ConsultationServices => "consultation_services",
        }
    }

    /// Path segment under `/api/v1`.
    pub fn segment(self) -> &'static str {
        match self {
            ResourceKind::ConsultationServices => "consultation-services",
            other => other.as_str(),
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            ResourceKind::Associates => "associates",
            ResourceKind::Categories => "blog_categories",
            ResourceKind::Blogs => "blog_posts",
            ResourceKind::Testimonials => "testimonials",
            ResourceKind::Grants => "grants",
            ResourceKind::ConsultationServices => "consultation_services",
        }
    }

    pub fn noun(self) -> &'static str {
        match self {
            ResourceKind::Associates => "Associates",
            ResourceKind::Categories => "Categories",
            ResourceKind::Blogs => "Blogs",
            ResourceKind::Testimonials => "Testimonials",
            ResourceKind::Grants => "Grants",
            ResourceKind::ConsultationServices => "Services",
        }
    }

    /// Singular entity name used in audit entries.
    pub fn entity(self) -> &'static str {
        match self {
            ResourceKind::Associates => "associate",
            ResourceKind::Categories => "category",
            ResourceKind::Blogs => "blog",
            ResourceKind::Testimonials => "testimonial",
            ResourceKind::Grants => "grant",
            ResourceKind::ConsultationServices => "consultation_service",
        }
    }

    pub fn reorder_message(self) -> String {
        format!("{} reordered successfully", self.noun())
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| format!("unknown resource `{s}`"))
    }
}
