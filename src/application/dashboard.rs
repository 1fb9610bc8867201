use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::{Date, Duration, OffsetDateTime};

use crate::application::admin::audit::AdminAuditService;
use crate::application::repos::{
    ContactStatusCount, DashboardCounts, DashboardRepo, PublishDayActivity, RepoError,
};
use crate::domain::entities::AuditLogRecord;
use crate::domain::formats::iso_date;
use crate::domain::types::{ContactStatus, Currency};

const RECENT_ACTIVITY_LIMIT: u32 = 10;
pub const DEFAULT_CHART_DAYS: u32 = 30;
pub const MAX_CHART_DAYS: u32 = 366;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    #[serde(flatten)]
    pub counts: DashboardCounts,
    pub formatted_revenue: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewsPoint {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub views: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostsPoint {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub posts: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPosts {
    pub category: String,
    pub posts: u64,
}

/// One pie slice: display label, count, and the stored status value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactStatusSlice {
    pub status: String,
    pub value: u64,
    pub raw_status: ContactStatus,
}

impl From<ContactStatusCount> for ContactStatusSlice {
    fn from(count: ContactStatusCount) -> Self {
        let label = match count.status {
            ContactStatus::Unread => "Unread",
            ContactStatus::Read => "Read",
            ContactStatus::Responded => "Responded",
        };
        Self {
            status: label.to_string(),
            value: count.count,
            raw_status: count.status,
        }
    }
}

#[derive(Clone)]
pub struct DashboardService {
    repo: Arc<dyn DashboardRepo>,
    audit: AdminAuditService,
}

impl DashboardService {
    pub fn new(repo: Arc<dyn DashboardRepo>, audit: AdminAuditService) -> Self {
        Self { repo, audit }
    }

    pub async fn stats(&self) -> Result<DashboardStats, RepoError> {
        let counts = self.repo.dashboard_counts().await?;
        let formatted_revenue = Currency::Ngn.format_minor(counts.consultation_revenue);
        Ok(DashboardStats {
            counts,
            formatted_revenue,
        })
    }

    pub async fn recent_activity(&self) -> Result<Vec<AuditLogRecord>, RepoError> {
        self.audit.list_recent(RECENT_ACTIVITY_LIMIT).await
    }

    /// Views of posts published in the last `days` days, summed per publish day.
    pub async fn views_over_time(&self, days: Option<u32>) -> Result<Vec<ViewsPoint>, RepoError> {
        Ok(self
            .publish_activity(days)
            .await?
            .into_iter()
            .map(|day| ViewsPoint {
                date: day.date,
                views: day.views,
            })
            .collect())
    }

    pub async fn posts_over_time(&self, days: Option<u32>) -> Result<Vec<PostsPoint>, RepoError> {
        Ok(self
            .publish_activity(days)
            .await?
            .into_iter()
            .map(|day| PostsPoint {
                date: day.date,
                posts: day.posts,
            })
            .collect())
    }

    pub async fn posts_by_category(&self) -> Result<Vec<CategoryPosts>, RepoError> {
        Ok(self
            .repo
            .published_posts_by_category()
            .await?
            .into_iter()
            .map(|count| CategoryPosts {
                category: count.category,
                posts: count.posts,
            })
            .collect())
    }

    pub async fn contacts_by_status(&self) -> Result<Vec<ContactStatusSlice>, RepoError> {
        Ok(self
            .repo
            .contacts_by_status()
            .await?
            .into_iter()
            .map(ContactStatusSlice::from)
            .collect())
    }

    async fn publish_activity(
        &self,
        days: Option<u32>,
    ) -> Result<Vec<PublishDayActivity>, RepoError> {
        let days = chart_days(days)?;
        let until = OffsetDateTime::now_utc();
        let since = until - Duration::days(i64::from(days));
        self.repo.publish_activity(since, until).await
    }
}

fn chart_days(days: Option<u32>) -> Result<u32, RepoError> {
    match days.unwrap_or(DEFAULT_CHART_DAYS) {
        days @ 1..=MAX_CHART_DAYS => Ok(days),
        _ => Err(RepoError::invalid_input(format!(
            "days must be between 1 and {MAX_CHART_DAYS}"
        ))),
    }
}
