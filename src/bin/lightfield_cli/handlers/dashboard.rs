#![deny(clippy::all, clippy::pedantic)]

use reqwest::Method;

use crate::args::DashboardCmd;
use crate::client::{CliError, Ctx};
use crate::print::print_json;

pub async fn handle(ctx: &Ctx, cmd: DashboardCmd) -> Result<(), CliError> {
    let (path, days) = match cmd {
        DashboardCmd::Stats => ("api/v1/dashboard/stats", None),
        DashboardCmd::Activity => ("api/v1/dashboard/activity", None),
        DashboardCmd::Views { days } => ("api/v1/dashboard/views-over-time", days),
        DashboardCmd::Posts { days } => ("api/v1/dashboard/posts-over-time", days),
        DashboardCmd::Categories => ("api/v1/dashboard/posts-by-category", None),
        DashboardCmd::Contacts => ("api/v1/dashboard/contacts-by-status", None),
    };
    let query = days.map(|days| [("days", days.to_string())]);
    let res: serde_json::Value = ctx
        .request(Method::GET, path, query.as_ref().map(|q| q.as_slice()), None)
        .await?;
    print_json(&res)
}
