#![deny(clippy::all, clippy::pedantic)]

use lightfield::application::bookings::BookingAdminPatch;
use lightfield::domain::bookings::BookingStatus;
use lightfield::infra::http::api::models::VerifyPaymentRequest;
use reqwest::Method;
use uuid::Uuid;

use crate::args::BookingsCmd;
use crate::client::{CliError, Ctx};
use crate::io::{parse_date_opt, read_json, to_value};
use crate::print::print_json;

pub async fn handle(ctx: &Ctx, cmd: BookingsCmd) -> Result<(), CliError> {
    match cmd {
        BookingsCmd::List {
            search,
            status,
            date_from,
            date_to,
            service_id,
        } => list(ctx, search, status, date_from, date_to, service_id).await,
        BookingsCmd::Get { id } => show(ctx, &format!("api/v1/bookings/{id}")).await,
        BookingsCmd::Update {
            id,
            status,
            notes,
            assign,
            unassign,
        } => {
            let assigned_associate = if unassign { Some(None) } else { assign.map(Some) };
            let patch = BookingAdminPatch {
                status,
                admin_notes: notes,
                assigned_associate,
            };
            update(ctx, id, patch).await
        }
        BookingsCmd::Stats => show(ctx, "api/v1/bookings/stats").await,
        BookingsCmd::Create(input) => {
            let payload = read_json(input)?;
            let res: serde_json::Value = ctx.post("api/v1/bookings", &payload).await?;
            print_json(&res)
        }
        BookingsCmd::Verify { reference } => {
            let payload = VerifyPaymentRequest {
                reference: reference.trim().to_string(),
            };
            let res: serde_json::Value = ctx
                .post("api/v1/bookings/verify-payment", &payload)
                .await?;
            print_json(&res)
        }
        BookingsCmd::Lookup { reference } => {
            show(
                ctx,
                &format!("api/v1/bookings/reference/{}", reference.trim()),
            )
            .await
        }
    }
}

async fn show(ctx: &Ctx, path: &str) -> Result<(), CliError> {
    let res: serde_json::Value = ctx.request(Method::GET, path, None, None).await?;
    print_json(&res)
}

async fn list(
    ctx: &Ctx,
    search: Option<String>,
    status: Option<BookingStatus>,
    date_from: Option<String>,
    date_to: Option<String>,
    service_id: Option<Uuid>,
) -> Result<(), CliError> {
    let mut q = Vec::new();
    if let Some(s) = search {
        q.push(("search", s));
    }
    if let Some(s) = status {
        q.push(("status", s.as_str().to_string()));
    }
    if let Some(d) = parse_date_opt(date_from)? {
        q.push(("date_from", d));
    }
    if let Some(d) = parse_date_opt(date_to)? {
        q.push(("date_to", d));
    }
    if let Some(id) = service_id {
        q.push(("service_id", id.to_string()));
    }
    let res: serde_json::Value = ctx
        .request(Method::GET, "api/v1/bookings", Some(&q), None)
        .await?;
    print_json(&res)
}

async fn update(ctx: &Ctx, id: Uuid, patch: BookingAdminPatch) -> Result<(), CliError> {
    if patch == BookingAdminPatch::default() {
        return Err(CliError::InvalidInput(
            "nothing to update (use --status, --notes, --assign or --unassign)".into(),
        ));
    }
    let path = format!("api/v1/bookings/{id}");
    let res: serde_json::Value = ctx
        .request(Method::PATCH, &path, None, Some(&to_value(patch)?))
        .await?;
    print_json(&res)
}
