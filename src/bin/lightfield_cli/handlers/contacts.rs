#![deny(clippy::all, clippy::pedantic)]

use lightfield::domain::types::ContactStatus;
use lightfield::infra::http::api::models::{ContactStatusRequest, MessageResponse};
use reqwest::Method;
use uuid::Uuid;

use crate::args::{ContactStatusArg, ContactsCmd};
use crate::client::{CliError, Ctx};
use crate::io::to_value;
use crate::print::print_json;

pub async fn handle(ctx: &Ctx, cmd: ContactsCmd) -> Result<(), CliError> {
    match cmd {
        ContactsCmd::List { status, search } => list(ctx, status, search).await,
        ContactsCmd::Get { id } => {
            let res: serde_json::Value = ctx
                .request(Method::GET, &format!("api/v1/contacts/{id}"), None, None)
                .await?;
            print_json(&res)
        }
        ContactsCmd::Status { id, status } => set_status(ctx, id, status).await,
        ContactsCmd::Delete { id } => {
            ctx.request_unit(Method::DELETE, &format!("api/v1/contacts/{id}"), None)
                .await?;
            println!("deleted");
            Ok(())
        }
    }
}

async fn list(
    ctx: &Ctx,
    status: Option<ContactStatusArg>,
    search: Option<String>,
) -> Result<(), CliError> {
    let mut q = Vec::new();
    if let Some(s) = status {
        q.push(("status", s.to_string()));
    }
    if let Some(s) = search {
        q.push(("search", s));
    }
    let res: serde_json::Value = ctx
        .request(Method::GET, "api/v1/contacts", Some(&q), None)
        .await?;
    print_json(&res)
}

async fn set_status(ctx: &Ctx, id: Uuid, status: ContactStatusArg) -> Result<(), CliError> {
    let payload = ContactStatusRequest::new(ContactStatus::from(status));
    let res: MessageResponse = ctx
        .request(
            Method::PATCH,
            &format!("api/v1/contacts/{id}"),
            None,
            Some(&to_value(payload)?),
        )
        .await?;
    println!("{}", res.message);
    Ok(())
}
