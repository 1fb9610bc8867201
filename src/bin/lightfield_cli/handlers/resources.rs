#![deny(clippy::all, clippy::pedantic)]

use lightfield::application::sync::{CollectionSync, DragOutcome, SyncEvent};
use lightfield::domain::ordering::{
    CollectionVersion, FilterableItem, OrderedItem, RawReorderItem,
};
use lightfield::domain::resources::ResourceKind;
use lightfield::infra::client::HttpCollectionSource;
use lightfield::infra::http::api::models::{ReorderRequest, ReorderResponse};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::args::{JsonInput, ResourceCmd};
use crate::client::{CliError, Ctx};
use crate::io::read_json;
use crate::print::print_json;

pub async fn handle(ctx: &Ctx, kind: ResourceKind, cmd: ResourceCmd) -> Result<(), CliError> {
    match cmd {
        ResourceCmd::List { search, filters } => list(ctx, kind, search, filters).await,
        ResourceCmd::Get { key } => get(ctx, kind, &key).await,
        ResourceCmd::Create(input) => create(ctx, kind, input).await,
        ResourceCmd::Update { key, input } => update(ctx, kind, &key, input).await,
        ResourceCmd::Delete { key } => delete(ctx, kind, &key).await,
        ResourceCmd::Reorder { ids, base_version } => {
            reorder(ctx, kind, ids, base_version.map(CollectionVersion)).await
        }
        ResourceCmd::Move { item, over } => move_item(ctx, kind, item, over).await,
    }
}

fn collection_path(kind: ResourceKind) -> String {
    format!("api/v1/{}", kind.segment())
}

fn item_path(kind: ResourceKind, key: &str) -> String {
    format!("api/v1/{}/{}", kind.segment(), key.trim())
}

async fn list(
    ctx: &Ctx,
    kind: ResourceKind,
    search: Option<String>,
    filters: Vec<(String, String)>,
) -> Result<(), CliError> {
    let mut q: Vec<(&str, String)> = Vec::new();
    if let Some(s) = search {
        q.push(("search", s));
    }
    for (key, value) in &filters {
        q.push((key.as_str(), value.clone()));
    }
    let response = ctx
        .api
        .send::<()>(Method::GET, &collection_path(kind), Some(&q), None)
        .await?;
    let items: serde_json::Value = response.json()?;
    print_json(&json!({
        "version": response.version(),
        "items": items,
    }))
}

async fn get(ctx: &Ctx, kind: ResourceKind, key: &str) -> Result<(), CliError> {
    let res: serde_json::Value = ctx
        .request(Method::GET, &item_path(kind, key), None, None)
        .await?;
    print_json(&res)
}

async fn create(ctx: &Ctx, kind: ResourceKind, input: JsonInput) -> Result<(), CliError> {
    let payload = read_json(input)?;
    let res: serde_json::Value = ctx.post(&collection_path(kind), &payload).await?;
    print_json(&res)
}

async fn update(
    ctx: &Ctx,
    kind: ResourceKind,
    key: &str,
    input: JsonInput,
) -> Result<(), CliError> {
    let payload = read_json(input)?;
    ctx.request_unit(Method::PATCH, &item_path(kind, key), Some(&payload))
        .await?;
    println!("updated");
    Ok(())
}

async fn delete(ctx: &Ctx, kind: ResourceKind, key: &str) -> Result<(), CliError> {
    ctx.request_unit(Method::DELETE, &item_path(kind, key), None)
        .await?;
    println!("deleted");
    Ok(())
}

async fn reorder(
    ctx: &Ctx,
    kind: ResourceKind,
    ids: Vec<Uuid>,
    base_version: Option<CollectionVersion>,
) -> Result<(), CliError> {
    let items = ids
        .into_iter()
        .enumerate()
        .map(|(index, id)| {
            i32::try_from(index)
                .map(|order_priority| RawReorderItem {
                    id: Some(id),
                    order_priority: Some(order_priority),
                })
                .map_err(|_| CliError::InvalidInput("too many ids".into()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let payload = ReorderRequest {
        items,
        base_version,
    };
    let res: ReorderResponse = ctx
        .post(&format!("{}/reorder", collection_path(kind)), &payload)
        .await?;
    print_json(&json!({"message": res.message, "version": res.version}))
}

/// Minimal view of any ordered record.
#[derive(Debug, Clone, Deserialize)]
struct OrderedRow {
    id: Uuid,
    #[serde(default)]
    order_priority: i32,
}

impl OrderedItem for OrderedRow {
    fn id(&self) -> Uuid {
        self.id
    }

    fn order_priority(&self) -> i32 {
        self.order_priority
    }
}

impl FilterableItem for OrderedRow {
    type Status = ();

    fn matches_status(&self, _status: &()) -> bool {
        true
    }
}

async fn move_item(ctx: &Ctx, kind: ResourceKind, item: Uuid, over: Uuid) -> Result<(), CliError> {
    let source = HttpCollectionSource::<OrderedRow>::new(ctx.api.clone(), kind);
    let (sync, mut events) = CollectionSync::new(source);
    sync.refresh()
        .await
        .map_err(|err| CliError::Reorder(err.to_string()))?;

    if let DragOutcome::Ignored = sync.drag_end(item, Some(over)) {
        return Err(CliError::InvalidInput(format!(
            "both {item} and {over} must be distinct members of {}",
            kind.segment()
        )));
    }

    while let Some(event) = events.recv().await {
        match event {
            SyncEvent::Confirmed { version } => {
                let order: Vec<Uuid> = sync.view().iter().map(OrderedItem::id).collect();
                return print_json(&json!({"version": version, "order": order}));
            }
            SyncEvent::RolledBack { message } => return Err(CliError::Reorder(message)),
            SyncEvent::Stale => {
                return Err(CliError::Reorder(
                    "the collection changed on the server; list it again and retry".into(),
                ));
            }
            _ => {}
        }
    }
    Err(CliError::Reorder("synchronizer stopped unexpectedly".into()))
}
