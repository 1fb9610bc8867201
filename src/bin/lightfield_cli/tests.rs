#![deny(clippy::all, clippy::pedantic)]

use clap::Parser;
use httpmock::MockServer;
use lightfield::domain::bookings::BookingStatus;
use lightfield::domain::resources::ResourceKind;
use lightfield::infra::client::{StoredTokens, TokenStore};
use serde_json::json;
use tempfile::{NamedTempFile, TempDir};
use uuid::Uuid;

use crate::args::{BookingsCmd, Cli, Commands, DashboardCmd, JsonInput, ResourceCmd};
use crate::client::{CliError, Ctx, build_ctx_from_cli};
use crate::handlers::{bookings, dashboard, resources};

fn ctx(server: &MockServer, dir: &TempDir) -> Ctx {
    let session = dir.path().join("session.json");
    let ctx = Ctx::new(&server.base_url(), session).expect("ctx");
    ctx.api.tokens().save(&StoredTokens {
        access: "access_abc_secret".into(),
        refresh: None,
    });
    ctx
}

fn tmp_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("tmp file");
    std::io::Write::write_all(&mut file, contents.as_bytes()).expect("write tmp");
    file
}

#[test]
fn services_command_targets_consultation_services() {
    let cli = Cli::parse_from([
        "lightfield-cli",
        "--site",
        "https://api.example.com",
        "services",
        "list",
        "--filter",
        "category=ai_law",
    ]);
    assert_eq!(cli.command.resource(), Some(ResourceKind::ConsultationServices));
    let Commands::Services(args) = cli.command else {
        panic!("expected services");
    };
    let ResourceCmd::List { filters, .. } = args.action else {
        panic!("expected list");
    };
    assert_eq!(filters, vec![("category".to_string(), "ai_law".to_string())]);
}

#[test]
fn reorder_ids_are_comma_separated() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let ids = format!("{a},{b}");
    let cli = Cli::parse_from([
        "lightfield-cli",
        "grants",
        "reorder",
        "--ids",
        ids.as_str(),
        "--base-version",
        "4",
    ]);
    let Commands::Grants(args) = cli.command else {
        panic!("expected grants");
    };
    let ResourceCmd::Reorder { ids, base_version } = args.action else {
        panic!("expected reorder");
    };
    assert_eq!(ids, vec![a, b]);
    assert_eq!(base_version, Some(4));
}

#[test]
fn booking_status_parses_snake_case() {
    let id = Uuid::new_v4().to_string();
    let cli = Cli::parse_from([
        "lightfield-cli",
        "bookings",
        "update",
        id.as_str(),
        "--status",
        "confirmed",
    ]);
    let Commands::Bookings(args) = cli.command else {
        panic!("expected bookings");
    };
    let BookingsCmd::Update { status, .. } = args.action else {
        panic!("expected update");
    };
    assert_eq!(status, Some(BookingStatus::Confirmed));
}

#[test]
fn malformed_filter_is_rejected() {
    let err = Cli::try_parse_from(["lightfield-cli", "blogs", "list", "--filter", "oops"])
        .expect_err("invalid filter");
    assert!(err.to_string().contains("key=value"));
}

#[test]
fn build_ctx_requires_site() {
    let cli = Cli {
        site: None,
        session_file: None,
        command: Commands::Logout,
    };
    let err = build_ctx_from_cli(&cli).err().expect("missing site should fail");
    assert!(matches!(err, CliError::MissingSite));
}

#[test]
fn read_json_prefers_file_and_requires_object() -> Result<(), CliError> {
    let file = tmp_file(r#"{"name": "From file"}"#);
    let value = crate::io::read_json(JsonInput {
        json: Some(r#"{"name": "Inline"}"#.into()),
        file: Some(file.path().to_path_buf()),
    })?;
    assert_eq!(value["name"], "From file");

    let err = crate::io::read_json(JsonInput {
        json: Some("[1, 2]".into()),
        file: None,
    })
    .expect_err("array rejected");
    assert!(matches!(err, CliError::InvalidInput(_)));
    Ok(())
}

#[tokio::test]
async fn reorder_sends_dense_priorities() -> Result<(), CliError> {
    let server = MockServer::start_async().await;
    let dir = TempDir::new().expect("tempdir");
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let mock = server
        .mock_async(|when, then| {
            when.method("POST")
                .path("/api/v1/associates/reorder")
                .header("authorization", "Bearer access_abc_secret")
                .json_body(json!({
                    "items": [
                        {"id": c, "order_priority": 0},
                        {"id": a, "order_priority": 1},
                        {"id": b, "order_priority": 2}
                    ],
                    "base_version": 9
                }));
            then.status(200).json_body(json!({
                "message": "Associates reordered successfully",
                "version": 10
            }));
        })
        .await;

    resources::handle(
        &ctx(&server, &dir),
        ResourceKind::Associates,
        ResourceCmd::Reorder {
            ids: vec![c, a, b],
            base_version: Some(9),
        },
    )
    .await?;
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn move_submits_through_the_synchronizer() -> Result<(), CliError> {
    let server = MockServer::start_async().await;
    let dir = TempDir::new().expect("tempdir");
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    server
        .mock_async(|when, then| {
            when.method("GET").path("/api/v1/testimonials");
            then.status(200).header("etag", "\"3\"").json_body(json!([
                {"id": a, "order_priority": 0, "client_name": "A"},
                {"id": b, "order_priority": 1, "client_name": "B"},
                {"id": c, "order_priority": 2, "client_name": "C"}
            ]));
        })
        .await;
    let reorder = server
        .mock_async(|when, then| {
            when.method("POST")
                .path("/api/v1/testimonials/reorder")
                .json_body(json!({
                    "items": [
                        {"id": b, "order_priority": 0},
                        {"id": c, "order_priority": 1},
                        {"id": a, "order_priority": 2}
                    ],
                    "base_version": 3
                }));
            then.status(200).json_body(json!({
                "message": "Testimonials reordered successfully",
                "version": 4
            }));
        })
        .await;

    resources::handle(
        &ctx(&server, &dir),
        ResourceKind::Testimonials,
        ResourceCmd::Move { item: a, over: c },
    )
    .await?;
    reorder.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn move_reports_conflict_as_reorder_error() {
    let server = MockServer::start_async().await;
    let dir = TempDir::new().expect("tempdir");
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    server
        .mock_async(|when, then| {
            when.method("GET").path("/api/v1/grants");
            then.status(200)
                .header("etag", "\"1\"")
                .json_body(json!([{"id": a, "order_priority": 0}, {"id": b, "order_priority": 1}]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method("POST").path("/api/v1/grants/reorder");
            then.status(409)
                .header("etag", "\"2\"")
                .json_body(json!({"error": {"code": "version_conflict", "message": "changed"}}));
        })
        .await;

    let err = resources::handle(
        &ctx(&server, &dir),
        ResourceKind::Grants,
        ResourceCmd::Move { item: b, over: a },
    )
    .await
    .expect_err("conflict");
    assert!(matches!(err, CliError::Reorder(_)));
}

#[tokio::test]
async fn booking_update_requires_a_change() {
    let server = MockServer::start_async().await;
    let dir = TempDir::new().expect("tempdir");
    let err = bookings::handle(
        &ctx(&server, &dir),
        BookingsCmd::Update {
            id: Uuid::new_v4(),
            status: None,
            notes: None,
            assign: None,
            unassign: false,
        },
    )
    .await
    .expect_err("empty patch");
    assert!(matches!(err, CliError::InvalidInput(_)));
}

#[tokio::test]
async fn booking_unassign_sends_explicit_null() -> Result<(), CliError> {
    let server = MockServer::start_async().await;
    let dir = TempDir::new().expect("tempdir");
    let id = Uuid::new_v4();
    let mock = server
        .mock_async(|when, then| {
            when.method("PATCH")
                .path(format!("/api/v1/bookings/{id}"))
                .json_body_includes(r#"{"assigned_associate": null}"#);
            then.status(200).json_body(json!({"id": id, "status": "paid"}));
        })
        .await;

    bookings::handle(
        &ctx(&server, &dir),
        BookingsCmd::Update {
            id,
            status: None,
            notes: None,
            assign: None,
            unassign: true,
        },
    )
    .await?;
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn dashboard_posts_forwards_the_day_window() -> Result<(), CliError> {
    let server = MockServer::start_async().await;
    let dir = TempDir::new().expect("tempdir");
    let mock = server
        .mock_async(|when, then| {
            when.method("GET")
                .path("/api/v1/dashboard/posts-over-time")
                .query_param("days", "7");
            then.status(200)
                .json_body(json!([{"date": "2026-03-01", "posts": 2}]));
        })
        .await;

    dashboard::handle(&ctx(&server, &dir), DashboardCmd::Posts { days: Some(7) }).await?;
    mock.assert_async().await;
    Ok(())
}
