use std::collections::HashSet;

use sqlx::PgPool;
use time::macros::{date, time};

use lightfield::application::repos::{
    AssociateParams, AssociateQueryFilter, AssociatesRepo, AssociatesWriteRepo,
    BookingAdminUpdate, BookingsRepo, CollectionOrderRepo, ListScope, NewBookingParams,
    RepoError, StatusChange,
};
use lightfield::domain::bookings::BookingStatus;
use lightfield::domain::ordering::{CollectionVersion, ReorderItem};
use lightfield::domain::resources::ResourceKind;
use lightfield::domain::types::Currency;
use lightfield::infra::db::PostgresRepositories;

fn associate(name: &str, order_priority: i32) -> AssociateParams {
    AssociateParams {
        name: name.to_string(),
        slug: name.to_lowercase().replace(' ', "-"),
        title: "Partner".into(),
        bio: format!("{name} advises on technology law."),
        expertise: vec!["AI".into()],
        image_url: None,
        email: None,
        phone: None,
        linkedin_url: None,
        twitter_url: None,
        order_priority,
        is_active: true,
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn every_collection_starts_at_version_zero(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    for kind in ResourceKind::ALL {
        assert_eq!(
            repos.current_version(kind).await.expect("version"),
            CollectionVersion(0),
            "{kind:?}"
        );
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn reorder_is_guarded_by_base_version(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let first = repos
        .create_associate(associate("Ada Obi", 0))
        .await
        .expect("create");
    let second = repos
        .create_associate(associate("Bola Ade", 1))
        .await
        .expect("create");
    let version = repos
        .current_version(ResourceKind::Associates)
        .await
        .expect("version");
    assert_eq!(version, CollectionVersion(2));

    let swapped = [
        ReorderItem {
            id: second.id,
            order_priority: 0,
        },
        ReorderItem {
            id: first.id,
            order_priority: 1,
        },
    ];
    let next = repos
        .reorder(ResourceKind::Associates, &swapped, Some(version))
        .await
        .expect("reorder");
    assert_eq!(next, CollectionVersion(3));

    let listed = repos
        .list_associates(ListScope::Admin, &AssociateQueryFilter::default())
        .await
        .expect("list");
    let names: Vec<_> = listed.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["Bola Ade", "Ada Obi"]);

    let stale = repos
        .reorder(ResourceKind::Associates, &swapped, Some(version))
        .await
        .expect_err("stale base");
    assert!(matches!(
        stale,
        RepoError::VersionConflict { current } if current == CollectionVersion(3)
    ));
}

#[sqlx::test(migrations = "./migrations")]
async fn reorder_rejects_foreign_ids_atomically(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let member = repos
        .create_associate(associate("Chidi Eze", 5))
        .await
        .expect("create");

    let items = [
        ReorderItem {
            id: member.id,
            order_priority: 0,
        },
        ReorderItem {
            id: uuid::Uuid::new_v4(),
            order_priority: 1,
        },
    ];
    let err = repos
        .reorder(ResourceKind::Associates, &items, None)
        .await
        .expect_err("foreign id");
    assert!(matches!(err, RepoError::InvalidInput { .. }));

    let reloaded = repos
        .find_associate(member.id)
        .await
        .expect("find")
        .expect("exists");
    assert_eq!(reloaded.order_priority, 5);
    assert_eq!(
        repos
            .current_version(ResourceKind::Associates)
            .await
            .expect("version"),
        CollectionVersion(1)
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn ordering_indexes_exist(pool: PgPool) {
    let rows: Vec<String> = sqlx::query_scalar(
        "SELECT indexname FROM pg_indexes WHERE schemaname = 'public'",
    )
    .fetch_all(&pool)
    .await
    .expect("fetch indexes");

    let indexes: HashSet<String> = rows.into_iter().collect();
    for expected in [
        "associates_order_idx",
        "blog_posts_order_idx",
        "bookings_status_idx",
        "audit_logs_created_idx",
    ] {
        assert!(indexes.contains(expected), "missing {expected}");
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn booking_status_write_requires_the_validated_status(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let booking = repos
        .create_booking(NewBookingParams {
            reference: "LF-GUARD00001".into(),
            service_id: None,
            custom_service_description: "Contract review for a fintech launch".into(),
            client_name: "Ada Obi".into(),
            client_email: "ada@example.com".into(),
            client_phone: "+2348000000000".into(),
            client_company: String::new(),
            preferred_date: date!(2099 - 03 - 10),
            preferred_time: time!(10:30),
            notes: String::new(),
            amount: 2_500_000,
            currency: Currency::Ngn,
        })
        .await
        .expect("create booking");

    let stale = repos
        .update_booking(
            booking.id,
            BookingAdminUpdate {
                status: Some(StatusChange {
                    from: BookingStatus::Confirmed,
                    to: BookingStatus::Completed,
                }),
                ..BookingAdminUpdate::default()
            },
        )
        .await
        .expect_err("status is still pending_payment");
    assert!(matches!(stale, RepoError::NotFound));

    let cancelled = repos
        .update_booking(
            booking.id,
            BookingAdminUpdate {
                status: Some(StatusChange {
                    from: BookingStatus::PendingPayment,
                    to: BookingStatus::Cancelled,
                }),
                ..BookingAdminUpdate::default()
            },
        )
        .await
        .expect("guard matches");
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
}
