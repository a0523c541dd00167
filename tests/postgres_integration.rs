//! Runs against a real PostgreSQL instance named by `DATABASE_URL`.
//!
//! `cargo test -- --ignored` with a disposable database.

use link_organizer::config::AdminBootstrap;
use link_organizer::db::repository::{AccessRepository, CardRepository, CardRequestRepository, LinkRepository, TagRepository, UserRepository};
use link_organizer::db::DatabaseClient;
use link_organizer::models::card_request::{CardRequestStatus, CreateCardRequest};
use link_organizer::models::link::CreateLinkRequest;
use link_organizer::auth::AuthService;
use link_organizer::models::user::{CreateUserRequest, UpdateUserRequest};
use link_organizer::models::{CardFilter, CardInput, TagInput};
use link_organizer::services::UserService;
use link_organizer::AppConfig;
use uuid::Uuid;

fn client() -> DatabaseClient {
    let config = AppConfig::from_lookup(|key| std::env::var(key).ok());
    DatabaseClient::new(&config)
}

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple())
}

fn no_admin() -> AdminBootstrap {
    AdminBootstrap { enabled: false, username: String::new(), password: String::new() }
}

#[tokio::test]
#[ignore = "requires database"]
async fn schema_initialization_is_idempotent() {
    let db = client();
    db.initialize(&no_admin()).await.unwrap();
    db.initialize(&no_admin()).await.unwrap();

    assert!(db.manager.is_initialized());
    assert!(db.health_check().await.is_healthy());
    assert!(db.tag_repo.get_tag_by_name("request").await.unwrap().is_some());
    db.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn card_tags_and_links_round_trip_through_postgres() {
    let db = client();
    db.initialize(&no_admin()).await.unwrap();

    let tag = db.tag_repo.create_tag(&TagInput { name: unique("tag"), color: None }).await.unwrap();
    let title = unique("card");
    let card = db
        .card_repo
        .create_card(&CardInput { title: title.clone(), tag_ids: vec![tag.id, tag.id], ..Default::default() })
        .await
        .unwrap();
    assert_eq!(card.tag_ids, vec![tag.id]);

    let found = db.card_repo.list_cards(&CardFilter::new(Some(title.clone()), vec![tag.id])).await.unwrap();
    assert_eq!(found.len(), 1);

    let first = db
        .link_repo
        .create_link(&CreateLinkRequest { card_id: card.card.id, title: None, url: "https://a.example".into(), order_index: 1 })
        .await
        .unwrap();
    let second = db
        .link_repo
        .create_link(&CreateLinkRequest { card_id: card.card.id, title: None, url: "https://b.example".into(), order_index: 0 })
        .await
        .unwrap();
    let remaining = db.link_repo.delete_link(first.id).await.unwrap().unwrap();
    assert_eq!(remaining.iter().map(|l| l.id).collect::<Vec<_>>(), vec![second.id]);

    let missing_tag = db
        .card_repo
        .create_card(&CardInput { title: unique("bad"), tag_ids: vec![i32::MAX], ..Default::default() })
        .await;
    assert!(missing_tag.is_err());

    db.card_repo.delete_card(card.card.id).await.unwrap();
    assert!(db.link_repo.list_links_by_card(card.card.id).await.unwrap().is_empty());
    db.tag_repo.delete_tag(tag.id).await.unwrap();
    db.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn requests_and_grants_round_trip_through_postgres() {
    let db = client();
    db.initialize(&no_admin()).await.unwrap();

    let user = db
        .user_repo
        .create_user(&CreateUserRequest { username: unique("user"), password: "pw".into(), is_admin: false })
        .await
        .unwrap();

    let request = db
        .request_repo
        .create_request_with_card(
            &CreateCardRequest { title: "Wanted".into(), ..Default::default() },
            user.id,
            "[REQUEST] Wanted",
        )
        .await
        .unwrap();
    assert_eq!(request.status, CardRequestStatus::Pending);
    assert_eq!(request.requested_by_username.as_deref(), Some(user.username.as_str()));
    let card_id = request.card_id.unwrap();

    db.access_repo.grant(card_id, user.id).await.unwrap();
    db.access_repo.grant(card_id, user.id).await.unwrap();
    assert!(db.access_repo.has_grant(user.id, card_id).await.unwrap());
    assert_eq!(db.access_repo.list_card_users(card_id).await.unwrap().len(), 1);

    let approved = db
        .request_repo
        .update_request_status(request.id, CardRequestStatus::Approved)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(approved.status, CardRequestStatus::Approved);

    db.request_repo.delete_request(request.id).await.unwrap();
    db.card_repo.delete_card(card_id).await.unwrap();
    db.user_repo.delete_user(user.id).await.unwrap();
    db.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn repeated_initialization_keeps_one_request_tag() {
    let db = client();
    db.initialize(&no_admin()).await.unwrap();
    db.initialize(&no_admin()).await.unwrap();

    let tags = db.tag_repo.list_tags().await.unwrap();
    assert_eq!(tags.iter().filter(|t| t.name == "request").count(), 1);
    db.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn default_admin_is_bootstrapped_at_most_once() {
    let db = client();
    db.initialize(&no_admin()).await.unwrap();
    let before = db.user_repo.count_admins().await.unwrap();

    let admin = AdminBootstrap { enabled: true, username: unique("root"), password: "root-password".into() };
    db.initialize(&admin).await.unwrap();
    db.initialize(&admin).await.unwrap();

    let after = db.user_repo.count_admins().await.unwrap();
    let created = db.user_repo.get_user_by_username(&admin.username).await.unwrap();
    if before == 0 {
        assert_eq!(after, 1);
        let created = created.unwrap();
        assert!(created.is_admin);
        db.user_repo.delete_user(created.id).await.unwrap();
    } else {
        assert_eq!(after, before);
        assert!(created.is_none());
    }
    db.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn updating_a_card_replaces_its_tags_in_postgres() {
    let db = client();
    db.initialize(&no_admin()).await.unwrap();

    let mut tags = Vec::new();
    for prefix in ["a", "b", "c"] {
        tags.push(db.tag_repo.create_tag(&TagInput { name: unique(prefix), color: None }).await.unwrap().id);
    }
    let card = db
        .card_repo
        .create_card(&CardInput { title: unique("card"), tag_ids: vec![tags[0], tags[1]], ..Default::default() })
        .await
        .unwrap();

    let input = CardInput { title: card.card.title.clone(), tag_ids: vec![tags[1], tags[2]], ..Default::default() };
    db.card_repo.update_card(card.card.id, &input).await.unwrap().unwrap();

    let mut stored = db.card_repo.get_card_by_id(card.card.id).await.unwrap().unwrap().tag_ids;
    stored.sort_unstable();
    let mut expected = vec![tags[1], tags[2]];
    expected.sort_unstable();
    assert_eq!(stored, expected);

    db.card_repo.delete_card(card.card.id).await.unwrap();
    for id in tags {
        db.tag_repo.delete_tag(id).await.unwrap();
    }
    db.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn card_search_matches_wildcards_literally() {
    let db = client();
    db.initialize(&no_admin()).await.unwrap();

    let marker = unique("like");
    let percent = db
        .card_repo
        .create_card(&CardInput { title: format!("{marker} 100% done"), ..Default::default() })
        .await
        .unwrap();
    let plain = db
        .card_repo
        .create_card(&CardInput { title: format!("{marker} 100x done"), ..Default::default() })
        .await
        .unwrap();

    let search = |text: String| CardFilter::new(Some(text), Vec::new());
    let found = db.card_repo.list_cards(&search(format!("{marker} 100%"))).await.unwrap();
    assert_eq!(found.iter().map(|c| c.card.id).collect::<Vec<_>>(), vec![percent.card.id]);

    let found = db.card_repo.list_cards(&search(format!("{marker} 100_"))).await.unwrap();
    assert!(found.is_empty());

    let found = db.card_repo.list_cards(&search(marker.clone())).await.unwrap();
    assert_eq!(found.len(), 2);

    db.card_repo.delete_card(percent.card.id).await.unwrap();
    db.card_repo.delete_card(plain.card.id).await.unwrap();
    db.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn user_updates_without_a_password_keep_the_hash() {
    let db = client();
    db.initialize(&no_admin()).await.unwrap();

    let username = unique("keeper");
    let user = db
        .user_repo
        .create_user(&CreateUserRequest { username: username.clone(), password: "first-pass".into(), is_admin: false })
        .await
        .unwrap();
    let before = db.user_repo.get_user_by_username(&username).await.unwrap().unwrap().password_hash;

    let update = UpdateUserRequest { username: username.clone(), password: None, is_admin: true };
    let updated = db.user_repo.update_user(user.id, &update).await.unwrap().unwrap();
    assert!(updated.is_admin);

    let after = db.user_repo.get_user_by_username(&username).await.unwrap().unwrap().password_hash;
    assert_eq!(before, after);
    db.user_repo.delete_user(user.id).await.unwrap();
    db.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn revoked_grants_no_longer_apply() {
    let db = client();
    db.initialize(&no_admin()).await.unwrap();

    let user = db
        .user_repo
        .create_user(&CreateUserRequest { username: unique("viewer"), password: "pw".into(), is_admin: false })
        .await
        .unwrap();
    let card = db.card_repo.create_card(&CardInput { title: unique("card"), ..Default::default() }).await.unwrap();

    db.access_repo.grant(card.card.id, user.id).await.unwrap();
    assert!(db.access_repo.has_grant(user.id, card.card.id).await.unwrap());

    db.access_repo.revoke(card.card.id, user.id).await.unwrap();
    assert!(!db.access_repo.has_grant(user.id, card.card.id).await.unwrap());
    db.access_repo.revoke(card.card.id, user.id).await.unwrap();
    assert!(db.access_repo.list_card_users(card.card.id).await.unwrap().is_empty());

    db.card_repo.delete_card(card.card.id).await.unwrap();
    db.user_repo.delete_user(user.id).await.unwrap();
    db.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn unknown_stored_request_status_lists_as_pending() {
    let db = client();
    db.initialize(&no_admin()).await.unwrap();

    let title = unique("legacy");
    let title_ref = title.as_str();
    let id = db
        .manager
        .run(move |mut conn| async move {
            sqlx::query_scalar::<_, i32>("INSERT INTO card_requests (title, status) VALUES ($1, 'in-review') RETURNING id")
                .bind(title_ref)
                .fetch_one(&mut *conn)
                .await
        })
        .await
        .unwrap();

    let all = db.request_repo.list_requests(None).await.unwrap();
    let listed = all.iter().find(|r| r.id == id).unwrap();
    assert_eq!(listed.status, CardRequestStatus::Pending);

    let pending = db.request_repo.list_requests(Some(CardRequestStatus::Pending)).await.unwrap();
    assert!(pending.iter().any(|r| r.id == id));
    let rejected = db.request_repo.list_requests(Some(CardRequestStatus::Rejected)).await.unwrap();
    assert!(rejected.iter().all(|r| r.id != id));

    db.request_repo.delete_request(id).await.unwrap();
    db.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn bcrypt_password_rows_can_log_in() {
    let db = client();
    db.initialize(&no_admin()).await.unwrap();

    let username = unique("legacy");
    let legacy_hash = bcrypt::hash("old-pass", 4).unwrap();
    let (name_ref, hash_ref) = (username.as_str(), legacy_hash.as_str());
    db.manager
        .run(move |mut conn| async move {
            sqlx::query("INSERT INTO users (username, password, is_admin) VALUES ($1, $2, FALSE)")
                .bind(name_ref)
                .bind(hash_ref)
                .execute(&mut *conn)
                .await
        })
        .await
        .unwrap();

    let users = UserService::new(db.user_repo.clone());
    let auth = AuthService::new("integration-test-secret", 1);
    let (user, _) = users.authenticate_user(&username, "old-pass", &auth).await.unwrap();

    let stored = db.user_repo.get_user_by_username(&username).await.unwrap().unwrap().password_hash;
    assert!(stored.starts_with("$argon2"));
    users.authenticate_user(&username, "old-pass", &auth).await.unwrap();

    db.user_repo.delete_user(user.id).await.unwrap();
    db.close().await;
}
