use sqlx::PgPool;
use std::sync::Arc;

use smartlink::domain::repositories::TokenRepository;
use smartlink::error::AppError;
use smartlink::infrastructure::persistence::PgTokenRepository;

#[sqlx::test]
async fn test_create_token(pool: PgPool) {
    let repo = PgTokenRepository::new(Arc::new(pool));

    let result = repo.create_token("test-token", "hash123").await;

    assert!(result.is_ok());
    let token = result.unwrap();
    assert_eq!(token.name, "test-token");
    assert_eq!(token.token_hash, "hash123");
    assert!(token.revoked_at.is_none());
    assert!(token.last_used_at.is_none());
}

#[sqlx::test]
async fn test_create_token_duplicate_hash(pool: PgPool) {
    let repo = PgTokenRepository::new(Arc::new(pool));

    repo.create_token("first", "samehash").await.unwrap();
    let result = repo.create_token("second", "samehash").await;

    assert!(matches!(result, Err(AppError::Conflict { .. })));
}

#[sqlx::test]
async fn test_validate_token_valid(pool: PgPool) {
    let repo = PgTokenRepository::new(Arc::new(pool));

    let created = repo.create_token("valid-token", "validhash").await.unwrap();

    let token = repo.validate_token("validhash").await.unwrap();

    assert_eq!(token.map(|t| t.id), Some(created.id));
}

#[sqlx::test]
async fn test_validate_token_invalid(pool: PgPool) {
    let repo = PgTokenRepository::new(Arc::new(pool));

    let result = repo.validate_token("nonexistent").await;

    assert!(result.unwrap().is_none());
}

#[sqlx::test]
async fn test_validate_token_revoked(pool: PgPool) {
    let repo = PgTokenRepository::new(Arc::new(pool));

    let token = repo
        .create_token("revoked-token", "revokedhash")
        .await
        .unwrap();
    assert!(repo.revoke_token(token.id).await.unwrap());

    let result = repo.validate_token("revokedhash").await;

    assert!(result.unwrap().is_none());
}

#[sqlx::test]
async fn test_revoke_token_twice(pool: PgPool) {
    let repo = PgTokenRepository::new(Arc::new(pool));

    let token = repo.create_token("once", "oncehash").await.unwrap();

    assert!(repo.revoke_token(token.id).await.unwrap());
    assert!(!repo.revoke_token(token.id).await.unwrap());
    assert!(!repo.revoke_token(999_999).await.unwrap());

    let stored = repo.find_by_id(token.id).await.unwrap().unwrap();
    assert!(stored.is_revoked());
}

#[sqlx::test]
async fn test_update_last_used(pool: PgPool) {
    let repo = PgTokenRepository::new(Arc::new(pool.clone()));

    let token = repo
        .create_token("update-token", "updatehash")
        .await
        .unwrap();

    let result = repo.update_last_used("updatehash").await;
    assert!(result.is_ok());

    let last_used: Option<chrono::DateTime<chrono::Utc>> =
        sqlx::query_scalar("SELECT last_used_at FROM api_tokens WHERE id = $1")
            .bind(token.id)
            .fetch_one(&pool)
            .await
            .unwrap();

    assert!(last_used.is_some());
}

#[sqlx::test]
async fn test_list_and_find_tokens(pool: PgPool) {
    let repo = PgTokenRepository::new(Arc::new(pool));

    let ci = repo.create_token("ci", "cihash").await.unwrap();
    repo.create_token("deploy", "deployhash").await.unwrap();

    let tokens = repo.list_tokens().await.unwrap();
    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[0].name, "deploy");

    let by_name = repo.find_by_name("ci").await.unwrap().unwrap();
    assert_eq!(by_name.id, ci.id);
    assert!(repo.find_by_name("missing").await.unwrap().is_none());
    assert!(repo.find_by_id(ci.id).await.unwrap().is_some());
}
