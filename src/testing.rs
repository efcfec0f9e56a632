//! Fixtures shared by the unit tests.
use crate::{
    config::Config,
    db,
    session::Identity,
    structs::{Account, NewAccount, Role},
    utils, AppState,
};

pub const TEST_SECRET: &str = "test-secret-test-secret-test-secret!";

pub fn test_config(invite: Option<&str>) -> Config {
    Config {
        database_url: "sqlite::memory:".to_owned(),
        host: "127.0.0.1".to_owned(),
        port: 0,
        token_secret: TEST_SECRET.to_owned(),
        token_ttl_hours: 24,
        teacher_invite_code: invite.map(str::to_owned),
    }
}

pub async fn state() -> AppState {
    AppState::new(test_config(None)).await.unwrap()
}

pub async fn state_with_invite(code: &str) -> AppState {
    AppState::new(test_config(Some(code))).await.unwrap()
}

/// State over an on-disk database, for tests that need more than one connection.
pub async fn state_at(database_url: &str) -> AppState {
    let mut config = test_config(None);
    config.database_url = database_url.to_owned();
    AppState::new(config).await.unwrap()
}

/// Inserts an account directly, skipping password hashing.
pub async fn insert_account(state: &AppState, role: Role, external_id: &str) -> Account {
    let new = NewAccount {
        role,
        external_id: external_id.to_owned(),
        full_name: format!("Test {}", external_id),
        email: format!("{}@example.edu", external_id.to_lowercase()),
        password: String::new(),
    };
    db::create_account(state, &new, "unused".to_owned(), &utils::now_timestamp())
        .await
        .unwrap()
}

pub fn identity_for(account: &Account) -> Identity {
    Identity {
        id: account.id,
        external_id: account.external_id.clone(),
        role: account.role,
    }
}
