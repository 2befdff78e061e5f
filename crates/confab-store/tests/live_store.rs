//! Integration tests against a real Confab store deployment.
//!
//! These tests need a reachable store and a valid access token in the
//! environment:
//!
//!   CONFAB_STORE_URL=https://store.example.com \
//!   CONFAB_ACCESS_TOKEN=eyJ... \
//!   cargo test -p confab-store --test live_store -- --ignored
//!
//! They create real chats and messages under the token's account.

use confab_core::models::chat::Sender;
use confab_store::client::StoreClient;

fn client_and_token() -> (StoreClient, String) {
    let base_url =
        std::env::var("CONFAB_STORE_URL").expect("set CONFAB_STORE_URL to run live tests");
    let token =
        std::env::var("CONFAB_ACCESS_TOKEN").expect("set CONFAB_ACCESS_TOKEN to run live tests");
    (
        StoreClient::new(base_url).expect("build client"),
        token,
    )
}

#[tokio::test]
#[ignore]
async fn create_then_list_round_trip() {
    let (client, token) = client_and_token();

    let chat = client
        .create_chat(&token, "live test chat")
        .await
        .expect("create chat");
    assert!(!chat.id.is_empty());

    let chats = client.list_chats(&token).await.expect("list chats");
    assert!(
        chats.iter().any(|c| c.id == chat.id),
        "created chat should appear in the listing"
    );

    let message = client
        .create_message(&token, &chat.id, "hello from the test suite", Sender::User)
        .await
        .expect("create message");
    assert_eq!(message.chat_id, chat.id);

    let messages = client
        .list_messages(&token, &chat.id)
        .await
        .expect("list messages");
    assert!(messages.iter().any(|m| m.id == message.id));
}

#[tokio::test]
#[ignore]
async fn touch_answers_with_the_id_only() {
    let (client, token) = client_and_token();

    let chat = client
        .create_chat(&token, "live touch chat")
        .await
        .expect("create chat");
    let ack = client.touch_chat(&token, &chat.id).await.expect("touch");
    assert_eq!(ack.id, chat.id);
}

#[tokio::test]
#[ignore]
async fn a_bad_token_is_reported_as_unauthorized() {
    let base_url =
        std::env::var("CONFAB_STORE_URL").expect("set CONFAB_STORE_URL to run live tests");
    let client = StoreClient::new(base_url).expect("build client");

    let err = client
        .list_chats("not-a-real-token")
        .await
        .expect_err("must be refused");
    assert!(matches!(
        err,
        confab_store::error::StoreError::Unauthorized
    ));
}
