use std::sync::Arc;

use zano_chat::{ChatShell, MutationOutcome, RefreshOutcome, Selection};
use zano_gateway::mock::{MockGateway, MockOperation};
use zano_gateway::{ConversationId, Sender};

#[tokio::test]
async fn renamed_conversation_shows_new_name_after_listing() {
    let gateway = Arc::new(MockGateway::new());
    let id = gateway.seed_conversation("a", "old", &[(Sender::User, "hi")]);
    let mut shell = ChatShell::new(gateway.clone());
    shell.mount().await;

    assert_eq!(shell.rename(&id, "new").await, MutationOutcome::Applied);
    assert_eq!(shell.directory().list().await, RefreshOutcome::Applied);

    let listed = shell.directory().conversations().await;
    assert!(
        listed
            .iter()
            .any(|conversation| conversation.id == id && conversation.name == "new")
    );
}

#[tokio::test]
async fn failed_list_keeps_previous_conversations() {
    let gateway = Arc::new(MockGateway::new());
    gateway.seed_conversation("a", "A", &[]);
    let mut shell = ChatShell::new(gateway.clone());
    shell.mount().await;
    gateway.fail_next(MockOperation::List, 1);

    assert_eq!(shell.directory().list().await, RefreshOutcome::Failed);
    assert_eq!(shell.directory().conversations().await.len(), 1);
}

#[tokio::test]
async fn deleting_another_conversation_keeps_selection() {
    let gateway = Arc::new(MockGateway::new());
    let a = gateway.seed_conversation("a", "A", &[(Sender::User, "stay")]);
    let b = gateway.seed_conversation("b", "B", &[]);
    let mut shell = ChatShell::new(gateway.clone());
    shell.mount().await;
    shell.select(a.clone()).await;

    assert_eq!(shell.delete(&b).await, MutationOutcome::Applied);

    assert_eq!(shell.selection(), &Selection::Active(a));
    assert_eq!(shell.controller().messages().await.len(), 1);
    assert_eq!(gateway.conversation_ids(), vec![ConversationId::new("a")]);
}

#[tokio::test]
async fn new_chat_returns_to_welcome_and_relists() {
    let gateway = Arc::new(MockGateway::new());
    let a = gateway.seed_conversation("a", "A", &[(Sender::User, "hi")]);
    let mut shell = ChatShell::new(gateway.clone());
    shell.mount().await;
    shell.select(a).await;

    shell.new_chat().await;

    assert_eq!(shell.selection(), &Selection::Welcome);
    assert!(shell.controller().messages().await.is_empty());
    let lists = gateway
        .calls()
        .into_iter()
        .filter(|call| call == "list")
        .count();
    assert_eq!(lists, 2);
}

#[tokio::test]
async fn share_link_points_at_chat_view() {
    let gateway = Arc::new(MockGateway::new());
    let id = gateway.seed_conversation("a", "A", &[]);
    let shell = ChatShell::new(gateway);

    let link = shell.share(&id).unwrap();
    assert_eq!(link.conversation_id, id);
    assert_eq!(link.url, "http://mock.local/chat/a");
}
