//! Vault round trips through the `Storage` trait.

use bookmark_storage::{MessageMetadata, ObsidianStorage, ProcessedMessage, RecordUpdate, Storage, StorageError};
use chrono::{TimeZone, Utc};
use tempfile::tempdir;

fn message(message_id: i32, minute: u32) -> ProcessedMessage {
    message_in_chat(1001, message_id, minute)
}

fn message_in_chat(chat_id: i64, message_id: i32, minute: u32) -> ProcessedMessage {
    ProcessedMessage {
        user_id: chat_id as u64,
        user_username: None,
        message_id,
        chat_id,
        timestamp: Utc.with_ymd_and_hms(2024, 11, 2, 9, minute, 0).unwrap(),
        content: format!("content of {}", message_id),
        summary: format!("summary of {}", message_id),
        category: "Ideas/Inspiration".into(),
        tags: vec!["idea".into()],
        keywords: vec!["spark".into()],
        embedding: Some(vec![0.25, 0.5]),
        metadata: MessageMetadata {
            chat_type: "private".into(),
            chat_id,
            ..Default::default()
        },
    }
}

#[tokio::test]
async fn test_standalone_note_lifecycle() {
    let vault = tempdir().unwrap();
    let storage = ObsidianStorage::new(vault.path(), false, "Inbox/{category}").unwrap();

    let id = storage.save(&message(1, 0)).await.unwrap();
    assert!(id.ends_with("Inbox/Ideas_Inspiration/2024-11-02-0900-1001-1.md"));

    let entry = storage.get(&id).await.unwrap();
    assert_eq!(entry.properties["category"], "Ideas/Inspiration");
    assert_eq!(entry.properties["tags"][0], "idea");
    assert!(entry.content.unwrap().contains("content of 1"));

    let update = RecordUpdate {
        category: Some("Project Planning".into()),
        tags: Some(vec!["idea".into(), "q4".into()]),
        ..Default::default()
    };
    assert!(storage.update(&id, &update).await.unwrap());

    let entry = storage.get(&id).await.unwrap();
    assert_eq!(entry.properties["category"], "Project Planning");
    assert_eq!(entry.properties["tags"][1], "q4");
    assert_eq!(entry.properties["user_id"], 1001);
    assert!(entry.content.unwrap().contains("## Content"));

    assert!(storage.delete(&id).await.unwrap());
    assert!(!storage.delete(&id).await.unwrap());
    assert!(!storage.update(&id, &update).await.unwrap());
}

#[tokio::test]
async fn test_daily_note_appends_sections() {
    let vault = tempdir().unwrap();
    let storage = ObsidianStorage::new(vault.path(), true, "Daily").unwrap();

    let first = storage.save(&message(1, 5)).await.unwrap();
    let second = storage.save(&message(2, 30)).await.unwrap();

    let note_path = vault.path().join("Daily/2024-11-02.md");
    let note = std::fs::read_to_string(&note_path).unwrap();
    assert!(note.contains("## Message at 09:05"));
    assert!(note.contains("## Message at 09:30"));
    assert!(note.find("summary of 1").unwrap() < note.find("summary of 2").unwrap());
    assert!(first.ends_with("2024-11-02.md#1001:1"));
    assert!(second.ends_with("2024-11-02.md#1001:2"));

    assert!(storage
        .update(&second, &RecordUpdate::category("Meeting Notes"))
        .await
        .unwrap());
    let entry = storage.get(&second).await.unwrap();
    assert_eq!(entry.properties["category"], "Meeting Notes");
    let entry = storage.get(&first).await.unwrap();
    assert_eq!(entry.properties["category"], "Ideas/Inspiration");

    assert!(storage.delete(&first).await.unwrap());
    let note = std::fs::read_to_string(&note_path).unwrap();
    assert!(!note.contains("summary of 1"));
    assert!(note.contains("summary of 2"));

    assert!(storage.delete(&second).await.unwrap());
    assert!(!note_path.exists());
}

#[tokio::test]
async fn test_same_message_id_in_two_chats_stays_separate() {
    let vault = tempdir().unwrap();
    let storage = ObsidianStorage::new(vault.path(), true, "Daily").unwrap();

    let mut alice = message_in_chat(1, 10, 5);
    alice.content = "from alice".into();
    let mut bob = message_in_chat(2, 10, 5);
    bob.content = "from bob".into();

    let alice_id = storage.save(&alice).await.unwrap();
    let bob_id = storage.save(&bob).await.unwrap();
    assert_ne!(alice_id, bob_id);

    let entry = storage.get(&bob_id).await.unwrap();
    assert!(entry.content.unwrap().contains("from bob"));
    assert_eq!(entry.properties["chat_id"], 2);

    assert!(storage
        .update(&bob_id, &RecordUpdate::category("Meeting Notes"))
        .await
        .unwrap());
    assert_eq!(storage.get(&alice_id).await.unwrap().properties["category"], "Ideas/Inspiration");

    assert!(storage.delete(&bob_id).await.unwrap());
    let note = std::fs::read_to_string(vault.path().join("Daily/2024-11-02.md")).unwrap();
    assert!(note.contains("from alice"));
    assert!(!note.contains("from bob"));
}

#[tokio::test]
async fn test_standalone_notes_from_two_chats_do_not_overwrite() {
    let vault = tempdir().unwrap();
    let storage = ObsidianStorage::new(vault.path(), false, "Inbox").unwrap();

    let first = storage.save(&message_in_chat(1, 10, 5)).await.unwrap();
    let second = storage.save(&message_in_chat(2, 10, 5)).await.unwrap();

    assert_ne!(first, second);
    assert!(storage.get(&first).await.unwrap().content.unwrap().contains("content of 10"));
    assert_eq!(storage.get(&second).await.unwrap().properties["chat_id"], 2);
}

#[tokio::test]
async fn test_ids_outside_vault_are_rejected() {
    let vault = tempdir().unwrap();
    let storage = ObsidianStorage::new(vault.path(), false, "Inbox").unwrap();

    assert!(matches!(
        storage.delete("/etc/passwd").await,
        Err(StorageError::InvalidId(_))
    ));
}
