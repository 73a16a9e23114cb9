//! Tests for the JSON snapshot store.
//!
//! These verify that runs and steps survive a reopen.
//! Run with: `cargo test -p story-core --test file_store`

use std::sync::Arc;
use story_core::choice::ChoiceId;
use story_core::store::{JsonFileStore, StoreError, StoryStore};
use story_core::state::GameState;
use story_core::story::{Genre, StoryLength, StoryRequest, StoryRun, StoryStep};
use story_core::testing::{beat, standard_choices, ScriptedNarrator};
use story_core::StoryFlow;
use tempfile::TempDir;

#[tokio::test]
async fn test_run_survives_reopen() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("stories").join("runs.json");

    let (run_id, step_two) = {
        let store = Arc::new(JsonFileStore::open(&path).await.unwrap());
        let narrator = Arc::new(ScriptedNarrator::new(vec![beat("Rain on the window."), beat("A knock at the door.")]));
        let flow = StoryFlow::new(narrator, store).with_seed(1);

        let request = StoryRequest::new(Genre::Mystery, StoryLength::Standard).with_user("sleuth");
        let session = flow.create_story_session(request).await.unwrap();
        let next = flow.select_choice(session.step.id, ChoiceId::B, None).await.unwrap();
        (session.run.id, next.step)
    };

    assert!(path.exists(), "Snapshot file should exist after writes");

    let reopened = JsonFileStore::open(&path).await.unwrap();
    let run = reopened.get_run(run_id).await.unwrap().expect("run should be restored");
    assert_eq!(run.genre, Genre::Mystery);
    assert_eq!(run.user_id.as_deref(), Some("sleuth"));
    assert!(!run.completed);

    let steps = reopened.steps_for_run(run_id).await.unwrap();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].selected_choice, Some(ChoiceId::B));
    assert_eq!(steps[1], step_two);

    let latest = reopened.latest_step(run_id).await.unwrap().unwrap();
    assert_eq!(latest.step_number, 2);
}

#[tokio::test]
async fn test_reopened_store_continues_run() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("runs.json");

    let step_id = {
        let store = Arc::new(JsonFileStore::open(&path).await.unwrap());
        let flow = StoryFlow::new(Arc::new(ScriptedNarrator::new(vec![beat("Dawn.")])), store);
        let session = flow
            .create_story_session(StoryRequest::new(Genre::Fantasy, StoryLength::Quick))
            .await
            .unwrap();
        session.step.id
    };

    let store = Arc::new(JsonFileStore::open(&path).await.unwrap());
    let flow = StoryFlow::new(Arc::new(ScriptedNarrator::new(vec![beat("Noon.")])), store);
    let next = flow.select_choice(step_id, ChoiceId::A, None).await.unwrap();

    assert_eq!(next.step.step_number, 2);
    assert_eq!(next.step.story_text, "Noon.");
}

#[tokio::test]
async fn test_failed_write_leaves_store_unchanged() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let dir = temp_dir.path().join("sub");
    let path = dir.join("runs.json");

    let store = JsonFileStore::open(&path).await.unwrap();
    let first = store
        .create_run(StoryRun::new(&StoryRequest::new(Genre::Mystery, StoryLength::Quick)))
        .await
        .unwrap();

    // A regular file where the snapshot directory should be makes every write fail.
    std::fs::remove_dir_all(&dir).unwrap();
    std::fs::write(&dir, "not a directory").unwrap();

    let run = StoryRun::new(&StoryRequest::new(Genre::Horror, StoryLength::Quick));
    assert!(store.create_run(run.clone()).await.is_err());
    assert!(store.get_run(run.id).await.unwrap().is_none());

    let step = StoryStep::new(first.id, 1, "The door creaks.", standard_choices(), GameState::new());
    assert!(store.create_step(step.clone()).await.is_err());
    assert!(store.latest_step(first.id).await.unwrap().is_none());

    let mut completed = first.clone();
    completed.completed = true;
    assert!(store.update_run(&completed).await.is_err());
    assert!(!store.get_run(first.id).await.unwrap().unwrap().completed);

    // Once the directory can be created again, the same writes succeed in order.
    std::fs::remove_file(&dir).unwrap();
    store.create_run(run.clone()).await.unwrap();
    let saved = store.create_step(step).await.unwrap();
    assert_eq!(saved.step_number, 1);

    let reopened = JsonFileStore::open(&path).await.unwrap();
    assert!(reopened.get_run(run.id).await.unwrap().is_some());
    assert_eq!(reopened.steps_for_run(first.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_version_mismatch_rejected() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("runs.json");
    std::fs::write(
        &path,
        r#"{"version": 99, "saved_at": "2024-01-01T00:00:00Z", "runs": [], "steps": []}"#,
    )
    .unwrap();

    let result = JsonFileStore::open(&path).await;
    assert!(matches!(
        result,
        Err(StoreError::VersionMismatch { expected: 1, found: 99 })
    ));
}

#[tokio::test]
async fn test_corrupt_snapshot_rejected() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("runs.json");
    std::fs::write(&path, "not json").unwrap();

    assert!(matches!(JsonFileStore::open(&path).await, Err(StoreError::Json(_))));
}
