//! Story flow scenarios against a scripted narrator.
//!
//! These run without network access.
//! Run with: `cargo test -p story-core --test story_flow`

use std::sync::Arc;
use story_core::analytics::AnalyticsEvent;
use story_core::choice::{Choice, ChoiceId};
use story_core::ending::{EndingCategory, Rarity};
use story_core::narrator::NarrativeSegment;
use story_core::state::{GameState, PersonalityTraits, Trait};
use story_core::statistics::ChoiceKey;
use story_core::store::{MemoryStore, StoryStore};
use story_core::story::{Genre, StepId, StoryLength, StoryRequest};
use story_core::testing::{
    assert_active, assert_completed, assert_has_flag, assert_relationship, assert_step_number, assert_trait, beat,
    standard_choices, FailingCollection, FailingNarrator, FailingStatistics, FailingStore, ScriptedNarrator,
    TestHarness,
};
use story_core::{StoryError, StoryFlow};

fn fantasy_request() -> StoryRequest {
    StoryRequest::new(Genre::Fantasy, StoryLength::Medium).with_user("player-1")
}

fn stranger_choices() -> Vec<Choice> {
    vec![
        Choice::new(ChoiceId::A, "Trust the stranger", "trust_stranger")
            .with_consequence("add_flag:met_wizard")
            .with_consequence("modify_relationship:wizard:10")
            .with_trait_impact("empathy", 2),
        Choice::new(ChoiceId::B, "Draw your sword", "draw_sword")
            .with_consequence("modify_relationship:wizard:-20")
            .with_trait_impact("riskTaking", 3),
        Choice::new(ChoiceId::C, "Slip away", "slip_away"),
    ]
}

// =============================================================================
// Session creation
// =============================================================================

#[tokio::test]
async fn test_create_session_starts_at_step_one() {
    let mut harness = TestHarness::new();
    harness.expect_segment(NarrativeSegment::new("A hooded stranger waves you over.", stranger_choices()));

    let session = harness.start(fantasy_request()).await.unwrap();

    assert_step_number(&session, 1);
    assert_active(&session);
    assert_eq!(session.step.game_state, GameState::default());
    assert_eq!(session.step.choice_slug, "trust_stranger");
    assert_eq!(session.run.user_id.as_deref(), Some("player-1"));

    let requests = harness.narrator.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].is_opening());
    assert!(requests[0].game_state.is_none());

    let stored = harness.store.get_run(session.run.id).await.unwrap();
    assert_eq!(stored, Some(session.run.clone()));
    assert_eq!(harness.analytics.event_names(), vec!["story_started"]);
}

#[tokio::test]
async fn test_impressions_recorded_for_offered_choices() {
    let mut harness = TestHarness::new();
    harness.expect_segment(NarrativeSegment::new("A hooded stranger waves you over.", stranger_choices()));

    harness.start(fantasy_request()).await.unwrap();

    for id in [ChoiceId::A, ChoiceId::B, ChoiceId::C] {
        let key = ChoiceKey::new("trust_stranger", id, Genre::Fantasy);
        assert_eq!(harness.statistics.counts(&key).await.impressions, 1);
    }
    let unseen = ChoiceKey::new("trust_stranger", ChoiceId::D, Genre::Fantasy);
    assert_eq!(harness.statistics.counts(&unseen).await.impressions, 0);
}

#[tokio::test]
async fn test_initial_traits_from_request() {
    let mut harness = TestHarness::new();
    harness.expect_beat("The station lights flicker.");

    let request = StoryRequest::new(Genre::Scifi, StoryLength::Quick).with_initial_traits(PersonalityTraits::uniform(70));
    let session = harness.start(request).await.unwrap();

    assert_trait(&session, Trait::Leadership, 70);
    assert_eq!(session.step.game_state.personality_traits, PersonalityTraits::uniform(70));
}

#[tokio::test]
async fn test_narrator_state_overrides_request_traits() {
    let mut harness = TestHarness::new();
    let opening_state = GameState::default().with_traits(PersonalityTraits::default().with(Trait::Creativity, 64));
    harness.expect_segment(beat("The gallery is silent.").with_game_state(opening_state));

    let request = StoryRequest::new(Genre::Mystery, StoryLength::Medium).with_initial_traits(PersonalityTraits::uniform(10));
    let session = harness.start(request).await.unwrap();

    assert_trait(&session, Trait::Creativity, 64);
    assert_trait(&session, Trait::Empathy, 50);
}

#[tokio::test]
async fn test_opening_without_choices_is_rejected() {
    let mut harness = TestHarness::new();
    harness.expect_segment(NarrativeSegment::new("Nothing happens.", Vec::new()));

    let result = harness.start(fantasy_request()).await;
    assert!(matches!(result, Err(StoryError::InvalidChoice(_))));
    assert_eq!(harness.store.run_count().await, 0);
}

// =============================================================================
// Choice selection and progression
// =============================================================================

#[tokio::test]
async fn test_trust_stranger_scenario() {
    let mut harness = TestHarness::new();
    harness
        .expect_segment(NarrativeSegment::new("A hooded stranger waves you over.", stranger_choices()))
        .expect_beat("The wizard leads you into the forest.");

    let session = harness.start(fantasy_request()).await.unwrap();
    let next = harness.choose(&session, ChoiceId::A).await.unwrap();

    assert_step_number(&next, 2);
    assert_active(&next);
    assert_has_flag(&next, "met_wizard");
    assert_relationship(&next, "wizard", 10);
    assert_trait(&next, Trait::Empathy, 52);
    assert_trait(&next, Trait::RiskTaking, 50);
    assert_eq!(next.step.game_state.act, 1);
    assert!(next.step.game_state.inventory.is_empty());

    let requests = harness.narrator.requests();
    let continuation = &requests[1];
    assert_eq!(continuation.story_run_id, Some(session.run.id));
    assert_eq!(continuation.current_step, Some(1));
    assert_eq!(continuation.previous_choice.as_deref(), Some("Trust the stranger"));
    assert!(continuation.game_state.as_ref().unwrap().has_flag("met_wizard"));

    let first = harness.store.get_step(session.step.id).await.unwrap().unwrap();
    assert_eq!(first.selected_choice, Some(ChoiceId::A));

    let key = ChoiceKey::new("trust_stranger", ChoiceId::A, Genre::Fantasy);
    assert_eq!(harness.statistics.counts(&key).await.selections, 1);
}

#[tokio::test]
async fn test_milestone_flag_advances_act() {
    let mut harness = TestHarness::new();
    let choices = vec![
        Choice::new(ChoiceId::A, "Return the amulet", "return_amulet").with_consequence("add_flag:completed_first_quest"),
        Choice::new(ChoiceId::B, "Keep the amulet", "keep_amulet").with_consequence("add_item:amulet"),
    ];
    harness
        .expect_segment(NarrativeSegment::new("The amulet glows.", choices))
        .expect_beat("The village elder nods.");

    let session = harness.start(fantasy_request()).await.unwrap();
    let next = harness.choose(&session, ChoiceId::A).await.unwrap();

    assert_eq!(next.step.game_state.act, 2);
    assert_has_flag(&next, "completed_first_quest");
}

#[tokio::test]
async fn test_unknown_directive_is_skipped() {
    let mut harness = TestHarness::new();
    let choices = vec![
        Choice::new(ChoiceId::A, "Cast the spell", "cast_spell")
            .with_consequence("summon_dragon:red")
            .with_consequence("add_item:scorched_robe"),
        Choice::new(ChoiceId::B, "Run", "run"),
    ];
    harness
        .expect_segment(NarrativeSegment::new("The runes burn.", choices))
        .expect_beat("Smoke fills the tower.");

    let session = harness.start(fantasy_request()).await.unwrap();
    let next = harness.choose(&session, ChoiceId::A).await.unwrap();

    assert!(next.step.game_state.has_item("scorched_robe"));
    assert_eq!(next.step.game_state.flags.len(), 0);
}

#[tokio::test]
async fn test_step_numbers_strictly_increase() {
    let mut harness = TestHarness::new();
    harness.expect_beat("One.").expect_beat("Two.").expect_beat("Three.").expect_beat("Four.");

    let mut session = harness.start(fantasy_request()).await.unwrap();
    for _ in 0..3 {
        session = harness.choose(&session, ChoiceId::B).await.unwrap();
    }

    let history = harness.flow.history(session.run.id).await.unwrap();
    let numbers: Vec<u32> = history.iter().map(|s| s.step_number).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4]);
    assert!(history[..3].iter().all(|s| s.selected_choice == Some(ChoiceId::B)));
    assert!(history[3].selected_choice.is_none());

    let loaded = harness.flow.session(session.run.id).await.unwrap();
    assert_eq!(loaded.step.id, session.step.id);
}

#[tokio::test]
async fn test_choice_found_by_slug() {
    let mut harness = TestHarness::new();
    harness.expect_beat("A fork in the road.").expect_beat("You wait.");

    let session = harness.start(fantasy_request()).await.unwrap();
    let next = harness
        .flow
        .select_choice(session.step.id, ChoiceId::D, Some("wait_and_watch"))
        .await
        .unwrap();

    assert_step_number(&next, 2);
    let first = harness.store.get_step(session.step.id).await.unwrap().unwrap();
    assert_eq!(first.selected_choice, Some(ChoiceId::B));
}

#[tokio::test]
async fn test_earlier_step_rejects_selection() {
    let mut harness = TestHarness::new();
    harness
        .expect_beat("The bridge sways.")
        .expect_beat("You cross safely.")
        .expect_beat("The far bank is quiet.");

    let session = harness.start(fantasy_request()).await.unwrap();
    let next = harness.choose(&session, ChoiceId::A).await.unwrap();
    assert_step_number(&next, 2);

    let err = harness.choose(&session, ChoiceId::C).await.unwrap_err();
    assert!(matches!(
        err,
        StoryError::StaleStep { step_id, step_number: 1, latest: 2 } if step_id == session.step.id
    ));

    // The earlier selection, statistics, analytics and narrator are untouched.
    let first = harness.store.get_step(session.step.id).await.unwrap().unwrap();
    assert_eq!(first.selected_choice, Some(ChoiceId::A));
    let key = ChoiceKey::new(session.step.choice_slug.clone(), ChoiceId::C, Genre::Fantasy);
    assert_eq!(harness.statistics.counts(&key).await.selections, 0);
    assert_eq!(harness.analytics.event_names(), vec!["story_started", "choice_selected"]);
    assert_eq!(harness.narrator.request_count(), 2);
    assert_eq!(harness.narrator.remaining(), 1);
    assert_eq!(harness.flow.history(session.run.id).await.unwrap().len(), 2);

    // The current step still progresses.
    let third = harness.choose(&next, ChoiceId::B).await.unwrap();
    assert_step_number(&third, 3);
}

#[tokio::test]
async fn test_continuation_with_invalid_choices_is_rejected() {
    let mut harness = TestHarness::new();
    let duplicated = vec![
        Choice::new(ChoiceId::A, "Take the left path", "left_path"),
        Choice::new(ChoiceId::A, "Take the right path", "right_path"),
    ];
    let unnamed = vec![Choice::new(ChoiceId::A, "Follow the river", "")];
    harness
        .expect_beat("A signpost leans in the wind.")
        .expect_segment(NarrativeSegment::new("Two paths, one sign.", duplicated))
        .expect_segment(NarrativeSegment::new("A river bends north.", unnamed))
        .expect_beat("The path clears.");

    let session = harness.start(fantasy_request()).await.unwrap();

    let err = harness.choose(&session, ChoiceId::A).await.unwrap_err();
    assert!(matches!(err, StoryError::InvalidChoice(_)));
    let err = harness.choose(&session, ChoiceId::B).await.unwrap_err();
    assert!(matches!(err, StoryError::InvalidChoice(_)));
    assert_eq!(harness.flow.history(session.run.id).await.unwrap().len(), 1);

    let loaded = harness.flow.session(session.run.id).await.unwrap();
    assert_eq!(loaded.step.id, session.step.id);
    assert_active(&loaded);

    let next = harness.choose(&session, ChoiceId::B).await.unwrap();
    assert_step_number(&next, 2);
    assert_eq!(next.step.story_text, "The path clears.");
}

#[tokio::test]
async fn test_missing_choice_and_step() {
    let mut harness = TestHarness::new();
    harness.expect_beat("A fork in the road.");

    let session = harness.start(fantasy_request()).await.unwrap();

    let err = harness.choose(&session, ChoiceId::D).await.unwrap_err();
    assert!(matches!(err, StoryError::ChoiceNotFound { .. }));
    assert!(err.is_not_found());

    let missing = StepId::new();
    let err = harness.flow.select_choice(missing, ChoiceId::A, None).await.unwrap_err();
    assert!(matches!(err, StoryError::StepNotFound(id) if id == missing));

    // No selection recorded and no narrator call made.
    assert_eq!(harness.narrator.request_count(), 1);
    let first = harness.store.get_step(session.step.id).await.unwrap().unwrap();
    assert_eq!(first.selected_choice, None);
}

// =============================================================================
// Endings
// =============================================================================

#[tokio::test]
async fn test_keyword_ending_completes_run() {
    let mut harness = TestHarness::new();
    harness
        .expect_beat("The dragon stirs.")
        .expect_beat("Years later, the kingdom would celebrate your victory.");

    let session = harness.start(fantasy_request()).await.unwrap();
    let end = harness.choose(&session, ChoiceId::A).await.unwrap();

    assert_step_number(&end, 2);
    assert_completed(&end);
    assert_eq!(end.step.choice_slug, "no_choices");

    let ending = end.run.ending.as_ref().unwrap();
    assert_eq!(ending.category, EndingCategory::Heroic);
    assert_eq!(ending.rarity, Rarity::Common);
    assert_eq!(ending.tag, "fantasy_risk_taking_path");
    assert!(!ending.title.is_empty());

    let stored = harness.store.get_run(end.run.id).await.unwrap().unwrap();
    assert!(stored.completed);
    assert!(stored.completed_at.is_some());

    let discoveries = harness.collection.discoveries("player-1").await;
    assert_eq!(discoveries.len(), 1);
    assert_eq!(discoveries[0].ending_tag, "fantasy_risk_taking_path");
    assert_eq!(discoveries[0].story_run_id, end.run.id);

    assert_eq!(
        harness.analytics.event_names(),
        vec!["story_started", "choice_selected", "ending_reached"]
    );
}

#[tokio::test]
async fn test_step_limit_ends_quick_story() {
    let mut harness = TestHarness::new();
    harness.expect_beat("Hull breach on deck three.");

    let request = StoryRequest::new(Genre::Scifi, StoryLength::Quick);
    let mut session = harness.start(request).await.unwrap();

    for expected in 2..StoryLength::Quick.max_steps() {
        session = harness.choose(&session, ChoiceId::A).await.unwrap();
        assert_step_number(&session, expected);
        assert_active(&session);
    }

    let end = harness.choose(&session, ChoiceId::A).await.unwrap();
    assert_step_number(&end, StoryLength::Quick.max_steps());
    assert_completed(&end);
}

#[tokio::test]
async fn test_narrator_ending_signal() {
    let mut harness = TestHarness::new();
    harness
        .expect_beat("The ship drifts.")
        .expect_segment(NarrativeSegment::new("The stars go quiet around you.", Vec::new()).as_ending(Some("quiet".into())));

    let request = StoryRequest::new(Genre::Scifi, StoryLength::Standard);
    let session = harness.start(request).await.unwrap();
    let end = harness.choose(&session, ChoiceId::C).await.unwrap();

    assert_completed(&end);
    assert_eq!(end.run.ending.as_ref().unwrap().category, EndingCategory::Bittersweet);
}

#[tokio::test]
async fn test_resolution_flag_ending_in_quick_story() {
    let mut harness = TestHarness::new();
    let choices = vec![
        Choice::new(ChoiceId::A, "Confront the killer", "confront_killer")
            .with_consequence("increment_act")
            .with_consequence("add_flag:case_solved"),
        Choice::new(ChoiceId::B, "Call for backup", "call_backup"),
    ];
    harness
        .expect_segment(NarrativeSegment::new("The butler's hands shake.", choices))
        .expect_beat("The butler confesses to everything.");

    let request = StoryRequest::new(Genre::Mystery, StoryLength::Quick).with_user("detective");
    let session = harness.start(request).await.unwrap();
    let end = harness.choose(&session, ChoiceId::A).await.unwrap();

    assert_completed(&end);
    assert_eq!(end.step.game_state.act, 2);
    assert_eq!(end.run.ending.as_ref().unwrap().category, EndingCategory::Mysterious);
}

#[tokio::test]
async fn test_secret_flags_give_ultra_rare_ending() {
    let mut harness = TestHarness::new();
    let choices = vec![
        Choice::new(ChoiceId::A, "Read the forbidden tome", "read_tome")
            .with_consequence("add_flag:secret_door")
            .with_consequence("add_flag:secret_name")
            .with_consequence("add_flag:secret_pact"),
        Choice::new(ChoiceId::B, "Burn the tome", "burn_tome"),
    ];
    harness
        .expect_segment(NarrativeSegment::new("The tome whispers.", choices))
        .expect_beat("At last the house falls silent.");

    let request = StoryRequest::new(Genre::Horror, StoryLength::Medium).with_user("reader");
    let session = harness.start(request).await.unwrap();
    let end = harness.choose(&session, ChoiceId::A).await.unwrap();

    let ending = end.run.ending.as_ref().unwrap();
    assert_eq!(ending.rarity, Rarity::UltraRare);
    assert_eq!(ending.tag, "horror_hidden_truth");

    let counts = harness.collection.rarity_counts("reader").await;
    assert_eq!(counts.get(&Rarity::UltraRare), Some(&1));
}

#[tokio::test]
async fn test_selection_after_completion_is_rejected() {
    let mut harness = TestHarness::new();
    harness.expect_beat("The gate opens.").expect_beat("Farewell, traveler.");

    let session = harness.start(fantasy_request()).await.unwrap();
    let end = harness.choose(&session, ChoiceId::A).await.unwrap();
    assert_completed(&end);

    let err = harness.choose(&session, ChoiceId::B).await.unwrap_err();
    assert!(matches!(err, StoryError::StaleStep { step_number: 1, latest: 2, .. }));
    let err = harness.choose(&end, ChoiceId::A).await.unwrap_err();
    assert!(matches!(err, StoryError::ChoiceNotFound { .. }));

    assert_eq!(harness.narrator.request_count(), 2);
    let history = harness.flow.history(end.run.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].selected_choice, Some(ChoiceId::A));
}

#[tokio::test]
async fn test_seeded_titles_are_reproducible() {
    async fn play() -> String {
        let mut harness = TestHarness::new();
        harness.expect_beat("The crowd gathers.").expect_beat("The end of an era.");
        let session = harness.start(fantasy_request()).await.unwrap();
        let end = harness.choose(&session, ChoiceId::A).await.unwrap();
        end.run.ending.unwrap().title
    }

    assert_eq!(play().await, play().await);
}

#[tokio::test]
async fn test_profile_after_run() {
    let mut harness = TestHarness::new();
    let choices = vec![
        Choice::new(ChoiceId::A, "Lead the charge", "lead_charge").with_trait_impact("leadership", 3),
        Choice::new(ChoiceId::B, "Hold back", "hold_back"),
    ];
    harness
        .expect_segment(NarrativeSegment::new("The enemy advances.", choices))
        .expect_beat("The battle rages on.");

    let session = harness.start(fantasy_request()).await.unwrap();
    let next = harness.choose(&session, ChoiceId::A).await.unwrap();

    let profile = harness.flow.profile(next.run.id).await.unwrap();
    assert_eq!(profile.dominant, Trait::Leadership);
    assert!(profile.balanced);
}

// =============================================================================
// Failure handling
// =============================================================================

#[tokio::test]
async fn test_side_effect_failures_are_swallowed() {
    let narrator = Arc::new(ScriptedNarrator::new(vec![
        beat("The tower trembles."),
        beat("Finally, the tower falls silent."),
    ]));
    let store = Arc::new(MemoryStore::new());
    let flow = StoryFlow::new(narrator, store.clone())
        .with_collection(Arc::new(FailingCollection))
        .with_statistics(Arc::new(FailingStatistics))
        .with_seed(3);

    let session = flow.create_story_session(fantasy_request()).await.unwrap();
    let end = flow.select_choice(session.step.id, ChoiceId::A, None).await.unwrap();

    assert_completed(&end);
    assert!(store.get_run(end.run.id).await.unwrap().unwrap().completed);
}

#[tokio::test]
async fn test_store_failure_carries_context() {
    let narrator = Arc::new(ScriptedNarrator::new(vec![beat("Hello.")]));
    let flow = StoryFlow::new(narrator, Arc::new(FailingStore));

    let err = flow.create_story_session(fantasy_request()).await.unwrap_err();
    assert!(matches!(err, StoryError::Store { .. }));
    assert!(err.to_string().starts_with("Failed to create story session: "));
}

#[tokio::test]
async fn test_narrator_failure_surfaces() {
    let flow = StoryFlow::new(Arc::new(FailingNarrator), Arc::new(MemoryStore::new()));

    let err = flow.create_story_session(fantasy_request()).await.unwrap_err();
    assert!(matches!(err, StoryError::Narrative { .. }));
}

#[tokio::test]
async fn test_anonymous_ending_is_not_collected() {
    let mut harness = TestHarness::new();
    harness.expect_beat("The road ends here.").expect_beat("Epilogue: the inn still stands.");

    let session = harness
        .start(StoryRequest::new(Genre::Romance, StoryLength::Medium))
        .await
        .unwrap();
    let end = harness.choose(&session, ChoiceId::A).await.unwrap();

    assert_completed(&end);
    assert!(end.run.user_id.is_none());
    assert!(harness
        .analytics
        .events()
        .iter()
        .any(|e| matches!(e, AnalyticsEvent::EndingReached { run_id, .. } if *run_id == end.run.id)));
    assert!(harness.collection.discoveries("").await.is_empty());
}

#[test]
fn test_standard_choices_are_valid() {
    assert!(story_core::choice::validate_choices(&standard_choices()).is_ok());
}
