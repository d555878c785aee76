//! Session store merge semantics, driven through decoded frames the way the
//! engine receives them.

use brainstorm_sync::protocol::decode_frame;
use brainstorm_sync::{IdeaRating, ServerEvent, Session, SessionStore, TranscriptEntry};
use proptest::prelude::*;
use rstest::rstest;
use serde_json::json;

fn frame(value: serde_json::Value) -> ServerEvent {
    decode_frame(&value.to_string()).unwrap()
}

fn session(id: &str) -> Session {
    serde_json::from_value(json!({"id": id, "name": format!("room {id}")})).unwrap()
}

fn store_in_session(id: &str) -> SessionStore {
    let mut store = SessionStore::new();
    store.apply(&frame(json!({"type": "sessions_list", "data": [{"id": id, "name": "S"}]})));
    store.apply(&frame(json!({"type": "session_joined", "data": {"id": id}})));
    store
}

// ---------------------------------------------------------------------------
// Session list
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn prop_sessions_list_is_full_replace(
        deliveries in prop::collection::vec(
            prop::collection::vec("[a-z0-9]{1,6}", 0..6),
            1..8,
        )
    ) {
        let mut store = SessionStore::new();
        for ids in deliveries {
            let payload: Vec<Session> = ids.iter().map(|id| session(id)).collect();
            store.apply(&ServerEvent::SessionsList(payload.clone()));
            prop_assert_eq!(store.sessions(), payload.as_slice());
        }
    }
}

#[test]
fn test_duplicate_session_created_keeps_one_entry_first() {
    let mut store = SessionStore::new();
    store.apply(&ServerEvent::SessionsList(vec![session("a"), session("s1"), session("b")]));
    store.apply(&frame(json!({"type": "session_created", "data": {"id": "s1", "name": "S1"}})));
    store.apply(&frame(json!({"type": "session_created", "data": {"id": "s1", "name": "S1 again"}})));

    let ids: Vec<&str> = store.sessions().iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, ["s1", "a", "b"]);
    assert_eq!(store.sessions()[0].name, "S1 again");
    assert_eq!(store.current_session_id(), Some("s1"));
}

#[test]
fn test_session_updated_for_unknown_id_is_ignored() {
    let mut store = SessionStore::new();
    store.apply(&ServerEvent::SessionsList(vec![session("a")]));
    let changed = store.apply(&ServerEvent::SessionUpdated(session("zzz")));
    assert!(!changed);
    assert_eq!(store.sessions().len(), 1);
}

// ---------------------------------------------------------------------------
// Ideas and ratings
// ---------------------------------------------------------------------------

#[test]
fn test_idea_then_rating_in_current_session() {
    let mut store = store_in_session("s1");
    store.apply(&frame(json!({
        "type": "idea_submitted",
        "data": {"id": "i1", "content": "x", "mediaType": "text"}
    })));
    store.apply(&frame(json!({
        "type": "idea_rating",
        "data": {"ideaId": "i1", "rating": {"novelty": 5, "feasibility": 3, "usefulness": 4}}
    })));

    let idea = store.current_session().unwrap().idea("i1").unwrap();
    assert_eq!(idea.ratings.len(), 1);
    let r = &idea.ratings[0];
    assert_eq!((r.novelty, r.feasibility, r.usefulness), (5, 3, 4));
}

#[test]
fn test_rating_for_unknown_idea_is_ignored() {
    let mut store = store_in_session("s1");
    let changed = store.apply(&frame(json!({
        "type": "idea_rating",
        "data": {"ideaId": "nope", "rating": {"novelty": 1, "feasibility": 1, "usefulness": 1}}
    })));
    assert!(!changed);
}

#[test]
fn test_idea_without_current_session_is_ignored() {
    let mut store = SessionStore::new();
    store.apply(&ServerEvent::SessionsList(vec![session("s1")]));
    let changed = store.apply(&frame(json!({
        "type": "idea_submitted",
        "data": {"id": "i1", "content": "x"}
    })));
    assert!(!changed);
    assert!(store.sessions()[0].ideas.is_empty());
}

proptest! {
    #[test]
    fn prop_ratings_append_in_order_and_average(
        scores in prop::collection::vec((1u8..=5, 1u8..=5, 1u8..=5), 1..25)
    ) {
        let mut store = store_in_session("s1");
        store.apply(&frame(json!({
            "type": "idea_submitted",
            "data": {"id": "i1", "content": "x", "mediaType": "text"}
        })));
        for (i, (n, f, u)) in scores.iter().enumerate() {
            let rating = IdeaRating {
                user_id: format!("u{i}"),
                novelty: *n,
                feasibility: *f,
                usefulness: *u,
                comment: None,
            };
            store.apply(&ServerEvent::IdeaRated { idea_id: "i1".into(), rating });
        }

        let idea = store.current_session().unwrap().idea("i1").unwrap();
        prop_assert_eq!(idea.ratings.len(), scores.len());
        for (i, r) in idea.ratings.iter().enumerate() {
            prop_assert_eq!(&r.user_id, &format!("u{i}"));
        }

        let count = scores.len() as f64;
        let mean = |pick: fn(&(u8, u8, u8)) -> u8| {
            scores.iter().map(|s| f64::from(pick(s))).sum::<f64>() / count
        };
        let avg = idea.rating_averages().unwrap();
        prop_assert!((avg.novelty - mean(|s| s.0)).abs() < 1e-9);
        prop_assert!((avg.feasibility - mean(|s| s.1)).abs() < 1e-9);
        prop_assert!((avg.usefulness - mean(|s| s.2)).abs() < 1e-9);
        prop_assert_eq!(avg.count, scores.len());
    }
}

// ---------------------------------------------------------------------------
// Aggregation, discussion and leaving
// ---------------------------------------------------------------------------

#[test]
fn test_aggregation_then_discussion() {
    let mut store = store_in_session("s1");

    store.apply(&frame(json!({"type": "aggregation_started"})));
    assert!(store.is_aggregating());

    store.apply(&frame(json!({"type": "aggregation_result", "data": "summary"})));
    assert!(!store.is_aggregating());
    assert_eq!(store.aggregation_summary(), Some("summary"));

    store.apply(&frame(json!({"type": "discussion_started", "data": "talk"})));
    assert!(store.discussion_started());

    // Only leaving clears it.
    store.apply(&frame(json!({"type": "aggregation_started"})));
    store.apply(&frame(json!({"type": "aggregation_result", "data": "again"})));
    assert!(store.discussion_started());
}

#[test]
fn test_aggregation_error_lands_in_transcript() {
    let mut store = store_in_session("s1");
    store.apply(&frame(json!({"type": "aggregation_started"})));
    store.apply(&frame(json!({"type": "aggregation_error", "data": "model offline"})));
    assert!(!store.is_aggregating());
    assert_eq!(store.aggregation_error(), Some("model offline"));
    assert_eq!(
        store.transcript().last(),
        Some(&TranscriptEntry::AggregationFailed("model offline".into()))
    );
}

fn busy(store: &mut SessionStore) {
    store.apply(&frame(json!({"type": "aggregation_started"})));
}

fn discussing(store: &mut SessionStore) {
    store.apply(&frame(json!({"type": "discussion_started", "data": "go"})));
}

fn chatty(store: &mut SessionStore) {
    store.apply(&frame(json!({"type": "session_message", "username": "bob", "data": "hi"})));
    store.apply(&frame(json!({"type": "error", "data": "slow down"})));
}

fn everything(store: &mut SessionStore) {
    chatty(store);
    busy(store);
    discussing(store);
}

#[rstest]
#[case::idle(|_: &mut SessionStore| {})]
#[case::busy(busy)]
#[case::discussing(discussing)]
#[case::chatty(chatty)]
#[case::everything(everything)]
fn test_leave_resets_regardless_of_state(#[case] prepare: fn(&mut SessionStore)) {
    let mut store = store_in_session("s1");
    prepare(&mut store);
    store.leave();

    assert_eq!(store.current_session_id(), None);
    assert!(!store.is_aggregating());
    assert!(!store.discussion_started());
    assert!(store.transcript().is_empty());
    assert_eq!(store.sessions().len(), 1, "session list survives leaving");
}
