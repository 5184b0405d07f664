// src/feed/merge.rs
//
// Key-based merge of the two independently fetched collections. Output length
// always equals the event count; predictions with no matching event carry no
// identity of their own in this view and are dropped.

use std::collections::HashMap;

use crate::feed::types::{FeedRecord, GameEvent, Prediction};

/// Pair each event with its prediction, if any. Builds a key→prediction index
/// first — both collections can run into the hundreds and this executes every
/// refresh round, so no nested scan.
pub fn merge_predictions(events: &[GameEvent], predictions: &[Prediction]) -> Vec<FeedRecord> {
    let mut index: HashMap<&str, &Prediction> = HashMap::with_capacity(predictions.len());
    for p in predictions {
        // First occurrence wins on duplicate ids.
        index.entry(p.event_id.as_str()).or_insert(p);
    }

    events
        .iter()
        .map(|event| FeedRecord {
            event: event.clone(),
            prediction: index.get(event.id.as_str()).map(|p| (*p).clone()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;

    fn event(id: &str) -> GameEvent {
        GameEvent {
            id: id.to_string(),
            league: "NBA".into(),
            home: "Home".into(),
            away: "Away".into(),
            start_time: "2024-01-15T19:00:00-05:00".into(),
            local_day: None,
        }
    }

    fn prediction(id: &str, confidence: f32) -> Prediction {
        Prediction {
            event_id: id.to_string(),
            confidence,
            model: "elo-v3".into(),
            generated_at: None,
        }
    }

    #[test]
    fn output_length_equals_event_count() {
        let events = vec![event("a"), event("b"), event("c")];
        let merged = merge_predictions(&events, &[]);
        assert_eq!(merged.len(), 3);
        assert!(merged.iter().all(|r| r.prediction.is_none()));
    }

    #[test]
    fn prediction_attaches_by_id_and_orphans_drop() {
        let events = vec![event("a"), event("b")];
        let predictions = vec![prediction("b", 0.7), prediction("zzz", 0.9)];
        let merged = merge_predictions(&events, &predictions);
        assert_eq!(merged.len(), 2);
        assert!(merged[0].prediction.is_none());
        assert_eq!(
            merged[1].prediction.as_ref().map(|p| p.confidence),
            Some(0.7)
        );
    }

    #[test]
    fn merge_preserves_event_order() {
        let events = vec![event("c"), event("a"), event("b")];
        let merged = merge_predictions(&events, &[prediction("a", 0.5)]);
        let ids: Vec<&str> = merged.iter().map(|r| r.event.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn prediction_order_does_not_change_attachment() {
        let events: Vec<GameEvent> = (0..20).map(|i| event(&format!("e{i}"))).collect();
        let mut predictions: Vec<Prediction> = (0..20)
            .map(|i| prediction(&format!("e{i}"), i as f32 / 20.0))
            .collect();

        let baseline = merge_predictions(&events, &predictions);
        let mut rng = rand::rng();
        for _ in 0..5 {
            predictions.shuffle(&mut rng);
            assert_eq!(merge_predictions(&events, &predictions), baseline);
        }
    }

    #[test]
    fn duplicate_prediction_ids_keep_first() {
        let events = vec![event("a")];
        let predictions = vec![prediction("a", 0.2), prediction("a", 0.9)];
        let merged = merge_predictions(&events, &predictions);
        assert_eq!(
            merged[0].prediction.as_ref().map(|p| p.confidence),
            Some(0.2)
        );
    }
}
