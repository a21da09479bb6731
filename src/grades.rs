//! Latest grade lookup over a submission's history.

use serde_json::Value;

/// Field inside a `gradeHistory` record holding the grade.
pub const POINTS_FIELD: &str = "pointsEarned";

/// Pick the grade from the last history entry that carries `pointsEarned`.
///
/// Presence of the key is what counts, so an explicit `0` or `null` still
/// qualifies. "Last" means last in list order; entries are not re-sorted by
/// their timestamps.
pub fn latest_points(history: Option<&Value>) -> Option<Value> {
    history?
        .as_array()?
        .iter()
        .filter_map(|entry| entry.get("gradeHistory")?.as_object()?.get(POINTS_FIELD))
        .last()
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_last_qualifying_entry_wins() {
        let history = json!([
            {"gradeHistory": {"pointsEarned": 5}},
            {"gradeHistory": {"other": 1}},
            {"gradeHistory": {"pointsEarned": 9}}
        ]);
        assert_eq!(latest_points(Some(&history)), Some(json!(9)));
    }

    #[test]
    fn test_intermediate_state_entries_ignored() {
        let history = json!([
            {"stateHistory": {"state": "CREATED"}},
            {"gradeHistory": {
                "pointsEarned": 7,
                "gradeChangeType": "DRAFT_GRADE_POINTS_EARNED_CHANGE"
            }},
            {"stateHistory": {"state": "RETURNED"}}
        ]);
        assert_eq!(latest_points(Some(&history)), Some(json!(7)));
    }

    #[test]
    fn test_zero_and_null_count_as_present() {
        let history = json!([
            {"gradeHistory": {"pointsEarned": 5}},
            {"gradeHistory": {"pointsEarned": 0}}
        ]);
        assert_eq!(latest_points(Some(&history)), Some(json!(0)));

        let history = json!([
            {"gradeHistory": {"pointsEarned": 5}},
            {"gradeHistory": {"pointsEarned": null}}
        ]);
        assert_eq!(latest_points(Some(&history)), Some(Value::Null));
    }

    #[test]
    fn test_absent_or_malformed_history() {
        assert_eq!(latest_points(None), None);
        assert_eq!(latest_points(Some(&json!([]))), None);
        assert_eq!(latest_points(Some(&json!("history"))), None);
        assert_eq!(
            latest_points(Some(&json!([1, "x", {"gradeHistory": "bad"}, {"gradeHistory": {}}]))),
            None
        );
    }
}
