use crate::records::Answers;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionCode {
    None,
    Support,
    Attention,
    Ok,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub label: &'static str,
    pub code: SuggestionCode,
    pub score: f64,
}

impl Suggestion {
    fn no_data() -> Self {
        Self {
            label: "Sem dados",
            code: SuggestionCode::None,
            score: 0.0,
        }
    }
}

const SUPPORT_THRESHOLD: f64 = -0.4;

/// Weight of one answer token. Null, unknown tokens and non-strings count 0.
pub fn answer_weight(v: &Value) -> f64 {
    match v.as_str() {
        Some("sim") => 1.0,
        Some("maioria") => 0.5,
        Some("raras") => -0.5,
        Some("nao") => -1.0,
        _ => 0.0,
    }
}

/// Mean answer weight mapped onto an advisory label. Thresholds are checked
/// in order: `<= -0.4` support, `<= 0` attention, otherwise ok.
pub fn compute_suggestion(answers: Option<&Answers>) -> Suggestion {
    let Some(answers) = answers else {
        return Suggestion::no_data();
    };
    if answers.is_empty() {
        return Suggestion::no_data();
    }

    let sum: f64 = answers.values().map(answer_weight).sum();
    let score = sum / answers.len() as f64;

    if score <= SUPPORT_THRESHOLD {
        Suggestion {
            label: "Suporte a mais",
            code: SuggestionCode::Support,
            score,
        }
    } else if score <= 0.0 {
        Suggestion {
            label: "Mais atenção",
            code: SuggestionCode::Attention,
            score,
        }
    } else {
        Suggestion {
            label: "OK",
            code: SuggestionCode::Ok,
            score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn answers(pairs: &[(&str, Value)]) -> Answers {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn empty_and_absent_have_no_data() {
        let empty = Answers::new();
        for s in [compute_suggestion(None), compute_suggestion(Some(&empty))] {
            assert_eq!(s.label, "Sem dados");
            assert_eq!(s.code, SuggestionCode::None);
            assert_eq!(s.score, 0.0);
        }
    }

    #[test]
    fn all_yes_is_ok() {
        let s = compute_suggestion(Some(&answers(&[("0", json!("sim")), ("1", json!("sim"))])));
        assert_eq!(s.code, SuggestionCode::Ok);
        assert_eq!(s.label, "OK");
        assert_eq!(s.score, 1.0);
    }

    #[test]
    fn all_no_needs_support() {
        let s = compute_suggestion(Some(&answers(&[("0", json!("nao")), ("1", json!("nao"))])));
        assert_eq!(s.code, SuggestionCode::Support);
        assert_eq!(s.label, "Suporte a mais");
        assert_eq!(s.score, -1.0);
    }

    #[test]
    fn zero_mean_is_attention() {
        let s = compute_suggestion(Some(&answers(&[
            ("0", json!("maioria")),
            ("1", json!("raras")),
        ])));
        assert_eq!(s.code, SuggestionCode::Attention);
        assert_eq!(s.label, "Mais atenção");
        assert_eq!(s.score, 0.0);
    }

    #[test]
    fn just_above_support_threshold_is_attention() {
        let s = compute_suggestion(Some(&answers(&[("0", json!("nao")), ("1", json!("maioria"))])));
        assert_eq!(s.code, SuggestionCode::Attention);
        assert_eq!(s.score, -0.25);
    }

    #[test]
    fn unknown_and_null_values_count_as_zero() {
        // (-1 + 0 + 0) / 3 = -0.333.. -> attention, not support.
        let s = compute_suggestion(Some(&answers(&[
            ("0", json!("nao")),
            ("4", json!(null)),
            ("9", json!("talvez")),
        ])));
        assert_eq!(s.code, SuggestionCode::Attention);
        assert!((s.score + 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn serializes_like_the_console_expects() {
        let s = compute_suggestion(Some(&answers(&[("0", json!("sim"))])));
        assert_eq!(
            serde_json::to_value(&s).expect("json"),
            json!({ "label": "OK", "code": "ok", "score": 1.0 })
        );
    }
}
