//! Multi-judge code review aggregation.
//!
//! Every judge scores the same file on four dimensions and reports a
//! confidence. Scores are averaged with confidence as the weight; the
//! critique is the summary of the most confident judge.

use serde_json::{Value, json};

use footprint_shared::FieldMap;

/// Independent judge calls per source file.
pub const CODE_REVIEW_JUDGES: usize = 3;

/// Source text shown to each judge.
pub const JUDGE_CONTENT_CHARS: usize = 20_000;

/// Scored dimensions, in report order.
pub const REVIEW_DIMENSIONS: [&str; 4] = ["code_quality", "architecture", "readability", "security"];

/// Weight of a judge that does not report a confidence.
const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Combine judge replies into one review record.
///
/// Produces `quality_score` (`"x.y/5"`), `detailed_scores`, `critique` and
/// `judge_count`. Empty replies are ignored; no usable reply yields an
/// empty map.
pub fn aggregate_reviews(reviews: &[FieldMap]) -> FieldMap {
    let reviews: Vec<&FieldMap> = reviews.iter().filter(|r| !r.is_empty()).collect();
    if reviews.is_empty() {
        return FieldMap::new();
    }

    let mut totals = [0.0_f64; REVIEW_DIMENSIONS.len()];
    let mut total_weight = 0.0;
    let mut critique = "";
    let mut best = f64::NEG_INFINITY;

    for review in &reviews {
        let weight = review
            .get("confidence")
            .and_then(number)
            .map_or(DEFAULT_CONFIDENCE, |c| c.clamp(0.0, 1.0));
        total_weight += weight;

        if weight > best {
            best = weight;
            critique = review.get("summary").and_then(Value::as_str).unwrap_or_default();
        }

        let scores = review.get("scores");
        for (total, dimension) in totals.iter_mut().zip(REVIEW_DIMENSIONS) {
            let score = scores
                .and_then(|s| s.get(dimension))
                .and_then(number)
                .unwrap_or(0.0);
            *total += score * weight;
        }
    }

    if total_weight > 0.0 {
        for total in &mut totals {
            *total = round_to(*total / total_weight, 2);
        }
    }
    let average = totals.iter().sum::<f64>() / totals.len() as f64;

    let mut detailed = FieldMap::new();
    for (dimension, score) in REVIEW_DIMENSIONS.iter().zip(totals) {
        detailed.insert((*dimension).to_string(), json!(score));
    }

    let mut record = FieldMap::new();
    record.insert("quality_score".into(), json!(format!("{average:.1}/5")));
    record.insert("detailed_scores".into(), Value::Object(detailed));
    record.insert("critique".into(), json!(critique));
    record.insert("judge_count".into(), json!(reviews.len()));
    record
}

/// A number, or a string holding one.
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn judge(value: Value) -> FieldMap {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn scores_are_confidence_weighted() {
        let record = aggregate_reviews(&[
            judge(json!({
                "scores": {"code_quality": 4, "architecture": 4, "readability": 4, "security": 4},
                "summary": "Strong.",
                "confidence": 0.9
            })),
            judge(json!({
                "scores": {"code_quality": 2, "architecture": 2, "readability": 2, "security": 2},
                "summary": "Weak.",
                "confidence": 0.3
            })),
        ]);

        // (4 * 0.9 + 2 * 0.3) / 1.2 = 3.5
        assert_eq!(record["detailed_scores"]["security"], json!(3.5));
        assert_eq!(record["quality_score"], json!("3.5/5"));
        assert_eq!(record["critique"], json!("Strong."));
        assert_eq!(record["judge_count"], json!(2));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let record = aggregate_reviews(&[
            judge(json!({"scores": {"code_quality": "5", "architecture": 3}, "summary": "Only one."})),
            FieldMap::new(),
        ]);

        assert_eq!(record["judge_count"], json!(1));
        assert_eq!(record["detailed_scores"]["code_quality"], json!(5.0));
        assert_eq!(record["detailed_scores"]["readability"], json!(0.0));
        assert_eq!(record["quality_score"], json!("2.0/5"));
        assert_eq!(record["critique"], json!("Only one."));
    }

    #[test]
    fn no_usable_judges_yields_nothing() {
        assert!(aggregate_reviews(&[]).is_empty());
        assert!(aggregate_reviews(&[FieldMap::new(), FieldMap::new()]).is_empty());
    }
}
