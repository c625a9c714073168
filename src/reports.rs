use crate::records::{Evaluation, Identified, ReportEntry, Student};
use crate::reminders::parse_when;
use crate::suggestion::{compute_suggestion, Suggestion};
use chrono::{DateTime, Datelike, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentReportRow {
    pub student: Student,
    pub evaluation_count: usize,
    pub last_evaluation: Option<Evaluation>,
    pub suggestion: Suggestion,
    /// Present only when a report entry with the student's name carries a
    /// parseable `marketStart`.
    pub months_in_market: Option<u32>,
}

/// Whole calendar months from `start` to `today`, never negative.
pub fn months_between(start: NaiveDate, today: NaiveDate) -> u32 {
    let months = (today.year() - start.year()) * 12 + today.month() as i32 - start.month() as i32;
    months.max(0) as u32
}

fn stamp_millis(stamp: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(stamp)
        .ok()
        .map(|dt| dt.timestamp_millis())
}

/// Most recent record by its creation stamp (`submittedAt` for evaluations).
/// Unparseable stamps lose to any parseable one.
pub fn latest<'a, T: Identified>(records: &[&'a T]) -> Option<&'a T> {
    records
        .iter()
        .copied()
        .max_by_key(|r| stamp_millis(r.created_at()).unwrap_or(i64::MIN))
}

pub fn name_matches(name: &str, query: Option<&str>) -> bool {
    match query.map(str::trim) {
        None | Some("") => true,
        Some(q) => name.to_lowercase().contains(&q.to_lowercase()),
    }
}

pub fn student_rows(
    students: &[Student],
    evaluations: &[Evaluation],
    entries: &[ReportEntry],
    query: Option<&str>,
    today: NaiveDate,
) -> Vec<StudentReportRow> {
    students
        .iter()
        .filter(|s| name_matches(&s.name, query))
        .map(|s| {
            let own: Vec<&Evaluation> = evaluations
                .iter()
                .filter(|ev| ev.student_id == s.id)
                .collect();
            let last = latest(&own);
            let suggestion = compute_suggestion(last.map(|ev| &ev.answers));
            let months_in_market = entries
                .iter()
                .find(|e| e.name.to_lowercase() == s.name.to_lowercase())
                .and_then(|e| parse_when(&e.market_start))
                .map(|start| months_between(start.date(), today));
            StudentReportRow {
                student: s.clone(),
                evaluation_count: own.len(),
                last_evaluation: last.cloned(),
                suggestion,
                months_in_market,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{parse_all, RecordId};
    use crate::suggestion::SuggestionCode;
    use serde_json::json;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("date")
    }

    fn fixture() -> (Vec<Student>, Vec<Evaluation>, Vec<ReportEntry>) {
        let students = parse_all(&[
            json!({ "id": "s1", "name": "Ana Silva" }),
            json!({ "id": "s2", "name": "Bruno Costa" }),
        ]);
        let evaluations = parse_all(&[
            json!({ "id": 1, "studentId": "s1", "answers": { "0": "nao" },
                    "submittedAt": "2024-01-10T10:00:00.000Z" }),
            json!({ "id": 2, "studentId": "s1", "answers": { "0": "sim" },
                    "submittedAt": "2024-03-01T10:00:00.000Z" }),
            json!({ "id": 3, "studentId": "s1", "answers": { "0": "raras" },
                    "submittedAt": "2024-02-01T10:00:00.000Z" }),
        ]);
        let entries = parse_all(&[json!({ "id": 1, "name": "ana silva", "marketStart": "2019-06-01" })]);
        (students, evaluations, entries)
    }

    #[test]
    fn months_clamp_at_zero() {
        assert_eq!(months_between(day("2019-06-01"), day("2024-10-16")), 64);
        assert_eq!(months_between(day("2024-10-31"), day("2024-10-01")), 0);
        assert_eq!(months_between(day("2025-01-01"), day("2024-10-16")), 0);
    }

    #[test]
    fn rows_use_latest_evaluation() {
        let (students, evaluations, entries) = fixture();
        let rows = student_rows(&students, &evaluations, &entries, None, day("2024-10-16"));
        assert_eq!(rows.len(), 2);

        let ana = &rows[0];
        assert_eq!(ana.evaluation_count, 3);
        assert_eq!(ana.last_evaluation.as_ref().map(|e| &e.id), Some(&RecordId::Num(2)));
        assert_eq!(ana.suggestion.code, SuggestionCode::Ok);
        assert_eq!(ana.months_in_market, Some(64));

        let bruno = &rows[1];
        assert_eq!(bruno.evaluation_count, 0);
        assert!(bruno.last_evaluation.is_none());
        assert_eq!(bruno.suggestion.label, "Sem dados");
        assert_eq!(bruno.months_in_market, None);
    }

    #[test]
    fn query_is_case_insensitive_substring() {
        let (students, evaluations, entries) = fixture();
        let rows = student_rows(&students, &evaluations, &entries, Some(" COSTA "), day("2024-10-16"));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].student.name, "Bruno Costa");
        assert_eq!(
            student_rows(&students, &evaluations, &entries, Some(""), day("2024-10-16")).len(),
            2
        );
    }
}
