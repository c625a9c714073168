//! In-progress evaluation form and its submission.

use crate::auth;
use crate::client::DataClient;
use crate::records::{Answers, Collection, RecordId, EVALUATION_DRAFT_KEY};
use crate::store::LocalStore;
use crate::suggestion::{compute_suggestion, Suggestion};
use crate::validate::FieldError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    #[serde(default)]
    pub answers: Answers,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub selected_student: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Partial draft update. Each present field is applied on top of the stored
/// draft; `answer` sets one question without touching the others.
#[derive(Debug, Clone, Default)]
pub struct DraftUpdate {
    pub answer: Option<(String, Value)>,
    pub page: Option<u32>,
    pub selected_student: Option<String>,
}

pub fn load(store: &LocalStore) -> anyhow::Result<Draft> {
    let Some(raw) = store.read_object(EVALUATION_DRAFT_KEY)? else {
        return Ok(Draft::default());
    };
    match serde_json::from_value(raw) {
        Ok(d) => Ok(d),
        Err(e) => {
            tracing::warn!("discarding unreadable evaluation draft: {}", e);
            Ok(Draft::default())
        }
    }
}

pub fn save(store: &mut LocalStore, update: DraftUpdate, now: &str) -> anyhow::Result<Draft> {
    let mut draft = load(store)?;
    if let Some((index, value)) = update.answer {
        draft.answers.insert(index, value);
    }
    if let Some(page) = update.page {
        draft.page = page;
    }
    if let Some(student) = update.selected_student {
        draft.selected_student = student;
    }
    draft.updated_at = Some(now.to_string());
    store.write_object(EVALUATION_DRAFT_KEY, &serde_json::to_value(&draft)?)?;
    Ok(draft)
}

pub fn clear(store: &mut LocalStore) -> anyhow::Result<()> {
    store.remove(EVALUATION_DRAFT_KEY)
}

/// Values given with the submit call; anything missing is taken from the draft.
#[derive(Debug, Clone, Default)]
pub struct SubmitRequest {
    pub student_id: Option<RecordId>,
    pub student_name: Option<String>,
    pub answers: Option<Answers>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Submitted {
    pub evaluation: Value,
    pub suggestion: Suggestion,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("evaluation is incomplete")]
    Invalid(Vec<FieldError>),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

fn cached_student_name(store: &LocalStore, id: &RecordId) -> Option<String> {
    let items = match store.read_collection(Collection::Students.cache_key()) {
        Ok(items) => items?,
        Err(e) => {
            tracing::warn!("cannot look up student name: {:#}", e);
            return None;
        }
    };
    items
        .iter()
        .find(|s| id.matches(s))
        .and_then(|s| s.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Creates the evaluation through the client, then drops the draft. The
/// draft is kept when the request does not validate.
pub fn submit(
    client: &mut DataClient,
    req: SubmitRequest,
    submitted_at: &str,
) -> Result<Submitted, SubmitError> {
    let draft = load(client.store())?;

    let student_id = req.student_id.or_else(|| {
        let selected = draft.selected_student.trim();
        (!selected.is_empty()).then(|| RecordId::Text(selected.to_string()))
    });
    let answers = req.answers.unwrap_or(draft.answers);

    let mut problems = Vec::new();
    if student_id.is_none() {
        problems.push(FieldError {
            field: "studentId".into(),
            message: "Selecione um aluno".into(),
        });
    }
    if answers.is_empty() {
        problems.push(FieldError {
            field: "answers".into(),
            message: "Responda ao menos uma pergunta".into(),
        });
    }
    let Some(student_id) = student_id.filter(|_| problems.is_empty()) else {
        return Err(SubmitError::Invalid(problems));
    };

    let student_name = req
        .student_name
        .or_else(|| cached_student_name(client.store(), &student_id));

    let mut record = Map::new();
    record.insert("studentId".into(), student_id.to_value());
    if let Some(name) = student_name {
        record.insert("studentName".into(), json!(name));
    }
    record.insert("answers".into(), serde_json::to_value(&answers).map_err(anyhow::Error::from)?);
    record.insert("submittedAt".into(), json!(submitted_at));
    if let Some(by) = auth::current_user_id(client.store()) {
        record.insert("evaluatedBy".into(), by.to_value());
    }

    let evaluations = Collection::Evaluations;
    let evaluation = client.create(evaluations.path(), record, evaluations.cache_key());
    clear(client.store_mut())?;

    Ok(Submitted {
        evaluation,
        suggestion: compute_suggestion(Some(&answers)),
    })
}
