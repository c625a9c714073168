use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Record identifier. The mock backend and the seed fixture mix numeric
/// timestamps and strings, and equality is strict: `1` and `"1"` differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Num(i64),
    Text(String),
}

impl RecordId {
    pub fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Number(n) => n.as_i64().map(RecordId::Num),
            Value::String(s) if !s.is_empty() => Some(RecordId::Text(s.clone())),
            _ => None,
        }
    }

    /// Reads the `id` field of a JSON record.
    pub fn of(record: &Value) -> Option<Self> {
        record.get("id").and_then(Self::from_value)
    }

    pub fn to_value(&self) -> Value {
        match self {
            RecordId::Num(n) => Value::from(*n),
            RecordId::Text(s) => Value::String(s.clone()),
        }
    }

    pub fn matches(&self, record: &Value) -> bool {
        Self::of(record).as_ref() == Some(self)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Num(n) => write!(f, "{}", n),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

pub trait Identified {
    fn id(&self) -> &RecordId;
    fn created_at(&self) -> &str;
}

/// Answer sheet of an evaluation: question index (as string) to category token.
/// Values stay raw JSON so unrecognized tokens survive a round trip.
pub type Answers = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: RecordId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpf: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pcd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descricao: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub id: RecordId,
    pub student_id: RecordId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    #[serde(default)]
    pub answers: Answers,
    #[serde(default)]
    pub submitted_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluated_by: Option<RecordId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardingRecord {
    pub id: RecordId,
    pub aluno: String,
    pub data_admissao: String,
    pub empresa: String,
    pub funcao: String,
    #[serde(rename = "contatoRH")]
    pub contato_rh: String,
    #[serde(default)]
    pub data_desligamento: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalControlRecord {
    pub id: RecordId,
    pub aluno: String,
    pub ingresso: String,
    pub primeira_avaliacao: String,
    pub segunda_avaliacao: String,
    pub primeira_entrevista: String,
    pub segunda_entrevista: String,
    pub resultado: String,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: RecordId,
    pub title: String,
    pub when: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: RecordId,
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub created_at: String,
}

fn default_role() -> String {
    "user".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub evaluations: u32,
    #[serde(default)]
    pub market_start: String,
    #[serde(default)]
    pub last_evaluation: String,
    #[serde(default)]
    pub last_answers: Answers,
}

macro_rules! identified {
    ($t:ty, $created:ident) => {
        impl Identified for $t {
            fn id(&self) -> &RecordId {
                &self.id
            }
            fn created_at(&self) -> &str {
                &self.$created
            }
        }
    };
}

identified!(Student, created_at);
identified!(Evaluation, submitted_at);
identified!(ForwardingRecord, created_at);
identified!(InternalControlRecord, created_at);
identified!(Notification, created_at);
identified!(User, created_at);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "record", rename_all = "camelCase")]
pub enum Record {
    Student(Student),
    Evaluation(Evaluation),
    Forwarding(ForwardingRecord),
    InternalControl(InternalControlRecord),
    Notification(Notification),
}

impl Record {
    /// Parses a JSON record of the given collection. Collections without a
    /// tagged variant (users, reports) yield `Ok(None)`.
    pub fn parse(collection: Collection, v: &Value) -> Result<Option<Self>, serde_json::Error> {
        let rec = match collection {
            Collection::Students => Record::Student(serde_json::from_value(v.clone())?),
            Collection::Evaluations => Record::Evaluation(serde_json::from_value(v.clone())?),
            Collection::Forwarding => Record::Forwarding(serde_json::from_value(v.clone())?),
            Collection::InternalControl => {
                Record::InternalControl(serde_json::from_value(v.clone())?)
            }
            Collection::Notifications => {
                Record::Notification(serde_json::from_value(v.clone())?)
            }
            Collection::Reports | Collection::Users => return Ok(None),
        };
        Ok(Some(rec))
    }
}

impl Identified for Record {
    fn id(&self) -> &RecordId {
        match self {
            Record::Student(r) => r.id(),
            Record::Evaluation(r) => r.id(),
            Record::Forwarding(r) => r.id(),
            Record::InternalControl(r) => r.id(),
            Record::Notification(r) => r.id(),
        }
    }

    fn created_at(&self) -> &str {
        match self {
            Record::Student(r) => r.created_at(),
            Record::Evaluation(r) => r.created_at(),
            Record::Forwarding(r) => r.created_at(),
            Record::InternalControl(r) => r.created_at(),
            Record::Notification(r) => r.created_at(),
        }
    }
}

pub const AUTH_STATE_KEY: &str = "auth-state-v1";
pub const EVALUATION_DRAFT_KEY: &str = "avaliacao-draft-v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Students,
    Evaluations,
    Forwarding,
    InternalControl,
    Notifications,
    Reports,
    Users,
}

impl Collection {
    pub const ALL: [Collection; 7] = [
        Collection::Users,
        Collection::Students,
        Collection::Evaluations,
        Collection::Forwarding,
        Collection::InternalControl,
        Collection::Notifications,
        Collection::Reports,
    ];

    /// Name used both as the IPC method prefix and as the fixture key.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "students" => Some(Self::Students),
            "evaluations" => Some(Self::Evaluations),
            "forwarding" => Some(Self::Forwarding),
            "internalControl" => Some(Self::InternalControl),
            "notifications" => Some(Self::Notifications),
            "reports" => Some(Self::Reports),
            "users" => Some(Self::Users),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Students => "students",
            Self::Evaluations => "evaluations",
            Self::Forwarding => "forwarding",
            Self::InternalControl => "internalControl",
            Self::Notifications => "notifications",
            Self::Reports => "reports",
            Self::Users => "users",
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Self::Students => "/students",
            Self::Evaluations => "/evaluations",
            Self::Forwarding => "/forwarding",
            Self::InternalControl => "/internalControl",
            Self::Notifications => "/notifications",
            Self::Reports => "/reports",
            Self::Users => "/users",
        }
    }

    pub fn cache_key(self) -> &'static str {
        match self {
            Self::Students => "alunos-cadastrados-v1",
            Self::Evaluations => "avaliacoes-v1",
            Self::Forwarding => "encaminhamento-v1",
            Self::InternalControl => "controle-interno-v1",
            Self::Notifications => "notificacoes-v1",
            Self::Reports => "relatorios-v1",
            Self::Users => "users-v1",
        }
    }
}

/// Parses every item of a cached collection, skipping entries that do not fit
/// the shape. Malformed historical entries should not hide the rest.
pub fn parse_all<T: serde::de::DeserializeOwned>(items: &[Value]) -> Vec<T> {
    items
        .iter()
        .filter_map(|v| serde_json::from_value(v.clone()).ok())
        .collect()
}

/// Shallow object merge: keys of `patch` overwrite keys of `base`.
pub fn merge_into(base: &mut Value, patch: &Map<String, Value>) {
    if let Value::Object(obj) = base {
        for (k, v) in patch {
            obj.insert(k.clone(), v.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_id_equality_is_strict() {
        let num = RecordId::of(&json!({ "id": 1 })).expect("num id");
        let text = RecordId::of(&json!({ "id": "1" })).expect("text id");
        assert_ne!(num, text);
        assert!(num.matches(&json!({ "id": 1, "name": "x" })));
        assert!(!num.matches(&json!({ "id": "1" })));
        assert_eq!(RecordId::of(&json!({ "id": "" })), None);
        assert_eq!(RecordId::of(&json!({ "name": "no id" })), None);
    }

    #[test]
    fn fixture_shaped_records_parse_into_variants() {
        let ev = json!({
            "id": 2,
            "studentId": "1729876543211",
            "studentName": "Pedro Henrique Oliveira",
            "answers": { "0": "maioria", "1": "sim" },
            "submittedAt": "2024-09-15T11:20:00.000Z",
            "evaluatedBy": 1
        });
        let rec = Record::parse(Collection::Evaluations, &ev)
            .expect("parse")
            .expect("variant");
        assert!(matches!(rec, Record::Evaluation(_)));
        assert_eq!(rec.id(), &RecordId::Num(2));
        assert_eq!(rec.created_at(), "2024-09-15T11:20:00.000Z");

        let fwd = json!({
            "id": 1,
            "aluno": "Ana",
            "dataAdmissao": "2024-01-15",
            "empresa": "Tech",
            "funcao": "Aprendiz",
            "contatoRH": "rh@tech.com",
            "dataDesligamento": "",
            "createdAt": "2024-01-20T10:00:00.000Z"
        });
        match Record::parse(Collection::Forwarding, &fwd).expect("parse") {
            Some(Record::Forwarding(r)) => assert_eq!(r.contato_rh, "rh@tech.com"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(Record::parse(Collection::Users, &json!({}))
            .expect("users")
            .is_none());
    }

    #[test]
    fn collection_names_roundtrip() {
        for c in Collection::ALL {
            assert_eq!(Collection::parse(c.name()), Some(c));
            assert!(c.path().starts_with('/'));
        }
    }

    #[test]
    fn merge_is_shallow() {
        let mut base = json!({ "id": 1, "read": false, "title": "a" });
        let patch = json!({ "read": true }).as_object().cloned().expect("obj");
        merge_into(&mut base, &patch);
        assert_eq!(base, json!({ "id": 1, "read": true, "title": "a" }));
    }
}
