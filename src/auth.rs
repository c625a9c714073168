use crate::client::{ClientError, DataClient};
use crate::records::{parse_all, Collection, RecordId, User, AUTH_STATE_KEY};
use crate::store::LocalStore;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("email already registered")]
    EmailTaken,

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// User as exposed in the session; the password never leaves the users list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: RecordId,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl From<&User> for SessionUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.clone(),
            name: u.name.clone(),
            email: u.email.clone(),
            role: u.role.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub user: Option<SessionUser>,
    #[serde(default)]
    pub is_authenticated: bool,
    #[serde(default)]
    pub token: Option<String>,
}

impl Session {
    fn signed_in(user: SessionUser, now_ms: i64) -> Self {
        let token = format!("fake-jwt-{}-{}", user.id, now_ms);
        Self {
            user: Some(user),
            is_authenticated: true,
            token: Some(token),
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Stored session, or a signed-out one when nothing (or garbage) is stored.
pub fn session(store: &LocalStore) -> anyhow::Result<Session> {
    let Some(raw) = store.read_object(AUTH_STATE_KEY)? else {
        return Ok(Session::default());
    };
    match serde_json::from_value(raw) {
        Ok(s) => Ok(s),
        Err(e) => {
            tracing::warn!("ignoring unreadable auth state: {}", e);
            Ok(Session::default())
        }
    }
}

fn store_session(store: &mut LocalStore, session: &Session) -> anyhow::Result<()> {
    store.write_object(AUTH_STATE_KEY, &serde_json::to_value(session)?)
}

pub fn login(
    client: &mut DataClient,
    email: &str,
    password: &str,
    now_ms: i64,
) -> Result<Session, AuthError> {
    let users = Collection::Users;
    let items = client.get(users.path(), users.cache_key())?;
    let wanted = normalize_email(email);
    let user = parse_all::<User>(&items)
        .into_iter()
        .find(|u| normalize_email(&u.email) == wanted && u.password == password)
        .ok_or(AuthError::InvalidCredentials)?;

    let session = Session::signed_in(SessionUser::from(&user), now_ms);
    store_session(client.store_mut(), &session)?;
    tracing::info!("signed in as user {}", user.id);
    Ok(session)
}

pub fn register(
    client: &mut DataClient,
    name: &str,
    email: &str,
    password: &str,
    now_ms: i64,
    created_at: &str,
) -> Result<Session, AuthError> {
    let users = Collection::Users;
    let email = normalize_email(email);
    match client.get(users.path(), users.cache_key()) {
        Ok(items) => {
            if parse_all::<User>(&items)
                .iter()
                .any(|u| normalize_email(&u.email) == email)
            {
                return Err(AuthError::EmailTaken);
            }
        }
        // Nothing to compare against; the create below still lands locally.
        Err(ClientError::Unavailable { .. }) => {
            tracing::warn!("user list unavailable; registering without duplicate check")
        }
        Err(e) => return Err(e.into()),
    }

    let mut record = Map::new();
    record.insert("id".into(), json!(now_ms));
    record.insert("name".into(), json!(name.trim()));
    record.insert("email".into(), json!(email));
    record.insert("password".into(), json!(password));
    record.insert("role".into(), json!("user"));
    record.insert("createdAt".into(), json!(created_at));
    let created = client.create(users.path(), record, users.cache_key());

    let user: User = serde_json::from_value(created).map_err(anyhow::Error::from)?;
    let session = Session::signed_in(SessionUser::from(&user), now_ms);
    store_session(client.store_mut(), &session)?;
    Ok(session)
}

pub fn logout(store: &mut LocalStore) -> anyhow::Result<Session> {
    store.remove(AUTH_STATE_KEY)?;
    Ok(Session::default())
}

/// Id of the signed-in user, if any.
pub fn current_user_id(store: &LocalStore) -> Option<RecordId> {
    match session(store) {
        Ok(s) if s.is_authenticated => s.user.map(|u| u.id),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!("failed to read session: {:#}", e);
            None
        }
    }
}

pub fn session_json(session: &Session) -> Value {
    serde_json::to_value(session).unwrap_or(Value::Null)
}
