use crate::auth::{self, AuthError};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{client_failed, client_mut, now_iso, now_ms, validation_failed};
use crate::ipc::types::{AppState, Request};
use crate::validate;
use serde_json::{Map, Value};

fn auth_failed(req: &Request, e: AuthError) -> Value {
    match e {
        AuthError::InvalidCredentials => err(
            &req.id,
            "invalid_credentials",
            "Email ou senha inválidos",
            None,
        ),
        AuthError::EmailTaken => err(&req.id, "email_taken", "Email já cadastrado", None),
        AuthError::Client(e) => client_failed(req, e, "db_update_failed"),
        AuthError::Store(e) => err(&req.id, "db_update_failed", format!("{e:#}"), None),
    }
}

fn raw_str<'a>(params: &'a Value, key: &str) -> &'a str {
    params.get(key).and_then(Value::as_str).unwrap_or("")
}

fn handle_login(state: &mut AppState, req: &Request) -> Value {
    let email = raw_str(&req.params, "email");
    let password = raw_str(&req.params, "password");
    if email.trim().is_empty() || password.is_empty() {
        return err(&req.id, "bad_params", "email and password are required", None);
    }
    let client = match client_mut(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match auth::login(client, email, password, now_ms()) {
        Ok(session) => ok(&req.id, auth::session_json(&session)),
        Err(e) => auth_failed(req, e),
    }
}

fn handle_register(state: &mut AppState, req: &Request) -> Value {
    let Some(form) = req.params.as_object() else {
        return err(&req.id, "bad_params", "params must be an object", None);
    };
    let mut fields = Map::new();
    for key in ["name", "email", "password", "confirmPassword"] {
        if let Some(v) = form.get(key) {
            fields.insert(key.to_string(), v.clone());
        }
    }
    if let Err(problems) = validate::register(&fields) {
        return validation_failed(req, problems);
    }
    let client = match client_mut(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match auth::register(
        client,
        raw_str(&req.params, "name"),
        raw_str(&req.params, "email"),
        raw_str(&req.params, "password"),
        now_ms(),
        &now_iso(),
    ) {
        Ok(session) => ok(&req.id, auth::session_json(&session)),
        Err(e) => auth_failed(req, e),
    }
}

fn handle_logout(state: &mut AppState, req: &Request) -> Value {
    let client = match client_mut(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match auth::logout(client.store_mut()) {
        Ok(session) => ok(&req.id, auth::session_json(&session)),
        Err(e) => err(&req.id, "db_update_failed", format!("{e:#}"), None),
    }
}

fn handle_session(state: &mut AppState, req: &Request) -> Value {
    let client = match client_mut(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match auth::session(client.store()) {
        Ok(session) => ok(&req.id, auth::session_json(&session)),
        Err(e) => err(&req.id, "db_query_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.login" => Some(handle_login(state, req)),
        "auth.register" => Some(handle_register(state, req)),
        "auth.logout" => Some(handle_logout(state, req)),
        "auth.session" => Some(handle_session(state, req)),
        _ => None,
    }
}
