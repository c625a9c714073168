use crate::client::{ClientError, DataClient};
use crate::records::{parse_all, Collection, Notification, RecordId};
use crate::reminders::{parse_when, weekly_view, WeeklyView};
use crate::validate::{self, FieldError};
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{json, Map, Value};

const NOTIFICATIONS: Collection = Collection::Notifications;

#[derive(Debug, Clone, Default)]
pub struct NewNotification {
    pub title: String,
    pub when: Option<String>,
    pub description: Option<String>,
}

/// `YYYY-MM-DD` of `when`, or of `today` when missing or unparseable.
pub fn normalize_when(when: Option<&str>, today: NaiveDate) -> String {
    when.and_then(parse_when)
        .map(|dt| dt.date())
        .unwrap_or(today)
        .format("%Y-%m-%d")
        .to_string()
}

pub fn add(
    client: &mut DataClient,
    new: NewNotification,
    now: NaiveDateTime,
    now_ms: i64,
    created_at: &str,
) -> Result<Value, Vec<FieldError>> {
    let mut record = Map::new();
    record.insert("id".into(), json!(now_ms));
    record.insert("title".into(), json!(new.title.trim()));
    record.insert(
        "when".into(),
        json!(normalize_when(new.when.as_deref(), now.date())),
    );
    record.insert("read".into(), json!(false));
    if let Some(d) = new.description.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        record.insert("description".into(), json!(d));
    }
    record.insert("createdAt".into(), json!(created_at));

    validate::notification(&record)?;
    Ok(client.create(NOTIFICATIONS.path(), record, NOTIFICATIONS.cache_key()))
}

fn current(client: &mut DataClient) -> Result<Vec<Value>, ClientError> {
    client.get(NOTIFICATIONS.path(), NOTIFICATIONS.cache_key())
}

/// Flips `read` on one notification. `Ok(None)` when the id is unknown.
pub fn toggle(client: &mut DataClient, id: &RecordId) -> Result<Option<Value>, ClientError> {
    let items = current(client)?;
    let Some(item) = items.iter().find(|n| id.matches(n)) else {
        return Ok(None);
    };
    let read = item.get("read").and_then(Value::as_bool).unwrap_or(false);

    let mut partial = Map::new();
    partial.insert("id".into(), id.to_value());
    partial.insert("read".into(), json!(!read));
    client
        .patch(NOTIFICATIONS.path(), partial, NOTIFICATIONS.cache_key())
        .map(Some)
}

/// Marks every unread notification read; returns how many changed.
pub fn mark_all_read(client: &mut DataClient) -> Result<usize, ClientError> {
    let unread: Vec<RecordId> = current(client)?
        .iter()
        .filter(|n| !n.get("read").and_then(Value::as_bool).unwrap_or(false))
        .filter_map(RecordId::of)
        .collect();
    for id in &unread {
        let mut partial = Map::new();
        partial.insert("id".into(), id.to_value());
        partial.insert("read".into(), json!(true));
        client.patch(NOTIFICATIONS.path(), partial, NOTIFICATIONS.cache_key())?;
    }
    Ok(unread.len())
}

/// Deletes every notification; returns how many were removed.
pub fn clear_all(client: &mut DataClient) -> Result<usize, ClientError> {
    let ids: Vec<RecordId> = current(client)?.iter().filter_map(RecordId::of).collect();
    for id in &ids {
        client.delete(NOTIFICATIONS.path(), id, NOTIFICATIONS.cache_key())?;
    }
    Ok(ids.len())
}

pub fn weekly(client: &mut DataClient, now: NaiveDateTime) -> Result<WeeklyView, ClientError> {
    let items: Vec<Notification> = parse_all(&current(client)?);
    Ok(weekly_view(&items, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::fake::FakeRemote;
    use crate::seed;
    use crate::store::LocalStore;
    use std::rc::Rc;

    fn client() -> DataClient {
        let mut store = LocalStore::in_memory().expect("store");
        seed::seed_if_empty(&mut store).expect("seed");
        DataClient::new(Box::new(Rc::new(FakeRemote::offline())), store)
    }

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").expect("datetime")
    }

    fn cached(client: &DataClient) -> Vec<Value> {
        client
            .store()
            .read_collection(NOTIFICATIONS.cache_key())
            .expect("read")
            .unwrap_or_default()
    }

    #[test]
    fn add_normalizes_date_and_prepends() {
        let mut c = client();
        let rec = add(
            &mut c,
            NewNotification {
                title: "Reunião de pais".into(),
                when: Some("not a date".into()),
                description: Some("  ".into()),
            },
            at("2024-10-16 10:00:00"),
            1_729_000_000_000,
            "2024-10-16T13:00:00.000Z",
        )
        .expect("add");
        assert_eq!(rec["when"], json!("2024-10-16"));
        assert_eq!(rec["id"], json!(1_729_000_000_000_i64));
        assert_eq!(rec["read"], json!(false));
        assert!(rec.get("description").is_none());
        assert_eq!(cached(&c)[0], rec);
        assert_eq!(cached(&c).len(), 4);
    }

    #[test]
    fn adds_in_the_same_millisecond_get_distinct_ids() {
        let mut c = client();
        let new = |title: &str| NewNotification {
            title: title.into(),
            when: Some("2024-10-18".into()),
            description: None,
        };
        let now = at("2024-10-16 10:00:00");
        let first = add(&mut c, new("Entrega de relatório"), now, 5, "t").expect("first");
        let second = add(&mut c, new("Visita à empresa"), now, 5, "t").expect("second");
        assert_eq!(first["id"], json!(5));
        assert_ne!(second["id"], first["id"]);

        let with_five = |c: &DataClient| {
            cached(c)
                .iter()
                .filter(|n| RecordId::Num(5).matches(n))
                .count()
        };
        assert_eq!(with_five(&c), 1);

        toggle(&mut c, &RecordId::Num(5)).expect("toggle").expect("found");
        let read: Vec<Value> = cached(&c)
            .into_iter()
            .filter(|n| n["read"] == json!(true))
            .collect();
        // Fixture id 3 was already read; only the first add flipped.
        assert_eq!(read.len(), 2);
        assert_eq!(with_five(&c), 1);
    }

    #[test]
    fn add_rejects_short_title() {
        let mut c = client();
        let errs = add(
            &mut c,
            NewNotification {
                title: "ok".into(),
                ..NewNotification::default()
            },
            at("2024-10-16 10:00:00"),
            1,
            "t",
        )
        .expect_err("short title");
        assert_eq!(errs[0].field, "title");
        assert_eq!(cached(&c).len(), 3);
    }

    #[test]
    fn toggle_flips_and_unknown_is_none() {
        let mut c = client();
        let out = toggle(&mut c, &RecordId::Num(3)).expect("toggle").expect("found");
        assert_eq!(out["read"], json!(false));
        let out = toggle(&mut c, &RecordId::Num(3)).expect("toggle").expect("found");
        assert_eq!(out["read"], json!(true));
        assert!(toggle(&mut c, &RecordId::Num(404)).expect("toggle").is_none());
    }

    #[test]
    fn mark_all_then_clear() {
        let mut c = client();
        assert_eq!(mark_all_read(&mut c).expect("mark"), 2);
        assert!(cached(&c).iter().all(|n| n["read"] == json!(true)));
        assert_eq!(mark_all_read(&mut c).expect("mark again"), 0);

        assert_eq!(clear_all(&mut c).expect("clear"), 3);
        assert!(cached(&c).is_empty());
    }

    #[test]
    fn weekly_uses_cached_fixture() {
        let mut c = client();
        // Week of Monday 2024-10-14: fixture reminders on the 15th and 20th.
        let view = weekly(&mut c, at("2024-10-16 09:00:00")).expect("weekly");
        assert_eq!(view.this_week.len(), 2);
        assert!(view.upcoming.is_empty());

        let later = weekly(&mut c, at("2025-01-08 09:00:00")).expect("weekly");
        assert!(later.this_week.is_empty());
        assert_eq!(later.upcoming.len(), 3);
        assert_eq!(later.upcoming[0].when, "2024-10-15");
    }
}
