use crate::records::{Collection, Record};
use crate::store::LocalStore;
use anyhow::{anyhow, Context};
use serde_json::Value;

const FIXTURE: &str = include_str!("../fixtures/db.json");

fn fixture() -> anyhow::Result<Value> {
    serde_json::from_str(FIXTURE).context("embedded fixture is not valid JSON")
}

fn fixture_items(fixture: &Value, collection: Collection) -> anyhow::Result<&[Value]> {
    let items = fixture
        .get(collection.name())
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or_else(|| anyhow!("fixture has no {} array", collection.name()))?;
    for item in items {
        Record::parse(collection, item).with_context(|| {
            format!("fixture {} entry does not fit its record shape", collection.name())
        })?;
    }
    Ok(items)
}

/// Writes every fixture collection whose cache key is absent. Returns the
/// names of the collections that were seeded.
pub fn seed_if_empty(store: &mut LocalStore) -> anyhow::Result<Vec<&'static str>> {
    let fixture = fixture()?;
    let mut seeded = Vec::new();
    for collection in Collection::ALL {
        if store.contains(collection.cache_key())? {
            continue;
        }
        store.write_collection(collection.cache_key(), fixture_items(&fixture, collection)?)?;
        seeded.push(collection.name());
    }
    if !seeded.is_empty() {
        tracing::info!("seeded {} collection(s): {}", seeded.len(), seeded.join(", "));
    }
    Ok(seeded)
}

/// Overwrites every collection with the fixture.
pub fn reset(store: &mut LocalStore) -> anyhow::Result<usize> {
    let fixture = fixture()?;
    for collection in Collection::ALL {
        store.write_collection(collection.cache_key(), fixture_items(&fixture, collection)?)?;
    }
    tracing::info!("workspace cache reset to fixture");
    Ok(Collection::ALL.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{parse_all, Student, User};
    use serde_json::json;

    #[test]
    fn fixture_covers_every_collection() {
        let f = fixture().expect("fixture");
        for c in Collection::ALL {
            assert!(fixture_items(&f, c).is_ok(), "missing {}", c.name());
        }
        let users: Vec<User> = parse_all(fixture_items(&f, Collection::Users).expect("users"));
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].email, "admin@ong.com");
        let students: Vec<Student> =
            parse_all(fixture_items(&f, Collection::Students).expect("students"));
        assert_eq!(students.len(), 3);
    }

    #[test]
    fn seed_leaves_existing_keys_alone() {
        let mut store = LocalStore::in_memory().expect("store");
        let mine = vec![json!({ "id": "x", "name": "Local" })];
        store
            .write_collection(Collection::Students.cache_key(), &mine)
            .expect("write");

        let seeded = seed_if_empty(&mut store).expect("seed");
        assert_eq!(seeded.len(), Collection::ALL.len() - 1);
        assert!(!seeded.contains(&"students"));
        assert_eq!(
            store
                .read_collection(Collection::Students.cache_key())
                .expect("read"),
            Some(mine)
        );

        assert!(seed_if_empty(&mut store).expect("again").is_empty());
    }

    #[test]
    fn reset_overwrites_local_changes() {
        let mut store = LocalStore::in_memory().expect("store");
        store
            .write_collection(Collection::Notifications.cache_key(), &[])
            .expect("write");
        reset(&mut store).expect("reset");
        let items = store
            .read_collection(Collection::Notifications.cache_key())
            .expect("read")
            .unwrap_or_default();
        assert_eq!(items.len(), 3);
    }
}
