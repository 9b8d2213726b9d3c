//! Shared fixtures for repository tests.

use tempfile::TempDir;

use crate::repository::catalog::new_title;
use crate::{Database, DbConfig};
use reel_core::{MediaCopy, MediaFormat, Title};

pub struct TestStore {
    pub db: Database,
    pub format: MediaFormat,
    pub title: Title,
    pub copy: MediaCopy,
}

/// In-memory store with a $2.00/day DVD format, one title and one copy.
pub async fn store_with_copy() -> TestStore {
    stock(Database::new(DbConfig::in_memory()).await.unwrap()).await
}

/// Same stock in a database file under `dir`, behind a five-connection pool.
pub async fn file_store_with_copy(dir: &TempDir) -> TestStore {
    let config = DbConfig::new(dir.path().join("reel.db")).max_connections(5);
    stock(Database::new(config).await.unwrap()).await
}

async fn stock(db: Database) -> TestStore {
    let format = db.catalog().insert_format("DVD", 200).await.unwrap();
    let title = new_title("Stalker", "Drama", "Andrei Tarkovsky", 1979);
    db.catalog().insert_title(&title).await.unwrap();
    let copy = db
        .catalog()
        .insert_copy(&title.id, &format.id, Some("STK-001"), "Good")
        .await
        .unwrap();

    TestStore {
        db,
        format,
        title,
        copy,
    }
}

/// Another copy of the fixture title.
pub async fn extra_copy(store: &TestStore) -> MediaCopy {
    store
        .db
        .catalog()
        .insert_copy(&store.title.id, &store.format.id, None, "Good")
        .await
        .unwrap()
}
