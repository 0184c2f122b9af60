use std::{
    env,
    sync::{LazyLock, Mutex},
};

use anyhow::{Result, bail};
use rusqlite::{Connection, types::Null};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::sync::broadcast::{Receiver, Sender, channel};

use crate::Settings;

const SETTINGS: &str = "settings";
const SEEDS: &str = "seeds";

static CONNECTION: LazyLock<Mutex<Connection>> = LazyLock::new(|| {
    let path = env::current_exe()
        .expect("current executable path")
        .parent()
        .expect("executable directory")
        .join("local.db");
    let conn = Connection::open(path).expect("failed to open local.db");
    create_tables(&conn).expect("failed to create tables");
    Mutex::new(conn)
});
static EVENT: LazyLock<Sender<DatabaseEvent>> = LazyLock::new(|| channel(5).0);

#[derive(Debug, Clone)]
pub enum DatabaseEvent {
    SettingsUpdated(Settings),
}

pub trait Identifiable {
    fn id(&self) -> Option<i64>;

    fn set_id(&mut self, id: i64);
}

#[macro_export]
macro_rules! impl_identifiable {
    ($type:ty) => {
        impl $crate::database::Identifiable for $type {
            fn id(&self) -> Option<i64> {
                self.id
            }

            fn set_id(&mut self, id: i64) {
                self.id = Some(id);
            }
        }
    };
}

/// The persisted seed so randomized timings stay consistent across runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Seeds {
    #[serde(skip_serializing, default)]
    pub id: Option<i64>,
    pub rng_seed: [u8; 32],
}

impl Default for Seeds {
    fn default() -> Self {
        Self {
            id: None,
            rng_seed: rand::random(),
        }
    }
}

impl_identifiable!(Seeds);

pub fn database_event_receiver() -> Receiver<DatabaseEvent> {
    EVENT.subscribe()
}

pub fn query_and_upsert_seeds() -> Result<Seeds> {
    let conn = CONNECTION.lock().expect("connection lock");
    let mut seeds = query_from_table::<Seeds>(&conn, SEEDS)?
        .into_iter()
        .next()
        .unwrap_or_default();
    upsert_to_table(&conn, SEEDS, &mut seeds)?;
    Ok(seeds)
}

/// Queries the stored settings, inserting the defaults on first run.
pub fn query_settings() -> Result<Settings> {
    let conn = CONNECTION.lock().expect("connection lock");
    query_or_insert_settings(&conn)
}

pub fn upsert_settings(settings: &mut Settings) -> Result<()> {
    let conn = CONNECTION.lock().expect("connection lock");
    upsert_to_table(&conn, SETTINGS, settings).inspect(|_| {
        let _ = EVENT.send(DatabaseEvent::SettingsUpdated(settings.clone()));
    })
}

fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {SETTINGS} (
            id INTEGER PRIMARY KEY,
            data TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS {SEEDS} (
            id INTEGER PRIMARY KEY,
            data TEXT NOT NULL
        );
        "#
    ))?;
    Ok(())
}

fn query_or_insert_settings(conn: &Connection) -> Result<Settings> {
    let mut settings = query_from_table::<Settings>(conn, SETTINGS)?
        .into_iter()
        .next()
        .unwrap_or_default();
    if settings.id.is_none() {
        upsert_to_table(conn, SETTINGS, &mut settings)?;
    }
    Ok(settings)
}

/// Reads every row of `table`, falling back to defaults for rows that no longer deserialize.
fn query_from_table<T>(conn: &Connection, table: &str) -> Result<Vec<T>>
where
    T: DeserializeOwned + Identifiable + Default,
{
    let mut stmt = conn.prepare(&format!("SELECT id, data FROM {table};"))?;
    let rows = stmt.query_map([], |row| {
        let id = row.get::<_, i64>(0)?;
        let data = row.get::<_, String>(1)?;
        let mut value = serde_json::from_str::<T>(&data).unwrap_or_default();
        value.set_id(id);
        Ok(value)
    })?;

    Ok(rows.filter_map(|row| row.ok()).collect())
}

fn upsert_to_table<T>(conn: &Connection, table: &str, data: &mut T) -> Result<()>
where
    T: Serialize + Identifiable,
{
    let json = serde_json::to_string(&data)?;
    let stmt = format!(
        "INSERT INTO {table} (id, data) VALUES (?1, ?2) ON CONFLICT (id) DO UPDATE SET data = ?2;",
    );
    match data.id() {
        Some(id) => {
            if conn.execute(&stmt, (id, &json))? > 0 {
                Ok(())
            } else {
                bail!("no row was updated")
            }
        }
        None => {
            if conn.execute(&stmt, (Null, &json))? > 0 {
                data.set_id(conn.last_insert_rowid());
                Ok(())
            } else {
                bail!("no row was inserted")
            }
        }
    }
}
