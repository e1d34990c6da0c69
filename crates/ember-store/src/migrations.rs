use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS documents (
            path        TEXT PRIMARY KEY,
            collection  TEXT NOT NULL,
            data        TEXT NOT NULL,
            version     INTEGER NOT NULL DEFAULT 1,
            updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_documents_collection
            ON documents(collection);
        ",
    )?;

    info!("Document store migrations complete");
    Ok(())
}
