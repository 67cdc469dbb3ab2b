use rusqlite::Connection;

pub fn migrate(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS scan_logs (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            wallet          TEXT NOT NULL,
            chain           TEXT NOT NULL,
            approvals_found INTEGER NOT NULL,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_scan_logs_created ON scan_logs(created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_scan_logs_wallet ON scan_logs(wallet);
        ",
    )?;
    Ok(())
}
