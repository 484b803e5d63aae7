use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (users, applications)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id                      TEXT PRIMARY KEY,
                name                    TEXT NOT NULL,
                email                   TEXT NOT NULL UNIQUE,
                password                TEXT NOT NULL,
                has_application_created INTEGER NOT NULL DEFAULT 0,
                created_at              TEXT NOT NULL
            );

            -- Timestamps are fixed-width RFC 3339 in UTC (millisecond precision),
            -- so text comparison orders them chronologically.
            CREATE TABLE applications (
                id                TEXT PRIMARY KEY,
                user_id           TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                company_name      TEXT NOT NULL,
                position          TEXT NOT NULL,
                location          TEXT NOT NULL,
                application_date  TEXT NOT NULL,
                status            TEXT NOT NULL DEFAULT 'Applied',
                application_type  TEXT NOT NULL,
                source            TEXT NOT NULL,
                job_link          TEXT NOT NULL DEFAULT '',
                resume_version    TEXT NOT NULL DEFAULT '',
                contact_person    TEXT NOT NULL DEFAULT '',
                contact_email     TEXT NOT NULL DEFAULT '',
                notes             TEXT NOT NULL DEFAULT '',
                follow_up_date    TEXT,
                interview_rounds  TEXT NOT NULL DEFAULT '[]',
                offer_stipend     TEXT NOT NULL DEFAULT '',
                offer_duration    TEXT NOT NULL DEFAULT '',
                offer_start_date  TEXT,
                created_at        TEXT NOT NULL,
                updated_at        TEXT NOT NULL
            );

            CREATE INDEX idx_applications_user_date
                ON applications(user_id, application_date);
            CREATE INDEX idx_applications_user_status
                ON applications(user_id, status);
            CREATE INDEX idx_applications_user_company
                ON applications(user_id, company_name);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
