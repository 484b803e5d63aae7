use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use tracker_query::analytics::{GroupKey, GroupRow};
use tracker_query::{Predicate, SortSpec};
use tracker_types::models::{Application, ApplicationStatus};
use uuid::Uuid;

use crate::Database;
use crate::compile::{group_expr, order_by, where_clause};
use crate::models::{ApplicationRow, UserRow, format_ts, parse_ts};

const APPLICATION_COLUMNS: &str = "id, user_id, company_name, position, location, application_date, \
     status, application_type, source, job_link, resume_version, contact_person, contact_email, \
     notes, follow_up_date, interview_rounds, offer_stipend, offer_duration, offer_start_date, \
     created_at, updated_at";

impl Database {
    // -- Users --

    pub fn create_user(&self, id: Uuid, name: &str, email: &str, password_hash: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, name, email, password, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id.to_string(), name, email, password_hash, format_ts(Utc::now())],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email = ?1", email))
    }

    pub fn get_user_by_id(&self, id: Uuid) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", &id.to_string()))
    }

    // -- Applications --

    /// Insert the application and flag its owner as having created one, atomically.
    pub fn create_application(&self, app: &Application) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                &format!(
                    "INSERT INTO applications ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, \
                     ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)",
                    APPLICATION_COLUMNS
                ),
                params![
                    app.id.to_string(),
                    app.owner.to_string(),
                    app.company_name,
                    app.position,
                    app.location,
                    format_ts(app.application_date),
                    app.status.as_str(),
                    app.application_type.as_str(),
                    app.source,
                    app.job_link,
                    app.resume_version,
                    app.contact_person,
                    app.contact_email,
                    app.notes,
                    app.follow_up_date.map(format_ts),
                    serde_json::to_string(&app.interview_rounds)?,
                    app.offer_details.stipend,
                    app.offer_details.duration,
                    app.offer_details.start_date.map(format_ts),
                    format_ts(app.created_at),
                    format_ts(app.updated_at),
                ],
            )?;
            tx.execute(
                "UPDATE users SET has_application_created = 1 WHERE id = ?1",
                [app.owner.to_string()],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Overwrite every mutable column. The owner and creation time never change.
    /// Returns false when no row with this id belongs to the owner.
    pub fn update_application(&self, app: &Application) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE applications SET
                    company_name = ?3, position = ?4, location = ?5, application_date = ?6,
                    status = ?7, application_type = ?8, source = ?9, job_link = ?10,
                    resume_version = ?11, contact_person = ?12, contact_email = ?13, notes = ?14,
                    follow_up_date = ?15, interview_rounds = ?16, offer_stipend = ?17,
                    offer_duration = ?18, offer_start_date = ?19, updated_at = ?20
                 WHERE id = ?1 AND user_id = ?2",
                params![
                    app.id.to_string(),
                    app.owner.to_string(),
                    app.company_name,
                    app.position,
                    app.location,
                    format_ts(app.application_date),
                    app.status.as_str(),
                    app.application_type.as_str(),
                    app.source,
                    app.job_link,
                    app.resume_version,
                    app.contact_person,
                    app.contact_email,
                    app.notes,
                    app.follow_up_date.map(format_ts),
                    serde_json::to_string(&app.interview_rounds)?,
                    app.offer_details.stipend,
                    app.offer_details.duration,
                    app.offer_details.start_date.map(format_ts),
                    format_ts(app.updated_at),
                ],
            )?;
            Ok(changed == 1)
        })
    }

    pub fn get_application(&self, owner: Uuid, id: Uuid) -> Result<Option<Application>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!(
                        "SELECT {} FROM applications WHERE id = ?1 AND user_id = ?2",
                        APPLICATION_COLUMNS
                    ),
                    [id.to_string(), owner.to_string()],
                    application_row,
                )
                .optional()?;
            row.map(ApplicationRow::into_application).transpose()
        })
    }

    pub fn delete_application(&self, owner: Uuid, id: Uuid) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute(
                "DELETE FROM applications WHERE id = ?1 AND user_id = ?2",
                [id.to_string(), owner.to_string()],
            )?;
            Ok(deleted == 1)
        })
    }

    pub fn delete_all_applications(&self, owner: Uuid) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute("DELETE FROM applications WHERE user_id = ?1", [owner.to_string()])?;
            Ok(deleted)
        })
    }

    // -- Querying --

    /// One page of matching records plus the total number of matches.
    pub fn find(
        &self,
        predicate: &Predicate,
        sort: &SortSpec,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<Application>, u64)> {
        self.with_conn(|conn| {
            let filter = where_clause(predicate);
            let sql = format!(
                "SELECT {} FROM applications WHERE {} ORDER BY {} LIMIT ? OFFSET ?",
                APPLICATION_COLUMNS,
                filter.clause,
                order_by(sort)
            );

            let mut params = filter.params.clone();
            params.push(Value::Integer(clamp_i64(limit)));
            params.push(Value::Integer(clamp_i64(offset)));

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(params.iter()), application_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            let records = rows
                .into_iter()
                .map(ApplicationRow::into_application)
                .collect::<Result<Vec<_>>>()?;

            let total = count_matching(conn, predicate)?;
            Ok((records, total))
        })
    }

    pub fn count(&self, predicate: &Predicate) -> Result<u64> {
        self.with_conn(|conn| count_matching(conn, predicate))
    }

    /// Group the matching records by `key`. Groups come back in the order their
    /// first member was inserted.
    pub fn aggregate(&self, predicate: &Predicate, key: GroupKey) -> Result<Vec<GroupRow>> {
        self.with_conn(|conn| {
            let filter = where_clause(predicate);
            let sql = format!(
                "SELECT {} AS grp,
                        COUNT(*),
                        SUM(CASE WHEN status = ? THEN 1 ELSE 0 END),
                        MAX(application_date),
                        group_concat(status, '|')
                 FROM applications
                 WHERE {}
                 GROUP BY grp
                 ORDER BY MIN(rowid)",
                group_expr(key),
                filter.clause
            );

            let mut params = vec![Value::Text(ApplicationStatus::Accepted.as_str().into())];
            params.extend(filter.params);

            let mut stmt = conn.prepare(&sql)?;
            let raw = stmt
                .query_map(params_from_iter(params.iter()), |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            raw.into_iter()
                .map(|(key, count, accepted, latest, statuses)| -> Result<GroupRow> {
                    Ok(GroupRow {
                        key,
                        count: count as u64,
                        accepted: accepted as u64,
                        latest: latest.as_deref().map(parse_ts).transpose()?,
                        statuses: statuses
                            .map(|s| s.split('|').map(str::to_string).collect())
                            .unwrap_or_default(),
                    })
                })
                .collect()
        })
    }

    pub fn first_application_date(&self, owner: Uuid) -> Result<Option<DateTime<Utc>>> {
        self.with_conn(|conn| {
            let first: Option<String> = conn.query_row(
                "SELECT MIN(application_date) FROM applications WHERE user_id = ?1",
                [owner.to_string()],
                |row| row.get(0),
            )?;
            first.as_deref().map(parse_ts).transpose()
        })
    }
}

fn count_matching(conn: &Connection, predicate: &Predicate) -> Result<u64> {
    let filter = where_clause(predicate);
    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM applications WHERE {}", filter.clause),
        params_from_iter(filter.params.iter()),
        |row| row.get(0),
    )?;
    Ok(total as u64)
}

/// `condition` is one of the fixed lookups below, never client input.
fn query_user(conn: &Connection, condition: &'static str, value: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, name, email, password, has_application_created, created_at FROM users WHERE {}",
        condition
    ))?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                has_application_created: row.get(4)?,
                created_at: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn application_row(row: &Row<'_>) -> rusqlite::Result<ApplicationRow> {
    Ok(ApplicationRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        company_name: row.get(2)?,
        position: row.get(3)?,
        location: row.get(4)?,
        application_date: row.get(5)?,
        status: row.get(6)?,
        application_type: row.get(7)?,
        source: row.get(8)?,
        job_link: row.get(9)?,
        resume_version: row.get(10)?,
        contact_person: row.get(11)?,
        contact_email: row.get(12)?,
        notes: row.get(13)?,
        follow_up_date: row.get(14)?,
        interview_rounds: row.get(15)?,
        offer_stipend: row.get(16)?,
        offer_duration: row.get(17)?,
        offer_start_date: row.get(18)?,
        created_at: row.get(19)?,
        updated_at: row.get(20)?,
    })
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
