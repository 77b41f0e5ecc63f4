use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{AttendanceStamp, ParticipantId, ParticipantPatch, ParticipantRecord};
use crate::pool::Pool;
use crate::store::RecordStore;

const PARTICIPANT_COLUMNS: &str = "id, first_name_upper, last_name_upper, email, company, \
     designation, street, barangay, city, province_state, zip, cellphone, approved, rejected, \
     time_in, formatted_timein, time_out, formatted_timeout";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Postgres-backed record store, one table per pool.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn database_error(table: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |source| StoreError::Database { table, source }
}

fn stamp_from(at: Option<DateTime<Utc>>, display: Option<String>) -> Option<AttendanceStamp> {
    at.map(|at| AttendanceStamp {
        at,
        display: display.unwrap_or_default(),
    })
}

fn record_from_row(row: &PgRow) -> Result<ParticipantRecord, sqlx::Error> {
    Ok(ParticipantRecord {
        id: ParticipantId(row.try_get("id")?),
        first_name: row.try_get::<Option<String>, _>("first_name_upper")?.unwrap_or_default(),
        last_name: row.try_get::<Option<String>, _>("last_name_upper")?.unwrap_or_default(),
        email: row.try_get::<Option<String>, _>("email")?.unwrap_or_default(),
        company: row.try_get::<Option<String>, _>("company")?.unwrap_or_default(),
        designation: row.try_get::<Option<String>, _>("designation")?.unwrap_or_default(),
        street: row.try_get("street")?,
        barangay: row.try_get("barangay")?,
        city: row.try_get("city")?,
        province_state: row.try_get("province_state")?,
        zip: row.try_get("zip")?,
        cellphone: row.try_get("cellphone")?,
        approved: row.try_get("approved")?,
        rejected: row.try_get("rejected")?,
        time_in: stamp_from(row.try_get("time_in")?, row.try_get("formatted_timein")?),
        time_out: stamp_from(row.try_get("time_out")?, row.try_get("formatted_timeout")?),
    })
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn list(&self, pool: Pool) -> Result<Vec<ParticipantRecord>, StoreError> {
        let table = pool.table();
        let query = format!("SELECT {PARTICIPANT_COLUMNS} FROM {table} ORDER BY created_at, id");
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(database_error(table))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            records.push(record_from_row(row).map_err(database_error(table))?);
        }

        debug!(table, count = records.len(), "listed participants");
        Ok(records)
    }

    async fn update(
        &self,
        pool: Pool,
        id: &ParticipantId,
        patch: &ParticipantPatch,
    ) -> Result<(), StoreError> {
        let table = pool.table();
        let query = match patch {
            ParticipantPatch::Approve => format!("UPDATE {table} SET approved = TRUE WHERE id = $1"),
            ParticipantPatch::Reject => format!("UPDATE {table} SET rejected = TRUE WHERE id = $1"),
            ParticipantPatch::TimeIn(_) => format!(
                "UPDATE {table} SET time_in = $2, formatted_timein = $3 WHERE id = $1"
            ),
            ParticipantPatch::TimeOut(_) => format!(
                "UPDATE {table} SET time_out = $2, formatted_timeout = $3 WHERE id = $1"
            ),
        };

        let mut rows = sqlx::query(&query).bind(&id.0);
        if let ParticipantPatch::TimeIn(stamp) | ParticipantPatch::TimeOut(stamp) = patch {
            rows = rows.bind(stamp.at).bind(&stamp.display);
        }

        let result = rows.execute(&self.pool).await.map_err(|source| {
            let conflict = matches!(&source, sqlx::Error::Database(err) if err.is_check_violation());
            if conflict {
                StoreError::ReviewStateConflict {
                    table,
                    id: id.clone(),
                }
            } else {
                StoreError::Database { table, source }
            }
        })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                table,
                id: id.clone(),
            });
        }

        debug!(table, participant_id = %id, ?patch, "updated participant");
        Ok(())
    }
}

pub async fn insert_participant(
    pool: &PgPool,
    target: Pool,
    record: &ParticipantRecord,
) -> anyhow::Result<u64> {
    let query = format!(
        r#"
        INSERT INTO {table}
        (id, first_name_upper, last_name_upper, email, company, designation,
         street, barangay, city, province_state, zip, cellphone)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (id) DO NOTHING
        "#,
        table = target.table()
    );

    let result = sqlx::query(&query)
        .bind(&record.id.0)
        .bind(&record.first_name)
        .bind(&record.last_name)
        .bind(&record.email)
        .bind(&record.company)
        .bind(&record.designation)
        .bind(&record.street)
        .bind(&record.barangay)
        .bind(&record.city)
        .bind(&record.province_state)
        .bind(&record.zip)
        .bind(&record.cellphone)
        .execute(pool)
        .await
        .with_context(|| format!("failed to insert participant into {}", target.table()))?;

    Ok(result.rows_affected())
}

/// Sample registrants loaded into every pool by `seed`.
fn seed_registrants() -> anyhow::Result<Vec<ParticipantRecord>> {
    let registrants = [
        (
            "8b1e6c40-5f2a-4d17-9c3e-2a7f90d4b6e1",
            "ALMA",
            "REYES",
            "alma.reyes@acme.ph",
            "Acme Logistics",
            "Operations Lead",
            "Makati",
        ),
        (
            "c47a2e93-1b60-4f8d-a5c2-7e3d18f05b9a",
            "JOMAR",
            "BAUTISTA",
            "jomar.bautista@northwind.ph",
            "Northwind Freight",
            "Fleet Manager",
            "Pasig",
        ),
        (
            "5e90d3b7-8c14-4a62-b1f7-f06c2a4e8d35",
            "KRISTINE",
            "VILLANUEVA",
            "kristine.villanueva@harbor.ph",
            "Harbor Systems",
            "Procurement Officer",
            "Cebu City",
        ),
    ];

    registrants
        .iter()
        .map(
            |(id, first_name, last_name, email, company, designation, city)| -> anyhow::Result<ParticipantRecord> {
                Ok(ParticipantRecord {
                    id: ParticipantId(Uuid::parse_str(id)?.to_string()),
                    first_name: first_name.to_string(),
                    last_name: last_name.to_string(),
                    email: email.to_string(),
                    company: company.to_string(),
                    designation: designation.to_string(),
                    city: Some(city.to_string()),
                    ..Default::default()
                })
            },
        )
        .collect()
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let registrants = seed_registrants()?;
    for target in Pool::ALL {
        for record in &registrants {
            insert_participant(pool, target, record).await?;
        }
    }

    Ok(())
}

pub async fn import_csv(
    pool: &PgPool,
    target: Pool,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        id: Option<String>,
        first_name: String,
        last_name: String,
        email: String,
        company: String,
        designation: String,
        street: Option<String>,
        barangay: Option<String>,
        city: Option<String>,
        province_state: Option<String>,
        zip: Option<String>,
        cellphone: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let id = row
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let record = ParticipantRecord {
            id: ParticipantId(id),
            first_name: row.first_name.to_uppercase(),
            last_name: row.last_name.to_uppercase(),
            email: row.email,
            company: row.company,
            designation: row.designation,
            street: row.street,
            barangay: row.barangay,
            city: row.city,
            province_state: row.province_state,
            zip: row.zip,
            cellphone: row.cellphone,
            ..Default::default()
        };

        if insert_participant(pool, target, &record).await? > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Participant, ReviewState};
    use std::collections::HashSet;

    #[test]
    fn seed_registrants_start_pending_with_unique_ids() {
        let registrants = seed_registrants().unwrap();
        assert_eq!(registrants.len(), 3);

        let ids: HashSet<_> = registrants.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids.len(), registrants.len());
        for record in &registrants {
            assert!(Uuid::parse_str(&record.id.0).is_ok());
            let participant = Participant::stamp(record.clone(), Pool::Onsite17);
            assert_eq!(participant.review_state(), ReviewState::Pending);
            assert!(record.email.starts_with(&record.first_name.to_lowercase()));
        }
    }
}
