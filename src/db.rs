use anyhow::Context;
use chrono::{NaiveDate, NaiveTime};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::expand::DateRange;
use crate::models::{
    weekday_from_index, weekday_index, AttendanceEvent, AttendanceStatus, Individual,
    RecurringBlock,
};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let individuals = vec![
        (
            Uuid::parse_str("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2")?,
            "Avery Lee",
            "Level 4",
            Some("A"),
        ),
        (
            Uuid::parse_str("0c22f1f1-9184-4fd4-9b21-28c68a6a89dc")?,
            "Jules Moreno",
            "Level 4",
            Some("B"),
        ),
        (
            Uuid::parse_str("d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2")?,
            "Kiara Patel",
            "Level 5",
            None,
        ),
    ];

    for (id, name, cohort, sub_group) in individuals {
        sqlx::query(
            r#"
            INSERT INTO squad_attendance.individuals (id, full_name, cohort, sub_group)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (full_name, cohort) DO UPDATE
            SET sub_group = EXCLUDED.sub_group
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(cohort)
        .bind(sub_group)
        .execute(pool)
        .await?;
    }

    let evening = |h, m| NaiveTime::from_hms_opt(h, m, 0).context("invalid time");
    let blocks = vec![
        ("Level 4", "A", None, 1, evening(17, 0)?, evening(18, 30)?, false),
        ("Level 4", "A", None, 3, evening(17, 0)?, evening(18, 30)?, false),
        ("Level 4", "B", None, 2, evening(17, 0)?, evening(18, 30)?, false),
        ("Level 4", "B", None, 4, evening(17, 0)?, evening(18, 30)?, false),
        ("Level 5", "A", Some("Squad"), 1, evening(18, 30)?, evening(20, 0)?, false),
        ("Level 5", "A", Some("Squad"), 5, evening(18, 30)?, evening(20, 0)?, false),
        ("Visiting Club", "A", Some("Lane share"), 6, evening(9, 0)?, evening(10, 30)?, true),
    ];

    for (cohort, sub_group, label, weekday, start, end, external) in blocks {
        sqlx::query(
            r#"
            INSERT INTO squad_attendance.practice_blocks
            (id, cohort, sub_group, label, weekday, start_time, end_time, is_external)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (cohort, sub_group, weekday) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(cohort)
        .bind(sub_group)
        .bind(label)
        .bind(weekday as i16)
        .bind(start)
        .bind(end)
        .bind(external)
        .execute(pool)
        .await?;
    }

    let marks = vec![
        ("Avery Lee", (2026, 2, 2), AttendanceStatus::Present),
        ("Avery Lee", (2026, 2, 4), AttendanceStatus::Absent),
        ("Avery Lee", (2026, 2, 9), AttendanceStatus::Absent),
        ("Avery Lee", (2026, 2, 11), AttendanceStatus::Absent),
        ("Jules Moreno", (2026, 2, 3), AttendanceStatus::Late),
        ("Jules Moreno", (2026, 2, 5), AttendanceStatus::Present),
        ("Kiara Patel", (2026, 2, 2), AttendanceStatus::LeftEarly),
    ];

    for (name, (y, m, d), status) in marks {
        let individual_id: Uuid =
            sqlx::query("SELECT id FROM squad_attendance.individuals WHERE full_name = $1")
                .bind(name)
                .fetch_one(pool)
                .await?
                .get("id");

        let event = AttendanceEvent {
            individual_id,
            date: NaiveDate::from_ymd_opt(y, m, d).context("invalid date")?,
            status,
            check_in: None,
            check_out: None,
            notes: None,
            recorded_at: None,
        };
        upsert_attendance(pool, &event).await?;
    }

    Ok(())
}

pub async fn fetch_roster(pool: &PgPool, cohort: Option<&str>) -> anyhow::Result<Vec<Individual>> {
    let mut query = String::from(
        "SELECT id, full_name, cohort, sub_group FROM squad_attendance.individuals",
    );
    if cohort.is_some() {
        query.push_str(" WHERE cohort = $1");
    }
    query.push_str(" ORDER BY cohort, full_name");

    let mut rows = sqlx::query(&query);
    if let Some(value) = cohort {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await.context("failed to load roster")?;
    Ok(records
        .into_iter()
        .map(|row| Individual {
            id: row.get("id"),
            name: row.get("full_name"),
            cohort: row.get("cohort"),
            sub_group: row.get("sub_group"),
        })
        .collect())
}

pub async fn fetch_blocks(pool: &PgPool) -> anyhow::Result<Vec<RecurringBlock>> {
    let records = sqlx::query(
        "SELECT id, cohort, sub_group, label, weekday, start_time, end_time, is_external \
         FROM squad_attendance.practice_blocks \
         ORDER BY weekday, start_time, cohort, sub_group",
    )
    .fetch_all(pool)
    .await
    .context("failed to load practice blocks")?;

    records.iter().map(block_from_row).collect()
}

fn block_from_row(row: &PgRow) -> anyhow::Result<RecurringBlock> {
    let id: Uuid = row.get("id");
    let weekday: i16 = row.get("weekday");
    Ok(RecurringBlock {
        id,
        cohort: row.get("cohort"),
        sub_group: row.get("sub_group"),
        label: row.get("label"),
        weekday: weekday_from_index(weekday)
            .with_context(|| format!("block {id} has invalid weekday {weekday}"))?,
        start: row.get("start_time"),
        end: row.get("end_time"),
        external: row.get("is_external"),
    })
}

pub async fn fetch_attendance(
    pool: &PgPool,
    range: &DateRange,
) -> anyhow::Result<Vec<AttendanceEvent>> {
    let records = sqlx::query(
        "SELECT individual_id, attendance_date, status, check_in, check_out, notes, recorded_at \
         FROM squad_attendance.attendance \
         WHERE attendance_date BETWEEN $1 AND $2 \
         ORDER BY recorded_at",
    )
    .bind(range.start)
    .bind(range.end)
    .fetch_all(pool)
    .await
    .context("failed to load attendance")?;

    let mut events = Vec::with_capacity(records.len());
    for row in records {
        let status: String = row.get("status");
        events.push(AttendanceEvent {
            individual_id: row.get("individual_id"),
            date: row.get("attendance_date"),
            status: status.parse::<AttendanceStatus>().map_err(anyhow::Error::msg)?,
            check_in: row.get("check_in"),
            check_out: row.get("check_out"),
            notes: row.get("notes"),
            recorded_at: row.get("recorded_at"),
        });
    }

    Ok(events)
}

/// Persists already-validated blocks; either all land or none do.
pub async fn insert_blocks(pool: &PgPool, blocks: &[RecurringBlock]) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;

    for block in blocks {
        sqlx::query(
            r#"
            INSERT INTO squad_attendance.practice_blocks
            (id, cohort, sub_group, label, weekday, start_time, end_time, is_external)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(block.id)
        .bind(&block.cohort)
        .bind(&block.sub_group)
        .bind(&block.label)
        .bind(weekday_index(block.weekday))
        .bind(block.start)
        .bind(block.end)
        .bind(block.external)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("failed to insert block for {}", block.cohort))?;
    }

    tx.commit().await?;
    Ok(())
}

pub async fn update_block(pool: &PgPool, block: &RecurringBlock) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE squad_attendance.practice_blocks
        SET cohort = $2, sub_group = $3, label = $4, weekday = $5,
            start_time = $6, end_time = $7, is_external = $8
        WHERE id = $1
        "#,
    )
    .bind(block.id)
    .bind(&block.cohort)
    .bind(&block.sub_group)
    .bind(&block.label)
    .bind(weekday_index(block.weekday))
    .bind(block.start)
    .bind(block.end)
    .bind(block.external)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_block(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM squad_attendance.practice_blocks WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Creates or corrects the mark for (individual, date).
pub async fn upsert_attendance(pool: &PgPool, event: &AttendanceEvent) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO squad_attendance.attendance
        (id, individual_id, attendance_date, status, check_in, check_out, notes, recorded_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, NOW()))
        ON CONFLICT (individual_id, attendance_date) DO UPDATE
        SET status = EXCLUDED.status,
            check_in = COALESCE(EXCLUDED.check_in, attendance.check_in),
            check_out = COALESCE(EXCLUDED.check_out, attendance.check_out),
            notes = COALESCE(EXCLUDED.notes, attendance.notes),
            recorded_at = EXCLUDED.recorded_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(event.individual_id)
    .bind(event.date)
    .bind(event.status.as_str())
    .bind(event.check_in)
    .bind(event.check_out)
    .bind(&event.notes)
    .bind(event.recorded_at)
    .execute(pool)
    .await
    .with_context(|| format!("failed to record attendance for {}", event.date))?;

    Ok(())
}

pub async fn import_attendance_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        full_name: String,
        cohort: String,
        sub_group: Option<String>,
        date: NaiveDate,
        status: String,
        notes: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut recorded = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let individual_id: Uuid = sqlx::query(
            r#"
            INSERT INTO squad_attendance.individuals
            (id, full_name, cohort, sub_group)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (full_name, cohort) DO UPDATE
            SET sub_group = COALESCE(EXCLUDED.sub_group, individuals.sub_group)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.full_name)
        .bind(&row.cohort)
        .bind(row.sub_group.as_deref().filter(|g| !g.trim().is_empty()))
        .fetch_one(pool)
        .await?
        .get("id");

        let status: AttendanceStatus = row
            .status
            .parse()
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("bad status for {} on {}", row.full_name, row.date))?;

        let event = AttendanceEvent {
            individual_id,
            date: row.date,
            status,
            check_in: None,
            check_out: None,
            notes: row.notes.filter(|n| !n.trim().is_empty()),
            recorded_at: None,
        };
        upsert_attendance(pool, &event).await?;
        recorded += 1;
    }

    Ok(recorded)
}
