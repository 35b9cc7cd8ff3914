mod models;

pub use models::*;

use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use std::sync::Arc;

pub type DbPool = Arc<PgPool>;

pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(Arc::new(pool))
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

// One submission per team: a second submission replaces the first.
pub async fn upsert_submission(
    pool: &PgPool,
    submission: &NewSubmission,
) -> Result<Submission, sqlx::Error> {
    sqlx::query_as::<_, Submission>(
        r#"
        INSERT INTO submissions (team_id, team_name, topic, notes, file_id, file_name, file_size, submitted_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
        ON CONFLICT (team_id) DO UPDATE
        SET topic = EXCLUDED.topic,
            notes = EXCLUDED.notes,
            file_id = EXCLUDED.file_id,
            file_name = EXCLUDED.file_name,
            file_size = EXCLUDED.file_size,
            submitted_at = NOW()
        RETURNING *
        "#,
    )
    .bind(&submission.team_id)
    .bind(&submission.team_name)
    .bind(&submission.topic)
    .bind(&submission.notes)
    .bind(&submission.file_id)
    .bind(&submission.file_name)
    .bind(submission.file_size)
    .fetch_one(pool)
    .await
}

pub async fn list_submissions(pool: &PgPool) -> Result<Vec<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>("SELECT * FROM submissions ORDER BY submitted_at DESC")
        .fetch_all(pool)
        .await
}

// Returns the removed row, or `None` when the team had not submitted.
pub async fn delete_submission(
    pool: &PgPool,
    team_id: &str,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>("DELETE FROM submissions WHERE team_id = $1 RETURNING *")
        .bind(team_id)
        .fetch_optional(pool)
        .await
}

// Returns `None` when a team with this id already exists.
pub async fn create_team(pool: &PgPool, team: &Team) -> Result<Option<Team>, sqlx::Error> {
    let row = sqlx::query_as::<_, TeamRow>(
        r#"
        INSERT INTO teams (team_id, name, members)
        VALUES ($1, $2, $3)
        ON CONFLICT (team_id) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(&team.team_id)
    .bind(&team.name)
    .bind(&team.members)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Team::from))
}

pub async fn get_team(pool: &PgPool, team_id: &str) -> Result<Option<Team>, sqlx::Error> {
    let row = sqlx::query_as::<_, TeamRow>("SELECT * FROM teams WHERE team_id = $1")
        .bind(team_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(Team::from))
}

pub async fn list_teams(pool: &PgPool) -> Result<Vec<Team>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TeamRow>("SELECT * FROM teams ORDER BY score_final DESC")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(Team::from).collect())
}

// Plain overwrite with no version check: two judges saving the same team at once
// race, and the later write wins.
pub async fn save_team_score(pool: &PgPool, team: &Team) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE teams
        SET score_bgk = $2, score_ai = $3, score_final = $4, scored_by = $5, updated_at = $6
        WHERE team_id = $1
        "#,
    )
    .bind(&team.team_id)
    .bind(to_db_int(team.score.bgk))
    .bind(to_db_int(team.score.ai))
    .bind(to_db_int(team.score.final_score))
    .bind(Json(&team.scored_by))
    .bind(team.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

fn to_db_int(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
