use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Document record: source PDF, generated audio, display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Pdf {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub pdf_link: String,
    pub audio_link: String,
    pub pdf_name: String,
    #[serde(rename = "createdAt", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(rename = "updatedAt", with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Insert a document and add it to the owner's set, in one transaction.
/// An owner id with no user row gets the document without a reference.
pub async fn create_for_owner(
    db: &PgPool,
    owner_id: Uuid,
    pdf_link: &str,
    audio_link: &str,
    pdf_name: &str,
) -> anyhow::Result<Pdf> {
    let mut tx = db.begin().await.context("begin tx")?;

    let pdf = sqlx::query_as::<_, Pdf>(
        r#"
        INSERT INTO pdfs (pdf_link, audio_link, pdf_name)
        VALUES ($1, $2, $3)
        RETURNING id, pdf_link, audio_link, pdf_name, created_at, updated_at
        "#,
    )
    .bind(pdf_link)
    .bind(audio_link)
    .bind(pdf_name)
    .fetch_one(&mut *tx)
    .await
    .context("insert pdf")?;

    let linked = sqlx::query(
        r#"
        INSERT INTO user_pdfs (user_id, pdf_id)
        SELECT id, $2 FROM users WHERE id = $1
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(owner_id)
    .bind(pdf.id)
    .execute(&mut *tx)
    .await
    .context("link pdf to user")?
    .rows_affected();
    if linked == 0 {
        tracing::warn!(%owner_id, pdf_id = %pdf.id, "owner missing; pdf not added to any set");
    }

    tx.commit().await.context("commit tx")?;
    Ok(pdf)
}

/// Replace both links, and the name when given. `None` if the id is unknown.
pub async fn update_links(
    db: &PgPool,
    pdf_id: Uuid,
    pdf_link: &str,
    audio_link: &str,
    pdf_name: Option<&str>,
) -> anyhow::Result<Option<Pdf>> {
    let pdf = sqlx::query_as::<_, Pdf>(
        r#"
        UPDATE pdfs
           SET pdf_link = $2,
               audio_link = $3,
               pdf_name = COALESCE($4, pdf_name),
               updated_at = now()
         WHERE id = $1
        RETURNING id, pdf_link, audio_link, pdf_name, created_at, updated_at
        "#,
    )
    .bind(pdf_id)
    .bind(pdf_link)
    .bind(audio_link)
    .bind(pdf_name)
    .fetch_optional(db)
    .await
    .context("update pdf")?;
    Ok(pdf)
}

pub async fn find_by_id(db: &PgPool, pdf_id: Uuid) -> anyhow::Result<Option<Pdf>> {
    let pdf = sqlx::query_as::<_, Pdf>(
        r#"
        SELECT id, pdf_link, audio_link, pdf_name, created_at, updated_at
          FROM pdfs
         WHERE id = $1
        "#,
    )
    .bind(pdf_id)
    .fetch_optional(db)
    .await
    .context("find pdf by id")?;
    Ok(pdf)
}

/// Documents in the user's set, newest first.
pub async fn list_for_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Pdf>> {
    let rows = sqlx::query_as::<_, Pdf>(
        r#"
        SELECT p.id, p.pdf_link, p.audio_link, p.pdf_name, p.created_at, p.updated_at
          FROM pdfs p
          JOIN user_pdfs up ON up.pdf_id = p.id
         WHERE up.user_id = $1
         ORDER BY p.created_at DESC, p.id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list pdfs for user")?;
    Ok(rows)
}

pub async fn delete_by_id(db: &PgPool, pdf_id: Uuid) -> anyhow::Result<Option<Pdf>> {
    let pdf = sqlx::query_as::<_, Pdf>(
        r#"
        DELETE FROM pdfs
         WHERE id = $1
        RETURNING id, pdf_link, audio_link, pdf_name, created_at, updated_at
        "#,
    )
    .bind(pdf_id)
    .fetch_optional(db)
    .await
    .context("delete pdf")?;
    Ok(pdf)
}

/// Drop a document from a user's set. Returns how many references were removed.
pub async fn remove_from_user(db: &PgPool, user_id: Uuid, pdf_id: Uuid) -> anyhow::Result<u64> {
    let res = sqlx::query(
        r#"
        DELETE FROM user_pdfs
         WHERE user_id = $1 AND pdf_id = $2
        "#,
    )
    .bind(user_id)
    .bind(pdf_id)
    .execute(db)
    .await
    .context("unlink pdf from user")?;
    Ok(res.rows_affected())
}
