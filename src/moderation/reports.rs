/// Report manager implementation
///
/// Submission is a single transaction: insert, recount, act on the count,
/// commit. The UNIQUE(post_id, reporter_user_id) index is the authoritative
/// guard against duplicate reports, so the concurrent-submit race resolves
/// at the storage layer.
use crate::{
    error::{ApiError, ApiResult},
    moderation::{
        PostReportSummary, ReasonCount, Report, ReportListFilter, ReportOutcome, ReportPage,
        ReportReason, ReportStatus, ReportWithReporter, ThresholdAction, DEACTIVATION_THRESHOLD,
        MAX_DESCRIPTION_LENGTH, WARNING_THRESHOLD,
    },
};
use chrono::Utc;
use sqlx::{Row, SqlitePool};

/// Report manager service
pub struct ReportManager {
    db: SqlitePool,
}

impl ReportManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Submit a report against a post.
    ///
    /// Threshold actions fire on exact equality of the post's report count:
    /// a warning at the third report, owner deactivation at the fifth.
    /// Counts past five trigger nothing; deleting reports and re-crossing a
    /// threshold will not re-fire.
    pub async fn submit(
        &self,
        post_id: i64,
        reporter_id: i64,
        reason: ReportReason,
        description: Option<String>,
    ) -> ApiResult<ReportOutcome> {
        if let Some(text) = &description {
            // Character count, not bytes; multibyte text gets the full limit
            if text.chars().count() > MAX_DESCRIPTION_LENGTH {
                return Err(ApiError::Validation(format!(
                    "Description must be at most {} characters",
                    MAX_DESCRIPTION_LENGTH
                )));
            }
        }

        let now = Utc::now();
        let mut tx = self.db.begin().await.map_err(ApiError::Database)?;

        let post_owner_id: i64 = sqlx::query_scalar("SELECT user_id FROM posts WHERE id = ?1")
            .bind(post_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(ApiError::Database)?
            .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

        let result = sqlx::query(
            r#"
            INSERT INTO reports
            (post_id, reporter_user_id, reason, description, status, created_at)
            VALUES (?1, ?2, ?3, ?4, 'pending', ?5)
            "#,
        )
        .bind(post_id)
        .bind(reporter_id)
        .bind(reason.as_str())
        .bind(&description)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                ApiError::Conflict("You have already reported this post".to_string())
            }
            _ => ApiError::Database(e),
        })?;

        let report_id = result.last_insert_rowid();

        let total_reports: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM reports WHERE post_id = ?1")
                .bind(post_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(ApiError::Database)?;

        let triggered = if total_reports == WARNING_THRESHOLD {
            Some(ThresholdAction::Warning)
        } else if total_reports == DEACTIVATION_THRESHOLD {
            // Deactivate the post owner in the same transaction as the
            // report that crossed the threshold
            sqlx::query("UPDATE users SET is_active = 0 WHERE id = ?1")
                .bind(post_owner_id)
                .execute(&mut *tx)
                .await
                .map_err(ApiError::Database)?;

            Some(ThresholdAction::Deactivation)
        } else {
            None
        };

        tx.commit().await.map_err(ApiError::Database)?;

        if let Some(action) = &triggered {
            tracing::info!(
                post_id,
                post_owner_id,
                total_reports,
                action = ?action,
                "report threshold crossed"
            );
        }

        Ok(ReportOutcome {
            report: Report {
                id: report_id,
                post_id,
                reporter_user_id: reporter_id,
                reason,
                description,
                status: ReportStatus::Pending,
                admin_note: None,
                resolved_by: None,
                resolved_at: None,
                created_at: now,
            },
            total_reports,
            post_owner_id,
            triggered,
        })
    }

    /// Resolve a report. Never reverses a deactivation the threshold engine
    /// already performed.
    pub async fn resolve(
        &self,
        report_id: i64,
        status: ReportStatus,
        admin_note: Option<String>,
        admin_id: i64,
    ) -> ApiResult<Report> {
        if status == ReportStatus::Pending {
            return Err(ApiError::Validation(
                "Status must be one of: reviewed, resolved, rejected".to_string(),
            ));
        }

        let result = sqlx::query(
            r#"
            UPDATE reports
            SET status = ?1, admin_note = ?2, resolved_by = ?3, resolved_at = ?4
            WHERE id = ?5
            "#,
        )
        .bind(status.as_str())
        .bind(&admin_note)
        .bind(admin_id)
        .bind(Utc::now())
        .bind(report_id)
        .execute(&self.db)
        .await
        .map_err(ApiError::Database)?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Report not found".to_string()));
        }

        tracing::info!(report_id, admin_id, status = status.as_str(), "report resolved");

        self.get_report(report_id).await
    }

    /// Get a report by id
    pub async fn get_report(&self, report_id: i64) -> ApiResult<Report> {
        let row = sqlx::query(
            "SELECT id, post_id, reporter_user_id, reason, description, status,
                    admin_note, resolved_by, resolved_at, created_at
             FROM reports WHERE id = ?1",
        )
        .bind(report_id)
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::Database)?
        .ok_or_else(|| ApiError::NotFound("Report not found".to_string()))?;

        parse_report(&row)
    }

    /// All reports against a post, newest first, with reporter identity and
    /// a per-reason breakdown
    pub async fn list_for_post(&self, post_id: i64) -> ApiResult<PostReportSummary> {
        let post_exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE id = ?1")
            .bind(post_id)
            .fetch_one(&self.db)
            .await
            .map_err(ApiError::Database)?;
        if post_exists == 0 {
            return Err(ApiError::NotFound("Post not found".to_string()));
        }

        let rows = sqlx::query(
            r#"
            SELECT r.id, r.post_id, r.reporter_user_id, r.reason, r.description,
                   r.status, r.admin_note, r.resolved_by, r.resolved_at,
                   r.created_at, u.name AS reporter_name, u.email AS reporter_email
            FROM reports r
            JOIN users u ON u.id = r.reporter_user_id
            WHERE r.post_id = ?1
            ORDER BY r.created_at DESC, r.id DESC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.db)
        .await
        .map_err(ApiError::Database)?;

        let mut reports = Vec::with_capacity(rows.len());
        for row in &rows {
            reports.push(ReportWithReporter {
                report: parse_report(row)?,
                reporter_name: row.try_get("reporter_name")?,
                reporter_email: row.try_get("reporter_email")?,
            });
        }

        let reason_rows = sqlx::query(
            "SELECT reason, COUNT(*) AS count FROM reports
             WHERE post_id = ?1 GROUP BY reason ORDER BY count DESC",
        )
        .bind(post_id)
        .fetch_all(&self.db)
        .await
        .map_err(ApiError::Database)?;

        let mut by_reason = Vec::with_capacity(reason_rows.len());
        for row in &reason_rows {
            let reason: String = row.try_get("reason")?;
            by_reason.push(ReasonCount {
                reason: ReportReason::from_str(&reason)?,
                count: row.try_get("count")?,
            });
        }

        Ok(PostReportSummary {
            post_id,
            total: reports.len() as i64,
            reports,
            by_reason,
        })
    }

    /// All reports across posts with optional status/reason filters,
    /// newest first, paginated. Every page carries the pending-queue size.
    pub async fn list(&self, filter: &ReportListFilter) -> ApiResult<ReportPage> {
        let page = filter.page.unwrap_or(1).max(1);
        let per_page = filter.per_page.unwrap_or(25).clamp(1, 100);

        let mut conditions = Vec::new();
        if let Some(status) = filter.status.as_deref() {
            // Validates the value; the bound parameter below carries it
            ReportStatus::from_str(status)?;
            conditions.push("r.status = ?".to_string());
        }
        if let Some(reason) = filter.reason.as_deref() {
            ReportReason::from_str(reason)?;
            conditions.push("r.reason = ?".to_string());
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) FROM reports r {}", where_clause);
        let list_sql = format!(
            "SELECT r.id, r.post_id, r.reporter_user_id, r.reason, r.description,
                    r.status, r.admin_note, r.resolved_by, r.resolved_at,
                    r.created_at, u.name AS reporter_name, u.email AS reporter_email
             FROM reports r
             JOIN users u ON u.id = r.reporter_user_id
             {} ORDER BY r.created_at DESC, r.id DESC LIMIT ? OFFSET ?",
            where_clause
        );

        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        let mut list_query = sqlx::query(&list_sql);
        if let Some(status) = filter.status.as_deref() {
            count_query = count_query.bind(status.to_lowercase());
            list_query = list_query.bind(status.to_lowercase());
        }
        if let Some(reason) = filter.reason.as_deref() {
            count_query = count_query.bind(reason.to_lowercase());
            list_query = list_query.bind(reason.to_lowercase());
        }

        let total = count_query
            .fetch_one(&self.db)
            .await
            .map_err(ApiError::Database)?;

        let rows = list_query
            .bind(per_page)
            .bind((page - 1) * per_page)
            .fetch_all(&self.db)
            .await
            .map_err(ApiError::Database)?;

        let mut reports = Vec::with_capacity(rows.len());
        for row in &rows {
            reports.push(ReportWithReporter {
                report: parse_report(row)?,
                reporter_name: row.try_get("reporter_name")?,
                reporter_email: row.try_get("reporter_email")?,
            });
        }

        Ok(ReportPage {
            reports,
            total,
            pending: self.pending_count().await?,
            page,
            per_page,
        })
    }

    /// Size of the review queue
    pub async fn pending_count(&self) -> ApiResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM reports WHERE status = 'pending'")
            .fetch_one(&self.db)
            .await
            .map_err(ApiError::Database)
    }
}

fn parse_report(row: &sqlx::sqlite::SqliteRow) -> ApiResult<Report> {
    let reason: String = row.try_get("reason")?;
    let status: String = row.try_get("status")?;

    Ok(Report {
        id: row.try_get("id")?,
        post_id: row.try_get("post_id")?,
        reporter_user_id: row.try_get("reporter_user_id")?,
        reason: ReportReason::from_str(&reason)?,
        description: row.try_get("description")?,
        status: ReportStatus::from_str(&status)?,
        admin_note: row.try_get("admin_note")?,
        resolved_by: row.try_get("resolved_by")?,
        resolved_at: row.try_get("resolved_at")?,
        created_at: row.try_get("created_at")?,
    })
}
