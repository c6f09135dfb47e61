//! Postgres-backed tenant partitions.
//!
//! Each tenant is a Postgres schema inside one database. The connector checks
//! the schema exists, then hands out a store whose statements are qualified
//! with that schema. Nothing touches `search_path`, so pooled connections stay
//! tenant-neutral.
//!
//! ## Error Mapping
//!
//! | SQLx Error | StoreError | Scenario |
//! |------------|------------|----------|
//! | Database | `Query` | Statement rejected by the server |
//! | PoolClosed / PoolTimedOut / Io | `Query` | Database unreachable |
//! | ColumnDecode / ColumnNotFound | `Decode` | Row shape does not match the query |
//!
//! Every statement runs in autocommit; no transactions are opened.

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::instrument;

use studypass_access::{
    AccessStore, ConnectError, Institution, LoginLogEntry, StoreError, SurveyAnswers,
    TenantConnector, UsageHistory, UserIdentity,
};
use studypass_auth::{PaymentRecord, PermissionSet, SubscriptionRecord};
use studypass_core::{PermissionId, PlanId, TenantId, UserId};

/// Open the shared pool all tenant partitions are served from.
pub async fn connect_pool(database_url: &str, max_connections: u32) -> Result<PgPool, StoreError> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(|e| map_sqlx_error("connect_pool", e))
}

/// Resolves tenants to schemas of a shared database.
#[derive(Debug, Clone)]
pub struct PostgresTenantConnector {
    pool: PgPool,
}

impl PostgresTenantConnector {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl TenantConnector for PostgresTenantConnector {
    type Store = PostgresAccessStore;

    #[instrument(skip_all, fields(tenant = %tenant), err)]
    async fn connect(&self, tenant: &TenantId) -> Result<Self::Store, ConnectError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM information_schema.schemata WHERE schema_name = $1)",
        )
        .bind(tenant.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("connect", e))?;

        if !exists {
            return Err(ConnectError::UnknownTenant(tenant.clone()));
        }

        Ok(PostgresAccessStore {
            pool: self.pool.clone(),
            schema: quote_identifier(tenant.as_str()),
        })
    }
}

/// One tenant schema.
#[derive(Debug, Clone)]
pub struct PostgresAccessStore {
    pool: PgPool,
    /// Quoted schema name, safe to splice into statements.
    schema: String,
}

impl PostgresAccessStore {
    fn table(&self, name: &str) -> String {
        format!("{}.{}", self.schema, quote_identifier(name))
    }
}

#[async_trait::async_trait]
impl AccessStore for PostgresAccessStore {
    #[instrument(skip_all, fields(user_id = %user_id), err)]
    async fn user_identity(&self, user_id: UserId) -> Result<Option<UserIdentity>, StoreError> {
        let sql = format!(
            r#"
            SELECT
                u.id::bigint AS id,
                u.full_name::text AS full_name,
                u.email::text AS email,
                up.course::bigint AS course,
                CASE WHEN s.expiry_date < CURRENT_TIMESTAMP THEN NULL ELSE s.plan_id::bigint END AS plan_id,
                p.exams_id::bigint AS exams_id
            FROM {user} u
            LEFT JOIN {profile} up ON up.user_id = u.id
            LEFT JOIN {subscriptions} s ON s.user_id = u.id
            LEFT JOIN {plans} p ON p.id = s.plan_id
            WHERE u.id = $1
            ORDER BY s.created_at DESC
            LIMIT 1
            "#,
            user = self.table("user"),
            profile = self.table("user_profile"),
            subscriptions = self.table("subscriptions"),
            plans = self.table("plans"),
        );

        let row = sqlx::query(&sql)
            .bind(user_id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("user_identity", e))?;

        row.map(|row| -> Result<UserIdentity, StoreError> {
            Ok(UserIdentity {
                id: UserId::new(get(&row, "user_identity", "id")?),
                full_name: get(&row, "user_identity", "full_name")?,
                email: get(&row, "user_identity", "email")?,
                course: get(&row, "user_identity", "course")?,
                plan_id: get::<Option<i64>>(&row, "user_identity", "plan_id")?.map(PlanId::new),
                exams_id: get(&row, "user_identity", "exams_id")?,
            })
        })
        .transpose()
    }

    #[instrument(skip_all, fields(user_id = %user_id), err)]
    async fn authoritative_subscription(
        &self,
        user_id: UserId,
    ) -> Result<Option<SubscriptionRecord>, StoreError> {
        let sql = format!(
            r#"
            SELECT
                s.id::bigint AS subscription_id,
                s.plan_id::bigint AS plan_id,
                p.permission_id::bigint AS permission_id,
                s.expiry_date::timestamptz AS expiry_date,
                s.canceled_at::timestamptz AS canceled_at,
                ph.id::bigint AS payment_id,
                ph.status::text AS payment_status
            FROM {subscriptions} s
            JOIN {plans} p ON s.plan_id = p.id
            LEFT JOIN {payments} ph ON ph.subscriptions_id = s.id
            WHERE s.user_id = $1
            ORDER BY s.id DESC, ph.id DESC NULLS LAST
            LIMIT 1
            "#,
            subscriptions = self.table("subscriptions"),
            plans = self.table("plans"),
            payments = self.table("payment_history"),
        );

        let row = sqlx::query(&sql)
            .bind(user_id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("authoritative_subscription", e))?;

        row.map(|row| subscription_from_row(&row)).transpose()
    }

    #[instrument(skip_all, fields(permission_id = %permission_id), err)]
    async fn permission_set(
        &self,
        permission_id: PermissionId,
    ) -> Result<Option<PermissionSet>, StoreError> {
        let sql = format!(
            r#"
            SELECT
                availability, study_plan, questions, essay, performance,
                activity_history, plans, placement_test, user_exams,
                favorite_videos, notifications, profile,
                on_demand_activities, virtual_tutor
            FROM {permission}
            WHERE id = $1
            "#,
            permission = self.table("permission"),
        );

        let row = sqlx::query(&sql)
            .bind(permission_id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("permission_set", e))?;

        row.map(|row| permission_set_from_row(&row)).transpose()
    }

    #[instrument(skip_all, fields(user_id = %user_id), err)]
    async fn usage_history(&self, user_id: UserId) -> Result<UsageHistory, StoreError> {
        let sql = format!(
            r#"
            SELECT
                EXISTS (SELECT 1 FROM {levels} WHERE user_id = $1) AS has_performance_history,
                EXISTS (SELECT 1 FROM {favorites} WHERE user_id = $1) AS has_favorite_videos,
                EXISTS (SELECT 1 FROM {placement} WHERE user_id = $1) AS has_placement_tests,
                EXISTS (
                    SELECT 1 FROM {activities}
                    WHERE user_id = $1
                      AND (questionnaire_id IS NOT NULL OR user_essay_id IS NOT NULL)
                ) AS has_activity_history
            "#,
            levels = self.table("user_sub_topic_level"),
            favorites = self.table("favorites"),
            placement = self.table("user_placement_test"),
            activities = self.table("activities"),
        );

        let row = sqlx::query(&sql)
            .bind(user_id.get())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("usage_history", e))?;

        Ok(UsageHistory {
            has_performance_history: get(&row, "usage_history", "has_performance_history")?,
            has_favorite_videos: get(&row, "usage_history", "has_favorite_videos")?,
            has_placement_tests: get(&row, "usage_history", "has_placement_tests")?,
            has_activity_history: get(&row, "usage_history", "has_activity_history")?,
        })
    }

    #[instrument(skip_all, fields(user_id = %user_id), err)]
    async fn survey_answers(&self, user_id: UserId) -> Result<Option<SurveyAnswers>, StoreError> {
        let sql = format!(
            r#"
            SELECT
                gender::text AS gender,
                education_level::text AS education_level,
                high_school_system::text AS high_school_system,
                marketing_channel::text AS marketing_channel,
                study_techniques::text AS study_techniques,
                subjects_to_improve::text AS subjects_to_improve,
                study_hours::text AS study_hours
            FROM {survey}
            WHERE user_id = $1
            LIMIT 1
            "#,
            survey = self.table("user_profile_survey"),
        );

        let row = sqlx::query(&sql)
            .bind(user_id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("survey_answers", e))?;

        row.map(|row| -> Result<SurveyAnswers, StoreError> {
            let op = "survey_answers";
            Ok(SurveyAnswers {
                gender: get(&row, op, "gender")?,
                education_level: get(&row, op, "education_level")?,
                high_school_system: get(&row, op, "high_school_system")?,
                marketing_channel: get(&row, op, "marketing_channel")?,
                study_techniques: get(&row, op, "study_techniques")?,
                subjects_to_improve: get(&row, op, "subjects_to_improve")?,
                study_hours: get(&row, op, "study_hours")?,
            })
        })
        .transpose()
    }

    #[instrument(skip_all, fields(user_id = %user_id), err)]
    async fn has_course_enrollment(&self, user_id: UserId) -> Result<bool, StoreError> {
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM {courses} WHERE user_id = $1)",
            courses = self.table("user_course"),
        );

        sqlx::query_scalar(&sql)
            .bind(user_id.get())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("has_course_enrollment", e))
    }

    #[instrument(skip(self), err)]
    async fn institutions(&self) -> Result<Vec<Institution>, StoreError> {
        let sql = format!(
            "SELECT i.type::text AS institution_type, i.admin_user_id::bigint AS admin_user_id FROM {institution} i",
            institution = self.table("institution"),
        );

        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("institutions", e))?;

        rows.iter()
            .map(|row| -> Result<Institution, StoreError> {
                Ok(Institution {
                    institution_type: get(row, "institutions", "institution_type")?,
                    admin_user_id: get::<Option<i64>>(row, "institutions", "admin_user_id")?
                        .map(UserId::new),
                })
            })
            .collect()
    }

    #[instrument(skip_all, fields(user_id = %user_id), err)]
    async fn last_login(&self, user_id: UserId) -> Result<Option<DateTime<Utc>>, StoreError> {
        let sql = format!(
            "SELECT max(timestamp)::timestamptz FROM {log} WHERE user_id = $1",
            log = self.table("login_log"),
        );

        sqlx::query_scalar(&sql)
            .bind(user_id.get())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("last_login", e))
    }

    #[instrument(skip_all, fields(user_id = %entry.user_id), err)]
    async fn insert_login(&self, entry: &LoginLogEntry) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO {log} (user_id, login_source, timestamp) VALUES ($1, $2, $3)",
            log = self.table("login_log"),
        );

        sqlx::query(&sql)
            .bind(entry.user_id.get())
            .bind(&entry.source)
            .bind(entry.timestamp)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_login", e))?;
        Ok(())
    }
}

fn subscription_from_row(row: &PgRow) -> Result<SubscriptionRecord, StoreError> {
    let op = "authoritative_subscription";
    let payment_id: Option<i64> = get(row, op, "payment_id")?;

    Ok(SubscriptionRecord {
        subscription_id: get(row, op, "subscription_id")?,
        plan_id: PlanId::new(get(row, op, "plan_id")?),
        permission_id: get::<Option<i64>>(row, op, "permission_id")?.map(PermissionId::new),
        expiry_date: get(row, op, "expiry_date")?,
        canceled_at: get(row, op, "canceled_at")?,
        latest_payment: match payment_id {
            Some(id) => Some(PaymentRecord {
                id,
                status: get(row, op, "payment_status")?,
            }),
            None => None,
        },
    })
}

fn permission_set_from_row(row: &PgRow) -> Result<PermissionSet, StoreError> {
    // Null flags read as denied.
    let flag = |column: &str| -> Result<bool, StoreError> {
        Ok(get::<Option<bool>>(row, "permission_set", column)?.unwrap_or(false))
    };

    Ok(PermissionSet {
        availability: flag("availability")?,
        study_plan: flag("study_plan")?,
        questions: flag("questions")?,
        essay: flag("essay")?,
        performance: flag("performance")?,
        activity_history: flag("activity_history")?,
        plans: flag("plans")?,
        placement_test: flag("placement_test")?,
        user_exams: flag("user_exams")?,
        favorite_videos: flag("favorite_videos")?,
        notifications: flag("notifications")?,
        profile: flag("profile")?,
        on_demand_activities: flag("on_demand_activities")?,
        virtual_tutor: flag("virtual_tutor")?,
    })
}

fn get<'r, T>(row: &'r PgRow, operation: &'static str, column: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column)
        .map_err(|e| StoreError::decode(operation, format!("{column}: {e}")))
}

/// Double-quote an identifier, doubling embedded quotes.
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Map SQLx errors to store errors.
fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let message = match db_err.code() {
                Some(code) => format!("{} (sqlstate {code})", db_err.message()),
                None => db_err.message().to_string(),
            };
            StoreError::query(operation, message)
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::ColumnNotFound(_) => {
            StoreError::decode(operation, err.to_string())
        }
        sqlx::Error::PoolClosed => StoreError::query(operation, "connection pool closed"),
        sqlx::Error::PoolTimedOut => {
            StoreError::query(operation, "timed out acquiring a connection")
        }
        _ => StoreError::query(operation, err.to_string()),
    }
}
