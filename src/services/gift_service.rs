use crate::error::AppResult;
use crate::models::{
    Gift, GiftQuery, GiftStatus, GiftType, PaginatedResponse, PaginationParams, SeedGiftsResponse,
    StatsResponse, normalize_code,
};
use crate::utils::generate_unique_gift_code;
use chrono::{Duration, Utc};
use sqlx::PgPool;

/// All gift mutation goes through status-conditioned updates here. The
/// affected-row count distinguishes "this call won the race" from "someone
/// else already transitioned the row"; there is no in-process locking.
#[derive(Clone)]
pub struct GiftService {
    pool: PgPool,
}

impl GiftService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Atomically claims one free normal gift for the requester.
    ///
    /// `None` means sold out, a normal outcome. Concurrent callers racing for
    /// the last free gift resolve at the store: exactly one UPDATE returns a
    /// row, the rest see no candidate.
    pub async fn reserve(&self, tg_user_id: i64) -> AppResult<Option<Gift>> {
        let gift = sqlx::query_as::<_, Gift>(
            r#"
            UPDATE gifts
            SET status = 'reserved', reserved = TRUE, reserved_at = NOW(),
                tg_user_id = $1, updated_at = NOW()
            WHERE id = (
                SELECT id FROM gifts
                WHERE status = 'free' AND gift_type = 'normal'
                ORDER BY id
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            AND status = 'free'
            RETURNING *
            "#,
        )
        .bind(tg_user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(gift)
    }

    /// Releases a reservation back to the pool, clearing every reservation
    /// field. A no-op on gifts that are already free, paid, or used, so the
    /// call is safe to repeat.
    pub async fn cancel(&self, gift_id: i64) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE gifts
            SET status = 'free', reserved = FALSE, reserved_at = NULL,
                tg_user_id = NULL, payment_id = NULL, updated_at = NOW()
            WHERE id = $1 AND status IN ('reserved', 'waiting_payment')
            "#,
        )
        .bind(gift_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Stores the payment id and moves the gift to waiting_payment. Returns
    /// false once the gift has left the pre-paid states.
    pub async fn attach_payment(&self, gift_id: i64, payment_id: &str) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE gifts
            SET payment_id = $2, status = 'waiting_payment', updated_at = NOW()
            WHERE id = $1 AND status IN ('reserved', 'waiting_payment')
            "#,
        )
        .bind(gift_id)
        .bind(payment_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Confirms payment for a reserved gift. Returns the updated row only on
    /// the transition that actually changed state; a duplicate success
    /// callback finds the status precondition gone and gets `None`.
    pub async fn mark_paid(&self, gift_id: i64) -> AppResult<Option<Gift>> {
        let gift = sqlx::query_as::<_, Gift>(
            r#"
            UPDATE gifts
            SET status = 'paid', reserved = FALSE, updated_at = NOW()
            WHERE id = $1 AND status IN ('reserved', 'waiting_payment')
            RETURNING *
            "#,
        )
        .bind(gift_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(gift)
    }

    /// One-way redemption. Exactly one caller can win this update per code;
    /// an unknown code and an already-used code are indistinguishable to the
    /// caller.
    pub async fn use_code(&self, code: &str) -> AppResult<Option<Gift>> {
        let gift = sqlx::query_as::<_, Gift>(
            r#"
            UPDATE gifts
            SET is_used = TRUE, used_at = NOW(), status = 'used', updated_at = NOW()
            WHERE code = $1 AND status = 'paid' AND is_used = FALSE
            RETURNING *
            "#,
        )
        .bind(normalize_code(code))
        .fetch_optional(&self.pool)
        .await?;

        Ok(gift)
    }

    /// Read-only redemption check: the code must be paid and unused.
    pub async fn find_redeemable(&self, code: &str) -> AppResult<Option<Gift>> {
        let gift = sqlx::query_as::<_, Gift>(
            r#"
            SELECT * FROM gifts
            WHERE code = $1 AND status = 'paid' AND is_used = FALSE
            "#,
        )
        .bind(normalize_code(code))
        .fetch_optional(&self.pool)
        .await?;

        Ok(gift)
    }

    pub async fn find_by_id(&self, gift_id: i64) -> AppResult<Option<Gift>> {
        let gift = sqlx::query_as::<_, Gift>("SELECT * FROM gifts WHERE id = $1")
            .bind(gift_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(gift)
    }

    /// Frees reservations older than the TTL. Returns how many were released.
    pub async fn release_stale(&self, ttl_minutes: i64) -> AppResult<u64> {
        let deadline = Utc::now() - Duration::minutes(ttl_minutes);

        let result = sqlx::query(
            r#"
            UPDATE gifts
            SET status = 'free', reserved = FALSE, reserved_at = NULL,
                tg_user_id = NULL, payment_id = NULL, updated_at = NOW()
            WHERE status IN ('reserved', 'waiting_payment') AND reserved_at < $1
            "#,
        )
        .bind(deadline)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn stats(&self) -> AppResult<StatsResponse> {
        let normal_available: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM gifts WHERE status = 'free' AND gift_type = 'normal'",
        )
        .fetch_one(&self.pool)
        .await?;

        let vip_used: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM gifts WHERE gift_type = 'vip' AND is_used = TRUE)",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(StatsResponse {
            normal_available,
            vip_used,
        })
    }

    /// Seeds `count` fresh gifts with generated codes. Codes are assigned at
    /// creation and never change afterwards.
    pub async fn seed_gifts(
        &self,
        count: u32,
        gift_type: GiftType,
    ) -> AppResult<SeedGiftsResponse> {
        let mut codes = Vec::with_capacity(count as usize);

        for _ in 0..count {
            let code = generate_unique_gift_code(&self.pool).await?;

            sqlx::query("INSERT INTO gifts (code, gift_type) VALUES ($1, $2)")
                .bind(&code)
                .bind(gift_type)
                .execute(&self.pool)
                .await?;

            codes.push(code);
        }

        Ok(SeedGiftsResponse {
            created: count,
            codes,
        })
    }

    pub async fn list_gifts(&self, query: &GiftQuery) -> AppResult<PaginatedResponse<Gift>> {
        let params = PaginationParams::new(query.page, query.per_page);
        let offset = params.get_offset();
        let limit = params.get_limit();
        let status: Option<GiftStatus> = query.status;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM gifts WHERE ($1::gift_status IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let gifts = sqlx::query_as::<_, Gift>(
            r#"
            SELECT * FROM gifts
            WHERE ($1::gift_status IS NULL OR status = $1)
            ORDER BY id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(PaginatedResponse::new(
            gifts,
            params.page.unwrap_or(1),
            params.get_limit(),
            total,
        ))
    }
}
