use crate::error::AppResult;
use rand::Rng;
use sqlx::PgPool;

const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const CODE_LENGTH: usize = 8;

/// 生成8位字母数字礼品码（大写为规范形式）
pub fn generate_gift_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
        .collect()
}

/// 生成唯一的礼品码（冲突时重试）
pub async fn generate_unique_gift_code(pool: &PgPool) -> AppResult<String> {
    loop {
        let code = generate_gift_code();

        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM gifts WHERE code = $1")
            .bind(&code)
            .fetch_one(pool)
            .await?;

        if exists == 0 {
            return Ok(code);
        }
    }
}

// TODO: 添加 Postgres 集成测试 (testcontainers 或 docker)

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_gift_code() {
        let code = generate_gift_code();
        assert_eq!(code.len(), CODE_LENGTH);
        assert!(
            code.bytes().all(|b| CODE_CHARSET.contains(&b)),
            "unexpected character in code: {code}"
        );
    }

    #[test]
    fn test_generated_code_is_canonical_upper_case() {
        let code = generate_gift_code();
        assert_eq!(code, code.to_ascii_uppercase());
    }
}
