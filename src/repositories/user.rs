use sqlx::PgPool;

use crate::models::User;

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// メールアドレスでユーザーを検索
    ///
    /// # Note
    /// `want_password_hash = false` の場合、password_hash は取得しない
    /// （認証以外の経路にハッシュを流さないため）
    pub async fn find_by_email(
        &self,
        email: &str,
        want_password_hash: bool,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = if want_password_hash {
            r#"
            SELECT id, name, age, email, password_hash, twofa_enabled, twofa_secret,
                   created_at, updated_at
            FROM users
            WHERE email = $1
            "#
        } else {
            r#"
            SELECT id, name, age, email, NULL::text AS password_hash, twofa_enabled,
                   twofa_secret, created_at, updated_at
            FROM users
            WHERE email = $1
            "#
        };

        sqlx::query_as::<_, User>(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
    }

    /// ユーザーIDでユーザーを検索
    pub async fn find_by_id(&self, user_id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, age, email, password_hash, twofa_enabled, twofa_secret,
                   created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// 新しいユーザーを作成
    ///
    /// # Errors
    /// - UNIQUE制約違反時: `sqlx::Error::Database` (constraint = "users_email_key")
    ///   呼び出し側で `AppError::EmailAlreadyExists` に変換すること
    pub async fn create_user(
        &self,
        name: &str,
        age: i32,
        email: &str,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, age, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, age, email, password_hash, twofa_enabled, twofa_secret,
                      created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(age)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
    }

    /// 暗号化済み2FAシークレットを保存
    ///
    /// # Note
    /// 既存のシークレットは上書きされる（未確認シークレットの再発行時）
    pub async fn set_twofa_secret(
        &self,
        user_id: i64,
        encrypted_secret: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET twofa_secret = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(encrypted_secret)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// 暗号化済み2FAシークレットを取得
    pub async fn get_twofa_secret(&self, user_id: i64) -> Result<Option<String>, sqlx::Error> {
        let secret: Option<Option<String>> = sqlx::query_scalar(
            r#"
            SELECT twofa_secret
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        // 行なし / シークレット未登録（NULL）はどちらも None
        Ok(secret.flatten())
    }

    /// 2FAの有効フラグを更新
    pub async fn set_twofa_enabled(&self, user_id: i64, enabled: bool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET twofa_enabled = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(enabled)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
