use enum_display::EnumDisplay;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use time::OffsetDateTime;

use crate::error::DomainError;
use crate::models::{TenantId, UserId};

/// ロール
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumDisplay, Serialize, Deserialize)]
#[enum_display(case = "Lower")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// 管理者
    Admin,
    /// ユーザー
    User,
    /// 読み取り専用ユーザー
    Readonly,
}

impl TryFrom<&str> for Role {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            "readonly" => Ok(Self::Readonly),
            _ => Err(DomainError::validation(format!(
                "{} is not a role name",
                value
            ))),
        }
    }
}

/// ユーザー・セッション
///
/// 認証されたユーザーが、どのテナントで、どの権限を持つかを表現する。
/// 有効期限は、セッションを読み込むたびに確認する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSession {
    /// ユーザーID
    pub user_id: UserId,
    /// Eメール・アドレス
    pub email: String,
    /// テナントID
    pub tenant_id: TenantId,
    /// ロール
    pub role: Role,
    /// 権限
    pub permissions: Vec<String>,
    /// 有効期限
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl UserSession {
    /// ユーザーが権限を持っているか確認する。
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

/// 認証コンテキスト
///
/// 認証に成功した場合のみ構築される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    user: UserSession,
    session_id: String,
}

impl AuthContext {
    /// 認証コンテキストを構築する。
    ///
    /// 認証に成功したセッションのみを引数に渡すこと。
    ///
    /// # 引数
    ///
    /// * `user` - 有効期限を確認したユーザー・セッション
    /// * `session_id` - セッションID
    ///
    /// # 戻り値
    ///
    /// 認証コンテキスト
    pub fn new(user: UserSession, session_id: impl Into<String>) -> Self {
        Self {
            user,
            session_id: session_id.into(),
        }
    }

    pub fn user(&self) -> &UserSession {
        &self.user
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_authenticated(&self) -> bool {
        true
    }
}

impl Serialize for AuthContext {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("AuthContext", 3)?;
        state.serialize_field("user", &self.user)?;
        state.serialize_field("sessionId", &self.session_id)?;
        state.serialize_field("isAuthenticated", &self.is_authenticated())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;

    fn user_session(permissions: &[&str], expires_at: OffsetDateTime) -> UserSession {
        UserSession {
            user_id: UserId::default(),
            email: String::from("foo@example.com"),
            tenant_id: TenantId::default(),
            role: Role::User,
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            expires_at,
        }
    }

    /// ロールが小文字で表示及びシリアライズされることを確認
    #[test]
    fn role_is_lowercase() -> anyhow::Result<()> {
        assert_eq!("readonly", Role::Readonly.to_string());
        assert_eq!("\"admin\"", serde_json::to_string(&Role::Admin)?);
        assert_eq!(Role::User, Role::try_from("user")?);
        assert!(Role::try_from("root").is_err());

        Ok(())
    }

    /// 認証コンテキストをシリアライズすると、認証済みを示す項目が含まれることを確認
    #[test]
    fn auth_context_serializes_authenticated_flag() -> anyhow::Result<()> {
        let expires_at = OffsetDateTime::now_utc() + Duration::hours(1);
        let context = AuthContext::new(user_session(&["tenants:read"], expires_at), "sess_1");
        let value = serde_json::to_value(&context)?;
        assert_eq!(true, value["isAuthenticated"]);
        assert_eq!("sess_1", value["sessionId"]);
        assert_eq!("foo@example.com", value["user"]["email"]);
        assert_eq!("tenants:read", value["user"]["permissions"][0]);

        Ok(())
    }
}
