use secrecy::SecretString;
use serde::Deserialize;
use validator::Validate;

/// 送信された認証情報
///
/// 検証に成功した後で`Credentials`に変換する。
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CredentialsPayload {
    /// Eメール・アドレス
    #[validate(email)]
    pub email: String,
    /// パスワード
    #[validate(length(min = 8))]
    pub password: String,
}

/// 認証情報
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Eメール・アドレス
    pub email: String,
    /// パスワード
    pub password: SecretString,
}

impl From<CredentialsPayload> for Credentials {
    fn from(value: CredentialsPayload) -> Self {
        Self {
            email: value.email,
            password: SecretString::new(value.password),
        }
    }
}
