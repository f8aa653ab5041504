use enum_display::EnumDisplay;
use secrecy::SecretString;

use crate::error::{AuthenticationFailure, DomainError};

/// 認証トークンの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumDisplay)]
#[enum_display(case = "Lower")]
pub enum TokenType {
    /// Bearerトークン
    Bearer,
    /// セッション・トークン
    Session,
    /// APIキー
    Api,
}

impl TryFrom<&str> for TokenType {
    type Error = DomainError;

    /// 大文字と小文字を区別せずに、認証スキームから認証トークンの種類を判定する。
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "bearer" => Ok(Self::Bearer),
            "session" => Ok(Self::Session),
            "api" => Ok(Self::Api),
            _ => Err(DomainError::authentication_with_message(
                AuthenticationFailure::InvalidToken,
                "Invalid token format",
            )),
        }
    }
}

/// 認証トークン
#[derive(Debug, Clone)]
pub struct AuthToken {
    /// トークン
    pub token: SecretString,
    /// トークンの種類
    pub token_type: TokenType,
}
