use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::error::{DomainError, FieldIssue};
use crate::outcome::DomainResult;

/// 要求の本体を解析できなかったときのメッセージ
const INVALID_JSON_MESSAGE: &str = "Failed to parse request body";

/// 要求の本体を解析できなかったときのコード
const INVALID_JSON_CODE: &str = "invalid_json";

/// 値を検証する。
///
/// すべての項目の問題を、1つの検証エラーにまとめて返す。
///
/// # 引数
///
/// * `value` - 検証する値
///
/// # 戻り値
///
/// 検証に成功した値
pub fn validate<T: Validate>(value: T) -> DomainResult<T> {
    validate_field(value, None)
}

/// 項目の名前を指定して値を検証する。
///
/// # 引数
///
/// * `value` - 検証する値
/// * `field` - 検証エラーに記録する項目の名前
///
/// # 戻り値
///
/// 検証に成功した値
pub fn validate_field<T: Validate>(value: T, field: Option<&str>) -> DomainResult<T> {
    match value.validate() {
        Ok(_) => Ok(value),
        Err(errors) => Err(validation_error_from(&errors, field)),
    }
}

/// JSONをデシリアライズして検証する。
///
/// JSONとして解析できない場合と、型が一致しない場合も検証エラーを返す。
///
/// # 引数
///
/// * `bytes` - JSON
///
/// # 戻り値
///
/// 検証に成功した値
pub fn validate_json<T>(bytes: &[u8]) -> DomainResult<T>
where
    T: DeserializeOwned + Validate,
{
    let value = serde_json::from_slice::<T>(bytes).map_err(|e| invalid_json_error(&e))?;
    validate(value)
}

/// 解析済みのJSONをデシリアライズして検証する。
pub fn validate_value<T>(value: serde_json::Value) -> DomainResult<T>
where
    T: DeserializeOwned + Validate,
{
    let value = serde_json::from_value::<T>(value).map_err(|e| invalid_json_error(&e))?;
    validate(value)
}

fn invalid_json_error(e: &serde_json::Error) -> DomainError {
    tracing::warn!("{} ({}:{})", e, file!(), line!());
    DomainError::validation_with_details(
        INVALID_JSON_MESSAGE,
        None,
        vec![FieldIssue::new(vec![], e.to_string(), INVALID_JSON_CODE)],
    )
}

/// `validator`の検証エラーを、ドメインの検証エラーに変換する。
///
/// ネストした構造体とリストの問題は、パスを連結して平坦化する。
///
/// # 引数
///
/// * `errors` - `validator`の検証エラー
/// * `field` - 検証エラーに記録する項目の名前
///
/// # 戻り値
///
/// 検証エラー
pub fn validation_error_from(errors: &ValidationErrors, field: Option<&str>) -> DomainError {
    let mut details = vec![];
    collect_issues(errors, &[], &mut details);
    details.sort_by(|a, b| a.path.cmp(&b.path));
    let summary = details
        .iter()
        .map(|issue| format!("{}: {}", issue.path.join("."), issue.message))
        .collect::<Vec<_>>()
        .join(", ");

    DomainError::validation_with_details(
        format!("Validation failed: {}", summary),
        field.map(String::from),
        details,
    )
}

fn collect_issues(errors: &ValidationErrors, parent: &[String], issues: &mut Vec<FieldIssue>) {
    for (key, kind) in errors.errors() {
        let mut path = parent.to_vec();
        path.push(key.to_string());
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let message = match &error.message {
                        Some(message) => message.to_string(),
                        None => format!("failed {} validation", error.code),
                    };
                    issues.push(FieldIssue::new(path.clone(), message, error.code.to_string()));
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_issues(nested, &path, issues),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    let mut item_path = path.clone();
                    item_path.push(index.to_string());
                    collect_issues(nested, &item_path, issues);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::error::ErrorKind;

    #[derive(Debug, Deserialize, Validate)]
    struct SignUp {
        #[validate(email)]
        email: String,
        #[validate(length(min = 1, max = 40))]
        name: String,
    }

    /// 妥当な値の検証に成功することを確認
    #[test]
    fn validate_accepts_valid_value() -> anyhow::Result<()> {
        let value = SignUp {
            email: String::from("foo@example.com"),
            name: String::from("foo"),
        };
        let validated = validate(value)?;
        assert_eq!("foo", validated.name);

        Ok(())
    }

    /// Eメール・アドレスとして妥当でない値が、パスを持つ検証エラーになることを確認
    #[test]
    fn invalid_email_is_reported_with_path() {
        let value = SignUp {
            email: String::from("not-an-email"),
            name: String::from("foo"),
        };
        match validate(value) {
            Err(DomainError::Validation { field, details, .. }) => {
                assert!(field.is_none());
                assert_eq!(1, details.len());
                assert_eq!(vec![String::from("email")], details[0].path);
                assert_eq!("email", details[0].code);
            }
            _ => panic!("expected DomainError::Validation"),
        }
    }

    /// すべての項目の問題が、1つの検証エラーにまとめられることを確認
    #[test]
    fn every_issue_is_collected() {
        let value = SignUp {
            email: String::from("not-an-email"),
            name: String::new(),
        };
        match validate_field(value, Some("body")) {
            Err(DomainError::Validation {
                message,
                field,
                details,
            }) => {
                assert_eq!(Some(String::from("body")), field);
                let paths: Vec<String> = details.iter().map(|d| d.path.join(".")).collect();
                assert_eq!(vec!["email", "name"], paths);
                assert!(message.starts_with("Validation failed: "));
            }
            _ => panic!("expected DomainError::Validation"),
        }
    }

    /// JSONとして解析できない本体が検証エラーになることを確認
    #[test]
    fn unparsable_json_is_validation_error() {
        let result = validate_json::<SignUp>(b"{not json");
        match result {
            Err(error @ DomainError::Validation { .. }) => {
                assert_eq!(ErrorKind::Validation, error.kind());
                assert_eq!(INVALID_JSON_MESSAGE, error.message());
            }
            _ => panic!("expected DomainError::Validation"),
        }
    }

    /// 解析済みのJSONを検証できることを確認
    #[test]
    fn validate_parsed_json_value() -> anyhow::Result<()> {
        let validated: SignUp = validate_value(json!({"email": "foo@example.com", "name": "foo"}))?;
        assert_eq!("foo@example.com", validated.email);
        let result = validate_value::<SignUp>(json!({"email": "not-an-email", "name": "foo"}));
        assert!(result.is_err());

        Ok(())
    }
}
