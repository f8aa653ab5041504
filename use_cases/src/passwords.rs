use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use secrecy::{ExposeSecret as _, SecretString};

use domain::{DomainError, DomainResult};

use crate::settings::PasswordSettings;

const PASSWORD_HASHING_COMPONENT: &str = "password_hashing";

/// Argon2idアルゴリズムでパスワードをハッシュ化した、PHC文字列を生成する。
///
/// # 引数
///
/// * `raw_password` - 未加工なパスワード
/// * `settings` - パスワード設定
///
/// # 戻り値
///
/// PHC文字列
pub fn hash_password(
    raw_password: &SecretString,
    settings: &PasswordSettings,
) -> DomainResult<SecretString> {
    // パスワードにペッパーを振りかけ
    let peppered_password = sprinkle_pepper_on_password(raw_password, &settings.pepper);
    // ソルトを生成
    let salt = SaltString::generate(&mut rand::thread_rng());
    // ハッシュ化パラメーターを設定
    let params = Params::new(
        settings.hash_memory,
        settings.hash_iterations,
        settings.hash_parallelism,
        None,
    )
    .map_err(|e| {
        tracing::error!("{} ({}:{})", e, file!(), line!());
        DomainError::configuration(PASSWORD_HASHING_COMPONENT, e.to_string())
    })?;
    // PHC文字列を生成
    let phc = Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password(peppered_password.expose_secret().as_bytes(), &salt)
        .map_err(|e| {
            tracing::error!("{} ({}:{})", e, file!(), line!());
            DomainError::configuration(PASSWORD_HASHING_COMPONENT, e.to_string())
        })?
        .to_string();

    Ok(SecretString::new(phc))
}

/// パスワードを検証する。
///
/// # 引数
///
/// * `raw_password` - 検証する未加工なパスワード
/// * `pepper` - 未加工なパスワードに振りかけるペッパー
/// * `target_phc` - パスワードを検証する対象のPHC文字列
///
/// # 戻り値
///
/// パスワードの検証に成功した場合は`true`、それ以外の場合は`false`
pub fn verify_password(
    raw_password: &SecretString,
    pepper: &SecretString,
    target_phc: &SecretString,
) -> DomainResult<bool> {
    // PHC文字列をパースしてハッシュ値を取得
    let expected_hash = PasswordHash::new(target_phc.expose_secret()).map_err(|e| {
        tracing::error!("{} ({}:{})", e, file!(), line!());
        DomainError::configuration(PASSWORD_HASHING_COMPONENT, "stored hash is not a PHC string")
    })?;
    // パスワードにペッパーを振りかけ
    let expected_password = sprinkle_pepper_on_password(raw_password, pepper);

    Ok(Argon2::default()
        .verify_password(expected_password.expose_secret().as_bytes(), &expected_hash)
        .is_ok())
}

/// パスワードにペッパーを振りかける。
fn sprinkle_pepper_on_password(raw_password: &SecretString, pepper: &SecretString) -> SecretString {
    let mut password = raw_password.expose_secret().to_string();
    password.push_str(pepper.expose_secret());

    SecretString::new(password)
}

#[cfg(test)]
mod tests {
    use domain::ErrorKind;

    use super::*;
    use crate::settings::tests::password_settings;

    const RAW_PASSWORD: &str = "Az3#Za3@";

    /// パスワードをハッシュ化したPHC文字列を生成した後、同じパスワードで検証に成功することを確認
    #[test]
    fn verification_succeeds_with_the_same_password() -> anyhow::Result<()> {
        let settings = password_settings();
        let raw_password = SecretString::new(String::from(RAW_PASSWORD));
        let phc = hash_password(&raw_password, &settings)?;
        assert!(phc.expose_secret().starts_with("$argon2id$"));
        assert!(verify_password(&raw_password, &settings.pepper, &phc)?);

        Ok(())
    }

    /// PHC文字列を生成したパスワードと異なるパスワードが検証に失敗することを確認
    #[test]
    fn verification_fails_with_different_password() -> anyhow::Result<()> {
        let settings = password_settings();
        let raw_password = SecretString::new(String::from(RAW_PASSWORD));
        let phc = hash_password(&raw_password, &settings)?;
        let different_password = SecretString::new(String::from("fooBar123%"));
        assert!(!verify_password(&different_password, &settings.pepper, &phc)?);

        Ok(())
    }

    /// PHC文字列でないハッシュを検証すると、設定エラーが返されることを確認
    #[test]
    fn verification_with_broken_hash_is_configuration_error() {
        let settings = password_settings();
        let raw_password = SecretString::new(String::from(RAW_PASSWORD));
        let broken = SecretString::new(String::from("not-a-phc-string"));
        let error = verify_password(&raw_password, &settings.pepper, &broken).unwrap_err();
        assert_eq!(ErrorKind::Configuration, error.kind());
    }
}
