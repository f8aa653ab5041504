use std::marker::PhantomData;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::DomainError;

pub mod credentials;
pub mod session;
pub mod token;

/// エンティティID
///
/// UUID v4でエンティティを識別するIDを表現する。
/// `PhantomData`でエンティティの型を識別する。
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct EntityId<T> {
    value: Uuid,
    _phantom: PhantomData<T>,
}

impl<T> EntityId<T> {
    /// UUIDからエンティティIDを構築する。
    pub fn new(value: Uuid) -> Self {
        Self {
            value,
            _phantom: PhantomData,
        }
    }

    /// エンティティIDの値を返す。
    pub fn value(&self) -> Uuid {
        self.value
    }
}

impl<'a, T> TryFrom<&'a str> for EntityId<T> {
    type Error = DomainError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match Uuid::parse_str(s) {
            Ok(value) => Ok(Self::new(value)),
            Err(_) => Err(DomainError::validation(format!(
                "{} is not a UUID formatted string",
                s
            ))),
        }
    }
}

impl<T> Copy for EntityId<T> {}

impl<T> Clone for EntityId<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Default for EntityId<T> {
    fn default() -> Self {
        Self::new(Uuid::new_v4())
    }
}

impl<T> std::fmt::Display for EntityId<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T> Serialize for EntityId<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&self.value)
    }
}

impl<'de, T> Deserialize<'de> for EntityId<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::try_from(value.as_str()).map_err(serde::de::Error::custom)
    }
}

/// ユーザー
#[derive(Debug, PartialEq, Eq, Hash)]
pub enum User {}

/// ユーザーID
pub type UserId = EntityId<User>;

/// テナント
#[derive(Debug, PartialEq, Eq, Hash)]
pub enum Tenant {}

/// テナントID
pub type TenantId = EntityId<Tenant>;

#[cfg(test)]
mod tests {
    use super::*;

    /// UUID v4形式の文字列からエンティティIDを構築できるか確認
    #[test]
    fn construct_entity_id_from_valid_string() -> anyhow::Result<()> {
        let expected = "27db4b5f-1ff8-4691-ba07-f54b56884241";
        let entity_id: TenantId = expected.try_into()?;
        assert_eq!(expected, entity_id.to_string());

        Ok(())
    }

    /// UUID v4形式でない文字列からエンティティIDを構築できないことを確認
    #[test]
    fn can_not_construct_entity_id_from_invalid_string() {
        let result: Result<TenantId, DomainError> = "xyz".try_into();
        match result {
            Err(DomainError::Validation { message, .. }) => {
                assert_eq!("xyz is not a UUID formatted string", message)
            }
            _ => panic!("expected DomainError::Validation"),
        }
    }

    /// エンティティIDを文字列としてシリアライズ及びデシリアライズできることを確認
    #[test]
    fn entity_id_is_serialized_as_string() -> anyhow::Result<()> {
        let user_id = UserId::default();
        let json = serde_json::to_string(&user_id)?;
        assert_eq!(format!("\"{}\"", user_id), json);
        let restored: UserId = serde_json::from_str(&json)?;
        assert_eq!(user_id, restored);

        Ok(())
    }
}
