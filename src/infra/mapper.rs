use anyhow::Result;

// ============================================================================
// Domain Mapper - translation between aggregates and storage / API shapes
// ============================================================================

pub trait DomainMapper<Domain, Model, Response = serde_json::Value> {
    fn to_persistence(&self, entity: &Domain) -> Result<Model>;
    fn to_domain(&self, record: Model) -> Result<Domain>;
    fn to_response(&self, entity: &Domain) -> Result<Response>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AggregateConfig;
    use crate::context::{build_event_context, Environment};
    use crate::domain::aggregate::Aggregate;
    use crate::domain::entity::{EntityProps, UniqueId};
    use serde::{Deserialize, Serialize};
    use serde_json::{json, Value};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct User {
        name: String,
        age: u32,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct UserRow {
        id: String,
        name: String,
        age: i32,
    }

    struct UserMapper {
        config: AggregateConfig,
    }

    impl DomainMapper<Aggregate<User>, UserRow> for UserMapper {
        fn to_persistence(&self, entity: &Aggregate<User>) -> Result<UserRow> {
            let state = entity.get_state();
            Ok(UserRow {
                id: state.id().to_string(),
                name: state.props.name.clone(),
                age: i32::try_from(state.props.age)?,
            })
        }

        fn to_domain(&self, record: UserRow) -> Result<Aggregate<User>> {
            let props = EntityProps::with_id(
                Some(UniqueId::from(record.id)),
                User {
                    name: record.name,
                    age: u32::try_from(record.age)?,
                },
            );
            Ok(Aggregate::from_props("User", props, self.config.clone())?)
        }

        fn to_response(&self, entity: &Aggregate<User>) -> Result<Value> {
            Ok(entity.to_object()?)
        }
    }

    fn mapper() -> UserMapper {
        let context = build_event_context(&Environment::server()).unwrap();
        UserMapper {
            config: AggregateConfig::default().with_context(context),
        }
    }

    #[test]
    fn test_persistence_round_trip_keeps_identity() {
        let mapper = mapper();
        let row = UserRow {
            id: "user-7".to_string(),
            name: "John".to_string(),
            age: 20,
        };

        let user = mapper.to_domain(row.clone()).unwrap();
        assert_eq!(user.id(), UniqueId::from("user-7"));
        assert_eq!(mapper.to_persistence(&user).unwrap(), row);
    }

    #[test]
    fn test_negative_age_is_rejected() {
        let mapper = mapper();
        let row = UserRow {
            id: "user-8".to_string(),
            name: "Jane".to_string(),
            age: -1,
        };
        assert!(mapper.to_domain(row).is_err());
    }

    #[test]
    fn test_response_is_plain_object() {
        let mapper = mapper();
        let user = mapper
            .to_domain(UserRow {
                id: "user-9".to_string(),
                name: "John".to_string(),
                age: 20,
            })
            .unwrap();

        let response = mapper.to_response(&user).unwrap();
        assert_eq!(response["id"], json!("user-9"));
        assert_eq!(response["name"], json!("John"));
    }
}
