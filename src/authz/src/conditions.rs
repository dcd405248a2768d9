//! Conditional grants evaluated against a live resource instance

use crate::error::{AuthzError, Result};
use crate::types::{AttributeReader, CurrentUser};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Placeholders a grant value may reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionVariable {
    /// `$current_user`
    CurrentUser,
}

impl PermissionVariable {
    /// Prefix marking a value as a placeholder
    pub const PREFIX: char = '$';

    /// Classify a string grant value
    ///
    /// Returns `Ok(None)` for literals and an error for any `$` token this
    /// engine cannot resolve.
    pub fn parse(token: &str) -> Result<Option<Self>> {
        if !token.starts_with(Self::PREFIX) {
            return Ok(None);
        }
        match token {
            "$current_user" => Ok(Some(PermissionVariable::CurrentUser)),
            other => Err(AuthzError::UnknownPermissionVariable(other.to_string())),
        }
    }

    fn resolve(self, user: Option<&CurrentUser>) -> Option<Value> {
        match self {
            PermissionVariable::CurrentUser => user.map(CurrentUser::to_value),
        }
    }
}

/// Substitute placeholders in a grant value
///
/// Returns `Ok(None)` when a placeholder has nothing to stand for, such as
/// `$current_user` without a signed-in user.
pub fn resolve_value(value: &Value, user: Option<&CurrentUser>) -> Result<Option<Value>> {
    if let Value::String(token) = value {
        if let Some(variable) = PermissionVariable::parse(token)? {
            return Ok(variable.resolve(user));
        }
    }
    Ok(Some(value.clone()))
}

/// One condition of a conditional grant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "condition", content = "terms", rename_all = "lowercase")]
pub enum ConditionalGrant {
    /// Some element of `instance[list_property]` has the id of `value`
    Contains { list_property: String, value: Value },

    /// `instance[property_name]` equals `value`
    Is { property_name: String, value: Value },

    /// `instance[property_name]` is a member of the sequence `value`
    In { property_name: String, value: Value },
}

impl ConditionalGrant {
    pub fn contains(list_property: impl Into<String>, value: impl Into<Value>) -> Self {
        ConditionalGrant::Contains {
            list_property: list_property.into(),
            value: value.into(),
        }
    }

    pub fn is(property_name: impl Into<String>, value: impl Into<Value>) -> Self {
        ConditionalGrant::Is {
            property_name: property_name.into(),
            value: value.into(),
        }
    }

    pub fn is_in(property_name: impl Into<String>, value: impl Into<Value>) -> Self {
        ConditionalGrant::In {
            property_name: property_name.into(),
            value: value.into(),
        }
    }

    /// Kind tag as it appears on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            ConditionalGrant::Contains { .. } => "contains",
            ConditionalGrant::Is { .. } => "is",
            ConditionalGrant::In { .. } => "in",
        }
    }

    /// Evaluate against `instance`, resolving `$current_user` to `user`
    ///
    /// A condition whose value cannot be resolved never holds.
    pub fn evaluate<R>(&self, instance: &R, user: Option<&CurrentUser>) -> Result<bool>
    where
        R: AttributeReader + ?Sized,
    {
        match self {
            ConditionalGrant::Contains { list_property, value } => {
                let Some(wanted) = resolve_value(value, user)? else {
                    return Ok(false);
                };
                let Some(wanted_id) = entity_id(&wanted) else {
                    return Ok(false);
                };
                let Some(Value::Array(items)) = instance.attribute(list_property) else {
                    return Ok(false);
                };
                Ok(items
                    .iter()
                    .filter_map(entity_id)
                    .any(|item_id| loose_eq(item_id, wanted_id)))
            }
            ConditionalGrant::Is { property_name, value } => {
                let Some(wanted) = resolve_value(value, user)? else {
                    return Ok(false);
                };
                let actual = instance.attribute(property_name).unwrap_or(Value::Null);
                Ok(loose_eq(&wanted, &actual))
            }
            ConditionalGrant::In { property_name, value } => {
                let Some(Value::Array(members)) = resolve_value(value, user)? else {
                    return Ok(false);
                };
                let actual = instance.attribute(property_name).unwrap_or(Value::Null);
                Ok(members.iter().any(|member| loose_eq(member, &actual)))
            }
        }
    }
}

/// Non-null `id` of an entity reference
fn entity_id(value: &Value) -> Option<&Value> {
    value.get("id").filter(|id| !id.is_null())
}

/// Equality as grant payloads expect it
///
/// Numbers compare numerically, a number matches its decimal string, and two
/// entity references (objects with an `id`) match when their ids do.
fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            s.trim().parse::<f64>().ok() == n.as_f64()
        }
        (Value::Object(x), Value::Object(y)) => match (x.get("id"), y.get("id")) {
            (Some(x_id), Some(y_id)) => loose_eq(x_id, y_id),
            _ => x == y,
        },
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResourceInstance;
    use serde_json::json;

    fn user() -> CurrentUser {
        CurrentUser::new(7).with_attribute("email", "owner@example.com")
    }

    #[test]
    fn test_variable_parsing() {
        assert_eq!(PermissionVariable::parse("Open").unwrap(), None);
        assert_eq!(
            PermissionVariable::parse("$current_user").unwrap(),
            Some(PermissionVariable::CurrentUser)
        );
        assert!(matches!(
            PermissionVariable::parse("$current_org"),
            Err(AuthzError::UnknownPermissionVariable(token)) if token == "$current_org"
        ));
    }

    #[test]
    fn test_contains_current_user() {
        let instance = ResourceInstance::new("Assessment")
            .with_attribute("assignees", json!([{"id": 3}, {"id": 7}]));
        let condition = ConditionalGrant::contains("assignees", "$current_user");

        assert!(condition.evaluate(&instance, Some(&user())).unwrap());
        assert!(!condition.evaluate(&instance, Some(&CurrentUser::new(8))).unwrap());
        assert!(!condition.evaluate(&instance, None).unwrap());
    }

    #[test]
    fn test_anonymous_user_never_matches() {
        let is_owner = ConditionalGrant::is("owner", "$current_user");
        let ownerless = ResourceInstance::new("Document");
        assert!(!is_owner.evaluate(&ownerless, None).unwrap());

        let null_owner = ResourceInstance::new("Document").with_attribute("owner", Value::Null);
        assert!(!is_owner.evaluate(&null_owner, None).unwrap());

        let id_less = ResourceInstance::new("Document")
            .with_attribute("assignees", json!([{"type": "Person"}, {"id": null}]));
        assert!(!ConditionalGrant::contains("assignees", "$current_user")
            .evaluate(&id_less, None)
            .unwrap());

        let members = ResourceInstance::new("Document").with_attribute("status", Value::Null);
        assert!(!ConditionalGrant::is_in("status", "$current_user")
            .evaluate(&members, None)
            .unwrap());
    }

    #[test]
    fn test_contains_ignores_missing_ids() {
        let instance = ResourceInstance::new("Assessment")
            .with_attribute("assignees", json!([{"type": "Person"}, {"id": null}]));

        assert!(!ConditionalGrant::contains("assignees", json!({"type": "Person"}))
            .evaluate(&instance, Some(&user()))
            .unwrap());
        assert!(!ConditionalGrant::contains("assignees", "Open")
            .evaluate(&instance, Some(&user()))
            .unwrap());
        assert!(!ConditionalGrant::contains("assignees", json!({"id": null}))
            .evaluate(&instance, Some(&user()))
            .unwrap());
    }

    #[test]
    fn test_contains_missing_list() {
        let instance = ResourceInstance::new("Assessment");
        let condition = ConditionalGrant::contains("assignees", "$current_user");
        assert!(!condition.evaluate(&instance, Some(&user())).unwrap());
    }

    #[test]
    fn test_is_literal_and_user() {
        let instance = ResourceInstance::new("Request")
            .with_attribute("status", "Draft")
            .with_attribute("owner", json!({"id": 7, "type": "Person"}));

        assert!(ConditionalGrant::is("status", "Draft").evaluate(&instance, None).unwrap());
        assert!(!ConditionalGrant::is("status", "Final").evaluate(&instance, None).unwrap());
        assert!(ConditionalGrant::is("owner", "$current_user")
            .evaluate(&instance, Some(&user()))
            .unwrap());
    }

    #[test]
    fn test_is_compares_ids_loosely() {
        let instance = ResourceInstance::new("Program").with_attribute("owner_id", "7");
        assert!(ConditionalGrant::is("owner_id", 7).evaluate(&instance, None).unwrap());
    }

    #[test]
    fn test_in_sequence() {
        let instance = ResourceInstance::new("Issue").with_attribute("status", "In Progress");
        let condition = ConditionalGrant::is_in("status", json!(["Not Started", "In Progress"]));
        assert!(condition.evaluate(&instance, None).unwrap());

        let closed = ResourceInstance::new("Issue").with_attribute("status", "Completed");
        assert!(!condition.evaluate(&closed, None).unwrap());

        let not_a_list = ConditionalGrant::is_in("status", "In Progress");
        assert!(!not_a_list.evaluate(&instance, None).unwrap());
    }

    #[test]
    fn test_unknown_variable_is_fatal() {
        let instance = ResourceInstance::new("Issue").with_attribute("owner", 7);
        for condition in [
            ConditionalGrant::is("owner", "$someone"),
            ConditionalGrant::contains("owners", "$someone"),
            ConditionalGrant::is_in("owner", "$someone"),
        ] {
            let result = condition.evaluate(&instance, Some(&user()));
            assert!(
                matches!(result, Err(AuthzError::UnknownPermissionVariable(_))),
                "{} should fail",
                condition.kind()
            );
        }
    }

    #[test]
    fn test_wire_shape() {
        let condition: ConditionalGrant = serde_json::from_value(json!({
            "condition": "contains",
            "terms": {"list_property": "assignees", "value": "$current_user"}
        }))
        .unwrap();
        assert_eq!(condition, ConditionalGrant::contains("assignees", "$current_user"));
        assert_eq!(condition.kind(), "contains");
    }
}
