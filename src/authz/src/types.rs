//! Core permission types

use crate::error::{AuthzError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Context scoping a grant. `None` is the JSON `null` "no context".
pub type ContextId = Option<i64>;

/// Reserved system context; an admin grant here authorizes everything
pub const SYSTEM_CONTEXT: i64 = 0;

/// Reserved admin action tag
pub const ADMIN_ACTION: &str = "__GGRC_ADMIN__";

/// Reserved wildcard resource type
pub const ALL_RESOURCES: &str = "__GGRC_ALL__";

/// Well-known permission verbs
///
/// Grant payloads stay string-keyed, so the engine accepts any action tag;
/// this enum covers the verbs that multi-action checks recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "create")]
    Create,
    #[serde(rename = "read")]
    Read,
    #[serde(rename = "update")]
    Update,
    #[serde(rename = "delete")]
    Delete,
    #[serde(rename = "__GGRC_ADMIN__")]
    Admin,
}

impl Action {
    /// All recognized verbs
    pub const ALL: [Action; 5] = [
        Action::Create,
        Action::Read,
        Action::Update,
        Action::Delete,
        Action::Admin,
    ];

    /// Wire tag of this action
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Admin => ADMIN_ACTION,
        }
    }
}

impl FromStr for Action {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self> {
        Action::ALL
            .iter()
            .copied()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| AuthzError::InvalidInput(format!("Unknown action: '{}'", s)))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a context id out of a JSON value (`null` or an integer)
pub fn context_id_from_value(value: &Value) -> Result<ContextId> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| {
                AuthzError::InvalidInput(format!("Context id is not an integer: {}", n))
            }),
        other => Err(AuthzError::InvalidInput(format!(
            "Context id must be an integer or null, got {}",
            other
        ))),
    }
}

/// The signed-in user, used to resolve `$current_user`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User identifier
    pub id: i64,

    /// Any other attributes the session exposes (email, name, ...)
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl CurrentUser {
    /// Create a user with only an id
    pub fn new(id: i64) -> Self {
        Self {
            id,
            attributes: Map::new(),
        }
    }

    /// Add an attribute to the user
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// JSON object form, as seen by condition evaluation
    pub fn to_value(&self) -> Value {
        let mut object = self.attributes.clone();
        object.insert("id".to_string(), Value::from(self.id));
        Value::Object(object)
    }
}

/// The top-level object of the page currently in view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInstance {
    /// Short type name (e.g. "Person", "Audit")
    #[serde(rename = "type")]
    pub type_name: String,

    /// Context the page object lives in
    #[serde(default)]
    pub context_id: ContextId,
}

impl PageInstance {
    pub fn new(type_name: impl Into<String>, context_id: ContextId) -> Self {
        Self {
            type_name: type_name.into(),
            context_id,
        }
    }
}

/// A resource that can name its type and its context
pub trait Identifiable {
    /// Declared short type name of the resource
    fn type_name(&self) -> &str;

    /// Context the resource is attached to, `None` when it carries none
    fn context_id(&self) -> ContextId;
}

/// Attribute access used by conditional grants
pub trait AttributeReader {
    /// Current value of `name`, `None` when the attribute is absent
    fn attribute(&self, name: &str) -> Option<Value>;
}

/// Anything the engine can evaluate instance-level permissions against
pub trait Resource: Identifiable + AttributeReader {}

impl<T: Identifiable + AttributeReader + ?Sized> Resource for T {}

/// Live domain object handed to `is_allowed_for`
///
/// The type name is the declared short name when there is one, otherwise the
/// generic `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceInstance {
    /// Generic type field
    #[serde(rename = "type")]
    pub resource_type: String,

    /// Declared short type name, preferred over `resource_type`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,

    /// Attached context
    #[serde(default)]
    pub context_id: ContextId,

    /// All other attributes (id, owners, status, ...)
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl ResourceInstance {
    /// Create an instance of `resource_type` with no context
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            short_name: None,
            context_id: None,
            attributes: Map::new(),
        }
    }

    /// Set the declared short type name
    pub fn with_short_name(mut self, short_name: impl Into<String>) -> Self {
        self.short_name = Some(short_name.into());
        self
    }

    /// Attach the instance to a context
    pub fn with_context(mut self, context_id: ContextId) -> Self {
        self.context_id = context_id;
        self
    }

    /// Add an attribute to the instance
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Build an instance from its JSON form
    ///
    /// Expects `type`, reads `context` as either `null` or `{"id": ..}`, and
    /// keeps every other field as an attribute.
    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Object(mut object) = value else {
            return Err(AuthzError::InvalidInput(
                "Resource instance must be a JSON object".to_string(),
            ));
        };

        let resource_type = match object.remove("type") {
            Some(Value::String(s)) => s,
            _ => {
                return Err(AuthzError::InvalidInput(
                    "Resource instance is missing a string 'type'".to_string(),
                ))
            }
        };

        let short_name = match object.remove("short_name") {
            Some(Value::String(s)) => Some(s),
            _ => None,
        };

        let context_id = match object.remove("context") {
            None | Some(Value::Null) => None,
            Some(Value::Object(context)) => {
                context_id_from_value(context.get("id").unwrap_or(&Value::Null))?
            }
            Some(other) => context_id_from_value(&other)?,
        };

        Ok(Self {
            resource_type,
            short_name,
            context_id,
            attributes: object,
        })
    }
}

impl Identifiable for ResourceInstance {
    fn type_name(&self) -> &str {
        self.short_name.as_deref().unwrap_or(&self.resource_type)
    }

    fn context_id(&self) -> ContextId {
        self.context_id
    }
}

impl AttributeReader for ResourceInstance {
    fn attribute(&self, name: &str) -> Option<Value> {
        match name {
            "type" => Some(Value::String(self.resource_type.clone())),
            "context" => Some(match self.context_id {
                Some(id) => serde_json::json!({ "id": id }),
                None => Value::Null,
            }),
            _ => self.attributes.get(name).cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_round_trip_tags() {
        assert_eq!("update".parse::<Action>().unwrap(), Action::Update);
        assert_eq!(Action::Admin.as_str(), "__GGRC_ADMIN__");
        assert!(matches!("approve".parse::<Action>(), Err(AuthzError::InvalidInput(_))));
    }

    #[test]
    fn test_short_name_preferred_over_type() {
        let instance = ResourceInstance::new("control").with_short_name("Control");
        assert_eq!(instance.type_name(), "Control");

        let instance = ResourceInstance::new("Policy");
        assert_eq!(instance.type_name(), "Policy");
    }

    #[test]
    fn test_instance_from_json() {
        let instance = ResourceInstance::from_json(json!({
            "type": "Assessment",
            "id": 17,
            "context": {"id": 4},
            "assignees": [{"id": 1}, {"id": 2}]
        }))
        .unwrap();

        assert_eq!(instance.type_name(), "Assessment");
        assert_eq!(instance.context_id(), Some(4));
        assert_eq!(instance.attribute("id"), Some(json!(17)));
        assert_eq!(instance.attribute("context"), Some(json!({"id": 4})));
        assert!(instance.attribute("missing").is_none());
    }

    #[test]
    fn test_instance_without_context() {
        let instance =
            ResourceInstance::from_json(json!({"type": "Policy", "context": null})).unwrap();
        assert_eq!(instance.context_id(), None);

        let missing_type = ResourceInstance::from_json(json!({"id": 3}));
        assert!(matches!(missing_type, Err(AuthzError::InvalidInput(_))));
    }

    #[test]
    fn test_current_user_value() {
        let user = CurrentUser::new(42).with_attribute("email", "user@example.com");
        assert_eq!(user.to_value(), json!({"id": 42, "email": "user@example.com"}));
    }
}
