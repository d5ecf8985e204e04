use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// The backend's user record, kept exactly as received.
///
/// Nothing in the record is required to have a particular shape. The fields
/// the client acts on are read on demand, and a value of an unexpected type
/// reads as absent, so the profile never fails to decode and serializes back
/// to the same JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile {
    fields: Map<String, Value>,
}

impl UserProfile {
    pub const EMAIL: &'static str = "email";
    pub const NAME: &'static str = "name";
    /// School the user belongs to. Injected into every request as `schoolId`.
    pub const TENANT: &'static str = "school.id";

    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn email(&self) -> Option<&str> {
        self.string_field(Self::EMAIL)
    }

    pub fn name(&self) -> Option<&str> {
        self.string_field(Self::NAME)
    }

    /// Tenant id parsed from `"school.id"`. The stored value is left as is.
    pub fn tenant_id(&self) -> Option<i64> {
        self.get(Self::TENANT).and_then(tenant_id_from_value)
    }

    /// Best-effort human label: name, then email, then "unknown user".
    pub fn display_name(&self) -> &str {
        self.name().or(self.email()).unwrap_or("unknown user")
    }

    fn string_field(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// Tokens plus profile returned by `/auth/login` and `/auth/refresh-token`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default, deserialize_with = "deserialize_user")]
    pub user: UserProfile,
}

/// A `user` that is not a JSON object (null, a string) reads as an empty
/// profile instead of failing the whole session.
fn deserialize_user<'de, D>(deserializer: D) -> Result<UserProfile, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Object(fields) => UserProfile::new(fields),
        _ => UserProfile::default(),
    })
}

/// Accepts integers, finite floats (truncated) and strings with a leading
/// integer such as `"7"`, `" 12"` or `"42abc"`.
pub fn tenant_id_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => parse_leading_int(s),
        _ => None,
    }
}

fn parse_leading_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits: &str = {
        let end = rest
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        &rest[..end]
    };

    if digits.is_empty() {
        return None;
    }

    let magnitude: i64 = digits.parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}
