//! Username generation from handlebars templates.
//!
//! Templates render against `{"DisplayName": .., "RoleName": ..}` with
//! these helpers available:
//!
//! | Helper | Example | Result |
//! |---|---|---|
//! | `printf` | `(printf "v-%s-%s" a b)` | `%s`/`%d`/`%v` substitution, `%%` for a literal `%` |
//! | `truncate` | `(truncate RoleName 15)` | first 15 characters |
//! | `truncate_sha256` | `(truncate_sha256 x 20)` | first 12 characters + 8 hex of the SHA-256 of the rest |
//! | `uppercase` / `lowercase` | `(lowercase DisplayName)` | case conversion |
//! | `replace` | `(replace x "-" "_")` | replace every occurrence |
//! | `sha256` | `(sha256 x)` | hex digest |
//! | `base64` | `(base64 x)` | standard encoding |
//! | `random` | `(random 20)` | 20 random alphanumerics |
//! | `unix_time` / `unix_time_millis` | `(unix_time)` | current epoch time |
//! | `timestamp` | `(timestamp "%Y%m%d")` | current UTC time, RFC 3339 without a format |
//! | `uuid` | `(uuid)` | random v4 UUID |

use base64::Engine;
use handlebars::{handlebars_helper, no_escape, Handlebars};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{PluginError, PluginResult};

/// Template used when the configuration does not supply one.
pub const DEFAULT_USERNAME_TEMPLATE: &str = r#"{{truncate (printf "v-%s-%s-%s-%s" (truncate DisplayName 15) (truncate RoleName 15) (random 20) (unix_time)) 100}}"#;

/// Upper bound on usernames produced by [`DEFAULT_USERNAME_TEMPLATE`].
pub const MAX_USERNAME_LEN: usize = 100;

const TEMPLATE_NAME: &str = "username";

/// Caller-supplied metadata a username is derived from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsernameMetadata {
    #[serde(rename = "DisplayName", default)]
    pub display_name: String,

    #[serde(rename = "RoleName", default)]
    pub role_name: String,
}

impl UsernameMetadata {
    pub fn new(display_name: impl Into<String>, role_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            role_name: role_name.into(),
        }
    }
}

/// A compiled username template.
#[derive(Clone)]
pub struct UsernameTemplate {
    registry: Handlebars<'static>,
}

impl std::fmt::Debug for UsernameTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsernameTemplate").finish_non_exhaustive()
    }
}

impl UsernameTemplate {
    /// Compile `source`. Syntax errors are configuration errors.
    pub fn compile(source: &str) -> PluginResult<Self> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(no_escape);
        register_helpers(&mut registry);

        registry
            .register_template_string(TEMPLATE_NAME, source)
            .map_err(|e| {
                PluginError::config_field("username_template", format!("unable to parse template: {e}"))
            })?;

        Ok(Self { registry })
    }

    /// Compile the default template.
    pub fn default_template() -> PluginResult<Self> {
        Self::compile(DEFAULT_USERNAME_TEMPLATE)
    }

    /// Render a username for `metadata`.
    ///
    /// Rendering failures and empty results are configuration errors.
    pub fn generate(&self, metadata: &UsernameMetadata) -> PluginResult<String> {
        let username = self.registry.render(TEMPLATE_NAME, metadata).map_err(|e| {
            PluginError::config_field("username_template", format!("unable to generate username: {e}"))
        })?;

        if username.trim().is_empty() {
            return Err(PluginError::config_field(
                "username_template",
                "template produced an empty username",
            ));
        }
        Ok(username)
    }
}

fn register_helpers(registry: &mut Handlebars<'static>) {
    registry.register_helper("printf", Box::new(printf));
    registry.register_helper("truncate", Box::new(truncate));
    registry.register_helper("truncate_sha256", Box::new(truncate_sha256));
    registry.register_helper("uppercase", Box::new(uppercase));
    registry.register_helper("lowercase", Box::new(lowercase));
    registry.register_helper("replace", Box::new(replace));
    registry.register_helper("sha256", Box::new(sha256));
    registry.register_helper("base64", Box::new(base64_encode));
    registry.register_helper("random", Box::new(random));
    registry.register_helper("unix_time", Box::new(unix_time));
    registry.register_helper("unix_time_millis", Box::new(unix_time_millis));
    registry.register_helper("timestamp", Box::new(timestamp));
    registry.register_helper("uuid", Box::new(uuid_v4));
}

/// Render a helper argument as text; missing values render empty.
fn text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn take_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

fn sha256_hex(s: &str) -> String {
    hex::encode(Sha256::digest(s.as_bytes()))
}

fn format_printf(format: &str, args: &[&Value]) -> String {
    let mut out = String::with_capacity(format.len());
    let mut args = args.iter();
    let mut chars = format.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some(verb @ ('s' | 'd' | 'v')) => match args.next() {
                Some(arg) => out.push_str(&text(arg)),
                None => out.push_str(&format!("%!{verb}(MISSING)")),
            },
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    out
}

/// Current UTC time in strftime `format`; an invalid format renders empty.
fn format_now(format: &str) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    if write!(out, "{}", chrono::Utc::now().format(format)).is_err() {
        out.clear();
    }
    out
}

fn truncate_with_hash(s: &str, max: usize) -> String {
    if s.chars().count() <= max || max <= 8 {
        return take_chars(s, max);
    }
    let keep = max - 8;
    let split = s.char_indices().nth(keep).map_or(s.len(), |(i, _)| i);
    let (head, tail) = s.split_at(split);
    format!("{head}{}", &sha256_hex(tail)[..8])
}

// `*args` collects every parameter, the format string included.
handlebars_helper!(printf: |format: str, *args| format_printf(format, &args[1..]));
handlebars_helper!(truncate: |s: Json, n: u64| take_chars(&text(s), n as usize));
handlebars_helper!(truncate_sha256: |s: Json, n: u64| truncate_with_hash(&text(s), n as usize));
handlebars_helper!(uppercase: |s: Json| text(s).to_uppercase());
handlebars_helper!(lowercase: |s: Json| text(s).to_lowercase());
handlebars_helper!(replace: |s: Json, from: str, to: str| text(s).replace(from, to));
handlebars_helper!(sha256: |s: Json| sha256_hex(&text(s)));
handlebars_helper!(base64_encode: |s: Json| base64::engine::general_purpose::STANDARD.encode(text(s)));
handlebars_helper!(random: |n: u64| rand::thread_rng()
    .sample_iter(&Alphanumeric)
    .take(n as usize)
    .map(char::from)
    .collect::<String>());
handlebars_helper!(unix_time: |*_args| chrono::Utc::now().timestamp());
handlebars_helper!(unix_time_millis: |*_args| chrono::Utc::now().timestamp_millis());
handlebars_helper!(timestamp: |*args| match args.first() {
    Some(Value::String(format)) => format_now(format),
    _ => chrono::Utc::now().to_rfc3339(),
});
handlebars_helper!(uuid_v4: |*_args| uuid::Uuid::new_v4().to_string());

#[cfg(test)]
mod tests {
    use super::*;

    fn render(source: &str, metadata: &UsernameMetadata) -> String {
        UsernameTemplate::compile(source)
            .unwrap()
            .generate(metadata)
            .unwrap()
    }

    #[test]
    fn test_default_template_shape() {
        let template = UsernameTemplate::default_template().unwrap();
        let username = template
            .generate(&UsernameMetadata::new("alice", "ro"))
            .unwrap();

        let parts: Vec<&str> = username.split('-').collect();
        assert_eq!(parts.len(), 5, "unexpected shape: {username}");
        assert_eq!(parts[0], "v");
        assert_eq!(parts[1], "alice");
        assert_eq!(parts[2], "ro");
        assert_eq!(parts[3].len(), 20);
        assert!(parts[3].chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(parts[4].parse::<i64>().is_ok());
    }

    #[test]
    fn test_default_template_with_empty_metadata() {
        let template = UsernameTemplate::default_template().unwrap();
        let username = template.generate(&UsernameMetadata::default()).unwrap();
        assert!(username.starts_with("v---"));
        assert!(username.chars().count() <= MAX_USERNAME_LEN);
    }

    #[test]
    fn test_default_template_truncates_components() {
        let template = UsernameTemplate::default_template().unwrap();
        let metadata = UsernameMetadata::new("a".repeat(300), "b".repeat(300));
        let username = template.generate(&metadata).unwrap();
        assert!(username.starts_with(&format!("v-{}-{}-", "a".repeat(15), "b".repeat(15))));
        assert!(username.chars().count() <= MAX_USERNAME_LEN);
    }

    #[test]
    fn test_default_template_bounded_for_multibyte_input() {
        let template = UsernameTemplate::default_template().unwrap();
        let metadata = UsernameMetadata::new("ü".repeat(50), "日本".repeat(50));
        let username = template.generate(&metadata).unwrap();
        assert!(username.chars().count() <= MAX_USERNAME_LEN);
    }

    #[test]
    fn test_random_values_differ() {
        let template = UsernameTemplate::default_template().unwrap();
        let metadata = UsernameMetadata::new("alice", "ro");
        let first = template.generate(&metadata).unwrap();
        let second = template.generate(&metadata).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_no_html_escaping() {
        let metadata = UsernameMetadata::new("a&b", "<ro>");
        assert_eq!(render("{{DisplayName}}{{RoleName}}", &metadata), "a&b<ro>");
    }

    #[test]
    fn test_string_helpers() {
        let metadata = UsernameMetadata::new("Alice Smith", "Read-Only");
        assert_eq!(
            render(r#"{{lowercase (replace DisplayName " " "_")}}"#, &metadata),
            "alice_smith"
        );
        assert_eq!(render("{{uppercase RoleName}}", &metadata), "READ-ONLY");
        assert_eq!(render("{{base64 RoleName}}", &metadata), "UmVhZC1Pbmx5");
        assert_eq!(
            render("{{sha256 RoleName}}", &metadata),
            sha256_hex("Read-Only")
        );
    }

    #[test]
    fn test_truncate_sha256() {
        let long = "abcdefghijklmnopqrstuvwxyz";
        let truncated = truncate_with_hash(long, 20);
        assert_eq!(truncated.len(), 20);
        assert!(truncated.starts_with("abcdefghijkl"));
        assert_eq!(&truncated[12..], &sha256_hex("mnopqrstuvwxyz")[..8]);

        assert_eq!(truncate_with_hash("short", 20), "short");
    }

    #[test]
    fn test_printf() {
        let a = Value::String("x".to_string());
        let n = Value::from(42);
        assert_eq!(format_printf("v-%s-%d-%%", &[&a, &n]), "v-x-42-%");
        assert_eq!(format_printf("%s-%s", &[&a]), "x-%!s(MISSING)");
        assert_eq!(format_printf("100%", &[]), "100%");
    }

    #[test]
    fn test_uuid_and_time_helpers() {
        let metadata = UsernameMetadata::default();
        let id = render("{{uuid}}", &metadata);
        assert!(uuid::Uuid::parse_str(&id).is_ok());

        let millis: i64 = render("{{unix_time_millis}}", &metadata).parse().unwrap();
        assert!(millis > 1_600_000_000_000);

        let day = render(r#"{{timestamp "%Y"}}"#, &metadata);
        assert_eq!(day.len(), 4);
    }

    #[test]
    fn test_invalid_template_is_configuration_error() {
        let err = UsernameTemplate::compile("{{truncate DisplayName").unwrap_err();
        assert_eq!(err.field(), Some("username_template"));
    }

    #[test]
    fn test_unknown_helper_fails_at_render() {
        let template = UsernameTemplate::compile("{{nope DisplayName}}").unwrap();
        let err = template.generate(&UsernameMetadata::default()).unwrap_err();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
    }

    #[test]
    fn test_empty_result_is_rejected() {
        let template = UsernameTemplate::compile("{{DisplayName}}").unwrap();
        let err = template.generate(&UsernameMetadata::default()).unwrap_err();
        assert!(err.to_string().contains("empty username"));
    }
}
