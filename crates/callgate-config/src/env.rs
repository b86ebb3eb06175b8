use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Matches `{{ env.NAME }}` and `{{ env.NAME | default("value") }}`
fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\{\{\s*([A-Za-z0-9_.]+)\s*(?:\|\s*default\("([^"]*)"\))?\s*\}\}"#)
            .expect("placeholder pattern is valid")
    })
}

/// Expand environment placeholders in raw config text
///
/// Runs before TOML parsing so the config structs only ever see plain
/// strings. Comment lines are left untouched, which lets example configs
/// mention variables that are not set.
pub fn expand_env(input: &str) -> Result<String, String> {
    let mut lines = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_owned());
        } else {
            lines.push(expand_line(line)?);
        }
    }

    let mut output = lines.join("\n");
    if input.ends_with('\n') {
        output.push('\n');
    }

    Ok(output)
}

fn expand_line(line: &str) -> Result<String, String> {
    let mut failure = None;

    let expanded = placeholder().replace_all(line, |captures: &Captures<'_>| {
        match resolve(&captures[1], captures.get(2).map(|m| m.as_str())) {
            Ok(value) => value,
            Err(e) => {
                failure.get_or_insert(e);
                String::new()
            }
        }
    });

    match failure {
        Some(e) => Err(e),
        None => Ok(expanded.into_owned()),
    }
}

fn resolve(key: &str, default: Option<&str>) -> Result<String, String> {
    let Some(name) = key.strip_prefix("env.").filter(|name| !name.contains('.')) else {
        return Err(format!("only variables scoped with 'env.' are supported: `{key}`"));
    };

    match (std::env::var(name), default) {
        (Ok(value), _) => Ok(value),
        (Err(_), Some(default)) => Ok(default.to_owned()),
        (Err(_), None) => Err(format!("environment variable not found: `{name}`")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_without_placeholders_is_unchanged() {
        let input = "[sippy]\ntest_method = \"system.listMethods\"\n";
        assert_eq!(expand_env(input).unwrap(), input);
    }

    #[test]
    fn expands_credentials() {
        let vars = [("SIPPY_RPC_USER", Some("ops")), ("SIPPY_RPC_PASS", Some("hunter22"))];
        temp_env::with_vars(vars, || {
            let result =
                expand_env("username = \"{{ env.SIPPY_RPC_USER }}\"\npassword = \"{{env.SIPPY_RPC_PASS}}\"").unwrap();
            assert_eq!(result, "username = \"ops\"\npassword = \"hunter22\"");
        });
    }

    #[test]
    fn two_placeholders_on_one_line() {
        let vars = [("HOST", Some("pbx.local")), ("PORT", Some("8443"))];
        temp_env::with_vars(vars, || {
            let result = expand_env("base_url = \"https://{{ env.HOST }}:{{ env.PORT }}\"").unwrap();
            assert_eq!(result, "base_url = \"https://pbx.local:8443\"");
        });
    }

    #[test]
    fn missing_variable_is_an_error() {
        temp_env::with_var_unset("ELEVENLABS_API_KEY", || {
            let err = expand_env("api_key = \"{{ env.ELEVENLABS_API_KEY }}\"").unwrap_err();
            assert!(err.contains("ELEVENLABS_API_KEY"));
        });
    }

    #[test]
    fn default_applies_only_when_unset() {
        temp_env::with_var_unset("ADMIN_API_TOKEN", || {
            let result = expand_env("admin_token = \"{{ env.ADMIN_API_TOKEN | default(\"\") }}\"").unwrap();
            assert_eq!(result, "admin_token = \"\"");
        });

        temp_env::with_var("ADMIN_API_TOKEN", Some("s3cret"), || {
            let result = expand_env("admin_token = \"{{ env.ADMIN_API_TOKEN | default(\"x\") }}\"").unwrap();
            assert_eq!(result, "admin_token = \"s3cret\"");
        });
    }

    #[test]
    fn rejects_unscoped_keys() {
        let err = expand_env("key = \"{{ secrets.TOKEN }}\"").unwrap_err();
        assert!(err.contains("only variables scoped with 'env.'"));
    }

    #[test]
    fn comments_are_not_expanded() {
        temp_env::with_var_unset("NOT_SET", || {
            let input = "  # password = \"{{ env.NOT_SET }}\"\nkey = 1";
            assert_eq!(expand_env(input).unwrap(), input);
        });
    }
}
