//! Environment lookups and `${NAME}` expansion for configured file paths.

use std::collections::HashMap;

use tracing::warn;

use crate::traits::Environment;

/// Environment backed by the running process.
///
/// Properties registered on the instance shadow environment variables of the same
/// name.
#[derive(Debug, Clone, Default)]
pub struct SystemEnvironment {
    properties: HashMap<String, String>,
}

impl SystemEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }
}

impl Environment for SystemEnvironment {
    fn lookup(&self, name: &str) -> Option<String> {
        self.properties
            .get(name)
            .cloned()
            .or_else(|| std::env::var(name).ok())
    }

    fn process_id(&self) -> u32 {
        std::process::id()
    }
}

/// Fixed set of variables and a fixed process id.
#[derive(Debug, Clone)]
pub struct StaticEnvironment {
    variables: HashMap<String, String>,
    process_id: u32,
}

impl StaticEnvironment {
    pub fn new(process_id: u32) -> Self {
        Self {
            variables: HashMap::new(),
            process_id,
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }
}

impl Environment for StaticEnvironment {
    fn lookup(&self, name: &str) -> Option<String> {
        self.variables.get(name).cloned()
    }

    fn process_id(&self) -> u32 {
        self.process_id
    }
}

/// Replaces every `${NAME}` in `template` with its value from `env`.
///
/// Undefined names, empty names and a missing closing brace are reported as
/// warnings and the literal text is kept. This never fails.
pub fn expand_variables(template: &str, env: &dyn Environment) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let Some(end) = after.find('}') else {
            warn!("Missing closing brace in '{}', keeping it unresolved", template);
            output.push_str(&rest[start..]);
            return output;
        };

        let name = &after[..end];
        let literal = &rest[start..start + 2 + end + 1];

        if name.trim().is_empty() {
            warn!("Empty variable name in '{}', keeping it unresolved", template);
            output.push_str(literal);
        } else {
            match env.lookup(name.trim()) {
                Some(value) => output.push_str(&value),
                None => {
                    warn!("Variable '{}' is not defined, keeping '{}' in path", name, literal);
                    output.push_str(literal);
                }
            }
        }

        rest = &after[end + 1..];
    }

    output.push_str(rest);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn env() -> StaticEnvironment {
        StaticEnvironment::new(42)
            .with_variable("HOME", "/home/app")
            .with_variable("APP", "billing")
    }

    #[test]
    fn test_expand_known_variables() {
        let path = expand_variables("${HOME}/logs/${APP}.log", &env());
        assert_eq!(path, "/home/app/logs/billing.log");
    }

    #[test]
    fn test_text_without_placeholders_is_untouched() {
        assert_eq!(expand_variables("logs/app.log", &env()), "logs/app.log");
        assert_eq!(expand_variables("", &env()), "");
        assert_eq!(expand_variables("cost $5 {x}", &env()), "cost $5 {x}");
    }

    #[traced_test]
    #[test]
    fn test_undefined_variable_is_kept_verbatim() {
        let path = expand_variables("${MISSING}/app.log", &env());
        assert_eq!(path, "${MISSING}/app.log");
        assert!(logs_contain("MISSING"));
    }

    #[traced_test]
    #[test]
    fn test_empty_name_is_kept_verbatim() {
        let path = expand_variables("logs/${}/app.log", &env());
        assert_eq!(path, "logs/${}/app.log");
        assert!(logs_contain("Empty variable name"));
    }

    #[traced_test]
    #[test]
    fn test_missing_closing_brace_is_kept_verbatim() {
        let path = expand_variables("${HOME}/logs/${APP.log", &env());
        assert_eq!(path, "/home/app/logs/${APP.log");
        assert!(logs_contain("Missing closing brace"));
    }

    #[test]
    fn test_system_properties_shadow_environment() {
        let env = SystemEnvironment::new().with_property("PATH", "overridden");
        assert_eq!(env.lookup("PATH").as_deref(), Some("overridden"));
        assert_eq!(env.process_id(), std::process::id());
    }
}
