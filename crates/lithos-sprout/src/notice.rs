// SPDX-License-Identifier: Apache-2.0 OR MIT
use lithos_gotmpl_engine::value_to_string;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Severity of a [`Notice`]; decides the log level used when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Info,
    Deprecated,
    /// Debug notices may reference the function result with `$out`.
    Debug,
}

impl fmt::Display for NoticeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NoticeKind::Info => "INFO",
            NoticeKind::Deprecated => "DEPRECATED",
            NoticeKind::Debug => "DEBUG",
        })
    }
}

/// An annotation attached to one or more function names, logged every time
/// one of those functions is called from a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub function_names: Vec<String>,
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn new(kind: NoticeKind, function_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            function_names: vec![function_name.into()],
            kind,
            message: message.into(),
        }
    }

    pub fn info(function_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Info, function_name, message)
    }

    pub fn deprecated(function_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Deprecated, function_name, message)
    }

    pub fn debug(function_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Debug, function_name, message)
    }

    /// Attaches the notice to an additional function name.
    #[must_use]
    pub fn with_function(mut self, function_name: impl Into<String>) -> Self {
        self.function_names.push(function_name.into());
        self
    }

    pub fn applies_to(&self, function_name: &str) -> bool {
        self.function_names.iter().any(|name| name == function_name)
    }

    /// Formats the log line for a call to `function_name` that produced `output`.
    pub fn render(&self, function_name: &str, output: &Value) -> String {
        match self.kind {
            NoticeKind::Info => format!("[{}] {}", self.kind, self.message),
            NoticeKind::Deprecated => format!(
                "[{}] Template function `{function_name}` is deprecated: {}",
                self.kind, self.message
            ),
            NoticeKind::Debug => format!(
                "[{}] {}",
                self.kind,
                self.message.replace("$out", &value_to_string(output))
            ),
        }
    }

    pub(crate) fn emit(&self, function_name: &str, output: &Value) {
        let line = self.render(function_name, output);
        match self.kind {
            NoticeKind::Info => tracing::info!(function = function_name, "{line}"),
            NoticeKind::Deprecated => tracing::warn!(function = function_name, "{line}"),
            NoticeKind::Debug => tracing::debug!(function = function_name, "{line}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deprecated_notice_names_the_called_function() {
        let notice = Notice::deprecated("toDecimal", "use `toOctal` instead");
        assert_eq!(
            notice.render("toDecimal", &Value::Null),
            "[DEPRECATED] Template function `toDecimal` is deprecated: use `toOctal` instead"
        );
    }

    #[test]
    fn debug_notice_substitutes_output() {
        let notice = Notice::debug("toOctal", "converted to $out");
        assert_eq!(notice.render("toOctal", &json!(511)), "[DEBUG] converted to 511");
    }

    #[test]
    fn kinds_use_lowercase_names() {
        let kind: NoticeKind = serde_json::from_value(json!("deprecated")).unwrap();
        assert_eq!(kind, NoticeKind::Deprecated);
        assert_eq!(serde_json::to_value(NoticeKind::Info).unwrap(), json!("info"));
    }

    #[test]
    fn notice_can_cover_several_functions() {
        let notice = Notice::info("date_in_zone", "snake case").with_function("date_modify");
        assert!(notice.applies_to("date_modify"));
        assert!(notice.applies_to("date_in_zone"));
        assert!(!notice.applies_to("date"));
    }
}
