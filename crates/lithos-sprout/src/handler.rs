// SPDX-License-Identifier: Apache-2.0 OR MIT
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use lithos_gotmpl_engine::{EvalContext, Function, FunctionRegistry, FunctionRegistryBuilder};
use serde_json::Value;

use crate::error::HandlerError;
use crate::notice::Notice;
use crate::registry::{AliasMap, FunctionMap, Registry};

/// Source of "now" for time helpers.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

struct HandlerSettings {
    clock: Clock,
    safe_functions: bool,
    notices: bool,
}

/// Shared, read-only view of the handler settings handed to registries via
/// [`Registry::link_handler`].
#[derive(Clone)]
pub struct HandlerLink {
    settings: Arc<HandlerSettings>,
}

impl HandlerLink {
    /// Current time according to the handler's clock.
    pub fn now(&self) -> DateTime<Utc> {
        (self.settings.clock)()
    }

    pub fn safe_functions(&self) -> bool {
        self.settings.safe_functions
    }

    pub fn notices_enabled(&self) -> bool {
        self.settings.notices
    }
}

impl Default for HandlerLink {
    fn default() -> Self {
        HandlerBuilder::new().link()
    }
}

impl fmt::Debug for HandlerLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerLink")
            .field("safe_functions", &self.settings.safe_functions)
            .field("notices", &self.settings.notices)
            .finish_non_exhaustive()
    }
}

/// Options for a [`Handler`].
pub struct HandlerBuilder {
    clock: Clock,
    safe_functions: bool,
    notices: bool,
}

impl Default for HandlerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerBuilder {
    pub fn new() -> Self {
        Self {
            clock: Arc::new(Utc::now),
            safe_functions: false,
            notices: true,
        }
    }

    /// Also registers a `safe<Name>` variant of every function that logs
    /// failures and yields null instead of aborting the render.
    #[must_use]
    pub fn safe_functions(mut self, enabled: bool) -> Self {
        self.safe_functions = enabled;
        self
    }

    /// Controls whether notices are logged when their functions run.
    #[must_use]
    pub fn notices(mut self, enabled: bool) -> Self {
        self.notices = enabled;
        self
    }

    /// Replaces the system clock, mostly useful for deterministic tests.
    #[must_use]
    pub fn clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    fn link(self) -> HandlerLink {
        HandlerLink {
            settings: Arc::new(HandlerSettings {
                clock: self.clock,
                safe_functions: self.safe_functions,
                notices: self.notices,
            }),
        }
    }

    pub fn build(self) -> Handler {
        Handler {
            link: self.link(),
            registries: Vec::new(),
            uids: BTreeSet::new(),
            functions: FunctionMap::new(),
            aliases: AliasMap::new(),
            notices: Vec::new(),
        }
    }
}

/// Host that owns the function-name table and links registries into it.
///
/// ```
/// use lithos_sprout::{Handler, NumericRegistry};
///
/// let mut handler = Handler::new();
/// handler.add_registry(NumericRegistry::new()).unwrap();
/// let registry = handler.build();
/// assert!(registry.get("add").is_some());
/// ```
pub struct Handler {
    link: HandlerLink,
    registries: Vec<Box<dyn Registry>>,
    uids: BTreeSet<String>,
    functions: FunctionMap,
    aliases: AliasMap,
    notices: Vec<Notice>,
}

impl Default for Handler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler {
    /// Creates a handler with default options.
    pub fn new() -> Self {
        HandlerBuilder::new().build()
    }

    pub fn builder() -> HandlerBuilder {
        HandlerBuilder::new()
    }

    /// Returns the link shared with every registry added to this handler.
    pub fn link(&self) -> HandlerLink {
        self.link.clone()
    }

    /// Links `registry` to this handler and collects its functions, aliases
    /// and notices.
    pub fn add_registry<R>(&mut self, mut registry: R) -> Result<&mut Self, HandlerError>
    where
        R: Registry + 'static,
    {
        let uid = registry.uid().to_string();
        if self.uids.contains(&uid) {
            return Err(HandlerError::DuplicateRegistry { uid });
        }

        registry.link_handler(self.link.clone());

        let mut functions = FunctionMap::new();
        registry.register_functions(&mut functions)?;
        let mut aliases = AliasMap::new();
        registry.register_aliases(&mut aliases)?;
        let mut notices = Vec::new();
        registry.register_notices(&mut notices)?;

        for (name, func) in functions.iter() {
            if self.functions.insert_shared(name.clone(), func.clone()) {
                tracing::warn!(registry = %uid, function = %name, "function overridden by registry");
            }
        }
        self.aliases.merge(aliases);
        self.notices.extend(notices);

        tracing::debug!(registry = %uid, functions = functions.len(), "registry linked");
        self.uids.insert(uid);
        self.registries.push(Box::new(registry));
        Ok(self)
    }

    /// Uids of the linked registries, in registration order.
    pub fn registry_uids(&self) -> Vec<&str> {
        self.registries.iter().map(|registry| registry.uid()).collect()
    }

    pub fn functions(&self) -> &FunctionMap {
        &self.functions
    }

    pub fn aliases(&self) -> &AliasMap {
        &self.aliases
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Registers every collected function and alias into `builder`.
    pub fn install(&self, builder: &mut FunctionRegistryBuilder) {
        for notice in &self.notices {
            for name in &notice.function_names {
                if !self.is_known(name) {
                    tracing::warn!(function = %name, "notice refers to an unknown function");
                }
            }
        }

        for (name, func) in self.functions.iter() {
            self.install_one(builder, name, func.clone());
        }

        for (original, aliases) in self.aliases.iter() {
            let Some(func) = self.functions.get(original) else {
                tracing::warn!(function = %original, "alias target is not registered");
                continue;
            };
            for alias in aliases {
                self.install_one(builder, alias, func.clone());
            }
        }
    }

    /// Builds a registry containing only this handler's functions.
    pub fn build(&self) -> FunctionRegistry {
        let mut builder = FunctionRegistryBuilder::new();
        self.install(&mut builder);
        builder.build()
    }

    fn is_known(&self, name: &str) -> bool {
        self.functions.contains(name) || self.aliases.original_of(name).is_some()
    }

    fn install_one(&self, builder: &mut FunctionRegistryBuilder, name: &str, func: Arc<Function>) {
        let notices: Vec<Notice> = self
            .notices
            .iter()
            .filter(|notice| notice.applies_to(name))
            .cloned()
            .collect();

        let func = if self.link.notices_enabled() && !notices.is_empty() {
            with_notices(name, func, notices)
        } else {
            func
        };

        if self.link.safe_functions() {
            let safe = with_safe_fallback(name, func.clone());
            register_shared(builder, safe_name(name), safe);
        }
        register_shared(builder, name.to_string(), func);
    }
}

fn register_shared(builder: &mut FunctionRegistryBuilder, name: String, func: Arc<Function>) {
    builder.register(name, move |ctx, args| func(ctx, args));
}

fn with_notices(name: &str, func: Arc<Function>, notices: Vec<Notice>) -> Arc<Function> {
    let name = name.to_string();
    Arc::new(move |ctx: &mut EvalContext, args: &[Value]| {
        let result = func(ctx, args);
        let output = result.as_ref().map_or(Value::Null, Clone::clone);
        for notice in &notices {
            notice.emit(&name, &output);
        }
        result
    })
}

fn with_safe_fallback(name: &str, func: Arc<Function>) -> Arc<Function> {
    let name = name.to_string();
    Arc::new(move |ctx: &mut EvalContext, args: &[Value]| match func(ctx, args) {
        Ok(value) => Ok(value),
        Err(err) => {
            tracing::debug!(function = %name, error = %err, "safe function swallowed error");
            Ok(Value::Null)
        }
    })
}

/// `toBool` becomes `safeToBool`.
pub(crate) fn safe_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => format!("safe{}{}", first.to_uppercase(), chars.as_str()),
        None => "safe".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FunctionMap;
    use lithos_gotmpl_engine::{Error, Template};
    use serde_json::json;
    use std::io;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn with_captured_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        let result = tracing::subscriber::with_default(subscriber, f);
        let text = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        (result, text)
    }

    struct EchoRegistry {
        uid: &'static str,
        linked: bool,
    }

    impl Registry for EchoRegistry {
        fn uid(&self) -> &str {
            self.uid
        }

        fn link_handler(&mut self, _link: HandlerLink) {
            self.linked = true;
        }

        fn register_functions(&self, functions: &mut FunctionMap) -> Result<(), HandlerError> {
            assert!(self.linked, "handler must link before registering");
            functions
                .add("echo", |_ctx, args| {
                    Ok(args.first().cloned().unwrap_or(Value::Null))
                })
                .add("boom", |_ctx, _args| Err(Error::render("boom failed", None)));
            Ok(())
        }

        fn register_aliases(&self, aliases: &mut AliasMap) -> Result<(), HandlerError> {
            aliases.add("echo", ["parrot"]).add("missing", ["ghost"]);
            Ok(())
        }

        fn register_notices(&self, notices: &mut Vec<Notice>) -> Result<(), HandlerError> {
            notices.push(Notice::deprecated("parrot", "use `echo`"));
            Ok(())
        }
    }

    struct ShadowRegistry;

    impl Registry for ShadowRegistry {
        fn uid(&self) -> &str {
            "test.shadow"
        }

        fn link_handler(&mut self, _link: HandlerLink) {}

        fn register_functions(&self, functions: &mut FunctionMap) -> Result<(), HandlerError> {
            functions.add("echo", |_ctx, _args| Ok(Value::from("shadow")));
            Ok(())
        }
    }

    fn echo() -> EchoRegistry {
        EchoRegistry {
            uid: "test.echo",
            linked: false,
        }
    }

    fn render(registry: FunctionRegistry, source: &str) -> Result<String, Error> {
        Template::parse_with_functions("handler", source, registry)?.render(&json!({}))
    }

    #[test]
    fn rejects_duplicate_registry_uid() {
        let mut handler = Handler::new();
        handler.add_registry(echo()).unwrap();
        let err = handler.add_registry(echo()).err().unwrap();
        assert_eq!(err.to_string(), "registry \"test.echo\" is already registered");
        assert_eq!(handler.registry_uids(), ["test.echo"]);
    }

    #[test]
    fn aliases_share_the_original_implementation() {
        let mut handler = Handler::new();
        handler.add_registry(echo()).unwrap();
        let registry = handler.build();
        assert_eq!(render(registry.clone(), "{{ parrot \"hi\" }}").unwrap(), "hi");
        assert!(registry.get("ghost").is_none());
    }

    #[test]
    fn safe_variants_turn_errors_into_empty_output() {
        let mut handler = Handler::builder().safe_functions(true).build();
        handler.add_registry(echo()).unwrap();
        let registry = handler.build();

        assert!(render(registry.clone(), "{{ boom }}").is_err());
        assert_eq!(render(registry.clone(), "[{{ safeBoom }}]").unwrap(), "[]");
        assert_eq!(render(registry, "{{ safeParrot \"ok\" }}").unwrap(), "ok");
    }

    #[test]
    fn later_registry_wins_on_duplicate_names() {
        let (registry, logs) = with_captured_logs(|| {
            let mut handler = Handler::new();
            handler
                .add_registry(echo())
                .unwrap()
                .add_registry(ShadowRegistry)
                .unwrap();
            handler.build()
        });
        assert!(logs.contains("function overridden by registry"), "{logs}");
        assert_eq!(render(registry.clone(), "{{ echo \"hi\" }}").unwrap(), "shadow");
        assert_eq!(render(registry, "{{ parrot \"hi\" }}").unwrap(), "shadow");
    }

    #[test]
    fn notices_fire_when_the_function_runs() {
        let mut handler = Handler::new();
        handler.add_registry(echo()).unwrap();
        let registry = handler.build();

        let (rendered, logs) =
            with_captured_logs(|| render(registry.clone(), "{{ echo \"hi\" }}"));
        assert_eq!(rendered.unwrap(), "hi");
        assert!(!logs.contains("deprecated"), "{logs}");

        let (rendered, logs) =
            with_captured_logs(|| render(registry, "{{ parrot \"hi\" }}"));
        assert_eq!(rendered.unwrap(), "hi");
        assert!(logs.contains("WARN"), "{logs}");
        assert!(
            logs.contains("Template function `parrot` is deprecated: use `echo`"),
            "{logs}"
        );
    }

    #[test]
    fn disabled_notices_leave_functions_unwrapped() {
        let mut handler = Handler::builder().notices(false).build();
        handler.add_registry(echo()).unwrap();
        let registry = handler.build();

        let (rendered, logs) =
            with_captured_logs(|| render(registry, "{{ parrot \"hi\" }}"));
        assert_eq!(rendered.unwrap(), "hi");
        assert!(!logs.contains("is deprecated"), "{logs}");
    }

    #[test]
    fn safe_variants_are_opt_in() {
        let mut handler = Handler::new();
        handler.add_registry(echo()).unwrap();
        assert!(handler.build().get("safeEcho").is_none());
    }

    #[test]
    fn safe_name_capitalises_first_letter() {
        assert_eq!(safe_name("toBool"), "safeToBool");
        assert_eq!(safe_name("date_in_zone"), "safeDate_in_zone");
    }

    #[test]
    fn linked_clock_is_shared() {
        let fixed = DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let handler = Handler::builder().clock(move || fixed).build();
        assert_eq!(handler.link().now(), fixed);
    }
}
