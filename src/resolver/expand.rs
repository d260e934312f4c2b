//! Placeholder expansion over the preference store.
//!
//! A template such as
//!
//! ```text
//! tools.avrdude.upload.pattern="{cmd.path}" "-C{config.path}" {upload.verbose} -p{build.mcu}
//! ```
//!
//! is expanded by looking each `{name}` up with a scoped search relative to
//! the key being expanded (`tools.avrdude.upload.pattern`):
//!
//! 1. `name` itself. A two-segment `A.B` whose `A` equals the owning segment
//!    of the key (`upload` here) first checks `<parent>.params.B`, so a
//!    recipe instance can override a generic parameter.
//! 2. `<parent>.name` (`tools.avrdude.upload.name`).
//! 3. `<grandparent>.name` (`tools.avrdude.name`).
//!
//! Unresolvable placeholders are left in place. Every nested template is
//! scoped by the key the caller asked for, never by the intermediate key,
//! which is what makes `{path}` inside `tools.avrdude.cmd.path` find
//! `tools.avrdude.path`.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::core::platform::HostPlatform;
use crate::core::prefs::PreferenceStore;

use super::errors::ExpandError;

/// Key holding the active sketch file name; computed per expansion.
pub const PROJECT_NAME_KEY: &str = "build.project_name";

/// Key holding the per-sketch build directory; computed per expansion.
pub const BUILD_PATH_KEY: &str = "build.path";

/// Maximum placeholder nesting before expansion gives up.
const MAX_DEPTH: usize = 64;

/// Scope derived from the key being expanded.
#[derive(Debug)]
struct Scope<'k> {
    parent: Option<String>,
    grandparent: Option<String>,
    /// Segment at position `len - 2`, compared against `A` in `{A.B}`.
    owner: Option<&'k str>,
}

impl<'k> Scope<'k> {
    fn of(key: &'k str) -> Self {
        let parts: Vec<&str> = key.split('.').collect();
        let n = parts.len();
        Scope {
            parent: (n > 1).then(|| parts[..n - 1].join(".")),
            grandparent: (n > 2).then(|| parts[..n - 2].join(".")),
            owner: (n > 1).then(|| parts[n - 2]),
        }
    }
}

/// Expands preference templates.
///
/// Cheap to build; construct one per invocation so live keys
/// ([`PROJECT_NAME_KEY`], [`BUILD_PATH_KEY`]) always reflect the current
/// sketch.
#[derive(Debug, Clone)]
pub struct Expander<'a> {
    store: &'a PreferenceStore,
    platform: HostPlatform,
    live: HashMap<&'static str, String>,
}

impl<'a> Expander<'a> {
    pub fn new(store: &'a PreferenceStore, platform: HostPlatform) -> Self {
        Expander {
            store,
            platform,
            live: HashMap::new(),
        }
    }

    /// Set the active sketch file name (`build.project_name`).
    pub fn with_project_name(mut self, name: impl Into<String>) -> Self {
        self.live.insert(PROJECT_NAME_KEY, name.into());
        self
    }

    /// Set the active build directory (`build.path`).
    pub fn with_build_path(mut self, path: impl Into<String>) -> Self {
        self.live.insert(BUILD_PATH_KEY, path.into());
        self
    }

    fn raw(&self, key: &str) -> Option<Cow<'_, str>> {
        if let Some(v) = self.live.get(key) {
            return Some(Cow::Borrowed(v.as_str()));
        }
        self.store.get(key).map(Cow::Borrowed)
    }

    fn has(&self, key: &str) -> bool {
        self.live.contains_key(key) || self.store.contains(key)
    }

    /// Expand `key`, returning an empty string when it is absent.
    ///
    /// A placeholder cycle or runaway nesting is logged and also yields an
    /// empty string.
    pub fn expand(&self, key: &str) -> String {
        match self.try_expand(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("cannot expand `{}`: {}", key, e);
                String::new()
            }
        }
    }

    /// Expand `key`, reporting cycles and runaway nesting.
    pub fn try_expand(&self, key: &str) -> Result<String, ExpandError> {
        let Some(raw) = self.raw(key) else {
            return Ok(String::new());
        };
        let scope = Scope::of(key);
        let mut stack = vec![key.to_string()];
        self.expand_value(&raw, &scope, &mut stack)
    }

    fn expand_value(
        &self,
        value: &str,
        scope: &Scope<'_>,
        stack: &mut Vec<String>,
    ) -> Result<String, ExpandError> {
        if stack.len() > MAX_DEPTH {
            return Err(ExpandError::DepthExceeded {
                key: stack[0].clone(),
            });
        }

        let mut out = String::with_capacity(value.len());
        let mut rest = value;

        while let Some(open) = rest.find('{') {
            let Some(len) = rest[open + 1..].find('}') else {
                break;
            };
            let close = open + 1 + len;
            let name = &rest[open + 1..close];
            out.push_str(&rest[..open]);

            match self.resolve_name(name, scope) {
                Some(target) => {
                    if stack.contains(&target) {
                        let mut chain = stack.clone();
                        chain.push(target);
                        return Err(ExpandError::Cycle { chain });
                    }
                    let (raw, suffix) = self.adjusted(&target);
                    stack.push(target);
                    let expanded = self.expand_value(&raw, scope, stack)?;
                    stack.pop();
                    out.push_str(&expanded);
                    out.push_str(suffix);
                }
                None => out.push_str(&rest[open..=close]),
            }

            rest = &rest[close + 1..];
        }

        out.push_str(rest);
        Ok(out)
    }

    /// Find the key a placeholder name refers to, if any.
    fn resolve_name(&self, name: &str, scope: &Scope<'_>) -> Option<String> {
        if self.has(name) {
            if let (Some((head, tail)), Some(owner), Some(parent)) =
                (two_segments(name), scope.owner, scope.parent.as_deref())
            {
                if head == owner {
                    let over = format!("{}.params.{}", parent, tail);
                    if self.has(&over) {
                        return Some(over);
                    }
                }
            }
            return Some(name.to_string());
        }

        [scope.parent.as_deref(), scope.grandparent.as_deref()]
            .into_iter()
            .flatten()
            .map(|prefix| format!("{}.{}", prefix, name))
            .find(|candidate| self.has(candidate))
    }

    /// Raw value for a resolved key plus the suffix to append after
    /// expansion.
    ///
    /// An OS-specific variant (`key.linux`) wins outright. Otherwise command
    /// keys (`*.cmd`, `*.cmd.*`) get the executable suffix.
    fn adjusted(&self, key: &str) -> (String, &'static str) {
        if let Some(os) = self.platform.os_suffix() {
            if let Some(v) = self.raw(&format!("{}{}", key, os)) {
                return (v.into_owned(), "");
            }
        }
        let raw = self.raw(key).map(Cow::into_owned).unwrap_or_default();
        if key.ends_with(".cmd") || key.contains(".cmd.") {
            (raw, self.platform.exe_suffix())
        } else {
            (raw, "")
        }
    }
}

fn two_segments(name: &str) -> Option<(&str, &str)> {
    let (head, tail) = name.split_once('.')?;
    (!tail.contains('.')).then_some((head, tail))
}
