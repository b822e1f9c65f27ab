//! Named, enumerable set of grammars.
//!
//! The registry stores factories rather than matcher instances: every run
//! (and every output channel within a run) gets its own fresh state.

use crate::e_linematcher::LineMatcher;
use crate::grammars::{
    CMakeParser, DiabParser, GccParser, GhsParser, GnuLdParser, IarParser, IwyuParser,
    MsvcParser,
};

pub type GrammarFactory = Box<dyn Fn() -> Box<dyn LineMatcher> + Send + Sync>;

struct Entry {
    name: String,
    factory: GrammarFactory,
}

pub struct GrammarRegistry {
    entries: Vec<Entry>,
    enabled: Option<Vec<String>>,
}

impl std::fmt::Debug for GrammarRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrammarRegistry")
            .field("names", &self.names())
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl Default for GrammarRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl GrammarRegistry {
    /// An empty registry. Useful for tests and for hosts that bring their own grammars.
    pub fn empty() -> Self {
        GrammarRegistry {
            entries: Vec::new(),
            enabled: None,
        }
    }

    /// Every built-in grammar, in dispatch order.
    pub fn with_builtin() -> Self {
        let mut reg = Self::empty();
        reg.register("gcc", || Box::new(GccParser::new()));
        reg.register("gnuld", || Box::new(GnuLdParser::new()));
        reg.register("msvc", || Box::new(MsvcParser::new()));
        reg.register("ghs", || Box::new(GhsParser::new()));
        reg.register("diab", || Box::new(DiabParser::new()));
        reg.register("iar", || Box::new(IarParser::new()));
        reg.register("iwyu", || Box::new(IwyuParser::new()));
        reg.register("cmake", || Box::new(CMakeParser::new()));
        reg
    }

    /// Add (or replace) a grammar under `name`. Names are case-insensitive.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn LineMatcher> + Send + Sync + 'static,
    {
        let name = name.to_lowercase();
        let factory: GrammarFactory = Box::new(factory);
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(existing) => existing.factory = factory,
            None => self.entries.push(Entry { name, factory }),
        }
    }

    /// Restrict to an explicit allow-list; `None` enables everything.
    ///
    /// Unknown names are logged and ignored.
    pub fn with_allow_list(mut self, allow: Option<&[String]>) -> Self {
        self.enabled = allow.map(|names| {
            names
                .iter()
                .map(|n| n.trim().to_lowercase())
                .filter(|n| !n.is_empty())
                .filter(|n| {
                    let known = self.entries.iter().any(|e| &e.name == n);
                    if !known {
                        log::warn!("unknown output parser '{}' ignored", n);
                    }
                    known
                })
                .collect()
        });
        self
    }

    /// All registered names, in dispatch order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        match &self.enabled {
            None => self.entries.iter().any(|e| e.name == name),
            Some(list) => list.contains(&name),
        }
    }

    /// Enabled names, in dispatch order.
    pub fn enabled_names(&self) -> Vec<&str> {
        self.names()
            .into_iter()
            .filter(|n| self.is_enabled(n))
            .collect()
    }

    /// A fresh matcher for every enabled grammar, in dispatch order.
    pub fn instantiate(&self) -> Vec<Box<dyn LineMatcher>> {
        self.entries
            .iter()
            .filter(|e| self.is_enabled(&e.name))
            .map(|e| (e.factory)())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::e_linematcher::LineMatch;

    struct Always;

    impl LineMatcher for Always {
        fn name(&self) -> &'static str {
            "always"
        }
        fn parse_line(&mut self, _line: &str) -> LineMatch {
            LineMatch::claimed()
        }
    }

    #[test]
    fn test_builtin_order() {
        let reg = GrammarRegistry::with_builtin();
        assert_eq!(
            reg.names(),
            vec!["gcc", "gnuld", "msvc", "ghs", "diab", "iar", "iwyu", "cmake"]
        );
        let names: Vec<&str> = reg.instantiate().iter().map(|m| m.name()).collect();
        assert_eq!(names, reg.names());
    }

    #[test]
    fn test_allow_list_is_case_insensitive_and_skips_unknown() {
        let allow = vec!["MSVC".to_string(), "bogus".to_string(), " gcc ".to_string()];
        let reg = GrammarRegistry::with_builtin().with_allow_list(Some(allow.as_slice()));
        // Dispatch order comes from registration, not from the allow-list.
        assert_eq!(reg.enabled_names(), vec!["gcc", "msvc"]);
        assert!(!reg.is_enabled("cmake"));
    }

    #[test]
    fn test_empty_allow_list_disables_everything() {
        let none: Vec<String> = Vec::new();
        let reg = GrammarRegistry::with_builtin().with_allow_list(Some(none.as_slice()));
        assert!(reg.instantiate().is_empty());
    }

    #[test]
    fn test_register_custom_grammar() {
        let mut reg = GrammarRegistry::empty();
        reg.register("Always", || Box::new(Always));
        assert_eq!(reg.names(), vec!["always"]);
        let mut matchers = reg.instantiate();
        assert!(matchers[0].parse_line("anything").matched);
    }

    #[test]
    fn test_instances_are_fresh() {
        let reg = GrammarRegistry::with_builtin();
        let mut first = reg.instantiate();
        first[0].parse_line("main.c:1:1: error: pending");
        let mut second = reg.instantiate();
        assert!(second[0].flush().is_none());
        assert!(first[0].flush().is_some());
    }
}
