#![doc = include_str!("../README.md")]

pub mod e_cache;
pub mod e_cli;
pub mod e_collection;
pub mod e_config;
pub mod e_decode;
pub mod e_diagnostic;
pub mod e_linematcher;
pub mod e_outputconsumer;
pub mod e_registry;
pub mod e_reports;
pub mod e_resolver;
pub mod e_runner;
pub mod grammars;

pub use e_cli::Cli;
pub use e_collection::{CollectionSnapshot, DiagnosticCollection};
pub use e_config::DiagnosticsConfig;
pub use e_diagnostic::{DiagnosticSeverity, Position, Range, RawDiagnostic, RawRelated};
pub use e_linematcher::{LineMatch, LineMatcher};
pub use e_outputconsumer::OutputConsumer;
pub use e_registry::GrammarRegistry;
pub use e_resolver::{PathResolver, ResolvedDiagnostic};
