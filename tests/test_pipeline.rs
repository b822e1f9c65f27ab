mod common;

use std::fs;

use cmake_e::e_collection::DiagnosticCollection;
use cmake_e::e_runner::replay_log;
use cmake_e::{DiagnosticSeverity, DiagnosticsConfig, GrammarRegistry, OutputConsumer, PathResolver};
use common::test_utils::BuildTree;

fn config_for(tree: &BuildTree) -> DiagnosticsConfig {
    DiagnosticsConfig {
        linker_errors_dir: Some(tree.linker_dir.clone()),
        ..DiagnosticsConfig::default()
    }
}

#[test]
fn test_gcc_error_resolves_against_binary_then_source() -> anyhow::Result<()> {
    let tree = BuildTree::new()?;
    let main_c = tree.write_source("main.c", "#include \"some_header.h\"\n")?;
    let log = tree.write_log(&[
        "[ 50%] Building C object CMakeFiles/app.dir/main.c.o",
        "main.c:1:10: fatal error: some_header.h: No such file or directory",
        "compilation terminated.",
        "make[2]: *** [CMakeFiles/app.dir/build.make:76: CMakeFiles/app.dir/main.c.o] Error 1",
    ])?;

    let config = config_for(&tree);
    let mut consumer = config.consumer();
    replay_log(&log, &mut consumer)?;
    let resolved = consumer.resolve_diagnostics(&config.resolver(), &tree.base_dirs())?;

    assert_eq!(resolved.len(), 1);
    let r = &resolved[0];
    assert_eq!(r.path, main_c);
    assert_eq!(r.location.start.line, 0);
    assert_eq!(r.location.start.character, 9);
    assert_eq!(r.diagnostic.severity, "fatal error");
    assert_eq!(r.diagnostic.classification(), Some(DiagnosticSeverity::Error));
    assert!(!r.synthetic);
    assert!(!tree.linker_errors_file().exists());
    Ok(())
}

#[test]
fn test_msvc_link_error_lands_in_linker_errors_file() -> anyhow::Result<()> {
    let tree = BuildTree::new()?;
    let config = config_for(&tree);
    let mut consumer = config.consumer();
    consumer.output("main.obj : error LNK2019: unresolved external symbol _foo referenced in function _main");
    consumer.finish();

    let resolved = consumer.resolve_diagnostics(&config.resolver(), &tree.base_dirs())?;
    assert_eq!(resolved.len(), 1);
    assert!(resolved[0].synthetic);
    assert_eq!(resolved[0].path, tree.linker_errors_file());
    assert_eq!(resolved[0].location.start.line, 0);

    let text = fs::read_to_string(tree.linker_errors_file())?;
    assert!(text.contains("LNK2019"));
    assert!(text.contains("unresolved external symbol _foo"));
    Ok(())
}

#[test]
fn test_orphans_get_distinct_anchor_lines() -> anyhow::Result<()> {
    let tree = BuildTree::new()?;
    let config = config_for(&tree);
    let mut consumer = config.consumer();
    for sym in ["a", "b", "c"] {
        consumer.output(&format!("main.obj : error LNK2019: unresolved external symbol _{}", sym));
    }
    consumer.finish();

    let resolved = consumer.resolve_diagnostics(&config.resolver(), &tree.base_dirs())?;
    let lines: Vec<u32> = resolved.iter().map(|r| r.location.start.line).collect();
    assert_eq!(lines, vec![0, 5, 10]);

    let text = fs::read_to_string(tree.linker_errors_file())?;
    let file_lines: Vec<&str> = text.lines().collect();
    for r in &resolved {
        let anchor = r.location.start.line as usize;
        assert!(file_lines[anchor].starts_with("Linker error #"));
    }
    Ok(())
}

#[test]
fn test_makefile_error_points_at_the_makefile() -> anyhow::Result<()> {
    let tree = BuildTree::new()?;
    let makefile = tree.binary_dir.join("Makefile");
    fs::write(&makefile, "all:\n")?;
    let config = config_for(&tree);
    let mut consumer = config.consumer();
    consumer.output("Makefile:12: *** missing separator.  Stop.");
    consumer.finish();

    let resolved = consumer.resolve_diagnostics(&config.resolver(), &tree.base_dirs())?;
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].path, makefile);
    assert_eq!(resolved[0].location.start.line, 11);
    assert!(!resolved[0].synthetic);
    assert!(!tree.linker_errors_file().exists());
    Ok(())
}

#[test]
fn test_resolution_is_idempotent() -> anyhow::Result<()> {
    let tree = BuildTree::new()?;
    let config = config_for(&tree);
    let mut consumer = config.consumer();
    consumer.output("LINK : fatal error LNK1104: cannot open file 'foo.lib'");
    consumer.error("main.c:2:1: warning: unused variable 'x'");
    consumer.finish();

    let resolver = config.resolver();
    let first = consumer.resolve_diagnostics(&resolver, &tree.base_dirs())?;
    let first_text = fs::read_to_string(tree.linker_errors_file())?;
    let second = consumer.resolve_diagnostics(&resolver, &tree.base_dirs())?;
    let second_text = fs::read_to_string(tree.linker_errors_file())?;
    assert_eq!(first, second);
    assert_eq!(first_text, second_text);
    Ok(())
}

#[test]
fn test_cmake_warning_resolves_to_source_lists_file() -> anyhow::Result<()> {
    let tree = BuildTree::new()?;
    let config = config_for(&tree);
    let mut consumer = config.consumer();
    for line in [
        "-- Configuring done",
        "CMake Warning at CMakeLists.txt:2 (message):",
        "  I am a warning!",
        "",
        "",
        "-- Generating done",
    ] {
        consumer.output(line);
    }
    consumer.finish();

    let resolved = consumer.resolve_diagnostics(&config.resolver(), &tree.base_dirs())?;
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].path, tree.source_dir.join("CMakeLists.txt"));
    assert_eq!(resolved[0].location.start.line, 1);
    assert_eq!(resolved[0].diagnostic.source, "CMake (message)");
    assert_eq!(resolved[0].diagnostic.message, "I am a warning!");
    Ok(())
}

#[test]
fn test_mixed_channels_into_collection() -> anyhow::Result<()> {
    let tree = BuildTree::new()?;
    tree.write_source("main.c", "int main(void) { return 0; }\n")?;
    tree.write_source("util.c", "int util;\n")?;
    let config = config_for(&tree);
    let mut consumer = config.consumer();

    consumer.output("[ 33%] Building C object CMakeFiles/app.dir/main.c.o");
    consumer.error("main.c:1:5: error: expected ';' before '}' token");
    consumer.output("[ 66%] Building C object CMakeFiles/app.dir/util.c.o");
    consumer.error("util.c:1:5: warning: unused variable 'util'");
    consumer.error("util.c:1:5: warning: unused variable 'util'");
    consumer.output("main.obj : error LNK2019: unresolved external symbol _bar");
    consumer.finish();

    let resolved = consumer.resolve_diagnostics(&config.resolver(), &tree.base_dirs())?;
    assert_eq!(resolved.len(), 3);

    let mut collection = DiagnosticCollection::new("build");
    collection.populate(&resolved);
    assert_eq!(collection.file_count(), 3);
    let snapshot = collection.snapshot();
    assert_eq!(snapshot.error_count(), 2);
    assert_eq!(snapshot.warning_count(), 1);
    assert_eq!(snapshot.total(), 3);
    assert_eq!(collection.get(&tree.source_dir.join("util.c")).len(), 1);
    Ok(())
}

#[test]
fn test_stale_linker_errors_removed_on_clean_build() -> anyhow::Result<()> {
    let tree = BuildTree::new()?;
    let resolver = PathResolver::new(&tree.linker_dir);

    let mut failing = OutputConsumer::new(&GrammarRegistry::with_builtin());
    failing.output("main.obj : error LNK2019: unresolved external symbol _foo");
    failing.finish();
    failing.resolve_diagnostics(&resolver, &tree.base_dirs())?;
    assert!(tree.linker_errors_file().exists());

    let mut clean = OutputConsumer::new(&GrammarRegistry::with_builtin());
    clean.output("[100%] Built target app");
    clean.finish();
    let resolved = clean.resolve_diagnostics(&resolver, &tree.base_dirs())?;
    assert!(resolved.is_empty());
    assert!(!tree.linker_errors_file().exists());
    Ok(())
}

#[test]
fn test_allow_list_restricts_grammars() -> anyhow::Result<()> {
    let tree = BuildTree::new()?;
    let config = DiagnosticsConfig {
        enabled_output_parsers: Some(vec!["cmake".to_string()]),
        ..config_for(&tree)
    };
    let mut consumer = config.consumer();
    consumer.error("main.c:1:5: error: expected ';'");
    consumer.output("CMake Error at CMakeLists.txt:3 (add_executable):");
    consumer.output("  Cannot find source file:");
    consumer.finish();

    let diags = consumer.diagnostics();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].source, "CMake (add_executable)");
    Ok(())
}

#[test]
fn test_disabled_config_collects_nothing() -> anyhow::Result<()> {
    let tree = BuildTree::new()?;
    let config = DiagnosticsConfig {
        parse_build_diagnostics: false,
        ..config_for(&tree)
    };
    let mut consumer = config.consumer();
    assert!(!consumer.is_enabled());
    consumer.error("main.c:1:5: error: expected ';'");
    consumer.finish();
    assert!(consumer.diagnostics().is_empty());
    Ok(())
}
