//! Batch scheduler: completeness, progress indexing, failure isolation.

use crate::batch::{BatchScheduler, clean_outputs, discover_jobs};
use crate::cli::progress::format_progress_line;
use crate::error::BuildError;
use crate::tests::test_utils::{FakeCompiler, base_time, set_mtime, test_config, write_shader};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_two_stale_shaders_produce_two_indexed_lines() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let a = write_shader(src.path(), "a.vert", "void main() {}");
    write_shader(src.path(), "b.frag", "void main() {}");

    // a.vert has an output from an earlier build that predates its latest edit.
    let old_output = out.path().join("a.vert.spv");
    fs::write(&old_output, b"old").unwrap();
    set_mtime(&old_output, base_time());
    set_mtime(&a, base_time() + Duration::from_secs(10));

    let config = test_config(src.path(), out.path());
    let compiler = Arc::new(FakeCompiler::new());
    let batch = BatchScheduler::new(compiler.clone(), config.threads).unwrap();
    let jobs = discover_jobs(&config, &config.job_settings()).unwrap();

    let mut lines = Vec::new();
    let outcome = batch
        .run(jobs, |p| lines.push(format_progress_line(p.index, p.total, p.result)))
        .unwrap();

    assert_eq!(outcome.total, 2);
    assert_eq!(outcome.compiled, 2);
    assert_eq!(outcome.skipped, 0);
    assert!(!outcome.failed());

    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("[1/2] Compiled: "));
    assert!(lines[1].starts_with("[2/2] Compiled: "));
    let names: HashSet<&str> = lines.iter().map(|l| l.rsplit(' ').next().unwrap()).collect();
    assert_eq!(names, HashSet::from(["a.vert", "b.frag"]));
}

#[test]
fn test_every_job_reported_exactly_once() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let names = ["a.vert", "b.frag", "c.comp", "d/e.vert", "d/f.frag"];
    for name in names {
        write_shader(src.path(), name, "void main() {}");
    }
    // Two outputs are already up to date.
    for fresh in ["a.vert", "c.comp"] {
        let output = out.path().join(format!("{}.spv", fresh));
        fs::write(&output, b"spv").unwrap();
        set_mtime(&src.path().join(fresh), base_time());
        set_mtime(&output, base_time() + Duration::from_secs(1));
    }

    let config = test_config(src.path(), out.path());
    let compiler = Arc::new(FakeCompiler::new());
    let batch = BatchScheduler::new(compiler.clone(), 3).unwrap();
    let jobs = discover_jobs(&config, &config.job_settings()).unwrap();

    let mut seen: Vec<PathBuf> = Vec::new();
    let mut indexes = Vec::new();
    let outcome = batch
        .run(jobs, |p| {
            seen.push(p.result.source.clone());
            indexes.push(p.index);
        })
        .unwrap();

    assert_eq!(outcome.compiled + outcome.skipped, names.len());
    assert_eq!(outcome.compiled, 3);
    assert_eq!(outcome.skipped, 2);
    assert_eq!(indexes, vec![1, 2, 3, 4, 5]);

    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), names.len());
    assert_eq!(compiler.call_count(), 3);
}

#[test]
fn test_failing_job_does_not_stop_siblings() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    for name in ["a.vert", "broken.frag", "c.comp", "d.vert"] {
        write_shader(src.path(), name, "void main() {}");
    }

    let config = test_config(src.path(), out.path());
    let compiler = Arc::new(FakeCompiler::new().failing("broken.frag"));
    let batch = BatchScheduler::new(compiler.clone(), 2).unwrap();
    let jobs = discover_jobs(&config, &config.job_settings()).unwrap();

    let mut reported = 0;
    let outcome = batch.run(jobs, |_| reported += 1).unwrap();

    assert_eq!(reported, 4);
    assert_eq!(compiler.call_count(), 4);
    assert!(outcome.failed());
    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(outcome.failures.len(), 1);
    assert!(outcome.failures[0].source.ends_with("broken.frag"));
    assert!(outcome.failures[0].message.contains("syntax error"));
    for ok in ["a.vert", "c.comp", "d.vert"] {
        assert!(out.path().join(format!("{}.spv", ok)).exists());
    }
}

#[test]
fn test_environment_error_drains_then_propagates() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    for name in ["a.vert", "b.frag", "c.comp"] {
        write_shader(src.path(), name, "void main() {}");
    }

    let config = test_config(src.path(), out.path());
    let compiler = Arc::new(FakeCompiler::new().fatal("b.frag"));
    let batch = BatchScheduler::new(compiler.clone(), 2).unwrap();
    let jobs = discover_jobs(&config, &config.job_settings()).unwrap();

    let mut reported = Vec::new();
    let err = batch
        .run(jobs, |p| reported.push(p.result.clone()))
        .unwrap_err();

    assert!(matches!(err, BuildError::Spawn { .. }));
    assert_eq!(reported.len(), 3);
    let failed: Vec<_> = reported.iter().filter(|r| !r.is_success()).collect();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].source.ends_with("b.frag"));
}

#[test]
fn test_empty_job_list() {
    let compiler = Arc::new(FakeCompiler::new());
    let batch = BatchScheduler::new(compiler, 4).unwrap();

    let mut called = false;
    let outcome = batch.run(Vec::new(), |_| called = true).unwrap();

    assert_eq!(outcome.total, 0);
    assert!(!outcome.failed());
    assert!(!called);
}

#[test]
fn test_pool_size_follows_thread_count() {
    let batch = BatchScheduler::new(Arc::new(FakeCompiler::new()), 3).unwrap();
    assert_eq!(batch.threads(), 3);
}

#[test]
fn test_force_recompiles_fresh_outputs() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let source = write_shader(src.path(), "a.vert", "void main() {}");
    let output = out.path().join("a.vert.spv");
    fs::write(&output, b"spv").unwrap();
    set_mtime(&source, base_time());
    set_mtime(&output, base_time() + Duration::from_secs(1));

    let config = test_config(src.path(), out.path());
    let compiler = Arc::new(FakeCompiler::new());
    let batch = BatchScheduler::new(compiler.clone(), 1).unwrap();

    let jobs = discover_jobs(&config, &config.job_settings().forced()).unwrap();
    let outcome = batch.run(jobs, |_| {}).unwrap();

    assert_eq!(outcome.compiled, 1);
    assert!(compiler.calls()[0].force);
}

#[test]
fn test_clean_outputs_removes_only_top_level_bytecode() {
    let out = TempDir::new().unwrap();
    fs::write(out.path().join("a.vert.spv"), b"").unwrap();
    fs::write(out.path().join("b.frag.spv"), b"").unwrap();
    fs::write(out.path().join("notes.txt"), b"").unwrap();
    fs::create_dir_all(out.path().join("sub")).unwrap();
    fs::write(out.path().join("sub/c.comp.spv"), b"").unwrap();

    assert_eq!(clean_outputs(out.path()).unwrap(), 2);
    assert!(!out.path().join("a.vert.spv").exists());
    assert!(out.path().join("notes.txt").exists());
    assert!(out.path().join("sub/c.comp.spv").exists());

    assert_eq!(clean_outputs(&out.path().join("missing")).unwrap(), 0);
}
