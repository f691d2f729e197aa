//! Watch-mode diff scenarios: tri-state outcomes and ledger attribution.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use mundler::{
    BundleConfig, BundleContext, ChangeDiffEngine, ChangeOutcome, DependencyResolver,
    ProjectManifest,
};

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

fn context(dir: &TempDir) -> BundleContext {
    let props = BundleConfig {
        cwd: Some(dir.path().to_path_buf()),
        extensions: vec!["js".to_string()],
        ..BundleConfig::default()
    };
    BundleContext::new("test", &props, &ProjectManifest::default())
}

#[tokio::test]
async fn sole_user_edit_crosses_zero_and_spares_other_modules() {
    let dir = TempDir::new().unwrap();
    let main = write(&dir, "main.js", "require('chai');\nrequire('sinon');\n");

    let mut ctx = context(&dir);
    DependencyResolver::resolve(&mut ctx, vec![main.clone()])
        .await
        .unwrap();
    assert_eq!(ctx.ledger.count("sinon"), 1);

    write(&dir, "main.js", "require('chai');\n");
    let outcome = ChangeDiffEngine::on_file_changed(&mut ctx, &main).await;

    assert_eq!(outcome, ChangeOutcome::Removed(vec!["sinon".to_string()]));
    assert_eq!(ctx.ledger.count("chai"), 1);
    assert!(
        !ctx.ledger
            .external_modules(&Default::default())
            .contains(&"sinon".to_string())
    );
}

#[tokio::test]
async fn same_edit_with_a_second_user_is_absorbed() {
    let dir = TempDir::new().unwrap();
    let a = write(&dir, "a.js", "require('chai');\nrequire('sinon');\n");
    let b = write(&dir, "b.js", "require('sinon');\n");

    let mut ctx = context(&dir);
    DependencyResolver::resolve(&mut ctx, vec![a.clone(), b])
        .await
        .unwrap();
    assert_eq!(ctx.ledger.count("sinon"), 2);

    write(&dir, "a.js", "require('chai');\n");
    let outcome = ChangeDiffEngine::on_file_changed(&mut ctx, &a).await;

    // Count drops from 2 to 1: no zero-crossing, vendor bundle untouched.
    assert_eq!(outcome, ChangeOutcome::None);
    assert!(
        ctx.ledger
            .external_modules(&Default::default())
            .contains(&"sinon".to_string())
    );
}

#[tokio::test]
async fn externals_are_attributed_to_the_leaf_file_that_references_them() {
    let dir = TempDir::new().unwrap();
    let top = write(&dir, "top.js", "require('./leaf');\nrequire('chai');\n");
    let leaf = write(&dir, "leaf.js", "require('sinon');\n");

    let mut ctx = context(&dir);
    DependencyResolver::resolve(&mut ctx, vec![top.clone()])
        .await
        .unwrap();

    // `sinon` belongs to leaf.js, not to the top-level file that pulled the
    // leaf in; editing the top file therefore cannot drop it.
    assert!(ctx.ledger.file_set(&leaf).unwrap().contains("sinon"));
    assert!(!ctx.ledger.file_set(&top).unwrap().contains("sinon"));

    write(&dir, "top.js", "require('chai');\n");
    let outcome = ChangeDiffEngine::on_file_changed(&mut ctx, &top).await;
    assert_eq!(outcome, ChangeOutcome::None);
    assert_eq!(ctx.ledger.count("sinon"), 1);

    // Editing the leaf itself is what drops the module.
    write(&dir, "leaf.js", "");
    let outcome = ChangeDiffEngine::on_file_changed(&mut ctx, &leaf).await;
    assert_eq!(outcome, ChangeOutcome::Removed(vec!["sinon".to_string()]));
}

#[tokio::test]
async fn edit_sequence_keeps_the_projection_consistent() {
    let dir = TempDir::new().unwrap();
    let a = write(&dir, "a.js", "require('chai');\n");
    let b = write(&dir, "b.js", "require('sinon');\n");

    let mut ctx = context(&dir);
    DependencyResolver::resolve(&mut ctx, vec![a.clone(), b.clone()])
        .await
        .unwrap();

    write(&dir, "a.js", "require('chai');\nrequire('react');\n");
    assert_eq!(
        ChangeDiffEngine::on_file_changed(&mut ctx, &a).await,
        ChangeOutcome::Added(vec!["react".to_string()])
    );

    write(&dir, "b.js", "require('react');\n");
    assert_eq!(
        ChangeDiffEngine::on_file_changed(&mut ctx, &b).await,
        ChangeOutcome::Removed(vec!["sinon".to_string()])
    );

    assert_eq!(
        ctx.ledger.external_modules(&Default::default()),
        vec!["chai", "react"]
    );
}

#[tokio::test]
async fn ignored_file_edit_never_changes_the_external_set() {
    let dir = TempDir::new().unwrap();
    let main = write(&dir, "main.js", "require('chai');\n");
    let skipped = write(&dir, "skip.js", "require('mocha');\n");

    let mut ctx = context(&dir);
    ctx.ignore_files = vec!["skip.js".to_string()];
    DependencyResolver::resolve(&mut ctx, vec![main, skipped.clone()])
        .await
        .unwrap();
    assert_eq!(ctx.ledger.count("mocha"), 0);

    // An edit to the excluded file must not leak its externals into the
    // ledger or trigger a vendor rebuild.
    write(&dir, "skip.js", "require('mocha');\nrequire('immutable');\n");
    let outcome = ChangeDiffEngine::on_file_changed(&mut ctx, &skipped).await;

    assert_eq!(outcome, ChangeOutcome::None);
    assert_eq!(ctx.ledger.count("mocha"), 0);
    assert_eq!(
        ctx.ledger.external_modules(&Default::default()),
        vec!["chai"]
    );
}

#[tokio::test]
async fn commented_out_reference_does_not_survive_a_rescan() {
    let dir = TempDir::new().unwrap();
    let main = write(&dir, "main.js", "require('chai');\nrequire('sinon');\n");

    let mut ctx = context(&dir);
    DependencyResolver::resolve(&mut ctx, vec![main.clone()])
        .await
        .unwrap();

    write(&dir, "main.js", "require('chai');\n// require('sinon');\n");
    let outcome = ChangeDiffEngine::on_file_changed(&mut ctx, &main).await;
    assert_eq!(outcome, ChangeOutcome::Removed(vec!["sinon".to_string()]));
}
