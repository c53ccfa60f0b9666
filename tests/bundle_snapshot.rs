//! Snapshot of the exact bundle layout for a two-file import chain.

use assert_fs::prelude::*;
use diffctx::core::bundle::ContextBundler;
use diffctx::core::resolve::ImportResolver;
use diffctx::infra::config::{BundleConfig, ResolveConfig};

#[test]
fn bundle_layout_snapshot()
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    tmp.child("src/main.ts")
        .write_str("import { foo } from \"./bar\";\n\nexport function run(x: number) {\n  return foo(x) + 1;\n}\n")
        .expect("write main.ts");
    tmp.child("src/bar.ts")
        .write_str("export function foo(n: number) {\n  return n * 2;\n}\n")
        .expect("write bar.ts");

    let bundler = ContextBundler::new(BundleConfig::default(), ImportResolver::new(ResolveConfig::default()))
        .expect("bundler")
        .with_display_root(tmp.path());

    let bundle = bundler.extract_code_and_references(
        &[tmp.path().join("src/main.ts")],
        &["return foo(x) + 1;".to_string()],
        3,
    );

    assert_eq!(bundle.fragments, 2);
    insta::assert_snapshot!(bundle.text.trim_end(), @r#"
    import { foo } from "./bar";

    /*PRIMARY CODE STARTS HERE*/

    /*file:src/main.ts*/
    export function run(x: number) {
      return foo(x) + 1;
    }


    /*file:src/bar.ts*/
    export function foo(n: number) {
      return n * 2;
    }
    "#);
}
