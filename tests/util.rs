//! Shared test utilities for integration tests
//!
//! Provides a small TypeScript project with a path alias, a relative
//! import chain and an existing test file.

#![allow(dead_code)]

use assert_fs::prelude::*;

/// Diff that rewrites the return line (line 6) of `src/cart.ts`
pub const CART_DIFF: &str = "diff --git a/src/cart.ts b/src/cart.ts\n\
index 1111111..2222222 100644\n\
--- a/src/cart.ts\n\
+++ b/src/cart.ts\n\
@@ -5,2 +5,2 @@ export function cartTotal(items: number[], code: string): number {\n\
\x20  const raw = items.reduce((a, b) => a + b, 0);\n\
-  return round(raw);\n\
+  return round(applyDiscount(raw, code));\n";

/// Build the fixture project
pub fn make_project() -> assert_fs::TempDir
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    // Comments and trailing commas are accepted in tsconfig files
    tmp.child("tsconfig.json")
        .write_str(
            "{\n  // aliases\n  \"compilerOptions\": {\n    \"baseUrl\": \".\",\n    \"paths\": { \"@lib/*\": [\"src/lib/*\"], },\n  },\n}\n",
        )
        .expect("write tsconfig");

    tmp.child("src/cart.ts")
        .write_str(
            "import { applyDiscount } from \"@lib/discount\";\n\
             import { round } from \"./math\";\n\
             \n\
             export function cartTotal(items: number[], code: string): number {\n\
             \x20 const raw = items.reduce((a, b) => a + b, 0);\n\
             \x20 return round(applyDiscount(raw, code));\n\
             }\n\
             \n\
             export function itemCount(items: number[]): number {\n\
             \x20 return items.length;\n\
             }\n",
        )
        .expect("write cart.ts");

    tmp.child("src/math.ts")
        .write_str("export function round(n: number): number {\n  return Math.round(n * 100) / 100;\n}\n")
        .expect("write math.ts");

    tmp.child("src/lib/discount.ts")
        .write_str(
            "import { rates } from \"./rates\";\n\nexport function applyDiscount(total: number, code: string): number {\n  return total * (1 - (rates[code] ?? 0));\n}\n",
        )
        .expect("write discount.ts");

    tmp.child("src/lib/rates.ts")
        .write_str("export const rates: Record<string, number> = { SAVE10: 0.1 };\n")
        .expect("write rates.ts");

    tmp.child("src/__tests__/cart.test.ts")
        .write_str("import { cartTotal } from \"../cart\";\n\nit(\"sums\", () => expect(cartTotal([1], \"\")).toBe(1));\n")
        .expect("write cart.test.ts");

    tmp
}
