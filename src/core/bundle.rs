//! Context bundling: seed snippet → imports + seed + referenced declarations
//!
//! For a seed in a file, the walk picks the code unit the seed was taken
//! from, keeps only the identifiers it uses that the file imports,
//! resolves those imports and repeats in the target files for every
//! name each import introduces, one level deeper each time.
//!
//! Output layout at the outermost level:
//!
//! ```text
//! import { foo } from "./bar";
//!
//! /*PRIMARY CODE STARTS HERE*/
//!
//! /*file:src/main.ts*/
//! <seed unit>
//!
//! /*file:src/bar.ts*/
//! <foo declaration>
//! ```
//!
//! All mutable state lives in a [`BundleContext`] owned by one top-level
//! call, so independent calls may run in parallel.

use std::collections::{HashMap, HashSet}; // dedupe sets, parse cache
use std::path::{Path, PathBuf};
use std::rc::Rc; // per-call parse cache sharing

use anyhow::Result;
use serde::Serialize; // JSON report
use tracing::{debug, instrument, trace, warn};

use crate::core::budgeter::{Budgeter, TokenGate};
use crate::core::matching::match_seed;
use crate::core::resolve::{ImportResolver, ResolvedModulePath};
use crate::core::snippet::{extract_text, render_node};
use crate::core::source::SourceIndex;
use crate::infra::config::BundleConfig;
use crate::infra::utils::{PathUtils, TextUtils};
use crate::parsers::syntax::{NodeId, NodeKind, SyntaxNode};

/// Emitted once, before the seed's own code
pub const PRIMARY_MARKER: &str = "/*PRIMARY CODE STARTS HERE*/";

/// Words inside import text that never name a binding
const IMPORT_KEYWORDS: [&str; 5] = ["import", "from", "as", "type", "typeof"];

/// Result of one top-level bundling call
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContextBundle
{
    pub text: String,

    /// Budget was exhausted; `text` is partial
    pub truncated: bool,

    /// Tokens accounted for `text`
    pub token_count: usize,

    /// Code units included (seed unit plus resolved declarations)
    pub fragments: usize,
}

/// Mutable state of one top-level call, threaded through the walk
pub struct BundleContext
{
    /// Fingerprints of fragments already emitted
    used_fragments: HashSet<String>,

    /// (resolved file, identifier) pairs already walked
    visited: HashSet<(PathBuf, String)>,

    gate: TokenGate,

    fragments: usize,

    /// Parsed files; None marks a file that failed to parse
    sources: HashMap<PathBuf, Option<Rc<SourceIndex>>>,
}

impl BundleContext
{
    pub fn new(max_tokens: usize) -> Self
    {
        Self {
            used_fragments: HashSet::new(),
            visited: HashSet::new(),
            gate: TokenGate::new(max_tokens),
            fragments: 0,
            sources: HashMap::new(),
        }
    }

    pub fn used_fragments(&self) -> &HashSet<String>
    {
        &self.used_fragments
    }

    pub fn gate(&self) -> &TokenGate
    {
        &self.gate
    }

    /// Parse on first use; parse failures are logged once and skipped
    fn source(
        &mut self,
        path: &Path,
    ) -> Option<Rc<SourceIndex>>
    {
        if let Some(hit) = self
            .sources
            .get(path)
        {
            return hit.clone();
        }

        let loaded = match SourceIndex::open(path)
        {
            Ok(index) => Some(Rc::new(index)),
            Err(e) =>
            {
                warn!(path = %path.display(), error = %e, "skipping file");
                None
            }
        };

        self.sources
            .insert(path.to_path_buf(), loaded.clone());
        loaded
    }

    /// Mark every key used; false when any was already taken
    fn claim(
        &mut self,
        keys: &[&str],
    ) -> bool
    {
        if keys
            .iter()
            .any(|k| {
                self.used_fragments
                    .contains(*k)
            })
        {
            return false;
        }

        for k in keys
        {
            self.used_fragments
                .insert((*k).to_string());
        }
        true
    }

    fn into_bundle(
        self,
        text: String,
    ) -> ContextBundle
    {
        ContextBundle {
            text,
            truncated: self
                .gate
                .truncated,
            token_count: self
                .gate
                .used,
            fragments: self.fragments,
        }
    }
}

/// An import declaration that introduces a name the seed unit uses
#[derive(Debug)]
struct ImportBinding<'s>
{
    /// Referenced name that led here
    identifier: String,

    /// Source text of the import declaration
    text: &'s str,

    /// Every name the import introduces
    siblings: Vec<String>,

    resolved: ResolvedModulePath,
}

/// Walks import graphs from seed snippets
pub struct ContextBundler
{
    config: BundleConfig,
    resolver: ImportResolver,
    budgeter: Budgeter,

    /// Paths in `/*file:*/` markers are shown relative to this
    display_root: Option<PathBuf>,
}

impl ContextBundler
{
    /// # Errors
    /// Fails when the configured tokenizer model is unknown.
    pub fn new(
        config: BundleConfig,
        resolver: ImportResolver,
    ) -> Result<Self>
    {
        let budgeter = Budgeter::new(&config.model)?;
        Ok(Self { config, resolver, budgeter, display_root: None })
    }

    pub fn with_display_root(
        mut self,
        root: impl Into<PathBuf>,
    ) -> Self
    {
        let root = root.into();
        self.display_root = Some(dunce::canonicalize(&root).unwrap_or(root));
        self
    }

    pub fn config(&self) -> &BundleConfig
    {
        &self.config
    }

    pub fn resolver(&self) -> &ImportResolver
    {
        &self.resolver
    }

    pub fn budgeter(&self) -> &Budgeter
    {
        &self.budgeter
    }

    /// Bundle one seed from one file with the configured depth
    pub fn bundle(
        &self,
        file: &Path,
        seed: &str,
    ) -> ContextBundle
    {
        self.extract_code_and_references(&[file.to_path_buf()], &[seed.to_string()], self.config.max_depth)
    }

    /// Bundle every seed against every file in one call. Fingerprints,
    /// visited pairs and the token budget are shared by all pairs of the
    /// call and start fresh on each call.
    #[instrument(level = "debug", skip_all, fields(files = files.len(), seeds = seeds.len(), max_depth = max_depth))]
    pub fn extract_code_and_references(
        &self,
        files: &[PathBuf],
        seeds: &[String],
        max_depth: usize,
    ) -> ContextBundle
    {
        let mut ctx = BundleContext::new(self.config.max_tokens);
        let mut text = String::new();

        for file in files
        {
            for seed in seeds
            {
                let seed = TextUtils::char_prefix(seed, self.config.seed_max_chars);
                let part = self.walk(&mut ctx, file, seed, 0, max_depth);
                text.push_str(&part);
            }
        }

        if ctx
            .gate
            .truncated
        {
            debug!(tokens = ctx.gate.used, "bundle truncated at token ceiling");
        }

        ctx.into_bundle(text)
    }

    /// One level of the walk
    #[instrument(level = "trace", skip(self, ctx, seed), fields(file = %file.display()))]
    fn walk(
        &self,
        ctx: &mut BundleContext,
        file: &Path,
        seed: &str,
        depth: usize,
        max_depth: usize,
    ) -> String
    {
        if depth >= max_depth
            || ctx
                .gate
                .truncated
        {
            return String::new();
        }

        let Some(source) = ctx.source(file)
        else
        {
            return String::new();
        };

        let Some(candidate) = pick_candidate(&source, seed)
        else
        {
            trace!("no code unit matches seed");
            return String::new();
        };

        // Skip units already bundled anywhere in this call
        let rendered = render_node(candidate, &source);
        let code = extract_text(candidate, &source);
        let n = self
            .config
            .fingerprint_len;
        if !ctx.claim(&[TextUtils::char_prefix(&rendered, n), TextUtils::char_prefix(&code, n)])
        {
            trace!("code unit already bundled");
            return String::new();
        }

        let bindings = self.imported_references(&source, file, &rendered);
        let mut out = String::new();

        for binding in &bindings
        {
            if ctx.claim(&[TextUtils::char_prefix(binding.text, n)])
            {
                self.emit(ctx, &mut out, &format!("{}\n", binding.text));
            }
        }

        let lead = if depth == 0 { format!("\n{PRIMARY_MARKER}\n\n") } else { "\n".to_string() };
        self.emit(ctx, &mut out, &lead);

        let block = format!("/*file:{}*/\n{}\n\n", self.display_path(file), code);
        if self.emit(ctx, &mut out, &block)
        {
            ctx.fragments += 1;
        }

        for binding in &bindings
        {
            let Some(target) = binding
                .resolved
                .as_file()
            else
            {
                debug!(identifier = %binding.identifier, specifier = %binding.resolved, "not following unresolved import");
                continue;
            };

            for name in &binding.siblings
            {
                if !ctx
                    .visited
                    .insert((target.to_path_buf(), name.clone()))
                {
                    continue;
                }
                let nested = self.walk(ctx, target, name, depth + 1, max_depth);
                out.push_str(&nested);
            }
        }

        out
    }

    /// Push `text` when it fits the budget
    fn emit(
        &self,
        ctx: &mut BundleContext,
        out: &mut String,
        text: &str,
    ) -> bool
    {
        if !ctx
            .gate
            .admit(&self.budgeter, text)
        {
            return false;
        }
        out.push_str(text);
        true
    }

    /// Imports introducing names used by the rendered unit, one per
    /// import declaration, in order of first use
    fn imported_references<'s>(
        &self,
        source: &'s SourceIndex,
        file: &Path,
        rendered: &str,
    ) -> Vec<ImportBinding<'s>>
    {
        let imports: Vec<(&SyntaxNode, &str, Vec<String>)> = source
            .imports()
            .into_iter()
            .map(|node| {
                let text = source.node_text(node);
                (node, text, import_identifiers(text))
            })
            .collect();

        let imported: HashSet<String> = imports
            .iter()
            .flat_map(|(_, _, ids)| {
                ids.iter()
                    .map(|id| id.to_lowercase())
            })
            .collect();

        let mut seen_names: HashSet<String> = HashSet::new();
        let mut seen_imports: HashSet<NodeId> = HashSet::new();
        let mut out = Vec::new();

        for ident in TextUtils::identifiers(rendered)
        {
            let lower = ident.to_lowercase();
            if !imported.contains(&lower) || !seen_names.insert(lower.clone())
            {
                continue;
            }

            // The declaration that introduces this name
            let Some((node, text, siblings)) = imports
                .iter()
                .find(|(_, _, ids)| {
                    ids.iter()
                        .any(|id| id.to_lowercase() == lower)
                })
            else
            {
                continue;
            };
            if !seen_imports.insert(node.id)
            {
                continue;
            }

            // Module specifier is the last string literal of the import
            let resolved = match TextUtils::string_literals(text).pop()
            {
                Some(specifier) => self
                    .resolver
                    .resolve(file, &specifier),
                None => ResolvedModulePath::Unresolved(String::new()),
            };

            out.push(ImportBinding {
                identifier: ident,
                text,
                siblings: siblings.clone(),
                resolved,
            });
        }

        trace!(count = out.len(), "imported references");
        out
    }

    fn display_path(
        &self,
        path: &Path,
    ) -> String
    {
        let canonical = dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let shown = self
            .display_root
            .as_deref()
            .and_then(|root| {
                canonical
                    .strip_prefix(root)
                    .ok()
            })
            .unwrap_or(path);
        PathUtils::display(shown)
    }
}

/// Names bound by an import declaration's text
fn import_identifiers(text: &str) -> Vec<String>
{
    TextUtils::identifiers(text)
        .into_iter()
        .filter(|id| !IMPORT_KEYWORDS.contains(&id.as_str()))
        .collect()
}

/// Code unit a seed was taken from: nodes whose text matches the seed
/// are collected in pre-order, the root and imports are dropped, and a
/// node named exactly like the seed beats the first remaining one.
fn pick_candidate<'s>(
    source: &'s SourceIndex,
    seed: &str,
) -> Option<&'s SyntaxNode>
{
    let seed = seed.trim();
    if seed.is_empty()
    {
        return None;
    }

    let candidates: Vec<&SyntaxNode> = matching_nodes(source, seed)
        .into_iter()
        .filter(|node| {
            let label = node.label();
            !(label.starts_with("whole file") || label.starts_with("import"))
        })
        .collect();

    candidates
        .iter()
        .find(|node| node.name.as_deref() == Some(seed))
        .or_else(|| candidates.first())
        .copied()
}

/// Pre-order nodes whose text matches `seed`. A subtree whose root does
/// not match is not searched further.
fn matching_nodes<'s>(
    source: &'s SourceIndex,
    seed: &str,
) -> Vec<&'s SyntaxNode>
{
    let mut out = Vec::new();
    let mut stack = vec![source.root()];

    while let Some(node) = stack.pop()
    {
        // Single tokens are never code units
        if matches!(node.kind, NodeKind::Identifier | NodeKind::StringLiteral)
        {
            continue;
        }

        if match_seed(source.node_text(node), seed).is_none()
        {
            continue;
        }

        out.push(node);
        stack.extend(
            node.children()
                .into_iter()
                .rev(),
        );
    }

    out
}
