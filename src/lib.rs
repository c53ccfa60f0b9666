//! **diffctx** - Locate the code units touched by a diff and bundle their context
//!
//! Changed lines of a unified diff are mapped onto the smallest enclosing
//! TypeScript/JavaScript declarations; each one is bundled with the
//! declarations it imports, transitively and under a token ceiling, as
//! prompt context for test generation.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Command handlers behind the CLI
pub mod cli_ext {
    /// `localize` and `lines`
    pub mod localize_cmd;

    /// `resolve` and `bundle`
    pub mod inspect_cmd;
}

/// Analysis pipeline - diff to snippets to context bundles
pub mod core {
    /// Unified diff parsing into changed line numbers
    pub mod diff;
    pub use diff::{ChangedLine, FileDiff, parse_diff, split_by_file};

    /// File text + newline index + syntax tree
    pub mod source;
    pub use source::{ParseError, SourceIndex};

    /// Smallest enclosing node per changed line
    pub mod locate;
    pub use locate::{EnclosingMatch, find_enclosing_node, find_enclosing_nodes};

    /// Node to literal source text
    pub mod snippet;
    pub use snippet::{extract_all, extract_text, render_node};

    /// Seed-to-node text matching strategies
    pub mod matching;
    pub use matching::{MATCH_STRATEGIES, match_seed, minimize_code};

    /// Import specifier resolution (relative, tsconfig/jsconfig aliases)
    pub mod resolve;
    pub use resolve::{ImportResolver, ResolvedModulePath};

    /// Token counting with tiktoken and moka caching
    pub mod budgeter;
    pub use budgeter::{Budgeter, TokenGate};

    /// Transitive import-following context bundler
    pub mod bundle;
    pub use bundle::{ContextBundle, ContextBundler, PRIMARY_MARKER};

    /// Test file targeting for changed sources
    pub mod testfile;
    pub use testfile::{TestLocator, TestTarget};

    /// End-to-end orchestration over a diff source
    pub mod pipeline;
    pub use pipeline::{DiffSource, LocalizationReport, Pipeline, PipelineError, StaticDiffSource};
}

/// Language processing - tree-sitter lowering into the syntax tree model
pub mod parsers {
    /// Syntax tree model shared by every stage
    pub mod syntax;
    pub use syntax::{NodeKind, Position, SyntaxNode, TextRange};

    /// TypeScript/TSX/JavaScript grammars
    pub mod typescript;
    pub use typescript::Dialect;
}

/// Infrastructure - Configuration, I/O, git and utilities
pub mod infra {
    /// Layered configuration (file + DIFFCTX_* environment)
    pub mod config;
    pub use config::{Config, init as config_init, load_config};

    /// Diff input and output plumbing
    pub mod io;

    /// CRLF/LF-robust line indexing for O(1) line→byte mapping
    pub mod line_index;
    pub use line_index::NewlineIndex;

    /// `git diff` backed diff source
    pub mod git;
    pub use git::GitDiffSource;

    /// Utility functions and helpers for common operations
    pub mod utils;
}

pub use cli::{AppContext, Cli, Commands};
pub use core::{ContextBundler, ImportResolver, LocalizationReport, Pipeline};
pub use infra::{Config, load_config};
