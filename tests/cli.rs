use clap::Parser;
use diffctx::cli::{Cli, Commands, LocalizeArgs};

#[test]
fn localize_flag_parsing() {
    // Given
    let argv = vec![
        "dctx",
        "--verbose",
        "localize",
        "--base",
        "develop",
        "--max-depth",
        "2",
        "--max-tokens",
        "8000",
        "--json",
    ];

    // When
    let cli = Cli::parse_from(argv);

    // Then
    assert!(cli.verbose);
    match cli.command {
        Commands::Localize(LocalizeArgs { base, max_depth, max_tokens, json, diff_file, .. }) => {
            assert_eq!(base.as_deref(), Some("develop"));
            assert_eq!(max_depth, Some(2));
            assert_eq!(max_tokens, Some(8000));
            assert!(json);
            assert!(diff_file.is_none());
        }
        _ => panic!("expected Localize command"),
    }
}

#[test]
fn lines_defaults_to_stdin() {
    let cli = Cli::parse_from(["dctx", "lines"]);
    match cli.command {
        Commands::Lines(args) => assert_eq!(args.diff_file, std::path::PathBuf::from("-")),
        _ => panic!("expected Lines command"),
    }
}

#[test]
fn cli_definition_is_consistent() {
    use clap::CommandFactory;
    Cli::command().debug_assert();
}
