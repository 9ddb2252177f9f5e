//! Tests for CLI subcommand parsing.

use clap::Parser;
use diag_support::config::{Command, LogFormat, Opt};
use diag_support::Severity;

#[test]
fn test_replay_follow_with_interval() {
    let opt = Opt::try_parse_from([
        "diag_support",
        "--log-format",
        "json",
        "replay",
        "--db",
        "mysql://app:pw@db/diag",
        "--follow",
        "--interval",
        "15",
    ])
    .expect("should parse");
    assert!(matches!(opt.log_format, LogFormat::Json));
    match opt.command {
        Command::Replay(args) => {
            assert!(args.follow);
            assert_eq!(args.interval, 15);
            assert!(args.since.is_none());
        }
        other => panic!("unexpected command: {:?}", other),
    }
}

#[test]
fn test_emit_all_fields() {
    let opt = Opt::try_parse_from([
        "diag_support",
        "emit",
        "--db",
        "sqlite:///tmp/diag.db",
        "--severity",
        "critical",
        "--file",
        "x.cpp",
        "--function",
        "Foo::bar(int)",
        "--line",
        "42",
        "--tag",
        "abc123",
        "disk full",
    ])
    .expect("should parse");
    match opt.command {
        Command::Emit(args) => {
            assert_eq!(args.severity, Severity::Critical);
            assert_eq!(args.file, "x.cpp");
            assert_eq!(args.function, "Foo::bar(int)");
            assert_eq!(args.line, 42);
            assert_eq!(args.tag.as_deref(), Some("abc123"));
            assert_eq!(args.message, "disk full");
        }
        other => panic!("unexpected command: {:?}", other),
    }
}

#[test]
fn test_tag_requires_program() {
    assert!(Opt::try_parse_from(["diag_support", "tag", "--exe", "/usr/bin/app"]).is_err());
    let opt = Opt::try_parse_from([
        "diag_support",
        "tag",
        "--exe",
        "/usr/bin/app",
        "--program",
        "app.pro",
    ])
    .expect("should parse");
    assert!(matches!(opt.command, Command::Tag(_)));
}

#[test]
fn test_invalid_severity_is_rejected() {
    let result = Opt::try_parse_from(["diag_support", "emit", "--severity", "loud", "msg"]);
    assert!(result.is_err());
}
