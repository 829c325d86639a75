use crate::{
    cli::{run, Cli},
    tests::util::NESTED,
    Error,
};
use clap::{error::ErrorKind, Parser};

fn cli(args: &[&str]) -> Result<Cli, Error> {
    Ok(Cli::try_parse_from(std::iter::once("jpbp").chain(args.iter().copied()))?)
}

#[test]
fn parse_short_and_long_flags() -> Result<(), Error> {
    let expected = Cli {
        json: r#"{"a":"b"}"#.to_owned(),
        json_path: "$.a".to_owned(),
        operation: Some("replace".to_owned()),
        value: r#""z""#.to_owned(),
        pretty: false,
        no_rebase: false,
        pointers: false,
    };

    assert_eq!(
        expected,
        cli(&["-j", r#"{"a":"b"}"#, "-p", "$.a", "-o", "replace", "-v", r#""z""#])?
    );
    assert_eq!(
        expected,
        cli(&[
            "--json",
            r#"{"a":"b"}"#,
            "--jsonPath=$.a",
            "--operation",
            "replace",
            "--value",
            r#""z""#
        ])?
    );

    let parsed = cli(&["-j", "-", "-p", "$.a", "-o", "remove", "--pretty", "--no-rebase"])?;
    assert!(parsed.reads_stdin());
    assert!(parsed.pretty);
    assert!(parsed.no_rebase);
    assert!(parsed.value.is_empty());

    let parsed = cli(&["-j", r#"{"a":1}"#, "-p", "$.a", "-o", "replace", "-v", "-1"])?;
    assert_eq!("-1", parsed.value);

    let parsed = cli(&["-j", "{}", "-p", "$.a", "--pointers"])?;
    assert_eq!(None, parsed.operation);

    Ok(())
}

#[test]
fn parse_errors() {
    for arguments in [
        &["-p", "$.a", "-o", "remove"][..],
        &["-j", "{}", "-o", "remove"],
        &["-j", "{}", "-p", "$.a"],
        &["-j", "{}", "-p"],
        &["-j", "{}", "-p", "$.a", "-o", "remove", "--unknown"],
    ] {
        let result = cli(arguments);
        assert!(
            matches!(result, Err(Error::Usage(_))),
            "{arguments:?} should not parse, got {result:?}"
        );
    }
}

#[test]
fn help() {
    let result = Cli::try_parse_from(["jpbp", "--help"]);
    let Err(e) = result else {
        panic!("--help should not yield arguments");
    };
    assert_eq!(ErrorKind::DisplayHelp, e.kind());
    assert!(e.to_string().contains("--jsonPath"));
}

#[test]
fn run_patch() -> Result<(), Error> {
    let output = run(&cli(&["-j", r#"{"a":"b"}"#, "-p", "$.a", "-o", "replace", "-v", r#""z""#])?)?;
    assert_eq!(r#"{"a":"z"}"#, output);

    let output = run(&cli(&["-j", r#"{"a":[1,2]}"#, "-p", "$.a[*]", "-o", "REMOVE"])?)?;
    assert_eq!(r#"{"a":[]}"#, output);

    let result = run(&cli(&[
        "-j",
        r#"{"a":[1,2]}"#,
        "-p",
        "$.a[*]",
        "-o",
        "remove",
        "--no-rebase",
    ])?);
    assert!(matches!(result, Err(Error::PatchApply(_))), "{result:?}");

    Ok(())
}

#[test]
fn run_unknown_operation() -> Result<(), Error> {
    let result = run(&cli(&["-j", "{}", "-p", "$.a", "-o", "upsert"])?);
    assert!(matches!(result, Err(Error::UnknownOperation(_))), "{result:?}");

    Ok(())
}

#[test]
fn run_pointers() -> Result<(), Error> {
    let output = run(&cli(&["-j", NESTED, "-p", "$..y", "--pointers"])?)?;
    assert_eq!("/y\n/v/0/y\n/v/1/y\n/f/y", output);

    let output = run(&cli(&["-j", NESTED, "-p", "v.**", "--pointers"])?)?;
    assert_eq!("/v/0/x\n/v/0/y\n/v/1/x\n/v/1/y", output);

    let result = run(&cli(&["-j", NESTED, "-p", "$", "--pointers"])?);
    assert!(matches!(result, Err(Error::InvalidLocation(_))), "{result:?}");

    Ok(())
}
