use crate::cli::*;

// Seems like we can't read from stdout until we close stdin, at which point we can no longer
// enter any commands.
// Consequently, the test is structured such that we first issue all the commands and only then
// do we assert on the output.
#[test]
fn test_cli_basic() -> std::io::Result<()> {
    let temp_dir = setup_temp_config_dir()?;
    let mut cmd = remote_catalog_cmd(&temp_dir);
    cmd.arg("--cli")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn()?;

    //
    // First run all the input commands
    //

    let mut stdin = child.stdin.take().expect("Failed to open stdin");
    let mut expected_stdout: Vec<&str> = vec![];
    let mut expected_stderr: Vec<&str> = vec![];

    // Nothing there yet
    writeln!(stdin, "\\l")?;

    writeln!(stdin, "\\create-db db1")?;
    expected_stdout.push("CREATE DATABASE db1 (id 1, version 1)");

    writeln!(stdin, "\\create-table db1.public.t a:int:pk b:varchar")?;
    expected_stdout.push("CREATE TABLE db1.public.t (id 1.2.3, version 1)");

    writeln!(stdin, "\\dt db1.public")?;
    expected_stdout.push("t");

    writeln!(stdin, "\\d db1.public.t")?;
    expected_stdout.extend(vec![
        "Table db1.public.t (id 1.2.3, version 1, distribution single)",
        "  a Int32 not null primary key",
        "  b Utf8",
    ]);

    // Hit a missing table error
    writeln!(stdin, "\\d db1.public.nope")?;
    expected_stderr.push("Table \"db1.public.nope\" doesn't exist");

    // Not a command at all
    writeln!(stdin, "SELECT 1;")?;
    expected_stderr.push("Commands start with a backslash, try \\?");

    writeln!(stdin, "\\nope")?;
    expected_stderr.push("'\\nope' is not a valid command");

    writeln!(stdin, "\\drop db1.public.t")?;
    expected_stdout.push("DROP TABLE db1.public.t");

    writeln!(stdin, "\\sync")?;
    expected_stdout.push("SYNC 1 database(s)");

    writeln!(stdin, "\\dt db1.public")?;

    // Close the CLI
    // NB: if we hadn't done it like this we'd need to call drop(stdin), since otherwise the
    // test would hang.
    writeln!(stdin, "\\q")?;

    //
    // Now examine the actual output and assert on expected values
    //

    let stdout = child.stdout.take().expect("Failed to open stdout");
    // Don't assert on the timing info since that is not deterministic
    let actual: Vec<String> = read_lines(stdout)?
        .into_iter()
        .filter(|l| !l.starts_with("Time: "))
        .collect();

    assert_eq!(
        expected_stdout, actual,
        "\n\nexpected:\n\n{:#?}\nactual:\n\n{:#?}\n\n",
        expected_stdout, actual
    );

    //
    // Finally examine the errors
    //

    let stderr = child.stderr.take().expect("Failed to open stderr");
    let actual = read_lines(stderr)?;

    assert_eq!(
        expected_stderr, actual,
        "\n\nexpected:\n\n{:#?}\nactual:\n\n{:#?}\n\n",
        expected_stderr, actual
    );

    // Wait for the command to finish
    let status = child.wait().expect("Failed to wait for command");
    assert!(status.success());

    Ok(())
}
