use std::env;
use std::process::Command;

/// First line of a command's stdout, if it ran and succeeded.
fn output_of(program: &str, args: &[&str]) -> Option<String> {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .and_then(|s| s.lines().next().map(|l| l.trim().to_string()))
        .filter(|s| !s.is_empty())
}

fn main() {
    // Build context carried by kamailio_exporter_build_info.
    let sha = output_of("git", &["rev-parse", "--short", "HEAD"]);
    let branch = output_of("git", &["rev-parse", "--abbrev-ref", "HEAD"]);

    let rustc = env::var("RUSTC").unwrap_or_else(|_| "rustc".into());
    let rustc_version = output_of(&rustc, &["--version"])
        .and_then(|v| v.split_whitespace().nth(1).map(str::to_string));

    for (key, value) in [
        ("GIT_SHA", sha),
        ("GIT_BRANCH", branch),
        ("RUSTC_VERSION", rustc_version),
    ] {
        let value = value.unwrap_or_else(|| "unknown".into());
        println!("cargo:rustc-env={key}={value}");
    }

    println!("cargo:rerun-if-changed=../../.git/HEAD");
    println!("cargo:rerun-if-changed=../../.git/refs/");
}
