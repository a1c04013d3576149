use std::env;
use std::process::Command;
use time::OffsetDateTime;

fn main() {
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/tags");

    // Reproducible builds pin the timestamp through SOURCE_DATE_EPOCH
    let build_year = env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|raw| raw.parse::<i64>().ok())
        .and_then(|epoch| OffsetDateTime::from_unix_timestamp(epoch).ok())
        .unwrap_or_else(OffsetDateTime::now_utc)
        .year();
    println!("cargo:rustc-env=APP_BUILD_YEAR={build_year}");

    let version = env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".to_string());
    let tag = git(&["describe", "--tags", "--exact-match"]);
    let display = match tag.as_deref() {
        Some(tag) if tag == format!("v{version}") => version.clone(),
        _ => match git(&["rev-parse", "--short", "HEAD"]) {
            Some(hash) => format!("{version}-dev+{hash}"),
            None => format!("{version}-dev"),
        },
    };
    println!("cargo:rustc-env=APP_VERSION_DISPLAY={display}");
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
