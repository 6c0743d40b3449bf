use std::process::Command;

/// `git describe` output, or the crate version outside a checkout.
fn describe_version() -> String {
    Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|described| described.trim().to_owned())
        .filter(|described| !described.is_empty())
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_owned())
}

fn main() {
    for watched in ["../.git/HEAD", "../.git/refs/tags"] {
        println!("cargo:rerun-if-changed={}", watched);
    }

    // reported by `gamesync --version` and GET /api/status
    println!("cargo:rustc-env=GIT_VERSION={}", describe_version());
    println!(
        "cargo:rustc-env=BUILD_TIME={}",
        chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    );
}
