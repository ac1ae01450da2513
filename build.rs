use std::process::Command;

fn git(args: &[&str]) -> Option<std::process::Output> {
    Command::new("git").args(args).output().ok()
}

/// Short commit hash, suffixed `-dirty` for uncommitted changes.
fn commit_hash() -> Option<String> {
    let head = git(&["rev-parse", "--short", "HEAD"]).filter(|o| o.status.success())?;
    let hash = String::from_utf8_lossy(&head.stdout).trim().to_string();
    let dirty = git(&["diff", "--quiet"]).is_some_and(|o| !o.status.success());
    Some(if dirty { format!("{}-dirty", hash) } else { hash })
}

fn main() {
    let hash = commit_hash().unwrap_or_else(|| "unknown".to_string());
    let version = std::env::var("CARGO_PKG_VERSION").unwrap_or_default();

    // e.g. 0.1.0+3f9c2ab
    println!("cargo:rustc-env=BUILD_VERSION={}+{}", version, hash);
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads");
}
