use std::process::Command;

/// Run git and return trimmed stdout on success.
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn main() {
    // Release builds outside a checkout (tarball, container) can pin the hash.
    println!("cargo:rerun-if-env-changed=BUILD_GIT_HASH");
    let git_hash = std::env::var("BUILD_GIT_HASH").ok().or_else(|| {
        let hash = git(&["rev-parse", "--short", "HEAD"])?;
        // staged and unstaged changes both count
        let dirty = Command::new("git")
            .args(["diff", "--quiet", "HEAD"])
            .status()
            .map(|s| !s.success())
            .unwrap_or(false);
        Some(if dirty { format!("{hash}-dirty") } else { hash })
    });

    let version = match git_hash {
        Some(hash) => format!("{}+{}", env!("CARGO_PKG_VERSION"), hash),
        None => env!("CARGO_PKG_VERSION").to_string(),
    };

    println!("cargo:rustc-env=GIT_HASH={version}");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads");
    println!("cargo:rerun-if-changed=.git/index");
}
