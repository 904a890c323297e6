use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=templates");

    let fallback = std::env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "unknown".to_string());
    let version = match Command::new("git")
        .args(["describe", "--always", "--dirty=-modified", "--tags"])
        .output()
    {
        Ok(out) if out.status.success() => String::from_utf8_lossy(&out.stdout).trim().to_string(),
        Ok(out) => {
            println!(
                "cargo:warning=git describe failed: {}",
                String::from_utf8_lossy(&out.stderr).trim()
            );
            fallback
        }
        Err(e) => {
            println!("cargo:warning=failed to run git: {e}");
            fallback
        }
    };
    println!("cargo:rustc-env=APP_VERSION={version}");
}
