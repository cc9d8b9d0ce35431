//! Stamps the values printed by `laserkit --version`.

use chrono::Utc;

fn main() {
    let stamp = Utc::now().format("%Y-%m-%dT%H:%MZ");
    println!("cargo:rustc-env=BUILD_DATE={}", stamp);

    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    println!("cargo:rustc-env=BUILD_PROFILE={}", profile);
}
