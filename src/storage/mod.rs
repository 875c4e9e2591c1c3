use std::path::PathBuf;
use uuid::Uuid;
use chrono::Utc;

/// Identifiers are date-prefixed so export folders and log lines sort
/// chronologically: `prp_20250115_1a2b3c4d`.
pub fn generate_id(prefix: &str) -> String {
    format!(
        "{}_{}_{}",
        prefix,
        Utc::now().format("%Y%m%d"),
        &Uuid::new_v4().to_string()[..8]
    )
}

pub fn ensure_dirs(exports_folder: &PathBuf) -> std::io::Result<()> {
    std::fs::create_dir_all(exports_folder)?;
    Ok(())
}
