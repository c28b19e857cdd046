use std::fs::File;
use std::io::Write;
use std::path::Path;

use tracing::info;

pub fn create_path_if_not_exists(path: &Path) -> anyhow::Result<()> {
    //
    // remove the file name from the path

    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("Invalid path: no parent directory for '{}'", path.display()))?;
    if !parent.exists() {
        info!("Creating path: {:?}", parent);
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub fn write_bytes_to_file(path: &Path, content: &[u8]) -> anyhow::Result<()> {
    create_path_if_not_exists(path)?;
    let mut file = File::create(path)?;
    file.write_all(content)?;
    Ok(())
}

pub fn write_string_to_file(path: &Path, content: &str) -> anyhow::Result<()> {
    write_bytes_to_file(path, content.as_bytes())
}
