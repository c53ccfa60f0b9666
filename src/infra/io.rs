use anyhow::{Context, Result};
use std::io::{Read, Write};
use std::path::Path;

/// Read a diff from a file, or from stdin when `path` is `-`
pub fn read_diff_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read diff from stdin")?;
        return Ok(buf);
    }

    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read diff file {}", path.display()))
}

/// Write `content` to `path`, or to stdout when no path is given
pub fn write_output(path: Option<&Path>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write to {}", path.display()))
        }
        None => {
            let mut out = std::io::stdout().lock();
            out.write_all(content.as_bytes()).context("Failed to write to stdout")?;
            if !content.ends_with('\n') {
                out.write_all(b"\n").context("Failed to write to stdout")?;
            }
            Ok(())
        }
    }
}
