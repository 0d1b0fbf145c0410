use anyhow::{Context, Result};
use sha2::Digest;
use std::env;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

const URI_SCHEMES: &[&str] = &["file://", "http://", "https://", "s3://"];
const HASH_CHUNK: usize = 64 * 1024;

pub fn display_path(path: &Path, base: Option<&Path>) -> String {
    if let Some(base) = base {
        if let Ok(relative) = path.strip_prefix(base) {
            return relative.display().to_string();
        }
    }
    path.display().to_string()
}

pub fn truncate_string(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut truncated = String::new();
    for ch in text.chars() {
        if truncated.len() + ch.len_utf8() > max_bytes {
            break;
        }
        truncated.push(ch);
    }
    truncated
}

#[cfg(test)]
pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = sha2::Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Hash a file without loading it whole; raw NeXus files run to gigabytes.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut hasher = sha2::Sha256::new();
    let mut buffer = vec![0u8; HASH_CHUNK];
    loop {
        let read = file
            .read(&mut buffer)
            .with_context(|| format!("read {}", path.display()))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

pub fn is_uri(reference: &str) -> bool {
    URI_SCHEMES
        .iter()
        .any(|scheme| reference.starts_with(scheme))
}

/// `file://` URI for a path; relative paths are anchored at the working
/// directory. Strings that already carry a scheme pass through.
pub fn path_to_uri(reference: &str) -> String {
    if is_uri(reference) {
        return reference.to_string();
    }
    let path = Path::new(reference);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    format!("file://{}", absolute.display())
}

/// Local filesystem path behind a reference, if it has one.
pub fn local_path(reference: &str) -> Option<PathBuf> {
    if let Some(stripped) = reference.strip_prefix("file://") {
        return Some(PathBuf::from(stripped));
    }
    if is_uri(reference) {
        return None;
    }
    Some(PathBuf::from(reference))
}
