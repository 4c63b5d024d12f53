//! Writes the encoded animation and reports it

use crate::convert::Conversion;
use std::fs;
use std::io;
use std::path::Path;
use tracing::info;

/// File size in megabytes with two decimals
pub fn format_size_mb(len: usize) -> String {
    format!("{:.2} MB", len as f64 / 1024.0 / 1024.0)
}

/// Save the encoded bytes to `out`, creating parent directories
pub fn present(conversion: &Conversion, out: &Path) -> io::Result<()> {
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(out, &conversion.bytes)?;

    info!(
        format = %conversion.format,
        mime = conversion.format.mime_type(),
        "Saved {}",
        out.display()
    );
    println!(
        "Generated {} ({} frames, {}): {}",
        out.display(),
        conversion.frame_count,
        conversion.dimensions,
        format_size_mb(conversion.bytes.len())
    );
    Ok(())
}
