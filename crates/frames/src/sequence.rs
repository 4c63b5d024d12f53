//! Image sequence collection and ordering

use crate::{Dimensions, FrameError, FrameResult};
use image::RgbaImage;
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "webp", "tif", "tiff", "tga", "ico", "pnm", "pbm", "pgm",
    "ppm", "qoi",
];

/// One image file of a sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceEntry {
    pub path: PathBuf,
    /// File name, used for ordering and removal
    pub name: String,
}

impl SequenceEntry {
    fn new(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self { path, name }
    }
}

/// Image files in playback order
#[derive(Debug, Clone, Default)]
pub struct Sequence {
    entries: Vec<SequenceEntry>,
}

impl Sequence {
    /// Build a sequence from explicit files, skipping anything that is not an image
    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut entries = Vec::new();
        for path in paths {
            let path = path.into();
            if is_image_path(&path) {
                entries.push(SequenceEntry::new(path));
            } else {
                warn!("Skipping non-image file {}", path.display());
            }
        }
        Self::sorted(entries)
    }

    /// Collect every image file directly inside `dir`
    pub fn from_dir(dir: &Path) -> FrameResult<Self> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && is_image_path(&path) {
                entries.push(SequenceEntry::new(path));
            }
        }
        debug!("Found {} images in {}", entries.len(), dir.display());
        Ok(Self::sorted(entries))
    }

    fn sorted(mut entries: Vec<SequenceEntry>) -> Self {
        entries.sort_by(|a, b| natural_cmp(&a.name, &b.name));
        Self { entries }
    }

    /// Remove every entry with the given file name
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.name != name);
        before != self.entries.len()
    }

    pub fn entries(&self) -> &[SequenceEntry] {
        &self.entries
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.entries.iter().map(|e| e.path.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Size of the first image, the default output size
    pub fn original_dimensions(&self) -> FrameResult<Dimensions> {
        let first = self.entries.first().ok_or(FrameError::NoFrames)?;
        probe_dimensions(&first.path)
    }
}

fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| {
            IMAGE_EXTENSIONS.iter().any(|ext| e.eq_ignore_ascii_case(ext))
        })
}

/// Read image dimensions from the header without decoding pixels
pub fn probe_dimensions(path: &Path) -> FrameResult<Dimensions> {
    let (width, height) = image::image_dimensions(path).map_err(|source| FrameError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Dimensions::new(width, height)
}

/// Thumbnail of an image fitting within `max_side` on both axes
pub fn preview(path: &Path, max_side: u32) -> FrameResult<RgbaImage> {
    let img = image::open(path).map_err(|source| FrameError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.thumbnail(max_side, max_side).to_rgba8())
}

/// Lexicographic-numeric comparison, so `frame2` sorts before `frame10`.
///
/// Digit runs compare by value, everything else case-insensitively. Ties
/// fall back to byte order to keep the ordering total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (mut ai, mut bi) = (a.char_indices().peekable(), b.char_indices().peekable());

    loop {
        match (ai.peek().copied(), bi.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some((sa, ca)), Some((sb, cb))) => {
                if ca.is_ascii_digit() && cb.is_ascii_digit() {
                    let ea = digit_run_end(a, sa);
                    let eb = digit_run_end(b, sb);
                    let ord = cmp_digit_runs(&a[sa..ea], &b[sb..eb]);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                    while ai.peek().map_or(false, |&(i, _)| i < ea) {
                        ai.next();
                    }
                    while bi.peek().map_or(false, |&(i, _)| i < eb) {
                        bi.next();
                    }
                } else {
                    let ord = ca.to_lowercase().cmp(cb.to_lowercase());
                    if ord != Ordering::Equal {
                        return ord;
                    }
                    ai.next();
                    bi.next();
                }
            }
        }
    }
}

fn digit_run_end(s: &str, start: usize) -> usize {
    s[start..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(s.len(), |off| start + off)
}

fn cmp_digit_runs(a: &str, b: &str) -> Ordering {
    let ta = a.trim_start_matches('0');
    let tb = b.trim_start_matches('0');
    ta.len()
        .cmp(&tb.len())
        .then_with(|| ta.cmp(tb))
        .then_with(|| a.len().cmp(&b.len()))
}
