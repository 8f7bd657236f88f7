//! Tolerant reader for Ultralytics-style YOLO label files.
//!
//! Duplicate detection only needs class ids and normalized geometry, so
//! unlike a strict converter this reader never fails on content: short or
//! malformed lines are skipped, and a missing label file is an empty set.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use walkdir::WalkDir;

use super::BoundingBox;
use crate::error::LabeldupError;

/// Image extensions considered part of a dataset (matched case-insensitively).
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];
pub const LABEL_EXTENSION: &str = "txt";

/// The boxes of one image, in file order.
pub type LabelSet = Vec<BoundingBox>;

/// Derive the label file path for an image path.
///
/// This is a plain substring rewrite over the whole path: `images` becomes
/// `labels`, then `jpg`, `jpeg` and `png` become `txt`. It is
/// case-sensitive and not anchored to the extension, so a file named
/// `jpg_scan.jpg` maps to `txt_scan.txt`. Existing datasets were organized
/// under this mapping, so it is kept as is.
pub fn label_path_for_image(image_path: &Path) -> PathBuf {
    let label_path = image_path
        .to_string_lossy()
        .replace("images", "labels")
        .replace("jpg", LABEL_EXTENSION)
        .replace("jpeg", LABEL_EXTENSION)
        .replace("png", LABEL_EXTENSION);
    PathBuf::from(label_path)
}

/// Path of the label file sitting next to an image inside a dataset root:
/// `<root>/labels/<stem>.txt`.
///
/// Used when relocating files, where the label must be the sibling of the
/// image in the root's `labels/` directory.
pub fn sibling_label_path(dataset_root: &Path, image_path: &Path) -> PathBuf {
    let stem = image_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    dataset_root
        .join("labels")
        .join(format!("{stem}.{LABEL_EXTENSION}"))
}

/// Read the labels for an image.
///
/// Returns an empty set when the label file does not exist or cannot be
/// read. Invalid UTF-8 is decoded lossily, so only the lines it touches
/// are dropped.
pub fn read_labels_for_image(image_path: &Path) -> LabelSet {
    let label_path = label_path_for_image(image_path);
    match fs::read(&label_path) {
        Ok(bytes) => parse_labels(&String::from_utf8_lossy(&bytes)),
        Err(err) => {
            if label_path.exists() {
                tracing::warn!(path = %label_path.display(), error = %err, "unreadable label file");
            }
            Vec::new()
        }
    }
}

/// Read the labels of every image, in the same order.
///
/// Files are read in parallel; nothing is written.
pub fn read_label_sets(images: &[PathBuf]) -> Vec<LabelSet> {
    images
        .par_iter()
        .map(|image| read_labels_for_image(image))
        .collect()
}

/// Parse the content of a label file, skipping lines that do not parse.
pub fn parse_labels(content: &str) -> LabelSet {
    content.lines().filter_map(parse_label_line).collect()
}

/// Parse one label line: `class_id cx cy w h [extra...]`.
///
/// The class id is read as a float and truncated (`"3.0"` is class 3).
/// Tokens past the fifth are ignored. Returns `None` for blank lines,
/// lines with fewer than five tokens, and lines with unparsable numbers.
fn parse_label_line(line: &str) -> Option<BoundingBox> {
    let mut tokens = line.split_whitespace();

    let class_id = tokens
        .next()?
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())?
        .trunc() as i64;
    let cx = tokens.next()?.parse::<f64>().ok()?;
    let cy = tokens.next()?.parse::<f64>().ok()?;
    let w = tokens.next()?.parse::<f64>().ok()?;
    let h = tokens.next()?.parse::<f64>().ok()?;

    Some(BoundingBox::new(class_id, cx, cy, w, h))
}

/// Fuzz-only entrypoint for YOLO single-line parsing.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_label_line(input: &str) -> Option<BoundingBox> {
    parse_label_line(input)
}

/// List the images directly inside `images_dir`, sorted by file name.
///
/// Subdirectories are not descended into. Symlinks to files count as
/// images; dangling symlinks are skipped.
pub fn list_images(images_dir: &Path) -> Result<Vec<PathBuf>, LabeldupError> {
    let mut images = Vec::new();

    for entry in WalkDir::new(images_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| {
            LabeldupError::Io(std::io::Error::other(format!(
                "failed while listing {}: {source}",
                images_dir.display()
            )))
        })?;

        if entry.path().is_file() && has_extension(entry.path(), &IMAGE_EXTENSIONS) {
            images.push(entry.path().to_path_buf());
        }
    }

    Ok(images)
}

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };

    allowed
        .iter()
        .any(|allowed_ext| ext.eq_ignore_ascii_case(allowed_ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_path_rewrites_images_dir_and_extension() {
        let path = label_path_for_image(Path::new("/data/set/images/frame_001.jpg"));
        assert_eq!(path, PathBuf::from("/data/set/labels/frame_001.txt"));

        let path = label_path_for_image(Path::new("/data/set/images/frame_001.jpeg"));
        assert_eq!(path, PathBuf::from("/data/set/labels/frame_001.txt"));

        let path = label_path_for_image(Path::new("/data/set/images/frame_001.png"));
        assert_eq!(path, PathBuf::from("/data/set/labels/frame_001.txt"));
    }

    #[test]
    fn label_path_rewrites_substrings_outside_extension() {
        let path = label_path_for_image(Path::new("/data/images/jpg_scan.jpg"));
        assert_eq!(path, PathBuf::from("/data/labels/txt_scan.txt"));
    }

    #[test]
    fn label_path_keeps_uppercase_extension() {
        let path = label_path_for_image(Path::new("/data/images/a.JPG"));
        assert_eq!(path, PathBuf::from("/data/labels/a.JPG"));
    }

    #[test]
    fn sibling_label_uses_root_labels_dir() {
        let path = sibling_label_path(Path::new("/data/set"), Path::new("/data/set/images/a.png"));
        assert_eq!(path, PathBuf::from("/data/set/labels/a.txt"));
    }

    #[test]
    fn parse_label_line_accepts_valid_rows() {
        let parsed = parse_label_line("2 0.5 0.25 0.3 0.1").expect("line should produce a box");
        assert_eq!(parsed, BoundingBox::new(2, 0.5, 0.25, 0.3, 0.1));
    }

    #[test]
    fn parse_label_line_truncates_float_class_ids() {
        let parsed = parse_label_line("3.0 0.5 0.5 0.1 0.1").expect("float class id");
        assert_eq!(parsed.class_id, 3);

        let parsed = parse_label_line("1.9 0.5 0.5 0.1 0.1").expect("float class id");
        assert_eq!(parsed.class_id, 1);
    }

    #[test]
    fn parse_label_line_ignores_extra_tokens() {
        let parsed = parse_label_line("0 0.1 0.2 0.3 0.4 0.5 0.6").expect("extra tokens");
        assert_eq!(parsed, BoundingBox::new(0, 0.1, 0.2, 0.3, 0.4));
    }

    #[test]
    fn parse_label_line_skips_short_and_malformed_rows() {
        assert!(parse_label_line("   ").is_none());
        assert!(parse_label_line("0 0.1 0.2").is_none());
        assert!(parse_label_line("cat 0.1 0.2 0.3 0.4").is_none());
        assert!(parse_label_line("0 0.1 nope 0.3 0.4").is_none());
        assert!(parse_label_line("nan 0.1 0.2 0.3 0.4").is_none());
    }

    #[test]
    fn parse_labels_keeps_good_lines_around_bad_ones() {
        let content = "0 0.5 0.5 0.2 0.2\ngarbage\n\n1 0.1 0.1 0.05 0.05\n0 x 0 0 0\n";
        let labels = parse_labels(content);
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].class_id, 0);
        assert_eq!(labels[1].class_id, 1);
    }

    #[test]
    fn read_labels_for_missing_file_is_empty() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let image = temp.path().join("images/none.jpg");
        assert!(read_labels_for_image(&image).is_empty());
    }

    #[test]
    fn read_labels_for_image_reads_sibling_file() {
        let temp = tempfile::tempdir().expect("create temp dir");
        fs::create_dir_all(temp.path().join("images")).expect("create images dir");
        fs::create_dir_all(temp.path().join("labels")).expect("create labels dir");
        fs::write(temp.path().join("images/a.jpg"), b"img").expect("write image");
        fs::write(temp.path().join("labels/a.txt"), "0 0.5 0.5 0.2 0.2\n").expect("write label");

        let labels = read_labels_for_image(&temp.path().join("images/a.jpg"));
        assert_eq!(labels, vec![BoundingBox::new(0, 0.5, 0.5, 0.2, 0.2)]);
    }

    #[test]
    fn invalid_utf8_drops_only_the_affected_line() {
        let temp = tempfile::tempdir().expect("create temp dir");
        fs::create_dir_all(temp.path().join("labels")).expect("create labels dir");
        fs::write(
            temp.path().join("labels/a.txt"),
            b"0 0.5 0.5 0.2 0.2\n\xff\xfe garbage\n1 0.1 0.1 0.1 0.1\n",
        )
        .expect("write label");

        let labels = read_labels_for_image(&temp.path().join("images/a.jpg"));
        assert_eq!(
            labels,
            vec![
                BoundingBox::new(0, 0.5, 0.5, 0.2, 0.2),
                BoundingBox::new(1, 0.1, 0.1, 0.1, 0.1),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn list_images_includes_symlinked_files() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let store = temp.path().join("store");
        let images = temp.path().join("images");
        fs::create_dir_all(&store).expect("create store dir");
        fs::create_dir_all(&images).expect("create images dir");
        fs::write(store.join("a.jpg"), b"x").expect("write stored image");
        std::os::unix::fs::symlink(store.join("a.jpg"), images.join("a.jpg")).expect("link image");
        std::os::unix::fs::symlink(store.join("gone.jpg"), images.join("b.jpg"))
            .expect("link dangling");

        let listed = list_images(&images).expect("list images");
        assert_eq!(listed, vec![images.join("a.jpg")]);
    }

    #[test]
    fn list_images_filters_and_sorts() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let images = temp.path().join("images");
        fs::create_dir_all(images.join("nested")).expect("create images dir");
        for name in ["b.PNG", "a.jpg", "c.jpeg", "notes.txt", "d.bmp"] {
            fs::write(images.join(name), b"x").expect("write file");
        }
        fs::write(images.join("nested/e.jpg"), b"x").expect("write nested");

        let listed = list_images(&images).expect("list images");
        let names: Vec<_> = listed
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.PNG", "c.jpeg"]);
    }
}
