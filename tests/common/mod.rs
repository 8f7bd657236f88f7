#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

/// One YOLO label line for class `class_id`.
pub fn label_line(class_id: i64, cx: f64, cy: f64, w: f64, h: f64) -> String {
    format!("{class_id} {cx} {cy} {w} {h}\n")
}

/// Write `<root>/images/<file_name>` and, when given, its label file.
pub fn write_entry(root: &Path, file_name: &str, label: Option<&str>) -> PathBuf {
    let image_path = root.join("images").join(file_name);
    fs::create_dir_all(root.join("images")).expect("create images dir");
    fs::create_dir_all(root.join("labels")).expect("create labels dir");
    fs::write(&image_path, b"not really an image").expect("write image");

    if let Some(label) = label {
        let stem = Path::new(file_name)
            .file_stem()
            .expect("file stem")
            .to_string_lossy()
            .into_owned();
        fs::write(root.join("labels").join(format!("{stem}.txt")), label).expect("write label");
    }

    image_path
}

/// Sorted file names directly inside `dir` (empty when it does not exist).
pub fn file_names(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Match log files written at the top of a dataset root.
pub fn match_logs(root: &Path) -> Vec<PathBuf> {
    let mut logs: Vec<PathBuf> = fs::read_dir(root)
        .expect("read dataset root")
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().starts_with("similar_path_"))
                .unwrap_or(false)
        })
        .collect();
    logs.sort();
    logs
}
