//! Initialize files and projects based on templates.

pub mod experiment;

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Error, Result};

// Initiate new content structure template based on input args
pub fn init_at_path(type_str: &str, path_str: &str, template_str: &str) -> Result<()> {
    println!(
        "Initiating new {type_} at: {path} (template: {template}) ",
        type_ = type_str,
        path = path_str,
        template = template_str
    );

    let path = Path::new(path_str);

    // test if directory doesn't already exist at path
    if path.exists() {
        return Err(Error::msg(format!(
            "Can't initialize {type_}, directory already exists ({path}). Try another path.",
            type_ = type_str,
            path = path_str
        )));
    }

    // get the template files
    let template_files = match collect_template_files(type_str, template_str) {
        Some(tf) => tf,
        None => {
            return Err(Error::msg(format!(
                "Failed getting {} template files for template \"{}\"",
                type_str, template_str
            )))
        }
    };

    fs::create_dir_all(path)
        .with_context(|| format!("failed creating directory: {}", path_str))?;

    create_template_files(path, template_files)
}

// Create actual files from the template file content
fn create_template_files(path: &Path, files: HashMap<String, String>) -> Result<()> {
    for (name, content) in files {
        let file_full_path = path.join(name);
        if let Some(parent) = file_full_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&file_full_path, content).with_context(|| {
            format!("Failed to create a template \"{}\"", file_full_path.display())
        })?;
    }
    Ok(())
}

// Collect the necessary template files based on init type and template_str
fn collect_template_files(type_str: &str, template_str: &str) -> Option<HashMap<String, String>> {
    match type_str {
        "experiment" => experiment::collect_template_files(template_str),
        _ => None,
    }
}

#[test]
fn init_refuses_existing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().to_string_lossy().to_string();
    assert!(init_at_path("experiment", &path, "transmission").is_err());
}

#[test]
fn init_writes_experiment_file() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("hipat_batch");
    let path = target.to_string_lossy().to_string();
    init_at_path("experiment", &path, "variance").unwrap();
    let content = fs::read_to_string(target.join(jcm::CONFIG_FILE_NAME)).unwrap();
    assert!(content.contains("variant = \"variance\""));
}

#[test]
fn init_unknown_template() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("x").to_string_lossy().to_string();
    assert!(init_at_path("experiment", &path, "tutorial").is_err());
    assert!(init_at_path("module", &path, "transmission").is_err());
}
