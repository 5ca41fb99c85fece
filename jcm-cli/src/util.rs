use std::path::PathBuf;

use jcm::{Scenario, CONFIG_FILE_NAME};

/// Walks up the directory tree looking for an experiment file.
pub(crate) fn find_config_file(path: PathBuf, recursion_levels: usize) -> Option<PathBuf> {
    let mut recursion_levels = recursion_levels;
    let mut path = path;
    while recursion_levels > 0 {
        let candidate = path.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        recursion_levels -= 1;
        match path.parent() {
            Some(parent_path) => path = parent_path.to_path_buf(),
            None => break,
        }
    }
    None
}

pub(crate) fn format_scenario_list(scenarios: &[Scenario]) -> String {
    let mut list = String::new();
    for scenario in scenarios {
        let flags = scenario.flags().to_string();
        list = format!(
            "{}\n   {:<10} {:<12} {}",
            list,
            scenario.name(),
            if flags.is_empty() { "(no flags)" } else { flags.as_str() },
            scenario.description(),
        );
    }
    list
}

#[test]
fn config_found_in_parent() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("runs").join("batch_1");
    std::fs::create_dir_all(&nested).unwrap();
    std::fs::write(dir.path().join(CONFIG_FILE_NAME), "runtime = 10\n").unwrap();

    assert_eq!(
        find_config_file(nested.clone(), 3),
        Some(dir.path().join(CONFIG_FILE_NAME))
    );
    // two levels only reach `runs`
    assert_eq!(find_config_file(nested, 2), None);
}

#[test]
fn scenario_list_shows_flags() {
    let list = format_scenario_list(jcm::Variant::Transmission.scenarios());
    assert_eq!(list.lines().count(), 5);
    assert!(list.contains("hipat"));
    assert!(list.contains("-p -i 200"));
    assert!(list.contains("(no flags)"));
}
