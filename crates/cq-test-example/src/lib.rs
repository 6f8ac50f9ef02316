use std::fs;
use std::path::PathBuf;

pub fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

pub fn demos_root() -> PathBuf {
    workspace_root().join("demos")
}

pub fn demo_dir(name: &str) -> PathBuf {
    demos_root().join(name)
}

/// Case files under `<demo>/cases`, sorted by file name.
pub fn case_paths(name: &str) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(demo_dir(name).join("cases")) else {
        return Vec::new();
    };
    let mut paths = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect::<Vec<_>>();
    paths.sort();
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_root_points_to_workspace() {
        assert!(workspace_root().join("Cargo.toml").exists());
    }

    #[test]
    fn demos_root_points_to_demos_directory() {
        assert!(demos_root().is_dir());
        assert!(demo_dir("first-steps").join("levels.json").is_file());
    }

    #[test]
    fn case_paths_lists_json_cases() {
        let cases = case_paths("first-steps");
        assert!(!cases.is_empty());
        assert!(cases
            .iter()
            .all(|path| path.extension().is_some_and(|ext| ext == "json")));
        assert!(case_paths("missing-demo").is_empty());
    }

    #[test]
    fn every_demo_case_passes() {
        let demo = demo_dir("first-steps");
        for case in case_paths("first-steps") {
            if let Err(error) = cq_tool::assert_case(&demo, &case) {
                panic!("case {} failed: {}", case.display(), error);
            }
        }
    }
}
