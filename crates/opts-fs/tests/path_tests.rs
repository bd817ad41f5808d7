use opts_fs::NormalizedPath;
use proptest::prelude::*;

#[test]
fn test_normalize_backslashes_to_forward() {
    let path = NormalizedPath::new("team\\payments\\base.yaml");
    assert_eq!(path.as_str(), "team/payments/base.yaml");
}

#[test]
fn test_join_paths() {
    let base = NormalizedPath::new("configs/app");
    assert_eq!(base.join("team/base.json").as_str(), "configs/app/team/base.json");
}

#[test]
fn test_parent_and_file_name() {
    let path = NormalizedPath::new("configs/team/base.json");
    assert_eq!(path.parent().unwrap().as_str(), "configs/team");
    assert_eq!(path.file_name(), Some("base.json"));
    assert_eq!(path.extension(), Some("json"));
}

#[test]
fn test_feature_name_derivation() {
    let root = NormalizedPath::new("/srv/configs");
    let file = NormalizedPath::new("/srv/configs/team/payments/base.yaml");
    let name = file.relative_to(&root).unwrap().without_extension();
    assert_eq!(name.as_str(), "team/payments/base");
}

#[test]
fn test_components_skip_empty() {
    let path = NormalizedPath::new("/a/b/c");
    assert_eq!(path.components().collect::<Vec<_>>(), vec!["a", "b", "c"]);
}

proptest! {
    #[test]
    fn normalized_paths_have_no_backslashes_or_double_slashes(s in "\\PC*") {
        let path = NormalizedPath::new(&s);
        prop_assert!(!path.as_str().contains('\\'));
        prop_assert!(!path.as_str().contains("//"));

        let roundtripped = NormalizedPath::new(path.to_native());
        prop_assert_eq!(path, roundtripped);
    }

    #[test]
    fn relative_to_inverts_join(root in "[a-z]{1,8}(/[a-z]{1,8}){0,3}", rest in "[a-z]{1,8}(/[a-z]{1,8}){0,3}") {
        let root = NormalizedPath::new(&root);
        let joined = root.join(&rest);
        let relative = joined.relative_to(&root).unwrap();
        prop_assert_eq!(relative.as_str(), rest.as_str());
    }
}
