// Fixture pages run through the public API with the shipped rules file.

use std::path::{Path, PathBuf};

use foa_extract::{extract_from_html, TagRules};

fn root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn check(variant: &str, url: &str) {
    let dir = root().join("fixtures").join(variant);
    assert!(dir.join("page.html").exists());
    assert!(dir.join("snapshot.json").exists());

    let html = std::fs::read_to_string(dir.join("page.html")).unwrap();
    let expected: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join("snapshot.json")).unwrap()).unwrap();
    let rules = TagRules::from_path(root().join("rules/tags.yaml")).unwrap();

    let record = extract_from_html(url, &html, None, &rules).unwrap();
    assert_eq!(record.payload().unwrap(), expected, "{variant}");
}

#[test]
fn classic_fixture_matches_snapshot() {
    check("classic", "https://www.grants.gov/search-results-detail/357842");
}

#[test]
fn simpler_fixture_matches_snapshot() {
    check(
        "simpler",
        "https://simpler.grants.gov/opportunity/0b5a4e2c-1f3d-4c2b-9e77-6a1f2d3c4b5a",
    );
}
