use std::path::{Path, PathBuf};

use makemessages::catalog::CatalogStore;
use makemessages::go_source::load_packages;
use makemessages::go_visitor::extract_from_package;
use makemessages::registry::Registry;
use makemessages::template;
use makemessages::unit::TranslationUnit;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn go_fixture_units() -> Vec<TranslationUnit> {
    let base = fixture("gotext");
    let packages = load_packages(&base, false, &[]).unwrap();
    assert_eq!(packages.len(), 1);
    extract_from_package(&packages[0], &Registry::builtin(), &base)
}

#[test]
fn test_gotext_receivers() {
    let units = go_fixture_units();
    let singulars: Vec<_> = units.iter().map(|u| u.singular.as_str()).collect();
    for expected in [
        "String from gotext package",
        "String from gotext.Locale",
        "String from gotext.Po",
        "String from gotext.Mo",
    ] {
        assert!(singulars.contains(&expected), "missing {}", expected);
    }
    assert!(!singulars.contains(&"Too few arguments"));
}

#[test]
fn test_gotext_positions_and_roles() {
    let units = go_fixture_units();
    assert_eq!(units[0].position, "gotext.go:9");

    let plural = units.iter().find(|u| u.singular == "One file").unwrap();
    assert_eq!(plural.plural, "%d files");
    assert_eq!(plural.position, "gotext.go:20");

    let context = units.iter().find(|u| u.singular == "Open").unwrap();
    assert_eq!(context.context, "menu");

    let full = units.iter().find(|u| u.singular == "One error").unwrap();
    assert_eq!(
        *full,
        TranslationUnit::new("gotext.go:23", "One error")
            .with_plural("%d errors")
            .with_context("form")
            .with_domain("errors")
    );
    assert_eq!(units.len(), 8);
}

#[test]
fn test_template_directory() {
    let units =
        template::extract_from_dir(fixture("templates"), &[".html".to_string()], &[]).unwrap();
    let singulars: Vec<_> = units.iter().map(|u| u.singular.as_str()).collect();
    assert_eq!(
        singulars,
        vec![
            "Welcome",
            "Open",
            "One item",
            "\n  Made with {{tool}}\n  "
        ]
    );
    assert!(units[0].position.ends_with("templates/index.html:3"));
    assert_eq!(units[1].context, "menu");
    assert_eq!(units[2].plural, "{{n}} items");
    assert!(units[3].position.ends_with("templates/partials/footer.html:2"));
    assert_eq!(units[3].context, "footer");
}

#[test]
fn test_template_extensions_are_configurable() {
    let units =
        template::extract_from_dir(fixture("templates"), &["txt".to_string()], &[]).unwrap();
    assert_eq!(units.len(), 1);
    assert_eq!(units[0].singular, "Not a template extension");
}

#[test]
fn test_store_groups_sources_by_domain() {
    let mut store = CatalogStore::new();
    store.extend(go_fixture_units());
    store.extend(
        template::extract_from_dir(fixture("templates"), &[".html".to_string()], &[]).unwrap(),
    );

    let domains: Vec<_> = store.domains().collect();
    assert_eq!(domains, vec!["default", "errors"]);
    assert_eq!(store.units("errors").len(), 2);

    let body = store.render_domain("default", "fr");
    let menu_go = body.find("#: gotext.go:21\nmsgctxt \"menu\"").unwrap();
    let plain = body.find("msgid \"Welcome\"").unwrap();
    assert!(plain < menu_go, "empty context sorts first");
}
