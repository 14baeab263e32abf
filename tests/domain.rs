use assert_matches::assert_matches;

use kira_citegraph::domain::{CanonicalId, normalize};
use kira_citegraph::error::KiraError;

#[test]
fn openalex_spellings_collapse_to_bare_id() {
    for input in [
        "W2741809807",
        "w2741809807",
        "https://openalex.org/W2741809807",
        "http://openalex.org/W2741809807",
        "https://api.openalex.org/works/W2741809807",
        "  https://openalex.org/W2741809807/  ",
    ] {
        assert_eq!(normalize(input), "W2741809807", "{input}");
    }
}

#[test]
fn doi_spellings_collapse_to_resolver_url() {
    for input in [
        "10.7717/peerj.4375",
        "doi:10.7717/PEERJ.4375",
        "https://doi.org/10.7717/peerj.4375",
        "http://dx.doi.org/10.7717/peerj.4375",
    ] {
        assert_eq!(normalize(input), "https://doi.org/10.7717/peerj.4375", "{input}");
    }
}

#[test]
fn normalization_is_idempotent() {
    for input in [
        "W2741809807",
        "https://openalex.org/A5023888391",
        "doi:10.7717/peerj.4375",
        "not an id",
    ] {
        let once = normalize(input);
        assert_eq!(normalize(&once), once, "{input}");
    }
}

#[test]
fn garbage_normalizes_to_empty() {
    assert_eq!(normalize(""), "");
    assert_eq!(normalize("   "), "");
    assert_eq!(normalize("https://example.org/W1"), "");
    assert_eq!(normalize("X123"), "");
}

#[test]
fn author_ids_are_recognized() {
    let id: CanonicalId = "https://openalex.org/a5023888391".parse().unwrap();
    assert_eq!(id.as_str(), "A5023888391");
    assert!(id.is_author());
    assert!(!id.is_work());
}

#[test]
fn unparseable_id_is_an_error() {
    let err = "nonsense".parse::<CanonicalId>().unwrap_err();
    assert_matches!(err, KiraError::InvalidIdentifier(_));
}

#[test]
fn canonical_ids_serialize_as_plain_strings() {
    let id: CanonicalId = "W42".parse().unwrap();
    assert_eq!(serde_json::to_string(&id).unwrap(), "\"W42\"");
}
