//! DOI normalization.

/// Resolver prefix stripped from index DOIs
pub const DOI_RESOLVER_PREFIX: &str = "https://doi.org/";

/// Strip the resolver prefix from a DOI.
///
/// Idempotent: a DOI without the prefix is returned unchanged. Missing or
/// empty DOIs become `None`.
pub fn normalize_doi(doi: Option<&str>) -> Option<String> {
    let doi = doi?.trim();
    if doi.is_empty() {
        return None;
    }

    let doi = doi.strip_prefix(DOI_RESOLVER_PREFIX).unwrap_or(doi);
    Some(doi.to_string())
}
