use url::Url;

/// Decorates `base` with tracking parameters, overriding any that already
/// exist and keeping the rest of the query, path and fragment intact.
///
/// Anything that does not parse as an absolute URL (relative paths, `"#"`,
/// broken schemes) is returned untouched; attribution is best-effort and must
/// never break the redirect itself.
pub fn build_tracked_link(base: &str, params: &[(&str, &str)]) -> String {
    let mut url = match Url::parse(base) {
        Ok(url) => url,
        Err(_) => return base.to_owned(),
    };

    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !params.iter().any(|(param, _)| *param == key.as_ref()))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    {
        let mut serializer = url.query_pairs_mut();
        serializer.clear();

        for (key, value) in &retained {
            serializer.append_pair(key, value);
        }
        for (key, value) in params {
            serializer.append_pair(key, value);
        }
    }

    if url.query() == Some("") {
        url.set_query(None);
    }

    url.to_string()
}
