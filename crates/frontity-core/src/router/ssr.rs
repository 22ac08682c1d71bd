// ── Server-side rendering response ──
//
// The HTTP response under construction while the server renders a link.
// The router only ever sets a status or a redirect on it.

use indexmap::IndexMap;
use url::Url;

use crate::link::Link;
use crate::model::Data;

/// Default status of an SSR redirect when the descriptor carries none.
pub const DEFAULT_REDIRECT_STATUS: u16 = 302;

/// The parts of an HTTP response the router controls.
pub trait ResponseContext: Send {
    fn set_status(&mut self, status: u16);
    fn redirect(&mut self, location: &str, status: u16);
}

/// A plain response record, for servers that build their answer after
/// `before_ssr` returns (and for the CLI).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsrResponse {
    pub status: u16,
    pub location: Option<String>,
}

impl Default for SsrResponse {
    fn default() -> Self {
        Self {
            status: 200,
            location: None,
        }
    }
}

impl SsrResponse {
    pub fn is_redirect(&self) -> bool {
        self.location.is_some()
    }
}

impl ResponseContext for SsrResponse {
    fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    fn redirect(&mut self, location: &str, status: u16) {
        self.status = status;
        self.location = Some(location.to_owned());
    }
}

/// Target of an SSR redirect: the redirection location plus the request
/// query (location params win) plus the app options as `frontity_<key>`.
pub fn redirect_location(data: &Data, location: &str, options: &IndexMap<String, String>) -> String {
    let mut extra: Vec<(String, String)> = data
        .query
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    extra.extend(
        options
            .iter()
            .map(|(k, v)| (format!("frontity_{k}"), v.clone())),
    );

    if let Ok(mut url) = Url::parse(location) {
        let existing: Vec<String> = url.query_pairs().map(|(k, _)| k.into_owned()).collect();
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in &extra {
                if !existing.contains(k) {
                    pairs.append_pair(k, v);
                }
            }
        }
        // `query_pairs_mut` leaves a dangling `?` when nothing was added.
        if url.query() == Some("") {
            url.set_query(None);
        }
        return url.to_string();
    }

    match Link::parse(location) {
        Ok(mut link) => {
            for (k, v) in extra {
                link.query.entry(k).or_insert(v);
            }
            link.href()
        }
        Err(_) => location.to_owned(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::RedirectionData;

    fn redirection(link: &str, location: &str) -> Data {
        Data::status(&Link::parse(link).unwrap()).redirection(RedirectionData {
            location: location.into(),
            redirect_status: Some(301),
            is_external: false,
        })
    }

    fn options() -> IndexMap<String, String> {
        let mut options = IndexMap::new();
        options.insert("name".to_owned(), "my-app".to_owned());
        options
    }

    #[test]
    fn internal_location_keeps_own_params_and_adds_options() {
        let data = redirection("/old/?a=1", "/new/?b=2");
        assert_eq!(
            redirect_location(&data, "/new/?b=2", &options()),
            "/new/?a=1&b=2&frontity_name=my-app"
        );
    }

    #[test]
    fn external_location_appends_in_order() {
        let data = redirection("/old/?a=1", "https://other.test/x?b=2");
        assert_eq!(
            redirect_location(&data, "https://other.test/x?b=2", &options()),
            "https://other.test/x?b=2&a=1&frontity_name=my-app"
        );
    }

    #[test]
    fn nothing_to_add_leaves_location_alone() {
        let data = redirection("/old/", "https://other.test/x");
        assert_eq!(
            redirect_location(&data, "https://other.test/x", &IndexMap::new()),
            "https://other.test/x"
        );
        assert_eq!(
            redirect_location(&data, "/new/", &IndexMap::new()),
            "/new/"
        );
    }

    #[test]
    fn response_records_status_and_location() {
        let mut resp = SsrResponse::default();
        resp.set_status(404);
        assert_eq!(resp.status, 404);
        assert!(!resp.is_redirect());

        resp.redirect("/new/", 301);
        assert_eq!(resp, SsrResponse { status: 301, location: Some("/new/".into()) });
    }
}
