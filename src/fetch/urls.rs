// src/fetch/urls.rs

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::trace;
use url::Url;

use crate::error::IngestError;
use crate::process::clean_text;

static COUNTRY_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("section.nav-item a[href]").expect("country link selector"));

static PROFILE_LINK: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("a.links.btn-item.icon-flag[href]").expect("profile link selector")
});

/// One entry of the country overview page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryLink {
    pub name: String,
    pub url: Url,
}

/// Collect every country link on the overview page, in document order.
/// Relative hrefs are resolved against `base`; the first link per name wins.
pub fn country_links(html: &str, base: &Url) -> Vec<CountryLink> {
    let doc = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for el in doc.select(&COUNTRY_LINK) {
        let name = clean_text(&el.text().collect::<String>());
        if name.is_empty() || seen.contains(&name) {
            continue;
        }
        let Some(url) = el.value().attr("href").and_then(|h| base.join(h).ok()) else {
            continue;
        };
        trace!(country = %name, url = %url, "found country");
        seen.insert(name.clone());
        out.push(CountryLink { name, url });
    }
    out
}

/// Find the statistical profile link on a country page.
pub fn profile_link(html: &str, base: &Url) -> Result<Url, IngestError> {
    let doc = Html::parse_document(html);
    let href = doc
        .select(&PROFILE_LINK)
        .find_map(|el| el.value().attr("href"))
        .ok_or_else(|| IngestError::structure("country page has no profile link"))?;
    base.join(href)
        .map_err(|e| IngestError::structure(format!("bad profile link {:?}: {}", href, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://data.worldbank.org/country").unwrap()
    }

    #[test]
    fn overview_links_are_resolved_in_order() {
        let html = r#"
            <section class="nav-item"><a href="/country/afghanistan">Afghanistan</a>
              <a href="/country/albania"> Albania </a></section>
            <section class="nav-item"><a href="/country/zambia">Zambia</a>
              <a href="/country/afghanistan-2">Afghanistan</a></section>
            <nav><a href="/about">About</a></nav>"#;

        let links = country_links(html, &base());
        let names: Vec<_> = links.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["Afghanistan", "Albania", "Zambia"]);
        assert_eq!(
            links[0].url.as_str(),
            "https://data.worldbank.org/country/afghanistan"
        );
    }

    #[test]
    fn profile_link_found() {
        let html = r#"<a class="links btn-item icon-flag"
            href="https://databank.worldbank.org/views/reports/reportwidget.aspx?Country=AFG">Profile</a>"#;
        let url = profile_link(html, &base()).unwrap();
        assert!(url.as_str().ends_with("Country=AFG"));
    }

    #[test]
    fn missing_profile_link_is_structural() {
        let err = profile_link("<a class=\"links\" href=\"/x\">x</a>", &base()).unwrap_err();
        assert!(matches!(err, IngestError::Structure(_)));
    }
}
