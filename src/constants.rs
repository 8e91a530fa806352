//! Constants module for the catalog sources
//!
//! Contains endpoint URL builders that use the base URLs from configuration.

/// Default site roots, overridable through configuration
pub const MARINMOE_BASE_URL: &str = "https://marin.moe";
pub const HACKSTORE_BASE_URL: &str = "https://hackstore.rs";

/// Prefix that turns a search query into a direct entry lookup
pub const ID_QUERY_PREFIX: &str = "id:";

/// URL builders for the embedded-JSON anime site
pub mod marinmoe {
    use crate::models::SearchFilters;

    /// Sort key for most viewed this week
    pub const SORT_POPULAR: &str = "vwk-d";
    /// Sort key for most recently released
    pub const SORT_LATEST: &str = "rel-d";
    /// Sort used for text search results
    pub const SORT_SEARCH: &str = SORT_POPULAR;

    /// Catalog listing with a sort key
    pub fn listing(base_url: &str, sort: &str, page: u32) -> String {
        format!("{}/anime?sort={}&page={}", base_url, sort, page)
    }

    /// Text search URL with any filters appended
    pub fn search(base_url: &str, query: &str, page: u32, filters: &SearchFilters) -> String {
        format!(
            "{}/anime?sort={}&search={}&page={}{}",
            base_url,
            filters.sort.as_deref().unwrap_or(SORT_SEARCH),
            urlencoding::encode(query),
            page,
            filter_params(filters)
        )
    }

    /// `&filter[<name>][<i>][id]=<id>&filter[<name>][<i>][opr]=include` for every id
    fn filter_params(filters: &SearchFilters) -> String {
        let group = filters.group.iter().cloned().collect::<Vec<_>>();
        let production = filters.production.iter().cloned().collect::<Vec<_>>();
        let sets: [(&str, &[String]); 7] = [
            ("type", filters.types.as_slice()),
            ("status", filters.statuses.as_slice()),
            ("content_rating", filters.content_ratings.as_slice()),
            ("genre", filters.genres.as_slice()),
            ("source", filters.sources.as_slice()),
            ("group", group.as_slice()),
            ("production", production.as_slice()),
        ];

        let mut params = String::new();
        for (name, ids) in sets {
            for (i, id) in ids.iter().enumerate() {
                params.push_str(&format!(
                    "&filter[{name}][{i}][id]={id}&filter[{name}][{i}][opr]=include",
                    id = urlencoding::encode(id)
                ));
            }
        }
        params
    }

    /// Entry page by identifier
    pub fn entry_path(id: &str) -> String {
        format!("/anime/{}", id)
    }
}

/// URL builders for the DOM-rendered movie site
pub mod hackstore {
    /// Movie listing page; popular and latest share it
    pub fn listing(base_url: &str, page: u32) -> String {
        format!("{}/peliculas/page/{}/", base_url, page)
    }

    /// Entry page by identifier
    pub fn entry_path(id: &str) -> String {
        format!("/peliculas/{}", id)
    }
}

/// Join a site root with a path, leaving absolute URLs untouched
pub fn absolute_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base_url.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// The identifier of an `id:<identifier>` query, if that is what `query` is
pub fn id_query(query: &str) -> Option<&str> {
    query
        .trim()
        .strip_prefix(ID_QUERY_PREFIX)
        .map(str::trim)
        .filter(|id| !id.is_empty())
}
