//! Session Transport
//! Mission: Carry the token in a Bearer header or an HTTP-only cookie

use axum::http::HeaderMap;
use axum_extra::{
    extract::cookie::{Cookie, CookieJar, SameSite},
    headers::{authorization::Bearer, Authorization, HeaderMapExt},
};

/// Cookie holding the session token
pub const TOKEN_COOKIE: &str = "token";

/// Cookie attributes for issued sessions
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Set when served over TLS
    pub secure: bool,
    /// Matches the token TTL
    pub max_age_secs: i64,
}

/// Find the caller's token: `Authorization: Bearer` first, then the cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(Authorization(bearer)) = headers.typed_get::<Authorization<Bearer>>() {
        return Some(bearer.token().to_string());
    }

    CookieJar::from_headers(headers)
        .get(TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

/// Set the session cookie on a response
pub fn attach(jar: CookieJar, token: String, config: &SessionConfig) -> CookieJar {
    let cookie = Cookie::build((TOKEN_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(config.secure)
        .path("/")
        .max_age(time::Duration::seconds(config.max_age_secs));

    jar.add(cookie)
}

/// Expire the session cookie. Server-side the token stays valid until `exp`.
///
/// Always emits an expired cookie, even when the request carried none.
pub fn clear(jar: CookieJar, config: &SessionConfig) -> CookieJar {
    let cookie = Cookie::build((TOKEN_COOKIE, ""))
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(config.secure)
        .path("/")
        .max_age(time::Duration::ZERO)
        .expires(time::OffsetDateTime::UNIX_EPOCH);

    jar.add(cookie)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{header, HeaderValue},
        response::IntoResponse,
    };

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_bearer_header_extracted() {
        let map = headers(&[(header::AUTHORIZATION, "Bearer abc.def.ghi")]);
        assert_eq!(extract_token(&map).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_cookie_extracted_when_no_header() {
        let map = headers(&[(header::COOKIE, "theme=dark; token=cookie.jwt.value")]);
        assert_eq!(extract_token(&map).as_deref(), Some("cookie.jwt.value"));
    }

    #[test]
    fn test_header_wins_over_cookie() {
        let map = headers(&[
            (header::AUTHORIZATION, "Bearer header.jwt.value"),
            (header::COOKIE, "token=cookie.jwt.value"),
        ]);
        assert_eq!(extract_token(&map).as_deref(), Some("header.jwt.value"));
    }

    #[test]
    fn test_non_bearer_scheme_falls_back_to_cookie() {
        let map = headers(&[
            (header::AUTHORIZATION, "Basic dXNlcjpwYXNz"),
            (header::COOKIE, "token=cookie.jwt.value"),
        ]);
        assert_eq!(extract_token(&map).as_deref(), Some("cookie.jwt.value"));
    }

    #[test]
    fn test_absent_when_nothing_supplied() {
        assert!(extract_token(&HeaderMap::new()).is_none());

        let map = headers(&[(header::COOKIE, "token=")]);
        assert!(extract_token(&map).is_none());
    }

    #[test]
    fn test_attach_sets_hardened_cookie() {
        let config = SessionConfig {
            secure: true,
            max_age_secs: 3600,
        };
        let jar = attach(CookieJar::new(), "signed.jwt".to_string(), &config);

        let cookie = jar.get(TOKEN_COOKIE).unwrap();
        assert_eq!(cookie.value(), "signed.jwt");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(3600)));
    }

    #[test]
    fn test_clear_emits_removal_cookie() {
        let config = SessionConfig {
            secure: false,
            max_age_secs: 3600,
        };
        let response = clear(CookieJar::new(), &config).into_response();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();

        assert!(set_cookie.starts_with("token="));
        assert!(set_cookie.contains("Max-Age=0"));
    }
}
