use axum_extra::extract::cookie::{Cookie, CookieJar};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

/// One-shot notice carried across a redirect in its own cookie, read and
/// cleared on the next rendered page.

const FLASH_COOKIE: &str = "notice";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Presentation level: "success" or "danger".
    pub level: String,
    pub message: String,
}

pub fn push(jar: CookieJar, level: &str, message: &str) -> CookieJar {
    let encoded = URL_SAFE_NO_PAD.encode(format!("{level}\n{message}"));
    jar.add(Cookie::build((FLASH_COOKIE, encoded)).path("/").build())
}

pub fn take(jar: CookieJar) -> (Option<Notice>, CookieJar) {
    let Some(cookie) = jar.get(FLASH_COOKIE) else {
        return (None, jar);
    };

    let notice = URL_SAFE_NO_PAD
        .decode(cookie.value().as_bytes())
        .ok()
        .and_then(|raw| String::from_utf8(raw).ok())
        .and_then(|s| {
            s.split_once('\n').map(|(level, message)| Notice {
                level: level.to_string(),
                message: message.to_string(),
            })
        });

    let jar = jar.remove(Cookie::build((FLASH_COOKIE, "")).path("/").build());
    (notice, jar)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pushed_notice_is_taken_once() {
        let jar = push(CookieJar::new(), "success", "Hello, alice!");
        let (notice, jar) = take(jar);
        assert_eq!(
            notice,
            Some(Notice {
                level: "success".to_string(),
                message: "Hello, alice!".to_string(),
            })
        );

        // The cookie is cleared together with the read.
        let (again, _) = take(jar);
        assert_eq!(again, None);
    }

    #[test]
    fn corrupt_cookie_yields_no_notice() {
        let jar = CookieJar::new().add(Cookie::build((FLASH_COOKIE, "!!!not-base64")).build());
        let (notice, _) = take(jar);
        assert_eq!(notice, None);
    }
}
