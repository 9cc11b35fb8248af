use std::sync::atomic::{AtomicBool, Ordering};

/// Full-page navigation out of the app.
#[cfg_attr(test, mockall::automock)]
pub trait Navigator: Send + Sync {
    fn redirect_to_login(&self);
}

/// Terminal stand-in for a browser redirect: tells the user where to sign
/// in and remembers that the session ended.
pub struct LoginRedirect {
    login_url: String,
    redirected: AtomicBool,
}

impl LoginRedirect {
    pub fn new(login_url: impl Into<String>) -> Self {
        Self {
            login_url: login_url.into(),
            redirected: AtomicBool::new(false),
        }
    }

    pub fn redirected(&self) -> bool {
        self.redirected.load(Ordering::SeqCst)
    }
}

impl Navigator for LoginRedirect {
    fn redirect_to_login(&self) {
        self.redirected.store(true, Ordering::SeqCst);
        tracing::info!(login_url = %self.login_url, "Redirecting to login");
        eprintln!("Signed out. Log in at {}", self.login_url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_redirect_records_redirect() {
        let nav = LoginRedirect::new("http://localhost:8000/login/");
        assert!(!nav.redirected());
        nav.redirect_to_login();
        assert!(nav.redirected());
    }
}
