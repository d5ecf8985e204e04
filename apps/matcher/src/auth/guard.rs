//! Chooses between the public and protected navigation trees.

pub const HOME_PATH: &str = "/";
pub const SETTING_PATH: &str = "/setting";
pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Home,
    Setting,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Login => LOGIN_PATH,
            Route::Home => HOME_PATH,
            Route::Setting => SETTING_PATH,
        }
    }

    /// Header title shown by the layout.
    pub fn title(self) -> &'static str {
        match self {
            Route::Login => "Login",
            Route::Home => "Home",
            Route::Setting => "Setting",
        }
    }

    pub fn is_protected(self) -> bool {
        !matches!(self, Route::Login)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Render(Route),
    Redirect(&'static str),
}

/// Signed-in users see the protected tree; everything else, the login page
/// included, sends them home. Anonymous users only ever see the login page.
pub fn resolve(path: &str, authenticated: bool) -> Navigation {
    if authenticated {
        match path {
            HOME_PATH => Navigation::Render(Route::Home),
            SETTING_PATH => Navigation::Render(Route::Setting),
            _ => Navigation::Redirect(HOME_PATH),
        }
    } else {
        match path {
            LOGIN_PATH => Navigation::Render(Route::Login),
            _ => Navigation::Redirect(LOGIN_PATH),
        }
    }
}
