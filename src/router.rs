use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Conversation,
    Login,
    Dashboard,
    PaymentRecord,
    Subscription,
}

impl Route {
    pub const ALL: [Route; 5] = [
        Route::Conversation,
        Route::Login,
        Route::Dashboard,
        Route::PaymentRecord,
        Route::Subscription,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Route::Conversation => "/",
            Route::Login => "/login",
            Route::Dashboard => "/dashboard",
            Route::PaymentRecord => "/payment-record",
            Route::Subscription => "/subscription",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Route::Conversation => "Home",
            Route::Login => "Login",
            Route::Dashboard => "Dashboard",
            Route::PaymentRecord => "Payment Record",
            Route::Subscription => "Subscription",
        }
    }

    pub fn requires_identity(self) -> bool {
        self != Route::Login
    }
}

/// Tracks the mounted route and the cancellation token of its mount.
pub struct Router {
    current: Route,
    mount_token: CancellationToken,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            current: Route::Login,
            mount_token: CancellationToken::new(),
        }
    }

    pub fn current(&self) -> Route {
        self.current
    }

    /// Unmounts the current page and mounts `requested`, or Login when the
    /// route needs an identity that is absent. Returns the route actually
    /// mounted and the token its background work must observe.
    pub fn navigate(&mut self, requested: Route, signed_in: bool) -> (Route, CancellationToken) {
        let target = if requested.requires_identity() && !signed_in {
            tracing::debug!(requested = requested.path(), "no identity, redirecting to login");
            Route::Login
        } else {
            requested
        };

        self.mount_token.cancel();
        self.mount_token = CancellationToken::new();
        self.current = target;
        tracing::debug!(route = target.path(), "mounted page");
        (target, self.mount_token.clone())
    }
}
