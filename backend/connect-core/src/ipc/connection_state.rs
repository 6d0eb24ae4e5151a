//! Per-connection authentication state.

pub(crate) struct ConnectionState {
    authenticated: bool,
    expected_token: String,
}

impl ConnectionState {
    pub(crate) fn new(token: String) -> Self {
        Self {
            authenticated: false,
            expected_token: token,
        }
    }

    /// Mark the connection authenticated if `token` matches.
    pub(crate) fn validate_token(&mut self, token: &str) -> bool {
        self.authenticated = !token.is_empty() && token == self.expected_token;
        self.authenticated
    }
}
