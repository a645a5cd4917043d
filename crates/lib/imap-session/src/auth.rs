//! Authentication.

/// Login credentials.
#[derive(Clone, PartialEq)]
pub struct Credentials<'a> {
    /// Username for IMAP authentication.
    ///
    /// Typically an email address.
    pub username: &'a str,

    /// Password for IMAP authentication.
    pub password: &'a str,
}

impl std::fmt::Debug for Credentials<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***redacted***")
            .finish()
    }
}

/// Log in on the client to obtain a session.
pub(crate) async fn login(
    client: imap_connect::Client,
    credentials: Credentials<'_>,
) -> Result<crate::Session, async_imap::error::Error> {
    let Credentials { username, password } = credentials;
    client
        .login(username, password)
        .await
        .map_err(|(err, _client)| err)
}
