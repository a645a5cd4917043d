//! The GreenMail test server.

use testcontainers::core::{IntoContainerPort as _, WaitFor};
use testcontainers::runners::AsyncRunner as _;
use testcontainers::{ContainerAsync, GenericImage, ImageExt as _};

/// A running GreenMail container.
pub type GreenMail = ContainerAsync<GenericImage>;

/// Start GreenMail with a single account `user` / `password`.
pub async fn start_greenmail(
    user: &str,
    password: &str,
) -> Result<GreenMail, testcontainers::TestcontainersError> {
    let opts = [
        "-Dgreenmail.setup.test.all".to_owned(),
        "-Dgreenmail.hostname=0.0.0.0".to_owned(),
        format!("-Dgreenmail.users={user}:{password}@example.com"),
    ]
    .join(" ");

    GenericImage::new("greenmail/standalone", "latest")
        .with_exposed_port(crate::IMAP_PORT.tcp())
        .with_wait_for(WaitFor::message_on_stdout("Starting GreenMail API server at"))
        .with_env_var("GREENMAIL_OPTS", opts)
        .start()
        .await
}
