//! Mapping resolved settings into component params.

use std::time::Duration;

use config_load::settings::Imap;

/// Bound on a single IMAP round trip for a given idle timeout.
///
/// The idle drain after a stop shares this bound, so it must outlast a hold.
pub fn io_timeout(idle_timeout: Duration) -> Duration {
    idle_timeout.saturating_mul(2)
}

/// Session params for the watched mailbox.
pub fn session_params(imap: &Imap) -> imap_session::Params<'_> {
    let Imap {
        host,
        port,
        tls_mode,
        tls_server_name,
        username,
        password,
        folder,
        idle_timeout,
        folder_moved: _,
        folder_quarantine: _,
        max_message_size: _,
        pick: _,
    } = imap;

    imap_session::Params {
        connect: imap_connect::Params {
            host,
            port: *port,
            tls_mode: *tls_mode,
            tls_server_name,
        },
        credentials: imap_session::Credentials {
            username,
            password: password.expose(),
        },
        folder,
        io_timeout: io_timeout(*idle_timeout),
    }
}

/// Pipeline params for the watched mailbox.
pub fn transfer_params<'a, I, A>(
    imap: &'a Imap,
    importer: &'a I,
    alerter: &'a A,
) -> transfer::Params<'a, I, A> {
    transfer::Params {
        importer,
        alerter,
        folder_moved: &imap.folder_moved,
        folder_quarantine: &imap.folder_quarantine,
        max_message_size: imap.max_message_size,
        pick: imap.pick,
    }
}
