use std::path::Path;

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{Cred, CredentialType, FetchOptions, RemoteCallbacks};
use log::info;

use crate::config::Credentials;
use crate::error::PrepareError;

/// Build a credentials callback, or `None` for anonymous access.
///
/// libgit2 calls the callback again after the server rejects what it returned,
/// so the second call fails instead of replaying the same credentials forever.
fn credentials_provider(
    credentials: &Credentials,
) -> Option<impl FnMut(&str, Option<&str>, CredentialType) -> Result<Cred, git2::Error> + '_> {
    let (username, password) = credentials.usable()?;
    let mut attempted = false;

    Some(move |_url: &str, _username_from_url: Option<&str>, _allowed: CredentialType| {
        if attempted {
            return Err(git2::Error::from_str(
                "authentication failed: remote answered 401 for the supplied credentials",
            ));
        }
        attempted = true;
        Cred::userpass_plaintext(username, password)
    })
}

/// Remote callbacks shared by clone and fetch.
pub fn remote_callbacks(credentials: &Credentials) -> RemoteCallbacks<'_> {
    let mut callbacks = RemoteCallbacks::new();
    if let Some(provider) = credentials_provider(credentials) {
        callbacks.credentials(provider);
    }
    callbacks
}

/// Clone `url` into `destination` without checking out a working tree.
///
/// Failures are classified by HTTP status (see `PrepareError::from_transport`).
/// A destination directory created by a failed clone is removed again.
pub fn clone_repository(
    url: &str,
    destination: &Path,
    credentials: &Credentials,
) -> Result<(), PrepareError> {
    let destination_existed = destination.exists();

    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent)?;
    }

    info!("Cloning {} into {}", url, destination.display());

    let mut fetch_options = FetchOptions::new();
    fetch_options.remote_callbacks(remote_callbacks(credentials));

    let mut checkout = CheckoutBuilder::new();
    checkout.dry_run();

    let result = RepoBuilder::new()
        .fetch_options(fetch_options)
        .with_checkout(checkout)
        .clone(url, destination);

    match result {
        Ok(_repo) => {
            info!("Cloned {}", url);
            Ok(())
        }
        Err(e) => {
            if !destination_existed {
                let _ = std::fs::remove_dir_all(destination);
            }
            Err(PrepareError::from_transport(url, e))
        }
    }
}
