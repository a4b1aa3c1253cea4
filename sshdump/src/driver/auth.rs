//! Terminal login for devices that ask for credentials inside the shell.
//!
//! Some devices accept the SSH session and then print their own
//! `Username:`/`Password:` prompts. The exchange is driven by a generic
//! colon-terminated line pattern instead of the configured prompts, and
//! nothing is stripped from what is read.

use log::debug;
use secrecy::{ExposeSecret, SecretString};

use crate::channel::{PromptSet, PtyChannel};
use crate::error::Result;
use crate::transport::Transport;

/// Answer a username prompt and then a password prompt.
///
/// Success is not checked here; the next prompt read by the caller
/// tells whether the device accepted the login.
pub async fn terminal_login<T: Transport>(
    channel: &mut PtyChannel<T>,
    username: &str,
    password: &SecretString,
) -> Result<()> {
    let login = PromptSet::login();

    let banner = channel.read_until_prompt(&login, false).await?;
    debug!("login: username prompt {:?}", banner.data.lines().last());
    channel.send(&format!("{}\n", username)).await?;

    let prompt = channel.read_until_prompt(&login, false).await?;
    debug!("login: password prompt {:?}", prompt.data.lines().last());
    channel
        .send(&format!("{}\n", password.expose_secret()))
        .await?;

    Ok(())
}
