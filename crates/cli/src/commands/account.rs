//! Sign-in and sign-out.

use cellshop_core::Email;
use cellshop_storefront::Session;
use secrecy::SecretString;

use super::{CliError, reported};

/// Sign in and report what was merged from this device.
pub async fn login(session: &Session, email: &str, password: String) -> Result<(), CliError> {
    let email = Email::parse(email).map_err(|e| CliError::invalid("email", e))?;
    let outcome = session
        .login(&email, &SecretString::from(password))
        .await
        .map_err(reported)?;

    println!("Signed in as {} ({})", outcome.account.name, email.masked());
    if let Some(merge) = outcome.wishlist_merge {
        println!("  wishlist: {} merged, {} refused", merge.pushed, merge.failed);
    }
    if let Some(merge) = outcome.cart_merge {
        println!("  cart: {} merged, {} refused", merge.pushed, merge.failed);
    }
    Ok(())
}

pub fn logout(session: &Session) -> Result<(), CliError> {
    session.logout().map_err(reported)?;
    println!("Signed out");
    Ok(())
}
