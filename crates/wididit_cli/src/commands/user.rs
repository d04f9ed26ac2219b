//! User command implementations.

use super::{write_user, CommandResult, Session, UserView};
use std::io::Write;

/// Shows a user's profile.
pub fn show(session: &Session<'_>, userid: &str, format: &str, out: &mut dyn Write) -> CommandResult {
    let user = session
        .wididit
        .user_from_anything(userid, Some(&session.host))?;
    write_user(out, &UserView::from(user.as_ref()), format)
}

/// Changes the biography of the authenticated user.
pub fn set_bio(session: &Session<'_>, text: &str, format: &str, out: &mut dyn Write) -> CommandResult {
    let me = session.me()?;
    me.set_biography(text)?;
    write_user(out, &UserView::from(me.as_ref()), format)
}
