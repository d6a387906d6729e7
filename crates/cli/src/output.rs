//! Terminal output.
//!
//! Command results go to stdout; failures go to stderr as notifications.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::fmt::Display;

use sole_society_client::Notification;

use crate::commands::CliError;

/// Print a notification.
pub fn notify(notification: &Notification) {
    println!("{notification}");
}

/// Print one line of command output.
pub fn line(text: impl Display) {
    println!("{text}");
}

/// Print every notification for a failed command.
pub fn failure(err: &CliError) {
    for notification in err.notifications() {
        eprintln!("{notification}");
    }
}
