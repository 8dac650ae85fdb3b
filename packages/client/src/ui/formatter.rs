//! Message formatting utilities for terminal display.

use crate::domain::{ChatMessage, MessageKind, UserId};

/// Message formatter for the CLI client
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format a chat message line
    ///
    /// Marks the current user's own messages, appends a read marker when the
    /// message has been acknowledged, and shows the file locator for
    /// image/file messages.
    pub fn format_message(message: &ChatMessage, current_user: &UserId) -> String {
        let me_suffix = if message.authored_by(current_user) {
            " (me)"
        } else {
            ""
        };
        let read_marker = if message.is_read() { " ✓" } else { "" };
        let body = match message.kind {
            MessageKind::Text => message.body.clone(),
            MessageKind::Image | MessageKind::File => format!(
                "[{}] {}",
                kind_label(message.kind),
                message.file_url.as_deref().unwrap_or("(no file)")
            ),
        };
        format!(
            "[{}] {}{}: {}{}\n",
            message.created_at.as_str(),
            message.sender.name,
            me_suffix,
            body,
            read_marker
        )
    }

    /// Format a presence notification
    pub fn format_presence(user_id: &UserId, joined: bool) -> String {
        if joined {
            format!("+ {} joined the room\n", user_id.as_str())
        } else {
            format!("- {} left the room\n", user_id.as_str())
        }
    }

    /// Format an error notice
    pub fn format_error(message: &str) -> String {
        format!("! {}\n", message)
    }
}

fn kind_label(kind: MessageKind) -> &'static str {
    match kind {
        MessageKind::Text => "text",
        MessageKind::Image => "image",
        MessageKind::File => "file",
    }
}
