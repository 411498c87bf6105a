// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion of reply keyboards into Telegram markup.

use feedbot_core::{Button, Keyboard};
use teloxide::types::{
    ForceReply, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
    KeyboardRemove, ReplyMarkup,
};

/// Inline keyboard whose buttons send their data back as callback queries.
pub fn inline_keyboard(rows: &[Vec<Button>]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(rows.iter().map(|row| {
        row.iter()
            .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.data.clone()))
            .collect::<Vec<_>>()
    }))
}

/// Markup for a message, or `None` when it carries no keyboard.
pub fn reply_markup(keyboard: &Keyboard) -> Option<ReplyMarkup> {
    match keyboard {
        Keyboard::None => None,
        Keyboard::Inline(rows) => Some(ReplyMarkup::InlineKeyboard(inline_keyboard(rows))),
        Keyboard::Reply(rows) => {
            let rows = rows.iter().map(|row| {
                row.iter()
                    .map(|label| KeyboardButton::new(label.clone()))
                    .collect::<Vec<_>>()
            });
            Some(ReplyMarkup::Keyboard(
                KeyboardMarkup::new(rows)
                    .resize_keyboard()
                    .one_time_keyboard(),
            ))
        }
        Keyboard::RemoveReply => Some(ReplyMarkup::KeyboardRemove(KeyboardRemove::new())),
        Keyboard::ForceReply => Some(ReplyMarkup::ForceReply(ForceReply::new())),
    }
}

#[cfg(test)]
mod tests {
    use teloxide::types::InlineKeyboardButtonKind;

    use super::*;

    #[test]
    fn inline_buttons_carry_callback_data() {
        let markup = inline_keyboard(&[vec![
            Button::new("Notifications", "toggle_notice|1:2:3"),
            Button::new("Telegraph", "toggle_telegraph|1:2:3"),
        ]]);
        assert_eq!(markup.inline_keyboard.len(), 1);
        let first = &markup.inline_keyboard[0][0];
        assert_eq!(first.text, "Notifications");
        assert!(matches!(
            &first.kind,
            InlineKeyboardButtonKind::CallbackData(data) if data == "toggle_notice|1:2:3"
        ));
    }

    #[test]
    fn no_keyboard_means_no_markup() {
        assert!(reply_markup(&Keyboard::None).is_none());
    }

    #[test]
    fn reply_keyboard_is_one_shot() {
        let markup = reply_markup(&Keyboard::Reply(vec![vec!["[1] Feed".to_string()]]));
        match markup {
            Some(ReplyMarkup::Keyboard(keyboard)) => {
                assert!(keyboard.one_time_keyboard);
                assert_eq!(keyboard.keyboard[0][0].text, "[1] Feed");
            }
            other => panic!("expected reply keyboard, got {other:?}"),
        }
    }

    #[test]
    fn remove_and_force_reply_map_directly() {
        assert!(matches!(
            reply_markup(&Keyboard::RemoveReply),
            Some(ReplyMarkup::KeyboardRemove(_))
        ));
        assert!(matches!(
            reply_markup(&Keyboard::ForceReply),
            Some(ReplyMarkup::ForceReply(_))
        ));
    }
}
