// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! File transfer with Telegram servers: OPML downloads and exports.

use feedbot_core::FeedbotError;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{FileId, InputFile};
use tracing::debug;

use crate::request_error;

/// Downloads an uploaded file by its file id.
///
/// Uses the Bot API's `getFile` to resolve the file path, then downloads
/// the file content as bytes.
pub async fn download_file(bot: &Bot, file_id: &str) -> Result<Vec<u8>, FeedbotError> {
    let file = bot
        .get_file(FileId(file_id.to_string()))
        .await
        .map_err(|e| request_error("failed to get file info", e))?;

    let mut buf = Vec::new();
    bot.download_file(&file.path, &mut buf)
        .await
        .map_err(|e| FeedbotError::Transport {
            message: format!("failed to download file: {e}"),
            source: Some(Box::new(e)),
        })?;

    debug!(file_id, size = buf.len(), "downloaded file from Telegram");
    Ok(buf)
}

/// Uploads an in-memory document to `chat`.
pub async fn send_document(
    bot: &Bot,
    chat: ChatId,
    file_name: String,
    bytes: Vec<u8>,
    caption: Option<String>,
) -> Result<(), FeedbotError> {
    let size = bytes.len();
    let document = InputFile::memory(bytes).file_name(file_name.clone());
    let mut request = bot.send_document(chat, document);
    if let Some(caption) = caption {
        request = request.caption(caption);
    }
    request
        .await
        .map_err(|e| request_error("failed to send document", e))?;

    debug!(chat_id = chat.0, file_name = %file_name, size, "sent document");
    Ok(())
}
