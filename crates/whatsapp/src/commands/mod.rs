//! Prefix commands.

mod basic;
mod media;

use {
    ditzy_common::types::OutboundContent,
    tracing::{info, warn},
};

use crate::{error::Result, handler::InboundHandler, normalize::NormalizedMessage};

/// Every command the bot answers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Ping,
    Menu,
    Info,
    Runtime,
    Sticker,
    ToImage,
    Music,
    Welcome,
    RevealViewOnce,
    MediaInfo,
    GetImage,
    Restart,
}

impl Command {
    /// Look up a lower-cased command word, aliases included.
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "ping" => Self::Ping,
            "menu" | "help" => Self::Menu,
            "info" => Self::Info,
            "runtime" => Self::Runtime,
            "sticker" | "s" => Self::Sticker,
            "toimg" => Self::ToImage,
            "music" => Self::Music,
            "welcome" => Self::Welcome,
            "rvo" => Self::RevealViewOnce,
            "mediainfo" => Self::MediaInfo,
            "getimg" => Self::GetImage,
            "restart" => Self::Restart,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Menu => "menu",
            Self::Info => "info",
            Self::Runtime => "runtime",
            Self::Sticker => "sticker",
            Self::ToImage => "toimg",
            Self::Music => "music",
            Self::Welcome => "welcome",
            Self::RevealViewOnce => "rvo",
            Self::MediaInfo => "mediainfo",
            Self::GetImage => "getimg",
            Self::Restart => "restart",
        }
    }

    /// Reply sent when the command fails with an unexpected error.
    fn failure_reply(self) -> &'static str {
        match self {
            Self::Sticker => "Error creating sticker!",
            Self::ToImage => "Failed to convert sticker!",
            Self::Music => "Failed to play music!",
            Self::Welcome => "Failed to send welcome message!",
            Self::GetImage => "Error getting image from URL!",
            Self::RevealViewOnce => {
                "Failed to reveal view once message!\nMake sure you replied to a view once message."
            },
            Self::MediaInfo => "Failed to get media information!",
            Self::Ping | Self::Menu | Self::Info | Self::Runtime | Self::Restart => {
                "Something went wrong!"
            },
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A prefixed body split into command word and arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation<'a> {
    pub name: String,
    pub args: Vec<&'a str>,
}

impl<'a> Invocation<'a> {
    /// `None` when `body` does not start with `prefix` or has no command word.
    pub fn parse(body: &'a str, prefix: &str) -> Option<Self> {
        if prefix.is_empty() {
            return None;
        }
        let rest = body.trim_start().strip_prefix(prefix)?;
        let mut words = rest.split_whitespace();
        let name = words.next()?.to_lowercase();
        Some(Self {
            name,
            args: words.collect(),
        })
    }
}

/// Run one command, turning failures into a user-visible reply.
pub(crate) async fn run(
    handler: &InboundHandler,
    command: Command,
    msg: &NormalizedMessage,
    args: &[&str],
) {
    info!(
        %command,
        chat_id = %msg.chat_id,
        sender_id = %msg.sender_id,
        "running command"
    );

    let result: Result<()> = match command {
        Command::Ping => basic::ping(handler, msg).await,
        Command::Menu => basic::menu(handler, msg).await,
        Command::Info => basic::info(handler, msg).await,
        Command::Runtime => basic::runtime(handler, msg).await,
        Command::Restart => basic::restart(handler, msg).await,
        Command::Sticker => media::sticker(handler, msg, args).await,
        Command::ToImage => media::to_image(handler, msg).await,
        Command::Music => media::music(handler, msg).await,
        Command::Welcome => media::welcome(handler, msg).await,
        Command::RevealViewOnce => media::reveal_view_once(handler, msg).await,
        Command::MediaInfo => media::media_info(handler, msg).await,
        Command::GetImage => media::get_image(handler, msg, args).await,
    };

    if let Err(e) = result {
        warn!(%command, error = %e, "command failed");
        if let Err(e) = handler
            .reply(msg, OutboundContent::text(command.failure_reply()))
            .await
        {
            warn!(%command, error = %e, "failed to send failure reply");
        }
    }
}
